//! Registry of the simulation variants the launcher knows how to build.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::assembler::ProgramSource;
use crate::error::CodegenError;
use crate::parameters::{DT, NITER_TODO, Parameters};

/// A simulation variant, selected by a fixed identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SimulationKind {
    /// Pseudo-spectral Navier-Stokes integration.
    NavierStokes,
    /// Spectral interpolation of a field onto a different grid.
    FluidResize,
}

impl SimulationKind {
    /// Every registered variant.
    pub const ALL: [SimulationKind; 2] = [SimulationKind::NavierStokes, SimulationKind::FluidResize];

    /// Identifier, also the default program name.
    pub fn as_str(&self) -> &'static str {
        match self {
            SimulationKind::NavierStokes => "NavierStokes",
            SimulationKind::FluidResize => "FluidResize",
        }
    }

    /// Default parameters for the variant.
    pub fn default_parameters(&self) -> Parameters {
        match self {
            SimulationKind::NavierStokes => Parameters::new()
                .with("nx", 32)
                .with("ny", 32)
                .with("nz", 32)
                .with("dkx", 1.0)
                .with("dky", 1.0)
                .with("dkz", 1.0)
                .with("dealias_type", 1)
                .with(DT, 0.01)
                .with("nu", 0.1)
                .with("fmode", 1)
                .with("famplitude", 0.5)
                .with("fk0", 0.0)
                .with("fk1", 3.0)
                .with("forcing_type", "linear")
                .with(NITER_TODO, 8)
                .with("niter_stat", 1)
                .with("niter_out", 8),
            SimulationKind::FluidResize => Parameters::new()
                .with("src_simname", "test")
                .with("src_iteration", 0)
                .with("dst_iteration", 0)
                .with("dst_nx", 64)
                .with("dst_ny", 64)
                .with("dst_nz", 64)
                .with("dst_simname", "new_test")
                .with("nx", 32)
                .with("ny", 32)
                .with("nz", 32)
                .with("dkx", 1.0)
                .with("dky", 1.0)
                .with("dkz", 1.0)
                .with(DT, 0.01)
                .with(NITER_TODO, 1),
        }
    }

    /// The program source for the variant, named after it.
    pub fn program(&self) -> ProgramSource {
        self.program_named(self.as_str())
    }

    /// The program source for the variant under a custom name.
    pub fn program_named(&self, name: &str) -> ProgramSource {
        match self {
            SimulationKind::NavierStokes => ProgramSource::new(name)
                .with_variables("fluid_solver<float> *fs;\nFILE *stat_file_txt;\n")
                .with_definitions(NAVIER_STOKES_DEFINITIONS)
                .with_main_body(NAVIER_STOKES_BODY),
            SimulationKind::FluidResize => ProgramSource::new(name)
                .with_variables("fluid_solver<float> *fs0, *fs1;\n")
                .with_main_body(FLUID_RESIZE_BODY),
        }
    }
}

impl fmt::Display for SimulationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SimulationKind {
    type Err = CodegenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| CodegenError::UnknownSimulation(s.to_string()))
    }
}

const NAVIER_STOKES_DEFINITIONS: &str = r#"void do_stats(fluid_solver<float> *fsolver)
{
    double energy = fsolver->correl_vec(fsolver->cvelocity, fsolver->cvelocity) / 2;
    double enstrophy = fsolver->correl_vec(fsolver->cvorticity, fsolver->cvorticity) / 2;
    if (myrank == 0)
        fprintf(stat_file_txt, "%d %g %g\n", fsolver->iteration, energy, enstrophy);
}

"#;

const NAVIER_STOKES_BODY: &str = r#"        fs = new fluid_solver<float>(
                simname,
                nx, ny, nz,
                dkx, dky, dkz,
                dealias_type);
        fs->nu = nu;
        fs->fmode = fmode;
        fs->famplitude = famplitude;
        fs->fk0 = fk0;
        fs->fk1 = fk1;
        strncpy(fs->forcing_type, forcing_type, 128);
        fs->iteration = iteration;
        fs->read('v', 'c');
        if (myrank == 0)
            stat_file_txt = fopen("stats.txt", "a");
        do_stats(fs);
        for (int t = 0; t < niter_todo; t++)
        {
            fs->step(dt);
            if (fs->iteration % niter_stat == 0) do_stats(fs);
            if (fs->iteration % niter_out == 0) fs->write('v', 'c');
        }
        if (fs->iteration % niter_out != 0) fs->write('v', 'c');
        if (myrank == 0)
            fclose(stat_file_txt);
        iteration = fs->iteration;
        delete fs;
"#;

const FLUID_RESIZE_BODY: &str = r#"        fs0 = new fluid_solver<float>(
                src_simname,
                nx, ny, nz,
                dkx, dky, dkz);
        fs1 = new fluid_solver<float>(
                dst_simname,
                dst_nx, dst_ny, dst_nz,
                dkx, dky, dkz);
        fs0->iteration = src_iteration;
        fs1->iteration = dst_iteration;
        fs0->read('v', 'c');
        fs0->resize(fs1);
        fs1->write('v', 'c');
        delete fs1;
        delete fs0;
"#;
