//! Compiler and library locations used to build generated programs.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CodegenResult;

/// Static toolchain configuration.
///
/// Replaces any process-wide install information: it is passed explicitly to
/// the build cache and to the script generators that need library paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainConfig {
    /// Compiler executable.
    pub compiler: String,

    /// Flags passed before include and library options.
    pub extra_compile_args: Vec<String>,

    /// Third-party include directories (MPI, FFTW, HDF5...).
    pub include_dirs: Vec<PathBuf>,

    /// Third-party library directories.
    pub library_dirs: Vec<PathBuf>,

    /// Libraries to link. Entries starting with `-` or `/` are passed as is.
    pub libraries: Vec<String>,

    /// Directory holding the support library headers.
    pub header_dir: PathBuf,

    /// Directory holding the compiled support library.
    pub lib_dir: PathBuf,

    /// Name of the support library.
    pub support_library: String,

    /// Flag enabling OpenMP.
    pub openmp_flag: String,

    /// When the support library was installed. Programs built before this
    /// are stale.
    pub install_date: DateTime<Utc>,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            compiler: "mpicxx".to_string(),
            extra_compile_args: ["-Wall", "-O2", "-g", "-mtune=native", "-ffast-math", "-std=c++11"]
                .map(String::from)
                .to_vec(),
            include_dirs: Vec::new(),
            library_dirs: Vec::new(),
            libraries: vec!["hdf5".to_string()],
            header_dir: PathBuf::from("/usr/local/include/simlaunch"),
            lib_dir: PathBuf::from("/usr/local/lib"),
            support_library: "simlaunch".to_string(),
            openmp_flag: "-fopenmp".to_string(),
            install_date: DateTime::UNIX_EPOCH,
        }
    }
}

impl ToolchainConfig {
    /// Load from a YAML document.
    pub fn from_yaml(yaml: &str) -> CodegenResult<Self> {
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    /// Load from a YAML file.
    pub async fn load(path: &Path) -> CodegenResult<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::from_yaml(&content)
    }

    /// Set the compiler.
    pub fn with_compiler(mut self, compiler: impl Into<String>) -> Self {
        self.compiler = compiler.into();
        self
    }

    /// Set the support header directory.
    pub fn with_header_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.header_dir = dir.into();
        self
    }

    /// Set the support library directory.
    pub fn with_lib_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.lib_dir = dir.into();
        self
    }

    /// Set the install timestamp.
    pub fn with_install_date(mut self, date: DateTime<Utc>) -> Self {
        self.install_date = date;
        self
    }

    /// Directories the program needs on `LD_LIBRARY_PATH` at run time:
    /// the support library first, then third-party libraries.
    pub fn runtime_library_path(&self) -> Vec<PathBuf> {
        std::iter::once(self.lib_dir.clone())
            .chain(self.library_dirs.iter().cloned())
            .collect()
    }

    /// `runtime_library_path` joined with `:`.
    pub fn runtime_library_path_string(&self) -> String {
        self.runtime_library_path()
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(":")
    }

    /// Full compiler command line for program `name`, compiler first.
    pub fn compile_command(&self, name: &str) -> Vec<String> {
        let mut atoms = vec![
            self.compiler.clone(),
            format!("{name}.cpp"),
            "-o".to_string(),
            name.to_string(),
        ];
        atoms.extend(self.extra_compile_args.iter().cloned());
        atoms.extend(self.include_dirs.iter().map(|d| format!("-I{}", d.display())));
        atoms.push(format!("-I{}", self.header_dir.display()));
        for dir in &self.library_dirs {
            atoms.push(format!("-L{}", dir.display()));
        }
        for dir in &self.library_dirs {
            atoms.push(format!("-Wl,-rpath={}", dir.display()));
        }
        atoms.push(format!("-L{}", self.lib_dir.display()));
        atoms.push(format!("-Wl,-rpath={}", self.lib_dir.display()));

        for lib in std::iter::once(&self.support_library).chain(self.libraries.iter()) {
            if lib.starts_with('-') || lib.starts_with('/') {
                atoms.push(lib.clone());
            } else {
                atoms.push(format!("-l{lib}"));
            }
        }
        atoms.push(self.openmp_flag.clone());
        atoms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn toolchain() -> ToolchainConfig {
        ToolchainConfig {
            include_dirs: vec![PathBuf::from("/opt/fftw/include")],
            library_dirs: vec![PathBuf::from("/opt/fftw/lib")],
            libraries: vec!["hdf5".to_string(), "/opt/mpi/lib/libmpi.so".to_string()],
            header_dir: PathBuf::from("/opt/simlaunch/include"),
            lib_dir: PathBuf::from("/opt/simlaunch/lib"),
            ..Default::default()
        }
    }

    #[test]
    fn test_compile_command() {
        let cmd = toolchain().compile_command("NavierStokes");
        assert_eq!(&cmd[..4], ["mpicxx", "NavierStokes.cpp", "-o", "NavierStokes"]);
        assert!(cmd.contains(&"-I/opt/fftw/include".to_string()));
        assert!(cmd.contains(&"-Wl,-rpath=/opt/fftw/lib".to_string()));
        assert!(cmd.contains(&"-lsimlaunch".to_string()));
        assert!(cmd.contains(&"-lhdf5".to_string()));
        assert!(cmd.contains(&"/opt/mpi/lib/libmpi.so".to_string()));
        assert_eq!(cmd.last().map(String::as_str), Some("-fopenmp"));

        let third_party = cmd.iter().position(|a| a == "-I/opt/fftw/include").unwrap();
        let own = cmd.iter().position(|a| a == "-I/opt/simlaunch/include").unwrap();
        assert!(third_party < own);
    }

    #[test]
    fn test_runtime_library_path() {
        assert_eq!(
            toolchain().runtime_library_path_string(),
            "/opt/simlaunch/lib:/opt/fftw/lib"
        );
    }

    #[test]
    fn test_from_yaml_partial() {
        let yaml = r#"
compiler: g++
library_dirs: [/usr/lib/mpich]
install_date: 2024-03-01T12:00:00Z
"#;
        let config = ToolchainConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.compiler, "g++");
        assert_eq!(config.library_dirs, vec![PathBuf::from("/usr/lib/mpich")]);
        assert_eq!(config.openmp_flag, "-fopenmp");
        assert_eq!(
            config.install_date,
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
        );
    }
}
