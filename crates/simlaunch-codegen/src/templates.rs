//! Fixed C++ segments wrapped around every generated program.
//!
//! The entry and exit boilerplate implement the checkpoint protocol: the
//! state file is opened read-only to fetch `iteration`, closed, and then
//! reopened read-write by rank 0 for the whole run. On exit rank 0 stores
//! the final `iteration` before closing.

/// Headers every program needs.
pub const INCLUDES: &str = r#"#include "base.hpp"
#include "fluid_solver.hpp"
#include "state_file.hpp"
#include "scope_timer.hpp"
#include <iostream>
#include <string>
#include <cstring>
#include <cassert>
#include <fftw3-mpi.h>
#include <omp.h>
#include <fenv.h>
#include <cstdlib>

"#;

/// Globals every program needs.
pub const VARIABLES: &str = "int myrank, nprocs;
int iteration;
char simname[256], fname[256];
state_handle state_file;

";

/// Program entry, up to the opening of the user body scope.
pub const MAIN_START: &str = r#"int main(int argc, char *argv[])
{
    if(getenv("SIMLAUNCH_FPE_OFF") == nullptr || getenv("SIMLAUNCH_FPE_OFF") != std::string("TRUE")){
        feenableexcept(FE_INVALID | FE_OVERFLOW);
    }
    else{
        std::cout << "FPE have been turned OFF" << std::endl;
    }
    if (argc != 2)
    {
        std::cerr << "Wrong number of command line arguments. Stopping." << std::endl;
        return EXIT_SUCCESS;
    }
    int mpiprovided;
    MPI_Init_thread(&argc, &argv, MPI_THREAD_FUNNELED, &mpiprovided);
    assert(mpiprovided >= MPI_THREAD_FUNNELED);
    MPI_Comm_rank(MPI_COMM_WORLD, &myrank);
    MPI_Comm_size(MPI_COMM_WORLD, &nprocs);
    const int nbThreads = omp_get_max_threads();
    if (nbThreads > 1){
        fftw_init_threads();
        fftwf_init_threads();
    }
    fftw_mpi_init();
    fftwf_mpi_init();
    DEBUG_MSG("There are %d processes and %d threads\n", nprocs, nbThreads);
    if (nbThreads > 1){
        fftw_plan_with_nthreads(nbThreads);
        fftwf_plan_with_nthreads(nbThreads);
    }
    strcpy(simname, argv[1]);
    sprintf(fname, "%s.json", simname);
    state_file = state_open(fname, STATE_READ_ONLY);
    state_read_int(state_file, "iteration", &iteration);
    DEBUG_MSG("simname is %s and iteration is %d\n", simname, iteration);
    state_close(state_file);
    read_parameters();
    if (myrank == 0)
    {
        state_file = state_open(fname, STATE_READ_WRITE);
    }
    {
        TIMEZONE("main");
"#;

/// Program exit: closes the user body scope and persists the checkpoint.
pub const MAIN_END: &str = r#"    }
    if (myrank == 0)
    {
        state_write_int(state_file, "iteration", iteration);
        state_close(state_file);
    }
    fftwf_mpi_cleanup();
    fftw_mpi_cleanup();
    if (nbThreads > 1){
        fftw_cleanup_threads();
        fftwf_cleanup_threads();
    }
    MPI_Finalize();
    return EXIT_SUCCESS;
}
"#;

/// Comment block opening every generated file.
pub fn version_banner(version: &str) -> String {
    format!(
        "/***********************************************************************\n\
         * this code automatically generated by simlaunch\n\
         * version {version}\n\
         ***********************************************************************/\n\n\n"
    )
}

/// Statements printing the banner from rank 0 on both output streams.
pub fn banner_echo(banner: &str) -> String {
    let escaped = banner.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n");
    ["cout", "cerr"]
        .iter()
        .map(|stream| {
            format!("        if (myrank == 0) std::{stream} << \"{escaped}\" << std::endl;\n")
        })
        .collect()
}
