//! Tests that run the `simlaunch` binary.
//!
//! Launch tests use `pc` hosts in `--no-submit` mode with a prebuilt
//! artifact, so neither a compiler nor MPI is needed.

use std::path::Path;
use std::process::{Command, Output};

fn simlaunch(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_simlaunch"))
        .args(args)
        .env_remove("SIMLAUNCH_CONFIG")
        .output()
        .expect("failed to run simlaunch")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn write_config(dir: &Path, yaml: &str) -> String {
    let path = dir.join("config.yaml");
    std::fs::write(&path, yaml).unwrap();
    path.display().to_string()
}

const PC_CONFIG: &str = r#"
host:
  type: pc
  cores_per_node: 8
toolchain:
  compiler: "false"
  lib_dir: /opt/simlaunch/lib
"#;

#[test]
fn test_version() {
    let output = simlaunch(&["version"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("simlaunch"));
    assert!(stdout(&output).contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_init_writes_state_once() {
    let work = tempfile::tempdir().unwrap();
    let work_dir = work.path().display().to_string();

    let output = simlaunch(&[
        "init",
        "NavierStokes",
        "--work-dir",
        &work_dir,
        "--set",
        "nx=64",
    ]);
    assert!(output.status.success(), "{}", stderr(&output));

    let state = std::fs::read_to_string(work.path().join("test.json")).unwrap();
    assert!(state.contains("\"iteration\": 0") || state.contains("\"iteration\":0"));
    assert!(state.contains("\"nx\": 64") || state.contains("\"nx\":64"));

    let again = simlaunch(&["init", "NavierStokes", "--work-dir", &work_dir]);
    assert!(!again.status.success());
    assert_eq!(again.status.code(), Some(1));
    assert!(stderr(&again).contains("Error:"));
}

#[test]
fn test_init_rejects_bad_assignment() {
    let work = tempfile::tempdir().unwrap();
    let output = simlaunch(&[
        "init",
        "NavierStokes",
        "--work-dir",
        &work.path().display().to_string(),
        "--set",
        "no-equals-sign",
    ]);
    assert!(!output.status.success());
    assert!(!work.path().join("test.json").exists());
}

#[test]
fn test_assemble_writes_source() {
    let work = tempfile::tempdir().unwrap();
    let work_dir = work.path().display().to_string();

    let output = simlaunch(&[
        "assemble",
        "FluidResize",
        "--work-dir",
        &work_dir,
        "--output",
        &work_dir,
    ]);
    assert!(output.status.success(), "{}", stderr(&output));

    let source = std::fs::read_to_string(work.path().join("FluidResize.cpp")).unwrap();
    assert!(source.contains("int main(int argc, char *argv[])"));
    assert!(source.contains("read_parameters"));
}

#[test]
fn test_launch_no_submit_on_pc() {
    let work = tempfile::tempdir().unwrap();
    let work_dir = work.path().display().to_string();
    let config = write_config(work.path(), PC_CONFIG);

    let init = simlaunch(&[
        "init",
        "NavierStokes",
        "--work-dir",
        &work_dir,
        "--set",
        "niter_todo=4",
    ]);
    assert!(init.status.success(), "{}", stderr(&init));

    // Newer than the default install date, so it is reused as is.
    std::fs::write(work.path().join("NavierStokes"), b"#!/bin/true\n").unwrap();

    let output = simlaunch(&[
        "--config",
        &config,
        "launch",
        "NavierStokes",
        "--work-dir",
        &work_dir,
        "--np",
        "2",
        "--ntpp",
        "2",
        "--njobs",
        "2",
        "--no-submit",
    ]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(stdout(&output).contains("Reusing"));
    assert!(stdout(&output).contains("Dry run"));

    let first = std::fs::read_to_string(work.path().join("run_test_0.sh")).unwrap();
    assert!(first.contains("mpirun -np 2 -x OMP_NUM_THREADS=2 ./NavierStokes test"));
    assert!(first.contains("/opt/simlaunch/lib"));
    assert!(work.path().join("run_test_4.sh").exists());
    assert!(!work.path().join("NavierStokes.cpp").exists());
}

#[test]
fn test_launch_without_state_fails() {
    let work = tempfile::tempdir().unwrap();
    let config = write_config(work.path(), PC_CONFIG);

    let output = simlaunch(&[
        "--config",
        &config,
        "launch",
        "NavierStokes",
        "--work-dir",
        &work.path().display().to_string(),
        "--no-submit",
    ]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("simlaunch init"));
}

#[test]
fn test_launch_too_many_threads_fails() {
    let work = tempfile::tempdir().unwrap();
    let work_dir = work.path().display().to_string();
    let config = write_config(work.path(), PC_CONFIG);

    assert!(
        simlaunch(&["init", "NavierStokes", "--work-dir", &work_dir])
            .status
            .success()
    );
    std::fs::write(work.path().join("NavierStokes"), b"").unwrap();

    let output = simlaunch(&[
        "--config",
        &config,
        "launch",
        "NavierStokes",
        "--work-dir",
        &work_dir,
        "--ntpp",
        "16",
        "--no-submit",
    ]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("more threads"));
    assert!(!work.path().join("run_test_0.sh").exists());
}

#[test]
fn test_host_prints_effective_config() {
    let work = tempfile::tempdir().unwrap();
    let config = write_config(work.path(), PC_CONFIG);

    let output = simlaunch(&[
        "--config",
        &config,
        "host",
        "--host-type",
        "SLURM",
        "--environment",
        "general",
    ]);
    assert!(output.status.success(), "{}", stderr(&output));
    let text = stdout(&output);
    assert!(text.contains("type: SLURM"));
    assert!(text.contains("environment: general"));
    assert!(text.contains("cores_per_node: 8"));
}

#[test]
fn test_launch_without_dt_fails_before_build() {
    let work = tempfile::tempdir().unwrap();
    let config = write_config(work.path(), PC_CONFIG);
    std::fs::write(
        work.path().join("test.json"),
        r#"{"iteration": 0, "parameters": {"nx": 64}}"#,
    )
    .unwrap();

    let output = simlaunch(&[
        "--config",
        &config,
        "launch",
        "NavierStokes",
        "--work-dir",
        &work.path().display().to_string(),
        "--no-submit",
    ]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Missing required parameter: dt"));
    assert!(!work.path().join("NavierStokes.cpp").exists());
}
