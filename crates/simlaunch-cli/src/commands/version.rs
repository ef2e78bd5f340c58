//! Version command implementation.

use console::style;

/// Execute the version command.
pub fn execute() {
    let version = env!("CARGO_PKG_VERSION");

    println!(
        "{} {} - simulation job chains for HPC clusters",
        style("simlaunch").cyan().bold(),
        style(format!("v{version}")).yellow()
    );
    println!();
    println!("Components:");
    println!("  simlaunch-codegen  Parameters, state file, source assembly, build cache");
    println!("  simlaunch-sched    Partitioning, batch scripts, job chains");
    println!("  simlaunch-cli      Command-line interface");
    println!();
    println!("Hosts:      pc, cluster (Grid Engine), SLURM, IBMLoadLeveler");
    println!("License:    {}", style("GPL-3.0-or-later").dim());
}
