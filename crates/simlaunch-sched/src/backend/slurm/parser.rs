//! Parsers for Slurm command output.

use crate::error::{SchedError, SchedResult};

/// Parse sbatch output to extract the job id.
///
/// The id is the last whitespace-separated token, e.g.
/// `Submitted batch job 12345`, or `12345;cluster` with `--parsable`.
pub fn parse_sbatch_output(output: &str) -> SchedResult<u64> {
    let trimmed = output.trim();
    trimmed
        .split_whitespace()
        .last()
        .and_then(|token| token.split(';').next())
        .filter(|id| !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()))
        .and_then(|id| id.parse().ok())
        .ok_or_else(|| SchedError::UnparseableJobId {
            command: "sbatch".to_string(),
            output: trimmed.to_string(),
        })
}
