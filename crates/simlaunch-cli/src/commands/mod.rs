//! CLI command implementations.

pub mod assemble;
pub mod common;
pub mod host;
pub mod init;
pub mod launch;
pub mod version;
