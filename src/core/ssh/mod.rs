mod client;

pub use client::{execute_local_command, is_local_host, CommandOutput, SshClient};

use crate::error::Result;

/// Runs one shell command on the deploy target.
///
/// Implementations report a non-zero exit as an error; callers do not
/// inspect exit codes themselves.
pub trait RemoteShell {
    fn run(&self, command: &str) -> Result<CommandOutput>;
}
