//! Running window-manager CLIs

use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::trace;

use super::ProviderError;

/// Executes a program and returns its standard output
///
/// Backends go through this trait so their query and command logic can be
/// exercised against scripted output.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, program: &str, args: &[&str]) -> Result<String, ProviderError>;
}

/// Runs commands as child processes with an upper bound on their runtime
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    timeout: Duration,
}

impl ProcessRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<String, ProviderError> {
        trace!(program, ?args, "Running command");

        let child = Command::new(program)
            .args(args)
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, child)
            .await
            .map_err(|_| ProviderError::Timeout {
                program: program.to_string(),
                timeout: self.timeout,
            })?
            .map_err(|source| ProviderError::SpawnFailed {
                program: program.to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(ProviderError::CommandFailed {
                program: program.to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        String::from_utf8(output.stdout).map_err(|_| ProviderError::InvalidOutput {
            program: program.to_string(),
        })
    }
}
