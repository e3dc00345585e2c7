use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::StepError;

/// External programs the pipeline shells out to.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs to completion with inherited stdio, failing on a non-zero exit.
    async fn run(&self, program: &str, args: &[&str], dir: &Path) -> Result<(), StepError>;

    /// Trimmed stdout of a successful run, `None` if it could not run or failed.
    async fn output(&self, program: &str, args: &[&str], dir: &Path) -> Option<String>;
}

pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, program: &str, args: &[&str], dir: &Path) -> Result<(), StepError> {
        let command = format!("{program} {}", args.join(" "));
        info!("Running `{command}`");

        let status = Command::new(program)
            .args(args)
            .current_dir(dir)
            .status()
            .await
            .map_err(|source| StepError::Spawn {
                program: program.to_string(),
                source,
            })?;

        if !status.success() {
            return Err(StepError::Command {
                command,
                status: status.to_string(),
            });
        }

        Ok(())
    }

    async fn output(&self, program: &str, args: &[&str], dir: &Path) -> Option<String> {
        let output = Command::new(program)
            .args(args)
            .current_dir(dir)
            .output()
            .await
            .ok()?;

        if !output.status.success() {
            debug!("`{program}` exited with {}", output.status);
            return None;
        }

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        (!stdout.is_empty()).then_some(stdout)
    }
}
