//! Stage runner - launches a stage as a child process

use crate::core::{Definitions, Stage};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

/// Error types for launching a stage
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("Failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed waiting for '{program}': {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Timeout after {0:?}")]
    Timeout(Duration),
}

/// Result of a stage process that ran to exit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageOutcome {
    /// Exit code, None if the process was killed by a signal
    pub exit_code: Option<i32>,

    /// Wall-clock time from spawn to exit
    pub duration: Duration,
}

impl StageOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Trait for running a stage - allows for different implementations
#[async_trait]
pub trait StageRunner: Send + Sync {
    /// Run the stage to completion with the definitions in its environment
    async fn run(&self, stage: &Stage, definitions: &Definitions) -> Result<StageOutcome, RunnerError>;
}

/// Runs stages as real child processes
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    /// Working directory for stages that don't set their own
    base_dir: Option<PathBuf>,
}

impl ProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    fn build_command(&self, stage: &Stage, definitions: &Definitions) -> Command {
        let mut cmd = Command::new(&stage.program);
        cmd.args(&stage.args);

        // Inherited environment stays; definitions and stage overrides go on top
        let env = stage.environment(definitions);
        debug!(stage = %stage.id, vars = env.len(), "Exporting definitions to stage");
        cmd.envs(&env);

        if let Some(dir) = stage.working_dir.as_ref().or(self.base_dir.as_ref()) {
            cmd.current_dir(dir);
        }

        cmd.stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        cmd
    }
}

#[async_trait]
impl StageRunner for ProcessRunner {
    async fn run(&self, stage: &Stage, definitions: &Definitions) -> Result<StageOutcome, RunnerError> {
        debug!("Spawning stage {}: {}", stage.id, stage.command_line());

        let start = Instant::now();
        let mut child = self
            .build_command(stage, definitions)
            .spawn()
            .map_err(|source| RunnerError::Spawn {
                program: stage.program.clone(),
                source,
            })?;

        let status = match stage.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                Ok(status) => status,
                Err(_) => {
                    warn!("Stage {} timed out after {:?}, killing it", stage.id, limit);
                    if let Err(e) = child.kill().await {
                        warn!("Failed to kill stage {}: {}", stage.id, e);
                    }
                    return Err(RunnerError::Timeout(limit));
                }
            },
            None => child.wait().await,
        }
        .map_err(|source| RunnerError::Wait {
            program: stage.program.clone(),
            source,
        })?;

        Ok(StageOutcome {
            exit_code: status.code(),
            duration: start.elapsed(),
        })
    }
}
