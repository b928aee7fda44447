//! Execution state models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Overall pipeline execution status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    /// Pipeline has not started
    Pending,
    /// Pipeline is currently running
    Running,
    /// Every stage succeeded (or failed with `allow_failure`)
    Completed,
    /// At least one stage failed
    Failed,
    /// Run was interrupted by the operator
    Cancelled,
}

/// What to do with the remaining stages after a stage fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop at the first failing stage and skip the rest
    #[default]
    Abort,
    /// Keep launching stages; the run still ends as failed
    Continue,
}

/// State of a single stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageState {
    /// Stage has not run yet
    Pending,
    /// Stage process is running
    Running { started_at: DateTime<Utc> },
    /// Stage process exited with status 0
    Succeeded {
        exit_code: i32,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    },
    /// Stage failed to spawn, timed out or exited non-zero
    Failed {
        /// None when the process never produced an exit code (signal, spawn error, timeout)
        exit_code: Option<i32>,
        error: String,
        /// Failure did not count against the pipeline
        tolerated: bool,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    },
    /// Stage was not launched
    Skipped { reason: String },
}

impl StageState {
    /// Check if stage is in a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StageState::Succeeded { .. } | StageState::Failed { .. } | StageState::Skipped { .. }
        )
    }

    /// A failure that counts against the pipeline
    pub fn is_hard_failure(&self) -> bool {
        matches!(self, StageState::Failed { tolerated: false, .. })
    }
}

/// Overall pipeline state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineState {
    /// Unique execution ID
    pub execution_id: Uuid,

    /// Current execution status
    pub status: ExecutionStatus,

    /// When execution started
    pub started_at: Option<DateTime<Utc>>,

    /// When execution finished
    pub completed_at: Option<DateTime<Utc>>,

    /// Total number of stages
    pub total_stages: usize,

    /// Number of succeeded stages
    pub succeeded_stages: usize,

    /// Number of failed stages (tolerated included)
    pub failed_stages: usize,

    /// Number of skipped stages
    pub skipped_stages: usize,
}

impl PipelineState {
    pub fn new() -> Self {
        Self {
            execution_id: Uuid::new_v4(),
            status: ExecutionStatus::Pending,
            started_at: None,
            completed_at: None,
            total_stages: 0,
            succeeded_stages: 0,
            failed_stages: 0,
            skipped_stages: 0,
        }
    }

    /// Mark pipeline as started
    pub fn start(&mut self, total_stages: usize) {
        self.status = ExecutionStatus::Running;
        self.started_at = Some(Utc::now());
        self.total_stages = total_stages;
    }

    /// Mark pipeline as finished with the given status
    pub fn finish(&mut self, status: ExecutionStatus) {
        self.status = status;
        self.completed_at = Some(Utc::now());
    }

    /// Recount stage outcomes
    pub fn update_counts(&mut self, stages: &[crate::core::Stage]) {
        self.total_stages = stages.len();
        self.succeeded_stages = stages
            .iter()
            .filter(|s| matches!(s.state, StageState::Succeeded { .. }))
            .count();
        self.failed_stages = stages
            .iter()
            .filter(|s| matches!(s.state, StageState::Failed { .. }))
            .count();
        self.skipped_stages = stages
            .iter()
            .filter(|s| matches!(s.state, StageState::Skipped { .. }))
            .count();
    }
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::new()
    }
}
