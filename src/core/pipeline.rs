//! Pipeline domain model

use crate::core::{
    config::PipelineConfig,
    stage::Stage,
    state::{ExecutionStatus, FailurePolicy, PipelineState, StageState},
};

/// Exit status reported when the operator interrupts a run
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// An ordered list of stages and the state of one run over them
#[derive(Debug, Clone)]
pub struct Pipeline {
    /// Pipeline name
    pub name: String,

    /// Stages in execution order
    pub stages: Vec<Stage>,

    /// What happens to later stages when one fails
    pub failure_policy: FailurePolicy,

    /// Execution state
    pub state: PipelineState,
}

impl Pipeline {
    /// Create a pipeline from configuration
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            config.name.clone(),
            config.stages.iter().map(Stage::from_config).collect(),
            config.failure_policy,
        )
    }

    pub fn new(name: impl Into<String>, stages: Vec<Stage>, failure_policy: FailurePolicy) -> Self {
        Pipeline {
            name: name.into(),
            stages,
            failure_policy,
            state: PipelineState::new(),
        }
    }

    /// Get a stage by ID
    pub fn stage(&self, id: &str) -> Option<&Stage> {
        self.stages.iter().find(|s| s.id == id)
    }

    /// Position of a stage in execution order
    pub fn position(&self, id: &str) -> Option<usize> {
        self.stages.iter().position(|s| s.id == id)
    }

    /// Check if every stage reached a terminal state
    pub fn is_complete(&self) -> bool {
        self.stages.iter().all(|s| s.state.is_terminal())
    }

    /// Check if any stage failed in a way that counts against the run
    pub fn has_failed(&self) -> bool {
        self.stages.iter().any(|s| s.state.is_hard_failure())
    }

    /// Process exit status for this run.
    ///
    /// Zero unless a stage failed without `allow_failure`. On failure it is the exit
    /// code of the last such stage (under `Abort` that is the only one), or 1 when the
    /// stage has no exit code of its own.
    pub fn exit_code(&self) -> i32 {
        if self.state.status == ExecutionStatus::Cancelled {
            return INTERRUPTED_EXIT_CODE;
        }

        self.stages
            .iter()
            .rev()
            .find_map(|s| match &s.state {
                StageState::Failed {
                    exit_code,
                    tolerated: false,
                    ..
                } => Some(match exit_code {
                    Some(code) if *code != 0 => *code,
                    _ => 1,
                }),
                _ => None,
            })
            .unwrap_or(0)
    }
}
