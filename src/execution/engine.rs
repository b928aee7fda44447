//! Main execution engine - runs the stages of a pipeline one after another

use crate::{
    core::{Definitions, ExecutionStatus, FailurePolicy, Pipeline, StageState},
    execution::runner::{RunnerError, StageOutcome, StageRunner},
};
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Events that can occur during pipeline execution
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    PipelineStarted {
        execution_id: Uuid,
        pipeline_name: String,
        total_stages: usize,
    },
    StageStarted {
        stage_id: String,
        name: String,
        /// 1-based position in the pipeline
        position: usize,
        total: usize,
        command: String,
    },
    StageSucceeded {
        stage_id: String,
        duration: Duration,
    },
    StageFailed {
        stage_id: String,
        error: String,
        tolerated: bool,
    },
    StageSkipped {
        stage_id: String,
        reason: String,
    },
    PipelineFinished {
        execution_id: Uuid,
        status: ExecutionStatus,
        exit_code: i32,
    },
}

/// Errors that prevent a run from starting
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Unknown start stage '{0}'")]
    UnknownStartStage(String),

    #[error("Pipeline '{0}' has already been executed")]
    AlreadyExecuted(String),
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(&ExecutionEvent) + Send + Sync>;

const SKIP_BEFORE_START: &str = "before start stage";
const SKIP_AFTER_FAILURE: &str = "previous stage failed";
const SKIP_INTERRUPTED: &str = "interrupted";

/// Sequential pipeline execution engine
pub struct ExecutionEngine<R> {
    runner: R,
    start_stage: Option<String>,
    event_handlers: Vec<EventHandler>,
}

impl<R: StageRunner> ExecutionEngine<R> {
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            start_stage: None,
            event_handlers: Vec::new(),
        }
    }

    /// Skip every stage before `stage_id`
    pub fn with_start_stage(mut self, stage_id: impl Into<String>) -> Self {
        self.start_stage = Some(stage_id.into());
        self
    }

    /// Add an event handler
    pub fn add_event_handler<F>(&mut self, handler: F)
    where
        F: Fn(&ExecutionEvent) + Send + Sync + 'static,
    {
        self.event_handlers.push(Arc::new(handler));
    }

    fn emit_event(&self, event: ExecutionEvent) {
        for handler in &self.event_handlers {
            handler(&event);
        }
    }

    /// Execute the entire pipeline
    pub async fn execute(
        &self,
        pipeline: &mut Pipeline,
        definitions: &Definitions,
    ) -> Result<ExecutionStatus, EngineError> {
        self.execute_until(pipeline, definitions, std::future::pending::<()>())
            .await
    }

    /// Execute the pipeline until it finishes or `interrupt` resolves.
    ///
    /// On interrupt the running stage is killed and the rest are skipped.
    pub async fn execute_until<F>(
        &self,
        pipeline: &mut Pipeline,
        definitions: &Definitions,
        interrupt: F,
    ) -> Result<ExecutionStatus, EngineError>
    where
        F: Future<Output = ()>,
    {
        if pipeline.state.status != ExecutionStatus::Pending {
            return Err(EngineError::AlreadyExecuted(pipeline.name.clone()));
        }

        let start_index = match &self.start_stage {
            Some(id) => pipeline
                .position(id)
                .ok_or_else(|| EngineError::UnknownStartStage(id.clone()))?,
            None => 0,
        };

        let execution_id = pipeline.state.execution_id;
        let total = pipeline.stages.len();

        info!("Starting pipeline execution: {} ({})", pipeline.name, execution_id);
        pipeline.state.start(total);
        self.emit_event(ExecutionEvent::PipelineStarted {
            execution_id,
            pipeline_name: pipeline.name.clone(),
            total_stages: total,
        });

        tokio::pin!(interrupt);
        let mut halted: Option<&'static str> = None;

        for index in 0..total {
            if index < start_index {
                self.skip_stage(pipeline, index, SKIP_BEFORE_START);
                continue;
            }
            if let Some(reason) = halted {
                self.skip_stage(pipeline, index, reason);
                continue;
            }

            // An interrupt that landed between stages must not launch the next one
            let interrupted = tokio::select! {
                biased;
                _ = &mut interrupt => true,
                _ = std::future::ready(()) => false,
            };
            if interrupted {
                warn!(stage = %pipeline.stages[index].id, "Interrupted, stopping pipeline");
                halted = Some(SKIP_INTERRUPTED);
                self.skip_stage(pipeline, index, SKIP_INTERRUPTED);
                continue;
            }

            let stage = pipeline.stages[index].clone();
            let started_at = Utc::now();
            pipeline.stages[index].state = StageState::Running { started_at };

            info!(stage = %stage.id, "Starting stage {}/{}: {}", index + 1, total, stage.name);
            self.emit_event(ExecutionEvent::StageStarted {
                stage_id: stage.id.clone(),
                name: stage.name.clone(),
                position: index + 1,
                total,
                command: stage.command_line(),
            });

            let result = tokio::select! {
                biased;
                _ = &mut interrupt => None,
                result = self.runner.run(&stage, definitions) => Some(result),
            };

            match result {
                Some(result) => {
                    let failed = self.record_result(pipeline, index, started_at, result);
                    if failed && pipeline.failure_policy == FailurePolicy::Abort {
                        error!(stage = %stage.id, "Stage failed, aborting remaining stages");
                        halted = Some(SKIP_AFTER_FAILURE);
                    }
                }
                None => {
                    warn!(stage = %stage.id, "Interrupted, stopping pipeline");
                    pipeline.stages[index].state = StageState::Failed {
                        exit_code: None,
                        error: SKIP_INTERRUPTED.to_string(),
                        tolerated: false,
                        started_at,
                        finished_at: Utc::now(),
                    };
                    self.emit_event(ExecutionEvent::StageFailed {
                        stage_id: stage.id.clone(),
                        error: SKIP_INTERRUPTED.to_string(),
                        tolerated: false,
                    });
                    halted = Some(SKIP_INTERRUPTED);
                }
            }
        }

        let status = if halted == Some(SKIP_INTERRUPTED) {
            ExecutionStatus::Cancelled
        } else if pipeline.has_failed() {
            ExecutionStatus::Failed
        } else {
            ExecutionStatus::Completed
        };

        pipeline.state.update_counts(&pipeline.stages);
        pipeline.state.finish(status);
        let exit_code = pipeline.exit_code();

        info!(
            "Pipeline execution finished: {} - {:?} (exit code {})",
            pipeline.name, status, exit_code
        );
        self.emit_event(ExecutionEvent::PipelineFinished {
            execution_id,
            status,
            exit_code,
        });

        Ok(status)
    }

    /// Store a stage result; returns true if it counts as a pipeline failure
    fn record_result(
        &self,
        pipeline: &mut Pipeline,
        index: usize,
        started_at: chrono::DateTime<Utc>,
        result: Result<StageOutcome, RunnerError>,
    ) -> bool {
        let stage = &mut pipeline.stages[index];
        let finished_at = Utc::now();

        let (exit_code, error) = match result {
            Ok(outcome) if outcome.success() => {
                info!(
                    stage = %stage.id,
                    duration_ms = outcome.duration.as_millis() as u64,
                    "Stage completed"
                );
                stage.state = StageState::Succeeded {
                    exit_code: 0,
                    started_at,
                    finished_at,
                };
                self.emit_event(ExecutionEvent::StageSucceeded {
                    stage_id: stage.id.clone(),
                    duration: outcome.duration,
                });
                return false;
            }
            Ok(outcome) => {
                let error = match outcome.exit_code {
                    Some(code) => format!("exited with code {}", code),
                    None => "terminated by signal".to_string(),
                };
                (outcome.exit_code, error)
            }
            Err(e) => (None, e.to_string()),
        };

        let tolerated = stage.allow_failure;
        if tolerated {
            warn!(stage = %stage.id, "Stage {} (failure allowed)", error);
        } else {
            error!(stage = %stage.id, "Stage {}", error);
        }

        stage.state = StageState::Failed {
            exit_code,
            error: error.clone(),
            tolerated,
            started_at,
            finished_at,
        };
        self.emit_event(ExecutionEvent::StageFailed {
            stage_id: stage.id.clone(),
            error,
            tolerated,
        });

        !tolerated
    }

    fn skip_stage(&self, pipeline: &mut Pipeline, index: usize, reason: &str) {
        let stage = &mut pipeline.stages[index];
        info!(stage = %stage.id, "Skipping stage: {}", reason);
        stage.state = StageState::Skipped {
            reason: reason.to_string(),
        };
        self.emit_event(ExecutionEvent::StageSkipped {
            stage_id: stage.id.clone(),
            reason: reason.to_string(),
        });
    }
}
