//! Test utility functions for notepipe
#![allow(dead_code)]

use notepipe::core::config::PipelineConfig;
use notepipe::core::{Definitions, ExecutionStatus, Pipeline, Stage, StageState};
use notepipe::execution::{ExecutionEngine, RunnerError, StageOutcome, StageRunner};

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;

/// What a mock stage does when run
#[derive(Debug, Clone)]
pub enum MockBehavior {
    Exit(i32),
    Signal,
    SpawnError,
}

/// One recorded stage invocation
#[derive(Debug, Clone)]
pub struct Invocation {
    pub stage_id: String,
    pub env: BTreeMap<String, String>,
}

/// Mock runner that records invocations instead of spawning processes
#[derive(Clone, Default)]
pub struct MockRunner {
    behaviors: Arc<HashMap<String, MockBehavior>>,
    invocations: Arc<Mutex<Vec<Invocation>>>,
    /// start/end markers, used to check stages never overlap
    timeline: Arc<Mutex<Vec<String>>>,
    simulate_delay: Option<Duration>,
    /// Fires when the named stage exits
    interrupt_after: Option<(String, Arc<Mutex<Option<oneshot::Sender<()>>>>)>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_behavior(mut self, stage_id: &str, behavior: MockBehavior) -> Self {
        Arc::make_mut(&mut self.behaviors).insert(stage_id.to_string(), behavior);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.simulate_delay = Some(delay);
        self
    }

    /// Send on `interrupt` as `stage_id` exits, like a Ctrl-C that reaches the
    /// child and the orchestrator together
    pub fn with_interrupt_after(mut self, stage_id: &str, interrupt: oneshot::Sender<()>) -> Self {
        self.interrupt_after = Some((stage_id.to_string(), Arc::new(Mutex::new(Some(interrupt)))));
        self
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().unwrap().clone()
    }

    pub fn invoked_ids(&self) -> Vec<String> {
        self.invocations().into_iter().map(|i| i.stage_id).collect()
    }

    pub fn timeline(&self) -> Vec<String> {
        self.timeline.lock().unwrap().clone()
    }
}

#[async_trait]
impl StageRunner for MockRunner {
    async fn run(&self, stage: &Stage, definitions: &Definitions) -> Result<StageOutcome, RunnerError> {
        self.timeline.lock().unwrap().push(format!("start:{}", stage.id));
        self.invocations.lock().unwrap().push(Invocation {
            stage_id: stage.id.clone(),
            env: stage.environment(definitions),
        });

        if let Some(delay) = self.simulate_delay {
            tokio::time::sleep(delay).await;
        }

        self.timeline.lock().unwrap().push(format!("end:{}", stage.id));

        if let Some((trigger, interrupt)) = &self.interrupt_after {
            if *trigger == stage.id {
                if let Some(tx) = interrupt.lock().unwrap().take() {
                    let _ = tx.send(());
                }
            }
        }

        match self.behaviors.get(&stage.id).cloned().unwrap_or(MockBehavior::Exit(0)) {
            MockBehavior::Exit(code) => Ok(StageOutcome {
                exit_code: Some(code),
                duration: Duration::from_millis(1),
            }),
            MockBehavior::Signal => Ok(StageOutcome {
                exit_code: None,
                duration: Duration::from_millis(1),
            }),
            MockBehavior::SpawnError => Err(RunnerError::Spawn {
                program: stage.program.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
            }),
        }
    }
}

/// Test result from running a pipeline
#[derive(Debug, Clone)]
pub struct PipelineTestResult {
    pub pipeline: Pipeline,
    pub status: ExecutionStatus,
}

impl PipelineTestResult {
    pub fn is_success(&self) -> bool {
        matches!(self.status, ExecutionStatus::Completed)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, ExecutionStatus::Failed)
    }

    pub fn get_stage_state(&self, stage_id: &str) -> &StageState {
        &self
            .pipeline
            .stage(stage_id)
            .unwrap_or_else(|| panic!("Stage '{}' not found in result", stage_id))
            .state
    }

    pub fn exit_code(&self) -> i32 {
        self.pipeline.exit_code()
    }
}

/// Run a pipeline against a mock runner
pub async fn run_with_mock(
    pipeline: &mut Pipeline,
    runner: MockRunner,
    definitions: &Definitions,
) -> PipelineTestResult {
    let engine = ExecutionEngine::new(runner);
    let status = engine
        .execute(pipeline, definitions)
        .await
        .expect("engine should start");

    PipelineTestResult {
        pipeline: pipeline.clone(),
        status,
    }
}

/// Parse a pipeline from YAML string
pub fn pipeline_from_yaml(yaml: &str) -> Pipeline {
    PipelineConfig::from_yaml(yaml)
        .unwrap_or_else(|e| panic!("Failed to parse pipeline YAML: {}", e))
        .to_pipeline()
}

/// The built-in four-stage notes pipeline
pub fn notes_pipeline() -> Pipeline {
    PipelineConfig::builtin("python").to_pipeline()
}

/// IDs of the built-in stages in order
pub const NOTES_STAGES: [&str; 4] = [
    "process-images",
    "vision-translate",
    "note-translate",
    "export-responses",
];

pub fn assert_stage_succeeded(result: &PipelineTestResult, stage_id: &str) {
    let state = result.get_stage_state(stage_id);
    assert!(
        matches!(state, StageState::Succeeded { .. }),
        "Stage '{}' should have succeeded, but was in state: {:?}",
        stage_id,
        state
    );
}

pub fn assert_stage_failed(result: &PipelineTestResult, stage_id: &str, expected_error: &str) {
    let state = result.get_stage_state(stage_id);
    match state {
        StageState::Failed { error, .. } => assert!(
            error.contains(expected_error),
            "Stage '{}' error:\n{}\n\ndoes not contain:\n{}",
            stage_id,
            error,
            expected_error
        ),
        other => panic!("Stage '{}' should have failed, but was in state: {:?}", stage_id, other),
    }
}

pub fn assert_stage_skipped(result: &PipelineTestResult, stage_id: &str, expected_reason: &str) {
    let state = result.get_stage_state(stage_id);
    match state {
        StageState::Skipped { reason } => assert!(
            reason.contains(expected_reason),
            "Stage '{}' skipped for '{}', expected '{}'",
            stage_id,
            reason,
            expected_reason
        ),
        other => panic!("Stage '{}' should have been skipped, but was in state: {:?}", stage_id, other),
    }
}

/// Assert stages never overlapped and started in the given order
pub fn assert_sequential(runner: &MockRunner, expected_order: &[&str]) {
    let expected: Vec<String> = expected_order
        .iter()
        .flat_map(|id| [format!("start:{}", id), format!("end:{}", id)])
        .collect();
    assert_eq!(runner.timeline(), expected);
}
