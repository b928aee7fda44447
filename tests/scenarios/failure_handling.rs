//! Test: Failure Handling - abort and continue policies, tolerated failures

use crate::helpers::*;
use notepipe::core::{Definitions, FailurePolicy};

#[tokio::test]
async fn test_abort_policy_stops_after_first_failure() {
    let mut pipeline = notes_pipeline();
    let runner = MockRunner::new().with_behavior("process-images", MockBehavior::Exit(3));

    let result = run_with_mock(&mut pipeline, runner.clone(), &Definitions::default()).await;

    assert!(result.is_failed());
    assert_eq!(runner.invoked_ids(), vec!["process-images"]);
    assert_stage_failed(&result, "process-images", "exited with code 3");
    for id in &NOTES_STAGES[1..] {
        assert_stage_skipped(&result, id, "previous stage failed");
    }
    assert_eq!(result.exit_code(), 3);
}

#[tokio::test]
async fn test_continue_policy_launches_next_stage() {
    let mut pipeline = notes_pipeline();
    pipeline.failure_policy = FailurePolicy::Continue;
    let runner = MockRunner::new().with_behavior("process-images", MockBehavior::Exit(1));

    let result = run_with_mock(&mut pipeline, runner.clone(), &Definitions::default()).await;

    // Best effort: everything still runs, but the run is reported as failed
    assert_eq!(runner.invoked_ids(), NOTES_STAGES);
    assert!(result.is_failed());
    assert_stage_succeeded(&result, "vision-translate");
    assert_eq!(result.exit_code(), 1);
}

#[tokio::test]
async fn test_continue_policy_reports_last_failure() {
    let mut pipeline = notes_pipeline();
    pipeline.failure_policy = FailurePolicy::Continue;
    let runner = MockRunner::new()
        .with_behavior("process-images", MockBehavior::Exit(2))
        .with_behavior("note-translate", MockBehavior::Exit(7));

    let result = run_with_mock(&mut pipeline, runner, &Definitions::default()).await;

    assert!(result.is_failed());
    assert_eq!(result.exit_code(), 7);
    assert_eq!(result.pipeline.state.failed_stages, 2);
}

#[tokio::test]
async fn test_export_failure_is_only_a_warning() {
    let mut pipeline = notes_pipeline();
    let runner = MockRunner::new().with_behavior("export-responses", MockBehavior::Exit(1));

    let result = run_with_mock(&mut pipeline, runner.clone(), &Definitions::default()).await;

    assert!(result.is_success());
    assert_eq!(runner.invoked_ids(), NOTES_STAGES);
    assert!(matches!(
        result.get_stage_state("export-responses"),
        notepipe::StageState::Failed { tolerated: true, .. }
    ));
    assert_eq!(result.exit_code(), 0);
}

#[tokio::test]
async fn test_spawn_error_counts_as_failure() {
    let mut pipeline = notes_pipeline();
    let runner = MockRunner::new().with_behavior("vision-translate", MockBehavior::SpawnError);

    let result = run_with_mock(&mut pipeline, runner.clone(), &Definitions::default()).await;

    assert!(result.is_failed());
    assert_stage_failed(&result, "vision-translate", "Failed to spawn");
    assert_eq!(runner.invoked_ids(), vec!["process-images", "vision-translate"]);
    assert_eq!(result.exit_code(), 1);
}

#[tokio::test]
async fn test_signal_counts_as_failure() {
    let mut pipeline = notes_pipeline();
    let runner = MockRunner::new().with_behavior("note-translate", MockBehavior::Signal);

    let result = run_with_mock(&mut pipeline, runner, &Definitions::default()).await;

    assert!(result.is_failed());
    assert_stage_failed(&result, "note-translate", "terminated by signal");
    assert_stage_skipped(&result, "export-responses", "previous stage failed");
}
