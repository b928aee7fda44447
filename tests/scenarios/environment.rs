//! Test: Environment - definitions reach every stage

use crate::helpers::*;
use notepipe::core::Definitions;
use std::io::Write;

#[tokio::test]
async fn test_api_key_visible_to_all_stages() {
    let mut env_file = tempfile::Builder::new().suffix(".env").tempfile().unwrap();
    writeln!(env_file, "API_KEY=abc123").unwrap();
    let definitions = Definitions::from_file(env_file.path()).unwrap();

    let mut pipeline = notes_pipeline();
    let runner = MockRunner::new();
    run_with_mock(&mut pipeline, runner.clone(), &definitions).await;

    let invocations = runner.invocations();
    assert_eq!(invocations.len(), 4);
    for invocation in invocations {
        assert_eq!(
            invocation.env.get("API_KEY").map(String::as_str),
            Some("abc123"),
            "stage {} did not see API_KEY",
            invocation.stage_id
        );
    }
}

#[tokio::test]
async fn test_stage_env_overrides_only_that_stage() {
    let yaml = r#"
name: "Test: Stage Env"
stages:
  - id: "vision"
    program: "python"
    env:
      GOOGLE_APPLICATION_CREDENTIALS: "/etc/vision.json"
  - id: "notes"
    program: "python"
"#;
    let definitions = Definitions::from_pairs([
        ("GOOGLE_APPLICATION_CREDENTIALS", "default.json"),
        ("OPENAI_API_KEY", "sk-test"),
    ]);
    let mut pipeline = pipeline_from_yaml(yaml);
    let runner = MockRunner::new();
    run_with_mock(&mut pipeline, runner.clone(), &definitions).await;

    let invocations = runner.invocations();
    assert_eq!(
        invocations[0].env.get("GOOGLE_APPLICATION_CREDENTIALS").map(String::as_str),
        Some("/etc/vision.json")
    );
    assert_eq!(
        invocations[1].env.get("GOOGLE_APPLICATION_CREDENTIALS").map(String::as_str),
        Some("default.json")
    );
    assert!(invocations.iter().all(|i| i.env.get("OPENAI_API_KEY").map(String::as_str) == Some("sk-test")));
}

#[tokio::test]
async fn test_definitions_do_not_leak_into_own_environment() {
    let definitions = Definitions::from_pairs([("NOTEPIPE_LEAK_CHECK", "1")]);
    let mut pipeline = notes_pipeline();
    run_with_mock(&mut pipeline, MockRunner::new(), &definitions).await;

    assert!(std::env::var("NOTEPIPE_LEAK_CHECK").is_err());
}
