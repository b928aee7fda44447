//! notepipe - batch orchestrator for the handwritten notes pipeline

pub mod cli;
pub mod core;
pub mod execution;

// Re-export commonly used types
pub use core::{Definitions, DefinitionsError, ExecutionStatus, FailurePolicy, Pipeline, Stage, StageState};
pub use execution::{ExecutionEngine, ExecutionEvent, ProcessRunner, StageOutcome, StageRunner};
