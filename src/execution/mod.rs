//! Pipeline execution engine

pub mod engine;
pub mod runner;

pub use engine::{EngineError, EventHandler, ExecutionEngine, ExecutionEvent};
pub use runner::{ProcessRunner, RunnerError, StageOutcome, StageRunner};
