//! Core domain models
//!
//! This module defines the pipeline, its stages, the definitions handed to
//! every stage, and the state of a run.

pub mod config;
pub mod definitions;
pub mod pipeline;
pub mod stage;
pub mod state;

pub use definitions::*;
pub use pipeline::*;
pub use stage::*;
pub use state::*;
