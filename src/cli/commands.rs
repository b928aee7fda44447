//! CLI command definitions

use crate::core::config::{ConfigError, PipelineConfig, DEFAULT_PYTHON};
use crate::core::FailurePolicy;
use clap::Args;
use std::path::{Path, PathBuf};

/// Load definitions and run every stage
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Definitions file exported to every stage
    #[arg(short, long, default_value = ".env")]
    pub env_file: PathBuf,

    /// Pipeline YAML file (defaults to the built-in notes pipeline)
    #[arg(short, long)]
    pub pipeline: Option<PathBuf>,

    /// What to do after a stage fails (overrides the pipeline file)
    #[arg(long, value_enum)]
    pub policy: Option<PolicyArg>,

    /// Specific stage to start from, earlier stages are skipped
    #[arg(long)]
    pub from_stage: Option<String>,

    /// Print the plan without launching anything
    #[arg(long)]
    pub dry_run: bool,

    /// Interpreter for the built-in pipeline's scripts
    #[arg(long, default_value = DEFAULT_PYTHON)]
    pub python: String,
}

/// Validate a pipeline file
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Pipeline YAML file (defaults to the built-in notes pipeline)
    #[arg(short, long)]
    pub pipeline: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// List the stages in execution order
#[derive(Debug, Args, Clone)]
pub struct StagesCommand {
    /// Pipeline YAML file (defaults to the built-in notes pipeline)
    #[arg(short, long)]
    pub pipeline: Option<PathBuf>,

    /// Interpreter for the built-in pipeline's scripts
    #[arg(long, default_value = DEFAULT_PYTHON)]
    pub python: String,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Failure policy argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum PolicyArg {
    /// Stop at the first failing stage
    Abort,
    /// Run every stage regardless of failures
    Continue,
}

impl From<PolicyArg> for FailurePolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Abort => FailurePolicy::Abort,
            PolicyArg::Continue => FailurePolicy::Continue,
        }
    }
}

/// Load the pipeline file if one was given, else the built-in pipeline
pub fn load_pipeline_config(path: Option<&Path>, python: &str) -> Result<PipelineConfig, ConfigError> {
    match path {
        Some(path) => PipelineConfig::from_file(path),
        None => Ok(PipelineConfig::builtin(python)),
    }
}
