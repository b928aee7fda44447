//! Pipeline configuration from YAML

use crate::core::{state::FailurePolicy, Pipeline};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;

/// Interpreter used by the built-in pipeline
pub const DEFAULT_PYTHON: &str = "python";

/// Scripts of the built-in pipeline, in execution order: (id, name, script)
pub const BUILTIN_STAGES: [(&str, &str, &str); 4] = [
    ("process-images", "Image processing", "process_images.py"),
    ("vision-translate", "Vision translation", "googlevision-translater.py"),
    ("note-translate", "Note translation", "gpt4-note-translater.py"),
    ("export-responses", "Export responses", "export_responses.py"),
];

/// Errors raised while loading or validating a pipeline file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read pipeline file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid pipeline YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Pipeline '{0}' has no stages")]
    NoStages(String),

    #[error("Duplicate stage ID: {0}")]
    DuplicateStage(String),

    #[error("Invalid stage ID '{0}' (use letters, digits, '-' and '_')")]
    InvalidStageId(String),

    #[error("Stage '{0}' has an empty program")]
    EmptyProgram(String),

    #[error("Stage '{0}' has a zero timeout")]
    ZeroTimeout(String),
}

/// Top-level pipeline configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Pipeline name
    pub name: String,

    /// Optional description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// What happens to later stages when one fails
    #[serde(default)]
    pub failure_policy: FailurePolicy,

    /// Stages, run in the order they are listed
    pub stages: Vec<StageConfig>,
}

/// Stage configuration as defined in YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageConfig {
    /// Unique stage identifier
    pub id: String,

    /// Human-readable name (defaults to the id)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Executable to launch
    pub program: String,

    #[serde(default)]
    pub args: Vec<String>,

    /// Extra environment for this stage, applied over the definitions file
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Log a failure of this stage instead of failing the pipeline
    #[serde(default)]
    pub allow_failure: bool,
}

fn stage_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("static regex"))
}

impl PipelineConfig {
    /// Load pipeline configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Parse pipeline configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// The four-stage notes pipeline, each stage run as `<python> <script>`.
    ///
    /// A failed export only produces a warning.
    pub fn builtin(python: &str) -> Self {
        let stages = BUILTIN_STAGES
            .iter()
            .map(|(id, name, script)| StageConfig {
                id: id.to_string(),
                name: Some(name.to_string()),
                description: None,
                program: python.to_string(),
                args: vec![script.to_string()],
                env: BTreeMap::new(),
                working_dir: None,
                timeout_secs: None,
                allow_failure: *id == "export-responses",
            })
            .collect();

        PipelineConfig {
            name: "Handwritten notes".to_string(),
            description: Some("Resize scans, extract text, transcribe with an LLM, export markdown".to_string()),
            failure_policy: FailurePolicy::Abort,
            stages,
        }
    }

    /// Validate the pipeline configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stages.is_empty() {
            return Err(ConfigError::NoStages(self.name.clone()));
        }

        let mut seen_ids = HashSet::new();
        for stage in &self.stages {
            if !stage_id_pattern().is_match(&stage.id) {
                return Err(ConfigError::InvalidStageId(stage.id.clone()));
            }
            if !seen_ids.insert(&stage.id) {
                return Err(ConfigError::DuplicateStage(stage.id.clone()));
            }
            if stage.program.trim().is_empty() {
                return Err(ConfigError::EmptyProgram(stage.id.clone()));
            }
            if stage.timeout_secs == Some(0) {
                return Err(ConfigError::ZeroTimeout(stage.id.clone()));
            }
        }

        Ok(())
    }

    /// Convert config to a Pipeline domain model
    pub fn to_pipeline(&self) -> Pipeline {
        Pipeline::from_config(self)
    }
}
