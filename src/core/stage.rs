//! Stage domain model

use crate::core::{config::StageConfig, definitions::Definitions, state::StageState};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// A single external program run by the pipeline
#[derive(Debug, Clone)]
pub struct Stage {
    /// Unique stage identifier
    pub id: String,

    /// Human-readable stage name
    pub name: String,

    /// Optional description
    pub description: Option<String>,

    /// Executable to launch
    pub program: String,

    /// Arguments passed to the executable
    pub args: Vec<String>,

    /// Extra environment for this stage only (overrides definitions)
    pub env: BTreeMap<String, String>,

    /// Working directory (None = runner's base directory)
    pub working_dir: Option<PathBuf>,

    /// Kill the stage after this long
    pub timeout: Option<Duration>,

    /// A failure of this stage is logged but does not fail the pipeline
    pub allow_failure: bool,

    /// Runtime state
    pub state: StageState,
}

impl Stage {
    /// Create a stage that runs `program` with no arguments
    pub fn new(id: impl Into<String>, name: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            program: program.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            working_dir: None,
            timeout: None,
            allow_failure: false,
            state: StageState::Pending,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn allow_failure(mut self, allow: bool) -> Self {
        self.allow_failure = allow;
        self
    }

    /// Create a stage from its YAML configuration
    pub fn from_config(config: &StageConfig) -> Self {
        Stage {
            id: config.id.clone(),
            name: config.name.clone().unwrap_or_else(|| config.id.clone()),
            description: config.description.clone(),
            program: config.program.clone(),
            args: config.args.clone(),
            env: config.env.clone(),
            working_dir: config.working_dir.clone(),
            timeout: config.timeout_secs.map(Duration::from_secs),
            allow_failure: config.allow_failure,
            state: StageState::Pending,
        }
    }

    /// The environment this stage adds on top of the inherited one.
    ///
    /// Definitions come first and stage overrides win on conflicting keys.
    pub fn environment(&self, definitions: &Definitions) -> BTreeMap<String, String> {
        let mut env: BTreeMap<String, String> = definitions
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        env.extend(self.env.iter().map(|(k, v)| (k.clone(), v.clone())));
        env
    }

    /// Command line for display, e.g. `python process_images.py`
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
