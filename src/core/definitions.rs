//! Definitions file loading
//!
//! A definitions file is a `.env`-style list of `KEY=value` assignments. Every
//! entry is handed to each stage as an environment variable. The values are held
//! in an explicit [`Definitions`] object instead of being written into this
//! process's own environment.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors raised while loading a definitions file
#[derive(Debug, Error)]
pub enum DefinitionsError {
    #[error("Definitions file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Failed to read definitions file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid definition in {} at line {line}: {content}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        content: String,
    },
}

/// Configuration values exported to every stage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Definitions {
    source: Option<PathBuf>,
    values: BTreeMap<String, String>,
}

impl Definitions {
    /// Load definitions from a `.env`-style file.
    ///
    /// A key assigned twice keeps its last value.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, DefinitionsError> {
        let path = path.as_ref();

        let iter = dotenvy::from_path_iter(path).map_err(|e| Self::map_error(path, e))?;

        let mut values = BTreeMap::new();
        for item in iter {
            let (key, value) = item.map_err(|e| Self::map_error(path, e))?;
            values.insert(key, value);
        }

        debug!("Loaded {} definitions from {}", values.len(), path.display());

        Ok(Self {
            source: Some(path.to_path_buf()),
            values,
        })
    }

    /// Build definitions from in-memory pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            source: None,
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    fn map_error(path: &Path, error: dotenvy::Error) -> DefinitionsError {
        match error {
            dotenvy::Error::Io(source) if source.kind() == std::io::ErrorKind::NotFound => {
                DefinitionsError::NotFound {
                    path: path.to_path_buf(),
                }
            }
            dotenvy::Error::Io(source) => DefinitionsError::Io {
                path: path.to_path_buf(),
                source,
            },
            dotenvy::Error::LineParse(content, index) => DefinitionsError::Parse {
                path: path.to_path_buf(),
                line: Self::line_of(path, &content).unwrap_or(index),
                content,
            },
            other => DefinitionsError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidData, other.to_string()),
            },
        }
    }

    // dotenvy reports the byte offset inside the line, not the line number
    fn line_of(path: &Path, content: &str) -> Option<usize> {
        let text = std::fs::read_to_string(path).ok()?;
        text.lines()
            .position(|l| l.trim_end() == content.trim_end())
            .map(|i| i + 1)
    }

    /// File the definitions were loaded from, if any
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Render the definitions as `KEY=****` lines, safe to print
    pub fn masked(&self) -> Vec<String> {
        self.values
            .iter()
            .map(|(k, v)| {
                if v.is_empty() {
                    format!("{}=", k)
                } else {
                    format!("{}=****", k)
                }
            })
            .collect()
    }
}
