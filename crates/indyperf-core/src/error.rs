//! Configuration and planning errors.

use std::path::PathBuf;
use thiserror::Error;

/// Problems found while loading the suite, environment and SSO files.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File could not be read
    #[error("Cannot read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File is not valid YAML for its schema
    #[error("Cannot parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Every problem found, reported together
    #[error("Invalid configuration:\n{}", .0.iter().map(|p| format!("  - {}", p)).collect::<Vec<_>>().join("\n"))]
    Invalid(Vec<String>),
}

impl ConfigError {
    /// The individual problems behind this error.
    pub fn problems(&self) -> Vec<String> {
        match self {
            ConfigError::Invalid(problems) => problems.clone(),
            other => vec![other.to_string()],
        }
    }
}

/// Worker identity problems, fatal before any build runs.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PlanError {
    #[error("Worker count must be at least 1")]
    ZeroWorkers,

    #[error("Worker index {index} is outside [0, {count})")]
    IndexOutOfRange { index: usize, count: usize },

    #[error("Cannot derive a worker index from node name '{0}'")]
    InvalidNodeName(String),

    /// Neither an explicit value nor a fallback was given
    #[error("Missing {0}")]
    MissingWorkerIdentity(&'static str),
}
