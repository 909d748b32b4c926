//! Per-execution build outcomes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Working directory and source checkout.
    Provision,
    /// Per-tid stores and settings file.
    NamespaceSetup,
    /// Metadata rewriting tool.
    MetadataRewrite,
    /// Build tool.
    BuildExecution,
    /// Tracking report, dependency and output promotion.
    Promotion,
    /// Every gated stage finished.
    Complete,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Provision => "provision",
            Stage::NamespaceSetup => "namespace_setup",
            Stage::MetadataRewrite => "metadata_rewrite",
            Stage::BuildExecution => "build_execution",
            Stage::Promotion => "promotion",
            Stage::Complete => "complete",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How an execution ended.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Success,
    /// A tool exited non-zero, setup failed, or the service rejected a promotion.
    BuildFailure,
    /// An unexpected error: checkout failure, transport or decoding error.
    Exception,
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutcomeStatus::Success => "success",
            OutcomeStatus::BuildFailure => "build failure",
            OutcomeStatus::Exception => "exception",
        })
    }
}

/// What the cleanup step did. Never affects the outcome status.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CleanupReport {
    pub attempted: bool,
    pub removed_local_repository: bool,
    pub deleted_group: bool,
    pub errors: Vec<String>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.attempted && self.errors.is_empty()
    }
}

/// Result of one build execution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildOutcome {
    pub build_name: String,
    /// Transaction id, once one was allocated.
    pub tid: Option<String>,
    pub status: OutcomeStatus,
    /// Stage that failed, or `Complete`.
    pub stage: Stage,
    pub error: Option<String>,
    pub duration_ms: u64,
    pub cleanup: CleanupReport,
}

impl BuildOutcome {
    pub fn success(build_name: &str, tid: &str) -> Self {
        BuildOutcome {
            build_name: build_name.to_string(),
            tid: Some(tid.to_string()),
            status: OutcomeStatus::Success,
            stage: Stage::Complete,
            error: None,
            duration_ms: 0,
            cleanup: CleanupReport::default(),
        }
    }

    pub fn failure(
        build_name: &str,
        tid: Option<&str>,
        status: OutcomeStatus,
        stage: Stage,
        error: impl Into<String>,
    ) -> Self {
        BuildOutcome {
            build_name: build_name.to_string(),
            tid: tid.map(str::to_string),
            status,
            stage,
            error: Some(error.into()),
            duration_ms: 0,
            cleanup: CleanupReport::default(),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.status == OutcomeStatus::Success
    }
}
