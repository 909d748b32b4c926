//! Promotion request and result payloads.

use crate::error::IndyError;
use crate::store::StoreKey;
use serde::{Deserialize, Serialize};

/// Body for `/api/promotion/paths/promote`.
///
/// An empty `paths` list promotes everything in `source`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PathsPromoteRequest {
    pub source: StoreKey,
    pub target: StoreKey,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<String>,
}

impl PathsPromoteRequest {
    pub fn new(source: StoreKey, target: StoreKey) -> Self {
        PathsPromoteRequest {
            source,
            target,
            paths: Vec::new(),
        }
    }

    pub fn with_paths(mut self, paths: Vec<String>) -> Self {
        self.paths = paths;
        self
    }
}

/// Body for `/api/promotion/groups/promote`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GroupPromoteRequest {
    pub source: StoreKey,
    pub target_group: String,
}

/// Service response to either promotion call.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PromoteResult {
    #[serde(default)]
    pub error: Option<String>,

    #[serde(default)]
    pub completed_paths: Option<Vec<String>>,

    #[serde(default)]
    pub pending_paths: Option<Vec<String>>,

    #[serde(default)]
    pub skipped_paths: Option<Vec<String>>,
}

impl PromoteResult {
    /// Turn a service-reported error into `PromotionRejected`.
    ///
    /// The HTTP call may well have returned 200; a non-blank `error` field
    /// still means the promotion did not happen.
    pub fn check(self, source: &StoreKey) -> Result<PromoteResult, IndyError> {
        match self.error.as_deref().map(str::trim) {
            Some(message) if !message.is_empty() => Err(IndyError::PromotionRejected {
                source_key: source.to_string(),
                message: message.to_string(),
            }),
            _ => Ok(self),
        }
    }

    /// Number of paths the service reports as promoted, if it said.
    pub fn completed_count(&self) -> usize {
        self.completed_paths.as_ref().map(Vec::len).unwrap_or(0)
    }
}
