//! Folo tracking report: the record of every artifact a build read or wrote.

use crate::store::StoreKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Access channels that mean "fetched by the build tool from a repository".
const REPOSITORY_CHANNELS: &[&str] = &["MAVEN_REPO", "NATIVE"];

/// One tracked transfer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TrackedContent {
    pub store_key: String,
    pub access_channel: String,
    pub path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl TrackedContent {
    fn is_repository_fetch(&self) -> bool {
        REPOSITORY_CHANNELS.contains(&self.access_channel.as_str())
    }
}

/// Sealed tracking record for one tid.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrackingReport {
    #[serde(default)]
    pub uploads: Vec<TrackedContent>,

    #[serde(default)]
    pub downloads: Vec<TrackedContent>,
}

impl TrackingReport {
    /// Downloads that came through a remote store, grouped by that store.
    ///
    /// Keys iterate in sorted order; paths keep their first-seen order with
    /// duplicates dropped.
    pub fn remote_downloads(&self) -> BTreeMap<StoreKey, Vec<String>> {
        let mut grouped: BTreeMap<StoreKey, Vec<String>> = BTreeMap::new();

        for download in &self.downloads {
            if !download.is_repository_fetch() {
                continue;
            }

            let key: StoreKey = match download.store_key.parse() {
                Ok(key) => key,
                Err(e) => {
                    debug!(store_key = %download.store_key, error = %e, "Skipping download with unparseable store key");
                    continue;
                }
            };

            if !key.is_remote() {
                continue;
            }

            let paths = grouped.entry(key).or_default();
            if !paths.contains(&download.path) {
                paths.push(download.path.clone());
            }
        }

        grouped
    }
}
