//! Per-tid store namespace with guaranteed release.

use indy_client::{IndyError, RepositoryApi, StoreDefinition, StoreKey};
use indyperf_core::config::Environment;
use indyperf_core::outcome::CleanupReport;
use indyperf_core::settings::SettingsDocument;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Shared proxy group every per-tid group resolves through.
pub const BREW_PROXIES: &str = "brew_proxies";
/// Hosted store that collects promoted upstream dependencies.
pub const SHARED_IMPORTS: &str = "shared-imports";
/// Public group appended to every per-tid group.
pub const PUBLIC: &str = "public";

/// Stores and local cache belonging to one build execution.
///
/// Allocate before checkout and call [`BuildNamespace::release`] on every
/// exit path. Dropping a namespace that was never released only logs.
pub struct BuildNamespace {
    tid: String,
    repo: Arc<dyn RepositoryApi>,
    promote: bool,
    promotion_target: StoreKey,
    local_repository: PathBuf,
    stores_requested: bool,
    released: bool,
}

impl BuildNamespace {
    pub fn allocate(repo: Arc<dyn RepositoryApi>, env: &Environment, tid: &str) -> Self {
        debug!(tid = %tid, "Allocated build namespace");
        BuildNamespace {
            tid: tid.to_string(),
            repo,
            promote: env.do_promote,
            promotion_target: env.promotion_target.clone(),
            local_repository: SettingsDocument::local_repository_for(env, tid),
            stores_requested: false,
            released: false,
        }
    }

    pub fn tid(&self) -> &str {
        &self.tid
    }

    /// `maven:hosted:<tid>`, receiving the build's deployed output.
    pub fn hosted_key(&self) -> StoreKey {
        StoreKey::hosted(&self.tid)
    }

    /// `maven:group:<tid>`, the build's resolution group.
    pub fn group_key(&self) -> StoreKey {
        StoreKey::group(&self.tid)
    }

    /// The per-tid hosted store and the group resolving through it.
    pub fn store_definitions(&self) -> Vec<StoreDefinition> {
        vec![
            StoreDefinition::hosted(self.hosted_key()),
            StoreDefinition::group(
                self.group_key(),
                vec![
                    self.hosted_key(),
                    self.promotion_target.clone(),
                    StoreKey::group(BREW_PROXIES),
                    StoreKey::hosted(SHARED_IMPORTS),
                    StoreKey::group(PUBLIC),
                ],
            ),
        ]
    }

    /// Ensure the shared stores and this tid's stores exist.
    ///
    /// Does nothing when promotion is disabled for the run.
    pub async fn provision(&mut self, shared: &[StoreDefinition]) -> Result<(), IndyError> {
        if !self.promote {
            debug!(tid = %self.tid, "Promotion disabled, no stores to create");
            return Ok(());
        }

        self.stores_requested = true;
        for store in shared.iter().chain(self.store_definitions().iter()) {
            if self.repo.ensure_store(store).await? {
                info!(tid = %self.tid, store = %store.key, "Created store");
            }
        }
        Ok(())
    }

    /// Remove the local cache and, if stores were set up, the per-tid group.
    ///
    /// Failures are logged and reported, never returned.
    pub async fn release(mut self) -> CleanupReport {
        self.released = true;
        let mut report = CleanupReport {
            attempted: true,
            ..Default::default()
        };

        if self.local_repository.exists() {
            match tokio::fs::remove_dir_all(&self.local_repository).await {
                Ok(()) => report.removed_local_repository = true,
                Err(e) => {
                    error!(tid = %self.tid, path = ?self.local_repository, "Failed to remove local repository: {}", e);
                    report
                        .errors
                        .push(format!("remove {}: {}", self.local_repository.display(), e));
                }
            }
        }

        if self.promote && self.stores_requested {
            info!(tid = %self.tid, "Deleting temporary group used for build time only");
            match self.repo.delete_group(&self.tid).await {
                Ok(()) => report.deleted_group = true,
                Err(e) => {
                    error!(tid = %self.tid, "Failed to delete group: {}", e);
                    report.errors.push(format!("delete group {}: {}", self.tid, e));
                }
            }
        }

        report
    }
}

impl Drop for BuildNamespace {
    fn drop(&mut self) {
        if !self.released {
            warn!(tid = %self.tid, "Build namespace dropped without release; stores may remain");
        }
    }
}
