//! The repository operations a build pipeline needs.

use async_trait::async_trait;

use crate::promote::{GroupPromoteRequest, PathsPromoteRequest, PromoteResult};
use crate::store::{StoreDefinition, StoreKey};
use crate::tracking::TrackingReport;
use crate::Result;

/// Repository service operations.
///
/// Implemented over HTTP by [`crate::IndyClient`] and in memory by
/// [`crate::fakes::MemoryRepository`].
#[async_trait]
pub trait RepositoryApi: Send + Sync {
    /// Whether a store exists. A 404 is `Ok(false)`, not an error.
    async fn store_exists(&self, key: &StoreKey) -> Result<bool>;

    /// Create a store.
    async fn create_store(&self, store: &StoreDefinition) -> Result<()>;

    /// Tell the service nothing more will be recorded against `tid`.
    async fn seal_tracking_report(&self, tid: &str) -> Result<()>;

    /// Fetch the sealed tracking report for `tid`.
    async fn fetch_tracking_report(&self, tid: &str) -> Result<TrackingReport>;

    /// Promote paths between stores. The result is returned unchecked.
    async fn promote_paths(&self, request: &PathsPromoteRequest) -> Result<PromoteResult>;

    /// Add a store to a group. The result is returned unchecked.
    async fn promote_group(&self, request: &GroupPromoteRequest) -> Result<PromoteResult>;

    /// Delete a group.
    async fn delete_group(&self, name: &str) -> Result<()>;

    /// Create `store` unless it already exists. Returns whether it was created.
    ///
    /// Probe-then-create; two workers racing on the same key may both try
    /// to create it.
    async fn ensure_store(&self, store: &StoreDefinition) -> Result<bool> {
        if self.store_exists(&store.key).await? {
            return Ok(false);
        }
        self.create_store(store).await?;
        Ok(true)
    }
}
