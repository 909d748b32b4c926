//! In-memory repository fake (testing only)
//!
//! `MemoryRepository` keeps stores in a map, records every call in order,
//! and can be told to fail a given operation or to answer promotions with a
//! service-reported error.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::api::RepositoryApi;
use crate::error::IndyError;
use crate::promote::{GroupPromoteRequest, PathsPromoteRequest, PromoteResult};
use crate::store::{StoreDefinition, StoreKey};
use crate::tracking::TrackingReport;
use crate::Result;

/// Repository operation, for failure injection and call matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepoOp {
    StoreExists,
    CreateStore,
    SealTrackingReport,
    FetchTrackingReport,
    PromotePaths,
    PromoteGroup,
    DeleteGroup,
}

/// A recorded call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoCall {
    StoreExists(StoreKey),
    CreateStore(StoreDefinition),
    SealTrackingReport(String),
    FetchTrackingReport(String),
    PromotePaths(PathsPromoteRequest),
    PromoteGroup(GroupPromoteRequest),
    DeleteGroup(String),
}

impl RepoCall {
    pub fn op(&self) -> RepoOp {
        match self {
            RepoCall::StoreExists(_) => RepoOp::StoreExists,
            RepoCall::CreateStore(_) => RepoOp::CreateStore,
            RepoCall::SealTrackingReport(_) => RepoOp::SealTrackingReport,
            RepoCall::FetchTrackingReport(_) => RepoOp::FetchTrackingReport,
            RepoCall::PromotePaths(_) => RepoOp::PromotePaths,
            RepoCall::PromoteGroup(_) => RepoOp::PromoteGroup,
            RepoCall::DeleteGroup(_) => RepoOp::DeleteGroup,
        }
    }
}

#[derive(Debug, Default)]
struct State {
    stores: HashMap<StoreKey, StoreDefinition>,
    calls: Vec<RepoCall>,
    failing: HashSet<RepoOp>,
    promote_error: Option<String>,
    report: TrackingReport,
}

/// In-memory repository backed by a `HashMap<StoreKey, StoreDefinition>`.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    state: Mutex<State>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call of `op` fail with a transport error.
    pub fn fail_on(self, op: RepoOp) -> Self {
        self.state.lock().unwrap().failing.insert(op);
        self
    }

    /// Answer promotions with `{"error": message}` and a success status.
    pub fn reject_promotions(self, message: &str) -> Self {
        self.state.lock().unwrap().promote_error = Some(message.to_string());
        self
    }

    /// Report returned by `fetch_tracking_report`.
    pub fn with_report(self, report: TrackingReport) -> Self {
        self.state.lock().unwrap().report = report;
        self
    }

    /// Pre-existing store.
    pub fn with_store(self, store: StoreDefinition) -> Self {
        self.state
            .lock()
            .unwrap()
            .stores
            .insert(store.key.clone(), store);
        self
    }

    /// All calls so far, in order.
    pub fn calls(&self) -> Vec<RepoCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Number of calls of `op` so far.
    pub fn count(&self, op: RepoOp) -> usize {
        self.calls().iter().filter(|c| c.op() == op).count()
    }

    pub fn store(&self, key: &StoreKey) -> Option<StoreDefinition> {
        self.state.lock().unwrap().stores.get(key).cloned()
    }

    fn record(&self, call: RepoCall) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let op = call.op();
        state.calls.push(call);
        if state.failing.contains(&op) {
            return Err(IndyError::Http(format!("injected failure for {:?}", op)));
        }
        Ok(())
    }

    fn promote_result(&self) -> PromoteResult {
        PromoteResult {
            error: self.state.lock().unwrap().promote_error.clone(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl RepositoryApi for MemoryRepository {
    async fn store_exists(&self, key: &StoreKey) -> Result<bool> {
        self.record(RepoCall::StoreExists(key.clone()))?;
        Ok(self.state.lock().unwrap().stores.contains_key(key))
    }

    async fn create_store(&self, store: &StoreDefinition) -> Result<()> {
        self.record(RepoCall::CreateStore(store.clone()))?;
        self.state
            .lock()
            .unwrap()
            .stores
            .insert(store.key.clone(), store.clone());
        Ok(())
    }

    async fn seal_tracking_report(&self, tid: &str) -> Result<()> {
        self.record(RepoCall::SealTrackingReport(tid.to_string()))
    }

    async fn fetch_tracking_report(&self, tid: &str) -> Result<TrackingReport> {
        self.record(RepoCall::FetchTrackingReport(tid.to_string()))?;
        Ok(self.state.lock().unwrap().report.clone())
    }

    async fn promote_paths(&self, request: &PathsPromoteRequest) -> Result<PromoteResult> {
        self.record(RepoCall::PromotePaths(request.clone()))?;
        let mut result = self.promote_result();
        if result.error.is_none() {
            result.completed_paths = Some(request.paths.clone());
        }
        Ok(result)
    }

    async fn promote_group(&self, request: &GroupPromoteRequest) -> Result<PromoteResult> {
        self.record(RepoCall::PromoteGroup(request.clone()))?;
        Ok(self.promote_result())
    }

    async fn delete_group(&self, name: &str) -> Result<()> {
        self.record(RepoCall::DeleteGroup(name.to_string()))?;
        self.state
            .lock()
            .unwrap()
            .stores
            .remove(&StoreKey::group(name));
        Ok(())
    }
}
