//! Build-order planning for one builder.
//!
//! Every builder receives the same suite and works out its own share
//! without talking to the others:
//!
//! 1. The k-th declared build (zero-based) belongs to builder
//!    `k % worker_count`.
//! 2. The builder's builds are then emitted in passes. Pass `p` contains,
//!    in declaration order, every owned build whose repeat count exceeds
//!    `p`. A build repeated five times next to one repeated once therefore
//!    yields `A, B, A, A, A, A` rather than `A, A, A, A, A, B`.
//!
//! The result depends only on its inputs, so independently started
//! builders agree on the partition.

use crate::config::{BuildDefinition, Suite};
use crate::error::PlanError;
use serde::Serialize;
use tracing::info;

/// This builder's position among all builders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WorkerSlot {
    pub index: usize,
    pub count: usize,
}

impl WorkerSlot {
    pub fn new(index: usize, count: usize) -> Result<Self, PlanError> {
        if count == 0 {
            return Err(PlanError::ZeroWorkers);
        }
        if index >= count {
            return Err(PlanError::IndexOutOfRange { index, count });
        }
        Ok(WorkerSlot { index, count })
    }

    /// Index from the trailing number of a node name, e.g. `builder-3` is 3.
    pub fn index_from_node_name(node_name: &str) -> Result<usize, PlanError> {
        node_name
            .rsplit('-')
            .next()
            .and_then(|suffix| suffix.trim().parse().ok())
            .ok_or_else(|| PlanError::InvalidNodeName(node_name.to_string()))
    }

    /// Whether the build at `synthetic_index` belongs to this builder.
    pub fn owns(&self, synthetic_index: usize) -> bool {
        synthetic_index % self.count == self.index
    }
}

/// One planned execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionEntry {
    pub build_name: String,
    pub pass_index: usize,
}

/// Ordered executions for one builder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildOrder {
    entries: Vec<ExecutionEntry>,
}

impl BuildOrder {
    pub fn entries(&self) -> &[ExecutionEntry] {
        &self.entries
    }

    /// Build names in execution order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.build_name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExecutionEntry> {
        self.entries.iter()
    }
}

/// Plan this builder's share of `builds`.
pub fn plan_builds(builds: &[BuildDefinition], slot: WorkerSlot) -> BuildOrder {
    let included: Vec<&BuildDefinition> = builds
        .iter()
        .enumerate()
        .filter(|(k, _)| slot.owns(*k))
        .map(|(_, build)| build)
        .collect();

    let passes = included
        .iter()
        .map(|b| b.repeat_count())
        .max()
        .unwrap_or(0);

    let mut entries = Vec::new();
    for pass_index in 0..passes {
        for build in &included {
            if pass_index < build.repeat_count() {
                entries.push(ExecutionEntry {
                    build_name: build.name.clone(),
                    pass_index,
                });
            }
        }
    }

    BuildOrder { entries }
}

/// Plan the share of `suite` belonging to builder `worker_index` of `worker_count`.
pub fn plan(suite: &Suite, worker_index: usize, worker_count: usize) -> Result<BuildOrder, PlanError> {
    let slot = WorkerSlot::new(worker_index, worker_count)?;
    let order = plan_builds(&suite.builds, slot);

    info!(
        builder = slot.index,
        builders = slot.count,
        executions = order.len(),
        "Planned build order: [{}]",
        order.names().join(", ")
    );

    Ok(order)
}
