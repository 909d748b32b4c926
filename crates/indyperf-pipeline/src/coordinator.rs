//! Sequential execution of a builder's planned order.

use crate::pipeline::BuildPipeline;
use anyhow::Context;
use chrono::{DateTime, Utc};
use indyperf_core::config::Suite;
use indyperf_core::error::PlanError;
use indyperf_core::outcome::{BuildOutcome, OutcomeStatus, Stage};
use indyperf_core::planner::{plan, BuildOrder};
use indyperf_core::tally::ResultTally;
use serde::Serialize;
use std::path::Path;
use tracing::{error, info};

/// Everything one builder did during a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub worker_index: usize,
    pub worker_count: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub tally: ResultTally,
    /// One entry per execution, in execution order.
    pub outcomes: Vec<BuildOutcome>,
}

impl RunReport {
    /// True when no execution failed.
    pub fn success(&self) -> bool {
        !self.tally.has_failures()
    }

    /// Write the report as pretty-printed JSON.
    pub fn write_json(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).with_context(|| format!("Failed to write report to {:?}", path))?;
        Ok(())
    }
}

/// Plans a builder's share of the suite and runs it one build at a time.
pub struct RunCoordinator {
    pipeline: BuildPipeline,
}

impl RunCoordinator {
    pub fn new(pipeline: BuildPipeline) -> Self {
        RunCoordinator { pipeline }
    }

    /// Plan for builder `worker_index` of `worker_count` and execute the plan.
    ///
    /// Only an invalid worker identity is an error; build failures are
    /// recorded in the report.
    pub async fn run(
        &self,
        suite: &Suite,
        worker_index: usize,
        worker_count: usize,
    ) -> Result<RunReport, PlanError> {
        let order = plan(suite, worker_index, worker_count)?;
        let mut report = self.execute_order(suite, &order).await;
        report.worker_index = worker_index;
        report.worker_count = worker_count;
        Ok(report)
    }

    /// Execute `order`, pausing `suite.pause` between consecutive builds.
    pub async fn execute_order(&self, suite: &Suite, order: &BuildOrder) -> RunReport {
        let started_at = Utc::now();
        let mut tally = ResultTally::new();
        let mut outcomes = Vec::with_capacity(order.len());

        for (position, entry) in order.iter().enumerate() {
            info!(
                build = %entry.build_name,
                pass = entry.pass_index,
                "Running build {} of {}",
                position + 1,
                order.len()
            );

            let outcome = match suite.build(&entry.build_name) {
                Some(build) => self.pipeline.execute(&entry.build_name, build, suite).await,
                None => {
                    error!(build = %entry.build_name, "Planned build is not defined in the suite");
                    BuildOutcome::failure(
                        &entry.build_name,
                        None,
                        OutcomeStatus::Exception,
                        Stage::Provision,
                        "build is not defined in the suite",
                    )
                }
            };

            tally.record(&outcome);
            outcomes.push(outcome);

            if position + 1 < order.len() && !suite.pause.is_zero() {
                info!("Pausing {}s before the next build", suite.pause.as_secs_f64());
                tokio::time::sleep(suite.pause).await;
            }
        }

        info!(
            succeeded = tally.total_success(),
            failed = tally.total_failure(),
            "Run finished"
        );

        RunReport {
            worker_index: 0,
            worker_count: 1,
            started_at,
            finished_at: Utc::now(),
            tally,
            outcomes,
        }
    }
}
