//! indyperf core library
//!
//! Suite configuration, build-order planning, per-build outcomes, the
//! result tally and generated build settings. Everything here is free of
//! process execution; the pipeline crate drives builds on top of it.

pub mod config;
pub mod error;
pub mod outcome;
pub mod planner;
pub mod settings;
pub mod tally;
pub mod telemetry;
pub mod template;

pub use config::{load, BuildDefinition, Environment, Suite};
pub use error::{ConfigError, PlanError};
pub use outcome::{BuildOutcome, CleanupReport, OutcomeStatus, Stage};
pub use planner::{plan, plan_builds, BuildOrder, ExecutionEntry, WorkerSlot};
pub use settings::SettingsDocument;
pub use tally::{ResultTally, TallyRow};
pub use telemetry::init_tracing;
