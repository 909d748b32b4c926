//! indyperf build pipeline
//!
//! Drives a builder's share of a suite: each planned execution gets a fresh
//! build directory and store namespace, runs checkout, metadata rewrite and
//! the build tool, promotes what it consumed and produced, and always
//! releases its namespace. [`RunCoordinator`] runs the executions in order
//! and tallies the results.

pub mod coordinator;
pub mod fakes;
pub mod namespace;
pub mod pipeline;
pub mod promotion;
pub mod runner;
pub mod stage;
pub mod workspace;

pub use coordinator::{RunCoordinator, RunReport};
pub use namespace::BuildNamespace;
pub use pipeline::BuildPipeline;
pub use promotion::{promote_build, OutputPromotion, PromotionSummary};
pub use runner::{CommandError, CommandOutput, CommandRunner, ShellCommand, ShellRunner};
pub use workspace::BuildWorkspace;
