//! Indy-Client: repository service access for indyperf
//!
//! Talks to the Indy artifact repository on behalf of a build cycle:
//! store probing and creation, folo tracking reports, path and group
//! promotion, and group teardown. Also obtains the SSO bearer token the
//! rest of the run carries.
//!
//! The pipeline depends only on the [`RepositoryApi`] trait; [`IndyClient`]
//! is the HTTP implementation and [`fakes::MemoryRepository`] the in-memory
//! one used by tests.

pub mod api;
pub mod client;
pub mod context;
pub mod error;
pub mod fakes;
pub mod promote;
pub mod sso;
pub mod store;
pub mod tracking;

pub use api::RepositoryApi;
pub use client::IndyClient;
pub use context::RunContext;
pub use error::IndyError;
pub use promote::{GroupPromoteRequest, PathsPromoteRequest, PromoteResult};
pub use sso::{GrantType, SsoConfig};
pub use store::{StoreDefinition, StoreKey, StoreType, DEFAULT_PACKAGE_TYPE};
pub use tracking::{TrackedContent, TrackingReport};

/// Result type for repository operations
pub type Result<T> = std::result::Result<T, IndyError>;
