//! # Worker pool autoscaling
//!
//! The cluster manager decides *when* the pool should grow or shrink; this
//! module carries out the request against the cloud provider and reports
//! which instances were actually affected.
//!
//! ## Reconciliation
//!
//! Provider calls are asynchronous and may partially succeed, so the
//! request's stated intent is not trusted. Instead the group is snapshotted
//! before and after the operation and the two snapshots are diffed:
//!
//! ```text
//!  before = {A, B}        resize(4)        after = {A, B, C, D}
//!     │                      │                    │
//!     └──── snapshot ────────┴── await DONE ──────┴──── after − before = {C, D}
//! ```
//!
//! ## Operation lifecycle
//!
//! `INITIATED -> PENDING -> SUCCEEDED | FAILED`, with the wait bounded by
//! the configured operation timeout. Callers only ever see the terminal
//! result.

pub mod data;
pub mod filter;
pub mod gce;
pub mod operation;

pub use data::{AutoScalingData, KnownChanges, ScalerError};
pub use filter::{build_filter, chunk_values, ID_FILTER_FIELD, IP_FILTER_FIELD};
pub use gce::GceAutoScaler;
pub use operation::{await_terminal, OperationOutcome, WaitError};

use async_trait::async_trait;

use crate::config::PoolConfig;

/// What the cluster manager needs from a cloud autoscaler
#[async_trait]
pub trait AutoScaler: Send + Sync {
    /// Lower bound the caller's policy should keep the pool at
    fn min_num_workers(&self) -> u32;

    /// Upper bound; provisioning never grows the pool past it
    fn max_num_workers(&self) -> u32;

    fn env_config(&self) -> &PoolConfig;

    /// Add up to `targetWorkers` instances and report the new IDs
    async fn provision(&self) -> Result<AutoScalingData, ScalerError>;

    /// Terminate the workers listening on `ips`
    async fn terminate(&self, ips: &[String]) -> Result<AutoScalingData, ScalerError>;

    /// Terminate instances by ID
    async fn terminate_with_ids(&self, ids: &[String]) -> Result<AutoScalingData, ScalerError>;

    /// Private IPs to instance IDs. Unknown IPs are dropped.
    async fn ip_to_id_lookup(&self, ips: &[String]) -> Result<Vec<String>, ScalerError>;

    /// Instance IDs to private IPs. Unknown IDs are dropped.
    async fn id_to_ip_lookup(&self, ids: &[String]) -> Result<Vec<String>, ScalerError>;
}
