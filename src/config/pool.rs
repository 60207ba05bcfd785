//! Worker pool configuration
//!
//! Value objects describing which managed instance group backs the worker
//! pool and how the reconciler talks to it. These are bound once from the
//! autoscaler configuration and never mutated afterwards.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Autoscaler type tag expected in the `type` field
pub const AUTOSCALER_TYPE: &str = "gce";

/// Default bound on waiting for a zonal operation to finish
pub const DEFAULT_OPERATION_TIMEOUT_SECS: u64 = 300;

/// Default delay between operation status polls
pub const DEFAULT_POLL_INTERVAL_MILLIS: u64 = 5_000;

/// Default number of OR-ed predicates per filtered list call
pub const DEFAULT_MAX_FILTER_PREDICATES: usize = 100;

/// Default page size for list calls (the Compute API caps this at 500)
pub const DEFAULT_PAGE_SIZE: u32 = 500;

// ============================================================================
// SBIO: Pure data structures
// ============================================================================

/// The managed instance group backing the worker pool, plus pool sizing.
///
/// `min_workers` and `max_workers` are mostly consumed by the caller's
/// scaling policy; the reconciler only uses `max_workers` to cap growth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Project owning the instance group
    #[serde(rename = "projectId")]
    pub project_id: String,

    /// Zone of the instance group
    #[serde(rename = "zoneName", alias = "zone")]
    pub zone_name: String,

    /// Name of the managed instance group
    #[serde(rename = "managedInstanceGroupName")]
    pub managed_instance_group_name: String,

    /// Number of workers to try to add on each provision call
    #[serde(rename = "targetWorkers")]
    pub target_workers: u32,

    /// Minimum pool size
    #[serde(rename = "minWorkers")]
    pub min_workers: u32,

    /// Maximum pool size
    #[serde(rename = "maxWorkers")]
    pub max_workers: u32,
}

/// Knobs for how the reconciler drives the Compute API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcilerSettings {
    /// Upper bound on waiting for one operation to reach a terminal state
    #[serde(rename = "operationTimeoutSecs", default = "default_operation_timeout")]
    pub operation_timeout_secs: u64,

    /// Delay between operation status polls
    #[serde(rename = "pollIntervalMillis", default = "default_poll_interval")]
    pub poll_interval_millis: u64,

    /// Maximum OR-ed predicates per filtered list request
    #[serde(rename = "maxFilterPredicates", default = "default_max_filter_predicates")]
    pub max_filter_predicates: usize,

    /// Page size requested from list calls
    #[serde(rename = "pageSize", default = "default_page_size")]
    pub page_size: u32,
}

impl Default for ReconcilerSettings {
    fn default() -> Self {
        Self {
            operation_timeout_secs: DEFAULT_OPERATION_TIMEOUT_SECS,
            poll_interval_millis: DEFAULT_POLL_INTERVAL_MILLIS,
            max_filter_predicates: DEFAULT_MAX_FILTER_PREDICATES,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ReconcilerSettings {
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_millis)
    }
}

fn default_operation_timeout() -> u64 {
    DEFAULT_OPERATION_TIMEOUT_SECS
}

fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_MILLIS
}

fn default_max_filter_predicates() -> usize {
    DEFAULT_MAX_FILTER_PREDICATES
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

/// Top-level autoscaler document, as the cluster manager stores it:
///
/// ```json
/// {
///   "type": "gce",
///   "envConfig": { "projectId": "...", "zoneName": "...", ... },
///   "settings": { "operationTimeoutSecs": 300 }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoscalerConfig {
    /// Always "gce"
    #[serde(rename = "type")]
    pub kind: String,

    /// Pool and instance group description
    #[serde(rename = "envConfig")]
    pub env_config: PoolConfig,

    /// Reconciler tuning
    #[serde(default)]
    pub settings: ReconcilerSettings,
}

impl AutoscalerConfig {
    pub fn new(env_config: PoolConfig) -> Self {
        Self {
            kind: AUTOSCALER_TYPE.to_string(),
            env_config,
            settings: ReconcilerSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: ReconcilerSettings) -> Self {
        self.settings = settings;
        self
    }
}

/// Validation failures for autoscaler configuration
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Unsupported autoscaler type '{0}' (expected 'gce')")]
    UnsupportedType(String),

    #[error("Field '{0}' must not be empty")]
    EmptyField(&'static str),

    #[error("minWorkers ({min}) must not exceed maxWorkers ({max})")]
    WorkerBounds { min: u32, max: u32 },

    #[error("Setting '{0}' must be greater than zero")]
    ZeroSetting(&'static str),

    #[error("Setting '{name}' must not exceed {max}")]
    TooLarge { name: &'static str, max: u32 },
}

// ============================================================================
// SBIO: Pure functions (no I/O)
// ============================================================================

/// Check a pool description for consistency
pub fn validate_pool(pool: &PoolConfig) -> Result<(), ValidationError> {
    if pool.project_id.trim().is_empty() {
        return Err(ValidationError::EmptyField("projectId"));
    }
    if pool.zone_name.trim().is_empty() {
        return Err(ValidationError::EmptyField("zoneName"));
    }
    if pool.managed_instance_group_name.trim().is_empty() {
        return Err(ValidationError::EmptyField("managedInstanceGroupName"));
    }
    if pool.min_workers > pool.max_workers {
        return Err(ValidationError::WorkerBounds {
            min: pool.min_workers,
            max: pool.max_workers,
        });
    }
    Ok(())
}

/// Check reconciler settings for usable values
pub fn validate_settings(settings: &ReconcilerSettings) -> Result<(), ValidationError> {
    if settings.operation_timeout_secs == 0 {
        return Err(ValidationError::ZeroSetting("operationTimeoutSecs"));
    }
    if settings.max_filter_predicates == 0 {
        return Err(ValidationError::ZeroSetting("maxFilterPredicates"));
    }
    if settings.poll_interval_millis == 0 {
        return Err(ValidationError::ZeroSetting("pollIntervalMillis"));
    }
    if settings.page_size == 0 {
        return Err(ValidationError::ZeroSetting("pageSize"));
    }
    if settings.page_size > DEFAULT_PAGE_SIZE {
        return Err(ValidationError::TooLarge {
            name: "pageSize",
            max: DEFAULT_PAGE_SIZE,
        });
    }
    Ok(())
}

/// Validate a whole autoscaler document
pub fn validate_autoscaler(config: &AutoscalerConfig) -> Result<(), ValidationError> {
    if config.kind != AUTOSCALER_TYPE {
        return Err(ValidationError::UnsupportedType(config.kind.clone()));
    }
    validate_pool(&config.env_config)?;
    validate_settings(&config.settings)
}
