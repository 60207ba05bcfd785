//! CLI module for gce-autoscaler
//!
//! Operator subcommands mirroring the autoscaler operations:
//! - `gce-autoscaler show-config` - Print the validated config
//! - `gce-autoscaler provision` - Grow the pool by `targetWorkers`
//! - `gce-autoscaler terminate` - Terminate workers by private IP
//! - `gce-autoscaler terminate-ids` - Terminate workers by instance ID
//! - `gce-autoscaler ip-to-id` / `id-to-ip` - Lookups
//! - `gce-autoscaler instances` - List instances in the group

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

use crate::client::DEFAULT_COMPUTE_API_URL;

mod commands;
mod display;

pub use commands::*;
pub use display::*;

/// Environment variable holding the OAuth access token
pub const ACCESS_TOKEN_ENV: &str = "GCE_ACCESS_TOKEN";

#[derive(Parser, Debug)]
#[command(name = "gce-autoscaler")]
#[command(about = "Grow and shrink a worker pool through a Compute Engine managed instance group")]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging output (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Autoscaler config file (JSON, or YAML for .yaml/.yml)
    #[arg(short, long, global = true, default_value = "autoscaler.json")]
    pub config: PathBuf,

    /// Path to a .env file for loading credentials
    #[arg(long, value_name = "FILE", global = true)]
    pub env_file: Option<PathBuf>,

    /// OAuth access token for the Compute API
    #[arg(long, env = ACCESS_TOKEN_ENV, hide_env_values = true, global = true)]
    pub access_token: Option<String>,

    /// Compute API base URL
    #[arg(long, value_name = "URL", global = true, default_value = DEFAULT_COMPUTE_API_URL)]
    pub api_url: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Print the validated autoscaler config
    ShowConfig,

    /// Add up to targetWorkers instances to the group
    Provision,

    /// Terminate workers by private IP
    Terminate(IpArgs),

    /// Terminate workers by instance ID
    TerminateIds(IdArgs),

    /// Resolve private IPs to instance IDs
    IpToId(IpArgs),

    /// Resolve instance IDs to private IPs
    IdToIp(IdArgs),

    /// List instances currently managed by the group
    Instances,
}

/// Private IP arguments
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
pub struct IpArgs {
    /// Private IP addresses
    #[arg(required = true, value_name = "IP")]
    pub ips: Vec<String>,
}

/// Instance ID arguments
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
pub struct IdArgs {
    /// Instance IDs (instance names)
    #[arg(required = true, value_name = "ID")]
    pub ids: Vec<String>,
}
