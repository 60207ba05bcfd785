//! Command implementations for the CLI
//!
//! SBIO pattern: Commands return Results, I/O is handled by caller

use std::sync::Arc;

use thiserror::Error;

use super::display::{format_config, format_instances};
use super::Commands;
use crate::client::{ComputeClientTrait, GceComputeClient};
use crate::config::{AutoscalerConfig, ConfigError};
use crate::scaler::{AutoScaler, GceAutoScaler, ScalerError};

/// Errors that can occur during command execution
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Autoscaler error: {0}")]
    Scaler(#[from] ScalerError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for commands
pub type CommandResult<T> = Result<T, CommandError>;

/// Wire an autoscaler to the real Compute API
pub fn build_autoscaler(
    config: &AutoscalerConfig,
    api_url: &str,
    access_token: Option<String>,
) -> GceAutoScaler {
    let client: Arc<dyn ComputeClientTrait> = Arc::new(
        GceComputeClient::new(api_url, access_token).with_page_size(config.settings.page_size),
    );
    GceAutoScaler::new(config, client)
}

/// Run one subcommand and render its result for stdout
pub async fn run_command(
    autoscaler: &GceAutoScaler,
    config: &AutoscalerConfig,
    command: &Commands,
) -> CommandResult<String> {
    let output = match command {
        Commands::ShowConfig => format_config(config)?,
        Commands::Provision => serde_json::to_string_pretty(&autoscaler.provision().await?)?,
        Commands::Terminate(args) => {
            serde_json::to_string_pretty(&autoscaler.terminate(&args.ips).await?)?
        }
        Commands::TerminateIds(args) => {
            serde_json::to_string_pretty(&autoscaler.terminate_with_ids(&args.ids).await?)?
        }
        Commands::IpToId(args) => {
            serde_json::to_string_pretty(&autoscaler.ip_to_id_lookup(&args.ips).await?)?
        }
        Commands::IdToIp(args) => {
            serde_json::to_string_pretty(&autoscaler.id_to_ip_lookup(&args.ids).await?)?
        }
        Commands::Instances => format_instances(&autoscaler.running_instances().await?),
    };
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{IdArgs, IpArgs};
    use crate::client::mock::MockComputeClient;
    use crate::client::InstanceRef;
    use crate::config::PoolConfig;

    fn make_config() -> AutoscalerConfig {
        AutoscalerConfig::new(PoolConfig {
            project_id: "p".to_string(),
            zone_name: "z".to_string(),
            managed_instance_group_name: "g".to_string(),
            target_workers: 1,
            min_workers: 0,
            max_workers: 5,
        })
    }

    #[tokio::test]
    async fn test_show_config_makes_no_calls() {
        let client = Arc::new(MockComputeClient::new());
        let config = make_config();
        let autoscaler = GceAutoScaler::new(&config, client.clone());

        let output = run_command(&autoscaler, &config, &Commands::ShowConfig)
            .await
            .unwrap();

        assert!(output.contains("managedInstanceGroupName"));
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn test_terminate_ids_prints_json() {
        let client =
            Arc::new(MockComputeClient::new().with_snapshots(vec![vec!["a", "b"], vec!["b"]]));
        let config = make_config();
        let autoscaler = GceAutoScaler::new(&config, client);

        let output = run_command(
            &autoscaler,
            &config,
            &Commands::TerminateIds(IdArgs {
                ids: vec!["a".to_string()],
            }),
        )
        .await
        .unwrap();

        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["nodeIds"], serde_json::json!(["a"]));
    }

    #[tokio::test]
    async fn test_ip_to_id_prints_array() {
        let client = Arc::new(MockComputeClient::new().with_catalog(vec![InstanceRef {
            id: "a".to_string(),
            private_ip: Some("10.0.0.1".to_string()),
        }]));
        let config = make_config();
        let autoscaler = GceAutoScaler::new(&config, client);

        let output = run_command(
            &autoscaler,
            &config,
            &Commands::IpToId(IpArgs {
                ips: vec!["10.0.0.1".to_string()],
            }),
        )
        .await
        .unwrap();

        let ids: Vec<String> = serde_json::from_str(&output).unwrap();
        assert_eq!(ids, vec!["a".to_string()]);
    }

    #[tokio::test]
    async fn test_scaler_errors_propagate() {
        let client = Arc::new(MockComputeClient::new().failing_listing());
        let config = make_config();
        let autoscaler = GceAutoScaler::new(&config, client);

        let result = run_command(&autoscaler, &config, &Commands::Instances).await;
        assert!(matches!(result, Err(CommandError::Scaler(ScalerError::Transport(_)))));
    }
}
