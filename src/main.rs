use std::process;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

use gce_autoscaler::cli::{
    build_autoscaler, format_failure, run_command, Cli, CommandError, ACCESS_TOKEN_ENV,
};
use gce_autoscaler::config::load_autoscaler_file;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    // Load .env file if specified
    if let Some(ref env_file) = cli.env_file {
        dotenvy::from_path(env_file)
            .with_context(|| format!("Failed to load env file {}", env_file.display()))?;
    }

    let config = load_autoscaler_file(&cli.config)
        .with_context(|| format!("Failed to load config file {}", cli.config.display()))?;
    debug!("Loaded autoscaler config: {:?}", config);

    // A token from --env-file is only visible after clap has parsed
    let access_token = cli
        .access_token
        .clone()
        .or_else(|| std::env::var(ACCESS_TOKEN_ENV).ok());

    let autoscaler = build_autoscaler(&config, &cli.api_url, access_token);

    match run_command(&autoscaler, &config, &cli.command).await {
        Ok(output) => {
            println!("{}", output);
            Ok(())
        }
        Err(CommandError::Scaler(e)) => {
            error!("{:?} failed: {}", cli.command, e);
            eprintln!("{}", format_failure(&e));
            process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}
