//! ctutor - C programming tutor chat
//!
#![doc = "ctutor - C programming tutor chat"]
#![doc = "Main entry point for the ctutor application."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ctutor::cli::{Cli, Commands};
use ctutor::commands;
use ctutor::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    // Execute command
    match cli.command {
        Commands::Chat { provider, resume } => {
            if let Some(p) = &provider {
                tracing::debug!("Using provider override: {}", p);
            }
            if let Some(r) = &resume {
                tracing::debug!("Resuming session: {}", r);
            }

            commands::chat::run_chat(config, provider, resume).await?;
            Ok(())
        }
        Commands::Sessions { command } => {
            tracing::info!("Starting sessions command");
            commands::sessions::handle_sessions(&config, command)?;
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter
///
/// Logs go to stderr so stdout carries only the chat itself.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "ctutor=debug" } else { "ctutor=info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
