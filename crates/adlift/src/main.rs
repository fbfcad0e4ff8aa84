// SPDX-FileCopyrightText: 2026 Adlift Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adlift - attribution and event tracking with durable delivery.
//!
//! This binary is an operational companion to the pipeline library:
//! inspect the persisted queues and state, flush pending packages, or
//! request install forgetting.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod drain;
mod forget;
mod status;

/// Adlift - attribution and event tracking with durable delivery.
#[derive(Parser, Debug)]
#[command(name = "adlift", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Show queue depths and activity-state counters.
    Status,
    /// Attempt to deliver every queued package once.
    Drain,
    /// Enqueue a forget-me request and deliver it.
    Forget,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load and validate configuration at startup.
    let config = match adlift_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            adlift_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.app.log_level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let result = match cli.command {
        Some(Commands::Status) => status::run(&config).await,
        Some(Commands::Drain) => drain::run(&config).await,
        Some(Commands::Forget) => forget::run(&config).await,
        None => {
            println!("adlift: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("adlift: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        super::Cli::command().debug_assert();
    }

    #[test]
    fn default_config_fails_validation_without_app_token() {
        // The binary refuses to start without an app token; confirm the
        // default config carries that validation error.
        let errors = adlift_config::load_and_validate_str("").unwrap_err();
        assert!(errors.iter().any(|e| e.to_string().contains("app_token")));
    }
}
