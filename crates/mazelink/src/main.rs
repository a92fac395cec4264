//! `mazelink` binary: loads configuration, sets up logging and runs the
//! relay until interrupted.

use std::path::PathBuf;

use clap::{Arg, ArgAction, Command};
use mazelink::{AckPolicy, ConfigError, RelayConfig, RelayServer};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

// ============================================================================
// CLI Interface
// ============================================================================

/// Command line arguments. Every override is optional and beats the
/// config file.
#[derive(Debug, Clone)]
struct CliArgs {
    config_path: Option<PathBuf>,
    listen: Option<String>,
    authority: Option<String>,
    ack_policy: Option<AckPolicy>,
    log_level: String,
    json_logs: bool,
}

impl CliArgs {
    fn parse() -> Self {
        let matches = Command::new("mazelink")
            .version(env!("CARGO_PKG_VERSION"))
            .about("WebSocket command relay between maze players and the game authority")
            .arg(
                Arg::new("config")
                    .short('c')
                    .long("config")
                    .value_name("FILE")
                    .value_parser(clap::value_parser!(PathBuf))
                    .help("TOML configuration file"),
            )
            .arg(
                Arg::new("listen")
                    .short('l')
                    .long("listen")
                    .value_name("ADDRESS")
                    .help("Client listener address (e.g., 0.0.0.0:3012)"),
            )
            .arg(
                Arg::new("authority")
                    .short('a')
                    .long("authority")
                    .value_name("ADDRESS")
                    .help("Game authority address (e.g., 127.0.0.1:8080)"),
            )
            .arg(
                Arg::new("ack-policy")
                    .long("ack-policy")
                    .value_name("POLICY")
                    .value_parser(clap::value_parser!(AckPolicy))
                    .help("When to acknowledge commands: immediate or after-forward"),
            )
            .arg(
                Arg::new("log-level")
                    .long("log-level")
                    .value_name("LEVEL")
                    .default_value("info")
                    .help("Log filter when RUST_LOG is unset (trace, debug, info, warn, error)"),
            )
            .arg(
                Arg::new("json-logs")
                    .long("json-logs")
                    .help("Output logs in JSON format")
                    .action(ArgAction::SetTrue),
            )
            .get_matches();

        Self {
            config_path: matches.get_one::<PathBuf>("config").cloned(),
            listen: matches.get_one::<String>("listen").cloned(),
            authority: matches.get_one::<String>("authority").cloned(),
            ack_policy: matches.get_one::<AckPolicy>("ack-policy").copied(),
            log_level: matches
                .get_one::<String>("log-level")
                .cloned()
                .unwrap_or_else(|| "info".to_string()),
            json_logs: matches.get_flag("json-logs"),
        }
    }

    /// Loads the config file, if any, and applies the CLI overrides.
    fn relay_config(&self) -> Result<RelayConfig, ConfigError> {
        let mut config = match &self.config_path {
            Some(path) => RelayConfig::load(path)?,
            None => RelayConfig::default(),
        };
        if let Some(listen) = &self.listen {
            config.listen_addr = listen.clone();
        }
        if let Some(authority) = &self.authority {
            config.authority_addr = authority.clone();
        }
        if let Some(policy) = self.ack_policy {
            config.ack_policy = policy;
        }
        Ok(config)
    }
}

// ============================================================================
// Logging Setup
// ============================================================================

fn setup_logging(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(true))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_thread_ids(true))
            .init();
    }
}

// ============================================================================
// Entry point
// ============================================================================

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();
    setup_logging(&args.log_level, args.json_logs);

    let config = args.relay_config()?;
    tracing::info!(
        listen = %config.listen_addr,
        authority = %config.authority_addr,
        "starting mazelink"
    );

    let server = RelayServer::builder().config(config).build().await?;
    tracing::info!(addr = %server.local_addr()?, "listening for players");

    tokio::select! {
        result = server.run() => result?,
        signal = tokio::signal::ctrl_c() => {
            signal?;
            tracing::info!("received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
