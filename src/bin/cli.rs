//! fs-watch CLI
//!
//! Watches a Farming Simulator dedicated server and posts what changed.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use fs_watch::{
    config,
    error::Result,
    models::{Config, ModKind},
    pipeline::Poller,
    services::{HttpStatusSource, LogNotifier, Notifier, WebhookNotifier},
    storage::{LocalStorage, StateStorage},
    utils::{format_minutes, group_thousands, http},
};

/// fs-watch - Farming Simulator server watcher
#[derive(Parser, Debug)]
#[command(
    name = "fs-watch",
    version,
    about = "Farming Simulator dedicated server status watcher"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "data/config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Poll the server forever
    Run,

    /// Run a single polling cycle and exit
    Once,

    /// Validate the configuration
    Validate,

    /// Show the stored server state
    Info,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool, level: &str) {
    let level = if verbose { "debug" } else { level };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Webhook delivery when configured, the log otherwise.
fn build_notifier(config: &Config) -> Result<Arc<dyn Notifier>> {
    match &config.delivery.webhook_url {
        Some(url) => {
            log::info!("Delivering notifications to webhook");
            let client = http::create_async_client(&config.fetch)?;
            Ok(Arc::new(WebhookNotifier::new(client, url.clone())))
        }
        None => {
            log::info!("No webhook configured, notifications go to the log");
            Ok(Arc::new(LogNotifier))
        }
    }
}

async fn build_poller(config: &Config) -> Result<Poller> {
    let source = Arc::new(HttpStatusSource::new(&config.fetch)?);
    let storage = Arc::new(LocalStorage::new(&config.paths.state_file));
    Poller::load(config, source, build_notifier(config)?, storage).await
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = config::load_config(&cli.config);
    init_logging(cli.verbose, &config.logging.level);

    log::info!("fs-watch starting...");
    log::info!("Loaded configuration from {}", cli.config.display());

    match cli.command {
        Command::Run => {
            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            let mut poller = build_poller(&config).await?;
            poller.run().await?;
        }

        Command::Once => {
            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            let mut poller = build_poller(&config).await?;
            poller.start(chrono::Utc::now()).await;
            let report = poller.run_cycle().await?;
            log::info!(
                "Server is {:?}, {} notification(s) sent",
                report.state,
                report.notices.len()
            );
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK");
            if config.purge.is_enabled() {
                log::info!("Purging daily at {:02}:00 UTC", config.purge.hour);
            } else {
                log::info!("Purging disabled");
            }
        }

        Command::Info => {
            let storage = LocalStorage::new(&config.paths.state_file);
            log::info!("State file: {}", storage.path().display());

            match storage.load().await? {
                Some(snapshot) => {
                    let server = &snapshot.server;
                    log::info!("Server: {} ({} {})", server.name, server.game, server.version);
                    log::info!("Map: {}", server.map_name);
                    log::info!(
                        "Status: {}",
                        if server.unreachable {
                            "unreachable"
                        } else if server.online {
                            "online"
                        } else {
                            "offline"
                        }
                    );
                    log::info!(
                        "Players: {}/{}",
                        snapshot.slots.num_used,
                        snapshot.slots.capacity
                    );
                    log::info!(
                        "Installed: {} DLC(s), {} mod(s)",
                        snapshot.mod_count(ModKind::Dlc),
                        snapshot.mod_count(ModKind::Mod)
                    );
                    log::info!(
                        "Money: {}, play time: {}",
                        group_thousands(snapshot.career_savegame.money),
                        format_minutes(snapshot.career_savegame.play_time)
                    );
                }
                None => log::info!("No state stored yet."),
            }
        }
    }

    log::info!("Done!");

    Ok(())
}
