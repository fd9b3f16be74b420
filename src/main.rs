//! # ChimeClaw — timed messages
//!
//! Usage:
//!   chimeclaw run                        # Start the dispatch loop until Ctrl-C
//!   chimeclaw rules                      # List loaded rules and next fire times
//!   chimeclaw fire 0                     # Send rule #0 right now
//!   chimeclaw purge-recalled             # Drop expired recalled-message records
//!   chimeclaw init                       # Write a default config file

use anyhow::{Context, Result};
use chimeclaw_core::ChimeClawConfig;
use chimeclaw_core::traits::MessageStore;
use chimeclaw_core::types::{GenerateParams, unix_now};
use chimeclaw_memory::SqliteMessageStore;
use chimeclaw_scheduler::{DispatchStats, Dispatcher, ScheduleStore, spawn_dispatch_loop};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "chimeclaw",
    version,
    about = "🔔 ChimeClaw — scheduled messages grounded in recent conversation"
)]
struct Cli {
    /// Config file (default: ~/.chimeclaw/config.toml)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the dispatch loop until Ctrl-C
    Run,
    /// Print the loaded rules with their next fire time
    Rules,
    /// Resolve and deliver one rule immediately
    Fire {
        /// Rule index as printed by `rules`
        index: usize,
    },
    /// Delete recalled-message records past the retention window
    PurgeRecalled,
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn config_path(cli: &Cli) -> PathBuf {
    match &cli.config {
        Some(p) => PathBuf::from(shellexpand::tilde(p).to_string()),
        None => ChimeClawConfig::default_path(),
    }
}

fn load_config(cli: &Cli) -> Result<ChimeClawConfig> {
    let config = match &cli.config {
        Some(_) => ChimeClawConfig::load_from(&config_path(cli))?,
        None => ChimeClawConfig::load()?,
    };
    Ok(config)
}

fn generate_params(config: &ChimeClawConfig) -> GenerateParams {
    GenerateParams {
        model: config.llm.model.clone(),
        temperature: config.llm.temperature,
        max_tokens: config.llm.max_tokens,
    }
}

fn open_store(config: &ChimeClawConfig) -> Result<Arc<SqliteMessageStore>> {
    let path = config.storage.expanded_path();
    let store = SqliteMessageStore::open(&path)
        .with_context(|| format!("opening message store at {}", path.display()))?;
    tracing::info!("💾 Message store: {}", path.display());
    Ok(Arc::new(store))
}

fn build_dispatcher(config: &ChimeClawConfig, store: Arc<SqliteMessageStore>) -> Result<Arc<Dispatcher>> {
    let generator = chimeclaw_providers::create_generator(&config.llm)?;
    let channel = chimeclaw_channels::create_channel(&config.channel)?;
    tracing::info!("🤖 Generator: {} ({})", generator.name(), config.llm.model);
    tracing::info!("📡 Channel: {}", channel.name());

    Ok(Arc::new(Dispatcher::new(
        store.clone(),
        store,
        Arc::from(generator),
        Arc::from(channel),
        &config.bot,
        generate_params(config),
    )))
}

/// Load schedules and start the loop. With nothing scheduled, the store,
/// generator and channel are never built.
fn start(config: &ChimeClawConfig) -> Result<Option<(JoinHandle<()>, Arc<DispatchStats>)>> {
    let schedules = Arc::new(ScheduleStore::load(&config.timed_messages));
    if schedules.is_empty() {
        return Ok(None);
    }

    let dispatcher = build_dispatcher(config, open_store(config)?)?;
    let stats = dispatcher.stats();
    Ok(spawn_dispatch_loop(schedules, dispatcher, &config.timed_messages).map(|handle| (handle, stats)))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "chimeclaw=debug,chimeclaw_scheduler=debug,chimeclaw_providers=debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    match &cli.command {
        Command::Init { force } => {
            let path = config_path(&cli);
            if path.exists() && !force {
                println!("⚠️  {} already exists (use --force to overwrite)", path.display());
                return Ok(());
            }
            ChimeClawConfig::default().save_to(&path)?;
            println!("✅ Config written to {}", path.display());
        }

        Command::Rules => {
            let config = load_config(&cli)?;
            let schedules = ScheduleStore::load(&config.timed_messages);
            if schedules.is_empty() {
                println!("No timed messages configured.");
                return Ok(());
            }
            let now = chrono::Local::now().naive_local();
            for (i, rule) in schedules.rules().iter().enumerate() {
                let next = rule
                    .next_fire_after(now)
                    .map(|at| at.format("%a %Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "-".into());
                let kind = if rule.dynamic {
                    format!("dynamic, {} msgs", rule.context_size)
                } else {
                    "static".into()
                };
                println!("#{i:<3} {:<24} [{kind}] next: {next}", rule.label());
                println!("     {}", rule.template);
            }
        }

        Command::Fire { index } => {
            let config = load_config(&cli)?;
            let schedules = ScheduleStore::load(&config.timed_messages);
            let rule = schedules
                .get(*index)
                .with_context(|| format!("no rule #{index} ({} loaded)", schedules.len()))?;

            let dispatcher = build_dispatcher(&config, open_store(&config)?)?;
            let event = dispatcher
                .dispatch(rule, chrono::Local::now().naive_local())
                .await?;
            let source = if event.content.is_synthesized() { "synthesized" } else { "template" };
            println!("✅ Sent to {} ({source}):\n{}", event.rule.recipient_id, event.content.text());
        }

        Command::PurgeRecalled => {
            let config = load_config(&cli)?;
            let store = open_store(&config)?;
            let removed = store.remove_recalled(unix_now()).await?;
            println!("🧹 Removed {removed} expired recalled message(s)");
        }

        Command::Run => {
            let config = load_config(&cli)?;
            println!("🔔 ChimeClaw v{}", env!("CARGO_PKG_VERSION"));

            let running = start(&config)?;
            if running.is_none() {
                println!("Nothing scheduled; waiting for Ctrl-C.");
            }

            tokio::signal::ctrl_c().await?;
            if let Some((handle, stats)) = running {
                handle.abort();
                let snap = stats.snapshot();
                tracing::info!(
                    "👋 Shutting down (fired {}, delivered {}, failed {}, fallbacks {}, skipped late {})",
                    snap.fired,
                    snap.delivered,
                    snap.failed,
                    snap.fallbacks,
                    snap.skipped_late
                );
            }
        }
    }

    Ok(())
}
