//! # RWR — Resource World Resetter
//!
//! Periodically wipes and regenerates a resource world so it stays fresh.
//!
//! Usage:
//!   rwr run                      # Run the reset scheduler until Ctrl+C
//!   rwr status                   # Show policy and next reset
//!   rwr reset                    # Reset the resource world now
//!   rwr set hour 4               # Change the restart hour
//!   rwr set type weekly          # daily | weekly | monthly

mod host;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use rwr_core::traits::NoHealth;
use rwr_core::{ConfigStore, FileConfigStore, PolicyChange, ResetConfig, ResetType};
use rwr_scheduler::{
    Clock, Host, LocalClock, ResetHandle, ResetService, RunOutcome, TokioTimers, spawn_service,
};

use crate::host::{DirectoryHost, LogNotifier};

#[derive(Parser)]
#[command(
    name = "rwr",
    version,
    about = "🌍 RWR — scheduled resource world resets"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scheduler until interrupted
    Run,
    /// Show the active policy and the next reset
    Status,
    /// Reset the resource world immediately
    Reset,
    /// Change one policy setting
    Set {
        #[command(subcommand)]
        setting: Setting,
    },
}

#[derive(Subcommand)]
enum Setting {
    /// Name of the resource world
    WorldName { name: String },
    /// daily, weekly or monthly
    Type { reset_type: String },
    /// Weekday (1 = Monday) or day of month
    Day { day: u32 },
    /// Restart hour, 0-23
    Hour { hour: u32 },
    /// Warning lead time in minutes, 0 disables
    Warning { minutes: u32 },
}

fn expand_path(p: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(p).to_string())
}

/// Build the service against the directory host and start its task.
fn start_service(store: Arc<FileConfigStore>) -> Result<(ResetHandle, tokio::task::JoinHandle<()>)> {
    let config = store.load()?;
    let container = expand_path(&config.world_container);
    std::fs::create_dir_all(&container)?;

    let (tx, rx) = mpsc::unbounded_channel();
    let directory = Arc::new(DirectoryHost::new(&container));
    let host = Host {
        registry: directory.clone(),
        manager: directory,
        notifier: Arc::new(LogNotifier),
        health: Arc::new(NoHealth),
        executor: Arc::new(TokioTimers::new(
            tx.clone(),
            tokio::runtime::Handle::current(),
            config.ticks_per_second,
        )),
    };
    let service = ResetService::new(host, store, Arc::new(LocalClock))?;
    Ok(spawn_service(service, tx, rx))
}

fn print_status(config: &ResetConfig, config_path: &Path) -> Result<()> {
    let next = rwr_scheduler::compute_next_reset(LocalClock.now(), config);
    let container = expand_path(&config.world_container);
    let world_dir = container.join(&config.world_name);

    println!("🌍 RWR v{}", env!("CARGO_PKG_VERSION"));
    println!("   📄 Config:        {}", config_path.display());
    println!("   🗺️  World:         {}", config.world_name);
    println!("   📂 Storage:       {}", world_dir.display());
    println!("   🔁 Reset type:    {}", config.reset_type);
    match config.reset_type {
        ResetType::Daily => {}
        ResetType::Weekly => println!("   📅 Reset day:     {} (1 = Monday)", config.reset_day),
        ResetType::Monthly => println!("   📅 Reset day:     {}", config.reset_day),
    }
    println!("   ⏰ Restart hour:  {}:00", config.restart_time);
    println!("   📢 Warning:       {} minutes", config.reset_warning_time);
    println!("   ⏭️  Next reset:    {}", next.reset_at);
    if let Some(warning_at) = next.warning_at {
        println!("   ⏭️  Next warning:  {}", warning_at);
    }
    println!();
    println!("{}", serde_json::to_string_pretty(&next)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "rwr=debug,rwr_scheduler=debug,rwr_core=debug"
    } else {
        "rwr=info,rwr_scheduler=info,rwr_core=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    let config_path = match &cli.config {
        Some(path) => expand_path(path),
        None => ResetConfig::default_path(),
    };
    let store = Arc::new(FileConfigStore::new(&config_path));

    match cli.command {
        Commands::Run => {
            let (handle, task) = start_service(store)?;
            println!("🌍 RWR v{} — scheduler running. Press Ctrl+C to stop.", env!("CARGO_PKG_VERSION"));
            tokio::signal::ctrl_c().await?;
            handle.shutdown();
            task.await?;
            println!("\n👋 Scheduler stopped.");
        }

        Commands::Status => {
            let config = store.load()?;
            print_status(&config, &config_path)?;
        }

        Commands::Reset => {
            let (handle, task) = start_service(store)?;
            let report = handle.trigger_reset().await;
            handle.shutdown();
            task.await?;

            let report = report?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if let RunOutcome::Failed(reason) = report.outcome {
                bail!("reset of '{}' failed: {}", report.world_name, reason);
            }
            println!("✅ Reset of '{}' completed in {:.1}s", report.world_name, report.elapsed.as_secs_f64());
        }

        Commands::Set { setting } => {
            let change = match setting {
                Setting::WorldName { name } => PolicyChange::WorldName(name),
                Setting::Type { reset_type } => match ResetType::parse(&reset_type) {
                    Some(t) => PolicyChange::ResetType(t),
                    None => bail!("invalid reset type '{reset_type}', expected daily, weekly or monthly"),
                },
                Setting::Day { day } => PolicyChange::ResetDay(day),
                Setting::Hour { hour } => PolicyChange::RestartTime(hour),
                Setting::Warning { minutes } => PolicyChange::ResetWarningTime(minutes),
            };
            // Only the document changes; the world is created and timers armed by `rwr run`
            let next = store.load()?.with(change)?;
            store.save(&next)?;

            println!("✅ Setting saved to {}", store.path().display());
            println!("   A running scheduler picks it up on restart.\n");
            print_status(&next, &config_path)?;
        }
    }

    Ok(())
}
