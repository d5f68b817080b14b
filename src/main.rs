//! Binary entrypoint for the realmkeeper CLI.
//!
//! Commands:
//! - `init` - write a starter `config.toml`
//! - `start` - open the world store and run the realm against the console host
//! - `status` - list namespaces and their record counts
//! - `snapshot create|list|verify|restore` - manage world snapshots
//!
//! See the library crate docs for module-level details: `realmkeeper::`.
use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use log::{error, info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};

use realmkeeper::config::Config;
use realmkeeper::console;
use realmkeeper::host::SimulatedHost;
use realmkeeper::realm::Realm;
use realmkeeper::storage::{open_backend, RecordStore, SnapshotManager};

#[derive(Parser)]
#[command(name = "realmkeeper")]
#[command(about = "Gameplay state service for scripted game worlds")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the realm, reading world input from stdin
    Start,
    /// Write a default configuration file
    Init,
    /// Show namespaces and record counts
    Status,
    /// Create, list, verify or restore world snapshots
    Snapshot {
        #[command(subcommand)]
        action: SnapshotAction,
    },
}

#[derive(Subcommand)]
enum SnapshotAction {
    /// Export every property into a new snapshot
    Create {
        #[arg(short, long)]
        label: Option<String>,
    },
    /// List snapshots, newest first
    List,
    /// Check a snapshot's checksum
    Verify { id: String },
    /// Write a snapshot's properties back into the world store
    Restore { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Init = cli.command {
        init_logging(&None, cli.verbose);
        if std::path::Path::new(&cli.config).exists() {
            return Err(anyhow!("{} already exists; refusing to overwrite", cli.config));
        }
        Config::create_default(&cli.config).await?;
        info!("Configuration file created at {}", cli.config);
        return Ok(());
    }

    let config = Config::load(&cli.config).await?;
    init_logging(&Some(config.clone()), cli.verbose);

    match cli.command {
        Commands::Init => {}
        Commands::Start => run(config).await?,
        Commands::Status => {
            let store = open_store(&config)?;
            println!("World: {} ({:?} backend)", config.world.name, config.world.backend);
            let namespaces = store.namespaces()?;
            if namespaces.is_empty() {
                println!("  (no records yet)");
            }
            for ns in namespaces {
                println!("  {:<20} {:>6} records", ns, store.len(&ns)?);
            }
        }
        Commands::Snapshot { action } => {
            let mut manager = SnapshotManager::new(config.snapshot_dir(), config.snapshot.keep_last)?;
            match action {
                SnapshotAction::Create { label } => {
                    let store = open_store(&config)?;
                    let meta = manager.create(store.backend(), label)?;
                    let pruned = manager.prune()?;
                    println!(
                        "Created {} ({} properties, {} bytes)",
                        meta.id, meta.property_count, meta.size_bytes
                    );
                    for id in pruned {
                        println!("Pruned {}", id);
                    }
                }
                SnapshotAction::List => {
                    for meta in manager.list() {
                        println!(
                            "{}  {}  {:>4} props  {}{}",
                            meta.id,
                            meta.created_at.format("%Y-%m-%d %H:%M:%S"),
                            meta.property_count,
                            meta.label.unwrap_or_default(),
                            if meta.verified { "  [verified]" } else { "" }
                        );
                    }
                }
                SnapshotAction::Verify { id } => {
                    if manager.verify(&id)? {
                        println!("{} OK", id);
                    } else {
                        return Err(anyhow!("snapshot {} failed verification", id));
                    }
                }
                SnapshotAction::Restore { id } => {
                    let store = open_store(&config)?;
                    let restored = manager.restore(&id, store.backend())?;
                    println!("Restored {} properties from {}", restored, id);
                }
            }
        }
    }

    Ok(())
}

fn open_store(config: &Config) -> Result<RecordStore> {
    let backend = open_backend(config.world.backend, &config.world.data_path())
        .map_err(|e| anyhow!("Failed to open world store in {}: {}", config.world.data_dir, e))?;
    Ok(RecordStore::from_boxed(backend))
}

async fn run(config: Config) -> Result<()> {
    let store = open_store(&config)?;
    let mut snapshots = if config.snapshot.enabled {
        Some(SnapshotManager::new(config.snapshot_dir(), config.snapshot.keep_last)?)
    } else {
        None
    };
    let host = SimulatedHost::new(chrono::Utc::now()).with_echo();
    let tick_ms = config.world.tick_ms;
    let snapshot_every = std::time::Duration::from_secs(config.snapshot.interval_minutes.max(1) * 60);
    let mut realm = Realm::new(host, store, config);

    info!("realm '{}' running; tick {}ms", realm.config().world.name, tick_ms);
    println!("Type '<player>: <message>' to chat, or /join, /leave, /tp, /give, /hold, /use, /hit, /die, /interact, /break, /answer, /kill, /who");

    let mut ticker = tokio::time::interval(std::time::Duration::from_millis(tick_ms));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut snapshot_timer = tokio::time::interval(snapshot_every);
    snapshot_timer.tick().await;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                realm.host().set_now(chrono::Utc::now());
                realm.tick().await;
            }
            _ = snapshot_timer.tick(), if snapshots.is_some() => {
                if let Some(manager) = snapshots.as_mut() {
                    match manager.create(realm.store().backend(), Some("periodic".to_string())) {
                        Ok(meta) => {
                            info!("periodic snapshot {}", meta.id);
                            if let Err(e) = manager.prune() {
                                warn!("snapshot prune failed: {}", e);
                            }
                        }
                        Err(e) => error!("periodic snapshot failed: {}", e),
                    }
                }
            }
            line = lines.next_line(), if stdin_open => {
                match line {
                    Ok(Some(line)) => match console::parse_line(&line) {
                        Ok(Some(input)) => {
                            if let Some(outcome) = console::apply(&mut realm, input).await {
                                if outcome.cancel {
                                    println!("(event cancelled)");
                                }
                            }
                        }
                        Ok(None) => {}
                        Err(e) => println!("? {}", e),
                    },
                    Ok(None) => {
                        info!("stdin closed; press Ctrl-C to stop");
                        stdin_open = false;
                    }
                    Err(e) => {
                        warn!("stdin read failed: {}", e);
                        stdin_open = false;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                break;
            }
        }
    }
    realm.shutdown();
    Ok(())
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // Base level from CLI verbosity overrides config
    let base_level = match verbosity {
        0 => config
            .as_ref()
            .and_then(|c| c.logging.level.parse().ok())
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);
    builder.filter_module("sled", log::LevelFilter::Warn);

    let file = config.as_ref().and_then(|c| c.logging.file.clone()).and_then(|path| {
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .ok()
    });
    let audit_path = config.as_ref().and_then(|c| c.logging.audit_file.clone());
    let file = file.map(|f| std::sync::Arc::new(std::sync::Mutex::new(f)));
    // Echo to stdout when there is no log file or stdout is a terminal.
    let is_tty = atty::is(atty::Stream::Stdout);

    builder.format(move |fmt, record| {
        let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
        let line = format!("{} [{}] {}", ts, record.level(), record.args());

        if let Some(ref f) = file {
            if let Ok(mut guard) = f.lock() {
                let _ = writeln!(guard, "{}", line);
            }
        }

        if record.target() == "audit" {
            if let Some(ref path) = audit_path {
                if let Ok(mut af) = std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                {
                    let _ = writeln!(af, "{}", line);
                }
            }
        }

        if file.is_none() || is_tty {
            writeln!(fmt, "{}", line)
        } else {
            Ok(())
        }
    });
    let _ = builder.try_init();
}
