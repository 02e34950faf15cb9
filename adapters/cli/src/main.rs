#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that boots the Gridmerge experience.

use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
    time::Instant,
};

use anyhow::{Context, Result};
use clap::Parser;
use gridmerge_cli::{
    config::{GameConfig, DEFAULT_CONFIG_PATH},
    input::{Action, HELP},
    session::{GameSession, SessionSettings},
    terminal::TerminalBackend,
    transfer::TransferError,
};
use gridmerge_rendering::RenderingBackend;
use gridmerge_storage::{FileStore, StorageError};
use gridmerge_system_movement::FixFeed;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Walk an infinite grid, pick up tokens, and merge them.
#[derive(Debug, Parser)]
#[command(name = "gridmerge", version, about)]
struct Args {
    /// Configuration file (defaults to gridmerge.toml when present).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Snapshot file, overriding the configuration.
    #[arg(long)]
    save: Option<PathBuf>,
    /// File of `lat,lng` fixes replayed as the live position.
    #[arg(long)]
    feed: Option<PathBuf>,
    /// Ignore and erase any saved progress.
    #[arg(long)]
    fresh: bool,
}

/// Entry point for the Gridmerge command-line interface.
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => GameConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => GameConfig::load_or_default(DEFAULT_CONFIG_PATH)
            .context("failed to load default config")?,
    };
    if let Some(save) = args.save {
        config.save_path = save;
    }
    if args.feed.is_some() {
        config.position_feed = args.feed;
    }

    let store = FileStore::new(config.save_path.clone());
    let mut session = GameSession::start(SessionSettings::from(&config), store, args.fresh)
        .context("failed to start session")?;
    if let Some(feed) = &config.position_feed {
        session.attach_feed(FixFeed::open(feed));
    }
    info!(save = %config.save_path.display(), "session started");

    let stdout = io::stdout();
    let mut backend = TerminalBackend::new(stdout.lock(), config.view_half_extent);
    backend.present(&session.presentation())?;

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let mut last_input = Instant::now();
    while let Some(line) = lines.next() {
        let line = line.context("failed to read input")?;
        let now = Instant::now();
        session.tick(now.duration_since(last_input));
        last_input = now;

        let action = match line.parse::<Action>() {
            Ok(action) => action,
            Err(error) => {
                eprintln!("{error}");
                continue;
            }
        };

        match action {
            Action::Step(direction) => keep_playing(session.step(direction)),
            Action::Goto(position) => keep_playing(session.move_to(position)),
            Action::Follow => keep_playing(session.follow_feed()),
            Action::Tap { di, dj } => keep_playing(session.interact_relative(di, dj)),
            Action::Click(cell) => keep_playing(session.interact(cell)),
            Action::Wait(duration) => session.tick(duration),
            Action::Status => {
                let status = session.status();
                let holding = status
                    .inventory
                    .map_or_else(|| "nothing".to_owned(), |token| token.to_string());
                println!(
                    "at {} in cell {}, holding {}; {} overrides, {} cells materialized, {} movement",
                    status.position,
                    status.cell,
                    holding,
                    status.overrides,
                    status.materialized,
                    if status.live { "live" } else { "manual" },
                );
                continue;
            }
            Action::Export => {
                match session.export() {
                    Ok(encoded) => println!("{encoded}"),
                    Err(error) => eprintln!("export failed: {error}"),
                }
                continue;
            }
            Action::Import(payload) => {
                match session.import(&payload) {
                    Ok(()) => {}
                    Err(TransferError::Storage(error)) => keep_playing::<()>(Err(error)),
                    Err(error) => {
                        eprintln!("import failed: {error}");
                        continue;
                    }
                }
            }
            Action::Reset => {
                print!("Erase all progress? [y/N] ");
                io::stdout().flush().context("failed to flush prompt")?;
                let confirmed = match lines.next() {
                    Some(answer) => {
                        let answer = answer.context("failed to read input")?;
                        matches!(answer.trim(), "y" | "Y" | "yes")
                    }
                    None => false,
                };
                if !confirmed {
                    continue;
                }
                keep_playing(session.reset());
            }
            Action::Help => {
                println!("{HELP}");
                continue;
            }
            Action::Quit => break,
        }

        backend.present(&session.presentation())?;
    }

    Ok(())
}

/// Storage failures leave the world intact; the session already posted a notice.
fn keep_playing<T>(result: Result<T, StorageError>) {
    if let Err(error) = result {
        warn!(%error, "continuing without a saved snapshot");
    }
}
