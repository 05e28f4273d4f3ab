use anyhow::{Context, Result};
use chrono::{Local, TimeZone};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn};

use clipstack::clipboard_history::{
    ArboardBackend, ClipboardBackend, ClipboardEngine, DetachedBackend, EngineEvent,
    EngineHandle, EngineOptions, Entry, MonitorMode, NoopPresenter, Persistence,
    SystemKeystrokeInjector,
};
use clipstack::config::{self, Config};
use clipstack::error::ClipboardHistoryError;
use clipstack::logging;

#[derive(Parser)]
#[command(name = "clipstack")]
#[command(about = "Clipboard history: capture, search and replay clipboard entries", long_about = None)]
struct Cli {
    /// Config file (default: ~/.clipstack/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch the clipboard and record every change
    Watch {
        /// Stop after N captured entries
        #[arg(short, long)]
        max_events: Option<usize>,
    },
    /// List history entries, newest first
    List {
        /// Only show favorites
        #[arg(short, long)]
        favorites: bool,
        /// Case-insensitive text search
        #[arg(short, long)]
        search: Option<String>,
        /// Show at most N entries
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Print the full text of an entry
    Show { id: String },
    /// Put an entry back on the clipboard
    Copy { id: String },
    /// Put an entry on the clipboard and paste it into the focused app
    Paste { id: String },
    /// Delete an entry
    Remove { id: String },
    /// Toggle the favorite flag of an entry
    Favorite { id: String },
    /// Replace the text of an entry
    Edit { id: String, text: String },
    /// Delete every entry, favorites included
    Clear,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => config::load_config_from(path),
        None => config::load_config(),
    };

    let data_dir = config.get_data_dir();
    let default_filter = match cli.command {
        Commands::Watch { .. } => logging::DEFAULT_FILTER,
        _ => "warn",
    };
    let _guard = logging::init_with(&data_dir.join("logs"), default_filter);

    match cli.command {
        Commands::Watch { max_events } => run_watch(&config, max_events),
        command => run_once(&config, command),
    }
}

fn run_watch(config: &Config, max_events: Option<usize>) -> Result<()> {
    let options = EngineOptions::from_config(config, MonitorMode::Poll);
    let poll_interval = options.poll_interval;
    let persistence = Persistence::in_dir(&config.get_data_dir());

    println!("clipstack: watching clipboard");
    println!("- history: {}", persistence.history_path().display());
    println!("- stop: Ctrl+C");

    let mut handle = EngineHandle::spawn(move || {
        let backend = ArboardBackend::new().context("Failed to open system clipboard")?;
        Ok(ClipboardEngine::new(
            &options,
            Box::new(backend),
            Box::new(SystemKeystrokeInjector),
            Box::new(NoopPresenter),
            persistence,
        ))
    })?;

    let events = handle.subscribe().map_err(user_error)?;
    handle.start_polling(poll_interval)?;

    // The first view is the history as loaded; only later head changes are captures
    let mut last_head: Option<String> = None;
    let mut baseline = true;
    let mut captured = 0usize;
    for event in events {
        let EngineEvent::ViewChanged(view) = event else {
            continue;
        };
        let head = view.first().map(|e| e.id().to_string());
        if std::mem::take(&mut baseline) {
            last_head = head;
            continue;
        }
        if head.is_none() || head == last_head {
            continue;
        }
        last_head = head;

        if let Some(entry) = view.first() {
            println!("{}", format_entry(entry));
        }
        captured += 1;
        if max_events.is_some_and(|max| captured >= max) {
            break;
        }
    }

    handle.shutdown();
    info!(captured, "Watch finished");
    Ok(())
}

fn run_once(config: &Config, command: Commands) -> Result<()> {
    let needs_clipboard = matches!(command, Commands::Copy { .. } | Commands::Paste { .. });
    let backend: Box<dyn ClipboardBackend> = match ArboardBackend::new() {
        Ok(backend) => Box::new(backend),
        Err(e) if needs_clipboard => {
            return Err(anyhow::Error::new(e).context("Failed to open system clipboard"));
        }
        Err(e) => {
            warn!(error = %e, "System clipboard unavailable");
            Box::new(DetachedBackend)
        }
    };

    let options = EngineOptions {
        capture_on_start: false,
        ..EngineOptions::from_config(config, MonitorMode::Push)
    };
    let mut engine = ClipboardEngine::new(
        &options,
        backend,
        Box::new(SystemKeystrokeInjector),
        Box::new(NoopPresenter),
        Persistence::in_dir(&config.get_data_dir()),
    );

    match command {
        Commands::List {
            favorites,
            search,
            limit,
        } => {
            let view = engine.filtered_view(favorites, search.as_deref());
            for entry in view.iter().take(limit.unwrap_or(usize::MAX)) {
                println!("{}", format_entry(entry));
            }
        }
        Commands::Show { id } => {
            let entry = engine
                .entry(&resolve(&engine, &id)?)
                .ok_or_else(|| user_error(ClipboardHistoryError::EntryNotFound(id)))?;
            match entry.text() {
                Some(text) => println!("{}", text),
                None => {
                    for payload in entry.payloads() {
                        println!(
                            "{} ({}, {} bytes)",
                            payload.format,
                            payload.kind.as_str(),
                            payload.bytes.len()
                        );
                    }
                }
            }
        }
        Commands::Copy { id } => {
            let id = resolve(&engine, &id)?;
            engine.copy(&id).map_err(user_error)?;
            println!("Copied {}", short_id(&id));
        }
        Commands::Paste { id } => {
            let id = resolve(&engine, &id)?;
            engine.paste(&id).map_err(user_error)?;
        }
        Commands::Remove { id } => {
            let id = resolve(&engine, &id)?;
            engine.remove(&id);
            println!("Removed {}", short_id(&id));
        }
        Commands::Favorite { id } => {
            let id = resolve(&engine, &id)?;
            match engine.toggle_favorite(&id) {
                Some(true) => println!("Favorited {}", short_id(&id)),
                Some(false) => println!("Unfavorited {}", short_id(&id)),
                None => return Err(user_error(ClipboardHistoryError::EntryNotFound(id))),
            }
        }
        Commands::Edit { id, text } => {
            let id = resolve(&engine, &id)?;
            engine.edit_text(&id, &text).map_err(user_error)?;
        }
        Commands::Clear => {
            let count = engine.clear();
            println!("Cleared {} entries", count);
        }
        Commands::Watch { .. } => unreachable!("watch is handled by run_watch"),
    }

    engine.shutdown();
    Ok(())
}

fn resolve(engine: &ClipboardEngine, id_or_prefix: &str) -> Result<String> {
    engine
        .resolve_id(id_or_prefix)
        .ok_or_else(|| user_error(ClipboardHistoryError::EntryNotFound(id_or_prefix.to_string())))
}

fn user_error(e: ClipboardHistoryError) -> anyhow::Error {
    let message = e.user_message();
    anyhow::Error::new(e).context(message)
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

fn format_entry(entry: &Entry) -> String {
    let time = Local
        .timestamp_millis_opt(entry.timestamp())
        .single()
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default();
    let star = if entry.is_favorite() { "*" } else { " " };
    let preview = entry.preview().replace(['\n', '\r'], " ");
    format!("{} {} {}  {}", short_id(entry.id()), star, time, preview)
}
