//! Selah CLI - Capture and review devotional entries from the terminal
//!
//! Journals and affirmations share one local store that can sync with a
//! remote replica across devices.

use std::env;
use std::io;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use selah_core::db::SyncConfig;
use selah_core::export::{render_entries_export, ExportFormat};
use selah_core::legacy::{JsonFileSource, MigrationManager, MigrationState};
use selah_core::models::NewEntry;
use selah_core::repository::EntryRepository;
use selah_core::sync::{sync_channel, SyncRequester};
use selah_core::telemetry::TracingTelemetry;
use selah_core::{Entry, EntryKind, StoreService};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedReceiver;

#[derive(Parser)]
#[command(name = "selah")]
#[command(about = "Capture devotional journal entries and affirmations")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Optional path to local database file
    #[arg(long, value_name = "PATH")]
    db_path: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new entry
    #[command(alias = "new")]
    Add {
        /// Which collection the entry belongs to
        #[arg(value_enum)]
        kind: KindArg,
        /// Entry text
        text: Vec<String>,
        /// Scripture book the entry references
        #[arg(long)]
        book: Option<String>,
        /// Verse reference within the book
        #[arg(long)]
        verse: Option<String>,
        /// Mark the entry as a favorite
        #[arg(long)]
        favorite: bool,
    },
    /// List entries, most recently modified first
    List {
        #[arg(value_enum)]
        kind: KindArg,
        /// Only favorites
        #[arg(long)]
        favorites: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Search entries by text
    Search {
        #[arg(value_enum)]
        kind: KindArg,
        /// Search query
        query: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Toggle an entry's favorite flag
    Favorite {
        #[arg(value_enum)]
        kind: KindArg,
        /// Entry ID or unique ID prefix
        id: String,
    },
    /// Delete an entry
    Delete {
        #[arg(value_enum)]
        kind: KindArg,
        /// Entry ID or unique ID prefix
        id: String,
    },
    /// Export entries
    Export {
        #[arg(value_enum)]
        kind: KindArg,
        /// Export format
        #[arg(long, value_enum, default_value_t = ExportFormatArg::Json)]
        format: ExportFormatArg,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Migrate the legacy declaration file into the store
    Migrate {
        /// Path to the legacy declarations JSON file
        file: PathBuf,
    },
    /// List resolved sync conflicts
    Conflicts {
        /// Number of conflicts to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Sync the local replica with the remote database
    Sync,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Core(#[from] selah_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("No entry text provided")]
    EmptyText,
    #[error("Entry not found for id/prefix: {0}")]
    EntryNotFound(String),
    #[error("{0}")]
    AmbiguousEntryId(String),
    #[error(
        "Sync is not configured. Set TURSO_DATABASE_URL and TURSO_AUTH_TOKEN to enable `selah sync`."
    )]
    SyncNotConfigured,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
enum KindArg {
    Journal,
    Affirmation,
}

impl From<KindArg> for EntryKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Journal => Self::Journal,
            KindArg::Affirmation => Self::Affirmation,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
enum ExportFormatArg {
    Json,
    Markdown,
}

impl From<ExportFormatArg> for ExportFormat {
    fn from(format: ExportFormatArg) -> Self {
        match format {
            ExportFormatArg::Json => Self::Json,
            ExportFormatArg::Markdown => Self::Markdown,
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("selah=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let db_path = resolve_db_path(cli.db_path);

    match cli.command {
        Commands::Add {
            kind,
            text,
            book,
            verse,
            favorite,
        } => run_add(kind, &text, book, verse, favorite, &db_path).await?,
        Commands::List {
            kind,
            favorites,
            json,
        } => run_list(kind, favorites, json, &db_path).await?,
        Commands::Search { kind, query, json } => run_search(kind, &query, json, &db_path).await?,
        Commands::Favorite { kind, id } => run_favorite(kind, &id, &db_path).await?,
        Commands::Delete { kind, id } => run_delete(kind, &id, &db_path).await?,
        Commands::Export {
            kind,
            format,
            output,
        } => run_export(kind, format, output.as_deref(), &db_path).await?,
        Commands::Migrate { file } => run_migrate(&file, &db_path).await?,
        Commands::Conflicts { limit, json } => run_conflicts(limit, json, &db_path).await?,
        Commands::Sync => run_sync(&db_path).await?,
    }

    Ok(())
}

fn resolve_db_path(cli_path: Option<PathBuf>) -> PathBuf {
    cli_path.unwrap_or_else(|| {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("selah")
            .join("selah.db")
    })
}

fn sync_config_from_env() -> Option<SyncConfig> {
    let url = env::var("TURSO_DATABASE_URL").ok()?;
    let token = env::var("TURSO_AUTH_TOKEN").ok()?;
    Some(SyncConfig::new(url, token))
}

async fn open_store(db_path: &Path) -> Result<StoreService, CliError> {
    let store = StoreService::open_path(db_path, sync_config_from_env()).await?;
    Ok(store)
}

/// Drain sync nudges produced by this invocation before exiting.
async fn drain_sync_requests(
    store: &StoreService,
    rx: &mut UnboundedReceiver<selah_core::sync::SyncRequest>,
) -> Result<(), CliError> {
    while rx.try_recv().is_ok() {
        tracing::debug!("Draining immediate sync request");
        store.sync().await?;
    }
    Ok(())
}

async fn run_add(
    kind: KindArg,
    text_parts: &[String],
    book: Option<String>,
    verse: Option<String>,
    favorite: bool,
    db_path: &Path,
) -> Result<(), CliError> {
    let text = text_parts.join(" ");
    if text.trim().is_empty() {
        return Err(CliError::EmptyText);
    }

    let store = open_store(db_path).await?;
    let (requester, mut rx) = sync_channel();
    let repo = EntryRepository::new(store.clone(), kind.into(), requester);

    let mut new = NewEntry::new(text);
    if let Some(book) = book {
        new = new.with_book(book);
    }
    if let Some(verse) = verse {
        new = new.with_verse_reference(verse);
    }
    if favorite {
        new = new.favorite();
    }

    let entry = repo.create(new).await?;
    println!("{}", entry.id);

    drain_sync_requests(&store, &mut rx).await
}

#[derive(Debug, Serialize)]
struct EntryListItem {
    id: String,
    text: String,
    book: Option<String>,
    verse_reference: Option<String>,
    category: String,
    is_favorite: bool,
    created_at: i64,
    last_modified: i64,
    relative_time: String,
}

fn entry_to_item(entry: &Entry) -> EntryListItem {
    EntryListItem {
        id: entry.id.to_string(),
        text: entry.text.clone(),
        book: entry.book.clone(),
        verse_reference: entry.verse_reference.clone(),
        category: entry.category.clone(),
        is_favorite: entry.is_favorite,
        created_at: entry.created_at,
        last_modified: entry.last_modified,
        relative_time: format_relative_time(entry.last_modified),
    }
}

fn format_relative_time(timestamp_ms: i64) -> String {
    let elapsed_ms = chrono::Utc::now().timestamp_millis() - timestamp_ms;
    let elapsed_secs = elapsed_ms / 1000;

    if elapsed_secs < 60 {
        "just now".to_string()
    } else if elapsed_secs < 3600 {
        format!("{}m ago", elapsed_secs / 60)
    } else if elapsed_secs < 86_400 {
        format!("{}h ago", elapsed_secs / 3600)
    } else {
        format!("{}d ago", elapsed_secs / 86_400)
    }
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

fn print_entries(entries: &[Entry], as_json: bool) -> Result<(), CliError> {
    if as_json {
        let items = entries.iter().map(entry_to_item).collect::<Vec<_>>();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No entries.");
        return Ok(());
    }

    for entry in entries {
        let item = entry_to_item(entry);
        let star = if item.is_favorite { "*" } else { " " };
        let reference = match (&item.book, &item.verse_reference) {
            (Some(book), Some(verse)) => format!("  [{book} {verse}]"),
            (Some(book), None) => format!("  [{book}]"),
            _ => String::new(),
        };
        println!(
            "{} {} {}{}  ({})",
            short_id(&item.id),
            star,
            item.text,
            reference,
            item.relative_time
        );
    }
    Ok(())
}

async fn run_list(
    kind: KindArg,
    favorites: bool,
    as_json: bool,
    db_path: &Path,
) -> Result<(), CliError> {
    let store = open_store(db_path).await?;
    let repo = EntryRepository::new(store, kind.into(), SyncRequester::disconnected());

    let entries = if favorites {
        repo.fetch_favorites().await?
    } else {
        repo.fetch().await?
    };
    print_entries(&entries, as_json)
}

async fn run_search(
    kind: KindArg,
    query: &str,
    as_json: bool,
    db_path: &Path,
) -> Result<(), CliError> {
    let store = open_store(db_path).await?;
    let repo = EntryRepository::new(store, kind.into(), SyncRequester::disconnected());

    let entries = repo.search(query).await?;
    print_entries(&entries, as_json)
}

/// Resolve an entry from a full id or a unique id prefix.
fn find_by_prefix(entries: Vec<Entry>, prefix: &str) -> Result<Entry, CliError> {
    let matches: Vec<Entry> = entries
        .into_iter()
        .filter(|entry| entry.id.to_string().starts_with(prefix))
        .collect();

    match matches.len() {
        0 => Err(CliError::EntryNotFound(prefix.to_string())),
        1 => Ok(matches.into_iter().next().expect("one match")),
        n => Err(CliError::AmbiguousEntryId(format!(
            "Id prefix '{prefix}' matches {n} entries; use more characters"
        ))),
    }
}

async fn run_favorite(kind: KindArg, id: &str, db_path: &Path) -> Result<(), CliError> {
    let store = open_store(db_path).await?;
    let repo = EntryRepository::new(store, kind.into(), SyncRequester::disconnected());

    let entry = find_by_prefix(repo.fetch().await?, id)?;
    let updated = repo.toggle_favorite(entry).await?;

    println!(
        "{} is {}",
        short_id(&updated.id.to_string()),
        if updated.is_favorite {
            "a favorite"
        } else {
            "no longer a favorite"
        }
    );
    Ok(())
}

async fn run_delete(kind: KindArg, id: &str, db_path: &Path) -> Result<(), CliError> {
    let store = open_store(db_path).await?;
    let repo = EntryRepository::new(store, kind.into(), SyncRequester::disconnected());

    let entry = find_by_prefix(repo.fetch().await?, id)?;
    repo.delete(&entry).await?;

    println!("Deleted {}", short_id(&entry.id.to_string()));
    Ok(())
}

async fn run_export(
    kind: KindArg,
    format: ExportFormatArg,
    output: Option<&Path>,
    db_path: &Path,
) -> Result<(), CliError> {
    let store = open_store(db_path).await?;
    let repo = EntryRepository::new(store, kind.into(), SyncRequester::disconnected());

    let entries = repo.fetch().await?;
    let rendered = render_entries_export(&entries, format.into())?;

    match output {
        Some(path) => std::fs::write(path, rendered)?,
        None => println!("{rendered}"),
    }
    Ok(())
}

async fn run_migrate(file: &Path, db_path: &Path) -> Result<(), CliError> {
    let store = open_store(db_path).await?;
    let mut state = MigrationState::load(&store).await?;

    let manager = MigrationManager::new(
        store,
        JsonFileSource::new(file),
        std::sync::Arc::new(TracingTelemetry),
    );
    let result = manager.migrate_legacy_data(&mut state).await?;

    if result.total() == 0 {
        println!("Nothing to migrate.");
    } else {
        println!(
            "Migrated {} journal entries and {} affirmations in {}ms",
            result.journal_count, result.affirmation_count, result.duration_ms
        );
    }
    Ok(())
}

async fn run_conflicts(limit: usize, as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let store = open_store(db_path).await?;
    let conflicts = store.list_conflicts(limit).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&conflicts)?);
        return Ok(());
    }

    if conflicts.is_empty() {
        println!("No sync conflicts recorded.");
        return Ok(());
    }

    for conflict in conflicts {
        println!(
            "{}  entry {}  local {} vs incoming {}  resolved {} via {}",
            conflict.id,
            short_id(&conflict.entry_id),
            conflict.local_last_modified,
            conflict.incoming_last_modified,
            conflict.resolved_at,
            conflict.strategy
        );
    }
    Ok(())
}

async fn run_sync(db_path: &Path) -> Result<(), CliError> {
    let store = open_store(db_path).await?;
    if !store.is_sync_enabled().await {
        return Err(CliError::SyncNotConfigured);
    }

    store.sync().await?;
    println!("Sync completed");
    Ok(())
}

#[cfg(test)]
mod tests;
