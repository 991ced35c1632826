//! Berean CLI - offline-first Bible study data from the terminal
//!
//! All commands write to the local store and return immediately; `berean
//! sync` pushes accumulated changes to the configured Supabase backend.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use thiserror::Error;

use berean_core::auth::StaticAuth;
use berean_core::models::{
    BookmarkPatch, NewBookmark, NewHighlight, NewSermon, NewVerseNote, UserId,
};
use berean_core::remote::{RemoteError, SupabaseRestStore};
use berean_core::sync::{
    BackgroundScheduler, PassOutcome, SchedulerError, SyncEngine, SyncSettings, TokioScheduler,
};
use berean_core::UserStore;

#[derive(Parser)]
#[command(name = "berean")]
#[command(about = "Offline-first Bible study data: bookmarks, highlights, notes, sermons")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Optional path to the local database file
    #[arg(long, value_name = "PATH", global = true)]
    db_path: Option<PathBuf>,

    /// Acting user id (defaults to $BEREAN_USER)
    #[arg(long, value_name = "USER_ID", global = true)]
    user: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage verse bookmarks
    Bookmark {
        #[command(subcommand)]
        action: BookmarkAction,
    },
    /// Manage verse highlights
    Highlight {
        #[command(subcommand)]
        action: HighlightAction,
    },
    /// Manage verse notes
    Note {
        #[command(subcommand)]
        action: NoteAction,
    },
    /// Manage stored sermons
    Sermon {
        #[command(subcommand)]
        action: SermonAction,
    },
    /// Push local changes to the remote backend
    Sync {
        /// Keep running and sync on the configured interval
        #[arg(long)]
        watch: bool,
    },
    /// Show local sync state
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum BookmarkAction {
    /// Bookmark a verse
    Add {
        book: i64,
        chapter: i64,
        verse: i64,
        /// Attach a short note
        #[arg(long)]
        note: Option<String>,
        /// Attach tags (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// List bookmarks, newest first
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Replace a bookmark's note text
    Annotate { id: String, note: String },
    /// Delete a bookmark
    Delete { id: String },
}

#[derive(Subcommand)]
enum HighlightAction {
    /// Highlight a verse range within one chapter
    Add {
        book: i64,
        chapter: i64,
        verse_start: i64,
        verse_end: i64,
        /// Hex color, e.g. #FFEB3B
        #[arg(long)]
        color: Option<String>,
    },
    /// List highlights in one chapter
    List {
        book: i64,
        chapter: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change a highlight's color
    Recolor { id: String, color: String },
    /// Delete a highlight
    Delete { id: String },
}

#[derive(Subcommand)]
enum NoteAction {
    /// Write the note for a verse (replaces any existing note)
    Set {
        book: i64,
        chapter: i64,
        verse: i64,
        content: Vec<String>,
    },
    /// List notes in one chapter
    List {
        book: i64,
        chapter: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a note
    Delete { id: String },
}

#[derive(Subcommand)]
enum SermonAction {
    /// Import a sermon from a JSON file
    Import {
        /// Path to a JSON sermon record
        path: PathBuf,
    },
    /// List sermons, newest first
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a sermon
    Delete { id: String },
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Core(#[from] berean_core::Error),
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("No note content provided")]
    EmptyContent,
    #[error("No user configured. Pass --user or set BEREAN_USER.")]
    UserRequired,
    #[error(
        "Sync is not configured. Set SUPABASE_URL, SUPABASE_ANON_KEY and SUPABASE_ACCESS_TOKEN to enable `berean sync`."
    )]
    SyncNotConfigured,
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
                .add_directive("berean=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let store = UserStore::open_path(resolve_db_path(cli.db_path))?;

    match cli.command {
        Commands::Bookmark { action } => {
            run_bookmark(&store, &resolve_user(cli.user)?, action).await?;
        }
        Commands::Highlight { action } => {
            run_highlight(&store, &resolve_user(cli.user)?, action).await?;
        }
        Commands::Note { action } => run_note(&store, &resolve_user(cli.user)?, action).await?,
        Commands::Sermon { action } => {
            run_sermon(&store, &resolve_user(cli.user)?, action).await?;
        }
        Commands::Sync { watch } => run_sync(store, resolve_user(cli.user)?, watch).await?,
        Commands::Status { json } => run_status(&store, json).await?,
    }

    Ok(())
}

fn resolve_db_path(explicit: Option<PathBuf>) -> PathBuf {
    explicit
        .or_else(|| std::env::var_os("BEREAN_DB").map(PathBuf::from))
        .unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("berean")
                .join("berean.db")
        })
}

fn resolve_user(explicit: Option<String>) -> Result<UserId, CliError> {
    explicit
        .or_else(|| std::env::var("BEREAN_USER").ok())
        .map(UserId::from)
        .ok_or(CliError::UserRequired)
}

async fn run_bookmark(
    store: &UserStore,
    user: &UserId,
    action: BookmarkAction,
) -> Result<(), CliError> {
    match action {
        BookmarkAction::Add {
            book,
            chapter,
            verse,
            note,
            tags,
        } => {
            let bookmark = store
                .create_bookmark(
                    user,
                    NewBookmark {
                        book_id: book,
                        chapter,
                        verse,
                        note,
                        tags: if tags.is_empty() { None } else { Some(tags) },
                    },
                )
                .await?;
            println!("{}", bookmark.id);
        }
        BookmarkAction::List { json } => {
            let bookmarks = store.list_bookmarks(user).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&bookmarks)?);
            } else {
                for bookmark in bookmarks {
                    println!(
                        "{}  {}:{}:{}  [{}]{}",
                        bookmark.id,
                        bookmark.book_id,
                        bookmark.chapter,
                        bookmark.verse,
                        bookmark.sync_status,
                        bookmark
                            .note
                            .map(|note| format!("  {note}"))
                            .unwrap_or_default()
                    );
                }
            }
        }
        BookmarkAction::Annotate { id, note } => {
            let updated = store
                .update_bookmark(
                    &id,
                    BookmarkPatch {
                        note: Some(note),
                        tags: None,
                    },
                )
                .await?;
            println!("{}", updated.id);
        }
        BookmarkAction::Delete { id } => {
            store.delete_bookmark(&id).await?;
            println!("{id}");
        }
    }
    Ok(())
}

async fn run_highlight(
    store: &UserStore,
    user: &UserId,
    action: HighlightAction,
) -> Result<(), CliError> {
    match action {
        HighlightAction::Add {
            book,
            chapter,
            verse_start,
            verse_end,
            color,
        } => {
            let highlight = store
                .create_highlight(
                    user,
                    NewHighlight {
                        book_id: book,
                        chapter,
                        verse_start,
                        verse_end,
                        color,
                    },
                )
                .await?;
            println!("{}", highlight.id);
        }
        HighlightAction::List {
            book,
            chapter,
            json,
        } => {
            let highlights = store.highlights_for_chapter(user, book, chapter).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&highlights)?);
            } else {
                for highlight in highlights {
                    println!(
                        "{}  {}:{}:{}-{}  {}  [{}]",
                        highlight.id,
                        highlight.book_id,
                        highlight.chapter,
                        highlight.verse_start,
                        highlight.verse_end,
                        highlight.color,
                        highlight.sync_status
                    );
                }
            }
        }
        HighlightAction::Recolor { id, color } => {
            let updated = store.recolor_highlight(&id, &color).await?;
            println!("{}", updated.id);
        }
        HighlightAction::Delete { id } => {
            store.delete_highlight(&id).await?;
            println!("{id}");
        }
    }
    Ok(())
}

async fn run_note(store: &UserStore, user: &UserId, action: NoteAction) -> Result<(), CliError> {
    match action {
        NoteAction::Set {
            book,
            chapter,
            verse,
            content,
        } => {
            let content = content.join(" ");
            if content.trim().is_empty() {
                return Err(CliError::EmptyContent);
            }
            let note = store
                .put_note(
                    user,
                    NewVerseNote {
                        book_id: book,
                        chapter,
                        verse,
                        content,
                    },
                )
                .await?;
            println!("{}", note.id);
        }
        NoteAction::List {
            book,
            chapter,
            json,
        } => {
            let notes = store.notes_for_chapter(user, book, chapter).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&notes)?);
            } else {
                for note in notes {
                    println!(
                        "{}  {}:{}:{}  [{}]  {}",
                        note.id, note.book_id, note.chapter, note.verse, note.sync_status,
                        note.content
                    );
                }
            }
        }
        NoteAction::Delete { id } => {
            store.delete_note(&id).await?;
            println!("{id}");
        }
    }
    Ok(())
}

async fn run_sermon(
    store: &UserStore,
    user: &UserId,
    action: SermonAction,
) -> Result<(), CliError> {
    match action {
        SermonAction::Import { path } => {
            let raw = std::fs::read_to_string(path)?;
            let params: NewSermon = serde_json::from_str(&raw)?;
            let sermon = store.create_sermon(user, params).await?;
            println!("{}", sermon.id);
        }
        SermonAction::List { json } => {
            let sermons = store.list_sermons(user).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&sermons)?);
            } else {
                for sermon in sermons {
                    println!(
                        "{}  {}  ({}, {})  [{}]",
                        sermon.id,
                        sermon.title,
                        sermon.sermon_type,
                        sermon.language,
                        sermon.sync_status
                    );
                }
            }
        }
        SermonAction::Delete { id } => {
            store.delete_sermon(&id).await?;
            println!("{id}");
        }
    }
    Ok(())
}

async fn run_sync(store: UserStore, user: UserId, watch: bool) -> Result<(), CliError> {
    let engine = Arc::new(build_engine(store, user)?);

    report_pass(&engine).await?;
    if !watch {
        return Ok(());
    }

    let interval = engine.settings().interval;
    let scheduler = TokioScheduler::new();
    scheduler.register("berean-sync", interval, engine)?;
    println!("Watching; syncing every {}s. Ctrl-C to stop.", interval.as_secs());
    tokio::signal::ctrl_c().await?;
    scheduler.unregister("berean-sync")?;
    Ok(())
}

async fn report_pass(engine: &SyncEngine) -> Result<(), CliError> {
    let report = engine.sync_once().await?;
    match report.outcome {
        PassOutcome::NotAuthenticated => println!("Skipped: not authenticated"),
        PassOutcome::AlreadyRunning => println!("Skipped: sync already in progress"),
        PassOutcome::Success | PassOutcome::PartialFailure => {
            println!(
                "Pushed {} row(s), applied {} queued operation(s)",
                report.pushed, report.queue_applied
            );
            if report.push_failures > 0 || report.queue_retried > 0 {
                println!(
                    "{} push(es) and {} queued operation(s) failed; they will be retried",
                    report.push_failures, report.queue_retried
                );
            }
            for dropped in &report.dropped {
                println!(
                    "Dropped {} {} {} after exhausting retries: {}",
                    dropped.operation, dropped.entity_type, dropped.entity_id, dropped.last_error
                );
            }
        }
    }
    Ok(())
}

fn build_engine(store: UserStore, user: UserId) -> Result<SyncEngine, CliError> {
    let (url, anon_key, access_token) = match (
        std::env::var("SUPABASE_URL"),
        std::env::var("SUPABASE_ANON_KEY"),
        std::env::var("SUPABASE_ACCESS_TOKEN"),
    ) {
        (Ok(url), Ok(anon_key), Ok(access_token)) => (url, anon_key, access_token),
        _ => return Err(CliError::SyncNotConfigured),
    };

    let remote = SupabaseRestStore::new(url, anon_key)?;
    let auth = StaticAuth::signed_in(user, access_token);
    let settings = SyncSettings::default().with_interval(resolve_interval());
    Ok(SyncEngine::new(
        store,
        Arc::new(remote),
        Arc::new(auth),
        settings,
    ))
}

fn resolve_interval() -> Duration {
    std::env::var("BEREAN_SYNC_INTERVAL_SECS")
        .ok()
        .and_then(|raw| raw.parse().ok())
        .map_or(SyncSettings::default().interval, Duration::from_secs)
}

async fn run_status(store: &UserStore, json: bool) -> Result<(), CliError> {
    let stats = store.sync_stats().await?;

    if json {
        let payload = serde_json::json!({
            "queued": stats.queued,
            "entities": stats
                .entities
                .iter()
                .map(|entity| {
                    serde_json::json!({
                        "entity": entity.kind.as_str(),
                        "pending": entity.pending,
                        "synced": entity.synced,
                        "conflict": entity.conflict,
                        "error": entity.error,
                    })
                })
                .collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    println!("Queued operations: {}", stats.queued);
    for entity in &stats.entities {
        println!(
            "{:<12} pending {:>4}  synced {:>4}  conflict {:>4}  error {:>4}",
            entity.kind.as_str(),
            entity.pending,
            entity.synced,
            entity.conflict,
            entity.error
        );
    }
    Ok(())
}
