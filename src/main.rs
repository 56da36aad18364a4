use anyhow::{Context, Result};
use chrono::DateTime;
use clap::Parser;
use std::path::PathBuf;
use tokio::sync::mpsc;

use smartmarks::app::App;
use smartmarks::clipboard::SystemClipboard;
use smartmarks::config::Config;
use smartmarks::session::{SessionContext, SESSION_TOKEN_ENV};
use smartmarks::storage::{Database, DatabaseError};
use smartmarks::sync::{validate_new_bookmark, BookmarkViewModel, SyncEvent};
use smartmarks::ui;

/// Get the config directory path (~/.config/smartmarks/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    let config_dir = PathBuf::from(home).join(".config").join("smartmarks");
    Ok(config_dir)
}

/// Send logs to a file so they do not draw over the TUI.
fn init_logging(config_dir: &std::path::Path) -> Result<()> {
    let log_path = config_dir.join("smartmarks.log");
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {}", log_path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

#[derive(Parser, Debug)]
#[command(
    name = "smartmarks",
    about = "Terminal bookmark manager with live sync across sessions"
)]
struct Args {
    /// Owner id to sign in as (overrides user_id in config.toml)
    #[arg(long, value_name = "ID")]
    user: Option<String>,

    /// Email shown in the header (overrides email in config.toml)
    #[arg(long)]
    email: Option<String>,

    /// Config file to use instead of ~/.config/smartmarks/config.toml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Reset database (delete and recreate)
    #[arg(long)]
    reset_db: bool,

    /// Print the signed-in user's bookmarks and exit
    #[arg(long, conflicts_with_all = ["add", "delete"])]
    list: bool,

    /// Add a bookmark and exit
    #[arg(long, num_args = 2, value_names = ["TITLE", "URL"], conflicts_with = "delete")]
    add: Option<Vec<String>>,

    /// Delete a bookmark by id and exit
    #[arg(long, value_name = "ID")]
    delete: Option<i64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up config directory
    let config_dir = get_config_dir()?;
    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;
        println!("Created config directory: {}", config_dir.display());
    }

    init_logging(&config_dir)?;

    // Set directory permissions on Unix (user-only access)
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        match std::fs::metadata(&config_dir) {
            Ok(metadata) => {
                let mut perms = metadata.permissions();
                perms.set_mode(0o700);
                if let Err(e) = std::fs::set_permissions(&config_dir, perms) {
                    tracing::warn!(
                        path = %config_dir.display(),
                        error = %e,
                        "Failed to set config directory permissions to 0700"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(
                    path = %config_dir.display(),
                    error = %e,
                    "Failed to read config directory metadata"
                );
            }
        }
    }

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| config_dir.join("config.toml"));
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let session = match SessionContext::resolve(
        args.user.as_deref(),
        args.email.as_deref(),
        &config,
        std::env::var(SESSION_TOKEN_ENV).ok(),
    ) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    tracing::info!(owner = session.owner_id(), "Session resolved");

    let db_path = config.database_path(&config_dir);

    // Handle --reset-db flag
    if args.reset_db && db_path.exists() {
        std::fs::remove_file(&db_path).context("Failed to delete database")?;
        println!("Database reset.");
    }

    let db_path_str = db_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;
    let db = match Database::open(db_path_str).await {
        Ok(db) => db,
        Err(DatabaseError::Locked) => {
            eprintln!("Error: {}", DatabaseError::Locked);
            std::process::exit(1);
        }
        Err(e) => {
            return Err(anyhow::anyhow!("Failed to open database: {}", e));
        }
    };

    // One-shot commands
    if args.list {
        return list_bookmarks(&db, &session).await;
    }
    if let Some(values) = &args.add {
        let [title, url] = values.as_slice() else {
            anyhow::bail!("--add takes exactly a TITLE and a URL");
        };
        return add_bookmark(&db, &session, title, url).await;
    }
    if let Some(id) = args.delete {
        return delete_bookmark(&db, &session, id).await;
    }

    // Create event channel for background tasks
    let (event_tx, event_rx) = mpsc::channel::<SyncEvent>(32);

    let mut vm = BookmarkViewModel::new(
        db.clone(),
        session.owner_id(),
        config.poll_interval(),
        event_tx,
        Box::new(SystemClipboard::new()),
    );

    // Subscribe before reading the snapshot so no change falls between them
    let subscribe_result = vm.subscribe(session.owner_id()).await;
    if let Err(e) = &subscribe_result {
        tracing::warn!(error = %e, "Starting without live sync");
    }
    let snapshot = db
        .snapshot_for_owner(session.owner_id())
        .await
        .context("Failed to load bookmarks")?;
    vm.load_snapshot(snapshot);

    let mut app = App::new(session, vm);
    if let Err(e) = subscribe_result {
        app.set_status(e.to_string());
    }

    // Run the TUI
    ui::run(&mut app, event_rx).await?;

    db.close().await;
    println!("Goodbye!");
    Ok(())
}

async fn list_bookmarks(db: &Database, session: &SessionContext) -> Result<()> {
    let bookmarks = db
        .get_bookmarks_for_owner(session.owner_id())
        .await
        .context("Failed to load bookmarks")?;

    if bookmarks.is_empty() {
        println!("No bookmarks yet.");
        return Ok(());
    }
    for bm in &bookmarks {
        let date = DateTime::from_timestamp(bm.created_at, 0)
            .map(|dt| dt.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        println!("{:>6}  {}  {}  {}", bm.id, date, bm.title, bm.url);
    }
    Ok(())
}

async fn add_bookmark(db: &Database, session: &SessionContext, title: &str, url: &str) -> Result<()> {
    let (title, url) = match validate_new_bookmark(title, url) {
        Ok(fields) => fields,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    let bm = db
        .insert_bookmark(session.owner_id(), &title, &url)
        .await
        .context("Failed to save bookmark")?;
    println!("Saved bookmark {}: {}", bm.id, bm.title);
    Ok(())
}

async fn delete_bookmark(db: &Database, session: &SessionContext, id: i64) -> Result<()> {
    // Only the owner's own rows may be deleted
    let owned = db
        .get_bookmark(id)
        .await
        .context("Failed to look up bookmark")?
        .is_some_and(|bm| bm.owner_id == session.owner_id());
    if !owned {
        eprintln!("Error: no bookmark with id {} for this user", id);
        std::process::exit(1);
    }

    db.delete_bookmark(id)
        .await
        .context("Failed to delete bookmark")?;
    println!("Deleted bookmark {}.", id);
    Ok(())
}
