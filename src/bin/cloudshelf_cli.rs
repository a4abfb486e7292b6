//! Cloudshelf CLI — browse a saved folder listing from the terminal
//!
//! Usage:
//!   cloudshelf-cli ls <snapshot> [--path P] [--sort KEY] [--desc]   Show a listing
//!   cloudshelf-cli link <snapshot> <name> [--proxy]                   Print a raw link
//!   cloudshelf-cli select <snapshot> [names...] [--all] [--copy]      Links of a selection
//!   cloudshelf-cli config show|validate                               Inspect configuration

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use cloudshelf::config::{self, ListingConfig};
use cloudshelf::host::{DirectorySink, SystemClipboard, TracingNotifier};
use cloudshelf::permalink;
use cloudshelf::remote::{ArchiveOutput, ArchiveRequest};
use cloudshelf::{
    AccessToken, ArchiveService, Clipboard, FolderEntry, FolderListView, HostServices, ListingError,
    ListingModel, ListingSource, SortKey, TokenStore,
};

#[derive(Parser)]
#[command(
    name = "cloudshelf-cli",
    about = "Cloudshelf CLI — browse a saved folder listing",
    version,
    long_about = "Reads folder listings saved from the drive index API (or written by this tool)\nand prints sorted listings, raw download links and selection permalinks."
)]
struct Cli {
    /// Config file (default: <config dir>/cloudshelf/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a folder listing
    Ls {
        /// Listing snapshot (JSON)
        snapshot: PathBuf,
        /// Folder path the snapshot was taken at, unencoded (e.g. "/My Docs")
        #[arg(long, default_value = "/")]
        path: String,
        /// Sort column: name, modified, size
        #[arg(long, default_value = "name")]
        sort: String,
        /// Sort descending
        #[arg(long)]
        desc: bool,
        /// Print the render model as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the raw download link of a file
    Link {
        snapshot: PathBuf,
        /// File name
        name: String,
        /// Folder path, unencoded
        #[arg(long, default_value = "/")]
        path: String,
        /// Route the download through the index
        #[arg(long)]
        proxy: bool,
        /// Access token for a protected folder
        #[arg(long)]
        token: Option<String>,
    },
    /// Select files and print their permalinks
    Select {
        snapshot: PathBuf,
        /// File names to toggle
        names: Vec<String>,
        /// Folder path, unencoded
        #[arg(long, default_value = "/")]
        path: String,
        /// Select every selectable file
        #[arg(long)]
        all: bool,
        #[arg(long)]
        token: Option<String>,
        /// Copy to the system clipboard instead of printing
        #[arg(long)]
        copy: bool,
    },
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Check the configuration for errors
    Validate,
}

/// Listing source backed by a saved JSON snapshot
struct SnapshotFile(PathBuf);

/// Listing API page shape: `{ "folder": { "value": [...] } }`
#[derive(Deserialize)]
struct ListingPage {
    folder: FolderChildren,
}

#[derive(Deserialize)]
struct FolderChildren {
    value: Vec<FolderEntry>,
}

#[async_trait]
impl ListingSource for SnapshotFile {
    async fn list(
        &self,
        _path: &str,
        _token: Option<&AccessToken>,
    ) -> Result<Vec<FolderEntry>, ListingError> {
        let content = tokio::fs::read_to_string(&self.0).await?;
        match serde_json::from_str::<Vec<FolderEntry>>(&content) {
            Ok(entries) => Ok(entries),
            Err(_) => Ok(serde_json::from_str::<ListingPage>(&content)?.folder.value),
        }
    }
}

/// Archives are built by the index's browser front end only
struct NoArchive;

#[async_trait]
impl ArchiveService for NoArchive {
    async fn generate(
        &self,
        request: ArchiveRequest,
        _cancel: CancellationToken,
    ) -> Result<ArchiveOutput, ListingError> {
        Err(ListingError::Remote(format!(
            "cannot build {} from the command line",
            request.file_name()
        )))
    }
}

/// "Clipboard" that prints to stdout
struct StdoutClipboard;

impl Clipboard for StdoutClipboard {
    fn write_text(&self, text: &str) -> Result<(), ListingError> {
        println!("{}", text);
        Ok(())
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

async fn open_view(
    config: &ListingConfig,
    snapshot: PathBuf,
    path: &str,
    token: Option<String>,
    clipboard: Arc<dyn Clipboard>,
) -> Result<FolderListView> {
    let path = permalink::encode_path(path);
    let tokens = TokenStore::with_protected_routes(&config.protected_routes);
    if let Some(token) = token {
        tokens.insert(&path, AccessToken::new(token));
    } else if tokens.is_protected(&path) {
        tracing::warn!("{} is protected but no token was given", path);
    }

    let host = HostServices {
        clipboard,
        notifier: Arc::new(TracingNotifier),
        sink: Arc::new(DirectorySink::downloads()),
    };
    let view = FolderListView::new(config, tokens, Arc::new(NoArchive), host);
    let source = SnapshotFile(snapshot.clone());
    view.load(&source, &path)
        .await
        .with_context(|| format!("Failed to load listing {:?}", snapshot))?;
    Ok(view)
}

fn print_table(model: &ListingModel) {
    println!("{}", model.path);
    let header: Vec<String> = model
        .header
        .columns
        .iter()
        .map(|c| match c.indicator {
            Some(cloudshelf::SortDirection::Asc) => format!("{} ▲", c.label),
            Some(cloudshelf::SortDirection::Desc) => format!("{} ▼", c.label),
            None => c.label.clone(),
        })
        .collect();
    println!("    {:<40} {:<20} {:>10}", header[0], header[1], header[2]);
    for row in &model.rows {
        let marker = match (row.selectable, row.selected) {
            (false, _) => "   ",
            (true, false) => "[ ]",
            (true, true) => "[x]",
        };
        let name = if row.is_folder {
            format!("{}/", row.name)
        } else {
            row.name.clone()
        };
        println!("{} {:<40} {:<20} {:>10}", marker, name, row.modified, row.size);
    }
}

/// Hand the selected permalinks to the clipboard; errors exit non-zero
fn copy_selection(view: &FolderListView) -> Result<()> {
    if view.selected_count() == 0 {
        bail!("Nothing selected");
    }
    if !view.copy_selected() {
        bail!("Failed to copy the selected permalinks");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = cli.config.clone().unwrap_or_else(config::get_config_path);
    let config = config::load_config_from(&config_path);

    match cli.command {
        Commands::Ls { snapshot, path, sort, desc, json } => {
            let view = open_view(&config, snapshot, &path, None, Arc::new(StdoutClipboard)).await?;
            let key: SortKey = sort.parse()?;
            if key != SortKey::Name {
                view.click_header(key);
            }
            if desc {
                view.click_header(key);
            }
            let model = view.render();
            if json {
                println!("{}", serde_json::to_string_pretty(&model)?);
            } else {
                print_table(&model);
            }
        }
        Commands::Link { snapshot, name, path, proxy, token } => {
            let view = open_view(&config, snapshot, &path, token, Arc::new(StdoutClipboard)).await?;
            let entry = view
                .sorted_entries()
                .into_iter()
                .find(|e| e.name == name)
                .with_context(|| format!("No entry named {:?} in {}", name, path))?;
            match view.download_link(&entry.id, proxy) {
                Some(link) => println!("{}", link),
                None => bail!("{} is a folder; folders are downloaded as archives", name),
            }
        }
        Commands::Select { snapshot, names, path, all, token, copy } => {
            let clipboard: Arc<dyn Clipboard> = if copy {
                Arc::new(SystemClipboard)
            } else {
                Arc::new(StdoutClipboard)
            };
            let view = open_view(&config, snapshot, &path, token, clipboard).await?;
            let entries = view.sorted_entries();
            for name in &names {
                match entries.iter().find(|e| &e.name == name) {
                    Some(entry) => view.toggle(&entry.id),
                    None => tracing::warn!("No entry named {:?}", name),
                }
            }
            if all {
                view.toggle_all();
            }
            eprintln!("{} selected ({:?})", view.selected_count(), view.all_state());
            copy_selection(&view)?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                println!("# {}", config_path.display());
                println!("{}", serde_json::to_string_pretty(&config)?);
            }
            ConfigAction::Validate => {
                config::validate_config(&config)?;
                println!("Configuration OK");
            }
        },
    }

    Ok(())
}
