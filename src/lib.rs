//! Cloudshelf - folder listing engine for cloud drive indexes
//!
//! Orders folder snapshots, tracks multi-selection, builds token-aware raw
//! and proxied download links, and drives per-folder / per-selection archive
//! generation with cancellation on navigation.

pub mod config;
pub mod folder_view;
pub mod formatting;
pub mod generation;
pub mod host;
pub mod orchestrator;
pub mod permalink;
pub mod remote;
pub mod selection;
pub mod sort;
pub mod token_store;

pub use config::ListingConfig;
pub use folder_view::{FolderListView, ListingModel, RowModel};
pub use generation::{EntityKey, GenerationState};
pub use host::{Clipboard, DownloadSink, HostServices, Notifier, Toast, ToastLevel};
pub use orchestrator::{DownloadOrchestrator, GenerationOutcome};
pub use remote::{ArchiveService, FolderEntry, ListingError, ListingSource};
pub use selection::{AllState, SelectionTracker};
pub use sort::{SortDirection, SortKey, SortSpec};
pub use token_store::{AccessToken, TokenStore};
