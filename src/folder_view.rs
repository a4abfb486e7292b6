//! Folder list view
//!
//! Composes sorting, selection and the download orchestrator into the render
//! model of one folder listing. Every handler takes `&self`: view state sits
//! behind a short-lived lock that is never held across an `.await`, so sort
//! clicks and selection toggles keep working while archives are generating.

use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

use crate::config::ListingConfig;
use crate::formatting::{format_modified, human_file_size};
use crate::generation::{EntityKey, GenerationState};
use crate::host::HostServices;
use crate::orchestrator::{DownloadOrchestrator, GenerationOutcome};
use crate::permalink;
use crate::remote::{ArchiveService, FolderEntry, ListingError, ListingSource};
use crate::selection::{is_selectable, AllState, SelectionTracker};
use crate::sort::{self, SortDirection, SortKey, SortSpec};
use crate::token_store::TokenStore;

/// Sortable columns, in display order
const COLUMNS: &[(SortKey, &str)] = &[
    (SortKey::Name, "Name"),
    (SortKey::LastModifiedDateTime, "Last Modified"),
    (SortKey::Size, "Size"),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnHeader {
    pub key: SortKey,
    pub label: String,
    /// Set on the active sort column only
    pub indicator: Option<SortDirection>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderModel {
    pub columns: Vec<ColumnHeader>,
    pub select_all: AllState,
    pub selected_count: usize,
    pub copy_selected_enabled: bool,
    pub download_selected_enabled: bool,
    pub selection_generating: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowModel {
    pub id: String,
    pub name: String,
    /// Navigation target (folder listing or file preview)
    pub href: String,
    pub is_folder: bool,
    pub modified: String,
    pub size: String,
    /// Checkbox shown; false for folders and the password marker
    pub selectable: bool,
    pub selected: bool,
    /// Folder archive in flight
    pub generating: bool,
    /// Direct raw link for files
    pub download_href: Option<String>,
    /// Preview thumbnail for files
    pub thumbnail_href: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingModel {
    pub path: String,
    pub header: HeaderModel,
    pub rows: Vec<RowModel>,
}

struct ViewState {
    path: String,
    entries: Vec<FolderEntry>,
    sort: SortSpec,
    selection: SelectionTracker,
}

/// One rendered folder listing
pub struct FolderListView {
    state: Mutex<ViewState>,
    orchestrator: DownloadOrchestrator,
    password_marker: String,
    datetime_format: String,
}

impl FolderListView {
    pub fn new(
        config: &ListingConfig,
        tokens: TokenStore,
        archive: Arc<dyn ArchiveService>,
        host: HostServices,
    ) -> Self {
        Self {
            state: Mutex::new(ViewState {
                path: "/".to_string(),
                entries: Vec::new(),
                sort: SortSpec::default(),
                selection: SelectionTracker::default(),
            }),
            orchestrator: DownloadOrchestrator::new(
                &config.base_url,
                config.allow_proxy,
                tokens,
                archive,
                host,
            ),
            password_marker: config.password_marker.clone(),
            datetime_format: config.datetime_format.clone(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ViewState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Show a new folder snapshot.
    ///
    /// In-flight generations of the previous folder are abandoned, the
    /// selection is discarded and sorting starts over at name ascending.
    pub fn navigate(&self, path: &str, entries: Vec<FolderEntry>) {
        self.orchestrator.navigate_away();
        let mut state = self.lock();
        state.selection = SelectionTracker::new(&entries, &self.password_marker);
        state.path = path.to_string();
        state.entries = entries;
        state.sort = SortSpec::default();
        debug!("Showing {} ({} entries)", state.path, state.entries.len());
    }

    /// Fetch `path` from the listing API and show it
    pub async fn load(&self, source: &dyn ListingSource, path: &str) -> Result<(), ListingError> {
        let token = self.orchestrator.tokens().resolve(path);
        let entries = source.list(path, token.as_ref()).await?;
        self.navigate(path, entries);
        Ok(())
    }

    pub fn path(&self) -> String {
        self.lock().path.clone()
    }

    pub fn sort_spec(&self) -> SortSpec {
        self.lock().sort
    }

    pub fn click_header(&self, key: SortKey) {
        let mut state = self.lock();
        state.sort = state.sort.click(key);
        debug!("Sort -> {} {:?}", state.sort.key, state.sort.direction);
    }

    pub fn sorted_entries(&self) -> Vec<FolderEntry> {
        let state = self.lock();
        sort::sort(&state.entries, state.sort)
    }

    pub fn toggle(&self, id: &str) {
        self.lock().selection.toggle(id);
    }

    pub fn toggle_all(&self) {
        self.lock().selection.toggle_all();
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.lock().selection.is_selected(id)
    }

    pub fn selected_count(&self) -> usize {
        self.lock().selection.selected_count()
    }

    pub fn all_state(&self) -> AllState {
        self.lock().selection.all_state()
    }

    pub fn generation_state(&self, key: &EntityKey) -> GenerationState {
        self.orchestrator.state(key)
    }

    fn find(&self, id: &str) -> Option<(String, FolderEntry)> {
        let state = self.lock();
        state
            .entries
            .iter()
            .find(|e| e.id == id)
            .map(|e| (state.path.clone(), e.clone()))
    }

    /// Row copy-link action: folder page for folders, raw link for files
    pub fn copy_link(&self, id: &str) -> bool {
        let Some((path, entry)) = self.find(id) else {
            return false;
        };
        if entry.is_folder {
            self.orchestrator.copy_folder_link(&path, &entry)
        } else {
            self.orchestrator.copy_file_link(&path, &entry)
        }
    }

    /// Row download link of a file; folders are archived instead
    pub fn download_link(&self, id: &str, proxy: bool) -> Option<String> {
        let (path, entry) = self.find(id)?;
        (!entry.is_folder).then(|| self.orchestrator.file_link(&path, &entry, proxy))
    }

    /// Row download action of a folder
    pub async fn download_folder(&self, id: &str) -> Option<GenerationOutcome> {
        let (path, entry) = self.find(id)?;
        if !entry.is_folder {
            return None;
        }
        Some(self.orchestrator.download_folder(&path, &entry).await)
    }

    fn selection_snapshot(&self) -> (String, Vec<FolderEntry>) {
        let state = self.lock();
        let sorted = sort::sort(&state.entries, state.sort);
        let selected = state
            .selection
            .selected_entries(&sorted)
            .into_iter()
            .cloned()
            .collect();
        (state.path.clone(), selected)
    }

    /// Bulk copy action: raw links of all selected files
    pub fn copy_selected(&self) -> bool {
        let (path, selected) = self.selection_snapshot();
        let refs: Vec<&FolderEntry> = selected.iter().collect();
        self.orchestrator.copy_selected_links(&path, &refs)
    }

    /// Bulk download action: archive of all selected files
    pub async fn download_selected(&self) -> GenerationOutcome {
        let (path, selected) = self.selection_snapshot();
        self.orchestrator.download_selected(&path, &selected).await
    }

    pub fn render(&self) -> ListingModel {
        let state = self.lock();
        let sorted = sort::sort(&state.entries, state.sort);
        let selected_count = state.selection.selected_count();
        let selection_generating =
            self.orchestrator.state(&EntityKey::Selection) == GenerationState::Generating;

        let columns = COLUMNS
            .iter()
            .map(|(key, label)| ColumnHeader {
                key: *key,
                label: label.to_string(),
                indicator: (state.sort.key == *key).then_some(state.sort.direction),
            })
            .collect();

        let header = HeaderModel {
            columns,
            select_all: state.selection.all_state(),
            selected_count,
            copy_selected_enabled: selected_count > 0,
            download_selected_enabled: selected_count > 0 && !selection_generating,
            selection_generating,
        };

        let token = self.orchestrator.tokens().resolve(&state.path);
        let rows = sorted
            .iter()
            .map(|entry| {
                let item_path = permalink::child_path(&state.path, &entry.name);
                let generating = entry.is_folder
                    && self.orchestrator.state(&EntityKey::Folder(entry.id.clone()))
                        == GenerationState::Generating;
                RowModel {
                    id: entry.id.clone(),
                    name: entry.name.clone(),
                    href: item_path.clone(),
                    is_folder: entry.is_folder,
                    modified: format_modified(&entry.last_modified_date_time, &self.datetime_format),
                    size: human_file_size(entry.size),
                    selectable: is_selectable(entry, &self.password_marker),
                    selected: state.selection.is_selected(&entry.id),
                    generating,
                    download_href: (!entry.is_folder)
                        .then(|| self.orchestrator.file_link(&state.path, entry, false)),
                    thumbnail_href: (!entry.is_folder).then(|| {
                        permalink::thumbnail_url(
                            &item_path,
                            permalink::ThumbnailSize::Medium,
                            token.as_ref(),
                        )
                    }),
                }
            })
            .collect();

        ListingModel {
            path: state.path.clone(),
            header,
            rows,
        }
    }
}
