// Folder view multi-select
// Tracks which files of the current listing are selected for batch actions

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::remote::FolderEntry;

/// Name of the per-folder password marker file
pub const DEFAULT_PASSWORD_MARKER: &str = ".password";

/// Aggregate selection state, drives the tri-state "select all" checkbox
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllState {
    None,
    Some,
    All,
}

impl AllState {
    /// Checkbox encoding: 0 unchecked, 1 indeterminate, 2 checked
    pub fn checkbox_value(self) -> u8 {
        match self {
            AllState::None => 0,
            AllState::Some => 1,
            AllState::All => 2,
        }
    }
}

/// Whether an entry may be selected: files only, never the password marker
pub fn is_selectable(entry: &FolderEntry, password_marker: &str) -> bool {
    !entry.is_folder && entry.name != password_marker
}

/// Selection state for one folder view
#[derive(Debug, Clone, Default)]
pub struct SelectionTracker {
    selected: HashMap<String, bool>,
    /// Ids of eligible entries, in listing order
    eligible: Vec<String>,
    eligible_set: HashSet<String>,
}

impl SelectionTracker {
    pub fn new(entries: &[FolderEntry], password_marker: &str) -> Self {
        let eligible: Vec<String> = entries
            .iter()
            .filter(|e| is_selectable(e, password_marker))
            .map(|e| e.id.clone())
            .collect();
        let eligible_set = eligible.iter().cloned().collect();
        Self {
            selected: HashMap::new(),
            eligible,
            eligible_set,
        }
    }

    pub fn is_eligible(&self, id: &str) -> bool {
        self.eligible_set.contains(id)
    }

    /// Flip one item; ineligible or unknown ids are ignored
    pub fn toggle(&mut self, id: &str) {
        if !self.is_eligible(id) {
            debug!("Ignoring selection toggle for ineligible item {}", id);
            return;
        }
        let flag = self.selected.entry(id.to_string()).or_insert(false);
        *flag = !*flag;
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.get(id).copied().unwrap_or(false)
    }

    pub fn selected_count(&self) -> usize {
        self.selected.values().filter(|s| **s).count()
    }

    pub fn all_state(&self) -> AllState {
        let count = self.selected_count();
        if count == 0 {
            AllState::None
        } else if count >= self.eligible.len() {
            AllState::All
        } else {
            AllState::Some
        }
    }

    /// Select every eligible item unless all already are, in which case clear.
    pub fn toggle_all(&mut self) {
        if self.eligible.is_empty() {
            return;
        }
        if self.all_state() == AllState::All {
            self.selected.clear();
        } else {
            self.selected = self.eligible.iter().map(|id| (id.clone(), true)).collect();
        }
        debug!("Select all -> {:?}", self.all_state());
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// Selected entries of `entries`, in the order given
    pub fn selected_entries<'a>(&self, entries: &'a [FolderEntry]) -> Vec<&'a FolderEntry> {
        entries.iter().filter(|e| self.is_selected(&e.id)).collect()
    }
}
