//! Per-entity generation state
//!
//! Each folder and the bulk selection of a view carries its own
//! `Idle`/`Generating` state. A generation holds a child of the view's root
//! cancellation token; navigating away cancels the root, which abandons every
//! in-flight job at once.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Entity a generation runs for
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum EntityKey {
    /// A folder row, keyed by its item id
    Folder(String),
    /// The view's bulk selection
    Selection,
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKey::Folder(id) => write!(f, "folder {}", id),
            EntityKey::Selection => write!(f, "selection"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationState {
    #[default]
    Idle,
    Generating,
}

struct Slot {
    epoch: u64,
    token: CancellationToken,
}

struct Inner {
    root: CancellationToken,
    slots: HashMap<EntityKey, Slot>,
    next_epoch: u64,
}

/// Generation states of one folder view
pub struct GenerationTracker {
    inner: Mutex<Inner>,
}

impl GenerationTracker {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                root: CancellationToken::new(),
                slots: HashMap::new(),
                next_epoch: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Move `key` to `Generating`.
    ///
    /// Returns `None` while a generation for the same entity is still in
    /// flight. The guard returns the entity to `Idle` when dropped, whether
    /// the job completed, failed or was abandoned mid-await.
    pub fn begin(&self, key: EntityKey) -> Option<GenerationGuard<'_>> {
        let mut inner = self.lock();
        if inner.slots.contains_key(&key) {
            return None;
        }
        inner.next_epoch += 1;
        let epoch = inner.next_epoch;
        let token = inner.root.child_token();
        inner.slots.insert(key.clone(), Slot { epoch, token: token.clone() });
        debug!("{} -> generating (epoch {})", key, epoch);
        Some(GenerationGuard {
            tracker: self,
            key,
            epoch,
            token,
        })
    }

    pub fn state(&self, key: &EntityKey) -> GenerationState {
        if self.lock().slots.contains_key(key) {
            GenerationState::Generating
        } else {
            GenerationState::Idle
        }
    }

    pub fn generating_count(&self) -> usize {
        self.lock().slots.len()
    }

    /// Abandon every in-flight generation and start from a fresh root token
    pub fn cancel_all(&self) {
        let mut inner = self.lock();
        inner.root.cancel();
        inner.root = CancellationToken::new();
        let abandoned = inner.slots.len();
        inner.slots.clear();
        if abandoned > 0 {
            debug!("Abandoned {} in-flight generation(s)", abandoned);
        }
    }

    fn finish(&self, key: &EntityKey, epoch: u64) {
        let mut inner = self.lock();
        // A newer generation may own the slot after a navigation
        if inner.slots.get(key).is_some_and(|slot| slot.epoch == epoch) {
            inner.slots.remove(key);
            debug!("{} -> idle", key);
        }
    }
}

impl Default for GenerationTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for GenerationTracker {
    fn drop(&mut self) {
        self.lock().root.cancel();
    }
}

/// Live generation of one entity
pub struct GenerationGuard<'a> {
    tracker: &'a GenerationTracker,
    key: EntityKey,
    epoch: u64,
    token: CancellationToken,
}

impl GenerationGuard<'_> {
    pub fn key(&self) -> &EntityKey {
        &self.key
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for GenerationGuard<'_> {
    fn drop(&mut self) {
        self.tracker.finish(&self.key, self.epoch);
    }
}
