//! Latest-known chat/store/provider values and the published selection state.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use shared::domain::{Chat, Store};
use tokio::sync::watch;
use tracing::debug;

/// Selection shown by the title bar, published to observers on every change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    pub selected_store: Option<String>,
    pub selected_provider: Option<String>,
    pub is_updating: bool,
}

/// Last values confirmed by the backend (or handed in by the owner).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub chat: Option<Chat>,
    pub store: Option<Store>,
    pub provider: Option<String>,
}

struct SnapshotState {
    confirmed: Snapshot,
    pending_chat: Option<Chat>,
    selection: SelectionState,
}

/// Owned cell for the cached entities. The cached snapshot and the published
/// selection are written under the same lock at every transition.
pub struct SnapshotStore {
    state: Mutex<SnapshotState>,
    published: watch::Sender<SelectionState>,
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotStore {
    pub fn new() -> Self {
        let (published, _) = watch::channel(SelectionState::default());
        Self {
            state: Mutex::new(SnapshotState {
                confirmed: Snapshot::default(),
                pending_chat: None,
                selection: SelectionState::default(),
            }),
            published,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SelectionState> {
        self.published.subscribe()
    }

    pub fn selection(&self) -> SelectionState {
        self.lock().selection.clone()
    }

    pub fn confirmed(&self) -> Snapshot {
        self.lock().confirmed.clone()
    }

    /// Chat as the owner currently sees it, including an optimistic copy
    /// returned from `on_store_change` while a write is in flight.
    pub fn current_chat(&self) -> Option<Chat> {
        let state = self.lock();
        state
            .pending_chat
            .clone()
            .or_else(|| state.confirmed.chat.clone())
    }

    pub fn is_updating(&self) -> bool {
        self.lock().selection.is_updating
    }

    /// Refreshes the cache from the owner's latest chat and the store that
    /// chat is bound to. The selection follows the bound store.
    pub fn sync_from_props(&self, chat: Option<&Chat>, store_info: Option<&Store>) {
        self.transition(|state| {
            state.confirmed.chat = chat.cloned();
            state.pending_chat = None;
            if let Some(store) = store_info {
                state.confirmed.store = Some(store.clone());
                state.confirmed.provider = store.provider().map(str::to_string);
                state.selection.selected_store = Some(store.name.clone());
                state.selection.selected_provider = state.confirmed.provider.clone();
            }
        });
    }

    /// Optimistic selection of a store; the provider follows only when the
    /// store has one bound.
    pub fn select_store(&self, store: &str, provider: Option<&str>) {
        self.transition(|state| {
            state.selection.selected_store = Some(store.to_string());
            if let Some(provider) = provider {
                state.selection.selected_provider = Some(provider.to_string());
            }
        });
    }

    pub fn select_provider(&self, provider: &str) {
        self.transition(|state| {
            state.selection.selected_provider = Some(provider.to_string());
        });
    }

    pub fn set_pending_chat(&self, chat: Chat) {
        self.lock().pending_chat = Some(chat);
    }

    pub fn confirm(&self, chat: Chat, store: Option<Store>, provider: Option<String>) {
        self.transition(|state| {
            state.selection.selected_store = store.as_ref().map(|store| store.name.clone());
            state.selection.selected_provider = provider.clone();
            state.confirmed = Snapshot {
                chat: Some(chat),
                store,
                provider,
            };
            state.pending_chat = None;
        });
    }

    /// Puts the selection back to the last confirmed values.
    pub fn revert(&self) {
        self.transition(|state| {
            state.pending_chat = None;
            state.selection.selected_store =
                state.confirmed.store.as_ref().map(|store| store.name.clone());
            state.selection.selected_provider = state.confirmed.provider.clone();
        });
    }

    /// Claims the in-flight gate. Returns `None` while another update holds
    /// it; the gate is released when the returned guard drops.
    pub fn begin_update(self: &Arc<Self>) -> Option<UpdateGuard> {
        let mut claimed = false;
        self.transition(|state| {
            if !state.selection.is_updating {
                state.selection.is_updating = true;
                claimed = true;
            }
        });
        if !claimed {
            debug!("update already in flight; dropping request");
            return None;
        }
        Some(UpdateGuard {
            store: Arc::clone(self),
        })
    }

    fn finish_update(&self) {
        self.transition(|state| state.selection.is_updating = false);
    }

    fn transition(&self, apply: impl FnOnce(&mut SnapshotState)) {
        let mut state = self.lock();
        apply(&mut state);
        self.published.send_if_modified(|published| {
            if *published == state.selection {
                false
            } else {
                *published = state.selection.clone();
                true
            }
        });
    }

    fn lock(&self) -> MutexGuard<'_, SnapshotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Holds the in-flight gate of a [`SnapshotStore`].
pub struct UpdateGuard {
    store: Arc<SnapshotStore>,
}

impl UpdateGuard {
    pub fn snapshots(&self) -> &Arc<SnapshotStore> {
        &self.store
    }
}

impl Drop for UpdateGuard {
    fn drop(&mut self) {
        self.store.finish_update();
    }
}

#[cfg(test)]
#[path = "tests/snapshot_tests.rs"]
mod tests;
