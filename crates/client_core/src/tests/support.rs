//! Test doubles shared by the client_core unit tests.

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use shared::{
    domain::{Chat, PaneCount, Provider, Store},
    protocol::WriteStatus,
};
use tokio::sync::Notify;

use crate::{StoreBackend, TitleDelegate};

pub(crate) const OWNER: &str = "admin";

pub(crate) fn chat(store: &str) -> Chat {
    Chat {
        owner: OWNER.to_string(),
        name: "chat-1".to_string(),
        store: store.to_string(),
        ..Chat::default()
    }
}

pub(crate) fn store(name: &str, provider: &str) -> Store {
    Store {
        owner: OWNER.to_string(),
        name: name.to_string(),
        display_name: format!("Store {}", name.to_uppercase()),
        model_provider: provider.to_string(),
        ..Store::default()
    }
}

pub(crate) fn default_store(children: &[&str], providers: &[&str]) -> Store {
    Store {
        is_default: true,
        child_stores: children.iter().map(ToString::to_string).collect(),
        child_model_providers: providers.iter().map(ToString::to_string).collect(),
        ..store("root", "p1")
    }
}

pub(crate) fn provider(name: &str, category: &str) -> Provider {
    Provider {
        owner: OWNER.to_string(),
        name: name.to_string(),
        category: category.to_string(),
        ..Provider::default()
    }
}

#[derive(Default)]
pub(crate) struct RecordingBackend {
    pub providers: Vec<Provider>,
    pub fail_provider_fetch: bool,
    pub store_status: Option<WriteStatus>,
    pub chat_status: Option<WriteStatus>,
    pub chat_transport_error: Option<String>,
    pub hold_store_writes: bool,
    pub store_write_entered: Notify,
    pub release_store_writes: Notify,
    pub(crate) store_writes: Mutex<Vec<Store>>,
    pub(crate) chat_writes: Mutex<Vec<Chat>>,
    pub(crate) provider_fetches: AtomicUsize,
}

impl RecordingBackend {
    pub fn with_providers(providers: Vec<Provider>) -> Self {
        Self {
            providers,
            ..Self::default()
        }
    }

    pub fn failing_chat(message: &str) -> Self {
        Self {
            chat_status: Some(WriteStatus::failed(message)),
            ..Self::default()
        }
    }

    pub fn holding() -> Self {
        Self {
            hold_store_writes: true,
            ..Self::default()
        }
    }

    /// Waits until a held store write has started; fails instead of hanging.
    pub async fn wait_for_store_write(&self) {
        tokio::time::timeout(Duration::from_secs(5), self.store_write_entered.notified())
            .await
            .expect("store write never started");
    }

    pub fn store_writes(&self) -> Vec<Store> {
        self.store_writes.lock().expect("lock").clone()
    }

    pub fn chat_writes(&self) -> Vec<Chat> {
        self.chat_writes.lock().expect("lock").clone()
    }

    pub fn provider_fetches(&self) -> usize {
        self.provider_fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StoreBackend for RecordingBackend {
    async fn fetch_providers(&self, _owner: &str) -> Result<Vec<Provider>> {
        self.provider_fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_provider_fetch {
            return Err(anyhow!("provider service unavailable"));
        }
        Ok(self.providers.clone())
    }

    async fn persist_store(&self, _owner: &str, _name: &str, store: &Store) -> Result<WriteStatus> {
        self.store_writes.lock().expect("lock").push(store.clone());
        if self.hold_store_writes {
            self.store_write_entered.notify_one();
            self.release_store_writes.notified().await;
        }
        Ok(self.store_status.clone().unwrap_or(WriteStatus::Ok))
    }

    async fn persist_chat(&self, _owner: &str, _name: &str, chat: &Chat) -> Result<WriteStatus> {
        self.chat_writes.lock().expect("lock").push(chat.clone());
        if let Some(err) = &self.chat_transport_error {
            return Err(anyhow!(err.clone()));
        }
        Ok(self.chat_status.clone().unwrap_or(WriteStatus::Ok))
    }
}

#[derive(Default)]
pub(crate) struct RecordingDelegate {
    pub optimistic_chat: Option<Chat>,
    pub stores_updated: Mutex<Vec<Store>>,
    pub chats_updated: Mutex<Vec<Chat>>,
    pub store_changes: Mutex<Vec<String>>,
    pub auto_read: Mutex<Vec<bool>>,
    pub pane_counts: Mutex<Vec<u8>>,
}

impl TitleDelegate for RecordingDelegate {
    fn on_store_updated(&self, store: &Store) {
        self.stores_updated.lock().expect("lock").push(store.clone());
    }

    fn on_chat_updated(&self, chat: &Chat) {
        self.chats_updated.lock().expect("lock").push(chat.clone());
    }

    fn on_store_change(&self, store: &Store) -> Option<Chat> {
        self.store_changes
            .lock()
            .expect("lock")
            .push(store.name.clone());
        self.optimistic_chat.clone()
    }

    fn on_update_auto_read(&self, enabled: bool) {
        self.auto_read.lock().expect("lock").push(enabled);
    }

    fn on_pane_count_change(&self, count: PaneCount) {
        self.pane_counts.lock().expect("lock").push(count.get());
    }
}
