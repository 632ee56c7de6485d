use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use shared::{
    domain::{Chat, EntityId, PaneCount, Provider, Store},
    error::ApiException,
    protocol::{ApiResponse, WriteStatus},
};
use tracing::debug;
use url::Url;

pub mod coordinator;
pub mod panes;
pub mod snapshot;
pub mod title;
pub mod view_model;
pub mod viewport;

pub use coordinator::{
    CoordinatorConfig, UpdateCoordinator, UpdateError, UpdateOutcome, WriteFailure, WriteTarget,
};
pub use panes::PaneCountController;
pub use snapshot::{SelectionState, Snapshot, SnapshotStore, UpdateGuard};
pub use title::{StoreInfoTitle, TitleProps};
pub use view_model::{ProviderCatalog, TitleBarView};
pub use viewport::{MobileDetector, ResizeSubscription, Viewport, MOBILE_BREAKPOINT};

/// Remote reads and writes the title bar depends on.
#[async_trait]
pub trait StoreBackend: Send + Sync {
    async fn fetch_providers(&self, owner: &str) -> Result<Vec<Provider>>;
    async fn persist_store(&self, owner: &str, name: &str, store: &Store) -> Result<WriteStatus>;
    async fn persist_chat(&self, owner: &str, name: &str, chat: &Chat) -> Result<WriteStatus>;
}

/// Callbacks into the owner of the title bar. Every hook defaults to a no-op.
pub trait TitleDelegate: Send + Sync {
    fn on_store_updated(&self, _store: &Store) {}
    fn on_chat_updated(&self, _chat: &Chat) {}
    /// Runs synchronously on a store pick, before the write completes. A
    /// returned chat replaces the cached chat until the update settles.
    fn on_store_change(&self, _store: &Store) -> Option<Chat> {
        None
    }
    fn on_update_auto_read(&self, _enabled: bool) {}
    fn on_pane_count_change(&self, _count: PaneCount) {}
}

pub struct NoopDelegate;

impl TitleDelegate for NoopDelegate {}

#[derive(Debug, Clone, PartialEq)]
pub enum TitleEvent {
    Saved {
        store_written: bool,
        chat_written: bool,
    },
    SaveFailed {
        message: String,
    },
    PaneCountChanged(PaneCount),
}

/// [`StoreBackend`] over the Casibase REST API.
pub struct HttpBackend {
    http: Client,
    base_url: Url,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build http client")?;
        Self::with_client(http, base_url)
    }

    pub fn with_client(http: Client, base_url: &str) -> Result<Self> {
        let mut base_url =
            Url::parse(base_url).with_context(|| format!("invalid server url '{base_url}'"))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub async fn fetch_stores(&self, owner: &str) -> Result<Vec<Store>> {
        let response: ApiResponse<Vec<Store>> = self
            .decode(
                self.http
                    .get(self.endpoint("api/get-stores")?)
                    .query(&[("owner", owner)]),
            )
            .await
            .with_context(|| format!("failed to fetch stores for '{owner}'"))?;
        Ok(response
            .into_result()
            .map_err(ApiException::from)?
            .unwrap_or_default())
    }

    pub async fn fetch_chat(&self, owner: &str, name: &str) -> Result<Chat> {
        let id = EntityId::new(owner, name);
        let response: ApiResponse<Chat> = self
            .decode(
                self.http
                    .get(self.endpoint("api/get-chat")?)
                    .query(&[("id", id.to_string())]),
            )
            .await
            .with_context(|| format!("failed to fetch chat {id}"))?;
        response
            .into_result()
            .map_err(ApiException::from)?
            .with_context(|| format!("chat {id} not found"))
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .with_context(|| format!("failed to build endpoint '{path}'"))
    }

    async fn post_update<T: serde::Serialize + Sync>(
        &self,
        path: &str,
        id: EntityId,
        record: &T,
    ) -> Result<WriteStatus> {
        let response: ApiResponse<serde_json::Value> = self
            .decode(
                self.http
                    .post(self.endpoint(path)?)
                    .query(&[("id", id.to_string())])
                    .json(record),
            )
            .await
            .with_context(|| format!("{path} failed for {id}"))?;
        debug!(%id, path, ok = response.is_ok(), "persisted record");
        Ok(response.into())
    }

    async fn decode<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<ApiResponse<T>> {
        let response = request.send().await?.error_for_status()?;
        response
            .json()
            .await
            .context("failed to decode response envelope")
    }
}

#[async_trait]
impl StoreBackend for HttpBackend {
    async fn fetch_providers(&self, owner: &str) -> Result<Vec<Provider>> {
        let response: ApiResponse<Vec<Provider>> = self
            .decode(
                self.http
                    .get(self.endpoint("api/get-providers")?)
                    .query(&[("owner", owner)]),
            )
            .await
            .with_context(|| format!("failed to fetch providers for '{owner}'"))?;
        let providers = response
            .into_result()
            .map_err(ApiException::from)?
            .unwrap_or_default();
        Ok(providers)
    }

    async fn persist_store(&self, owner: &str, name: &str, store: &Store) -> Result<WriteStatus> {
        self.post_update("api/update-store", EntityId::new(owner, name), store)
            .await
    }

    async fn persist_chat(&self, owner: &str, name: &str, chat: &Chat) -> Result<WriteStatus> {
        self.post_update("api/update-chat", EntityId::new(owner, name), chat)
            .await
    }
}

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
