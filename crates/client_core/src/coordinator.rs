//! Decides which remote writes a store/provider change needs, issues them
//! together and reconciles the cached snapshot with the outcome.

use std::{fmt, sync::Arc, time::Duration};

use shared::{
    domain::{Chat, EntityId, Store},
    protocol::WriteStatus,
};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, error, info};

use crate::{
    snapshot::{Snapshot, SnapshotStore, UpdateGuard},
    StoreBackend, TitleDelegate, TitleEvent,
};

#[derive(Debug, Clone, Default)]
pub struct CoordinatorConfig {
    /// Upper bound for the joined writes. `None` waits indefinitely, which
    /// leaves the gate held if a write never resolves.
    pub write_timeout: Option<Duration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Another update held the gate; the request was dropped.
    Busy,
    Unchanged,
    Applied {
        store_written: bool,
        chat_written: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteTarget {
    Store,
    Chat,
}

impl fmt::Display for WriteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteTarget::Store => f.write_str("store"),
            WriteTarget::Chat => f.write_str("chat"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteFailure {
    pub target: WriteTarget,
    pub id: EntityId,
    pub message: String,
}

impl fmt::Display for WriteFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.target, self.id, self.message)
    }
}

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("{}", describe_failures(.failures))]
    WriteRejected { failures: Vec<WriteFailure> },
    #[error("remote writes did not complete within {after:?}")]
    TimedOut { after: Duration },
}

fn describe_failures(failures: &[WriteFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Writes a request needs, computed from the cached snapshot.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct WritePlan {
    pub chat: Chat,
    pub store: Option<Store>,
    pub provider: Option<String>,
    pub write_store: bool,
    pub write_chat: bool,
}

/// Returns `None` when nothing needs to be persisted.
pub(crate) fn plan_update(
    snapshot: &Snapshot,
    new_store: Option<&Store>,
    new_provider: Option<&str>,
) -> Option<WritePlan> {
    let mut chat = snapshot.chat.clone()?;
    let mut store = snapshot.store.clone();
    let mut provider = snapshot.provider.clone();
    let mut write_store = false;
    let mut write_chat = false;

    if let Some(new_store) = new_store.filter(|new_store| new_store.name != chat.store) {
        chat.store = new_store.name.clone();
        write_chat = true;
        store = Some(new_store.clone());
        // A store without a bound provider keeps the tracked one.
        if let Some(bound) = new_store.provider() {
            if provider.as_deref() != Some(bound) {
                provider = Some(bound.to_string());
                write_store = true;
            }
        }
    }

    if let Some(requested) = new_provider.filter(|requested| !requested.is_empty()) {
        if let Some(target) = store.as_mut().filter(|target| target.model_provider != requested) {
            target.model_provider = requested.to_string();
            provider = Some(requested.to_string());
            write_store = true;
        }
    }

    (write_store || write_chat).then_some(WritePlan {
        chat,
        store,
        provider,
        write_store,
        write_chat,
    })
}

pub struct UpdateCoordinator<B: StoreBackend + ?Sized> {
    backend: Arc<B>,
    snapshots: Arc<SnapshotStore>,
    delegate: Arc<dyn TitleDelegate>,
    events: broadcast::Sender<TitleEvent>,
    config: CoordinatorConfig,
}

impl<B: StoreBackend + ?Sized> UpdateCoordinator<B> {
    pub fn new(
        backend: Arc<B>,
        snapshots: Arc<SnapshotStore>,
        delegate: Arc<dyn TitleDelegate>,
        events: broadcast::Sender<TitleEvent>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            backend,
            snapshots,
            delegate,
            events,
            config,
        }
    }

    pub fn snapshots(&self) -> &Arc<SnapshotStore> {
        &self.snapshots
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Persists a store and/or provider change. A request arriving while
    /// another is in flight is dropped with [`UpdateOutcome::Busy`].
    pub async fn request_update(
        &self,
        new_store: Option<&Store>,
        new_provider: Option<&str>,
    ) -> Result<UpdateOutcome, UpdateError> {
        let Some(guard) = self.snapshots.begin_update() else {
            return Ok(UpdateOutcome::Busy);
        };
        self.update_with(guard, new_store, new_provider).await
    }

    /// Same as [`Self::request_update`] for a caller that already claimed
    /// the gate. The gate is released when this returns.
    pub async fn update_with(
        &self,
        guard: UpdateGuard,
        new_store: Option<&Store>,
        new_provider: Option<&str>,
    ) -> Result<UpdateOutcome, UpdateError> {
        let _guard = guard;
        let Some(plan) = plan_update(&self.snapshots.confirmed(), new_store, new_provider) else {
            debug!("selection unchanged; nothing to persist");
            return Ok(UpdateOutcome::Unchanged);
        };

        match self.persist(&plan).await {
            Ok(()) => {
                self.apply(plan.clone());
                info!(
                    chat = %plan.chat.id(),
                    store = %plan.chat.store,
                    provider = plan.provider.as_deref().unwrap_or_default(),
                    "saved store selection"
                );
                let _ = self.events.send(TitleEvent::Saved {
                    store_written: plan.write_store,
                    chat_written: plan.write_chat,
                });
                Ok(UpdateOutcome::Applied {
                    store_written: plan.write_store,
                    chat_written: plan.write_chat,
                })
            }
            Err(err) => {
                error!(chat = %plan.chat.id(), "failed to save store selection: {err}");
                let _ = self.events.send(TitleEvent::SaveFailed {
                    message: format!("Failed to save: {err}"),
                });
                self.snapshots.revert();
                Err(err)
            }
        }
    }

    async fn persist(&self, plan: &WritePlan) -> Result<(), UpdateError> {
        let store_write = async {
            match plan.store.as_ref().filter(|_| plan.write_store) {
                Some(store) => Some(settle(
                    self.backend
                        .persist_store(&store.owner, &store.name, store)
                        .await,
                )),
                None => None,
            }
        };
        let chat_write = async {
            if plan.write_chat {
                Some(settle(
                    self.backend
                        .persist_chat(&plan.chat.owner, &plan.chat.name, &plan.chat)
                        .await,
                ))
            } else {
                None
            }
        };
        let joined = async { tokio::join!(store_write, chat_write) };

        let (store_status, chat_status) = match self.config.write_timeout {
            Some(after) => tokio::time::timeout(after, joined)
                .await
                .map_err(|_| UpdateError::TimedOut { after })?,
            None => joined.await,
        };

        let mut failures = Vec::new();
        if let (Some(WriteStatus::Failed { message }), Some(store)) = (store_status, &plan.store) {
            failures.push(WriteFailure {
                target: WriteTarget::Store,
                id: store.id(),
                message,
            });
        }
        if let Some(WriteStatus::Failed { message }) = chat_status {
            failures.push(WriteFailure {
                target: WriteTarget::Chat,
                id: plan.chat.id(),
                message,
            });
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(UpdateError::WriteRejected { failures })
        }
    }

    fn apply(&self, plan: WritePlan) {
        self.snapshots
            .confirm(plan.chat.clone(), plan.store.clone(), plan.provider);
        if plan.write_store {
            if let Some(store) = &plan.store {
                self.delegate.on_store_updated(store);
            }
        }
        if plan.write_chat {
            self.delegate.on_chat_updated(&plan.chat);
        }
    }
}

fn settle(result: anyhow::Result<WriteStatus>) -> WriteStatus {
    result.unwrap_or_else(|err| WriteStatus::failed(format!("{err:#}")))
}

#[cfg(test)]
#[path = "tests/coordinator_tests.rs"]
mod tests;
