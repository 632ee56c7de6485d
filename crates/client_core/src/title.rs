//! The store/provider title bar: owner props in, selection handlers and a
//! view description out.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use shared::domain::{Account, Chat, PaneCount, Provider, Store};
use tokio::sync::{broadcast, watch};
use tracing::debug;

use crate::{
    coordinator::{CoordinatorConfig, UpdateCoordinator, UpdateError, UpdateOutcome},
    panes::PaneCountController,
    snapshot::{SelectionState, SnapshotStore},
    view_model::{self, ProviderCatalog, TitleBarView, ViewInputs},
    viewport::{MobileDetector, Viewport},
    StoreBackend, TitleDelegate, TitleEvent,
};

/// Inputs the owner hands in on every render.
#[derive(Debug, Clone, Default)]
pub struct TitleProps {
    pub chat: Option<Chat>,
    pub stores: Vec<Store>,
    pub account: Option<Account>,
    pub auto_read: bool,
    pub pane_count: PaneCount,
    pub show_pane_controls: bool,
}

impl TitleProps {
    /// The store the current chat is bound to.
    pub fn store_info(&self) -> Option<&Store> {
        let chat = self.chat.as_ref()?;
        self.stores.iter().find(|store| store.name == chat.store)
    }
}

struct ResolvedProps {
    props: TitleProps,
    default_store: Option<Store>,
}

pub struct StoreInfoTitle<B: StoreBackend + ?Sized> {
    backend: Arc<B>,
    props: RwLock<ResolvedProps>,
    snapshots: Arc<SnapshotStore>,
    coordinator: UpdateCoordinator<B>,
    catalog: ProviderCatalog,
    panes: PaneCountController,
    delegate: Arc<dyn TitleDelegate>,
    mobile: Option<MobileDetector>,
    events: broadcast::Sender<TitleEvent>,
}

impl<B: StoreBackend + ?Sized> StoreInfoTitle<B> {
    pub fn new(backend: Arc<B>, delegate: Arc<dyn TitleDelegate>, config: CoordinatorConfig) -> Self {
        let (events, _) = broadcast::channel(64);
        let snapshots = Arc::new(SnapshotStore::new());
        let coordinator = UpdateCoordinator::new(
            Arc::clone(&backend),
            Arc::clone(&snapshots),
            Arc::clone(&delegate),
            events.clone(),
            config,
        );
        Self {
            backend,
            props: RwLock::new(ResolvedProps {
                props: TitleProps::default(),
                default_store: None,
            }),
            snapshots,
            coordinator,
            catalog: ProviderCatalog::new(),
            panes: PaneCountController::new(PaneCount::SINGLE, Arc::clone(&delegate)),
            delegate,
            mobile: None,
            events,
        }
    }

    /// Mounts a mobile detector on `viewport`; it is released with `self`.
    pub fn with_viewport(mut self, viewport: &Viewport) -> Self {
        self.mobile = Some(MobileDetector::mount(viewport));
        self
    }

    pub fn set_props(&self, props: TitleProps) {
        let default_store = view_model::find_default_store(&props.stores).cloned();
        self.snapshots
            .sync_from_props(props.chat.as_ref(), props.store_info());
        self.catalog
            .retain_for(props.chat.as_ref(), default_store.as_ref());
        self.panes.set(props.pane_count);
        *self.props.write().unwrap_or_else(PoisonError::into_inner) = ResolvedProps {
            props,
            default_store,
        };
    }

    pub fn props(&self) -> TitleProps {
        self.props_read().props.clone()
    }

    pub fn default_store(&self) -> Option<Store> {
        self.props_read().default_store.clone()
    }

    pub fn eligible_stores(&self) -> Vec<Store> {
        let resolved = self.props_read();
        view_model::eligible_stores(
            &resolved.props.stores,
            resolved.default_store.as_ref(),
            resolved.props.pane_count,
        )
    }

    pub fn eligible_providers(&self) -> Vec<Provider> {
        let resolved = self.props_read();
        self.catalog
            .providers_for(resolved.props.chat.as_ref(), resolved.default_store.as_ref())
    }

    pub async fn refresh_providers(&self) -> Vec<Provider> {
        let chat = self.snapshots.current_chat();
        let default_store = self.default_store();
        self.catalog
            .refresh(self.backend.as_ref(), chat.as_ref(), default_store.as_ref())
            .await
    }

    pub fn selection(&self) -> SelectionState {
        self.snapshots.selection()
    }

    pub fn subscribe_selection(&self) -> watch::Receiver<SelectionState> {
        self.snapshots.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<TitleEvent> {
        self.events.subscribe()
    }

    pub fn coordinator(&self) -> &UpdateCoordinator<B> {
        &self.coordinator
    }

    pub fn is_mobile(&self) -> bool {
        self.mobile.as_ref().is_some_and(MobileDetector::is_mobile)
    }

    /// User picked a store by name.
    pub async fn handle_store_change(&self, name: &str) -> Result<UpdateOutcome, UpdateError> {
        let Some(new_store) = self
            .eligible_stores()
            .into_iter()
            .find(|store| store.name == name)
        else {
            debug!(store = name, "ignoring selection of unknown store");
            return Ok(UpdateOutcome::Unchanged);
        };
        let has_chat = self.props_read().props.chat.is_some();
        if !has_chat {
            return Ok(UpdateOutcome::Unchanged);
        }
        let Some(guard) = self.snapshots.begin_update() else {
            return Ok(UpdateOutcome::Busy);
        };

        self.snapshots
            .select_store(&new_store.name, new_store.provider());
        if let Some(chat) = self.delegate.on_store_change(&new_store) {
            self.snapshots.set_pending_chat(chat);
        }
        self.coordinator
            .update_with(guard, Some(&new_store), new_store.provider())
            .await
    }

    /// User picked a model provider by name.
    pub async fn handle_provider_change(&self, name: &str) -> Result<UpdateOutcome, UpdateError> {
        let Some(provider) = self
            .eligible_providers()
            .into_iter()
            .find(|provider| provider.name == name)
        else {
            debug!(provider = name, "ignoring selection of unknown provider");
            return Ok(UpdateOutcome::Unchanged);
        };
        let has_store_info = self.props_read().props.store_info().is_some();
        if !has_store_info {
            return Ok(UpdateOutcome::Unchanged);
        }
        let Some(guard) = self.snapshots.begin_update() else {
            return Ok(UpdateOutcome::Busy);
        };

        self.snapshots.select_provider(&provider.name);
        self.coordinator
            .update_with(guard, None, Some(&provider.name))
            .await
    }

    pub fn toggle_auto_read(&self, enabled: bool) {
        self.delegate.on_update_auto_read(enabled);
    }

    pub fn add_pane(&self) -> Option<PaneCount> {
        let next = self.panes.increment()?;
        let _ = self.events.send(TitleEvent::PaneCountChanged(next));
        Some(next)
    }

    pub fn remove_pane(&self) -> Option<PaneCount> {
        let next = self.panes.decrement()?;
        let _ = self.events.send(TitleEvent::PaneCountChanged(next));
        Some(next)
    }

    pub fn pane_count(&self) -> PaneCount {
        self.panes.count()
    }

    /// Title bar description, `None` when it should not render.
    pub fn view(&self) -> Option<TitleBarView> {
        let eligible_stores = self.eligible_stores();
        let eligible_providers = self.eligible_providers();
        let selection = self.snapshots.selection();
        let pane_count = self.pane_count();
        let resolved = self.props_read();
        let props = &resolved.props;

        view_model::build_title_bar(&ViewInputs {
            eligible_stores: &eligible_stores,
            eligible_providers: &eligible_providers,
            store_info: props.store_info(),
            selection: &selection,
            account: props.account.as_ref(),
            auto_read: props.auto_read,
            pane_count,
            show_pane_controls: props.show_pane_controls,
            is_mobile: self.is_mobile(),
        })
    }

    fn props_read(&self) -> RwLockReadGuard<'_, ResolvedProps> {
        self.props.read().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[path = "tests/title_tests.rs"]
mod tests;
