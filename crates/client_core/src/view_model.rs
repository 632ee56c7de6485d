//! Choices and visibility derived from the store list, the default store,
//! the pane count and the current account.

use std::{
    collections::HashSet,
    sync::{Mutex, PoisonError},
};

use shared::domain::{Account, Chat, EntityId, PaneCount, Provider, Store};
use tracing::{debug, warn};

use crate::{snapshot::SelectionState, StoreBackend};

pub const STORE_URL_DISPLAY_LEN: usize = 30;

pub fn find_default_store(stores: &[Store]) -> Option<&Store> {
    stores.iter().find(|store| store.is_default)
}

/// Stores offered for selection. Multi-pane mode offers every store; a
/// single pane only offers the default store's children, for every role.
pub fn eligible_stores(
    stores: &[Store],
    default_store: Option<&Store>,
    pane_count: PaneCount,
) -> Vec<Store> {
    if !pane_count.is_single() {
        return stores.to_vec();
    }
    let Some(default_store) = default_store.filter(|store| !store.child_stores.is_empty()) else {
        return Vec::new();
    };

    let children: HashSet<&str> = default_store
        .child_stores
        .iter()
        .map(String::as_str)
        .collect();
    stores
        .iter()
        .filter(|store| children.contains(store.name.as_str()))
        .cloned()
        .collect()
}

pub fn needs_providers(chat: Option<&Chat>, default_store: Option<&Store>) -> bool {
    chat.is_some()
        && default_store.is_some_and(|store| !store.child_model_providers.is_empty())
}

pub fn filter_model_providers(providers: Vec<Provider>, default_store: &Store) -> Vec<Provider> {
    providers
        .into_iter()
        .filter(|provider| {
            provider.is_model() && default_store.child_model_providers.contains(&provider.name)
        })
        .collect()
}

pub fn can_manage_panes(account: Option<&Account>) -> bool {
    account.is_some_and(Account::can_manage_panes)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TitleBarVisibility {
    pub pane_count: PaneCount,
    pub has_store_choices: bool,
    pub has_provider_choices: bool,
    pub show_auto_read: bool,
    pub show_pane_controls: bool,
    pub can_manage_panes: bool,
}

pub fn should_show_title_bar(visibility: TitleBarVisibility) -> bool {
    visibility.pane_count.is_single()
        && (visibility.has_store_choices
            || visibility.has_provider_choices
            || visibility.show_auto_read
            || (visibility.show_pane_controls && visibility.can_manage_panes))
}

/// Truncates to `max_chars` characters and appends `...` when cut.
pub fn shorten_text(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CatalogKey {
    chat: EntityId,
    default_store: EntityId,
    allowed: Vec<String>,
}

impl CatalogKey {
    fn for_inputs(chat: Option<&Chat>, default_store: Option<&Store>) -> Option<Self> {
        if !needs_providers(chat, default_store) {
            return None;
        }
        let (chat, default_store) = (chat?, default_store?);
        Some(Self {
            chat: chat.id(),
            default_store: default_store.id(),
            allowed: default_store.child_model_providers.clone(),
        })
    }

    /// Providers are listed per owner and filtered by the default store, so a
    /// list loaded for another chat of the same owner still applies.
    fn same_listing(&self, other: &Self) -> bool {
        self.chat.owner == other.chat.owner
            && self.default_store == other.default_store
            && self.allowed == other.allowed
    }
}

#[derive(Default)]
struct CatalogState {
    key: Option<CatalogKey>,
    providers: Vec<Provider>,
}

impl CatalogState {
    fn listing_for(&self, key: &CatalogKey) -> Vec<Provider> {
        match &self.key {
            Some(loaded) if loaded.same_listing(key) => self.providers.clone(),
            _ => Vec::new(),
        }
    }
}

/// Eligible model providers, refetched only when the chat or the default
/// store changes.
#[derive(Default)]
pub struct ProviderCatalog {
    state: Mutex<CatalogState>,
}

impl ProviderCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loaded providers that apply to `chat` and `default_store`; empty when
    /// none are needed or the cached list was loaded for other inputs.
    pub fn providers_for(
        &self,
        chat: Option<&Chat>,
        default_store: Option<&Store>,
    ) -> Vec<Provider> {
        match CatalogKey::for_inputs(chat, default_store) {
            Some(key) => self.lock().listing_for(&key),
            None => Vec::new(),
        }
    }

    /// Drops the cached list unless it still applies to the new inputs.
    pub fn retain_for(&self, chat: Option<&Chat>, default_store: Option<&Store>) {
        let key = CatalogKey::for_inputs(chat, default_store);
        let mut state = self.lock();
        let keep = match (&state.key, &key) {
            (Some(loaded), Some(key)) => loaded.same_listing(key),
            _ => false,
        };
        if !keep && state.key.is_some() {
            debug!("dropping stale model provider list");
            state.key = None;
            state.providers.clear();
        }
    }

    pub async fn refresh<B: StoreBackend + ?Sized>(
        &self,
        backend: &B,
        chat: Option<&Chat>,
        default_store: Option<&Store>,
    ) -> Vec<Provider> {
        let (Some(key), Some(chat), Some(default_store)) =
            (CatalogKey::for_inputs(chat, default_store), chat, default_store)
        else {
            return self.clear();
        };
        {
            let state = self.lock();
            if state.key.as_ref() == Some(&key) {
                return state.providers.clone();
            }
        }

        match backend.fetch_providers(&chat.owner).await {
            Ok(providers) => {
                let providers = filter_model_providers(providers, default_store);
                debug!(
                    owner = %chat.owner,
                    count = providers.len(),
                    "loaded eligible model providers"
                );
                let mut state = self.lock();
                state.key = Some(key);
                state.providers = providers.clone();
                providers
            }
            Err(err) => {
                warn!(owner = %chat.owner, "failed to load model providers: {err:#}");
                self.lock().listing_for(&key)
            }
        }
    }

    fn clear(&self) -> Vec<Provider> {
        let mut state = self.lock();
        state.key = None;
        state.providers.clear();
        Vec::new()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CatalogState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaneControls {
    pub count: PaneCount,
    pub can_decrement: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSummary {
    pub kind: Option<String>,
    pub url: Option<String>,
}

/// Render-agnostic description of the title bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleBarView {
    pub store_options: Vec<SelectOption>,
    pub selected_store: Option<String>,
    pub provider_options: Vec<SelectOption>,
    pub selected_provider: Option<String>,
    pub auto_read: Option<bool>,
    pub pane_controls: Option<PaneControls>,
    pub store_summary: Option<StoreSummary>,
    pub disabled: bool,
    pub compact_labels: bool,
}

pub struct ViewInputs<'a> {
    pub eligible_stores: &'a [Store],
    pub eligible_providers: &'a [Provider],
    pub store_info: Option<&'a Store>,
    pub selection: &'a SelectionState,
    pub account: Option<&'a Account>,
    pub auto_read: bool,
    pub pane_count: PaneCount,
    pub show_pane_controls: bool,
    pub is_mobile: bool,
}

pub fn build_title_bar(inputs: &ViewInputs<'_>) -> Option<TitleBarView> {
    let can_manage = can_manage_panes(inputs.account);
    let show_auto_read = inputs.store_info.is_some_and(|store| store.show_auto_read);
    let visible = should_show_title_bar(TitleBarVisibility {
        pane_count: inputs.pane_count,
        has_store_choices: !inputs.eligible_stores.is_empty(),
        has_provider_choices: !inputs.eligible_providers.is_empty(),
        show_auto_read,
        show_pane_controls: inputs.show_pane_controls,
        can_manage_panes: can_manage,
    });
    if !visible {
        return None;
    }

    let store_options: Vec<SelectOption> = inputs
        .eligible_stores
        .iter()
        .map(|store| SelectOption {
            value: store.name.clone(),
            label: store.label().to_string(),
        })
        .collect();
    let provider_options: Vec<SelectOption> = inputs
        .eligible_providers
        .iter()
        .map(|provider| SelectOption {
            value: provider.name.clone(),
            label: provider.label().to_string(),
        })
        .collect();

    let selected_store = (!store_options.is_empty())
        .then(|| {
            inputs
                .selection
                .selected_store
                .clone()
                .or_else(|| inputs.store_info.map(|store| store.name.clone()))
                .or_else(|| store_options.first().map(|option| option.value.clone()))
        })
        .flatten();
    let selected_provider = (!provider_options.is_empty())
        .then(|| {
            inputs
                .selection
                .selected_provider
                .clone()
                .or_else(|| {
                    inputs
                        .store_info
                        .and_then(Store::provider)
                        .map(str::to_string)
                })
                .or_else(|| provider_options.first().map(|option| option.value.clone()))
        })
        .flatten();

    let store_summary = inputs.store_info.map(|store| StoreSummary {
        kind: (!store.kind.is_empty()).then(|| store.kind.clone()),
        url: (!store.url.is_empty()).then(|| shorten_text(&store.url, STORE_URL_DISPLAY_LEN)),
    });

    Some(TitleBarView {
        store_options,
        selected_store,
        provider_options,
        selected_provider,
        auto_read: show_auto_read.then_some(inputs.auto_read),
        pane_controls: (inputs.show_pane_controls && can_manage).then(|| PaneControls {
            count: inputs.pane_count,
            can_decrement: !inputs.pane_count.is_single(),
        }),
        store_summary,
        disabled: inputs.selection.is_updating,
        compact_labels: inputs.is_mobile,
    })
}

#[cfg(test)]
#[path = "tests/view_model_tests.rs"]
mod tests;
