use super::*;
use crate::{
    test_support::{chat, default_store, provider, store, RecordingBackend, RecordingDelegate},
    viewport::Viewport,
};

fn props() -> TitleProps {
    let mut bound = store("a", "p1");
    bound.show_auto_read = true;
    TitleProps {
        chat: Some(chat("a")),
        stores: vec![
            default_store(&["a", "b", "c"], &["p1", "p3"]),
            bound,
            store("b", "p2"),
            store("c", ""),
            store("hidden", "p1"),
        ],
        account: Some(Account {
            is_admin: true,
            ..Account::default()
        }),
        auto_read: true,
        pane_count: PaneCount::SINGLE,
        show_pane_controls: true,
    }
}

fn title(
    backend: RecordingBackend,
    delegate: RecordingDelegate,
) -> (
    Arc<StoreInfoTitle<RecordingBackend>>,
    Arc<RecordingBackend>,
    Arc<RecordingDelegate>,
) {
    let backend = Arc::new(backend);
    let delegate = Arc::new(delegate);
    let title = StoreInfoTitle::new(
        backend.clone(),
        delegate.clone(),
        CoordinatorConfig::default(),
    );
    title.set_props(props());
    (Arc::new(title), backend, delegate)
}

fn model_providers() -> RecordingBackend {
    RecordingBackend::with_providers(vec![
        provider("p1", "Model"),
        provider("p2", "Model"),
        provider("p3", "Model"),
    ])
}

#[tokio::test]
async fn store_pick_runs_callback_and_persists() {
    let (title, backend, delegate) = title(RecordingBackend::default(), RecordingDelegate::default());

    let outcome = title.handle_store_change("b").await.expect("update");

    assert_eq!(
        outcome,
        UpdateOutcome::Applied {
            store_written: true,
            chat_written: true
        }
    );
    assert_eq!(*delegate.store_changes.lock().expect("lock"), vec!["b"]);
    assert_eq!(backend.chat_writes()[0].store, "b");
    let selection = title.selection();
    assert_eq!(selection.selected_store.as_deref(), Some("b"));
    assert_eq!(selection.selected_provider.as_deref(), Some("p2"));
}

#[tokio::test]
async fn store_outside_single_pane_choices_is_ignored() {
    let (title, backend, delegate) = title(RecordingBackend::default(), RecordingDelegate::default());

    let outcome = title.handle_store_change("hidden").await.expect("ignored");

    assert_eq!(outcome, UpdateOutcome::Unchanged);
    assert!(backend.chat_writes().is_empty());
    assert!(delegate.store_changes.lock().expect("lock").is_empty());
}

#[tokio::test]
async fn failed_store_pick_reverts_selection_and_optimistic_chat() {
    let delegate = RecordingDelegate {
        optimistic_chat: Some(chat("b")),
        ..RecordingDelegate::default()
    };
    let (title, _backend, _delegate) = title(RecordingBackend::failing_chat("denied"), delegate);
    let mut events = title.subscribe_events();

    title.handle_store_change("b").await.expect_err("chat write fails");

    let selection = title.selection();
    assert_eq!(selection.selected_store.as_deref(), Some("a"));
    assert_eq!(selection.selected_provider.as_deref(), Some("p1"));
    assert!(matches!(
        events.recv().await.expect("event"),
        TitleEvent::SaveFailed { .. }
    ));
    assert_eq!(
        title.coordinator().snapshots().current_chat().map(|chat| chat.store),
        Some("a".to_string())
    );
}

#[tokio::test]
async fn provider_pick_requires_loaded_provider() {
    let (title, backend, _delegate) = title(model_providers(), RecordingDelegate::default());

    let outcome = title.handle_provider_change("p3").await.expect("not loaded");
    assert_eq!(outcome, UpdateOutcome::Unchanged);

    let providers = title.refresh_providers().await;
    assert_eq!(providers.len(), 2);

    let outcome = title.handle_provider_change("p3").await.expect("update");
    assert_eq!(
        outcome,
        UpdateOutcome::Applied {
            store_written: true,
            chat_written: false
        }
    );
    assert_eq!(backend.store_writes()[0].model_provider, "p3");
    assert!(backend.chat_writes().is_empty());
    assert_eq!(title.selection().selected_provider.as_deref(), Some("p3"));
}

#[tokio::test]
async fn store_pick_while_updating_changes_nothing() {
    let backend = RecordingBackend {
        providers: model_providers().providers,
        ..RecordingBackend::holding()
    };
    let (title, backend, delegate) = title(backend, RecordingDelegate::default());
    assert_eq!(title.refresh_providers().await.len(), 2);

    let pending = tokio::spawn({
        let title = title.clone();
        async move { title.handle_provider_change("p3").await }
    });
    backend.wait_for_store_write().await;
    let during = title.selection();
    assert!(during.is_updating);
    assert!(title.view().expect("visible").disabled);

    let outcome = title.handle_store_change("b").await.expect("dropped");
    assert_eq!(outcome, UpdateOutcome::Busy);
    assert_eq!(title.selection(), during);
    assert!(delegate.store_changes.lock().expect("lock").is_empty());

    backend.release_store_writes.notify_one();
    pending.await.expect("join").expect("provider update");
    assert!(backend.chat_writes().is_empty());
    assert!(!title.selection().is_updating);
}

#[tokio::test]
async fn providers_follow_props_changes() {
    let (title, backend, _delegate) = title(model_providers(), RecordingDelegate::default());
    assert_eq!(title.refresh_providers().await.len(), 2);
    assert_eq!(title.view().expect("visible").provider_options.len(), 2);

    title.set_props(TitleProps {
        chat: None,
        ..props()
    });
    assert!(title.eligible_providers().is_empty());
    assert!(title.view().expect("visible").provider_options.is_empty());

    let mut narrowed = props();
    narrowed.stores[0].child_model_providers.clear();
    title.set_props(narrowed);
    assert!(title.eligible_providers().is_empty());
    assert!(title.view().expect("visible").provider_options.is_empty());
    let outcome = title.handle_provider_change("p3").await.expect("ignored");
    assert_eq!(outcome, UpdateOutcome::Unchanged);
    assert!(backend.store_writes().is_empty());

    title.set_props(props());
    assert!(title.eligible_providers().is_empty());
    assert_eq!(title.refresh_providers().await.len(), 2);
    assert_eq!(backend.provider_fetches(), 2);
    assert_eq!(title.eligible_providers().len(), 2);
}

#[tokio::test]
async fn view_reflects_props_and_panes() {
    let viewport = Viewport::new(1440);
    let backend = Arc::new(model_providers());
    let delegate = Arc::new(RecordingDelegate::default());
    let title = StoreInfoTitle::new(backend, delegate.clone(), CoordinatorConfig::default())
        .with_viewport(&viewport);
    title.set_props(props());
    title.refresh_providers().await;

    let view = title.view().expect("visible");
    assert_eq!(view.store_options.len(), 3);
    assert_eq!(view.selected_store.as_deref(), Some("a"));
    assert_eq!(view.selected_provider.as_deref(), Some("p1"));
    assert_eq!(view.auto_read, Some(true));
    assert!(!view.compact_labels);
    let controls = view.pane_controls.expect("admin sees pane controls");
    assert!(!controls.can_decrement);

    viewport.resize(375);
    assert!(title.view().expect("visible").compact_labels);

    title.toggle_auto_read(false);
    assert_eq!(*delegate.auto_read.lock().expect("lock"), vec![false]);

    assert_eq!(title.add_pane().map(PaneCount::get), Some(2));
    assert_eq!(title.view(), None);
    assert_eq!(title.remove_pane(), Some(PaneCount::SINGLE));
    assert_eq!(title.remove_pane(), None);
    assert_eq!(*delegate.pane_counts.lock().expect("lock"), vec![2, 1]);

    drop(title);
    assert_eq!(viewport.listener_count(), 0);
}

#[tokio::test]
async fn multi_pane_props_offer_every_store() {
    let (title, _backend, _delegate) = title(RecordingBackend::default(), RecordingDelegate::default());
    let mut multi = props();
    multi.pane_count = PaneCount::new(3).expect("three");
    title.set_props(multi);

    assert_eq!(title.eligible_stores().len(), 5);
    assert_eq!(title.view(), None);
    let outcome = title.handle_store_change("hidden").await.expect("update");
    assert!(matches!(outcome, UpdateOutcome::Applied { chat_written: true, .. }));
}
