use std::sync::Arc;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use client_core::{
    CoordinatorConfig, HttpBackend, StoreInfoTitle, TitleBarView, TitleDelegate, TitleProps,
    UpdateOutcome, Viewport,
};
use shared::domain::{Account, Chat, PaneCount, Store};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;

use config::{load_settings, normalize_server_url};

#[derive(Parser, Debug)]
struct Args {
    #[arg(long)]
    server_url: Option<String>,
    #[arg(long)]
    owner: Option<String>,
    /// Chat whose store binding is shown and edited.
    #[arg(long)]
    chat: String,
    #[arg(long, default_value_t = 1)]
    panes: u8,
    #[arg(long)]
    admin: bool,
    #[arg(long, default_value = "")]
    account_type: String,
    #[arg(long)]
    width: Option<u32>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Show,
    SelectStore { name: String },
    SelectProvider { name: String },
    AutoRead {
        #[arg(action = ArgAction::Set)]
        enabled: bool,
    },
    AddPane,
    RemovePane,
}

struct ConsoleDelegate;

impl TitleDelegate for ConsoleDelegate {
    fn on_store_updated(&self, store: &Store) {
        info!(store = %store.id(), provider = %store.model_provider, "store updated");
    }

    fn on_chat_updated(&self, chat: &Chat) {
        info!(chat = %chat.id(), store = %chat.store, "chat updated");
    }

    fn on_update_auto_read(&self, enabled: bool) {
        info!(enabled, "auto read toggled");
    }

    fn on_pane_count_change(&self, count: PaneCount) {
        info!(%count, "pane count changed");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Args::parse();

    let mut settings = load_settings();
    if let Some(url) = args.server_url.clone() {
        settings.server_url = url;
    }
    if let Some(owner) = args.owner.clone() {
        settings.owner = owner;
    }
    if let Some(width) = args.width {
        settings.viewport_width = width;
    }
    let server_url = normalize_server_url(&settings.server_url)?;

    let backend = Arc::new(match settings.request_timeout {
        Some(timeout) => HttpBackend::with_timeout(&server_url, timeout)?,
        None => HttpBackend::new(&server_url)?,
    });
    let stores = backend.fetch_stores(&settings.owner).await?;
    let chat = backend.fetch_chat(&settings.owner, &args.chat).await?;
    info!(chat = %chat.id(), stores = stores.len(), server = %server_url, "loaded chat");

    let viewport = Viewport::new(settings.viewport_width);
    let title = StoreInfoTitle::new(
        Arc::clone(&backend),
        Arc::new(ConsoleDelegate),
        CoordinatorConfig {
            write_timeout: settings.write_timeout,
        },
    )
    .with_viewport(&viewport);
    title.set_props(TitleProps {
        chat: Some(chat),
        stores,
        account: Some(Account {
            owner: settings.owner.clone(),
            name: "store_console".to_string(),
            is_admin: args.admin,
            kind: args.account_type.clone(),
        }),
        auto_read: false,
        pane_count: PaneCount::new(args.panes)?,
        show_pane_controls: true,
    });
    title.refresh_providers().await;

    match args.command {
        Command::Show => {}
        Command::SelectStore { name } => {
            report(title.handle_store_change(&name).await?);
        }
        Command::SelectProvider { name } => {
            report(title.handle_provider_change(&name).await?);
        }
        Command::AutoRead { enabled } => title.toggle_auto_read(enabled),
        Command::AddPane => match title.add_pane() {
            Some(count) => println!("Panes: {count}"),
            None => println!("Pane count already at maximum"),
        },
        Command::RemovePane => match title.remove_pane() {
            Some(count) => println!("Panes: {count}"),
            None => println!("Pane count already at minimum"),
        },
    }

    match title.view() {
        Some(view) => print_view(&view),
        None => println!("Title bar hidden (panes={})", title.pane_count()),
    }
    Ok(())
}

fn report(outcome: UpdateOutcome) {
    match outcome {
        UpdateOutcome::Busy => println!("Another update is in flight; request dropped"),
        UpdateOutcome::Unchanged => println!("Selection unchanged"),
        UpdateOutcome::Applied {
            store_written,
            chat_written,
        } => println!("Saved (store written: {store_written}, chat written: {chat_written})"),
    }
}

fn print_view(view: &TitleBarView) {
    let prefix = |label: &str| {
        if view.compact_labels {
            String::new()
        } else {
            format!("{label}: ")
        }
    };

    if !view.store_options.is_empty() {
        println!("{}{}", prefix("Store"), view.selected_store.as_deref().unwrap_or("-"));
        for option in &view.store_options {
            println!("  - {} ({})", option.label, option.value);
        }
    }
    if !view.provider_options.is_empty() {
        println!("{}{}", prefix("Model"), view.selected_provider.as_deref().unwrap_or("-"));
        for option in &view.provider_options {
            println!("  - {} ({})", option.label, option.value);
        }
    }
    if let Some(auto_read) = view.auto_read {
        println!("Auto read: {auto_read}");
    }
    if let Some(controls) = &view.pane_controls {
        println!("Panes: {}", controls.count);
    }
    if let Some(summary) = &view.store_summary {
        if let Some(kind) = &summary.kind {
            println!("Type: {kind}");
        }
        if let Some(url) = &summary.url {
            println!("URL: {url}");
        }
    }
}
