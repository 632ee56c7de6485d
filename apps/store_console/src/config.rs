use std::{fs, path::Path, time::Duration};

use anyhow::Context;
use serde::Deserialize;
use url::Url;

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:14000";
pub const CONFIG_FILE: &str = "store_console.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_url: String,
    pub owner: String,
    pub request_timeout: Option<Duration>,
    pub write_timeout: Option<Duration>,
    pub viewport_width: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.into(),
            owner: "admin".into(),
            request_timeout: None,
            write_timeout: None,
            viewport_width: 1280,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    server_url: Option<String>,
    owner: Option<String>,
    request_timeout_ms: Option<u64>,
    write_timeout_ms: Option<u64>,
    viewport_width: Option<u32>,
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Some(file_cfg) = read_file_config(Path::new(CONFIG_FILE)) {
        apply_file_config(&mut settings, file_cfg);
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    settings
}

fn read_file_config(path: &Path) -> Option<FileConfig> {
    let raw = fs::read_to_string(path).ok()?;
    match toml::from_str::<FileConfig>(&raw) {
        Ok(cfg) => Some(cfg),
        Err(err) => {
            tracing::warn!(path = %path.display(), "ignoring unreadable config: {err}");
            None
        }
    }
}

fn apply_file_config(settings: &mut Settings, file_cfg: FileConfig) {
    if let Some(v) = file_cfg.server_url {
        settings.server_url = v;
    }
    if let Some(v) = file_cfg.owner {
        settings.owner = v;
    }
    if let Some(ms) = file_cfg.request_timeout_ms {
        settings.request_timeout = millis(ms);
    }
    if let Some(ms) = file_cfg.write_timeout_ms {
        settings.write_timeout = millis(ms);
    }
    if let Some(v) = file_cfg.viewport_width {
        settings.viewport_width = v;
    }
}

fn apply_env(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("CASIBASE_URL") {
        settings.server_url = v;
    }
    if let Some(v) = var("APP__SERVER_URL") {
        settings.server_url = v;
    }

    if let Some(v) = var("APP__OWNER") {
        settings.owner = v;
    }

    if let Some(ms) = var("APP__REQUEST_TIMEOUT_MS").and_then(|v| v.parse::<u64>().ok()) {
        settings.request_timeout = millis(ms);
    }
    if let Some(ms) = var("APP__WRITE_TIMEOUT_MS").and_then(|v| v.parse::<u64>().ok()) {
        settings.write_timeout = millis(ms);
    }
}

/// Zero disables the timeout.
fn millis(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

pub fn normalize_server_url(raw: &str) -> anyhow::Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    let candidate = if trimmed.is_empty() {
        DEFAULT_SERVER_URL
    } else {
        trimmed
    };
    let url = Url::parse(candidate)
        .with_context(|| format!("invalid server url '{candidate}'"))?;
    if !matches!(url.scheme(), "http" | "https") {
        anyhow::bail!("unsupported scheme '{}' in server url", url.scheme());
    }
    Ok(candidate.to_string())
}
