use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::PaneCountError;

pub const MODEL_CATEGORY: &str = "Model";
pub const CHAT_ADMIN_TYPE: &str = "chat-admin";
pub const MIN_PANES: u8 = 1;
pub const MAX_PANES: u8 = 4;

/// `(owner, name)` identity shared by chats, stores and providers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityId {
    pub owner: String,
    pub name: String,
}

impl EntityId {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// A chat record owned by the surrounding application. Fields the core does
/// not model are kept in `extra` so a persisted record round-trips them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub owner: String,
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub store: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Chat {
    pub fn id(&self) -> EntityId {
        EntityId::new(&self.owner, &self.name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Store {
    pub owner: String,
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub model_provider: String,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub child_stores: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub child_model_providers: Vec<String>,
    #[serde(default)]
    pub show_auto_read: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Store {
    pub fn id(&self) -> EntityId {
        EntityId::new(&self.owner, &self.name)
    }

    /// Bound provider name, `None` when the store has none configured.
    pub fn provider(&self) -> Option<&str> {
        (!self.model_provider.is_empty()).then_some(self.model_provider.as_str())
    }

    pub fn label(&self) -> &str {
        if self.display_name.is_empty() {
            &self.name
        } else {
            &self.display_name
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
    pub owner: String,
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Provider {
    pub fn is_model(&self) -> bool {
        self.category == MODEL_CATEGORY
    }

    pub fn label(&self) -> &str {
        if self.display_name.is_empty() {
            &self.name
        } else {
            &self.display_name
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub owner: String,
    pub name: String,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default, rename = "type")]
    pub kind: String,
}

impl Account {
    pub fn can_manage_panes(&self) -> bool {
        self.is_admin || self.kind == CHAT_ADMIN_TYPE
    }
}

/// Number of chat panes shown side by side, always within `[1, 4]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct PaneCount(u8);

impl PaneCount {
    pub const SINGLE: PaneCount = PaneCount(MIN_PANES);

    pub fn new(count: u8) -> Result<Self, PaneCountError> {
        if (MIN_PANES..=MAX_PANES).contains(&count) {
            Ok(Self(count))
        } else {
            Err(PaneCountError::OutOfRange { count })
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn is_single(self) -> bool {
        self.0 == MIN_PANES
    }

    pub fn checked_increment(self) -> Option<Self> {
        Self::new(self.0.checked_add(1)?).ok()
    }

    pub fn checked_decrement(self) -> Option<Self> {
        Self::new(self.0.checked_sub(1)?).ok()
    }
}

impl Default for PaneCount {
    fn default() -> Self {
        Self::SINGLE
    }
}

impl TryFrom<u8> for PaneCount {
    type Error = PaneCountError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PaneCount> for u8 {
    fn from(value: PaneCount) -> Self {
        value.0
    }
}

impl fmt::Display for PaneCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}
