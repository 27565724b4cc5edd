use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::errors::{ChargetapError, Result};

pub mod run;
pub mod streams;

pub const PRIMARY_KEY: &str = "id";
pub const CURSOR_FIELD: &str = "updated_at";
pub const PARENT_KEY_FIELD: &str = "subscription_id";

// ================== Public types ==================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    FullRefresh,
    Incremental,
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncMode::FullRefresh => f.write_str("full_refresh"),
            SyncMode::Incremental => f.write_str("incremental"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamName {
    Subscription,
    SubscriptionWithScheduledChanges,
}

impl StreamName {
    pub const ALL: [StreamName; 2] = [
        StreamName::Subscription,
        StreamName::SubscriptionWithScheduledChanges,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StreamName::Subscription => "subscription",
            StreamName::SubscriptionWithScheduledChanges => "subscription_with_scheduled_changes",
        }
    }

    pub fn supported_sync_modes(&self) -> &'static [SyncMode] {
        match self {
            StreamName::Subscription => &[SyncMode::FullRefresh, SyncMode::Incremental],
            StreamName::SubscriptionWithScheduledChanges => &[SyncMode::FullRefresh],
        }
    }

    pub fn cursor_field(&self) -> Option<&'static str> {
        match self {
            StreamName::Subscription => Some(CURSOR_FIELD),
            StreamName::SubscriptionWithScheduledChanges => None,
        }
    }

    pub fn descriptor(&self) -> StreamDescriptor {
        StreamDescriptor {
            name: self.as_str().to_string(),
            primary_key: vec![PRIMARY_KEY.to_string()],
            cursor_field: self.cursor_field().map(str::to_string),
            parent_stream: match self {
                StreamName::Subscription => None,
                StreamName::SubscriptionWithScheduledChanges => {
                    Some(StreamName::Subscription.as_str().to_string())
                }
            },
            supported_sync_modes: self.supported_sync_modes().to_vec(),
        }
    }
}

impl fmt::Display for StreamName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StreamName {
    type Err = ChargetapError;

    fn from_str(s: &str) -> Result<Self> {
        StreamName::ALL
            .into_iter()
            .find(|n| n.as_str() == s)
            .ok_or_else(|| ChargetapError::UnknownStream(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamDescriptor {
    pub name: String,
    pub primary_key: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_stream: Option<String>,
    pub supported_sync_modes: Vec<SyncMode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub streams: Vec<StreamDescriptor>,
}

/// Every stream this connector exposes.
pub fn discover() -> Catalog {
    Catalog {
        streams: StreamName::ALL.iter().map(StreamName::descriptor).collect(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfiguredStream {
    pub name: String,
    pub sync_mode: SyncMode,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfiguredCatalog {
    pub streams: Vec<ConfiguredStream>,
}

impl ConfiguredCatalog {
    /// Resolve stream names and reject unsupported sync modes up front.
    pub fn resolve(&self) -> Result<Vec<(StreamName, SyncMode)>> {
        self.streams
            .iter()
            .map(|s| {
                let name: StreamName = s.name.parse()?;
                if !name.supported_sync_modes().contains(&s.sync_mode) {
                    return Err(ChargetapError::UnsupportedSyncMode {
                        stream: s.name.clone(),
                        mode: s.sync_mode.to_string(),
                    });
                }
                Ok((name, s.sync_mode))
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CatalogBuilder {
    streams: Vec<ConfiguredStream>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_stream(mut self, name: impl Into<String>, sync_mode: SyncMode) -> Self {
        self.streams.push(ConfiguredStream {
            name: name.into(),
            sync_mode,
        });
        self
    }
    pub fn build(self) -> ConfiguredCatalog {
        ConfiguredCatalog {
            streams: self.streams,
        }
    }
}

/// Per-stream state blobs, keyed by stream name.
pub type State = IndexMap<String, Value>;

/// Cursor value (epoch seconds) stored for `stream`, if any.
pub fn state_cursor(state: &State, stream: StreamName) -> Option<i64> {
    let field = stream.cursor_field()?;
    state.get(stream.as_str())?.get(field)?.as_i64()
}
