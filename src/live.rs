// Live mirror module
//
// This module provides the process-wide in-memory mirror of the on-disk
// configuration: an atomically swappable snapshot behind Arc<RwLock<T>>,
// with change events broadcast to subscribers. All mutation goes through
// `ConfigStore`; everything public here is a read path.

use std::sync::{Arc, RwLock};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::document::ConfigDocument;
use crate::metrics::Metrics;
use crate::schema::{self, ValueKind};

/// A mirrored configuration value.
///
/// Values from list-bearing sections are split on commas into `List`; all
/// other values stay `Plain`. Splitting an empty raw value yields a `List`
/// with a single empty-string element (`"" -> [""]`), so consumers that want
/// "no items" must check for that marker rather than list emptiness.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Plain(String),
    List(Vec<String>),
}

impl ConfigValue {
    /// The plain string, if this is a `Plain` value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Plain(s) => Some(s),
            Self::List(_) => None,
        }
    }

    /// The item list, if this is a `List` value.
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::Plain(_) => None,
            Self::List(items) => Some(items),
        }
    }

    /// True for the `[""]` marker a list-bearing key produces when its raw
    /// value is the empty string.
    pub fn is_empty_list_marker(&self) -> bool {
        matches!(self, Self::List(items) if items.len() == 1 && items[0].is_empty())
    }

    /// Coerce a raw on-disk value per the named section's schema kind.
    pub(crate) fn coerce(section: &str, raw: &str) -> Self {
        match schema::value_kind(section) {
            ValueKind::Plain => Self::Plain(raw.to_string()),
            ValueKind::List => Self::List(raw.split(',').map(str::to_string).collect()),
        }
    }
}

/// The full mirrored configuration: `Section -> Key -> Value`.
pub type LiveSnapshot = IndexMap<String, IndexMap<String, ConfigValue>>;

/// Change events emitted when the store mutates the file or the mirror
///
/// These let interested parties (an admin surface, a scheduler re-reading its
/// times) react to configuration changes without polling.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigChange {
    /// One or more whole sections were rewritten on disk
    SectionsWritten { sections: Vec<String> },

    /// A single key was written on disk and synced into the mirror
    KeyWritten { section: String, key: String },

    /// The mirror was rebuilt from the on-disk document
    Refreshed,
}

/// Cheap-clone handle to the process-wide mirror
///
/// Readers take a read guard on the snapshot; `ConfigStore` swaps the whole
/// snapshot under the write guard, so a reader sees either the fully-old or
/// the fully-new mapping, never a mix.
pub struct LiveConfig {
    /// The current snapshot protected by RwLock for thread-safe access
    snapshot: Arc<RwLock<LiveSnapshot>>,

    /// Broadcast channel for emitting change events
    change_tx: broadcast::Sender<ConfigChange>,

    /// Shared with the owning store
    metrics: Arc<Metrics>,
}

impl LiveConfig {
    pub(crate) fn new(metrics: Arc<Metrics>) -> Self {
        let (change_tx, _) = broadcast::channel(100);
        Self {
            snapshot: Arc::new(RwLock::new(LiveSnapshot::new())),
            change_tx,
            metrics,
        }
    }

    /// Look up a single mirrored value.
    pub fn get(&self, section: &str, key: &str) -> Option<ConfigValue> {
        self.snapshot.read().unwrap().get(section)?.get(key).cloned()
    }

    /// Clone a whole mirrored section.
    pub fn section(&self, name: &str) -> Option<IndexMap<String, ConfigValue>> {
        self.snapshot.read().unwrap().get(name).cloned()
    }

    /// Clone the entire current snapshot.
    ///
    /// Safe to use without holding locks; the clone is a consistent view.
    pub fn snapshot(&self) -> LiveSnapshot {
        self.snapshot.read().unwrap().clone()
    }

    /// Subscribe to change events.
    ///
    /// Returns a receiver that will get notified of all future changes.
    /// Multiple subscribers can listen simultaneously.
    pub fn subscribe(&self) -> broadcast::Receiver<ConfigChange> {
        self.change_tx.subscribe()
    }

    /// Atomically replace the whole snapshot.
    pub(crate) fn replace(&self, next: LiveSnapshot) {
        *self.snapshot.write().unwrap() = next;
    }

    /// Targeted sync of a single entry, coerced per the section's schema
    /// kind. Creates the mirrored section if it is not present yet. The
    /// parser artifact key is never mirrored, same as the refresh path.
    pub(crate) fn set_entry(&self, section: &str, key: &str, raw: &str) {
        if key == schema::ARTIFACT_KEY {
            return;
        }
        let value = ConfigValue::coerce(section, raw);
        let mut snapshot = self.snapshot.write().unwrap();
        snapshot
            .entry(section.to_string())
            .or_default()
            .insert(key.to_string(), value);
    }

    /// Broadcast a change event. Send errors mean no one is listening,
    /// which is fine; they are only counted.
    pub(crate) fn emit(&self, change: ConfigChange) {
        match self.change_tx.send(change) {
            Ok(_) => self.metrics.record_change_broadcast(),
            Err(_) => self.metrics.record_broadcast_missed(),
        }
    }
}

// Make LiveConfig cloneable for sharing across threads
impl Clone for LiveConfig {
    fn clone(&self) -> Self {
        Self {
            snapshot: Arc::clone(&self.snapshot),
            change_tx: self.change_tx.clone(),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

/// Build a snapshot from a parsed document: drop the parser artifact key
/// from every section, split values in list-bearing sections.
pub(crate) fn snapshot_from(doc: &ConfigDocument) -> LiveSnapshot {
    let mut snapshot = LiveSnapshot::new();
    for (name, keys) in doc.sections() {
        let mirrored: IndexMap<String, ConfigValue> = keys
            .iter()
            .filter(|(key, _)| key.as_str() != schema::ARTIFACT_KEY)
            .map(|(key, raw)| (key.clone(), ConfigValue::coerce(name, raw)))
            .collect();
        snapshot.insert(name.to_string(), mirrored);
    }
    snapshot
}
