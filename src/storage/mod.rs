//! # Storage Module - Durable Record Store
//!
//! Every durable feature (bank accounts, guilds, coupons, container locks) keeps its
//! records in a single persisted slot per namespace. A slot holds the whole
//! namespace serialized as one JSON object, so every mutation is a
//! load → mutate in memory → single save round-trip.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   RecordStore   │ ← namespaced tables, corruption quarantine
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │ PropertyBackend │ ← get/set/remove one string slot (sled, json files, memory)
//! └─────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use realmkeeper::storage::{MemoryBackend, RecordStore};
//!
//! # fn main() -> Result<(), realmkeeper::storage::StoreError> {
//! let store = RecordStore::new(MemoryBackend::new());
//! store.upsert("coupons", "SPRING", &serde_json::json!({"item": "minecraft:diamond", "amount": 3}))?;
//! let coupon: Option<serde_json::Value> = store.get("coupons", "SPRING")?;
//! assert!(coupon.is_some());
//! # Ok(())
//! # }
//! ```
//!
//! ## Failure semantics
//!
//! - A slot that was never written loads as an empty table.
//! - A slot that no longer parses loads as an empty table. The raw text is copied to
//!   a quarantine slot once, then the slot is reset to an empty table.
//! - Only backend I/O failures surface as [`StoreError`].
//!
//! Tables are never evicted and have no capacity limit.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::Utc;
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::BackendKind;

pub mod errors;
pub mod file_backend;
pub mod memory;
#[cfg(feature = "sled-backend")]
pub mod sled_backend;
pub mod snapshot;

pub use errors::StoreError;
pub use file_backend::JsonFileBackend;
pub use memory::MemoryBackend;
#[cfg(feature = "sled-backend")]
pub use sled_backend::SledBackend;
pub use snapshot::{SnapshotManager, SnapshotMetadata};

/// Prefix shared by every namespace slot.
pub const SLOT_PREFIX: &str = "realm:";

const QUARANTINE_MARKER: &str = ".corrupt.";

/// In-memory view of one namespace. Ordered so serialized slots are deterministic.
pub type Table<T> = BTreeMap<String, T>;

/// The host persistence primitive: one string value per property key.
///
/// Implementations provide single-writer-at-a-time semantics per key.
pub trait PropertyBackend: Send + Sync {
    fn get_property(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set_property(&self, key: &str, value: &str) -> Result<(), StoreError>;
    /// Returns true when the key existed.
    fn remove_property(&self, key: &str) -> Result<bool, StoreError>;
    fn property_keys(&self) -> Result<Vec<String>, StoreError>;
}

impl<B: PropertyBackend + ?Sized> PropertyBackend for Box<B> {
    fn get_property(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get_property(key)
    }
    fn set_property(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set_property(key, value)
    }
    fn remove_property(&self, key: &str) -> Result<bool, StoreError> {
        (**self).remove_property(key)
    }
    fn property_keys(&self) -> Result<Vec<String>, StoreError> {
        (**self).property_keys()
    }
}

/// Open the backend selected in `[world]`. Directories are created as needed.
pub fn open_backend(kind: BackendKind, data_dir: &Path) -> Result<Box<dyn PropertyBackend>, StoreError> {
    match kind {
        #[cfg(feature = "sled-backend")]
        BackendKind::Sled => Ok(Box::new(SledBackend::open(data_dir.join("world.sled"))?)),
        #[cfg(not(feature = "sled-backend"))]
        BackendKind::Sled => Err(StoreError::BackendUnavailable(
            "built without the sled-backend feature".to_string(),
        )),
        BackendKind::Json => Ok(Box::new(JsonFileBackend::open(data_dir)?)),
        BackendKind::Memory => Ok(Box::new(MemoryBackend::new())),
    }
}

/// Durable namespaced key-value records on top of a [`PropertyBackend`].
pub struct RecordStore {
    backend: Box<dyn PropertyBackend>,
}

impl RecordStore {
    pub fn new(backend: impl PropertyBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }

    pub fn from_boxed(backend: Box<dyn PropertyBackend>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &dyn PropertyBackend {
        self.backend.as_ref()
    }

    fn slot_key(namespace: &str) -> String {
        format!("{}{}", SLOT_PREFIX, namespace)
    }

    /// Load the whole namespace. Missing or corrupted slots yield an empty table.
    pub fn load<T: DeserializeOwned>(&self, namespace: &str) -> Result<Table<T>, StoreError> {
        let key = Self::slot_key(namespace);
        let Some(raw) = self.backend.get_property(&key)? else {
            return Ok(Table::new());
        };
        match serde_json::from_str::<Table<T>>(&raw) {
            Ok(table) => Ok(table),
            Err(e) => {
                warn!(
                    "namespace '{}' failed to parse ({}); treating as empty",
                    namespace, e
                );
                self.quarantine(&key, &raw);
                Ok(Table::new())
            }
        }
    }

    /// Copy the raw text aside, then reset the slot. The slot is left untouched
    /// when the copy fails.
    fn quarantine(&self, key: &str, raw: &str) {
        let target = format!("{}{}{}", key, QUARANTINE_MARKER, Utc::now().timestamp_millis());
        if let Err(e) = self.backend.set_property(&target, raw) {
            warn!("unable to preserve corrupted slot '{}': {}", key, e);
            return;
        }
        warn!("corrupted slot preserved as '{}'", target);
        if let Err(e) = self.backend.set_property(key, "{}") {
            warn!("unable to reset corrupted slot '{}': {}", key, e);
        }
    }

    /// Serialize the whole table and overwrite the namespace slot in one write.
    pub fn save<T: Serialize>(&self, namespace: &str, table: &Table<T>) -> Result<(), StoreError> {
        let data = serde_json::to_string(table)?;
        self.backend.set_property(&Self::slot_key(namespace), &data)?;
        debug!("saved namespace '{}' ({} records)", namespace, table.len());
        Ok(())
    }

    pub fn get<T: DeserializeOwned>(&self, namespace: &str, key: &str) -> Result<Option<T>, StoreError> {
        let mut table = self.load::<T>(namespace)?;
        Ok(table.remove(key))
    }

    /// Insert or replace one record. Last writer wins.
    pub fn upsert<T: Serialize>(&self, namespace: &str, key: &str, value: &T) -> Result<(), StoreError> {
        let mut table = self.load::<serde_json::Value>(namespace)?;
        table.insert(key.to_string(), serde_json::to_value(value)?);
        self.save(namespace, &table)
    }

    /// Remove one record. Returns false (and writes nothing) when the key was absent.
    pub fn delete(&self, namespace: &str, key: &str) -> Result<bool, StoreError> {
        let mut table = self.load::<serde_json::Value>(namespace)?;
        if table.remove(key).is_none() {
            return Ok(false);
        }
        self.save(namespace, &table)?;
        Ok(true)
    }

    /// Run a multi-record mutation against a freshly loaded table and persist it with a
    /// single save. Nothing is written when the closure fails.
    pub fn update<T, R, E, F>(&self, namespace: &str, f: F) -> Result<R, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<StoreError>,
        F: FnOnce(&mut Table<T>) -> Result<R, E>,
    {
        let mut table = self.load::<T>(namespace)?;
        let result = f(&mut table)?;
        self.save(namespace, &table)?;
        Ok(result)
    }

    pub fn len(&self, namespace: &str) -> Result<usize, StoreError> {
        Ok(self.load::<serde_json::Value>(namespace)?.len())
    }

    /// Names of every namespace with a persisted slot (quarantine slots excluded).
    pub fn namespaces(&self) -> Result<Vec<String>, StoreError> {
        let mut names: Vec<String> = self
            .backend
            .property_keys()?
            .into_iter()
            .filter_map(|k| k.strip_prefix(SLOT_PREFIX).map(str::to_string))
            .filter(|k| !k.contains(QUARANTINE_MARKER))
            .collect();
        names.sort();
        Ok(names)
    }
}
