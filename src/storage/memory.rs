use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use super::{PropertyBackend, StoreError};

/// Process-local property slots. Clones share the same map, which lets tests keep a
/// handle on the raw slots while a [`super::RecordStore`] owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    slots: Arc<Mutex<BTreeMap<String, String>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PropertyBackend for MemoryBackend {
    fn get_property(&self, key: &str) -> Result<Option<String>, StoreError> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(slots.get(key).cloned())
    }

    fn set_property(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_property(&self, key: &str) -> Result<bool, StoreError> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(slots.remove(key).is_some())
    }

    fn property_keys(&self) -> Result<Vec<String>, StoreError> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(slots.keys().cloned().collect())
    }
}
