use std::path::Path;

use super::{PropertyBackend, StoreError};

const TREE_PROPERTIES: &str = "properties";

/// Sled-backed property slots. Every write is flushed before returning so a slot
/// survives a process restart.
pub struct SledBackend {
    _db: sled::Db,
    properties: sled::Tree,
}

impl SledBackend {
    /// Open (or create) the property database rooted at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path_ref = path.as_ref();
        std::fs::create_dir_all(path_ref)?;
        let db = sled::open(path_ref)?;
        let properties = db.open_tree(TREE_PROPERTIES)?;
        Ok(Self {
            _db: db,
            properties,
        })
    }
}

impl PropertyBackend for SledBackend {
    fn get_property(&self, key: &str) -> Result<Option<String>, StoreError> {
        let Some(bytes) = self.properties.get(key.as_bytes())? else {
            return Ok(None);
        };
        Ok(Some(String::from_utf8(bytes.to_vec())?))
    }

    fn set_property(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.properties.insert(key.as_bytes(), value.as_bytes())?;
        self.properties.flush()?;
        Ok(())
    }

    fn remove_property(&self, key: &str) -> Result<bool, StoreError> {
        let existed = self.properties.remove(key.as_bytes())?.is_some();
        self.properties.flush()?;
        Ok(existed)
    }

    fn property_keys(&self) -> Result<Vec<String>, StoreError> {
        let mut keys = Vec::new();
        for entry in self.properties.iter() {
            let (key, _) = entry?;
            keys.push(String::from_utf8_lossy(&key).into_owned());
        }
        Ok(keys)
    }
}
