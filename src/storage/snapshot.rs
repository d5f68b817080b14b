//! World snapshots: every persisted property exported into a `tar.gz` archive with a
//! SHA-256 checksum, restorable into any [`PropertyBackend`].

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use percent_encoding::{percent_decode_str, utf8_percent_encode, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use tar::{Archive, Builder, Header};

use super::{PropertyBackend, StoreError};

const INDEX_FILE: &str = "snapshots.json";
const ENTRY_DIR: &str = "properties/";

/// Index entry for one snapshot archive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub id: String,
    pub label: Option<String>,
    pub created_at: DateTime<Utc>,
    pub property_count: usize,
    pub size_bytes: u64,
    pub checksum: String,
    #[serde(default)]
    pub verified: bool,
    /// Archive file name relative to the snapshot directory
    pub path: PathBuf,
}

pub struct SnapshotManager {
    dir: PathBuf,
    keep_last: usize,
    snapshots: HashMap<String, SnapshotMetadata>,
}

impl SnapshotManager {
    pub fn new(dir: impl Into<PathBuf>, keep_last: usize) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        let mut manager = Self {
            dir,
            keep_last,
            snapshots: HashMap::new(),
        };
        manager.load_index()?;
        Ok(manager)
    }

    fn load_index(&mut self) -> Result<(), StoreError> {
        let path = self.dir.join(INDEX_FILE);
        if path.exists() {
            let contents = fs::read_to_string(&path)?;
            self.snapshots = serde_json::from_str(&contents)?;
        }
        Ok(())
    }

    fn save_index(&self) -> Result<(), StoreError> {
        let contents = serde_json::to_string_pretty(&self.snapshots)?;
        fs::write(self.dir.join(INDEX_FILE), contents)?;
        Ok(())
    }

    /// Export every property of `backend` into a new archive.
    pub fn create(
        &mut self,
        backend: &dyn PropertyBackend,
        label: Option<String>,
    ) -> Result<SnapshotMetadata, StoreError> {
        let created_at = Utc::now();
        let base = format!("snapshot_{}", created_at.format("%Y%m%d_%H%M%S_%3f"));
        let mut id = base.clone();
        let mut n = 1;
        while self.snapshots.contains_key(&id) {
            id = format!("{}_{}", base, n);
            n += 1;
        }
        let filename = format!("{}.tar.gz", id);
        let archive_path = self.dir.join(&filename);

        log::info!("Creating snapshot: {}", id);

        let enc = GzEncoder::new(File::create(&archive_path)?, Compression::default());
        let mut tar = Builder::new(enc);
        let mut property_count = 0usize;
        for key in backend.property_keys()? {
            let Some(value) = backend.get_property(&key)? else {
                continue;
            };
            let name = format!(
                "{}{}.json",
                ENTRY_DIR,
                utf8_percent_encode(&key, NON_ALPHANUMERIC)
            );
            let mut header = Header::new_gnu();
            header.set_size(value.len() as u64);
            header.set_mode(0o644);
            header.set_mtime(created_at.timestamp().max(0) as u64);
            header.set_cksum();
            tar.append_data(&mut header, name, value.as_bytes())?;
            property_count += 1;
        }
        let enc = tar.into_inner()?;
        let mut file = enc.finish()?;
        file.flush()?;

        let checksum = checksum_file(&archive_path)?;
        let size_bytes = fs::metadata(&archive_path)?.len();
        let metadata = SnapshotMetadata {
            id: id.clone(),
            label,
            created_at,
            property_count,
            size_bytes,
            checksum,
            verified: false,
            path: PathBuf::from(&filename),
        };
        self.snapshots.insert(id.clone(), metadata.clone());
        self.save_index()?;
        log::info!(
            "Snapshot created: {} ({} properties, {} bytes)",
            id,
            property_count,
            size_bytes
        );
        Ok(metadata)
    }

    pub fn verify(&mut self, id: &str) -> Result<bool, StoreError> {
        let metadata = self
            .snapshots
            .get(id)
            .ok_or_else(|| StoreError::SnapshotNotFound(id.to_string()))?;
        let valid = checksum_file(&self.dir.join(&metadata.path))? == metadata.checksum;
        if valid {
            if let Some(meta) = self.snapshots.get_mut(id) {
                meta.verified = true;
            }
            self.save_index()?;
        } else {
            log::error!("Snapshot verification FAILED: {} (checksum mismatch)", id);
        }
        Ok(valid)
    }

    /// Write every property stored in the archive back into `backend`. Properties that
    /// are not part of the snapshot are left untouched. Returns the number restored.
    pub fn restore(&self, id: &str, backend: &dyn PropertyBackend) -> Result<usize, StoreError> {
        let metadata = self
            .snapshots
            .get(id)
            .ok_or_else(|| StoreError::SnapshotNotFound(id.to_string()))?;
        let archive_path = self.dir.join(&metadata.path);
        if checksum_file(&archive_path)? != metadata.checksum {
            return Err(StoreError::ChecksumMismatch(id.to_string()));
        }

        let mut archive = Archive::new(GzDecoder::new(File::open(&archive_path)?));
        let mut restored = 0usize;
        for entry in archive.entries()? {
            let mut entry = entry?;
            let name = entry.path()?.to_string_lossy().into_owned();
            let Some(encoded) = name
                .strip_prefix(ENTRY_DIR)
                .and_then(|n| n.strip_suffix(".json"))
            else {
                continue;
            };
            let key = percent_decode_str(encoded).decode_utf8_lossy().into_owned();
            let mut value = String::new();
            entry.read_to_string(&mut value)?;
            backend.set_property(&key, &value)?;
            restored += 1;
        }
        log::info!(target: "audit", "snapshot {} restored ({} properties)", id, restored);
        Ok(restored)
    }

    /// Delete the oldest archives beyond `keep_last`. Returns the removed ids.
    pub fn prune(&mut self) -> Result<Vec<String>, StoreError> {
        let mut ordered: Vec<_> = self.snapshots.values().cloned().collect();
        ordered.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let mut removed = Vec::new();
        for old in ordered.into_iter().skip(self.keep_last) {
            let file = self.dir.join(&old.path);
            if file.exists() {
                fs::remove_file(&file)?;
            }
            self.snapshots.remove(&old.id);
            removed.push(old.id);
        }
        if !removed.is_empty() {
            self.save_index()?;
        }
        Ok(removed)
    }

    /// Newest first.
    pub fn list(&self) -> Vec<SnapshotMetadata> {
        let mut snapshots: Vec<_> = self.snapshots.values().cloned().collect();
        snapshots.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        snapshots
    }
}

fn checksum_file(path: &Path) -> Result<String, StoreError> {
    use sha2::{Digest, Sha256};

    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0; 8192];
    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryBackend, RecordStore};
    use tempfile::TempDir;

    #[test]
    fn snapshot_restores_into_fresh_backend() {
        let temp = TempDir::new().unwrap();
        let source = MemoryBackend::new();
        let store = RecordStore::new(source.clone());
        store
            .upsert("bank_accounts", "alice", &serde_json::json!({"balance": 42}))
            .unwrap();
        store
            .upsert("coupons", "WELCOME", &serde_json::json!({"amount": 1}))
            .unwrap();

        let mut manager = SnapshotManager::new(temp.path(), 5).unwrap();
        let meta = manager.create(&source, Some("test".into())).unwrap();
        assert_eq!(meta.property_count, 2);
        assert!(manager.verify(&meta.id).unwrap());

        let target = MemoryBackend::new();
        assert_eq!(manager.restore(&meta.id, &target).unwrap(), 2);
        let restored = RecordStore::new(target);
        let alice: Option<serde_json::Value> = restored.get("bank_accounts", "alice").unwrap();
        assert_eq!(alice, Some(serde_json::json!({"balance": 42})));
    }

    #[test]
    fn tampered_archive_is_rejected() {
        let temp = TempDir::new().unwrap();
        let source = MemoryBackend::new();
        source.set_property("realm:guilds", "{}").unwrap();
        let mut manager = SnapshotManager::new(temp.path(), 5).unwrap();
        let meta = manager.create(&source, None).unwrap();
        fs::write(temp.path().join(&meta.path), b"garbage").unwrap();
        assert!(!manager.verify(&meta.id).unwrap());
        assert!(matches!(
            manager.restore(&meta.id, &MemoryBackend::new()),
            Err(StoreError::ChecksumMismatch(_))
        ));
    }

    #[test]
    fn prune_keeps_newest() {
        let temp = TempDir::new().unwrap();
        let source = MemoryBackend::new();
        source.set_property("realm:guilds", "{}").unwrap();
        let mut manager = SnapshotManager::new(temp.path(), 2).unwrap();
        for _ in 0..4 {
            manager.create(&source, None).unwrap();
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        let removed = manager.prune().unwrap();
        assert_eq!(removed.len(), 2);
        assert_eq!(manager.list().len(), 2);
    }
}
