use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use percent_encoding::{percent_decode_str, utf8_percent_encode, NON_ALPHANUMERIC};

use super::{PropertyBackend, StoreError};

const SUFFIX: &str = ".json";

/// One JSON file per property under `<root>/properties`. Writes take an exclusive
/// lock on the destination, go to a temp file and are renamed into place.
pub struct JsonFileBackend {
    dir: PathBuf,
}

impl JsonFileBackend {
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self, StoreError> {
        let dir = root.as_ref().join("properties");
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let encoded = utf8_percent_encode(key, NON_ALPHANUMERIC).to_string();
        self.dir.join(format!("{}{}", encoded, SUFFIX))
    }

    fn write_file_locked(path: &Path, content: &str) -> Result<(), StoreError> {
        let lock_file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)?;
        lock_file.lock_exclusive()?;

        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let base = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("property.json");
        let mut counter = 0u32;
        let tmp_path = loop {
            let candidate = dir.join(format!(".{}.tmp-{}-{}", base, std::process::id(), counter));
            match OpenOptions::new().write(true).create_new(true).open(&candidate) {
                Ok(mut tmp) => {
                    tmp.write_all(content.as_bytes())?;
                    tmp.flush()?;
                    let _ = tmp.sync_all();
                    break candidate;
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    counter = counter.saturating_add(1);
                }
                Err(e) => return Err(e.into()),
            }
        };

        fs::rename(&tmp_path, path)?;
        if let Ok(dir_file) = File::open(dir) {
            let _ = dir_file.sync_all();
        }
        drop(lock_file);
        Ok(())
    }
}

impl PropertyBackend for JsonFileBackend {
    fn get_property(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key);
        let mut file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let _ = file.lock_shared();
        let mut content = String::new();
        file.read_to_string(&mut content)?;
        let _ = file.unlock();
        // A lock file created by an interrupted first write is empty.
        if content.is_empty() {
            return Ok(None);
        }
        Ok(Some(content))
    }

    fn set_property(&self, key: &str, value: &str) -> Result<(), StoreError> {
        Self::write_file_locked(&self.path_for(key), value)
    }

    fn remove_property(&self, key: &str) -> Result<bool, StoreError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn property_keys(&self) -> Result<Vec<String>, StoreError> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name.starts_with('.') {
                continue;
            }
            if let Some(encoded) = name.strip_suffix(SUFFIX) {
                keys.push(percent_decode_str(encoded).decode_utf8_lossy().into_owned());
            }
        }
        keys.sort();
        Ok(keys)
    }
}
