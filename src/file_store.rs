//! Directory-backed key-value store.
//!
//! Every record lives in its own file so a chunk save rewrites only the two
//! records it owns: `{base_dir}/{escaped key}.rec`.

use std::fs;
use std::path::{Path, PathBuf};

use crate::store::{KeyValueStore, StoreError};

const RECORD_EXTENSION: &str = "rec";

/// Store persisting records as individual files in one directory.
pub struct FileStore {
    /// Directory holding the record files
    base_dir: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `base_dir` (e.g., "saves/terrain").
    /// The directory is created lazily on the first write.
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    /// Get the file path for a key
    fn record_path(&self, key: &str) -> PathBuf {
        self.base_dir.join(format!("{}.{}", escape_key(key), RECORD_EXTENSION))
    }

    /// List all stored keys, sorted.
    pub fn keys(&self) -> Result<Vec<String>, StoreError> {
        if !self.base_dir.exists() {
            return Ok(Vec::new());
        }

        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.base_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXTENSION) {
                continue;
            }
            if let Some(key) = path.file_stem().and_then(|s| s.to_str()).and_then(unescape_key) {
                keys.push(key);
            }
        }

        keys.sort();
        Ok(keys)
    }

    /// Total size of stored records in bytes.
    pub fn total_size(&self) -> Result<u64, StoreError> {
        if !self.base_dir.exists() {
            return Ok(0);
        }

        let mut total = 0;
        for entry in fs::read_dir(&self.base_dir)? {
            total += entry?.metadata()?.len();
        }
        Ok(total)
    }

    /// Delete every stored record.
    pub fn clear(&self) -> Result<(), StoreError> {
        if self.base_dir.exists() {
            fs::remove_dir_all(&self.base_dir)?;
        }
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self.record_path(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read(path)?))
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        fs::create_dir_all(&self.base_dir)?;
        fs::write(self.record_path(key), value)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        let path = self.record_path(key);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

/// Make a key safe as a file name: `[A-Za-z0-9_-]` pass through, every other
/// byte becomes `%XX`.
fn escape_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 8);
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-' {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}

fn unescape_key(name: &str) -> Option<String> {
    let bytes = name.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = name.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }

    String::from_utf8(out).ok()
}
