//! Key-value persistence contract for terrain chunks.
//!
//! Each chunk is persisted as two independent records under keys derived from a
//! host-supplied base key (the world or map slot):
//!
//! - heights: `{base}:terrain:{x}:{z}`, a JSON array of `resolution²` floats
//! - surfaces: `{base}:terrain:surface:{x}:{z}`, a JSON array of `resolution²` tags
//!
//! Both arrays are row-major. A missing, unparsable or wrongly sized record is
//! treated as absent so the chunk falls back to its defaults.

use std::collections::HashMap;
use std::fmt;

use crate::surface::SurfaceType;
use crate::tile::TileCoord;

/// Byte-oriented key-value store backing chunk persistence.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;
    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

/// Errors that can occur during store operations.
#[derive(Debug)]
pub enum StoreError {
    /// IO error (permissions, disk full, etc.)
    Io(std::io::Error),
    /// Serialization error
    Serialization(String),
    /// Deserialization error (corrupted record, version mismatch, etc.)
    Deserialization(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Io(e) => write!(f, "IO error: {}", e),
            StoreError::Serialization(e) => write!(f, "Serialization error: {}", e),
            StoreError::Deserialization(e) => write!(f, "Deserialization error: {}", e),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e)
    }
}

// =============================================================================
// KEYS
// =============================================================================

/// Key of a chunk's height record.
pub fn height_key(base_key: &str, tile: TileCoord) -> String {
    format!("{}:terrain:{}:{}", base_key, tile.x, tile.z)
}

/// Key of a chunk's surface record.
pub fn surface_key(base_key: &str, tile: TileCoord) -> String {
    format!("{}:terrain:surface:{}:{}", base_key, tile.x, tile.z)
}

// =============================================================================
// RECORDS
// =============================================================================

pub fn encode_heights(heights: &[f32]) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec(heights).map_err(|e| StoreError::Serialization(e.to_string()))
}

pub fn encode_surfaces(surfaces: &[SurfaceType]) -> Result<Vec<u8>, StoreError> {
    let ids: Vec<u8> = surfaces.iter().map(|s| s.id()).collect();
    serde_json::to_vec(&ids).map_err(|e| StoreError::Serialization(e.to_string()))
}

/// Decode a height record holding exactly `expected_len` finite values.
pub fn decode_heights(bytes: &[u8], expected_len: usize) -> Result<Vec<f32>, StoreError> {
    let heights: Vec<f32> = serde_json::from_slice(bytes)
        .map_err(|e| StoreError::Deserialization(e.to_string()))?;

    if heights.len() != expected_len {
        return Err(StoreError::Deserialization(format!(
            "expected {} heights, found {}",
            expected_len,
            heights.len()
        )));
    }
    if heights.iter().any(|h| !h.is_finite()) {
        return Err(StoreError::Deserialization("non-finite height".to_string()));
    }

    Ok(heights)
}

/// Decode a surface record holding exactly `expected_len` known tags.
pub fn decode_surfaces(bytes: &[u8], expected_len: usize) -> Result<Vec<SurfaceType>, StoreError> {
    let ids: Vec<u8> = serde_json::from_slice(bytes)
        .map_err(|e| StoreError::Deserialization(e.to_string()))?;

    if ids.len() != expected_len {
        return Err(StoreError::Deserialization(format!(
            "expected {} surface tags, found {}",
            expected_len,
            ids.len()
        )));
    }

    ids.into_iter()
        .map(|id| {
            SurfaceType::from_id(id)
                .ok_or_else(|| StoreError::Deserialization(format!("unknown surface tag {}", id)))
        })
        .collect()
}

// =============================================================================
// IN-MEMORY STORE
// =============================================================================

/// Store kept entirely in memory. Useful for tests and for hosts that persist
/// the whole map elsewhere.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    records: HashMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    /// All stored keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.records.keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.records.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.records.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.records.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_format() {
        let tile = TileCoord::new(-2, 5);
        assert_eq!(height_key("slot1", tile), "slot1:terrain:-2:5");
        assert_eq!(surface_key("slot1", tile), "slot1:terrain:surface:-2:5");
    }

    #[test]
    fn test_heights_record() {
        let heights = vec![0.0, -1.5, 3.25, 20.0];
        let bytes = encode_heights(&heights).unwrap();
        assert_eq!(bytes, b"[0.0,-1.5,3.25,20.0]");
        assert_eq!(decode_heights(&bytes, 4).unwrap(), heights);
    }

    #[test]
    fn test_heights_record_rejects_malformed() {
        assert!(decode_heights(b"[1.0,2.0]", 4).is_err());
        assert!(decode_heights(b"{\"a\":1}", 4).is_err());
        assert!(decode_heights(b"[1.0,null,2.0,3.0]", 4).is_err());
        assert!(decode_heights(b"garbage", 4).is_err());
    }

    #[test]
    fn test_surface_record() {
        let surfaces = vec![SurfaceType::Grass, SurfaceType::Ice, SurfaceType::Concrete];
        let bytes = encode_surfaces(&surfaces).unwrap();
        assert_eq!(bytes, b"[0,5,4]");
        assert_eq!(decode_surfaces(&bytes, 3).unwrap(), surfaces);
        assert!(decode_surfaces(b"[0,9,1]", 3).is_err());
        assert!(decode_surfaces(b"[0,1]", 3).is_err());
    }

    #[test]
    fn test_memory_store() {
        let mut store = MemoryStore::new();
        assert_eq!(store.get("a").unwrap(), None);

        store.set("a", b"[1]").unwrap();
        store.set("b", b"[2]").unwrap();
        assert_eq!(store.get("a").unwrap(), Some(b"[1]".to_vec()));
        assert_eq!(store.keys(), vec!["a".to_string(), "b".to_string()]);

        store.remove("a").unwrap();
        assert!(!store.contains_key("a"));
        assert_eq!(store.len(), 1);
    }
}
