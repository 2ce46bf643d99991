//! Chunk store service: content-addressed storage with refcount GC, over
//! the shared `KeyValueStore` capability.

use crate::domain::Chunk;
use sg_01_hasher::content_hash;
use sg_types::{BatchOperation, GraphError, Hash, KeyValueStore, TimeSource};
use std::sync::Arc;

const CHUNK_PREFIX: &str = "chunk:";
const REFCOUNT_PREFIX: &str = "refcount:";

fn chunk_key(hash: &Hash) -> Vec<u8> {
    format!("{CHUNK_PREFIX}{}", hash.to_hex()).into_bytes()
}

fn refcount_key(hash: &Hash) -> Vec<u8> {
    format!("{REFCOUNT_PREFIX}{}", hash.to_hex()).into_bytes()
}

fn decode_refcount(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    let n = bytes.len().min(8);
    buf[..n].copy_from_slice(&bytes[..n]);
    u64::from_le_bytes(buf)
}

/// Content-addressed store for immutable byte chunks.
pub struct ChunkStore {
    store: Box<dyn KeyValueStore>,
    time_source: Arc<dyn TimeSource>,
}

impl ChunkStore {
    pub fn new(store: Box<dyn KeyValueStore>, time_source: Arc<dyn TimeSource>) -> Self {
        Self { store, time_source }
    }

    /// Store `data`, returning its content hash. Storing bytes already
    /// present is a no-op besides bumping the refcount.
    pub fn put(&mut self, data: Vec<u8>) -> Result<Hash, GraphError> {
        let hash = content_hash(&data);
        let key = chunk_key(&hash);

        if self.store.exists(&key)? {
            self.reference(&hash)?;
            return Ok(hash);
        }

        let chunk = Chunk {
            hash,
            size: data.len(),
            data,
            created_at: self.time_source.now_millis(),
        };
        let encoded = bincode::serialize(&chunk)
            .map_err(|e| GraphError::StorageFailure(e.to_string()))?;

        self.store.atomic_batch_write(vec![
            BatchOperation::put(key, encoded),
            BatchOperation::put(refcount_key(&hash), 1u64.to_le_bytes().to_vec()),
        ])?;
        Ok(hash)
    }

    #[must_use]
    pub fn get(&self, hash: &Hash) -> Result<Option<Chunk>, GraphError> {
        match self.store.get(&chunk_key(hash))? {
            None => Ok(None),
            Some(bytes) => {
                let chunk = bincode::deserialize(&bytes)
                    .map_err(|e| GraphError::StorageFailure(e.to_string()))?;
                Ok(Some(chunk))
            }
        }
    }

    /// Bump the chunk's reference count by one.
    pub fn reference(&mut self, hash: &Hash) -> Result<(), GraphError> {
        let key = refcount_key(hash);
        let current = match self.store.get(&key)? {
            Some(bytes) => decode_refcount(&bytes),
            None => {
                return Err(GraphError::NotFound(format!(
                    "chunk {} has no refcount entry",
                    hash.to_hex()
                )))
            }
        };
        self.store.put(&key, &(current + 1).to_le_bytes())
    }

    /// Decrement the chunk's reference count by one, floored at zero. A
    /// chunk at zero refcount is GC-eligible but not removed immediately.
    pub fn release(&mut self, hash: &Hash) -> Result<(), GraphError> {
        let key = refcount_key(hash);
        let current = match self.store.get(&key)? {
            Some(bytes) => decode_refcount(&bytes),
            None => return Ok(()),
        };
        let next = current.saturating_sub(1);
        self.store.put(&key, &next.to_le_bytes())
    }

    /// Delete every chunk whose refcount is zero. Returns the count
    /// removed.
    pub fn gc(&mut self) -> Result<usize, GraphError> {
        let entries = self.store.prefix_scan(REFCOUNT_PREFIX.as_bytes())?;
        let mut ops = Vec::new();
        let mut removed = 0usize;

        for (key, value) in entries {
            if decode_refcount(&value) == 0 {
                let hex = String::from_utf8_lossy(&key[REFCOUNT_PREFIX.len()..]).to_string();
                ops.push(BatchOperation::delete(key.clone()));
                ops.push(BatchOperation::delete(
                    format!("{CHUNK_PREFIX}{hex}").into_bytes(),
                ));
                removed += 1;
            }
        }

        if !ops.is_empty() {
            self.store.atomic_batch_write(ops)?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sg_types::{InMemoryKVStore, SystemTimeSource};

    fn new_store() -> ChunkStore {
        ChunkStore::new(Box::new(InMemoryKVStore::new()), Arc::new(SystemTimeSource))
    }

    #[test]
    fn put_then_get_round_trips() {
        let mut store = new_store();
        let hash = store.put(b"hello world".to_vec()).unwrap();
        let chunk = store.get(&hash).unwrap().unwrap();
        assert_eq!(chunk.data, b"hello world");
        assert_eq!(chunk.size, 11);
    }

    #[test]
    fn put_same_bytes_twice_dedupes_and_bumps_refcount() {
        let mut store = new_store();
        let h1 = store.put(b"dup".to_vec()).unwrap();
        let h2 = store.put(b"dup".to_vec()).unwrap();
        assert_eq!(h1, h2);

        store.release(&h1).unwrap();
        store.release(&h1).unwrap();
        assert_eq!(store.gc().unwrap(), 1);
        assert!(store.get(&h1).unwrap().is_none());
    }

    #[test]
    fn gc_skips_referenced_chunks() {
        let mut store = new_store();
        let hash = store.put(b"kept".to_vec()).unwrap();
        assert_eq!(store.gc().unwrap(), 0);
        assert!(store.get(&hash).unwrap().is_some());
    }

    #[test]
    fn release_is_idempotent_past_zero() {
        let mut store = new_store();
        let hash = store.put(b"x".to_vec()).unwrap();
        store.release(&hash).unwrap();
        store.release(&hash).unwrap();
        assert_eq!(store.gc().unwrap(), 1);
    }
}
