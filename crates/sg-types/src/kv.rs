//! # Persistence capability
//!
//! The one storage interface every persistence-backed subsystem (chunk
//! store, neuron store, change journal) depends on. Concrete adapters are
//! injected at construction; no subsystem crate talks to a filesystem or a
//! database directly.

use crate::error::GraphError;
use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// A single write in an atomic batch.
#[derive(Debug, Clone)]
pub enum BatchOperation {
    Put { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
}

impl BatchOperation {
    #[must_use]
    pub fn put(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        BatchOperation::Put {
            key: key.into(),
            value: value.into(),
        }
    }

    #[must_use]
    pub fn delete(key: impl Into<Vec<u8>>) -> Self {
        BatchOperation::Delete { key: key.into() }
    }
}

/// Abstract key-value store. `&self`/`&mut self` split mirrors the
/// single-writer/multiple-reader discipline required by spec.md §5 for
/// parallel-thread runtimes: callers wrap a store in their own lock.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, GraphError>;
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), GraphError>;
    fn delete(&mut self, key: &[u8]) -> Result<(), GraphError>;
    fn exists(&self, key: &[u8]) -> Result<bool, GraphError> {
        Ok(self.get(key)?.is_some())
    }

    /// Execute a batch of writes atomically: either all operations land or
    /// none do.
    fn atomic_batch_write(&mut self, operations: Vec<BatchOperation>) -> Result<(), GraphError>;

    /// Every stored key with the given prefix, in unspecified order.
    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, GraphError>;
}

/// Abstract time source, injected so tests can control `now()`.
pub trait TimeSource: Send + Sync {
    fn now_millis(&self) -> u64;
}

/// Wall-clock time source used outside of tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now_millis(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// In-memory key-value store. The default adapter for tests and for any
/// `--data-dir` not given on the CLI.
#[derive(Default)]
pub struct InMemoryKVStore {
    data: RwLock<HashMap<Vec<u8>, Vec<u8>>>,
}

impl InMemoryKVStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for InMemoryKVStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, GraphError> {
        Ok(self
            .data
            .read()
            .map_err(|e| GraphError::StorageFailure(e.to_string()))?
            .get(key)
            .cloned())
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), GraphError> {
        self.data
            .write()
            .map_err(|e| GraphError::StorageFailure(e.to_string()))?
            .insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), GraphError> {
        self.data
            .write()
            .map_err(|e| GraphError::StorageFailure(e.to_string()))?
            .remove(key);
        Ok(())
    }

    fn atomic_batch_write(&mut self, operations: Vec<BatchOperation>) -> Result<(), GraphError> {
        let mut guard = self
            .data
            .write()
            .map_err(|e| GraphError::StorageFailure(e.to_string()))?;
        for op in operations {
            match op {
                BatchOperation::Put { key, value } => {
                    guard.insert(key, value);
                }
                BatchOperation::Delete { key } => {
                    guard.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, GraphError> {
        Ok(self
            .data
            .read()
            .map_err(|e| GraphError::StorageFailure(e.to_string()))?
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

/// Key-value store persisted as a single flat file, written atomically via
/// a temp-file-then-rename. Format: `[key_len:u32 le][key][value_len:u32 le][value] ...`.
///
/// This is the adapter `sg-node` wires in for every `--data-dir` subtree
/// (`chunks/`, `neurons/`, `journal/`) per spec.md §6.
pub struct FileBackedKVStore {
    data: HashMap<Vec<u8>, Vec<u8>>,
    path: PathBuf,
}

impl FileBackedKVStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, GraphError> {
        let path = path.as_ref().to_path_buf();
        let data = Self::load(&path)?;
        Ok(Self { data, path })
    }

    fn load(path: &Path) -> Result<HashMap<Vec<u8>, Vec<u8>>, GraphError> {
        let mut data = HashMap::new();
        let mut file = match std::fs::File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(data),
            Err(e) => return Err(GraphError::StorageFailure(e.to_string())),
        };
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)
            .map_err(|e| GraphError::StorageFailure(e.to_string()))?;

        let mut cursor = 0usize;
        while cursor + 4 <= bytes.len() {
            let key_len = u32::from_le_bytes(bytes[cursor..cursor + 4].try_into().unwrap()) as usize;
            cursor += 4;
            if cursor + key_len > bytes.len() {
                break;
            }
            let key = bytes[cursor..cursor + key_len].to_vec();
            cursor += key_len;

            if cursor + 4 > bytes.len() {
                break;
            }
            let value_len = u32::from_le_bytes(bytes[cursor..cursor + 4].try_into().unwrap()) as usize;
            cursor += 4;
            if cursor + value_len > bytes.len() {
                break;
            }
            let value = bytes[cursor..cursor + value_len].to_vec();
            cursor += value_len;

            data.insert(key, value);
        }
        Ok(data)
    }

    fn persist(&self) -> Result<(), GraphError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| GraphError::StorageFailure(e.to_string()))?;
        }

        let mut bytes = Vec::new();
        for (key, value) in &self.data {
            bytes.extend_from_slice(&(key.len() as u32).to_le_bytes());
            bytes.extend_from_slice(key);
            bytes.extend_from_slice(&(value.len() as u32).to_le_bytes());
            bytes.extend_from_slice(value);
        }

        let temp_path = self.path.with_extension("tmp");
        let mut file =
            std::fs::File::create(&temp_path).map_err(|e| GraphError::StorageFailure(e.to_string()))?;
        file.write_all(&bytes)
            .map_err(|e| GraphError::StorageFailure(e.to_string()))?;
        file.sync_all()
            .map_err(|e| GraphError::StorageFailure(e.to_string()))?;
        std::fs::rename(&temp_path, &self.path)
            .map_err(|e| GraphError::StorageFailure(e.to_string()))?;
        Ok(())
    }
}

impl KeyValueStore for FileBackedKVStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, GraphError> {
        Ok(self.data.get(key).cloned())
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), GraphError> {
        self.data.insert(key.to_vec(), value.to_vec());
        self.persist()
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), GraphError> {
        self.data.remove(key);
        self.persist()
    }

    fn atomic_batch_write(&mut self, operations: Vec<BatchOperation>) -> Result<(), GraphError> {
        for op in operations {
            match op {
                BatchOperation::Put { key, value } => {
                    self.data.insert(key, value);
                }
                BatchOperation::Delete { key } => {
                    self.data.remove(&key);
                }
            }
        }
        self.persist()
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, GraphError> {
        Ok(self
            .data
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_put_get_delete() {
        let mut store = InMemoryKVStore::new();
        store.put(b"k1", b"v1").unwrap();
        assert_eq!(store.get(b"k1").unwrap(), Some(b"v1".to_vec()));
        assert!(store.exists(b"k1").unwrap());
        store.delete(b"k1").unwrap();
        assert_eq!(store.get(b"k1").unwrap(), None);
    }

    #[test]
    fn in_memory_atomic_batch() {
        let mut store = InMemoryKVStore::new();
        let ops = vec![
            BatchOperation::put(b"a", b"1"),
            BatchOperation::put(b"b", b"2"),
        ];
        store.atomic_batch_write(ops).unwrap();
        assert_eq!(store.get(b"a").unwrap(), Some(b"1".to_vec()));
        assert_eq!(store.get(b"b").unwrap(), Some(b"2".to_vec()));
    }

    #[test]
    fn prefix_scan_filters_by_prefix() {
        let mut store = InMemoryKVStore::new();
        store.put(b"chunk:1", b"a").unwrap();
        store.put(b"chunk:2", b"b").unwrap();
        store.put(b"neuron:1", b"c").unwrap();
        let chunks = store.prefix_scan(b"chunk:").unwrap();
        assert_eq!(chunks.len(), 2);
    }

    #[test]
    fn file_backed_round_trips_through_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.bin");

        {
            let mut store = FileBackedKVStore::open(&path).unwrap();
            store.put(b"k", b"persisted").unwrap();
        }

        let store = FileBackedKVStore::open(&path).unwrap();
        assert_eq!(store.get(b"k").unwrap(), Some(b"persisted".to_vec()));
    }
}
