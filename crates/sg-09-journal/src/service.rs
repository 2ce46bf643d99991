//! Change journal service: an append-only log of `ChangeEntry` records
//! over the shared `KeyValueStore`, keyed so a prefix scan yields entries
//! in sequence order.
//!
//! Grounded on the teacher's anchor-pruning idiom (`domain::pruning`):
//! `compact` drops everything before a threshold the same way pruning
//! drops everything below `keep_recent`, except the journal has no
//! anchor exception — every entry below the threshold goes.

use crate::domain::{ChangeEntry, EntityType, NewChangeEntry};
use sg_types::{BatchOperation, GraphError, KeyValueStore};
use uuid::Uuid;

const SEQ_PREFIX: &str = "seq:";
const LATEST_SEQUENCE_KEY: &str = "meta:latest-sequence";

fn seq_key(sequence: u64) -> Vec<u8> {
    format!("{SEQ_PREFIX}{sequence:020}").into_bytes()
}

fn decode_sequence(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    let n = bytes.len().min(8);
    buf[..n].copy_from_slice(&bytes[..n]);
    u64::from_le_bytes(buf)
}

fn parse_seq_from_key(key: &[u8]) -> Option<u64> {
    let text = std::str::from_utf8(key).ok()?;
    let suffix = text.strip_prefix(SEQ_PREFIX)?;
    suffix.parse().ok()
}

/// Append-only change journal. Sequences are monotonic, start at 1, and
/// are never reused, even across `compact`.
pub struct ChangeJournal {
    store: Box<dyn KeyValueStore>,
    latest_sequence: u64,
}

impl ChangeJournal {
    /// Open (or recover) a journal over `store`. The running sequence
    /// counter is read from `meta:latest-sequence`; if that key is
    /// missing (a store created before this journal ever wrote it, or a
    /// crash between writing an entry and stamping the counter) it is
    /// recovered by scanning every `seq:` key for the maximum.
    pub fn new(store: Box<dyn KeyValueStore>) -> Result<Self, GraphError> {
        let latest_sequence = match store.get(LATEST_SEQUENCE_KEY.as_bytes())? {
            Some(bytes) => decode_sequence(&bytes),
            None => store
                .prefix_scan(SEQ_PREFIX.as_bytes())?
                .iter()
                .filter_map(|(k, _)| parse_seq_from_key(k))
                .max()
                .unwrap_or(0),
        };
        Ok(Self { store, latest_sequence })
    }

    #[must_use]
    pub fn get_latest_sequence(&self) -> u64 {
        self.latest_sequence
    }

    pub fn has_entries(&self) -> Result<bool, GraphError> {
        if self.latest_sequence == 0 {
            return Ok(false);
        }
        Ok(!self.store.prefix_scan(SEQ_PREFIX.as_bytes())?.is_empty())
    }

    /// Assign the next sequence to `entry`, persist it, and bump the
    /// running counter. Returns the stamped entry.
    pub fn append(&mut self, entry: NewChangeEntry) -> Result<ChangeEntry, GraphError> {
        let [stamped] = self.append_batch(vec![entry])?.try_into().map_err(|_| {
            GraphError::StorageFailure("append_batch did not return exactly one entry".into())
        })?;
        Ok(stamped)
    }

    /// Append every entry in `entries` as one atomic write with
    /// contiguous sequences: either all entries land, or none do.
    pub fn append_batch(&mut self, entries: Vec<NewChangeEntry>) -> Result<Vec<ChangeEntry>, GraphError> {
        if entries.is_empty() {
            return Ok(Vec::new());
        }

        let mut stamped = Vec::with_capacity(entries.len());
        let mut ops = Vec::with_capacity(entries.len() + 1);
        let mut next_sequence = self.latest_sequence;

        for entry in entries {
            next_sequence += 1;
            let change = ChangeEntry {
                sequence: next_sequence,
                entity_type: entry.entity_type,
                operation: entry.operation,
                entity_id: entry.entity_id,
                data: entry.data,
                vector_clock: entry.vector_clock,
                timestamp: entry.timestamp,
                node_id: entry.node_id,
            };
            let encoded =
                bincode::serialize(&change).map_err(|e| GraphError::StorageFailure(e.to_string()))?;
            ops.push(BatchOperation::put(seq_key(change.sequence), encoded));
            stamped.push(change);
        }
        ops.push(BatchOperation::put(
            LATEST_SEQUENCE_KEY.as_bytes().to_vec(),
            next_sequence.to_le_bytes().to_vec(),
        ));

        self.store.atomic_batch_write(ops)?;
        self.latest_sequence = next_sequence;
        Ok(stamped)
    }

    pub fn get(&self, sequence: u64) -> Result<Option<ChangeEntry>, GraphError> {
        match self.store.get(&seq_key(sequence))? {
            None => Ok(None),
            Some(bytes) => {
                let entry = bincode::deserialize(&bytes)
                    .map_err(|e| GraphError::StorageFailure(e.to_string()))?;
                Ok(Some(entry))
            }
        }
    }

    /// Every entry with `start <= sequence <= end`, ascending.
    pub fn get_range(&self, start: u64, end: u64) -> Result<Vec<ChangeEntry>, GraphError> {
        let mut entries = self.scan_all()?;
        entries.retain(|e| e.sequence >= start && e.sequence <= end);
        entries.sort_by_key(|e| e.sequence);
        Ok(entries)
    }

    /// Every entry with `sequence > after`, ascending.
    pub fn get_after_sequence(&self, after: u64) -> Result<Vec<ChangeEntry>, GraphError> {
        let mut entries = self.scan_all()?;
        entries.retain(|e| e.sequence > after);
        entries.sort_by_key(|e| e.sequence);
        Ok(entries)
    }

    pub fn get_by_entity(&self, entity_id: Uuid) -> Result<Vec<ChangeEntry>, GraphError> {
        let mut entries = self.scan_all()?;
        entries.retain(|e| e.entity_id == entity_id);
        entries.sort_by_key(|e| e.sequence);
        Ok(entries)
    }

    pub fn get_by_type(&self, entity_type: EntityType) -> Result<Vec<ChangeEntry>, GraphError> {
        let mut entries = self.scan_all()?;
        entries.retain(|e| e.entity_type == entity_type);
        entries.sort_by_key(|e| e.sequence);
        Ok(entries)
    }

    /// Delete every entry with `sequence < before`. Returns the number
    /// removed. The running sequence counter is untouched: the next
    /// `append` still continues from `latest_sequence`, so sequences
    /// remain a contiguous, never-reused prefix-and-suffix.
    pub fn compact(&mut self, before: u64) -> Result<usize, GraphError> {
        let entries = self.store.prefix_scan(SEQ_PREFIX.as_bytes())?;
        let mut ops = Vec::new();
        let mut removed = 0usize;
        for (key, _) in entries {
            if let Some(sequence) = parse_seq_from_key(&key) {
                if sequence < before {
                    ops.push(BatchOperation::delete(key));
                    removed += 1;
                }
            }
        }
        if !ops.is_empty() {
            self.store.atomic_batch_write(ops)?;
        }
        Ok(removed)
    }

    /// Wipe every entry and reset the sequence counter to zero.
    pub fn clear(&mut self) -> Result<(), GraphError> {
        let entries = self.store.prefix_scan(SEQ_PREFIX.as_bytes())?;
        let mut ops: Vec<BatchOperation> = entries.into_iter().map(|(k, _)| BatchOperation::delete(k)).collect();
        ops.push(BatchOperation::delete(LATEST_SEQUENCE_KEY.as_bytes().to_vec()));
        self.store.atomic_batch_write(ops)?;
        self.latest_sequence = 0;
        Ok(())
    }

    fn scan_all(&self) -> Result<Vec<ChangeEntry>, GraphError> {
        self.store
            .prefix_scan(SEQ_PREFIX.as_bytes())?
            .into_iter()
            .map(|(_, bytes)| {
                bincode::deserialize(&bytes).map_err(|e| GraphError::StorageFailure(e.to_string()))
            })
            .collect()
    }
}
