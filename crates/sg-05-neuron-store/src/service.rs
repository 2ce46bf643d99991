//! Neuron/synapse persistence over the shared `KeyValueStore` capability,
//! with secondary indexes by Merkle root and by outgoing/incoming edge.

use crate::domain::{Neuron, Synapse};
use sg_types::{BatchOperation, GraphError, Hash, KeyValueStore};
use uuid::Uuid;

fn neuron_key(id: &Uuid) -> Vec<u8> {
    format!("neuron:{id}").into_bytes()
}

fn synapse_key(id: &Uuid) -> Vec<u8> {
    format!("synapse:{id}").into_bytes()
}

fn merkle_key(root: &Hash) -> Vec<u8> {
    format!("merkle:{}", root.to_hex()).into_bytes()
}

fn out_key(source_id: &Uuid, synapse_id: &Uuid) -> Vec<u8> {
    format!("out:{source_id}:{synapse_id}").into_bytes()
}

fn in_key(target_id: &Uuid, synapse_id: &Uuid) -> Vec<u8> {
    format!("in:{target_id}:{synapse_id}").into_bytes()
}

/// Persists `Neuron` and `Synapse` records keyed by id, plus the secondary
/// indexes named in spec.md §6: `merkle:<root>`, `out:<srcId>:<synId>`,
/// `in:<tgtId>:<synId>`.
pub struct NeuronStore {
    store: Box<dyn KeyValueStore>,
}

impl NeuronStore {
    #[must_use]
    pub fn new(store: Box<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn put_neuron(&mut self, neuron: &Neuron) -> Result<(), GraphError> {
        let encoded =
            bincode::serialize(neuron).map_err(|e| GraphError::StorageFailure(e.to_string()))?;
        self.store.atomic_batch_write(vec![
            BatchOperation::put(neuron_key(&neuron.id), encoded),
            BatchOperation::put(merkle_key(&neuron.merkle_root), neuron.id.as_bytes().to_vec()),
        ])
    }

    #[must_use]
    pub fn get_neuron(&self, id: &Uuid) -> Result<Option<Neuron>, GraphError> {
        match self.store.get(&neuron_key(id))? {
            None => Ok(None),
            Some(bytes) => bincode::deserialize(&bytes)
                .map(Some)
                .map_err(|e| GraphError::StorageFailure(e.to_string())),
        }
    }

    /// Remove a neuron, its Merkle-root index entry, and unlink every
    /// synapse that referenced it (as either endpoint).
    pub fn delete_neuron(&mut self, id: &Uuid) -> Result<(), GraphError> {
        let Some(neuron) = self.get_neuron(id)? else {
            return Ok(());
        };

        let mut ops = vec![
            BatchOperation::delete(neuron_key(id)),
            BatchOperation::delete(merkle_key(&neuron.merkle_root)),
        ];

        for synapse_id in neuron.outgoing_synapses.iter().chain(neuron.incoming_synapses.iter()) {
            if let Some(synapse) = self.get_synapse(synapse_id)? {
                ops.push(BatchOperation::delete(synapse_key(synapse_id)));
                ops.push(BatchOperation::delete(out_key(&synapse.source_id, synapse_id)));
                ops.push(BatchOperation::delete(in_key(&synapse.target_id, synapse_id)));
            }
        }

        self.store.atomic_batch_write(ops)
    }

    #[must_use]
    pub fn find_by_merkle_root(&self, root: &Hash) -> Result<Option<Uuid>, GraphError> {
        match self.store.get(&merkle_key(root))? {
            None => Ok(None),
            Some(bytes) => {
                let arr: [u8; 16] = bytes
                    .try_into()
                    .map_err(|_| GraphError::StorageFailure("corrupt merkle index entry".into()))?;
                Ok(Some(Uuid::from_bytes(arr)))
            }
        }
    }

    pub fn put_synapse(&mut self, synapse: &Synapse) -> Result<(), GraphError> {
        let encoded =
            bincode::serialize(synapse).map_err(|e| GraphError::StorageFailure(e.to_string()))?;
        self.store.atomic_batch_write(vec![
            BatchOperation::put(synapse_key(&synapse.id), encoded),
            BatchOperation::put(out_key(&synapse.source_id, &synapse.id), synapse.id.as_bytes().to_vec()),
            BatchOperation::put(in_key(&synapse.target_id, &synapse.id), synapse.id.as_bytes().to_vec()),
        ])
    }

    #[must_use]
    pub fn get_synapse(&self, id: &Uuid) -> Result<Option<Synapse>, GraphError> {
        match self.store.get(&synapse_key(id))? {
            None => Ok(None),
            Some(bytes) => bincode::deserialize(&bytes)
                .map(Some)
                .map_err(|e| GraphError::StorageFailure(e.to_string())),
        }
    }

    pub fn delete_synapse(&mut self, id: &Uuid) -> Result<(), GraphError> {
        let Some(synapse) = self.get_synapse(id)? else {
            return Ok(());
        };
        self.store.atomic_batch_write(vec![
            BatchOperation::delete(synapse_key(id)),
            BatchOperation::delete(out_key(&synapse.source_id, id)),
            BatchOperation::delete(in_key(&synapse.target_id, id)),
        ])
    }

    /// Every synapse whose source is `neuron_id`.
    #[must_use]
    pub fn outgoing(&self, neuron_id: &Uuid) -> Result<Vec<Synapse>, GraphError> {
        let prefix = format!("out:{neuron_id}:").into_bytes();
        self.synapses_for_prefix(&prefix)
    }

    /// Every synapse whose target is `neuron_id`.
    #[must_use]
    pub fn incoming(&self, neuron_id: &Uuid) -> Result<Vec<Synapse>, GraphError> {
        let prefix = format!("in:{neuron_id}:").into_bytes();
        self.synapses_for_prefix(&prefix)
    }

    fn synapses_for_prefix(&self, prefix: &[u8]) -> Result<Vec<Synapse>, GraphError> {
        let entries = self.store.prefix_scan(prefix)?;
        let mut synapses = Vec::with_capacity(entries.len());
        for (_, value) in entries {
            let arr: [u8; 16] = value
                .try_into()
                .map_err(|_| GraphError::StorageFailure("corrupt edge index entry".into()))?;
            let synapse_id = Uuid::from_bytes(arr);
            if let Some(synapse) = self.get_synapse(&synapse_id)? {
                synapses.push(synapse);
            }
        }
        Ok(synapses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NeuronMetadata, SynapseMetadata, SynapseType};
    use sg_types::InMemoryKVStore;

    fn neuron(id: Uuid, root_byte: u8) -> Neuron {
        Neuron {
            id,
            embedding: vec![1.0, 0.0],
            chunk_hashes: vec![],
            merkle_root: Hash::from_bytes([root_byte; 32]),
            outgoing_synapses: vec![],
            incoming_synapses: vec![],
            metadata: NeuronMetadata {
                created_at: 0,
                updated_at: 0,
                last_accessed: 0,
                access_count: 0,
                source_type: "text".into(),
                tags: vec![],
            },
        }
    }

    fn synapse(id: Uuid, source: Uuid, target: Uuid) -> Synapse {
        Synapse {
            id,
            source_id: source,
            target_id: target,
            synapse_type: SynapseType::Semantic,
            weight: 0.5,
            metadata: SynapseMetadata {
                created_at: 0,
                updated_at: 0,
                activation_count: 0,
                last_activated: None,
                bidirectional: true,
            },
        }
    }

    #[test]
    fn put_then_get_neuron_round_trips() {
        let mut store = NeuronStore::new(Box::new(InMemoryKVStore::new()));
        let id = Uuid::new_v4();
        let n = neuron(id, 1);
        store.put_neuron(&n).unwrap();
        let fetched = store.get_neuron(&id).unwrap().unwrap();
        assert_eq!(fetched.id, id);
    }

    #[test]
    fn find_by_merkle_root_resolves_to_neuron_id() {
        let mut store = NeuronStore::new(Box::new(InMemoryKVStore::new()));
        let id = Uuid::new_v4();
        let n = neuron(id, 7);
        store.put_neuron(&n).unwrap();
        assert_eq!(store.find_by_merkle_root(&n.merkle_root).unwrap(), Some(id));
        assert_eq!(store.find_by_merkle_root(&Hash::from_bytes([9; 32])).unwrap(), None);
    }

    #[test]
    fn outgoing_and_incoming_list_synapses() {
        let mut store = NeuronStore::new(Box::new(InMemoryKVStore::new()));
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let syn_id = Uuid::new_v4();
        store.put_synapse(&synapse(syn_id, a, b)).unwrap();

        let out = store.outgoing(&a).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, syn_id);

        let inc = store.incoming(&b).unwrap();
        assert_eq!(inc.len(), 1);
        assert_eq!(inc[0].id, syn_id);
    }

    #[test]
    fn delete_neuron_unlinks_referencing_synapses() {
        let mut store = NeuronStore::new(Box::new(InMemoryKVStore::new()));
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let syn_id = Uuid::new_v4();

        let mut na = neuron(a, 1);
        na.outgoing_synapses.push(syn_id);
        let nb = neuron(b, 2);

        store.put_neuron(&na).unwrap();
        store.put_neuron(&nb).unwrap();
        store.put_synapse(&synapse(syn_id, a, b)).unwrap();

        store.delete_neuron(&a).unwrap();

        assert!(store.get_neuron(&a).unwrap().is_none());
        assert!(store.get_synapse(&syn_id).unwrap().is_none());
        assert!(store.outgoing(&a).unwrap().is_empty());
        assert!(store.incoming(&b).unwrap().is_empty());
    }

    #[test]
    fn delete_synapse_removes_both_edge_index_entries() {
        let mut store = NeuronStore::new(Box::new(InMemoryKVStore::new()));
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let syn_id = Uuid::new_v4();
        store.put_synapse(&synapse(syn_id, a, b)).unwrap();

        store.delete_synapse(&syn_id).unwrap();
        assert!(store.outgoing(&a).unwrap().is_empty());
        assert!(store.incoming(&b).unwrap().is_empty());
    }
}
