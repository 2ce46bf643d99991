//! `updateNeuronEmbedding(id, v)`: persist a new vector and re-index it.

use crate::service::{NeuronGraph, EVENT_SOURCE};
use sg_01_hasher::Embedding;
use sg_bus::{EventPayload, GraphEvent};
use sg_types::GraphError;
use uuid::Uuid;

impl NeuronGraph {
    /// Persist `id`'s new embedding, `forceDelete` it from the HNSW index,
    /// and re-insert at the new vector. Retries the re-insert once on a
    /// duplicate-id collision (the old tombstone lingering from a
    /// concurrent mutation), per spec.md §4.F.
    pub fn update_neuron_embedding(&mut self, id: Uuid, v: Embedding) -> Result<(), GraphError> {
        let Some(mut neuron) = self.store.get_neuron(&id)? else {
            return Err(GraphError::NotFound(format!("neuron {id} not found")));
        };

        neuron.embedding = v.clone();
        neuron.metadata.updated_at = self.time.now_millis();
        self.store.put_neuron(&neuron)?;

        self.index.force_delete(id).ok();
        if let Err(err) = self.index.insert(id, v.clone()) {
            match err {
                sg_types::GraphError::Duplicate(_) => {
                    self.index.force_delete(id).ok();
                    self.index.insert(id, v)?;
                }
                other => return Err(other),
            }
        }

        self.bus.publish(GraphEvent::new(
            EVENT_SOURCE,
            self.time.now_millis(),
            EventPayload::NeuronUpdated { neuron_id: id },
        ));
        Ok(())
    }
}
