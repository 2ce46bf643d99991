//! `createNeuron` and `autoConnect`.

use crate::domain::{CreateNeuronInput, AUTO_CONNECT_NEIGHBORS};
use crate::service::{NeuronGraph, EVENT_SOURCE};
use sg_05_neuron_store::{Neuron, NeuronMetadata, Synapse, SynapseMetadata, SynapseType};
use sg_bus::{EventPayload, GraphEvent};
use sg_types::GraphError;
use uuid::Uuid;

impl NeuronGraph {
    /// Persist a new neuron, index it in HNSW, and `autoConnect` it unless
    /// `input.auto_connect` is false.
    pub fn create_neuron(&mut self, input: CreateNeuronInput) -> Result<Neuron, GraphError> {
        let id = Uuid::new_v4();
        let now = self.time.now_millis();
        let neuron = Neuron {
            id,
            embedding: input.embedding.clone(),
            chunk_hashes: input.chunk_hashes,
            merkle_root: input.merkle_root,
            outgoing_synapses: Vec::new(),
            incoming_synapses: Vec::new(),
            metadata: NeuronMetadata {
                created_at: now,
                updated_at: now,
                last_accessed: now,
                access_count: 0,
                source_type: input.source_type,
                tags: input.tags,
            },
        };

        self.store.put_neuron(&neuron)?;
        self.index.insert(id, input.embedding)?;

        self.bus.publish(GraphEvent::new(
            EVENT_SOURCE,
            now,
            EventPayload::NeuronCreated { neuron_id: id, merkle_root: neuron.merkle_root },
        ));

        if input.auto_connect {
            self.auto_connect(id, input.semantic_threshold)?;
        }

        Ok(neuron)
    }

    /// Fetch the 20 nearest neighbors of `id` and, for each with similarity
    /// `>= threshold` and no existing connection to `id`, create a
    /// bidirectional `SEMANTIC` synapse with weight equal to the score.
    /// Returns the ids of the synapses created.
    pub fn auto_connect(&mut self, id: Uuid, threshold: f32) -> Result<Vec<Uuid>, GraphError> {
        let Some(neuron) = self.store.get_neuron(&id)? else {
            return Err(GraphError::NotFound(format!("neuron {id} not found")));
        };

        let neighbors = self.index.search(&neuron.embedding, AUTO_CONNECT_NEIGHBORS + 1, None);
        let mut created = Vec::new();

        for (neighbor_id, score) in neighbors {
            if neighbor_id == id || score < threshold {
                continue;
            }
            if self.already_connected(id, neighbor_id)? {
                continue;
            }
            let synapse_id = self.link(id, neighbor_id, SynapseType::Semantic, score, true)?;
            created.push(synapse_id);
        }

        Ok(created)
    }

    /// Whether `a` and `b` are already linked by any synapse, in either
    /// stored direction.
    pub(crate) fn already_connected(&self, a: Uuid, b: Uuid) -> Result<bool, GraphError> {
        if self.store.outgoing(&a)?.iter().any(|s| s.target_id == b) {
            return Ok(true);
        }
        if self.store.incoming(&a)?.iter().any(|s| s.source_id == b && s.metadata.bidirectional) {
            return Ok(true);
        }
        Ok(false)
    }

    /// Create a synapse `source -> target`, persist it, update both
    /// endpoints' cached edge lists (used by `delete_neuron` to unlink),
    /// and publish `synapse:formed`. Returns the new synapse id.
    pub(crate) fn link(
        &mut self,
        source: Uuid,
        target: Uuid,
        synapse_type: SynapseType,
        weight: f32,
        bidirectional: bool,
    ) -> Result<Uuid, GraphError> {
        let now = self.time.now_millis();
        let synapse_id = Uuid::new_v4();
        let synapse = Synapse {
            id: synapse_id,
            source_id: source,
            target_id: target,
            synapse_type,
            weight,
            metadata: SynapseMetadata {
                created_at: now,
                updated_at: now,
                activation_count: 0,
                last_activated: None,
                bidirectional,
            },
        };
        self.store.put_synapse(&synapse)?;

        if let Some(mut src) = self.store.get_neuron(&source)? {
            src.outgoing_synapses.push(synapse_id);
            self.store.put_neuron(&src)?;
        }
        if let Some(mut tgt) = self.store.get_neuron(&target)? {
            tgt.incoming_synapses.push(synapse_id);
            self.store.put_neuron(&tgt)?;
        }

        self.bus.publish(GraphEvent::new(
            EVENT_SOURCE,
            now,
            EventPayload::SynapseFormed { synapse_id, source_id: source, target_id: target, weight },
        ));

        Ok(synapse_id)
    }
}
