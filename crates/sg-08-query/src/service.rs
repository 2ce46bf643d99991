//! Query engine: the five-step `search` sequence from spec.md §4.H.

use crate::domain::ScoredChunk;
use sg_02_chunk_store::ChunkStore;
use sg_01_hasher::EmbeddingProvider;
use sg_06_graph::NeuronGraph;
use sg_types::GraphError;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

/// Owns the read path over the neuron graph and chunk store, plus the
/// embedding capability used to turn query text into a vector.
pub struct QueryEngine {
    chunk_store: ChunkStore,
    embedding: Arc<dyn EmbeddingProvider>,
    graph: NeuronGraph,
}

impl QueryEngine {
    #[must_use]
    pub fn new(chunk_store: ChunkStore, embedding: Arc<dyn EmbeddingProvider>, graph: NeuronGraph) -> Self {
        Self { chunk_store, embedding, graph }
    }

    #[must_use]
    pub fn graph(&self) -> &NeuronGraph {
        &self.graph
    }

    #[must_use]
    pub fn graph_mut(&mut self) -> &mut NeuronGraph {
        &mut self.graph
    }

    /// 1. embed the query, 2. ANN search, 3. fetch + graph-aware rerank
    /// (boost by excitatory outgoing-synapse weight toward other hits
    /// already in the result set), 4. reconstruct content from chunks,
    /// 5. sort by boosted score descending, ties by neuron id.
    pub fn search(&mut self, query_text: &str, k: usize, ef: Option<usize>) -> Result<Vec<ScoredChunk>, GraphError> {
        if query_text.is_empty() {
            return Err(GraphError::EmptyInput("search: empty query".into()));
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedding.embed(query_text)?;
        let hits = self.graph.search_similar(&query_embedding, k, ef);
        let hit_ids: HashSet<Uuid> = hits.iter().map(|(id, _)| *id).collect();

        let mut scored = Vec::with_capacity(hits.len());
        for (neuron_id, similarity) in hits {
            let Some(neuron) = self.graph.get_neuron(&neuron_id)? else {
                continue;
            };

            let boost: f32 = self
                .graph
                .outgoing(&neuron_id)?
                .iter()
                .filter(|s| s.synapse_type.is_excitatory() && hit_ids.contains(&s.target_id))
                .map(|s| s.weight)
                .sum();

            let mut content = String::new();
            for hash in &neuron.chunk_hashes {
                if let Some(chunk) = self.chunk_store.get(hash)? {
                    content.push_str(&String::from_utf8_lossy(&chunk.data));
                }
            }

            scored.push(ScoredChunk {
                neuron_id,
                score: similarity + boost,
                content,
                source_type: neuron.metadata.source_type.clone(),
                tags: neuron.metadata.tags.clone(),
            });
        }

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.neuron_id.cmp(&b.neuron_id))
        });
        Ok(scored)
    }
}
