//! HNSW index: insert, search, soft-delete, force-delete, compact.

use crate::domain::{HnswNode, HnswParams};
use crate::snapshot::HnswSnapshot;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sg_01_hasher::{cosine_similarity, Embedding};
use sg_types::GraphError;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};
use uuid::Uuid;

#[derive(Clone, Copy, Debug)]
struct ScoredId(Uuid, f32);

impl PartialEq for ScoredId {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}
impl Eq for ScoredId {}
impl PartialOrd for ScoredId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for ScoredId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.1
            .partial_cmp(&other.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.0.cmp(&other.0))
    }
}

/// Approximate nearest-neighbor index over L2-normalized embeddings.
///
/// State machine per node: `absent -> live -> tombstoned -> removed`.
/// `live` and `tombstoned` nodes share storage; `removed` happens only at
/// `compact()` or `force_delete()`.
pub struct HnswIndex {
    params: HnswParams,
    nodes: HashMap<Uuid, HnswNode>,
    layers: HashMap<usize, HashSet<Uuid>>,
    entry_point: Option<Uuid>,
    max_layer: usize,
    tombstones: HashSet<Uuid>,
    entry_point_stale: bool,
    rng: StdRng,
}

impl HnswIndex {
    #[must_use]
    pub fn new(params: HnswParams) -> Self {
        Self::with_rng(params, StdRng::from_entropy())
    }

    /// Construct with a seeded RNG so layer assignment is reproducible.
    #[must_use]
    pub fn with_seed(params: HnswParams, seed: u64) -> Self {
        Self::with_rng(params, StdRng::seed_from_u64(seed))
    }

    fn with_rng(params: HnswParams, rng: StdRng) -> Self {
        Self {
            params,
            nodes: HashMap::new(),
            layers: HashMap::new(),
            entry_point: None,
            max_layer: 0,
            tombstones: HashSet::new(),
            entry_point_stale: false,
            rng,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn tombstone_count(&self) -> usize {
        self.tombstones.len()
    }

    #[must_use]
    pub fn contains(&self, id: &Uuid) -> bool {
        self.nodes.contains_key(id) && !self.tombstones.contains(id)
    }

    fn sample_layer(&mut self) -> usize {
        let u: f64 = self.rng.gen_range(f64::MIN_POSITIVE..=1.0);
        (-u.ln() * self.params.m_l).floor().max(0.0) as usize
    }

    fn insert_node_shell(&mut self, id: Uuid, embedding: Embedding, layer: usize) {
        let mut connections = HashMap::new();
        for l in 0..=layer {
            connections.insert(l, HashSet::new());
            self.layers.entry(l).or_default().insert(id);
        }
        self.nodes.insert(
            id,
            HnswNode {
                id,
                embedding,
                layer,
                connections,
            },
        );
    }

    fn connect(&mut self, from: Uuid, to: Uuid, layer: usize) {
        if let Some(node) = self.nodes.get_mut(&from) {
            node.connections.entry(layer).or_default().insert(to);
        }
    }

    fn disconnect(&mut self, from: Uuid, to: Uuid, layer: usize) {
        if let Some(node) = self.nodes.get_mut(&from) {
            if let Some(set) = node.connections.get_mut(&layer) {
                set.remove(&to);
            }
        }
    }

    /// Beam search on a single layer. Returns up to `ef` candidates sorted
    /// by similarity descending, ties broken by id. Tombstoned nodes are
    /// never visited or returned.
    fn search_layer(&self, query: &[f32], entry_points: &[Uuid], ef: usize, layer: usize) -> Vec<(Uuid, f32)> {
        let mut visited: HashSet<Uuid> = HashSet::new();
        let mut candidates: BinaryHeap<ScoredId> = BinaryHeap::new();
        let mut results: BinaryHeap<std::cmp::Reverse<ScoredId>> = BinaryHeap::new();

        for &ep in entry_points {
            if self.tombstones.contains(&ep) || visited.contains(&ep) {
                continue;
            }
            if let Some(node) = self.nodes.get(&ep) {
                let sim = cosine_similarity(query, &node.embedding);
                visited.insert(ep);
                candidates.push(ScoredId(ep, sim));
                results.push(std::cmp::Reverse(ScoredId(ep, sim)));
            }
        }

        while let Some(ScoredId(current_id, current_sim)) = candidates.pop() {
            if let Some(std::cmp::Reverse(ScoredId(_, worst))) = results.peek() {
                if results.len() >= ef && current_sim < *worst {
                    break;
                }
            }
            let neighbors: Vec<Uuid> = match self.nodes.get(&current_id) {
                Some(node) => node
                    .connections
                    .get(&layer)
                    .map(|s| s.iter().copied().collect())
                    .unwrap_or_default(),
                None => continue,
            };

            for neighbor_id in neighbors {
                if visited.contains(&neighbor_id) || self.tombstones.contains(&neighbor_id) {
                    continue;
                }
                visited.insert(neighbor_id);
                if let Some(neighbor_node) = self.nodes.get(&neighbor_id) {
                    let sim = cosine_similarity(query, &neighbor_node.embedding);
                    let worse_than_worst = results.len() >= ef
                        && results
                            .peek()
                            .map(|std::cmp::Reverse(ScoredId(_, w))| sim <= *w)
                            .unwrap_or(false);
                    if !worse_than_worst {
                        candidates.push(ScoredId(neighbor_id, sim));
                        results.push(std::cmp::Reverse(ScoredId(neighbor_id, sim)));
                        if results.len() > ef {
                            results.pop();
                        }
                    }
                }
            }
        }

        let mut out: Vec<(Uuid, f32)> = results
            .into_iter()
            .map(|std::cmp::Reverse(ScoredId(id, s))| (id, s))
            .collect();
        out.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal).then(a.0.cmp(&b.0)));
        out
    }

    fn prune_connections(&mut self, id: Uuid, layer: usize, max_conn: usize) {
        let node_embedding = match self.nodes.get(&id) {
            Some(n) => n.embedding.clone(),
            None => return,
        };
        let neighbor_ids: Vec<Uuid> = match self.nodes.get(&id).and_then(|n| n.connections.get(&layer)) {
            Some(set) if set.len() > max_conn => set.iter().copied().collect(),
            _ => return,
        };

        let mut scored: Vec<(Uuid, f32)> = neighbor_ids
            .iter()
            .filter_map(|nid| self.nodes.get(nid).map(|n| (*nid, cosine_similarity(&node_embedding, &n.embedding))))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal).then(a.0.cmp(&b.0)));
        let keep: HashSet<Uuid> = scored.iter().take(max_conn).map(|(id, _)| *id).collect();

        for nid in neighbor_ids {
            if !keep.contains(&nid) {
                self.disconnect(id, nid, layer);
                self.disconnect(nid, id, layer);
            }
        }
    }

    /// Insert `id` at `embedding`. Fails `Duplicate` if `id` already exists
    /// (live or tombstoned).
    pub fn insert(&mut self, id: Uuid, embedding: Embedding) -> Result<(), GraphError> {
        if self.nodes.contains_key(&id) {
            return Err(GraphError::Duplicate(format!("hnsw node {id} already exists")));
        }

        let layer = self.sample_layer();

        let Some(entry) = self.entry_point else {
            self.insert_node_shell(id, embedding, layer);
            self.entry_point = Some(id);
            self.max_layer = layer;
            self.entry_point_stale = false;
            return Ok(());
        };

        let mut current = vec![entry];
        let mut cur_layer = self.max_layer;
        while cur_layer > layer {
            let nearest = self.search_layer(&embedding, &current, 1, cur_layer);
            if let Some((best_id, _)) = nearest.first() {
                current = vec![*best_id];
            }
            if cur_layer == 0 {
                break;
            }
            cur_layer -= 1;
        }

        self.insert_node_shell(id, embedding.clone(), layer);

        let mut entry_points = current;
        let start_layer = layer.min(self.max_layer);
        for l in (0..=start_layer).rev() {
            let candidates = self.search_layer(&embedding, &entry_points, self.params.ef_construction, l);
            let max_conn = if l == 0 { self.params.m * 2 } else { self.params.m };
            let selected: Vec<Uuid> = candidates.iter().take(self.params.m).map(|(id, _)| *id).collect();

            for &neighbor_id in &selected {
                self.connect(id, neighbor_id, l);
                self.connect(neighbor_id, id, l);
                self.prune_connections(neighbor_id, l, max_conn);
            }
            self.prune_connections(id, l, max_conn);

            entry_points = if candidates.is_empty() {
                vec![entry]
            } else {
                candidates.into_iter().map(|(id, _)| id).collect()
            };
        }

        if layer > self.max_layer {
            self.entry_point = Some(id);
            self.max_layer = layer;
        }

        Ok(())
    }

    fn refresh_entry_point(&mut self) {
        let mut best: Option<(Uuid, usize)> = None;
        for (id, node) in &self.nodes {
            if self.tombstones.contains(id) {
                continue;
            }
            if best.map_or(true, |(_, l)| node.layer > l) {
                best = Some((*id, node.layer));
            }
        }
        match best {
            Some((id, layer)) => {
                self.entry_point = Some(id);
                self.max_layer = layer;
            }
            None => {
                self.entry_point = None;
                self.max_layer = 0;
            }
        }
        self.entry_point_stale = false;
    }

    /// Return up to `k` nearest neighbors of `query` by cosine similarity,
    /// sorted descending (ties broken by id). Tombstoned ids never appear.
    pub fn search(&mut self, query: &[f32], k: usize, ef: Option<usize>) -> Vec<(Uuid, f32)> {
        if self.nodes.is_empty() || self.entry_point.is_none() {
            return Vec::new();
        }
        if self.entry_point_stale {
            self.refresh_entry_point();
        }
        let Some(entry) = self.entry_point else {
            return Vec::new();
        };

        let mut current = vec![entry];
        let mut layer = self.max_layer;
        while layer > 0 {
            let nearest = self.search_layer(query, &current, 1, layer);
            if let Some((id, _)) = nearest.first() {
                current = vec![*id];
            }
            layer -= 1;
        }

        let ef = ef.unwrap_or(self.params.ef_search).max(k);
        let candidates = self.search_layer(query, &current, ef, 0);
        candidates.into_iter().take(k).collect()
    }

    /// O(1) tombstone mark. If `id` was the entry point, flags the index
    /// for lazy entry-point refresh on the next `search`.
    pub fn delete(&mut self, id: Uuid) -> Result<(), GraphError> {
        if !self.nodes.contains_key(&id) {
            return Err(GraphError::NotFound(format!("hnsw node {id} not found")));
        }
        if !self.tombstones.insert(id) {
            return Ok(());
        }
        if self.entry_point == Some(id) {
            self.entry_point_stale = true;
        }
        Ok(())
    }

    /// Unlink `id`'s edges, drop its storage, and clear the entry point if
    /// it pointed to `id` (triggering a refresh on next search).
    pub fn force_delete(&mut self, id: Uuid) -> Result<(), GraphError> {
        let node = self
            .nodes
            .remove(&id)
            .ok_or_else(|| GraphError::NotFound(format!("hnsw node {id} not found")))?;
        self.tombstones.remove(&id);

        for (layer, neighbors) in &node.connections {
            for &neighbor in neighbors {
                self.disconnect(neighbor, id, *layer);
            }
            if let Some(set) = self.layers.get_mut(layer) {
                set.remove(&id);
            }
        }

        if self.entry_point == Some(id) {
            self.entry_point = None;
            self.entry_point_stale = true;
        }
        Ok(())
    }

    /// Remove every tombstoned node and its back-edges, refreshing the
    /// entry point. Returns the count removed.
    pub fn compact(&mut self) -> usize {
        let ids: Vec<Uuid> = self.tombstones.iter().copied().collect();
        let mut removed = 0usize;
        for id in ids {
            if self.force_delete(id).is_ok() {
                removed += 1;
            }
        }
        self.tombstones.clear();
        if self.entry_point_stale || (self.entry_point.is_none() && !self.nodes.is_empty()) {
            self.refresh_entry_point();
        }
        removed
    }

    #[must_use]
    pub fn to_snapshot(&self) -> HnswSnapshot {
        HnswSnapshot {
            params: self.params,
            nodes: self.nodes.clone(),
            layers: self.layers.clone(),
            entry_point: self.entry_point,
            max_layer: self.max_layer,
            tombstones: self.tombstones.clone(),
            entry_point_stale: self.entry_point_stale,
        }
    }

    #[must_use]
    pub fn from_snapshot(snapshot: HnswSnapshot) -> Self {
        Self {
            params: snapshot.params,
            nodes: snapshot.nodes,
            layers: snapshot.layers,
            entry_point: snapshot.entry_point,
            max_layer: snapshot.max_layer,
            tombstones: snapshot.tombstones,
            entry_point_stale: snapshot.entry_point_stale,
            rng: StdRng::from_entropy(),
        }
    }
}
