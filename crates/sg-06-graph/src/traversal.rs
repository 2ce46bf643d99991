//! Graph traversal: BFS, DFS, WEIGHTED (max-heap over accumulated weight),
//! RANDOM_WALK (roulette over excitatory weights), and `findPath` (BFS
//! shortest path by hop count).

use crate::domain::{TraversalPath, TraversalStrategy};
use crate::service::NeuronGraph;
use rand::Rng;
use sg_05_neuron_store::{Synapse, SynapseType};
use sg_types::GraphError;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet, VecDeque};
use uuid::Uuid;

/// One directed hop available from a neuron: the synapse and the neighbor
/// it leads to. `INHIBITORY` links are never included — they are never
/// followed by any strategy.
fn excitatory_hops(graph: &NeuronGraph, id: Uuid) -> Result<Vec<(Synapse, Uuid)>, GraphError> {
    let mut hops = Vec::new();
    for s in graph.store.outgoing(&id)? {
        if s.synapse_type.is_excitatory() {
            hops.push((s.clone(), s.target_id));
        }
    }
    for s in graph.store.incoming(&id)? {
        if s.synapse_type.is_excitatory() && s.metadata.bidirectional {
            hops.push((s.clone(), s.source_id));
        }
    }
    Ok(hops)
}

#[derive(Clone)]
struct WeightedFrontierEntry {
    path: TraversalPath,
    current: Uuid,
}

impl PartialEq for WeightedFrontierEntry {
    fn eq(&self, other: &Self) -> bool {
        self.path.total_weight == other.path.total_weight
    }
}
impl Eq for WeightedFrontierEntry {}
impl PartialOrd for WeightedFrontierEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for WeightedFrontierEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.path.total_weight.partial_cmp(&other.path.total_weight).unwrap_or(Ordering::Equal)
    }
}

impl NeuronGraph {
    /// Traverse from `start` up to `max_depth` hops using `strategy`.
    /// Returns every terminal path recorded where traversal stopped
    /// because there were no unvisited excitatory neighbors left, or the
    /// depth limit was reached. `predicate` filters which hops are taken
    /// (returning `false` skips that hop).
    pub fn traverse(
        &self,
        start: Uuid,
        strategy: TraversalStrategy,
        max_depth: usize,
        predicate: Option<&dyn Fn(&Synapse) -> bool>,
    ) -> Result<Vec<TraversalPath>, GraphError> {
        match strategy {
            TraversalStrategy::Bfs => self.traverse_breadth_first(start, max_depth, predicate),
            TraversalStrategy::Dfs => self.traverse_depth_first(start, max_depth, predicate),
            TraversalStrategy::Weighted => self.traverse_weighted(start, max_depth, predicate),
            TraversalStrategy::RandomWalk => self.traverse_random_walk(start, max_depth, predicate),
        }
    }

    fn traverse_breadth_first(
        &self,
        start: Uuid,
        max_depth: usize,
        predicate: Option<&dyn Fn(&Synapse) -> bool>,
    ) -> Result<Vec<TraversalPath>, GraphError> {
        let mut terminals = Vec::new();
        let mut queue = VecDeque::new();
        let mut visited = HashSet::new();
        visited.insert(start);
        queue.push_back(TraversalPath { neurons: vec![start], synapses: vec![], total_weight: 0.0 });

        while let Some(path) = queue.pop_front() {
            let current = *path.neurons.last().unwrap();
            if path.neurons.len() - 1 >= max_depth {
                terminals.push(path);
                continue;
            }
            let hops = self.next_hops(current, &visited, predicate)?;
            if hops.is_empty() {
                terminals.push(path);
                continue;
            }
            for (synapse, next) in hops {
                visited.insert(next);
                let mut next_path = path.clone();
                next_path.neurons.push(next);
                next_path.synapses.push(synapse.id);
                next_path.total_weight += synapse.weight;
                queue.push_back(next_path);
            }
        }
        Ok(terminals)
    }

    fn traverse_depth_first(
        &self,
        start: Uuid,
        max_depth: usize,
        predicate: Option<&dyn Fn(&Synapse) -> bool>,
    ) -> Result<Vec<TraversalPath>, GraphError> {
        let mut terminals = Vec::new();
        let mut stack = vec![TraversalPath { neurons: vec![start], synapses: vec![], total_weight: 0.0 }];

        while let Some(path) = stack.pop() {
            let current = *path.neurons.last().unwrap();
            let visited: HashSet<Uuid> = path.neurons.iter().copied().collect();
            if path.neurons.len() - 1 >= max_depth {
                terminals.push(path);
                continue;
            }
            let hops = self.next_hops(current, &visited, predicate)?;
            if hops.is_empty() {
                terminals.push(path);
                continue;
            }
            for (synapse, next) in hops {
                let mut next_path = path.clone();
                next_path.neurons.push(next);
                next_path.synapses.push(synapse.id);
                next_path.total_weight += synapse.weight;
                stack.push(next_path);
            }
        }
        Ok(terminals)
    }

    fn traverse_weighted(
        &self,
        start: Uuid,
        max_depth: usize,
        predicate: Option<&dyn Fn(&Synapse) -> bool>,
    ) -> Result<Vec<TraversalPath>, GraphError> {
        let mut terminals = Vec::new();
        let mut heap = BinaryHeap::new();
        heap.push(WeightedFrontierEntry {
            path: TraversalPath { neurons: vec![start], synapses: vec![], total_weight: 0.0 },
            current: start,
        });

        while let Some(entry) = heap.pop() {
            let path = entry.path;
            let visited: HashSet<Uuid> = path.neurons.iter().copied().collect();
            if path.neurons.len() - 1 >= max_depth {
                terminals.push(path);
                continue;
            }
            let hops = self.next_hops(entry.current, &visited, predicate)?;
            if hops.is_empty() {
                terminals.push(path);
                continue;
            }
            for (synapse, next) in hops {
                let mut next_path = path.clone();
                next_path.neurons.push(next);
                next_path.synapses.push(synapse.id);
                next_path.total_weight += synapse.weight;
                heap.push(WeightedFrontierEntry { path: next_path, current: next });
            }
        }
        Ok(terminals)
    }

    fn traverse_random_walk(
        &self,
        start: Uuid,
        max_depth: usize,
        predicate: Option<&dyn Fn(&Synapse) -> bool>,
    ) -> Result<Vec<TraversalPath>, GraphError> {
        let mut rng = rand::thread_rng();
        let mut path = TraversalPath { neurons: vec![start], synapses: vec![], total_weight: 0.0 };
        let mut visited: HashSet<Uuid> = HashSet::new();
        visited.insert(start);
        let mut current = start;

        loop {
            if path.neurons.len() - 1 >= max_depth {
                break;
            }
            let hops = self.next_hops(current, &visited, predicate)?;
            if hops.is_empty() {
                break;
            }

            let total_weight: f32 = hops.iter().map(|(s, _)| s.weight.max(0.0)).sum();
            let pick = if total_weight > 0.0 {
                let mut roll = rng.gen_range(0.0..total_weight);
                hops.iter()
                    .find(|(s, _)| {
                        let w = s.weight.max(0.0);
                        if roll < w {
                            true
                        } else {
                            roll -= w;
                            false
                        }
                    })
                    .unwrap_or(&hops[0])
            } else {
                &hops[rng.gen_range(0..hops.len())]
            };

            let (synapse, next) = pick.clone();
            visited.insert(next);
            path.neurons.push(next);
            path.synapses.push(synapse.id);
            path.total_weight += synapse.weight;
            current = next;
        }
        Ok(vec![path])
    }

    fn next_hops(
        &self,
        current: Uuid,
        visited: &HashSet<Uuid>,
        predicate: Option<&dyn Fn(&Synapse) -> bool>,
    ) -> Result<Vec<(Synapse, Uuid)>, GraphError> {
        let hops = excitatory_hops(self, current)?;
        Ok(hops
            .into_iter()
            .filter(|(s, next)| !visited.contains(next) && predicate.map_or(true, |p| p(s)))
            .collect())
    }

    /// BFS shortest path from `src` to `tgt` by hop count. `None` if
    /// unreachable.
    pub fn find_path(&self, src: Uuid, tgt: Uuid) -> Result<Option<TraversalPath>, GraphError> {
        if src == tgt {
            return Ok(Some(TraversalPath { neurons: vec![src], synapses: vec![], total_weight: 0.0 }));
        }

        let mut queue = VecDeque::new();
        let mut visited = HashSet::new();
        visited.insert(src);
        queue.push_back(TraversalPath { neurons: vec![src], synapses: vec![], total_weight: 0.0 });

        while let Some(path) = queue.pop_front() {
            let current = *path.neurons.last().unwrap();
            for (synapse, next) in excitatory_hops(self, current)? {
                if visited.contains(&next) {
                    continue;
                }
                let mut next_path = path.clone();
                next_path.neurons.push(next);
                next_path.synapses.push(synapse.id);
                next_path.total_weight += synapse.weight;
                if next == tgt {
                    return Ok(Some(next_path));
                }
                visited.insert(next);
                queue.push_back(next_path);
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CreateNeuronInput;
    use crate::test_support::test_graph;
    use sg_types::Hash;

    fn unit(v: Vec<f32>) -> Vec<f32> {
        let n: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        v.iter().map(|x| x / n).collect()
    }

    fn isolated(v: Vec<f32>) -> CreateNeuronInput {
        let mut input = CreateNeuronInput::new(unit(v), vec![], Hash::ZERO);
        input.auto_connect = false;
        input
    }

    fn chain_graph() -> (NeuronGraph, Vec<Uuid>) {
        let mut graph = test_graph();
        let ids: Vec<Uuid> = (0..4)
            .map(|i| graph.create_neuron(isolated(vec![1.0, i as f32])).unwrap().id)
            .collect();
        for w in ids.windows(2) {
            graph.link(w[0], w[1], SynapseType::Semantic, 0.6, true).unwrap();
        }
        (graph, ids)
    }

    #[test]
    fn bfs_reaches_chain_end_within_depth() {
        let (graph, ids) = chain_graph();
        let paths = graph.traverse(ids[0], TraversalStrategy::Bfs, 3, None).unwrap();
        assert!(paths.iter().any(|p| p.neurons.last() == Some(&ids[3])));
    }

    #[test]
    fn dfs_reaches_chain_end_within_depth() {
        let (graph, ids) = chain_graph();
        let paths = graph.traverse(ids[0], TraversalStrategy::Dfs, 3, None).unwrap();
        assert!(paths.iter().any(|p| p.neurons.last() == Some(&ids[3])));
    }

    #[test]
    fn weighted_traversal_prefers_higher_weight_edges_first() {
        let (graph, ids) = chain_graph();
        let paths = graph.traverse(ids[0], TraversalStrategy::Weighted, 3, None).unwrap();
        assert!(!paths.is_empty());
    }

    #[test]
    fn random_walk_never_exceeds_max_depth() {
        let (graph, ids) = chain_graph();
        let paths = graph.traverse(ids[0], TraversalStrategy::RandomWalk, 2, None).unwrap();
        assert_eq!(paths.len(), 1);
        assert!(paths[0].neurons.len() <= 3);
    }

    #[test]
    fn inhibitory_links_are_never_followed() {
        let mut graph = test_graph();
        let a = graph.create_neuron(isolated(vec![1.0, 0.0])).unwrap();
        let b = graph.create_neuron(isolated(vec![0.0, 1.0])).unwrap();
        graph.link(a.id, b.id, SynapseType::Inhibitory, -0.2, false).unwrap();

        let paths = graph.traverse(a.id, TraversalStrategy::Bfs, 3, None).unwrap();
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].neurons, vec![a.id]);
    }

    #[test]
    fn find_path_returns_shortest_hop_count() {
        let (graph, ids) = chain_graph();
        let path = graph.find_path(ids[0], ids[3]).unwrap().unwrap();
        assert_eq!(path.neurons.len(), 4);
    }

    #[test]
    fn find_path_returns_none_when_unreachable() {
        let mut graph = test_graph();
        let a = graph.create_neuron(isolated(vec![1.0, 0.0])).unwrap();
        let b = graph.create_neuron(isolated(vec![0.0, 1.0])).unwrap();
        assert!(graph.find_path(a.id, b.id).unwrap().is_none());
    }
}
