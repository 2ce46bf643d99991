//! `encodeEpisode(ids[], maxDist)`: link temporally co-occurring neurons.

use crate::service::{NeuronGraph, EVENT_SOURCE};
use sg_05_neuron_store::SynapseType;
use sg_bus::{EventPayload, GraphEvent};
use sg_types::GraphError;
use uuid::Uuid;

const DEFAULT_MAX_DISTANCE: usize = 2;
const STRENGTHEN_ETA: f32 = 0.05;

impl NeuronGraph {
    /// For every `i < j <= i + max_distance`, strengthen the existing
    /// `TEMPORAL` synapse between `ids[i]` and `ids[j]` (`w += 0.05(1-w)`)
    /// or create one with weight `0.3 / (j - i)`.
    ///
    /// Caps total synapses created per call at `ids.len() * max_distance`
    /// (the Open Question's resolved upper bound) and publishes
    /// `learning:progress` if the cap is hit mid-episode.
    pub fn encode_episode(&mut self, ids: &[Uuid], max_distance: usize) -> Result<u64, GraphError> {
        let max_distance = if max_distance == 0 { DEFAULT_MAX_DISTANCE } else { max_distance };
        let cap = ids.len().saturating_mul(max_distance) as u64;
        let mut created = 0u64;
        let mut touched = 0u64;

        'outer: for i in 0..ids.len() {
            for dist in 1..=max_distance {
                let j = i + dist;
                if j >= ids.len() {
                    break;
                }
                if touched >= cap {
                    self.bus.publish(GraphEvent::new(
                        EVENT_SOURCE,
                        self.time.now_millis(),
                        EventPayload::LearningProgress {
                            operation: "encodeEpisode".to_string(),
                            processed: touched,
                            total: Some(cap),
                        },
                    ));
                    break 'outer;
                }

                match self.temporal_between(ids[i], ids[j])? {
                    Some(synapse) => {
                        self.apply_synapse_update(synapse.id, |w| w + STRENGTHEN_ETA * (1.0 - w), 0.0, 1.0)?;
                    }
                    None => {
                        let weight = 0.3 / dist as f32;
                        self.link(ids[i], ids[j], SynapseType::Temporal, weight, true)?;
                        created += 1;
                    }
                }
                touched += 1;
            }
        }

        Ok(created)
    }

    fn temporal_between(&self, a: Uuid, b: Uuid) -> Result<Option<sg_05_neuron_store::Synapse>, GraphError> {
        for s in self.store.outgoing(&a)? {
            if s.target_id == b && s.synapse_type == SynapseType::Temporal {
                return Ok(Some(s));
            }
        }
        for s in self.store.incoming(&a)? {
            if s.source_id == b && s.synapse_type == SynapseType::Temporal {
                return Ok(Some(s));
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

    #[test]
    fn encode_episode_creates_temporal_synapses_within_distance() {
        let mut graph = test_graph();
        let ids: Vec<Uuid> = (0..4)
            .map(|i| graph.create_neuron(isolated(vec![1.0, i as f32 * 0.2])).unwrap().id)
            .collect();

        let created = graph.encode_episode(&ids, 2).unwrap();
        assert!(created > 0);
        assert!(created <= (ids.len() * 2) as u64);

        let direct = graph
            .store
            .outgoing(&ids[0])
            .unwrap()
            .into_iter()
            .find(|s| s.target_id == ids[1] && s.synapse_type == SynapseType::Temporal)
            .unwrap();
        assert!((direct.weight - 0.3).abs() < 1e-6);

        let skip_one = graph
            .store
            .outgoing(&ids[0])
            .unwrap()
            .into_iter()
            .find(|s| s.target_id == ids[2] && s.synapse_type == SynapseType::Temporal)
            .unwrap();
        assert!((skip_one.weight - 0.15).abs() < 1e-6);
    }

    #[test]
    fn encode_episode_strengthens_existing_temporal_synapse() {
        let mut graph = test_graph();
        let ids: Vec<Uuid> = (0..2)
            .map(|i| graph.create_neuron(isolated(vec![1.0, i as f32 * 0.2])).unwrap().id)
            .collect();

        graph.encode_episode(&ids, 1).unwrap();
        let before = graph
            .store
            .outgoing(&ids[0])
            .unwrap()
            .into_iter()
            .find(|s| s.target_id == ids[1])
            .unwrap()
            .weight;

        graph.encode_episode(&ids, 1).unwrap();
        let after = graph
            .store
            .outgoing(&ids[0])
            .unwrap()
            .into_iter()
            .find(|s| s.target_id == ids[1])
            .unwrap()
            .weight;

        assert!(after > before);
    }
}
