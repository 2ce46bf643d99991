//! `patternComplete(q, k, iters, alpha)`: iteratively pull a query vector
//! toward the score-weighted centroid of its above-mean top-k neighbors.

use crate::service::NeuronGraph;
use sg_01_hasher::{cosine_similarity, l2_normalize, magnitude, Embedding};
use sg_compute::tasks::top_k::par_top_k;
use sg_types::GraphError;

const CONVERGENCE_THRESHOLD: f32 = 1e-4;

impl NeuronGraph {
    /// Pull `q` toward the score-weighted centroid of its above-mean top-`k`
    /// nearest neighbors, re-normalizing each iteration, for up to `iters`
    /// rounds or until the step size `delta < 1e-4`. Returns an
    /// L2-normalized vector.
    pub fn pattern_complete(&mut self, q: &Embedding, k: usize, iters: usize, alpha: f32) -> Result<Embedding, GraphError> {
        let mut current = q.clone();
        l2_normalize(&mut current)?;

        for _ in 0..iters {
            let neighbors = self.index.search(&current, k, None);
            if neighbors.is_empty() {
                break;
            }

            let mean_score: f32 = neighbors.iter().map(|(_, s)| *s).sum::<f32>() / neighbors.len() as f32;
            let above_mean: Vec<(uuid::Uuid, f32)> =
                neighbors.into_iter().filter(|(_, s)| *s > mean_score).collect();
            if above_mean.is_empty() {
                break;
            }

            let embeddings: Vec<(uuid::Uuid, f32)> = par_top_k(above_mean, k, |(_, s)| *s);
            let mut centroid = vec![0.0_f32; current.len()];
            let mut weight_sum = 0.0_f32;
            for (id, score) in &embeddings {
                let Some(neuron) = self.store.get_neuron(id)? else { continue };
                for (c, v) in centroid.iter_mut().zip(neuron.embedding.iter()) {
                    *c += score * v;
                }
                weight_sum += score;
            }
            if weight_sum == 0.0 {
                break;
            }
            for c in centroid.iter_mut() {
                *c /= weight_sum;
            }

            let mut next = vec![0.0_f32; current.len()];
            for i in 0..current.len() {
                next[i] = (1.0 - alpha) * current[i] + alpha * centroid[i];
            }
            let mag = magnitude(&next);
            if mag == 0.0 {
                break;
            }
            for v in next.iter_mut() {
                *v /= mag;
            }

            let delta = 1.0 - cosine_similarity(&current, &next);
            current = next;
            if delta.abs() < CONVERGENCE_THRESHOLD {
                break;
            }
        }

        Ok(current)
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
    fn result_is_l2_normalized() {
        let mut graph = test_graph();
        for i in 0..6 {
            let angle = i as f32 * 0.1;
            graph.create_neuron(isolated(vec![angle.cos(), angle.sin()])).unwrap();
        }
        let q = unit(vec![1.0, 0.0]);
        let result = graph.pattern_complete(&q, 3, 20, 0.3).unwrap();
        assert!((magnitude(&result) - 1.0).abs() < 1e-4);
    }

    #[test]
    fn converges_to_fixed_point_under_further_iteration() {
        let mut graph = test_graph();
        for i in 0..6 {
            let angle = i as f32 * 0.1;
            graph.create_neuron(isolated(vec![angle.cos(), angle.sin()])).unwrap();
        }
        let q = unit(vec![1.0, 0.0]);
        let once = graph.pattern_complete(&q, 3, 50, 0.3).unwrap();
        let again = graph.pattern_complete(&once, 3, 50, 0.3).unwrap();
        assert!(cosine_similarity(&once, &again) > 1.0 - 1e-2);
    }
}
