//! The soft-bounded Hebbian learning rules from spec.md §4.F.

use crate::domain::{PruneOptions, PruneReport};
use crate::service::{NeuronGraph, EVENT_SOURCE};
use sg_05_neuron_store::{Synapse, SynapseMetadata, SynapseType};
use sg_bus::{EventPayload, GraphEvent};
use sg_types::GraphError;
use uuid::Uuid;

const INHIBIT_INITIAL_WEIGHT: f32 = -0.05;
const STRENGTHEN_DELTA: f32 = 0.1;
const WEAKEN_DELTA: f32 = 0.1;

impl NeuronGraph {
    /// For every co-retrieved pair in `ids`, reinforce every excitatory
    /// synapse between them (in whichever direction it is stored):
    /// `w <- w + eta(1 - w)`, clamped to 1.
    pub fn reinforce_co_activation(&mut self, ids: &[Uuid], eta: f32) -> Result<u64, GraphError> {
        let mut updated = 0u64;
        for i in 0..ids.len() {
            for j in (i + 1)..ids.len() {
                updated += self.reinforce_pair(ids[i], ids[j], eta)?;
            }
        }
        Ok(updated)
    }

    fn reinforce_pair(&mut self, a: Uuid, b: Uuid, eta: f32) -> Result<u64, GraphError> {
        let mut updated = 0u64;
        for synapse in self.excitatory_between(a, b)? {
            self.apply_synapse_update(synapse.id, |w| w + eta * (1.0 - w), 0.0, 1.0)?;
            updated += 1;
        }
        Ok(updated)
    }

    /// Every excitatory synapse directly linking `a` and `b`, in either
    /// stored direction.
    fn excitatory_between(&self, a: Uuid, b: Uuid) -> Result<Vec<Synapse>, GraphError> {
        let mut found = Vec::new();
        for s in self.store.outgoing(&a)? {
            if s.target_id == b && s.synapse_type.is_excitatory() {
                found.push(s);
            }
        }
        for s in self.store.incoming(&a)? {
            if s.source_id == b && s.synapse_type.is_excitatory() {
                found.push(s);
            }
        }
        Ok(found)
    }

    /// Rank-weighted inhibition: the top 3 winners in `ranked_ids` each
    /// inhibit every lower-ranked loser. `w <- w - eta(1 - |w|)`, floored at
    /// -1. If no synapse links a (winner, loser) pair, an `INHIBITORY`
    /// synapse is created with initial weight -0.05.
    ///
    /// Creates at most `3 * (k - 1)` synapses where `k = ranked_ids.len()`,
    /// per spec.md §8.
    pub fn inhibit_co_activation(&mut self, ranked_ids: &[Uuid], eta: f32) -> Result<u64, GraphError> {
        let winners = ranked_ids.iter().take(3).copied().collect::<Vec<_>>();
        let mut updated = 0u64;

        for (rank, &winner) in winners.iter().enumerate() {
            for &loser in &ranked_ids[rank + 1..] {
                if winner == loser {
                    continue;
                }
                match self.inhibitory_between(winner, loser)? {
                    Some(synapse) => {
                        self.apply_synapse_update(synapse.id, |w| w - eta * (1.0 - w.abs()), -1.0, 0.0)?;
                    }
                    None => {
                        self.link(winner, loser, SynapseType::Inhibitory, INHIBIT_INITIAL_WEIGHT, false)?;
                    }
                }
                updated += 1;
            }
        }
        Ok(updated)
    }

    fn inhibitory_between(&self, a: Uuid, b: Uuid) -> Result<Option<Synapse>, GraphError> {
        for s in self.store.outgoing(&a)? {
            if s.target_id == b && s.synapse_type == SynapseType::Inhibitory {
                return Ok(Some(s));
            }
        }
        for s in self.store.incoming(&a)? {
            if s.source_id == b && s.synapse_type == SynapseType::Inhibitory {
                return Ok(Some(s));
            }
        }
        Ok(None)
    }

    /// `w <- min(1, w + delta)`. Applies to any synapse type, per
    /// spec.md §4.F's generic `strengthenSynapse`.
    pub fn strengthen_synapse(&mut self, id: Uuid) -> Result<(), GraphError> {
        self.apply_synapse_update(id, |w| w + STRENGTHEN_DELTA, f32::MIN, 1.0)
    }

    /// `w <- max(0, w - delta)`. Applies to any synapse type, per
    /// spec.md §4.F's generic `weakenSynapse`.
    pub fn weaken_synapse(&mut self, id: Uuid) -> Result<(), GraphError> {
        self.apply_synapse_update(id, |w| w - WEAKEN_DELTA, 0.0, f32::MAX)
    }

    /// Apply `f` to the synapse's weight, clamp to `[floor, ceiling]`, bump
    /// `updated_at`/`activation_count`/`last_activated`, and persist. `null`
    /// sentinel: silently returns `Ok(())` if the synapse doesn't exist
    /// (mutation operations are idempotent per spec.md §4.F failure
    /// semantics).
    pub(crate) fn apply_synapse_update(
        &mut self,
        id: Uuid,
        f: impl Fn(f32) -> f32,
        floor: f32,
        ceiling: f32,
    ) -> Result<(), GraphError> {
        let Some(mut synapse) = self.store.get_synapse(&id)? else {
            return Ok(());
        };
        synapse.weight = f(synapse.weight).clamp(floor, ceiling);

        let now = self.time.now_millis();
        synapse.metadata = SynapseMetadata {
            updated_at: now,
            activation_count: synapse.metadata.activation_count + 1,
            last_activated: Some(now),
            ..synapse.metadata
        };
        self.store.put_synapse(&synapse)
    }

    /// Delete every synapse whose `|weight| < min_weight` and whose
    /// `activation_count < min_activations`. `dry_run` reports what would
    /// be removed without mutating the store.
    pub fn prune_synapses(&mut self, all_ids: &[Uuid], options: PruneOptions) -> Result<PruneReport, GraphError> {
        let mut removed = Vec::new();
        let mut seen = std::collections::HashSet::new();

        for &neuron_id in all_ids {
            for s in self.store.outgoing(&neuron_id)?.into_iter().chain(self.store.incoming(&neuron_id)?) {
                if !seen.insert(s.id) {
                    continue;
                }
                if s.weight.abs() < options.min_weight && s.metadata.activation_count < options.min_activations {
                    removed.push(s.id);
                }
            }
        }

        if !options.dry_run {
            for &id in &removed {
                self.store.delete_synapse(&id)?;
            }
            if !removed.is_empty() {
                self.bus.publish(GraphEvent::new(
                    EVENT_SOURCE,
                    self.time.now_millis(),
                    EventPayload::LearningComplete {
                        operation: "pruneSynapses".to_string(),
                        affected: removed.len() as u64,
                    },
                ));
            }
        }

        Ok(PruneReport { removed, dry_run: options.dry_run })
    }
}
