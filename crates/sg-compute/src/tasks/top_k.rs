//! Parallel top-k selection over scored candidates.
//!
//! Used by the HNSW index's brute-force fallback (exhaustive scan of a
//! tiny or fully-tombstoned layer) and by the query pipeline's result
//! re-ranking pass.

use rayon::prelude::*;
use std::cmp::Ordering;

/// Score one candidate against a query, in parallel, then return the
/// top `k` by descending score. Ties broken by the candidate's original
/// index, lowest first, for deterministic output.
pub fn par_top_k<T, F>(candidates: Vec<T>, k: usize, score: F) -> Vec<(T, f32)>
where
    T: Send,
    F: Fn(&T) -> f32 + Sync,
{
    let mut scored: Vec<(usize, T, f32)> = candidates
        .into_par_iter()
        .enumerate()
        .map(|(idx, item)| {
            let s = score(&item);
            (idx, item, s)
        })
        .collect();

    scored.sort_by(|a, b| match b.2.partial_cmp(&a.2).unwrap_or(Ordering::Equal) {
        Ordering::Equal => a.0.cmp(&b.0),
        other => other,
    });
    scored.truncate(k);
    scored.into_iter().map(|(_, item, s)| (item, s)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_highest_scoring_k_in_order() {
        let candidates = vec!["a", "b", "c", "d"];
        let scores = [0.1_f32, 0.9, 0.5, 0.9];
        let result = par_top_k(candidates, 2, |c| {
            let idx = match *c {
                "a" => 0,
                "b" => 1,
                "c" => 2,
                _ => 3,
            };
            scores[idx]
        });
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].0, "b");
        assert_eq!(result[1].0, "d");
    }

    #[test]
    fn k_larger_than_input_returns_everything() {
        let candidates = vec![1, 2, 3];
        let result = par_top_k(candidates, 10, |c| *c as f32);
        assert_eq!(result.len(), 3);
    }
}
