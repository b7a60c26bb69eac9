//! Ensemble candidates and best-candidate selection.
//!
//! Candidates are every single roster member, then every pair, then every
//! triple, in roster order. An ensemble predicts the arithmetic mean of its
//! members.

use std::fmt;

use coin_forecast_core::ModelKind;

/// Largest ensemble that is scored.
pub const MAX_ENSEMBLE_SIZE: usize = 3;

/// A scored combination of roster members.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub components: Vec<ModelKind>,
    pub mae: f64,
}

impl Candidate {
    /// Name of the combination, e.g. `random_forest+moving_average`.
    #[must_use]
    pub fn strategy(&self) -> String {
        strategy_name(&self.components)
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (mae {:.8})", self.strategy(), self.mae)
    }
}

#[must_use]
pub fn strategy_name(components: &[ModelKind]) -> String {
    components
        .iter()
        .map(ModelKind::as_str)
        .collect::<Vec<_>>()
        .join("+")
}

/// Index combinations of a roster of `n` members: singles, pairs, triples.
#[must_use]
pub fn enumerate_ensembles(n: usize) -> Vec<Vec<usize>> {
    let mut out = Vec::new();
    for size in 1..=MAX_ENSEMBLE_SIZE.min(n) {
        let mut current = Vec::with_capacity(size);
        push_combinations(n, size, 0, &mut current, &mut out);
    }
    out
}

fn push_combinations(
    n: usize,
    size: usize,
    start: usize,
    current: &mut Vec<usize>,
    out: &mut Vec<Vec<usize>>,
) {
    if current.len() == size {
        out.push(current.clone());
        return;
    }
    for i in start..n {
        current.push(i);
        push_combinations(n, size, i + 1, current, out);
        current.pop();
    }
}

/// Mean of member predictions, summed in member order.
#[must_use]
pub fn combine(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Row-wise mean of several prediction vectors.
#[must_use]
pub fn combine_predictions(members: &[&[f64]]) -> Vec<f64> {
    let n = members.iter().map(|m| m.len()).min().unwrap_or(0);
    let mut row = Vec::with_capacity(members.len());
    (0..n)
        .map(|i| {
            row.clear();
            row.extend(members.iter().map(|m| m[i]));
            combine(&row)
        })
        .collect()
}

/// Lowest finite MAE; the earliest candidate wins ties.
#[must_use]
pub fn select_best(candidates: &[Candidate]) -> Option<&Candidate> {
    let mut best: Option<&Candidate> = None;
    for candidate in candidates {
        if !candidate.mae.is_finite() {
            continue;
        }
        if best.map_or(true, |b| candidate.mae < b.mae) {
            best = Some(candidate);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(components: &[ModelKind], mae: f64) -> Candidate {
        Candidate {
            components: components.to_vec(),
            mae,
        }
    }

    #[test]
    fn test_enumeration_order() {
        let combos = enumerate_ensembles(4);
        assert_eq!(combos.len(), 4 + 6 + 4);
        assert_eq!(combos[0], vec![0]);
        assert_eq!(combos[3], vec![3]);
        assert_eq!(combos[4], vec![0, 1]);
        assert_eq!(combos[9], vec![2, 3]);
        assert_eq!(combos[10], vec![0, 1, 2]);
        assert_eq!(combos[13], vec![1, 2, 3]);
    }

    #[test]
    fn test_enumeration_small_roster() {
        assert_eq!(enumerate_ensembles(2), vec![vec![0], vec![1], vec![0, 1]]);
        assert!(enumerate_ensembles(0).is_empty());
    }

    #[test]
    fn test_select_lowest_mae() {
        let candidates = vec![
            candidate(&[ModelKind::RandomForest], 3.0),
            candidate(&[ModelKind::Linear], 1.5),
            candidate(&[ModelKind::RandomForest, ModelKind::Linear], 2.0),
        ];
        let best = select_best(&candidates).unwrap();
        assert_eq!(best.components, vec![ModelKind::Linear]);
    }

    #[test]
    fn test_ties_go_to_first_seen() {
        let candidates = vec![
            candidate(&[ModelKind::MovingAverage], 1.0),
            candidate(&[ModelKind::Linear, ModelKind::MovingAverage], 1.0),
        ];
        let best = select_best(&candidates).unwrap();
        assert_eq!(best.strategy(), "moving_average");
    }

    #[test]
    fn test_non_finite_never_wins() {
        let candidates = vec![
            candidate(&[ModelKind::Linear], f64::NAN),
            candidate(&[ModelKind::RandomForest], 9.0),
        ];
        assert_eq!(select_best(&candidates).unwrap().mae, 9.0);
        assert!(select_best(&[candidate(&[ModelKind::Linear], f64::INFINITY)]).is_none());
    }

    #[test]
    fn test_combine_predictions_is_mean() {
        let a = [1.0, 2.0];
        let b = [3.0, 6.0];
        assert_eq!(combine_predictions(&[&a, &b]), vec![2.0, 4.0]);
        assert_eq!(combine_predictions(&[&a]), vec![1.0, 2.0]);
    }

    #[test]
    fn test_strategy_name() {
        let c = candidate(&[ModelKind::RandomForest, ModelKind::GradientBoosting], 0.0);
        assert_eq!(c.strategy(), "random_forest+gradient_boosting");
    }
}
