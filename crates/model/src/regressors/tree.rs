//! Regression tree shared by the forest and the boosting ensemble.
//!
//! Splits minimise the squared error of the children. Candidate thresholds
//! are found by sorting the node's rows on each tried feature and sweeping
//! running sums, so a node costs `O(m log m)` per feature.

use std::cmp::Ordering;

use ndarray::{Array2, ArrayView1};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Growth limits of a single tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    /// Features tried per split (all when `None`)
    pub max_features: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TreeNode {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f32,
        left: usize,
        right: usize,
    },
}

/// A fitted tree; node 0 is the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<TreeNode>,
}

struct BestSplit {
    feature: usize,
    threshold: f32,
    score: f64,
}

impl RegressionTree {
    /// Fits a tree on the rows `rows` of `x` against `y` (indexed like `x`).
    pub fn fit<R: Rng>(
        x: &Array2<f32>,
        y: &[f64],
        rows: Vec<usize>,
        params: &TreeParams,
        rng: &mut R,
    ) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.grow(x, y, rows, 0, params, rng);
        tree
    }

    #[must_use]
    pub fn predict_row(&self, row: ArrayView1<'_, f32>) -> f64 {
        let mut index = 0;
        loop {
            match self.nodes.get(index) {
                Some(TreeNode::Leaf { value }) => return *value,
                Some(TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    index = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
                None => return 0.0,
            }
        }
    }

    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, TreeNode::Leaf { .. }))
            .count()
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth_from(0)
    }

    fn depth_from(&self, index: usize) -> usize {
        match self.nodes.get(index) {
            Some(TreeNode::Split { left, right, .. }) => {
                1 + self.depth_from(*left).max(self.depth_from(*right))
            }
            _ => 0,
        }
    }

    /// Appends the subtree for `rows` and returns its node index.
    fn grow<R: Rng>(
        &mut self,
        x: &Array2<f32>,
        y: &[f64],
        rows: Vec<usize>,
        depth: usize,
        params: &TreeParams,
        rng: &mut R,
    ) -> usize {
        let index = self.nodes.len();
        let m = rows.len();
        let sum: f64 = rows.iter().map(|&r| y[r]).sum();
        let mean = if m == 0 { 0.0 } else { sum / m as f64 };
        self.nodes.push(TreeNode::Leaf { value: mean });

        let min_leaf = params.min_samples_leaf.max(1);
        if depth >= params.max_depth || m < 2 * min_leaf {
            return index;
        }

        let Some(best) = best_split(x, y, &rows, sum, min_leaf, params.max_features, rng) else {
            return index;
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .into_iter()
            .partition(|&r| x[[r, best.feature]] <= best.threshold);
        if left_rows.is_empty() || right_rows.is_empty() {
            return index;
        }

        let left = self.grow(x, y, left_rows, depth + 1, params, rng);
        let right = self.grow(x, y, right_rows, depth + 1, params, rng);
        self.nodes[index] = TreeNode::Split {
            feature: best.feature,
            threshold: best.threshold,
            left,
            right,
        };
        index
    }
}

fn best_split<R: Rng>(
    x: &Array2<f32>,
    y: &[f64],
    rows: &[usize],
    total: f64,
    min_leaf: usize,
    max_features: Option<usize>,
    rng: &mut R,
) -> Option<BestSplit> {
    let n_features = x.ncols();
    let tried = max_features.unwrap_or(n_features).clamp(1, n_features.max(1));
    let features: Vec<usize> = if tried >= n_features {
        (0..n_features).collect()
    } else {
        rand::seq::index::sample(rng, n_features, tried).into_vec()
    };

    let m = rows.len();
    // maximising sum_l^2/n_l + sum_r^2/n_r minimises the children's squared error
    let parent_score = total * total / m as f64;
    let mut best: Option<BestSplit> = None;
    let mut pairs: Vec<(f32, f64)> = Vec::with_capacity(m);

    for feature in features {
        pairs.clear();
        pairs.extend(rows.iter().map(|&r| (x[[r, feature]], y[r])));
        pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

        let mut left_sum = 0.0;
        for i in 1..m {
            left_sum += pairs[i - 1].1;
            if i < min_leaf || m - i < min_leaf {
                continue;
            }
            let (lo, hi) = (pairs[i - 1].0, pairs[i].0);
            if lo >= hi {
                continue;
            }

            let right_sum = total - left_sum;
            let score = left_sum * left_sum / i as f64 + right_sum * right_sum / (m - i) as f64;
            let improves = score > parent_score + 1e-12 * parent_score.abs().max(1.0);
            if improves && best.as_ref().map_or(true, |b| score > b.score) {
                best = Some(BestSplit {
                    feature,
                    threshold: midpoint(lo, hi),
                    score,
                });
            }
        }
    }

    best
}

/// A threshold `t` with `lo <= t < hi`.
fn midpoint(lo: f32, hi: f32) -> f32 {
    let mid = lo + (hi - lo) / 2.0;
    if mid >= hi || !mid.is_finite() {
        lo
    } else {
        mid
    }
}
