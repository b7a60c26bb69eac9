//! Training datasets and train/test splits.

use coin_forecast_core::TestSplitConfig;
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::error::ModelError;

/// Feature matrix with its targets, rows in time order.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub feature_names: Vec<String>,
    /// Shape `(n_samples, n_features)`
    pub features: Array2<f32>,
    pub targets: Array1<f32>,
    pub times: Vec<i64>,
}

impl Dataset {
    /// # Errors
    /// Returns `ModelError::DimensionMismatch` if the parts disagree in length.
    pub fn new(
        feature_names: Vec<String>,
        features: Array2<f32>,
        targets: Array1<f32>,
        times: Vec<i64>,
    ) -> Result<Self, ModelError> {
        if features.ncols() != feature_names.len() {
            return Err(ModelError::DimensionMismatch {
                expected: feature_names.len(),
                got: features.ncols(),
            });
        }
        if targets.len() != features.nrows() || times.len() != features.nrows() {
            return Err(ModelError::DimensionMismatch {
                expected: features.nrows(),
                got: targets.len().min(times.len()),
            });
        }
        Ok(Self {
            feature_names,
            features,
            targets,
            times,
        })
    }

    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.features.nrows()
    }

    #[must_use]
    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.n_samples() == 0
    }

    #[must_use]
    pub fn row(&self, index: usize) -> ArrayView1<'_, f32> {
        self.features.row(index)
    }

    /// Targets widened to `f64` for scoring.
    #[must_use]
    pub fn targets_f64(&self) -> Vec<f64> {
        self.targets.iter().map(|&y| f64::from(y)).collect()
    }

    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.feature_names.iter().position(|n| n == name)
    }

    /// Rows at `indices`, in the given order.
    #[must_use]
    pub fn subset(&self, indices: &[usize]) -> Self {
        Self {
            feature_names: self.feature_names.clone(),
            features: self.features.select(Axis(0), indices),
            targets: self.targets.select(Axis(0), indices),
            times: indices.iter().map(|&i| self.times[i]).collect(),
        }
    }
}

/// Train and test partitions of a dataset, both in time order.
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub train: Dataset,
    pub test: Dataset,
}

impl TrainTestSplit {
    /// Splits `dataset` according to the configured policy.
    ///
    /// # Errors
    /// Returns `ModelError::InvalidSplit` if either partition would be empty.
    pub fn from_config(dataset: &Dataset, policy: &TestSplitConfig) -> Result<Self, ModelError> {
        let n = dataset.n_samples();
        let test_indices = test_indices(n, policy)?;

        let mut is_test = vec![false; n];
        for &i in &test_indices {
            is_test[i] = true;
        }
        let train_indices: Vec<usize> = (0..n).filter(|&i| !is_test[i]).collect();

        if train_indices.is_empty() || test_indices.is_empty() {
            return Err(ModelError::InvalidSplit(format!(
                "{} rows leave {} train and {} test rows",
                n,
                train_indices.len(),
                test_indices.len()
            )));
        }

        Ok(Self {
            train: dataset.subset(&train_indices),
            test: dataset.subset(&test_indices),
        })
    }
}

/// Sorted row indices of the test partition.
fn test_indices(n: usize, policy: &TestSplitConfig) -> Result<Vec<usize>, ModelError> {
    match *policy {
        TestSplitConfig::Tail { rows } => {
            if rows >= n {
                return Err(ModelError::InvalidSplit(format!(
                    "test tail of {rows} rows needs more than {n} rows"
                )));
            }
            Ok((n - rows..n).collect())
        }
        TestSplitConfig::TailPlusSample { tail, sample, seed } => {
            if tail >= n {
                return Err(ModelError::InvalidSplit(format!(
                    "test tail of {tail} rows needs more than {n} rows"
                )));
            }
            let head = n - tail;
            if sample >= head {
                return Err(ModelError::InvalidSplit(format!(
                    "sampling {sample} of {head} earlier rows leaves no train rows"
                )));
            }

            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut indices = rand::seq::index::sample(&mut rng, head, sample).into_vec();
            indices.sort_unstable();
            indices.extend(head..n);
            Ok(indices)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset(n: usize) -> Dataset {
        let features = Array2::from_shape_fn((n, 2), |(i, j)| (i * 10 + j) as f32);
        let targets = Array1::from_iter((0..n).map(|i| i as f32));
        let times = (0..n as i64).map(|i| i * 300).collect();
        Dataset::new(vec!["a".into(), "b".into()], features, targets, times).unwrap()
    }

    #[test]
    fn test_dimension_mismatch() {
        let err = Dataset::new(
            vec!["a".into()],
            Array2::zeros((3, 2)),
            Array1::zeros(3),
            vec![0, 1, 2],
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::DimensionMismatch { expected: 1, got: 2 }));
    }

    #[test]
    fn test_subset_keeps_rows_and_times() {
        let data = dataset(5);
        let sub = data.subset(&[1, 3]);
        assert_eq!(sub.n_samples(), 2);
        assert_eq!(sub.row(1).to_vec(), vec![30.0, 31.0]);
        assert_eq!(sub.times, vec![300, 900]);
        assert_eq!(sub.column_index("b"), Some(1));
    }

    #[test]
    fn test_tail_split() {
        let data = dataset(10);
        let split = TrainTestSplit::from_config(&data, &TestSplitConfig::Tail { rows: 3 }).unwrap();

        assert_eq!(split.train.n_samples(), 7);
        assert_eq!(split.test.n_samples(), 3);
        assert_eq!(split.test.times, vec![2100, 2400, 2700]);
    }

    #[test]
    fn test_tail_split_needs_train_rows() {
        let data = dataset(3);
        let err = TrainTestSplit::from_config(&data, &TestSplitConfig::Tail { rows: 3 }).unwrap_err();
        assert!(matches!(err, ModelError::InvalidSplit(_)));

        let err = TrainTestSplit::from_config(&data, &TestSplitConfig::Tail { rows: 0 }).unwrap_err();
        assert!(matches!(err, ModelError::InvalidSplit(_)));
    }

    #[test]
    fn test_tail_plus_sample_is_seeded_and_disjoint() {
        let data = dataset(100);
        let policy = TestSplitConfig::TailPlusSample {
            tail: 10,
            sample: 15,
            seed: 7,
        };

        let a = TrainTestSplit::from_config(&data, &policy).unwrap();
        let b = TrainTestSplit::from_config(&data, &policy).unwrap();

        assert_eq!(a.test.times, b.test.times);
        assert_eq!(a.test.n_samples(), 25);
        assert_eq!(a.train.n_samples(), 75);
        assert!(a.test.times.windows(2).all(|w| w[0] < w[1]));
        assert!(a.train.times.windows(2).all(|w| w[0] < w[1]));
        assert!(a.train.times.iter().all(|t| !a.test.times.contains(t)));
        // the tail is always in the test split
        assert!(a.test.times.ends_with(&data.times[90..]));
    }
}
