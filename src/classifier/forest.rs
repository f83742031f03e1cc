use std::collections::{BTreeMap, BTreeSet};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use crate::classifier::tree::{DecisionTree, TreeParams};

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("training matrix is empty")]
    EmptyTrainingSet,

    #[error("got {labels} labels for {samples} samples")]
    LabelMismatch { samples: usize, labels: usize },

    #[error("feature vector has {actual} values, model expects {expected}")]
    FeatureDimension { expected: usize, actual: usize },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub seed: u64,
}

impl ForestParams {
    pub fn new() -> Self {
        ForestParams {
            n_trees: 100,
            max_depth: None,
            min_samples_split: 2,
            seed: 42,
        }
    }
}

impl Default for ForestParams {
    fn default() -> Self {
        ForestParams::new()
    }
}

/// An ensemble of bagged CART trees over labeled feature vectors.
///
/// Each tree is fit on a bootstrap resample of the training rows and
/// considers a random `sqrt(n_features)` feature subset at every split; the
/// forest prediction averages the per-tree leaf distributions. Fitting is
/// deterministic for a fixed seed, and prediction is deterministic always, so
/// a persisted forest keeps its exact predictive behavior after reload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RandomForestClassifier {
    trees: Vec<DecisionTree>,
    classes: Vec<String>,
    n_features: usize,
}

impl RandomForestClassifier {
    /// fit trains the forest on a feature matrix and its per-row labels.
    ///
    /// # Arguments
    /// * `x` - training matrix, one feature vector per row
    /// * `labels` - per-row label, same length as the matrix has rows
    /// * `params` - ensemble hyperparameters
    ///
    /// # Returns
    /// * `Result<RandomForestClassifier, ClassifierError>`
    pub fn fit(
        x: &Array2<f32>,
        labels: &[String],
        params: &ForestParams,
    ) -> Result<Self, ClassifierError> {
        if x.nrows() == 0 {
            return Err(ClassifierError::EmptyTrainingSet);
        }
        if x.nrows() != labels.len() {
            return Err(ClassifierError::LabelMismatch {
                samples: x.nrows(),
                labels: labels.len(),
            });
        }

        let classes: Vec<String> = labels
            .iter()
            .cloned()
            .collect::<BTreeSet<String>>()
            .into_iter()
            .collect();
        let class_index: BTreeMap<&str, usize> = classes
            .iter()
            .enumerate()
            .map(|(idx, class)| (class.as_str(), idx))
            .collect();
        let y: Vec<usize> = labels.iter().map(|label| class_index[label.as_str()]).collect();

        let tree_params = TreeParams {
            max_depth: params.max_depth,
            min_samples_split: params.min_samples_split,
            n_split_features: (x.ncols() as f64).sqrt().floor().max(1.0) as usize,
        };

        let n_rows = x.nrows();
        let mut rng = StdRng::seed_from_u64(params.seed);
        let mut trees = Vec::with_capacity(params.n_trees);
        for _ in 0..params.n_trees {
            let rows: Vec<usize> = (0..n_rows).map(|_| rng.gen_range(0..n_rows)).collect();
            trees.push(DecisionTree::fit(
                x,
                &y,
                &rows,
                classes.len(),
                &tree_params,
                &mut rng,
            ));
        }

        Ok(RandomForestClassifier {
            trees,
            classes,
            n_features: x.ncols(),
        })
    }

    /// predict_proba returns the per-class probability estimate for one
    /// feature vector, in `classes()` order. The values sum to 1.
    pub fn predict_proba(&self, features: &[f32]) -> Result<Vec<f32>, ClassifierError> {
        if features.len() != self.n_features {
            return Err(ClassifierError::FeatureDimension {
                expected: self.n_features,
                actual: features.len(),
            });
        }

        let mut probabilities = vec![0.0f32; self.classes.len()];
        for tree in &self.trees {
            for (slot, p) in probabilities.iter_mut().zip(tree.decide(features)) {
                *slot += p;
            }
        }
        let n_trees = self.trees.len() as f32;
        for slot in probabilities.iter_mut() {
            *slot /= n_trees;
        }
        Ok(probabilities)
    }

    /// predict_with_confidence returns the most probable class together with
    /// its probability.
    pub fn predict_with_confidence(&self, features: &[f32]) -> Result<(&str, f32), ClassifierError> {
        let probabilities = self.predict_proba(features)?;
        let mut best = 0;
        for idx in 1..probabilities.len() {
            if probabilities[idx] > probabilities[best] {
                best = idx;
            }
        }
        Ok((self.classes[best].as_str(), probabilities[best]))
    }

    /// predict returns the hard label for one feature vector.
    pub fn predict(&self, features: &[f32]) -> Result<&str, ClassifierError> {
        Ok(self.predict_with_confidence(features)?.0)
    }

    /// classes returns the label set seen at fit time, sorted.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use ndarray::Array2;
    use crate::classifier::forest::{ClassifierError, ForestParams, RandomForestClassifier};

    fn training_data() -> (Array2<f32>, Vec<String>) {
        // three classes, each clustered on a different feature
        let mut flat = Vec::new();
        let mut labels = Vec::new();
        for (class, hot_feature) in [("A", 0usize), ("B", 1), ("C", 2)] {
            for i in 0..12 {
                let mut row = vec![0.05 + 0.001 * i as f32; 4];
                row[hot_feature] = 0.9 - 0.002 * i as f32;
                flat.extend_from_slice(&row);
                labels.push(class.to_string());
            }
        }
        (Array2::from_shape_vec((36, 4), flat).unwrap(), labels)
    }

    fn small_params() -> ForestParams {
        ForestParams {
            n_trees: 25,
            seed: 7,
            ..ForestParams::new()
        }
    }

    #[test]
    fn test_fit_and_predict_separable_classes() {
        let (x, labels) = training_data();
        let forest = RandomForestClassifier::fit(&x, &labels, &small_params()).unwrap();

        assert_eq!(forest.classes(), ["A", "B", "C"]);
        assert_eq!(forest.predict(&[0.9, 0.05, 0.05, 0.05]).unwrap(), "A");
        assert_eq!(forest.predict(&[0.05, 0.9, 0.05, 0.05]).unwrap(), "B");
        assert_eq!(forest.predict(&[0.05, 0.05, 0.9, 0.05]).unwrap(), "C");

        let (label, confidence) = forest
            .predict_with_confidence(&[0.05, 0.05, 0.9, 0.05])
            .unwrap();
        assert_eq!(label, "C");
        assert!(confidence > 0.5 && confidence <= 1.0);
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let (x, labels) = training_data();
        let forest = RandomForestClassifier::fit(&x, &labels, &small_params()).unwrap();

        let probabilities = forest.predict_proba(&[0.3, 0.4, 0.2, 0.1]).unwrap();
        assert_eq!(probabilities.len(), 3);
        assert_relative_eq!(probabilities.iter().sum::<f32>(), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_fit_is_deterministic_for_fixed_seed() {
        let (x, labels) = training_data();
        let a = RandomForestClassifier::fit(&x, &labels, &small_params()).unwrap();
        let b = RandomForestClassifier::fit(&x, &labels, &small_params()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_serialized_forest_keeps_exact_predictions() {
        let (x, labels) = training_data();
        let forest = RandomForestClassifier::fit(&x, &labels, &small_params()).unwrap();

        let encoded = serde_json::to_string(&forest).unwrap();
        let reloaded: RandomForestClassifier = serde_json::from_str(&encoded).unwrap();
        assert_eq!(reloaded, forest);

        let probe = [0.4f32, 0.3, 0.2, 0.6];
        assert_eq!(
            forest.predict_proba(&probe).unwrap(),
            reloaded.predict_proba(&probe).unwrap()
        );
    }

    #[test]
    fn test_fit_rejects_bad_input() {
        let empty = Array2::<f32>::zeros((0, 4));
        assert!(matches!(
            RandomForestClassifier::fit(&empty, &[], &ForestParams::new()),
            Err(ClassifierError::EmptyTrainingSet)
        ));

        let (x, mut labels) = training_data();
        labels.pop();
        assert!(matches!(
            RandomForestClassifier::fit(&x, &labels, &ForestParams::new()),
            Err(ClassifierError::LabelMismatch { .. })
        ));
    }

    #[test]
    fn test_predict_rejects_wrong_dimension() {
        let (x, labels) = training_data();
        let forest = RandomForestClassifier::fit(&x, &labels, &small_params()).unwrap();
        assert!(matches!(
            forest.predict(&[0.1, 0.2]),
            Err(ClassifierError::FeatureDimension {
                expected: 4,
                actual: 2
            })
        ));
    }
}
