use std::collections::BTreeMap;
use log::{debug, info};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use crate::classifier::forest::{ClassifierError, ForestParams, RandomForestClassifier};
use crate::config::config::TrainerConfig;
use crate::dataset::dataset::Dataset;
use crate::features::features::FEATURE_LENGTH;
use crate::trainer::model::ModelArtifact;

#[derive(Error, Debug)]
pub enum TrainingError {
    #[error("trainer - dataset is empty")]
    EmptyDataset,

    #[error("trainer - test fraction {0} must be strictly between 0 and 1")]
    InvalidTestFraction(f32),

    #[error("trainer - label {label:?} has only {count} sample(s), need at least 2 to stratify")]
    TooFewSamples { label: String, count: usize },

    #[error("trainer - sample {index} has {actual} features, expected {expected}")]
    FeatureDimension {
        index: usize,
        actual: usize,
        expected: usize,
    },

    #[error("trainer - failed to assemble feature matrix: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error(transparent)]
    Classifier(#[from] ClassifierError),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LabelMetrics {
    pub precision: f32,
    pub recall: f32,
    pub f1: f32,
    pub support: usize,
}

/// Held-out evaluation of a training run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrainingReport {
    pub accuracy: f32,
    pub per_label: BTreeMap<String, LabelMetrics>,
    pub per_user_accuracy: BTreeMap<String, f32>,
    pub train_samples: usize,
    pub test_samples: usize,
}

impl TrainingReport {
    /// render formats the per-label metrics as a plain-text report table.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "{:>12}  {:>9}  {:>6}  {:>8}  {:>7}\n\n",
            "", "precision", "recall", "f1-score", "support"
        ));
        for (label, metrics) in &self.per_label {
            out.push_str(&format!(
                "{:>12}  {:>9.2}  {:>6.2}  {:>8.2}  {:>7}\n",
                label, metrics.precision, metrics.recall, metrics.f1, metrics.support
            ));
        }
        out.push_str(&format!(
            "\n{:>12}  {:>9}  {:>6}  {:>8.2}  {:>7}\n",
            "accuracy", "", "", self.accuracy, self.test_samples
        ));
        out
    }
}

/// Trainer fits the ensemble classifier on a labeled dataset and evaluates it
/// on a stratified holdout partition.
pub struct Trainer {
    config: TrainerConfig,
}

impl Trainer {
    /// new initializes a trainer from its configuration.
    pub fn new(config: TrainerConfig) -> Self {
        Trainer { config }
    }

    /// train splits the dataset (stratified by label, shuffled), fits the
    /// forest on the training partition, and evaluates it on the holdout.
    ///
    /// # Arguments
    /// * `dataset` - the labeled dataset to fit on
    ///
    /// # Returns
    /// * `Result<(ModelArtifact, TrainingReport), TrainingError>`
    pub fn train(&self, dataset: &Dataset) -> Result<(ModelArtifact, TrainingReport), TrainingError> {
        if dataset.is_empty() {
            return Err(TrainingError::EmptyDataset);
        }
        let fraction = self.config.test_fraction;
        if !(fraction > 0.0 && fraction < 1.0) {
            return Err(TrainingError::InvalidTestFraction(fraction));
        }

        let summary = dataset.summary();
        info!(
            "training on {} samples, {} users, {} labels",
            summary.total_samples, summary.unique_users, summary.unique_labels
        );
        for (label, count) in dataset.label_counts() {
            debug!("label {}: {} samples", label, count);
        }

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let (train_rows, test_rows) = stratified_split(dataset.labels(), fraction, &mut rng)?;
        info!(
            "training samples: {}, testing samples: {}",
            train_rows.len(),
            test_rows.len()
        );

        let x_train = feature_matrix(dataset, &train_rows)?;
        let y_train: Vec<String> = train_rows
            .iter()
            .map(|&row| dataset.labels()[row].clone())
            .collect();

        let params = ForestParams {
            n_trees: self.config.n_trees,
            max_depth: self.config.max_depth,
            min_samples_split: self.config.min_samples_split,
            seed: self.config.seed,
        };
        let model = RandomForestClassifier::fit(&x_train, &y_train, &params)?;

        let mut predictions = Vec::with_capacity(test_rows.len());
        for &row in &test_rows {
            let label = model.predict(dataset.features()[row].as_slice())?;
            predictions.push(label.to_string());
        }

        let report = build_report(dataset, &test_rows, &predictions, model.classes(), train_rows.len());
        Ok((ModelArtifact::new(model), report))
    }
}

/// stratified_split shuffles each label's rows and carves out the holdout so
/// every label lands in both partitions. Labels with fewer than two samples
/// cannot be stratified and fail the split.
pub(crate) fn stratified_split(
    labels: &[String],
    test_fraction: f32,
    rng: &mut StdRng,
) -> Result<(Vec<usize>, Vec<usize>), TrainingError> {
    let mut groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (idx, label) in labels.iter().enumerate() {
        groups.entry(label.as_str()).or_default().push(idx);
    }

    let mut train_rows = Vec::new();
    let mut test_rows = Vec::new();
    for (label, mut rows) in groups {
        if rows.len() < 2 {
            return Err(TrainingError::TooFewSamples {
                label: label.to_string(),
                count: rows.len(),
            });
        }
        rows.shuffle(rng);
        let raw = (rows.len() as f32 * test_fraction).round() as usize;
        let n_test = raw.clamp(1, rows.len() - 1);
        test_rows.extend_from_slice(&rows[..n_test]);
        train_rows.extend_from_slice(&rows[n_test..]);
    }
    Ok((train_rows, test_rows))
}

fn feature_matrix(dataset: &Dataset, rows: &[usize]) -> Result<Array2<f32>, TrainingError> {
    let mut flat: Vec<f32> = Vec::with_capacity(rows.len() * FEATURE_LENGTH);
    for &row in rows {
        let features = &dataset.features()[row];
        if features.len() != FEATURE_LENGTH {
            return Err(TrainingError::FeatureDimension {
                index: row,
                actual: features.len(),
                expected: FEATURE_LENGTH,
            });
        }
        flat.extend_from_slice(features.as_slice());
    }
    let matrix = Array2::from_shape_vec((rows.len(), FEATURE_LENGTH), flat)?;
    Ok(matrix)
}

fn build_report(
    dataset: &Dataset,
    test_rows: &[usize],
    predictions: &[String],
    classes: &[String],
    train_samples: usize,
) -> TrainingReport {
    let mut correct = 0usize;
    let mut tp: BTreeMap<&str, usize> = BTreeMap::new();
    let mut fp: BTreeMap<&str, usize> = BTreeMap::new();
    let mut fn_: BTreeMap<&str, usize> = BTreeMap::new();
    let mut support: BTreeMap<&str, usize> = BTreeMap::new();
    let mut user_totals: BTreeMap<&str, (usize, usize)> = BTreeMap::new();

    for (offset, &row) in test_rows.iter().enumerate() {
        let truth = dataset.labels()[row].as_str();
        let predicted = predictions[offset].as_str();
        let user = dataset.users()[row].as_str();

        *support.entry(truth).or_insert(0) += 1;
        let tally = user_totals.entry(user).or_insert((0, 0));
        tally.1 += 1;
        if predicted == truth {
            correct += 1;
            tally.0 += 1;
            *tp.entry(truth).or_insert(0) += 1;
        } else {
            *fn_.entry(truth).or_insert(0) += 1;
            *fp.entry(predicted).or_insert(0) += 1;
        }
    }

    let mut per_label = BTreeMap::new();
    for class in classes {
        let class = class.as_str();
        let tp_n = tp.get(class).copied().unwrap_or(0) as f32;
        let fp_n = fp.get(class).copied().unwrap_or(0) as f32;
        let fn_n = fn_.get(class).copied().unwrap_or(0) as f32;

        let precision = if tp_n + fp_n > 0.0 { tp_n / (tp_n + fp_n) } else { 0.0 };
        let recall = if tp_n + fn_n > 0.0 { tp_n / (tp_n + fn_n) } else { 0.0 };
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        per_label.insert(
            class.to_string(),
            LabelMetrics {
                precision,
                recall,
                f1,
                support: support.get(class).copied().unwrap_or(0),
            },
        );
    }

    let per_user_accuracy: BTreeMap<String, f32> = user_totals
        .iter()
        .map(|(user, &(user_correct, user_total))| {
            (user.to_string(), user_correct as f32 / user_total as f32)
        })
        .collect();
    for user in dataset.users() {
        if !per_user_accuracy.contains_key(user) {
            debug!("user {} has no samples in the test partition", user);
        }
    }

    TrainingReport {
        accuracy: correct as f32 / test_rows.len() as f32,
        per_label,
        per_user_accuracy,
        train_samples,
        test_samples: test_rows.len(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use crate::config::config::TrainerConfig;
    use crate::dataset::dataset::{Dataset, LabeledSample};
    use crate::features::features::{FeatureVector, FEATURE_LENGTH};
    use crate::trainer::trainer::{stratified_split, Trainer, TrainingError};

    fn features_for(band: usize, jitter: usize) -> FeatureVector {
        // each class occupies its own value band on every feature
        let values = vec![0.1 + 0.3 * band as f32 + 0.001 * jitter as f32; FEATURE_LENGTH];
        values.try_into().unwrap()
    }

    fn separable_dataset() -> Dataset {
        let mut dataset = Dataset::new();
        for (band, label) in ["A", "B", "C"].iter().enumerate() {
            for i in 0..12 {
                dataset.push(LabeledSample {
                    features: features_for(band, i),
                    label: label.to_string(),
                    user: if i % 2 == 0 { "maria".to_string() } else { "daniel".to_string() },
                });
            }
        }
        dataset
    }

    fn test_config() -> TrainerConfig {
        TrainerConfig {
            n_trees: 20,
            seed: 11,
            ..TrainerConfig::new()
        }
    }

    #[test]
    fn test_train_separable_dataset() {
        let dataset = separable_dataset();
        let trainer = Trainer::new(test_config());
        let (artifact, report) = trainer.train(&dataset).unwrap();

        assert_eq!(report.train_samples + report.test_samples, dataset.len());
        assert!(report.accuracy >= 0.9, "accuracy was {}", report.accuracy);

        // every label appears in the holdout thanks to stratification
        for label in ["A", "B", "C"] {
            assert!(report.per_label[label].support >= 1);
        }
        for accuracy in report.per_user_accuracy.values() {
            assert!((0.0..=1.0).contains(accuracy));
        }

        assert_eq!(artifact.model().classes(), ["A", "B", "C"]);
    }

    #[test]
    fn test_train_is_deterministic() {
        let dataset = separable_dataset();
        let trainer = Trainer::new(test_config());
        let (a, report_a) = trainer.train(&dataset).unwrap();
        let (b, report_b) = trainer.train(&dataset).unwrap();
        assert_eq!(a, b);
        assert_eq!(report_a, report_b);
    }

    #[test]
    fn test_empty_dataset_fails() {
        let trainer = Trainer::new(test_config());
        assert!(matches!(
            trainer.train(&Dataset::new()),
            Err(TrainingError::EmptyDataset)
        ));
    }

    #[test]
    fn test_single_sample_label_fails() {
        let mut dataset = separable_dataset();
        dataset.push(LabeledSample {
            features: features_for(3, 0),
            label: "Z".to_string(),
            user: "maria".to_string(),
        });
        let trainer = Trainer::new(test_config());
        assert!(matches!(
            trainer.train(&dataset),
            Err(TrainingError::TooFewSamples { label, count: 1 }) if label == "Z"
        ));
    }

    #[test]
    fn test_invalid_test_fraction_fails() {
        let mut config = test_config();
        config.test_fraction = 1.0;
        let trainer = Trainer::new(config);
        assert!(matches!(
            trainer.train(&separable_dataset()),
            Err(TrainingError::InvalidTestFraction(_))
        ));
    }

    #[test]
    fn test_stratified_split_covers_all_labels() {
        let labels: Vec<String> = ["A"; 5]
            .iter()
            .chain(["B"; 2].iter())
            .chain(["C"; 10].iter())
            .map(|s| s.to_string())
            .collect();
        let mut rng = StdRng::seed_from_u64(9);
        let (train_rows, test_rows) = stratified_split(&labels, 0.1, &mut rng).unwrap();

        assert_eq!(train_rows.len() + test_rows.len(), labels.len());
        let train_set: BTreeSet<usize> = train_rows.iter().copied().collect();
        assert!(test_rows.iter().all(|row| !train_set.contains(row)));

        for partition in [&train_rows, &test_rows] {
            let seen: BTreeSet<&str> = partition.iter().map(|&row| labels[row].as_str()).collect();
            assert_eq!(seen.len(), 3, "partition missing a label: {:?}", seen);
        }
    }
}
