use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use anyhow::Error;
use serde::{Deserialize, Serialize};
use crate::features::features::FeatureVector;

/// One labeled training example emitted by the dataset builder.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledSample {
    pub features: FeatureVector,
    pub label: String,
    pub user: String,
}

/// Headline counts reported after a dataset build.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetSummary {
    pub total_samples: usize,
    pub unique_users: usize,
    pub unique_labels: usize,
}

/// The labeled feature collection consumed by the trainer.
///
/// The three columns are positionally aligned: `data[i]` was extracted from an
/// image of letter `labels[i]` signed by `users[i]`. Alignment is kept as a
/// construction invariant, so the persisted form is exactly the in-memory form.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Dataset {
    data: Vec<FeatureVector>,
    labels: Vec<String>,
    users: Vec<String>,
}

impl Dataset {
    pub fn new() -> Self {
        Dataset {
            data: Vec::new(),
            labels: Vec::new(),
            users: Vec::new(),
        }
    }

    pub fn push(&mut self, sample: LabeledSample) {
        self.data.push(sample.features);
        self.labels.push(sample.label);
        self.users.push(sample.user);
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn features(&self) -> &[FeatureVector] {
        &self.data
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn users(&self) -> &[String] {
        &self.users
    }

    /// summary counts the collected samples and the distinct users and labels.
    pub fn summary(&self) -> DatasetSummary {
        let users: BTreeSet<&str> = self.users.iter().map(String::as_str).collect();
        let labels: BTreeSet<&str> = self.labels.iter().map(String::as_str).collect();
        DatasetSummary {
            total_samples: self.data.len(),
            unique_users: users.len(),
            unique_labels: labels.len(),
        }
    }

    /// label_counts returns how many samples each label has, sorted by label.
    pub fn label_counts(&self) -> BTreeMap<String, usize> {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for label in &self.labels {
            *counts.entry(label.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// save_json persists the dataset as a `{data, labels, users}` blob.
    pub fn save_json(&self, path: &Path) -> Result<(), Error> {
        let encoded = serde_json::to_string(self)?;
        fs::write(path, encoded)?;
        Ok(())
    }

    /// load_json reads a dataset blob written by `save_json`.
    pub fn load_json(path: &Path) -> Result<Self, Error> {
        let content = fs::read_to_string(path)?;
        let dataset: Dataset = serde_json::from_str(&content)?;
        if dataset.data.len() != dataset.labels.len() || dataset.data.len() != dataset.users.len() {
            return Err(Error::msg(format!(
                "dataset - misaligned blob: {} features, {} labels, {} users",
                dataset.data.len(),
                dataset.labels.len(),
                dataset.users.len()
            )));
        }
        Ok(dataset)
    }
}
