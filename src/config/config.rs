use std::path::PathBuf;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatasetConfig {
    pub data_dir: PathBuf,
    pub dataset_path: PathBuf,
}

impl DatasetConfig {
    pub fn new() -> Self {
        DatasetConfig {
            data_dir: PathBuf::from("./data"),
            dataset_path: PathBuf::from("./data.json"),
        }
    }
}

impl Default for DatasetConfig {
    fn default() -> Self {
        DatasetConfig::new()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrainerConfig {
    pub dataset_path: PathBuf,
    pub model_path: PathBuf,
    pub test_fraction: f32,
    pub n_trees: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub seed: u64,
}

impl TrainerConfig {
    pub fn new() -> Self {
        TrainerConfig {
            dataset_path: PathBuf::from("./data.json"),
            model_path: PathBuf::from("./model.json"),
            test_fraction: 0.1,
            n_trees: 100,
            max_depth: None,
            min_samples_split: 2,
            seed: 42,
        }
    }
}

impl Default for TrainerConfig {
    fn default() -> Self {
        TrainerConfig::new()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InferenceConfig {
    pub model_path: PathBuf,
}

impl InferenceConfig {
    pub fn new() -> Self {
        InferenceConfig {
            model_path: PathBuf::from("./model.json"),
        }
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        InferenceConfig::new()
    }
}
