use std::fs;
use std::path::Path;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use crate::classifier::forest::RandomForestClassifier;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("model file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("model decode error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The persisted training output: a `{"model": ...}` blob wrapping the fitted
/// classifier. Written once by the trainer, loaded once by the inference
/// pipeline, read-only afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelArtifact {
    model: RandomForestClassifier,
}

impl ModelArtifact {
    pub fn new(model: RandomForestClassifier) -> Self {
        ModelArtifact { model }
    }

    pub fn model(&self) -> &RandomForestClassifier {
        &self.model
    }

    /// save_json writes the artifact to disk.
    pub fn save_json(&self, path: &Path) -> Result<(), ModelError> {
        let encoded = serde_json::to_string(self)?;
        fs::write(path, encoded)?;
        Ok(())
    }

    /// load_json reads an artifact written by `save_json`.
    pub fn load_json(path: &Path) -> Result<Self, ModelError> {
        let content = fs::read_to_string(path)?;
        let artifact: ModelArtifact = serde_json::from_str(&content)?;
        Ok(artifact)
    }
}
