use std::path::Path;
use log::{error, info};
use serde::{Deserialize, Serialize};
use crate::config::config::InferenceConfig;
use crate::features::features::normalize;
use crate::trainer::model::ModelArtifact;
use crate::utils::coordinate::LandmarkPoint;

const MODEL_NOT_LOADED: &str = "Model not loaded";

/// The response payload produced for every prediction request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PredictionResult {
    pub prediction: Option<String>,
    pub confidence: f32,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl PredictionResult {
    fn success(prediction: String, confidence: f32) -> Self {
        PredictionResult {
            prediction: Some(prediction),
            confidence,
            error: None,
        }
    }

    fn failure(error: impl Into<String>) -> Self {
        PredictionResult {
            prediction: None,
            confidence: 0.0,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug)]
enum ModelState {
    Loaded(ModelArtifact),
    Failed(String),
}

/// InferencePipeline answers landmark prediction requests against a model
/// loaded once at construction.
///
/// The pipeline is immutable after construction and `Sync`, so the transport
/// layer can share one instance read-only across concurrent connections. A
/// failed model load is cached: the pipeline keeps answering, returning a
/// fixed "Model not loaded" result instead of failing the process. No request
/// path panics or returns early out of the component; every failure becomes a
/// structured `PredictionResult`.
#[derive(Debug)]
pub struct InferencePipeline {
    state: ModelState,
}

impl InferencePipeline {
    /// new initializes the pipeline around an already-loaded model artifact.
    pub fn new(artifact: ModelArtifact) -> Self {
        InferencePipeline {
            state: ModelState::Loaded(artifact),
        }
    }

    /// from_model_file loads the persisted model artifact once. A failed load
    /// does not error: it yields a pipeline that reports the model as
    /// unavailable on every request.
    ///
    /// # Arguments
    /// * `path` - location of the persisted model artifact
    ///
    /// # Returns
    /// * `InferencePipeline`
    pub fn from_model_file(path: &Path) -> Self {
        match ModelArtifact::load_json(path) {
            Ok(artifact) => {
                info!("model loaded successfully from {:?}", path);
                InferencePipeline {
                    state: ModelState::Loaded(artifact),
                }
            }
            Err(e) => {
                error!("error loading model from {:?}: {}", path, e);
                InferencePipeline {
                    state: ModelState::Failed(e.to_string()),
                }
            }
        }
    }

    /// from_config loads the model from the configured artifact path.
    pub fn from_config(config: &InferenceConfig) -> Self {
        InferencePipeline::from_model_file(&config.model_path)
    }

    /// is_ready reports whether the model loaded successfully.
    pub fn is_ready(&self) -> bool {
        matches!(self.state, ModelState::Loaded(_))
    }

    /// load_error returns why the model failed to load, if it did.
    pub fn load_error(&self) -> Option<&str> {
        match &self.state {
            ModelState::Loaded(_) => None,
            ModelState::Failed(message) => Some(message),
        }
    }

    /// predict_frame classifies one validated-shape landmark frame.
    ///
    /// The landmark count is checked before any numeric processing; the
    /// confidence is the classifier's maximum class probability.
    ///
    /// # Arguments
    /// * `points` - the frame's landmarks in canonical order
    ///
    /// # Returns
    /// * `PredictionResult`
    pub fn predict_frame(&self, points: &[LandmarkPoint]) -> PredictionResult {
        let artifact = match &self.state {
            ModelState::Loaded(artifact) => artifact,
            ModelState::Failed(_) => return PredictionResult::failure(MODEL_NOT_LOADED),
        };

        let features = match normalize(points) {
            Ok(features) => features,
            Err(e) => return PredictionResult::failure(e.to_string()),
        };

        match artifact.model().predict_with_confidence(features.as_slice()) {
            Ok((label, confidence)) => PredictionResult::success(label.to_string(), confidence),
            Err(e) => PredictionResult::failure(e.to_string()),
        }
    }

    /// predict_message decodes one raw inbound payload and classifies it.
    ///
    /// The expected payload is a JSON array whose first element is the list
    /// of 21 `{x, y}` landmark objects. Anything malformed (invalid JSON, a
    /// missing or extra frame, a wrong landmark count, non-numeric
    /// coordinates) produces an error result rather than an error return, so
    /// one bad request never affects the connection or later requests.
    ///
    /// # Arguments
    /// * `raw` - the inbound message payload
    ///
    /// # Returns
    /// * `PredictionResult`
    pub fn predict_message(&self, raw: &str) -> PredictionResult {
        let frames: Vec<Vec<LandmarkPoint>> = match serde_json::from_str(raw) {
            Ok(frames) => frames,
            Err(e) => return PredictionResult::failure(format!("invalid landmark payload: {}", e)),
        };
        if frames.len() != 1 {
            return PredictionResult::failure(format!(
                "expected exactly one landmark set, got {}",
                frames.len()
            ));
        }
        self.predict_frame(&frames[0])
    }
}
