use serde::{Deserialize, Serialize};
use thiserror::Error;
use crate::utils::coordinate::LandmarkPoint;

/// Number of landmarks the hand-tracking model reports per hand.
pub const NUM_LANDMARKS: usize = 21;

/// Length of the classifier input vector: interleaved x/y offsets for every landmark.
pub const FEATURE_LENGTH: usize = 2 * NUM_LANDMARKS;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("expected exactly {} landmarks, got {0}", NUM_LANDMARKS)]
    LandmarkCount(usize),

    #[error("feature vector has length {0}, expected {}", FEATURE_LENGTH)]
    FeatureLength(usize),
}

/// A full set of 21 hand landmarks, validated at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkFrame {
    points: Vec<LandmarkPoint>,
}

impl LandmarkFrame {
    /// new validates the landmark count and wraps the points into a typed frame.
    pub fn new(points: Vec<LandmarkPoint>) -> Result<Self, ValidationError> {
        if points.len() != NUM_LANDMARKS {
            return Err(ValidationError::LandmarkCount(points.len()));
        }
        Ok(LandmarkFrame { points })
    }

    pub fn points(&self) -> &[LandmarkPoint] {
        &self.points
    }

    /// features normalizes the frame into the classifier input vector.
    pub fn features(&self) -> Result<FeatureVector, ValidationError> {
        normalize(&self.points)
    }
}

/// The 42-value normalized encoding of one hand. Length is a construction
/// invariant, re-checked when deserializing persisted datasets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "Vec<f32>", try_from = "Vec<f32>")]
pub struct FeatureVector(Vec<f32>);

impl FeatureVector {
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<FeatureVector> for Vec<f32> {
    fn from(features: FeatureVector) -> Self {
        features.0
    }
}

impl TryFrom<Vec<f32>> for FeatureVector {
    type Error = ValidationError;

    fn try_from(values: Vec<f32>) -> Result<Self, Self::Error> {
        if values.len() != FEATURE_LENGTH {
            return Err(ValidationError::FeatureLength(values.len()));
        }
        Ok(FeatureVector(values))
    }
}

/// normalize converts 21 landmarks into the 42-value feature vector by
/// subtracting the frame minima, so the encoding shifts with the hand's
/// bounding box instead of its absolute position.
///
/// # Arguments
/// * `points` - the landmarks in the detector's canonical order
///
/// # Returns
/// * `Result<FeatureVector, ValidationError>`
pub fn normalize(points: &[LandmarkPoint]) -> Result<FeatureVector, ValidationError> {
    if points.len() != NUM_LANDMARKS {
        return Err(ValidationError::LandmarkCount(points.len()));
    }

    let min_x = points.iter().map(|p| p.x).fold(f32::INFINITY, f32::min);
    let min_y = points.iter().map(|p| p.y).fold(f32::INFINITY, f32::min);

    let mut values: Vec<f32> = Vec::with_capacity(FEATURE_LENGTH);
    for point in points {
        values.push(point.x - min_x);
        values.push(point.y - min_y);
    }

    if values.len() != FEATURE_LENGTH {
        return Err(ValidationError::FeatureLength(values.len()));
    }
    Ok(FeatureVector(values))
}
