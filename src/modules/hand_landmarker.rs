use anyhow::Error;
use image::RgbImage;
use crate::utils::coordinate::LandmarkPoint;

/// One hand found in an image: its landmarks in the tracking model's
/// canonical order, with at least x and y per point.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedHand {
    pub points: Vec<LandmarkPoint>,
}

impl DetectedHand {
    pub fn new(points: Vec<LandmarkPoint>) -> Self {
        DetectedHand { points }
    }
}

/// Capability provided by an external hand-tracking implementation.
///
/// The dataset builder consumes this seam but does not implement it; a real
/// implementation typically wraps a neural hand-tracking model and may keep
/// mutable inference state between calls.
pub trait HandLandmarker {
    /// detect returns every hand found in the image, zero or more, each as an
    /// ordered sequence of landmark points.
    ///
    /// # Arguments
    /// * `image` - RGB raster to run hand tracking on
    ///
    /// # Returns
    /// * `Result<Vec<DetectedHand>, Error>`
    fn detect(&mut self, image: &RgbImage) -> Result<Vec<DetectedHand>, Error>;
}
