use serde::{Deserialize, Serialize};

/// A single hand-landmark position in normalized image coordinates (0..1).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LandmarkPoint {
    pub x: f32,
    pub y: f32,
}

impl LandmarkPoint {
    pub fn new(x: f32, y: f32) -> Self {
        LandmarkPoint { x, y }
    }
}
