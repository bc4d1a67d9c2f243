use serde::{Deserialize, Serialize};

use super::Emotion;

/// Axis-aligned box in frame pixel coordinates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

/// What the classifiers saw in one frame. Lives for a single tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Observation {
    pub raw_emotion_label: Option<String>,
    pub emotion: Option<Emotion>,
    pub phone_detected: bool,
    pub face_region: Option<Region>,
    pub phone_region: Option<Region>,
}

impl Observation {
    /// No face and no phone. The common case, not an error.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.emotion.is_none() && !self.phone_detected
    }
}
