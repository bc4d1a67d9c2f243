//! Uniform front for the external face/emotion and object detectors.
//!
//! The detectors themselves live outside this crate. They are reached through
//! [`FaceAnalyzer`] and [`ObjectDetector`], and [`ClassificationAdapter`]
//! folds their answers into one [`Observation`] per frame.

pub mod overlay;

use image::RgbImage;

use crate::models::{Emotion, Observation, Region};

pub type Frame = RgbImage;

pub const PHONE_LABEL: &str = "cell phone";
pub const DEFAULT_PHONE_CONFIDENCE: f32 = 0.5;

/// Dominant emotion reported for the most prominent face in a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceReading {
    pub dominant_emotion: String,
    pub region: Option<Region>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub label: String,
    pub confidence: f32,
    pub region: Region,
}

pub trait FaceAnalyzer: Send {
    /// `None` when no face could be found.
    fn analyze(&mut self, frame: &Frame) -> Option<FaceReading>;
}

pub trait ObjectDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Vec<Detection>;
}

/// Anything that turns a frame into an [`Observation`].
pub trait Classifier: Send {
    fn classify(&mut self, frame: &mut Frame) -> Observation;
}

pub struct ClassificationAdapter {
    faces: Box<dyn FaceAnalyzer>,
    objects: Box<dyn ObjectDetector>,
    phone_label: String,
    min_phone_confidence: f32,
}

impl ClassificationAdapter {
    pub fn new(faces: Box<dyn FaceAnalyzer>, objects: Box<dyn ObjectDetector>) -> Self {
        Self {
            faces,
            objects,
            phone_label: PHONE_LABEL.to_string(),
            min_phone_confidence: DEFAULT_PHONE_CONFIDENCE,
        }
    }

    pub fn with_phone_label(mut self, label: impl Into<String>) -> Self {
        self.phone_label = label.into();
        self
    }

    pub fn with_min_phone_confidence(mut self, confidence: f32) -> Self {
        self.min_phone_confidence = confidence;
        self
    }
}

impl Classifier for ClassificationAdapter {
    fn classify(&mut self, frame: &mut Frame) -> Observation {
        let mut observation = Observation::empty();

        if let Some(face) = self.faces.analyze(frame) {
            let raw = face.dominant_emotion.trim().to_ascii_lowercase();
            if !raw.is_empty() {
                observation.emotion = Some(Emotion::from_raw(&raw));
                observation.raw_emotion_label = Some(raw);
                observation.face_region = face.region;
            }
        }

        let phone = self
            .objects
            .detect(frame)
            .into_iter()
            .filter(|d| {
                d.label.eq_ignore_ascii_case(&self.phone_label)
                    && d.confidence >= self.min_phone_confidence
            })
            .max_by(|a, b| a.confidence.total_cmp(&b.confidence));

        if let Some(phone) = phone {
            observation.phone_detected = true;
            observation.phone_region = Some(phone.region);
        }

        observation
    }
}
