//! Stand-ins for the camera and the face/object models, so the server runs
//! end to end on a machine without either. Output is random but sticky: moods
//! and phone pick-ups last several frames, the way real ones do.

use anyhow::{bail, Result};
use image::Rgb;
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::classify::{
    ClassificationAdapter, Detection, FaceAnalyzer, FaceReading, Frame, ObjectDetector,
};
use crate::models::Region;
use crate::sensing::{CaptureDevice, CaptureSource};
use crate::settings::AppSettings;

const FRAME_WIDTH: u32 = 160;
const FRAME_HEIGHT: u32 = 120;

/// Labels as a DeepFace-style analyzer reports them.
const RAW_LABELS: [&str; 7] = ["neutral", "happy", "sad", "angry", "fear", "surprise", "disgust"];

/// Opens any device id and produces noisy frames.
#[derive(Default)]
pub struct SyntheticCamera {
    /// Frames each opened device yields before failing. `None` never fails.
    pub fail_after: Option<u64>,
}

impl CaptureSource for SyntheticCamera {
    fn open(&self, device_id: &str) -> Result<Box<dyn CaptureDevice>> {
        Ok(Box::new(SyntheticDevice {
            device_id: device_id.to_string(),
            rng: StdRng::from_entropy(),
            served: 0,
            fail_after: self.fail_after,
        }))
    }
}

struct SyntheticDevice {
    device_id: String,
    rng: StdRng,
    served: u64,
    fail_after: Option<u64>,
}

impl CaptureDevice for SyntheticDevice {
    fn read_frame(&mut self) -> Result<Frame> {
        if self.fail_after.is_some_and(|limit| self.served >= limit) {
            bail!("synthetic device {} stopped producing frames", self.device_id);
        }

        self.served += 1;

        let shade: u8 = self.rng.gen_range(40..200);
        let rng = &mut self.rng;
        Ok(Frame::from_fn(FRAME_WIDTH, FRAME_HEIGHT, |x, y| {
            let noise: u8 = rng.gen_range(0..24);
            let base = shade.wrapping_add(((x + y) % 32) as u8);
            Rgb([base.saturating_add(noise), base, base.saturating_sub(noise)])
        }))
    }

    fn release(&mut self) {}
}

pub struct RandomFaces {
    rng: StdRng,
    current: usize,
}

impl RandomFaces {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            current: 0,
        }
    }
}

impl FaceAnalyzer for RandomFaces {
    fn analyze(&mut self, frame: &Frame) -> Option<FaceReading> {
        // looked away
        if self.rng.gen_bool(0.1) {
            return None;
        }
        if self.rng.gen_bool(0.15) {
            self.current = self.rng.gen_range(0..RAW_LABELS.len());
        }

        let (w, h) = frame.dimensions();
        Some(FaceReading {
            dominant_emotion: RAW_LABELS[self.current].to_string(),
            region: Some(Region {
                x: w / 4,
                y: h / 6,
                w: w / 2,
                h: h * 2 / 3,
            }),
        })
    }
}

pub struct RandomPhone {
    rng: StdRng,
    holding: bool,
}

impl RandomPhone {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            holding: false,
        }
    }
}

impl ObjectDetector for RandomPhone {
    fn detect(&mut self, frame: &Frame) -> Vec<Detection> {
        let flip = if self.holding { 0.08 } else { 0.03 };
        if self.rng.gen_bool(flip) {
            self.holding = !self.holding;
        }
        if !self.holding {
            return Vec::new();
        }

        let (w, h) = frame.dimensions();
        vec![Detection {
            label: "cell phone".into(),
            confidence: self.rng.gen_range(0.45..0.95),
            region: Region {
                x: w / 10,
                y: h / 2,
                w: w / 5,
                h: h / 3,
            },
        }]
    }
}

/// Adapter over the random models, tuned from `settings`.
pub fn classifier(settings: &AppSettings) -> ClassificationAdapter {
    let seed: u64 = rand::thread_rng().gen();
    ClassificationAdapter::new(
        Box::new(RandomFaces::new(seed)),
        Box::new(RandomPhone::new(seed.wrapping_add(1))),
    )
    .with_phone_label(settings.phone_label.clone())
    .with_min_phone_confidence(settings.min_phone_confidence)
}
