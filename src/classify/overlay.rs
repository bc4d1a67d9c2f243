use std::sync::OnceLock;

use ab_glyph::{FontRef, PxScale};
use image::Rgb;
use imageproc::{
    drawing::{draw_hollow_rect_mut, draw_text_mut},
    rect::Rect,
};

use super::Frame;
use crate::models::{Emotion, Observation, Region};

const FACE_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const PHONE_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const LABEL_SCALE: f32 = 14.0;

static FONT_BYTES: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");

fn label_font() -> Option<&'static FontRef<'static>> {
    static FONT: OnceLock<Option<FontRef<'static>>> = OnceLock::new();
    FONT.get_or_init(|| FontRef::try_from_slice(FONT_BYTES).ok())
        .as_ref()
}

/// Boxes whatever the observation located and writes the stable emotion
/// above the face. Display only.
pub fn annotate(frame: &mut Frame, observation: &Observation, stable: Option<Emotion>) {
    if let Some(region) = observation.face_region {
        draw_outline(frame, region, FACE_COLOR);
        if let Some(label) = stable {
            draw_label(frame, region, label.display_name(), FACE_COLOR);
        }
    }
    if let Some(region) = observation.phone_region {
        draw_outline(frame, region, PHONE_COLOR);
    }
}

/// Rectangle outline. The parts past the frame edge are pulled in to the edge
/// so a half-visible box still reads as a box.
pub fn draw_outline(frame: &mut Frame, region: Region, color: Rgb<u8>) {
    if let Some(rect) = clip(frame, region) {
        draw_hollow_rect_mut(frame, rect, color);
    }
}

/// Text just above `region`, or inside its top edge when there is no room.
pub fn draw_label(frame: &mut Frame, region: Region, text: &str, color: Rgb<u8>) {
    let Some(font) = label_font() else {
        return;
    };
    if clip(frame, region).is_none() {
        return;
    }
    let above = region.y as i32 - LABEL_SCALE as i32 - 2;
    let y = if above >= 0 { above } else { region.y as i32 + 2 };
    draw_text_mut(frame, color, region.x as i32 + 2, y, PxScale::from(LABEL_SCALE), font, text);
}

fn clip(frame: &Frame, region: Region) -> Option<Rect> {
    let (width, height) = frame.dimensions();
    if region.w == 0 || region.h == 0 || region.x >= width || region.y >= height {
        return None;
    }
    let w = region.w.min(width - region.x);
    let h = region.h.min(height - region.y);
    Some(Rect::at(region.x as i32, region.y as i32).of_size(w, h))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

    #[test]
    fn outline_is_clipped_to_frame() {
        let mut frame = Frame::new(10, 10);
        draw_outline(&mut frame, Region { x: 6, y: 6, w: 20, h: 20 }, PHONE_COLOR);

        assert_eq!(*frame.get_pixel(6, 6), PHONE_COLOR);
        assert_eq!(*frame.get_pixel(9, 9), PHONE_COLOR);
        assert_eq!(*frame.get_pixel(7, 7), BLACK);
    }

    #[test]
    fn region_outside_frame_is_ignored() {
        let mut frame = Frame::new(4, 4);
        draw_outline(&mut frame, Region { x: 10, y: 0, w: 2, h: 2 }, FACE_COLOR);
        draw_label(&mut frame, Region { x: 10, y: 0, w: 2, h: 2 }, "Sad", FACE_COLOR);
        assert!(frame.pixels().all(|p| *p == BLACK));
    }

    #[test]
    fn stable_label_is_written_above_the_face() {
        let observation = Observation {
            face_region: Some(Region { x: 10, y: 30, w: 40, h: 20 }),
            ..Observation::empty()
        };

        let mut unlabeled = Frame::new(80, 60);
        annotate(&mut unlabeled, &observation, None);
        let mut labeled = Frame::new(80, 60);
        annotate(&mut labeled, &observation, Some(Emotion::Focused));

        let text_band = |frame: &Frame| {
            (0..28u32)
                .flat_map(|y| (0..80u32).map(move |x| (x, y)))
                .filter(|&(x, y)| *frame.get_pixel(x, y) != BLACK)
                .count()
        };
        assert_eq!(text_band(&unlabeled), 0);
        assert!(text_band(&labeled) > 0);
    }
}
