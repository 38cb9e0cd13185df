//! Draw face boxes and label bars onto the artifact image.

use image::{Rgb, RgbImage};
use visage_core::recognition::Recognition;

use crate::detector::FaceBox;

/// Box colour for a recognised face.
pub const KNOWN_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

/// Box colour for an unrecognised face.
pub const UNKNOWN_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

const BOX_THICKNESS: u32 = 3;
const LABEL_BAR_HEIGHT: u32 = 18;
const LABEL_CHAR_WIDTH: u32 = 9;
const LABEL_PADDING: u32 = 10;

/// Text shown under a face.
pub fn label_text(recognition: Option<&Recognition>) -> String {
    match recognition {
        Some(r) => r.to_string(),
        None => "Unknown".to_string(),
    }
}

/// Outline every face and draw a filled label bar sized to its label.
///
/// The bar sits below the box, or above it when it would leave the image.
/// Box coordinates are untrusted: anything past the image edge is clipped.
pub fn annotate(image: &mut RgbImage, faces: &[(FaceBox, Option<Recognition>)]) {
    for (bounds, recognition) in faces {
        let color = if recognition.is_some() {
            KNOWN_COLOR
        } else {
            UNKNOWN_COLOR
        };
        draw_outline(image, bounds, color);

        let label = label_text(recognition.as_ref());
        let chars = u32::try_from(label.chars().count()).unwrap_or(u32::MAX);
        let bar_width = chars
            .saturating_mul(LABEL_CHAR_WIDTH)
            .saturating_add(LABEL_PADDING);
        let bar_top = if bounds.bottom.saturating_add(LABEL_BAR_HEIGHT) <= image.height() {
            bounds.bottom
        } else {
            bounds.top.saturating_sub(LABEL_BAR_HEIGHT)
        };
        fill_rect(
            image,
            bounds.left,
            bar_top,
            bounds.left.saturating_add(bar_width),
            bar_top.saturating_add(LABEL_BAR_HEIGHT),
            color,
        );
    }
}

fn draw_outline(image: &mut RgbImage, b: &FaceBox, color: Rgb<u8>) {
    let t = BOX_THICKNESS;
    fill_rect(image, b.left, b.top, b.right, b.top.saturating_add(t), color);
    fill_rect(image, b.left, b.bottom.saturating_sub(t), b.right, b.bottom, color);
    fill_rect(image, b.left, b.top, b.left.saturating_add(t), b.bottom, color);
    fill_rect(image, b.right.saturating_sub(t), b.top, b.right, b.bottom, color);
}

/// Fill `[x0, x1) x [y0, y1)`, clipped to the image.
fn fill_rect(image: &mut RgbImage, x0: u32, y0: u32, x1: u32, y1: u32, color: Rgb<u8>) {
    let x1 = x1.min(image.width());
    let y1 = y1.min(image.height());
    for y in y0..y1 {
        for x in x0..x1 {
            image.put_pixel(x, y, color);
        }
    }
}
