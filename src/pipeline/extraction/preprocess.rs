//! Page image preparation ahead of character recognition.
//!
//! Rendered pages go through a fixed chain: grayscale, contrast boost,
//! sharpen, then binarization at the page's mid-tone. Each step is a
//! plain function so the chain can be tested piece by piece.

use std::io::Cursor;

use image::imageops;
use image::{DynamicImage, GrayImage, ImageOutputFormat, Luma};
use tracing::debug;

use super::ExtractionError;

// ═══════════════════════════════════════════════════════════
// Constants
// ═══════════════════════════════════════════════════════════

/// Contrast adjustment passed to `imageops::contrast` (percent, positive = more).
const CONTRAST_BOOST: f32 = 40.0;

/// Unsharp-mask blur radius.
const SHARPEN_SIGMA: f32 = 1.0;

/// Unsharp-mask difference threshold.
const SHARPEN_THRESHOLD: i32 = 2;

const INK: u8 = 0;
const PAPER: u8 = 255;

// ═══════════════════════════════════════════════════════════
// Chain
// ═══════════════════════════════════════════════════════════

/// Run the full preparation chain on a rendered page.
pub fn prepare_for_recognition(page: &DynamicImage) -> GrayImage {
    let gray = page.to_luma8();
    let contrasted = boost_contrast(&gray);
    let sharpened = sharpen(&contrasted);
    let threshold = mid_tone(&sharpened);
    debug!(
        width = sharpened.width(),
        height = sharpened.height(),
        threshold,
        "Prepared page for recognition"
    );
    binarize(&sharpened, threshold)
}

/// Prepare a page and encode it as PNG for the recognizer.
pub fn prepare_png(page: &DynamicImage) -> Result<Vec<u8>, ExtractionError> {
    encode_png(&prepare_for_recognition(page))
}

pub fn boost_contrast(img: &GrayImage) -> GrayImage {
    imageops::contrast(img, CONTRAST_BOOST)
}

pub fn sharpen(img: &GrayImage) -> GrayImage {
    imageops::unsharpen(img, SHARPEN_SIGMA, SHARPEN_THRESHOLD)
}

/// Midpoint between the darkest and lightest pixel.
///
/// Scanned pages rarely span the full 0..=255 range, so a fixed 128 cut
/// wipes faint ink on light scans. A blank image returns its single value.
pub fn mid_tone(img: &GrayImage) -> u8 {
    let mut lo = u8::MAX;
    let mut hi = u8::MIN;
    for Luma([v]) in img.pixels() {
        lo = lo.min(*v);
        hi = hi.max(*v);
    }
    if lo > hi {
        return 128;
    }
    ((lo as u16 + hi as u16) / 2) as u8
}

/// Pixels strictly below `threshold` become ink, the rest paper.
pub fn binarize(img: &GrayImage, threshold: u8) -> GrayImage {
    let mut out = img.clone();
    for Luma([v]) in out.pixels_mut() {
        *v = if *v < threshold { INK } else { PAPER };
    }
    out
}

/// Encode a grayscale image as PNG bytes.
pub fn encode_png(img: &GrayImage) -> Result<Vec<u8>, ExtractionError> {
    let dynamic = DynamicImage::ImageLuma8(img.clone());
    let mut cursor = Cursor::new(Vec::new());
    dynamic
        .write_to(&mut cursor, ImageOutputFormat::Png)
        .map_err(|e| ExtractionError::ImageProcessing(format!("PNG encoding failed: {e}")))?;
    Ok(cursor.into_inner())
}
