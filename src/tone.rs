//! Region tone sampling.
//!
//! Estimates how bright and how busy a rectangular crop of the canvas is, so
//! that text color and placement can favor readable regions. Luminance is
//! Rec.709 (`0.2126R + 0.7152G + 0.0722B`) normalized to 0..1, sampled at a
//! fixed stride for speed.

use image::RgbImage;

use crate::geometry::Rect;

/// Sample every Nth pixel of the region.
const SAMPLE_STRIDE: usize = 5;

/// Measured tone of a canvas region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionTone {
    /// Mean luminance, 0 = black, 1 = white.
    pub average: f32,
    /// Population variance of luminance.
    pub variance: f32,
}

/// Measure mean luminance and variance of a canvas region.
///
/// The rectangle is clamped to the canvas. Returns `None` when the clamped
/// region is degenerate (zero-sized canvas or nothing to sample), in which
/// case callers fall back to the background's declared text-color
/// preference.
pub fn sample_tone(canvas: &RgbImage, rect: &Rect) -> Option<RegionTone> {
    let (canvas_w, canvas_h) = (canvas.width() as f32, canvas.height() as f32);
    if canvas_w < 1.0 || canvas_h < 1.0 {
        return None;
    }

    let x = rect.x.clamp(0.0, canvas_w - 1.0).floor() as u32;
    let y = rect.y.clamp(0.0, canvas_h - 1.0).floor() as u32;
    let width = rect.width.clamp(1.0, canvas_w - x as f32).floor() as u32;
    let height = rect.height.clamp(1.0, canvas_h - y as f32).floor() as u32;

    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;
    let mut count = 0usize;

    let total = (width as usize) * (height as usize);
    let mut index = 0usize;
    while index < total {
        let px = x + (index % width as usize) as u32;
        let py = y + (index / width as usize) as u32;
        let pixel = canvas.get_pixel(px, py);
        let lum = (0.2126 * pixel[0] as f64 + 0.7152 * pixel[1] as f64 + 0.0722 * pixel[2] as f64)
            / 255.0;
        sum += lum;
        sum_sq += lum * lum;
        count += 1;
        index += SAMPLE_STRIDE;
    }

    if count == 0 {
        return None;
    }

    let average = sum / count as f64;
    let variance = (sum_sq / count as f64 - average * average).max(0.0);
    Some(RegionTone {
        average: average as f32,
        variance: variance as f32,
    })
}
