//! Candidate placement search for the wisdom block and signature anchoring.

use image::RgbImage;

use crate::fonts::Typeface;
use crate::geometry::Rect;
use crate::palette::{Palette, PaletteIntent};
use crate::settings::SignaturePosition;
use crate::tone::sample_tone;
use crate::typeset::{fit_text, FitParams, TextFit, WisdomSpec};

/// Points of score per pixel of fitted font size.
const SIZE_WEIGHT: f32 = 0.025;
/// Ceiling on the busyness penalty.
const VARIANCE_CAP: f32 = 0.3;
/// Busyness penalty per unit of luminance variance.
const VARIANCE_FACTOR: f32 = 0.8;
/// Contrast score assumed when a region cannot be sampled.
const NEUTRAL_CONTRAST: f32 = 0.5;

/// One evaluated placement.
#[derive(Debug, Clone)]
pub struct Placement {
    pub rect: Rect,
    pub fit: TextFit,
    pub score: f32,
}

/// Candidate rectangles for the wisdom block.
///
/// Each preset offset slides the top edge down by a fraction of the
/// available height, trading vertical room for a different sampling window.
pub fn candidate_rects(region: &Rect, offsets: &[f32]) -> Vec<Rect> {
    offsets
        .iter()
        .map(|offset| {
            Rect::new(
                region.x,
                region.y + region.height * offset,
                region.width,
                region.height * (1.0 - offset),
            )
        })
        .collect()
}

/// Score one candidate: bigger fitted text and better contrast win, busy
/// regions lose. Strict comparison keeps the earliest candidate on ties.
fn score_candidate(canvas: &RgbImage, rect: &Rect, fit: &TextFit, palette: &Palette) -> f32 {
    let tone = sample_tone(canvas, rect);
    let contrast = match &tone {
        Some(tone) => match palette.intent {
            PaletteIntent::Light => 1.0 - tone.average,
            PaletteIntent::Dark => tone.average,
        },
        None => NEUTRAL_CONTRAST,
    };
    let variance_penalty = tone
        .map(|tone| (tone.variance * VARIANCE_FACTOR).min(VARIANCE_CAP))
        .unwrap_or(0.0);
    fit.size as f32 * SIZE_WEIGHT + contrast - variance_penalty
}

/// Fit the text into every candidate rectangle and keep the best-scoring one.
pub fn best_placement(
    canvas: &RgbImage,
    face: &Typeface,
    text: &str,
    region: &Rect,
    spec: &WisdomSpec,
    palette: &Palette,
) -> Placement {
    let mut best: Option<Placement> = None;

    for rect in candidate_rects(region, &spec.offsets) {
        let fit = fit_text(
            face,
            &FitParams {
                text,
                max_width: rect.width,
                max_height: rect.height,
                min_size: spec.min,
                max_size: spec.max,
                line_height_ratio: spec.line_height_ratio,
                max_lines: spec.max_lines,
            },
        );
        let score = score_candidate(canvas, &rect, &fit, palette);
        let better = best.as_ref().map(|b| score > b.score).unwrap_or(true);
        if better {
            best = Some(Placement { rect, fit, score });
        }
    }

    // offsets are never empty, so a placement always exists
    best.expect("at least one candidate rect")
}

/// Anchor a box of `width` × `height` to a corner or edge of the safe area.
pub fn signature_placement(
    safe_area: &Rect,
    width: f32,
    height: f32,
    position: SignaturePosition,
) -> (f32, f32) {
    let margin = (safe_area.width * 0.03).max(12.0);
    match position {
        SignaturePosition::TopLeft => (safe_area.x + margin, safe_area.y + margin),
        SignaturePosition::TopRight => (
            safe_area.x + safe_area.width - width - margin,
            safe_area.y + margin,
        ),
        SignaturePosition::BottomLeft => (
            safe_area.x + margin,
            safe_area.y + safe_area.height - height - margin,
        ),
        SignaturePosition::BottomCenter => (
            safe_area.x + (safe_area.width - width) / 2.0,
            safe_area.y + safe_area.height - height - margin,
        ),
        SignaturePosition::BottomRight => (
            safe_area.x + safe_area.width - width - margin,
            safe_area.y + safe_area.height - height - margin,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::LIGHT_PALETTES;
    use crate::typeset::BALANCED;
    use image::Rgb;
    use pretty_assertions::assert_eq;

    #[test]
    fn candidates_shrink_with_offset() {
        let region = Rect::new(108.0, 300.0, 864.0, 500.0);
        let rects = candidate_rects(&region, &[0.0, 0.08, 0.16]);
        assert_eq!(rects.len(), 3);
        assert_eq!(rects[0].y, 300.0);
        assert_eq!(rects[0].height, 500.0);
        assert!((rects[1].y - 340.0).abs() < 1e-3);
        assert!((rects[1].height - 460.0).abs() < 1e-3);
        for rect in &rects {
            assert_eq!(rect.x, region.x);
            assert_eq!(rect.width, region.width);
            assert!(region.contains(rect));
        }
    }

    #[test]
    fn best_placement_stays_inside_the_region() {
        let canvas = RgbImage::from_pixel(1080, 1080, Rgb([30, 30, 30]));
        let region = Rect::new(108.0, 350.0, 777.0, 450.0);
        let placement = best_placement(
            &canvas,
            &Typeface::Builtin,
            "早上好！願你今天心情愉快，萬事順利",
            &region,
            &BALANCED.wisdom,
            &LIGHT_PALETTES[0],
        );
        assert!(region.contains(&placement.rect));
        assert!(placement.fit.size >= BALANCED.wisdom.min);
        assert!(placement.fit.size <= BALANCED.wisdom.max);
    }

    #[test]
    fn placement_prefers_the_calmer_darker_region() {
        // Top half: noisy checkerboard. Bottom half: flat dark.
        let mut canvas = RgbImage::new(1080, 1080);
        for (x, y, px) in canvas.enumerate_pixels_mut() {
            *px = if y < 540 {
                if (x + y) % 2 == 0 {
                    Rgb([255, 255, 255])
                } else {
                    Rgb([0, 0, 0])
                }
            } else {
                Rgb([20, 20, 20])
            };
        }
        let region = Rect::new(108.0, 400.0, 864.0, 560.0);
        let placement = best_placement(
            &canvas,
            &Typeface::Builtin,
            "早安，平安是福",
            &region,
            &BALANCED.wisdom,
            &LIGHT_PALETTES[0],
        );
        // The offset candidates start lower, away from the noisy band.
        assert!(placement.rect.y > region.y);
    }

    #[test]
    fn signature_anchors() {
        let safe = Rect::new(108.0, 162.0, 864.0, 756.0);
        let margin = 864.0 * 0.03;

        let (x, y) = signature_placement(&safe, 200.0, 50.0, SignaturePosition::BottomRight);
        assert!((x - (safe.right() - 200.0 - margin)).abs() < 1e-3);
        assert!((y - (safe.bottom() - 50.0 - margin)).abs() < 1e-3);

        let (x, y) = signature_placement(&safe, 200.0, 50.0, SignaturePosition::TopLeft);
        assert!((x - (safe.x + margin)).abs() < 1e-3);
        assert!((y - (safe.y + margin)).abs() < 1e-3);

        let (x, _) = signature_placement(&safe, 200.0, 50.0, SignaturePosition::BottomCenter);
        assert!((x - (safe.x + (864.0 - 200.0) / 2.0)).abs() < 1e-3);
    }

    #[test]
    fn small_safe_area_keeps_the_minimum_margin() {
        let safe = Rect::new(0.0, 0.0, 300.0, 300.0);
        let (x, y) = signature_placement(&safe, 50.0, 20.0, SignaturePosition::TopLeft);
        assert_eq!((x, y), (12.0, 12.0));
    }
}
