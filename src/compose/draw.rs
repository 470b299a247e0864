//! Raster drawing primitives shared by composition and re-rendering.
//!
//! Text is stamped from f32 coverage buffers. A stroked line is the same
//! buffer stamped eight times in the stroke color on a ring around the
//! target position, then once in the fill color at the center, which
//! approximates an outlined stroke without a vector stroker.

use std::io::Cursor;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, Rgb, RgbImage};

use crate::error::{AmanecerError, Result};
use crate::fonts::{LineRaster, Typeface};
use crate::geometry::Rect;

/// Canvas color used when no backdrop image is available.
pub const FLAT_FILL: &str = "#f8f2e8";

/// Parse `#rrggbb` into a pixel. Malformed input yields black.
pub fn parse_hex(color: &str) -> Rgb<u8> {
    let hex = color.trim().trim_start_matches('#');
    if hex.len() != 6 {
        return Rgb([0, 0, 0]);
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).unwrap_or(0);
    Rgb([channel(0..2), channel(2..4), channel(4..6)])
}

/// Stretch a backdrop image over the whole canvas.
pub fn draw_background(canvas: &mut RgbImage, backdrop: &DynamicImage) {
    *canvas = backdrop
        .resize_exact(canvas.width(), canvas.height(), FilterType::Lanczos3)
        .to_rgb8();
}

/// Fill the whole canvas with one color.
pub fn fill_flat(canvas: &mut RgbImage, color: &str) {
    let pixel = parse_hex(color);
    for px in canvas.pixels_mut() {
        *px = pixel;
    }
}

/// Alpha-blend a coverage buffer onto the canvas in one color.
pub fn stamp_raster(canvas: &mut RgbImage, raster: &LineRaster, left: f32, top: f32, color: Rgb<u8>) {
    let origin_x = left.round() as i64;
    let origin_y = top.round() as i64;

    for row in 0..raster.height {
        let y = origin_y + row as i64;
        if y < 0 || y >= canvas.height() as i64 {
            continue;
        }
        for col in 0..raster.width {
            let x = origin_x + col as i64;
            if x < 0 || x >= canvas.width() as i64 {
                continue;
            }
            let coverage = raster.data[row * raster.width + col];
            if coverage <= 0.0 {
                continue;
            }
            let alpha = coverage.min(1.0);
            let dst = canvas.get_pixel_mut(x as u32, y as u32);
            for ch in 0..3 {
                let blended = color[ch] as f32 * alpha + dst[ch] as f32 * (1.0 - alpha);
                dst[ch] = blended.round().clamp(0.0, 255.0) as u8;
            }
        }
    }
}

/// Stroke style for one text line.
#[derive(Debug, Clone, Copy)]
pub struct Stroke {
    pub color: Rgb<u8>,
    pub width: f32,
}

/// Draw one line of text with its top-left corner at (`left`, `top`).
pub fn draw_text_line(
    canvas: &mut RgbImage,
    face: &Typeface,
    text: &str,
    size: f32,
    left: f32,
    top: f32,
    fill: Rgb<u8>,
    stroke: Option<Stroke>,
) {
    let raster = face.render_line(text, size);
    if raster.is_blank() {
        return;
    }

    if let Some(stroke) = stroke {
        let r = stroke.width.max(0.0);
        if r > 0.0 {
            for (dx, dy) in [
                (-r, -r),
                (0.0, -r),
                (r, -r),
                (-r, 0.0),
                (r, 0.0),
                (-r, r),
                (0.0, r),
                (r, r),
            ] {
                stamp_raster(canvas, &raster, left + dx, top + dy, stroke.color);
            }
        }
    }

    stamp_raster(canvas, &raster, left, top, fill);
}

/// Draw a signature image resized into `rect`, honoring its alpha channel.
pub fn draw_signature_image(canvas: &mut RgbImage, signature: &DynamicImage, rect: &Rect) {
    let width = (rect.width.round() as u32).max(1);
    let height = (rect.height.round() as u32).max(1);
    let resized = signature
        .resize_exact(width, height, FilterType::Lanczos3)
        .to_rgba8();
    let origin_x = rect.x.round() as i64;
    let origin_y = rect.y.round() as i64;

    for (sx, sy, pixel) in resized.enumerate_pixels() {
        let x = origin_x + sx as i64;
        let y = origin_y + sy as i64;
        if x < 0 || x >= canvas.width() as i64 || y < 0 || y >= canvas.height() as i64 {
            continue;
        }
        let alpha = pixel[3] as f32 / 255.0;
        if alpha <= 0.0 {
            continue;
        }
        let dst = canvas.get_pixel_mut(x as u32, y as u32);
        for ch in 0..3 {
            let blended = pixel[ch] as f32 * alpha + dst[ch] as f32 * (1.0 - alpha);
            dst[ch] = blended.round().clamp(0.0, 255.0) as u8;
        }
    }
}

/// Encode the canvas as JPEG at the given quality.
pub fn encode_jpeg(canvas: &RgbImage, quality: u8) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    let encoder = JpegEncoder::new_with_quality(Cursor::new(&mut bytes), quality);
    canvas
        .write_with_encoder(encoder)
        .map_err(|e| AmanecerError::Image(format!("Failed to encode JPEG: {}", e)))?;
    Ok(bytes)
}

/// Encode the canvas as a JPEG data URL.
pub fn to_jpeg_data_url(canvas: &RgbImage, quality: u8) -> Result<String> {
    let bytes = encode_jpeg(canvas, quality)?;
    Ok(format!("data:image/jpeg;base64,{}", BASE64.encode(bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn hex_parsing() {
        assert_eq!(parse_hex("#ff8000"), Rgb([255, 128, 0]));
        assert_eq!(parse_hex("FFF8E7"), Rgb([255, 248, 231]));
        assert_eq!(parse_hex("#bad"), Rgb([0, 0, 0]));
    }

    #[test]
    fn flat_fill_covers_canvas() {
        let mut canvas = RgbImage::new(8, 8);
        fill_flat(&mut canvas, FLAT_FILL);
        assert_eq!(canvas.get_pixel(0, 0), &Rgb([0xf8, 0xf2, 0xe8]));
        assert_eq!(canvas.get_pixel(7, 7), &Rgb([0xf8, 0xf2, 0xe8]));
    }

    #[test]
    fn background_is_stretched_to_canvas() {
        let backdrop = DynamicImage::ImageRgb8(RgbImage::from_pixel(3, 7, Rgb([10, 200, 30])));
        let mut canvas = RgbImage::new(16, 16);
        draw_background(&mut canvas, &backdrop);
        assert_eq!(canvas.get_pixel(15, 15), &Rgb([10, 200, 30]));
    }

    #[test]
    fn stamping_blends_by_coverage() {
        let mut canvas = RgbImage::from_pixel(4, 4, Rgb([0, 0, 0]));
        let raster = LineRaster {
            width: 2,
            height: 1,
            data: vec![1.0, 0.5],
        };
        stamp_raster(&mut canvas, &raster, 1.0, 1.0, Rgb([255, 255, 255]));
        assert_eq!(canvas.get_pixel(1, 1), &Rgb([255, 255, 255]));
        assert_eq!(canvas.get_pixel(2, 1), &Rgb([128, 128, 128]));
        assert_eq!(canvas.get_pixel(0, 0), &Rgb([0, 0, 0]));
    }

    #[test]
    fn stamping_clips_at_canvas_edges() {
        let mut canvas = RgbImage::new(4, 4);
        let raster = LineRaster {
            width: 3,
            height: 3,
            data: vec![1.0; 9],
        };
        stamp_raster(&mut canvas, &raster, -1.0, -1.0, Rgb([255, 0, 0]));
        assert_eq!(canvas.get_pixel(0, 0), &Rgb([255, 0, 0]));
        assert_eq!(canvas.get_pixel(2, 2), &Rgb([0, 0, 0]));
    }

    #[test]
    fn text_line_leaves_ink_on_canvas() {
        let mut canvas = RgbImage::from_pixel(120, 40, Rgb([0, 0, 0]));
        draw_text_line(
            &mut canvas,
            &Typeface::Builtin,
            "Hi",
            24.0,
            4.0,
            4.0,
            Rgb([255, 255, 255]),
            Some(Stroke {
                color: Rgb([255, 0, 0]),
                width: 2.0,
            }),
        );
        assert!(canvas.pixels().any(|px| px[0] > 0));
    }

    #[test]
    fn jpeg_data_url_has_the_right_prefix() {
        let canvas = RgbImage::from_pixel(8, 8, Rgb([1, 2, 3]));
        let url = to_jpeg_data_url(&canvas, 90).unwrap();
        assert!(url.starts_with("data:image/jpeg;base64,"));
    }

    #[test]
    fn signature_alpha_blend_skips_transparent_pixels() {
        use image::{Rgba, RgbaImage};
        let mut sig = RgbaImage::from_pixel(2, 2, Rgba([255, 255, 255, 255]));
        sig.put_pixel(0, 0, Rgba([255, 255, 255, 0]));
        let mut canvas = RgbImage::from_pixel(4, 4, Rgb([0, 0, 0]));
        draw_signature_image(
            &mut canvas,
            &DynamicImage::ImageRgba8(sig),
            &Rect::new(1.0, 1.0, 2.0, 2.0),
        );
        assert_eq!(canvas.get_pixel(1, 1), &Rgb([0, 0, 0]));
        assert_eq!(canvas.get_pixel(2, 2), &Rgb([255, 255, 255]));
    }
}
