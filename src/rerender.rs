//! Scene re-rendering.
//!
//! Replays a saved scene onto a fresh canvas without any network access: the
//! background comes from the scene's own data-URL snapshot (or an override)
//! and blocks are drawn from their stored geometry. Blocks missing sizing
//! data get it estimated and written back, so a re-rendered scene is fully
//! specified and re-rendering it again reproduces the same canvas.

use image::RgbImage;
use log::warn;

use crate::compose::draw::{
    draw_background, draw_signature_image, draw_text_line, fill_flat, parse_hex, Stroke, FLAT_FILL,
};
use crate::compose::Composition;
use crate::error::Result;
use crate::fetch::decode_data_url;
use crate::fonts::{FontStore, Typeface};
use crate::scene::{normalize_color, Block, BlockKind, BlockLayout, Scene, TextAlign};
use crate::typeset::{fit_text, wrap_text, FitParams};

/// Replacements applied while re-rendering.
#[derive(Debug, Clone, Default)]
pub struct RerenderOverrides {
    /// Replaces the wisdom block's text.
    pub blessing_text: Option<String>,
    /// Replaces the scene's background snapshot.
    pub background_data_url: Option<String>,
}

const LEGACY_H_PADDING: f32 = 14.0;
const LEGACY_V_PADDING: f32 = 12.0;
const LEGACY_V_SPACING: f32 = 4.0;
const LEGACY_LINE_RATIO: f32 = 1.28;

/// Re-render a scene to a canvas, returning the canvas and the normalized
/// scene (canonical colors, sizing backfilled).
pub fn rerender(
    scene: &Scene,
    overrides: &RerenderOverrides,
    fonts: &FontStore,
) -> Result<Composition> {
    let width = if scene.canvas_size.width > 0 { scene.canvas_size.width } else { 1080 };
    let height = if scene.canvas_size.height > 0 { scene.canvas_size.height } else { 1080 };
    let mut canvas = RgbImage::new(width, height);

    let background_url = overrides
        .background_data_url
        .as_deref()
        .or(scene.background_data_url.as_deref());
    match background_url {
        Some(url) => match decode_data_url(url) {
            Ok(image) => draw_background(&mut canvas, &image),
            Err(e) => {
                warn!("Scene background failed to decode: {}", e);
                fill_flat(&mut canvas, FLAT_FILL);
            }
        },
        None => fill_flat(&mut canvas, FLAT_FILL),
    }

    let mut blocks = scene.text_blocks.clone();
    if let Some(text) = &overrides.blessing_text {
        if let Some(wisdom) = blocks.iter_mut().find(|b| b.kind == BlockKind::Wisdom) {
            wisdom.text = Some(text.clone());
        }
    }

    for block in &mut blocks {
        if !block.visible {
            continue;
        }

        if block.kind == BlockKind::Signature {
            if let Some(data) = &block.data {
                match decode_data_url(data) {
                    Ok(image) => draw_signature_image(&mut canvas, &image, &block.rect()),
                    Err(e) => warn!("Signature block failed to decode: {}", e),
                }
            }
            continue;
        }

        if block.text().is_empty() {
            continue;
        }

        let face = fonts.resolve(block.font.as_deref());
        match block.layout() {
            BlockLayout::Legacy => {
                let size = stored_or_estimated_size(&face, block);
                if block.height > block.width {
                    draw_columns(&mut canvas, &face, block, size);
                    backfill(block, size, size + LEGACY_V_SPACING);
                } else {
                    draw_legacy_horizontal(&mut canvas, &face, block, size);
                    backfill(block, size, size * LEGACY_LINE_RATIO);
                }
            }
            BlockLayout::Vertical => {
                let size = stored_or_estimated_size(&face, block);
                draw_columns(&mut canvas, &face, block, size);
                backfill(block, size, size + LEGACY_V_SPACING);
            }
            BlockLayout::Boxed => {
                let line_height = draw_boxed(&mut canvas, &face, block);
                // Stored font size is left as-is: wisdom refits every pass
                // and the other boxed blocks keep whatever they carried.
                if block.line_height.is_none() {
                    block.line_height = Some(line_height);
                }
                block.fill_color = Some(normalize_color(block.fill_color.as_deref(), "#ffffff"));
                block.stroke_color =
                    Some(normalize_color(block.stroke_color.as_deref(), "#000000"));
            }
        }
    }

    Ok(Composition {
        canvas,
        scene: Scene {
            canvas_size: crate::geometry::CanvasSize { width, height },
            background_data_url: background_url.map(str::to_string),
            text_blocks: blocks,
            safe_area: scene.safe_area,
        },
    })
}

fn stored_or_estimated_size(face: &Typeface, block: &Block) -> f32 {
    match block.font_size {
        Some(size) if size > 0.0 => size,
        _ => estimate_legacy_font_size(face, block),
    }
}

/// Write canonical colors and sizing back into the block.
fn backfill(block: &mut Block, size: f32, line_height: f32) {
    if block.font_size.map(|s| s <= 0.0).unwrap_or(true) {
        block.font_size = Some(size);
    }
    if block.line_height.is_none() {
        block.line_height = Some(line_height);
    }
    block.fill_color = Some(normalize_color(block.fill_color.as_deref(), "#ffffff"));
    block.stroke_color = Some(normalize_color(block.stroke_color.as_deref(), "#000000"));
}

/// Largest size whose text fits the block under the legacy rules.
///
/// Horizontal blocks wrap character-wise inside the padding; columnar blocks
/// count how many characters the column grid can hold.
pub fn estimate_legacy_font_size(face: &Typeface, block: &Block) -> f32 {
    let text = if block.text().is_empty() { "字" } else { block.text() };
    let columnar = block.height > block.width;

    let mut size = 260u32;
    while size >= 12 {
        let fits = if columnar {
            fits_columns(face, block, text, size as f32)
        } else {
            fits_horizontal(face, block, text, size as f32)
        };
        if fits {
            return size as f32;
        }
        size -= 2;
    }
    12.0
}

fn fits_horizontal(face: &Typeface, block: &Block, text: &str, size: f32) -> bool {
    let max_width = (block.width - LEGACY_H_PADDING * 2.0).max(20.0);
    let max_height = (block.height - LEGACY_H_PADDING * 2.0).max(20.0);
    let lines = wrap_text(face, text, size, max_width);
    lines.len() as f32 * size * LEGACY_LINE_RATIO <= max_height
}

fn fits_columns(face: &Typeface, block: &Block, text: &str, size: f32) -> bool {
    let char_width = face.advance('測', size).max(1.0);
    let cols = ((block.width - LEGACY_V_PADDING * 2.0 + LEGACY_V_SPACING)
        / (char_width + LEGACY_V_SPACING))
        .floor()
        .max(1.0);
    let rows = ((block.height - LEGACY_V_PADDING * 2.0 + LEGACY_V_SPACING)
        / (size + LEGACY_V_SPACING))
        .floor()
        .max(1.0);
    text.chars().count() as f32 <= cols * rows
}

fn legacy_stroke(block: &Block, size: f32) -> Option<Stroke> {
    block.has_stroke.then(|| Stroke {
        color: parse_hex(&normalize_color(block.stroke_color.as_deref(), "#000000")),
        width: (size * 0.05).max(2.0),
    })
}

fn draw_legacy_horizontal(canvas: &mut RgbImage, face: &Typeface, block: &Block, size: f32) {
    let max_width = block.width - LEGACY_H_PADDING * 2.0;
    let lines = wrap_text(face, block.text(), size, max_width);
    let fill = parse_hex(&normalize_color(block.fill_color.as_deref(), "#ffffff"));
    let stroke = legacy_stroke(block, size);

    for (index, line) in lines.iter().enumerate() {
        let x = (block.x + LEGACY_H_PADDING).round();
        let y = (block.y + LEGACY_H_PADDING + index as f32 * size * LEGACY_LINE_RATIO).round();
        draw_text_line(canvas, face, line, size, x, y, fill, stroke);
    }
}

/// Columnar text: top to bottom, columns right to left. Characters past the
/// left padding are dropped without error.
fn draw_columns(canvas: &mut RgbImage, face: &Typeface, block: &Block, size: f32) {
    let char_width = face.advance('測', size);
    let mut x = block.x + block.width - LEGACY_V_PADDING - char_width;
    let mut y = block.y + LEGACY_V_PADDING;
    let fill = parse_hex(&normalize_color(block.fill_color.as_deref(), "#ffffff"));
    let stroke = legacy_stroke(block, size);

    for ch in block.text().chars() {
        if y + size > block.y + block.height - LEGACY_V_PADDING {
            y = block.y + LEGACY_V_PADDING;
            x -= char_width + LEGACY_V_SPACING;
        }
        if x < block.x + LEGACY_V_PADDING {
            return;
        }
        let mut buf = [0u8; 4];
        let glyph = ch.encode_utf8(&mut buf);
        draw_text_line(canvas, face, glyph, size, x.round(), y.round(), fill, stroke);
        y += size + LEGACY_V_SPACING;
    }
}

/// Draw an aligned boxed block; returns the line height used.
fn draw_boxed(canvas: &mut RgbImage, face: &Typeface, block: &Block) -> f32 {
    let text = block.text().to_string();
    let max_width = block.width.max(10.0);
    let max_height = block.height.max(10.0);
    let is_wisdom = block.kind == BlockKind::Wisdom;

    // Wisdom always refits so text swaps reuse the stored box; other blocks
    // honor their stored size when present.
    let (size, line_height, lines) = if is_wisdom || block.font_size.is_none() {
        let fit = fit_text(
            face,
            &FitParams {
                text: &text,
                max_width,
                max_height,
                min_size: 20,
                max_size: 260,
                line_height_ratio: 1.32,
                max_lines: 8,
            },
        );
        (fit.size as f32, fit.line_height, fit.lines)
    } else {
        let size = block.font_size.unwrap_or(20.0);
        let line_height = block.line_height.unwrap_or(size * 1.3);
        (size, line_height, wrap_text(face, &text, size, max_width))
    };

    let lines_height = lines.len() as f32 * line_height;
    let start_y = if is_wisdom {
        block.y + ((block.height - lines_height) / 2.0).max(0.0)
    } else {
        block.y
    };

    let align = block.text_align.unwrap_or(TextAlign::Center);
    let fill = parse_hex(&normalize_color(block.fill_color.as_deref(), "#ffffff"));
    let stroke = block.has_stroke.then(|| Stroke {
        color: parse_hex(&normalize_color(block.stroke_color.as_deref(), "#000000")),
        width: (size * 0.05).max(1.0),
    });

    for (index, line) in lines.iter().enumerate() {
        let line_width = face.line_width(line, size);
        let left = match align {
            TextAlign::Left => block.x,
            TextAlign::Center => block.x + (block.width - line_width) / 2.0,
            TextAlign::Right => block.x + block.width - line_width,
        };
        let top = start_y + index as f32 * line_height;
        draw_text_line(canvas, face, line, size, left, top, fill, stroke);
    }

    line_height
}
