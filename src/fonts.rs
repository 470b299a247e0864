//! Typefaces and text measurement.
//!
//! Two rendering paths share one interface:
//!
//! - **Outline**: a TTF/OTF loaded at runtime, rasterized with ab_glyph to an
//!   anti-aliased f32 coverage buffer.
//! - **Builtin**: the Spleen 12×24 bitmap face scaled to the target size with
//!   nearest neighbor. Characters the face does not cover (notably CJK) get a
//!   box glyph in a full-width cell, so a composition without registered
//!   fonts still produces visibly placed text.
//!
//! Measurement is advance-summing without kerning, which is exact for the
//! CJK-heavy strings this engine lays out.

use std::collections::HashMap;
use std::path::Path;

use ab_glyph::{point, Font, FontArc, ScaleFont};
use spleen_font::{PSF2Font, FONT_12X24};

use crate::error::{AmanecerError, Result};

/// A line of text rasterized to an f32 coverage buffer.
/// 0.0 = untouched, 1.0 = fully covered, intermediate = anti-aliased edge.
#[derive(Debug, Clone)]
pub struct LineRaster {
    pub width: usize,
    pub height: usize,
    pub data: Vec<f32>,
}

impl LineRaster {
    fn blank(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0.0; width * height],
        }
    }

    pub fn is_blank(&self) -> bool {
        self.data.iter().all(|&v| v <= 0.0)
    }
}

/// A resolved typeface, cheap to clone.
#[derive(Debug, Clone)]
pub enum Typeface {
    Outline(FontArc),
    Builtin,
}

impl Typeface {
    /// Horizontal advance of a single character at `size` pixels.
    pub fn advance(&self, ch: char, size: f32) -> f32 {
        match self {
            Typeface::Outline(font) => {
                let scaled = font.as_scaled(size);
                scaled.h_advance(font.glyph_id(ch))
            }
            // Bitmap cells: half-width for ASCII, full-width otherwise.
            Typeface::Builtin => {
                if ch.is_ascii() {
                    size * 0.5
                } else {
                    size
                }
            }
        }
    }

    /// Measured width of a single line (no wrapping) at `size` pixels.
    pub fn line_width(&self, text: &str, size: f32) -> f32 {
        text.chars().map(|ch| self.advance(ch, size)).sum()
    }

    /// Rasterize one line of text at `size` pixels.
    ///
    /// The buffer's top edge corresponds to the top of the em box, so callers
    /// can stamp it at a top-aligned y position directly.
    pub fn render_line(&self, text: &str, size: f32) -> LineRaster {
        match self {
            Typeface::Outline(font) => render_outline_line(font, text, size),
            Typeface::Builtin => render_builtin_line(text, size),
        }
    }
}

fn render_outline_line(font: &FontArc, text: &str, size: f32) -> LineRaster {
    let scaled = font.as_scaled(size);

    let mut glyphs = Vec::new();
    let mut caret_x = 0.0f32;
    for ch in text.chars() {
        let glyph_id = font.glyph_id(ch);
        glyphs.push((glyph_id, caret_x));
        caret_x += scaled.h_advance(glyph_id);
    }

    let ascent = scaled.ascent();
    let descent = scaled.descent();
    let width = (caret_x.ceil() as usize).max(1);
    let height = ((ascent - descent).ceil() as usize).max(1);
    let baseline_y = ascent;

    let mut raster = LineRaster::blank(width, height);

    for &(glyph_id, glyph_x) in &glyphs {
        let glyph = glyph_id.with_scale_and_position(size, point(glyph_x, baseline_y));
        if let Some(outlined) = font.outline_glyph(glyph) {
            let bounds = outlined.px_bounds();
            outlined.draw(|px, py, coverage| {
                let x = px as i32 + bounds.min.x as i32;
                let y = py as i32 + bounds.min.y as i32;
                if x >= 0 && x < width as i32 && y >= 0 && y < height as i32 {
                    let idx = y as usize * width + x as usize;
                    raster.data[idx] = (raster.data[idx] + coverage).min(1.0);
                }
            });
        }
    }

    raster
}

fn render_builtin_line(text: &str, size: f32) -> LineRaster {
    let cell_height = (size.ceil() as usize).max(1);
    let mut cells: Vec<(char, usize)> = Vec::new();
    let mut total_width = 0usize;
    for ch in text.chars() {
        let cell_width = if ch.is_ascii() {
            (size * 0.5).ceil() as usize
        } else {
            cell_height
        }
        .max(1);
        cells.push((ch, cell_width));
        total_width += cell_width;
    }

    let mut raster = LineRaster::blank(total_width.max(1), cell_height);

    let mut spleen = match PSF2Font::new(FONT_12X24) {
        Ok(font) => font,
        Err(_) => return raster,
    };

    let mut cursor_x = 0usize;
    for (ch, cell_width) in cells {
        if ch != ' ' {
            let mut cell = vec![0u8; cell_width * cell_height];
            let utf8 = ch.to_string();
            match spleen.glyph_for_utf8(utf8.as_bytes()) {
                Some(glyph_rows) => {
                    let mut src = vec![0u8; 12 * 24];
                    for (row_y, row) in glyph_rows.enumerate() {
                        for (col_x, on) in row.enumerate() {
                            if row_y < 24 && col_x < 12 {
                                src[row_y * 12 + col_x] = u8::from(on);
                            }
                        }
                    }
                    scale_bitmap(&src, 12, 24, &mut cell, cell_width, cell_height);
                }
                None => draw_box(&mut cell, cell_width, cell_height),
            }

            for y in 0..cell_height {
                for x in 0..cell_width {
                    if cell[y * cell_width + x] != 0 {
                        raster.data[y * raster.width + cursor_x + x] = 1.0;
                    }
                }
            }
        }
        cursor_x += cell_width;
    }

    raster
}

/// Scale a bitmap from src dimensions to dst dimensions using nearest neighbor.
fn scale_bitmap(src: &[u8], src_w: usize, src_h: usize, dst: &mut [u8], dst_w: usize, dst_h: usize) {
    for dy in 0..dst_h {
        for dx in 0..dst_w {
            let sx = dx * src_w / dst_w;
            let sy = dy * src_h / dst_h;
            let src_idx = sy * src_w + sx;
            let dst_idx = dy * dst_w + dx;
            if src_idx < src.len() && dst_idx < dst.len() {
                dst[dst_idx] = src[src_idx];
            }
        }
    }
}

/// Draw a box outline for characters missing from the builtin face.
fn draw_box(glyph: &mut [u8], width: usize, height: usize) {
    if width == 0 || height == 0 {
        return;
    }
    for x in 0..width {
        glyph[x] = 1;
        glyph[(height - 1) * width + x] = 1;
    }
    for y in 0..height {
        glyph[y * width] = 1;
        glyph[y * width + width - 1] = 1;
    }
}

/// Registry of named typefaces.
///
/// Unknown names resolve to the builtin face rather than erroring, so a
/// scene referencing a font the host never registered still renders.
#[derive(Debug, Default)]
pub struct FontStore {
    faces: HashMap<String, FontArc>,
}

impl FontStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a TTF/OTF file and register it under `name`.
    pub fn register_file(&mut self, name: &str, path: &Path) -> Result<()> {
        let bytes = std::fs::read(path)?;
        self.register_bytes(name, bytes)
    }

    /// Register raw font bytes under `name`.
    pub fn register_bytes(&mut self, name: &str, bytes: Vec<u8>) -> Result<()> {
        let font = FontArc::try_from_vec(bytes)
            .map_err(|e| AmanecerError::Font(format!("Failed to parse font '{}': {}", name, e)))?;
        self.faces.insert(name.to_string(), font);
        Ok(())
    }

    /// Resolve a font name to a typeface. `None` or unregistered names fall
    /// back to the builtin bitmap face.
    pub fn resolve(&self, name: Option<&str>) -> Typeface {
        match name.and_then(|n| self.faces.get(n)) {
            Some(font) => Typeface::Outline(font.clone()),
            None => Typeface::Builtin,
        }
    }

    pub fn registered_names(&self) -> impl Iterator<Item = &str> {
        self.faces.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_advance_distinguishes_ascii_and_fullwidth() {
        let face = Typeface::Builtin;
        assert_eq!(face.advance('a', 40.0), 20.0);
        assert_eq!(face.advance('早', 40.0), 40.0);
    }

    #[test]
    fn builtin_line_width_sums_advances() {
        let face = Typeface::Builtin;
        assert_eq!(face.line_width("ab", 40.0), 40.0);
        assert_eq!(face.line_width("早安", 40.0), 80.0);
    }

    #[test]
    fn builtin_render_produces_ink_for_ascii() {
        let face = Typeface::Builtin;
        let raster = face.render_line("Hi", 24.0);
        assert!(raster.width > 0 && raster.height > 0);
        assert!(!raster.is_blank());
    }

    #[test]
    fn builtin_render_boxes_unmapped_cjk() {
        let face = Typeface::Builtin;
        let raster = face.render_line("早", 24.0);
        assert!(!raster.is_blank());
        // Box glyph: top-left corner pixel is set.
        assert!(raster.data[0] > 0.0);
    }

    #[test]
    fn spaces_leave_blank_cells() {
        let face = Typeface::Builtin;
        let raster = face.render_line(" ", 24.0);
        assert!(raster.is_blank());
    }

    #[test]
    fn store_resolves_unknown_names_to_builtin() {
        let store = FontStore::new();
        assert!(matches!(store.resolve(Some("missing")), Typeface::Builtin));
        assert!(matches!(store.resolve(None), Typeface::Builtin));
    }
}
