//! The editable scene model.
//!
//! A scene is the re-renderable form of a composition: a background snapshot
//! as a data URL plus positioned text blocks. Scenes round-trip through JSON
//! and may come back from older editors, so every field that later versions
//! added is optional and block kinds unknown to this version degrade to a
//! plain text block.

use serde::{Deserialize, Serialize};

use crate::geometry::{CanvasSize, Rect};

/// Block role within a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    Greeting,
    Wisdom,
    #[serde(rename = "signature-text")]
    SignatureText,
    /// Signature image, positioned by geometry and drawn from `data`.
    Signature,
    /// Any block kind this version does not know; rendered as plain text.
    #[serde(other)]
    Text,
}

/// Horizontal text alignment within a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

fn default_visible() -> bool {
    true
}

fn default_has_stroke() -> bool {
    true
}

/// One positioned element of a scene.
///
/// Geometry is in canvas pixels. `text_align` doubles as a version marker:
/// blocks written before it existed are laid out with the legacy wrapping
/// rules instead of the boxed ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: BlockKind,
    #[serde(default)]
    pub label: String,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default)]
    pub locked: bool,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Signature image payload as a data URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<u32>,
    #[serde(default = "default_has_stroke")]
    pub has_stroke: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_align: Option<TextAlign>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_height: Option<f32>,
}

impl Block {
    pub fn layout(&self) -> BlockLayout {
        if self.text_align.is_none() {
            BlockLayout::Legacy
        } else if self.height > self.width {
            BlockLayout::Vertical
        } else {
            BlockLayout::Boxed
        }
    }

    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    pub fn weight(&self) -> u32 {
        self.font_weight.unwrap_or(700)
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

/// How a block's text flows within its geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockLayout {
    /// Pre-alignment block: padded horizontal wrap, or columnar when taller
    /// than wide.
    Legacy,
    /// Aligned block taller than wide: columns top-to-bottom, right-to-left.
    Vertical,
    /// Aligned block: fitted or stored-size wrap inside the box.
    Boxed,
}

/// A complete re-renderable composition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    #[serde(default)]
    pub canvas_size: CanvasSize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_data_url: Option<String>,
    #[serde(default)]
    pub text_blocks: Vec<Block>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safe_area: Option<Rect>,
}

/// Canonicalize a CSS-ish color to 6-digit lowercase hex.
///
/// Accepts `#rrggbb` and `rgb()`/`rgba()` with integer channels; anything
/// else collapses to `fallback`.
pub fn normalize_color(color: Option<&str>, fallback: &str) -> String {
    let Some(value) = color.map(str::trim).filter(|v| !v.is_empty()) else {
        return fallback.to_string();
    };

    if let Some(hex) = value.strip_prefix('#') {
        if hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return format!("#{}", hex.to_ascii_lowercase());
        }
        return fallback.to_string();
    }

    if let Some((r, g, b)) = parse_rgb_call(value) {
        return format!("#{:02x}{:02x}{:02x}", r, g, b);
    }

    fallback.to_string()
}

/// Parse the first three integer channels of an `rgb(...)`/`rgba(...)` call.
fn parse_rgb_call(value: &str) -> Option<(u8, u8, u8)> {
    let lower = value.to_ascii_lowercase();
    let rest = lower
        .strip_prefix("rgba(")
        .or_else(|| lower.strip_prefix("rgb("))?;
    let body = rest.strip_suffix(')').unwrap_or(rest);
    let mut channels = body.split(',').map(|part| {
        part.trim()
            .parse::<i64>()
            .ok()
            .map(|v| v.clamp(0, 255) as u8)
    });
    let r = channels.next()??;
    let g = channels.next()??;
    let b = channels.next()??;
    Some((r, g, b))
}
