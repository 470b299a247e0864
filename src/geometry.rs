//! Canvas geometry: fractional safe areas and absolute pixel rectangles.

use serde::{Deserialize, Serialize};

/// The fractional sub-rectangle of the canvas within which all text must be
/// laid out. Coordinates are fractions of the canvas size in 0..1, relative
/// to the background descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SafeArea {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl SafeArea {
    /// Resolve the fractional safe area to absolute pixels on a canvas.
    pub fn resolve(&self, canvas_width: u32, canvas_height: u32) -> Rect {
        Rect {
            x: self.x * canvas_width as f32,
            y: self.y * canvas_height as f32,
            width: self.width * canvas_width as f32,
            height: self.height * canvas_height as f32,
        }
    }

    /// Width × height fraction of the canvas this area covers.
    pub fn area_ratio(&self) -> f32 {
        self.width * self.height
    }
}

impl Default for SafeArea {
    fn default() -> Self {
        Self {
            x: 0.1,
            y: 0.15,
            width: 0.8,
            height: 0.7,
        }
    }
}

/// Absolute pixel rectangle within a canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// True when `other` lies fully within this rectangle (with a small
    /// epsilon for float accumulation).
    pub fn contains(&self, other: &Rect) -> bool {
        const EPS: f32 = 0.5;
        other.x >= self.x - EPS
            && other.y >= self.y - EPS
            && other.right() <= self.right() + EPS
            && other.bottom() <= self.bottom() + EPS
    }
}

/// Canvas dimensions carried by a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl Default for CanvasSize {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1080,
        }
    }
}
