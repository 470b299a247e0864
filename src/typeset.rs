//! Typography presets and the text-fitting primitive.
//!
//! Fitting is a downward scan over font sizes: at each size the text is
//! greedily wrapped character by character (CJK-appropriate, no word
//! breaking) and the first size whose line set respects both the line cap
//! and the box height wins. When nothing fits, the minimum size is accepted
//! and lines beyond the cap are dropped — a visual degradation, never an
//! error.

use crate::fonts::Typeface;
use crate::settings::DensityMode;

/// Font-size range and box ratios for the greeting role.
#[derive(Debug, Clone, Copy)]
pub struct GreetingSpec {
    pub min: u32,
    pub max: u32,
    pub width_ratio: f32,
    pub height_ratio: f32,
}

/// Font-size range, line metrics and placement offsets for the wisdom role.
#[derive(Debug, Clone, Copy)]
pub struct WisdomSpec {
    pub min: u32,
    pub max: u32,
    pub line_height_ratio: f32,
    pub max_lines: usize,
    pub offsets: [f32; 3],
}

/// Font-size range for the signature role.
#[derive(Debug, Clone, Copy)]
pub struct SignatureSpec {
    pub min: u32,
    pub max: u32,
}

/// A named bundle of per-role typography parameters.
#[derive(Debug, Clone, Copy)]
pub struct DensityPreset {
    pub greeting: GreetingSpec,
    pub wisdom: WisdomSpec,
    pub signature: SignatureSpec,
}

pub const LARGE: DensityPreset = DensityPreset {
    greeting: GreetingSpec {
        min: 80,
        max: 176,
        width_ratio: 0.7,
        height_ratio: 0.24,
    },
    wisdom: WisdomSpec {
        min: 44,
        max: 78,
        line_height_ratio: 1.32,
        max_lines: 4,
        offsets: [0.0, 0.06, 0.12],
    },
    signature: SignatureSpec { min: 36, max: 56 },
};

pub const BALANCED: DensityPreset = DensityPreset {
    greeting: GreetingSpec {
        min: 64,
        max: 158,
        width_ratio: 0.6,
        height_ratio: 0.22,
    },
    wisdom: WisdomSpec {
        min: 38,
        max: 70,
        line_height_ratio: 1.35,
        max_lines: 5,
        offsets: [0.0, 0.08, 0.16],
    },
    signature: SignatureSpec { min: 34, max: 52 },
};

pub const COMPACT: DensityPreset = DensityPreset {
    greeting: GreetingSpec {
        min: 54,
        max: 140,
        width_ratio: 0.56,
        height_ratio: 0.2,
    },
    wisdom: WisdomSpec {
        min: 30,
        max: 62,
        line_height_ratio: 1.4,
        max_lines: 7,
        offsets: [0.0, 0.1, 0.2],
    },
    signature: SignatureSpec { min: 28, max: 44 },
};

impl DensityPreset {
    pub fn for_mode(mode: DensityMode) -> &'static DensityPreset {
        match mode {
            DensityMode::Large => &LARGE,
            DensityMode::Balanced => &BALANCED,
            DensityMode::Compact => &COMPACT,
        }
    }
}

/// Parameters for one fit request.
#[derive(Debug, Clone)]
pub struct FitParams<'a> {
    pub text: &'a str,
    pub max_width: f32,
    pub max_height: f32,
    pub min_size: u32,
    pub max_size: u32,
    pub line_height_ratio: f32,
    pub max_lines: usize,
}

/// Result of fitting text into a box.
#[derive(Debug, Clone, PartialEq)]
pub struct TextFit {
    pub size: u32,
    pub lines: Vec<String>,
    pub line_height: f32,
    pub text_height: f32,
}

/// Greedily wrap text into lines no wider than `max_width` at `size`.
///
/// Wrapping is character-wise: a character that would overflow starts a new
/// line. Explicit `\n` forces a break regardless of width. Empty or
/// whitespace-only input yields a single empty line.
pub fn wrap_text(face: &Typeface, text: &str, size: f32, max_width: f32) -> Vec<String> {
    let normalized = text.trim();
    if normalized.is_empty() {
        return vec![String::new()];
    }

    let mut lines: Vec<String> = Vec::new();
    let mut line = String::new();

    for ch in normalized.chars() {
        if ch == '\n' {
            if !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            continue;
        }

        if !line.is_empty() {
            let test_width = face.line_width(&line, size) + face.advance(ch, size);
            if test_width > max_width {
                lines.push(std::mem::take(&mut line));
                line.push(ch);
                continue;
            }
        }
        line.push(ch);
    }

    if !line.is_empty() {
        lines.push(line);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Find the largest font size whose wrapped line set fits the box.
///
/// Scans from `max_size` down to `min_size` in steps of 2px and accepts the
/// first size satisfying both the line cap and the height constraint. Falls
/// back to `min_size` with lines truncated to the cap — never fails.
pub fn fit_text(face: &Typeface, params: &FitParams) -> TextFit {
    let min = params.min_size.min(params.max_size);
    let max = params.max_size.max(params.min_size);

    let mut size = max;
    loop {
        let lines = wrap_text(face, params.text, size as f32, params.max_width);
        let line_height = size as f32 * params.line_height_ratio;
        let text_height = lines.len() as f32 * line_height;

        if lines.len() <= params.max_lines && text_height <= params.max_height {
            return TextFit {
                size,
                lines,
                line_height,
                text_height,
            };
        }

        if size < min + 2 {
            break;
        }
        size -= 2;
    }

    let mut lines = wrap_text(face, params.text, min as f32, params.max_width);
    lines.truncate(params.max_lines.max(1));
    let line_height = min as f32 * params.line_height_ratio;
    TextFit {
        size: min,
        text_height: lines.len() as f32 * line_height,
        lines,
        line_height,
    }
}
