//! Deterministic palette selection.
//!
//! A small, visually coherent color set is derived from a stable hash of the
//! background id, blessing id and theme, biased toward a light or dark group
//! by the measured tone of the safe area. Same inputs always yield the same
//! palette; there is no randomness here.

use crate::background::{BackgroundDescriptor, TextColorPref};
use crate::tone::RegionTone;

/// Whether text colors come from the light/pastel or the dark group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaletteIntent {
    Light,
    Dark,
}

/// One coherent color set for a composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub greeting: &'static str,
    pub body: &'static str,
    pub signature: &'static str,
    pub stroke: &'static str,
    pub intent: PaletteIntent,
}

/// Light/pastel palettes used over dark backgrounds.
pub const LIGHT_PALETTES: [Palette; 3] = [
    Palette {
        greeting: "#FFF8E7",
        body: "#FFFDF8",
        signature: "#FFEFD6",
        stroke: "#111827",
        intent: PaletteIntent::Light,
    },
    Palette {
        greeting: "#EAF8FF",
        body: "#F8FDFF",
        signature: "#DDF2FF",
        stroke: "#0f172a",
        intent: PaletteIntent::Light,
    },
    Palette {
        greeting: "#F3FFEE",
        body: "#FBFFF8",
        signature: "#E4F7D8",
        stroke: "#1f2937",
        intent: PaletteIntent::Light,
    },
];

/// Dark palettes used over light backgrounds.
pub const DARK_PALETTES: [Palette; 3] = [
    Palette {
        greeting: "#1F2937",
        body: "#111827",
        signature: "#334155",
        stroke: "#f8fafc",
        intent: PaletteIntent::Dark,
    },
    Palette {
        greeting: "#3F1D1D",
        body: "#4A2F23",
        signature: "#5B3A2E",
        stroke: "#fef2f2",
        intent: PaletteIntent::Dark,
    },
    Palette {
        greeting: "#13332A",
        body: "#15403A",
        signature: "#1E4D3F",
        stroke: "#f0fdf4",
        intent: PaletteIntent::Dark,
    },
];

/// Tone threshold below which the region is considered dark enough for a
/// light palette.
const LIGHT_TONE_THRESHOLD: f32 = 0.55;

/// Stable string hash over UTF-16 code units (31·h + c with wrapping i32
/// arithmetic). Matches the hash the original editor used to seed palette
/// selection, so CJK ids land on the same index.
pub fn hash_seed(text: &str) -> u32 {
    let mut hash: i32 = 0;
    for unit in text.encode_utf16() {
        hash = hash
            .wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(unit as i32);
    }
    hash.unsigned_abs()
}

/// Select the palette for a background/blessing pair.
///
/// The measured tone decides the group when present (dark region ⇒ light
/// text); otherwise the background's declared preference does. Within the
/// group, the seed hash picks one of three palettes deterministically.
pub fn select_palette(
    background: &BackgroundDescriptor,
    blessing_id: Option<&str>,
    tone: Option<&RegionTone>,
) -> &'static Palette {
    let use_light = match tone {
        Some(tone) => tone.average < LIGHT_TONE_THRESHOLD,
        None => background.preferred_text_color == TextColorPref::Light,
    };
    let group: &[Palette; 3] = if use_light {
        &LIGHT_PALETTES
    } else {
        &DARK_PALETTES
    };
    let seed = format!(
        "{}-{}-{}",
        background.id,
        blessing_id.unwrap_or("b"),
        background.theme
    );
    &group[(hash_seed(&seed) % group.len() as u32) as usize]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::background::BackgroundDescriptor;
    use pretty_assertions::assert_eq;

    fn background(id: &str, pref: TextColorPref) -> BackgroundDescriptor {
        BackgroundDescriptor {
            id: id.into(),
            preferred_text_color: pref,
            ..BackgroundDescriptor::fallback()
        }
    }

    #[test]
    fn hash_is_stable_and_ascii_matches_reference() {
        // Reference values computed with the original 31·h + c hash.
        assert_eq!(hash_seed(""), 0);
        assert_eq!(hash_seed("a"), 97);
        assert_eq!(hash_seed("ab"), 97 * 31 + 98);
        assert_eq!(hash_seed("早安"), hash_seed("早安"));
    }

    #[test]
    fn same_inputs_select_same_palette() {
        let bg = background("bg-sunrise-001", TextColorPref::Light);
        let tone = RegionTone {
            average: 0.3,
            variance: 0.01,
        };
        let first = select_palette(&bg, Some("b-001"), Some(&tone));
        let second = select_palette(&bg, Some("b-001"), Some(&tone));
        assert_eq!(first, second);
        assert_eq!(first.intent, PaletteIntent::Light);
    }

    #[test]
    fn bright_tone_selects_dark_group() {
        let bg = background("bg-flower-001", TextColorPref::Light);
        let tone = RegionTone {
            average: 0.8,
            variance: 0.0,
        };
        let palette = select_palette(&bg, Some("b-002"), Some(&tone));
        assert_eq!(palette.intent, PaletteIntent::Dark);
    }

    #[test]
    fn missing_tone_falls_back_to_declared_preference() {
        let light = background("bg-a", TextColorPref::Light);
        assert_eq!(
            select_palette(&light, None, None).intent,
            PaletteIntent::Light
        );
        let dark = background("bg-a", TextColorPref::Dark);
        assert_eq!(select_palette(&dark, None, None).intent, PaletteIntent::Dark);
    }

    #[test]
    fn different_blessings_can_vary_palette_within_group() {
        let bg = background("bg-sunrise-001", TextColorPref::Light);
        let tone = RegionTone {
            average: 0.2,
            variance: 0.0,
        };
        let indexes: Vec<usize> = ["b-001", "b-002", "b-003", "b-004", "b-005"]
            .iter()
            .map(|id| {
                let palette = select_palette(&bg, Some(id), Some(&tone));
                LIGHT_PALETTES
                    .iter()
                    .position(|p| p == palette)
                    .expect("palette from light group")
            })
            .collect();
        // All light, and at least two distinct indexes across the ids.
        assert!(indexes.iter().any(|&i| i != indexes[0]));
    }
}
