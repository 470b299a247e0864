//! Style settings supplied by the host application.
//!
//! The composer never reads ambient state: everything the host remembers
//! across sessions (chosen fonts, colors, a manually repositioned signature)
//! arrives here as plain data and is round-tripped verbatim when present.

use serde::{Deserialize, Serialize};

/// Visual density preset controlling font-size ranges, box ratios and line
/// caps per role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DensityMode {
    Large,
    #[default]
    Balanced,
    Compact,
}

/// How the signature is rendered, if at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureMode {
    None,
    #[default]
    Text,
    Image,
}

/// Anchor point for the signature within the safe area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignaturePosition {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomCenter,
    #[default]
    BottomRight,
}

/// Remembered per-role style from a prior manual edit session.
///
/// Every field is optional; absent fields fall back to the palette.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoleStyle {
    #[serde(default)]
    pub font: Option<String>,
    #[serde(default)]
    pub fill_color: Option<String>,
    #[serde(default)]
    pub stroke_color: Option<String>,
    #[serde(default)]
    pub has_stroke: Option<bool>,
}

/// Remembered relative layout of a manually repositioned signature image.
/// All four ratios must be present for the layout to be applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignatureLayout {
    pub x_ratio: f32,
    pub y_ratio: f32,
    pub width_ratio: f32,
    pub height_ratio: f32,
}

/// Remembered style preferences carried across sessions by the host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StylePreferences {
    #[serde(default)]
    pub greeting: RoleStyle,
    #[serde(default)]
    pub wisdom: RoleStyle,
    #[serde(default)]
    pub signature: Option<SignatureLayout>,
}

/// Settings for one composition request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StyleSettings {
    #[serde(default)]
    pub typography: DensityMode,
    /// Display name used for the text signature.
    #[serde(default)]
    pub user_name: Option<String>,
    /// Prefix the text signature with "- " when set.
    #[serde(default)]
    pub auto_add_signature: bool,
    #[serde(default)]
    pub signature_mode: SignatureMode,
    #[serde(default)]
    pub signature_position: SignaturePosition,
    /// Signature image bytes as a data URL, looked up externally by the host.
    #[serde(default)]
    pub signature_asset: Option<String>,
    #[serde(default)]
    pub style_prefs: StylePreferences,
}

impl StyleSettings {
    /// The text drawn as a signature, or `None` when no text signature is
    /// configured.
    pub fn signature_text(&self) -> Option<String> {
        if self.signature_mode != SignatureMode::Text {
            return None;
        }
        let name = self.user_name.as_deref()?.trim();
        if name.is_empty() {
            return None;
        }
        if self.auto_add_signature {
            Some(format!("- {}", name))
        } else {
            Some(name.to_string())
        }
    }
}
