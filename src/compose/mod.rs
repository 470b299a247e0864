//! Scene composition: backdrop, tone-aware typography, signature.
//!
//! `Composer` turns a backdrop descriptor, a blessing and the host's style
//! settings into a rendered canvas plus the editable scene that re-renders
//! it. The layout walk mirrors the drawing walk exactly, so the recorded
//! block geometry is the geometry that was painted.

pub mod draw;
pub mod placement;

use image::{DynamicImage, RgbImage};
use log::{info, warn};

use crate::background::BackgroundDescriptor;
use crate::error::Result;
use crate::fetch::{decode_data_url, ImageFetcher};
use crate::fonts::{FontStore, Typeface};
use crate::geometry::{CanvasSize, Rect};
use crate::palette::{select_palette, Palette};
use crate::quotes::Blessing;
use crate::rerender::{rerender, RerenderOverrides};
use crate::scene::{Block, BlockKind, Scene, TextAlign};
use crate::settings::{RoleStyle, SignatureMode, SignaturePosition, StyleSettings};
use crate::tone::sample_tone;
use crate::typeset::{fit_text, DensityPreset, FitParams, TextFit};

use draw::{
    draw_background, draw_signature_image, draw_text_line, encode_jpeg, fill_flat, parse_hex,
    to_jpeg_data_url, Stroke, FLAT_FILL,
};
use placement::{best_placement, signature_placement};

/// JPEG quality of the final exported image.
pub const OUTPUT_QUALITY: u8 = 90;
/// JPEG quality of the background snapshot embedded in the scene.
const SNAPSHOT_QUALITY: u8 = 95;

const GREETING_TEXT: &str = "早安";
const GREETING_FONT: &str = "思源黑體 (TC)";
const WISDOM_FONT: &str = "思源宋體 (TC)";

/// A rendered canvas together with its re-renderable scene.
#[derive(Debug, Clone)]
pub struct Composition {
    pub canvas: RgbImage,
    pub scene: Scene,
}

impl Composition {
    /// Encode the canvas at export quality.
    pub fn to_jpeg(&self) -> Result<Vec<u8>> {
        encode_jpeg(&self.canvas, OUTPUT_QUALITY)
    }
}

/// Per-role style after merging remembered preferences with the palette.
struct ResolvedStyle {
    font: String,
    fill: String,
    stroke: String,
    has_stroke: bool,
}

fn resolve_style(role: &RoleStyle, default_font: &str, fill: &str, stroke: &str) -> ResolvedStyle {
    ResolvedStyle {
        font: role.font.clone().unwrap_or_else(|| default_font.to_string()),
        fill: role.fill_color.clone().unwrap_or_else(|| fill.to_string()),
        stroke: role.stroke_color.clone().unwrap_or_else(|| stroke.to_string()),
        has_stroke: role.has_stroke.unwrap_or(true),
    }
}

/// Composes scenes from backdrops and blessings.
pub struct Composer<'f> {
    fetcher: ImageFetcher,
    fonts: &'f FontStore,
}

impl<'f> Composer<'f> {
    pub fn new(fonts: &'f FontStore) -> Result<Self> {
        Ok(Self {
            fetcher: ImageFetcher::new()?,
            fonts,
        })
    }

    pub fn with_fetcher(fetcher: ImageFetcher, fonts: &'f FontStore) -> Self {
        Self { fetcher, fonts }
    }

    /// Compose a fresh scene.
    pub async fn compose(
        &self,
        background: &BackgroundDescriptor,
        blessing: &Blessing,
        settings: &StyleSettings,
    ) -> Result<Composition> {
        let size = CanvasSize::default();
        let mut canvas = RgbImage::new(size.width, size.height);

        match self.fetcher.load_background(background).await {
            Some(image) => draw_background(&mut canvas, &image),
            None => {
                warn!("No backdrop candidate loaded for {}, using flat fill", background.id);
                fill_flat(&mut canvas, FLAT_FILL);
            }
        }

        let signature_image = self.load_signature_asset(settings);
        let background_data_url = to_jpeg_data_url(&canvas, SNAPSHOT_QUALITY)?;

        let scene = compose_typography(
            &mut canvas,
            self.fonts,
            background,
            blessing,
            settings,
            signature_image.as_ref(),
            background_data_url,
        );

        info!(
            "Composed scene: backdrop {}, blessing {}, {} blocks",
            background.id,
            blessing.id,
            scene.text_blocks.len()
        );

        Ok(Composition { canvas, scene })
    }

    /// Swap the blessing while keeping the existing scene layout.
    ///
    /// With a prior scene the wisdom text is replaced and the scene
    /// re-rendered in place; without one this is a full composition.
    pub async fn regenerate_blessing(
        &self,
        prior: Option<&Scene>,
        background: &BackgroundDescriptor,
        blessing: &Blessing,
        settings: &StyleSettings,
    ) -> Result<Composition> {
        match prior.filter(|scene| !scene.text_blocks.is_empty()) {
            Some(scene) => rerender(
                scene,
                &RerenderOverrides {
                    blessing_text: Some(blessing.text.clone()),
                    background_data_url: None,
                },
                self.fonts,
            ),
            None => self.compose(background, blessing, settings).await,
        }
    }

    /// Swap the backdrop while keeping the existing scene layout.
    pub async fn regenerate_background(
        &self,
        prior: Option<&Scene>,
        background: &BackgroundDescriptor,
        blessing: &Blessing,
        settings: &StyleSettings,
    ) -> Result<Composition> {
        let Some(scene) = prior.filter(|scene| !scene.text_blocks.is_empty()) else {
            return self.compose(background, blessing, settings).await;
        };

        let size = scene.canvas_size;
        let mut backdrop = RgbImage::new(size.width.max(1), size.height.max(1));
        match self.fetcher.load_background(background).await {
            Some(image) => draw_background(&mut backdrop, &image),
            None => fill_flat(&mut backdrop, FLAT_FILL),
        }
        let snapshot = to_jpeg_data_url(&backdrop, SNAPSHOT_QUALITY)?;

        rerender(
            scene,
            &RerenderOverrides {
                blessing_text: None,
                background_data_url: Some(snapshot),
            },
            self.fonts,
        )
    }

    fn load_signature_asset(&self, settings: &StyleSettings) -> Option<DynamicImage> {
        if settings.signature_mode != SignatureMode::Image {
            return None;
        }
        let data = settings.signature_asset.as_deref()?;
        match decode_data_url(data) {
            Ok(image) => Some(image),
            Err(e) => {
                warn!("Signature asset failed to decode: {}", e);
                None
            }
        }
    }
}

/// Lay out and draw all text blocks, returning the resulting scene.
fn compose_typography(
    canvas: &mut RgbImage,
    fonts: &FontStore,
    background: &BackgroundDescriptor,
    blessing: &Blessing,
    settings: &StyleSettings,
    signature_image: Option<&DynamicImage>,
    background_data_url: String,
) -> Scene {
    let size = CanvasSize {
        width: canvas.width(),
        height: canvas.height(),
    };
    let safe = background.text_safe_area.resolve(size.width, size.height);
    let tone = sample_tone(canvas, &safe);
    let palette = select_palette(background, Some(&blessing.id), tone.as_ref());

    let greeting_style = resolve_style(
        &settings.style_prefs.greeting,
        GREETING_FONT,
        palette.greeting,
        palette.stroke,
    );
    let wisdom_style = resolve_style(
        &settings.style_prefs.wisdom,
        WISDOM_FONT,
        palette.body,
        palette.stroke,
    );
    let greeting_face = fonts.resolve(Some(&greeting_style.font));
    let wisdom_face = fonts.resolve(Some(&wisdom_style.font));

    let preset = DensityPreset::for_mode(settings.typography);
    let signature_text = settings.signature_text();
    let has_signature_image = signature_image.is_some();

    // Greeting: a single centered line near the top of the safe area.
    let greeting_box = Rect::new(
        safe.x + safe.width * (1.0 - preset.greeting.width_ratio) / 2.0,
        safe.y + safe.height * 0.02,
        safe.width * preset.greeting.width_ratio,
        safe.height * preset.greeting.height_ratio,
    );
    let greeting_fit = fit_text(
        &greeting_face,
        &FitParams {
            text: GREETING_TEXT,
            max_width: greeting_box.width,
            max_height: greeting_box.height,
            min_size: preset.greeting.min,
            max_size: preset.greeting.max,
            line_height_ratio: 1.1,
            max_lines: 1,
        },
    );

    let signature_fit = signature_text.as_deref().map(|text| {
        fit_text(
            &greeting_face,
            &FitParams {
                text,
                max_width: safe.width * 0.52,
                max_height: safe.height * 0.12,
                min_size: preset.signature.min,
                max_size: preset.signature.max,
                line_height_ratio: 1.2,
                max_lines: 1,
            },
        )
    });

    let signature_image_size = signature_image.map(|image| {
        let ratio = image.width().max(1) as f32 / image.height().max(1) as f32;
        let max_w = safe.width * 0.28;
        let max_h = safe.height * 0.15;
        let mut width = max_w;
        let mut height = width / ratio;
        if height > max_h {
            height = max_h;
            width = height * ratio;
        }
        (width, height)
    });

    // Vertical room the wisdom block must leave for the signature.
    let signature_reserved = if signature_fit.is_some() || has_signature_image {
        let text_need = signature_fit
            .as_ref()
            .map(|fit| fit.line_height + 18.0)
            .unwrap_or(0.0);
        let image_need = signature_image_size
            .map(|(_, h)| h + 18.0)
            .unwrap_or(0.0);
        text_need.max(image_need).max(safe.height * 0.1)
    } else {
        0.0
    };

    let reserve_bottom = matches!(
        settings.signature_position,
        SignaturePosition::BottomLeft
            | SignaturePosition::BottomCenter
            | SignaturePosition::BottomRight
    );
    let wisdom_top = greeting_box.bottom() + safe.height * 0.03;
    let wisdom_bottom = safe.bottom()
        - if reserve_bottom { signature_reserved } else { 0.0 }
        - safe.height * 0.04;
    let wisdom_region = Rect::new(
        safe.x + safe.width * 0.05,
        wisdom_top,
        safe.width * 0.9,
        (wisdom_bottom - wisdom_top).max(140.0),
    );

    let wisdom = best_placement(
        canvas,
        &wisdom_face,
        &blessing.text,
        &wisdom_region,
        &preset.wisdom,
        palette,
    );

    // Draw greeting.
    draw_centered_lines(
        canvas,
        &greeting_face,
        &greeting_fit,
        &greeting_box,
        greeting_box.y,
        &greeting_style.fill,
        greeting_style.has_stroke.then(|| Stroke {
            color: parse_hex(&greeting_style.stroke),
            width: (greeting_fit.size as f32 * 0.08).max(2.5),
        }),
    );

    // Draw wisdom, vertically centered within its chosen rect.
    let wisdom_start_y =
        wisdom.rect.y + ((wisdom.rect.height - wisdom.fit.text_height) / 2.0).max(0.0);
    draw_centered_lines(
        canvas,
        &wisdom_face,
        &wisdom.fit,
        &wisdom.rect,
        wisdom_start_y,
        &wisdom_style.fill,
        wisdom_style.has_stroke.then(|| Stroke {
            color: parse_hex(&wisdom_style.stroke),
            width: (wisdom.fit.size as f32 * 0.06).max(1.5),
        }),
    );

    let mut blocks = vec![
        text_block(
            "v6-greeting",
            BlockKind::Greeting,
            "早安",
            GREETING_TEXT,
            &greeting_box,
            &greeting_style.font,
            &greeting_style.fill,
            &greeting_style.stroke,
            800,
            greeting_style.has_stroke,
            &greeting_fit,
        ),
        text_block(
            "v6-wisdom",
            BlockKind::Wisdom,
            "祝福語",
            &blessing.text,
            &Rect::new(
                wisdom.rect.x,
                wisdom_start_y,
                wisdom.rect.width,
                wisdom.fit.text_height,
            ),
            &wisdom_style.font,
            &wisdom_style.fill,
            &wisdom_style.stroke,
            700,
            wisdom_style.has_stroke,
            &wisdom.fit,
        ),
    ];

    if let (Some(text), Some(fit)) = (signature_text.as_deref(), signature_fit.as_ref()) {
        blocks.push(draw_signature_text(
            canvas,
            &greeting_face,
            text,
            fit,
            &safe,
            settings.signature_position,
            &greeting_style.font,
            palette,
        ));
    }

    if let (Some(image), Some((width, height))) = (signature_image, signature_image_size) {
        blocks.push(draw_signature_block(
            canvas,
            image,
            width,
            height,
            &safe,
            settings,
            size,
        ));
    }

    Scene {
        canvas_size: size,
        background_data_url: Some(background_data_url),
        text_blocks: blocks,
        safe_area: Some(safe),
    }
}

/// Draw a fitted set of lines horizontally centered in `rect` from `start_y`.
fn draw_centered_lines(
    canvas: &mut RgbImage,
    face: &Typeface,
    fit: &TextFit,
    rect: &Rect,
    start_y: f32,
    fill: &str,
    stroke: Option<Stroke>,
) {
    let fill = parse_hex(fill);
    for (index, line) in fit.lines.iter().enumerate() {
        let line_width = face.line_width(line, fit.size as f32);
        let left = rect.x + (rect.width - line_width) / 2.0;
        let top = start_y + index as f32 * fit.line_height;
        draw_text_line(canvas, face, line, fit.size as f32, left, top, fill, stroke);
    }
}

#[allow(clippy::too_many_arguments)]
fn draw_signature_text(
    canvas: &mut RgbImage,
    face: &Typeface,
    text: &str,
    fit: &TextFit,
    safe: &Rect,
    position: SignaturePosition,
    font: &str,
    palette: &Palette,
) -> Block {
    let measured = face
        .line_width(text, fit.size as f32)
        .min(safe.width * 0.52);
    let (x, y) = signature_placement(safe, measured, fit.line_height, position);
    let align = match position {
        SignaturePosition::TopLeft | SignaturePosition::BottomLeft => TextAlign::Left,
        SignaturePosition::TopRight | SignaturePosition::BottomRight => TextAlign::Right,
        SignaturePosition::BottomCenter => TextAlign::Center,
    };

    draw_text_line(
        canvas,
        face,
        text,
        fit.size as f32,
        x,
        y,
        parse_hex(palette.signature),
        Some(Stroke {
            color: parse_hex(palette.stroke),
            width: (fit.size as f32 * 0.045).max(1.0),
        }),
    );

    let mut block = text_block(
        "v6-signature-text",
        BlockKind::SignatureText,
        "簽名文字",
        text,
        &Rect::new(x, y, measured, fit.line_height),
        font,
        palette.signature,
        palette.stroke,
        500,
        true,
        fit,
    );
    block.text_align = Some(align);
    block
}

fn draw_signature_block(
    canvas: &mut RgbImage,
    image: &DynamicImage,
    fitted_width: f32,
    fitted_height: f32,
    safe: &Rect,
    settings: &StyleSettings,
    size: CanvasSize,
) -> Block {
    // A manually repositioned signature overrides the anchor placement.
    let rect = match settings.style_prefs.signature {
        Some(layout) => Rect::new(
            size.width as f32 * layout.x_ratio,
            size.height as f32 * layout.y_ratio,
            (size.width as f32 * layout.width_ratio).max(60.0),
            (size.height as f32 * layout.height_ratio).max(24.0),
        ),
        None => {
            let (x, y) =
                signature_placement(safe, fitted_width, fitted_height, settings.signature_position);
            Rect::new(x, y, fitted_width, fitted_height)
        }
    };

    draw_signature_image(canvas, image, &rect);

    Block {
        id: "v6-signature-image".into(),
        kind: BlockKind::Signature,
        label: "簽名檔".into(),
        visible: true,
        locked: false,
        x: rect.x,
        y: rect.y,
        width: rect.width,
        height: rect.height,
        text: None,
        data: settings.signature_asset.clone(),
        font: None,
        fill_color: None,
        stroke_color: None,
        font_weight: None,
        has_stroke: true,
        text_align: None,
        font_size: None,
        line_height: None,
    }
}

#[allow(clippy::too_many_arguments)]
fn text_block(
    id: &str,
    kind: BlockKind,
    label: &str,
    text: &str,
    rect: &Rect,
    font: &str,
    fill: &str,
    stroke: &str,
    weight: u32,
    has_stroke: bool,
    fit: &TextFit,
) -> Block {
    Block {
        id: id.into(),
        kind,
        label: label.into(),
        visible: true,
        locked: false,
        x: rect.x,
        y: rect.y,
        width: rect.width,
        height: rect.height,
        text: Some(text.to_string()),
        data: None,
        font: Some(font.to_string()),
        fill_color: Some(fill.to_string()),
        stroke_color: Some(stroke.to_string()),
        font_weight: Some(weight),
        has_stroke,
        text_align: Some(TextAlign::Center),
        font_size: Some(fit.size as f32),
        line_height: Some(fit.line_height),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SignatureLayout;
    use image::Rgb;
    use pretty_assertions::assert_eq;

    fn flat_canvas() -> RgbImage {
        RgbImage::from_pixel(1080, 1080, Rgb([30, 40, 60]))
    }

    fn compose_on_flat(settings: &StyleSettings) -> (RgbImage, Scene) {
        let mut canvas = flat_canvas();
        let fonts = FontStore::new();
        let background = BackgroundDescriptor::fallback();
        let blessing = Blessing::new("b-002", "general", "早上好！願你今天心情愉快，萬事順利");
        let url = to_jpeg_data_url(&canvas, 95).unwrap();
        let scene = compose_typography(
            &mut canvas,
            &fonts,
            &background,
            &blessing,
            settings,
            None,
            url,
        );
        (canvas, scene)
    }

    #[test]
    fn scene_records_greeting_and_wisdom_blocks() {
        let (_, scene) = compose_on_flat(&StyleSettings::default());
        assert_eq!(scene.text_blocks.len(), 2);
        assert_eq!(scene.text_blocks[0].id, "v6-greeting");
        assert_eq!(scene.text_blocks[0].kind, BlockKind::Greeting);
        assert_eq!(scene.text_blocks[1].id, "v6-wisdom");
        assert_eq!(scene.text_blocks[1].text.as_deref(), Some("早上好！願你今天心情愉快，萬事順利"));
        assert!(scene.background_data_url.is_some());
    }

    #[test]
    fn balanced_sizes_stay_in_preset_ranges() {
        let (_, scene) = compose_on_flat(&StyleSettings::default());
        let greeting_size = scene.text_blocks[0].font_size.unwrap();
        assert!((64.0..=158.0).contains(&greeting_size));
        let wisdom_size = scene.text_blocks[1].font_size.unwrap();
        assert!((38.0..=70.0).contains(&wisdom_size));
    }

    #[test]
    fn blocks_stay_inside_the_safe_area() {
        let (_, scene) = compose_on_flat(&StyleSettings::default());
        let safe = scene.safe_area.unwrap();
        for block in &scene.text_blocks {
            assert!(safe.contains(&block.rect()), "block {} escaped", block.id);
        }
    }

    #[test]
    fn text_signature_block_is_recorded() {
        let settings = StyleSettings {
            user_name: Some("小美".into()),
            auto_add_signature: true,
            ..Default::default()
        };
        let (_, scene) = compose_on_flat(&settings);
        let sig = scene
            .text_blocks
            .iter()
            .find(|b| b.kind == BlockKind::SignatureText)
            .expect("signature block");
        assert_eq!(sig.text.as_deref(), Some("- 小美"));
        assert_eq!(sig.text_align, Some(TextAlign::Right));
        assert_eq!(sig.font_weight, Some(500));
        assert!(sig.width <= 1080.0 * 0.8 * 0.52 + 1e-3);
    }

    #[test]
    fn drawing_changes_the_canvas() {
        let before = flat_canvas();
        let (after, _) = compose_on_flat(&StyleSettings::default());
        assert!(before
            .pixels()
            .zip(after.pixels())
            .any(|(a, b)| a != b));
    }

    #[test]
    fn remembered_signature_layout_overrides_the_anchor() {
        let mut canvas = flat_canvas();
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(100, 40, Rgb([255, 0, 0])));
        let settings = StyleSettings {
            signature_mode: SignatureMode::Image,
            style_prefs: crate::settings::StylePreferences {
                signature: Some(SignatureLayout {
                    x_ratio: 0.5,
                    y_ratio: 0.5,
                    width_ratio: 0.2,
                    height_ratio: 0.1,
                }),
                ..Default::default()
            },
            ..Default::default()
        };
        let safe = Rect::new(108.0, 162.0, 864.0, 756.0);
        let block = draw_signature_block(
            &mut canvas,
            &image,
            200.0,
            80.0,
            &safe,
            &settings,
            CanvasSize::default(),
        );
        assert_eq!(block.x, 540.0);
        assert_eq!(block.y, 540.0);
        assert_eq!(block.width, 216.0);
        assert_eq!(block.height, 108.0);
    }

    #[test]
    fn signature_layout_enforces_minimum_dimensions() {
        let mut canvas = flat_canvas();
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(10, 10, Rgb([0, 255, 0])));
        let settings = StyleSettings {
            signature_mode: SignatureMode::Image,
            style_prefs: crate::settings::StylePreferences {
                signature: Some(SignatureLayout {
                    x_ratio: 0.1,
                    y_ratio: 0.1,
                    width_ratio: 0.01,
                    height_ratio: 0.01,
                }),
                ..Default::default()
            },
            ..Default::default()
        };
        let safe = Rect::new(108.0, 162.0, 864.0, 756.0);
        let block = draw_signature_block(
            &mut canvas,
            &image,
            100.0,
            100.0,
            &safe,
            &settings,
            CanvasSize::default(),
        );
        assert_eq!(block.width, 60.0);
        assert_eq!(block.height, 24.0);
    }
}
