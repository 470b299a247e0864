//! End-to-end composition and re-rendering tests.
//!
//! Backdrops are supplied as data URLs so nothing here touches the network.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use pretty_assertions::assert_eq;
use std::io::Cursor;

use amanecer::background::{BackgroundDescriptor, TextColorPref};
use amanecer::compose::Composer;
use amanecer::fonts::FontStore;
use amanecer::quotes::Blessing;
use amanecer::rerender::{rerender, RerenderOverrides};
use amanecer::scene::{Block, BlockKind, Scene, TextAlign};
use amanecer::settings::{
    DensityMode, SignatureMode, SignaturePosition, StyleSettings,
};

fn png_data_url(image: RgbImage) -> String {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(image)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    format!("data:image/png;base64,{}", BASE64.encode(bytes))
}

/// A dark backdrop served from a data URL, so composition runs offline.
fn offline_backdrop() -> BackgroundDescriptor {
    let mut backdrop = BackgroundDescriptor::fallback();
    backdrop.image_url = png_data_url(RgbImage::from_pixel(64, 64, Rgb([25, 35, 55])));
    backdrop.fallback_urls.clear();
    backdrop.candidates.clear();
    backdrop
}

fn blessing(text: &str) -> Blessing {
    Blessing::new("t-blessing", "general", text)
}

#[tokio::test]
async fn compose_produces_a_scene_and_a_decodable_jpeg() {
    let fonts = FontStore::new();
    let composer = Composer::new(&fonts).unwrap();
    let composition = composer
        .compose(
            &offline_backdrop(),
            &blessing("早上好！願你今天心情愉快，萬事順利"),
            &StyleSettings::default(),
        )
        .await
        .unwrap();

    let jpeg = composition.to_jpeg().unwrap();
    let decoded = image::load_from_memory(&jpeg).unwrap();
    assert_eq!(decoded.width(), 1080);
    assert_eq!(decoded.height(), 1080);

    let scene = &composition.scene;
    assert!(scene
        .background_data_url
        .as_deref()
        .unwrap()
        .starts_with("data:image/jpeg;base64,"));
    assert_eq!(scene.text_blocks[0].kind, BlockKind::Greeting);
    assert_eq!(scene.text_blocks[1].kind, BlockKind::Wisdom);
}

#[tokio::test]
async fn balanced_preset_bounds_the_fitted_sizes() {
    let fonts = FontStore::new();
    let composer = Composer::new(&fonts).unwrap();
    let composition = composer
        .compose(
            &offline_backdrop(),
            &blessing("用一顆感恩的心，迎接美好的早晨"),
            &StyleSettings::default(),
        )
        .await
        .unwrap();

    let scene = &composition.scene;
    let safe = scene.safe_area.unwrap();
    let greeting = &scene.text_blocks[0];
    let wisdom = &scene.text_blocks[1];

    let greeting_size = greeting.font_size.unwrap();
    assert!((64.0..=158.0).contains(&greeting_size));
    let wisdom_size = wisdom.font_size.unwrap();
    assert!((38.0..=70.0).contains(&wisdom_size));

    for block in &scene.text_blocks {
        assert!(safe.contains(&block.rect()), "block {} escaped", block.id);
    }
}

#[tokio::test]
async fn compact_preset_caps_a_very_long_blessing_at_seven_lines() {
    let fonts = FontStore::new();
    let composer = Composer::new(&fonts).unwrap();
    let long_text: String = "願".repeat(200);
    let settings = StyleSettings {
        typography: DensityMode::Compact,
        ..Default::default()
    };
    let composition = composer
        .compose(&offline_backdrop(), &blessing(&long_text), &settings)
        .await
        .unwrap();

    let wisdom = &composition.scene.text_blocks[1];
    // Overflow degrades to the minimum size with lines truncated to the cap.
    assert_eq!(wisdom.font_size, Some(30.0));
    let expected_height = 7.0 * 30.0 * 1.4;
    assert!((wisdom.height - expected_height).abs() < 1e-3);
}

#[tokio::test]
async fn image_signature_sits_flush_with_the_bottom_right_margin() {
    let fonts = FontStore::new();
    let composer = Composer::new(&fonts).unwrap();
    let settings = StyleSettings {
        signature_mode: SignatureMode::Image,
        signature_position: SignaturePosition::BottomRight,
        signature_asset: Some(png_data_url(RgbImage::from_pixel(
            100,
            40,
            Rgb([200, 30, 30]),
        ))),
        ..Default::default()
    };
    let composition = composer
        .compose(&offline_backdrop(), &blessing("早安，平安是福"), &settings)
        .await
        .unwrap();

    let scene = &composition.scene;
    let safe = scene.safe_area.unwrap();
    let sig = scene
        .text_blocks
        .iter()
        .find(|b| b.kind == BlockKind::Signature)
        .expect("signature image block");

    let margin = (safe.width * 0.03).max(12.0);
    assert!((sig.x + sig.width - (safe.right() - margin)).abs() < 1e-2);
    assert!((sig.y + sig.height - (safe.bottom() - margin)).abs() < 1e-2);
    assert!(sig.width <= safe.width * 0.28 + 1e-2);
    assert!(sig.height <= safe.height * 0.15 + 1e-2);
}

#[tokio::test]
async fn rerendering_a_composed_scene_is_idempotent() {
    let fonts = FontStore::new();
    let composer = Composer::new(&fonts).unwrap();
    let composition = composer
        .compose(
            &offline_backdrop(),
            &blessing("每天進步一点点，就是最大的成功"),
            &StyleSettings::default(),
        )
        .await
        .unwrap();

    let first = rerender(&composition.scene, &RerenderOverrides::default(), &fonts).unwrap();
    let second = rerender(&first.scene, &RerenderOverrides::default(), &fonts).unwrap();

    assert_eq!(first.scene, second.scene);
    assert_eq!(first.canvas.as_raw(), second.canvas.as_raw());
}

#[tokio::test]
async fn regenerate_blessing_keeps_the_layout_and_swaps_the_text() {
    let fonts = FontStore::new();
    let composer = Composer::new(&fonts).unwrap();
    let settings = StyleSettings::default();
    let backdrop = offline_backdrop();
    let composition = composer
        .compose(&backdrop, &blessing("早安！美好的一天開始了"), &settings)
        .await
        .unwrap();

    let next = composer
        .regenerate_blessing(
            Some(&composition.scene),
            &backdrop,
            &blessing("健康是最大的財富"),
            &settings,
        )
        .await
        .unwrap();

    let old_greeting = &composition.scene.text_blocks[0];
    let new_greeting = &next.scene.text_blocks[0];
    assert_eq!(old_greeting.x, new_greeting.x);
    assert_eq!(old_greeting.y, new_greeting.y);
    assert_eq!(
        next.scene.text_blocks[1].text.as_deref(),
        Some("健康是最大的財富")
    );
    // Background snapshot is reused rather than refetched.
    assert_eq!(
        next.scene.background_data_url,
        composition.scene.background_data_url
    );
}

#[test]
fn legacy_scene_without_alignment_still_renders_text() {
    let fonts = FontStore::new();
    let scene = Scene {
        canvas_size: Default::default(),
        background_data_url: None,
        text_blocks: vec![Block {
            id: "legacy-1".into(),
            kind: BlockKind::Text,
            label: String::new(),
            visible: true,
            locked: false,
            x: 200.0,
            y: 200.0,
            width: 600.0,
            height: 240.0,
            text: Some("早安朋友，今天也要加油".into()),
            data: None,
            font: None,
            fill_color: Some("rgb(255, 255, 255)".into()),
            stroke_color: None,
            font_weight: None,
            has_stroke: true,
            text_align: None,
            font_size: None,
            line_height: None,
        }],
        safe_area: None,
    };

    let result = rerender(&scene, &RerenderOverrides::default(), &fonts).unwrap();
    assert!(result
        .canvas
        .pixels()
        .any(|px| px != &Rgb([0xf8, 0xf2, 0xe8])));

    let out = &result.scene.text_blocks[0];
    assert!(out.font_size.unwrap() >= 12.0);
    assert_eq!(out.fill_color.as_deref(), Some("#ffffff"));
    assert_eq!(out.stroke_color.as_deref(), Some("#000000"));
}

#[tokio::test]
async fn text_signature_records_alignment_for_its_anchor() {
    let fonts = FontStore::new();
    let composer = Composer::new(&fonts).unwrap();
    let settings = StyleSettings {
        user_name: Some("小美".into()),
        auto_add_signature: true,
        signature_position: SignaturePosition::BottomCenter,
        ..Default::default()
    };
    let composition = composer
        .compose(&offline_backdrop(), &blessing("活在當下，珍惜現在"), &settings)
        .await
        .unwrap();

    let sig = composition
        .scene
        .text_blocks
        .iter()
        .find(|b| b.kind == BlockKind::SignatureText)
        .expect("signature text block");
    assert_eq!(sig.text.as_deref(), Some("- 小美"));
    assert_eq!(sig.text_align, Some(TextAlign::Center));
}

#[tokio::test]
async fn bright_backdrop_gets_dark_text_colors() {
    let fonts = FontStore::new();
    let composer = Composer::new(&fonts).unwrap();
    let mut backdrop = offline_backdrop();
    backdrop.image_url = png_data_url(RgbImage::from_pixel(64, 64, Rgb([250, 250, 245])));
    // Declared preference says light, but the measured tone must win.
    backdrop.preferred_text_color = TextColorPref::Light;

    let composition = composer
        .compose(&backdrop, &blessing("早安，平安是福"), &StyleSettings::default())
        .await
        .unwrap();

    let wisdom = &composition.scene.text_blocks[1];
    let dark_bodies = ["#111827", "#4A2F23", "#15403A"];
    assert!(dark_bodies.contains(&wisdom.fill_color.as_deref().unwrap()));
}
