//! Backdrop catalog and live candidate synthesis.
//!
//! The catalog carries a curated set of remote backdrops per theme. On top of
//! it, live candidates are synthesized from theme query variants against
//! seeded placeholder-image services, so every generation can reach for fresh
//! imagery while the curated set remains the offline-safe fallback.

use std::fmt;

use chrono::{Datelike, NaiveDate};
use rand::prelude::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::geometry::SafeArea;

/// Visual theme of a backdrop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Sunrise,
    Flower,
    Mountain,
    Festival,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Sunrise => "sunrise",
            Theme::Flower => "flower",
            Theme::Mountain => "mountain",
            Theme::Festival => "festival",
        }
    }

    /// Display name shown in the UI.
    pub fn label(&self) -> &'static str {
        match self {
            Theme::Sunrise => "日出",
            Theme::Flower => "花卉",
            Theme::Mountain => "山景",
            Theme::Festival => "節慶",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared text-color preference of a backdrop, used when tone sampling is
/// unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextColorPref {
    Light,
    Dark,
}

/// One fetchable image URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageCandidate {
    pub url: String,
}

impl ImageCandidate {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// A backdrop: where its image comes from and how text sits on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundDescriptor {
    pub id: String,
    pub image_url: String,
    #[serde(default)]
    pub fallback_urls: Vec<String>,
    #[serde(default, rename = "imageCandidates")]
    pub candidates: Vec<ImageCandidate>,
    pub theme: Theme,
    #[serde(default)]
    pub text_safe_area: SafeArea,
    pub preferred_text_color: TextColorPref,
}

impl BackgroundDescriptor {
    fn curated(id: &str, image_url: &str, theme: Theme, pref: TextColorPref) -> Self {
        Self {
            id: id.into(),
            image_url: image_url.into(),
            fallback_urls: Vec::new(),
            candidates: Vec::new(),
            theme,
            text_safe_area: SafeArea::default(),
            preferred_text_color: pref,
        }
    }

    /// The backdrop used when the pool is empty. Compositions never fail for
    /// lack of a backdrop.
    pub fn fallback() -> Self {
        Self::curated(
            "fallback-001",
            "https://images.unsplash.com/photo-1507003211169-0a1dd7228f2d?w=1080&q=80",
            Theme::Sunrise,
            TextColorPref::Light,
        )
    }

    /// Every URL worth trying for this backdrop, primary first.
    pub fn candidate_urls(&self) -> Vec<String> {
        if !self.candidates.is_empty() {
            return self.candidates.iter().map(|c| c.url.clone()).collect();
        }
        std::iter::once(self.image_url.clone())
            .chain(self.fallback_urls.iter().cloned())
            .filter(|url| !url.is_empty())
            .collect()
    }
}

/// The curated backdrop catalog.
pub fn builtin_backdrops() -> Vec<BackgroundDescriptor> {
    use TextColorPref::{Dark, Light};
    use Theme::{Festival, Flower, Mountain, Sunrise};

    let unsplash =
        |photo: &str| format!("https://images.unsplash.com/{}?w=1080&q=80", photo);

    [
        ("bg-sunrise-001", "photo-1507400492013-162706c8c05e", Sunrise, Light),
        ("bg-sunrise-002", "photo-1470252649378-9c29740c9fa8", Sunrise, Light),
        ("bg-sunrise-003", "photo-1507003211169-0a1dd7228f2d", Sunrise, Light),
        ("bg-sunrise-004", "photo-1433086966358-54859d0ed716", Sunrise, Light),
        ("bg-mountain-001", "photo-1506905925346-21bda4d32df4", Mountain, Light),
        ("bg-mountain-002", "photo-1464822759023-fed622ff2c3b", Mountain, Light),
        ("bg-mountain-003", "photo-1519681393784-d120267933ba", Mountain, Light),
        ("bg-mountain-004", "photo-1486870591958-9b9d0d1dda99", Mountain, Light),
        ("bg-mountain-005", "photo-1454496522488-7a8e488e8606", Mountain, Light),
        ("bg-flower-001", "photo-1490750967868-88aa4486c946", Flower, Dark),
        ("bg-flower-002", "photo-1490750967868-88aa4486c946", Flower, Dark),
        ("bg-flower-003", "photo-1518709268805-4e9042af9f23", Flower, Dark),
        ("bg-flower-004", "photo-1462275646964-a0e3571f4f83", Flower, Dark),
        ("bg-festival-001", "photo-1514525253161-7a46d19cd819", Festival, Light),
        ("bg-festival-002", "photo-1533174072545-7a4b6ad7a6c3", Festival, Light),
        ("bg-festival-003", "photo-1513151233558-d860c5398176", Festival, Light),
        ("bg-sky-001", "photo-1509316785289-025f5b846b35", Sunrise, Light),
        ("bg-sky-002", "photo-1534088568595-a066f410bcda", Sunrise, Light),
        ("bg-nature-001", "photo-1441974231531-c6227db76b6e", Sunrise, Light),
        ("bg-nature-002", "photo-1472214103451-9374bd1c798e", Sunrise, Light),
        ("bg-nature-003", "photo-1426604966848-d7adac402bff", Mountain, Light),
        ("bg-nature-004", "photo-1470071459604-3b5ec3a7fe05", Mountain, Light),
        ("bg-sunset-001", "photo-1495616811223-4d98c6e9c869", Sunrise, Light),
        ("bg-sunset-002", "photo-1507003211169-0a1dd7228f2d", Sunrise, Light),
    ]
    .iter()
    .map(|(id, photo, theme, pref)| {
        BackgroundDescriptor::curated(id, &unsplash(photo), *theme, *pref)
    })
    .collect()
}

/// Curated backdrops for a theme. `None` means "general": everything except
/// festival imagery.
pub fn backdrops_by_theme(theme: Option<Theme>) -> Vec<BackgroundDescriptor> {
    builtin_backdrops()
        .into_iter()
        .filter(|bg| match theme {
            Some(theme) => bg.theme == theme,
            None => bg.theme != Theme::Festival,
        })
        .collect()
}

/// Search queries per theme for live candidate synthesis.
fn theme_queries(theme: Option<Theme>) -> &'static [&'static str] {
    match theme {
        Some(Theme::Sunrise) => &[
            "sunrise",
            "dawn landscape",
            "morning sky",
            "golden hour",
            "sunlight clouds",
        ],
        Some(Theme::Flower) => &[
            "flower garden",
            "spring flowers",
            "bloom",
            "wildflowers",
            "botanical",
        ],
        Some(Theme::Mountain) => &[
            "mountain landscape",
            "mountain sunrise",
            "nature valley",
            "forest mountain",
            "misty peak",
        ],
        Some(Theme::Festival) => &[
            "festival lights",
            "celebration",
            "lantern festival",
            "confetti lights",
            "holiday decoration",
        ],
        None => &[
            "morning nature",
            "sunrise",
            "peaceful landscape",
            "serene scenery",
            "nature background",
        ],
    }
}

const QUERY_FLAVORS: [&str; 5] = ["high quality", "cinematic", "soft light", "peaceful", "wallpaper"];

/// Reduce a query to at most three comma-separated lowercase tags.
fn query_to_tags(query: &str) -> String {
    let tags: Vec<&str> = query
        .split(|ch: char| !ch.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .take(3)
        .collect();
    if tags.is_empty() {
        "nature,morning".to_string()
    } else {
        tags.join(",").to_ascii_lowercase()
    }
}

/// Percent-encode a URL path component the way `encodeURIComponent` does.
fn encode_component(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.' | '~') {
            out.push(ch);
        } else {
            let mut buf = [0u8; 4];
            for byte in ch.encode_utf8(&mut buf).bytes() {
                out.push_str(&format!("%{:02X}", byte));
            }
        }
    }
    out
}

fn live_url_candidates(query: &str, sig: u64) -> Vec<ImageCandidate> {
    let tags = query_to_tags(query);
    let seed = encode_component(&format!("{}-{}", query, sig));
    vec![
        ImageCandidate::new(format!("https://picsum.photos/seed/gm6-{}/1080/1080", seed)),
        ImageCandidate::new(format!("https://picsum.photos/1080/1080?random={}", sig)),
        ImageCandidate::new(format!(
            "https://loremflickr.com/1080/1080/{}?lock={}",
            tags, sig
        )),
    ]
}

/// Synthesize live backdrop candidates for a theme.
///
/// Each theme query is expanded with a rotating flavor suffix, and each
/// variant contributes `per_query` candidates whose URLs are seeded by
/// `request_seed` plus a running index, so repeated requests with the same
/// seed produce the same pool.
pub fn live_candidates(
    theme: Option<Theme>,
    per_query: usize,
    request_seed: u64,
) -> Vec<BackgroundDescriptor> {
    let stored_theme = theme.unwrap_or(Theme::Sunrise);
    let mut variants = Vec::new();
    for (index, query) in theme_queries(theme).iter().enumerate() {
        variants.push(query.to_string());
        variants.push(format!("{}, {}", query, QUERY_FLAVORS[index % QUERY_FLAVORS.len()]));
    }

    let mut candidates = Vec::with_capacity(variants.len() * per_query);
    for (variant_index, query) in variants.iter().enumerate() {
        for slot in 0..per_query {
            let index = variant_index * per_query + slot;
            let urls = live_url_candidates(query, request_seed + index as u64);
            candidates.push(BackgroundDescriptor {
                id: format!("live-{}-{}-{}", stored_theme, request_seed, index),
                image_url: urls[0].url.clone(),
                fallback_urls: urls[1..].iter().map(|c| c.url.clone()).collect(),
                candidates: urls,
                theme: stored_theme,
                text_safe_area: SafeArea::default(),
                preferred_text_color: if stored_theme == Theme::Flower {
                    TextColorPref::Dark
                } else {
                    TextColorPref::Light
                },
            });
        }
    }
    candidates
}

/// Live candidates first, curated catalog as the tail of the pool.
pub fn background_pool(
    theme: Option<Theme>,
    request_seed: u64,
) -> Vec<BackgroundDescriptor> {
    let mut pool = live_candidates(theme, 3, request_seed);
    pool.extend(backdrops_by_theme(theme));
    pool
}

/// A date-bound festival override.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FestivalDay {
    pub theme: Theme,
    pub name: &'static str,
}

/// Festival theme for a calendar date, if any.
pub fn festival_for_date(date: NaiveDate) -> Option<FestivalDay> {
    match (date.month(), date.day()) {
        (1, 1) => Some(FestivalDay {
            theme: Theme::Festival,
            name: "元旦",
        }),
        (2, 14) => Some(FestivalDay {
            theme: Theme::Festival,
            name: "情人節",
        }),
        (10, 10) => Some(FestivalDay {
            theme: Theme::Festival,
            name: "雙十節",
        }),
        _ => None,
    }
}

/// Pick a random backdrop, avoiding recently used ids when possible.
pub fn pick_random<'a, R: Rng>(
    pool: &'a [BackgroundDescriptor],
    exclude_ids: &[String],
    rng: &mut R,
) -> Option<&'a BackgroundDescriptor> {
    let fresh: Vec<&BackgroundDescriptor> = pool
        .iter()
        .filter(|bg| !exclude_ids.contains(&bg.id))
        .collect();
    if fresh.is_empty() {
        pool.choose(rng)
    } else {
        fresh.choose(rng).copied()
    }
}
