//! Background image fetching with per-source health tracking.
//!
//! Placeholder-image services flake independently of each other, so each
//! candidate URL is classified by source and the sources carry a health
//! record: repeated failures penalize a source's weight for a cooldown
//! window, which demotes (never removes) its candidates in the weighted
//! try-order. Fetching walks the ordered candidates until one decodes.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use image::DynamicImage;
use log::{debug, warn};
use rand::Rng;

use crate::background::BackgroundDescriptor;
use crate::error::{AmanecerError, Result};

/// Consecutive failures before a source is penalized.
const FAILURE_THRESHOLD: u32 = 3;
/// How long a penalized source stays demoted.
const PENALTY_WINDOW: Duration = Duration::from_secs(10 * 60);
/// Weight of a penalized source relative to a healthy one.
const PENALIZED_WEIGHT: f64 = 0.2;
/// Floor applied to every weight so no candidate is ever unreachable.
const MIN_WEIGHT: f64 = 0.01;

/// Image hosting services the engine knows how to track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageSource {
    UnsplashFeatured,
    UnsplashSource,
    Picsum,
    Loremflickr,
    FallbackStatic,
}

impl ImageSource {
    /// Classify a URL by hosting service.
    pub fn from_url(url: &str) -> Self {
        if url.contains("source.unsplash.com/featured") {
            ImageSource::UnsplashFeatured
        } else if url.contains("source.unsplash.com") {
            ImageSource::UnsplashSource
        } else if url.contains("picsum.photos") {
            ImageSource::Picsum
        } else if url.contains("loremflickr.com") {
            ImageSource::Loremflickr
        } else {
            ImageSource::FallbackStatic
        }
    }

    /// Static fallbacks are exempt from health tracking: they are the last
    /// resort and must never be demoted.
    fn tracked(&self) -> bool {
        !matches!(self, ImageSource::FallbackStatic)
    }
}

/// Records fetch outcomes per source and derives try-order weights.
pub trait SourceHealthTracker {
    fn record(&self, source: ImageSource, success: bool);
    fn weight(&self, source: ImageSource) -> f64;
}

#[derive(Debug, Clone, Copy, Default)]
struct SourceHealth {
    consecutive_failures: u32,
    penalized_until: Option<Instant>,
}

/// Process-local health state. Last writer wins under concurrent updates,
/// which is acceptable for an advisory weighting signal.
#[derive(Debug, Default)]
pub struct InMemoryHealth {
    state: Mutex<HashMap<ImageSource, SourceHealth>>,
}

impl InMemoryHealth {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SourceHealthTracker for InMemoryHealth {
    fn record(&self, source: ImageSource, success: bool) {
        if !source.tracked() {
            return;
        }
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let entry = state.entry(source).or_default();
        if success {
            *entry = SourceHealth::default();
            return;
        }
        entry.consecutive_failures += 1;
        if entry.consecutive_failures >= FAILURE_THRESHOLD {
            entry.penalized_until = Some(Instant::now() + PENALTY_WINDOW);
        }
    }

    fn weight(&self, source: ImageSource) -> f64 {
        if !source.tracked() {
            return 1.0;
        }
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        match state.get(&source).and_then(|h| h.penalized_until) {
            Some(until) if until > Instant::now() => PENALIZED_WEIGHT,
            _ => 1.0,
        }
    }
}

/// A candidate URL paired with its classified source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchCandidate {
    pub url: String,
    pub source: ImageSource,
}

impl FetchCandidate {
    pub fn new(url: String) -> Self {
        let source = ImageSource::from_url(&url);
        Self { url, source }
    }
}

/// Order candidates by weighted sampling without replacement.
///
/// Healthy sources are likely to come first; penalized sources sink toward
/// the tail but are never dropped.
pub fn order_by_weight<T: SourceHealthTracker, R: Rng>(
    candidates: Vec<FetchCandidate>,
    tracker: &T,
    rng: &mut R,
) -> Vec<FetchCandidate> {
    let mut pool = candidates;
    let mut ordered = Vec::with_capacity(pool.len());

    while !pool.is_empty() {
        let weights: Vec<f64> = pool
            .iter()
            .map(|c| tracker.weight(c.source).max(MIN_WEIGHT))
            .collect();
        let total: f64 = weights.iter().sum();
        let mut roll = rng.random::<f64>() * total;
        let mut picked = pool.len() - 1;
        for (index, weight) in weights.iter().enumerate() {
            roll -= weight;
            if roll <= 0.0 {
                picked = index;
                break;
            }
        }
        ordered.push(pool.remove(picked));
    }

    ordered
}

/// Decode a `data:` URL into an image.
pub fn decode_data_url(url: &str) -> Result<DynamicImage> {
    let payload = url
        .split_once(";base64,")
        .map(|(_, rest)| rest)
        .ok_or_else(|| AmanecerError::Image("Data URL is not base64-encoded".to_string()))?;
    let bytes = BASE64
        .decode(payload)
        .map_err(|e| AmanecerError::Image(format!("Failed to decode data URL: {}", e)))?;
    image::load_from_memory(&bytes)
        .map_err(|e| AmanecerError::Image(format!("Failed to decode image: {}", e)))
}

/// Fetches backdrop images over HTTP, recording source health as it goes.
pub struct ImageFetcher<T: SourceHealthTracker = InMemoryHealth> {
    client: reqwest::Client,
    tracker: T,
}

impl ImageFetcher<InMemoryHealth> {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("amanecer/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AmanecerError::Image(format!("HTTP client error: {}", e)))?;
        Ok(Self {
            client,
            tracker: InMemoryHealth::new(),
        })
    }
}

impl<T: SourceHealthTracker> ImageFetcher<T> {
    pub fn with_tracker(client: reqwest::Client, tracker: T) -> Self {
        Self { client, tracker }
    }

    pub fn tracker(&self) -> &T {
        &self.tracker
    }

    /// Fetch one candidate URL and decode it.
    async fn fetch_one(&self, url: &str) -> Result<DynamicImage> {
        if url.starts_with("data:") {
            return decode_data_url(url);
        }
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AmanecerError::Image(format!("Failed to download {}: {}", url, e)))?;
        if !response.status().is_success() {
            return Err(AmanecerError::Image(format!(
                "Failed to download {}: HTTP {}",
                url,
                response.status()
            )));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| AmanecerError::Image(format!("Failed to read image data: {}", e)))?;
        image::load_from_memory(&bytes)
            .map_err(|e| AmanecerError::Image(format!("Failed to decode image: {}", e)))
    }

    /// Try a backdrop's candidate URLs in weighted order until one decodes.
    ///
    /// Every attempt's outcome feeds back into the health tracker. Returns
    /// `None` when every candidate fails; the caller composes on a flat
    /// fill in that case.
    pub async fn load_background(&self, background: &BackgroundDescriptor) -> Option<DynamicImage> {
        let candidates: Vec<FetchCandidate> = background
            .candidate_urls()
            .into_iter()
            .map(FetchCandidate::new)
            .collect();
        let ordered = order_by_weight(candidates, &self.tracker, &mut rand::rng());

        for candidate in &ordered {
            match self.fetch_one(&candidate.url).await {
                Ok(image) => {
                    debug!("Loaded backdrop {} from {}", background.id, candidate.url);
                    self.tracker.record(candidate.source, true);
                    return Some(image);
                }
                Err(e) => {
                    warn!("Backdrop candidate failed: {}", e);
                    self.tracker.record(candidate.source, false);
                }
            }
        }

        None
    }
}
