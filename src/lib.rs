//! # Amanecer - Greeting-Card Composition Engine
//!
//! Amanecer composes 1080×1080 greeting-card images: a themed backdrop, a
//! large greeting, a blessing fitted by a tone-aware placement search, and an
//! optional signature. Every composition also yields an editable scene that
//! re-renders deterministically without network access.
//!
//! ## Quick Start
//!
//! ```no_run
//! use amanecer::{
//!     background, quotes,
//!     compose::Composer,
//!     fonts::FontStore,
//!     settings::StyleSettings,
//! };
//!
//! # async fn demo() -> amanecer::Result<()> {
//! let fonts = FontStore::new();
//! let composer = Composer::new(&fonts)?;
//!
//! let pool = background::background_pool(None, 42);
//! let backdrop = pool.first().cloned().unwrap_or_else(background::BackgroundDescriptor::fallback);
//! let blessings = quotes::default_blessings();
//!
//! let composition = composer
//!     .compose(&backdrop, &blessings[0], &StyleSettings::default())
//!     .await?;
//! let jpeg = composition.to_jpeg()?;
//! # let _ = jpeg;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`background`] | Backdrop catalog and live candidate synthesis |
//! | [`quotes`] | Blessing supply and length bucketing |
//! | [`fetch`] | Image fetching with source health tracking |
//! | [`fonts`] | Typeface registry and text rasterization |
//! | [`typeset`] | Density presets, wrapping and text fitting |
//! | [`tone`] | Region luminance sampling |
//! | [`palette`] | Deterministic palette selection |
//! | [`compose`] | Scene composition and drawing |
//! | [`rerender`] | Offline scene re-rendering |
//! | [`scene`] | The editable scene model |
//! | [`error`] | Error types |

pub mod background;
pub mod compose;
pub mod error;
pub mod fetch;
pub mod fonts;
pub mod geometry;
pub mod logging;
pub mod palette;
pub mod quotes;
pub mod rerender;
pub mod scene;
pub mod settings;
pub mod tone;
pub mod typeset;

// Re-exports for convenience
pub use compose::{Composer, Composition};
pub use error::{AmanecerError, Result};
pub use scene::Scene;
pub use settings::StyleSettings;
