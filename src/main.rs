//! # Amanecer CLI
//!
//! Command-line interface for composing and re-rendering greeting cards.
//!
//! ## Usage
//!
//! ```bash
//! # Compose a card with defaults (random backdrop and blessing)
//! amanecer compose --output card.jpg
//!
//! # Compose with a registered font, a signature and a saved scene
//! amanecer compose --font "思源黑體 (TC)=fonts/NotoSansTC.ttf" \
//!     --name 小美 --auto-sign --scene-out scene.json --output card.jpg
//!
//! # Re-render a saved scene with a new blessing text
//! amanecer rerender --scene scene.json --blessing-text "新的祝福" --output card.jpg
//! ```

use std::path::PathBuf;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use clap::{Parser, Subcommand};

use amanecer::background::{self, BackgroundDescriptor, Theme};
use amanecer::compose::Composer;
use amanecer::fonts::FontStore;
use amanecer::logging::{default_level, init_logging};
use amanecer::quotes;
use amanecer::rerender::{rerender, RerenderOverrides};
use amanecer::scene::Scene;
use amanecer::settings::{DensityMode, SignatureMode, SignaturePosition, StyleSettings};
use amanecer::{AmanecerError, Result};

/// Amanecer - greeting-card composition utility
#[derive(Parser, Debug)]
#[command(name = "amanecer")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true, default_value_t = default_level().to_string())]
    log_level: String,

    /// Only log errors
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compose a new card from a backdrop and a blessing
    Compose {
        /// Output JPEG file
        #[arg(long, short, default_value = "card.jpg")]
        output: PathBuf,

        /// Write the editable scene JSON next to the image
        #[arg(long)]
        scene_out: Option<PathBuf>,

        /// Backdrop theme (sunrise, flower, mountain, festival; default
        /// follows the calendar)
        #[arg(long)]
        theme: Option<String>,

        /// Backdrop descriptor JSON file; skips the pool pick
        #[arg(long, conflicts_with = "theme")]
        background_file: Option<PathBuf>,

        /// Typography density (large, balanced, compact)
        #[arg(long, default_value = "balanced")]
        typography: String,

        /// Register a TTF/OTF font as NAME=PATH (repeatable)
        #[arg(long, value_name = "NAME=PATH")]
        font: Vec<String>,

        /// Blessing text (random from the pool when omitted)
        #[arg(long)]
        blessing: Option<String>,

        /// Import extra blessings from a .txt or .csv file
        #[arg(long)]
        quotes: Option<PathBuf>,

        /// Name used for the text signature
        #[arg(long)]
        name: Option<String>,

        /// Prefix the text signature with "- "
        #[arg(long)]
        auto_sign: bool,

        /// Signature image file (PNG/JPEG); switches the signature to image
        /// mode
        #[arg(long)]
        signature_image: Option<PathBuf>,

        /// Signature anchor (top-left, top-right, bottom-left,
        /// bottom-center, bottom-right)
        #[arg(long, default_value = "bottom-right")]
        signature_position: String,

        /// Seed for the live backdrop pool (current time when omitted)
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Re-render a saved scene without network access
    Rerender {
        /// Scene JSON produced by `compose`
        #[arg(long)]
        scene: PathBuf,

        /// Output JPEG file
        #[arg(long, short, default_value = "card.jpg")]
        output: PathBuf,

        /// Write the normalized scene JSON back out
        #[arg(long)]
        scene_out: Option<PathBuf>,

        /// Replace the blessing text
        #[arg(long)]
        blessing_text: Option<String>,

        /// Replace the background with an image file (PNG/JPEG)
        #[arg(long)]
        background: Option<PathBuf>,

        /// Register a TTF/OTF font as NAME=PATH (repeatable)
        #[arg(long, value_name = "NAME=PATH")]
        font: Vec<String>,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.quiet);

    match cli.command {
        Commands::Compose {
            output,
            scene_out,
            theme,
            background_file,
            typography,
            font,
            blessing,
            quotes: quotes_file,
            name,
            auto_sign,
            signature_image,
            signature_position,
            seed,
        } => {
            let fonts = load_fonts(&font)?;
            let composer = Composer::new(&fonts)?;

            let mut rng = rand::rng();
            let backdrop = match background_file {
                Some(path) => {
                    let raw = std::fs::read_to_string(&path)?;
                    serde_json::from_str::<BackgroundDescriptor>(&raw)?
                }
                None => {
                    let theme = parse_theme(theme.as_deref())?;
                    let seed =
                        seed.unwrap_or_else(|| chrono::Utc::now().timestamp_millis() as u64);
                    let pool = background::background_pool(theme, seed);
                    background::pick_random(&pool, &[], &mut rng)
                        .cloned()
                        .unwrap_or_else(BackgroundDescriptor::fallback)
                }
            };

            let blessing = pick_blessing(blessing, quotes_file.as_deref(), &backdrop, &mut rng)?;

            let settings = StyleSettings {
                typography: parse_typography(&typography)?,
                user_name: name,
                auto_add_signature: auto_sign,
                signature_mode: if signature_image.is_some() {
                    SignatureMode::Image
                } else {
                    SignatureMode::Text
                },
                signature_position: parse_position(&signature_position)?,
                signature_asset: signature_image
                    .as_deref()
                    .map(read_image_data_url)
                    .transpose()?,
                ..Default::default()
            };

            let composition = composer.compose(&backdrop, &blessing, &settings).await?;
            std::fs::write(&output, composition.to_jpeg()?)?;
            println!("Saved card to {}", output.display());

            if let Some(path) = scene_out {
                std::fs::write(&path, serde_json::to_vec_pretty(&composition.scene)?)?;
                println!("Saved scene to {}", path.display());
            }
        }

        Commands::Rerender {
            scene,
            output,
            scene_out,
            blessing_text,
            background,
            font,
        } => {
            let fonts = load_fonts(&font)?;
            let raw = std::fs::read_to_string(&scene)?;
            let scene: Scene = serde_json::from_str(&raw)?;

            let overrides = RerenderOverrides {
                blessing_text,
                background_data_url: background
                    .as_deref()
                    .map(read_image_data_url)
                    .transpose()?,
            };
            let composition = rerender(&scene, &overrides, &fonts)?;
            std::fs::write(&output, composition.to_jpeg()?)?;
            println!("Saved card to {}", output.display());

            if let Some(path) = scene_out {
                std::fs::write(&path, serde_json::to_vec_pretty(&composition.scene)?)?;
                println!("Saved scene to {}", path.display());
            }
        }
    }

    Ok(())
}

/// Register fonts given as NAME=PATH specs.
fn load_fonts(specs: &[String]) -> Result<FontStore> {
    let mut fonts = FontStore::new();
    for spec in specs {
        let (name, path) = spec.split_once('=').ok_or_else(|| {
            AmanecerError::Font(format!("Font spec '{}' is not NAME=PATH", spec))
        })?;
        fonts.register_file(name.trim(), path.trim().as_ref())?;
    }
    Ok(fonts)
}

fn parse_theme(theme: Option<&str>) -> Result<Option<Theme>> {
    let Some(theme) = theme else {
        // No explicit theme: festivals win on their dates, general otherwise.
        let today = chrono::Local::now().date_naive();
        return Ok(background::festival_for_date(today).map(|f| f.theme));
    };
    match theme {
        "general" => Ok(None),
        "sunrise" => Ok(Some(Theme::Sunrise)),
        "flower" => Ok(Some(Theme::Flower)),
        "mountain" => Ok(Some(Theme::Mountain)),
        "festival" => Ok(Some(Theme::Festival)),
        other => Err(AmanecerError::Compose(format!(
            "Unknown theme '{}'. Expected sunrise, flower, mountain, festival or general.",
            other
        ))),
    }
}

fn parse_typography(mode: &str) -> Result<DensityMode> {
    match mode {
        "large" => Ok(DensityMode::Large),
        "balanced" => Ok(DensityMode::Balanced),
        "compact" => Ok(DensityMode::Compact),
        other => Err(AmanecerError::Compose(format!(
            "Unknown typography mode '{}'. Expected large, balanced or compact.",
            other
        ))),
    }
}

fn parse_position(position: &str) -> Result<SignaturePosition> {
    match position {
        "top-left" => Ok(SignaturePosition::TopLeft),
        "top-right" => Ok(SignaturePosition::TopRight),
        "bottom-left" => Ok(SignaturePosition::BottomLeft),
        "bottom-center" => Ok(SignaturePosition::BottomCenter),
        "bottom-right" => Ok(SignaturePosition::BottomRight),
        other => Err(AmanecerError::Compose(format!(
            "Unknown signature position '{}'.",
            other
        ))),
    }
}

/// Pick the blessing: explicit text, or a random one from defaults plus any
/// imported file, bucketed by what the backdrop's safe area has room for.
fn pick_blessing<R: rand::Rng>(
    explicit: Option<String>,
    quotes_file: Option<&std::path::Path>,
    backdrop: &BackgroundDescriptor,
    rng: &mut R,
) -> Result<quotes::Blessing> {
    if let Some(text) = explicit {
        return Ok(quotes::Blessing::new("cli-blessing", "custom", &text));
    }

    let defaults = quotes::default_blessings();
    let imported = match quotes_file {
        Some(path) => {
            let raw = std::fs::read_to_string(path)?;
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            quotes::import_blessings(&file_name, &raw, &defaults)
        }
        None => Vec::new(),
    };

    let length = quotes::length_for_area(&backdrop.text_safe_area);
    let candidates = quotes::merged_by_length(&defaults, &imported, length);
    let pool = if candidates.is_empty() { &defaults } else { &candidates };
    quotes::pick_random(pool, &[], rng)
        .cloned()
        .ok_or_else(|| AmanecerError::Compose("No blessing available".to_string()))
}

/// Read an image file into a data URL for embedding in settings and scenes.
fn read_image_data_url(path: &std::path::Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    let mime = match path.extension().and_then(|e| e.to_str()) {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    };
    Ok(format!("data:{};base64,{}", mime, BASE64.encode(bytes)))
}
