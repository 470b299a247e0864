//! Logging setup for the CLI.

use env_logger::Builder;
use log::LevelFilter;

#[cfg(debug_assertions)]
pub fn default_level() -> &'static str {
    "debug"
}

#[cfg(not(debug_assertions))]
pub fn default_level() -> &'static str {
    "info"
}

/// Initialize env_logger at the given level. `RUST_LOG` still wins when set.
pub fn init_logging(level: &str, quiet: bool) {
    let level_filter = if quiet {
        LevelFilter::Error
    } else {
        match level.to_lowercase().as_str() {
            "trace" => LevelFilter::Trace,
            "debug" => LevelFilter::Debug,
            "info" => LevelFilter::Info,
            "warn" | "warning" => LevelFilter::Warn,
            "error" => LevelFilter::Error,
            "off" => LevelFilter::Off,
            _ => {
                eprintln!("Invalid log level '{}', using 'info'", level);
                LevelFilter::Info
            }
        }
    };

    let mut builder = Builder::new();
    builder.filter_level(level_filter);

    if let Ok(rust_log) = std::env::var("RUST_LOG") {
        builder.parse_filters(&rust_log);
    }

    builder.init();
}
