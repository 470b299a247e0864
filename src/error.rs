//! # Error Types
//!
//! This module defines error types used throughout the amanecer library.

use thiserror::Error;

/// Main error type for amanecer operations
#[derive(Debug, Error)]
pub enum AmanecerError {
    /// Image decoding or encoding error
    #[error("Image error: {0}")]
    Image(String),

    /// Font loading error
    #[error("Font error: {0}")]
    Font(String),

    /// Composition pipeline error
    #[error("Compose error: {0}")]
    Compose(String),

    /// Scene loading or validation error
    #[error("Scene error: {0}")]
    Scene(String),

    /// JSON error wrapper
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for amanecer operations
pub type Result<T> = std::result::Result<T, AmanecerError>;
