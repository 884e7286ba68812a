//! # Error Types
//!
//! This module defines error types used throughout the framey library.
//!
//! Failures that only affect an optional part of a card (one link code, the
//! weather icon) are caught by the pipeline and degrade to an empty slot.
//! Everything else aborts the render and reaches the caller.

use thiserror::Error;

/// Main error type for framey operations
#[derive(Debug, Error)]
pub enum FrameyError {
    /// Retrieving a remote asset failed (transport error or non-success status)
    #[error("Fetch failed for {url}: {reason}")]
    FetchFailed { url: String, reason: String },

    /// Link data does not fit in a QR code at the configured error correction
    #[error("Encoding capacity exceeded for {url}")]
    EncodingCapacityExceeded { url: String },

    /// The rendering session could not produce a bitmap
    #[error("Rasterization unavailable: {0}")]
    RasterizationUnavailable(String),

    /// The markup document could not be parsed
    #[error("Invalid markup: {0}")]
    InvalidMarkup(String),

    /// Palette quantization was given unusable input
    #[error("Palette quantization error: {0}")]
    PaletteQuantization(String),

    /// Template parse error
    #[error("Template error: {0}")]
    Template(String),

    /// Image decoding/encoding error
    #[error("Image error: {0}")]
    Image(String),

    /// An upstream record source failed
    #[error("Source error: {0}")]
    Source(String),

    /// Invalid configuration
    #[error("Config error: {0}")]
    Config(String),

    /// A blocking render task panicked or was cancelled
    #[error("Task error: {0}")]
    Task(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<image::ImageError> for FrameyError {
    fn from(e: image::ImageError) -> Self {
        FrameyError::Image(e.to_string())
    }
}

impl FrameyError {
    /// Whether the error only affects an optional card element.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, FrameyError::EncodingCapacityExceeded { .. })
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, FrameyError>;
