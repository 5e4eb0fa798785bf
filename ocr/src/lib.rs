//! Screen text recognition for UI automation.
//!
//! Turns a raster frame into a set of located text regions ([`TextMatch`])
//! and layers case-insensitive matching helpers on top. Backends are
//! pluggable through the [`OcrEngine`] trait; two concrete engines ship
//! behind cargo features because both link native libraries:
//!
//! - `paddle`: PP-OCR detection + recognition via `rust-paddle-ocr`.
//! - `tesseract`: classical recognition via the `tesseract` crate, with
//!   word-level boxes and confidences parsed from TSV output.

mod engine;
mod result;

#[cfg(feature = "paddle")]
mod paddle;
#[cfg(feature = "tesseract")]
mod tesseract;

pub use engine::{DEFAULT_MIN_CONFIDENCE, OcrEngine, matches_target};
pub use result::{BoundingBox, TextMatch, confidence_from_percent};

#[cfg(feature = "paddle")]
pub use paddle::{ModelConfig, OcrOptions, PaddleEngine};
#[cfg(feature = "tesseract")]
pub use tesseract::TesseractEngine;

/// Crate-wide result type.
pub type OcrResult<T> = anyhow::Result<T>;
