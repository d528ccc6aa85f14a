//! Error types for the edgequake-pdfgen library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`PdfGenError`]: **Fatal** for the current action: the configuration is
//!   unusable, the document is not submittable, or the PDF could not be
//!   written. Returned as `Err(PdfGenError)`. Validation variants are always
//!   raised before the rendering service is contacted.
//!
//! * [`RejectReason`]: **Non-fatal**: a single candidate image was refused
//!   (wrong type, too large, undecodable, over the limit) but the rest of the
//!   batch is fine. Stored inside [`crate::output::ImageRejection`] so callers
//!   can show a per-file message next to the accepted images.
//!
//! Failures of the remote round-trip itself are neither of these: they are
//! classified into [`crate::output::GenerationFailure`] by the response
//! interpreter and returned inside a [`crate::output::GenerationOutcome`].

use crate::output::GenerationFailure;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-pdfgen library.
#[derive(Debug, Error)]
pub enum PdfGenError {
    // ── Configuration errors ──────────────────────────────────────────────
    /// No rendering endpoint was configured.
    #[error(
        "No rendering endpoint configured.\n\
Set PDFGEN_ENDPOINT_URL or pass --endpoint <URL>."
    )]
    MissingEndpoint,

    /// The endpoint is not an absolute http(s) URL.
    #[error("Invalid rendering endpoint '{url}': {reason}")]
    InvalidEndpoint { url: String, reason: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Validation errors ─────────────────────────────────────────────────
    /// Body text is shorter than the configured minimum.
    #[error("Text is too short: {len} characters (minimum {min})")]
    TextTooShort { len: usize, min: usize },

    /// Body text is longer than the configured maximum.
    #[error("Text is too long: {len} characters (maximum {max})")]
    TextTooLong { len: usize, max: usize },

    /// The document holds more images than allowed.
    #[error("Too many images: {count} (maximum {max})")]
    TooManyImages { count: usize, max: usize },

    /// An image in the document no longer satisfies the ingestion limits.
    #[error("Image '{name}' cannot be submitted: {reason}")]
    ImageRejected { name: String, reason: RejectReason },

    /// A render option is outside its allowed domain.
    #[error("Invalid render option: {0}")]
    InvalidOption(String),

    /// Another generation is still outstanding.
    #[error("A PDF generation is already in progress; wait for it to finish")]
    SubmissionInProgress,

    // ── I/O errors ────────────────────────────────────────────────────────
    /// A candidate image path does not exist or is unreadable.
    #[error("Image file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Could not create or write the output PDF file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Remote failures (file-writing entry point only) ───────────────────
    /// The rendering round-trip ended in a classified failure.
    #[error("{0}")]
    Generation(GenerationFailure),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PdfGenError {
    /// `true` for errors that make the feature unusable until the
    /// configuration is fixed.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            PdfGenError::MissingEndpoint
                | PdfGenError::InvalidEndpoint { .. }
                | PdfGenError::InvalidConfig(_)
        )
    }

    /// `true` for local, pre-submission problems the user can fix by editing
    /// the document.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            PdfGenError::TextTooShort { .. }
                | PdfGenError::TextTooLong { .. }
                | PdfGenError::TooManyImages { .. }
                | PdfGenError::ImageRejected { .. }
                | PdfGenError::InvalidOption(_)
                | PdfGenError::SubmissionInProgress
        )
    }
}

/// Why a single candidate image was not admitted.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectReason {
    /// The document already holds the maximum number of images.
    #[error("limit reached (maximum {max} images)")]
    LimitReached { max: usize },

    /// MIME type outside the allow-list, which is carried along.
    #[error("invalid type '{mime_type}'; allowed: {}", .allowed.join(", "))]
    InvalidType {
        mime_type: String,
        allowed: Vec<String>,
    },

    /// File exceeds the per-image size limit.
    #[error("too large ({size} bytes, maximum {max} bytes)")]
    TooLarge { size: u64, max: u64 },

    /// The bytes could not be read or are not a readable image.
    #[error("decode error: {detail}")]
    DecodeFailed { detail: String },
}
