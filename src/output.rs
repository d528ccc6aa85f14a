//! Result types produced by the pipeline.

use crate::error::RejectReason;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a failed round-trip to the rendering service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The service could not be reached (DNS, TLS, refused, reset, timeout).
    Network,
    /// The service answered with a non-success HTTP status.
    RemoteError,
    /// Success status, but the body was neither a PDF nor a usable pointer.
    MalformedResponse,
}

impl FailureKind {
    /// Short guidance shown alongside the failure message.
    pub fn hint(self) -> &'static str {
        match self {
            FailureKind::Network => {
                "Check your network connection, the endpoint URL, and the service's \
                 CORS/allowed-origin settings."
            }
            FailureKind::RemoteError => "The rendering service rejected the request.",
            FailureKind::MalformedResponse => {
                "The rendering service returned a response that does not contain a PDF."
            }
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::Network => "network error",
            FailureKind::RemoteError => "remote error",
            FailureKind::MalformedResponse => "malformed response",
        };
        f.write_str(s)
    }
}

/// A classified failure of one generation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl GenerationFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for GenerationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Couldn't generate the PDF ({}): {}", self.kind, self.message)?;
        write!(f, "\n{}", self.kind.hint())
    }
}

impl std::error::Error for GenerationFailure {}

/// Terminal result of one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// The finished PDF.
    Success { pdf_bytes: Vec<u8> },
    /// The round-trip failed; nothing to save.
    Failure(GenerationFailure),
}

impl GenerationOutcome {
    pub(crate) fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        GenerationOutcome::Failure(GenerationFailure::new(kind, message))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, GenerationOutcome::Success { .. })
    }

    /// Convert into a `Result`, for callers that want `?`.
    pub fn into_result(self) -> Result<Vec<u8>, GenerationFailure> {
        match self {
            GenerationOutcome::Success { pdf_bytes } => Ok(pdf_bytes),
            GenerationOutcome::Failure(f) => Err(f),
        }
    }
}

/// One refused candidate image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRejection {
    /// Position of the file in the submitted batch (zero-based).
    pub input_index: usize,
    /// Original filename.
    pub name: String,
    pub reason: RejectReason,
}

/// Summary of one ingestion batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    /// Filenames of the admitted images, in document order.
    pub accepted: Vec<String>,
    /// Refused files, in input order.
    pub rejected: Vec<ImageRejection>,
}

impl IngestReport {
    pub fn accepted_count(&self) -> usize {
        self.accepted.len()
    }

    pub fn has_rejections(&self) -> bool {
        !self.rejected.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_display_carries_hint() {
        let f = GenerationFailure::new(FailureKind::Network, "connection refused");
        let msg = f.to_string();
        assert!(msg.contains("connection refused"));
        assert!(msg.contains("CORS"));
    }

    #[test]
    fn into_result_maps_variants() {
        let ok = GenerationOutcome::Success {
            pdf_bytes: b"%PDF-1.7".to_vec(),
        };
        assert_eq!(ok.into_result().unwrap(), b"%PDF-1.7".to_vec());

        let err = GenerationOutcome::failure(FailureKind::MalformedResponse, "no url");
        assert_eq!(err.into_result().unwrap_err().kind, FailureKind::MalformedResponse);
    }

    #[test]
    fn report_counts() {
        let report = IngestReport {
            accepted: vec!["a.png".into()],
            rejected: vec![ImageRejection {
                input_index: 1,
                name: "b.gif".into(),
                reason: RejectReason::InvalidType {
                    mime_type: "image/gif".into(),
                    allowed: vec!["image/png".into()],
                },
            }],
        };
        assert_eq!(report.accepted_count(), 1);
        assert!(report.has_rejections());
    }
}
