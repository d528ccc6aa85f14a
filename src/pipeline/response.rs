//! Response interpretation: raw HTTP result → one [`GenerationOutcome`].
//!
//! ## Classification rules
//!
//! | Response                                   | Outcome                          |
//! |--------------------------------------------|----------------------------------|
//! | transport failed                           | `Failure { Network }`            |
//! | status outside 200–299                     | `Failure { RemoteError }`        |
//! | `Content-Type` contains `pdf`              | `Success { whole body }`         |
//! | JSON with `url` / `downloadUrl`            | fetch it once, classify again    |
//! | anything else                              | `Failure { MalformedResponse }`  |
//!
//! The service is trusted for payload correctness once the status is a
//! success: a PDF-typed body without the `%PDF-` signature is logged and
//! still returned.
//!
//! Only one indirection is followed; a pointer that leads to another pointer
//! is treated as malformed rather than chased.

use crate::config::GeneratorConfig;
use crate::output::{FailureKind, GenerationFailure, GenerationOutcome};
use crate::pipeline::request::WireRequest;
use crate::pipeline::transport::{RawResponse, Transport, TransportError};
use reqwest::Url;
use tracing::{debug, info, warn};

/// Maximum characters of a server error body kept in the failure message.
pub const MAX_ERROR_CHARS: usize = 300;

/// JSON fields that may carry the location of the finished PDF, in
/// precedence order.
const POINTER_FIELDS: &[&str] = &["url", "downloadUrl"];

/// Result of classifying a single response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// The body is the PDF.
    Pdf(Vec<u8>),
    /// The body points at the PDF.
    Pointer(Url),
    /// Terminal failure.
    Failed(GenerationFailure),
}

/// Classify one response without following pointers. Relative pointers are
/// resolved against `base`.
pub fn classify(response: RawResponse, base: &Url) -> Classification {
    if !response.is_success() {
        let body = String::from_utf8_lossy(&response.body);
        let body = body.trim();
        let message = if body.is_empty() {
            format!("HTTP {}", response.status)
        } else {
            truncate_message(body)
        };
        warn!("Rendering service answered HTTP {}", response.status);
        return Classification::Failed(GenerationFailure::new(FailureKind::RemoteError, message));
    }

    let content_type = response
        .content_type
        .as_deref()
        .unwrap_or_default()
        .to_ascii_lowercase();

    if content_type.contains("pdf") {
        if !response.body.starts_with(b"%PDF-") {
            warn!(
                "Response declared as '{}' but body ({} bytes) lacks the %PDF- signature",
                content_type,
                response.body.len()
            );
        }
        return Classification::Pdf(response.body);
    }

    let json: serde_json::Value = match serde_json::from_slice(&response.body) {
        Ok(v) => v,
        Err(e) => {
            debug!("Response body is not JSON: {}", e);
            return malformed(format!(
                "expected a PDF or a JSON pointer, got '{}'",
                if content_type.is_empty() {
                    "no content type"
                } else {
                    content_type.as_str()
                }
            ));
        }
    };

    // An empty field does not shadow a later one.
    let Some(raw) = POINTER_FIELDS.iter().find_map(|field| {
        json.get(field)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }) else {
        return malformed("JSON response does not contain a non-empty 'url' or 'downloadUrl' field");
    };

    match base.join(raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Classification::Pointer(url),
        Ok(url) => malformed(format!("unsupported PDF location scheme '{}'", url.scheme())),
        Err(e) => malformed(format!("invalid PDF location '{raw}': {e}")),
    }
}

fn malformed(message: impl Into<String>) -> Classification {
    Classification::Failed(GenerationFailure::new(
        FailureKind::MalformedResponse,
        message,
    ))
}

/// Keep the first [`MAX_ERROR_CHARS`] characters, marking the cut with `...`.
pub fn truncate_message(body: &str) -> String {
    match body.char_indices().nth(MAX_ERROR_CHARS) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}

fn network_failure(e: &TransportError, url: &Url) -> GenerationOutcome {
    let host = url.host_str().unwrap_or("the rendering service");
    let message = if e.timed_out {
        format!("request to {host} timed out: {e}")
    } else {
        format!("could not reach {host}: {e}")
    };
    GenerationOutcome::failure(FailureKind::Network, message)
}

/// Turn the result of the generation request into an outcome, fetching the
/// PDF from a second location when the service answers with a pointer.
pub async fn interpret<T: Transport>(
    result: Result<RawResponse, TransportError>,
    transport: &T,
    config: &GeneratorConfig,
) -> GenerationOutcome {
    let response = match result {
        Ok(r) => r,
        Err(e) => {
            warn!("Rendering request failed: {}", e);
            return network_failure(&e, &config.endpoint);
        }
    };

    let url = match classify(response, &config.endpoint) {
        Classification::Pdf(pdf_bytes) => return GenerationOutcome::Success { pdf_bytes },
        Classification::Failed(f) => return GenerationOutcome::Failure(f),
        Classification::Pointer(url) => url,
    };

    info!("Fetching finished PDF from {}", url);
    if let Some(ref cb) = config.progress_callback {
        cb.on_indirection(url.as_str());
    }

    // Never hand the token to a different origin.
    let token = config
        .auth_token
        .clone()
        .filter(|_| url.origin() == config.endpoint.origin());

    let second = match transport.execute(WireRequest::get(url.clone(), token)).await {
        Ok(r) => r,
        Err(e) => {
            warn!("Fetching {} failed: {}", url, e);
            return network_failure(&e, &url);
        }
    };

    match classify(second, &url) {
        Classification::Pdf(pdf_bytes) => GenerationOutcome::Success { pdf_bytes },
        Classification::Failed(f) => GenerationOutcome::Failure(f),
        Classification::Pointer(next) => GenerationOutcome::failure(
            FailureKind::MalformedResponse,
            format!("PDF location {url} pointed to yet another location ({next})"),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://render.example.com/webhook/pdf").unwrap()
    }

    fn resp(status: u16, content_type: Option<&str>, body: &[u8]) -> RawResponse {
        RawResponse {
            status,
            content_type: content_type.map(str::to_string),
            body: body.to_vec(),
        }
    }

    #[test]
    fn pdf_body_is_returned_exactly() {
        let body = b"%PDF-1.7\n...binary...\n%%EOF".to_vec();
        let c = classify(resp(200, Some("application/pdf"), &body), &base());
        assert_eq!(c, Classification::Pdf(body));
    }

    #[test]
    fn pdf_content_type_with_parameters() {
        let c = classify(
            resp(200, Some("Application/PDF; charset=binary"), b"%PDF-1.4"),
            &base(),
        );
        assert!(matches!(c, Classification::Pdf(_)));
    }

    #[test]
    fn pdf_signature_mismatch_still_succeeds() {
        let c = classify(resp(200, Some("application/pdf"), b"<html>oops</html>"), &base());
        assert_eq!(c, Classification::Pdf(b"<html>oops</html>".to_vec()));
    }

    #[test]
    fn server_error_body_truncated_to_300_chars() {
        let body = "server exploded".repeat(50);
        let c = classify(resp(500, Some("text/plain"), body.as_bytes()), &base());
        let Classification::Failed(f) = c else {
            panic!("expected failure, got {c:?}")
        };
        assert_eq!(f.kind, FailureKind::RemoteError);
        assert_eq!(f.message, format!("{}...", &body[..300]));
    }

    #[test]
    fn short_error_body_kept_whole() {
        let c = classify(resp(404, None, b"no such webhook"), &base());
        assert_eq!(
            c,
            Classification::Failed(GenerationFailure::new(
                FailureKind::RemoteError,
                "no such webhook"
            ))
        );
    }

    #[test]
    fn empty_error_body_reports_status() {
        let Classification::Failed(f) = classify(resp(502, None, b""), &base()) else {
            panic!()
        };
        assert_eq!(f.message, "HTTP 502");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let body = "é".repeat(301);
        let t = truncate_message(&body);
        assert_eq!(t.chars().count(), 303);
        assert!(t.ends_with("..."));
        assert_eq!(truncate_message(&"x".repeat(300)), "x".repeat(300));
    }

    #[test]
    fn json_url_pointer() {
        let c = classify(
            resp(200, Some("application/json"), br#"{"url":"https://cdn.example.com/a.pdf"}"#),
            &base(),
        );
        assert_eq!(
            c,
            Classification::Pointer(Url::parse("https://cdn.example.com/a.pdf").unwrap())
        );
    }

    #[test]
    fn json_download_url_relative_pointer() {
        let c = classify(
            resp(200, Some("application/json"), br#"{"downloadUrl":"/files/42.pdf"}"#),
            &base(),
        );
        assert_eq!(
            c,
            Classification::Pointer(Url::parse("https://render.example.com/files/42.pdf").unwrap())
        );
    }

    #[test]
    fn empty_url_falls_through_to_download_url() {
        let c = classify(
            resp(
                200,
                Some("application/json"),
                br#"{"url":"  ","downloadUrl":"https://cdn.example.com/a.pdf"}"#,
            ),
            &base(),
        );
        assert_eq!(
            c,
            Classification::Pointer(Url::parse("https://cdn.example.com/a.pdf").unwrap())
        );
    }

    #[test]
    fn url_takes_precedence_over_download_url() {
        let c = classify(
            resp(
                200,
                None,
                br#"{"url":"/first.pdf","downloadUrl":"/second.pdf"}"#,
            ),
            &base(),
        );
        assert_eq!(
            c,
            Classification::Pointer(Url::parse("https://render.example.com/first.pdf").unwrap())
        );
    }

    #[test]
    fn json_without_pointer_is_malformed() {
        let c = classify(
            resp(200, Some("application/json"), br#"{"status":"ok"}"#),
            &base(),
        );
        assert!(matches!(
            c,
            Classification::Failed(GenerationFailure {
                kind: FailureKind::MalformedResponse,
                ..
            })
        ));
    }

    #[test]
    fn non_json_non_pdf_is_malformed() {
        let c = classify(resp(200, Some("text/html"), b"<html></html>"), &base());
        let Classification::Failed(f) = c else { panic!() };
        assert_eq!(f.kind, FailureKind::MalformedResponse);
        assert!(f.message.contains("text/html"));
    }

    #[test]
    fn non_http_pointer_is_malformed() {
        let c = classify(
            resp(200, None, br#"{"url":"file:///etc/passwd"}"#),
            &base(),
        );
        let Classification::Failed(f) = c else { panic!() };
        assert_eq!(f.kind, FailureKind::MalformedResponse);
    }
}
