//! Configuration types for PDF generation.
//!
//! Everything the pipeline needs to know about the outside world lives in
//! [`GeneratorConfig`]: where the rendering service is, how to talk to it, and
//! the limits user content must respect. It is built once (via
//! [`GeneratorConfigBuilder`] or [`GeneratorConfig::from_env`]) and then shared
//! read-only by the request builder and the response interpreter.
//!
//! # Design choice: required endpoint, no `Default`
//! The endpoint has no sensible default, so `GeneratorConfig` deliberately does
//! not implement `Default`. A missing endpoint is reported by
//! [`GeneratorConfigBuilder::build`] before any submission is possible.

use crate::error::PdfGenError;
use crate::progress::ProgressCallback;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Environment variable holding the rendering endpoint URL.
pub const ENV_ENDPOINT: &str = "PDFGEN_ENDPOINT_URL";
/// Environment variable holding the optional bearer token.
pub const ENV_TOKEN: &str = "PDFGEN_TOKEN";
/// Environment variable selecting `post` or `get`.
pub const ENV_METHOD: &str = "PDFGEN_METHOD";
/// Environment variable overriding [`ContentLimits::max_images`].
pub const ENV_MAX_IMAGES: &str = "PDFGEN_MAX_IMAGES";
/// Environment variable overriding [`ContentLimits::max_image_bytes`].
pub const ENV_MAX_IMAGE_BYTES: &str = "PDFGEN_MAX_IMAGE_BYTES";
/// Environment variable overriding [`ContentLimits::max_text_chars`].
pub const ENV_MAX_TEXT_CHARS: &str = "PDFGEN_MAX_TEXT_CHARS";

/// Default MIME types accepted for uploaded images.
pub const DEFAULT_ALLOWED_MIME_TYPES: &[&str] = &["image/png", "image/jpeg", "image/webp"];

/// Limits every document must satisfy before it can be submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentLimits {
    /// Minimum body length in characters. Default: 20.
    pub min_text_chars: usize,
    /// Maximum body length in characters. Default: 10 000.
    pub max_text_chars: usize,
    /// Maximum number of images per document. Default: 10.
    pub max_images: usize,
    /// Maximum size of one image in bytes. Default: 10 MiB.
    pub max_image_bytes: u64,
    /// Maximum page margin in millimetres. Default: 50.
    pub max_margin_mm: f32,
    /// Accepted image MIME types. Default: PNG, JPEG, WebP.
    pub allowed_mime_types: Vec<String>,
}

impl Default for ContentLimits {
    fn default() -> Self {
        Self {
            min_text_chars: 20,
            max_text_chars: 10_000,
            max_images: 10,
            max_image_bytes: 10 * 1024 * 1024,
            max_margin_mm: 50.0,
            allowed_mime_types: DEFAULT_ALLOWED_MIME_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl ContentLimits {
    /// Whether `mime_type` is in the allow-list (case-insensitive, `image/jpg`
    /// treated as `image/jpeg`).
    pub fn allows_mime(&self, mime_type: &str) -> bool {
        let wanted = normalise_mime(mime_type);
        self.allowed_mime_types
            .iter()
            .any(|m| normalise_mime(m) == wanted)
    }
}

/// Lower-case a MIME type and fold the non-standard `image/jpg` alias.
pub(crate) fn normalise_mime(mime_type: &str) -> String {
    let m = mime_type.trim().to_ascii_lowercase();
    if m == "image/jpg" {
        "image/jpeg".to_string()
    } else {
        m
    }
}

/// How the generation request is put on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestMethod {
    /// `POST` with a JSON body. (default)
    #[default]
    Post,
    /// `GET` with every field URL-encoded into the query string.
    Get,
}

impl FromStr for RequestMethod {
    type Err = PdfGenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "post" => Ok(RequestMethod::Post),
            "get" => Ok(RequestMethod::Get),
            other => Err(PdfGenError::InvalidConfig(format!(
                "request method must be 'post' or 'get', got '{other}'"
            ))),
        }
    }
}

/// Immutable configuration for a [`crate::Generator`].
///
/// # Example
/// ```rust
/// use edgequake_pdfgen::{GeneratorConfig, RequestMethod};
///
/// let config = GeneratorConfig::builder()
///     .endpoint("https://render.example.com/webhook/pdf")
///     .auth_token("s3cret")
///     .method(RequestMethod::Post)
///     .max_images(5)
///     .build()
///     .unwrap();
/// assert_eq!(config.limits.max_images, 5);
/// ```
#[derive(Clone)]
pub struct GeneratorConfig {
    /// Rendering service endpoint (absolute http/https URL).
    pub endpoint: Url,

    /// Optional static token sent as `Authorization: Bearer <token>`.
    pub auth_token: Option<String>,

    /// Wire encoding of the request. Default: [`RequestMethod::Post`].
    pub method: RequestMethod,

    /// Validation limits for text, images and options.
    pub limits: ContentLimits,

    /// Number of images decoded at the same time during ingestion. Default: 4.
    ///
    /// Output order never depends on this value; it only bounds how many
    /// files are read and base64-encoded concurrently.
    pub decode_concurrency: usize,

    /// Optional progress observer.
    pub progress_callback: Option<ProgressCallback>,
}

impl fmt::Debug for GeneratorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorConfig")
            .field("endpoint", &self.endpoint.as_str())
            .field("auth_token", &self.auth_token.as_ref().map(|_| "<redacted>"))
            .field("method", &self.method)
            .field("limits", &self.limits)
            .field("decode_concurrency", &self.decode_concurrency)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn GenerationProgressCallback>"),
            )
            .finish()
    }
}

impl GeneratorConfig {
    /// Create a new builder for `GeneratorConfig`.
    pub fn builder() -> GeneratorConfigBuilder {
        GeneratorConfigBuilder::default()
    }

    /// Build a configuration from `PDFGEN_*` environment variables.
    ///
    /// Returns [`PdfGenError::MissingEndpoint`] when `PDFGEN_ENDPOINT_URL` is
    /// unset or empty.
    pub fn from_env() -> Result<Self, PdfGenError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`GeneratorConfig::from_env`] with an injectable variable
    /// lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, PdfGenError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut builder = Self::builder();
        if let Some(url) = get(ENV_ENDPOINT) {
            builder = builder.endpoint(url);
        }
        if let Some(token) = get(ENV_TOKEN) {
            builder = builder.auth_token(token);
        }
        if let Some(method) = get(ENV_METHOD) {
            builder = builder.method(method.parse()?);
        }
        if let Some(n) = get(ENV_MAX_IMAGES) {
            builder = builder.max_images(parse_number(ENV_MAX_IMAGES, &n)?);
        }
        if let Some(n) = get(ENV_MAX_IMAGE_BYTES) {
            builder = builder.max_image_bytes(parse_number(ENV_MAX_IMAGE_BYTES, &n)?);
        }
        if let Some(n) = get(ENV_MAX_TEXT_CHARS) {
            builder = builder.max_text_chars(parse_number(ENV_MAX_TEXT_CHARS, &n)?);
        }
        builder.build()
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T, PdfGenError> {
    value
        .trim()
        .parse()
        .map_err(|_| PdfGenError::InvalidConfig(format!("{key} must be a number, got '{value}'")))
}

/// Builder for [`GeneratorConfig`].
#[derive(Default)]
pub struct GeneratorConfigBuilder {
    endpoint: Option<String>,
    auth_token: Option<String>,
    method: RequestMethod,
    limits: ContentLimits,
    decode_concurrency: Option<usize>,
    progress_callback: Option<ProgressCallback>,
}

impl fmt::Debug for GeneratorConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorConfigBuilder")
            .field("endpoint", &self.endpoint)
            .field("method", &self.method)
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

impl GeneratorConfigBuilder {
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoint = Some(url.into());
        self
    }

    pub fn auth_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.auth_token = if token.trim().is_empty() {
            None
        } else {
            Some(token)
        };
        self
    }

    pub fn method(mut self, method: RequestMethod) -> Self {
        self.method = method;
        self
    }

    pub fn limits(mut self, limits: ContentLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn max_images(mut self, n: usize) -> Self {
        self.limits.max_images = n;
        self
    }

    pub fn max_image_bytes(mut self, n: u64) -> Self {
        self.limits.max_image_bytes = n;
        self
    }

    pub fn min_text_chars(mut self, n: usize) -> Self {
        self.limits.min_text_chars = n;
        self
    }

    pub fn max_text_chars(mut self, n: usize) -> Self {
        self.limits.max_text_chars = n;
        self
    }

    pub fn max_margin_mm(mut self, mm: f32) -> Self {
        self.limits.max_margin_mm = mm;
        self
    }

    pub fn allowed_mime_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.limits.allowed_mime_types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn decode_concurrency(mut self, n: usize) -> Self {
        self.decode_concurrency = Some(n.max(1));
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<GeneratorConfig, PdfGenError> {
        let raw = self
            .endpoint
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(PdfGenError::MissingEndpoint)?;
        let endpoint = parse_endpoint(raw)?;

        let l = &self.limits;
        if l.min_text_chars > l.max_text_chars {
            return Err(PdfGenError::InvalidConfig(format!(
                "minimum text length {} exceeds maximum {}",
                l.min_text_chars, l.max_text_chars
            )));
        }
        if l.max_image_bytes == 0 {
            return Err(PdfGenError::InvalidConfig(
                "maximum image size must be > 0".into(),
            ));
        }
        if !l.max_margin_mm.is_finite() || l.max_margin_mm < 0.0 {
            return Err(PdfGenError::InvalidConfig(format!(
                "maximum margin must be a non-negative number, got {}",
                l.max_margin_mm
            )));
        }
        if l.allowed_mime_types.is_empty() {
            return Err(PdfGenError::InvalidConfig(
                "image MIME allow-list is empty".into(),
            ));
        }

        Ok(GeneratorConfig {
            endpoint,
            auth_token: self.auth_token,
            method: self.method,
            limits: self.limits,
            decode_concurrency: self.decode_concurrency.unwrap_or(4),
            progress_callback: self.progress_callback,
        })
    }
}

fn parse_endpoint(raw: &str) -> Result<Url, PdfGenError> {
    let url = Url::parse(raw).map_err(|e| PdfGenError::InvalidEndpoint {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(PdfGenError::InvalidEndpoint {
            url: raw.to_string(),
            reason: format!("unsupported scheme '{scheme}', expected http or https"),
        }),
    }
}
