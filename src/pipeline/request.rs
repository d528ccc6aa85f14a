//! Request building: `DocumentContent` → wire request.
//!
//! There is exactly one canonical payload, [`GenerationPayload`]. It is
//! serialised one of two ways depending on [`RequestMethod`]:
//!
//! * `Post`: the payload as a JSON body.
//! * `Get` : each top-level field as a query parameter; structured fields
//!   (`images`, `options`, `formatting`) are carried as compact JSON strings so
//!   image order survives URL encoding.
//!
//! Building validates the document first and fails without producing a
//! request, so nothing reaches the network for a document that is not
//! submittable.

use crate::config::{ContentLimits, GeneratorConfig, RequestMethod};
use crate::document::{DocumentContent, Formatting, RenderOptions};
use crate::error::{PdfGenError, RejectReason};
use reqwest::Url;
use serde::Serialize;
use tracing::debug;

/// One image entry on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadImage {
    pub data_url: String,
    pub name: String,
    #[serde(rename = "type")]
    pub mime_type: String,
}

/// The canonical generation payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationPayload {
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub images: Vec<PayloadImage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<RenderOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatting: Option<Formatting>,
}

impl GenerationPayload {
    /// Snapshot `doc` into a payload. Images follow their order index.
    pub fn from_document(doc: &DocumentContent) -> Self {
        let mut images: Vec<_> = doc.images().iter().collect();
        images.sort_by_key(|img| img.order_index());

        Self {
            content: doc.text().to_string(),
            title: doc.title().map(str::to_string),
            images: images
                .into_iter()
                .map(|img| PayloadImage {
                    data_url: img.data_url().to_string(),
                    name: img.name().to_string(),
                    mime_type: img.mime_type().to_string(),
                })
                .collect(),
            options: doc.options().copied(),
            formatting: Some(doc.formatting()).filter(|f| !f.is_plain()),
        }
    }

    /// JSON body for `POST`.
    pub fn to_json(&self) -> Result<Vec<u8>, PdfGenError> {
        serde_json::to_vec(self)
            .map_err(|e| PdfGenError::Internal(format!("payload serialisation: {e}")))
    }

    /// Query parameters for `GET`, in a fixed field order.
    pub fn to_query_pairs(&self) -> Result<Vec<(&'static str, String)>, PdfGenError> {
        let mut pairs = vec![("content", self.content.clone())];
        if let Some(ref title) = self.title {
            pairs.push(("title", title.clone()));
        }
        pairs.push(("images", json_string(&self.images)?));
        if let Some(ref options) = self.options {
            pairs.push(("options", json_string(options)?));
        }
        if let Some(ref formatting) = self.formatting {
            pairs.push(("formatting", json_string(formatting)?));
        }
        Ok(pairs)
    }
}

fn json_string<T: Serialize>(value: &T) -> Result<String, PdfGenError> {
    serde_json::to_string(value)
        .map_err(|e| PdfGenError::Internal(format!("payload serialisation: {e}")))
}

/// A fully-formed HTTP request, independent of the HTTP client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireRequest {
    pub method: RequestMethod,
    pub url: Url,
    /// Sent as `Authorization: Bearer <token>`.
    pub bearer_token: Option<String>,
    /// JSON body (`POST` only).
    pub body: Option<Vec<u8>>,
}

impl WireRequest {
    /// A plain `GET`, used for following a pointer to the finished PDF.
    pub fn get(url: Url, bearer_token: Option<String>) -> Self {
        Self {
            method: RequestMethod::Get,
            url,
            bearer_token,
            body: None,
        }
    }
}

/// Validate `doc` and build the request for `config`'s endpoint and method.
pub fn build_request(
    doc: &DocumentContent,
    config: &GeneratorConfig,
) -> Result<WireRequest, PdfGenError> {
    validate_document(doc, &config.limits)?;

    let payload = GenerationPayload::from_document(doc);
    let request = match config.method {
        RequestMethod::Post => WireRequest {
            method: RequestMethod::Post,
            url: config.endpoint.clone(),
            bearer_token: config.auth_token.clone(),
            body: Some(payload.to_json()?),
        },
        RequestMethod::Get => {
            let mut url = config.endpoint.clone();
            {
                let mut query = url.query_pairs_mut();
                for (key, value) in payload.to_query_pairs()? {
                    query.append_pair(key, &value);
                }
            }
            WireRequest::get(url, config.auth_token.clone())
        }
    };

    debug!(
        "Built {:?} request: {} chars, {} images, body {} bytes",
        request.method,
        payload.content.chars().count(),
        payload.images.len(),
        request.body.as_ref().map_or(0, Vec::len)
    );
    Ok(request)
}

/// Every check that must pass before a document may leave the process.
pub fn validate_document(doc: &DocumentContent, limits: &ContentLimits) -> Result<(), PdfGenError> {
    let len = doc.text_chars();
    if len < limits.min_text_chars {
        return Err(PdfGenError::TextTooShort {
            len,
            min: limits.min_text_chars,
        });
    }
    if len > limits.max_text_chars {
        return Err(PdfGenError::TextTooLong {
            len,
            max: limits.max_text_chars,
        });
    }
    if doc.image_count() > limits.max_images {
        return Err(PdfGenError::TooManyImages {
            count: doc.image_count(),
            max: limits.max_images,
        });
    }
    for img in doc.images() {
        if !limits.allows_mime(img.mime_type()) {
            return Err(PdfGenError::ImageRejected {
                name: img.name().to_string(),
                reason: RejectReason::InvalidType {
                    mime_type: img.mime_type().to_string(),
                    allowed: limits.allowed_mime_types.clone(),
                },
            });
        }
        if img.size() > limits.max_image_bytes {
            return Err(PdfGenError::ImageRejected {
                name: img.name().to_string(),
                reason: RejectReason::TooLarge {
                    size: img.size(),
                    max: limits.max_image_bytes,
                },
            });
        }
    }
    if let Some(options) = doc.options() {
        options.validate(limits.max_margin_mm)?;
    }
    Ok(())
}
