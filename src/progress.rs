//! Progress-callback trait for ingestion and generation events.
//!
//! Inject an [`Arc<dyn GenerationProgressCallback>`] via
//! [`crate::config::GeneratorConfigBuilder::progress_callback`] to receive
//! events as images are admitted or refused and as the rendering round-trip
//! progresses.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdfgen::{GenerationProgressCallback, GeneratorConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     accepted: AtomicUsize,
//! }
//!
//! impl GenerationProgressCallback for CountingCallback {
//!     fn on_image_accepted(&self, name: &str, order_index: usize) {
//!         self.accepted.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("#{order_index}: {name}");
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { accepted: AtomicUsize::new(0) });
//!
//! let config = GeneratorConfig::builder()
//!     .endpoint("https://render.example.com/hook")
//!     .progress_callback(counter as Arc<dyn GenerationProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::error::RejectReason;
use crate::output::GenerationOutcome;
use std::sync::Arc;

/// Called by the ingestion and generation pipeline.
///
/// Implementations must be `Send + Sync`; the generator may be shared across
/// tasks. All methods have default no-op implementations so callers only
/// override what they care about.
pub trait GenerationProgressCallback: Send + Sync {
    /// Called for each image admitted into the document.
    ///
    /// # Arguments
    /// * `name`       : original filename
    /// * `order_index`: zero-based position in the document
    fn on_image_accepted(&self, name: &str, order_index: usize) {
        let _ = (name, order_index);
    }

    /// Called for each candidate image that was refused.
    fn on_image_rejected(&self, name: &str, reason: &RejectReason) {
        let _ = (name, reason);
    }

    /// Called once the request is built, just before it is sent.
    ///
    /// # Arguments
    /// * `text_chars` : body length in characters
    /// * `image_count`: images carried by the request
    fn on_submit_start(&self, text_chars: usize, image_count: usize) {
        let _ = (text_chars, image_count);
    }

    /// Called when the service answered with a pointer to the finished PDF
    /// and the second fetch is about to start.
    fn on_indirection(&self, url: &str) {
        let _ = url;
    }

    /// Called once per submission with the final outcome.
    fn on_outcome(&self, outcome: &GenerationOutcome) {
        let _ = outcome;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl GenerationProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::GeneratorConfig`].
pub type ProgressCallback = Arc<dyn GenerationProgressCallback>;
