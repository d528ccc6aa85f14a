//! Generation entry points: one document in, one outcome out.
//!
//! A [`Generator`] owns the immutable configuration and the transport. Each
//! call to [`Generator::generate`] performs exactly one round-trip (plus at
//! most one follow-up fetch when the service answers with a pointer) and
//! never retries.
//!
//! Only one submission may be in flight per generator. A second call while
//! the first is still waiting on the network returns
//! [`PdfGenError::SubmissionInProgress`] without touching the network.

use crate::config::GeneratorConfig;
use crate::document::DocumentContent;
use crate::download::save_pdf;
use crate::error::PdfGenError;
use crate::output::GenerationOutcome;
use crate::pipeline::request::build_request;
use crate::pipeline::response::interpret;
use crate::pipeline::transport::{HttpTransport, Transport};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{info, warn};

/// Submits documents to the rendering service.
#[derive(Debug)]
pub struct Generator<T = HttpTransport> {
    config: GeneratorConfig,
    transport: T,
    in_flight: AtomicBool,
}

impl Generator<HttpTransport> {
    /// A generator talking HTTP with a default `reqwest` client.
    pub fn new(config: GeneratorConfig) -> Self {
        Self::with_transport(config, HttpTransport::new())
    }
}

impl<T: Transport> Generator<T> {
    pub fn with_transport(config: GeneratorConfig, transport: T) -> Self {
        Self {
            config,
            transport,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// `true` while a submission is waiting on the service.
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Submit `doc` and classify the reply.
    ///
    /// # Errors
    /// `Err` only when nothing was sent: the document failed validation or
    /// another submission is in flight. Every problem after the request left
    /// the process is reported as [`GenerationOutcome::Failure`].
    pub async fn generate(&self, doc: &DocumentContent) -> Result<GenerationOutcome, PdfGenError> {
        let _guard = InFlightGuard::acquire(&self.in_flight)?;

        let request = build_request(doc, &self.config)?;
        info!(
            "Submitting {} chars and {} images to {}",
            doc.text_chars(),
            doc.image_count(),
            self.config.endpoint.host_str().unwrap_or("rendering service")
        );
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_submit_start(doc.text_chars(), doc.image_count());
        }

        let start = Instant::now();
        let first = self.transport.execute(request).await;
        let outcome = interpret(first, &self.transport, &self.config).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match &outcome {
            GenerationOutcome::Success { pdf_bytes } => {
                info!("Received {} byte PDF in {}ms", pdf_bytes.len(), elapsed_ms)
            }
            GenerationOutcome::Failure(f) => {
                warn!("Generation failed after {}ms: {} ({})", elapsed_ms, f.message, f.kind)
            }
        }
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_outcome(&outcome);
        }

        Ok(outcome)
    }

    /// Generate and save the PDF into `dir`, named after the document title.
    ///
    /// A failed round-trip becomes [`PdfGenError::Generation`].
    pub async fn generate_to_file(
        &self,
        doc: &DocumentContent,
        dir: impl AsRef<Path>,
    ) -> Result<PathBuf, PdfGenError> {
        match self.generate(doc).await? {
            GenerationOutcome::Success { pdf_bytes } => {
                save_pdf(&pdf_bytes, doc.title(), dir.as_ref())
            }
            GenerationOutcome::Failure(f) => Err(PdfGenError::Generation(f)),
        }
    }

    /// Synchronous wrapper around [`Generator::generate`].
    ///
    /// Creates a temporary tokio runtime internally; do not call from inside
    /// an async context.
    pub fn generate_sync(&self, doc: &DocumentContent) -> Result<GenerationOutcome, PdfGenError> {
        tokio::runtime::Runtime::new()
            .map_err(|e| PdfGenError::Internal(format!("Failed to create tokio runtime: {}", e)))?
            .block_on(self.generate(doc))
    }
}

/// Holds the in-flight flag for the duration of one submission.
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, PdfGenError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| PdfGenError::SubmissionInProgress)?;
        Ok(Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
