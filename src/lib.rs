//! # edgequake-pdfgen
//!
//! Assemble documents from free text and ordered images, and have a remote
//! rendering service turn them into PDFs.
//!
//! ## Why this crate?
//!
//! The rendering service (an n8n workflow, a headless-browser farm, …) is a
//! black box that expects a well-formed payload and answers with a PDF, a
//! pointer to one, or an error. Everything around that call lives here:
//! validating and decoding user-selected images, keeping the document's
//! image order consistent while it is edited, building exactly one canonical
//! payload, and classifying whatever comes back into a single outcome.
//!
//! ## Pipeline Overview
//!
//! ```text
//! files + text
//!  │
//!  ├─ 1. Ingest     count / type / size rules, concurrent decode, input order kept
//!  ├─ 2. Encode     sniff format, read header, base64 data URL (spawn_blocking)
//!  ├─ 3. Edit       DocumentContent: text, title, options, reorder / remove images
//!  ├─ 4. Request    validate, serialise as JSON POST or query-string GET
//!  ├─ 5. Transport  one HTTP round-trip (reqwest)
//!  ├─ 6. Interpret  PDF body │ JSON {url|downloadUrl} → one more GET │ failure
//!  └─ 7. Save       <title>.pdf written atomically
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdfgen::{GenerationOutcome, GeneratorConfig, Session};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Endpoint and optional token from PDFGEN_ENDPOINT_URL / PDFGEN_TOKEN
//!     let config = GeneratorConfig::from_env()?;
//!     let mut session = Session::new(config);
//!
//!     session.set_title("Site visit");
//!     session.set_text("Photos from the Tuesday inspection, in walking order.");
//!     let report = session.ingest_paths(["north.jpg", "south.jpg"]).await?;
//!     for r in &report.rejected {
//!         eprintln!("skipped {}: {}", r.name, r.reason);
//!     }
//!
//!     match session.generate().await? {
//!         GenerationOutcome::Success { pdf_bytes } => {
//!             std::fs::write("site-visit.pdf", pdf_bytes)?;
//!         }
//!         GenerationOutcome::Failure(f) => eprintln!("{f}"),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli` | on | Enables the `pdfgen` binary (clap, anyhow, indicatif, tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! edgequake-pdfgen = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod asset;
pub mod config;
pub mod document;
pub mod download;
pub mod error;
pub mod generate;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use asset::{ImageAsset, PreviewHandle, PreviewTracker};
pub use config::{ContentLimits, GeneratorConfig, GeneratorConfigBuilder, RequestMethod};
pub use document::{
    DocumentContent, Formatting, HeadingLevel, Margins, MoveDirection, Orientation, PageSize,
    RenderOptions,
};
pub use download::{pdf_filename, save_pdf};
pub use error::{PdfGenError, RejectReason};
pub use generate::Generator;
pub use output::{FailureKind, GenerationFailure, GenerationOutcome, ImageRejection, IngestReport};
pub use pipeline::ingest::CandidateFile;
pub use pipeline::transport::{HttpTransport, RawResponse, Transport, TransportError};
pub use progress::{GenerationProgressCallback, NoopProgressCallback, ProgressCallback};
pub use session::Session;
