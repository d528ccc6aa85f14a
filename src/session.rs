//! An editing session: one document, one generator, one preview tracker.
//!
//! [`Session`] is what a front end drives. Edits take `&mut self` and
//! submission takes `&self`, so the document cannot change while a request
//! built from it is in flight.

use crate::asset::{ImageAsset, PreviewTracker};
use crate::config::GeneratorConfig;
use crate::document::{DocumentContent, Formatting, MoveDirection, RenderOptions};
use crate::error::PdfGenError;
use crate::generate::Generator;
use crate::output::{GenerationOutcome, IngestReport};
use crate::pipeline::ingest::{ingest, CandidateFile};
use crate::pipeline::transport::{HttpTransport, Transport};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

pub struct Session<T = HttpTransport> {
    document: DocumentContent,
    generator: Generator<T>,
    previews: Arc<PreviewTracker>,
}

impl Session<HttpTransport> {
    pub fn new(config: GeneratorConfig) -> Self {
        Self::with_generator(Generator::new(config))
    }
}

impl<T: Transport> Session<T> {
    /// A session with an empty document using `generator`'s limits.
    pub fn with_generator(generator: Generator<T>) -> Self {
        Self {
            document: DocumentContent::new(generator.config().limits.clone()),
            generator,
            previews: PreviewTracker::new(),
        }
    }

    pub fn document(&self) -> &DocumentContent {
        &self.document
    }

    pub fn generator(&self) -> &Generator<T> {
        &self.generator
    }

    /// Number of image previews currently alive.
    pub fn live_previews(&self) -> usize {
        self.previews.live()
    }

    // ── Editing ──────────────────────────────────────────────────────────

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.document.set_text(text);
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.document.set_title(title);
    }

    pub fn set_options(&mut self, options: RenderOptions) -> Result<(), PdfGenError> {
        self.document.set_options(options)
    }

    pub fn clear_options(&mut self) {
        self.document.clear_options();
    }

    pub fn set_formatting(&mut self, formatting: Formatting) {
        self.document.set_formatting(formatting);
    }

    /// Append assets that were already ingested, such as one returned by
    /// [`Session::remove_image`].
    ///
    /// Assets that would take the document past `max_images` are not added;
    /// they are handed back in order.
    pub fn add_images(&mut self, assets: impl IntoIterator<Item = ImageAsset>) -> Vec<ImageAsset> {
        let max = self.document.limits().max_images;
        let room = max.saturating_sub(self.document.image_count());
        let mut assets = assets.into_iter();
        self.document.add_images(assets.by_ref().take(room));

        let surplus: Vec<ImageAsset> = assets.collect();
        if !surplus.is_empty() {
            warn!("{} image(s) not added: document is at its limit of {}", surplus.len(), max);
        }
        surplus
    }

    pub fn remove_image(&mut self, index: usize) -> Option<ImageAsset> {
        self.document.remove_image(index)
    }

    pub fn move_image(&mut self, index: usize, direction: MoveDirection) -> bool {
        self.document.move_image(index, direction)
    }

    pub fn clear_images(&mut self) {
        self.document.clear_images();
    }

    // ── Ingestion ────────────────────────────────────────────────────────

    /// Validate, decode and append `candidates` to the document.
    ///
    /// Per-file problems are reported, not returned as errors.
    pub async fn ingest(&mut self, candidates: Vec<CandidateFile>) -> IngestReport {
        let config = self.generator.config();
        let batch = ingest(
            candidates,
            self.document.image_count(),
            &config.limits,
            config.decode_concurrency,
            &self.previews,
        )
        .await;

        let first_new = self.document.image_count();
        self.document.add_images(batch.assets);

        if let Some(ref cb) = config.progress_callback {
            for img in &self.document.images()[first_new..] {
                cb.on_image_accepted(img.name(), img.order_index());
            }
            for rejection in &batch.report.rejected {
                cb.on_image_rejected(&rejection.name, &rejection.reason);
            }
        }
        debug!("Document now holds {} images", self.document.image_count());
        batch.report
    }

    /// [`Session::ingest`] for files on disk.
    ///
    /// # Errors
    /// [`PdfGenError::FileNotFound`] if any path does not name a readable
    /// file; nothing is ingested in that case.
    pub async fn ingest_paths<I, P>(&mut self, paths: I) -> Result<IngestReport, PdfGenError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut candidates = Vec::new();
        for path in paths {
            candidates.push(CandidateFile::from_path(path).await?);
        }
        Ok(self.ingest(candidates).await)
    }

    // ── Submission ───────────────────────────────────────────────────────

    /// Text length within bounds and no generation in flight.
    pub fn is_submittable(&self) -> bool {
        self.document.text_within_bounds() && !self.generator.is_busy()
    }

    pub async fn generate(&self) -> Result<GenerationOutcome, PdfGenError> {
        self.generator.generate(&self.document).await
    }

    pub async fn generate_to_file(&self, dir: impl AsRef<Path>) -> Result<PathBuf, PdfGenError> {
        self.generator.generate_to_file(&self.document, dir).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RejectReason;
    use crate::pipeline::request::WireRequest;
    use crate::pipeline::transport::{RawResponse, TransportError};
    use crate::progress::GenerationProgressCallback;
    use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;
    use std::sync::Mutex;

    /// Always fails; these tests never submit successfully.
    struct Offline;

    impl Transport for Offline {
        async fn execute(&self, _request: WireRequest) -> Result<RawResponse, TransportError> {
            Err(TransportError::new("offline"))
        }
    }

    fn png(name: &str) -> CandidateFile {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(3, 1, Rgba([9, 9, 9, 255])));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        CandidateFile::from_bytes(name, "image/png", buf)
    }

    fn config() -> GeneratorConfig {
        GeneratorConfig::builder()
            .endpoint("https://render.example.com/hook")
            .build()
            .unwrap()
    }

    fn session() -> Session<Offline> {
        Session::with_generator(Generator::with_transport(config(), Offline))
    }

    fn names(s: &Session<Offline>) -> Vec<String> {
        s.document()
            .images()
            .iter()
            .map(|i| i.name().to_string())
            .collect()
    }

    #[tokio::test]
    async fn ingest_appends_after_existing_images() {
        let mut s = session();
        s.ingest(vec![png("a.png"), png("b.png")]).await;
        let report = s.ingest(vec![png("c.png")]).await;
        assert_eq!(report.accepted, vec!["c.png"]);
        assert_eq!(names(&s), ["a.png", "b.png", "c.png"]);
        let indices: Vec<usize> = s.document().images().iter().map(|i| i.order_index()).collect();
        assert_eq!(indices, [0, 1, 2]);
    }

    #[tokio::test]
    async fn remove_then_add_restores_set_and_density() {
        let mut s = session();
        s.ingest(vec![png("a.png"), png("b.png"), png("c.png")]).await;
        let removed = s.remove_image(1).unwrap();
        assert_eq!(removed.name(), "b.png");
        drop(removed);
        assert_eq!(s.live_previews(), 2);

        s.ingest(vec![png("b.png")]).await;
        let mut got = names(&s);
        got.sort();
        assert_eq!(got, ["a.png", "b.png", "c.png"]);
        let indices: Vec<usize> = s.document().images().iter().map(|i| i.order_index()).collect();
        assert_eq!(indices, [0, 1, 2]);
    }

    #[tokio::test]
    async fn removed_asset_can_be_added_back() {
        let mut s = session();
        s.ingest(vec![png("a.png"), png("b.png"), png("c.png")]).await;
        let before = s.document().images().to_vec();

        let removed = s.remove_image(0).unwrap();
        assert!(s.add_images([removed.clone()]).is_empty());
        assert!(s.document().images().contains(&removed));
        for img in &before {
            assert!(s.document().images().contains(img));
        }
        assert_eq!(names(&s), ["b.png", "c.png", "a.png"]);
        let indices: Vec<usize> = s.document().images().iter().map(|i| i.order_index()).collect();
        assert_eq!(indices, [0, 1, 2]);
        drop((before, removed));
        assert_eq!(s.live_previews(), 3);
    }

    #[tokio::test]
    async fn add_images_hands_back_surplus() {
        let config = GeneratorConfig::builder()
            .endpoint("https://render.example.com/hook")
            .max_images(2)
            .build()
            .unwrap();
        let mut s = Session::with_generator(Generator::with_transport(config, Offline));
        s.ingest(vec![png("a.png")]).await;

        let extra = vec![
            ImageAsset::new("x.png", "image/png", 1, "data:image/png;base64,eA=="),
            ImageAsset::new("y.png", "image/png", 1, "data:image/png;base64,eQ=="),
        ];
        let surplus = s.add_images(extra);
        assert_eq!(names(&s), ["a.png", "x.png"]);
        assert_eq!(surplus.len(), 1);
        assert_eq!(surplus[0].name(), "y.png");
    }

    #[tokio::test]
    async fn move_edits_and_boundaries() {
        let mut s = session();
        s.ingest(vec![png("a.png"), png("b.png")]).await;
        assert!(!s.move_image(0, MoveDirection::Up));
        assert!(!s.move_image(1, MoveDirection::Down));
        assert!(s.move_image(1, MoveDirection::Up));
        assert_eq!(names(&s), ["b.png", "a.png"]);
    }

    #[tokio::test]
    async fn previews_released_on_clear() {
        let mut s = session();
        s.ingest(vec![png("a.png"), png("b.png")]).await;
        assert_eq!(s.live_previews(), 2);
        s.clear_images();
        assert_eq!(s.live_previews(), 0);
    }

    #[tokio::test]
    async fn submittable_tracks_text_bounds() {
        let mut s = session();
        assert!(!s.is_submittable());
        s.set_text("x".repeat(19));
        assert!(!s.is_submittable());
        s.set_text("x".repeat(20));
        assert!(s.is_submittable());
        s.set_text("x".repeat(10_001));
        assert!(!s.is_submittable());
    }

    #[tokio::test]
    async fn generate_reports_network_failure() {
        let mut s = session();
        s.set_text("A body comfortably over twenty characters.");
        let outcome = s.generate().await.unwrap();
        assert!(!outcome.is_success());
        assert!(s.is_submittable());
    }

    #[tokio::test]
    async fn ingest_fires_callbacks() {
        #[derive(Default)]
        struct Log(Mutex<Vec<String>>);
        impl GenerationProgressCallback for Log {
            fn on_image_accepted(&self, name: &str, order_index: usize) {
                self.0.lock().unwrap().push(format!("+{name}@{order_index}"));
            }
            fn on_image_rejected(&self, name: &str, reason: &RejectReason) {
                self.0.lock().unwrap().push(format!("-{name}:{reason}"));
            }
        }

        let log = Arc::new(Log::default());
        let config = GeneratorConfig::builder()
            .endpoint("https://render.example.com/hook")
            .max_images(1)
            .progress_callback(log.clone())
            .build()
            .unwrap();
        let mut s = Session::with_generator(Generator::with_transport(config, Offline));
        s.ingest(vec![png("a.png"), png("b.png")]).await;

        let events = log.0.lock().unwrap().clone();
        assert_eq!(events[0], "+a.png@0");
        assert!(events[1].starts_with("-b.png:limit reached"));
    }

    #[tokio::test]
    async fn ingest_paths_missing_file_is_error() {
        let mut s = session();
        let err = s.ingest_paths(["/no/such/file.png"]).await.unwrap_err();
        assert!(matches!(err, PdfGenError::FileNotFound { .. }));
        assert_eq!(s.document().image_count(), 0);
    }
}
