//! Image ingestion: validate, decode and order a batch of candidate files.
//!
//! ## Rules, applied per file in the order presented
//!
//! 1. **Limit**: once the document (held + accepted so far) is full, this and
//!    every remaining file is rejected with [`RejectReason::LimitReached`].
//! 2. **Type**: the declared MIME type must be in the allow-list.
//! 3. **Size**: the declared size must not exceed the per-image maximum.
//! 4. **Decode**: the bytes are read, sniffed and base64-encoded.
//!
//! ## Why waves?
//!
//! Decoding is the slow part and runs concurrently, but whether a file fits
//! under the limit depends on how many earlier files decoded successfully.
//! We therefore admit files in waves of at most `free slots` candidates,
//! decode each wave concurrently with [`StreamExt::buffered`] (which yields
//! results in input order, not completion order), and let decode failures
//! free their slot for the next wave.

use crate::asset::{ImageAsset, PreviewTracker};
use crate::config::{normalise_mime, ContentLimits};
use crate::error::{PdfGenError, RejectReason};
use crate::output::{ImageRejection, IngestReport};
use crate::pipeline::encode::{encode_image, mime_from_extension};
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Where a candidate's bytes come from.
#[derive(Debug, Clone)]
pub enum CandidateSource {
    /// Read lazily from disk during decoding.
    Path(PathBuf),
    /// Already in memory.
    Bytes(Vec<u8>),
}

/// One user-selected file, before validation.
#[derive(Debug, Clone)]
pub struct CandidateFile {
    pub name: String,
    /// Declared MIME type (from the picker or the file extension).
    pub mime_type: String,
    /// Declared size in bytes.
    pub size: u64,
    pub source: CandidateSource,
}

impl CandidateFile {
    /// An in-memory candidate.
    pub fn from_bytes(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            size: bytes.len() as u64,
            source: CandidateSource::Bytes(bytes),
        }
    }

    /// A candidate backed by a file on disk. The MIME type is derived from the
    /// extension and the size from the file metadata; the content is not read
    /// until decoding.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, PdfGenError> {
        let path = path.as_ref().to_path_buf();
        let meta = tokio::fs::metadata(&path)
            .await
            .map_err(|_| PdfGenError::FileNotFound { path: path.clone() })?;
        if !meta.is_file() {
            return Err(PdfGenError::FileNotFound { path });
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self {
            mime_type: mime_from_extension(&name).to_string(),
            size: meta.len(),
            name,
            source: CandidateSource::Path(path),
        })
    }
}

/// Output of one ingestion batch: the assets to append, plus the report.
#[derive(Debug, Default)]
pub struct IngestBatch {
    /// Admitted assets, in input order. Order indices are assigned when they
    /// are added to a document.
    pub assets: Vec<ImageAsset>,
    pub report: IngestReport,
}

/// Validate and decode `candidates` for a document already holding
/// `already_held` images.
///
/// Never fails as a whole: every candidate ends up either in
/// [`IngestBatch::assets`] or in the report's rejections.
pub async fn ingest(
    candidates: Vec<CandidateFile>,
    already_held: usize,
    limits: &ContentLimits,
    concurrency: usize,
    previews: &Arc<PreviewTracker>,
) -> IngestBatch {
    let total = candidates.len();
    let mut accepted: Vec<ImageAsset> = Vec::new();
    let mut rejected: Vec<ImageRejection> = Vec::new();
    let mut pending = candidates.into_iter().enumerate();

    loop {
        let free = limits
            .max_images
            .saturating_sub(already_held + accepted.len());
        if free == 0 {
            break;
        }

        let mut wave: Vec<(usize, CandidateFile)> = Vec::with_capacity(free);
        while wave.len() < free {
            let Some((idx, candidate)) = pending.next() else {
                break;
            };
            match precheck(&candidate, limits) {
                Ok(()) => wave.push((idx, candidate)),
                Err(reason) => {
                    debug!("Rejected '{}': {}", candidate.name, reason);
                    rejected.push(ImageRejection {
                        input_index: idx,
                        name: candidate.name,
                        reason,
                    });
                }
            }
        }
        if wave.is_empty() {
            break;
        }

        let decoded: Vec<(usize, String, Result<ImageAsset, RejectReason>)> =
            stream::iter(wave.into_iter().map(|(idx, candidate)| async move {
                let name = candidate.name.clone();
                (idx, name, decode_candidate(candidate, limits).await)
            }))
            .buffered(concurrency.max(1))
            .collect()
            .await;

        for (idx, name, result) in decoded {
            match result {
                Ok(asset) => accepted.push(asset.with_preview(previews.acquire())),
                Err(reason) => {
                    warn!("Failed to decode image '{}': {}", name, reason);
                    rejected.push(ImageRejection {
                        input_index: idx,
                        name,
                        reason,
                    });
                }
            }
        }
    }

    for (idx, candidate) in pending {
        rejected.push(ImageRejection {
            input_index: idx,
            name: candidate.name,
            reason: RejectReason::LimitReached {
                max: limits.max_images,
            },
        });
    }
    rejected.sort_by_key(|r| r.input_index);

    info!(
        "Ingested {}/{} images ({} rejected)",
        accepted.len(),
        total,
        rejected.len()
    );

    IngestBatch {
        report: IngestReport {
            accepted: accepted.iter().map(|a| a.name().to_string()).collect(),
            rejected,
        },
        assets: accepted,
    }
}

/// Type and size checks on the declared metadata.
fn precheck(candidate: &CandidateFile, limits: &ContentLimits) -> Result<(), RejectReason> {
    if !limits.allows_mime(&candidate.mime_type) {
        return Err(RejectReason::InvalidType {
            mime_type: candidate.mime_type.clone(),
            allowed: limits.allowed_mime_types.clone(),
        });
    }
    if candidate.size > limits.max_image_bytes {
        return Err(RejectReason::TooLarge {
            size: candidate.size,
            max: limits.max_image_bytes,
        });
    }
    Ok(())
}

/// Read, re-check and encode one candidate.
async fn decode_candidate(
    candidate: CandidateFile,
    limits: &ContentLimits,
) -> Result<ImageAsset, RejectReason> {
    let CandidateFile {
        name,
        mime_type: declared,
        source,
        ..
    } = candidate;

    let bytes = match source {
        CandidateSource::Bytes(bytes) => bytes,
        CandidateSource::Path(path) => {
            tokio::fs::read(&path)
                .await
                .map_err(|e| RejectReason::DecodeFailed {
                    detail: format!("cannot read '{}': {}", path.display(), e),
                })?
        }
    };

    // The file may have grown since its metadata was taken.
    let size = bytes.len() as u64;
    if size > limits.max_image_bytes {
        return Err(RejectReason::TooLarge {
            size,
            max: limits.max_image_bytes,
        });
    }

    let encoded = tokio::task::spawn_blocking(move || encode_image(&bytes))
        .await
        .map_err(|e| RejectReason::DecodeFailed {
            detail: format!("decode task failed: {e}"),
        })?
        .map_err(|detail| RejectReason::DecodeFailed { detail })?;

    if normalise_mime(&declared) != encoded.mime_type {
        warn!(
            "Image '{}' declared as {} but contains {}",
            name, declared, encoded.mime_type
        );
        if !limits.allows_mime(&encoded.mime_type) {
            return Err(RejectReason::InvalidType {
                mime_type: encoded.mime_type,
                allowed: limits.allowed_mime_types.clone(),
            });
        }
    }

    Ok(ImageAsset::new(name, encoded.mime_type, size, encoded.data_url)
        .with_dimensions(encoded.width, encoded.height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png(name: &str) -> CandidateFile {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([0, 128, 0, 255])));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        CandidateFile::from_bytes(name, "image/png", buf)
    }

    async fn run(candidates: Vec<CandidateFile>, held: usize) -> IngestBatch {
        let previews = PreviewTracker::new();
        ingest(candidates, held, &ContentLimits::default(), 4, &previews).await
    }

    #[tokio::test]
    async fn twelve_files_into_empty_document() {
        let files: Vec<_> = (0..12).map(|i| png(&format!("img{i}.png"))).collect();
        let batch = run(files, 0).await;

        let names: Vec<&str> = batch.assets.iter().map(|a| a.name()).collect();
        let expected: Vec<String> = (0..10).map(|i| format!("img{i}.png")).collect();
        assert_eq!(names, expected);

        assert_eq!(batch.report.rejected.len(), 2);
        for (r, idx) in batch.report.rejected.iter().zip([10, 11]) {
            assert_eq!(r.input_index, idx);
            assert_eq!(r.reason, RejectReason::LimitReached { max: 10 });
        }
    }

    #[tokio::test]
    async fn limit_counts_images_already_held() {
        let files = vec![png("a.png"), png("b.png"), png("c.png")];
        let batch = run(files, 9).await;
        assert_eq!(batch.report.accepted, vec!["a.png"]);
        assert_eq!(batch.report.rejected.len(), 2);
        assert!(batch
            .report
            .rejected
            .iter()
            .all(|r| matches!(r.reason, RejectReason::LimitReached { .. })));
    }

    #[tokio::test]
    async fn type_and_size_rejections_keep_order() {
        let mut big = png("big.png");
        big.size = 11 * 1024 * 1024;
        let files = vec![
            png("ok1.png"),
            CandidateFile::from_bytes("anim.gif", "image/gif", b"GIF89a".to_vec()),
            big,
            png("ok2.png"),
        ];
        let batch = run(files, 0).await;
        assert_eq!(batch.report.accepted, vec!["ok1.png", "ok2.png"]);
        let reasons: Vec<_> = batch
            .report
            .rejected
            .iter()
            .map(|r| (r.input_index, r.reason.clone()))
            .collect();
        let (1, RejectReason::InvalidType { ref allowed, .. }) = reasons[0] else {
            panic!("expected invalid type, got {:?}", reasons[0])
        };
        assert_eq!(allowed, &ContentLimits::default().allowed_mime_types);
        assert!(matches!(reasons[1], (2, RejectReason::TooLarge { .. })));
    }

    #[tokio::test]
    async fn decode_failure_frees_slot_for_later_file() {
        let files = vec![
            png("a.png"),
            CandidateFile::from_bytes("broken.png", "image/png", b"not a png".to_vec()),
            png("c.png"),
        ];
        let batch = run(files, 8).await;
        assert_eq!(batch.report.accepted, vec!["a.png", "c.png"]);
        assert_eq!(batch.report.rejected.len(), 1);
        assert!(matches!(
            batch.report.rejected[0].reason,
            RejectReason::DecodeFailed { .. }
        ));
    }

    #[tokio::test]
    async fn mislabelled_file_uses_sniffed_type() {
        let mut file = png("photo.jpg");
        file.mime_type = "image/jpeg".into();
        let batch = run(vec![file], 0).await;
        assert_eq!(batch.assets[0].mime_type(), "image/png");
        assert!(batch.assets[0].data_url().starts_with("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn each_asset_gets_a_preview() {
        let previews = PreviewTracker::new();
        let batch = ingest(
            vec![png("a.png"), png("b.png")],
            0,
            &ContentLimits::default(),
            2,
            &previews,
        )
        .await;
        assert_eq!(previews.live(), 2);
        drop(batch);
        assert_eq!(previews.live(), 0);
    }

    #[tokio::test]
    async fn from_path_reads_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shot.PNG");
        let CandidateSource::Bytes(bytes) = png("x").source else {
            unreachable!()
        };
        std::fs::write(&path, &bytes).unwrap();

        let candidate = CandidateFile::from_path(&path).await.unwrap();
        assert_eq!(candidate.name, "shot.PNG");
        assert_eq!(candidate.mime_type, "image/png");
        assert_eq!(candidate.size, bytes.len() as u64);

        let batch = run(vec![candidate], 0).await;
        assert_eq!(batch.assets.len(), 1);
        assert_eq!(batch.assets[0].dimensions(), Some((2, 2)));
    }

    #[tokio::test]
    async fn from_path_missing_file() {
        let err = CandidateFile::from_path("/definitely/not/here.png")
            .await
            .unwrap_err();
        assert!(matches!(err, PdfGenError::FileNotFound { .. }));
    }

    #[test]
    fn empty_batch_blocking() {
        let previews = PreviewTracker::new();
        let batch = tokio_test::block_on(ingest(
            Vec::new(),
            0,
            &ContentLimits::default(),
            4,
            &previews,
        ));
        assert!(batch.assets.is_empty());
        assert!(!batch.report.has_rejections());
    }
}
