//! Image assets and their preview handles.
//!
//! An [`ImageAsset`] is the transport-ready form of one user-selected image:
//! the bytes have already been validated and base64-encoded into a `data:`
//! URL. Each asset may hold a [`PreviewHandle`], a scoped lease on a preview
//! slot that a front-end can use to show a thumbnail. The lease is released
//! when the last clone of the asset is dropped, so removing an image from a
//! document can never leak its preview.

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Hands out preview leases and counts the live ones.
#[derive(Debug, Default)]
pub struct PreviewTracker {
    next_id: AtomicU64,
    live: AtomicUsize,
}

impl PreviewTracker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Acquire a new preview lease.
    pub fn acquire(self: &Arc<Self>) -> PreviewHandle {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.live.fetch_add(1, Ordering::SeqCst);
        debug!("Preview {} acquired", id);
        PreviewHandle {
            lease: Arc::new(PreviewLease {
                id,
                tracker: Arc::clone(self),
            }),
        }
    }

    /// Number of leases not yet released.
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

struct PreviewLease {
    id: u64,
    tracker: Arc<PreviewTracker>,
}

impl Drop for PreviewLease {
    fn drop(&mut self) {
        self.tracker.live.fetch_sub(1, Ordering::SeqCst);
        debug!("Preview {} released", self.id);
    }
}

/// A scoped preview lease. Clones share the lease.
#[derive(Clone)]
pub struct PreviewHandle {
    lease: Arc<PreviewLease>,
}

impl PreviewHandle {
    pub fn id(&self) -> u64 {
        self.lease.id
    }

    /// Opaque identifier a front-end can key its thumbnail cache on.
    pub fn uri(&self) -> String {
        format!("preview:{}", self.lease.id)
    }
}

impl fmt::Debug for PreviewHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PreviewHandle").field(&self.lease.id).finish()
    }
}

/// One image held by a document.
#[derive(Clone)]
pub struct ImageAsset {
    name: String,
    mime_type: String,
    size: u64,
    dimensions: Option<(u32, u32)>,
    data_url: String,
    order_index: usize,
    preview: Option<PreviewHandle>,
}

impl ImageAsset {
    /// Build an asset from an already-encoded `data:` URL.
    ///
    /// The order index is assigned when the asset is added to a document.
    pub fn new(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        size: u64,
        data_url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            size,
            dimensions: None,
            data_url: data_url.into(),
            order_index: 0,
            preview: None,
        }
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.dimensions = Some((width, height));
        self
    }

    pub fn with_preview(mut self, preview: PreviewHandle) -> Self {
        self.preview = Some(preview);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Size of the original file in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// `(width, height)` in pixels, when known.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.dimensions
    }

    pub fn data_url(&self) -> &str {
        &self.data_url
    }

    /// Zero-based position in the owning document.
    pub fn order_index(&self) -> usize {
        self.order_index
    }

    pub fn preview(&self) -> Option<&PreviewHandle> {
        self.preview.as_ref()
    }

    /// Human-readable size, e.g. `"1.5 MB"`.
    pub fn display_size(&self) -> String {
        format_file_size(self.size)
    }

    pub(crate) fn set_order_index(&mut self, index: usize) {
        self.order_index = index;
    }
}

// Content equality: position and preview lease are not part of an image's identity.
impl PartialEq for ImageAsset {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.mime_type == other.mime_type
            && self.size == other.size
            && self.dimensions == other.dimensions
            && self.data_url == other.data_url
    }
}

impl Eq for ImageAsset {}

impl fmt::Debug for ImageAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageAsset")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("size", &self.size)
            .field("dimensions", &self.dimensions)
            .field("data_url_len", &self.data_url.len())
            .field("order_index", &self.order_index)
            .field("preview", &self.preview)
            .finish()
    }
}

/// Format a byte count with binary units: `512 Bytes`, `1.5 KB`, `10 MB`.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[unit])
}
