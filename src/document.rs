//! The editable document model.
//!
//! [`DocumentContent`] is the aggregate that gets submitted for rendering:
//! body text, optional title, ordered images, optional render options and
//! formatting hints. It is only ever changed through the operations below,
//! each of which leaves the image order indices dense (`0..len`).
//!
//! Text length is *not* enforced on mutation. An out-of-bounds body is
//! representable so the user can keep typing; [`DocumentContent::validate_text`]
//! and [`DocumentContent::text_within_bounds`] report whether it may be
//! submitted.

use crate::asset::ImageAsset;
use crate::config::ContentLimits;
use crate::error::PdfGenError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

// ── Render options ───────────────────────────────────────────────────────

/// Paper size understood by the rendering service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PageSize {
    #[default]
    A4,
    Letter,
    Legal,
}

impl FromStr for PageSize {
    type Err = PdfGenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a4" => Ok(PageSize::A4),
            "letter" => Ok(PageSize::Letter),
            "legal" => Ok(PageSize::Legal),
            other => Err(PdfGenError::InvalidOption(format!(
                "page size must be A4, Letter or Legal, got '{other}'"
            ))),
        }
    }
}

/// Page orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

impl FromStr for Orientation {
    type Err = PdfGenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "portrait" => Ok(Orientation::Portrait),
            "landscape" => Ok(Orientation::Landscape),
            other => Err(PdfGenError::InvalidOption(format!(
                "orientation must be portrait or landscape, got '{other}'"
            ))),
        }
    }
}

/// Page margins in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Margins {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Margins {
    /// The same margin on all four sides.
    pub fn uniform(mm: f32) -> Self {
        Self {
            top: mm,
            right: mm,
            bottom: mm,
            left: mm,
        }
    }

    fn sides(&self) -> [(&'static str, f32); 4] {
        [
            ("top", self.top),
            ("right", self.right),
            ("bottom", self.bottom),
            ("left", self.left),
        ]
    }
}

impl Default for Margins {
    fn default() -> Self {
        Self::uniform(20.0)
    }
}

/// Layout options forwarded to the rendering service.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderOptions {
    pub page_size: PageSize,
    pub orientation: Orientation,
    pub margins: Margins,
}

impl RenderOptions {
    /// Check the margins against `max_margin_mm`.
    pub fn validate(&self, max_margin_mm: f32) -> Result<(), PdfGenError> {
        for (side, mm) in self.margins.sides() {
            if !mm.is_finite() || mm < 0.0 {
                return Err(PdfGenError::InvalidOption(format!(
                    "{side} margin must be a non-negative number, got {mm}"
                )));
            }
            if mm > max_margin_mm {
                return Err(PdfGenError::InvalidOption(format!(
                    "{side} margin {mm}mm exceeds the maximum of {max_margin_mm}mm"
                )));
            }
        }
        Ok(())
    }
}

// ── Formatting ───────────────────────────────────────────────────────────

/// Heading level applied to the body text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeadingLevel {
    #[default]
    None,
    H1,
    H2,
    H3,
}

impl FromStr for HeadingLevel {
    type Err = PdfGenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(HeadingLevel::None),
            "h1" => Ok(HeadingLevel::H1),
            "h2" => Ok(HeadingLevel::H2),
            "h3" => Ok(HeadingLevel::H3),
            other => Err(PdfGenError::InvalidOption(format!(
                "heading must be none, h1, h2 or h3, got '{other}'"
            ))),
        }
    }
}

/// Text styling hints for the rendering service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Formatting {
    pub bold: bool,
    pub italic: bool,
    pub heading: HeadingLevel,
}

impl Formatting {
    pub fn is_plain(&self) -> bool {
        *self == Formatting::default()
    }
}

// ── Image ordering ───────────────────────────────────────────────────────

/// Direction for [`DocumentContent::move_image`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    /// Towards index 0.
    Up,
    /// Towards the end.
    Down,
}

impl fmt::Display for MoveDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MoveDirection::Up => "up",
            MoveDirection::Down => "down",
        })
    }
}

// ── Document ─────────────────────────────────────────────────────────────

/// The aggregate submitted for generation.
///
/// Not `Clone`: a copy would share the preview leases of every image, so a
/// removal from one copy would not release anything.
#[derive(Debug, Default)]
pub struct DocumentContent {
    limits: ContentLimits,
    text: String,
    title: Option<String>,
    images: Vec<ImageAsset>,
    options: Option<RenderOptions>,
    formatting: Formatting,
}

impl DocumentContent {
    /// An empty document validated against `limits`.
    pub fn new(limits: ContentLimits) -> Self {
        Self {
            limits,
            ..Self::default()
        }
    }

    pub fn limits(&self) -> &ContentLimits {
        &self.limits
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Body length in characters (Unicode scalar values, not bytes).
    pub fn text_chars(&self) -> usize {
        self.text.chars().count()
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn images(&self) -> &[ImageAsset] {
        &self.images
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn options(&self) -> Option<&RenderOptions> {
        self.options.as_ref()
    }

    pub fn formatting(&self) -> Formatting {
        self.formatting
    }

    /// Replace the body text verbatim.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    /// Replace the title. An empty or whitespace-only title clears it.
    pub fn set_title(&mut self, title: impl Into<String>) {
        let title = title.into();
        self.title = if title.trim().is_empty() {
            None
        } else {
            Some(title)
        };
    }

    /// Replace the render options.
    ///
    /// Out-of-domain margins are rejected and leave the previous options in
    /// place.
    pub fn set_options(&mut self, options: RenderOptions) -> Result<(), PdfGenError> {
        options.validate(self.limits.max_margin_mm)?;
        self.options = Some(options);
        Ok(())
    }

    pub fn clear_options(&mut self) {
        self.options = None;
    }

    pub fn set_formatting(&mut self, formatting: Formatting) {
        self.formatting = formatting;
    }

    /// Append images in the order given.
    pub fn add_images(&mut self, assets: impl IntoIterator<Item = ImageAsset>) {
        self.images.extend(assets);
        self.reindex();
    }

    /// Remove the image at `index`, returning it. Remaining indices are
    /// re-densified. Dropping the returned asset releases its preview.
    pub fn remove_image(&mut self, index: usize) -> Option<ImageAsset> {
        if index >= self.images.len() {
            return None;
        }
        let removed = self.images.remove(index);
        self.reindex();
        debug!("Removed image '{}' from position {}", removed.name(), index);
        Some(removed)
    }

    /// Swap the image at `index` with its neighbour in `direction`.
    ///
    /// Returns `false` (and changes nothing) when the image is already at that
    /// boundary or `index` is out of range.
    pub fn move_image(&mut self, index: usize, direction: MoveDirection) -> bool {
        let target = match direction {
            MoveDirection::Up => index.checked_sub(1),
            MoveDirection::Down => index.checked_add(1),
        };
        let Some(target) = target.filter(|&t| t < self.images.len()) else {
            return false;
        };
        if index >= self.images.len() {
            return false;
        }
        self.images.swap(index, target);
        self.reindex();
        true
    }

    /// Remove every image.
    pub fn clear_images(&mut self) {
        self.images.clear();
    }

    /// Whether the body length is within the configured bounds.
    pub fn text_within_bounds(&self) -> bool {
        self.validate_text().is_ok()
    }

    /// Explain why the body length is out of bounds.
    pub fn validate_text(&self) -> Result<(), PdfGenError> {
        let len = self.text_chars();
        if len < self.limits.min_text_chars {
            return Err(PdfGenError::TextTooShort {
                len,
                min: self.limits.min_text_chars,
            });
        }
        if len > self.limits.max_text_chars {
            return Err(PdfGenError::TextTooLong {
                len,
                max: self.limits.max_text_chars,
            });
        }
        Ok(())
    }

    /// Characters still needed before the text becomes submittable.
    pub fn chars_needed(&self) -> usize {
        self.limits.min_text_chars.saturating_sub(self.text_chars())
    }

    fn reindex(&mut self) {
        for (i, img) in self.images.iter_mut().enumerate() {
            img.set_order_index(i);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(name: &str) -> ImageAsset {
        ImageAsset::new(name, "image/png", 10, format!("data:image/png;base64,{name}"))
    }

    fn doc_with(names: &[&str]) -> DocumentContent {
        let mut doc = DocumentContent::new(ContentLimits::default());
        doc.add_images(names.iter().map(|n| asset(n)));
        doc
    }

    fn names(doc: &DocumentContent) -> Vec<&str> {
        doc.images().iter().map(|i| i.name()).collect()
    }

    fn assert_dense(doc: &DocumentContent) {
        let idx: Vec<usize> = doc.images().iter().map(|i| i.order_index()).collect();
        assert_eq!(idx, (0..doc.image_count()).collect::<Vec<_>>());
    }

    #[test]
    fn text_length_boundaries() {
        let mut doc = DocumentContent::new(ContentLimits::default());
        doc.set_text("a".repeat(19));
        assert!(!doc.text_within_bounds());
        assert_eq!(doc.chars_needed(), 1);
        doc.set_text("a".repeat(20));
        assert!(doc.text_within_bounds());
        doc.set_text("a".repeat(10_000));
        assert!(doc.text_within_bounds());
        doc.set_text("a".repeat(10_001));
        assert!(matches!(
            doc.validate_text(),
            Err(PdfGenError::TextTooLong { len: 10_001, max: 10_000 })
        ));
    }

    #[test]
    fn text_length_counts_characters_not_bytes() {
        let mut doc = DocumentContent::new(ContentLimits::default());
        doc.set_text("é".repeat(20));
        assert_eq!(doc.text().len(), 40);
        assert!(doc.text_within_bounds());
    }

    #[test]
    fn add_appends_in_order() {
        let mut doc = doc_with(&["a", "b"]);
        doc.add_images(vec![asset("c"), asset("d")]);
        assert_eq!(names(&doc), ["a", "b", "c", "d"]);
        assert_dense(&doc);
    }

    #[test]
    fn remove_redensifies() {
        let mut doc = doc_with(&["a", "b", "c"]);
        let removed = doc.remove_image(1).unwrap();
        assert_eq!(removed.name(), "b");
        assert_eq!(names(&doc), ["a", "c"]);
        assert_dense(&doc);
        assert!(doc.remove_image(5).is_none());
    }

    #[test]
    fn remove_then_add_restores_set() {
        let mut doc = doc_with(&["a", "b", "c"]);
        let before: Vec<ImageAsset> = doc.images().to_vec();
        let removed = doc.remove_image(0).unwrap();
        doc.add_images([removed]);
        for img in &before {
            assert!(doc.images().contains(img));
        }
        assert_eq!(doc.image_count(), before.len());
        assert_dense(&doc);
    }

    #[test]
    fn removing_an_image_releases_its_preview() {
        let tracker = crate::asset::PreviewTracker::new();
        let mut doc = DocumentContent::new(ContentLimits::default());
        doc.add_images([
            asset("a").with_preview(tracker.acquire()),
            asset("b").with_preview(tracker.acquire()),
        ]);
        assert_eq!(tracker.live(), 2);
        drop(doc.remove_image(0));
        assert_eq!(tracker.live(), 1);
        doc.clear_images();
        assert_eq!(tracker.live(), 0);
    }

    #[test]
    fn move_swaps_neighbours() {
        let mut doc = doc_with(&["a", "b", "c"]);
        assert!(doc.move_image(2, MoveDirection::Up));
        assert_eq!(names(&doc), ["a", "c", "b"]);
        assert!(doc.move_image(0, MoveDirection::Down));
        assert_eq!(names(&doc), ["c", "a", "b"]);
        assert_dense(&doc);
    }

    #[test]
    fn move_at_boundary_is_noop() {
        let mut doc = doc_with(&["a", "b", "c"]);
        assert!(!doc.move_image(0, MoveDirection::Up));
        assert!(!doc.move_image(2, MoveDirection::Down));
        assert!(!doc.move_image(7, MoveDirection::Up));
        assert_eq!(names(&doc), ["a", "b", "c"]);
        assert_dense(&doc);
    }

    #[test]
    fn indices_stay_dense_through_mixed_operations() {
        let mut doc = doc_with(&["a", "b", "c", "d", "e"]);
        let ops: [(usize, Option<MoveDirection>); 8] = [
            (4, Some(MoveDirection::Up)),
            (1, None),
            (0, Some(MoveDirection::Down)),
            (3, Some(MoveDirection::Down)),
            (2, None),
            (0, Some(MoveDirection::Up)),
            (1, Some(MoveDirection::Up)),
            (0, None),
        ];
        for (i, (index, op)) in ops.into_iter().enumerate() {
            match op {
                Some(dir) => {
                    doc.move_image(index, dir);
                }
                None => {
                    doc.remove_image(index);
                }
            }
            if i % 3 == 0 {
                doc.add_images([asset(&format!("x{i}"))]);
            }
            assert_dense(&doc);
        }
    }

    #[test]
    fn empty_title_is_cleared() {
        let mut doc = DocumentContent::default();
        doc.set_title("Quarterly report");
        assert_eq!(doc.title(), Some("Quarterly report"));
        doc.set_title("   ");
        assert_eq!(doc.title(), None);
    }

    #[test]
    fn options_out_of_domain_leave_state_unchanged() {
        let mut doc = DocumentContent::new(ContentLimits::default());
        let good = RenderOptions {
            page_size: PageSize::Letter,
            orientation: Orientation::Landscape,
            margins: Margins::uniform(10.0),
        };
        doc.set_options(good).unwrap();

        let negative = RenderOptions {
            margins: Margins {
                left: -1.0,
                ..Margins::default()
            },
            ..good
        };
        assert!(matches!(
            doc.set_options(negative),
            Err(PdfGenError::InvalidOption(_))
        ));

        let huge = RenderOptions {
            margins: Margins::uniform(51.0),
            ..good
        };
        assert!(doc.set_options(huge).is_err());

        let nan = RenderOptions {
            margins: Margins::uniform(f32::NAN),
            ..good
        };
        assert!(doc.set_options(nan).is_err());

        assert_eq!(doc.options(), Some(&good));
    }

    #[test]
    fn enum_parsing() {
        assert_eq!("letter".parse::<PageSize>().unwrap(), PageSize::Letter);
        assert_eq!("A4".parse::<PageSize>().unwrap(), PageSize::A4);
        assert!("A3".parse::<PageSize>().is_err());
        assert_eq!(
            "Landscape".parse::<Orientation>().unwrap(),
            Orientation::Landscape
        );
        assert_eq!("h2".parse::<HeadingLevel>().unwrap(), HeadingLevel::H2);
        assert!("h7".parse::<HeadingLevel>().is_err());
    }

    #[test]
    fn options_serialise_with_wire_names() {
        let json = serde_json::to_value(RenderOptions::default()).unwrap();
        assert_eq!(json["pageSize"], "A4");
        assert_eq!(json["orientation"], "portrait");
        assert_eq!(json["margins"]["top"], 20.0);
    }
}
