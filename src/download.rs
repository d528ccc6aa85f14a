//! Saving a finished PDF under a name derived from the document title.

use crate::error::PdfGenError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Name used when the document has no usable title.
pub const DEFAULT_FILE_STEM: &str = "document";

// Path separators, reserved Windows characters and control characters.
static RE_HOSTILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[\\/:*?"<>|\x00-\x1F\x7F]+"#).unwrap());

// One or more trailing `.pdf` suffixes, any case.
static RE_PDF_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(\.pdf)+$").unwrap());

/// Filename for a PDF titled `title`.
///
/// The result always ends in exactly one `.pdf`; repeated suffixes on the
/// title are collapsed.
///
/// ```rust
/// use edgequake_pdfgen::download::pdf_filename;
///
/// assert_eq!(pdf_filename(Some("Q3 Report")), "Q3 Report.pdf");
/// assert_eq!(pdf_filename(Some("notes.PDF")), "notes.pdf");
/// assert_eq!(pdf_filename(Some("a/b")), "a_b.pdf");
/// assert_eq!(pdf_filename(None), "document.pdf");
/// ```
pub fn pdf_filename(title: Option<&str>) -> String {
    let title = title.unwrap_or_default().trim();
    let stem = RE_PDF_SUFFIX.replace(title, "");
    let stem = RE_HOSTILE.replace_all(&stem, "_");
    let stem = stem.trim_matches(|c: char| c == '.' || c.is_whitespace());

    if stem.is_empty() {
        format!("{DEFAULT_FILE_STEM}.pdf")
    } else {
        format!("{stem}.pdf")
    }
}

/// Write `pdf_bytes` into `dir` as [`pdf_filename`]`(title)`.
///
/// The bytes go to a temporary file in `dir` first and are then renamed into
/// place, so a failed write never leaves a partial PDF behind. An existing
/// file of the same name is replaced.
pub fn save_pdf(
    pdf_bytes: &[u8],
    title: Option<&str>,
    dir: &Path,
) -> Result<PathBuf, PdfGenError> {
    let path = dir.join(pdf_filename(title));
    let write_failed = |source| PdfGenError::OutputWriteFailed {
        path: path.clone(),
        source,
    };

    std::fs::create_dir_all(dir).map_err(write_failed)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_failed)?;
    tmp.write_all(pdf_bytes).map_err(write_failed)?;
    tmp.flush().map_err(write_failed)?;
    tmp.persist(&path).map_err(|e| write_failed(e.error))?;

    info!("Saved {} bytes to {}", pdf_bytes.len(), path.display());
    Ok(path)
}
