//! Document cleaning pipeline.
//!
//! [`DocumentCleaner`] ties the pieces together: for every page it blanks the
//! fixed bottom-right region, optionally adds the rectangles the
//! [`WatermarkDetector`](crate::detector::WatermarkDetector) finds, and hands
//! the set to the redaction applier. [`DocumentCleaner::clean_file`] wraps the
//! whole open → clean → save flow and derives the output path by inserting
//! `_clean` before the extension.
//!
//! # Usage
//!
//! ```no_run
//! use unmark_pdf::clean::DocumentCleaner;
//!
//! # fn main() -> unmark_pdf::Result<()> {
//! let cleaner = DocumentCleaner::new();
//! if let Some((output, report)) = cleaner.clean_file("resume.pdf")? {
//!     println!("wrote {} ({} rectangles)", output.display(), report.rectangles_applied);
//! }
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::detector::{DetectorOptions, WatermarkDetector};
use crate::document::PdfDocument;
use crate::error::Result;
use crate::geometry::Rect;
use crate::redaction;

/// The always-blanked rectangle anchored at the page's bottom-right corner.
///
/// Pure arithmetic: when `remove_width`/`remove_height` exceed the page
/// dimensions the left/top edges go negative, and the caller is expected to
/// clamp before applying.
pub fn fixed_corner_region(
    page_width: f64,
    page_height: f64,
    remove_width: f64,
    remove_height: f64,
) -> Rect {
    Rect::new(
        page_width - remove_width,
        page_height - remove_height,
        page_width,
        page_height,
    )
}

/// Derives the output path for a cleaned document: `_clean` inserted before
/// the extension (`resume.pdf` → `resume_clean.pdf`).
pub fn cleaned_output_path(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    let mut name = path.file_stem().unwrap_or_default().to_os_string();
    name.push("_clean");
    if let Some(extension) = path.extension() {
        name.push(".");
        name.push(extension);
    }
    path.with_file_name(name)
}

/// Configuration options for document cleaning.
#[derive(Debug, Clone)]
pub struct CleanOptions {
    /// Width, in points, of the always-blanked bottom-right region.
    pub remove_width: f64,
    /// Height, in points, of the always-blanked bottom-right region.
    pub remove_height: f64,
    /// Also detect and blank small isolated right-edge text fragments.
    pub detect_edge_text: bool,
    /// Remove annotations overlapping a blanked rectangle.
    pub remove_annotations: bool,
    /// Compact and compress the document before saving.
    pub compress_output: bool,
    /// Options for the edge-text detector.
    pub detector: DetectorOptions,
}

impl Default for CleanOptions {
    fn default() -> Self {
        Self {
            remove_width: 200.0,
            remove_height: 70.0,
            detect_edge_text: true,
            remove_annotations: true,
            compress_output: true,
            detector: DetectorOptions::default(),
        }
    }
}

/// Per-document cleaning totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanReport {
    /// Pages processed.
    pub pages: usize,
    /// Rectangles blanked across all pages (fixed regions plus detections).
    pub rectangles_applied: usize,
    /// Text-show operations removed.
    pub text_runs_removed: usize,
    /// Annotations removed.
    pub annotations_removed: usize,
}

/// Removes watermarks from documents.
#[derive(Debug, Clone, Default)]
pub struct DocumentCleaner {
    options: CleanOptions,
}

impl DocumentCleaner {
    /// Create a cleaner with the default options.
    pub fn new() -> Self {
        Self {
            options: CleanOptions::default(),
        }
    }

    /// Create a cleaner with custom options.
    pub fn with_options(options: CleanOptions) -> Self {
        Self { options }
    }

    /// The options this cleaner applies.
    pub fn options(&self) -> &CleanOptions {
        &self.options
    }

    /// Blanks the watermark regions on every page of an open document.
    ///
    /// Each page gets the fixed bottom-right region plus, when
    /// `detect_edge_text` is on, the detector's rectangles. A page whose text
    /// cannot be extracted still gets the fixed region; a page with invalid
    /// geometry fails the whole document.
    ///
    /// # Errors
    ///
    /// Returns an error if a page has no usable MediaBox or its content
    /// stream cannot be rewritten.
    pub fn clean_document(&self, document: &mut PdfDocument) -> Result<CleanReport> {
        let detector = WatermarkDetector::with_options(self.options.detector.clone());
        let mut report = CleanReport::default();

        for page_id in document.page_ids() {
            let page = document.page_rect(page_id)?;
            let fixed = fixed_corner_region(
                page.width(),
                page.height(),
                self.options.remove_width,
                self.options.remove_height,
            )
            .clamped_to(&page);

            let mut rects = Vec::with_capacity(4);
            if !fixed.is_empty() {
                rects.push(fixed);
            }
            if self.options.detect_edge_text {
                match document.extract_fragments(page_id) {
                    Ok(fragments) => rects.extend(
                        detector
                            .detect(&fragments, &page)
                            .into_iter()
                            .filter(|rect| !rect.is_empty()),
                    ),
                    Err(error) => warn!(
                        page = ?page_id,
                        error = %error,
                        "text extraction failed, applying fixed region only"
                    ),
                }
            }

            let outcome =
                redaction::redact_page(document, page_id, &rects, self.options.remove_annotations)?;
            report.pages += 1;
            report.rectangles_applied += rects.len();
            report.text_runs_removed += outcome.text_runs_removed;
            report.annotations_removed += outcome.annotations_removed;
        }
        Ok(report)
    }

    /// Cleans the document at `input` and writes the result next to it with
    /// a `_clean` suffix.
    ///
    /// Returns the output path and the report, or `None` when the document
    /// has no pages, in which case nothing is written.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be opened, cleaned, or saved.
    pub fn clean_file(&self, input: impl AsRef<Path>) -> Result<Option<(PathBuf, CleanReport)>> {
        let input = input.as_ref();
        let mut document = PdfDocument::open(input)?;
        let report = self.clean_document(&mut document)?;
        if report.pages == 0 {
            return Ok(None);
        }
        if self.options.compress_output {
            document.compact();
        }
        let output = cleaned_output_path(input);
        document.save(&output)?;
        info!(
            input = %input.display(),
            output = %output.display(),
            pages = report.pages,
            rectangles = report.rectangles_applied,
            text_runs = report.text_runs_removed,
            annotations = report.annotations_removed,
            "cleaned document"
        );
        Ok(Some((output, report)))
    }
}
