//! # unmark-pdf
//!
//! Removes injected watermarks from PDF files by blanking a fixed
//! bottom-right region on every page and, on top of that, detecting and
//! blanking small isolated text fragments near the right edge (the usual
//! shape of "© site.com" stamps). Detection is purely geometric: no text
//! matching, no allow-lists.
//!
//! ## Features
//!
//! - **Fixed-region erase**: always blanks a configurable bottom-right
//!   corner area on every page
//! - **Edge-text detection**: classifies fragments as body vs. stamp from
//!   layout alone, with a position-based rule (default) and a distance-based
//!   fallback rule
//! - **True redaction**: covered text-show operations are removed from the
//!   content stream, not merely painted over
//! - **Annotation sweep**: link annotations riding on blanked areas are
//!   dropped
//! - **Batch processing**: recursive directory walk that skips `_clean`
//!   outputs of earlier runs, with per-file outcomes and a summary
//!
//! ## Quick Start
//!
//! ### Cleaning one file
//!
//! ```rust,no_run
//! use unmark_pdf::DocumentCleaner;
//!
//! # fn main() -> unmark_pdf::Result<()> {
//! let cleaner = DocumentCleaner::new();
//! if let Some((output, report)) = cleaner.clean_file("resume.pdf")? {
//!     println!(
//!         "{}: {} rectangles blanked on {} pages",
//!         output.display(),
//!         report.rectangles_applied,
//!         report.pages
//!     );
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ### Processing a directory
//!
//! ```rust,no_run
//! use unmark_pdf::{process_path, BatchSummary, DocumentCleaner};
//!
//! let cleaner = DocumentCleaner::new();
//! let mut summary = BatchSummary::new();
//! for outcome in process_path(&cleaner, "./inbox") {
//!     println!("{outcome}");
//!     summary.record(&outcome);
//! }
//! println!("{summary}");
//! ```
//!
//! ## Modules
//!
//! - [`clean`] - cleaning pipeline: fixed region, options, output naming
//! - [`detector`] - watermark-candidate classification
//! - [`redaction`] - content-stream redaction applier
//! - [`batch`] - file/directory dispatch and outcome reporting
//! - [`document`] - document handle, page geometry, saving
//! - [`extraction`] - content-stream text interpreter
//! - [`geometry`] - rectangle math in top-left page coordinates
//! - [`error`] - error type and crate `Result`

pub mod batch;
pub mod clean;
pub mod detector;
pub mod document;
pub mod error;
pub mod extraction;
pub mod geometry;
pub mod redaction;

// Re-export the cleaning pipeline
pub use clean::{
    cleaned_output_path, fixed_corner_region, CleanOptions, CleanReport, DocumentCleaner,
};

// Re-export detection types
pub use detector::{DetectionPolicy, DetectorOptions, WatermarkDetector};

// Re-export batch processing
pub use batch::{pdf_files_under, process_path, BatchSummary, FileOutcome};

// Re-export supporting types
pub use document::PdfDocument;
pub use error::{Result, UnmarkError};
pub use extraction::{FragmentKind, TextFragment};
pub use geometry::Rect;
pub use redaction::{redact_page, RedactionOutcome};

/// Current version of unmark-pdf
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
