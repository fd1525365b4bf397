//! Batch processing of files and directories.
//!
//! [`process_path`] dispatches one input argument: a `.pdf` file is cleaned,
//! a directory is walked recursively for `.pdf` files (skipping outputs of
//! earlier runs by the `_clean` naming convention), and anything else is
//! skipped with a notice. Every file becomes a [`FileOutcome`] value; errors
//! never abort the batch. [`BatchSummary`] aggregates the outcomes for the
//! end-of-run line.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::clean::{CleanReport, DocumentCleaner};
use crate::error::UnmarkError;

/// Result of processing one file.
#[derive(Debug)]
pub enum FileOutcome {
    /// The file was cleaned and written to `output`.
    Cleaned {
        input: PathBuf,
        output: PathBuf,
        report: CleanReport,
    },
    /// The file was not processed (not a PDF, nothing to do).
    Skipped { path: PathBuf, reason: String },
    /// Processing failed; the batch continues with the next file.
    Failed { path: PathBuf, error: UnmarkError },
}

impl FileOutcome {
    /// Returns true if the file was cleaned.
    pub fn is_cleaned(&self) -> bool {
        matches!(self, FileOutcome::Cleaned { .. })
    }

    /// Returns true if the file was skipped.
    pub fn is_skipped(&self) -> bool {
        matches!(self, FileOutcome::Skipped { .. })
    }

    /// Returns true if processing failed.
    pub fn is_failed(&self) -> bool {
        matches!(self, FileOutcome::Failed { .. })
    }
}

impl fmt::Display for FileOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileOutcome::Cleaned { input, output, .. } => {
                let name = output.file_name().unwrap_or(output.as_os_str());
                write!(
                    f,
                    "[SUCCESS] Cleaned: {} -> {}",
                    input.display(),
                    Path::new(name).display()
                )
            }
            FileOutcome::Skipped { path, reason } => {
                write!(f, "[SKIP] {}: {}", reason, path.display())
            }
            FileOutcome::Failed { path, error } => {
                write!(f, "[ERROR] Could not process {}: {}", path.display(), error)
            }
        }
    }
}

/// Outcome counts for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    cleaned: usize,
    skipped: usize,
    failed: usize,
}

impl BatchSummary {
    /// Create an empty summary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count an outcome.
    pub fn record(&mut self, outcome: &FileOutcome) {
        match outcome {
            FileOutcome::Cleaned { .. } => self.cleaned += 1,
            FileOutcome::Skipped { .. } => self.skipped += 1,
            FileOutcome::Failed { .. } => self.failed += 1,
        }
    }

    /// Files cleaned.
    pub fn cleaned(&self) -> usize {
        self.cleaned
    }

    /// Files skipped.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Files that failed.
    pub fn failed(&self) -> usize {
        self.failed
    }

    /// Total outcomes recorded.
    pub fn total(&self) -> usize {
        self.cleaned + self.skipped + self.failed
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "All tasks finished. {} cleaned, {} skipped, {} failed.",
            self.cleaned, self.skipped, self.failed
        )
    }
}

/// Processes one input path and returns the outcome of every file touched.
///
/// A file argument is cleaned when it has a `.pdf` extension (case
/// insensitive) and skipped otherwise; a direct file argument is processed
/// even if its name carries the `_clean` marker. A directory argument is
/// walked recursively. Anything else (missing path, socket) is skipped.
pub fn process_path(cleaner: &DocumentCleaner, path: impl AsRef<Path>) -> Vec<FileOutcome> {
    let path = path.as_ref();
    if path.is_file() {
        if is_pdf(path) {
            vec![process_file(cleaner, path)]
        } else {
            vec![FileOutcome::Skipped {
                path: path.to_path_buf(),
                reason: "Not a PDF".to_string(),
            }]
        }
    } else if path.is_dir() {
        pdf_files_under(path)
            .iter()
            .map(|file| process_file(cleaner, file))
            .collect()
    } else {
        vec![FileOutcome::Skipped {
            path: path.to_path_buf(),
            reason: "Not a file or directory".to_string(),
        }]
    }
}

/// Collects the `.pdf` files under `dir`, recursively, in a deterministic
/// order, excluding files already carrying the `_clean` marker.
pub fn pdf_files_under(dir: impl AsRef<Path>) -> Vec<PathBuf> {
    let files: Vec<PathBuf> = WalkDir::new(dir.as_ref())
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| is_pdf(path) && !already_cleaned(path))
        .collect();
    debug!(dir = %dir.as_ref().display(), count = files.len(), "collected pdf files");
    files
}

fn process_file(cleaner: &DocumentCleaner, path: &Path) -> FileOutcome {
    match cleaner.clean_file(path) {
        Ok(Some((output, report))) => FileOutcome::Cleaned {
            input: path.to_path_buf(),
            output,
            report,
        },
        Ok(None) => FileOutcome::Skipped {
            path: path.to_path_buf(),
            reason: "No changes needed for".to_string(),
        },
        Err(error) => FileOutcome::Failed {
            path: path.to_path_buf(),
            error,
        },
    }
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

/// True when the file name carries the `_clean` marker of an earlier run.
fn already_cleaned(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.contains("_clean"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cleaned_outcome_display() {
        let outcome = FileOutcome::Cleaned {
            input: PathBuf::from("/docs/resume.pdf"),
            output: PathBuf::from("/docs/resume_clean.pdf"),
            report: CleanReport::default(),
        };
        assert_eq!(
            outcome.to_string(),
            "[SUCCESS] Cleaned: /docs/resume.pdf -> resume_clean.pdf"
        );
        assert!(outcome.is_cleaned());
    }

    #[test]
    fn test_skipped_outcome_display() {
        let outcome = FileOutcome::Skipped {
            path: PathBuf::from("/docs/photo.png"),
            reason: "Not a PDF".to_string(),
        };
        assert_eq!(outcome.to_string(), "[SKIP] Not a PDF: /docs/photo.png");
        assert!(outcome.is_skipped());
    }

    #[test]
    fn test_failed_outcome_display() {
        let outcome = FileOutcome::Failed {
            path: PathBuf::from("/docs/broken.pdf"),
            error: UnmarkError::PageGeometry("missing MediaBox".to_string()),
        };
        assert_eq!(
            outcome.to_string(),
            "[ERROR] Could not process /docs/broken.pdf: Invalid page geometry: missing MediaBox"
        );
        assert!(outcome.is_failed());
    }

    #[test]
    fn test_summary_counts_and_display() {
        let mut summary = BatchSummary::new();
        summary.record(&FileOutcome::Cleaned {
            input: PathBuf::from("a.pdf"),
            output: PathBuf::from("a_clean.pdf"),
            report: CleanReport::default(),
        });
        summary.record(&FileOutcome::Skipped {
            path: PathBuf::from("b.txt"),
            reason: "Not a PDF".to_string(),
        });
        summary.record(&FileOutcome::Skipped {
            path: PathBuf::from("c.txt"),
            reason: "Not a PDF".to_string(),
        });
        summary.record(&FileOutcome::Failed {
            path: PathBuf::from("d.pdf"),
            error: UnmarkError::ContentStream("bad stream".to_string()),
        });
        assert_eq!(summary.cleaned(), 1);
        assert_eq!(summary.skipped(), 2);
        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.total(), 4);
        assert_eq!(
            summary.to_string(),
            "All tasks finished. 1 cleaned, 2 skipped, 1 failed."
        );
    }

    #[test]
    fn test_is_pdf_matches_extension_case_insensitively() {
        assert!(is_pdf(Path::new("a.pdf")));
        assert!(is_pdf(Path::new("a.PDF")));
        assert!(is_pdf(Path::new("dir/a.Pdf")));
        assert!(!is_pdf(Path::new("a.pdf.txt")));
        assert!(!is_pdf(Path::new("apdf")));
    }

    #[test]
    fn test_already_cleaned_checks_file_name_only() {
        assert!(already_cleaned(Path::new("resume_clean.pdf")));
        assert!(already_cleaned(Path::new("x_cleaner.pdf")));
        assert!(!already_cleaned(Path::new("resume.pdf")));
        // Marker in a parent directory name does not count.
        assert!(!already_cleaned(Path::new("/batch_clean/resume.pdf")));
    }

    #[test]
    fn test_pdf_files_under_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir(root.join("nested")).unwrap();
        for name in [
            "b.pdf",
            "a.PDF",
            "skip.txt",
            "resume_clean.pdf",
            "nested/c.pdf",
        ] {
            std::fs::write(root.join(name), b"stub").unwrap();
        }

        let files = pdf_files_under(root);
        let names: Vec<String> = files
            .iter()
            .map(|p| {
                p.strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .into_owned()
            })
            .collect();
        assert_eq!(names, vec!["a.PDF", "b.pdf", "nested/c.pdf"]);
    }

    #[test]
    fn test_process_path_skips_non_pdf_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"text").unwrap();

        let outcomes = process_path(&DocumentCleaner::new(), &path);
        assert_eq!(outcomes.len(), 1);
        match &outcomes[0] {
            FileOutcome::Skipped { reason, .. } => assert_eq!(reason, "Not a PDF"),
            other => panic!("expected skip, got {other:?}"),
        }
    }

    #[test]
    fn test_process_path_skips_missing_path() {
        let outcomes = process_path(&DocumentCleaner::new(), "/no/such/path");
        assert_eq!(outcomes.len(), 1);
        match &outcomes[0] {
            FileOutcome::Skipped { reason, .. } => {
                assert_eq!(reason, "Not a file or directory");
            }
            other => panic!("expected skip, got {other:?}"),
        }
    }

    #[test]
    fn test_process_path_reports_corrupt_pdf_as_failed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"not a pdf at all").unwrap();

        let outcomes = process_path(&DocumentCleaner::new(), &path);
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].is_failed());
        assert!(outcomes[0].to_string().starts_with("[ERROR] Could not process"));
    }
}
