use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while opening, inspecting, or rewriting a PDF document.
#[derive(Error, Debug)]
pub enum UnmarkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("Document is encrypted: {0}")]
    Encrypted(PathBuf),

    #[error("Invalid page geometry: {0}")]
    PageGeometry(String),

    #[error("Invalid content stream: {0}")]
    ContentStream(String),

    #[error("Failed to save document to {path}: {source}")]
    Save {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, UnmarkError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error as IoError, ErrorKind};

    #[test]
    fn test_error_display() {
        let error = UnmarkError::PageGeometry("missing MediaBox".to_string());
        assert_eq!(error.to_string(), "Invalid page geometry: missing MediaBox");
    }

    #[test]
    fn test_encrypted_display_includes_path() {
        let error = UnmarkError::Encrypted(PathBuf::from("locked.pdf"));
        assert_eq!(error.to_string(), "Document is encrypted: locked.pdf");
    }

    #[test]
    fn test_save_display_includes_path_and_source() {
        let error = UnmarkError::Save {
            path: PathBuf::from("out.pdf"),
            source: IoError::new(ErrorKind::PermissionDenied, "read-only filesystem"),
        };
        assert_eq!(
            error.to_string(),
            "Failed to save document to out.pdf: read-only filesystem"
        );
    }

    #[test]
    fn test_error_debug() {
        let error = UnmarkError::ContentStream("unbalanced BT/ET".to_string());
        let debug_str = format!("{:?}", error);
        assert!(debug_str.contains("ContentStream"));
        assert!(debug_str.contains("unbalanced BT/ET"));
    }

    #[test]
    fn test_error_from_io_error() {
        let io_error = IoError::new(ErrorKind::NotFound, "file not found");
        let error = UnmarkError::from(io_error);

        match error {
            UnmarkError::Io(ref err) => assert_eq!(err.kind(), ErrorKind::NotFound),
            _ => panic!("Expected IO error variant"),
        }
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<UnmarkError>();
    }
}
