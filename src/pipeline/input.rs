//! Input validation: check a user-supplied path before pdfium sees it.
//!
//! pdfium reports a missing file, an unreadable file and a non-PDF alike as
//! a generic load failure. Checking existence, read permission and the
//! `%PDF` magic bytes up front gives callers a meaningful error instead.

use crate::error::StudyGenError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Validate that `path` names a readable PDF file.
pub fn validate_pdf_path(path: &Path) -> Result<PathBuf, StudyGenError> {
    let path = path.to_path_buf();

    if !path.is_file() {
        return Err(StudyGenError::FileNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
                return Err(StudyGenError::NotAPdf { path, magic });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(StudyGenError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(StudyGenError::FileNotFound { path });
        }
    }

    debug!("Validated PDF path: {}", path.display());
    Ok(path)
}
