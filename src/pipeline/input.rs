//! Startup validation of the input PDF and the output location.
//!
//! Both checks run before the PDF is decoded or a backend is built. Failing
//! here is cheap and gives a precise message, where letting pdfium or the
//! final write fail would surface as an opaque error after minutes of work.

use crate::error::TranslatePdfError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Validate that `path` is an existing, readable file starting with `%PDF`.
pub fn resolve_input(path: impl AsRef<Path>) -> Result<PathBuf, TranslatePdfError> {
    let path = path.as_ref().to_path_buf();

    if !path.is_file() {
        return Err(TranslatePdfError::FileNotFound { path });
    }

    let mut file = match std::fs::File::open(&path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(TranslatePdfError::PermissionDenied { path });
        }
        Err(_) => return Err(TranslatePdfError::FileNotFound { path }),
    };

    // Short files keep the zero padding so the message still shows what was read.
    let mut magic = [0u8; 4];
    let mut read = 0;
    while read < magic.len() {
        match file.read(&mut magic[read..]) {
            Ok(0) => break,
            Ok(n) => read += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                return Err(TranslatePdfError::PermissionDenied { path });
            }
            Err(e) => {
                return Err(TranslatePdfError::CorruptPdf {
                    path,
                    detail: e.to_string(),
                })
            }
        }
    }
    if &magic != b"%PDF" {
        return Err(TranslatePdfError::NotAPdf { path, magic });
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(path)
}

/// Validate that the directory meant to hold `path` exists.
///
/// An empty parent (a bare file name) means the current directory.
pub fn validate_output(path: impl AsRef<Path>) -> Result<PathBuf, TranslatePdfError> {
    let path = path.as_ref().to_path_buf();
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };

    if !parent.is_dir() {
        return Err(TranslatePdfError::OutputDirMissing { path: parent });
    }
    if path.is_dir() {
        return Err(TranslatePdfError::OutputWriteFailed {
            source: std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "output path is a directory",
            ),
            path,
        });
    }

    Ok(path)
}

/// File name of the input, used for the document title.
pub fn document_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_input_is_file_not_found() {
        let err = resolve_input("/definitely/not/here.pdf").unwrap_err();
        assert!(matches!(err, TranslatePdfError::FileNotFound { .. }));
    }

    #[test]
    fn non_pdf_input_is_rejected() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"<html>not a pdf</html>").unwrap();
        let err = resolve_input(f.path()).unwrap_err();
        match err {
            TranslatePdfError::NotAPdf { magic, .. } => assert_eq!(&magic, b"<htm"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn truncated_input_is_rejected() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"%P").unwrap();
        assert!(matches!(
            resolve_input(f.path()),
            Err(TranslatePdfError::NotAPdf { .. })
        ));
    }

    #[test]
    fn pdf_magic_is_accepted() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"%PDF-1.7\n...").unwrap();
        assert_eq!(resolve_input(f.path()).unwrap(), f.path());
    }

    #[test]
    fn output_in_missing_directory_is_rejected() {
        let err = validate_output("/no/such/dir/out.html").unwrap_err();
        assert!(matches!(err, TranslatePdfError::OutputDirMissing { .. }));
    }

    #[test]
    fn output_in_existing_directory_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.html");
        assert_eq!(validate_output(&out).unwrap(), out);
        assert!(validate_output("bare.html").is_ok());
    }

    #[test]
    fn output_that_is_a_directory_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            validate_output(dir.path()),
            Err(TranslatePdfError::OutputWriteFailed { .. })
        ));
    }

    #[test]
    fn name_of_input() {
        assert_eq!(document_name(Path::new("/tmp/report.final.pdf")), "report.final.pdf");
        assert_eq!(document_name(Path::new("paper.pdf")), "paper.pdf");
    }
}
