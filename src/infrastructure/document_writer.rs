//! Writes exported documents without exposing partial files.
//!
//! A document is first staged in a temporary file beside its target and
//! only becomes visible on `commit`. Dropping an uncommitted stage removes
//! the temporary file.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::domain::{AppError, Result};

/// A fully written document waiting to be moved into place.
#[derive(Debug)]
pub struct StagedDocument {
    temp: NamedTempFile,
    path: PathBuf,
}

impl StagedDocument {
    /// Final location of the document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Move the document to its target with an atomic rename.
    ///
    /// # Errors
    /// Returns `AppError::Export` if the rename fails; the target is left
    /// untouched in that case.
    pub fn commit(self) -> Result<()> {
        let Self { temp, path } = self;
        temp.persist(&path)
            .map_err(|e| AppError::export(format!("Failed to save {}", path.display()), e.error))?;

        tracing::debug!(path = %path.display(), "Document written");
        Ok(())
    }
}

/// Write `bytes` to a temporary file in the directory of `path`.
///
/// # Errors
/// Returns `AppError::Export` if the directory cannot be created or the
/// temporary file cannot be written.
pub fn stage_document(path: &Path, bytes: &[u8]) -> Result<StagedDocument> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    std::fs::create_dir_all(parent)
        .map_err(|e| AppError::export(format!("Cannot create {}", parent.display()), e))?;

    let mut temp = NamedTempFile::new_in(parent)
        .map_err(|e| AppError::export("Failed to create temporary file", e))?;

    temp.write_all(bytes)
        .and_then(|()| temp.flush())
        .map_err(|e| AppError::export("Failed to write document", e))?;

    Ok(StagedDocument {
        temp,
        path: path.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn test_commit_creates_parent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/out.pdf");

        let staged = stage_document(&path, b"%PDF-1.3").unwrap();
        assert_eq!(staged.path(), path);
        assert!(!path.exists());

        staged.commit().unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.3");
    }

    #[test]
    fn test_dropped_stage_leaves_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.pdf");

        drop(stage_document(&path, b"%PDF").unwrap());
        assert!(!path.exists());
        assert_eq!(entries(dir.path()), 0);
    }

    #[test]
    fn test_parent_is_a_file() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();

        let err = stage_document(&blocker.join("out.pdf"), b"%PDF").unwrap_err();
        assert!(matches!(err, AppError::Export { .. }));
    }

    #[test]
    fn test_commit_onto_directory_fails() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("taken.pdf");
        std::fs::create_dir(&target).unwrap();
        std::fs::write(target.join("keep"), "x").unwrap();

        let err = stage_document(&target, b"%PDF")
            .unwrap()
            .commit()
            .unwrap_err();
        assert!(matches!(err, AppError::Export { .. }));
        assert!(target.join("keep").exists());
    }
}
