//! Loading and saving Automerge documents in a data directory.

use automerge::AutoCommit;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::DocType;

/// One Automerge file per [`DocType`] under `data_dir`.
#[derive(Debug, Clone)]
pub struct DocumentStorage {
    data_dir: PathBuf,
}

impl DocumentStorage {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn path(&self, doc_type: DocType) -> PathBuf {
        self.data_dir.join(doc_type.filename())
    }

    pub fn exists(&self, doc_type: DocType) -> bool {
        self.path(doc_type).exists()
    }

    /// Loads a document from disk.
    ///
    /// Returns `Ok(None)` if the file doesn't exist.
    pub fn load(&self, doc_type: DocType) -> Result<Option<AutoCommit>, StorageError> {
        let path = self.path(doc_type);

        match fs::read(&path) {
            Ok(bytes) => {
                let doc = AutoCommit::load(&bytes)
                    .map_err(|e| StorageError::LoadError(path.clone(), e.to_string()))?;
                tracing::debug!(path = %path.display(), bytes = bytes.len(), "Loaded document");
                Ok(Some(doc))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::IoError(path, e)),
        }
    }

    /// Loads a document or starts an empty one.
    pub fn load_or_create(&self, doc_type: DocType) -> Result<AutoCommit, StorageError> {
        Ok(self.load(doc_type)?.unwrap_or_else(AutoCommit::new))
    }

    /// Saves a document, creating the data directory if needed.
    ///
    /// The bytes go to a sibling temp file first and are renamed into place,
    /// so a failed write never leaves a truncated document behind.
    pub fn save(&self, doc_type: DocType, doc: &mut AutoCommit) -> Result<(), StorageError> {
        fs::create_dir_all(&self.data_dir)
            .map_err(|e| StorageError::IoError(self.data_dir.clone(), e))?;

        let path = self.path(doc_type);
        let tmp = path.with_extension("automerge.tmp");
        let bytes = doc.save();

        fs::write(&tmp, &bytes).map_err(|e| StorageError::IoError(tmp.clone(), e))?;
        fs::rename(&tmp, &path).map_err(|e| StorageError::IoError(path.clone(), e))?;

        tracing::debug!(path = %path.display(), bytes = bytes.len(), "Saved document");
        Ok(())
    }
}

/// Errors that can occur during document storage operations.
#[derive(Debug)]
pub enum StorageError {
    /// I/O error reading or writing a file.
    IoError(PathBuf, io::Error),
    /// The file exists but is not a valid Automerge document.
    LoadError(PathBuf, String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::IoError(path, e) => {
                write!(f, "I/O error for {}: {}", path.display(), e)
            }
            StorageError::LoadError(path, e) => {
                write!(f, "Failed to load document {}: {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::IoError(_, e) => Some(e),
            StorageError::LoadError(_, _) => None,
        }
    }
}
