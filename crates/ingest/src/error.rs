use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or saving papers.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Folder '{0}' was not found")]
    FolderNotFound(PathBuf),

    #[error("No files found in the folder '{0}'")]
    EmptyFolder(PathBuf),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl IngestError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        IngestError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors raised by the PDF text extractor for a whole document.
#[derive(Error, Debug)]
pub enum PdfError {
    #[error("Failed to load PDF {path}: {reason}")]
    Load { path: PathBuf, reason: String },

    #[error("PDF {0} has no pages")]
    NoPages(PathBuf),
}

/// Errors raised by the chunk container.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Chunk file {0} does not exist")]
    NotFound(PathBuf),

    #[error("Unsupported chunk file version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed chunk file: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}
