use std::path::PathBuf;

use ndarray_npy::{ReadNpyError, WriteNpyError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write array: {0}")]
    NpyWrite(#[from] WriteNpyError),

    #[error("failed to read array: {0}")]
    NpyRead(#[from] ReadNpyError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid data: {0}")]
    InvalidData(String),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }

    /// Filesystem failures keep the path they happened at.
    pub(crate) fn npy_write(path: impl Into<PathBuf>, err: WriteNpyError) -> Self {
        match err {
            WriteNpyError::Io(source) => Self::io(path, source),
            other => StoreError::NpyWrite(other),
        }
    }

    pub(crate) fn npy_read(path: impl Into<PathBuf>, err: ReadNpyError) -> Self {
        match err {
            ReadNpyError::Io(source) => Self::io(path, source),
            other => StoreError::NpyRead(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
