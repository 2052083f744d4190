use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Why a block could not be accepted while scanning a key file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatViolation {
    /// The bytes at the cursor do not frame or decode as a PEM block.
    MalformedBlock,
    /// The block decoded, but its type does not start with the key prefix.
    MissingPrefix { expected: &'static str, found: String },
}

impl std::fmt::Display for FormatViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormatViolation::MalformedBlock => write!(f, "error decoding PEM block"),
            FormatViolation::MissingPrefix { expected, found } => {
                write!(f, "missing '{expected}' in block type '{found}'")
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum KeyFileError {
    #[error("key file handle is absent or already closed")]
    NilStream,

    #[error("empty file while reading {}", display_path(.path))]
    EmptyFile { path: Option<PathBuf> },

    #[error("invalid index {index} while reading {}: {found} key(s) available", display_path(.path))]
    InvalidIndex {
        path: Option<PathBuf>,
        index: isize,
        found: usize,
    },

    #[error("invalid PEM file {}: {reason}", display_path(.path))]
    InvalidFormat {
        path: Option<PathBuf>,
        reason: FormatViolation,
    },

    #[error("I/O error on {}: {source}", display_path(.path))]
    Io {
        path: Option<PathBuf>,
        #[source]
        source: io::Error,
    },
}

fn display_path(path: &Option<PathBuf>) -> String {
    match path {
        Some(p) => p.display().to_string(),
        None => "<stream>".to_string(),
    }
}

impl KeyFileError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        KeyFileError::Io {
            path: Some(path.into()),
            source,
        }
    }

    /// Attaches `path` to errors raised while decoding an in-memory buffer.
    pub(crate) fn with_path(self, path: &std::path::Path) -> Self {
        match self {
            KeyFileError::InvalidIndex { index, found, .. } => KeyFileError::InvalidIndex {
                path: Some(path.to_path_buf()),
                index,
                found,
            },
            KeyFileError::InvalidFormat { reason, .. } => KeyFileError::InvalidFormat {
                path: Some(path.to_path_buf()),
                reason,
            },
            KeyFileError::Io { source, .. } => KeyFileError::io(path, source),
            KeyFileError::EmptyFile { .. } => KeyFileError::EmptyFile {
                path: Some(path.to_path_buf()),
            },
            KeyFileError::NilStream => KeyFileError::NilStream,
        }
    }
}

pub type Result<T> = std::result::Result<T, KeyFileError>;
