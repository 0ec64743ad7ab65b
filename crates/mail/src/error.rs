//! Error taxonomy for mail operations
//!
//! Every variant aborts the current unit of work (one search, one send).
//! Nothing here is retried.

use std::path::PathBuf;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Credentials missing, invalid or rejected by the provider
    #[error("Authentication failed: {0:#}")]
    Auth(anyhow::Error),

    /// A provider call failed
    #[error("{context}")]
    Transport {
        context: String,
        #[source]
        source: ureq::Error,
    },

    /// A provider message lacks structure the pipeline relies on
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    /// An attachment part carries no usable filename
    #[error("Attachment has no filename: {0}")]
    MissingFilename(String),

    /// Folder or file I/O failed
    #[error("Filesystem error at {}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An outgoing message could not be encoded
    #[error("Encoding error: {0}")]
    Encoding(String),
}

impl Error {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedMessage(msg.into())
    }

    pub(crate) fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn transport(context: impl Into<String>, source: ureq::Error) -> Self {
        Self::Transport {
            context: context.into(),
            source,
        }
    }
}
