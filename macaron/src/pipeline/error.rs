//! Error types for the retrieval pipeline.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::extractor::ExtractError;
use crate::fetch::FetchError;

/// Result type for pipeline operations.
pub type RetrievalResult<T> = Result<T, RetrievalError>;

/// Reasons a retrieval run aborts.
///
/// "No package for this model" is not an error; see
/// [`RetrievalOutcome::NoMatchingPackage`](super::RetrievalOutcome::NoMatchingPackage).
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// No model was given and detection failed.
    #[error("model identifier could not be determined")]
    ModelUnknown,

    /// The catalog could not be fetched.
    #[error("catalog unavailable from {url}: {source}")]
    CatalogUnavailable {
        url: String,
        #[source]
        source: FetchError,
    },

    /// The catalog could not be parsed or the chosen entry is unusable.
    #[error("malformed catalog {}: {reason}", path.display())]
    CatalogMalformed { path: PathBuf, reason: String },

    /// The landing directory exists from an earlier run.
    #[error(
        "final destination folder {} already exists, please remove it to redownload",
        path.display()
    )]
    AlreadyDownloaded { path: PathBuf },

    /// The package could not be downloaded.
    #[error("failed to download {url}: {source}")]
    DownloadFailed {
        url: String,
        #[source]
        source: FetchError,
    },

    /// The package could not be unpacked.
    #[error("failed to extract {}: {source}", path.display())]
    ExtractFailed {
        path: PathBuf,
        #[source]
        source: ExtractError,
    },

    /// A directory could not be created, moved or read.
    #[error("filesystem error at {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl RetrievalError {
    pub(crate) fn filesystem(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }
}
