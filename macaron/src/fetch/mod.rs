//! Retrieval of remote files to local paths.
//!
//! The catalog and the driver package are both fetched through the
//! [`Fetcher`] trait:
//!
//! - [`CommandFetcher`] shells out to curl or wget (default)
//! - [`HttpFetcher`] uses a blocking in-process HTTP client
//!
//! Every implementation overwrites the destination and never leaves a file
//! behind when it fails.

mod command;
mod http;

pub use command::{CommandFetcher, FetchTool};
pub use http::HttpFetcher;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

/// Result type for fetch operations.
pub type FetchResult<T> = Result<T, FetchError>;

/// Errors that can occur while fetching a URL.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The fetch tool could not be started.
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The fetch tool exited unsuccessfully.
    #[error("{program} exited with {status}: {stderr}")]
    CommandFailed {
        program: String,
        status: String,
        stderr: String,
    },

    /// The fetch reported success but produced no file.
    #[error("fetch reported success but {} was not created", path.display())]
    MissingOutput { path: PathBuf },

    /// HTTP request failed.
    #[error("request to {url} failed: {reason}")]
    Http { url: String, reason: String },

    /// Server answered with a non-success status.
    #[error("request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// Could not prepare or write the destination file.
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Capability to download the bytes at a URL into a local file.
pub trait Fetcher {
    /// Short name for logging.
    fn name(&self) -> &'static str;

    /// Download `url` to `dest`, replacing any existing file.
    ///
    /// Returns the size of the written file in bytes. On failure no file is
    /// left at `dest`.
    fn fetch(&self, url: &str, dest: &Path) -> FetchResult<u64>;
}

/// Fetcher implementations selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetcherKind {
    /// `curl` subprocess.
    #[default]
    Curl,
    /// `wget` subprocess.
    Wget,
    /// In-process HTTP client.
    Http,
}

impl FetcherKind {
    /// All kinds, in display order.
    pub fn all() -> &'static [FetcherKind] {
        &[FetcherKind::Curl, FetcherKind::Wget, FetcherKind::Http]
    }

    /// Configuration name of the kind.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Curl => "curl",
            Self::Wget => "wget",
            Self::Http => "http",
        }
    }

    /// Build the fetcher, applying an optional per-request timeout.
    pub fn build(&self, timeout: Option<Duration>) -> FetchResult<Box<dyn Fetcher>> {
        let fetcher: Box<dyn Fetcher> = match self {
            Self::Curl => Box::new(CommandFetcher::new(FetchTool::Curl).with_timeout(timeout)),
            Self::Wget => Box::new(CommandFetcher::new(FetchTool::Wget).with_timeout(timeout)),
            Self::Http => Box::new(HttpFetcher::new(timeout)?),
        };
        Ok(fetcher)
    }
}

impl fmt::Display for FetcherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FetcherKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "curl" => Ok(Self::Curl),
            "wget" => Ok(Self::Wget),
            "http" => Ok(Self::Http),
            other => Err(format!(
                "unknown fetcher '{}' (expected curl, wget or http)",
                other
            )),
        }
    }
}

/// Remove an existing or partial destination file.
pub(crate) fn remove_destination(dest: &Path) -> FetchResult<()> {
    match fs::remove_file(dest) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(FetchError::Write {
            path: dest.to_path_buf(),
            source: e,
        }),
    }
}

/// Make sure the destination's parent directory exists.
pub(crate) fn prepare_destination(dest: &Path) -> FetchResult<()> {
    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| FetchError::Write {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    remove_destination(dest)
}

/// Drop whatever a failed fetch left behind.
pub(crate) fn discard_partial(dest: &Path) {
    if let Err(e) = remove_destination(dest) {
        tracing::warn!(path = %dest.display(), error = %e, "Failed to remove partial download");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_fetcher_kind_parse() {
        assert_eq!("curl".parse::<FetcherKind>().unwrap(), FetcherKind::Curl);
        assert_eq!(" WGET ".parse::<FetcherKind>().unwrap(), FetcherKind::Wget);
        assert_eq!("http".parse::<FetcherKind>().unwrap(), FetcherKind::Http);
        assert!("ftp".parse::<FetcherKind>().is_err());
    }

    #[test]
    fn test_fetcher_kind_round_trips_names() {
        for kind in FetcherKind::all() {
            assert_eq!(kind.name().parse::<FetcherKind>().unwrap(), *kind);
        }
        assert_eq!(FetcherKind::default(), FetcherKind::Curl);
    }

    #[test]
    fn test_build_names() {
        assert_eq!(FetcherKind::Curl.build(None).unwrap().name(), "curl");
        assert_eq!(FetcherKind::Wget.build(None).unwrap().name(), "wget");
        assert_eq!(
            FetcherKind::Http
                .build(Some(Duration::from_secs(5)))
                .unwrap()
                .name(),
            "http"
        );
    }

    #[test]
    fn test_prepare_destination_creates_parent_and_clears_file() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("nested").join("catalog.plist");

        prepare_destination(&dest).unwrap();
        assert!(dest.parent().unwrap().is_dir());

        fs::write(&dest, "stale").unwrap();
        prepare_destination(&dest).unwrap();
        assert!(!dest.exists());
    }
}
