//! In-process HTTP fetcher.
//!
//! Streams the response body straight to disk through a buffered writer.
//! There is no resume support: a failed transfer is discarded and the caller
//! starts over.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Duration;

use reqwest::blocking::Client;

use super::{discard_partial, prepare_destination, FetchError, FetchResult, Fetcher};

/// Buffer size for writing downloads (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// `User-Agent` sent with every request.
const USER_AGENT: &str = concat!("macaron/", env!("CARGO_PKG_VERSION"));

/// Fetcher backed by a blocking HTTP client.
#[derive(Debug)]
pub struct HttpFetcher {
    client: Client,
    timeout: Option<Duration>,
}

impl HttpFetcher {
    /// Create a fetcher with an optional whole-request timeout.
    pub fn new(timeout: Option<Duration>) -> FetchResult<Self> {
        let mut builder = Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder.build().map_err(|e| FetchError::Http {
            url: String::new(),
            reason: format!("failed to create HTTP client: {}", e),
        })?;

        Ok(Self { client, timeout })
    }

    /// The configured request timeout.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn stream(&self, url: &str, dest: &Path) -> FetchResult<u64> {
        let mut response = self
            .client
            .get(url)
            .send()
            .map_err(|e| FetchError::Http {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let file = File::create(dest).map_err(|e| FetchError::Write {
            path: dest.to_path_buf(),
            source: e,
        })?;
        let mut writer = BufWriter::with_capacity(BUFFER_SIZE, file);

        let written = response
            .copy_to(&mut writer)
            .map_err(|e| FetchError::Http {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        writer.flush().map_err(|e| FetchError::Write {
            path: dest.to_path_buf(),
            source: e,
        })?;

        Ok(written)
    }
}

impl Fetcher for HttpFetcher {
    fn name(&self) -> &'static str {
        "http"
    }

    fn fetch(&self, url: &str, dest: &Path) -> FetchResult<u64> {
        prepare_destination(dest)?;
        tracing::debug!(url, path = %dest.display(), "Starting HTTP download");

        match self.stream(url, dest) {
            Ok(size) => {
                tracing::debug!(url, bytes = size, "HTTP download complete");
                Ok(size)
            }
            Err(e) => {
                discard_partial(dest);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_http_fetcher_keeps_timeout() {
        let fetcher = HttpFetcher::new(Some(Duration::from_secs(30))).unwrap();
        assert_eq!(fetcher.timeout(), Some(Duration::from_secs(30)));
        assert_eq!(fetcher.name(), "http");
    }

    #[test]
    fn test_invalid_url_leaves_no_file() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("package.pkg");
        std::fs::write(&dest, "stale").unwrap();

        let fetcher = HttpFetcher::new(None).unwrap();
        let result = fetcher.fetch("not a url", &dest);

        assert!(matches!(result, Err(FetchError::Http { .. })));
        assert!(!dest.exists());
    }
}
