//! CLI error type.

use std::fmt;

use macaron::config::ConfigError;
use macaron::fetch::FetchError;
use macaron::installer::InstallError;
use macaron::pipeline::RetrievalError;

/// Errors surfaced to the user by CLI commands.
#[derive(Debug)]
pub enum CliError {
    /// Invalid or missing configuration.
    Config(String),
    /// A fetcher could not be constructed.
    Fetch(FetchError),
    /// Retrieval run failed.
    Retrieval(RetrievalError),
    /// Driver installation could not be scheduled.
    Install(InstallError),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "{}", msg),
            CliError::Fetch(e) => write!(f, "{}", e),
            CliError::Retrieval(RetrievalError::ModelUnknown) => write!(
                f,
                "{}; specify one with --model",
                RetrievalError::ModelUnknown
            ),
            CliError::Retrieval(e) => write!(f, "{}", e),
            CliError::Install(e) => write!(f, "Installation failed: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(_) => None,
            CliError::Fetch(e) => Some(e),
            CliError::Retrieval(e) => Some(e),
            CliError::Install(e) => Some(e),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<FetchError> for CliError {
    fn from(e: FetchError) -> Self {
        CliError::Fetch(e)
    }
}

impl From<RetrievalError> for CliError {
    fn from(e: RetrievalError) -> Self {
        CliError::Retrieval(e)
    }
}

impl From<InstallError> for CliError {
    fn from(e: InstallError) -> Self {
        CliError::Install(e)
    }
}
