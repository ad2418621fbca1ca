//! Subprocess-based fetcher (curl / wget).

use std::ffi::OsString;
use std::path::Path;
use std::process::Command;
use std::time::Duration;

use super::{discard_partial, prepare_destination, FetchError, FetchResult, Fetcher};

/// External download tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchTool {
    /// curl, bundled with macOS and Windows 10+.
    Curl,
    /// GNU wget.
    Wget,
}

impl FetchTool {
    /// Executable name for the running platform.
    pub fn program(&self) -> &'static str {
        match (self, cfg!(windows)) {
            (Self::Curl, true) => "curl.exe",
            (Self::Curl, false) => "curl",
            (Self::Wget, true) => "wget.exe",
            (Self::Wget, false) => "wget",
        }
    }

    /// Arguments to download `url` into `dest`.
    ///
    /// Both tools are told to fail on HTTP errors and to stay quiet apart
    /// from error output.
    pub fn args(&self, url: &str, dest: &Path, timeout: Option<Duration>) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::new();
        match self {
            Self::Curl => {
                args.extend(
                    ["--fail", "--silent", "--show-error", "--location"]
                        .into_iter()
                        .map(OsString::from),
                );
                if let Some(timeout) = timeout {
                    args.push("--max-time".into());
                    args.push(timeout.as_secs().to_string().into());
                }
                args.push("--output".into());
                args.push(dest.as_os_str().to_os_string());
            }
            Self::Wget => {
                args.push("--quiet".into());
                if let Some(timeout) = timeout {
                    args.push(format!("--timeout={}", timeout.as_secs()).into());
                }
                args.push("--output-document".into());
                args.push(dest.as_os_str().to_os_string());
            }
        }
        args.push(url.into());
        args
    }
}

/// Fetcher that delegates to an external download tool.
#[derive(Debug, Clone)]
pub struct CommandFetcher {
    tool: FetchTool,
    program: String,
    timeout: Option<Duration>,
}

impl CommandFetcher {
    /// Create a fetcher for the given tool using its default executable.
    pub fn new(tool: FetchTool) -> Self {
        Self {
            tool,
            program: tool.program().to_string(),
            timeout: None,
        }
    }

    /// Use a specific executable path for the tool.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Set the per-request timeout passed to the tool.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn run(&self, url: &str, dest: &Path) -> FetchResult<u64> {
        let args = self.tool.args(url, dest, self.timeout);
        tracing::debug!(program = %self.program, ?args, "Spawning fetch tool");

        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .map_err(|e| FetchError::Spawn {
                program: self.program.clone(),
                source: e,
            })?;

        if !output.status.success() {
            return Err(FetchError::CommandFailed {
                program: self.program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let metadata = dest.metadata().map_err(|_| FetchError::MissingOutput {
            path: dest.to_path_buf(),
        })?;

        Ok(metadata.len())
    }
}

impl Fetcher for CommandFetcher {
    fn name(&self) -> &'static str {
        match self.tool {
            FetchTool::Curl => "curl",
            FetchTool::Wget => "wget",
        }
    }

    fn fetch(&self, url: &str, dest: &Path) -> FetchResult<u64> {
        prepare_destination(dest)?;

        match self.run(url, dest) {
            Ok(size) => {
                tracing::debug!(url, path = %dest.display(), bytes = size, "Fetch complete");
                Ok(size)
            }
            Err(e) => {
                discard_partial(dest);
                Err(e)
            }
        }
    }
}
