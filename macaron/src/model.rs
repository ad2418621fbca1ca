//! Hardware model detection.
//!
//! Each supported operating system exposes the machine model differently:
//!
//! - Windows: CIM `Win32_ComputerSystem.Model`, queried through PowerShell
//! - macOS: the `Model Identifier` line of `system_profiler SPHardwareDataType`
//! - Linux: the DMI product name file
//!
//! All strategies implement [`ModelDetector`] and are compiled on every host.
//! [`platform_detector`] picks the one matching the running OS, so callers
//! (and tests) only ever deal with the trait.

use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::str::FromStr;

use thiserror::Error;

/// Default DMI file holding the product name on Linux.
pub const DMI_PRODUCT_NAME_PATH: &str = "/sys/class/dmi/id/product_name";

/// A hardware model identifier such as `MacBookPro15,1`.
///
/// Opaque apart from substring checks against catalog entries. Surrounding
/// whitespace is trimmed and empty identifiers are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelIdentifier(String);

impl ModelIdentifier {
    /// Create an identifier from raw text, returning `None` if it is blank.
    pub fn new(raw: impl AsRef<str>) -> Option<Self> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// The identifier text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModelIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ModelIdentifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for ModelIdentifier {
    type Err = DetectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or_else(|| DetectError::NotReported("empty model identifier".into()))
    }
}

/// Reasons a detection strategy could not produce a model.
#[derive(Debug, Error)]
pub enum DetectError {
    /// Failed to read the identifier file.
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to spawn the query command.
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The query command exited unsuccessfully.
    #[error("{program} exited with {status}: {stderr}")]
    CommandFailed {
        program: String,
        status: String,
        stderr: String,
    },

    /// The query succeeded but did not contain a model.
    #[error("model not reported: {0}")]
    NotReported(String),

    /// No detection strategy exists for this operating system.
    #[error("model detection is not supported on {0}")]
    UnsupportedPlatform(String),
}

/// Source of the running machine's model identifier.
pub trait ModelDetector {
    /// Short strategy name for logging.
    fn name(&self) -> &'static str;

    /// Query the model, reporting why it failed.
    fn query(&self) -> Result<ModelIdentifier, DetectError>;

    /// Query the model, treating any failure as "unknown".
    ///
    /// Failures are logged and never propagated; callers that require a
    /// model decide what "unknown" means for them.
    fn detect(&self) -> Option<ModelIdentifier> {
        match self.query() {
            Ok(model) => {
                tracing::info!(detector = self.name(), model = %model, "Detected model identifier");
                Some(model)
            }
            Err(e) => {
                tracing::warn!(detector = self.name(), error = %e, "Model detection failed");
                None
            }
        }
    }
}

/// Windows detector reading `Win32_ComputerSystem.Model` over CIM.
#[derive(Debug, Clone)]
pub struct CimDetector {
    program: String,
}

impl Default for CimDetector {
    fn default() -> Self {
        Self {
            program: "powershell.exe".to_string(),
        }
    }
}

impl CimDetector {
    /// Create a detector using the system PowerShell.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ModelDetector for CimDetector {
    fn name(&self) -> &'static str {
        "cim"
    }

    fn query(&self) -> Result<ModelIdentifier, DetectError> {
        let stdout = run_query(
            &self.program,
            &[
                "-NoProfile",
                "-NonInteractive",
                "-Command",
                "(Get-CimInstance -ClassName Win32_ComputerSystem).Model",
            ],
        )?;
        parse_first_line(&stdout)
            .ok_or_else(|| DetectError::NotReported("Win32_ComputerSystem has no Model".into()))
    }
}

/// macOS detector parsing `system_profiler` hardware output.
#[derive(Debug, Clone)]
pub struct SystemProfilerDetector {
    program: String,
}

impl Default for SystemProfilerDetector {
    fn default() -> Self {
        Self {
            program: "system_profiler".to_string(),
        }
    }
}

impl SystemProfilerDetector {
    /// Create a detector using the system `system_profiler`.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ModelDetector for SystemProfilerDetector {
    fn name(&self) -> &'static str {
        "system_profiler"
    }

    fn query(&self) -> Result<ModelIdentifier, DetectError> {
        let stdout = run_query(&self.program, &["SPHardwareDataType"])?;
        parse_model_identifier_line(&stdout)
            .ok_or_else(|| DetectError::NotReported("no 'Model Identifier' line".into()))
    }
}

/// Linux detector reading the DMI product name.
#[derive(Debug, Clone)]
pub struct DmiDetector {
    path: PathBuf,
}

impl Default for DmiDetector {
    fn default() -> Self {
        Self::with_path(DMI_PRODUCT_NAME_PATH)
    }
}

impl DmiDetector {
    /// Create a detector reading the standard DMI file.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a detector reading an arbitrary identifier file.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ModelDetector for DmiDetector {
    fn name(&self) -> &'static str {
        "dmi"
    }

    fn query(&self) -> Result<ModelIdentifier, DetectError> {
        let content = fs::read_to_string(&self.path).map_err(|e| DetectError::Read {
            path: self.path.clone(),
            source: e,
        })?;
        ModelIdentifier::new(content)
            .ok_or_else(|| DetectError::NotReported(format!("{} is empty", self.path.display())))
    }
}

/// Placeholder for operating systems without a strategy.
#[derive(Debug, Clone)]
pub struct UnsupportedDetector {
    os: String,
}

impl ModelDetector for UnsupportedDetector {
    fn name(&self) -> &'static str {
        "unsupported"
    }

    fn query(&self) -> Result<ModelIdentifier, DetectError> {
        Err(DetectError::UnsupportedPlatform(self.os.clone()))
    }
}

/// Select the detection strategy for the running operating system.
pub fn platform_detector() -> Box<dyn ModelDetector> {
    detector_for_os(std::env::consts::OS)
}

/// Select the detection strategy for a named operating system.
pub fn detector_for_os(os: &str) -> Box<dyn ModelDetector> {
    match os {
        "windows" => Box::new(CimDetector::new()),
        "macos" => Box::new(SystemProfilerDetector::new()),
        "linux" => Box::new(DmiDetector::new()),
        other => Box::new(UnsupportedDetector {
            os: other.to_string(),
        }),
    }
}

/// Run a query command and return its stdout.
fn run_query(program: &str, args: &[&str]) -> Result<String, DetectError> {
    tracing::debug!(program, ?args, "Running model query");

    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|e| DetectError::Spawn {
            program: program.to_string(),
            source: e,
        })?;

    if !output.status.success() {
        return Err(DetectError::CommandFailed {
            program: program.to_string(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Extract the value of the `Model Identifier: <value>` line.
///
/// The line is split on its first colon only.
pub fn parse_model_identifier_line(output: &str) -> Option<ModelIdentifier> {
    output
        .lines()
        .find(|line| line.contains("Model Identifier"))
        .and_then(|line| line.split_once(':'))
        .and_then(|(_, value)| ModelIdentifier::new(value))
}

/// Take the first non-blank line of command output as the model.
pub fn parse_first_line(output: &str) -> Option<ModelIdentifier> {
    output.lines().find_map(ModelIdentifier::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SYSTEM_PROFILER_OUTPUT: &str = "Hardware:

    Hardware Overview:

      Model Name: MacBook Pro
      Model Identifier: MacBookPro15,1
      Processor Name: 6-Core Intel Core i7
";

    struct FailingDetector;

    impl ModelDetector for FailingDetector {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn query(&self) -> Result<ModelIdentifier, DetectError> {
            Err(DetectError::NotReported("nothing here".into()))
        }
    }

    #[test]
    fn test_model_identifier_trims() {
        let model = ModelIdentifier::new("  iMac19,1\n").unwrap();
        assert_eq!(model.as_str(), "iMac19,1");
        assert_eq!(model.to_string(), "iMac19,1");
    }

    #[test]
    fn test_model_identifier_rejects_blank() {
        assert!(ModelIdentifier::new("").is_none());
        assert!(ModelIdentifier::new(" \t\n").is_none());
        assert!("   ".parse::<ModelIdentifier>().is_err());
    }

    #[test]
    fn test_parse_model_identifier_line() {
        let model = parse_model_identifier_line(SYSTEM_PROFILER_OUTPUT).unwrap();
        assert_eq!(model.as_str(), "MacBookPro15,1");
    }

    #[test]
    fn test_parse_model_identifier_line_splits_on_first_colon() {
        let model = parse_model_identifier_line("Model Identifier: Mac:Pro").unwrap();
        assert_eq!(model.as_str(), "Mac:Pro");
    }

    #[test]
    fn test_parse_model_identifier_line_missing() {
        assert!(parse_model_identifier_line("Model Name: MacBook Pro\n").is_none());
        assert!(parse_model_identifier_line("Model Identifier:   \n").is_none());
    }

    #[test]
    fn test_parse_first_line_skips_blank_lines() {
        let model = parse_first_line("\r\n\r\nMacBookPro11,5\r\n").unwrap();
        assert_eq!(model.as_str(), "MacBookPro11,5");
        assert!(parse_first_line("\n  \n").is_none());
    }

    #[test]
    fn test_dmi_detector_reads_and_trims() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("product_name");
        fs::write(&path, "Macmini8,1\n").unwrap();

        let detector = DmiDetector::with_path(&path);
        assert_eq!(detector.detect().unwrap().as_str(), "Macmini8,1");
    }

    #[test]
    fn test_dmi_detector_missing_file_is_unknown() {
        let temp = TempDir::new().unwrap();
        let detector = DmiDetector::with_path(temp.path().join("missing"));

        assert!(matches!(detector.query(), Err(DetectError::Read { .. })));
        assert!(detector.detect().is_none());
    }

    #[test]
    fn test_dmi_detector_empty_file_is_unknown() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("product_name");
        fs::write(&path, "\n").unwrap();

        assert!(DmiDetector::with_path(&path).detect().is_none());
    }

    #[test]
    fn test_detect_swallows_errors() {
        assert!(FailingDetector.detect().is_none());
    }

    #[test]
    fn test_missing_query_program_is_unknown() {
        let detector = SystemProfilerDetector {
            program: "macaron-test-no-such-program".to_string(),
        };
        assert!(matches!(detector.query(), Err(DetectError::Spawn { .. })));
        assert!(detector.detect().is_none());
    }

    #[test]
    fn test_detector_for_os() {
        assert_eq!(detector_for_os("windows").name(), "cim");
        assert_eq!(detector_for_os("macos").name(), "system_profiler");
        assert_eq!(detector_for_os("linux").name(), "dmi");

        let other = detector_for_os("freebsd");
        assert_eq!(other.name(), "unsupported");
        assert!(matches!(
            other.query(),
            Err(DetectError::UnsupportedPlatform(os)) if os == "freebsd"
        ));
    }
}
