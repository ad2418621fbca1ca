//! Archive extraction for downloaded packages.
//!
//! Two extractors are provided:
//!
//! - [`ZipExtractor`]: in-process zip extraction (default)
//! - [`SevenZipExtractor`]: shells out to 7-Zip, which also understands the
//!   xar/pkg containers some packages ship in

use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::str::FromStr;

use thiserror::Error;

/// Default 7-Zip location on Windows.
const SEVEN_ZIP_WINDOWS_PATH: &str = r"C:\Program Files\7-Zip\7z.exe";

/// Result type for extraction operations.
pub type ExtractResult<T> = Result<T, ExtractError>;

/// Errors that can occur while extracting an archive.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Failed to read the archive or the destination.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to write an extracted file or directory.
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The archive is corrupt or of an unsupported format.
    #[error("invalid archive {}: {reason}", path.display())]
    InvalidArchive { path: PathBuf, reason: String },

    /// An entry would be written outside the destination directory.
    #[error("archive entry '{entry}' escapes the destination directory")]
    UnsafeEntry { entry: String },

    /// The external extraction tool failed.
    #[error("{program} failed: {reason}")]
    ToolFailed { program: String, reason: String },
}

/// Unpacks an archive into a directory.
pub trait ArchiveExtractor {
    /// Short name for logging.
    fn name(&self) -> &'static str;

    /// Extract `archive_path` into `dest_dir`, creating it if needed.
    ///
    /// Returns the number of files present under `dest_dir` afterwards.
    fn extract(&self, archive_path: &Path, dest_dir: &Path) -> ExtractResult<usize>;
}

/// Extractor implementations selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtractorKind {
    /// Built-in zip support.
    #[default]
    Zip,
    /// External 7-Zip.
    SevenZip,
}

impl ExtractorKind {
    /// All kinds, in display order.
    pub fn all() -> &'static [ExtractorKind] {
        &[ExtractorKind::Zip, ExtractorKind::SevenZip]
    }

    /// Configuration name of the kind.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::SevenZip => "7z",
        }
    }

    /// Build the extractor.
    pub fn build(&self) -> Box<dyn ArchiveExtractor> {
        match self {
            Self::Zip => Box::new(ZipExtractor::new()),
            Self::SevenZip => Box::new(SevenZipExtractor::new()),
        }
    }
}

impl fmt::Display for ExtractorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ExtractorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "zip" => Ok(Self::Zip),
            "7z" | "7zip" | "7-zip" => Ok(Self::SevenZip),
            other => Err(format!("unknown extractor '{}' (expected zip or 7z)", other)),
        }
    }
}

/// In-process zip extractor.
#[derive(Debug, Default)]
pub struct ZipExtractor;

impl ZipExtractor {
    /// Create a new zip extractor.
    pub fn new() -> Self {
        Self
    }
}

impl ArchiveExtractor for ZipExtractor {
    fn name(&self) -> &'static str {
        "zip"
    }

    fn extract(&self, archive_path: &Path, dest_dir: &Path) -> ExtractResult<usize> {
        create_dir(dest_dir)?;

        let file = File::open(archive_path).map_err(|e| ExtractError::Read {
            path: archive_path.to_path_buf(),
            source: e,
        })?;

        let invalid = |e: zip::result::ZipError| ExtractError::InvalidArchive {
            path: archive_path.to_path_buf(),
            reason: e.to_string(),
        };

        let mut archive = zip::ZipArchive::new(BufReader::new(file)).map_err(invalid)?;

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i).map_err(invalid)?;

            let relative = entry
                .enclosed_name()
                .map(Path::to_path_buf)
                .ok_or_else(|| ExtractError::UnsafeEntry {
                    entry: entry.name().to_string(),
                })?;
            let out_path = dest_dir.join(relative);

            if entry.is_dir() {
                create_dir(&out_path)?;
                continue;
            }

            if let Some(parent) = out_path.parent() {
                create_dir(parent)?;
            }

            let mut out = File::create(&out_path).map_err(|e| ExtractError::Write {
                path: out_path.clone(),
                source: e,
            })?;
            io::copy(&mut entry, &mut out).map_err(|e| ExtractError::Write {
                path: out_path.clone(),
                source: e,
            })?;

            apply_mode(&out_path, entry.unix_mode())?;
        }

        count_files_recursive(dest_dir)
    }
}

/// 7-Zip based extractor.
#[derive(Debug, Clone)]
pub struct SevenZipExtractor {
    program: String,
}

impl Default for SevenZipExtractor {
    fn default() -> Self {
        let program = if cfg!(windows) {
            SEVEN_ZIP_WINDOWS_PATH
        } else {
            "7z"
        };
        Self {
            program: program.to_string(),
        }
    }
}

impl SevenZipExtractor {
    /// Create an extractor using the default 7-Zip location.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific 7-Zip executable.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl ArchiveExtractor for SevenZipExtractor {
    fn name(&self) -> &'static str {
        "7z"
    }

    fn extract(&self, archive_path: &Path, dest_dir: &Path) -> ExtractResult<usize> {
        create_dir(dest_dir)?;

        let mut out_flag = std::ffi::OsString::from("-o");
        out_flag.push(dest_dir.as_os_str());

        let output = Command::new(&self.program)
            .arg("x")
            .arg(archive_path)
            .arg(out_flag)
            .arg("-y")
            .output()
            .map_err(|e| ExtractError::ToolFailed {
                program: self.program.clone(),
                reason: format!("failed to run: {}", e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractError::ToolFailed {
                program: self.program.clone(),
                reason: format!("exited with {}: {}", output.status, stderr.trim()),
            });
        }

        count_files_recursive(dest_dir)
    }
}

#[cfg(unix)]
fn apply_mode(path: &Path, mode: Option<u32>) -> ExtractResult<()> {
    use std::os::unix::fs::PermissionsExt;

    if let Some(mode) = mode {
        fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(|e| {
            ExtractError::Write {
                path: path.to_path_buf(),
                source: e,
            }
        })?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn apply_mode(_path: &Path, _mode: Option<u32>) -> ExtractResult<()> {
    Ok(())
}

fn create_dir(path: &Path) -> ExtractResult<()> {
    fs::create_dir_all(path).map_err(|e| ExtractError::Write {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Count files recursively in a directory.
pub fn count_files_recursive(dir: &Path) -> ExtractResult<usize> {
    let mut count = 0;

    if !dir.exists() {
        return Ok(0);
    }

    let entries = fs::read_dir(dir).map_err(|e| ExtractError::Read {
        path: dir.to_path_buf(),
        source: e,
    })?;

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_file() {
            count += 1;
        } else if path.is_dir() {
            count += count_files_recursive(&path)?;
        }
    }

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::FileOptions;

    fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
        let file = File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        for (name, data) in entries {
            if name.ends_with('/') {
                zip.add_directory(*name, FileOptions::default()).unwrap();
            } else {
                zip.start_file(*name, FileOptions::default()).unwrap();
                zip.write_all(data).unwrap();
            }
        }
        zip.finish().unwrap();
    }

    #[test]
    fn test_extractor_kind_parse() {
        assert_eq!("zip".parse::<ExtractorKind>().unwrap(), ExtractorKind::Zip);
        assert_eq!("7z".parse::<ExtractorKind>().unwrap(), ExtractorKind::SevenZip);
        assert_eq!("7-Zip".parse::<ExtractorKind>().unwrap(), ExtractorKind::SevenZip);
        assert!("rar".parse::<ExtractorKind>().is_err());
        for kind in ExtractorKind::all() {
            assert_eq!(kind.build().name(), kind.name());
        }
    }

    #[test]
    fn test_zip_extract_tree() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("BootCampESD.pkg");
        write_zip(
            &archive,
            &[
                ("BootCamp/", b""),
                ("BootCamp/setup.exe", b"setup"),
                ("BootCamp/Drivers/Apple/BootCamp.msi", b"msi"),
                ("autorun.inf", b"[autorun]"),
            ],
        );

        let dest = temp.path().join("out");
        let count = ZipExtractor::new().extract(&archive, &dest).unwrap();

        assert_eq!(count, 3);
        assert_eq!(fs::read(dest.join("BootCamp/setup.exe")).unwrap(), b"setup");
        assert_eq!(
            fs::read(dest.join("BootCamp/Drivers/Apple/BootCamp.msi")).unwrap(),
            b"msi"
        );
        assert_eq!(fs::read(dest.join("autorun.inf")).unwrap(), b"[autorun]");
    }

    #[test]
    fn test_zip_rejects_escaping_entries() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("evil.zip");
        write_zip(&archive, &[("../escape.txt", b"x")]);

        let dest = temp.path().join("out");
        let result = ZipExtractor::new().extract(&archive, &dest);

        assert!(matches!(result, Err(ExtractError::UnsafeEntry { .. })));
        assert!(!temp.path().join("escape.txt").exists());
    }

    #[test]
    fn test_zip_invalid_archive() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("garbage.pkg");
        fs::write(&archive, b"this is not a zip file").unwrap();

        let result = ZipExtractor::new().extract(&archive, &temp.path().join("out"));
        assert!(matches!(result, Err(ExtractError::InvalidArchive { .. })));
    }

    #[test]
    fn test_zip_missing_archive() {
        let temp = TempDir::new().unwrap();
        let result =
            ZipExtractor::new().extract(&temp.path().join("missing.pkg"), &temp.path().join("out"));
        assert!(matches!(result, Err(ExtractError::Read { .. })));
    }

    #[test]
    fn test_seven_zip_missing_tool() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("a.pkg");
        fs::write(&archive, b"x").unwrap();

        let extractor = SevenZipExtractor::with_program("macaron-test-no-such-7z");
        let result = extractor.extract(&archive, &temp.path().join("out"));
        assert!(matches!(result, Err(ExtractError::ToolFailed { .. })));
    }

    #[test]
    fn test_count_files_ignores_directories() {
        let temp = TempDir::new().unwrap();
        let drivers = temp.path().join("Bootcamp/Drivers/Apple");
        fs::create_dir_all(&drivers).unwrap();
        fs::create_dir_all(temp.path().join("Bootcamp/Empty")).unwrap();
        fs::write(drivers.join("BootCamp.msi"), b"msi").unwrap();
        fs::write(temp.path().join("Bootcamp/setup.exe"), b"exe").unwrap();

        assert_eq!(count_files_recursive(temp.path()).unwrap(), 2);
        assert_eq!(
            count_files_recursive(&temp.path().join("never-created")).unwrap(),
            0
        );
    }
}
