//! Per-run state and directory handling.

use std::fs;
use std::path::{Path, PathBuf};

use crate::catalog::DriverPackageRecord;
use crate::model::ModelIdentifier;

use super::error::{RetrievalError, RetrievalResult};
use super::stage::{PipelineStage, StageCallback};

/// Ephemeral state of one retrieval run.
///
/// Fields are filled in as the run progresses; nothing is persisted.
pub struct RetrievalSession<'a> {
    stage: PipelineStage,
    on_progress: Option<&'a StageCallback>,
    /// Model the run is for.
    pub model: Option<ModelIdentifier>,
    /// Absolute output directory.
    pub output_dir: PathBuf,
    /// Staging directory, once created.
    pub working_dir: Option<PathBuf>,
    /// Chosen catalog record.
    pub selected: Option<DriverPackageRecord>,
    /// Final directory for the package.
    pub landing_dir: Option<PathBuf>,
}

impl<'a> RetrievalSession<'a> {
    /// Start a session in the `Idle` stage.
    pub fn new(output_dir: PathBuf, on_progress: Option<&'a StageCallback>) -> Self {
        Self {
            stage: PipelineStage::Idle,
            on_progress,
            model: None,
            output_dir,
            working_dir: None,
            selected: None,
            landing_dir: None,
        }
    }

    /// Current stage.
    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    /// Enter `next` and report it.
    ///
    /// Stages only move forward; `Aborted` may follow anything that is not
    /// already terminal.
    pub fn advance(&mut self, next: PipelineStage, message: &str) {
        debug_assert!(
            !self.stage.is_terminal() && (next > self.stage),
            "invalid stage transition {:?} -> {:?}",
            self.stage,
            next
        );

        self.stage = next;
        tracing::info!(stage = next.name(), "{}", message);

        if let Some(cb) = self.on_progress {
            cb(next, message);
        }
    }

    /// Enter `Aborted` for `error`, logging how far the run got.
    pub fn abort(&mut self, error: &RetrievalError) {
        tracing::warn!(
            model = ?self.model,
            version = ?self.selected.as_ref().and_then(|r| r.version.as_deref()),
            landing_dir = ?self.landing_dir,
            working_dir = ?self.working_dir,
            error = %error,
            "Retrieval aborted"
        );
        self.advance(PipelineStage::Aborted, &error.to_string());
    }
}

/// Staging directory that is removed when dropped unless kept.
#[derive(Debug)]
pub struct WorkingDir {
    path: PathBuf,
    keep: bool,
    removed: bool,
}

impl WorkingDir {
    /// Create a fresh working directory, clearing leftovers of a crashed run.
    pub fn create(path: PathBuf, keep: bool) -> RetrievalResult<Self> {
        if path.exists() {
            tracing::debug!(path = %path.display(), "Removing stale working directory");
            fs::remove_dir_all(&path).map_err(|e| RetrievalError::filesystem(&path, e))?;
        }

        fs::create_dir_all(&path).map_err(|e| RetrievalError::filesystem(&path, e))?;

        Ok(Self {
            path,
            keep,
            removed: false,
        })
    }

    /// Directory path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the directory now (unless kept).
    pub fn cleanup(mut self) {
        self.remove();
    }

    fn remove(&mut self) {
        if self.removed {
            return;
        }
        self.removed = true;

        if self.keep {
            tracing::info!(path = %self.path.display(), "Keeping working directory");
            return;
        }

        if let Err(e) = fs::remove_dir_all(&self.path) {
            tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to remove working directory"
            );
        }
    }
}

impl Drop for WorkingDir {
    fn drop(&mut self) {
        self.remove();
    }
}

/// Move an extracted tree into the landing directory.
///
/// Tries a rename first and falls back to a recursive copy when the two
/// directories live on different filesystems. A partially copied landing
/// directory is removed so the next run does not mistake it for a finished
/// download.
pub fn promote(extracted: &Path, landing_dir: &Path) -> RetrievalResult<()> {
    if let Some(parent) = landing_dir.parent() {
        fs::create_dir_all(parent).map_err(|e| RetrievalError::filesystem(parent, e))?;
    }

    if fs::rename(extracted, landing_dir).is_ok() {
        return Ok(());
    }

    if let Err(e) = copy_dir_recursive(extracted, landing_dir) {
        fs::remove_dir_all(landing_dir).ok();
        return Err(e);
    }

    Ok(())
}

/// Recursively copy a directory.
fn copy_dir_recursive(source: &Path, dest: &Path) -> RetrievalResult<()> {
    fs::create_dir_all(dest).map_err(|e| RetrievalError::filesystem(dest, e))?;

    for entry in fs::read_dir(source).map_err(|e| RetrievalError::filesystem(source, e))? {
        let entry = entry.map_err(|e| RetrievalError::filesystem(source, e))?;

        let source_path = entry.path();
        let dest_path = dest.join(entry.file_name());

        if source_path.is_dir() {
            copy_dir_recursive(&source_path, &dest_path)?;
        } else {
            fs::copy(&source_path, &dest_path)
                .map_err(|e| RetrievalError::filesystem(&dest_path, e))?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    #[test]
    fn test_session_reports_stages() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callback: StageCallback = Box::new(move |stage, message| {
            sink.lock().unwrap().push((stage, message.to_string()));
        });

        let mut session = RetrievalSession::new(PathBuf::from("/out"), Some(&callback));
        assert_eq!(session.stage(), PipelineStage::Idle);

        session.advance(PipelineStage::ModelResolved, "Using model: iMac19,1");
        session.advance(PipelineStage::Aborted, "catalog unavailable");

        assert_eq!(session.stage(), PipelineStage::Aborted);
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].0, PipelineStage::ModelResolved);
        assert_eq!(seen[1].1, "catalog unavailable");
    }

    #[test]
    fn test_abort_reports_error_message() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callback: StageCallback = Box::new(move |stage, message| {
            sink.lock().unwrap().push((stage, message.to_string()));
        });

        let mut session = RetrievalSession::new(PathBuf::from("/out"), Some(&callback));
        session.advance(PipelineStage::Selected, "Found supported ESD: 041-1234");
        session.landing_dir = Some(PathBuf::from("/out/BootCamp-041-1234"));
        session.working_dir = Some(PathBuf::from("/tmp/BootCamp-unpack-041-1234"));

        let error = RetrievalError::AlreadyDownloaded {
            path: PathBuf::from("/out/BootCamp-041-1234"),
        };
        session.abort(&error);

        assert_eq!(session.stage(), PipelineStage::Aborted);
        let seen = seen.lock().unwrap();
        let (stage, message) = seen.last().unwrap();
        assert_eq!(*stage, PipelineStage::Aborted);
        assert_eq!(*message, error.to_string());
    }

    #[test]
    fn test_working_dir_removed_on_drop() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("BootCamp-unpack-1");

        {
            let dir = WorkingDir::create(path.clone(), false).unwrap();
            fs::write(dir.path().join("BootCampESD.pkg"), b"pkg").unwrap();
        }

        assert!(!path.exists());
    }

    #[test]
    fn test_working_dir_kept() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("BootCamp-unpack-1");

        WorkingDir::create(path.clone(), true).unwrap().cleanup();

        assert!(path.is_dir());
    }

    #[test]
    fn test_working_dir_clears_stale_contents() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("BootCamp-unpack-1");
        fs::create_dir_all(&path).unwrap();
        fs::write(path.join("stale.txt"), b"old").unwrap();

        let dir = WorkingDir::create(path.clone(), true).unwrap();
        assert!(!dir.path().join("stale.txt").exists());
    }

    #[test]
    fn test_promote_moves_tree() {
        let temp = TempDir::new().unwrap();
        let extracted = temp.path().join("work/extracted");
        fs::create_dir_all(extracted.join("Bootcamp/Drivers")).unwrap();
        fs::write(extracted.join("Bootcamp/Drivers/a.inf"), b"inf").unwrap();
        fs::write(extracted.join("setup.exe"), b"exe").unwrap();

        let landing = temp.path().join("out/BootCamp-1");
        promote(&extracted, &landing).unwrap();

        assert_eq!(fs::read(landing.join("Bootcamp/Drivers/a.inf")).unwrap(), b"inf");
        assert_eq!(fs::read(landing.join("setup.exe")).unwrap(), b"exe");
    }

    #[test]
    fn test_copy_fallback_reproduces_tree() {
        let temp = TempDir::new().unwrap();
        let extracted = temp.path().join("extracted");
        fs::create_dir_all(extracted.join("Bootcamp/Drivers/Apple")).unwrap();
        fs::write(extracted.join("Bootcamp/Drivers/Apple/BootCamp.msi"), b"msi").unwrap();
        fs::write(extracted.join("AutoUnattend.xml"), b"<xml/>").unwrap();

        let landing = temp.path().join("BootCamp-5.1.5769");
        copy_dir_recursive(&extracted, &landing).unwrap();

        assert_eq!(
            fs::read(landing.join("Bootcamp/Drivers/Apple/BootCamp.msi")).unwrap(),
            b"msi"
        );
        assert_eq!(fs::read(landing.join("AutoUnattend.xml")).unwrap(), b"<xml/>");
        assert!(extracted.is_dir());
    }
}
