//! Deferred, elevated installation of a staged driver package.
//!
//! Boot Camp drivers must be installed as SYSTEM. Rather than elevating the
//! current process, a one-shot Task Scheduler task is registered that runs
//! the package's MSI shortly after registration. The trigger carries a full
//! date and time, so a registration just before midnight fires the next day.
//!
//! Only Windows hosts can install; elsewhere [`InstallError::Unsupported`] is
//! returned.

use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::{DateTime, Duration, Local, Timelike};
use thiserror::Error;

/// Name of the registered scheduled task.
pub const TASK_NAME: &str = "InstallBootcamp";

/// Location of the MSI relative to the landing directory.
pub const INSTALLER_RELATIVE_PATH: &[&str] = &["Bootcamp", "Drivers", "Apple", "BootCamp.msi"];

/// Minimum delay between registration and execution.
pub const DEFAULT_INSTALL_DELAY_SECS: i64 = 15;

/// Result type for install operations.
pub type InstallResult<T> = Result<T, InstallError>;

/// Errors that can occur while scheduling an installation.
#[derive(Debug, Error)]
pub enum InstallError {
    /// Installation is only available on Windows.
    #[error("driver installation is not supported on {0}")]
    Unsupported(String),

    /// The landing directory does not contain the MSI.
    #[error("installer not found at {}", path.display())]
    InstallerNotFound { path: PathBuf },

    /// The task scheduler could not be started.
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The task scheduler rejected the task.
    #[error("task registration failed ({status}): {stderr}")]
    SchedulerFailed { status: String, stderr: String },
}

/// A successfully registered installation.
#[derive(Debug, Clone)]
pub struct ScheduledInstall {
    /// Name of the scheduled task.
    pub task_name: String,
    /// MSI that will be executed.
    pub msi_path: PathBuf,
    /// Local time the task is set to run.
    pub start_time: DateTime<Local>,
}

/// Installs a staged package found in a landing directory.
pub trait DriverInstaller {
    /// Register the installation of the package under `landing_dir`.
    fn schedule(&self, landing_dir: &Path) -> InstallResult<ScheduledInstall>;
}

/// Installer registering a SYSTEM task through PowerShell's
/// `Register-ScheduledTask`.
#[derive(Debug, Clone)]
pub struct ScheduledTaskInstaller {
    program: String,
    delay: Duration,
}

impl Default for ScheduledTaskInstaller {
    fn default() -> Self {
        Self {
            program: "powershell.exe".to_string(),
            delay: Duration::seconds(DEFAULT_INSTALL_DELAY_SECS),
        }
    }
}

impl ScheduledTaskInstaller {
    /// Create an installer with the default delay.
    pub fn new() -> Self {
        Self::default()
    }
}

impl DriverInstaller for ScheduledTaskInstaller {
    fn schedule(&self, landing_dir: &Path) -> InstallResult<ScheduledInstall> {
        let msi_path = locate_installer(landing_dir)?;

        if !cfg!(windows) {
            return Err(InstallError::Unsupported(std::env::consts::OS.to_string()));
        }

        let start_time = start_time_after(Local::now(), self.delay);
        let script = task_script(&msi_path, start_time);
        tracing::debug!(program = %self.program, %script, "Registering install task");

        let output = Command::new(&self.program)
            .args(["-NoProfile", "-NonInteractive", "-Command", script.as_str()])
            .output()
            .map_err(|e| InstallError::Spawn {
                program: self.program.clone(),
                source: e,
            })?;

        if !output.status.success() {
            return Err(InstallError::SchedulerFailed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        tracing::info!(
            task = TASK_NAME,
            msi = %msi_path.display(),
            start = %start_time.format("%Y-%m-%d %H:%M:%S"),
            "Scheduled driver installation"
        );

        Ok(ScheduledInstall {
            task_name: TASK_NAME.to_string(),
            msi_path,
            start_time,
        })
    }
}

/// Path of the MSI inside a landing directory, if present.
pub fn locate_installer(landing_dir: &Path) -> InstallResult<PathBuf> {
    let path = INSTALLER_RELATIVE_PATH
        .iter()
        .fold(landing_dir.to_path_buf(), |p, part| p.join(part));

    if path.is_file() {
        Ok(path)
    } else {
        Err(InstallError::InstallerNotFound { path })
    }
}

/// `now + delay`, to the whole second.
pub fn start_time_after(now: DateTime<Local>, delay: Duration) -> DateTime<Local> {
    let start = now + delay;
    start.with_nanosecond(0).unwrap_or(start)
}

/// PowerShell script registering a one-shot SYSTEM task that runs the MSI.
///
/// The trigger carries the full local date and time in ISO 8601, parsed with
/// the invariant culture.
pub fn task_script(msi_path: &Path, start_time: DateTime<Local>) -> String {
    let msiexec_args = format!("/i \"{}\" /qn /norestart", msi_path.display());

    [
        format!(
            "$action = New-ScheduledTaskAction -Execute 'msiexec.exe' -Argument {}",
            quote_literal(&msiexec_args)
        ),
        format!(
            "$at = [DateTime]::ParseExact('{}', 's', \
             [Globalization.CultureInfo]::InvariantCulture)",
            start_time.format("%Y-%m-%dT%H:%M:%S")
        ),
        "$trigger = New-ScheduledTaskTrigger -Once -At $at".to_string(),
        String::from(
            "$principal = New-ScheduledTaskPrincipal -UserId 'SYSTEM' \
             -LogonType ServiceAccount -RunLevel Highest",
        ),
        format!(
            "Register-ScheduledTask -TaskName {} -Action $action -Trigger $trigger \
             -Principal $principal -Force | Out-Null",
            quote_literal(TASK_NAME)
        ),
    ]
    .join("; ")
}

/// PowerShell single-quoted literal.
fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
