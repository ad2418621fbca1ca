//! `download` command: retrieve and stage the driver package for a model.

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use macaron::config::ConfigFile;
use macaron::installer::{DriverInstaller, ScheduledTaskInstaller};
use macaron::model::ModelIdentifier;
use macaron::pipeline::{PipelineStage, RetrievalOutcome, RetrievalReport, StageCallback};

use super::common::{build_pipeline, ExtractorArg, ResolvedSettings, SourceArgs};
use crate::error::CliError;

/// Arguments for `download`.
#[derive(Debug, Args)]
pub struct DownloadArgs {
    /// Model identifier (e.g. MacBookPro15,1); detected when omitted
    #[arg(short, long)]
    pub model: Option<ModelIdentifier>,

    /// Directory to create the BootCamp-<version> folder in
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    #[command(flatten)]
    pub source: SourceArgs,

    /// How to unpack the package (overrides [download] extractor)
    #[arg(long, value_enum)]
    pub extractor: Option<ExtractorArg>,

    /// Keep the temporary working directory
    #[arg(long)]
    pub keep_working_dir: bool,

    /// Schedule the driver installer after staging (Windows only)
    #[arg(long)]
    pub install: bool,
}

/// Run the download command.
pub fn run(args: DownloadArgs, config: &ConfigFile) -> Result<(), CliError> {
    let settings = ResolvedSettings::resolve(
        &args.source,
        args.output_dir,
        args.extractor,
        args.keep_working_dir,
        config,
    );
    let pipeline = build_pipeline(&settings, config)?;

    let spinner = ProgressBar::new_spinner();
    if let Ok(spinner_style) =
        ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")
    {
        spinner.set_style(spinner_style);
    }
    spinner.enable_steady_tick(Duration::from_millis(120));

    let progress = spinner.clone();
    let on_progress: StageCallback = Box::new(move |stage, message| {
        if let Some(line) = progress_line(stage, message) {
            progress.suspend(|| println!("{} {}", style("==>").cyan().bold(), line));
            progress.set_message(line.to_string());
        }
    });

    let result = pipeline.run(args.model, Some(on_progress));
    spinner.finish_and_clear();

    match result? {
        RetrievalOutcome::NoMatchingPackage { model } => {
            println!(
                "{} No Boot Camp package supports model {}",
                style("!").yellow().bold(),
                model
            );
            Ok(())
        }
        RetrievalOutcome::Retrieved(report) => {
            print_report(&report);
            if args.install {
                schedule_install(&report)?;
            }
            Ok(())
        }
    }
}

/// Progress text for a stage; failures are reported once, by `main`.
fn progress_line(stage: PipelineStage, message: &str) -> Option<&str> {
    match stage {
        PipelineStage::Aborted => None,
        _ => Some(message),
    }
}

fn print_report(report: &RetrievalReport) {
    println!();
    println!(
        "{} Boot Camp {} for {} staged",
        style("✓").green().bold(),
        report.version,
        report.model
    );
    println!("  Location:   {}", report.landing_dir.display());
    println!("  Downloaded: {}", format_size(report.bytes_downloaded));
    println!("  Files:      {}", report.files_extracted);
}

fn schedule_install(report: &RetrievalReport) -> Result<(), CliError> {
    let scheduled = ScheduledTaskInstaller::new().schedule(&report.landing_dir)?;

    println!(
        "{} Scheduled task {} to install {} at {}",
        style("✓").green().bold(),
        scheduled.task_name,
        scheduled.msi_path.display(),
        scheduled.start_time.format("%Y-%m-%d %H:%M:%S")
    );
    println!("  The installer runs unattended; reboot when it finishes.");

    Ok(())
}

/// Format a byte count for display.
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 bytes");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3.00 GB");
    }

    #[test]
    fn test_aborted_stage_is_not_printed() {
        assert_eq!(
            progress_line(PipelineStage::Downloading, "Downloading package"),
            Some("Downloading package")
        );
        assert_eq!(progress_line(PipelineStage::Done, "Done"), Some("Done"));
        assert_eq!(progress_line(PipelineStage::Aborted, "Aborted: timed out"), None);
    }
}
