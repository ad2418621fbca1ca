//! Macaron CLI - Command-line interface
//!
//! Finds, downloads and stages the Boot Camp driver package for a Mac model.

mod commands;
mod error;

use clap::{Parser, Subcommand};
use macaron::logging::{init_logging, LoggingGuard};

use commands::catalog::CatalogArgs;
use commands::config::ConfigCommands;
use commands::download::DownloadArgs;
use commands::packages::PackagesArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "macaron")]
#[command(about = "Download Boot Camp drivers for a Mac model", long_about = None)]
#[command(version)]
struct Cli {
    /// Log debug output to stderr as well as the log file
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Download and stage the driver package for a model
    Download(DownloadArgs),

    /// List catalog packages for a model without downloading
    Packages(PackagesArgs),

    /// Save the software update catalog to a file
    Catalog(CatalogArgs),

    /// Print the detected model identifier
    Model,

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Print the version
    Version,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = commands::common::load_config();
    let guard = start_logging(&config, cli.verbose);
    if let Some(guard) = &guard {
        tracing::debug!(
            version = macaron::VERSION,
            log_file = %guard.log_file().display(),
            "macaron starting"
        );
    }

    match cli.command {
        Commands::Download(args) => commands::download::run(args, &config),
        Commands::Packages(args) => commands::packages::run(args, &config),
        Commands::Catalog(args) => commands::catalog::run(args, &config),
        Commands::Model => commands::model::run(),
        Commands::Config { command } => commands::config::run(command),
        Commands::Version => {
            commands::version::run();
            Ok(())
        }
    }
}

/// Logging is best effort; the command runs without it.
fn start_logging(config: &macaron::config::ConfigFile, verbose: bool) -> Option<LoggingGuard> {
    match init_logging(&config.logging.directory, &config.logging.level, verbose) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Warning: logging disabled: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_download_flags() {
        let cli = Cli::try_parse_from([
            "macaron",
            "download",
            "--model",
            "MacBookPro15,1",
            "--output-dir",
            "/drivers",
            "--fetcher",
            "http",
            "--extractor",
            "7z",
            "--install",
            "-v",
        ])
        .unwrap();

        assert!(cli.verbose);
        match cli.command {
            Commands::Download(args) => {
                assert_eq!(args.model.unwrap().as_str(), "MacBookPro15,1");
                assert_eq!(args.output_dir.unwrap(), std::path::PathBuf::from("/drivers"));
                assert_eq!(
                    args.source.fetcher,
                    Some(commands::common::FetcherArg::Http)
                );
                assert_eq!(
                    args.extractor,
                    Some(commands::common::ExtractorArg::SevenZip)
                );
                assert!(args.install);
                assert!(!args.keep_working_dir);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_blank_model_rejected() {
        assert!(Cli::try_parse_from(["macaron", "download", "--model", "  "]).is_err());
    }

    #[test]
    fn test_config_subcommands() {
        let cli = Cli::try_parse_from(["macaron", "config", "set", "download.timeout", "60"])
            .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config {
                command: ConfigCommands::Set { ref key, ref value }
            } if key == "download.timeout" && value == "60"
        ));
    }
}
