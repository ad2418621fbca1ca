//! `packages` command: list catalog entries for a model without downloading.

use clap::Args;
use console::style;
use macaron::config::ConfigFile;
use macaron::model::ModelIdentifier;

use super::common::{build_pipeline, ResolvedSettings, SourceArgs};
use crate::error::CliError;

/// Arguments for `packages`.
#[derive(Debug, Args)]
pub struct PackagesArgs {
    /// Model identifier; detected when omitted
    #[arg(short, long)]
    pub model: Option<ModelIdentifier>,

    #[command(flatten)]
    pub source: SourceArgs,
}

/// Run the packages command.
pub fn run(args: PackagesArgs, config: &ConfigFile) -> Result<(), CliError> {
    let settings = ResolvedSettings::resolve(&args.source, None, None, false, config);
    let pipeline = build_pipeline(&settings, config)?;

    let (model, packages) = pipeline.find_packages(args.model)?;

    if packages.is_empty() {
        println!("No Boot Camp package supports model {}", model);
        return Ok(());
    }

    println!("Packages for {}", style(&model).bold());
    println!();
    for (index, package) in packages.iter().enumerate() {
        let marker = if index == 0 {
            style("*").green().bold().to_string()
        } else {
            " ".to_string()
        };
        println!(
            "{} {:<12} {}",
            marker,
            package.version.as_deref().unwrap_or("(no version)"),
            package.url.as_deref().unwrap_or("(no url)")
        );
    }
    println!();
    println!("* = package `macaron download` would pick");

    Ok(())
}
