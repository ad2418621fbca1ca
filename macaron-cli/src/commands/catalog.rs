//! `catalog` command: save the software update catalog for offline use.

use std::path::PathBuf;

use clap::Args;
use macaron::config::ConfigFile;
use macaron::pipeline::CATALOG_FILENAME;

use super::common::{build_pipeline, ResolvedSettings, SourceArgs};
use crate::error::CliError;

/// Arguments for `catalog`.
#[derive(Debug, Args)]
pub struct CatalogArgs {
    /// Directory to save the catalog in
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// File name (defaults to the last segment of the catalog URL)
    #[arg(long)]
    pub file_name: Option<String>,

    #[command(flatten)]
    pub source: SourceArgs,
}

/// Run the catalog command.
pub fn run(args: CatalogArgs, config: &ConfigFile) -> Result<(), CliError> {
    let settings = ResolvedSettings::resolve(&args.source, args.output_dir, None, false, config);
    let file_name = args
        .file_name
        .unwrap_or_else(|| file_name_from_url(&settings.catalog_url));
    let dest = settings.output_dir.join(file_name);

    let pipeline = build_pipeline(&settings, config)?;
    let saved = pipeline.fetch_catalog_to(&dest)?;

    println!("Saved catalog to {}", saved.display());
    Ok(())
}

/// Last non-empty path segment of a URL, ignoring any query string.
fn file_name_from_url(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let path = path.split_once("://").map_or(path, |(_, rest)| rest);

    match path.split_once('/') {
        Some((_, rest)) => rest
            .rsplit('/')
            .find(|segment| !segment.is_empty())
            .unwrap_or(CATALOG_FILENAME)
            .to_string(),
        None => CATALOG_FILENAME.to_string(),
    }
}
