//! Common types and utilities shared across CLI commands.

use std::path::PathBuf;

use clap::{Args, ValueEnum};
use macaron::config::ConfigFile;
use macaron::extractor::ExtractorKind;
use macaron::fetch::FetcherKind;
use macaron::model::platform_detector;
use macaron::pipeline::{PipelineConfig, RetrievalPipeline};

use crate::error::CliError;

/// Fetcher selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum FetcherArg {
    /// Spawn curl
    Curl,
    /// Spawn wget
    Wget,
    /// Built-in HTTP client
    Http,
}

impl From<FetcherArg> for FetcherKind {
    fn from(arg: FetcherArg) -> Self {
        match arg {
            FetcherArg::Curl => FetcherKind::Curl,
            FetcherArg::Wget => FetcherKind::Wget,
            FetcherArg::Http => FetcherKind::Http,
        }
    }
}

/// Extractor selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum ExtractorArg {
    /// Built-in zip reader
    Zip,
    /// 7-Zip command line tool
    #[value(name = "7z")]
    SevenZip,
}

impl From<ExtractorArg> for ExtractorKind {
    fn from(arg: ExtractorArg) -> Self {
        match arg {
            ExtractorArg::Zip => ExtractorKind::Zip,
            ExtractorArg::SevenZip => ExtractorKind::SevenZip,
        }
    }
}

/// Where and how the catalog is fetched.
#[derive(Debug, Clone, Default, Args)]
pub struct SourceArgs {
    /// Catalog URL (overrides [catalog] url)
    #[arg(long)]
    pub catalog_url: Option<String>,

    /// How to fetch URLs (overrides [download] fetcher)
    #[arg(long, value_enum)]
    pub fetcher: Option<FetcherArg>,
}

/// Settings of a pipeline after merging CLI arguments and config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSettings {
    pub output_dir: PathBuf,
    pub temp_root: Option<PathBuf>,
    pub catalog_url: String,
    pub fetcher: FetcherKind,
    pub extractor: ExtractorKind,
    pub keep_working_dir: bool,
}

impl ResolvedSettings {
    /// Merge CLI values over config values.
    pub fn resolve(
        source: &SourceArgs,
        output_dir: Option<PathBuf>,
        extractor: Option<ExtractorArg>,
        keep_working_dir: bool,
        config: &ConfigFile,
    ) -> Self {
        // CLI takes precedence, then config
        Self {
            output_dir: output_dir
                .or_else(|| config.download.output_dir.clone())
                .unwrap_or_else(|| PathBuf::from(".")),
            temp_root: config.download.temp_dir.clone(),
            catalog_url: source
                .catalog_url
                .clone()
                .unwrap_or_else(|| config.catalog.url.clone()),
            fetcher: source
                .fetcher
                .map(FetcherKind::from)
                .unwrap_or(config.download.fetcher),
            extractor: extractor
                .map(ExtractorKind::from)
                .unwrap_or(config.download.extractor),
            keep_working_dir: keep_working_dir || config.download.keep_working_dir,
        }
    }

    /// Pipeline configuration for these settings.
    pub fn pipeline_config(&self) -> PipelineConfig {
        let mut pipeline_config = PipelineConfig::new(&self.output_dir)
            .with_catalog_url(&self.catalog_url)
            .with_keep_working_dir(self.keep_working_dir);
        if let Some(temp_root) = &self.temp_root {
            pipeline_config = pipeline_config.with_temp_root(temp_root);
        }
        pipeline_config
    }
}

/// Load config or return default.
pub fn load_config() -> ConfigFile {
    match ConfigFile::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: {}; using defaults", e);
            ConfigFile::default()
        }
    }
}

/// Build a pipeline with the platform detector and the selected tools.
pub fn build_pipeline(
    settings: &ResolvedSettings,
    config: &ConfigFile,
) -> Result<RetrievalPipeline, CliError> {
    tracing::debug!(
        output_dir = %settings.output_dir.display(),
        catalog_url = %settings.catalog_url,
        fetcher = settings.fetcher.name(),
        extractor = settings.extractor.name(),
        "Building retrieval pipeline"
    );

    let fetcher = settings.fetcher.build(config.download.timeout())?;

    Ok(RetrievalPipeline::new(
        settings.pipeline_config(),
        platform_detector(),
        fetcher,
        settings.extractor.build(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_download_settings() -> ConfigFile {
        let mut config = ConfigFile::default();
        config.catalog.url = "https://config.test/index.sucatalog".to_string();
        config.download.output_dir = Some(PathBuf::from("/from-config"));
        config.download.temp_dir = Some(PathBuf::from("/scratch"));
        config.download.fetcher = FetcherKind::Wget;
        config.download.extractor = ExtractorKind::SevenZip;
        config
    }

    #[test]
    fn test_cli_overrides_config() {
        let config = config_with_download_settings();
        let source = SourceArgs {
            catalog_url: Some("https://cli.test/index.sucatalog".to_string()),
            fetcher: Some(FetcherArg::Http),
        };

        let settings = ResolvedSettings::resolve(
            &source,
            Some(PathBuf::from("/from-cli")),
            Some(ExtractorArg::Zip),
            false,
            &config,
        );

        assert_eq!(settings.output_dir, PathBuf::from("/from-cli"));
        assert_eq!(settings.catalog_url, "https://cli.test/index.sucatalog");
        assert_eq!(settings.fetcher, FetcherKind::Http);
        assert_eq!(settings.extractor, ExtractorKind::Zip);
    }

    #[test]
    fn test_config_used_when_cli_silent() {
        let config = config_with_download_settings();

        let settings =
            ResolvedSettings::resolve(&SourceArgs::default(), None, None, false, &config);

        assert_eq!(settings.output_dir, PathBuf::from("/from-config"));
        assert_eq!(settings.catalog_url, "https://config.test/index.sucatalog");
        assert_eq!(settings.fetcher, FetcherKind::Wget);
        assert_eq!(settings.extractor, ExtractorKind::SevenZip);

        let pipeline_config = settings.pipeline_config();
        assert_eq!(pipeline_config.temp_root, PathBuf::from("/scratch"));
    }

    #[test]
    fn test_defaults_when_nothing_set() {
        let settings = ResolvedSettings::resolve(
            &SourceArgs::default(),
            None,
            None,
            false,
            &ConfigFile::default(),
        );

        assert_eq!(settings.output_dir, PathBuf::from("."));
        assert_eq!(settings.catalog_url, macaron::DEFAULT_CATALOG_URL);
        assert_eq!(settings.fetcher, FetcherKind::Curl);
        assert_eq!(settings.extractor, ExtractorKind::Zip);
        assert!(!settings.keep_working_dir);
    }

    #[test]
    fn test_keep_working_dir_from_either_source() {
        let mut config = ConfigFile::default();
        let source = SourceArgs::default();

        assert!(ResolvedSettings::resolve(&source, None, None, true, &config).keep_working_dir);

        config.download.keep_working_dir = true;
        assert!(ResolvedSettings::resolve(&source, None, None, false, &config).keep_working_dir);
    }
}
