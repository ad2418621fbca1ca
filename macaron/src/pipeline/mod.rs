//! Catalog-driven retrieval of Boot Camp driver packages.
//!
//! [`RetrievalPipeline::run`] walks the stages in [`PipelineStage`] order:
//!
//! 1. Resolve the model (caller-supplied, else detected)
//! 2. Fetch the catalog to the temp root
//! 3. Parse it into records
//! 4. Select the first record supporting the model
//! 5. Refuse to overwrite an existing landing directory
//! 6. Download the package into a working directory
//! 7. Extract it and move the result into the landing directory
//! 8. Remove the working directory
//!
//! Each step gates the next. The working directory is removed on success and
//! on every failure unless [`PipelineConfig::keep_working_dir`] is set.
//!
//! # Example
//!
//! ```ignore
//! use macaron::extractor::ZipExtractor;
//! use macaron::fetch::{CommandFetcher, FetchTool};
//! use macaron::model::platform_detector;
//! use macaron::pipeline::{PipelineConfig, RetrievalPipeline};
//!
//! let pipeline = RetrievalPipeline::new(
//!     PipelineConfig::new("./drivers"),
//!     platform_detector(),
//!     Box::new(CommandFetcher::new(FetchTool::Curl)),
//!     Box::new(ZipExtractor::new()),
//! );
//! let outcome = pipeline.run(None, None)?;
//! ```

mod config;
mod error;
mod session;
mod stage;

pub use config::{
    landing_dir_name, PipelineConfig, CATALOG_FILENAME, EXTRACT_DIRNAME, PACKAGE_FILENAME,
    PRODUCT_NAME,
};
pub use error::{RetrievalError, RetrievalResult};
pub use session::RetrievalSession;
pub use stage::{PipelineStage, StageCallback};

use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::catalog::{self, DriverPackageRecord};
use crate::extractor::ArchiveExtractor;
use crate::fetch::Fetcher;
use crate::model::{ModelDetector, ModelIdentifier};

use session::{promote, WorkingDir};

/// How a completed run ended.
#[derive(Debug, Clone)]
pub enum RetrievalOutcome {
    /// The catalog lists no package for the model. Not an error.
    NoMatchingPackage {
        /// Model that was searched for.
        model: ModelIdentifier,
    },
    /// A package was downloaded and staged.
    Retrieved(RetrievalReport),
}

/// Summary of a successful retrieval.
#[derive(Debug, Clone)]
pub struct RetrievalReport {
    /// Model the package was selected for.
    pub model: ModelIdentifier,
    /// Package version.
    pub version: String,
    /// Package download URL.
    pub url: String,
    /// Directory holding the extracted package.
    pub landing_dir: PathBuf,
    /// Size of the downloaded package.
    pub bytes_downloaded: u64,
    /// Number of files extracted.
    pub files_extracted: usize,
}

/// Orchestrates model detection, catalog lookup, download and extraction.
pub struct RetrievalPipeline {
    config: PipelineConfig,
    detector: Box<dyn ModelDetector>,
    fetcher: Box<dyn Fetcher>,
    extractor: Box<dyn ArchiveExtractor>,
}

impl RetrievalPipeline {
    /// Create a pipeline from its collaborators.
    pub fn new(
        config: PipelineConfig,
        detector: Box<dyn ModelDetector>,
        fetcher: Box<dyn Fetcher>,
        extractor: Box<dyn ArchiveExtractor>,
    ) -> Self {
        Self {
            config,
            detector,
            fetcher,
            extractor,
        }
    }

    /// The pipeline configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Use the requested model, falling back to detection.
    pub fn resolve_model(
        &self,
        requested: Option<ModelIdentifier>,
    ) -> RetrievalResult<ModelIdentifier> {
        requested
            .or_else(|| self.detector.detect())
            .ok_or(RetrievalError::ModelUnknown)
    }

    /// Fetch the catalog to its temp path and parse it.
    ///
    /// The catalog file is deleted once parsed.
    pub fn load_catalog(&self) -> RetrievalResult<Vec<DriverPackageRecord>> {
        let path = self.fetch_catalog_to(&self.config.catalog_path())?;
        let records = parse_records(&path);

        if let Err(e) = fs::remove_file(&path) {
            tracing::debug!(path = %path.display(), error = %e, "Could not remove catalog file");
        }

        records
    }

    /// Fetch the catalog to an explicit destination, keeping it.
    pub fn fetch_catalog_to(&self, dest: &Path) -> RetrievalResult<PathBuf> {
        let url = &self.config.catalog_url;
        tracing::debug!(url = %url, fetcher = self.fetcher.name(), "Fetching catalog");

        self.fetcher
            .fetch(url, dest)
            .map_err(|e| RetrievalError::CatalogUnavailable {
                url: url.clone(),
                source: e,
            })?;

        Ok(dest.to_path_buf())
    }

    /// Resolve the model and list every catalog record supporting it.
    pub fn find_packages(
        &self,
        requested: Option<ModelIdentifier>,
    ) -> RetrievalResult<(ModelIdentifier, Vec<DriverPackageRecord>)> {
        let model = self.resolve_model(requested)?;
        let records = self.load_catalog()?;
        let matches = catalog::select_packages(&records, &model)
            .into_iter()
            .cloned()
            .collect();
        Ok((model, matches))
    }

    /// Run the full retrieval.
    ///
    /// # Arguments
    ///
    /// * `requested` - Model to retrieve for; detected when `None`
    /// * `on_progress` - Optional callback invoked on every stage entry
    pub fn run(
        &self,
        requested: Option<ModelIdentifier>,
        on_progress: Option<StageCallback>,
    ) -> RetrievalResult<RetrievalOutcome> {
        let output_dir = std::path::absolute(&self.config.output_dir)
            .map_err(|e| RetrievalError::filesystem(&self.config.output_dir, e))?;
        let mut session = RetrievalSession::new(output_dir, on_progress.as_ref());

        match self.execute(&mut session, requested) {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                session.abort(&e);
                Err(e)
            }
        }
    }

    fn execute(
        &self,
        session: &mut RetrievalSession<'_>,
        requested: Option<ModelIdentifier>,
    ) -> RetrievalResult<RetrievalOutcome> {
        // Model
        let model = self.resolve_model(requested)?;
        session.model = Some(model.clone());
        session.advance(
            PipelineStage::ModelResolved,
            &format!("Using model: {}", model),
        );

        // Catalog
        let catalog_path = self.config.catalog_path();
        self.fetch_catalog_to(&catalog_path)?;
        session.advance(PipelineStage::CatalogFetched, "Catalog fetched");

        let records = parse_records(&catalog_path);
        if let Err(e) = fs::remove_file(&catalog_path) {
            tracing::debug!(
                path = %catalog_path.display(),
                error = %e,
                "Could not remove catalog file"
            );
        }
        let records = records?;
        session.advance(
            PipelineStage::Parsed,
            &format!("Catalog lists {} entries", records.len()),
        );

        // Selection
        let Some(record) = catalog::first_package(&records, &model) else {
            session.advance(
                PipelineStage::Done,
                &format!("No supported package for model {}", model),
            );
            return Ok(RetrievalOutcome::NoMatchingPackage { model });
        };
        let version = required_field(record.version.as_deref(), "Version", &catalog_path)?;
        let url = required_field(record.url.as_deref(), "URL", &catalog_path)?;
        check_version_is_path_safe(version, &catalog_path)?;
        session.selected = Some(record.clone());
        session.advance(
            PipelineStage::Selected,
            &format!("Found supported ESD: {}", version),
        );

        // Idempotence guard, before anything is downloaded or staged
        let landing_dir = session.output_dir.join(landing_dir_name(version));
        if landing_dir.exists() {
            return Err(RetrievalError::AlreadyDownloaded { path: landing_dir });
        }
        session.landing_dir = Some(landing_dir.clone());

        let working_dir = WorkingDir::create(
            self.config.working_dir(version),
            self.config.keep_working_dir,
        )?;
        session.working_dir = Some(working_dir.path().to_path_buf());

        // Download
        session.advance(PipelineStage::Downloading, &format!("Downloading {}", url));
        let package_path = working_dir.path().join(PACKAGE_FILENAME);
        let bytes_downloaded = self
            .fetcher
            .fetch(url, &package_path)
            .map_err(|e| RetrievalError::DownloadFailed {
                url: url.to_string(),
                source: e,
            })?;

        // Extract
        session.advance(PipelineStage::Extracting, "Extracting...");
        let extract_dir = working_dir.path().join(EXTRACT_DIRNAME);
        let files_extracted = self
            .extractor
            .extract(&package_path, &extract_dir)
            .map_err(|e| RetrievalError::ExtractFailed {
                path: package_path.clone(),
                source: e,
            })?;
        promote(&extract_dir, &landing_dir)?;

        // Cleanup
        session.advance(PipelineStage::CleaningUp, "Cleaning up working directory...");
        working_dir.cleanup();

        session.advance(
            PipelineStage::Done,
            &format!(
                "Staged {} files in {}",
                files_extracted,
                landing_dir.display()
            ),
        );

        Ok(RetrievalOutcome::Retrieved(RetrievalReport {
            model,
            version: version.to_string(),
            url: url.to_string(),
            landing_dir,
            bytes_downloaded,
            files_extracted,
        }))
    }
}

fn parse_records(path: &Path) -> RetrievalResult<Vec<DriverPackageRecord>> {
    catalog::parse_catalog_file(path).map_err(|e| RetrievalError::CatalogMalformed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

fn required_field<'r>(
    value: Option<&'r str>,
    name: &str,
    catalog_path: &Path,
) -> RetrievalResult<&'r str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| RetrievalError::CatalogMalformed {
            path: catalog_path.to_path_buf(),
            reason: format!("selected entry has no {}", name),
        })
}

/// The version becomes a directory name, so it must be a single plain
/// path component.
fn check_version_is_path_safe(version: &str, catalog_path: &Path) -> RetrievalResult<()> {
    let mut components = Path::new(version).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(RetrievalError::CatalogMalformed {
            path: catalog_path.to_path_buf(),
            reason: format!("version '{}' is not a valid directory name", version),
        }),
    }
}
