//! Configuration for the retrieval pipeline.

use std::path::PathBuf;

use crate::DEFAULT_CATALOG_URL;

/// Product prefix of landing and working directory names.
pub const PRODUCT_NAME: &str = "BootCamp";

/// File name of the downloaded package inside the working directory.
pub const PACKAGE_FILENAME: &str = "BootCampESD.pkg";

/// File name of the fetched catalog inside the temp root.
pub const CATALOG_FILENAME: &str = "macaron-catalog.sucatalog";

/// Subdirectory of the working directory the package is unpacked into.
pub const EXTRACT_DIRNAME: &str = "extracted";

/// Name of the landing directory for a package version.
pub fn landing_dir_name(version: &str) -> String {
    format!("{}-{}", PRODUCT_NAME, version)
}

/// Configuration for a retrieval run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory the landing directory is created in.
    pub output_dir: PathBuf,

    /// Root for the catalog file and working directories.
    pub temp_root: PathBuf,

    /// Catalog to search.
    pub catalog_url: String,

    /// Keep the working directory after the run (success or failure).
    pub keep_working_dir: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            temp_root: std::env::temp_dir(),
            catalog_url: DEFAULT_CATALOG_URL.to_string(),
            keep_working_dir: false,
        }
    }
}

impl PipelineConfig {
    /// Create a configuration writing into `output_dir`.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            ..Default::default()
        }
    }

    /// Set the temp root.
    pub fn with_temp_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.temp_root = path.into();
        self
    }

    /// Set the catalog URL.
    pub fn with_catalog_url(mut self, url: impl Into<String>) -> Self {
        self.catalog_url = url.into();
        self
    }

    /// Keep or remove the working directory after the run.
    pub fn with_keep_working_dir(mut self, keep: bool) -> Self {
        self.keep_working_dir = keep;
        self
    }

    /// Where the catalog is fetched to.
    pub fn catalog_path(&self) -> PathBuf {
        self.temp_root.join(CATALOG_FILENAME)
    }

    /// Staging directory for a package version:
    /// `<temp>/BootCamp-unpack-<version>`.
    pub fn working_dir(&self, version: &str) -> PathBuf {
        self.temp_root.join(format!("{}-unpack-{}", PRODUCT_NAME, version))
    }
}
