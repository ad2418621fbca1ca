//! Driver package records.

use crate::model::ModelIdentifier;

use super::document::CatalogDict;

/// Child element holding the package version.
pub const VERSION_KEY: &str = "Version";

/// Child element holding the package download URL.
pub const URL_KEY: &str = "URL";

/// Child element listing supported models.
pub const SUPPORTED_MODELS_KEY: &str = "SupportedModels";

/// The package-relevant fields of one catalog dictionary.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DriverPackageRecord {
    /// Package version, e.g. `041-1234`.
    pub version: Option<String>,
    /// Download location of the package.
    pub url: Option<String>,
    /// Raw `SupportedModels` texts; each may list several models.
    pub supported_models: Vec<String>,
}

impl DriverPackageRecord {
    /// Project a catalog dictionary.
    pub fn from_dict(dict: &CatalogDict) -> Self {
        Self {
            version: dict.first(VERSION_KEY).map(str::to_string),
            url: dict.first(URL_KEY).map(str::to_string),
            supported_models: dict.all(SUPPORTED_MODELS_KEY).map(str::to_string).collect(),
        }
    }

    /// Whether any `SupportedModels` text contains the model as a substring.
    ///
    /// `MacBookPro1` therefore matches an entry for `MacBookPro15,1`.
    pub fn supports(&self, model: &ModelIdentifier) -> bool {
        self.supported_models
            .iter()
            .any(|entry| entry.contains(model.as_str()))
    }
}
