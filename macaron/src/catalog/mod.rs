//! Software update catalog parsing and package selection.
//!
//! The catalog is an XML document containing repeated `dict` elements. Each
//! `dict` may carry `Version`, `URL` and any number of `SupportedModels`
//! children:
//!
//! ```text
//! <dict>
//!   <Version>041-1234</Version>
//!   <URL>https://example/pkg.pkg</URL>
//!   <SupportedModels>MacBookPro15,1,MacBookPro15,2</SupportedModels>
//! </dict>
//! ```
//!
//! Parsing happens in two layers:
//!
//! - [`CatalogDocument`]: the generic dictionaries, in document order
//! - [`DriverPackageRecord`]: the projection the pipeline cares about
//!
//! [`select_packages`] then keeps the records supporting a model.

mod document;
mod record;
mod selector;

pub use document::{CatalogDict, CatalogDocument};
pub use record::DriverPackageRecord;
pub use selector::{first_package, select_packages};

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Errors that can occur while reading a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog file could not be opened.
    #[error("failed to read catalog {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document is not well-formed XML.
    #[error("malformed catalog: {0}")]
    Malformed(String),
}

/// Parse the catalog at `path` into driver package records.
///
/// Records are returned in document order. Missing `Version` or `URL`
/// children are not an error here.
pub fn parse_catalog_file(path: &Path) -> CatalogResult<Vec<DriverPackageRecord>> {
    let document = CatalogDocument::from_file(path)?;
    let records = document.records();
    tracing::debug!(
        path = %path.display(),
        dicts = document.len(),
        "Parsed catalog"
    );
    Ok(records)
}
