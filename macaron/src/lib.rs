//! Macaron - Boot Camp driver retrieval
//!
//! This library finds the Boot Camp ESD (driver package) published for a Mac
//! model in Apple's software update catalog, downloads it, and stages the
//! extracted contents in a landing directory.
//!
//! The retrieval flow is driven by [`pipeline::RetrievalPipeline`], which
//! composes the smaller pieces:
//!
//! - [`model`]: detect the running machine's model identifier
//! - [`fetch`]: retrieve a URL to a local file (curl/wget or HTTP)
//! - [`catalog`]: parse the catalog and select matching packages
//! - [`extractor`]: unpack the downloaded package
//! - [`installer`]: schedule the elevated driver installation (Windows)
//!
//! [`config`] and [`logging`] hold the INI settings and subscriber setup used
//! by the command-line front end.

pub mod catalog;
pub mod config;
pub mod extractor;
pub mod fetch;
pub mod installer;
pub mod logging;
pub mod model;
pub mod pipeline;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default software update catalog.
pub const DEFAULT_CATALOG_URL: &str = "https://swscan.apple.com/content/catalogs/others/index-10.15-10.14-10.13-10.12-10.11-10.10-10.9-mountainlion-lion-snowleopard-leopard.merged-1.sucatalog";
