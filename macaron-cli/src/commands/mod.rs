//! CLI command implementations.

pub mod catalog;
pub mod common;
pub mod config;
pub mod download;
pub mod model;
pub mod packages;
pub mod version;
