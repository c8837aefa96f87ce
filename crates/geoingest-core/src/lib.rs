//! `geoingest-core` is the core library for the `GeoIngest` project: it turns
//! uploaded geospatial files into storage-ready WGS 84 layers.
//!
//! This crate includes:
//! - **Driver Registry**: the closed set of upload formats and the input streams each one needs.
//! - **Format Processors**: one [`FormatProcessor`](processor::FormatProcessor) per format, created by the factory in [`processor`].
//! - **Standardizer**: CRS normalization, Z stripping, validity repair and geometry type classification.
//! - **Feature Extractor**: per-record extraction with property sanitation and skip reporting.
//! - **Metadata Analyzer**: inferred names and descriptions, quality statistics and clustering.
//! - **Persistence Gateway**: the [`LayerGateway`](gateway::LayerGateway) seam plus an in-memory implementation.
//!
//! [`operations::process`] is the usual entry point.

pub mod analysis;
pub mod drivers;
pub mod error;
pub mod extract;
pub mod gateway;
pub mod operations;
pub mod options;
pub mod processor;
pub mod standardize;
pub mod types;

pub use error::{ErrorKind, GeoIngestError, Result};
pub use options::{AnalyzerConfig, ProcessOptions};
pub use types::ProcessingResult;
