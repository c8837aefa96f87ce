//! Common types and traits shared across `GeoIngest` crates.
//!
//! This crate provides the data model that flows between the format readers
//! and the core pipeline, preventing circular dependencies between
//! `geoingest-core` and the format implementation crates.

pub mod crs;
pub mod drivers;
pub mod inputs;
pub mod io;
pub mod model;

// Re-export commonly used types
pub use crs::Crs;
pub use drivers::{Driver, InputSpec};
pub use inputs::{InputFile, InputFiles};
pub use io::DatasetReader;
pub use model::{
    AttributeValue, FieldKind, FieldSchema, Geometry, Properties, RawDataset, RawRecord,
    unique_column_names,
};
