//! Helpers shared by the `GeoIngest` format readers.

pub mod error;
pub mod staging;

pub use error::{SourcePosition, SpatialFormatReadError, SpatialFormatResult};
pub use staging::StagingArea;
