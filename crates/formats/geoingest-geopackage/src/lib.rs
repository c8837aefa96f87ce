//! `GeoPackage` reader for `GeoIngest`.
//!
//! A `GeoPackage` is an `SQLite` container holding zero or more feature
//! layers. The upload is staged to a temporary file, opened read-only, and
//! layers are listed from `gpkg_contents` and read one at a time. Geometry
//! blobs carry the `GeoPackage` binary header in front of standard WKB.

pub mod blob;
pub mod container;

use geoingest_core_common::{Driver, InputSpec};

pub use blob::decode_geometry;
pub use container::GeoPackage;

/// Input stream identifier of the container.
pub const INPUT_GPKG: &str = "file_gpkg";

/// Descriptor of the `GeoPackage` format.
pub const DRIVER: Driver = Driver::new(
    "geopackage",
    "OGC GeoPackage",
    &["gpkg"],
    &[InputSpec::required(INPUT_GPKG, "GeoPackage container (.gpkg)")],
    true,
);
