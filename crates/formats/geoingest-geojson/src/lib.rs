//! `GeoJSON` reader for `GeoIngest`.
//!
//! Uploads are decoded under a fixed list of candidate text encodings before
//! parsing; the first encoding that yields valid JSON wins. `FeatureCollection`,
//! single `Feature`, bare `Geometry` documents and newline-delimited `GeoJSON`
//! sequences are accepted. A legacy top-level `crs` member is honored.

pub mod encoding;
pub mod parser;
pub mod reader;

use geoingest_core_common::{Driver, InputSpec};

pub use encoding::{TextEncoding, decode_json};
pub use parser::parse_documents;
pub use reader::GeoJsonReader;

/// Input stream identifier of the `GeoJSON` document.
pub const INPUT_GEOJSON: &str = "file_geojson";

/// Descriptor of the `GeoJSON` format.
pub const DRIVER: Driver = Driver::new(
    "geojson",
    "GeoJSON",
    &["geojson", "json", "geojsonl", "geojsons"],
    &[InputSpec::required(INPUT_GEOJSON, "GeoJSON document")],
    false,
);
