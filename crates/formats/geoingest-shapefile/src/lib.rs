//! ESRI Shapefile reader for `GeoIngest`.
//!
//! A shapefile upload is a bundle of companion streams sharing one logical
//! name: geometry (`.shp`), shape index (`.shx`) and attribute table
//! (`.dbf`), plus an optional projection (`.prj`). The bundle is staged in a
//! per-call temporary directory, read, and the directory is removed before
//! the read returns.

pub mod convert;
pub mod reader;

use geoingest_core_common::{Driver, InputSpec};

pub use reader::ShapefileReader;

/// Input stream identifier of the geometry file.
pub const INPUT_SHP: &str = "file_shp";
/// Input stream identifier of the shape index file.
pub const INPUT_SHX: &str = "file_shx";
/// Input stream identifier of the attribute table.
pub const INPUT_DBF: &str = "file_dbf";
/// Input stream identifier of the optional projection file.
pub const INPUT_PRJ: &str = "file_prj";

/// Descriptor of the shapefile format.
pub const DRIVER: Driver = Driver::new(
    "shapefile",
    "ESRI Shapefile",
    &["shp", "shx", "dbf", "prj"],
    &[
        InputSpec::required(INPUT_SHP, "Shape geometry file (.shp)"),
        InputSpec::required(INPUT_SHX, "Shape index file (.shx)"),
        InputSpec::required(INPUT_DBF, "Attribute table (.dbf)"),
        InputSpec::optional(INPUT_PRJ, "Projection definition (.prj)"),
    ],
    false,
);
