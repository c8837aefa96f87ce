//! Registry of supported upload formats.
//!
//! Each format crate exports a [`Driver`] descriptor; this module collects
//! them into a closed registry that the processor factory and the CLI share.
//! Lookup is pure: no I/O happens here.
//!
//! # Examples
//!
//! ```
//! use geoingest_core::drivers::{Format, find_driver};
//!
//! let driver = find_driver("Shapefile").expect("shapefile is registered");
//! assert_eq!(driver.required_inputs(), ["file_shp", "file_shx", "file_dbf"]);
//!
//! let format: Format = "csv".parse().unwrap();
//! assert_eq!(format.driver().short_name, "csv");
//! ```

use std::fmt;
use std::str::FromStr;

use geoingest_core_common::Driver;

use crate::error::{DriverError, unknown_format};

/// The closed set of upload formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// ESRI shapefile bundle
    Shapefile,
    /// Point table with coordinate columns
    Csv,
    /// `GeoJSON` document or sequence
    GeoJson,
    /// Multi-layer `GeoPackage` container
    GeoPackage,
}

impl Format {
    /// Every registered format, in registry order.
    pub const ALL: [Format; 4] = [
        Format::Shapefile,
        Format::Csv,
        Format::GeoJson,
        Format::GeoPackage,
    ];

    /// Returns the descriptor of this format.
    #[must_use]
    pub fn driver(self) -> Driver {
        match self {
            Format::Shapefile => geoingest_shapefile::DRIVER,
            Format::Csv => geoingest_csv::DRIVER,
            Format::GeoJson => geoingest_geojson::DRIVER,
            Format::GeoPackage => geoingest_geopackage::DRIVER,
        }
    }

    /// Returns the format tag.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        self.driver().short_name
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = DriverError;

    /// Parses a format tag, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Format::ALL
            .into_iter()
            .find(|format| format.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| unknown_format(s))
    }
}

/// Returns the descriptors of all registered formats.
///
/// # Examples
///
/// ```
/// use geoingest_core::drivers::get_drivers;
///
/// let drivers = get_drivers();
/// assert_eq!(drivers.len(), 4);
/// assert!(drivers.iter().any(|d| d.multi_layer));
/// ```
#[must_use]
pub fn get_drivers() -> Vec<Driver> {
    Format::ALL.into_iter().map(Format::driver).collect()
}

/// Finds a driver by its format tag (case-insensitive).
///
/// Returns `None` if no driver with the given tag is registered.
///
/// # Examples
///
/// ```
/// use geoingest_core::drivers::find_driver;
///
/// let driver = find_driver("GEOJSON").expect("GeoJSON should exist");
/// assert_eq!(driver.short_name, "geojson");
///
/// assert!(find_driver("kml").is_none());
/// ```
#[must_use]
pub fn find_driver(name: &str) -> Option<Driver> {
    name.parse::<Format>().ok().map(Format::driver)
}

/// Returns, for every registered format, its tag and required input keys.
///
/// Used for validation messaging: callers can tell a user which streams
/// each format expects before anything is uploaded.
#[must_use]
pub fn required_inputs() -> Vec<(&'static str, Vec<&'static str>)> {
    get_drivers()
        .into_iter()
        .map(|driver| (driver.short_name, driver.required_inputs()))
        .collect()
}

/// Returns all format tags in alphabetically sorted order.
///
/// # Examples
///
/// ```
/// use geoingest_core::drivers::get_driver_names;
///
/// let names = get_driver_names();
/// assert_eq!(names, ["csv", "geojson", "geopackage", "shapefile"]);
/// ```
#[must_use]
pub fn get_driver_names() -> Vec<&'static str> {
    let mut names: Vec<_> = get_drivers().iter().map(|d| d.short_name).collect();
    names.sort_unstable();
    names
}
