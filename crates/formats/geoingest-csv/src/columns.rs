//! Latitude/longitude column detection.

use geoingest_shared::SpatialFormatReadError;

/// Latitude header names, searched in order (case-sensitive).
pub const LATITUDE_CANDIDATES: &[&str] = &["lat", "latitude", "y", "Latitude", "LAT", "LATITUDE"];

/// Longitude header names, searched in order (case-sensitive).
pub const LONGITUDE_CANDIDATES: &[&str] = &[
    "lon",
    "long",
    "longitude",
    "x",
    "Longitude",
    "LON",
    "LONGITUDE",
];

/// Indices of the coordinate columns within the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinateColumns {
    /// Latitude column index
    pub lat: usize,
    /// Longitude column index
    pub lon: usize,
}

/// Locates the latitude and longitude columns.
///
/// Explicit names are used only when both of them exist in the header;
/// otherwise each axis takes the first name from its candidate list that is
/// present.
///
/// # Errors
///
/// Returns [`SpatialFormatReadError::ColumnDetection`] naming every axis that
/// could not be identified.
pub fn detect_coordinate_columns(
    headers: &[String],
    lat_column: Option<&str>,
    lon_column: Option<&str>,
) -> Result<CoordinateColumns, SpatialFormatReadError> {
    let position = |name: &str| headers.iter().position(|header| header == name);

    if let (Some(lat_name), Some(lon_name)) = (lat_column, lon_column) {
        if let (Some(lat), Some(lon)) = (position(lat_name), position(lon_name)) {
            return Ok(CoordinateColumns { lat, lon });
        }
        log::debug!(
            "Explicit coordinate columns '{lat_name}'/'{lon_name}' not both present, detecting"
        );
    }

    let first_match =
        |candidates: &[&str]| candidates.iter().find_map(|&candidate| position(candidate));
    let lat = first_match(LATITUDE_CANDIDATES);
    let lon = first_match(LONGITUDE_CANDIDATES);

    match (lat, lon) {
        (Some(lat), Some(lon)) => Ok(CoordinateColumns { lat, lon }),
        _ => {
            let mut missing = Vec::new();
            if lat.is_none() {
                missing.push("latitude".to_string());
            }
            if lon.is_none() {
                missing.push("longitude".to_string());
            }
            Err(SpatialFormatReadError::ColumnDetection {
                missing,
                headers: headers.to_vec(),
            })
        },
    }
}
