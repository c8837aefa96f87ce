//! `GeoPackage` geometry blob decoding.

use geoingest_core_common::Geometry;
use geoingest_shared::{SpatialFormatReadError, SpatialFormatResult};
use geozero::ToGeo;
use geozero::wkb::GpkgWkb;

const MAGIC: &[u8; 2] = b"GP";
const EMPTY_FLAG: u8 = 0b0001_0000;

/// Decodes a `GeoPackage` geometry blob.
///
/// Returns `Ok(None)` for blobs flagged as empty geometries.
///
/// # Errors
///
/// Returns [`SpatialFormatReadError::Parse`] when the header magic is
/// missing or the WKB body cannot be decoded.
pub fn decode_geometry(blob: &[u8]) -> SpatialFormatResult<Option<Geometry>> {
    if blob.len() < 8 || &blob[..2] != MAGIC {
        return Err(SpatialFormatReadError::parse(
            "geometry blob lacks the GeoPackage header",
        ));
    }
    if blob[3] & EMPTY_FLAG != 0 {
        return Ok(None);
    }

    let geometry: geo_types::Geometry<f64> = GpkgWkb(blob.to_vec())
        .to_geo()
        .map_err(|err| SpatialFormatReadError::parse(format!("invalid geometry blob: {err}")))?;
    Ok(Some(Geometry::from(&geometry)))
}
