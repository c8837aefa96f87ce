//! Geometry and CRS standardization.
//!
//! Brings loaded geometries into the canonical form of a stored layer:
//! WGS 84 coordinates, exactly two ordinates per position, and valid
//! topology. CRS normalization is dataset-wide and fatal on failure; the
//! per-geometry steps report a [`SkipReason`] instead so the extractor can
//! drop the record and carry on.

pub mod crs;
pub mod dimension;
pub mod validity;

use std::collections::BTreeSet;

use geo::{Coord, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon};
use geoingest_core_common::Geometry;
use tracing::{debug, warn};

use crate::extract::SkipReason;

pub use crs::{EQUAL_AREA_EPSG, Projection, normalize_crs, to_equal_area};
pub use dimension::convert_to_2d;
pub use validity::{is_valid, repair};

/// Layer geometry type reported for mixed geometry types.
pub const GENERIC_GEOMETRY_TYPE: &str = "GEOMETRY";

/// Strips Z and repairs one geometry.
///
/// # Errors
///
/// Returns [`SkipReason::UnsupportedGeometry`] for geometry collections and
/// [`SkipReason::GeometryRepairFailure`] when an invalid geometry cannot be
/// repaired.
pub fn standardize_geometry(geometry: &Geometry) -> Result<Geometry, SkipReason> {
    let flat = convert_to_2d(geometry);
    if matches!(flat, Geometry::GeometryCollection(_)) {
        return Err(SkipReason::UnsupportedGeometry {
            geometry_type: flat.type_name().to_string(),
        });
    }
    if is_valid(&flat) {
        return Ok(flat);
    }

    warn!("Invalid {} geometry, attempting repair", flat.type_name());
    let repaired = repair(&flat).map_err(|message| SkipReason::GeometryRepairFailure { message })?;
    debug!("Repaired geometry into {}", repaired.type_name());
    Ok(repaired)
}

/// Classifies the geometry type of a layer.
///
/// One distinct type is reported uppercased (`POINT`, `MULTIPOLYGON`);
/// several distinct types yield [`GENERIC_GEOMETRY_TYPE`]. `None` when there
/// are no geometries.
///
/// # Examples
///
/// ```
/// use geoingest_core::standardize::classify_geometry_type;
/// use geoingest_core_common::Geometry;
///
/// let points = [Geometry::Point(vec![0.0, 0.0]), Geometry::Point(vec![1.0, 1.0])];
/// assert_eq!(classify_geometry_type(&points).as_deref(), Some("POINT"));
///
/// let mixed = [points[0].clone(), Geometry::LineString(vec![vec![0.0, 0.0], vec![1.0, 1.0]])];
/// assert_eq!(classify_geometry_type(&mixed).as_deref(), Some("GEOMETRY"));
/// ```
pub fn classify_geometry_type<'a>(
    geometries: impl IntoIterator<Item = &'a Geometry>,
) -> Option<String> {
    let types: BTreeSet<&str> = geometries.into_iter().map(Geometry::type_name).collect();
    match types.len() {
        0 => None,
        1 => types.first().map(|name| name.to_uppercase()),
        _ => Some(GENERIC_GEOMETRY_TYPE.to_string()),
    }
}

/// Visits every position of `geometry`, including collection members.
pub(crate) fn for_each_position(geometry: &mut Geometry, visit: &mut impl FnMut(&mut Vec<f64>)) {
    match geometry {
        Geometry::Point(position) => visit(position),
        Geometry::MultiPoint(positions) | Geometry::LineString(positions) => {
            positions.iter_mut().for_each(|position| visit(position));
        },
        Geometry::MultiLineString(rings) | Geometry::Polygon(rings) => rings
            .iter_mut()
            .flatten()
            .for_each(|position| visit(position)),
        Geometry::MultiPolygon(polygons) => polygons
            .iter_mut()
            .flatten()
            .flatten()
            .for_each(|position| visit(position)),
        Geometry::GeometryCollection(members) => {
            for member in members {
                for_each_position(&mut member.value, visit);
            }
        },
    }
}

/// Converts a standardized geometry to its `geo` counterpart.
///
/// `None` for collections and positions with fewer than two ordinates.
pub(crate) fn to_geo(geometry: &Geometry) -> Option<geo::Geometry> {
    Some(match geometry {
        Geometry::Point(position) => geo::Geometry::Point(Point(geo_coord(position)?)),
        Geometry::MultiPoint(positions) => geo::Geometry::MultiPoint(MultiPoint::new(
            positions
                .iter()
                .map(|p| geo_coord(p).map(Point))
                .collect::<Option<_>>()?,
        )),
        Geometry::LineString(positions) => geo::Geometry::LineString(geo_line(positions)?),
        Geometry::MultiLineString(lines) => geo::Geometry::MultiLineString(MultiLineString::new(
            lines.iter().map(|l| geo_line(l)).collect::<Option<_>>()?,
        )),
        Geometry::Polygon(rings) => geo::Geometry::Polygon(geo_polygon(rings)?),
        Geometry::MultiPolygon(polygons) => geo::Geometry::MultiPolygon(MultiPolygon::new(
            polygons.iter().map(|p| geo_polygon(p)).collect::<Option<_>>()?,
        )),
        Geometry::GeometryCollection(_) => return None,
    })
}

pub(crate) fn geo_polygon(rings: &[Vec<Vec<f64>>]) -> Option<Polygon> {
    let (exterior, interiors) = rings.split_first()?;
    Some(Polygon::new(
        geo_line(exterior)?,
        interiors
            .iter()
            .map(|ring| geo_line(ring))
            .collect::<Option<_>>()?,
    ))
}

pub(crate) fn polygon_from_geo(polygon: &Polygon) -> Vec<Vec<Vec<f64>>> {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(|ring| ring.coords().map(|c| vec![c.x, c.y]).collect())
        .collect()
}

fn geo_coord(position: &[f64]) -> Option<Coord> {
    match position {
        [x, y, ..] => Some(Coord { x: *x, y: *y }),
        _ => None,
    }
}

fn geo_line(positions: &[Vec<f64>]) -> Option<LineString> {
    positions
        .iter()
        .map(|p| geo_coord(p))
        .collect::<Option<Vec<_>>>()
        .map(LineString::new)
}
