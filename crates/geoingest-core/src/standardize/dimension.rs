//! Dimensionality reduction.

use geoingest_core_common::Geometry;
use tracing::warn;

type Position = Vec<f64>;

/// Reduces every coordinate of `geometry` to `(x, y)`.
///
/// Polygons reduce their exterior and interior rings independently and
/// multi-geometries reduce each member. Geometry collections are not a
/// supported layer geometry and pass through unchanged. Applying the
/// function twice yields the same geometry as applying it once.
///
/// # Examples
///
/// ```
/// use geoingest_core::standardize::convert_to_2d;
/// use geoingest_core_common::Geometry;
///
/// let point = Geometry::Point(vec![1.0, 2.0, 50.0]);
/// assert_eq!(convert_to_2d(&point), Geometry::Point(vec![1.0, 2.0]));
/// ```
#[must_use]
pub fn convert_to_2d(geometry: &Geometry) -> Geometry {
    match geometry {
        Geometry::Point(position) => Geometry::Point(position_2d(position)),
        Geometry::MultiPoint(positions) => Geometry::MultiPoint(line_2d(positions)),
        Geometry::LineString(positions) => Geometry::LineString(line_2d(positions)),
        Geometry::MultiLineString(lines) => Geometry::MultiLineString(polygon_2d(lines)),
        Geometry::Polygon(rings) => Geometry::Polygon(polygon_2d(rings)),
        Geometry::MultiPolygon(polygons) => {
            Geometry::MultiPolygon(polygons.iter().map(|rings| polygon_2d(rings)).collect())
        },
        other @ Geometry::GeometryCollection(_) => {
            warn!("Unsupported geometry type {}, left unchanged", other.type_name());
            other.clone()
        },
    }
}

fn position_2d(position: &Position) -> Position {
    position.iter().take(2).copied().collect()
}

fn line_2d(positions: &[Position]) -> Vec<Position> {
    positions.iter().map(position_2d).collect()
}

fn polygon_2d(rings: &[Vec<Position>]) -> Vec<Vec<Position>> {
    rings.iter().map(|ring| line_2d(ring)).collect()
}
