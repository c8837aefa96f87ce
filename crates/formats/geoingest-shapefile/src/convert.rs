//! Conversion of shapefile shapes and dBASE values into the raw model.

use geoingest_core_common::{AttributeValue, Geometry};
use shapefile::dbase::FieldValue;
use shapefile::{Point, PointM, PointZ, PolygonRing, Shape};

/// Point types whose coordinates become a `GeoJSON` position.
trait Position {
    fn position(&self) -> Vec<f64>;
}

impl Position for Point {
    fn position(&self) -> Vec<f64> {
        vec![self.x, self.y]
    }
}

// Measures are not coordinates.
impl Position for PointM {
    fn position(&self) -> Vec<f64> {
        vec![self.x, self.y]
    }
}

impl Position for PointZ {
    fn position(&self) -> Vec<f64> {
        vec![self.x, self.y, self.z]
    }
}

/// Converts one shape to a geometry.
///
/// Z ordinates are kept; M values are dropped. Null shapes and shapes
/// without any part yield `None`, as do multipatches, which have no
/// counterpart in the geometry model.
#[must_use]
pub fn shape_to_geometry(shape: Shape) -> Option<Geometry> {
    match shape {
        Shape::NullShape => None,
        Shape::Point(point) => Some(Geometry::Point(point.position())),
        Shape::PointM(point) => Some(Geometry::Point(point.position())),
        Shape::PointZ(point) => Some(Geometry::Point(point.position())),
        Shape::Polyline(line) => lines(line.parts()),
        Shape::PolylineM(line) => lines(line.parts()),
        Shape::PolylineZ(line) => lines(line.parts()),
        Shape::Polygon(polygon) => polygons(polygon.rings()),
        Shape::PolygonM(polygon) => polygons(polygon.rings()),
        Shape::PolygonZ(polygon) => polygons(polygon.rings()),
        Shape::Multipoint(points) => multipoint(points.points()),
        Shape::MultipointM(points) => multipoint(points.points()),
        Shape::MultipointZ(points) => multipoint(points.points()),
        Shape::Multipatch(_) => {
            log::warn!("Multipatch shapes are not supported; record has no geometry");
            None
        },
    }
}

fn positions<P: Position>(points: &[P]) -> Vec<Vec<f64>> {
    points.iter().map(Position::position).collect()
}

fn lines<P: Position>(parts: &[Vec<P>]) -> Option<Geometry> {
    let mut lines: Vec<Vec<Vec<f64>>> = parts.iter().map(|part| positions(part)).collect();
    match lines.len() {
        0 => None,
        1 => lines.pop().map(Geometry::LineString),
        _ => Some(Geometry::MultiLineString(lines)),
    }
}

/// Groups rings into polygons: every outer ring opens a polygon and the inner
/// rings that follow it are its holes.
fn polygons<P: Position>(rings: &[PolygonRing<P>]) -> Option<Geometry> {
    let mut polygons: Vec<Vec<Vec<Vec<f64>>>> = Vec::new();
    for ring in rings {
        match ring {
            PolygonRing::Outer(points) => polygons.push(vec![positions(points)]),
            PolygonRing::Inner(points) => match polygons.last_mut() {
                Some(polygon) => polygon.push(positions(points)),
                None => polygons.push(vec![positions(points)]),
            },
        }
    }
    match polygons.len() {
        0 => None,
        1 => polygons.pop().map(Geometry::Polygon),
        _ => Some(Geometry::MultiPolygon(polygons)),
    }
}

fn multipoint<P: Position>(points: &[P]) -> Option<Geometry> {
    (!points.is_empty()).then(|| Geometry::MultiPoint(positions(points)))
}

/// Converts a dBASE field value.
///
/// Numeric fields holding a whole number become integers; dates are
/// rendered as `YYYY-MM-DD` and datetimes as `YYYY-MM-DDTHH:MM:SS`.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn field_value(value: FieldValue) -> AttributeValue {
    match value {
        FieldValue::Character(text) => text.map_or(AttributeValue::Null, |text| {
            AttributeValue::Text(text.trim_end().to_string())
        }),
        FieldValue::Memo(text) => AttributeValue::Text(text),
        FieldValue::Numeric(number) => number.map_or(AttributeValue::Null, |number| {
            if number.fract() == 0.0 && number.abs() < 9.0e15 {
                AttributeValue::Integer(number as i64)
            } else {
                AttributeValue::Float(number)
            }
        }),
        FieldValue::Float(number) => {
            number.map_or(AttributeValue::Null, |n| AttributeValue::Float(f64::from(n)))
        },
        FieldValue::Integer(number) => AttributeValue::Integer(i64::from(number)),
        FieldValue::Double(number) | FieldValue::Currency(number) => AttributeValue::Float(number),
        FieldValue::Logical(flag) => flag.map_or(AttributeValue::Null, AttributeValue::Bool),
        FieldValue::Date(date) => date.map_or(AttributeValue::Null, |date| {
            AttributeValue::Text(format!(
                "{:04}-{:02}-{:02}",
                date.year(),
                date.month(),
                date.day()
            ))
        }),
        FieldValue::DateTime(datetime) => {
            let date = datetime.date();
            let time = datetime.time();
            AttributeValue::Text(format!(
                "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
                date.year(),
                date.month(),
                date.day(),
                time.hours(),
                time.minutes(),
                time.seconds()
            ))
        },
    }
}
