//! Geometry validity checks and polygon repair.

use std::panic::{self, AssertUnwindSafe};

use geo::algorithm::line_intersection::{LineIntersection, line_intersection};
use geo::{
    Area, BooleanOps, BoundingRect, Contains, Coord, Intersects, Line, MultiPolygon, Polygon,
    Relate,
};
use geoingest_core_common::Geometry;

use super::{geo_polygon, polygon_from_geo};

type Position = Vec<f64>;

/// Returns `true` when `geometry` satisfies planar validity rules.
///
/// Every coordinate must have two finite ordinates. Lines need two distinct
/// positions. Polygon rings must be closed, hold at least four positions and
/// be simple: a ring may not cross or touch itself, not even at a vertex.
/// Rings of one polygon may touch each other at single points but never
/// cross or share an edge. Holes lie inside their shell and outside each
/// other. The members of a multipolygon follow the same rules across
/// members and their interiors are disjoint.
#[must_use]
pub fn is_valid(geometry: &Geometry) -> bool {
    match geometry {
        Geometry::Point(position) => position_is_valid(position),
        Geometry::MultiPoint(positions) => positions.iter().all(|p| position_is_valid(p)),
        Geometry::LineString(positions) => line_is_valid(positions),
        Geometry::MultiLineString(lines) => lines.iter().all(|line| line_is_valid(line)),
        Geometry::Polygon(rings) => polygons_are_valid(std::slice::from_ref(rings)),
        Geometry::MultiPolygon(polygons) => polygons_are_valid(polygons),
        Geometry::GeometryCollection(members) => members.iter().all(|g| is_valid(&g.value)),
    }
}

/// Repairs an invalid polygonal geometry by unioning its members one at a
/// time through the overlay engine.
///
/// Each union resolves self-intersections the way a zero-distance buffer
/// does, and overlapping members merge into one part. A result with several
/// parts becomes a `MultiPolygon`.
///
/// # Errors
///
/// Returns a message when `geometry` is not polygonal, has malformed
/// coordinates, or repairs to an empty geometry.
pub fn repair(geometry: &Geometry) -> Result<Geometry, String> {
    let polygons = match geometry {
        Geometry::Polygon(rings) => vec![rings],
        Geometry::MultiPolygon(polygons) => polygons.iter().collect(),
        other => {
            return Err(format!(
                "{} geometries cannot be repaired",
                other.type_name()
            ));
        },
    };
    let members = polygons
        .into_iter()
        .map(|rings| geo_polygon(rings))
        .collect::<Option<Vec<Polygon>>>()
        .ok_or_else(|| "polygon has malformed coordinates".to_string())?;

    let repaired = panic::catch_unwind(AssertUnwindSafe(|| {
        members
            .into_iter()
            .fold(MultiPolygon::new(Vec::new()), |merged, member| {
                merged.union(&MultiPolygon::new(vec![member]))
            })
    }))
    .map_err(|_| "overlay engine failed on this polygon".to_string())?;

    let mut parts: Vec<Polygon> = repaired
        .0
        .into_iter()
        .filter(|polygon| polygon.unsigned_area() > 0.0)
        .collect();
    match parts.len() {
        0 => Err("repair produced an empty geometry".to_string()),
        1 => Ok(Geometry::Polygon(polygon_from_geo(&parts.remove(0)))),
        _ => Ok(Geometry::MultiPolygon(
            parts.iter().map(polygon_from_geo).collect(),
        )),
    }
}

fn position_is_valid(position: &Position) -> bool {
    position.len() >= 2 && position.iter().all(|ordinate| ordinate.is_finite())
}

fn line_is_valid(positions: &[Position]) -> bool {
    positions.iter().all(|p| position_is_valid(p))
        && positions
            .first()
            .is_some_and(|first| positions.iter().any(|p| p[..2] != first[..2]))
}

fn polygons_are_valid(polygons: &[Vec<Vec<Position>>]) -> bool {
    let well_formed = polygons
        .iter()
        .all(|rings| !rings.is_empty() && rings.iter().all(|ring| ring_is_valid(ring)));
    if !well_formed || !rings_are_simple(polygons.iter().flatten()) {
        return false;
    }
    let Some(members) = polygons
        .iter()
        .map(|rings| geo_polygon(rings))
        .collect::<Option<Vec<Polygon>>>()
    else {
        return false;
    };
    members.iter().all(holes_are_nested) && pairwise_disjoint(&members)
}

/// Checks every ring segment against every other one.
///
/// Zero-length segments from repeated positions are dropped before segments
/// are numbered, so neighbours across a repeated vertex stay adjacent.
fn rings_are_simple<'a>(rings: impl Iterator<Item = &'a Vec<Position>>) -> bool {
    let mut segments: Vec<Segment> = Vec::new();
    for (ring, positions) in rings.enumerate() {
        let lines: Vec<Line> = positions
            .windows(2)
            .map(|pair| Line::new(coord(&pair[0]), coord(&pair[1])))
            .filter(|line| line.start != line.end)
            .collect();
        if lines.len() < 3 {
            return false;
        }
        let count = lines.len();
        segments.extend(lines.into_iter().enumerate().map(|(index, line)| Segment {
            ring,
            index,
            count,
            line,
        }));
    }

    for (i, a) in segments.iter().enumerate() {
        for b in &segments[i + 1..] {
            if !a.may_touch(b) {
                continue;
            }
            match line_intersection(a.line, b.line) {
                Some(LineIntersection::Collinear { .. }) => return false,
                Some(LineIntersection::SinglePoint { is_proper, .. })
                    if is_proper || (a.ring == b.ring && !a.is_adjacent(b)) =>
                {
                    return false;
                },
                _ => {},
            }
        }
    }
    true
}

/// Holes lie inside the shell and no hole lies inside another.
fn holes_are_nested(polygon: &Polygon) -> bool {
    let shell = Polygon::new(polygon.exterior().clone(), Vec::new());
    let holes: Vec<Polygon> = polygon
        .interiors()
        .iter()
        .map(|ring| Polygon::new(ring.clone(), Vec::new()))
        .collect();
    holes.iter().all(|hole| shell.contains(hole)) && pairwise_disjoint(&holes)
}

fn pairwise_disjoint(polygons: &[Polygon]) -> bool {
    polygons
        .iter()
        .enumerate()
        .all(|(i, a)| polygons[i + 1..].iter().all(|b| !interiors_intersect(a, b)))
}

fn interiors_intersect(a: &Polygon, b: &Polygon) -> bool {
    match (a.bounding_rect(), b.bounding_rect()) {
        (Some(left), Some(right)) if left.intersects(&right) => {
            let matrix = a.relate(b);
            matrix.is_intersects() && !matrix.is_touches()
        },
        _ => false,
    }
}

fn ring_is_valid(ring: &[Position]) -> bool {
    ring.len() >= 4
        && ring.iter().all(|p| position_is_valid(p))
        && ring.first().map(|p| &p[..2]) == ring.last().map(|p| &p[..2])
}

fn coord(position: &Position) -> Coord {
    Coord {
        x: position[0],
        y: position[1],
    }
}

/// One ring segment with its position in the polygon.
struct Segment {
    ring: usize,
    index: usize,
    count: usize,
    line: Line,
}

impl Segment {
    fn is_adjacent(&self, other: &Segment) -> bool {
        if self.ring != other.ring {
            return false;
        }
        let (low, high) = if self.index < other.index {
            (self.index, other.index)
        } else {
            (other.index, self.index)
        };
        high - low == 1 || (low == 0 && high + 1 == self.count)
    }

    fn may_touch(&self, other: &Segment) -> bool {
        let (a, b) = (self.line, other.line);
        a.start.x.min(a.end.x) <= b.start.x.max(b.end.x)
            && b.start.x.min(b.end.x) <= a.start.x.max(a.end.x)
            && a.start.y.min(a.end.y) <= b.start.y.max(b.end.y)
            && b.start.y.min(b.end.y) <= a.start.y.max(a.end.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring(points: &[(f64, f64)]) -> Vec<Position> {
        points.iter().map(|&(x, y)| vec![x, y]).collect()
    }

    fn square() -> Vec<Position> {
        ring(&[(0.0, 0.0), (0.0, 2.0), (2.0, 2.0), (2.0, 0.0), (0.0, 0.0)])
    }

    fn area(geometry: &Geometry) -> f64 {
        crate::standardize::to_geo(geometry).unwrap().unsigned_area()
    }

    fn bowtie() -> Geometry {
        Geometry::Polygon(vec![ring(&[
            (0.0, 0.0),
            (2.0, 2.0),
            (2.0, 0.0),
            (0.0, 2.0),
            (0.0, 0.0),
        ])])
    }

    #[test]
    fn simple_shapes_are_valid() {
        assert!(is_valid(&Geometry::Polygon(vec![square()])));
        assert!(is_valid(&Geometry::Point(vec![1.0, 2.0])));
        assert!(is_valid(&Geometry::LineString(ring(&[(0.0, 0.0), (1.0, 1.0)]))));
    }

    #[test]
    fn polygon_with_hole_is_valid() {
        let hole = ring(&[(0.5, 0.5), (1.5, 0.5), (1.5, 1.5), (0.5, 1.5), (0.5, 0.5)]);
        assert!(is_valid(&Geometry::Polygon(vec![square(), hole])));
    }

    #[test]
    fn crossing_rings_are_invalid() {
        assert!(!is_valid(&bowtie()));

        let crossing_hole = ring(&[(1.0, 1.0), (3.0, 1.0), (3.0, 1.5), (1.0, 1.5), (1.0, 1.0)]);
        assert!(!is_valid(&Geometry::Polygon(vec![square(), crossing_hole])));
    }

    #[test]
    fn malformed_rings_are_invalid() {
        let open = ring(&[(0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0)]);
        assert!(!is_valid(&Geometry::Polygon(vec![open])));

        let spike = ring(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (0.0, 0.0)]);
        assert!(!is_valid(&Geometry::Polygon(vec![spike])));

        assert!(!is_valid(&Geometry::Point(vec![f64::NAN, 1.0])));
        assert!(!is_valid(&Geometry::LineString(ring(&[(1.0, 1.0), (1.0, 1.0)]))));
    }

    #[test]
    fn repeated_vertices_do_not_invalidate_a_ring() {
        let repeated = ring(&[
            (0.0, 0.0),
            (0.0, 2.0),
            (0.0, 2.0),
            (2.0, 2.0),
            (2.0, 0.0),
            (0.0, 0.0),
        ]);
        assert!(is_valid(&Geometry::Polygon(vec![repeated])));
    }

    #[test]
    fn ring_through_its_own_vertex_is_invalid() {
        let pinched = Geometry::Polygon(vec![ring(&[
            (0.0, 0.0),
            (1.0, 1.0),
            (2.0, 2.0),
            (2.0, 0.0),
            (0.0, 2.0),
            (0.0, 0.0),
        ])]);
        assert!(!is_valid(&pinched));

        let repaired = repair(&pinched).unwrap();
        assert!(is_valid(&repaired));
        assert!((area(&repaired) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn holes_must_sit_inside_their_shell() {
        let outside = ring(&[(3.0, 0.0), (4.0, 0.0), (4.0, 1.0), (3.0, 1.0), (3.0, 0.0)]);
        let stray_hole = Geometry::Polygon(vec![square(), outside]);
        assert!(!is_valid(&stray_hole));

        let repaired = repair(&stray_hole).unwrap();
        assert!(is_valid(&repaired));
        assert!((area(&repaired) - 5.0).abs() < 1e-9);

        let big = ring(&[(0.0, 0.0), (0.0, 4.0), (4.0, 4.0), (4.0, 0.0), (0.0, 0.0)]);
        let outer_hole = ring(&[(0.5, 0.5), (3.5, 0.5), (3.5, 3.5), (0.5, 3.5), (0.5, 0.5)]);
        let inner_hole = ring(&[(1.0, 1.0), (2.0, 1.0), (2.0, 2.0), (1.0, 2.0), (1.0, 1.0)]);
        assert!(!is_valid(&Geometry::Polygon(vec![big, outer_hole, inner_hole])));
    }

    #[test]
    fn overlapping_members_are_invalid_and_merge_on_repair() {
        let shifted = ring(&[(1.0, 1.0), (1.0, 3.0), (3.0, 3.0), (3.0, 1.0), (1.0, 1.0)]);
        let overlapping = Geometry::MultiPolygon(vec![vec![square()], vec![shifted]]);
        assert!(!is_valid(&overlapping));

        let repaired = repair(&overlapping).unwrap();
        assert!(is_valid(&repaired));
        assert!(matches!(repaired, Geometry::Polygon(_)));
        assert!((area(&repaired) - 7.0).abs() < 1e-9);
    }

    #[test]
    fn members_may_touch_at_a_point_but_not_share_an_edge() {
        let corner = ring(&[(2.0, 2.0), (2.0, 3.0), (3.0, 3.0), (3.0, 2.0), (2.0, 2.0)]);
        assert!(is_valid(&Geometry::MultiPolygon(vec![vec![square()], vec![corner]])));

        let neighbour = ring(&[(2.0, 0.0), (2.0, 2.0), (4.0, 2.0), (4.0, 0.0), (2.0, 0.0)]);
        let shared_edge = Geometry::MultiPolygon(vec![vec![square()], vec![neighbour]]);
        assert!(!is_valid(&shared_edge));
        assert!((area(&repair(&shared_edge).unwrap()) - 8.0).abs() < 1e-9);

        let island = ring(&[(3.0, 3.0), (3.0, 4.0), (4.0, 4.0), (4.0, 3.0), (3.0, 3.0)]);
        let lake = ring(&[(1.0, 1.0), (6.0, 1.0), (6.0, 6.0), (1.0, 6.0), (1.0, 1.0)]);
        let land = ring(&[(0.0, 0.0), (0.0, 7.0), (7.0, 7.0), (7.0, 0.0), (0.0, 0.0)]);
        assert!(is_valid(&Geometry::MultiPolygon(vec![vec![land, lake], vec![island]])));
    }

    #[test]
    fn bowtie_repairs_into_valid_triangles() {
        let repaired = repair(&bowtie()).unwrap();

        assert!(is_valid(&repaired));
        assert!(matches!(
            repaired,
            Geometry::Polygon(_) | Geometry::MultiPolygon(_)
        ));
        let area = area(&repaired);
        assert!((area - 2.0).abs() < 1e-9, "{area}");
    }

    #[test]
    fn lines_are_not_repaired() {
        let line = Geometry::LineString(ring(&[(1.0, 1.0), (1.0, 1.0)]));
        assert!(repair(&line).is_err());
    }

    #[test]
    fn degenerate_polygon_repairs_to_nothing() {
        let flat =
            Geometry::Polygon(vec![ring(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (0.0, 0.0)])]);
        assert!(repair(&flat).is_err());
    }
}
