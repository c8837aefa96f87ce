//! Coordinate reference system normalization.
//!
//! Only a fixed set of projections is supported, all on the WGS 84
//! ellipsoid. NAD83 and ETRS89 are treated as coincident with WGS 84.

use std::f64::consts::FRAC_PI_2;

use geoingest_core_common::{Crs, Geometry, RawDataset};
use tracing::{info, warn};

use super::for_each_position;
use crate::error::PipelineError;

/// WGS 84 semi-major axis in metres.
const A: f64 = 6_378_137.0;
/// WGS 84 flattening.
const F: f64 = 1.0 / 298.257_223_563;
/// EPSG code of EASE-Grid 2.0 global, the planar CRS used for centroids.
pub const EQUAL_AREA_EPSG: u32 = 6933;

const UTM_SCALE: f64 = 0.9996;
const UTM_FALSE_EASTING: f64 = 500_000.0;
const UTM_FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;
/// Standard parallel of EASE-Grid 2.0.
const EASE_STANDARD_PARALLEL: f64 = 30.0;

fn eccentricity_squared() -> f64 {
    F * (2.0 - F)
}

/// A supported coordinate system.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// Longitude/latitude in degrees.
    Geographic,
    /// Spherical (pseudo) Mercator.
    WebMercator,
    /// Ellipsoidal Mercator.
    WorldMercator,
    /// Universal Transverse Mercator.
    Utm {
        /// Zone number, 1 to 60
        zone: u8,
        /// Southern hemisphere false northing
        south: bool,
    },
    /// Lambert cylindrical equal-area, standard parallel 30°.
    EqualArea,
}

impl Projection {
    /// Resolves a declared CRS; `None` when no transform is known.
    #[must_use]
    pub fn from_crs(crs: &Crs) -> Option<Self> {
        let code = crs.epsg()?;
        let utm = |zone: u32, south: bool| {
            u8::try_from(zone).ok().map(|zone| Projection::Utm { zone, south })
        };
        match code {
            4326 | 4269 | 4258 => Some(Projection::Geographic),
            3857 | 900_913 | 102_100 => Some(Projection::WebMercator),
            3395 => Some(Projection::WorldMercator),
            EQUAL_AREA_EPSG => Some(Projection::EqualArea),
            32601..=32660 => utm(code - 32600, false),
            32701..=32760 => utm(code - 32700, true),
            26901..=26923 => utm(code - 26900, false),
            25828..=25838 => utm(code - 25800, false),
            _ => None,
        }
    }

    /// Converts projected coordinates to longitude/latitude degrees.
    #[must_use]
    pub fn to_geographic(self, x: f64, y: f64) -> (f64, f64) {
        match self {
            Projection::Geographic => (x, y),
            Projection::WebMercator => (
                (x / A).to_degrees(),
                (2.0 * (y / A).exp().atan() - FRAC_PI_2).to_degrees(),
            ),
            Projection::WorldMercator => (
                (x / A).to_degrees(),
                mercator_latitude((-y / A).exp()).to_degrees(),
            ),
            Projection::Utm { zone, south } => utm_inverse(x, y, zone, south),
            Projection::EqualArea => equal_area_inverse(x, y),
        }
    }

    /// Converts longitude/latitude degrees to projected coordinates.
    ///
    /// Only the geographic and equal-area systems project forward; other
    /// systems return the input unchanged.
    #[must_use]
    pub fn from_geographic(self, lon: f64, lat: f64) -> (f64, f64) {
        match self {
            Projection::EqualArea => equal_area_forward(lon, lat),
            _ => (lon, lat),
        }
    }
}

/// Brings a dataset to WGS 84.
///
/// A dataset without a declared CRS is assumed to be WGS 84 already.
/// Coordinates beyond the second ordinate are left untouched.
///
/// # Errors
///
/// Returns [`PipelineError::UnsupportedCrs`] if the declared CRS has no
/// known transform. The dataset is left unmodified in that case.
pub fn normalize_crs(dataset: &mut RawDataset) -> Result<Crs, PipelineError> {
    let Some(declared) = dataset.crs.clone() else {
        warn!("No CRS declared, assuming {}", Crs::wgs84());
        dataset.crs = Some(Crs::wgs84());
        return Ok(Crs::wgs84());
    };

    let projection = Projection::from_crs(&declared).ok_or_else(|| PipelineError::UnsupportedCrs {
        crs: declared.to_string(),
    })?;

    if projection != Projection::Geographic {
        info!("Converting CRS from {declared} to {}", Crs::wgs84());
        for record in &mut dataset.records {
            if let Some(geometry) = record.geometry.as_mut() {
                reproject(geometry, projection);
            }
        }
    }
    dataset.crs = Some(Crs::wgs84());
    Ok(Crs::wgs84())
}

/// Transforms every position of `geometry` from `projection` to WGS 84.
pub fn reproject(geometry: &mut Geometry, projection: Projection) {
    for_each_position(geometry, &mut |position| {
        if let [x, y, ..] = position.as_mut_slice() {
            let (lon, lat) = projection.to_geographic(*x, *y);
            *x = lon;
            *y = lat;
        }
    });
}

/// Projects WGS 84 degrees to EASE-Grid 2.0 metres.
#[must_use]
pub fn to_equal_area(lon: f64, lat: f64) -> (f64, f64) {
    Projection::EqualArea.from_geographic(lon, lat)
}

/// Inverts the isometric latitude `t = exp(-y / a)` of the ellipsoidal
/// Mercator by fixed-point iteration.
fn mercator_latitude(t: f64) -> f64 {
    let e = eccentricity_squared().sqrt();
    let mut phi = FRAC_PI_2 - 2.0 * t.atan();
    for _ in 0..15 {
        let sin = e * phi.sin();
        let next = FRAC_PI_2 - 2.0 * (t * ((1.0 - sin) / (1.0 + sin)).powf(e / 2.0)).atan();
        if (next - phi).abs() < 1e-12 {
            return next;
        }
        phi = next;
    }
    phi
}

fn utm_inverse(easting: f64, northing: f64, zone: u8, south: bool) -> (f64, f64) {
    let e2 = eccentricity_squared();
    let ep2 = e2 / (1.0 - e2);
    let x = easting - UTM_FALSE_EASTING;
    let y = if south {
        northing - UTM_FALSE_NORTHING_SOUTH
    } else {
        northing
    };
    let central_meridian = (f64::from(zone) - 1.0).mul_add(6.0, -180.0) + 3.0;

    let m = y / UTM_SCALE;
    let mu = m / (A * (1.0 - e2 / 4.0 - 3.0 * e2.powi(2) / 64.0 - 5.0 * e2.powi(3) / 256.0));
    let root = (1.0 - e2).sqrt();
    let e1 = (1.0 - root) / (1.0 + root);
    let phi1 = mu
        + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
        + (21.0 * e1.powi(2) / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
        + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
        + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

    let (sin1, cos1) = phi1.sin_cos();
    let tan1 = phi1.tan();
    let c1 = ep2 * cos1.powi(2);
    let t1 = tan1.powi(2);
    let w = 1.0 - e2 * sin1.powi(2);
    let n1 = A / w.sqrt();
    let r1 = A * (1.0 - e2) / w.powf(1.5);
    let d = x / (n1 * UTM_SCALE);

    let lat = phi1
        - (n1 * tan1 / r1)
            * (d.powi(2) / 2.0
                - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1.powi(2) - 9.0 * ep2) * d.powi(4) / 24.0
                + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1.powi(2)
                    - 252.0 * ep2
                    - 3.0 * c1.powi(2))
                    * d.powi(6)
                    / 720.0);
    let lon = (d - (1.0 + 2.0 * t1 + c1) * d.powi(3) / 6.0
        + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1.powi(2) + 8.0 * ep2 + 24.0 * t1.powi(2))
            * d.powi(5)
            / 120.0)
        / cos1;

    (central_meridian + lon.to_degrees(), lat.to_degrees())
}

/// Authalic latitude function `q` of the ellipsoid.
fn authalic_q(phi: f64) -> f64 {
    let e2 = eccentricity_squared();
    let e = e2.sqrt();
    let sin = phi.sin();
    (1.0 - e2)
        * (sin / (1.0 - e2 * sin.powi(2))
            - (1.0 / (2.0 * e)) * ((1.0 - e * sin) / (1.0 + e * sin)).ln())
}

fn equal_area_scale() -> f64 {
    let phi = EASE_STANDARD_PARALLEL.to_radians();
    phi.cos() / (1.0 - eccentricity_squared() * phi.sin().powi(2)).sqrt()
}

fn equal_area_forward(lon: f64, lat: f64) -> (f64, f64) {
    let k0 = equal_area_scale();
    let x = A * k0 * lon.to_radians();
    let y = A * authalic_q(lat.to_radians()) / (2.0 * k0);
    (x, y)
}

fn equal_area_inverse(x: f64, y: f64) -> (f64, f64) {
    let e2 = eccentricity_squared();
    let k0 = equal_area_scale();
    let qp = authalic_q(FRAC_PI_2);
    let beta = (2.0 * y * k0 / (A * qp)).clamp(-1.0, 1.0).asin();
    let phi = beta
        + (e2 / 3.0 + 31.0 * e2.powi(2) / 180.0 + 517.0 * e2.powi(3) / 5040.0) * (2.0 * beta).sin()
        + (23.0 * e2.powi(2) / 360.0 + 251.0 * e2.powi(3) / 3780.0) * (4.0 * beta).sin()
        + (761.0 * e2.powi(3) / 45360.0) * (6.0 * beta).sin();
    ((x / (A * k0)).to_degrees(), phi.to_degrees())
}

#[cfg(test)]
mod tests {
    use geoingest_core_common::{Properties, RawRecord};

    use super::*;

    const WEB_MERCATOR_MAX_Y: f64 = 20_037_508.342_789_244;

    fn assert_close(actual: (f64, f64), expected: (f64, f64), tolerance: f64) {
        assert!(
            (actual.0 - expected.0).abs() < tolerance && (actual.1 - expected.1).abs() < tolerance,
            "{actual:?} != {expected:?}"
        );
    }

    fn dataset(crs: Option<Crs>, position: Vec<f64>) -> RawDataset {
        RawDataset::new(
            crs,
            vec![RawRecord::new(Some(Geometry::Point(position)), Properties::new())],
        )
    }

    #[test]
    fn web_mercator_round_trips_known_points() {
        let projection = Projection::WebMercator;
        assert_close(projection.to_geographic(0.0, 0.0), (0.0, 0.0), 1e-9);
        assert_close(
            projection.to_geographic(WEB_MERCATOR_MAX_Y, WEB_MERCATOR_MAX_Y),
            (180.0, 85.051_128_779_806_6),
            1e-6,
        );
    }

    #[test]
    fn utm_zone_origin_maps_to_central_meridian() {
        let projection = Projection::from_crs(&Crs::Epsg(32633)).unwrap();
        assert_close(projection.to_geographic(500_000.0, 0.0), (15.0, 0.0), 1e-9);

        // EPSG:32633 (500000, 5538630.70) is 15°E 50°N.
        assert_close(
            projection.to_geographic(500_000.0, 5_538_630.70),
            (15.0, 50.0),
            1e-5,
        );

        let south = Projection::from_crs(&Crs::Epsg(32733)).unwrap();
        assert_close(
            south.to_geographic(500_000.0, 10_000_000.0 - 5_538_630.70),
            (15.0, -50.0),
            1e-5,
        );
    }

    #[test]
    fn world_mercator_inverts_ellipsoidal_northing() {
        // EPSG:3395 northing of 50°N.
        let (lon, lat) = Projection::WorldMercator.to_geographic(0.0, 6_413_524.59);
        assert!(lon.abs() < 1e-9);
        assert!((lat - 50.0).abs() < 1e-5, "{lat}");
    }

    #[test]
    fn equal_area_round_trips() {
        let (x, y) = to_equal_area(13.4, 52.5);
        assert_close(Projection::EqualArea.to_geographic(x, y), (13.4, 52.5), 1e-6);
        // EASE-Grid 2.0 spans ±17367530.45 m east-west.
        assert!((to_equal_area(180.0, 0.0).0 - 17_367_530.45).abs() < 1.0);
    }

    #[test]
    fn missing_crs_is_assumed_wgs84() {
        let mut data = dataset(None, vec![1.0, 2.0]);
        assert_eq!(normalize_crs(&mut data).unwrap(), Crs::wgs84());
        assert_eq!(data.records[0].geometry, Some(Geometry::Point(vec![1.0, 2.0])));
    }

    #[test]
    fn normalizing_wgs84_is_a_no_op() {
        let mut data = dataset(Some(Crs::wgs84()), vec![1.0, 2.0, 7.0]);
        let before = data.clone();
        normalize_crs(&mut data).unwrap();
        normalize_crs(&mut data).unwrap();
        assert_eq!(data, before);
    }

    #[test]
    fn projected_positions_keep_elevation() {
        let mut data = dataset(Some(Crs::Epsg(3857)), vec![0.0, 0.0, 12.0]);
        normalize_crs(&mut data).unwrap();
        assert_eq!(data.crs, Some(Crs::wgs84()));
        assert_eq!(data.records[0].geometry, Some(Geometry::Point(vec![0.0, 0.0, 12.0])));
    }

    #[test]
    fn unknown_crs_is_rejected_without_changes() {
        let mut data = dataset(Some(Crs::Epsg(2154)), vec![700_000.0, 6_600_000.0]);
        let err = normalize_crs(&mut data).unwrap_err();
        assert!(matches!(err, PipelineError::UnsupportedCrs { ref crs } if crs == "EPSG:2154"));
        assert_eq!(data.crs, Some(Crs::Epsg(2154)));
    }
}
