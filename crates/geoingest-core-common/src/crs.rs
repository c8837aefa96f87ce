//! Coordinate reference system identifiers.
//!
//! Sources declare their CRS in many shapes: `EPSG:XXXX` strings, OGC URNs,
//! bare codes, or full WKT in a shapefile `.prj`. [`Crs`] normalizes all of
//! them to an EPSG code when one can be recognized, and keeps the original
//! text otherwise so the pipeline can report what it could not transform.

use std::fmt;

/// EPSG code of WGS 84 geographic coordinates.
pub const WGS84_EPSG: u32 = 4326;

/// A declared coordinate reference system.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Crs {
    /// A CRS identified by its EPSG code.
    Epsg(u32),
    /// A CRS that could not be mapped to an EPSG code.
    Named(String),
}

impl Crs {
    /// WGS 84 (`EPSG:4326`), the target CRS of the pipeline.
    #[must_use]
    pub const fn wgs84() -> Self {
        Crs::Epsg(WGS84_EPSG)
    }

    /// Returns the EPSG code when known.
    #[must_use]
    pub fn epsg(&self) -> Option<u32> {
        match self {
            Crs::Epsg(code) => Some(*code),
            Crs::Named(_) => None,
        }
    }

    /// Returns `true` for `EPSG:4326`.
    #[must_use]
    pub fn is_wgs84(&self) -> bool {
        self.epsg() == Some(WGS84_EPSG)
    }

    /// Parses a CRS identifier.
    ///
    /// Accepts `EPSG:3857`, `epsg:3857`, `urn:ogc:def:crs:EPSG::3857`,
    /// `urn:ogc:def:crs:EPSG:6.6:3857`, `urn:ogc:def:crs:OGC:1.3:CRS84`,
    /// `CRS84` and bare numeric codes. Anything else is kept as
    /// [`Crs::Named`].
    ///
    /// # Examples
    ///
    /// ```
    /// use geoingest_core_common::Crs;
    ///
    /// assert_eq!(Crs::parse("urn:ogc:def:crs:EPSG::32633"), Crs::Epsg(32633));
    /// assert!(Crs::parse("urn:ogc:def:crs:OGC:1.3:CRS84").is_wgs84());
    /// ```
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        let upper = trimmed.to_ascii_uppercase();

        if upper.ends_with("CRS84") {
            return Crs::wgs84();
        }
        if let Some(code) = upper
            .strip_prefix("EPSG:")
            .and_then(|rest| rest.trim().parse().ok())
        {
            return Crs::Epsg(code);
        }
        if upper.starts_with("URN:OGC:DEF:CRS:EPSG:") {
            if let Some(code) = upper.rsplit(':').next().and_then(|c| c.parse().ok()) {
                return Crs::Epsg(code);
            }
        }
        if let Ok(code) = trimmed.parse() {
            return Crs::Epsg(code);
        }
        Crs::Named(trimmed.to_string())
    }

    /// Interprets a WKT definition, as found in a shapefile `.prj`.
    ///
    /// The outermost `AUTHORITY["EPSG", "code"]` (WKT1) or `ID["EPSG", code]`
    /// (WKT2) wins. Without one, ESRI-style names for WGS 84, Web Mercator and
    /// the WGS 84 / NAD83 / ETRS89 UTM zones are recognized.
    #[must_use]
    pub fn from_wkt(wkt: &str) -> Self {
        let wkt = wkt.trim();
        if let Some(code) = outer_authority_code(wkt) {
            return Crs::Epsg(code);
        }
        if let Some(code) = code_from_wkt_name(wkt) {
            return Crs::Epsg(code);
        }
        Crs::Named(wkt.to_string())
    }
}

impl Default for Crs {
    fn default() -> Self {
        Crs::wgs84()
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Crs::Epsg(code) => write!(f, "EPSG:{code}"),
            Crs::Named(name) => f.write_str(name),
        }
    }
}

/// Finds an authority clause that sits directly inside the root WKT node.
fn outer_authority_code(wkt: &str) -> Option<u32> {
    let bytes = wkt.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;

    for (index, &byte) in bytes.iter().enumerate() {
        match byte {
            b'"' => in_string = !in_string,
            b'[' | b'(' if !in_string => depth += 1,
            b']' | b')' if !in_string => depth = depth.saturating_sub(1),
            b if !in_string && depth == 1 && b.is_ascii_alphabetic() => {
                let rest = &wkt[index..];
                let upper = rest.get(..10).unwrap_or(rest).to_ascii_uppercase();
                let args_start = if upper.starts_with("AUTHORITY[") {
                    Some(10)
                } else if upper.starts_with("ID[") {
                    Some(3)
                } else {
                    None
                };
                if let Some(start) = args_start {
                    let preceded_by_separator = index == 0
                        || matches!(bytes[index - 1], b',' | b' ' | b'\t' | b'\n' | b'\r');
                    if preceded_by_separator {
                        if let Some(code) = parse_authority_args(&rest[start..]) {
                            return Some(code);
                        }
                    }
                }
            },
            _ => {},
        }
    }
    None
}

fn parse_authority_args(args: &str) -> Option<u32> {
    let end = args.find(']')?;
    let mut parts = args[..end].split(',').map(|p| p.trim().trim_matches('"'));
    let authority = parts.next()?;
    if !authority.eq_ignore_ascii_case("EPSG") {
        return None;
    }
    parts.next()?.parse().ok()
}

fn code_from_wkt_name(wkt: &str) -> Option<u32> {
    let name = root_name(wkt)?.to_ascii_uppercase().replace(' ', "_");
    let is_projected = wkt.trim_start().to_ascii_uppercase().starts_with("PROJCS")
        || wkt.trim_start().to_ascii_uppercase().starts_with("PROJCRS");

    if !is_projected {
        return match name.as_str() {
            "GCS_WGS_1984" | "WGS_84" | "WGS_1984" | "WGS84" => Some(WGS84_EPSG),
            "GCS_NORTH_AMERICAN_1983" | "NAD83" => Some(4269),
            "GCS_ETRS_1989" | "ETRS89" => Some(4258),
            _ => None,
        };
    }

    if name.contains("WEB_MERCATOR") || name.contains("PSEUDO-MERCATOR") {
        return Some(3857);
    }
    if name == "WGS_84_/_WORLD_MERCATOR" || name == "WORLD_MERCATOR" {
        return Some(3395);
    }

    let zone_start = name.find("UTM_ZONE_")? + "UTM_ZONE_".len();
    let zone_text = &name[zone_start..];
    let digits: String = zone_text.chars().take_while(char::is_ascii_digit).collect();
    let zone: u32 = digits.parse().ok()?;
    let north = !zone_text[digits.len()..].starts_with('S');

    if name.contains("NAD_1983") || name.contains("NAD83") {
        (north && (1..=23).contains(&zone)).then_some(26900 + zone)
    } else if name.contains("ETRS_1989") || name.contains("ETRS89") {
        (north && (28..=38).contains(&zone)).then_some(25800 + zone)
    } else if name.contains("WGS_1984") || name.contains("WGS_84") {
        if !(1..=60).contains(&zone) {
            return None;
        }
        Some(if north { 32600 + zone } else { 32700 + zone })
    } else {
        None
    }
}

fn root_name(wkt: &str) -> Option<&str> {
    let open = wkt.find(['[', '('])?;
    let rest = &wkt[open + 1..];
    let start = rest.find('"')? + 1;
    let len = rest[start..].find('"')?;
    Some(&rest[start..start + len])
}
