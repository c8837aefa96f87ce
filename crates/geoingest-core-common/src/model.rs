//! Raw dataset model produced by the format readers.
//!
//! A [`RawDataset`] is the ephemeral, per-call representation of whatever a
//! reader pulled out of an upload: an ordered list of records, each holding an
//! optional geometry and an ordered attribute map, plus the declared CRS (if
//! any). Attribute values are kept exactly as loaded, including `NaN`,
//! infinities and binary payloads; sanitation happens later in the pipeline.

use std::collections::HashSet;
use std::fmt;

use indexmap::IndexMap;
use serde_json::Value as JsonValue;

use crate::crs::Crs;

/// Geometry as loaded from a source format.
///
/// This is the `GeoJSON` tagged union (`Point`, `LineString`, `Polygon`,
/// `MultiPoint`, `MultiLineString`, `MultiPolygon`, `GeometryCollection`).
/// Positions may carry more than two ordinates until the standardizer strips
/// them; for polygons the first ring is the exterior and the remaining rings
/// are holes.
pub type Geometry = geojson::Value;

/// Ordered attribute map of a single record.
pub type Properties = IndexMap<String, AttributeValue>;

/// A raw attribute scalar as read from the source.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// Missing value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Integer(i64),
    /// Floating point value, possibly `NaN` or infinite.
    Float(f64),
    /// Text value.
    Text(String),
    /// Nested JSON (arrays and objects from `GeoJSON` properties).
    Json(JsonValue),
    /// Opaque binary payload (e.g. a `GeoPackage` BLOB column).
    Binary(Vec<u8>),
}

impl AttributeValue {
    /// Returns `true` for values that count as missing: `Null` and `NaN`.
    #[must_use]
    pub fn is_missing(&self) -> bool {
        match self {
            AttributeValue::Null => true,
            AttributeValue::Float(value) => value.is_nan(),
            _ => false,
        }
    }

    /// Returns the numeric value for integer and float attributes.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Integer(value) => Some(*value as f64),
            AttributeValue::Float(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the kind of this single value; `None` for missing values.
    #[must_use]
    pub fn kind(&self) -> Option<FieldKind> {
        if self.is_missing() {
            return None;
        }
        Some(match self {
            AttributeValue::Bool(_) => FieldKind::Boolean,
            AttributeValue::Integer(_) => FieldKind::Integer,
            AttributeValue::Float(_) => FieldKind::Float,
            AttributeValue::Text(_) => FieldKind::Text,
            AttributeValue::Json(_) => FieldKind::Json,
            AttributeValue::Binary(_) => FieldKind::Binary,
            AttributeValue::Null => return None,
        })
    }

    /// Converts a `GeoJSON` property value into an attribute.
    #[must_use]
    pub fn from_json(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => AttributeValue::Null,
            JsonValue::Bool(value) => AttributeValue::Bool(value),
            JsonValue::Number(number) => match number.as_i64() {
                Some(value) => AttributeValue::Integer(value),
                None => AttributeValue::Float(number.as_f64().unwrap_or(f64::NAN)),
            },
            JsonValue::String(value) => AttributeValue::Text(value),
            other @ (JsonValue::Array(_) | JsonValue::Object(_)) => AttributeValue::Json(other),
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Null => f.write_str("null"),
            AttributeValue::Bool(value) => write!(f, "{value}"),
            AttributeValue::Integer(value) => write!(f, "{value}"),
            AttributeValue::Float(value) => write!(f, "{value}"),
            AttributeValue::Text(value) => f.write_str(value),
            AttributeValue::Json(value) => write!(f, "{value}"),
            AttributeValue::Binary(bytes) => write!(f, "<{} bytes>", bytes.len()),
        }
    }
}

/// Inferred type of an attribute column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Every present value is an integer.
    Integer,
    /// Present values are numeric and at least one is fractional.
    Float,
    /// Every present value is a boolean.
    Boolean,
    /// Every present value is text.
    Text,
    /// Every present value is nested JSON.
    Json,
    /// Every present value is binary.
    Binary,
    /// Present values have incompatible kinds.
    Mixed,
    /// No value is present.
    Empty,
}

impl FieldKind {
    /// Returns the string representation of this kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Integer => "integer",
            FieldKind::Float => "float",
            FieldKind::Boolean => "boolean",
            FieldKind::Text => "text",
            FieldKind::Json => "json",
            FieldKind::Binary => "binary",
            FieldKind::Mixed => "mixed",
            FieldKind::Empty => "empty",
        }
    }

    /// Returns `true` for integer and float columns.
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldKind::Integer | FieldKind::Float)
    }

    /// Returns `true` for columns whose values are handled as free text.
    #[must_use]
    pub fn is_textual(&self) -> bool {
        matches!(self, FieldKind::Text | FieldKind::Mixed)
    }

    /// Combines the kind seen so far with the kind of the next value.
    #[must_use]
    pub fn merge(self, next: FieldKind) -> FieldKind {
        match (self, next) {
            (FieldKind::Empty, other) | (other, FieldKind::Empty) => other,
            (a, b) if a == b => a,
            (FieldKind::Integer, FieldKind::Float) | (FieldKind::Float, FieldKind::Integer) => {
                FieldKind::Float
            },
            _ => FieldKind::Mixed,
        }
    }

    /// Infers the kind of a column from its values.
    pub fn infer<'a>(values: impl IntoIterator<Item = &'a AttributeValue>) -> FieldKind {
        values
            .into_iter()
            .filter_map(AttributeValue::kind)
            .fold(FieldKind::Empty, FieldKind::merge)
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name and inferred kind of one attribute column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSchema {
    /// Column name
    pub name: String,
    /// Kind inferred from the loaded values
    pub kind: FieldKind,
}

/// One loaded record.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    /// Geometry, `None` when the source record has none or it could not be decoded.
    pub geometry: Option<Geometry>,
    /// Attributes in source column order.
    pub properties: Properties,
}

impl RawRecord {
    /// Creates a record from a geometry and its attributes.
    #[must_use]
    pub fn new(geometry: Option<Geometry>, properties: Properties) -> Self {
        Self {
            geometry,
            properties,
        }
    }
}

/// Gives repeated column names distinct `<name>_<n>` suffixes.
///
/// The first occurrence keeps its name and suffixes skip names already
/// present in the header, so `[a, a, a_2]` becomes `[a, a_3, a_2]`.
#[must_use]
pub fn unique_column_names(names: Vec<String>) -> Vec<String> {
    let mut taken: HashSet<String> = names.iter().cloned().collect();
    let mut emitted: HashSet<String> = HashSet::with_capacity(names.len());
    let mut unique = Vec::with_capacity(names.len());
    for name in names {
        if emitted.insert(name.clone()) {
            unique.push(name);
            continue;
        }
        let renamed = (2..)
            .map(|n| format!("{name}_{n}"))
            .find(|candidate| !taken.contains(candidate))
            .unwrap_or_else(|| name.clone());
        log::warn!("Column '{name}' appears more than once; renaming the repeat to '{renamed}'");
        taken.insert(renamed.clone());
        emitted.insert(renamed.clone());
        unique.push(renamed);
    }
    unique
}

/// Ordered records loaded from one source layer.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDataset {
    /// CRS declared by the source, `None` when the source declares nothing.
    pub crs: Option<Crs>,
    /// Column schema in source order.
    pub fields: Vec<FieldSchema>,
    /// Records in source order; every record holds every field.
    pub records: Vec<RawRecord>,
}

impl RawDataset {
    /// Builds a dataset whose columns are discovered from the records in
    /// first-appearance order.
    #[must_use]
    pub fn new(crs: Option<Crs>, records: Vec<RawRecord>) -> Self {
        let mut names: Vec<String> = Vec::new();
        for record in &records {
            for key in record.properties.keys() {
                if !names.iter().any(|name| name == key) {
                    names.push(key.clone());
                }
            }
        }
        Self::with_columns(crs, names, records)
    }

    /// Builds a dataset with an explicit column order.
    ///
    /// Missing attributes are filled with [`AttributeValue::Null`] and every
    /// record's attributes are reordered to match `columns`; attributes not
    /// named in `columns` are appended after them. A name listed twice in
    /// `columns` is kept once with a warning; readers that can see repeated
    /// headers rename them first with [`unique_column_names`].
    #[must_use]
    pub fn with_columns(crs: Option<Crs>, columns: Vec<String>, records: Vec<RawRecord>) -> Self {
        let mut names: Vec<String> = Vec::with_capacity(columns.len());
        for name in columns {
            if names.contains(&name) {
                log::warn!("Column '{name}' is listed more than once; keeping one");
            } else {
                names.push(name);
            }
        }
        for record in &records {
            for key in record.properties.keys() {
                if !names.iter().any(|name| name == key) {
                    names.push(key.clone());
                }
            }
        }

        let records: Vec<RawRecord> = records
            .into_iter()
            .map(|mut record| {
                let properties = names
                    .iter()
                    .map(|name| {
                        let value = record
                            .properties
                            .swap_remove(name)
                            .unwrap_or(AttributeValue::Null);
                        (name.clone(), value)
                    })
                    .collect();
                RawRecord::new(record.geometry, properties)
            })
            .collect();

        let fields = names
            .into_iter()
            .map(|name| {
                let kind = FieldKind::infer(records.iter().filter_map(|r| r.properties.get(&name)));
                FieldSchema { name, kind }
            })
            .collect();

        Self {
            crs,
            fields,
            records,
        }
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` when the dataset has no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Looks up a column by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|field| field.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn props(pairs: &[(&str, AttributeValue)]) -> Properties {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn nan_counts_as_missing_but_infinity_does_not() {
        assert!(AttributeValue::Float(f64::NAN).is_missing());
        assert!(AttributeValue::Null.is_missing());
        assert!(!AttributeValue::Float(f64::INFINITY).is_missing());
        assert!(!AttributeValue::Text(String::new()).is_missing());
    }

    #[test]
    fn kinds_merge_numeric_and_fall_back_to_mixed() {
        assert_eq!(FieldKind::Integer.merge(FieldKind::Float), FieldKind::Float);
        assert_eq!(FieldKind::Empty.merge(FieldKind::Text), FieldKind::Text);
        assert_eq!(FieldKind::Text.merge(FieldKind::Integer), FieldKind::Mixed);
        assert_eq!(FieldKind::infer([&AttributeValue::Null]), FieldKind::Empty);
    }

    #[test]
    fn json_numbers_keep_integer_precision() {
        assert_eq!(
            AttributeValue::from_json(json!(42)),
            AttributeValue::Integer(42)
        );
        assert_eq!(
            AttributeValue::from_json(json!(1.5)),
            AttributeValue::Float(1.5)
        );
        assert!(matches!(
            AttributeValue::from_json(json!([1, 2])),
            AttributeValue::Json(_)
        ));
    }

    #[test]
    fn repeated_column_names_get_suffixes() {
        let names = ["a", "b", "a", "a_2", "a"].map(String::from).to_vec();

        assert_eq!(unique_column_names(names), ["a", "b", "a_3", "a_2", "a_4"]);
        assert_eq!(unique_column_names(vec!["x".into()]), ["x"]);
    }

    #[test]
    fn explicit_columns_listed_twice_are_kept_once() {
        let records = vec![RawRecord::new(
            None,
            props(&[("a", AttributeValue::Integer(1))]),
        )];

        let dataset = RawDataset::with_columns(None, vec!["a".into(), "a".into()], records);

        assert_eq!(dataset.fields.len(), 1);
        assert_eq!(dataset.records[0].properties.len(), 1);
    }

    #[test]
    fn dataset_fills_missing_columns_in_first_appearance_order() {
        let records = vec![
            RawRecord::new(None, props(&[("a", AttributeValue::Integer(1))])),
            RawRecord::new(
                None,
                props(&[
                    ("b", AttributeValue::Text("x".into())),
                    ("a", AttributeValue::Float(2.5)),
                ]),
            ),
        ];

        let dataset = RawDataset::new(None, records);

        let names: Vec<_> = dataset.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
        assert_eq!(dataset.field("a").map(|f| f.kind), Some(FieldKind::Float));
        assert_eq!(
            dataset.records[0].properties.get("b"),
            Some(&AttributeValue::Null)
        );
        let keys: Vec<_> = dataset.records[1].properties.keys().cloned().collect();
        assert_eq!(keys, ["a", "b"]);
    }
}
