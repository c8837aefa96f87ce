//! Generated layer descriptions.

use geoingest_core_common::FieldSchema;
use indexmap::IndexSet;

use super::{column_values, distinct_count, value_text};
use crate::extract::ExtractedFeature;
use crate::types::{ClusterAssignment, SpatialExtent};

const KEY_ATTRIBUTE_LIMIT: usize = 3;
const KEY_VALUE_LIMIT: usize = 3;
const KEY_CARDINALITY_RATIO: f64 = 0.5;

/// Writes a short prose description of a layer.
///
/// The description states the feature count and geometry type, the extent,
/// the numeric and text attribute counts, up to three low-cardinality key
/// attributes with sample values, the overall completeness, and the cluster
/// count when clustering ran.
#[must_use]
pub fn describe(
    name: &str,
    columns: &[FieldSchema],
    features: &[ExtractedFeature],
    geometry_type: Option<&str>,
    extent: Option<&SpatialExtent>,
    clusters: Option<&ClusterAssignment>,
) -> String {
    let geometry = geometry_type.map_or_else(|| "geometry".to_string(), str::to_lowercase);
    let mut sentences = vec![format!(
        "{name} contains {} {geometry} features with {} attributes.",
        features.len(),
        columns.len()
    )];

    if let Some(extent) = extent {
        sentences.push(format!(
            "The data covers a spatial extent of ({:.2}, {:.2}) to ({:.2}, {:.2}).",
            extent.min_x, extent.min_y, extent.max_x, extent.max_y
        ));
    }

    let numeric = columns.iter().filter(|c| c.kind.is_numeric()).count();
    let textual = columns.iter().filter(|c| c.kind.is_textual()).count();
    match (numeric, textual) {
        (0, 0) => {},
        (numeric, 0) => sentences.push(format!("It includes {numeric} numeric fields.")),
        (0, textual) => sentences.push(format!("It includes {textual} text fields.")),
        (numeric, textual) => sentences.push(format!(
            "It includes {numeric} numeric fields and {textual} text fields."
        )),
    }

    let key_attributes = key_attributes(columns, features);
    if !key_attributes.is_empty() {
        sentences.push(format!("Key attributes include: {}.", key_attributes.join("; ")));
    }

    sentences.push(format!(
        "The dataset is approximately {:.1}% complete.",
        completeness(columns, features) * 100.0
    ));

    if let Some(clusters) = clusters {
        sentences.push(format!(
            "The data can be naturally grouped into {} clusters based on its attributes.",
            clusters.cluster_count
        ));
    }
    sentences.join(" ")
}

/// `column (e.g., a, b, c)` for the first low-cardinality attributes.
#[allow(clippy::cast_precision_loss)]
fn key_attributes(columns: &[FieldSchema], features: &[ExtractedFeature]) -> Vec<String> {
    let limit = features.len() as f64 * KEY_CARDINALITY_RATIO;
    columns
        .iter()
        .filter_map(|column| {
            let values = column_values(features, &column.name);
            let distinct = distinct_count(&values);
            if distinct == 0 || distinct as f64 >= limit {
                return None;
            }
            let examples: IndexSet<String> = values.into_iter().filter_map(value_text).collect();
            let examples: Vec<&str> = examples
                .iter()
                .take(KEY_VALUE_LIMIT)
                .map(String::as_str)
                .collect();
            Some(format!("{} (e.g., {})", column.name, examples.join(", ")))
        })
        .take(KEY_ATTRIBUTE_LIMIT)
        .collect()
}

/// One minus the mean missing share over all attributes.
#[allow(clippy::cast_precision_loss)]
fn completeness(columns: &[FieldSchema], features: &[ExtractedFeature]) -> f64 {
    if columns.is_empty() || features.is_empty() {
        return 1.0;
    }
    let missing_share: f64 = columns
        .iter()
        .map(|column| {
            let values = column_values(features, &column.name);
            values.iter().filter(|value| value.is_null()).count() as f64 / values.len() as f64
        })
        .sum();
    1.0 - missing_share / columns.len() as f64
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use geoingest_core_common::{FieldKind, Geometry};
    use serde_json::{Value as JsonValue, json};

    use super::*;

    fn schema(name: &str, kind: FieldKind) -> FieldSchema {
        FieldSchema {
            name: name.into(),
            kind,
        }
    }

    fn parks() -> (Vec<FieldSchema>, Vec<ExtractedFeature>) {
        let columns = vec![
            schema("area", FieldKind::Float),
            schema("type", FieldKind::Text),
        ];
        let features = (0..10)
            .map(|i| {
                let kind = ["park", "garden"][i % 2];
                let area = if i == 0 { JsonValue::Null } else { json!(i) };
                ExtractedFeature {
                    index: i,
                    geometry: Geometry::Point(vec![0.0, 0.0]),
                    properties: [("area".to_string(), area), ("type".to_string(), json!(kind))]
                        .into_iter()
                        .collect(),
                }
            })
            .collect();
        (columns, features)
    }

    #[test]
    fn description_mentions_every_section() {
        let (columns, features) = parks();
        let extent = SpatialExtent {
            min_x: -1.0,
            min_y: 2.0,
            max_x: 3.456,
            max_y: 4.0,
        };

        let text = describe("parks", &columns, &features, Some("POINT"), Some(&extent), None);

        assert_eq!(
            text,
            "parks contains 10 point features with 2 attributes. \
             The data covers a spatial extent of (-1.00, 2.00) to (3.46, 4.00). \
             It includes 1 numeric fields and 1 text fields. \
             Key attributes include: type (e.g., park, garden). \
             The dataset is approximately 95.0% complete."
        );
    }

    #[test]
    fn clusters_are_mentioned_when_present() {
        let (columns, features) = parks();
        let clusters = ClusterAssignment {
            label_per_record: vec![0; 10],
            cluster_count: 3,
            attributes_used: BTreeSet::new(),
        };

        let text = describe("parks", &columns, &features, None, None, Some(&clusters));

        assert!(text.starts_with("parks contains 10 geometry features"));
        assert!(text.ends_with("grouped into 3 clusters based on its attributes."));
    }

    #[test]
    fn layers_without_attributes_are_complete() {
        let text = describe("empty", &[], &[], Some("POLYGON"), None, None);
        assert_eq!(
            text,
            "empty contains 0 polygon features with 0 attributes. \
             The dataset is approximately 100.0% complete."
        );
    }
}
