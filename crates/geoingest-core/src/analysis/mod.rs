//! Metadata inference over extracted features.
//!
//! The [`MetadataAnalyzer`] fills in what the caller left out: a layer name
//! chosen from the most descriptive attribute, a generated description, the
//! spatial extent, per-attribute quality statistics and, for larger layers,
//! k-means cluster labels.
//!
//! # Examples
//!
//! ```
//! use geoingest_core::analysis::{AnalysisInput, MetadataAnalyzer};
//! use geoingest_core::extract::ExtractedFeature;
//! use geoingest_core::options::AnalyzerConfig;
//! use geoingest_core_common::Geometry;
//!
//! let features = vec![ExtractedFeature {
//!     index: 0,
//!     geometry: Geometry::Point(vec![2.35, 48.85]),
//!     properties: Default::default(),
//! }];
//! let analyzer = MetadataAnalyzer::new(AnalyzerConfig::default());
//! let metadata = analyzer.analyze(&AnalysisInput {
//!     layer_name: Some("paris"),
//!     geometry_type: Some("POINT"),
//!     ..AnalysisInput::new(&[], &features)
//! });
//!
//! assert_eq!(metadata.name, "paris");
//! assert!(metadata.description.unwrap().starts_with("paris contains 1 point features"));
//! ```

pub mod cluster;
pub mod description;
pub mod naming;
pub mod quality;
pub mod text;

use std::collections::HashSet;

use geo::BoundingRect;
use geoingest_core_common::FieldSchema;
use serde_json::Value as JsonValue;
use tracing::{debug, info};

use crate::extract::ExtractedFeature;
use crate::options::AnalyzerConfig;
use crate::standardize::to_geo;
use crate::types::{ClusterAssignment, QualityReport, SpatialExtent};

pub use cluster::cluster_features;
pub use description::describe;
pub use naming::{suggest_name, timestamp_name};
pub use quality::quality_report;
pub use text::{LexiconTextAnalyzer, TextAnalyzer};

static MISSING: JsonValue = JsonValue::Null;

/// What the analyzer looks at.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisInput<'a> {
    /// Attribute columns with their inferred kinds
    pub columns: &'a [FieldSchema],
    /// Extracted features
    pub features: &'a [ExtractedFeature],
    /// Classified geometry type of the layer
    pub geometry_type: Option<&'a str>,
    /// Caller-supplied layer name
    pub layer_name: Option<&'a str>,
    /// Caller-supplied description
    pub description: Option<&'a str>,
}

impl<'a> AnalysisInput<'a> {
    /// Input with no supplied metadata.
    #[must_use]
    pub fn new(columns: &'a [FieldSchema], features: &'a [ExtractedFeature]) -> Self {
        Self {
            columns,
            features,
            geometry_type: None,
            layer_name: None,
            description: None,
        }
    }
}

/// Inferred layer metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerMetadata {
    pub name: String,
    pub description: Option<String>,
    pub extent: Option<SpatialExtent>,
    pub quality_report: QualityReport,
    pub cluster_assignments: Option<ClusterAssignment>,
}

/// Infers names, descriptions and statistics for a layer.
#[derive(Debug, Clone, Default)]
pub struct MetadataAnalyzer<T: TextAnalyzer = LexiconTextAnalyzer> {
    config: AnalyzerConfig,
    text: T,
}

impl MetadataAnalyzer {
    /// Creates an analyzer backed by [`LexiconTextAnalyzer`].
    #[must_use]
    pub fn new(config: AnalyzerConfig) -> Self {
        Self {
            config,
            text: LexiconTextAnalyzer,
        }
    }
}

impl<T: TextAnalyzer> MetadataAnalyzer<T> {
    /// Swaps the text heuristics.
    #[must_use]
    pub fn with_text_analyzer<U: TextAnalyzer>(self, text: U) -> MetadataAnalyzer<U> {
        MetadataAnalyzer {
            config: self.config,
            text,
        }
    }

    /// Analyzer settings.
    #[must_use]
    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Runs every analysis step.
    ///
    /// Supplied names and descriptions are kept as they are. Clustering runs
    /// before the description is generated so the description can mention
    /// it.
    pub fn analyze(&self, input: &AnalysisInput<'_>) -> LayerMetadata {
        let config = &self.config;
        let features = input.features;

        let name = match input.layer_name {
            Some(name) => name.to_string(),
            None if config.infer_name => suggest_name(
                &self.text,
                input.columns,
                features,
                config.name_sample_size,
                config.max_name_length,
            ),
            None => timestamp_name(),
        };

        let extent = spatial_extent(features);
        let quality_report = quality_report(&self.text, input.columns, features, config);
        let cluster_assignments = cluster_features(input.columns, features, config);
        if let Some(clusters) = &cluster_assignments {
            info!(
                "Grouped {} features into {} clusters",
                features.len(),
                clusters.cluster_count
            );
        }

        let description = match input.description {
            Some(description) => Some(description.to_string()),
            None if config.infer_description => Some(describe(
                &name,
                input.columns,
                features,
                input.geometry_type,
                extent.as_ref(),
                cluster_assignments.as_ref(),
            )),
            None => None,
        };
        debug!("Analyzed layer '{name}' with {} attributes", input.columns.len());

        LayerMetadata {
            name,
            description,
            extent,
            quality_report,
            cluster_assignments,
        }
    }
}

/// Bounding box over every feature geometry; `None` without features.
#[must_use]
pub fn spatial_extent(features: &[ExtractedFeature]) -> Option<SpatialExtent> {
    features
        .iter()
        .filter_map(|feature| to_geo(&feature.geometry)?.bounding_rect())
        .fold(None, |extent: Option<SpatialExtent>, rect| {
            let (min, max) = (rect.min(), rect.max());
            Some(match extent {
                None => SpatialExtent {
                    min_x: min.x,
                    min_y: min.y,
                    max_x: max.x,
                    max_y: max.y,
                },
                Some(extent) => SpatialExtent {
                    min_x: extent.min_x.min(min.x),
                    min_y: extent.min_y.min(min.y),
                    max_x: extent.max_x.max(max.x),
                    max_y: extent.max_y.max(max.y),
                },
            })
        })
}

/// Values of one attribute across features; absent keys read as `null`.
pub(crate) fn column_values<'a>(
    features: &'a [ExtractedFeature],
    column: &str,
) -> Vec<&'a JsonValue> {
    features
        .iter()
        .map(|feature| feature.properties.get(column).unwrap_or(&MISSING))
        .collect()
}

/// Text form of a present value; strings are not quoted.
pub(crate) fn value_text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::Null => None,
        JsonValue::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

/// Distinct present values.
pub(crate) fn distinct_count(values: &[&JsonValue]) -> usize {
    values
        .iter()
        .filter(|value| !value.is_null())
        .map(ToString::to_string)
        .collect::<HashSet<_>>()
        .len()
}

#[cfg(test)]
mod tests {
    use geoingest_core_common::{FieldKind, Geometry};
    use serde_json::json;

    use super::*;

    fn feature(index: usize, geometry: Geometry, kind: &str) -> ExtractedFeature {
        ExtractedFeature {
            index,
            geometry,
            properties: [("kind".to_string(), json!(kind))].into_iter().collect(),
        }
    }

    fn columns() -> Vec<FieldSchema> {
        vec![FieldSchema {
            name: "kind".into(),
            kind: FieldKind::Text,
        }]
    }

    #[test]
    fn extent_covers_all_geometries() {
        let features = vec![
            feature(0, Geometry::Point(vec![-1.0, 5.0]), "a"),
            feature(
                1,
                Geometry::LineString(vec![vec![2.0, 0.0], vec![3.0, 1.0]]),
                "b",
            ),
        ];

        let extent = spatial_extent(&features).unwrap();

        assert_eq!(
            extent,
            SpatialExtent {
                min_x: -1.0,
                min_y: 0.0,
                max_x: 3.0,
                max_y: 5.0,
            }
        );
        assert_eq!(spatial_extent(&[]), None);
    }

    #[test]
    fn supplied_metadata_wins() {
        let features = vec![feature(0, Geometry::Point(vec![0.0, 0.0]), "park")];
        let columns = columns();
        let analyzer = MetadataAnalyzer::new(AnalyzerConfig::default());

        let metadata = analyzer.analyze(&AnalysisInput {
            layer_name: Some("mine"),
            description: Some("Hand written."),
            ..AnalysisInput::new(&columns, &features)
        });

        assert_eq!(metadata.name, "mine");
        assert_eq!(metadata.description.as_deref(), Some("Hand written."));
        assert!(metadata.cluster_assignments.is_none());
        assert_eq!(metadata.quality_report["kind"].completeness_ratio, 1.0);
    }

    #[test]
    fn disabled_inference_still_names_the_layer() {
        let features = vec![feature(0, Geometry::Point(vec![0.0, 0.0]), "park")];
        let columns = columns();
        let config = AnalyzerConfig {
            infer_name: false,
            infer_description: false,
            ..AnalyzerConfig::default()
        };

        let metadata =
            MetadataAnalyzer::new(config).analyze(&AnalysisInput::new(&columns, &features));

        assert!(metadata.name.starts_with("layer_"));
        assert_eq!(metadata.description, None);
    }

    #[test]
    fn missing_keys_read_as_null() {
        let features = vec![
            feature(0, Geometry::Point(vec![0.0, 0.0]), "a"),
            ExtractedFeature {
                index: 1,
                geometry: Geometry::Point(vec![0.0, 0.0]),
                properties: Default::default(),
            },
        ];

        let values = column_values(&features, "kind");

        assert_eq!(values, [&json!("a"), &JsonValue::Null]);
        assert_eq!(distinct_count(&values), 1);
        assert_eq!(value_text(&json!(3)), Some("3".to_string()));
    }
}
