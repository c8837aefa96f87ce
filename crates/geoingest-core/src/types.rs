//! Data types produced by the processing pipeline.
//!
//! [`ProcessingResult`] is the only value that crosses into the persistence
//! and response layers. It serializes to JSON; the extracted features travel
//! alongside it for [`persist`](crate::operations::persist) but are not part
//! of the serialized form.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::{ErrorKind, GeoIngestError};
use crate::extract::{ExtractedFeature, SkipReason};

/// Outcome of one processor invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProcessingResult {
    /// Whether the layer is ready to persist
    pub success: bool,
    /// Supplied or inferred layer name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layer_name: Option<String>,
    /// Supplied or generated description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Uppercased geometry type, `GEOMETRY` when mixed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geometry_type: Option<String>,
    /// Records that survived extraction
    pub feature_count: usize,
    /// Records present in the source
    pub total_record_count: usize,
    /// CRS of the stored geometries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crs: Option<String>,
    /// Bounding box of the extracted features
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extent: Option<SpatialExtent>,
    /// Per-attribute statistics
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_report: Option<QualityReport>,
    /// Cluster labels, when clustering ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_assignments: Option<ClusterAssignment>,
    /// Failure message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Failure classification
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    /// How the caller can fix the failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recovery_suggestion: Option<String>,
    /// Layers to choose from after a layer selection failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_layers: Option<Vec<String>>,
    /// Records dropped during extraction
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped_records: Vec<SkippedRecord>,
    /// Layer this result was read from, for multi-layer containers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_layer: Option<String>,
    /// Sub-results of a process-all run
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub layer_results: Vec<ProcessingResult>,
    /// Extracted features, in source order
    #[serde(skip)]
    pub features: Vec<ExtractedFeature>,
}

impl ProcessingResult {
    /// Builds the result of a failed call.
    #[must_use]
    pub fn failure(err: &GeoIngestError) -> Self {
        Self {
            success: false,
            error: Some(err.to_string()),
            error_kind: Some(err.kind()),
            recovery_suggestion: err.recovery_suggestion(),
            available_layers: err.available_layers().map(<[String]>::to_vec),
            ..Self::default()
        }
    }

    /// Builds the aggregate of a process-all run.
    ///
    /// The aggregate succeeds when at least one layer succeeded; its counts
    /// are sums over the successful layers.
    #[must_use]
    pub fn aggregate(layer_results: Vec<ProcessingResult>) -> Self {
        let succeeded: Vec<&ProcessingResult> =
            layer_results.iter().filter(|result| result.success).collect();
        let success = !succeeded.is_empty();
        let feature_count = succeeded.iter().map(|result| result.feature_count).sum();
        let total_record_count = layer_results
            .iter()
            .map(|result| result.total_record_count)
            .sum();

        let error =
            (!success).then(|| format!("All {} layer(s) failed to process", layer_results.len()));
        let description = Some(format!(
            "Processed {} of {} layer(s).",
            succeeded.len(),
            layer_results.len()
        ));

        Self {
            success,
            description,
            feature_count,
            total_record_count,
            error,
            error_kind: if success {
                None
            } else {
                layer_results.iter().find_map(|result| result.error_kind)
            },
            available_layers: Some(
                layer_results
                    .iter()
                    .filter_map(|result| result.source_layer.clone())
                    .collect(),
            ),
            layer_results,
            ..Self::default()
        }
    }

    /// Number of failed sub-results of a process-all run.
    #[must_use]
    pub fn failed_layers(&self) -> usize {
        self.layer_results
            .iter()
            .filter(|result| !result.success)
            .count()
    }
}

/// A record dropped during extraction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedRecord {
    /// Zero-based record index in the source
    pub index: usize,
    /// Why the record was dropped
    pub reason: SkipReason,
}

/// Bounding box and center of a set of geometries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpatialExtent {
    /// Minimum longitude
    pub min_x: f64,
    /// Minimum latitude
    pub min_y: f64,
    /// Maximum longitude
    pub max_x: f64,
    /// Maximum latitude
    pub max_y: f64,
}

impl SpatialExtent {
    /// Center of the box.
    #[must_use]
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }
}

/// Attribute name to statistics, in column order.
pub type QualityReport = IndexMap<String, AttributeQuality>;

/// Statistics of one attribute.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributeQuality {
    /// Share of non-missing values
    pub completeness_ratio: f64,
    /// Distinct non-missing values
    pub distinct_value_count: usize,
    /// Inferred type name
    pub inferred_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numeric_summary: Option<NumericSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_summary: Option<TextSummary>,
}

/// Mean and sample standard deviation; `None` when undefined.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NumericSummary {
    pub mean: Option<f64>,
    pub std: Option<f64>,
}

/// Average length and most frequent terms of a text attribute.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextSummary {
    pub avg_length: f64,
    pub common_terms: Vec<String>,
}

/// Result of clustering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterAssignment {
    /// Cluster label of every extracted feature, in order
    pub label_per_record: Vec<usize>,
    /// Number of clusters
    pub cluster_count: usize,
    /// Numeric attributes in the feature matrix
    pub attributes_used: BTreeSet<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;

    #[test]
    fn failure_carries_kind_and_layers() {
        let err: GeoIngestError = PipelineError::AmbiguousLayerSelection {
            available: vec!["roads".into(), "buildings".into()],
        }
        .into();

        let result = ProcessingResult::failure(&err);

        assert!(!result.success);
        assert_eq!(result.error_kind, Some(ErrorKind::AmbiguousLayerSelection));
        assert_eq!(
            result.available_layers.as_deref(),
            Some(&["roads".to_string(), "buildings".to_string()][..])
        );
    }

    #[test]
    fn aggregate_succeeds_when_any_layer_does() {
        let ok = ProcessingResult {
            success: true,
            feature_count: 3,
            total_record_count: 4,
            source_layer: Some("roads".into()),
            ..ProcessingResult::default()
        };
        let failed = ProcessingResult {
            total_record_count: 2,
            source_layer: Some("empty".into()),
            ..ProcessingResult::failure(&PipelineError::EmptyResult { total: 2 }.into())
        };

        let aggregate = ProcessingResult::aggregate(vec![ok, failed]);

        assert!(aggregate.success);
        assert_eq!(aggregate.feature_count, 3);
        assert_eq!(aggregate.total_record_count, 6);
        assert_eq!(aggregate.failed_layers(), 1);
        assert!(ProcessingResult::aggregate(Vec::new()).error.is_some());
    }

    #[test]
    fn serialized_result_omits_features_and_empty_fields() {
        let result = ProcessingResult {
            success: true,
            layer_name: Some("parks".into()),
            ..ProcessingResult::default()
        };

        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["layer_name"], "parks");
        assert!(json.get("features").is_none());
        assert!(json.get("error").is_none());
    }
}
