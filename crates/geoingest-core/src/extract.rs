//! Feature extraction and attribute sanitation.
//!
//! Walks a CRS-normalized dataset record by record. Each record either
//! yields an [`ExtractedFeature`] or is skipped with a [`SkipReason`]; only
//! a non-empty input that yields no feature at all fails the call.

use std::fmt;

use geoingest_core_common::{AttributeValue, Geometry, Properties, RawDataset, RawRecord};
use serde::Serialize;
use serde_json::{Number, Value as JsonValue};
use tracing::{debug, warn};

use crate::error::{ErrorKind, PipelineError};
use crate::standardize::standardize_geometry;
use crate::types::SkippedRecord;

/// JSON-safe attribute map of a stored feature.
pub type SanitizedProperties = serde_json::Map<String, JsonValue>;

/// A storage-ready feature.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedFeature {
    /// Zero-based index of the source record
    pub index: usize,
    /// Two-dimensional, valid WGS 84 geometry
    pub geometry: Geometry,
    /// Sanitized attributes in column order
    pub properties: SanitizedProperties,
}

/// Why a record was not extracted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum SkipReason {
    /// The record has no geometry.
    MissingGeometry,
    /// The geometry variant cannot be stored in a layer.
    UnsupportedGeometry {
        /// Source geometry type
        geometry_type: String,
    },
    /// The geometry is invalid and repair failed.
    GeometryRepairFailure {
        /// What went wrong
        message: String,
    },
}

impl SkipReason {
    /// Error kind reported for this skip, if it has one.
    #[must_use]
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            SkipReason::GeometryRepairFailure { .. } => Some(ErrorKind::GeometryRepairFailure),
            SkipReason::MissingGeometry | SkipReason::UnsupportedGeometry { .. } => None,
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingGeometry => f.write_str("record has no geometry"),
            SkipReason::UnsupportedGeometry { geometry_type } => {
                write!(f, "unsupported geometry type {geometry_type}")
            },
            SkipReason::GeometryRepairFailure { message } => {
                write!(f, "geometry repair failed: {message}")
            },
        }
    }
}

/// Outcome of extracting one record.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    /// The record became a feature.
    Extracted(ExtractedFeature),
    /// The record was dropped.
    Skipped(SkipReason),
}

/// Aggregated outcomes of one extraction pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractionSummary {
    /// Extracted features, in source order
    pub features: Vec<ExtractedFeature>,
    /// Dropped records, in source order
    pub skipped: Vec<SkippedRecord>,
    /// Records in the source dataset
    pub total_record_count: usize,
}

impl ExtractionSummary {
    /// Number of extracted features.
    #[must_use]
    pub fn feature_count(&self) -> usize {
        self.features.len()
    }

    fn push(&mut self, index: usize, outcome: RecordOutcome) {
        match outcome {
            RecordOutcome::Extracted(feature) => self.features.push(feature),
            RecordOutcome::Skipped(reason) => {
                debug!("Skipping record {index}: {reason}");
                self.skipped.push(SkippedRecord { index, reason });
            },
        }
    }
}

/// Maps one raw attribute to a JSON-safe value.
///
/// `NaN` and infinities become `null`, as do binary payloads, which have
/// no JSON representation. Everything else passes through unchanged.
///
/// # Examples
///
/// ```
/// use geoingest_core::extract::sanitize_value;
/// use geoingest_core_common::AttributeValue;
/// use serde_json::json;
///
/// assert_eq!(sanitize_value(&AttributeValue::Float(f64::NAN)), json!(null));
/// assert_eq!(sanitize_value(&AttributeValue::Float(2.5)), json!(2.5));
/// assert_eq!(sanitize_value(&AttributeValue::Text("a".into())), json!("a"));
/// ```
#[must_use]
pub fn sanitize_value(value: &AttributeValue) -> JsonValue {
    match value {
        AttributeValue::Null | AttributeValue::Binary(_) => JsonValue::Null,
        AttributeValue::Bool(value) => JsonValue::Bool(*value),
        AttributeValue::Integer(value) => JsonValue::Number((*value).into()),
        AttributeValue::Float(value) => {
            Number::from_f64(*value).map_or(JsonValue::Null, JsonValue::Number)
        },
        AttributeValue::Text(value) => JsonValue::String(value.clone()),
        AttributeValue::Json(value) => value.clone(),
    }
}

/// Sanitizes every attribute of a record, keeping column order.
#[must_use]
pub fn sanitize_properties(properties: &Properties) -> SanitizedProperties {
    properties
        .iter()
        .map(|(name, value)| (name.clone(), sanitize_value(value)))
        .collect()
}

/// Extracts one record.
#[must_use]
pub fn extract_record(index: usize, record: &RawRecord) -> RecordOutcome {
    let Some(geometry) = record.geometry.as_ref() else {
        return RecordOutcome::Skipped(SkipReason::MissingGeometry);
    };
    match standardize_geometry(geometry) {
        Ok(geometry) => RecordOutcome::Extracted(ExtractedFeature {
            index,
            geometry,
            properties: sanitize_properties(&record.properties),
        }),
        Err(reason) => RecordOutcome::Skipped(reason),
    }
}

/// Extracts every record of `dataset`.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyResult`] when the dataset has records but
/// none could be extracted.
pub fn extract_features(dataset: &RawDataset) -> Result<ExtractionSummary, PipelineError> {
    let mut summary = ExtractionSummary {
        total_record_count: dataset.len(),
        ..ExtractionSummary::default()
    };
    for (index, record) in dataset.records.iter().enumerate() {
        summary.push(index, extract_record(index, record));
    }

    if !summary.skipped.is_empty() {
        warn!(
            "Skipped {} of {} records during extraction",
            summary.skipped.len(),
            summary.total_record_count
        );
    }
    if summary.total_record_count > 0 && summary.features.is_empty() {
        return Err(PipelineError::EmptyResult {
            total: summary.total_record_count,
        });
    }
    Ok(summary)
}
