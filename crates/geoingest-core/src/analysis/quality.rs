//! Per-attribute quality statistics.

use geoingest_core_common::FieldSchema;

use super::text::TextAnalyzer;
use super::{column_values, distinct_count, value_text};
use crate::extract::ExtractedFeature;
use crate::options::AnalyzerConfig;
use crate::types::{AttributeQuality, NumericSummary, QualityReport, TextSummary};

/// Builds the quality report of every attribute, in column order.
///
/// Completeness is the share of present values, distinct counts ignore
/// missing values, numeric attributes get a mean and sample standard
/// deviation, and text attributes get an average length plus their most
/// frequent terms.
#[allow(clippy::cast_precision_loss)]
pub fn quality_report(
    text: &impl TextAnalyzer,
    columns: &[FieldSchema],
    features: &[ExtractedFeature],
    config: &AnalyzerConfig,
) -> QualityReport {
    let total = features.len();
    columns
        .iter()
        .map(|column| {
            let values = column_values(features, &column.name);
            let present = values.iter().filter(|value| !value.is_null()).count();
            let completeness_ratio = if total == 0 {
                0.0
            } else {
                present as f64 / total as f64
            };

            let numeric_summary = column.kind.is_numeric().then(|| {
                let numbers: Vec<f64> = values.iter().filter_map(|value| value.as_f64()).collect();
                numeric_summary(&numbers)
            });
            let text_summary = if column.kind.is_textual() {
                let texts: Vec<String> =
                    values.iter().filter_map(|value| value_text(value)).collect();
                text_summary(text, &texts, config)
            } else {
                None
            };

            let quality = AttributeQuality {
                completeness_ratio,
                distinct_value_count: distinct_count(&values),
                inferred_type: column.kind.as_str().to_string(),
                numeric_summary,
                text_summary,
            };
            (column.name.clone(), quality)
        })
        .collect()
}

#[allow(clippy::cast_precision_loss)]
fn numeric_summary(numbers: &[f64]) -> NumericSummary {
    if numbers.is_empty() {
        return NumericSummary {
            mean: None,
            std: None,
        };
    }
    let count = numbers.len() as f64;
    let mean = numbers.iter().sum::<f64>() / count;
    let std = (numbers.len() >= 2).then(|| {
        let squares: f64 = numbers.iter().map(|n| (n - mean).powi(2)).sum();
        (squares / (count - 1.0)).sqrt()
    });
    NumericSummary {
        mean: Some(mean),
        std,
    }
}

#[allow(clippy::cast_precision_loss)]
fn text_summary(
    text: &impl TextAnalyzer,
    values: &[String],
    config: &AnalyzerConfig,
) -> Option<TextSummary> {
    if values.is_empty() {
        return None;
    }
    let total_length: usize = values.iter().map(|value| value.chars().count()).sum();
    let sample = values
        .iter()
        .take(config.text_sample_size)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ");
    let tokens = text.tokenize(&sample.to_lowercase());
    Some(TextSummary {
        avg_length: total_length as f64 / values.len() as f64,
        common_terms: text.frequent_terms(&tokens, config.common_terms),
    })
}
