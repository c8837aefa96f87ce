//! Layer name suggestion.

use chrono::Local;
use geoingest_core_common::FieldSchema;
use indexmap::IndexMap;
use tracing::debug;

use super::text::TextAnalyzer;
use super::{column_values, distinct_count, value_text};
use crate::extract::ExtractedFeature;

const NOUN_WEIGHT: f64 = 1.0;
const CONTENT_WORD_WEIGHT: f64 = 0.5;
const VALUE_NOUN_WEIGHT: f64 = 0.2;
const CARDINALITY_BONUS: f64 = 1.0;
const MIN_UNIQUE_RATIO: f64 = 0.01;
const MAX_UNIQUE_RATIO: f64 = 0.9;

/// Scores one attribute as a naming source.
///
/// The attribute name contributes per token (nouns score higher than other
/// non-stopwords). A sample of values contributes per distinct noun, plus a
/// bonus when the attribute's distinct-value ratio is moderate.
pub fn score_attribute(
    text: &impl TextAnalyzer,
    name: &str,
    features: &[ExtractedFeature],
    sample_size: usize,
) -> f64 {
    let mut score = 0.0;
    for token in text.tokenize(&name.to_lowercase()) {
        if text.is_noun(&token) {
            score += NOUN_WEIGHT;
        }
        if !text.is_stopword(&token) {
            score += CONTENT_WORD_WEIGHT;
        }
    }

    let values = column_values(features, name);
    let sample: Vec<String> = values
        .iter()
        .filter_map(|value| value_text(value))
        .take(sample_size)
        .collect();
    let sample_text = sample.join(" ");
    if sample_text.trim().is_empty() {
        return score;
    }

    let mut nouns: Vec<String> = text
        .tokenize(&sample_text.to_lowercase())
        .into_iter()
        .filter(|token| text.is_noun(token) && !text.is_stopword(token))
        .collect();
    nouns.sort_unstable();
    nouns.dedup();
    #[allow(clippy::cast_precision_loss)]
    {
        score += nouns.len() as f64 * VALUE_NOUN_WEIGHT;

        let has_missing = values.iter().any(|value| value.is_null());
        let unique = distinct_count(&values) + usize::from(has_missing);
        let ratio = unique as f64 / values.len() as f64;
        if MIN_UNIQUE_RATIO < ratio && ratio < MAX_UNIQUE_RATIO {
            score += CARDINALITY_BONUS;
        }
    }
    score
}

/// Suggests a layer name from the attribute values.
///
/// Attributes are tried from the highest score down; the first one with a
/// usable most frequent value provides the name, lower-cased with spaces
/// replaced by underscores and cut to `max_length` characters. Falls back
/// to [`timestamp_name`].
pub fn suggest_name(
    text: &impl TextAnalyzer,
    columns: &[FieldSchema],
    features: &[ExtractedFeature],
    sample_size: usize,
    max_length: usize,
) -> String {
    let mut scored: Vec<(&str, f64)> = columns
        .iter()
        .map(|column| {
            let name = column.name.as_str();
            (name, score_attribute(text, name, features, sample_size))
        })
        .collect();
    // Stable sort: equal scores keep column order.
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));

    for (column, score) in scored {
        if let Some(value) = most_frequent_value(features, column) {
            let name: String = value
                .to_lowercase()
                .replace(' ', "_")
                .chars()
                .take(max_length)
                .collect();
            debug!("Suggested name '{name}' from attribute '{column}' (score {score:.1})");
            return name;
        }
    }
    timestamp_name()
}

/// Generated name of the form `layer_YYYYmmdd_HHMMSS`.
#[must_use]
pub fn timestamp_name() -> String {
    format!("layer_{}", Local::now().format("%Y%m%d_%H%M%S"))
}

/// Most frequent non-empty value of a column; ties go to the value seen
/// first.
fn most_frequent_value(features: &[ExtractedFeature], column: &str) -> Option<String> {
    let mut counts: IndexMap<String, usize> = IndexMap::new();
    for value in column_values(features, column) {
        if let Some(text) = value_text(value).filter(|text| is_usable(text)) {
            *counts.entry(text).or_default() += 1;
        }
    }
    let mut best: Option<(String, usize)> = None;
    for (value, count) in counts {
        if best.as_ref().is_none_or(|(_, top)| count > *top) {
            best = Some((value, count));
        }
    }
    best.map(|(value, _)| value)
}

fn is_usable(text: &str) -> bool {
    !text.trim().is_empty() && text != "0" && text != "false"
}
