//! Display utilities for formatting CLI output.
//!
//! This module provides table row structures and formatting functions
//! for presenting formats and processing results in a human-readable form.

use geoingest_core::{ErrorKind, ProcessingResult};
use geoingest_core::drivers::get_drivers;
use geoingest_core::types::AttributeQuality;
use tabled::{Table, Tabled};

/// Table row representation for displaying a registered format.
#[derive(Tabled)]
pub struct FormatRow {
    /// Format tag used with `--format`.
    #[tabled(rename = "Format")]
    pub short_name: String,
    /// Full descriptive name of the format.
    #[tabled(rename = "Long Name")]
    pub long_name: String,
    /// Accepted file extensions.
    #[tabled(rename = "Extensions")]
    pub extensions: String,
    /// Input keys that must be supplied.
    #[tabled(rename = "Required Inputs")]
    pub required: String,
    /// Input keys that may be supplied.
    #[tabled(rename = "Optional Inputs")]
    pub optional: String,
}

/// One `Field | Value` line of a result summary.
#[derive(Tabled)]
pub struct SummaryRow {
    #[tabled(rename = "Field")]
    pub field: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

/// Table row representation for displaying attribute quality.
#[derive(Tabled)]
pub struct QualityRow {
    #[tabled(rename = "Attribute")]
    pub name: String,
    #[tabled(rename = "Type")]
    pub inferred_type: String,
    #[tabled(rename = "Completeness")]
    pub completeness: String,
    #[tabled(rename = "Distinct")]
    pub distinct: usize,
    /// Mean and deviation, or common terms.
    #[tabled(rename = "Summary")]
    pub summary: String,
}

fn join_or_dash(items: &[&str]) -> String {
    if items.is_empty() {
        "-".to_string()
    } else {
        items.join(", ")
    }
}

/// Command-line flags that resolve a failure of the given kind.
fn flag_hint(kind: ErrorKind) -> Option<&'static str> {
    match kind {
        ErrorKind::UnknownFormat => Some("Run 'geoingest formats' to see all registered formats."),
        ErrorKind::ColumnDetectionError => Some("Pass --lat-column and --lon-column."),
        ErrorKind::AmbiguousLayerSelection => {
            Some("Pass --selected-layer, or --all-layers to process every layer.")
        },
        ErrorKind::DuplicateLayerName => Some("Pass a different --layer-name."),
        _ => None,
    }
}

/// Builds one row per registered format, in registry order.
#[must_use]
pub fn format_rows() -> Vec<FormatRow> {
    get_drivers()
        .into_iter()
        .map(|driver| {
            let optional: Vec<&str> = driver
                .inputs
                .iter()
                .filter(|input| !input.required)
                .map(|input| input.key)
                .collect();
            FormatRow {
                short_name: driver.short_name.to_string(),
                long_name: driver.long_name.to_string(),
                extensions: join_or_dash(driver.extensions),
                required: join_or_dash(&driver.required_inputs()),
                optional: join_or_dash(&optional),
            }
        })
        .collect()
}

/// Prints the registered formats.
pub fn display_formats() {
    let rows = format_rows();
    println!("\nAvailable Formats ({} total):\n", rows.len());
    println!("{}", Table::new(rows));
}

/// Builds the summary lines of a result.
///
/// Successful results list the layer metadata. Failures list the error, its
/// kind, the recovery suggestion, a flag hint and any layers to choose from.
#[must_use]
pub fn summary_rows(result: &ProcessingResult) -> Vec<SummaryRow> {
    let mut rows = Vec::new();
    let mut push = |field: &str, value: String| {
        rows.push(SummaryRow {
            field: field.to_string(),
            value,
        });
    };

    push("Status", if result.success { "OK" } else { "FAILED" }.to_string());
    if let Some(kind) = result.error_kind {
        push("Error kind", kind.to_string());
    }
    if let Some(error) = &result.error {
        push("Error", error.clone());
    }
    if let Some(suggestion) = &result.recovery_suggestion {
        push("Suggestion", suggestion.clone());
    }
    if let Some(hint) = result.error_kind.and_then(flag_hint)
        && !result.success
    {
        push("Hint", hint.to_string());
    }
    if let Some(layers) = &result.available_layers
        && !result.success
    {
        push("Available layers", layers.join(", "));
    }
    if let Some(name) = &result.layer_name {
        push("Layer", name.clone());
    }
    if let Some(source) = &result.source_layer {
        push("Source layer", source.clone());
    }
    if let Some(geometry_type) = &result.geometry_type {
        push("Geometry type", geometry_type.clone());
    }
    if result.success || result.total_record_count > 0 {
        push(
            "Features",
            format!("{} of {}", result.feature_count, result.total_record_count),
        );
    }
    if !result.skipped_records.is_empty() {
        push("Skipped", result.skipped_records.len().to_string());
    }
    if let Some(crs) = &result.crs {
        push("CRS", crs.clone());
    }
    if let Some(extent) = &result.extent {
        push(
            "Extent",
            format!(
                "[{:.4}, {:.4}, {:.4}, {:.4}]",
                extent.min_x, extent.min_y, extent.max_x, extent.max_y
            ),
        );
    }
    if let Some(clusters) = &result.cluster_assignments {
        push("Clusters", clusters.cluster_count.to_string());
    }
    if let Some(description) = &result.description {
        push("Description", description.clone());
    }
    rows
}

fn quality_summary(quality: &AttributeQuality) -> String {
    if let Some(numeric) = &quality.numeric_summary {
        let fmt = |value: Option<f64>| value.map_or_else(|| "-".to_string(), |v| format!("{v:.2}"));
        return format!("mean {}, std {}", fmt(numeric.mean), fmt(numeric.std));
    }
    if let Some(text) = &quality.text_summary {
        return format!(
            "avg length {:.1}; {}",
            text.avg_length,
            text.common_terms.join(", ")
        );
    }
    String::new()
}

/// Builds one quality row per attribute, in column order.
#[must_use]
pub fn quality_rows(result: &ProcessingResult) -> Vec<QualityRow> {
    result
        .quality_report
        .iter()
        .flatten()
        .map(|(name, quality)| QualityRow {
            name: name.clone(),
            inferred_type: quality.inferred_type.clone(),
            completeness: format!("{:.1}%", quality.completeness_ratio * 100.0),
            distinct: quality.distinct_value_count,
            summary: quality_summary(quality),
        })
        .collect()
}

/// Prints a processing result, recursing into process-all sub-results.
pub fn display_result(result: &ProcessingResult) {
    println!("{}", Table::new(summary_rows(result)));

    let quality = quality_rows(result);
    if !quality.is_empty() {
        println!("\n=== Attribute Quality ===");
        println!("{}", Table::new(quality));
    }

    for layer in &result.layer_results {
        println!(
            "\n=== Layer {} ===",
            layer.source_layer.as_deref().unwrap_or("?")
        );
        display_result(layer);
    }
}

#[cfg(test)]
mod tests {
    use geoingest_core::operations::process;
    use geoingest_core::ProcessOptions;
    use geoingest_core_common::{InputFile, InputFiles};

    use super::*;

    fn field<'a>(rows: &'a [SummaryRow], name: &str) -> Option<&'a str> {
        rows.iter()
            .find(|row| row.field == name)
            .map(|row| row.value.as_str())
    }

    #[test]
    fn test_format_rows_cover_registry() {
        let rows = format_rows();
        assert_eq!(rows.len(), 4);
        let shapefile = rows.iter().find(|row| row.short_name == "shapefile").unwrap();
        assert_eq!(shapefile.required, "file_shp, file_shx, file_dbf");
    }

    #[test]
    fn test_failed_result_lists_kind_and_suggestion() {
        let result = process("kml", &InputFiles::new(), &ProcessOptions::default());

        let rows = summary_rows(&result);

        assert_eq!(field(&rows, "Status"), Some("FAILED"));
        assert_eq!(field(&rows, "Error kind"), Some("UnknownFormat"));
        assert!(field(&rows, "Suggestion").unwrap().contains("get_driver_names"));
        assert!(field(&rows, "Hint").unwrap().contains("geoingest formats"));
        assert_eq!(field(&rows, "Features"), None);
    }

    #[test]
    fn test_successful_result_rows() {
        let inputs = InputFiles::new().with(
            "file_csv",
            InputFile::new("lat,lon,kind\n1,2,well\n3,4,well\n"),
        );
        let result = process("csv", &inputs, &ProcessOptions::default().with_layer_name("wells"));

        let rows = summary_rows(&result);

        assert_eq!(field(&rows, "Layer"), Some("wells"));
        assert_eq!(field(&rows, "Features"), Some("2 of 2"));
        assert_eq!(field(&rows, "Geometry type"), Some("POINT"));

        let quality = quality_rows(&result);
        let kind = quality.iter().find(|row| row.name == "kind").unwrap();
        assert_eq!(kind.completeness, "100.0%");
        assert_eq!(kind.distinct, 1);
        assert!(kind.summary.starts_with("avg length 4.0"));
        display_result(&result);
    }
}
