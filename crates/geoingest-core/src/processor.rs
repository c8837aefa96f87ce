//! Format processors and the processor factory.
//!
//! Every format implements [`FormatProcessor`]: a cheap input check plus a
//! `process` call that runs load, standardize, extract and analyze, and
//! always hands back a [`ProcessingResult`]. Failures of any step become a
//! result with `success == false`.

use std::panic::{self, AssertUnwindSafe};

use anyhow::anyhow;
use geoingest_core_common::{DatasetReader, InputFiles, RawDataset};
use geoingest_csv::{CsvReadOptions, CsvReader};
use geoingest_geojson::GeoJsonReader;
use geoingest_geopackage::{GeoPackage, INPUT_GPKG};
use geoingest_shapefile::ShapefileReader;
use tracing::{debug, info, info_span, warn};

use crate::analysis::{AnalysisInput, MetadataAnalyzer};
use crate::drivers::Format;
use crate::error::{GeoIngestError, PipelineError, Result};
use crate::extract::extract_features;
use crate::options::ProcessOptions;
use crate::standardize::{classify_geometry_type, normalize_crs};
use crate::types::ProcessingResult;

/// Processing capability of one upload format.
pub trait FormatProcessor: Send + Sync {
    /// The format handled by this processor.
    fn format(&self) -> Format;

    /// Returns `true` when every required input stream is present.
    ///
    /// Content is not inspected.
    fn validate_inputs(&self, inputs: &InputFiles) -> bool {
        inputs
            .missing(&self.format().driver().required_inputs())
            .is_empty()
    }

    /// Runs the pipeline over `inputs`.
    ///
    /// Never fails: errors are reported through
    /// [`ProcessingResult::error`] and [`ProcessingResult::error_kind`].
    fn process(&self, inputs: &InputFiles, options: &ProcessOptions) -> ProcessingResult;
}

/// Processor for point-table CSV uploads.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvProcessor;

/// Processor for `GeoJSON` uploads.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoJsonProcessor;

/// Processor for shapefile bundles.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShapefileProcessor;

/// Processor for `GeoPackage` containers.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoPackageProcessor;

impl FormatProcessor for CsvProcessor {
    fn format(&self) -> Format {
        Format::Csv
    }

    fn process(&self, inputs: &InputFiles, options: &ProcessOptions) -> ProcessingResult {
        let mut read_options = CsvReadOptions::default();
        if let Some(column) = &options.lat_column {
            read_options = read_options.with_lat_column(column);
        }
        if let Some(column) = &options.lon_column {
            read_options = read_options.with_lon_column(column);
        }
        run_reader(self.format(), &CsvReader::new(read_options), inputs, options)
    }
}

impl FormatProcessor for GeoJsonProcessor {
    fn format(&self) -> Format {
        Format::GeoJson
    }

    fn process(&self, inputs: &InputFiles, options: &ProcessOptions) -> ProcessingResult {
        run_reader(self.format(), &GeoJsonReader, inputs, options)
    }
}

impl FormatProcessor for ShapefileProcessor {
    fn format(&self) -> Format {
        Format::Shapefile
    }

    fn process(&self, inputs: &InputFiles, options: &ProcessOptions) -> ProcessingResult {
        run_reader(self.format(), &ShapefileReader, inputs, options)
    }
}

impl FormatProcessor for GeoPackageProcessor {
    fn format(&self) -> Format {
        Format::GeoPackage
    }

    fn process(&self, inputs: &InputFiles, options: &ProcessOptions) -> ProcessingResult {
        guarded(self.format(), options, || {
            check_request(self.format(), inputs, options)?;
            let input = inputs
                .get(INPUT_GPKG)
                .ok_or_else(|| missing_input(self.format(), INPUT_GPKG))?;
            let mut container =
                GeoPackage::open(input).map_err(|err| read_failure(self.format(), err))?;
            let result = process_container(&mut container, options);
            container.close();
            result
        })
    }
}

/// Returns the processor for `format`.
#[must_use]
pub fn processor_for(format: Format) -> Box<dyn FormatProcessor> {
    match format {
        Format::Shapefile => Box::new(ShapefileProcessor),
        Format::Csv => Box::new(CsvProcessor),
        Format::GeoJson => Box::new(GeoJsonProcessor),
        Format::GeoPackage => Box::new(GeoPackageProcessor),
    }
}

/// Looks up the processor registered for a format tag, ignoring case.
///
/// # Errors
///
/// Returns [`DriverError::UnknownFormat`](crate::error::DriverError) for an
/// unregistered tag.
///
/// # Examples
///
/// ```
/// use geoingest_core::processor::get_processor;
///
/// assert_eq!(get_processor("GeoJSON").unwrap().format().as_str(), "geojson");
/// assert!(get_processor("kml").is_err());
/// ```
pub fn get_processor(tag: &str) -> Result<Box<dyn FormatProcessor>> {
    let format: Format = tag.parse()?;
    Ok(processor_for(format))
}

fn run_reader(
    format: Format,
    reader: &dyn DatasetReader,
    inputs: &InputFiles,
    options: &ProcessOptions,
) -> ProcessingResult {
    guarded(format, options, || {
        check_request(format, inputs, options)?;
        let dataset = reader
            .read_dataset(inputs)
            .map_err(|err| GeoIngestError::from_reader(format.as_str(), err))?;
        run_pipeline(dataset, options)
    })
}

/// Picks and processes the container layers the options ask for.
fn process_container(
    container: &mut GeoPackage,
    options: &ProcessOptions,
) -> Result<ProcessingResult> {
    let format = Format::GeoPackage;
    let layers = container
        .layers()
        .map_err(|err| read_failure(format, err))?;
    if layers.is_empty() {
        return Err(PipelineError::NoLayersFound {
            format: format.to_string(),
        }
        .into());
    }

    if options.process_all_layers {
        info!("Processing all {} layers", layers.len());
        let results = layers
            .iter()
            .map(|layer| {
                let name = match &options.layer_name {
                    Some(prefix) => format!("{prefix}_{layer}"),
                    None => layer.clone(),
                };
                let layer_options = ProcessOptions {
                    layer_name: Some(name),
                    ..options.clone()
                };
                let span = info_span!("layer", source = %layer);
                let _guard = span.enter();
                let result = process_layer(container, layer, &layer_options).unwrap_or_else(|err| {
                    warn!("Layer '{layer}' failed: {err}");
                    ProcessingResult::failure(&err)
                });
                ProcessingResult {
                    source_layer: Some(layer.clone()),
                    ..result
                }
            })
            .collect();
        return Ok(ProcessingResult::aggregate(results));
    }

    let layer = match (&options.selected_layer, layers.as_slice()) {
        (Some(selected), _) => {
            if !layers.contains(selected) {
                return Err(PipelineError::LayerNotFound {
                    layer: selected.clone(),
                    available: layers,
                }
                .into());
            }
            selected.clone()
        },
        (None, [only]) => only.clone(),
        (None, _) => {
            return Err(PipelineError::AmbiguousLayerSelection { available: layers }.into());
        },
    };
    let result = process_layer(container, &layer, options)?;
    Ok(ProcessingResult {
        source_layer: Some(layer),
        ..result
    })
}

fn process_layer(
    container: &mut GeoPackage,
    layer: &str,
    options: &ProcessOptions,
) -> Result<ProcessingResult> {
    debug!("Reading layer '{layer}'");
    let dataset = container
        .read_layer(layer)
        .map_err(|err| read_failure(Format::GeoPackage, err))?;
    run_pipeline(dataset, options)
}

/// Standardizes, extracts and analyzes one loaded dataset.
fn run_pipeline(mut dataset: RawDataset, options: &ProcessOptions) -> Result<ProcessingResult> {
    let crs = normalize_crs(&mut dataset)?;
    let summary = extract_features(&dataset)?;
    let geometry_type = classify_geometry_type(summary.features.iter().map(|f| &f.geometry));

    let analyzer = MetadataAnalyzer::new(options.analysis.clone());
    let metadata = analyzer.analyze(&AnalysisInput {
        geometry_type: geometry_type.as_deref(),
        layer_name: options.layer_name.as_deref(),
        description: options.description.as_deref(),
        ..AnalysisInput::new(&dataset.fields, &summary.features)
    });
    info!(
        "Extracted {} of {} records into layer '{}'",
        summary.feature_count(),
        summary.total_record_count,
        metadata.name
    );

    Ok(ProcessingResult {
        success: true,
        layer_name: Some(metadata.name),
        description: metadata.description,
        geometry_type,
        feature_count: summary.feature_count(),
        total_record_count: summary.total_record_count,
        crs: Some(crs.to_string()),
        extent: metadata.extent,
        quality_report: Some(metadata.quality_report),
        cluster_assignments: metadata.cluster_assignments,
        skipped_records: summary.skipped,
        features: summary.features,
        ..ProcessingResult::default()
    })
}

/// Checks required inputs and the supplied layer name.
fn check_request(format: Format, inputs: &InputFiles, options: &ProcessOptions) -> Result<()> {
    let missing = inputs.missing(&format.driver().required_inputs());
    if !missing.is_empty() {
        return Err(PipelineError::MissingInputs {
            format: format.to_string(),
            missing: missing.into_iter().map(str::to_string).collect(),
        }
        .into());
    }
    if options
        .layer_name
        .as_deref()
        .is_some_and(|name| name.trim().is_empty())
    {
        return Err(PipelineError::InvalidLayerName.into());
    }
    Ok(())
}

fn missing_input(format: Format, key: &str) -> GeoIngestError {
    PipelineError::MissingInputs {
        format: format.to_string(),
        missing: vec![key.to_string()],
    }
    .into()
}

fn read_failure(format: Format, err: geoingest_shared::SpatialFormatReadError) -> GeoIngestError {
    GeoIngestError::from_read_error(format.as_str(), err)
}

/// Runs `body` inside the `process` span and converts every failure,
/// panics included, into a failed result.
fn guarded(
    format: Format,
    options: &ProcessOptions,
    body: impl FnOnce() -> Result<ProcessingResult>,
) -> ProcessingResult {
    let span = info_span!(
        "process",
        format = %format,
        layer = options.layer_name.as_deref().unwrap_or_default()
    );
    let _guard = span.enter();

    let outcome = panic::catch_unwind(AssertUnwindSafe(body)).unwrap_or_else(|_| {
        Err(GeoIngestError::Other(anyhow!("{format} processing panicked")))
    });
    match outcome {
        Ok(result) => result,
        Err(err) => {
            warn!("Processing failed: {err}");
            ProcessingResult::failure(&err)
        },
    }
}
