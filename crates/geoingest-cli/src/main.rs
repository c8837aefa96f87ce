//! Command-line interface for `GeoIngest`, the geospatial upload normalizer.
//!
//! This binary provides a thin front end to the [`geoingest_core`] library:
//! it reads the named input files of one upload, runs the processing
//! pipeline, stores the result in an in-memory layer store, and reports the
//! outcome.
//!
//! # Architecture
//!
//! The CLI is built using [`clap`] for argument parsing and [`tracing`] for structured logging.
//! Library crates that log through the `log` facade are bridged into the same subscriber.
//!
//! # Available Commands
//!
//! - `process` - Normalize and analyze one upload
//! - `formats` - List the registered upload formats and their inputs

mod display;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use geoingest_core::gateway::{LayerGateway, MemoryGateway};
use geoingest_core::operations::{persist, process};
use geoingest_core::{AnalyzerConfig, ProcessOptions};
use geoingest_core_common::{InputFile, InputFiles};
use geojson::{Feature, FeatureCollection, GeoJson};
use tracing::{Level, info};
use tracing_log::LogTracer;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(
    name = "geoingest",
    version,
    about = "Normalize geospatial uploads into storage-ready WGS 84 layers",
    long_about = "GeoIngest reads CSV point tables, GeoJSON, shapefile bundles and GeoPackage containers,\n\
                  reprojects them to WGS 84, repairs invalid geometries, and infers layer metadata."
)]
/// Command-line arguments and options for the `GeoIngest` CLI.
struct Cli {
    /// Enable verbose (INFO level) logging output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug (DEBUG level) logging output with detailed diagnostics.
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands for the `GeoIngest` CLI.
#[derive(Subcommand)]
enum Commands {
    /// Processes one upload and reports the resulting layer.
    Process(ProcessArgs),

    /// Lists the registered upload formats and the inputs each one needs.
    Formats,
}

/// Arguments of the `process` subcommand.
#[derive(clap::Args, Debug)]
struct ProcessArgs {
    /// Upload format (`csv`, `geojson`, `shapefile`, `geopackage`).
    #[arg(short, long, value_name = "FORMAT")]
    format: String,

    /// Named input stream, e.g. `file_shp=parcels.shp`. Repeat for bundles.
    #[arg(
        short,
        long = "input",
        value_name = "KEY=PATH",
        value_parser = parse_input,
        required = true
    )]
    inputs: Vec<(String, PathBuf)>,

    /// Name of the produced layer; inferred when omitted.
    #[arg(long)]
    layer_name: Option<String>,

    /// Description of the produced layer; generated when omitted.
    #[arg(long)]
    description: Option<String>,

    /// CSV latitude column.
    #[arg(long, value_name = "COLUMN")]
    lat_column: Option<String>,

    /// CSV longitude column.
    #[arg(long, value_name = "COLUMN")]
    lon_column: Option<String>,

    /// `GeoPackage` layer to process.
    #[arg(long, value_name = "LAYER", conflicts_with = "all_layers")]
    selected_layer: Option<String>,

    /// Process every `GeoPackage` layer.
    #[arg(long)]
    all_layers: bool,

    /// Seed for reproducible clustering.
    #[arg(long)]
    seed: Option<u64>,

    /// Skip clustering.
    #[arg(long)]
    no_clustering: bool,

    /// Write the stored features to this `GeoJSON` file.
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Print the processing result as JSON.
    #[arg(long)]
    json: bool,
}

impl ProcessArgs {
    fn options(&self) -> ProcessOptions {
        let mut analysis = AnalyzerConfig::default().with_clustering(!self.no_clustering);
        analysis.seed = self.seed;
        ProcessOptions {
            layer_name: self.layer_name.clone(),
            description: self.description.clone(),
            lat_column: self.lat_column.clone(),
            lon_column: self.lon_column.clone(),
            selected_layer: self.selected_layer.clone(),
            process_all_layers: self.all_layers,
            analysis,
        }
    }
}

/// Parses a `KEY=PATH` input argument.
fn parse_input(arg: &str) -> std::result::Result<(String, PathBuf), String> {
    match arg.split_once('=') {
        Some((key, path)) if !key.trim().is_empty() && !path.is_empty() => {
            Ok((key.trim().to_string(), PathBuf::from(path)))
        },
        _ => Err(format!("expected KEY=PATH, got '{arg}'")),
    }
}

/// Entry point for the `GeoIngest` command-line interface.
///
/// # Errors
///
/// Returns an error if the logging system cannot be initialized, an input
/// cannot be read, or processing fails.
fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else {
        Level::WARN
    };

    // Bridge logs from the `log` crate to the `tracing` ecosystem.
    LogTracer::init()?;

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Process(args) => handle_process(&args),
        Commands::Formats => {
            display::display_formats();
            Ok(())
        },
    }
}

fn handle_process(args: &ProcessArgs) -> Result<()> {
    let inputs = load_inputs(&args.inputs)?;
    info!("Processing {} upload with {} input(s)", args.format, args.inputs.len());

    let result = process(&args.format, &inputs, &args.options());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        display::display_result(&result);
    }
    if !result.success {
        return Err(anyhow!(
            "{}",
            result.error.as_deref().unwrap_or("processing failed")
        ));
    }

    let mut gateway = MemoryGateway::new();
    let layer_ids = persist(&result, &mut gateway).map_err(|err| anyhow!(err.user_message()))?;
    info!("Stored {} layer(s)", layer_ids.len());

    if let Some(path) = &args.output {
        write_geojson(&gateway, &layer_ids, path)?;
        if !args.json {
            println!("\nWrote {} feature(s) to {}", result.feature_count, path.display());
        }
    }
    Ok(())
}

fn load_inputs(pairs: &[(String, PathBuf)]) -> Result<InputFiles> {
    let mut inputs = InputFiles::new();
    for (key, path) in pairs {
        let file = InputFile::from_path(path)
            .with_context(|| format!("Failed to read input '{key}'"))?;
        inputs.insert(key.clone(), file);
    }
    Ok(inputs)
}

/// Writes every stored feature of the given layers as one `FeatureCollection`.
fn write_geojson(gateway: &MemoryGateway, layer_ids: &[u64], path: &Path) -> Result<()> {
    let mut features = Vec::new();
    for &layer_id in layer_ids {
        let stored = gateway
            .get_features(layer_id)
            .map_err(|err| anyhow!(err.user_message()))?;
        features.extend(stored.into_iter().map(|(geometry, properties)| Feature {
            bbox: None,
            geometry: Some(geojson::Geometry::new(geometry)),
            id: None,
            properties: Some(properties),
            foreign_members: None,
        }));
    }
    let collection = GeoJson::FeatureCollection(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    });
    fs::write(path, serde_json::to_string_pretty(&collection)?)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_pairs_need_key_and_path() {
        assert_eq!(
            parse_input("file_csv=data/points.csv"),
            Ok(("file_csv".to_string(), PathBuf::from("data/points.csv")))
        );
        assert!(parse_input("points.csv").is_err());
        assert!(parse_input("=points.csv").is_err());
        assert!(parse_input("file_csv=").is_err());
    }

    #[test]
    fn flags_map_onto_options() {
        let cli = Cli::parse_from([
            "geoingest",
            "process",
            "--format",
            "geopackage",
            "--input",
            "file_gpkg=city.gpkg",
            "--all-layers",
            "--layer-name",
            "city",
            "--seed",
            "9",
        ]);
        let Commands::Process(args) = cli.command else {
            panic!("expected the process command");
        };

        let options = args.options();

        assert!(options.process_all_layers);
        assert_eq!(options.layer_name.as_deref(), Some("city"));
        assert_eq!(options.analysis.seed, Some(9));
        assert!(options.analysis.run_clustering);
    }

    #[test]
    fn selection_and_all_layers_conflict() {
        let parsed = Cli::try_parse_from([
            "geoingest",
            "process",
            "-f",
            "geopackage",
            "-i",
            "file_gpkg=a.gpkg",
            "--selected-layer",
            "roads",
            "--all-layers",
        ]);
        assert!(parsed.is_err());
    }
}
