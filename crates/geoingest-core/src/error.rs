//! Custom error types for `GeoIngest` operations.
//!
//! This module provides structured error handling using `thiserror`. Every
//! processor-fatal failure is one of the variants below; each maps to exactly
//! one [`ErrorKind`], the stable name reported to callers in a
//! [`ProcessingResult`](crate::types::ProcessingResult).

use std::fmt;
use std::path::PathBuf;

use geoingest_shared::SpatialFormatReadError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for `GeoIngest` operations.
///
/// This is the root error type that encompasses all domain-specific errors.
/// It uses `#[error(transparent)]` to delegate display formatting to the
/// underlying error variants.
#[derive(Debug, Error)]
pub enum GeoIngestError {
    /// Format registry errors (unknown format tag)
    #[error(transparent)]
    Driver(#[from] DriverError),

    /// I/O errors (file read/write, staging)
    #[error(transparent)]
    Io(#[from] IoError),

    /// Content errors raised while reading an upload
    #[error(transparent)]
    Format(#[from] FormatError),

    /// Input validation, layer selection and standardization errors
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// Persistence gateway errors
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// Generic errors from dependencies
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Format registry errors.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The format tag is not registered
    #[error("Unknown format '{name}'. Available formats: {available}")]
    UnknownFormat {
        /// The requested format tag
        name: String,
        /// Comma-separated list of registered formats
        available: String,
    },
}

/// I/O related errors.
///
/// These errors occur while reading uploaded streams or staging them on disk.
#[derive(Debug, Error)]
pub enum IoError {
    /// Failed to read from a file
    #[error("Failed to read {format} file '{path}': {source}")]
    Read {
        /// The format being read (e.g. "CSV", "`GeoJSON`")
        format: String,
        /// The file path or upload name
        path: PathBuf,
        /// The underlying error
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Errors in the content of an upload.
#[derive(Debug, Error)]
pub enum FormatError {
    /// Latitude/longitude columns could not be identified
    #[error("Could not detect {} column(s) in CSV header [{}]", missing.join(" and "), headers.join(", "))]
    ColumnDetection {
        /// Axes that could not be matched
        missing: Vec<String>,
        /// Header names that were searched
        headers: Vec<String>,
    },

    /// No candidate encoding produced parseable JSON
    #[error("Could not decode {}as JSON under any of: {}", context.as_ref().map(|c| format!("'{c}' ")).unwrap_or_default(), attempted.join(", "))]
    Encoding {
        /// Encodings tried, in order
        attempted: Vec<String>,
        /// Upload being decoded
        context: Option<String>,
    },

    /// The content is malformed for its format
    #[error("Failed to parse {format}: {message}")]
    Parse {
        /// The format being parsed
        format: String,
        /// Description of the parse error
        message: String,
    },
}

/// Pipeline errors raised by the processors themselves.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Required input streams are absent
    #[error("Missing required input(s) for {format}: {}", missing.join(", "))]
    MissingInputs {
        /// Format tag
        format: String,
        /// Keys of the absent streams
        missing: Vec<String>,
    },

    /// A layer name was supplied but is blank
    #[error("Layer name must not be empty")]
    InvalidLayerName,

    /// The selected layer does not exist
    #[error("Layer '{layer}' not found. Available layers: {}", available.join(", "))]
    LayerNotFound {
        /// Requested layer
        layer: String,
        /// Layers present in the container
        available: Vec<String>,
    },

    /// Several layers exist and none was selected
    #[error("The upload contains {} layers; select one of: {}", available.len(), available.join(", "))]
    AmbiguousLayerSelection {
        /// Layers present in the container
        available: Vec<String>,
    },

    /// The container holds no feature layers
    #[error("No feature layers found in {format} upload")]
    NoLayersFound {
        /// Format tag
        format: String,
    },

    /// The declared CRS has no known transform to WGS 84
    #[error("Unsupported coordinate reference system '{crs}'")]
    UnsupportedCrs {
        /// Declared CRS
        crs: String,
    },

    /// Every record was skipped during extraction
    #[error("No usable features: all {total} record(s) failed extraction")]
    EmptyResult {
        /// Records present in the raw dataset
        total: usize,
    },
}

/// Persistence gateway errors.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// A layer with this name already exists
    #[error("A layer named '{name}' already exists")]
    DuplicateLayerName {
        /// Colliding name
        name: String,
    },

    /// The layer id is not known to the gateway
    #[error("Unknown layer id {id}")]
    UnknownLayer {
        /// Requested id
        id: u64,
    },
}

/// Stable, caller-facing classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Missing input streams, blank or unknown layer names
    ValidationError,
    /// CSV coordinate columns not found
    ColumnDetectionError,
    /// Upload is not JSON under any candidate encoding
    EncodingError,
    /// A geometry could not be repaired (per-record)
    GeometryRepairFailure,
    /// Several layers, none selected
    AmbiguousLayerSelection,
    /// Container without feature layers
    NoLayersFound,
    /// Zero features survived extraction
    EmptyResultError,
    /// Unregistered format tag
    UnknownFormat,
    /// Malformed or unreadable content
    ReadError,
    /// Declared CRS without a known transform
    UnsupportedCrs,
    /// Layer name collision at the persistence gateway
    DuplicateLayerName,
    /// Any other persistence failure
    PersistenceError,
}

impl ErrorKind {
    /// Returns the name of this kind as reported to callers.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ValidationError => "ValidationError",
            ErrorKind::ColumnDetectionError => "ColumnDetectionError",
            ErrorKind::EncodingError => "EncodingError",
            ErrorKind::GeometryRepairFailure => "GeometryRepairFailure",
            ErrorKind::AmbiguousLayerSelection => "AmbiguousLayerSelection",
            ErrorKind::NoLayersFound => "NoLayersFound",
            ErrorKind::EmptyResultError => "EmptyResultError",
            ErrorKind::UnknownFormat => "UnknownFormat",
            ErrorKind::ReadError => "ReadError",
            ErrorKind::UnsupportedCrs => "UnsupportedCrs",
            ErrorKind::DuplicateLayerName => "DuplicateLayerName",
            ErrorKind::PersistenceError => "PersistenceError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type alias for Results using `GeoIngestError`.
pub type Result<T> = std::result::Result<T, GeoIngestError>;

impl GeoIngestError {
    /// Classifies a failure returned by a format reader.
    ///
    /// Readers return `anyhow` errors wrapping a [`SpatialFormatReadError`];
    /// anything else stays [`GeoIngestError::Other`].
    #[must_use]
    pub fn from_reader(format: &str, err: anyhow::Error) -> Self {
        match err.downcast::<SpatialFormatReadError>() {
            Ok(read_error) => Self::from_read_error(format, read_error),
            Err(other) => Self::Other(other),
        }
    }

    /// Classifies a typed reader failure.
    #[must_use]
    pub fn from_read_error(format: &str, err: SpatialFormatReadError) -> Self {
        match err {
            SpatialFormatReadError::Io { source, context } => IoError::Read {
                format: format.to_string(),
                path: PathBuf::from(context.unwrap_or_else(|| "<upload>".to_string())),
                source: Box::new(source),
            }
            .into(),
            SpatialFormatReadError::ColumnDetection { missing, headers } => {
                FormatError::ColumnDetection { missing, headers }.into()
            },
            SpatialFormatReadError::Encoding { attempted, context } => {
                FormatError::Encoding { attempted, context }.into()
            },
            SpatialFormatReadError::NoLayers { .. } => PipelineError::NoLayersFound {
                format: format.to_string(),
            }
            .into(),
            SpatialFormatReadError::LayerNotFound { layer, available } => {
                PipelineError::LayerNotFound { layer, available }.into()
            },
            parse @ (SpatialFormatReadError::Parse { .. }
            | SpatialFormatReadError::Other { .. }) => {
                FormatError::Parse {
                    format: format.to_string(),
                    message: parse.to_string(),
                }
                .into()
            },
        }
    }

    /// Returns the caller-facing kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Driver(DriverError::UnknownFormat { .. }) => ErrorKind::UnknownFormat,
            Self::Io(_) | Self::Other(_) => ErrorKind::ReadError,
            Self::Format(e) => match e {
                FormatError::ColumnDetection { .. } => ErrorKind::ColumnDetectionError,
                FormatError::Encoding { .. } => ErrorKind::EncodingError,
                FormatError::Parse { .. } => ErrorKind::ReadError,
            },
            Self::Pipeline(e) => match e {
                PipelineError::MissingInputs { .. }
                | PipelineError::InvalidLayerName
                | PipelineError::LayerNotFound { .. } => ErrorKind::ValidationError,
                PipelineError::AmbiguousLayerSelection { .. } => {
                    ErrorKind::AmbiguousLayerSelection
                },
                PipelineError::NoLayersFound { .. } => ErrorKind::NoLayersFound,
                PipelineError::UnsupportedCrs { .. } => ErrorKind::UnsupportedCrs,
                PipelineError::EmptyResult { .. } => ErrorKind::EmptyResultError,
            },
            Self::Gateway(GatewayError::DuplicateLayerName { .. }) => {
                ErrorKind::DuplicateLayerName
            },
            Self::Gateway(GatewayError::UnknownLayer { .. }) => ErrorKind::PersistenceError,
        }
    }

    /// Layers a caller can choose from, for layer selection failures.
    #[must_use]
    pub fn available_layers(&self) -> Option<&[String]> {
        match self {
            Self::Pipeline(
                PipelineError::AmbiguousLayerSelection { available }
                | PipelineError::LayerNotFound { available, .. },
            ) => Some(available),
            _ => None,
        }
    }

    /// Get a user-friendly error message.
    ///
    /// This formats the error in a way that's helpful for end users,
    /// including context and actionable information.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Driver(e) => e.user_message(),
            Self::Pipeline(e) => e.user_message(),
            Self::Io(_) | Self::Format(_) | Self::Gateway(_) => self.to_string(),
            Self::Other(e) => format!("Error: {e}"),
        }
    }

    /// Get recovery suggestions if available.
    ///
    /// Returns helpful suggestions on how to fix or work around the error.
    #[must_use]
    pub fn recovery_suggestion(&self) -> Option<String> {
        match self {
            Self::Driver(_) => {
                Some("Use one of the formats returned by `drivers::get_driver_names`.".to_string())
            },
            Self::Format(e) => e.recovery_suggestion(),
            Self::Pipeline(e) => e.recovery_suggestion(),
            Self::Gateway(GatewayError::DuplicateLayerName { .. }) => {
                Some("Set `ProcessOptions::layer_name` to a name not yet stored.".to_string())
            },
            _ => None,
        }
    }

    /// Check if this error is potentially recoverable.
    ///
    /// Recoverable errors can be resolved by re-invoking with different
    /// options, such as selecting one of the offered layers.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Pipeline(PipelineError::AmbiguousLayerSelection { .. })
                | Self::Gateway(GatewayError::DuplicateLayerName { .. })
        )
    }
}

impl DriverError {
    fn user_message(&self) -> String {
        match self {
            Self::UnknownFormat { name, available } => {
                format!(
                    "Format '{name}' is not supported.\n\nAvailable formats:\n{}",
                    available
                        .split(", ")
                        .map(|d| format!("  - {d}"))
                        .collect::<Vec<_>>()
                        .join("\n")
                )
            },
        }
    }
}

impl FormatError {
    fn recovery_suggestion(&self) -> Option<String> {
        match self {
            Self::ColumnDetection { .. } => Some(
                "Name the coordinate columns with `ProcessOptions::lat_column` and \
                 `ProcessOptions::lon_column`."
                    .to_string(),
            ),
            Self::Encoding { .. } => {
                Some("Re-save the file as UTF-8 encoded GeoJSON.".to_string())
            },
            Self::Parse { .. } => Some("Check the file format and ensure it's valid.".to_string()),
        }
    }
}

impl PipelineError {
    fn user_message(&self) -> String {
        match self {
            Self::AmbiguousLayerSelection { available } => format!(
                "The upload contains several layers:\n{}",
                available
                    .iter()
                    .map(|layer| format!("  - {layer}"))
                    .collect::<Vec<_>>()
                    .join("\n")
            ),
            _ => self.to_string(),
        }
    }

    fn recovery_suggestion(&self) -> Option<String> {
        match self {
            Self::AmbiguousLayerSelection { .. } | Self::LayerNotFound { .. } => Some(
                "Set `ProcessOptions::selected_layer` to one of the available layers, or \
                 `ProcessOptions::process_all_layers` to process every layer."
                    .to_string(),
            ),
            Self::UnsupportedCrs { .. } => {
                Some("Reproject the data to EPSG:4326 before uploading.".to_string())
            },
            Self::MissingInputs { .. } => {
                Some("Supply every input listed by `drivers::required_inputs`.".to_string())
            },
            _ => None,
        }
    }
}

/// Helper to create `DriverError::UnknownFormat` listing the registered formats.
#[must_use]
pub fn unknown_format(name: &str) -> DriverError {
    use crate::drivers::get_driver_names;

    DriverError::UnknownFormat {
        name: name.to_string(),
        available: get_driver_names().join(", "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reader_errors_are_classified_by_kind() {
        let columns = anyhow::Error::new(SpatialFormatReadError::ColumnDetection {
            missing: vec!["latitude".into()],
            headers: vec!["id".into()],
        });
        assert_eq!(
            GeoIngestError::from_reader("csv", columns).kind(),
            ErrorKind::ColumnDetectionError
        );

        let encoding = SpatialFormatReadError::Encoding {
            attempted: vec!["utf-8".into()],
            context: None,
        };
        assert_eq!(
            GeoIngestError::from_read_error("geojson", encoding).kind(),
            ErrorKind::EncodingError
        );

        let missing = SpatialFormatReadError::LayerNotFound {
            layer: "x".into(),
            available: vec!["a".into()],
        };
        let err = GeoIngestError::from_read_error("geopackage", missing);
        assert_eq!(err.kind(), ErrorKind::ValidationError);
        assert_eq!(err.available_layers(), Some(&["a".to_string()][..]));

        let parse = SpatialFormatReadError::parse("bad header");
        let err = GeoIngestError::from_read_error("shapefile", parse);
        assert_eq!(err.kind(), ErrorKind::ReadError);
        assert!(err.to_string().contains("bad header"));
    }

    #[test]
    fn untyped_reader_errors_stay_other() {
        let err = GeoIngestError::from_reader("csv", anyhow::anyhow!("boom"));
        assert!(matches!(err, GeoIngestError::Other(_)));
    }

    #[test]
    fn only_layer_selection_and_duplicates_are_recoverable() {
        let ambiguous: GeoIngestError = PipelineError::AmbiguousLayerSelection {
            available: vec!["roads".into(), "buildings".into()],
        }
        .into();
        assert!(ambiguous.is_recoverable());
        assert!(ambiguous.user_message().contains("  - buildings"));
        assert!(ambiguous.recovery_suggestion().is_some());

        let empty: GeoIngestError = PipelineError::EmptyResult { total: 3 }.into();
        assert!(!empty.is_recoverable());
        assert_eq!(empty.kind(), ErrorKind::EmptyResultError);
    }

    #[test]
    fn suggestions_name_process_options() {
        let ambiguous: GeoIngestError = PipelineError::AmbiguousLayerSelection {
            available: vec!["roads".into()],
        }
        .into();
        let suggestion = ambiguous.recovery_suggestion().unwrap();
        assert!(suggestion.contains("ProcessOptions::selected_layer"));
        assert!(suggestion.contains("ProcessOptions::process_all_layers"));

        let columns: GeoIngestError = FormatError::ColumnDetection {
            missing: vec!["latitude".into()],
            headers: vec!["id".into()],
        }
        .into();
        assert!(columns.recovery_suggestion().unwrap().contains("ProcessOptions::lat_column"));

        let duplicate: GeoIngestError = GatewayError::DuplicateLayerName {
            name: "wells".into(),
        }
        .into();
        assert!(duplicate.recovery_suggestion().unwrap().contains("ProcessOptions::layer_name"));

        let unknown: GeoIngestError = unknown_format("kml").into();
        for err in [&ambiguous, &columns, &duplicate, &unknown] {
            assert!(!err.recovery_suggestion().unwrap().contains("--"));
        }
    }

    #[test]
    fn kinds_serialize_with_their_names() {
        let json = serde_json::to_string(&ErrorKind::EmptyResultError).unwrap();
        assert_eq!(json, "\"EmptyResultError\"");
        assert_eq!(ErrorKind::UnknownFormat.to_string(), "UnknownFormat");
    }

    #[test]
    fn unknown_format_lists_registered_formats() {
        let err = unknown_format("kml");
        let message = err.to_string();
        assert!(message.contains("kml"));
        assert!(message.contains("geopackage"));
    }
}
