use std::error::Error as StdError;
use std::fmt;

/// A position within a source file, such as a CSV record.
///
/// All indices are 1-based where possible to align with human expectations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourcePosition {
    /// Line number in the source (1-based)
    pub line: Option<u64>,
    /// Column (field) number in the source (1-based)
    pub column: Option<u64>,
    /// Byte offset from the start of the source
    pub byte_offset: Option<u64>,
    /// Logical record number reported by the parser
    pub record: Option<u64>,
}

impl SourcePosition {
    /// Returns true when the position does not contain any location metadata.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.line.is_none()
            && self.column.is_none()
            && self.byte_offset.is_none()
            && self.record.is_none()
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();

        if let Some(line) = self.line {
            parts.push(format!("line {line}"));
        }
        if let Some(column) = self.column {
            parts.push(format!("column {column}"));
        }
        if let Some(record) = self.record {
            parts.push(format!("record {record}"));
        }
        if let Some(byte) = self.byte_offset {
            parts.push(format!("byte {byte}"));
        }

        if parts.is_empty() {
            write!(f, "unknown position")
        } else {
            write!(f, "{}", parts.join(", "))
        }
    }
}

/// Errors that can occur when reading an uploaded spatial format.
#[derive(Debug)]
pub enum SpatialFormatReadError {
    /// An underlying I/O failure occurred.
    Io {
        /// The originating error.
        source: std::io::Error,
        /// Optional context describing what was being read.
        context: Option<String>,
    },
    /// Parsing failed for the input source.
    Parse {
        /// Human readable description of the failure.
        message: String,
        /// Optional position describing where the failure occurred.
        position: Option<SourcePosition>,
        /// Optional context describing what was being read.
        context: Option<String>,
    },
    /// Latitude or longitude column could not be identified.
    ColumnDetection {
        /// Axes that could not be matched (`"latitude"`, `"longitude"`).
        missing: Vec<String>,
        /// Header names that were searched.
        headers: Vec<String>,
    },
    /// None of the candidate text encodings produced parseable content.
    Encoding {
        /// Encodings tried, in order.
        attempted: Vec<String>,
        /// Optional context describing what was being read.
        context: Option<String>,
    },
    /// A multi-layer container holds no feature layers.
    NoLayers {
        /// Optional context describing what was being read.
        context: Option<String>,
    },
    /// A requested layer does not exist in the container.
    LayerNotFound {
        /// Requested layer name.
        layer: String,
        /// Layers that do exist.
        available: Vec<String>,
    },
    /// Other error type not classified above.
    Other {
        /// Human readable description of the failure.
        message: String,
    },
}

impl SpatialFormatReadError {
    fn fmt_context(context: Option<&str>) -> String {
        context
            .map(|c| format!(" while reading {c}"))
            .unwrap_or_default()
    }

    fn fmt_position(position: Option<&SourcePosition>) -> String {
        position.map(|pos| format!(" at {pos}")).unwrap_or_default()
    }

    /// Wraps an I/O failure with a description of what was being accessed.
    #[must_use]
    pub fn io(source: std::io::Error, context: impl Into<String>) -> Self {
        SpatialFormatReadError::Io {
            source,
            context: Some(context.into()),
        }
    }

    /// Creates a parse error without position information.
    #[must_use]
    pub fn parse(message: impl Into<String>) -> Self {
        SpatialFormatReadError::Parse {
            message: message.into(),
            position: None,
            context: None,
        }
    }

    /// Attach additional context to the error, returning the updated error.
    #[must_use]
    pub fn with_additional_context(mut self, context: impl Into<String>) -> Self {
        let context = context.into();
        match &mut self {
            SpatialFormatReadError::Io {
                context: existing, ..
            }
            | SpatialFormatReadError::Parse {
                context: existing, ..
            }
            | SpatialFormatReadError::Encoding {
                context: existing, ..
            }
            | SpatialFormatReadError::NoLayers { context: existing } => match existing {
                Some(existing) if !existing.is_empty() => {
                    existing.push_str("; ");
                    existing.push_str(&context);
                },
                _ => *existing = Some(context),
            },
            SpatialFormatReadError::Other { message } => {
                message.push_str(" (");
                message.push_str(&context);
                message.push(')');
            },
            SpatialFormatReadError::ColumnDetection { .. }
            | SpatialFormatReadError::LayerNotFound { .. } => {},
        }
        self
    }
}

impl fmt::Display for SpatialFormatReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpatialFormatReadError::Io { source, context } => {
                write!(
                    f,
                    "I/O error{}: {source}",
                    Self::fmt_context(context.as_deref())
                )
            },
            SpatialFormatReadError::Parse {
                message,
                position,
                context,
            } => write!(
                f,
                "Parse error{}{}: {message}",
                Self::fmt_context(context.as_deref()),
                Self::fmt_position(position.as_ref())
            ),
            SpatialFormatReadError::ColumnDetection { missing, headers } => write!(
                f,
                "Could not detect {} column(s); available columns: {}",
                missing.join(" and "),
                headers.join(", ")
            ),
            SpatialFormatReadError::Encoding { attempted, context } => write!(
                f,
                "Encoding error{}: content is not valid JSON under any of {}",
                Self::fmt_context(context.as_deref()),
                attempted.join(", ")
            ),
            SpatialFormatReadError::NoLayers { context } => write!(
                f,
                "No feature layers found{}",
                Self::fmt_context(context.as_deref())
            ),
            SpatialFormatReadError::LayerNotFound { layer, available } => write!(
                f,
                "Layer '{layer}' not found; available layers: {}",
                available.join(", ")
            ),
            SpatialFormatReadError::Other { message } => f.write_str(message),
        }
    }
}

impl StdError for SpatialFormatReadError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            SpatialFormatReadError::Io { source, .. } => Some(source),
            SpatialFormatReadError::Parse { .. }
            | SpatialFormatReadError::ColumnDetection { .. }
            | SpatialFormatReadError::Encoding { .. }
            | SpatialFormatReadError::NoLayers { .. }
            | SpatialFormatReadError::LayerNotFound { .. }
            | SpatialFormatReadError::Other { .. } => None,
        }
    }
}

/// Result type alias that uses [`SpatialFormatReadError`].
pub type SpatialFormatResult<T> = Result<T, SpatialFormatReadError>;
