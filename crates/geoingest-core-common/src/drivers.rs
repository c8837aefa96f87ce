//! Format descriptors for the supported upload formats.
//!
//! A [`Driver`] describes one registered input format: the tag callers select
//! it by, a descriptive name, the file extensions it accepts and the named
//! input streams it needs. The registry itself lives in `geoingest-core`;
//! each format crate exports the descriptor for its own format.

/// A named input stream a driver consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputSpec {
    /// Stream identifier (e.g. `"file_shp"`).
    pub key: &'static str,
    /// Human readable description (e.g. `"Shape geometry file"`).
    pub description: &'static str,
    /// Whether validation fails without this stream.
    pub required: bool,
}

impl InputSpec {
    /// Declares a required input stream.
    #[must_use]
    pub const fn required(key: &'static str, description: &'static str) -> Self {
        Self {
            key,
            description,
            required: true,
        }
    }

    /// Declares an optional input stream.
    #[must_use]
    pub const fn optional(key: &'static str, description: &'static str) -> Self {
        Self {
            key,
            description,
            required: false,
        }
    }
}

/// Geospatial upload format definition.
///
/// A driver represents support for a specific input format (e.g. `GeoJSON`,
/// `Shapefile`). The short name is the format tag used for dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Driver {
    /// Format tag used for dispatch (e.g. `"shapefile"`).
    pub short_name: &'static str,
    /// Long descriptive name for display purposes (e.g. `"ESRI Shapefile"`).
    pub long_name: &'static str,
    /// File extensions, without the dot, that belong to this format.
    pub extensions: &'static [&'static str],
    /// Input streams this format consumes.
    pub inputs: &'static [InputSpec],
    /// Whether one upload may contain several layers.
    pub multi_layer: bool,
}

impl Driver {
    /// Creates a new driver definition.
    #[must_use]
    pub const fn new(
        short_name: &'static str,
        long_name: &'static str,
        extensions: &'static [&'static str],
        inputs: &'static [InputSpec],
        multi_layer: bool,
    ) -> Self {
        Self {
            short_name,
            long_name,
            extensions,
            inputs,
            multi_layer,
        }
    }

    /// Keys of the required input streams, in declaration order.
    #[must_use]
    pub fn required_inputs(&self) -> Vec<&'static str> {
        self.inputs
            .iter()
            .filter(|input| input.required)
            .map(|input| input.key)
            .collect()
    }

    /// Returns `true` if `extension` (with or without the leading dot)
    /// belongs to this format. The comparison ignores case.
    #[must_use]
    pub fn accepts_extension(&self, extension: &str) -> bool {
        let extension = extension.trim_start_matches('.');
        self.extensions
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(extension))
    }
}
