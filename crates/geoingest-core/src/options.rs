//! Caller-supplied options for one processing call.

use serde::{Deserialize, Serialize};

/// Options that control one pipeline run.
///
/// Every field is optional; [`ProcessOptions::default`] processes the upload
/// with an inferred name and description.
///
/// # Examples
///
/// ```
/// use geoingest_core::options::ProcessOptions;
///
/// let options = ProcessOptions::default()
///     .with_layer_name("parcels")
///     .with_lat_column("y_coord")
///     .with_lon_column("x_coord");
/// assert_eq!(options.layer_name.as_deref(), Some("parcels"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessOptions {
    /// Name for the produced layer; inferred from the attributes when absent.
    pub layer_name: Option<String>,
    /// Description for the produced layer; generated when absent.
    pub description: Option<String>,
    /// Explicit CSV latitude column.
    pub lat_column: Option<String>,
    /// Explicit CSV longitude column.
    pub lon_column: Option<String>,
    /// `GeoPackage` layer to process.
    pub selected_layer: Option<String>,
    /// Process every `GeoPackage` layer.
    pub process_all_layers: bool,
    /// Metadata analyzer settings.
    pub analysis: AnalyzerConfig,
}

impl ProcessOptions {
    /// Sets the layer name.
    #[must_use]
    pub fn with_layer_name(mut self, name: impl Into<String>) -> Self {
        self.layer_name = Some(name.into());
        self
    }

    /// Sets the layer description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the CSV latitude column.
    #[must_use]
    pub fn with_lat_column(mut self, column: impl Into<String>) -> Self {
        self.lat_column = Some(column.into());
        self
    }

    /// Sets the CSV longitude column.
    #[must_use]
    pub fn with_lon_column(mut self, column: impl Into<String>) -> Self {
        self.lon_column = Some(column.into());
        self
    }

    /// Selects one `GeoPackage` layer.
    #[must_use]
    pub fn with_selected_layer(mut self, layer: impl Into<String>) -> Self {
        self.selected_layer = Some(layer.into());
        self
    }

    /// Processes every `GeoPackage` layer.
    #[must_use]
    pub fn with_process_all_layers(mut self, all: bool) -> Self {
        self.process_all_layers = all;
        self
    }

    /// Replaces the analyzer settings.
    #[must_use]
    pub fn with_analysis(mut self, analysis: AnalyzerConfig) -> Self {
        self.analysis = analysis;
        self
    }
}

/// Metadata analyzer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct AnalyzerConfig {
    /// Clustering runs only when the record count is strictly greater.
    pub cluster_threshold: usize,
    /// Upper bound on the number of clusters.
    pub max_clusters: usize,
    /// Clustering seed; `None` seeds from entropy.
    pub seed: Option<u64>,
    /// Lloyd iterations per k-means run.
    pub max_iterations: usize,
    /// Independent k-means runs; the lowest inertia wins.
    pub restarts: usize,
    /// Values sampled per attribute when scoring names.
    pub name_sample_size: usize,
    /// Maximum length of an inferred name.
    pub max_name_length: usize,
    /// Values sampled per text attribute for common terms.
    pub text_sample_size: usize,
    /// Common terms reported per text attribute.
    pub common_terms: usize,
    /// Infer a layer name when none is given.
    pub infer_name: bool,
    /// Generate a description when none is given.
    pub infer_description: bool,
    /// Run clustering on large datasets.
    pub run_clustering: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            cluster_threshold: 100,
            max_clusters: 5,
            seed: None,
            max_iterations: 300,
            restarts: 10,
            name_sample_size: 10,
            max_name_length: 50,
            text_sample_size: 10,
            common_terms: 5,
            infer_name: true,
            infer_description: true,
            run_clustering: true,
        }
    }
}

impl AnalyzerConfig {
    /// Fixes the clustering seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Enables or disables clustering.
    #[must_use]
    pub fn with_clustering(mut self, enabled: bool) -> Self {
        self.run_clustering = enabled;
        self
    }
}
