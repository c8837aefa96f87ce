//! Entry points for processing uploads and persisting the results.
//!
//! [`process`] resolves the format tag and runs its processor; [`persist`]
//! writes the extracted features of a successful result through a
//! [`LayerGateway`].

use geoingest_core_common::InputFiles;
use tracing::info;

use crate::error::Result;
use crate::gateway::LayerGateway;
use crate::options::ProcessOptions;
use crate::processor::get_processor;
use crate::types::ProcessingResult;

/// Processes one upload.
///
/// An unregistered format tag yields a failed result with error kind
/// `UnknownFormat`, like every other failure.
///
/// # Examples
///
/// ```
/// use geoingest_core::operations::process;
/// use geoingest_core::options::ProcessOptions;
/// use geoingest_core_common::{InputFile, InputFiles};
///
/// let inputs = InputFiles::new().with(
///     "file_geojson",
///     InputFile::new(r#"{"type": "Point", "coordinates": [1.0, 2.0, 50.0]}"#),
/// );
/// let result = process("geojson", &inputs, &ProcessOptions::default().with_layer_name("spot"));
///
/// assert!(result.success);
/// assert_eq!(result.geometry_type.as_deref(), Some("POINT"));
/// ```
#[must_use]
pub fn process(format: &str, inputs: &InputFiles, options: &ProcessOptions) -> ProcessingResult {
    match get_processor(format) {
        Ok(processor) => processor.process(inputs, options),
        Err(err) => ProcessingResult::failure(&err),
    }
}

/// Stores the layers of a successful result and returns their ids.
///
/// A process-all aggregate stores every successful sub-layer. A failed
/// result stores nothing.
///
/// # Errors
///
/// Returns the gateway's error, e.g.
/// [`GatewayError::DuplicateLayerName`](crate::error::GatewayError), and
/// stops at the first failure.
pub fn persist(result: &ProcessingResult, gateway: &mut impl LayerGateway) -> Result<Vec<u64>> {
    if !result.success {
        return Ok(Vec::new());
    }
    if !result.layer_results.is_empty() {
        let mut ids = Vec::new();
        for layer in &result.layer_results {
            ids.extend(persist(layer, &mut *gateway)?);
        }
        return Ok(ids);
    }

    let name = result.layer_name.as_deref().unwrap_or_default();
    let layer_id = gateway.create_layer(
        name,
        result.description.as_deref(),
        result.geometry_type.as_deref(),
    )?;
    for feature in &result.features {
        gateway.add_feature(layer_id, feature.geometry.clone(), feature.properties.clone())?;
    }
    info!("Stored {} features in layer '{name}'", result.features.len());
    Ok(vec![layer_id])
}
