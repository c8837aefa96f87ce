//! [`DatasetReader`] implementation for `GeoJSON` uploads.

use anyhow::Result;
use geoingest_core_common::{DatasetReader, InputFiles, RawDataset};
use geoingest_shared::SpatialFormatResult;

use crate::INPUT_GEOJSON;
use crate::encoding::decode_json;
use crate::parser::parse_documents;

/// Reads the `file_geojson` input.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoJsonReader;

impl GeoJsonReader {
    /// Decodes and parses raw upload bytes.
    ///
    /// # Errors
    ///
    /// Returns an encoding error when the bytes are not JSON under any
    /// candidate encoding, or a parse error when the JSON is not `GeoJSON`.
    pub fn read_bytes(&self, bytes: &[u8]) -> SpatialFormatResult<RawDataset> {
        let (encoding, documents) = decode_json(bytes)?;
        log::info!("Reading GeoJSON decoded as {encoding}");
        parse_documents(documents)
    }
}

impl DatasetReader for GeoJsonReader {
    fn read_dataset(&self, inputs: &InputFiles) -> Result<RawDataset> {
        let input = inputs.require(INPUT_GEOJSON)?;
        let context = input.file_name.as_deref().unwrap_or(INPUT_GEOJSON);
        Ok(self
            .read_bytes(&input.bytes)
            .map_err(|err| err.with_additional_context(context))?)
    }
}
