//! Reader seam between the format crates and the core pipeline.

use crate::inputs::InputFiles;
use crate::model::RawDataset;

/// Loads a [`RawDataset`] from a set of named input streams.
///
/// Implementations live in the format crates. Errors are returned as
/// `anyhow::Error` wrapping the format crate's typed error so callers can
/// downcast to classify them.
pub trait DatasetReader: Send + Sync {
    /// Reads every record of the dataset described by `inputs`.
    ///
    /// # Errors
    ///
    /// Returns an error if a required stream is missing or its content cannot
    /// be decoded.
    fn read_dataset(&self, inputs: &InputFiles) -> anyhow::Result<RawDataset>;
}
