//! Staging and reading of shapefile bundles.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use geoingest_core_common::{
    AttributeValue, Crs, DatasetReader, InputFile, InputFiles, Properties, RawDataset, RawRecord,
};
use geoingest_shared::{SpatialFormatReadError, SpatialFormatResult, StagingArea};
use shapefile::dbase::{self, FieldValue};

use crate::convert::{field_value, shape_to_geometry};
use crate::{INPUT_DBF, INPUT_PRJ, INPUT_SHP, INPUT_SHX};

const DEFAULT_BASENAME: &str = "layer";

/// Reads a shapefile bundle from the `file_shp`, `file_shx`, `file_dbf` and
/// optional `file_prj` inputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShapefileReader;

impl ShapefileReader {
    /// Stages the companion streams under a common basename and reads them.
    ///
    /// The staging directory is removed before this returns, whether or not
    /// the read succeeded.
    ///
    /// # Errors
    ///
    /// Returns an error if a required stream is missing, staging fails or the
    /// bundle cannot be parsed.
    pub fn read_inputs(&self, inputs: &InputFiles) -> Result<RawDataset> {
        let shp = inputs.require(INPUT_SHP)?;
        let shx = inputs.require(INPUT_SHX)?;
        let dbf = inputs.require(INPUT_DBF)?;

        let basename = staged_basename(shp);
        let staging = StagingArea::new("geoingest-shp-")?;
        let shp_path = staging.write(&format!("{basename}.shp"), &shp.bytes)?;
        staging.write(&format!("{basename}.shx"), &shx.bytes)?;
        let dbf_path = staging.write(&format!("{basename}.dbf"), &dbf.bytes)?;

        let crs = match inputs.get(INPUT_PRJ) {
            Some(prj) => {
                let wkt = String::from_utf8_lossy(&prj.bytes);
                let crs = Crs::from_wkt(&wkt);
                log::debug!("Projection file declares {crs}");
                Some(crs)
            },
            None => None,
        };

        let dataset = read_bundle(&shp_path, &dbf_path, crs)
            .map_err(|err| err.with_additional_context(format!("{basename}.shp")))?;
        log::info!(
            "Read {} records from shapefile '{basename}'",
            dataset.len()
        );
        Ok(dataset)
    }
}

impl DatasetReader for ShapefileReader {
    fn read_dataset(&self, inputs: &InputFiles) -> Result<RawDataset> {
        self.read_inputs(inputs)
    }
}

/// Basename shared by the staged companion files: the geometry file's stem
/// with anything but letters, digits, `-`, `_` and `.` replaced by `_`.
fn staged_basename(shp: &InputFile) -> String {
    shp.stem()
        .map(|stem| {
            stem.chars()
                .map(|c| {
                    if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
                        c
                    } else {
                        '_'
                    }
                })
                .collect::<String>()
        })
        .filter(|stem| !stem.trim_matches('.').is_empty())
        .unwrap_or_else(|| DEFAULT_BASENAME.to_string())
}

fn read_bundle(shp: &Path, dbf: &Path, crs: Option<Crs>) -> SpatialFormatResult<RawDataset> {
    let columns: Vec<String> = dbase::Reader::from_path(dbf)
        .map_err(|err| SpatialFormatReadError::parse(format!("invalid attribute table: {err}")))?
        .fields()
        .iter()
        .map(|field| field.name().to_string())
        .filter(|name| name != "DeletionFlag")
        .collect();

    let mut reader = shapefile::Reader::from_path(shp)
        .map_err(|err| SpatialFormatReadError::parse(format!("invalid shapefile: {err}")))?;

    let mut records = Vec::new();
    for (index, result) in reader.iter_shapes_and_records().enumerate() {
        let (shape, record) = result.map_err(|err| {
            SpatialFormatReadError::parse(format!("record {}: {err}", index + 1))
        })?;
        let mut values: HashMap<String, FieldValue> = record.into();
        let mut properties: Properties = columns
            .iter()
            .map(|name| {
                let value = values.remove(name).map_or(AttributeValue::Null, field_value);
                (name.clone(), value)
            })
            .collect();
        for (name, value) in values {
            properties.insert(name, field_value(value));
        }
        records.push(RawRecord::new(shape_to_geometry(shape), properties));
    }

    Ok(RawDataset::with_columns(crs, columns, records))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basename_comes_from_geometry_file_name() {
        let named = InputFile::new(Vec::new()).with_file_name("city parks.shp");
        assert_eq!(staged_basename(&named), "city_parks");

        let unnamed = InputFile::new(Vec::new());
        assert_eq!(staged_basename(&unnamed), "layer");

        let hostile = InputFile::new(Vec::new()).with_file_name("../../etc.shp");
        assert_eq!(staged_basename(&hostile), ".._.._etc");
    }
}
