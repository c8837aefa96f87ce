//! CSV table reading and per-column type inference.

use std::io::Cursor;

use anyhow::Result;
use geoingest_core_common::{
    AttributeValue, Crs, DatasetReader, Geometry, InputFiles, Properties, RawDataset, RawRecord,
    unique_column_names,
};
use geoingest_shared::{SourcePosition, SpatialFormatReadError};

use crate::INPUT_CSV;
use crate::columns::detect_coordinate_columns;
use crate::options::CsvReadOptions;

/// Cell contents that are read as missing values.
const NA_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Reads a point table from the `file_csv` input.
#[derive(Debug, Clone, Default)]
pub struct CsvReader {
    options: CsvReadOptions,
}

impl CsvReader {
    /// Creates a reader with the given options.
    #[must_use]
    pub fn new(options: CsvReadOptions) -> Self {
        Self { options }
    }

    /// Parses CSV bytes into a dataset of WGS 84 points.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialFormatReadError::Parse`] for malformed CSV and
    /// [`SpatialFormatReadError::ColumnDetection`] when no latitude or
    /// longitude column can be identified.
    pub fn read_bytes(&self, bytes: &[u8]) -> Result<RawDataset, SpatialFormatReadError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.options.delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(Cursor::new(bytes));

        let headers = unique_column_names(
            reader
                .headers()
                .map_err(|err| csv_error(&err, "header"))?
                .iter()
                .map(str::to_string)
                .collect(),
        );

        let columns = detect_coordinate_columns(
            &headers,
            self.options.lat_column.as_deref(),
            self.options.lon_column.as_deref(),
        )?;
        log::info!(
            "Using '{}' as latitude and '{}' as longitude",
            headers[columns.lat],
            headers[columns.lon]
        );

        let mut rows: Vec<csv::StringRecord> = Vec::new();
        for result in reader.records() {
            rows.push(result.map_err(|err| csv_error(&err, "record"))?);
        }

        let kinds: Vec<CellKind> = (0..headers.len())
            .map(|index| infer_column_kind(&rows, index))
            .collect();

        let records = rows
            .iter()
            .map(|row| {
                let geometry = point_geometry(row.get(columns.lon), row.get(columns.lat));
                let properties: Properties = headers
                    .iter()
                    .zip(&kinds)
                    .enumerate()
                    .map(|(index, (name, kind))| {
                        (name.clone(), convert_cell(row.get(index), *kind))
                    })
                    .collect();
                RawRecord::new(geometry, properties)
            })
            .collect();

        Ok(RawDataset::with_columns(
            Some(Crs::wgs84()),
            headers,
            records,
        ))
    }
}

impl DatasetReader for CsvReader {
    fn read_dataset(&self, inputs: &InputFiles) -> Result<RawDataset> {
        let input = inputs.require(INPUT_CSV)?;
        let context = input.file_name.as_deref().unwrap_or(INPUT_CSV);
        Ok(self
            .read_bytes(&input.bytes)
            .map_err(|err| err.with_additional_context(context))?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellKind {
    Integer,
    Float,
    Boolean,
    Text,
}

fn is_na(cell: &str) -> bool {
    NA_TOKENS.contains(&cell.trim())
}

fn parse_bool(cell: &str) -> Option<bool> {
    if cell.eq_ignore_ascii_case("true") {
        Some(true)
    } else if cell.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Narrowest kind that every present cell of the column parses as.
fn infer_column_kind(rows: &[csv::StringRecord], index: usize) -> CellKind {
    let present = || {
        rows.iter()
            .filter_map(move |row| row.get(index))
            .map(str::trim)
            .filter(|cell| !is_na(cell))
    };

    if present().next().is_none() {
        return CellKind::Text;
    }
    if present().all(|cell| cell.parse::<i64>().is_ok()) {
        CellKind::Integer
    } else if present().all(|cell| cell.parse::<f64>().is_ok()) {
        CellKind::Float
    } else if present().all(|cell| parse_bool(cell).is_some()) {
        CellKind::Boolean
    } else {
        CellKind::Text
    }
}

fn convert_cell(cell: Option<&str>, kind: CellKind) -> AttributeValue {
    let Some(raw) = cell else {
        return AttributeValue::Null;
    };
    if is_na(raw) {
        return AttributeValue::Null;
    }
    let trimmed = raw.trim();
    match kind {
        CellKind::Integer => trimmed
            .parse()
            .map_or(AttributeValue::Null, AttributeValue::Integer),
        CellKind::Float => trimmed
            .parse()
            .map_or(AttributeValue::Null, AttributeValue::Float),
        CellKind::Boolean => parse_bool(trimmed).map_or(AttributeValue::Null, AttributeValue::Bool),
        CellKind::Text => AttributeValue::Text(raw.to_string()),
    }
}

fn point_geometry(lon: Option<&str>, lat: Option<&str>) -> Option<Geometry> {
    let parse = |cell: Option<&str>| {
        cell.and_then(|value| value.trim().parse::<f64>().ok())
            .filter(|value| value.is_finite())
    };
    let (lon, lat) = (parse(lon)?, parse(lat)?);
    Some(Geometry::Point(vec![lon, lat]))
}

fn csv_error(err: &csv::Error, what: &str) -> SpatialFormatReadError {
    let position = err.position().map(|pos| SourcePosition {
        line: Some(pos.line()),
        byte_offset: Some(pos.byte()),
        record: Some(pos.record()),
        ..SourcePosition::default()
    });
    SpatialFormatReadError::Parse {
        message: format!("invalid CSV {what}: {err}"),
        position,
        context: None,
    }
}
