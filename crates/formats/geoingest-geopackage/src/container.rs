//! Read-only access to a staged `GeoPackage` container.

use geoingest_core_common::{AttributeValue, Crs, InputFile, Properties, RawDataset, RawRecord};
use geoingest_shared::{SpatialFormatReadError, SpatialFormatResult, StagingArea};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteRow};
use sqlx::{Column, ConnectOptions, Connection, Row, TypeInfo, ValueRef};
use tokio::runtime::Runtime;

use crate::blob::decode_geometry;

const STAGED_FILE: &str = "upload.gpkg";

/// An opened `GeoPackage` upload.
///
/// The container is staged to a temporary file for the lifetime of this
/// value. Queries run to completion on a private single-threaded runtime, so
/// every method blocks the calling thread. Must not be used from within an
/// async context.
pub struct GeoPackage {
    conn: Option<SqliteConnection>,
    runtime: Runtime,
    name: String,
    // Dropped last so the database file outlives the connection.
    _staging: StagingArea,
}

/// Geometry column metadata of one feature layer.
#[derive(Debug, Clone)]
struct GeometryColumn {
    name: String,
    srs_id: i64,
}

impl GeoPackage {
    /// Stages and opens an uploaded container.
    ///
    /// # Errors
    ///
    /// Returns an error if staging fails or the upload is not an `SQLite`
    /// database.
    pub fn open(input: &InputFile) -> SpatialFormatResult<Self> {
        let name = input
            .file_name
            .clone()
            .unwrap_or_else(|| STAGED_FILE.to_string());
        let staging = StagingArea::new("geoingest-gpkg-")?;
        let path = staging.write(STAGED_FILE, &input.bytes)?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|err| SpatialFormatReadError::io(err, "GeoPackage query runtime"))?;

        let options = SqliteConnectOptions::new()
            .filename(&path)
            .read_only(true)
            .create_if_missing(false);
        let conn = runtime
            .block_on(options.connect())
            .map_err(|err| sql_error(&err, "open").with_additional_context(name.clone()))?;
        log::debug!("Opened GeoPackage {name}");

        Ok(Self {
            conn: Some(conn),
            runtime,
            name,
            _staging: staging,
        })
    }

    fn parts(&mut self) -> SpatialFormatResult<(&Runtime, &mut SqliteConnection)> {
        let conn = self.conn.as_mut().ok_or_else(|| SpatialFormatReadError::Other {
            message: "GeoPackage connection is closed".to_string(),
        })?;
        Ok((&self.runtime, conn))
    }

    /// Lists the feature layers, in registration order.
    ///
    /// # Errors
    ///
    /// Returns a parse error if the container lacks `gpkg_contents`.
    pub fn layers(&mut self) -> SpatialFormatResult<Vec<String>> {
        let name = self.name.clone();
        let (runtime, conn) = self.parts()?;

        let layers: Vec<String> = runtime
            .block_on(
                sqlx::query_scalar::<_, String>(
                    "SELECT table_name FROM gpkg_contents WHERE data_type = 'features' ORDER BY rowid",
                )
                .fetch_all(conn),
            )
            .map_err(|err| sql_error(&err, "gpkg_contents").with_additional_context(name))?;
        log::debug!("GeoPackage lists {} feature layers", layers.len());
        Ok(layers)
    }

    /// Reads every feature of `layer`.
    ///
    /// The integer primary key column is not an attribute; the geometry
    /// column becomes the record geometry. Blobs that cannot be decoded yield
    /// records without geometry.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialFormatReadError::LayerNotFound`] if `layer` is not a
    /// registered feature layer, or a parse error if its tables are malformed.
    pub fn read_layer(&mut self, layer: &str) -> SpatialFormatResult<RawDataset> {
        let available = self.layers()?;
        if !available.iter().any(|candidate| candidate == layer) {
            return Err(SpatialFormatReadError::LayerNotFound {
                layer: layer.to_string(),
                available,
            });
        }

        let context = format!("{} layer '{layer}'", self.name);
        let (runtime, conn) = self.parts()?;

        let geometry_column: Option<GeometryColumn> = runtime
            .block_on(
                sqlx::query_as::<_, (String, i64)>(
                    "SELECT column_name, srs_id FROM gpkg_geometry_columns WHERE table_name = ?1",
                )
                .bind(layer)
                .fetch_optional(&mut *conn),
            )
            .map_err(|err| sql_error(&err, "gpkg_geometry_columns"))?
            .map(|(name, srs_id)| GeometryColumn { name, srs_id });

        let crs = match &geometry_column {
            Some(column) => runtime.block_on(lookup_crs(conn, column.srs_id))?,
            None => None,
        };

        let primary_keys: Vec<String> = runtime
            .block_on(
                sqlx::query_scalar::<_, String>(
                    "SELECT name FROM pragma_table_info(?1) WHERE pk > 0",
                )
                .bind(layer)
                .fetch_all(&mut *conn),
            )
            .map_err(|err| sql_error(&err, "table_info"))?;

        let columns: Vec<String> = runtime
            .block_on(
                sqlx::query_scalar::<_, String>(
                    "SELECT name FROM pragma_table_info(?1) ORDER BY cid",
                )
                .bind(layer)
                .fetch_all(&mut *conn),
            )
            .map_err(|err| sql_error(&err, "table_info"))?
            .into_iter()
            .filter(|column: &String| {
                !primary_keys.contains(column)
                    && geometry_column
                        .as_ref()
                        .is_none_or(|geometry| &geometry.name != column)
            })
            .collect();

        let query = format!("SELECT * FROM {}", quote_identifier(layer));
        let rows: Vec<SqliteRow> = runtime
            .block_on(sqlx::query(&query).fetch_all(&mut *conn))
            .map_err(|err| sql_error(&err, "features").with_additional_context(context.clone()))?;

        let records = rows
            .iter()
            .enumerate()
            .map(|(index, row)| {
                read_row(row, index, geometry_column.as_ref(), &columns, &context)
            })
            .collect::<SpatialFormatResult<Vec<_>>>()?;

        log::info!("Read {} features from {context}", records.len());
        Ok(RawDataset::with_columns(crs, columns, records))
    }

    /// Closes the connection; the staged file is removed when `self` drops.
    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(conn) = self.conn.take()
            && let Err(err) = self.runtime.block_on(conn.close())
        {
            log::warn!("Failed to close GeoPackage {}: {err}", self.name);
        }
    }
}

impl Drop for GeoPackage {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for GeoPackage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeoPackage")
            .field("name", &self.name)
            .field("open", &self.conn.is_some())
            .finish_non_exhaustive()
    }
}

/// Resolves a `GeoPackage` SRS id; `0` and `-1` are the undefined systems.
async fn lookup_crs(conn: &mut SqliteConnection, srs_id: i64) -> SpatialFormatResult<Option<Crs>> {
    if srs_id == 0 || srs_id == -1 {
        return Ok(None);
    }
    let row: Option<(String, i64, Option<String>)> = sqlx::query_as(
        "SELECT organization, organization_coordsys_id, definition FROM gpkg_spatial_ref_sys WHERE srs_id = ?1",
    )
    .bind(srs_id)
    .fetch_optional(conn)
    .await
    .map_err(|err| sql_error(&err, "gpkg_spatial_ref_sys"))?;

    Ok(row.map(|(organization, code, definition)| {
        match u32::try_from(code) {
            Ok(code) if organization.eq_ignore_ascii_case("EPSG") => Crs::Epsg(code),
            _ => definition
                .filter(|wkt| !wkt.trim().is_empty() && wkt.trim() != "undefined")
                .map_or_else(|| Crs::Named(format!("{organization}:{code}")), |wkt| {
                    Crs::from_wkt(&wkt)
                }),
        }
    }))
}

fn read_row(
    row: &SqliteRow,
    index: usize,
    geometry_column: Option<&GeometryColumn>,
    columns: &[String],
    context: &str,
) -> SpatialFormatResult<RawRecord> {
    let mut geometry = None;
    let mut properties = Properties::new();

    for (ordinal, column) in row.columns().iter().enumerate() {
        let name = column.name();
        if geometry_column.is_some_and(|geometry| geometry.name == name) {
            geometry = match read_value(row, ordinal, column.type_info().name())? {
                AttributeValue::Binary(blob) => decode_geometry(&blob).unwrap_or_else(|err| {
                    log::warn!(
                        "Feature {} of {context} has an unreadable geometry: {err}",
                        index + 1
                    );
                    None
                }),
                AttributeValue::Null => None,
                other => {
                    log::warn!(
                        "Feature {} of {context} stores a non-blob geometry ({other})",
                        index + 1
                    );
                    None
                },
            };
        } else if columns.iter().any(|candidate| candidate == name) {
            properties.insert(
                name.to_string(),
                read_value(row, ordinal, column.type_info().name())?,
            );
        }
    }

    Ok(RawRecord::new(geometry, properties))
}

/// Reads one cell by its storage class; `BOOLEAN` columns map integers to
/// booleans.
fn read_value(
    row: &SqliteRow,
    ordinal: usize,
    declared_type: &str,
) -> SpatialFormatResult<AttributeValue> {
    let raw = row
        .try_get_raw(ordinal)
        .map_err(|err| sql_error(&err, "feature row"))?;
    if raw.is_null() {
        return Ok(AttributeValue::Null);
    }
    let storage = raw.type_info().name().to_ascii_uppercase();

    let value = match storage.as_str() {
        "INTEGER" | "BOOLEAN" | "INT" | "INT8" | "BIGINT" => {
            let value: i64 = row
                .try_get_unchecked(ordinal)
                .map_err(|err| sql_error(&err, "integer cell"))?;
            if declared_type.eq_ignore_ascii_case("BOOLEAN") {
                AttributeValue::Bool(value != 0)
            } else {
                AttributeValue::Integer(value)
            }
        },
        "REAL" | "FLOAT" | "DOUBLE" => AttributeValue::Float(
            row.try_get_unchecked(ordinal)
                .map_err(|err| sql_error(&err, "real cell"))?,
        ),
        "BLOB" => AttributeValue::Binary(
            row.try_get_unchecked(ordinal)
                .map_err(|err| sql_error(&err, "blob cell"))?,
        ),
        _ => AttributeValue::Text(
            row.try_get_unchecked(ordinal)
                .map_err(|err| sql_error(&err, "text cell"))?,
        ),
    };
    Ok(value)
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn sql_error(err: &sqlx::Error, what: &str) -> SpatialFormatReadError {
    SpatialFormatReadError::Parse {
        message: format!("failed to read {what}: {err}"),
        position: None,
        context: None,
    }
}
