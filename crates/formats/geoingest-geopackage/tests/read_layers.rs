use std::path::Path;

use anyhow::Result;
use geoingest_core_common::{AttributeValue, Crs, Geometry, InputFile};
use geoingest_geopackage::GeoPackage;
use geoingest_shared::SpatialFormatReadError;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::{ConnectOptions, Connection};

const SCHEMA: &str = r#"
CREATE TABLE gpkg_spatial_ref_sys (
    srs_name TEXT NOT NULL, srs_id INTEGER PRIMARY KEY, organization TEXT NOT NULL,
    organization_coordsys_id INTEGER NOT NULL, definition TEXT NOT NULL, description TEXT);
CREATE TABLE gpkg_contents (
    table_name TEXT NOT NULL PRIMARY KEY, data_type TEXT NOT NULL, identifier TEXT UNIQUE,
    description TEXT DEFAULT '', last_change DATETIME, min_x DOUBLE, min_y DOUBLE,
    max_x DOUBLE, max_y DOUBLE, srs_id INTEGER);
CREATE TABLE gpkg_geometry_columns (
    table_name TEXT NOT NULL, column_name TEXT NOT NULL, geometry_type_name TEXT NOT NULL,
    srs_id INTEGER NOT NULL, z TINYINT NOT NULL, m TINYINT NOT NULL);
INSERT INTO gpkg_spatial_ref_sys VALUES ('Undefined geographic SRS', 0, 'NONE', 0, 'undefined', NULL);
INSERT INTO gpkg_spatial_ref_sys VALUES ('WGS 84', 4326, 'EPSG', 4326, 'GEOGCS["WGS 84"]', NULL);
INSERT INTO gpkg_spatial_ref_sys VALUES ('WGS 84 / Pseudo-Mercator', 3857, 'EPSG', 3857, 'PROJCS["WGS 84 / Pseudo-Mercator"]', NULL);
"#;

fn point_blob(x: f64, y: f64) -> Vec<u8> {
    let mut blob = vec![b'G', b'P', 0, 0b0000_0001];
    blob.extend_from_slice(&4326_i32.to_le_bytes());
    blob.push(1);
    blob.extend_from_slice(&1_u32.to_le_bytes());
    blob.extend_from_slice(&x.to_le_bytes());
    blob.extend_from_slice(&y.to_le_bytes());
    blob
}

/// Creates a container with one point layer per `(name, srs_id)` entry,
/// each holding three features.
fn write_geopackage(path: &Path, layers: &[(&str, i64)]) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async {
        let mut conn: SqliteConnection = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .connect()
            .await?;
        sqlx::raw_sql(SCHEMA).execute(&mut conn).await?;

        for &(name, srs_id) in layers {
            sqlx::query(
                "INSERT INTO gpkg_contents (table_name, data_type, srs_id) \
                 VALUES (?1, 'features', ?2)",
            )
            .bind(name)
            .bind(srs_id)
            .execute(&mut conn)
            .await?;
            sqlx::query("INSERT INTO gpkg_geometry_columns VALUES (?1, 'geom', 'POINT', ?2, 0, 0)")
                .bind(name)
                .bind(srs_id)
                .execute(&mut conn)
                .await?;
            sqlx::raw_sql(&format!(
                "CREATE TABLE {name} (fid INTEGER PRIMARY KEY AUTOINCREMENT, geom BLOB, label TEXT, lanes INTEGER, lit BOOLEAN, width REAL)"
            ))
            .execute(&mut conn)
            .await?;
            for i in 0..3_i64 {
                #[allow(clippy::cast_precision_loss)]
                let coordinate = i as f64;
                sqlx::query(&format!(
                    "INSERT INTO {name} (geom, label, lanes, lit, width) VALUES (?1, ?2, ?3, ?4, ?5)"
                ))
                .bind(point_blob(coordinate, coordinate + 0.5))
                .bind(format!("{name} {i}"))
                .bind(i + 1)
                .bind(i % 2 == 0)
                .bind(if i == 1 { None } else { Some(3.5) })
                .execute(&mut conn)
                .await?;
            }
        }
        conn.close().await?;
        Ok::<_, anyhow::Error>(())
    })
}

fn upload(path: &Path) -> Result<InputFile> {
    InputFile::from_path(path)
}

#[test]
fn lists_layers_in_registration_order() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("city.gpkg");
    write_geopackage(&path, &[("roads", 4326), ("buildings", 4326)])?;

    let mut package = GeoPackage::open(&upload(&path)?)?;

    assert_eq!(package.layers()?, ["roads", "buildings"]);
    Ok(())
}

#[test]
fn reads_layer_without_primary_key_and_with_typed_values() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("city.gpkg");
    write_geopackage(&path, &[("roads", 3857)])?;

    let mut package = GeoPackage::open(&upload(&path)?)?;
    let dataset = package.read_layer("roads")?;
    package.close();

    assert_eq!(dataset.crs, Some(Crs::Epsg(3857)));
    assert_eq!(dataset.len(), 3);
    let names: Vec<_> = dataset.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["label", "lanes", "lit", "width"]);

    let second = &dataset.records[1];
    assert_eq!(second.geometry, Some(Geometry::Point(vec![1.0, 1.5])));
    assert_eq!(
        second.properties["label"],
        AttributeValue::Text("roads 1".to_string())
    );
    assert_eq!(second.properties["lanes"], AttributeValue::Integer(2));
    assert_eq!(second.properties["lit"], AttributeValue::Bool(false));
    assert_eq!(second.properties["width"], AttributeValue::Null);
    Ok(())
}

#[test]
fn undefined_srs_declares_no_crs() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("plain.gpkg");
    write_geopackage(&path, &[("sites", 0)])?;

    let mut package = GeoPackage::open(&upload(&path)?)?;

    assert_eq!(package.read_layer("sites")?.crs, None);
    Ok(())
}

#[test]
fn unknown_layer_lists_available_layers() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("city.gpkg");
    write_geopackage(&path, &[("roads", 4326)])?;

    let mut package = GeoPackage::open(&upload(&path)?)?;
    let err = package.read_layer("rivers").unwrap_err();

    match err {
        SpatialFormatReadError::LayerNotFound { layer, available } => {
            assert_eq!(layer, "rivers");
            assert_eq!(available, ["roads"]);
        },
        other => panic!("unexpected error: {other}"),
    }
    Ok(())
}

#[test]
fn empty_container_lists_no_layers() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("empty.gpkg");
    write_geopackage(&path, &[])?;

    let mut package = GeoPackage::open(&upload(&path)?)?;

    assert!(package.layers()?.is_empty());
    Ok(())
}
