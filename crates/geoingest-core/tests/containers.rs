use std::path::Path;

use anyhow::Result;
use geoingest_core::gateway::MemoryGateway;
use geoingest_core::operations::{persist, process};
use geoingest_core::standardize::is_valid;
use geoingest_core::{ErrorKind, ProcessOptions};
use geoingest_core_common::{Geometry, InputFile, InputFiles};
use shapefile::dbase::{FieldValue, Record, TableWriterBuilder};
use shapefile::{Point, Polygon, PolygonRing};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::{ConnectOptions, Connection};

const GPKG_SCHEMA: &str = r#"
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
INSERT INTO gpkg_spatial_ref_sys VALUES ('WGS 84', 4326, 'EPSG', 4326, 'GEOGCS["WGS 84"]', NULL);
"#;

fn ring(points: &[(f64, f64)]) -> Vec<Point> {
    points.iter().map(|&(x, y)| Point::new(x, y)).collect()
}

fn parcel(x: f64) -> Polygon {
    Polygon::new(PolygonRing::Outer(ring(&[
        (x, 0.0),
        (x, 1.0),
        (x + 1.0, 1.0),
        (x + 1.0, 0.0),
        (x, 0.0),
    ])))
}

fn bowtie(x: f64) -> Polygon {
    Polygon::new(PolygonRing::Outer(ring(&[
        (x, 0.0),
        (x + 2.0, 2.0),
        (x + 2.0, 0.0),
        (x, 2.0),
        (x, 0.0),
    ])))
}

fn parcel_record(owner: &str) -> Record {
    let mut record = Record::default();
    record.insert("owner".to_string(), FieldValue::Character(Some(owner.to_string())));
    record
}

fn shapefile_bundle(dir: &Path) -> Result<InputFiles> {
    let path = dir.join("parcels.shp");
    let table = TableWriterBuilder::new().add_character_field("owner".try_into().unwrap(), 32);
    let mut writer = shapefile::Writer::from_path(&path, table)?;
    for i in 0..5 {
        let x = f64::from(i) * 3.0;
        writer.write_shape_and_record(&parcel(x), &parcel_record("county"))?;
    }
    writer.write_shape_and_record(&bowtie(20.0), &parcel_record("private"))?;
    drop(writer);

    let read = |ext: &str| InputFile::from_path(dir.join(format!("parcels.{ext}")));
    Ok(InputFiles::new()
        .with("file_shp", read("shp")?)
        .with("file_shx", read("shx")?)
        .with("file_dbf", read("dbf")?))
}

fn point_blob(x: f64, y: f64) -> Vec<u8> {
    let mut blob = vec![b'G', b'P', 0, 0b0000_0001];
    blob.extend_from_slice(&4326_i32.to_le_bytes());
    blob.push(1);
    blob.extend_from_slice(&1_u32.to_le_bytes());
    blob.extend_from_slice(&x.to_le_bytes());
    blob.extend_from_slice(&y.to_le_bytes());
    blob
}

/// Writes a container with one point layer per name, `features` points each.
fn geopackage(path: &Path, layers: &[(&str, usize)]) -> Result<InputFiles> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async {
        let mut conn: SqliteConnection = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .connect()
            .await?;
        sqlx::raw_sql(GPKG_SCHEMA).execute(&mut conn).await?;

        for &(name, features) in layers {
            sqlx::query(
                "INSERT INTO gpkg_contents (table_name, data_type, srs_id) \
                 VALUES (?1, 'features', 4326)",
            )
            .bind(name)
            .execute(&mut conn)
            .await?;
            sqlx::query(
                "INSERT INTO gpkg_geometry_columns VALUES (?1, 'geom', 'POINT', 4326, 0, 0)",
            )
            .bind(name)
            .execute(&mut conn)
            .await?;
            sqlx::raw_sql(&format!(
                "CREATE TABLE {name} (fid INTEGER PRIMARY KEY AUTOINCREMENT, geom BLOB, kind TEXT)"
            ))
            .execute(&mut conn)
            .await?;
            for i in 0..features {
                #[allow(clippy::cast_precision_loss)]
                let coordinate = i as f64;
                sqlx::query(&format!("INSERT INTO {name} (geom, kind) VALUES (?1, ?2)"))
                    .bind(point_blob(coordinate, coordinate))
                    .bind(format!("{name} segment"))
                    .execute(&mut conn)
                    .await?;
            }
        }
        conn.close().await?;
        Ok::<_, anyhow::Error>(())
    })?;
    Ok(InputFiles::new().with("file_gpkg", InputFile::from_path(path)?))
}

#[test]
fn shapefile_with_one_bowtie_keeps_every_record() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let inputs = shapefile_bundle(dir.path())?;

    let options = ProcessOptions::default().with_layer_name("parcels");
    let result = process("shapefile", &inputs, &options);

    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.total_record_count, 6);
    assert_eq!(result.feature_count, 6);
    assert!(result.skipped_records.is_empty());
    assert!(result.features.iter().all(|feature| is_valid(&feature.geometry)));
    assert!(matches!(
        result.features[5].geometry,
        Geometry::Polygon(_) | Geometry::MultiPolygon(_)
    ));
    assert_eq!(result.crs.as_deref(), Some("EPSG:4326"));
    Ok(())
}

#[test]
fn shapefile_without_index_fails_validation() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut inputs = shapefile_bundle(dir.path())?;
    inputs = InputFiles::new()
        .with("file_shp", inputs.require("file_shp")?.clone())
        .with("file_dbf", inputs.require("file_dbf")?.clone());

    let result = process("shapefile", &inputs, &ProcessOptions::default());

    assert!(!result.success);
    assert_eq!(result.error_kind, Some(ErrorKind::ValidationError));
    assert!(result.error.unwrap().contains("file_shx"));
    Ok(())
}

#[test]
fn geopackage_with_several_layers_asks_for_a_selection() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let inputs = geopackage(&dir.path().join("city.gpkg"), &[("roads", 3), ("buildings", 2)])?;

    let result = process("geopackage", &inputs, &ProcessOptions::default());

    assert!(!result.success);
    assert_eq!(result.error_kind, Some(ErrorKind::AmbiguousLayerSelection));
    assert_eq!(
        result.available_layers,
        Some(vec!["roads".to_string(), "buildings".to_string()])
    );
    Ok(())
}

#[test]
fn geopackage_selected_layer_is_processed() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let inputs = geopackage(&dir.path().join("city.gpkg"), &[("roads", 3), ("buildings", 2)])?;

    let result = process(
        "geopackage",
        &inputs,
        &ProcessOptions::default().with_selected_layer("buildings"),
    );

    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.feature_count, 2);
    assert_eq!(result.source_layer.as_deref(), Some("buildings"));
    assert_eq!(result.layer_name.as_deref(), Some("buildings_segment"));
    Ok(())
}

#[test]
fn geopackage_unknown_selection_lists_layers() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let inputs = geopackage(&dir.path().join("city.gpkg"), &[("roads", 3)])?;

    let result = process(
        "geopackage",
        &inputs,
        &ProcessOptions::default().with_selected_layer("rivers"),
    );

    assert_eq!(result.error_kind, Some(ErrorKind::ValidationError));
    assert_eq!(result.available_layers, Some(vec!["roads".to_string()]));
    Ok(())
}

#[test]
fn geopackage_single_layer_is_implicit() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let inputs = geopackage(&dir.path().join("roads.gpkg"), &[("roads", 4)])?;

    let result = process("geopackage", &inputs, &ProcessOptions::default().with_layer_name("r"));

    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.feature_count, 4);
    assert_eq!(result.source_layer.as_deref(), Some("roads"));
    Ok(())
}

#[test]
fn geopackage_without_layers_fails() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let inputs = geopackage(&dir.path().join("empty.gpkg"), &[])?;

    let result = process("geopackage", &inputs, &ProcessOptions::default());

    assert_eq!(result.error_kind, Some(ErrorKind::NoLayersFound));
    Ok(())
}

#[test]
fn geopackage_process_all_aggregates_layers() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let inputs = geopackage(
        &dir.path().join("city.gpkg"),
        &[("roads", 3), ("empty", 0), ("buildings", 2)],
    )?;
    let options = ProcessOptions::default()
        .with_layer_name("city")
        .with_process_all_layers(true);

    let result = process("geopackage", &inputs, &options);

    assert!(result.success);
    assert_eq!(result.layer_results.len(), 3);
    assert_eq!(result.failed_layers(), 0);
    assert_eq!(result.feature_count, 5);
    let names: Vec<_> = result
        .layer_results
        .iter()
        .map(|layer| layer.layer_name.as_deref().unwrap_or_default())
        .collect();
    assert_eq!(names, ["city_roads", "city_empty", "city_buildings"]);

    let mut gateway = MemoryGateway::new();
    let ids = persist(&result, &mut gateway)?;
    assert_eq!(ids.len(), 3);
    assert_eq!(gateway.layer_by_name("city_roads").unwrap().features.len(), 3);
    Ok(())
}
