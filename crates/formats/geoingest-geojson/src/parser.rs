//! `GeoJSON` document parsing into raw records.

use geoingest_core_common::{AttributeValue, Crs, Properties, RawDataset, RawRecord};
use geoingest_shared::{SpatialFormatReadError, SpatialFormatResult};
use geojson::{Feature, GeoJson, JsonObject, JsonValue};

/// Converts decoded JSON documents into a dataset.
///
/// Each document may be a `FeatureCollection`, a `Feature` or a bare
/// `Geometry`; records keep document order. The CRS comes from the legacy
/// `crs` member of the first document that declares one.
///
/// # Errors
///
/// Returns [`SpatialFormatReadError::Parse`] when a document is valid JSON but
/// not valid `GeoJSON`.
pub fn parse_documents(documents: Vec<JsonValue>) -> SpatialFormatResult<RawDataset> {
    let crs = documents.iter().find_map(declared_crs);
    let mut records = Vec::new();

    for (index, document) in documents.into_iter().enumerate() {
        let geojson = GeoJson::from_json_value(document).map_err(|err| {
            SpatialFormatReadError::parse(format!("document {} is not GeoJSON: {err}", index + 1))
        })?;
        match geojson {
            GeoJson::FeatureCollection(collection) => {
                records.extend(collection.features.into_iter().map(feature_to_record));
            },
            GeoJson::Feature(feature) => records.push(feature_to_record(feature)),
            GeoJson::Geometry(geometry) => {
                records.push(RawRecord::new(Some(geometry.value), Properties::new()));
            },
        }
    }

    log::debug!("Parsed {} GeoJSON records", records.len());
    Ok(RawDataset::new(crs, records))
}

fn feature_to_record(feature: Feature) -> RawRecord {
    let properties = feature
        .properties
        .map(properties_from_json)
        .unwrap_or_default();
    RawRecord::new(feature.geometry.map(|geometry| geometry.value), properties)
}

fn properties_from_json(object: JsonObject) -> Properties {
    object
        .into_iter()
        .map(|(key, value)| (key, AttributeValue::from_json(value)))
        .collect()
}

/// Reads the legacy (2008) `crs` member: `{"type": "name", "properties":
/// {"name": ...}}` or `{"type": "EPSG", "properties": {"code": ...}}`.
fn declared_crs(document: &JsonValue) -> Option<Crs> {
    let crs = document.get("crs")?;
    let properties = crs.get("properties")?;
    match crs.get("type")?.as_str()? {
        kind if kind.eq_ignore_ascii_case("name") => {
            properties.get("name")?.as_str().map(Crs::parse)
        },
        kind if kind.eq_ignore_ascii_case("epsg") => match properties.get("code")? {
            JsonValue::Number(code) => code
                .as_u64()
                .and_then(|code| u32::try_from(code).ok())
                .map(Crs::Epsg),
            JsonValue::String(code) => Some(Crs::parse(code)),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geojson::Value;
    use serde_json::json;

    #[test]
    fn parse_feature_collection() {
        let document = json!({
            "type": "FeatureCollection",
            "features": [
                {"type":"Feature","geometry":{"type":"Point","coordinates":[1.0,2.0]},"properties":{"name":"A"}},
                {"type":"Feature","geometry":null,"properties":{"value":42}}
            ]
        });

        let dataset = parse_documents(vec![document]).unwrap();

        assert_eq!(dataset.len(), 2);
        assert_eq!(
            dataset.records[0].geometry,
            Some(Value::Point(vec![1.0, 2.0]))
        );
        assert_eq!(
            dataset.records[0].properties["name"],
            AttributeValue::Text("A".to_string())
        );
        assert_eq!(dataset.records[0].properties["value"], AttributeValue::Null);
        assert!(dataset.records[1].geometry.is_none());
        assert_eq!(dataset.crs, None);
    }

    #[test]
    fn parse_single_feature_without_properties() {
        let document = json!({"type":"Feature","geometry":{"type":"Point","coordinates":[0,0]}});

        let dataset = parse_documents(vec![document]).unwrap();

        assert_eq!(dataset.len(), 1);
        assert!(dataset.records[0].properties.is_empty());
    }

    #[test]
    fn parse_bare_geometry_keeps_z() {
        let document = json!({"type":"Point","coordinates":[1.0,2.0,50.0]});

        let dataset = parse_documents(vec![document]).unwrap();

        assert_eq!(
            dataset.records[0].geometry,
            Some(Value::Point(vec![1.0, 2.0, 50.0]))
        );
    }

    #[test]
    fn legacy_crs_member_is_honored() {
        let named = json!({
            "type": "FeatureCollection",
            "crs": {"type": "name", "properties": {"name": "urn:ogc:def:crs:EPSG::3857"}},
            "features": []
        });
        let epsg = json!({
            "type": "FeatureCollection",
            "crs": {"type": "EPSG", "properties": {"code": 32633}},
            "features": []
        });

        assert_eq!(parse_documents(vec![named]).unwrap().crs, Some(Crs::Epsg(3857)));
        assert_eq!(parse_documents(vec![epsg]).unwrap().crs, Some(Crs::Epsg(32633)));
    }

    #[test]
    fn json_that_is_not_geojson_fails() {
        let err = parse_documents(vec![json!({"hello": "world"})]).unwrap_err();
        assert!(matches!(err, SpatialFormatReadError::Parse { .. }));
    }
}
