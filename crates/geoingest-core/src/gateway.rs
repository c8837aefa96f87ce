//! Persistence gateway.
//!
//! The pipeline does not own storage; it hands extracted features to a
//! [`LayerGateway`]. Layer-name uniqueness is the gateway's responsibility.

use geoingest_core_common::Geometry;
use tracing::debug;

use crate::error::{GatewayError, Result};
use crate::extract::SanitizedProperties;

/// Storage for named feature layers.
pub trait LayerGateway {
    /// Creates an empty layer and returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::DuplicateLayerName`] if a layer named `name`
    /// already exists.
    fn create_layer(
        &mut self,
        name: &str,
        description: Option<&str>,
        geometry_type: Option<&str>,
    ) -> Result<u64>;

    /// Appends a feature to a layer and returns the feature id.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::UnknownLayer`] for an unknown layer id.
    fn add_feature(
        &mut self,
        layer_id: u64,
        geometry: Geometry,
        properties: SanitizedProperties,
    ) -> Result<u64>;

    /// Returns the features of a layer in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::UnknownLayer`] for an unknown layer id.
    fn get_features(&self, layer_id: u64) -> Result<Vec<(Geometry, SanitizedProperties)>>;
}

/// A layer held by [`MemoryGateway`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredLayer {
    pub id: u64,
    pub name: String,
    pub description: Option<String>,
    pub geometry_type: Option<String>,
    pub features: Vec<(u64, Geometry, SanitizedProperties)>,
}

/// In-process [`LayerGateway`] that rejects duplicate layer names.
#[derive(Debug, Clone, Default)]
pub struct MemoryGateway {
    layers: Vec<StoredLayer>,
    next_feature_id: u64,
}

impl MemoryGateway {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored layers in creation order.
    #[must_use]
    pub fn layers(&self) -> &[StoredLayer] {
        &self.layers
    }

    /// Looks up a layer by name.
    #[must_use]
    pub fn layer_by_name(&self, name: &str) -> Option<&StoredLayer> {
        self.layers.iter().find(|layer| layer.name == name)
    }

    fn layer(&self, id: u64) -> Result<&StoredLayer> {
        self.layers
            .iter()
            .find(|layer| layer.id == id)
            .ok_or_else(|| GatewayError::UnknownLayer { id }.into())
    }
}

impl LayerGateway for MemoryGateway {
    fn create_layer(
        &mut self,
        name: &str,
        description: Option<&str>,
        geometry_type: Option<&str>,
    ) -> Result<u64> {
        if self.layer_by_name(name).is_some() {
            return Err(GatewayError::DuplicateLayerName {
                name: name.to_string(),
            }
            .into());
        }
        let id = self.layers.len() as u64 + 1;
        self.layers.push(StoredLayer {
            id,
            name: name.to_string(),
            description: description.map(str::to_string),
            geometry_type: geometry_type.map(str::to_string),
            features: Vec::new(),
        });
        debug!("Created layer {id} '{name}'");
        Ok(id)
    }

    fn add_feature(
        &mut self,
        layer_id: u64,
        geometry: Geometry,
        properties: SanitizedProperties,
    ) -> Result<u64> {
        let layer = self
            .layers
            .iter_mut()
            .find(|layer| layer.id == layer_id)
            .ok_or(GatewayError::UnknownLayer { id: layer_id })?;
        self.next_feature_id += 1;
        layer.features.push((self.next_feature_id, geometry, properties));
        Ok(self.next_feature_id)
    }

    fn get_features(&self, layer_id: u64) -> Result<Vec<(Geometry, SanitizedProperties)>> {
        Ok(self
            .layer(layer_id)?
            .features
            .iter()
            .map(|(_, geometry, properties)| (geometry.clone(), properties.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn features_come_back_in_order() {
        let mut gateway = MemoryGateway::new();
        let layer = gateway.create_layer("wells", None, Some("POINT")).unwrap();

        for i in 0..3 {
            let mut properties = SanitizedProperties::new();
            properties.insert("depth".into(), json!(i));
            gateway
                .add_feature(layer, Geometry::Point(vec![f64::from(i), 0.0]), properties)
                .unwrap();
        }

        let features = gateway.get_features(layer).unwrap();
        let depths: Vec<_> = features.iter().map(|(_, p)| p["depth"].clone()).collect();
        assert_eq!(depths, [json!(0), json!(1), json!(2)]);
        assert_eq!(gateway.layer_by_name("wells").unwrap().geometry_type.as_deref(), Some("POINT"));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut gateway = MemoryGateway::new();
        gateway.create_layer("wells", None, None).unwrap();

        let err = gateway.create_layer("wells", Some("again"), None).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::DuplicateLayerName);
        assert!(err.is_recoverable());
        assert_eq!(gateway.layers().len(), 1);
    }

    #[test]
    fn unknown_layers_fail() {
        let mut gateway = MemoryGateway::new();
        assert!(gateway.get_features(7).is_err());
        assert!(
            gateway
                .add_feature(7, Geometry::Point(vec![0.0, 0.0]), SanitizedProperties::new())
                .is_err()
        );
    }
}
