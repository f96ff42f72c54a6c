use serde::Serialize;
use serde_json::{Map, Value};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BoundaryError {
    #[error("Failed to read boundary dataset: {0}")]
    Io(#[from] std::io::Error),
    #[error("Boundary dataset is not valid GeoJSON: {0}")]
    JsonParsing(#[from] serde_json::Error),
    #[error("No feature with region code containing {0:?}")]
    NotFound(String),
}

/// Municipal boundary shown under every geocoding result. Loaded once at
/// startup and shared read-only.
#[derive(Debug, Clone)]
pub struct Boundary {
    feature: Value,
}

impl Boundary {
    pub fn load(path: impl AsRef<Path>, region_filter: &str) -> Result<Self, BoundaryError> {
        let raw = std::fs::read_to_string(path)?;
        let collection: Value = serde_json::from_str(&raw)?;
        Self::from_collection(&collection, region_filter)
    }

    /// Picks the first feature whose `properties.nuts4` contains `region_filter`.
    pub fn from_collection(collection: &Value, region_filter: &str) -> Result<Self, BoundaryError> {
        collection["features"]
            .as_array()
            .into_iter()
            .flatten()
            .find(|feature| {
                feature["properties"]["nuts4"]
                    .as_str()
                    .is_some_and(|code| code.contains(region_filter))
            })
            .map(|feature| Self {
                feature: feature.clone(),
            })
            .ok_or_else(|| BoundaryError::NotFound(region_filter.to_string()))
    }

    pub fn new_collection(&self) -> DebugFeatureCollection {
        DebugFeatureCollection {
            kind: "FeatureCollection",
            features: vec![DebugFeature::Boundary(self.feature.clone())],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DebugFeatureCollection {
    #[serde(rename = "type")]
    kind: &'static str,
    features: Vec<DebugFeature>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum DebugFeature {
    Boundary(Value),
    Point(PointFeature),
}

#[derive(Debug, Clone, Serialize)]
pub struct PointFeature {
    #[serde(rename = "type")]
    kind: &'static str,
    properties: Map<String, Value>,
    geometry: PointGeometry,
}

#[derive(Debug, Clone, Serialize)]
pub struct PointGeometry {
    #[serde(rename = "type")]
    kind: &'static str,
    /// GeoJSON order: longitude first.
    coordinates: [f64; 2],
}

impl DebugFeatureCollection {
    pub fn add_point(&mut self, lat: f64, lng: f64) {
        self.features.push(DebugFeature::Point(PointFeature {
            kind: "Feature",
            properties: Map::new(),
            geometry: PointGeometry {
                kind: "Point",
                coordinates: [lng, lat],
            },
        }));
    }
}
