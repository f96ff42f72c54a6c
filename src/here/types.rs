use serde::{Deserialize, Serialize};

/// Opaque `routes` value returned by the HERE router.
pub type RouteSummary = serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lng: f64,
}

/// One geocoding match. Everything besides `position` is kept as HERE sent it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeMatch {
    pub position: Position,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeocodeResponse {
    #[serde(default)]
    pub items: Vec<GeocodeMatch>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouterResponse {
    pub routes: RouteSummary,
}
