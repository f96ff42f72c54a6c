use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::database::{Database, DatabaseError, PointOfInterest};

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Unknown point of interest: {0}")]
    UnknownPointOfInterest(String),
    #[error(transparent)]
    Store(#[from] DatabaseError),
}

pub type PoiCache = Cache<String, String>;

pub fn init_cache() -> PoiCache {
    Cache::builder()
        .max_capacity(1000)
        .time_to_live(Duration::from_secs(10 * 60)) // 10 minutes
        .build()
}

/// Turns a route endpoint value into a `lat,lng` string, falling back to the
/// points-of-interest table when the value is a name.
pub struct PoiResolver {
    database: Arc<Database>,
    cache: PoiCache,
}

impl PoiResolver {
    pub fn new(database: Arc<Database>) -> Self {
        Self {
            database,
            cache: init_cache(),
        }
    }

    pub async fn resolve(&self, destination: &str) -> Result<String, ResolveError> {
        if is_coordinate_pair(destination) {
            return Ok(destination.to_string());
        }

        let name = destination.to_lowercase();
        if let Some(coords) = self.cache.get(&name).await {
            return Ok(coords);
        }

        match self.database.get_point_of_interest(&name).await? {
            Some(poi) => {
                tracing::debug!("Resolved point of interest {:?} to {}", name, poi.coords);
                self.cache.insert(name, poi.coords.clone()).await;
                Ok(poi.coords)
            }
            None => Err(ResolveError::UnknownPointOfInterest(name)),
        }
    }
}

/// True for exactly two comma-separated floats, e.g. `42.70211,23.33198`.
pub fn is_coordinate_pair(value: &str) -> bool {
    let mut parts = value.split(',');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(lat), Some(lng), None) => {
            lat.trim().parse::<f64>().is_ok() && lng.trim().parse::<f64>().is_ok()
        }
        _ => false,
    }
}

/// Loads a JSON array of `{"name", "coords"}` records into the reference table.
pub async fn seed_from_file(database: &Database, path: &str) -> anyhow::Result<usize> {
    let raw = tokio::fs::read_to_string(path).await?;
    let points: Vec<PointOfInterest> = serde_json::from_str(&raw)?;

    for poi in &points {
        database.put_point_of_interest(&poi.name, &poi.coords).await?;
    }

    Ok(points.len())
}
