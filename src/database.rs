use sqlx::SqlitePool;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::here::{GeocodeMatch, RouteSummary};

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database query failed: {0}")]
    QueryFailed(#[from] sqlx::Error),
    #[error("Invalid data: {0}")]
    InvalidData(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressCacheEntry {
    pub normalized_address: String,
    pub items: Vec<GeocodeMatch>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteCacheEntry {
    pub origin: String,
    pub destination: String,
    pub routes: RouteSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PointOfInterest {
    pub name: String,
    pub coords: String,
}

#[derive(sqlx::FromRow)]
struct AddressRow {
    normalized_address: String,
    items: String,
}

#[derive(sqlx::FromRow)]
struct RouteRow {
    origin: String,
    destination: String,
    routes: String,
}

/// Persistent lookup cache. Entries are only ever inserted; duplicate rows
/// for one key are allowed and the oldest one is served.
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn init_tables(&self) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS address_cache (
                id TEXT PRIMARY KEY,
                normalized_address TEXT NOT NULL,
                items TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS route_cache (
                id TEXT PRIMARY KEY,
                origin TEXT NOT NULL,
                destination TEXT NOT NULL,
                routes TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS points_of_interest (
                name TEXT PRIMARY KEY,
                coords TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Lookup indexes only, not unique.
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_address_cache_key ON address_cache(normalized_address)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_route_cache_key ON route_cache(origin, destination)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // Address cache
    pub async fn get_address(
        &self,
        normalized_address: &str,
    ) -> Result<Option<AddressCacheEntry>, DatabaseError> {
        let row = sqlx::query_as::<_, AddressRow>(
            r#"
            SELECT normalized_address, items FROM address_cache
            WHERE normalized_address = $1
            ORDER BY rowid ASC
            LIMIT 1
            "#,
        )
        .bind(normalized_address)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| -> Result<AddressCacheEntry, DatabaseError> {
            Ok(AddressCacheEntry {
                normalized_address: row.normalized_address,
                items: serde_json::from_str(&row.items)?,
            })
        })
        .transpose()
    }

    pub async fn put_address(
        &self,
        normalized_address: &str,
        items: &[GeocodeMatch],
    ) -> Result<(), DatabaseError> {
        let items = serde_json::to_string(items)?;

        sqlx::query(
            r#"
            INSERT INTO address_cache (id, normalized_address, items, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(normalized_address)
        .bind(items)
        .bind(chrono::Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // Route cache
    pub async fn get_route(
        &self,
        origin: &str,
        destination: &str,
    ) -> Result<Option<RouteCacheEntry>, DatabaseError> {
        let row = sqlx::query_as::<_, RouteRow>(
            r#"
            SELECT origin, destination, routes FROM route_cache
            WHERE origin = $1 AND destination = $2
            ORDER BY rowid ASC
            LIMIT 1
            "#,
        )
        .bind(origin)
        .bind(destination)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| -> Result<RouteCacheEntry, DatabaseError> {
            Ok(RouteCacheEntry {
                origin: row.origin,
                destination: row.destination,
                routes: serde_json::from_str(&row.routes)?,
            })
        })
        .transpose()
    }

    pub async fn put_route(
        &self,
        origin: &str,
        destination: &str,
        routes: &RouteSummary,
    ) -> Result<(), DatabaseError> {
        let routes = serde_json::to_string(routes)?;

        sqlx::query(
            r#"
            INSERT INTO route_cache (id, origin, destination, routes, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(origin)
        .bind(destination)
        .bind(routes)
        .bind(chrono::Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // Points of interest
    pub async fn get_point_of_interest(
        &self,
        name: &str,
    ) -> Result<Option<PointOfInterest>, DatabaseError> {
        let result = sqlx::query_as::<_, PointOfInterest>(
            "SELECT name, coords FROM points_of_interest WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(result)
    }

    /// Seeds reference data. Request handlers never write this table.
    pub async fn put_point_of_interest(&self, name: &str, coords: &str) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO points_of_interest (name, coords) VALUES ($1, $2)
            ON CONFLICT(name) DO UPDATE SET coords = excluded.coords
            "#,
        )
        .bind(name.to_lowercase())
        .bind(coords)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
impl Database {
    pub async fn count_address_entries(&self, normalized_address: &str) -> Result<i64, DatabaseError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM address_cache WHERE normalized_address = $1",
        )
        .bind(normalized_address)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::memory_database;
    use serde_json::json;

    fn sample_items() -> Vec<GeocodeMatch> {
        serde_json::from_value(json!([
            {"title": "Sofia Center", "position": {"lat": 42.6977, "lng": 23.3219}}
        ]))
        .unwrap()
    }

    #[tokio::test]
    async fn test_address_miss_then_hit() {
        let db = memory_database().await;

        assert!(db.get_address("sofia").await.unwrap().is_none());

        db.put_address("sofia", &sample_items()).await.unwrap();
        let entry = db.get_address("sofia").await.unwrap().unwrap();

        assert_eq!(entry.normalized_address, "sofia");
        assert_eq!(entry.items, sample_items());
    }

    #[tokio::test]
    async fn test_duplicate_inserts_are_tolerated_and_first_wins() {
        let db = memory_database().await;
        let mut later = sample_items();
        later[0].position.lat = 1.0;

        db.put_address("sofia", &sample_items()).await.unwrap();
        db.put_address("sofia", &later).await.unwrap();

        assert_eq!(db.count_address_entries("sofia").await.unwrap(), 2);
        let entry = db.get_address("sofia").await.unwrap().unwrap();
        assert_eq!(entry.items[0].position.lat, 42.6977);
    }

    #[tokio::test]
    async fn test_route_key_is_byte_exact() {
        let db = memory_database().await;
        let routes = json!([{"id": "r1"}]);

        db.put_route("42.68843, 23.37989", "42.70211,23.33198", &routes)
            .await
            .unwrap();

        assert!(db
            .get_route("42.68843,23.37989", "42.70211,23.33198")
            .await
            .unwrap()
            .is_none());
        let hit = db
            .get_route("42.68843, 23.37989", "42.70211,23.33198")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hit.routes, routes);
    }

    #[tokio::test]
    async fn test_point_of_interest_names_are_lowercased() {
        let db = memory_database().await;

        db.put_point_of_interest("131 SU Sofia", "42.65,23.35").await.unwrap();

        let poi = db.get_point_of_interest("131 su sofia").await.unwrap().unwrap();
        assert_eq!(poi.coords, "42.65,23.35");
        assert!(db.get_point_of_interest("131 SU Sofia").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_health_check() {
        let db = memory_database().await;
        assert!(db.health_check().await.is_ok());
    }
}
