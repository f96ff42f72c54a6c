use crate::error::Result;
use crate::here::{GeocodeMatch, RouteSummary};
use crate::normalize::{normalize_address, route_key};
use crate::routes::AppState;

/// Cache-first geocoding. Only a missing entry triggers an upstream call,
/// and its result is stored before returning.
pub async fn geocode_cached(state: &AppState, address: &str) -> Result<Vec<GeocodeMatch>> {
    let key = normalize_address(address);

    if let Some(entry) = state.database.get_address(&key).await? {
        tracing::debug!("Address cache hit for {:?}", key);
        return Ok(entry.items);
    }

    tracing::debug!("Address cache miss for {:?}", key);
    let items = state.here_client.geocode(&key).await?;
    state.database.put_address(&key, &items).await?;
    Ok(items)
}

/// Cache-first routing keyed on the exact origin/destination strings.
pub async fn route_cached(state: &AppState, origin: &str, destination: &str) -> Result<RouteSummary> {
    let (origin, destination) = route_key(origin, destination);

    if let Some(entry) = state.database.get_route(&origin, &destination).await? {
        tracing::debug!("Route cache hit for {} -> {}", origin, destination);
        return Ok(entry.routes);
    }

    tracing::debug!("Route cache miss for {} -> {}", origin, destination);
    let routes = state.here_client.route(&origin, &destination).await?;
    state.database.put_route(&origin, &destination, &routes).await?;
    Ok(routes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{test_state, FakeHere, FAILING_ADDRESS};

    #[tokio::test]
    async fn test_geocode_fetches_once_then_serves_cache() {
        let fake = FakeHere::start().await;
        let state = test_state(&fake).await;

        let first = geocode_cached(&state, "Sofia, Vitosha 1").await.unwrap();
        assert_eq!(fake.geocode_calls(), 1);

        let second = geocode_cached(&state, "SOFIA, VITOSHA 1").await.unwrap();
        let third = geocode_cached(&state, "sofia, vitosha 1").await.unwrap();
        assert_eq!(fake.geocode_calls(), 1);
        assert_eq!(first, second);
        assert_eq!(second, third);
        assert_eq!(state.database.count_address_entries("sofia, vitosha 1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_upstream_receives_normalized_address() {
        let fake = FakeHere::start().await;
        let state = test_state(&fake).await;

        geocode_cached(&state, "Sofia Center").await.unwrap();
        assert_eq!(fake.last_query().unwrap().get("q").unwrap(), "sofia center");
    }

    #[tokio::test]
    async fn test_failed_fetch_stores_nothing() {
        let fake = FakeHere::start().await;
        let state = test_state(&fake).await;

        assert!(geocode_cached(&state, FAILING_ADDRESS).await.is_err());
        assert!(state.database.get_address(FAILING_ADDRESS).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_route_cache_requires_identical_strings() {
        let fake = FakeHere::start().await;
        let state = test_state(&fake).await;

        route_cached(&state, "42.68843, 23.37989", "42.70211,23.33198").await.unwrap();
        route_cached(&state, "42.68843,23.37989", "42.70211,23.33198").await.unwrap();
        assert_eq!(fake.route_calls(), 2);

        route_cached(&state, "42.68843,23.37989", "42.70211,23.33198").await.unwrap();
        assert_eq!(fake.route_calls(), 2);
    }
}
