use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::sync::Arc;
use utoipa::{IntoParams, OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    config::Config,
    database::Database,
    debug_shape::{Boundary, DebugFeatureCollection},
    error::{AppError, ErrorBody, Result},
    here::{GeocodeMatch, HereClient, RouteSummary},
    lookup::{geocode_cached, route_cached},
    normalize::coords_key,
    poi::PoiResolver,
};

// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub database: Arc<Database>,
    pub here_client: Arc<HereClient>,
    pub poi_resolver: Arc<PoiResolver>,
    pub boundary: Arc<Boundary>,
}

// Request/Response types
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct GeocodeQuery {
    /// Free-form address, e.g. "гр. София, УЛ.ВЛАДИМИР МИНКОВ-ЛОТКОВ бл./№ 023"
    pub address: Option<String>,
    /// Same as `address`
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RouteQuery {
    /// Origin as `lat,lng`, e.g. 42.68843,23.37989
    #[serde(rename = "pointA")]
    pub point_a: Option<String>,
    /// Destination as `lat,lng` or a point-of-interest name
    #[serde(rename = "pointB")]
    pub point_b: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct GeocodeBatchRequest {
    pub json: Vec<AddressItem>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct AddressItem {
    pub address: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct RouteBatchRequest {
    pub json: Vec<RouteItem>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct RouteItem {
    /// `[lat, lng]` or a `lat,lng` string
    #[schema(value_type = Object)]
    pub origin: RoutePoint,
    /// `[lat, lng]`, a `lat,lng` string or a point-of-interest name
    #[schema(value_type = Object)]
    pub destination: RoutePoint,
}

/// A route endpoint in a batch body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RoutePoint {
    Coords([Number; 2]),
    Text(String),
}

impl RoutePoint {
    fn key(&self) -> String {
        match self {
            RoutePoint::Coords(coords) => coords_key(coords),
            RoutePoint::Text(text) => text.clone(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    #[schema(value_type = String)]
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub version: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GeocodeResponse {
    #[schema(value_type = Vec<Object>)]
    pub items: Vec<GeocodeMatch>,
    #[schema(value_type = Object)]
    pub debug: DebugFeatureCollection,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GeocodedAddress {
    pub address: String,
    #[schema(value_type = Vec<Object>)]
    pub items: Vec<GeocodeMatch>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GeocodeBatchResponse {
    pub result: Vec<GeocodedAddress>,
    #[schema(value_type = Object)]
    pub debug: DebugFeatureCollection,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RouteResponse {
    #[schema(value_type = Object)]
    pub routes: RouteSummary,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RoutedPair {
    #[schema(value_type = Object)]
    pub origin: RoutePoint,
    #[schema(value_type = Object)]
    pub destination: RoutePoint,
    #[schema(value_type = Object)]
    pub routes: RouteSummary,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RouteBatchResponse {
    pub result: Vec<RoutedPair>,
}

/// Query string pairs as sent. The token is checked before any of them are
/// interpreted. A repeated key keeps its first value.
type QueryPairs = Query<Vec<(String, String)>>;

struct QueryParams(Map<String, Value>);

impl QueryParams {
    fn new(pairs: Vec<(String, String)>) -> Self {
        let mut params = Map::new();
        for (key, value) in pairs {
            params.entry(key).or_insert(Value::String(value));
        }
        Self(params)
    }

    fn token(&self) -> Option<&str> {
        self.0.get("token").and_then(Value::as_str)
    }

    fn parse<T: DeserializeOwned>(self) -> Result<T> {
        serde_json::from_value(Value::Object(self.0))
            .map_err(|e| AppError::MalformedRequest(e.to_string()))
    }
}

fn authorize(state: &AppState, token: Option<&str>) -> Result<()> {
    match token {
        Some(token) if token == state.config.api_token => Ok(()),
        _ => Err(AppError::InvalidToken),
    }
}

fn parse_body<T: DeserializeOwned>(
    body: std::result::Result<Bytes, BytesRejection>,
) -> Result<T> {
    let body = body.map_err(|e| AppError::MalformedRequest(e.body_text()))?;
    serde_json::from_slice(&body).map_err(|e| AppError::MalformedRequest(e.to_string()))
}

fn required(value: Option<String>, name: &str) -> Result<String> {
    value.ok_or_else(|| AppError::MalformedRequest(format!("missing query parameter `{}`", name)))
}

// Route handlers
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service and cache store are up", body = HealthResponse),
        (status = 503, description = "Cache store unreachable", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let (status, label) = match state.database.health_check().await {
        Ok(()) => (StatusCode::OK, "healthy"),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
        }
    };

    (
        status,
        Json(HealthResponse {
            status: label.to_string(),
            timestamp: chrono::Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// Search for an address. Also mounted as `GET /geocoords`.
#[utoipa::path(
    get,
    path = "/geolocate",
    params(GeocodeQuery, ("token" = String, Query, description = "API token")),
    responses(
        (status = 200, description = "Geocoding matches plus a debug GeoJSON collection", body = GeocodeResponse),
        (status = 400, description = "Bad request", body = ErrorBody),
        (status = 403, description = "Invalid token", body = ErrorBody)
    )
)]
pub async fn geolocate(
    State(state): State<AppState>,
    Query(pairs): QueryPairs,
) -> Result<Json<GeocodeResponse>> {
    let params = QueryParams::new(pairs);
    authorize(&state, params.token())?;
    let params: GeocodeQuery = params.parse()?;
    let address = required(params.address.or(params.name), "address")?;

    let items = geocode_cached(&state, &address).await?;

    let mut debug = state.boundary.new_collection();
    for item in &items {
        debug.add_point(item.position.lat, item.position.lng);
    }

    Ok(Json(GeocodeResponse { items, debug }))
}

#[utoipa::path(
    post,
    path = "/geocoords",
    params(("token" = String, Query, description = "API token")),
    request_body = GeocodeBatchRequest,
    responses(
        (status = 200, description = "Matches for every address, one shared debug collection", body = GeocodeBatchResponse),
        (status = 400, description = "Bad request; no partial results", body = ErrorBody),
        (status = 403, description = "Invalid token", body = ErrorBody)
    )
)]
pub async fn geocode_batch(
    State(state): State<AppState>,
    Query(pairs): QueryPairs,
    body: std::result::Result<Bytes, BytesRejection>,
) -> Result<Json<GeocodeBatchResponse>> {
    authorize(&state, QueryParams::new(pairs).token())?;
    let request: GeocodeBatchRequest = parse_body(body)?;

    let mut debug = state.boundary.new_collection();
    let mut result = Vec::with_capacity(request.json.len());

    for AddressItem { address } in request.json {
        let items = geocode_cached(&state, &address).await?;
        for item in &items {
            debug.add_point(item.position.lat, item.position.lng);
        }
        result.push(GeocodedAddress { address, items });
    }

    Ok(Json(GeocodeBatchResponse { result, debug }))
}

/// Pedestrian route from point A to point B.
#[utoipa::path(
    get,
    path = "/route",
    params(RouteQuery, ("token" = String, Query, description = "API token")),
    responses(
        (status = 200, description = "Route summary", body = RouteResponse),
        (status = 400, description = "Bad request or unknown point of interest", body = ErrorBody),
        (status = 403, description = "Invalid token", body = ErrorBody)
    )
)]
pub async fn route(
    State(state): State<AppState>,
    Query(pairs): QueryPairs,
) -> Result<Json<RouteResponse>> {
    let params = QueryParams::new(pairs);
    authorize(&state, params.token())?;
    let params: RouteQuery = params.parse()?;
    let origin = required(params.point_a, "pointA")?;
    let destination = required(params.point_b, "pointB")?;

    let destination = state.poi_resolver.resolve(&destination).await?;
    let routes = route_cached(&state, &origin, &destination).await?;

    Ok(Json(RouteResponse { routes }))
}

#[utoipa::path(
    post,
    path = "/route",
    params(("token" = String, Query, description = "API token")),
    request_body = RouteBatchRequest,
    responses(
        (status = 200, description = "Every pair with its `routes` added", body = RouteBatchResponse),
        (status = 400, description = "Bad request; no partial results", body = ErrorBody),
        (status = 403, description = "Invalid token", body = ErrorBody)
    )
)]
pub async fn route_batch(
    State(state): State<AppState>,
    Query(pairs): QueryPairs,
    body: std::result::Result<Bytes, BytesRejection>,
) -> Result<Json<RouteBatchResponse>> {
    authorize(&state, QueryParams::new(pairs).token())?;
    let request: RouteBatchRequest = parse_body(body)?;

    let mut result = Vec::with_capacity(request.json.len());
    for RouteItem { origin, destination } in request.json {
        let resolved = state.poi_resolver.resolve(&destination.key()).await?;
        let routes = route_cached(&state, &origin.key(), &resolved).await?;
        result.push(RoutedPair {
            origin,
            destination,
            routes,
        });
    }

    Ok(Json(RouteBatchResponse { result }))
}

#[derive(OpenApi)]
#[openapi(
    paths(health, geolocate, geocode_batch, route, route_batch),
    components(schemas(
        HealthResponse,
        GeocodeResponse,
        GeocodeBatchRequest,
        AddressItem,
        GeocodedAddress,
        GeocodeBatchResponse,
        RouteResponse,
        RouteBatchRequest,
        RouteItem,
        RoutedPair,
        RouteBatchResponse,
        ErrorBody
    )),
    info(description = "Cached HERE geocoding and pedestrian routing")
)]
pub struct ApiDoc;

// Create the router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/geolocate", get(geolocate))
        .route("/geocoords", get(geolocate).post(geocode_batch))
        .route("/route", get(route).post(route_batch))
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
