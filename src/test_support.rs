//! Fake HERE server and in-memory state shared by the unit tests.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde_json::json;
use sqlx::sqlite::SqlitePoolOptions;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::config::Config;
use crate::database::Database;
use crate::debug_shape::Boundary;
use crate::here::HereClient;
use crate::poi::PoiResolver;
use crate::routes::AppState;

/// Geocoding this (already lower-cased) text makes the fake answer HTTP 500.
pub const FAILING_ADDRESS: &str = "explode";
/// Geocoding this text makes the fake answer 200 with a non-JSON body.
pub const GARBLED_ADDRESS: &str = "garbled";

#[derive(Clone, Default)]
struct Recorder {
    geocode_calls: Arc<AtomicUsize>,
    route_calls: Arc<AtomicUsize>,
    last_query: Arc<Mutex<Option<HashMap<String, String>>>>,
}

pub struct FakeHere {
    pub base_url: String,
    recorder: Recorder,
}

impl FakeHere {
    pub async fn start() -> Self {
        let recorder = Recorder::default();
        let app = Router::new()
            .route("/v1/geocode", get(fake_geocode))
            .route("/v8/routes", get(fake_route))
            .with_state(recorder.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            recorder,
        }
    }

    pub fn geocode_calls(&self) -> usize {
        self.recorder.geocode_calls.load(Ordering::SeqCst)
    }

    pub fn route_calls(&self) -> usize {
        self.recorder.route_calls.load(Ordering::SeqCst)
    }

    pub fn last_query(&self) -> Option<HashMap<String, String>> {
        self.recorder.last_query.lock().unwrap().clone()
    }
}

async fn fake_geocode(
    State(recorder): State<Recorder>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    recorder.geocode_calls.fetch_add(1, Ordering::SeqCst);
    let text = query.get("q").cloned().unwrap_or_default();
    *recorder.last_query.lock().unwrap() = Some(query);

    match text.as_str() {
        FAILING_ADDRESS => (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response(),
        GARBLED_ADDRESS => (StatusCode::OK, "<html>not json</html>").into_response(),
        _ => Json(json!({
            "items": [
                {
                    "title": format!("{} 1", text),
                    "resultType": "houseNumber",
                    "position": {"lat": 42.6977, "lng": 23.3219}
                },
                {
                    "title": format!("{} 2", text),
                    "resultType": "street",
                    "position": {"lat": 42.6954, "lng": 23.3249}
                }
            ]
        }))
        .into_response(),
    }
}

async fn fake_route(
    State(recorder): State<Recorder>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    recorder.route_calls.fetch_add(1, Ordering::SeqCst);
    *recorder.last_query.lock().unwrap() = Some(query);

    Json(json!({
        "routes": [
            {
                "id": "route-1",
                "sections": [
                    {"type": "pedestrian", "summary": {"duration": 1380, "length": 1850}}
                ]
            }
        ]
    }))
    .into_response()
}

pub async fn memory_database() -> Database {
    // One connection: every new `sqlite::memory:` connection is a fresh database.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    let database = Database::new(pool);
    database.init_tables().await.unwrap();
    database
}

pub async fn test_state(fake: &FakeHere) -> AppState {
    let config = Config::for_tests(&fake.base_url);
    let database = Arc::new(memory_database().await);
    let boundary =
        Boundary::load(&config.municipalities_path, &config.boundary_region_filter).unwrap();

    AppState {
        here_client: Arc::new(HereClient::new(config.clone()).unwrap()),
        poi_resolver: Arc::new(PoiResolver::new(database.clone())),
        boundary: Arc::new(boundary),
        database,
        config: Arc::new(config),
    }
}
