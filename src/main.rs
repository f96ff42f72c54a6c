use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use std::sync::Arc;

mod config;
mod database;
mod debug_shape;
mod error;
mod here;
mod lookup;
mod normalize;
mod poi;
mod routes;
#[cfg(test)]
mod test_support;

use config::Config;
use database::Database;
use debug_shape::Boundary;
use here::HereClient;
use poi::PoiResolver;
use routes::{create_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "here_proxy=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    // Initialize cache store
    let pool = sqlx::SqlitePool::connect(&config.database_url).await?;
    let database = Arc::new(Database::new(pool));
    database.init_tables().await?;

    if let Some(path) = &config.points_of_interest_path {
        let count = poi::seed_from_file(&database, path).await?;
        tracing::info!("Seeded {} points of interest from {}", count, path);
    }

    // Boundary shape is read once and shared by every geocoding response
    let boundary = Boundary::load(&config.municipalities_path, &config.boundary_region_filter)?;
    tracing::info!(
        "Loaded boundary for region {:?} from {}",
        config.boundary_region_filter,
        config.municipalities_path
    );

    let here_client = Arc::new(HereClient::new(config.clone())?);
    let poi_resolver = Arc::new(PoiResolver::new(database.clone()));
    let bind_addr = config.bind_addr.clone();

    let state = AppState {
        config: Arc::new(config),
        database,
        here_client,
        poi_resolver,
        boundary: Arc::new(boundary),
    };

    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Server starting on http://{}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
