//! zoomon-ingest - Surveillance Data Ingest Microservice
//!
//! Accepts uploaded spreadsheets of zoonoses surveillance data (microbial
//! isolates, antimicrobial-resistance measurements, prevalence statistics),
//! reconciles them against the dimension tables and upserts fact records
//! into the shared database.

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use zoomon_ingest::config::ServiceConfig;
use zoomon_ingest::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServiceConfig::resolve();

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting zoomon-ingest microservice");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("Database: {}", config.database_path.display());
    info!("Reports: {}", config.report_dir.display());

    let db_pool = zoomon_ingest::db::init_database_pool(&config.database_path).await?;
    info!("Database connection established");

    let addr = format!("127.0.0.1:{}", config.port);
    let state = AppState::new(db_pool, config);
    let app = zoomon_ingest::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
