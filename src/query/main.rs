//! Query server for postcode lookups.
//!
//! Loads one encoded table at start-up and answers point lookups over HTTP.
//! A postcode with no match is a normal `200` response with a `null` value.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    extract::{Query, State},
    response::Json,
    routing::get,
    Router,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use minilookup::lookup::{postcode, TableSource};
use minilookup::RangeLookup;

mod config;
use config::Config;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

/// Upper bound on postcodes per batch request
const MAX_BATCH: usize = 100;

#[derive(Parser, Debug)]
#[command(name = "query")]
#[command(about = "Postcode lookup server")]
struct Args {
    /// Optional TOML config file
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,

    /// Listen address
    #[arg(short, long)]
    listen: Option<String>,

    /// Encoded table: file path or http(s) URL
    #[arg(short, long)]
    table: Option<String>,
}

/// Application state shared across handlers
struct AppState {
    table: RangeLookup<serde_json::Value>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::default(),
    };

    let listen = args
        .listen
        .or(config.server.listen)
        .unwrap_or_else(|| "0.0.0.0:3000".to_string());
    let source = args
        .table
        .or(config.table.source)
        .context("No table source given (use --table or [table] source)")?;
    let source = TableSource::parse(&source);

    info!("Minilookup Query Server");

    let client = reqwest::Client::builder()
        .user_agent("Minilookup/0.1")
        .timeout(Duration::from_secs(config.table.timeout_secs.unwrap_or(60)))
        .build()?;
    let table = source
        .load(&client)
        .await
        .with_context(|| format!("Failed to load table from {}", source))?;

    info!(
        "Table ready with {} ranges and {} values",
        table.len(),
        table.values().len()
    );

    let app = router(Arc::new(AppState { table }));

    info!("Starting server on {}", listen);

    let listener = tokio::net::TcpListener::bind(&listen).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/v1/lookup", get(lookup_handler))
        .route("/v1/lookup/batch", get(batch_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        entries: state.table.len(),
        values: state.table.values().len(),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    entries: usize,
    values: usize,
}

/// Single postcode lookup
async fn lookup_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LookupQueryParams>,
) -> Json<LookupResult> {
    Json(lookup(
        &state.table,
        &params.postcode,
        params.validate.unwrap_or(true),
    ))
}

/// Comma-separated batch lookup
async fn batch_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<BatchQueryParams>,
) -> Json<Vec<LookupResult>> {
    let validate = params.validate.unwrap_or(true);
    let results = params
        .postcodes
        .split(',')
        .filter(|p| !p.trim().is_empty())
        .take(MAX_BATCH)
        .map(|p| lookup(&state.table, p, validate))
        .collect();
    Json(results)
}

fn lookup(table: &RangeLookup<serde_json::Value>, raw: &str, validate: bool) -> LookupResult {
    let value = table.get_value(raw, validate).cloned();
    debug!("Lookup {:?}: {}", raw, if value.is_some() { "hit" } else { "miss" });
    LookupResult {
        postcode: postcode::clean(raw),
        value,
    }
}

#[derive(Deserialize)]
struct LookupQueryParams {
    postcode: String,
    /// Check the postcode format first (defaults to true)
    validate: Option<bool>,
}

#[derive(Deserialize)]
struct BatchQueryParams {
    /// Postcodes (comma-separated)
    postcodes: String,
    validate: Option<bool>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct LookupResult {
    postcode: String,
    value: Option<serde_json::Value>,
}
