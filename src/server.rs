//! Thin REST layer over the scrape service
//!
//! Three data routes plus a status document, matching what the frontend
//! expects: region names for autocomplete, a preview scrape capped at the
//! configured row limit, and a full download scrape. Request validation
//! and serialization only; all logic lives in [`ScrapeService`].

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::record::FieldSet;
use crate::service::ScrapeService;
use crate::ScrapeError;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ScrapeService>,
}

pub fn build_router(service: Arc<ScrapeService>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/kecamatan", get(kecamatan))
        .route("/preview", post(preview))
        .route("/download", post(download))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { service })
}

pub async fn serve(service: Arc<ScrapeService>, bind: &str, port: u16) -> Result<(), ScrapeError> {
    let addr = format!("{bind}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("API listening on {}", addr);

    axum::serve(listener, build_router(service))
        .await
        .map_err(|e| ScrapeError::IoError(e.to_string()))
}

#[derive(Debug, Deserialize)]
pub struct ScrapeParams {
    #[serde(default)]
    pub kecamatan: String,
    #[serde(default)]
    pub fields: Vec<String>,
}

type ApiError = (StatusCode, Json<Value>);

fn bad_request(message: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

fn validate(params: &ScrapeParams) -> Result<FieldSet, ApiError> {
    if params.kecamatan.trim().is_empty() {
        return Err(bad_request("Kecamatan wajib diisi"));
    }
    if params.fields.is_empty() {
        return Err(bad_request("Minimal 1 field wajib dipilih"));
    }
    FieldSet::parse(&params.fields).map_err(|e| bad_request(&e.to_string()))
}

async fn root() -> Json<Value> {
    Json(json!({
        "status": "sekolah-scraper API is running",
        "endpoints": {
            "GET /kecamatan": "Get list of kecamatan",
            "POST /preview": "Preview scraped data (limited rows)",
            "POST /download": "Download full scraped data",
        }
    }))
}

async fn kecamatan(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.service.region_names())
}

async fn preview(
    State(state): State<AppState>,
    Json(params): Json<ScrapeParams>,
) -> Result<Json<Value>, ApiError> {
    let fields = validate(&params)?;
    let mut rows = run_scrape(&state, &params.kecamatan, &fields).await?;
    rows.truncate(state.service.config().preview_limit);
    Ok(Json(json!({ "rows": rows })))
}

async fn download(
    State(state): State<AppState>,
    Json(params): Json<ScrapeParams>,
) -> Result<Json<Value>, ApiError> {
    let fields = validate(&params)?;
    let rows = run_scrape(&state, &params.kecamatan, &fields).await?;
    Ok(Json(json!({ "rows": rows })))
}

async fn run_scrape(
    state: &AppState,
    kecamatan: &str,
    fields: &FieldSet,
) -> Result<Vec<crate::record::Record>, ApiError> {
    state
        .service
        .scrape(kecamatan, fields)
        .await
        .map_err(|e| {
            error!("Scrape failed for {}: {}", kecamatan, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        })
}
