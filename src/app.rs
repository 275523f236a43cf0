use crate::catalog::{with_deadline, Catalog, DEFAULT_PAGE_SIZE};
use crate::error::CatalogError;
use crate::kodik::KodikClient;
use crate::models::{AggregatedItem, RawPayload, SearchPage, Translation};
use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::{env, net::SocketAddr, sync::Arc, time::Duration};
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{error, info, warn};

const MAX_BODY_BYTES: usize = 64 * 1024;
const DEFAULT_PORT: u16 = 3146;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Clone)]
pub struct AppState {
    pub catalog: Catalog,
    pub request_timeout: Duration,
}

pub async fn run_server() -> Result<()> {
    let source = Arc::new(KodikClient::from_env()?);
    let port = env_or("CATALOG_PORT", DEFAULT_PORT)?;
    let timeout_secs = env_or("CATALOG_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?;
    info!("Upstream requests time out after {}s", timeout_secs);

    let state = AppState {
        catalog: Catalog::new(source),
        request_timeout: Duration::from_secs(timeout_secs),
    };
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/search", post(search))
        .route("/v1/anime/:id", get(get_anime))
        .route("/health", get(health))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(v) if !v.trim().is_empty() => v
            .trim()
            .parse()
            .with_context(|| format!("{key} must be a valid number")),
        _ => Ok(default),
    }
}

async fn health() -> &'static str {
    "OK"
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchBody {
    query: String,
    page: i32,
    page_size: i32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ItemQuery {
    full: bool,
}

#[derive(Debug, Serialize)]
struct SearchResponse {
    items: Vec<ItemView>,
    total: u64,
}

#[derive(Debug, Serialize)]
struct ItemView {
    kodik_id: String,
    kind: String,
    link: String,
    title: String,
    original_title: String,
    alternate_title: String,
    description: String,
    year: i32,
    episodes_count: i32,
    poster_url: String,
    genres: Vec<String>,
    kinopoisk_id: Option<String>,
    shikimori_id: Option<String>,
    imdb_id: Option<String>,
    rating: f64,
    translations: Vec<Translation>,
    updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    raw: Option<RawPayload>,
}

impl ItemView {
    fn new(item: AggregatedItem, full: bool) -> Self {
        let AggregatedItem {
            record,
            translations,
            ..
        } = item;
        Self {
            kodik_id: record.id,
            kind: record.kind,
            link: record.link,
            title: record.title,
            original_title: record.original_title,
            alternate_title: record.alternate_title,
            description: record.description,
            year: record.year,
            episodes_count: record.episode_count,
            poster_url: record.poster_url,
            genres: record.genres,
            kinopoisk_id: record.external_ids.kinopoisk_id,
            shikimori_id: record.external_ids.shikimori_id,
            imdb_id: record.external_ids.imdb_id,
            rating: record.rating,
            translations: translations.into_values().collect(),
            updated_at: Utc::now().to_rfc3339(),
            raw: full.then_some(record.raw),
        }
    }
}

impl From<SearchPage> for SearchResponse {
    fn from(page: SearchPage) -> Self {
        Self {
            items: page
                .items
                .into_iter()
                .map(|item| ItemView::new(item, false))
                .collect(),
            total: page.total,
        }
    }
}

async fn search(State(state): State<AppState>, Json(body): Json<SearchBody>) -> Response {
    let page = if body.page == 0 { 1 } else { body.page };
    let page_size = if body.page_size == 0 {
        DEFAULT_PAGE_SIZE
    } else {
        body.page_size
    };
    let call = state.catalog.search(&body.query, page, page_size);
    match with_deadline(state.request_timeout, call).await {
        Ok(result) => (StatusCode::OK, Json(SearchResponse::from(result))).into_response(),
        Err(e) => error_response(e),
    }
}

async fn get_anime(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<ItemQuery>,
) -> Response {
    if id.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "kodik_id required"})),
        )
            .into_response();
    }
    match with_deadline(state.request_timeout, state.catalog.get_item(&id)).await {
        Ok(item) => (StatusCode::OK, Json(ItemView::new(item, params.full))).into_response(),
        Err(e) => error_response(e),
    }
}

fn error_response(err: CatalogError) -> Response {
    let status = match &err {
        CatalogError::NotFound { .. } => StatusCode::NOT_FOUND,
        CatalogError::Timeout => StatusCode::GATEWAY_TIMEOUT,
        CatalogError::Upstream(_) | CatalogError::Decode(_) => StatusCode::BAD_GATEWAY,
    };
    if status == StatusCode::NOT_FOUND {
        warn!("Request failed: {}", err);
    } else {
        error!("Request failed: {}", err);
    }
    let body = match &err {
        CatalogError::NotFound { id, examples } => json!({
            "error": err.to_string(),
            "id": id,
            "examples": examples,
        }),
        _ => json!({
            "error": err.to_string(),
            "retryable": err.is_retryable(),
        }),
    };
    (status, Json(body)).into_response()
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        term.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        }
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        }
    }
}
