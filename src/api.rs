//! HTTP API for submitting pages and polling the summary queue.
//!
//! Routes, all JSON:
//!
//! | Method | Path | Result |
//! |--------|------|--------|
//! | `POST` | `/v1/webpages` | enqueue and summarize a page (201, or 200 if it was already queued) |
//! | `GET` | `/v1/webpages?page=N` | one page of records with `next`/`previous` links |
//! | `GET` | `/v1/webpages/{id}` | a single record |
//! | `DELETE` | `/v1/webpages/{id}` | remove a record (204, also when already gone) |
//!
//! Pagination links are relative to the server root; clients resolve them
//! against the base URL they connected to.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use crate::errors::SummaryError;
use crate::models::{Ratio, RecordState, WebpageRecord};
use crate::queue::{ReadyQueue, SummaryQueue};
use crate::summarizer::PageSummarizer;

pub const WEBPAGES_PATH: &str = "/v1/webpages";

/// A queue record as exposed over HTTP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebpageResource {
    /// Link to this record, used by clients to delete it.
    pub url: String,
    pub id: i64,
    pub webpage_url: String,
    pub webpage_title: String,
    pub webpage_summary: String,
    pub state: RecordState,
    pub created_at: DateTime<Utc>,
    pub ready_at: Option<DateTime<Utc>>,
}

impl From<WebpageRecord> for WebpageResource {
    fn from(record: WebpageRecord) -> Self {
        Self {
            url: format!("{WEBPAGES_PATH}/{}", record.id),
            id: record.id,
            webpage_url: record.url,
            webpage_title: record.title,
            webpage_summary: record.summary,
            state: record.state,
            created_at: record.created_at,
            ready_at: record.ready_at,
        }
    }
}

impl From<WebpageResource> for WebpageRecord {
    fn from(resource: WebpageResource) -> Self {
        Self {
            id: resource.id,
            url: resource.webpage_url,
            title: resource.webpage_title,
            summary: resource.webpage_summary,
            state: resource.state,
            created_at: resource.created_at,
            ready_at: resource.ready_at,
        }
    }
}

/// One page of a listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub count: usize,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub struct CreateWebpage {
    pub webpage_url: String,
    #[serde(default)]
    pub summarization_ratio: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    page: Option<usize>,
}

#[derive(Clone)]
pub struct ApiState {
    pub queue: Arc<SummaryQueue<PageSummarizer>>,
    pub page_size: usize,
}

impl IntoResponse for SummaryError {
    fn into_response(self) -> Response {
        let status = match &self {
            SummaryError::InvalidUrl { .. } | SummaryError::InvalidParameter(_) => {
                StatusCode::BAD_REQUEST
            }
            SummaryError::Fetch { .. } => StatusCode::BAD_GATEWAY,
            SummaryError::NoContent(_) => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found." }))).into_response()
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route(WEBPAGES_PATH, get(list_webpages).post(create_webpage))
        .route(
            &format!("{WEBPAGES_PATH}/{{id}}"),
            get(retrieve_webpage).delete(delete_webpage),
        )
        .with_state(state)
}

/// Serve the API on `bind_addr` until Ctrl-C.
pub async fn serve(state: ApiState, bind_addr: &str) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!(addr = %listener.local_addr()?, "Webpage API listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Cannot listen for Ctrl-C; serving until killed");
                std::future::pending::<()>().await;
            }
            info!("Shutting down webpage API");
        })
        .await
}

#[instrument(level = "info", skip_all)]
async fn create_webpage(
    State(state): State<ApiState>,
    Json(req): Json<CreateWebpage>,
) -> Result<Response, SummaryError> {
    info!(url = %req.webpage_url, ratio = ?req.summarization_ratio, "Webpage submitted");
    let ratio = match req.summarization_ratio {
        Some(r) => Ratio::new(r)?,
        None => state.queue.ratio(),
    };
    let existed = state.queue.get_by_url(&req.webpage_url)?.is_some();
    let record = state.queue.submit(&req.webpage_url, ratio).await?;
    let status = if existed { StatusCode::OK } else { StatusCode::CREATED };
    Ok((status, Json(WebpageResource::from(record))).into_response())
}

async fn list_webpages(
    State(state): State<ApiState>,
    Query(query): Query<PageQuery>,
) -> Result<Response, SummaryError> {
    let page = query.page.unwrap_or(1).max(1);
    let listing = state.queue.page(page, state.page_size)?;
    if page > 1 && listing.records.is_empty() {
        return Ok(not_found());
    }

    let shown = (page - 1) * state.page_size + listing.records.len();
    let body = Paginated {
        count: listing.count,
        next: (shown < listing.count).then(|| format!("{WEBPAGES_PATH}?page={}", page + 1)),
        previous: (page > 1).then(|| format!("{WEBPAGES_PATH}?page={}", page - 1)),
        results: listing
            .records
            .into_iter()
            .map(WebpageResource::from)
            .collect(),
    };
    Ok(Json(body).into_response())
}

async fn retrieve_webpage(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<Response, SummaryError> {
    Ok(match state.queue.get(id)? {
        Some(record) => Json(WebpageResource::from(record)).into_response(),
        None => not_found(),
    })
}

async fn delete_webpage(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, SummaryError> {
    if let Some(record) = state.queue.get(id)? {
        state.queue.delete(&record.url).await?;
    }
    Ok(StatusCode::NO_CONTENT)
}
