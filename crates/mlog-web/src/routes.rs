//! Request handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use mlog_core::{
    BucketStore, RangeSpec, ReportEntry, StoreError, SummaryEntry, TimeRange, query_detail,
    query_report,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct RangeQuery {
    /// `today`, `yesterday`, `day`, `week` or `month`. Defaults to `today`.
    pub range: Option<String>,
    /// Count for `day` and `week`. Defaults to 1.
    pub number: Option<i64>,
    /// Minutes. Defaults to the configured threshold.
    pub threshold: Option<u64>,
}

impl RangeQuery {
    fn spec(&self) -> Result<RangeSpec, ApiError> {
        let name = self.range.as_deref().unwrap_or("today");
        RangeSpec::parse(name, self.number).map_err(|e| ApiError::BadRequest(e.to_string()))
    }
}

#[derive(Debug, Serialize)]
pub struct RecordsResponse {
    pub range: String,
    /// Day or week count the range was resolved with.
    pub number: u32,
    /// Minutes.
    pub threshold: u64,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub entries: Vec<ReportEntry>,
}

#[derive(Debug, Serialize)]
pub struct DetailResponse {
    pub range: String,
    pub number: u32,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(flatten)]
    pub entry: SummaryEntry,
}

/// Errors returned to clients as `{"error": "..."}`.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        tracing::error!(error = %err, cause = %err.source_message(), "query failed");
        Self::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            Self::NotFound(m) => (StatusCode::NOT_FOUND, m),
            Self::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// GET /health
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// GET /api/records - thresholded report for a range.
pub async fn records(
    State(state): State<AppState>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<RecordsResponse>, ApiError> {
    let spec = query.spec()?;
    let threshold = query.threshold.unwrap_or(state.default_threshold);
    let now = (state.clock)();

    let (range, report) =
        with_store(&state, move |store| query_report(store, spec, threshold, &now)).await?;
    tracing::debug!(%spec, threshold, entries = report.entries.len(), "served records");

    Ok(Json(RecordsResponse {
        range: spec.to_string(),
        number: spec.count(),
        threshold: report.threshold_minutes,
        start: range.start,
        end: range.end,
        entries: report.entries,
    }))
}

/// GET /api/records/{application} - window breakdown for one application.
pub async fn record_detail(
    State(state): State<AppState>,
    Path(application): Path<String>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<DetailResponse>, ApiError> {
    let spec = query.spec()?;
    let now = (state.clock)();
    let range = TimeRange::resolve(spec, &now);

    let lookup = application.clone();
    let entry = with_store(&state, move |store| query_detail(store, spec, &lookup, &now))
        .await?
        .ok_or_else(|| {
            ApiError::NotFound(format!("no activity for '{application}' in {spec}"))
        })?;

    Ok(Json(DetailResponse {
        range: spec.to_string(),
        number: spec.count(),
        start: range.start,
        end: range.end,
        entry,
    }))
}

/// Runs `f` with the store locked, on the blocking thread pool.
///
/// Store fetches are synchronous SQLite reads and must not stall the runtime's
/// worker threads.
async fn with_store<T, F>(state: &AppState, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&(dyn BucketStore + Send)) -> Result<T, StoreError> + Send + 'static,
{
    let store = Arc::clone(&state.store);
    tokio::task::spawn_blocking(move || {
        let store = store
            .lock()
            .map_err(|_| ApiError::Internal("store lock poisoned".to_string()))?;
        Ok(f(&*store)?)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("query task failed: {e}")))?
}
