use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::error;
use wordmine_types::{SortOrder, Vocabulary, VocabularyType, sort_entries};

use crate::batch::{BatchEvent, FileState, FileStatus};
use crate::error::ExtractError;
use crate::filter::FilterConfig;
use crate::pipeline::{Extractor, References, Source};
use crate::progress::LogProgress;

/// Finished jobs kept for polling before they are evicted.
const MAX_FINISHED_JOBS: usize = 64;
const FINISHED_JOB_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Clone)]
pub struct AppState {
    pub extractor: Arc<Extractor>,
    pub jobs: Arc<DashMap<u64, BatchJob>>,
    pub next_job: Arc<AtomicU64>,
    pub retention: JobRetention,
}

impl AppState {
    pub fn new(extractor: Arc<Extractor>) -> Self {
        Self {
            extractor,
            jobs: Arc::new(DashMap::new()),
            next_job: Arc::new(AtomicU64::new(1)),
            retention: JobRetention::default(),
        }
    }

    pub fn with_job_retention(mut self, retention: JobRetention) -> Self {
        self.retention = retention;
        self
    }
}

/// How long done or failed jobs stay pollable. Running jobs are never evicted.
#[derive(Clone, Copy, Debug)]
pub struct JobRetention {
    pub max_finished: usize,
    pub ttl: Duration,
}

impl Default for JobRetention {
    fn default() -> Self {
        Self {
            max_finished: MAX_FINISHED_JOBS,
            ttl: FINISHED_JOB_TTL,
        }
    }
}

#[derive(Deserialize)]
pub struct ExtractRequest {
    pub source: Source,
    #[serde(default)]
    pub filters: FilterConfig,
    #[serde(default)]
    pub references: References,
    #[serde(default)]
    pub sort: SortOrder,
}

#[derive(Serialize)]
pub struct ExtractResponse {
    vocabulary: Vocabulary,
    warnings: Vec<String>,
}

#[derive(Deserialize)]
pub struct BatchRequest {
    pub paths: Vec<PathBuf>,
    #[serde(default)]
    pub filters: FilterConfig,
    #[serde(default)]
    pub references: References,
    #[serde(default)]
    pub sort: SortOrder,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Running,
    Done,
    Failed,
}

/// Polled view of a background batch.
#[derive(Clone, Debug, Serialize)]
pub struct BatchJob {
    pub id: u64,
    pub state: JobState,
    pub current: Option<PathBuf>,
    pub files: Vec<FileState>,
    pub vocabulary: Option<Vocabulary>,
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    pub finished_at: Option<Instant>,
}

impl BatchJob {
    fn finish(&mut self, state: JobState) {
        self.state = state;
        self.current = None;
        self.finished_at = Some(Instant::now());
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/v1/extract", post(extract))
        .route("/v1/batches", post(start_batch))
        .route("/v1/batches/{id}", get(batch_status))
        .with_state(state)
}

async fn healthz() -> impl IntoResponse {
    "ok"
}

async fn extract(
    State(state): State<AppState>,
    payload: Result<Json<ExtractRequest>, JsonRejection>,
) -> Result<Json<ExtractResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let extractor = Arc::clone(&state.extractor);
    let response = tokio::task::spawn_blocking(move || run_extract(&extractor, request))
        .await
        .map_err(|e| {
            error!("extraction task failed: {e}");
            ApiError::Internal
        })??;
    Ok(Json(response))
}

fn run_extract(extractor: &Extractor, request: ExtractRequest) -> Result<ExtractResponse, ApiError> {
    let raw = extractor.extract(&request.source, &mut LogProgress)?;
    let outcome = extractor.refine(raw, &request.filters, &request.references);
    let mut entries = outcome.entries;
    sort_entries(&mut entries, request.sort);
    Ok(ExtractResponse {
        vocabulary: request.source.vocabulary(entries),
        warnings: outcome.warnings.iter().map(ToString::to_string).collect(),
    })
}

async fn start_batch(
    State(state): State<AppState>,
    payload: Result<Json<BatchRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    if request.paths.is_empty() {
        return Err(ApiError::bad_request("paths must not be empty"));
    }

    prune_jobs(&state.jobs, state.retention);
    let id = state.next_job.fetch_add(1, Ordering::Relaxed);
    state.jobs.insert(
        id,
        BatchJob {
            id,
            state: JobState::Running,
            current: None,
            files: request
                .paths
                .iter()
                .map(|p| FileState {
                    file: p.clone(),
                    status: FileStatus::Pending,
                })
                .collect(),
            vocabulary: None,
            warnings: Vec::new(),
            error: None,
            finished_at: None,
        },
    );

    let extractor = Arc::clone(&state.extractor);
    let jobs = Arc::clone(&state.jobs);
    let retention = state.retention;
    let worker = {
        let jobs = Arc::clone(&jobs);
        tokio::task::spawn_blocking(move || run_batch(&extractor, &jobs, id, request))
    };
    tokio::spawn(async move {
        if let Err(e) = worker.await {
            error!(job = id, "batch task failed: {e}");
            if let Some(mut job) = jobs.get_mut(&id) {
                job.error = Some("batch stopped unexpectedly".to_string());
                job.finish(JobState::Failed);
            }
        }
        prune_jobs(&jobs, retention);
    });

    Ok((StatusCode::ACCEPTED, Json(json!({ "id": id }))).into_response())
}

fn run_batch(extractor: &Extractor, jobs: &DashMap<u64, BatchJob>, id: u64, request: BatchRequest) {
    let report = extractor.extract_batch(&request.paths, &mut |event| {
        let Some(mut job) = jobs.get_mut(&id) else {
            return;
        };
        match event {
            BatchEvent::Started(path) => job.current = Some(path.to_path_buf()),
            BatchEvent::Finished(path, status) => {
                job.current = None;
                if let Some(file) = job
                    .files
                    .iter_mut()
                    .find(|f| f.file == path && f.status == FileStatus::Pending)
                {
                    file.status = status.clone();
                }
            }
        }
    });

    let outcome = extractor.refine(report.entries, &request.filters, &request.references);
    let mut entries = outcome.entries;
    sort_entries(&mut entries, request.sort);
    let vocabulary = Vocabulary::new(format!("batch-{id}"), VocabularyType::Document, entries);

    if let Some(mut job) = jobs.get_mut(&id) {
        job.files = report.statuses;
        job.vocabulary = Some(vocabulary);
        job.warnings = outcome.warnings.iter().map(ToString::to_string).collect();
        job.finish(JobState::Done);
    }
}

/// Drop finished jobs past their TTL, then the oldest ones over the cap.
fn prune_jobs(jobs: &DashMap<u64, BatchJob>, retention: JobRetention) {
    jobs.retain(|_, job| job.finished_at.is_none_or(|at| at.elapsed() < retention.ttl));
    let mut finished: Vec<(Instant, u64)> = jobs
        .iter()
        .filter_map(|job| job.finished_at.map(|at| (at, job.id)))
        .collect();
    if finished.len() <= retention.max_finished {
        return;
    }
    finished.sort_unstable();
    let excess = finished.len() - retention.max_finished;
    for (_, id) in finished.into_iter().take(excess) {
        jobs.remove(&id);
    }
}

async fn batch_status(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<BatchJob>, ApiError> {
    let job = state
        .jobs
        .get(&id)
        .map(|job| job.value().clone())
        .ok_or_else(|| ApiError::NotFound(format!("unknown batch {id}")))?;
    Ok(Json(job))
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("internal server error")]
    Internal,
}

impl ApiError {
    fn bad_request<T: Into<String>>(msg: T) -> Self {
        ApiError::BadRequest(msg.into())
    }
}

impl From<ExtractError> for ApiError {
    fn from(err: ExtractError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(msg) => {
                let body = Json(ErrorResponse { error: msg });
                (StatusCode::BAD_REQUEST, body).into_response()
            }
            ApiError::NotFound(msg) => {
                let body = Json(ErrorResponse { error: msg });
                (StatusCode::NOT_FOUND, body).into_response()
            }
            ApiError::Internal => {
                let body = Json(json!({ "error": "internal server error" }));
                (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
            }
        }
    }
}
