//! Request handlers. Each decodes its input, calls one service and encodes
//! the result.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tt_core::{ActiveTimer, Entry, EntryId, FilterParams, Summary};

use super::AppState;
use super::error::ApiError;
use crate::service::{CreateEntry, IssueTransition, StartTimer, StopTimer, UpdateEntry};

type ApiResult<T> = Result<T, ApiError>;

const CSV_FILENAME: &str = "time_entries.csv";

#[derive(Debug, Serialize)]
pub(crate) struct Health {
    status: &'static str,
    service: String,
    version: &'static str,
    timestamp: DateTime<Utc>,
    active_timers: usize,
    total_entries: usize,
}

#[derive(Debug, Serialize)]
pub(crate) struct EntryList {
    count: usize,
    entries: Vec<Entry>,
}

#[derive(Debug, Serialize)]
pub(crate) struct Deleted {
    message: &'static str,
    id: EntryId,
}

#[derive(Debug, Serialize)]
pub(crate) struct TransitionHandled {
    stopped_timers: usize,
}

pub(crate) async fn health(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "healthy",
        service: state.service_name.to_string(),
        version: env!("CARGO_PKG_VERSION"),
        timestamp: state.clock.now(),
        active_timers: state.store.active_timer_count(),
        total_entries: state.store.entry_count(),
    })
}

// ========== Timers ==========

pub(crate) async fn start_timer(
    State(state): State<AppState>,
    payload: Result<Json<StartTimer>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ActiveTimer>)> {
    let Json(request) = payload?;
    let timer = state.timers.start(request)?;
    Ok((StatusCode::CREATED, Json(timer)))
}

pub(crate) async fn stop_timer(
    State(state): State<AppState>,
    payload: Result<Json<StopTimer>, JsonRejection>,
) -> ApiResult<Json<Entry>> {
    let Json(request) = payload?;
    Ok(Json(state.timers.stop(request)?))
}

pub(crate) async fn active_timer(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<ActiveTimer>> {
    Ok(Json(state.timers.get_active(&user_id)?))
}

// ========== Entries ==========

pub(crate) async fn create_entry(
    State(state): State<AppState>,
    payload: Result<Json<CreateEntry>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Entry>)> {
    let Json(request) = payload?;
    let entry = state.entries.create(request)?;
    Ok((StatusCode::CREATED, Json(entry)))
}

pub(crate) async fn list_entries(
    State(state): State<AppState>,
    query: Result<Query<FilterParams>, QueryRejection>,
) -> ApiResult<Json<EntryList>> {
    let Query(params) = query?;
    let entries = state.entries.list(&params)?;
    Ok(Json(EntryList {
        count: entries.len(),
        entries,
    }))
}

pub(crate) async fn get_entry(
    State(state): State<AppState>,
    id: Result<Path<u64>, PathRejection>,
) -> ApiResult<Json<Entry>> {
    let Path(id) = id?;
    Ok(Json(state.entries.get(EntryId::new(id))?))
}

pub(crate) async fn update_entry(
    State(state): State<AppState>,
    id: Result<Path<u64>, PathRejection>,
    payload: Result<Json<UpdateEntry>, JsonRejection>,
) -> ApiResult<Json<Entry>> {
    let Path(id) = id?;
    let Json(request) = payload?;
    Ok(Json(state.entries.update(EntryId::new(id), request)?))
}

pub(crate) async fn delete_entry(
    State(state): State<AppState>,
    id: Result<Path<u64>, PathRejection>,
) -> ApiResult<Json<Deleted>> {
    let Path(id) = id?;
    let entry = state.entries.delete(EntryId::new(id))?;
    Ok(Json(Deleted {
        message: "Entry deleted",
        id: entry.id,
    }))
}

// ========== Reports ==========

pub(crate) async fn summary(
    State(state): State<AppState>,
    query: Result<Query<FilterParams>, QueryRejection>,
) -> ApiResult<Json<Summary>> {
    let Query(params) = query?;
    Ok(Json(state.entries.summarize(&params)?))
}

pub(crate) async fn export_csv(
    State(state): State<AppState>,
    query: Result<Query<FilterParams>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let Query(params) = query?;
    let body = state.entries.export_csv(&params)?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{CSV_FILENAME}\""),
            ),
        ],
        body,
    ))
}

// ========== Webhooks ==========

pub(crate) async fn issue_transitioned(
    State(state): State<AppState>,
    payload: Result<Json<IssueTransition>, JsonRejection>,
) -> ApiResult<Json<TransitionHandled>> {
    let Json(event) = payload?;
    let stopped_timers = state.webhooks.handle_issue_transition(event)?;
    Ok(Json(TransitionHandled { stopped_timers }))
}

pub(crate) async fn not_found() -> ApiError {
    ApiError::RouteNotFound
}
