//! HTTP transport: routes, shared state, request tracing and panic recovery.

mod error;
mod handlers;

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::Request;
use axum::middleware::{Next, from_fn};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use tracing::Instrument;
use tt_core::Clock;
use tt_store::TimeStore;

use crate::Config;
use crate::service::{EntryService, TimerService, WebhookHandler};

pub use error::ApiError;

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    timers: TimerService,
    entries: EntryService,
    webhooks: WebhookHandler,
    store: Arc<TimeStore>,
    clock: Arc<dyn Clock>,
    service_name: Arc<str>,
}

impl AppState {
    pub fn new(config: &Config, store: Arc<TimeStore>, clock: Arc<dyn Clock>) -> Self {
        let timers = TimerService::new(Arc::clone(&store), Arc::clone(&clock));
        Self {
            entries: EntryService::new(Arc::clone(&store), Arc::clone(&clock)),
            webhooks: WebhookHandler::new(Arc::clone(&store), timers.clone()),
            timers,
            store,
            clock,
            service_name: Arc::from(config.service_name.as_str()),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/timer/start", post(handlers::start_timer))
        .route("/api/timer/stop", post(handlers::stop_timer))
        .route("/api/timer/active/:user_id", get(handlers::active_timer))
        .route(
            "/api/entries",
            get(handlers::list_entries).post(handlers::create_entry),
        )
        .route(
            "/api/entries/:id",
            get(handlers::get_entry)
                .put(handlers::update_entry)
                .delete(handlers::delete_entry),
        )
        .route("/api/reports/summary", get(handlers::summary))
        .route("/api/export/csv", get(handlers::export_csv))
        .route(
            "/api/webhooks/issue-transitioned",
            post(handlers::issue_transitioned),
        )
        .fallback(handlers::not_found)
        .layer(from_fn(trace_requests))
        .with_state(state)
}

async fn trace_requests(request: Request, next: Next) -> Response {
    let span = tracing::info_span!(
        "http.request",
        method = %request.method(),
        path = %request.uri().path(),
    );
    let started = Instant::now();
    // Handlers run on their own task; a panic comes back as a JoinError.
    let response = match tokio::spawn(next.run(request).instrument(span.clone())).await {
        Ok(response) => response,
        Err(err) => span.in_scope(|| match err.try_into_panic() {
            Ok(panic) => error::handle_panic(panic),
            Err(err) => {
                tracing::error!(error = %err, "handler task cancelled");
                ApiError::Internal.into_response()
            }
        }),
    };

    let status = response.status().as_u16();
    let latency_ms = started.elapsed().as_millis();
    span.in_scope(|| {
        if response.status().is_server_error() {
            tracing::error!(status, latency_ms, "request failed");
        } else if response.status().is_client_error() {
            tracing::warn!(status, latency_ms, "request rejected");
        } else {
            tracing::info!(status, latency_ms, "request handled");
        }
    });
    response
}
