//! HTTP API: registry CRUD, dashboard reads and live SSE streams.

use std::convert::Infallible;
use std::sync::{Arc, Weak};
use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use futures_util::stream::{self, Stream};
use parking_lot::Mutex;
use rigwatch_poller::{AggregateResult, Countdown, Poller, PollerError, Subscription};
use rigwatch_types::{HealthSummary, MetricsSnapshot, Source};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::registry::{Registry, RegistryError};

#[derive(Debug, Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub poller: Poller,
    /// List subscription shared by every open dashboard stream.
    dashboard_feed: Arc<Mutex<Weak<Subscription>>>,
}

impl AppState {
    /// Wire the registry into the poller and return the shared state.
    pub fn new(registry: Arc<Registry>, poller: Poller) -> Self {
        poller.set_sources(registry.list());
        Self {
            registry,
            poller,
            dashboard_feed: Arc::new(Mutex::new(Weak::new())),
        }
    }

    fn sync_sources(&self) {
        self.poller.set_sources(self.registry.list());
    }

    /// The list subscription behind the dashboard streams.
    ///
    /// Started by the first client and cancelled when the last one drops it.
    pub fn dashboard_subscription(&self) -> Arc<Subscription> {
        let mut feed = self.dashboard_feed.lock();
        if let Some(subscription) = feed.upgrade() {
            return subscription;
        }
        let subscription = Arc::new(self.poller.subscribe(self.poller.list_config()));
        *feed = Arc::downgrade(&subscription);
        subscription
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/servers", get(list_servers).post(create_server))
        .route("/api/servers/{id}", get(get_server).delete(delete_server))
        .route("/api/servers/{id}/metrics", get(server_metrics))
        .route("/api/servers/{id}/stream", get(server_stream))
        .route("/api/dashboard", get(dashboard))
        .route("/api/dashboard/stream", get(dashboard_stream))
        .with_state(state)
}

/// Error body is always `{"error": "..."}`.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            ApiError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::Validation(m) => ApiError::BadRequest(m),
            RegistryError::NotFound(_) => ApiError::NotFound("Server not found".to_string()),
            other => {
                warn!("registry failure: {}", other);
                ApiError::Internal(other.to_string())
            }
        }
    }
}

impl From<PollerError> for ApiError {
    fn from(err: PollerError) -> Self {
        ApiError::NotFound(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

fn parse_id(raw: &str) -> Result<i64, ApiError> {
    raw.trim()
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid server ID".to_string()))
}

// GET /api/servers
async fn list_servers(State(app): State<AppState>) -> Json<Vec<Source>> {
    Json(app.registry.list())
}

#[derive(Debug, Deserialize)]
struct CreateServer {
    name: Option<String>,
    url_api: Option<String>,
}

// POST /api/servers
async fn create_server(
    State(app): State<AppState>,
    body: Result<Json<CreateServer>, JsonRejection>,
) -> Result<(StatusCode, Json<Source>), ApiError> {
    let Json(body) = body?;
    let source = app.registry.create(
        body.name.as_deref().unwrap_or_default(),
        body.url_api.as_deref().unwrap_or_default(),
    )?;
    app.sync_sources();
    Ok((StatusCode::CREATED, Json(source)))
}

// GET /api/servers/{id}
async fn get_server(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Source>, ApiError> {
    let id = parse_id(&id)?;
    Ok(Json(app.registry.get(id)?))
}

// DELETE /api/servers/{id}
async fn delete_server(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id = parse_id(&id)?;
    app.registry.delete(id)?;
    app.sync_sources();
    Ok(Json(json!({ "message": "Server deleted successfully" })))
}

#[derive(Debug, Serialize)]
struct MetricsView {
    latest: Arc<MetricsSnapshot>,
    last_good: Option<Arc<MetricsSnapshot>>,
}

// GET /api/servers/{id}/metrics
async fn server_metrics(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MetricsView>, ApiError> {
    let id = parse_id(&id)?;
    app.registry.get(id)?;
    let latest = app.poller.latest_snapshot(id)?;
    Ok(Json(MetricsView {
        latest,
        last_good: app.poller.last_good_snapshot(id),
    }))
}

#[derive(Debug, Default, Deserialize)]
struct DashboardQuery {
    #[serde(default)]
    refresh: bool,
}

#[derive(Debug, Serialize)]
struct DashboardView {
    summary: HealthSummary,
    next_update_at_ms: Option<u64>,
    aggregate: Arc<AggregateResult>,
}

// GET /api/dashboard[?refresh=true]
async fn dashboard(
    State(app): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Json<DashboardView> {
    let aggregate = if query.refresh {
        app.poller.run_cycle().await
    } else {
        app.poller.latest_aggregate()
    };
    Json(DashboardView {
        summary: aggregate.summary(),
        next_update_at_ms: app.poller.next_list_cycle_ms(),
        aggregate,
    })
}

// GET /api/dashboard/stream
async fn dashboard_stream(
    State(app): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let subscription = app.dashboard_subscription();
    debug!(
        clients = Arc::strong_count(&subscription),
        "dashboard stream opened"
    );
    sse(subscription)
}

// GET /api/servers/{id}/stream
async fn server_stream(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let id = parse_id(&id)?;
    app.registry.get(id)?;
    let subscription = app.poller.subscribe(app.poller.detail_config(id));
    debug!(source_id = id, "server stream opened");
    Ok(sse(Arc::new(subscription)))
}

fn sse(subscription: Arc<Subscription>) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    Sse::new(subscription_events(subscription))
        .keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}

struct StreamState {
    // Held so the subscription is cancelled once its last client goes away.
    _subscription: Arc<Subscription>,
    results: watch::Receiver<Arc<AggregateResult>>,
    countdown: Option<watch::Receiver<Countdown>>,
}

enum Update {
    Results,
    Countdown,
}

/// Turn a subscription into `snapshot` and `countdown` events.
///
/// The stream ends when the subscription stops publishing.
pub fn subscription_events(
    subscription: Arc<Subscription>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    let state = StreamState {
        results: subscription.results(),
        countdown: subscription.countdown(),
        _subscription: subscription,
    };

    stream::unfold(state, |mut state| async move {
        let update = match state.countdown.as_mut() {
            Some(countdown) => tokio::select! {
                changed = state.results.changed() => changed.map(|_| Update::Results),
                changed = countdown.changed() => changed.map(|_| Update::Countdown),
            },
            None => state.results.changed().await.map(|_| Update::Results),
        };

        let event = match update.ok()? {
            Update::Results => {
                let aggregate = state.results.borrow_and_update().clone();
                json_event("snapshot", &*aggregate)
            }
            Update::Countdown => {
                let countdown = *state.countdown.as_mut()?.borrow_and_update();
                json_event("countdown", &countdown)
            }
        };
        Some((Ok(event), state))
    })
}

fn json_event<T: Serialize>(name: &str, value: &T) -> Event {
    Event::default()
        .event(name)
        .json_data(value)
        .unwrap_or_else(|err| Event::default().event("error").data(err.to_string()))
}
