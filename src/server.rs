//! HTTP ingest and query service.
//!
//! **Ingest:**
//! - `GET  /` welcome text
//! - `POST /upload_csv` multipart upload (field `file`), merged into the store
//! - `GET  /graphs` distinct node identifiers in the store
//! - `GET  /health` server status and store counts
//!
//! **Queries** (over the most recently uploaded table; 404 before any upload):
//! - `GET  /query/census`
//! - `GET  /query/roles/{role}`
//! - `GET  /query/roles/{role}/attributes`
//! - `GET  /query/entities/{id}/attributes`
//! - `GET  /query/entities/{id}/interactions?scope=performed_by|performed_or_object`
//! - `GET  /query/entities/{id}/summary?scope=...`
//! - `GET  /query/entities/{id}/states`
//! - `GET  /query/interactions/{id}/emotion`
//! - `GET  /query/interactions/{id}/context`
//! - `GET  /query/emotions/{role}?scope=...`
//!
//! Uploads are applied one at a time, so the query engine always matches the
//! last upload to finish. Errors are JSON `{"error": "..."}`.

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;

use crate::config::ServiceConfig;
use crate::error::{EbbError, TableError};
use crate::graph::GraphStore;
use crate::ingest::{IngestReport, Ingestor};
use crate::query::{
    Attributes, EmotionalState, EntityAttributes, InteractionRow, InvolvementScope, QueryEngine,
    Role,
};
use crate::report::{self, EmotionCount, RoleCensus, TimelinePoint};
use crate::table::{Triple, TripleTable};

const WELCOME: &str =
    "Welcome to the Ethical Black Box CSV API. Use /upload_csv to upload your files.";

// ── Server state ──────────────────────────────────────────────────────────

/// Shared state: the graph store and the engine for the last upload.
pub struct AppState {
    ingestor: Ingestor,
    engine: RwLock<Option<Arc<QueryEngine>>>,
    /// Held from the start of a merge until its engine is installed.
    upload_lock: Mutex<()>,
}

impl AppState {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self {
            ingestor: Ingestor::new(store),
            engine: RwLock::new(None),
            upload_lock: Mutex::new(()),
        }
    }

    fn store(&self) -> &Arc<dyn GraphStore> {
        self.ingestor.store()
    }

    async fn engine(&self) -> Result<Arc<QueryEngine>, ApiError> {
        self.engine.read().await.clone().ok_or_else(|| {
            ApiError::new(
                StatusCode::NOT_FOUND,
                "no CSV has been uploaded yet; POST one to /upload_csv",
            )
        })
    }
}

// ── Errors ────────────────────────────────────────────────────────────────

/// An error response rendered as `{"error": message}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl From<EbbError> for ApiError {
    fn from(e: EbbError) -> Self {
        let status = match &e {
            EbbError::Table(TableError::SchemaMismatch { .. }) => StatusCode::UNPROCESSABLE_ENTITY,
            EbbError::Query(_) => StatusCode::BAD_REQUEST,
            EbbError::Table(_) | EbbError::Store(_) | EbbError::Graph(_) | EbbError::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self::new(status, e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, error = %self.message, "request failed");
        }
        (
            self.status,
            Json(serde_json::json!({ "error": self.message })),
        )
            .into_response()
    }
}

/// Run a store call on the blocking pool.
async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, EbbError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::internal(format!("store task failed: {e}")))?
        .map_err(ApiError::from)
}

fn parse_role(raw: &str) -> Result<Role, ApiError> {
    raw.parse::<Role>().map_err(|e| EbbError::from(e).into())
}

// ── Request and response types ────────────────────────────────────────────

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    nodes: usize,
    edges: usize,
    table_loaded: bool,
}

#[derive(Serialize)]
struct UploadResponse {
    message: String,
    #[serde(flatten)]
    report: IngestReport,
}

#[derive(Debug, Default, Deserialize)]
struct ScopeParams {
    scope: Option<InvolvementScope>,
}

#[derive(Serialize)]
struct EmotionReport {
    role: Role,
    scope: InvolvementScope,
    counts: Vec<EmotionCount>,
    timeline: Vec<TimelinePoint>,
}

// ── Ingest handlers ───────────────────────────────────────────────────────

async fn index() -> &'static str {
    WELCOME
}

async fn health(State(state): State<Arc<AppState>>) -> Result<Json<HealthResponse>, ApiError> {
    let store = Arc::clone(state.store());
    let (nodes, edges) = blocking(move || Ok((store.node_count()?, store.edge_count()?))).await?;
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        nodes,
        edges,
        table_loaded: state.engine.read().await.is_some(),
    }))
}

async fn upload_csv(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut data = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::new(e.status(), e.body_text()))?
    {
        if field.name() == Some("file") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::new(e.status(), e.body_text()))?;
            data = Some(bytes);
            break;
        }
    }
    let Some(data) = data else {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "multipart field \"file\" is missing",
        ));
    };

    let table = TripleTable::from_bytes(&data).map_err(EbbError::from)?;
    tracing::info!(bytes = data.len(), rows = table.len(), "received CSV upload");

    let _applying = state.upload_lock.lock().await;
    let ingestor = state.ingestor.clone();
    let (report, engine) = blocking(move || {
        let report = ingestor.ingest_table(&table)?;
        Ok((report, QueryEngine::new(table)))
    })
    .await?;

    *state.engine.write().await = Some(Arc::new(engine));

    Ok(Json(UploadResponse {
        message: "Data added successfully".to_string(),
        report,
    }))
}

async fn list_nodes(State(state): State<Arc<AppState>>) -> Result<Json<Vec<String>>, ApiError> {
    let store = Arc::clone(state.store());
    let ids = blocking(move || Ok(store.node_ids()?)).await?;
    Ok(Json(ids))
}

// ── Query handlers ────────────────────────────────────────────────────────

async fn census(State(state): State<Arc<AppState>>) -> Result<Json<RoleCensus>, ApiError> {
    let engine = state.engine().await?;
    Ok(Json(report::role_census(&engine)))
}

async fn role_entities(
    State(state): State<Arc<AppState>>,
    Path(role): Path<String>,
) -> Result<Json<Vec<String>>, ApiError> {
    let role = parse_role(&role)?;
    let engine = state.engine().await?;
    Ok(Json(engine.entities_of_role(role)))
}

async fn role_attributes(
    State(state): State<Arc<AppState>>,
    Path(role): Path<String>,
) -> Result<Json<Vec<EntityAttributes>>, ApiError> {
    let role = parse_role(&role)?;
    let engine = state.engine().await?;
    Ok(Json(engine.attribute_summary(role)))
}

async fn entity_attributes(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Attributes>, ApiError> {
    let engine = state.engine().await?;
    Ok(Json(engine.attributes_of(&id)))
}

async fn entity_interactions(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<ScopeParams>,
) -> Result<Json<Vec<String>>, ApiError> {
    let engine = state.engine().await?;
    Ok(Json(engine.interactions_for(&id, params.scope.unwrap_or_default())))
}

async fn entity_summary(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<ScopeParams>,
) -> Result<Json<Vec<InteractionRow>>, ApiError> {
    let engine = state.engine().await?;
    Ok(Json(
        engine.interaction_summary_for(&id, params.scope.unwrap_or_default()),
    ))
}

async fn entity_states(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<String>>, ApiError> {
    let engine = state.engine().await?;
    Ok(Json(engine.emotional_states_of(&id)))
}

async fn interaction_emotion(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<EmotionalState>, ApiError> {
    let engine = state.engine().await?;
    Ok(Json(engine.emotional_state_for_interaction(&id)))
}

async fn interaction_context(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Triple>>, ApiError> {
    let engine = state.engine().await?;
    Ok(Json(engine.interaction_context(&id)))
}

async fn role_emotions(
    State(state): State<Arc<AppState>>,
    Path(role): Path<String>,
    Query(params): Query<ScopeParams>,
) -> Result<Json<EmotionReport>, ApiError> {
    let role = parse_role(&role)?;
    let scope = params.scope.unwrap_or(InvolvementScope::PerformedOrObject);
    let engine = state.engine().await?;
    let rows = report::role_interaction_report(&engine, role, scope);
    Ok(Json(EmotionReport {
        role,
        scope,
        counts: report::emotion_counts(&rows),
        timeline: report::emotional_timeline(&rows),
    }))
}

// ── Router ────────────────────────────────────────────────────────────────

/// Build the application router. Request bodies above `max_upload_bytes` are
/// rejected with 413.
pub fn router(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    Router::new()
        // Ingest.
        .route("/", get(index))
        .route("/health", get(health))
        .route("/upload_csv", post(upload_csv))
        .route("/graphs", get(list_nodes))
        // Queries.
        .route("/query/census", get(census))
        .route("/query/roles/{role}", get(role_entities))
        .route("/query/roles/{role}/attributes", get(role_attributes))
        .route("/query/entities/{id}/attributes", get(entity_attributes))
        .route("/query/entities/{id}/interactions", get(entity_interactions))
        .route("/query/entities/{id}/summary", get(entity_summary))
        .route("/query/entities/{id}/states", get(entity_states))
        .route("/query/interactions/{id}/emotion", get(interaction_emotion))
        .route("/query/interactions/{id}/context", get(interaction_context))
        .route("/query/emotions/{role}", get(role_emotions))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind the configured address and serve until the process exits.
pub async fn serve(config: &ServiceConfig, state: Arc<AppState>) -> std::io::Result<()> {
    let addr = config.listen_addr();
    let app = router(state, config.max_upload_bytes);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("ebb server listening on {addr}");
    axum::serve(listener, app).await
}
