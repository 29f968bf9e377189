use axum::{
    extract::{DefaultBodyLimit, Path, State},
    http::header,
    response::{Html, IntoResponse},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::errors::ApiError;
use super::pages::render_home;
use super::predict::{self, DeliveryMode, SelectionPolicy};
use crate::catalog::DiseaseCatalog;
use crate::storage::{ImageStore, StoreError};
use crate::version;
use crate::vision::image_utils::MAX_IMAGE_SIZE;
use crate::vision::{Annotator, ModelAccessor};

/// Shared state for the axum handlers
#[derive(Clone)]
pub struct AppState {
    pub accessor: Arc<ModelAccessor>,
    pub annotator: Arc<Annotator>,
    pub catalog: Arc<DiseaseCatalog>,
    pub store: Arc<ImageStore>,
    pub delivery: DeliveryMode,
    pub selection: SelectionPolicy,
    pub static_dir: PathBuf,
}

/// Headroom for multipart framing on top of the image size cap
const BODY_LIMIT: usize = MAX_IMAGE_SIZE + 64 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub model_loaded: bool,
    pub load_mode: String,
    pub catalog_entries: usize,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        // Upload form and pipeline
        .route("/", get(home_handler).post(predict::predict_handler))
        // Stored annotated images
        .route("/images/:filename", get(serve_image_handler))
        // Static asset passthrough
        .route("/favicon.ico", get(favicon_handler))
        // Health check
        .route("/health", get(health_handler))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn start_server(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn home_handler() -> Html<String> {
    Html(render_home(None))
}

/// GET /images/:filename - stream a previously stored image
///
/// Stored files are annotated derivatives and raw uploads; both are served
/// as JPEG, matching how they are encoded on the way in.
async fn serve_image_handler(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let bytes = state.store.read(&filename).map_err(|e| match e {
        StoreError::NotFound(name) => ApiError::NotFound(name),
        StoreError::InvalidFilename(name) => {
            ApiError::InvalidRequest(format!("invalid filename {name:?}"))
        }
        StoreError::Io(e) => ApiError::InternalError(e.to_string()),
    })?;

    Ok(([(header::CONTENT_TYPE, "image/jpeg")], bytes))
}

async fn favicon_handler(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let path = state.static_dir.join("favicon.ico");
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|_| ApiError::NotFound("favicon.ico".to_string()))?;

    Ok(([(header::CONTENT_TYPE, "image/vnd.microsoft.icon")], bytes))
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    axum::response::Json(HealthResponse {
        status: "ok".to_string(),
        version: version::VERSION.to_string(),
        model_loaded: state.accessor.is_loaded(),
        load_mode: format!("{:?}", state.accessor.mode()),
        catalog_entries: state.catalog.len(),
    })
}
