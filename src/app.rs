use axum::{
    Json, Router,
    extract::{
        DefaultBodyLimit, Multipart, Path, Query, State,
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
    },
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::config::DashboardConfig;
use crate::dashboard::{self, DashboardSession, UploadOutcome};
use crate::downloader::{self, ExportFormat};
use crate::error::DashboardError;
use crate::filter::{FilterQuery, FilterSelection, filter_dataset};
use crate::graph::ChartId;
use crate::render::{self, ImageFormat};

pub struct AppState {
    session: Mutex<DashboardSession>,
    config: DashboardConfig,
}

impl AppState {
    pub fn new(config: DashboardConfig) -> Self {
        Self {
            session: Mutex::new(DashboardSession::new(config.columns.clone())),
            config,
        }
    }

    fn session(&self) -> MutexGuard<'_, DashboardSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Deserialize)]
struct DataUrlUpload {
    filename: String,
    contents: String,
}

#[derive(Deserialize)]
struct ChartQuery {
    format: Option<String>,
    #[serde(flatten)]
    filters: FilterQuery,
}

#[derive(Serialize)]
struct StatusResponse {
    status: String,
    message: Option<String>,
}

#[derive(Serialize)]
struct SessionInfo {
    status: String,
    filename: Option<String>,
    loaded_at: Option<String>,
    rows: usize,
    columns: Vec<String>,
}

/// Error returned by handlers, rendered as a JSON status body
pub enum ApiError {
    /// A failure inside the dashboard itself
    Dashboard(DashboardError),
    /// The request could not be read: bad JSON, not multipart, too large
    Request { status: StatusCode, message: String },
}

impl From<DashboardError> for ApiError {
    fn from(err: DashboardError) -> Self {
        ApiError::Dashboard(err)
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::Request {
            status: err.status(),
            message: format!("{}: {}", err, err.body_text()),
        }
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        ApiError::Request {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Request {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Dashboard(err) => {
                let status = match &err {
                    DashboardError::UnknownChart(_) => StatusCode::NOT_FOUND,
                    e if e.is_client_error() => StatusCode::BAD_REQUEST,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, err.to_string())
            }
            ApiError::Request { status, message } => (status, message),
        };
        if status.is_server_error() {
            error!("Request failed: {}", message);
        }
        (
            status,
            Json(StatusResponse {
                status: "error".to_string(),
                message: Some(message),
            }),
        )
            .into_response()
    }
}

/// Builds the dashboard router over shared state
pub fn build_router(state: Arc<AppState>) -> Router {
    let static_dir = state.config.static_dir.clone();
    let body_limit = state.config.max_upload_bytes;
    let cors = state.config.cors;

    let router = Router::new()
        .route("/", get(serve_dashboard))
        .route("/api/upload", post(upload_file))
        .route("/api/upload/data-url", post(upload_data_url))
        .route("/api/dashboard", get(get_dashboard))
        .route("/api/charts/:chart", get(get_chart))
        .route("/api/export", get(export_table))
        .route("/api/session", get(get_session))
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state);

    if cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}

pub async fn run(config: DashboardConfig) -> Result<(), Box<dyn std::error::Error>> {
    let bind_addr = config.bind_addr.clone();
    let app = build_router(Arc::new(AppState::new(config)));

    let listener = TcpListener::bind(&bind_addr).await?;
    info!("Listening on http://{}", bind_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Dashboard server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}

async fn serve_dashboard() -> Html<&'static str> {
    Html(include_str!("./static/dashboard.html"))
}

async fn upload_file(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadOutcome>, ApiError> {
    let mut multipart = multipart?;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await?;
        info!("Received upload {} ({} bytes)", filename, bytes.len());
        return Ok(Json(state.session().on_upload(&filename, &bytes)));
    }

    Err(DashboardError::MalformedUpload("no file data received".to_string()).into())
}

async fn upload_data_url(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<DataUrlUpload>, JsonRejection>,
) -> Result<Json<UploadOutcome>, ApiError> {
    let Json(payload) = payload?;
    info!("Received data-url upload {}", payload.filename);
    Ok(Json(
        state
            .session()
            .on_upload_data_url(&payload.filename, &payload.contents),
    ))
}

async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FilterQuery>,
) -> Result<Response, ApiError> {
    let selection = FilterSelection::from(&query);
    let Some(dataset) = state.session().current_dataset() else {
        return Ok(StatusCode::NO_CONTENT.into_response());
    };
    let figures = dashboard::refresh(&dataset, &selection, &state.config.columns)?;
    Ok(Json(figures).into_response())
}

async fn get_chart(
    State(state): State<Arc<AppState>>,
    Path(chart): Path<String>,
    Query(query): Query<ChartQuery>,
) -> Result<Response, ApiError> {
    let id: ChartId = chart.parse()?;
    let format = ImageFormat::parse(query.format.as_deref().unwrap_or("svg"))?;
    let selection = FilterSelection::from(&query.filters);

    let Some(dataset) = state.session().current_dataset() else {
        return Ok(StatusCode::NO_CONTENT.into_response());
    };
    let figures = dashboard::refresh(&dataset, &selection, &state.config.columns)?;
    let image = render::render_chart(&figures, id, format, &state.config.graph_options())?;

    Ok(([(header::CONTENT_TYPE, format.content_type())], image).into_response())
}

async fn export_table(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ChartQuery>,
) -> Result<Response, ApiError> {
    let format = ExportFormat::parse(query.format.as_deref().unwrap_or("csv"))?;
    let selection = FilterSelection::from(&query.filters);

    let Some(dataset) = state.session().current_dataset() else {
        return Ok(StatusCode::NO_CONTENT.into_response());
    };
    let filtered = filter_dataset(&dataset, &selection, &state.config.columns)?;
    let bytes = downloader::export(&filtered, format)?;

    Ok((
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!(
                    "attachment; filename=\"projetos-filtrados.{}\"",
                    format.extension()
                ),
            ),
        ],
        bytes,
    )
        .into_response())
}

async fn get_session(State(state): State<Arc<AppState>>) -> Json<SessionInfo> {
    let session = state.session();

    if let Some(upload) = session.current() {
        return Json(SessionInfo {
            status: "loaded".to_string(),
            filename: Some(upload.filename.clone()),
            loaded_at: Some(upload.loaded_at.to_rfc3339()),
            rows: upload.dataset.len(),
            columns: upload.dataset.columns.clone(),
        });
    }

    Json(SessionInfo {
        status: if session.failed_upload().is_some() {
            "failed".to_string()
        } else {
            "empty".to_string()
        },
        filename: session.failed_upload().map(str::to_string),
        loaded_at: None,
        rows: 0,
        columns: Vec::new(),
    })
}
