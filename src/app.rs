use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::config::{PageSetup, ServerConfig};
use crate::downloader::Export;
use crate::duration::duration_between;
use crate::loader;
use crate::saving::{self, FileStore};
use crate::session::{FigureUpload, Session};
use crate::state::{ReportState, SectionKey};

pub struct AppState {
    session: Mutex<Session<FileStore>>,
    config: ServerConfig,
    setup: PageSetup,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let store = FileStore::new(config.drafts_dir());
        let mut session = Session::new(store);
        let notice = session.load_draft();
        log::info!("startup: {}", notice.message);
        Self {
            session: Mutex::new(session),
            config,
            setup: PageSetup::default(),
        }
    }

    // Mutations replace whole values, so a poisoned guard is still consistent.
    fn session(&self) -> MutexGuard<'_, Session<FileStore>> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Acknowledgement returned by every mutating endpoint.
#[derive(Serialize)]
struct ApiResponse {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

fn ok(message: impl Into<String>) -> Response {
    Json(ApiResponse {
        ok: true,
        message: Some(message.into()),
    })
    .into_response()
}

fn failure(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ApiResponse {
            ok: false,
            message: Some(message.into()),
        }),
    )
        .into_response()
}

#[derive(Deserialize)]
struct FigureRequest {
    /// JSON pointer to the figure list, e.g. `/sections/linkages/collaborations/0/figures`.
    target: String,
    #[serde(default)]
    caption: String,
    base64: String,
    #[serde(default, rename = "mimeType")]
    mime_type: String,
    #[serde(default, rename = "fileName")]
    file_name: String,
}

#[derive(Deserialize)]
struct TableRequest {
    target: String,
    #[serde(default)]
    caption: String,
    rows: Vec<Vec<String>>,
}

#[derive(Deserialize)]
struct DurationQuery {
    start: String,
    end: String,
}

pub fn router(app_state: Arc<AppState>) -> Router {
    let static_dir = app_state.config.static_dir.clone();
    Router::new()
        .route("/api/state", get(get_state))
        .route("/api/sections/:key", get(get_section).put(put_section))
        .route("/api/figures", post(add_figure))
        .route("/api/tables", post(add_table))
        .route("/api/tables/parse", post(parse_table))
        .route("/api/duration", get(get_duration))
        .route("/api/budget/recompute", post(recompute_budget))
        .route("/api/draft/save", post(save_draft))
        .route("/api/draft/load", post(load_draft))
        .route("/api/draft/clear", post(clear_draft))
        .route("/api/draft/download", get(download_draft))
        .route("/api/draft/upload", post(upload_draft))
        .route("/api/export/pdf", get(export_pdf))
        .route("/api/export/zip", get(export_zip))
        .route("/api/validate", get(validate))
        .route("/api/submit", post(submit))
        .fallback_service(ServeDir::new(static_dir))
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}

pub async fn run(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let bind_addr = config.bind_addr;
    let app_state = Arc::new(AppState::new(config));
    let app = router(app_state);

    let listener = TcpListener::bind(bind_addr).await?;
    log::info!("listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn get_state(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.session().state().clone())
}

async fn get_section(
    Path(key): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let key: SectionKey = match key.parse() {
        Ok(k) => k,
        Err(e) => return failure(StatusCode::NOT_FOUND, e.to_string()),
    };
    match state.session().section(key) {
        Ok(value) => Json(value).into_response(),
        Err(e) => failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

async fn put_section(
    Path(key): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(value): Json<Value>,
) -> Response {
    let key: SectionKey = match key.parse() {
        Ok(k) => k,
        Err(e) => return failure(StatusCode::NOT_FOUND, e.to_string()),
    };
    match state.session().replace_section(key, value) {
        Ok(()) => ok(format!("{} updated.", key.title())),
        Err(e) => failure(StatusCode::BAD_REQUEST, e.to_string()),
    }
}

async fn add_figure(
    State(state): State<Arc<AppState>>,
    Json(req): Json<FigureRequest>,
) -> Response {
    let upload = FigureUpload {
        caption: req.caption,
        base64: req.base64,
        mime_type: req.mime_type,
        file_name: req.file_name,
    };
    match state.session().add_figure_at(&req.target, upload) {
        Ok(fig) => Json(fig).into_response(),
        Err(e) => failure(StatusCode::BAD_REQUEST, e.to_string()),
    }
}

async fn add_table(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TableRequest>,
) -> Response {
    match state
        .session()
        .add_table_at(&req.target, &req.caption, req.rows)
    {
        Ok(table) => Json(table).into_response(),
        Err(e) => failure(StatusCode::BAD_REQUEST, e.to_string()),
    }
}

/// First file field of the form: its name and bytes.
async fn first_file(multipart: &mut Multipart) -> Option<(String, Vec<u8>)> {
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.file_name().unwrap_or_default().to_string();
        if let Ok(bytes) = field.bytes().await {
            if !bytes.is_empty() {
                return Some((name, bytes.to_vec()));
            }
        }
    }
    None
}

async fn parse_table(mut multipart: Multipart) -> Response {
    let Some((name, bytes)) = first_file(&mut multipart).await else {
        return failure(StatusCode::BAD_REQUEST, "No file data received");
    };
    match loader::parse_table_bytes(&name, bytes) {
        Ok(rows) => Json(rows).into_response(),
        Err(e) => failure(StatusCode::BAD_REQUEST, e.to_string()),
    }
}

async fn get_duration(Query(q): Query<DurationQuery>) -> Response {
    match duration_between(&q.start, &q.end) {
        Ok(span) => Json(serde_json::json!({ "ok": true, "duration": span.to_string() }))
            .into_response(),
        Err(e) => Json(serde_json::json!({ "ok": false, "duration": "", "message": e.to_string() }))
            .into_response(),
    }
}

async fn recompute_budget(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut session = state.session();
    session.recompute_budget();
    Json(
        session
            .state()
            .sections
            .annexures
            .budget_utilization
            .table
            .clone(),
    )
}

async fn save_draft(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.session().save_draft())
}

async fn load_draft(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.session().load_draft())
}

async fn clear_draft(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.session().clear_draft())
}

fn attachment(file_name: &str, mime_type: &str, bytes: Vec<u8>) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, mime_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        bytes,
    )
        .into_response()
}

async fn download_draft(State(state): State<Arc<AppState>>) -> Response {
    let snapshot = saving::serialize_to_memory(state.session().state());
    match snapshot {
        Ok(bytes) => attachment("annual_report_draft.json.gz", "application/gzip", bytes),
        Err(e) => failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

async fn upload_draft(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Response {
    let Some((_, bytes)) = first_file(&mut multipart).await else {
        return failure(StatusCode::BAD_REQUEST, "No file data received");
    };
    match saving::deserialize_from_memory(&bytes) {
        Ok(loaded) => {
            state.session().replace_state(loaded);
            ok("Draft restored successfully.")
        }
        Err(e) => failure(
            StatusCode::BAD_REQUEST,
            format!("Failed to load draft: {}", e),
        ),
    }
}

/// Layout and PDF serialization run on the blocking pool against a snapshot
/// of the state; the session lock is held only for the clone.
async fn run_export(
    state: Arc<AppState>,
    build: fn(&ReportState, &PageSetup) -> crate::error::Result<Export>,
) -> Response {
    let snapshot = state.session().state().clone();
    let setup = state.setup.clone();
    match tokio::task::spawn_blocking(move || build(&snapshot, &setup)).await {
        Ok(Ok(export)) => attachment(&export.file_name, export.mime_type, export.bytes),
        Ok(Err(e)) => {
            log::warn!("export failed: {}", e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, format!("Failed to generate PDF: {}", e))
        }
        Err(e) => failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

async fn export_pdf(State(state): State<Arc<AppState>>) -> Response {
    run_export(state, crate::downloader::export_pdf).await
}

async fn export_zip(State(state): State<Arc<AppState>>) -> Response {
    run_export(state, crate::downloader::export_bundle).await
}

async fn validate(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let errors = state.session().validate();
    Json(serde_json::json!({ "ok": errors.is_empty(), "errors": errors }))
}

async fn submit(State(state): State<Arc<AppState>>) -> Response {
    let errors = state.session().validate();
    if !errors.is_empty() {
        return Json(ApiResponse {
            ok: false,
            message: Some(format!(
                "Cannot submit. Please fix the following:\n\n{}",
                errors.join("\n")
            )),
        })
        .into_response();
    }

    let id = uuid::Uuid::new_v4().to_string();
    let json = {
        let mut session = state.session();
        session.state_mut().meta.submission_id = Some(id.clone());
        session.state().to_json_pretty()
    };
    let json = match json {
        Ok(json) => json,
        Err(e) => return failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };

    let dir = state.config.submissions_dir();
    let written = async {
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(format!("{}.json", id)), json).await
    }
    .await;

    match written {
        Ok(()) => {
            log::info!("stored submission {}", id);
            ok("Submitted successfully.")
        }
        Err(e) => {
            log::warn!("storing submission {} failed: {}", id, e);
            Json(ApiResponse {
                ok: false,
                message: Some(format!("Failed: {}", e)),
            })
            .into_response()
        }
    }
}
