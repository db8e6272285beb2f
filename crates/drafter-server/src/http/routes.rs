use super::{AppError, AppResult, AppState, JsonResponse};
use crate::content::content_from_text;
use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Json},
    routing::{get, patch, post},
    Router,
};
use chrono::{DateTime, Utc};
use drafter_core::audit::read_log;
use drafter_core::{
    AuditAction, AuditFilter, AuditLevel, AuditRecord, Brief, BriefField, ClaimsReport, Content,
    FigureLabel, Freshness, GenerateScope, GenerationSummary, Key, RefinedDraft, SectionKey,
    SectionReport, SectionStatus, VersionUpdate,
};
use serde::{Deserialize, Serialize};

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/sections", get(list_sections))
        .route("/sections/:section/generate", post(generate_section))
        .route("/generate", post(generate_all))
        .route("/brief", get(get_brief).put(put_brief))
        .route("/brief/:field", patch(patch_brief_field))
        .route("/analyze", post(analyze))
        .route("/keys/:key", get(get_artifact))
        .route("/keys/:key/active", get(get_active))
        .route("/keys/:key/stale", get(get_staleness))
        .route("/keys/:key/select", post(select_version))
        .route("/keys/:key/edit", post(edit_version))
        .route("/refine", post(refine))
        .route("/refined", get(get_refined))
        .route("/export", get(export))
        .route("/drawings/:index/regenerate", post(regenerate_drawing))
        .route("/labels", get(get_labels).post(generate_labels))
        .route("/claims/check", post(check_claims))
        .route("/audit", get(audit))
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    healthy: bool,
    version: String,
    uptime_seconds: u64,
    session_id: String,
    db_size_bytes: u64,
}

async fn health(State(state): State<AppState>) -> AppResult<Json<JsonResponse<HealthResponse>>> {
    let db_size = std::fs::metadata(state.session.store().path())
        .map(|m| m.len())
        .unwrap_or(0);
    Ok(Json(JsonResponse::ok(HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        session_id: state.session.audit().session_id().to_string(),
        db_size_bytes: db_size,
    })))
}

// ── Sections ─────────────────────────────────────────────────────────────────

async fn list_sections(
    State(state): State<AppState>,
) -> AppResult<Json<JsonResponse<Vec<SectionStatus>>>> {
    Ok(Json(JsonResponse::ok(state.session.overview()?)))
}

async fn generate_section(
    State(state): State<AppState>,
    Path(section): Path<String>,
) -> AppResult<Json<JsonResponse<SectionReport>>> {
    let section: SectionKey = section.parse()?;
    let _guard = state.write_lock.lock().await;
    let report = state.session.generate_section(section).await?;
    Ok(Json(JsonResponse::ok(report)))
}

#[derive(Deserialize)]
struct GenerateQuery {
    #[serde(default)]
    outdated: bool,
}

async fn generate_all(
    State(state): State<AppState>,
    Query(query): Query<GenerateQuery>,
) -> AppResult<Json<JsonResponse<GenerationSummary>>> {
    let scope = if query.outdated {
        GenerateScope::Outdated
    } else {
        GenerateScope::All
    };
    let _guard = state.write_lock.lock().await;
    let summary = state.session.generate_all(scope).await?;
    Ok(Json(JsonResponse::ok(summary)))
}

// ── Brief ────────────────────────────────────────────────────────────────────

async fn get_brief(State(state): State<AppState>) -> AppResult<Json<JsonResponse<Brief>>> {
    Ok(Json(JsonResponse::ok(state.session.brief()?)))
}

async fn put_brief(
    State(state): State<AppState>,
    Json(brief): Json<Brief>,
) -> AppResult<Json<JsonResponse<VersionUpdate>>> {
    let _guard = state.write_lock.lock().await;
    Ok(Json(JsonResponse::ok(state.session.set_brief(brief)?)))
}

#[derive(Deserialize)]
struct FieldUpdate {
    value: String,
}

async fn patch_brief_field(
    State(state): State<AppState>,
    Path(field): Path<String>,
    Json(body): Json<FieldUpdate>,
) -> AppResult<Json<JsonResponse<VersionUpdate>>> {
    let field: BriefField = field.parse()?;
    let _guard = state.write_lock.lock().await;
    Ok(Json(JsonResponse::ok(
        state.session.update_brief_field(field, &body.value)?,
    )))
}

#[derive(Deserialize)]
struct AnalyzeRequest {
    input: String,
}

async fn analyze(
    State(state): State<AppState>,
    Json(body): Json<AnalyzeRequest>,
) -> AppResult<Json<JsonResponse<Brief>>> {
    let _guard = state.write_lock.lock().await;
    let brief = state.session.analyze_brief(&body.input).await?;
    Ok(Json(JsonResponse::ok(brief)))
}

// ── Versions ─────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ArtifactView {
    key: Key,
    versions: Vec<Content>,
    active: usize,
    updated_at: DateTime<Utc>,
    stale: bool,
}

async fn get_artifact(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> AppResult<Json<JsonResponse<Option<ArtifactView>>>> {
    let key: Key = key.parse()?;
    let view = match state.session.artifact(key)? {
        Some(artifact) => Some(ArtifactView {
            key,
            stale: state.session.is_stale(key)?,
            versions: artifact.versions,
            active: artifact.active,
            updated_at: artifact.updated_at,
        }),
        None => None,
    };
    Ok(Json(JsonResponse::ok(view)))
}

async fn get_active(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> AppResult<Json<JsonResponse<Option<Content>>>> {
    let key: Key = key.parse()?;
    Ok(Json(JsonResponse::ok(state.session.active_content(key)?)))
}

#[derive(Serialize)]
struct StalenessView {
    key: Key,
    stale: bool,
    freshness: Freshness,
}

async fn get_staleness(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> AppResult<Json<JsonResponse<StalenessView>>> {
    let key: Key = key.parse()?;
    let freshness = state.session.status(key)?;
    Ok(Json(JsonResponse::ok(StalenessView {
        key,
        stale: freshness == Freshness::Stale,
        freshness,
    })))
}

#[derive(Deserialize)]
struct SelectRequest {
    index: usize,
}

async fn select_version(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(body): Json<SelectRequest>,
) -> AppResult<Json<JsonResponse<VersionUpdate>>> {
    let key: Key = key.parse()?;
    let _guard = state.write_lock.lock().await;
    Ok(Json(JsonResponse::ok(
        state.session.set_active_version(key, body.index)?,
    )))
}

/// Either a tagged content value or plain text interpreted for the key.
#[derive(Deserialize)]
struct EditRequest {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    text: Option<String>,
}

async fn edit_version(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(body): Json<EditRequest>,
) -> AppResult<Json<JsonResponse<VersionUpdate>>> {
    let key: Key = key.parse()?;
    let content = match (body.content, body.text) {
        (Some(content), None) => content,
        (None, Some(text)) => {
            let current = state.session.active_content(key)?;
            content_from_text(key, &text, current.as_ref())
                .map_err(|e| AppError::bad_request(format!("{:#}", e)))?
        }
        _ => return Err(AppError::bad_request("provide exactly one of `content` or `text`")),
    };
    let _guard = state.write_lock.lock().await;
    Ok(Json(JsonResponse::ok(
        state.session.submit_edited_version(key, content)?,
    )))
}

// ── Refinement and export ────────────────────────────────────────────────────

async fn refine(State(state): State<AppState>) -> AppResult<Json<JsonResponse<RefinedDraft>>> {
    let _guard = state.write_lock.lock().await;
    Ok(Json(JsonResponse::ok(state.session.refine_all().await?)))
}

async fn get_refined(
    State(state): State<AppState>,
) -> AppResult<Json<JsonResponse<Option<RefinedDraft>>>> {
    Ok(Json(JsonResponse::ok(state.session.refined()?)))
}

#[derive(Deserialize)]
struct ExportQuery {
    #[serde(default)]
    refined: bool,
}

async fn export(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> AppResult<impl IntoResponse> {
    let markdown = state.session.export_markdown(query.refined)?;
    Ok((
        [(header::CONTENT_TYPE, "text/markdown; charset=utf-8")],
        markdown,
    ))
}

// ── Auxiliary units ──────────────────────────────────────────────────────────

async fn regenerate_drawing(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> AppResult<Json<JsonResponse<VersionUpdate>>> {
    let _guard = state.write_lock.lock().await;
    Ok(Json(JsonResponse::ok(
        state.session.regenerate_drawing(index).await?,
    )))
}

async fn get_labels(State(state): State<AppState>) -> AppResult<Json<JsonResponse<Vec<FigureLabel>>>> {
    Ok(Json(JsonResponse::ok(state.session.figure_labels()?)))
}

async fn generate_labels(
    State(state): State<AppState>,
) -> AppResult<Json<JsonResponse<Vec<FigureLabel>>>> {
    let _guard = state.write_lock.lock().await;
    Ok(Json(JsonResponse::ok(
        state.session.generate_figure_labels().await?,
    )))
}

async fn check_claims(State(state): State<AppState>) -> AppResult<Json<JsonResponse<ClaimsReport>>> {
    let _guard = state.write_lock.lock().await;
    Ok(Json(JsonResponse::ok(state.session.check_claims().await?)))
}

// ── Audit ────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct AuditQuery {
    action: Option<String>,
    level: Option<String>,
    limit: Option<usize>,
}

async fn audit(
    State(state): State<AppState>,
    Query(query): Query<AuditQuery>,
) -> AppResult<Json<JsonResponse<Vec<AuditRecord>>>> {
    let action = query
        .action
        .as_deref()
        .map(|s| s.parse::<AuditAction>())
        .transpose()?;
    let min_level = query
        .level
        .as_deref()
        .map(|s| {
            serde_json::from_value::<AuditLevel>(serde_json::Value::String(s.to_uppercase()))
                .map_err(|_| AppError::bad_request(format!("unknown level: {}", s)))
        })
        .transpose()?;
    let filter = AuditFilter {
        since: None,
        action,
        min_level,
        limit: Some(query.limit.unwrap_or(100)),
    };
    let records = read_log(&state.session.audit().log_path(), &filter)?;
    Ok(Json(JsonResponse::ok(records)))
}
