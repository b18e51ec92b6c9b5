//! Axum route handlers for wizard sessions: lifecycle, navigation, upload,
//! bullet improvements and export. Missing-skill events live in
//! `skill_handlers`.
//!
//! Collaborator calls follow one pattern: raise the in-flight flag under the
//! session lock, release the lock for the await, then re-lock to clear the
//! flag and apply the outcome. The await and the re-lock run in a spawned
//! task so a dropped request still settles the flag.

use std::collections::BTreeSet;
use std::future::Future;

use anyhow::anyhow;

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::export::ExportReceipt;
use crate::models::resume::{BulletId, ResumeData};
use crate::models::skills::MissingConcepts;
use crate::state::AppState;
use crate::upload::extract_text;
use crate::wizard::improvements::ImprovementView;
use crate::wizard::resolver::ResolverView;
use crate::wizard::{Feature, SessionSnapshot, ThemeMode};

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct FeaturesRequest {
    pub features: BTreeSet<Feature>,
}

#[derive(Debug, Deserialize)]
pub struct ThemeRequest {
    pub theme: ThemeMode,
}

#[derive(Debug, Deserialize)]
pub struct VariationRequest {
    pub index: usize,
}

#[derive(Debug, Deserialize)]
pub struct AcceptImprovementRequest {
    pub text: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub target_role: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OriginalBulletResponse {
    pub bullet_id: BulletId,
    pub text: String,
}

/// Runs the tail of a collaborator call on its own task. The handler only
/// awaits the result; if the client disconnects the task still finishes
/// and clears the session's in-flight flag.
pub(crate) async fn detached<T, F>(work: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(work)
        .await
        .map_err(|e| AppError::Internal(anyhow!("Collaborator task failed: {e}")))?
}

fn parse_bullet_id(raw: &str) -> Result<BulletId, AppError> {
    BulletId::parse(raw).ok_or_else(|| {
        AppError::Validation(format!(
            "Invalid bullet id '{raw}', expected job-<n>-bullet-<n>"
        ))
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Session lifecycle and navigation
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/sessions
pub async fn handle_create_session(
    State(state): State<AppState>,
) -> (StatusCode, Json<SessionSnapshot>) {
    let session = state.sessions.create().await;
    let snapshot = session.lock().await.snapshot();
    (StatusCode::CREATED, Json(snapshot))
}

/// GET /api/v1/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let session = state.sessions.get(id).await?;
    let snapshot = session.lock().await.snapshot();
    Ok(Json(snapshot))
}

/// DELETE /api/v1/sessions/:id
pub async fn handle_end_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.sessions.remove(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/sessions/:id/features
pub async fn handle_set_features(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<FeaturesRequest>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let session = state.sessions.get(id).await?;
    let mut guard = session.lock().await;
    guard.set_features(req.features)?;
    Ok(Json(guard.snapshot()))
}

/// PUT /api/v1/sessions/:id/theme
pub async fn handle_set_theme(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ThemeRequest>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let session = state.sessions.get(id).await?;
    let mut guard = session.lock().await;
    guard.set_theme(req.theme);
    Ok(Json(guard.snapshot()))
}

/// POST /api/v1/sessions/:id/step/next
pub async fn handle_next_step(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let session = state.sessions.get(id).await?;
    let mut guard = session.lock().await;
    let step = guard.next_step()?;
    info!("Session {id} advanced to the {} step", step.name());
    Ok(Json(guard.snapshot()))
}

/// POST /api/v1/sessions/:id/step/back
pub async fn handle_previous_step(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let session = state.sessions.get(id).await?;
    let mut guard = session.lock().await;
    guard.previous_step()?;
    Ok(Json(guard.snapshot()))
}

// ────────────────────────────────────────────────────────────────────────────
// Upload
// ────────────────────────────────────────────────────────────────────────────

/// PUT /api/v1/sessions/:id/resume
///
/// Installs already-structured resume data.
pub async fn handle_set_resume(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(resume): Json<ResumeData>,
) -> Result<Json<SessionSnapshot>, AppError> {
    if resume.is_empty() {
        return Err(AppError::Validation(
            "Resume must contain at least one job".to_string(),
        ));
    }
    let session = state.sessions.get(id).await?;
    let mut guard = session.lock().await;
    guard.set_resume(resume)?;
    Ok(Json(guard.snapshot()))
}

/// POST /api/v1/sessions/:id/resume/upload
///
/// Multipart upload with a `file` field (PDF or plain text). The text is
/// structured by the resume parser before it replaces the session's resume.
pub async fn handle_upload_resume(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<SessionSnapshot>, AppError> {
    let session = state.sessions.get(id).await?;

    let mut upload: Option<(Option<String>, Option<String>, Bytes)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let content_type = field.content_type().map(str::to_string);
        let file_name = field.file_name().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Could not read uploaded file: {e}")))?;
        upload = Some((content_type, file_name, data));
        break;
    }

    let (content_type, file_name, data) =
        upload.ok_or_else(|| AppError::Validation("Missing multipart field 'file'".to_string()))?;
    if data.len() > state.config.max_upload_bytes {
        return Err(AppError::Validation(format!(
            "Resume file exceeds the {} byte limit",
            state.config.max_upload_bytes
        )));
    }
    info!(
        "Session {id}: received resume upload ({} bytes, {:?})",
        data.len(),
        file_name
    );

    // PDF extraction is CPU-bound and may panic on malformed files.
    let text = tokio::task::spawn_blocking(move || {
        extract_text(content_type.as_deref(), file_name.as_deref(), &data)
    })
    .await
    .map_err(|e| AppError::UnprocessableEntity(format!("Could not read uploaded resume: {e}")))??;

    session.lock().await.begin_parsing()?;
    let snapshot = detached(async move {
        let outcome = state.parser.parse_resume(&text).await;

        let mut guard = session.lock().await;
        match outcome {
            Ok(resume) => guard.finish_parsing(Some(resume))?,
            Err(e) => {
                warn!("Session {id}: resume parsing failed: {e}");
                guard.finish_parsing(None)?;
                return Err(e);
            }
        }
        Ok::<_, AppError>(guard.snapshot())
    })
    .await?;
    Ok(Json(snapshot))
}

// ────────────────────────────────────────────────────────────────────────────
// Bullet improvements
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/sessions/:id/bullets/:bullet_id/original
pub async fn handle_original_bullet(
    State(state): State<AppState>,
    Path((id, bullet_id)): Path<(Uuid, String)>,
) -> Result<Json<OriginalBulletResponse>, AppError> {
    let bullet_id = parse_bullet_id(&bullet_id)?;
    let session = state.sessions.get(id).await?;
    let guard = session.lock().await;
    let text = guard.original_bullet(&bullet_id)?.to_string();
    Ok(Json(OriginalBulletResponse { bullet_id, text }))
}

/// GET /api/v1/sessions/:id/improvements
pub async fn handle_get_improvements(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ImprovementView>, AppError> {
    let session = state.sessions.get(id).await?;
    let view = session.lock().await.improvement_view();
    Ok(Json(view))
}

/// POST /api/v1/sessions/:id/improvements/:bullet_id/generate
pub async fn handle_generate_improvement(
    State(state): State<AppState>,
    Path((id, bullet_id)): Path<(Uuid, String)>,
) -> Result<Json<ImprovementView>, AppError> {
    let bullet_id = parse_bullet_id(&bullet_id)?;
    let session = state.sessions.get(id).await?;

    let request = session.lock().await.begin_improvement(bullet_id)?;
    let view = detached(async move {
        let outcome = state
            .improver
            .improve_bullet(&request.original, &request.job)
            .await;

        let bullet_id = request.bullet_id;
        let mut guard = session.lock().await;
        match outcome {
            Ok(generated) => guard.finish_improvement(bullet_id, Ok(generated)),
            Err(e) => {
                warn!("Session {id}: improvement for {bullet_id} failed: {e}");
                guard.finish_improvement(bullet_id, Err(e.to_string()));
                return Err(e);
            }
        }
        Ok(guard.improvement_view())
    })
    .await?;
    Ok(Json(view))
}

/// POST /api/v1/sessions/:id/improvements/:bullet_id/variation
pub async fn handle_select_improvement_variation(
    State(state): State<AppState>,
    Path((id, bullet_id)): Path<(Uuid, String)>,
    Json(req): Json<VariationRequest>,
) -> Result<Json<ImprovementView>, AppError> {
    let bullet_id = parse_bullet_id(&bullet_id)?;
    let session = state.sessions.get(id).await?;
    let mut guard = session.lock().await;
    guard.select_improvement_variation(&bullet_id, req.index)?;
    Ok(Json(guard.improvement_view()))
}

/// PUT /api/v1/sessions/:id/improvements/:bullet_id
pub async fn handle_accept_improvement(
    State(state): State<AppState>,
    Path((id, bullet_id)): Path<(Uuid, String)>,
    Json(req): Json<AcceptImprovementRequest>,
) -> Result<Json<ImprovementView>, AppError> {
    let bullet_id = parse_bullet_id(&bullet_id)?;
    let session = state.sessions.get(id).await?;
    let mut guard = session.lock().await;
    guard.accept_improvement(bullet_id, &req.text)?;
    Ok(Json(guard.improvement_view()))
}

/// DELETE /api/v1/sessions/:id/improvements/:bullet_id
pub async fn handle_revert_improvement(
    State(state): State<AppState>,
    Path((id, bullet_id)): Path<(Uuid, String)>,
) -> Result<Json<ImprovementView>, AppError> {
    let bullet_id = parse_bullet_id(&bullet_id)?;
    let session = state.sessions.get(id).await?;
    let mut guard = session.lock().await;
    guard.revert_improvement(&bullet_id)?;
    Ok(Json(guard.improvement_view()))
}

// ────────────────────────────────────────────────────────────────────────────
// Recommendations
// ────────────────────────────────────────────────────────────────────────────

/// PUT /api/v1/sessions/:id/recommendations
///
/// Accepts `{ "missingConcepts": [...] }` from the recommendation service.
pub async fn handle_set_recommendations(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(concepts): Json<MissingConcepts>,
) -> Result<Json<ResolverView>, AppError> {
    let session = state.sessions.get(id).await?;
    let mut guard = session.lock().await;
    guard.set_missing_concepts(concepts)?;
    Ok(Json(guard.resolver_view()))
}

/// POST /api/v1/sessions/:id/recommendations/generate
pub async fn handle_generate_recommendations(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Option<Json<AnalyzeRequest>>,
) -> Result<Json<ResolverView>, AppError> {
    let req = body.map(|Json(r)| r).unwrap_or_default();
    let session = state.sessions.get(id).await?;

    let resume = session.lock().await.begin_analysis()?;
    let view = detached(async move {
        let outcome = state
            .gap_analyzer
            .analyze_gaps(&resume, req.target_role.as_deref())
            .await;

        let mut guard = session.lock().await;
        match outcome {
            Ok(concepts) => guard.finish_analysis(Some(concepts))?,
            Err(e) => {
                guard.finish_analysis(None)?;
                return Err(e);
            }
        }
        Ok::<_, AppError>(guard.resolver_view())
    })
    .await?;
    Ok(Json(view))
}

// ────────────────────────────────────────────────────────────────────────────
// Final review and export
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/sessions/:id/preview
///
/// The merged resume exactly as it would be exported.
pub async fn handle_preview(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ResumeData>, AppError> {
    let session = state.sessions.get(id).await?;
    let preview = session.lock().await.preview();
    Ok(Json(preview))
}

/// POST /api/v1/sessions/:id/export
pub async fn handle_export(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ExportReceipt>, AppError> {
    let session = state.sessions.get(id).await?;

    let merged = session.lock().await.begin_export()?;
    let receipt = detached(async move {
        let outcome = state.exporter.export(id, &merged).await;

        let mut guard = session.lock().await;
        match outcome {
            Ok(receipt) => {
                guard.finish_export(Ok(receipt.clone()));
                Ok(receipt)
            }
            Err(e) => {
                guard.finish_export(Err(e.to_string()));
                Err(e)
            }
        }
    })
    .await?;
    Ok(Json(receipt))
}
