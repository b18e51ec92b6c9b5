//! Axum route handlers for the Missing-Skill Resolver. Every handler
//! returns the resolver view so the screen re-renders from one payload.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;
use crate::wizard::handlers::{detached, VariationRequest};
use crate::wizard::resolver::ResolverView;

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub category: String,
}

#[derive(Debug, Deserialize)]
pub struct SkillRequest {
    pub skill: String,
}

#[derive(Debug, Deserialize)]
pub struct JobRequest {
    pub job_index: usize,
}

#[derive(Debug, Deserialize)]
pub struct DraftRequest {
    pub text: String,
}

/// GET /api/v1/sessions/:id/skills
pub async fn handle_get_resolver(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ResolverView>, AppError> {
    let session = state.sessions.get(id).await?;
    let view = session.lock().await.resolver_view();
    Ok(Json(view))
}

/// POST /api/v1/sessions/:id/skills/category
pub async fn handle_select_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<CategoryRequest>,
) -> Result<Json<ResolverView>, AppError> {
    let session = state.sessions.get(id).await?;
    let mut guard = session.lock().await;
    guard.select_skill_category(&req.category)?;
    Ok(Json(guard.resolver_view()))
}

/// POST /api/v1/sessions/:id/skills/skill
pub async fn handle_select_skill(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<SkillRequest>,
) -> Result<Json<ResolverView>, AppError> {
    let session = state.sessions.get(id).await?;
    let mut guard = session.lock().await;
    guard.select_skill(&req.skill)?;
    Ok(Json(guard.resolver_view()))
}

/// POST /api/v1/sessions/:id/skills/job
pub async fn handle_select_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<JobRequest>,
) -> Result<Json<ResolverView>, AppError> {
    let session = state.sessions.get(id).await?;
    let mut guard = session.lock().await;
    guard.select_skill_job(req.job_index)?;
    Ok(Json(guard.resolver_view()))
}

/// POST /api/v1/sessions/:id/skills/proceed
pub async fn handle_proceed(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ResolverView>, AppError> {
    let session = state.sessions.get(id).await?;
    let mut guard = session.lock().await;
    guard.proceed_skill()?;
    Ok(Json(guard.resolver_view()))
}

/// POST /api/v1/sessions/:id/skills/generate
///
/// On failure the resolver stays in the generate stage with the message
/// recorded; the client may call this again to retry.
pub async fn handle_generate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ResolverView>, AppError> {
    let session = state.sessions.get(id).await?;

    let request = session.lock().await.begin_skill_generation()?;
    let view = detached(async move {
        let outcome = state
            .skill_bullets
            .generate_skill_bullet(&request.skill_name, &request.recommendation, &request.job)
            .await;

        let mut guard = session.lock().await;
        match outcome {
            Ok(generated) => guard.finish_skill_generation(&request.skill_id, Ok(generated)),
            Err(e) => {
                warn!(
                    "Session {id}: bullet generation for {} failed: {e}",
                    request.skill_id
                );
                guard.finish_skill_generation(&request.skill_id, Err(e.to_string()));
                return Err(e);
            }
        }
        Ok(guard.resolver_view())
    })
    .await?;
    Ok(Json(view))
}

/// POST /api/v1/sessions/:id/skills/variation
pub async fn handle_select_variation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<VariationRequest>,
) -> Result<Json<ResolverView>, AppError> {
    let session = state.sessions.get(id).await?;
    let mut guard = session.lock().await;
    guard.select_skill_variation(req.index)?;
    Ok(Json(guard.resolver_view()))
}

/// PUT /api/v1/sessions/:id/skills/draft
pub async fn handle_edit_draft(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<DraftRequest>,
) -> Result<Json<ResolverView>, AppError> {
    let session = state.sessions.get(id).await?;
    let mut guard = session.lock().await;
    guard.edit_skill_draft(req.text)?;
    Ok(Json(guard.resolver_view()))
}

/// POST /api/v1/sessions/:id/skills/commit
pub async fn handle_commit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ResolverView>, AppError> {
    let session = state.sessions.get(id).await?;
    let mut guard = session.lock().await;
    guard.commit_skill_bullet()?;
    Ok(Json(guard.resolver_view()))
}

/// POST /api/v1/sessions/:id/skills/cancel
pub async fn handle_cancel(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ResolverView>, AppError> {
    let session = state.sessions.get(id).await?;
    let mut guard = session.lock().await;
    guard.cancel_skill()?;
    Ok(Json(guard.resolver_view()))
}
