//! AI collaborators used by the wizard.
//!
//! Each collaborator is a trait so the wizard can be driven by the
//! LLM-backed `LlmAssistant` in production and by stubs in tests.
//! `AppState` carries them as `Arc<dyn ...>`.

pub mod assistant;
pub mod prompts;

use async_trait::async_trait;

use crate::errors::AppError;
use crate::models::resume::{Job, ResumeData};
use crate::models::skills::{GeneratedBullets, MissingConcepts};

/// Writes a new bullet demonstrating a missing skill at a given job.
#[async_trait]
pub trait SkillBulletGenerator: Send + Sync {
    async fn generate_skill_bullet(
        &self,
        skill_name: &str,
        recommendation: &str,
        job: &Job,
    ) -> Result<GeneratedBullets, AppError>;
}

/// Rewrites an existing bullet.
#[async_trait]
pub trait BulletImprover: Send + Sync {
    async fn improve_bullet(&self, bullet: &str, job: &Job) -> Result<GeneratedBullets, AppError>;
}

/// Structures raw resume text into jobs and bullets.
#[async_trait]
pub trait ResumeParser: Send + Sync {
    async fn parse_resume(&self, text: &str) -> Result<ResumeData, AppError>;
}

/// Finds skills the resume is missing, grouped by category.
#[async_trait]
pub trait GapAnalyzer: Send + Sync {
    async fn analyze_gaps(
        &self,
        resume: &ResumeData,
        target_role: Option<&str>,
    ) -> Result<MissingConcepts, AppError>;
}
