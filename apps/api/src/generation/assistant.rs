//! `LlmAssistant`: every AI collaborator implemented on top of `LlmClient`.

use std::collections::HashSet;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::generation::prompts::{
    GAP_ANALYSIS_PROMPT_TEMPLATE, IMPROVE_BULLET_PROMPT_TEMPLATE, PARSE_RESUME_PROMPT_TEMPLATE,
    SKILL_BULLET_PROMPT_TEMPLATE,
};
use crate::generation::{BulletImprover, GapAnalyzer, ResumeParser, SkillBulletGenerator};
use crate::llm_client::prompts::{
    BULLET_STYLE_INSTRUCTION, JSON_ONLY_SYSTEM, TRUTHFULNESS_INSTRUCTION,
};
use crate::llm_client::LlmClient;
use crate::models::resume::{Job, ResumeData};
use crate::models::skills::{GeneratedBullets, MissingConcepts, Skill, SkillCategory};

#[derive(Clone)]
pub struct LlmAssistant {
    llm: LlmClient,
}

impl LlmAssistant {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl SkillBulletGenerator for LlmAssistant {
    async fn generate_skill_bullet(
        &self,
        skill_name: &str,
        recommendation: &str,
        job: &Job,
    ) -> Result<GeneratedBullets, AppError> {
        let prompt = fill_job(SKILL_BULLET_PROMPT_TEMPLATE, job)
            .replace("{skill_name}", skill_name)
            .replace("{recommendation}", recommendation);

        let raw: GeneratedBullets = self
            .llm
            .complete_json(&prompt, JSON_ONLY_SYSTEM)
            .await
            .map_err(|e| AppError::Llm(format!("Skill bullet generation failed: {e}")))?;

        let generated = clean_generated(raw).ok_or_else(|| {
            AppError::Llm("Skill bullet generation returned no usable bullet".to_string())
        })?;
        info!(
            "Generated {} bullet(s) for skill '{skill_name}' at {}",
            generated.variations().len(),
            job.company
        );
        Ok(generated)
    }
}

#[async_trait]
impl BulletImprover for LlmAssistant {
    async fn improve_bullet(&self, bullet: &str, job: &Job) -> Result<GeneratedBullets, AppError> {
        let prompt = fill_job(IMPROVE_BULLET_PROMPT_TEMPLATE, job).replace("{bullet}", bullet);

        let raw: GeneratedBullets = self
            .llm
            .complete_json(&prompt, JSON_ONLY_SYSTEM)
            .await
            .map_err(|e| AppError::Llm(format!("Bullet improvement failed: {e}")))?;

        clean_generated(raw).ok_or_else(|| {
            AppError::Llm("Bullet improvement returned no usable bullet".to_string())
        })
    }
}

#[async_trait]
impl ResumeParser for LlmAssistant {
    async fn parse_resume(&self, text: &str) -> Result<ResumeData, AppError> {
        let prompt = PARSE_RESUME_PROMPT_TEMPLATE.replace("{resume_text}", text);
        let raw: ResumeData = self
            .llm
            .complete_json(&prompt, JSON_ONLY_SYSTEM)
            .await
            .map_err(|e| AppError::Llm(format!("Resume parsing failed: {e}")))?;

        let resume = clean_resume(raw);
        if resume.is_empty() {
            return Err(AppError::UnprocessableEntity(
                "No work experience could be found in the uploaded resume".to_string(),
            ));
        }
        info!(
            "Parsed resume: {} jobs, {} bullets",
            resume.jobs().len(),
            resume.bullet_count()
        );
        Ok(resume)
    }
}

#[async_trait]
impl GapAnalyzer for LlmAssistant {
    async fn analyze_gaps(
        &self,
        resume: &ResumeData,
        target_role: Option<&str>,
    ) -> Result<MissingConcepts, AppError> {
        let resume_json = serde_json::to_string_pretty(resume)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize resume: {e}")))?;
        let target_clause = target_role
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(|r| format!(" for the target role \"{r}\""))
            .unwrap_or_default();
        let prompt = GAP_ANALYSIS_PROMPT_TEMPLATE
            .replace("{target_clause}", &target_clause)
            .replace("{resume_json}", &resume_json);

        let raw: MissingConcepts = self
            .llm
            .complete_json(&prompt, JSON_ONLY_SYSTEM)
            .await
            .map_err(|e| AppError::Llm(format!("Gap analysis failed: {e}")))?;

        let concepts = clean_concepts(raw);
        info!(
            "Gap analysis found {} skills in {} categories",
            concepts.total_skills(),
            concepts.missing_concepts.len()
        );
        Ok(concepts)
    }
}

fn fill_job(template: &str, job: &Job) -> String {
    let achievements = if job.achievements.is_empty() {
        "(none)".to_string()
    } else {
        job.achievements
            .iter()
            .map(|a| format!("- {a}"))
            .collect::<Vec<_>>()
            .join("\n")
    };
    template
        .replace("{truthfulness_instruction}", TRUTHFULNESS_INSTRUCTION)
        .replace("{bullet_style_instruction}", BULLET_STYLE_INSTRUCTION)
        .replace("{company}", &job.company)
        .replace("{position}", &job.position)
        .replace("{time_period}", job.time_period.as_deref().unwrap_or("unknown"))
        .replace("{achievements}", &achievements)
}

/// Trims whitespace and any leading bullet marker the model added.
fn clean_bullet(text: &str) -> String {
    text.trim()
        .trim_start_matches(['-', '*', '•'])
        .trim()
        .to_string()
}

/// Cleans every phrasing and drops empties and duplicates. `None` if nothing
/// usable is left.
fn clean_generated(raw: GeneratedBullets) -> Option<GeneratedBullets> {
    let mut seen = HashSet::new();
    let variations: Vec<String> = raw
        .multiple_bullets
        .unwrap_or_default()
        .iter()
        .map(|b| clean_bullet(b))
        .filter(|b| !b.is_empty() && seen.insert(b.clone()))
        .collect();

    let bullet = Some(clean_bullet(&raw.bullet))
        .filter(|b| !b.is_empty())
        .or_else(|| variations.first().cloned())?;

    let multiple_bullets = (variations.len() > 1).then_some(variations);
    Some(GeneratedBullets {
        bullet,
        multiple_bullets,
    })
}

fn clean_resume(raw: ResumeData) -> ResumeData {
    let bullet_points = raw
        .bullet_points
        .into_iter()
        .filter_map(|mut job| {
            job.company = job.company.trim().to_string();
            job.position = job.position.trim().to_string();
            if job.company.is_empty() && job.position.is_empty() {
                warn!("Dropping parsed job with neither company nor position");
                return None;
            }
            job.time_period = job
                .time_period
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty());
            job.achievements = job
                .achievements
                .iter()
                .map(|a| clean_bullet(a))
                .filter(|a| !a.is_empty())
                .collect();
            Some(job)
        })
        .collect();
    ResumeData { bullet_points }
}

fn clean_concepts(raw: MissingConcepts) -> MissingConcepts {
    let missing_concepts = raw
        .missing_concepts
        .into_iter()
        .filter_map(|category| {
            let name = category.category.trim().to_string();
            let mut seen = HashSet::new();
            let skills: Vec<Skill> = category
                .skills
                .into_iter()
                .map(|s| Skill {
                    name: s.name.trim().to_string(),
                    recommendation: s.recommendation.trim().to_string(),
                })
                .filter(|s| !s.name.is_empty() && seen.insert(s.name.to_lowercase()))
                .collect();
            (!name.is_empty() && !skills.is_empty()).then_some(SkillCategory {
                category: name,
                skills,
            })
        })
        .collect();
    MissingConcepts { missing_concepts }
}
