//! Missing-Skill Resolver.
//!
//! Funnel: category → skill → job, then generate → review → commit. The
//! active stage is a tagged union so every event handles each stage
//! explicitly. Committed bullets live in the `ResumeContext`; the resolver
//! only holds the selection and the stage payload.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::models::resume::Job;
use crate::models::skills::{
    GeneratedBullets, MissingConcepts, Skill, SkillBulletRecord, SkillCategory, SkillId,
};
use crate::wizard::context::ResumeContext;
use crate::wizard::WizardError;

/// The user's in-progress choice. Dropped on commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkillSelection {
    pub category: String,
    pub skill: Option<Skill>,
    pub job_index: Option<usize>,
}

/// A fully chosen (skill, job) gap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkillTarget {
    pub skill_id: SkillId,
    pub skill: Skill,
    pub job_index: usize,
    pub job: Job,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum ResolverStage {
    Select,
    Generate {
        target: SkillTarget,
        generating: bool,
        error: Option<String>,
    },
    Review {
        target: SkillTarget,
        variations: Vec<String>,
        selected_variation: usize,
        draft: String,
    },
}

impl ResolverStage {
    fn name(&self) -> &'static str {
        match self {
            ResolverStage::Select => "select",
            ResolverStage::Generate { .. } => "generate",
            ResolverStage::Review { .. } => "review",
        }
    }
}

/// Arguments for the bullet-generation collaborator, captured while the
/// session is locked so the call itself can run unlocked.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub skill_id: SkillId,
    pub skill_name: String,
    pub recommendation: String,
    pub job: Job,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolverMetrics {
    pub addressed: usize,
    pub total: usize,
    pub progress_percent: f64,
    pub no_gaps: bool,
}

/// A job the selected skill can be attached to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobOption {
    pub index: usize,
    pub job_id: String,
    pub company: String,
    pub position: String,
}

/// Everything the missing-skills screen renders.
#[derive(Debug, Clone, Serialize)]
pub struct ResolverView {
    #[serde(flatten)]
    pub stage: ResolverStage,
    pub selection: Option<SkillSelection>,
    pub categories: Vec<SkillCategory>,
    pub jobs: Vec<JobOption>,
    pub metrics: ResolverMetrics,
    pub can_proceed: bool,
    pub can_generate: bool,
    pub can_commit: bool,
    pub can_advance: bool,
}

#[derive(Debug)]
pub struct SkillResolver {
    concepts: MissingConcepts,
    selection: Option<SkillSelection>,
    stage: ResolverStage,
}

impl Default for SkillResolver {
    fn default() -> Self {
        Self {
            concepts: MissingConcepts::default(),
            selection: None,
            stage: ResolverStage::Select,
        }
    }
}

impl SkillResolver {
    pub fn stage(&self) -> &ResolverStage {
        &self.stage
    }

    pub fn selection(&self) -> Option<&SkillSelection> {
        self.selection.as_ref()
    }

    /// Installs a new set of gaps. Committed records are kept; the funnel
    /// starts over.
    pub fn set_concepts(&mut self, concepts: MissingConcepts) -> Result<(), WizardError> {
        self.ensure_not_generating()?;
        self.concepts = concepts;
        self.reset();
        Ok(())
    }

    pub fn reset(&mut self) {
        self.selection = None;
        self.stage = ResolverStage::Select;
    }

    pub fn is_generating(&self) -> bool {
        matches!(
            self.stage,
            ResolverStage::Generate {
                generating: true,
                ..
            }
        )
    }

    fn ensure_not_generating(&self) -> Result<(), WizardError> {
        if self.is_generating() {
            return Err(WizardError::InFlight("bullet generation"));
        }
        Ok(())
    }

    /// Picks a category. A different category clears skill and job.
    pub fn select_category(&mut self, category: &str) -> Result<(), WizardError> {
        self.ensure_not_generating()?;
        if self.concepts.category(category).is_none() {
            return Err(WizardError::UnknownCategory(category.to_string()));
        }

        let unchanged = self
            .selection
            .as_ref()
            .is_some_and(|s| s.category == category);
        if !unchanged {
            self.selection = Some(SkillSelection {
                category: category.to_string(),
                skill: None,
                job_index: None,
            });
        }
        self.stage = ResolverStage::Select;
        Ok(())
    }

    /// Picks a skill within the selected category. Any staged bullet text
    /// is discarded by returning to the select stage.
    pub fn select_skill(&mut self, skill_name: &str) -> Result<(), WizardError> {
        self.ensure_not_generating()?;
        let selection = self.selection.as_mut().ok_or(WizardError::NoCategory)?;
        let skill = self
            .concepts
            .category(&selection.category)
            .and_then(|c| c.skills.iter().find(|s| s.name == skill_name))
            .cloned()
            .ok_or_else(|| WizardError::UnknownSkill(skill_name.to_string()))?;

        selection.skill = Some(skill);
        self.stage = ResolverStage::Select;
        Ok(())
    }

    /// Picks the job the skill bullet will be attached to.
    pub fn select_job(&mut self, ctx: &ResumeContext, job_index: usize) -> Result<(), WizardError> {
        self.ensure_not_generating()?;
        let selection = self.selection.as_mut().ok_or(WizardError::NoCategory)?;
        if selection.skill.is_none() {
            return Err(WizardError::NoSkill);
        }
        if ctx.resume().job(job_index).is_none() {
            return Err(WizardError::UnknownJob(job_index));
        }

        selection.job_index = Some(job_index);
        self.stage = ResolverStage::Select;
        Ok(())
    }

    fn target(&self, ctx: &ResumeContext) -> Option<SkillTarget> {
        let selection = self.selection.as_ref()?;
        let skill = selection.skill.clone()?;
        let job_index = selection.job_index?;
        let job = ctx.resume().job(job_index)?.clone();
        Some(SkillTarget {
            skill_id: SkillId::derive(&skill.name, &job),
            skill,
            job_index,
            job,
        })
    }

    pub fn can_proceed(&self, ctx: &ResumeContext) -> bool {
        matches!(self.stage, ResolverStage::Select) && self.target(ctx).is_some()
    }

    /// Leaves the select stage. Goes straight to review when the gap already
    /// has a committed bullet.
    pub fn proceed(&mut self, ctx: &ResumeContext) -> Result<(), WizardError> {
        if !matches!(self.stage, ResolverStage::Select) {
            return Err(WizardError::WrongStage(self.stage.name()));
        }
        let target = self.target(ctx).ok_or(WizardError::IncompleteSelection)?;

        self.stage = match ctx.skill_bullet(&target.skill_id) {
            Some(record) => {
                debug!("Re-opening committed skill bullet {}", target.skill_id);
                review_from_record(target, record)
            }
            None => ResolverStage::Generate {
                target,
                generating: false,
                error: None,
            },
        };
        Ok(())
    }

    /// Raises the in-flight flag and returns what to send to the generator.
    pub fn begin_generation(&mut self) -> Result<GenerationRequest, WizardError> {
        match &mut self.stage {
            ResolverStage::Generate {
                generating: true, ..
            } => Err(WizardError::InFlight("bullet generation")),
            ResolverStage::Generate {
                target,
                generating,
                error,
            } => {
                *generating = true;
                *error = None;
                Ok(GenerationRequest {
                    skill_id: target.skill_id.clone(),
                    skill_name: target.skill.name.clone(),
                    recommendation: target.skill.recommendation.clone(),
                    job: target.job.clone(),
                })
            }
            other => Err(WizardError::WrongStage(other.name())),
        }
    }

    /// Applies the generator's outcome. Success moves to review; failure
    /// stays in generate with the error shown and retry available.
    pub fn finish_generation(
        &mut self,
        skill_id: &SkillId,
        outcome: Result<GeneratedBullets, String>,
    ) {
        let ResolverStage::Generate {
            target,
            generating,
            error,
        } = &mut self.stage
        else {
            warn!("Dropping generation result for {skill_id}: resolver left the generate stage");
            return;
        };
        if &target.skill_id != skill_id {
            warn!("Dropping stale generation result for {skill_id}");
            return;
        }

        *generating = false;
        match outcome {
            Ok(generated) => {
                let variations = generated.variations();
                let draft = variations.first().cloned().unwrap_or_default();
                info!(
                    "Generated {} variation(s) for {}",
                    variations.len(),
                    target.skill_id
                );
                self.stage = ResolverStage::Review {
                    target: target.clone(),
                    variations,
                    selected_variation: 0,
                    draft,
                };
            }
            Err(message) => {
                *error = Some(message);
            }
        }
    }

    /// Switches to another variation. Overwrites the edit buffer and, if the
    /// gap is already committed, the stored choice.
    pub fn select_variation(
        &mut self,
        ctx: &mut ResumeContext,
        index: usize,
    ) -> Result<(), WizardError> {
        let (target, variations, selected_variation, draft) = match &mut self.stage {
            ResolverStage::Review {
                target,
                variations,
                selected_variation,
                draft,
            } => (target, variations, selected_variation, draft),
            other => return Err(WizardError::WrongStage(other.name())),
        };
        let text = variations
            .get(index)
            .cloned()
            .ok_or(WizardError::UnknownVariation(index))?;

        *selected_variation = index;
        *draft = text.clone();
        ctx.select_skill_variation(&target.skill_id, index, &text);
        Ok(())
    }

    pub fn edit_draft(&mut self, text: String) -> Result<(), WizardError> {
        match &mut self.stage {
            ResolverStage::Review { draft, .. } => {
                *draft = text;
                Ok(())
            }
            other => Err(WizardError::WrongStage(other.name())),
        }
    }

    pub fn can_commit(&self) -> bool {
        matches!(&self.stage, ResolverStage::Review { draft, .. } if !draft.trim().is_empty())
    }

    /// Writes the edited bullet into the context and returns to select with
    /// the selection cleared.
    pub fn commit(&mut self, ctx: &mut ResumeContext) -> Result<SkillId, WizardError> {
        let ResolverStage::Review {
            target,
            variations,
            selected_variation,
            draft,
        } = &self.stage
        else {
            return Err(WizardError::WrongStage(self.stage.name()));
        };
        let text = draft.trim();
        if text.is_empty() {
            return Err(WizardError::EmptyBullet);
        }

        let has_variations = variations.len() > 1;
        let record = SkillBulletRecord {
            bullet: text.to_string(),
            multiple_bullets: has_variations.then(|| variations.clone()),
            selected_variation: has_variations.then_some(*selected_variation),
            job_index: target.job_index,
            skill: target.skill.name.clone(),
        };
        let skill_id = target.skill_id.clone();
        ctx.save_new_skill_bullet(skill_id.clone(), record)?;
        info!("Committed skill bullet {skill_id}");

        self.reset();
        Ok(skill_id)
    }

    /// Backs out of generate/review to the select stage, keeping the selection.
    pub fn cancel(&mut self) -> Result<(), WizardError> {
        self.ensure_not_generating()?;
        self.stage = ResolverStage::Select;
        Ok(())
    }

    /// Recomputed on every read.
    pub fn metrics(&self, ctx: &ResumeContext) -> ResolverMetrics {
        let addressed = ctx.skill_bullets().len();
        let total = self.concepts.total_skills();
        ResolverMetrics {
            addressed,
            total,
            progress_percent: progress_percent(addressed, total),
            no_gaps: total == 0,
        }
    }

    pub fn view(&self, ctx: &ResumeContext) -> ResolverView {
        ResolverView {
            stage: self.stage.clone(),
            selection: self.selection.clone(),
            categories: self.concepts.missing_concepts.clone(),
            jobs: ctx
                .resume()
                .jobs()
                .iter()
                .enumerate()
                .map(|(index, job)| JobOption {
                    index,
                    job_id: job.job_id(),
                    company: job.company.clone(),
                    position: job.position.clone(),
                })
                .collect(),
            metrics: self.metrics(ctx),
            can_proceed: self.can_proceed(ctx),
            can_generate: matches!(
                self.stage,
                ResolverStage::Generate {
                    generating: false,
                    ..
                }
            ),
            can_commit: self.can_commit(),
            can_advance: !self.is_generating(),
        }
    }
}

fn review_from_record(target: SkillTarget, record: &SkillBulletRecord) -> ResolverStage {
    let variations = match &record.multiple_bullets {
        Some(v) if !v.is_empty() => v.clone(),
        _ => vec![record.bullet.clone()],
    };
    let selected_variation = record
        .selected_variation
        .filter(|i| *i < variations.len())
        .unwrap_or(0);
    ResolverStage::Review {
        target,
        variations,
        selected_variation,
        draft: record.seed_text().to_string(),
    }
}

/// `addressed / total * 100`, clamped to [0, 100]; 0 when there are no gaps.
pub fn progress_percent(addressed: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (addressed as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
}
