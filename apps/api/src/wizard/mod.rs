//! The resume-improvement wizard: session state, step navigation and the
//! per-step workflows. All state is in memory and lives for one session.

pub mod context;
pub mod handlers;
pub mod improvements;
pub mod resolver;
pub mod skill_handlers;
pub mod store;

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::export::ExportReceipt;
use crate::models::resume::{BulletId, ResumeData};
use crate::models::skills::{GeneratedBullets, MissingConcepts, SkillBulletRecord, SkillId};
use context::{ExportStatus, ResumeContext};
use improvements::{ImprovementRequest, ImprovementReview, ImprovementView};
use resolver::{GenerationRequest, ResolverView, SkillResolver};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WizardError {
    #[error("Unknown skill category '{0}'")]
    UnknownCategory(String),

    #[error("Unknown skill '{0}' in the selected category")]
    UnknownSkill(String),

    #[error("No job at index {0}")]
    UnknownJob(usize),

    #[error("Unknown bullet '{0}'")]
    UnknownBullet(String),

    #[error("No variation at index {0}")]
    UnknownVariation(usize),

    #[error("Choose a skill category first")]
    NoCategory,

    #[error("Choose a skill before choosing a job")]
    NoSkill,

    #[error("Choose both a skill and a job before continuing")]
    IncompleteSelection,

    #[error("Action is not available in the {0} stage")]
    WrongStage(&'static str),

    #[error("Bullet text cannot be empty")]
    EmptyBullet,

    #[error("A {0} request is already in progress")]
    InFlight(&'static str),

    #[error("Upload a resume before continuing")]
    ResumeMissing,

    #[error("Select at least one feature")]
    NoFeatures,

    #[error("Already at the {0} step")]
    StepBoundary(&'static str),

    #[error("Only available on the {0} step")]
    NotOnStep(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    ImproveBullets,
    MissingSkills,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThemeMode {
    #[default]
    Light,
    Dark,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    #[default]
    FeatureSelect,
    Upload,
    Improvements,
    MissingSkills,
    FinalReview,
}

impl WizardStep {
    const ORDER: [WizardStep; 5] = [
        WizardStep::FeatureSelect,
        WizardStep::Upload,
        WizardStep::Improvements,
        WizardStep::MissingSkills,
        WizardStep::FinalReview,
    ];

    pub fn name(self) -> &'static str {
        match self {
            WizardStep::FeatureSelect => "feature select",
            WizardStep::Upload => "upload",
            WizardStep::Improvements => "improvements",
            WizardStep::MissingSkills => "missing skills",
            WizardStep::FinalReview => "final review",
        }
    }

    fn position(self) -> usize {
        Self::ORDER
            .iter()
            .position(|s| *s == self)
            .unwrap_or_default()
    }

    /// The feature a step belongs to; steps without one are always shown.
    fn feature(self) -> Option<Feature> {
        match self {
            WizardStep::Improvements => Some(Feature::ImproveBullets),
            WizardStep::MissingSkills => Some(Feature::MissingSkills),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct WizardSession {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    step: WizardStep,
    features: BTreeSet<Feature>,
    theme: ThemeMode,
    context: ResumeContext,
    improvements: ImprovementReview,
    resolver: SkillResolver,
    parsing: bool,
    analyzing: bool,
}

/// Full serializable state of a session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub step: WizardStep,
    pub features: BTreeSet<Feature>,
    pub theme: ThemeMode,
    pub resume: ResumeData,
    pub improvements: ImprovementView,
    pub skill_bullets: BTreeMap<SkillId, SkillBulletRecord>,
    pub export: ExportStatus,
    pub parsing: bool,
    pub analyzing: bool,
    pub can_go_back: bool,
    pub can_go_next: bool,
}

impl WizardSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            step: WizardStep::default(),
            features: [Feature::ImproveBullets, Feature::MissingSkills].into(),
            theme: ThemeMode::default(),
            context: ResumeContext::default(),
            improvements: ImprovementReview::default(),
            resolver: SkillResolver::default(),
            parsing: false,
            analyzing: false,
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn set_theme(&mut self, theme: ThemeMode) {
        self.theme = theme;
    }

    pub fn set_features(&mut self, features: BTreeSet<Feature>) -> Result<(), WizardError> {
        if features.is_empty() {
            return Err(WizardError::NoFeatures);
        }
        self.features = features;
        Ok(())
    }

    fn is_shown(&self, step: WizardStep) -> bool {
        step.feature().map_or(true, |f| self.features.contains(&f))
    }

    /// A step with a collaborator call in flight cannot be left either way.
    fn ensure_settled(&self) -> Result<(), WizardError> {
        match self.step {
            WizardStep::Upload if self.parsing => Err(WizardError::InFlight("resume parsing")),
            WizardStep::Improvements if self.improvements.is_generating() => {
                Err(WizardError::InFlight("improvement generation"))
            }
            WizardStep::MissingSkills if self.resolver.is_generating() => {
                Err(WizardError::InFlight("bullet generation"))
            }
            WizardStep::FinalReview if self.context.is_exporting() => {
                Err(WizardError::InFlight("export"))
            }
            _ => Ok(()),
        }
    }

    /// Forward exit conditions of the current step.
    fn can_advance(&self) -> Result<(), WizardError> {
        self.ensure_settled()?;
        match self.step {
            WizardStep::FeatureSelect if self.features.is_empty() => Err(WizardError::NoFeatures),
            WizardStep::Upload if !self.context.has_resume() => Err(WizardError::ResumeMissing),
            _ => Ok(()),
        }
    }

    fn neighbour(&self, forward: bool) -> Option<WizardStep> {
        let position = self.step.position();
        let order = WizardStep::ORDER;
        if forward {
            order[position + 1..]
                .iter()
                .copied()
                .find(|s| self.is_shown(*s))
        } else {
            order[..position]
                .iter()
                .rev()
                .copied()
                .find(|s| self.is_shown(*s))
        }
    }

    pub fn next_step(&mut self) -> Result<WizardStep, WizardError> {
        let next = self
            .neighbour(true)
            .ok_or(WizardError::StepBoundary(self.step.name()))?;
        self.can_advance()?;
        self.step = next;
        Ok(next)
    }

    pub fn previous_step(&mut self) -> Result<WizardStep, WizardError> {
        let previous = self
            .neighbour(false)
            .ok_or(WizardError::StepBoundary(self.step.name()))?;
        self.ensure_settled()?;
        self.step = previous;
        Ok(previous)
    }

    // ── upload ──────────────────────────────────────────────────────────

    /// Installs a resume. Everything keyed by job or bullet position is reset.
    pub fn set_resume(&mut self, resume: ResumeData) -> Result<(), WizardError> {
        if self.context.is_exporting() {
            return Err(WizardError::InFlight("export"));
        }
        if self.resolver.is_generating() || self.improvements.is_generating() {
            return Err(WizardError::InFlight("generation"));
        }
        self.context.set_resume(resume);
        self.improvements.clear();
        self.resolver.reset();
        Ok(())
    }

    pub fn begin_parsing(&mut self) -> Result<(), WizardError> {
        if self.parsing {
            return Err(WizardError::InFlight("resume parsing"));
        }
        self.parsing = true;
        Ok(())
    }

    pub fn finish_parsing(&mut self, parsed: Option<ResumeData>) -> Result<(), WizardError> {
        self.parsing = false;
        match parsed {
            Some(resume) => self.set_resume(resume),
            None => Ok(()),
        }
    }

    // ── improvements ────────────────────────────────────────────────────

    pub fn original_bullet(&self, id: &BulletId) -> Result<&str, WizardError> {
        self.context.original_bullet(id)
    }

    pub fn begin_improvement(&mut self, id: BulletId) -> Result<ImprovementRequest, WizardError> {
        self.improvements.begin(&self.context, id)
    }

    pub fn finish_improvement(&mut self, id: BulletId, outcome: Result<GeneratedBullets, String>) {
        self.improvements.finish(id, outcome);
    }

    pub fn select_improvement_variation(
        &mut self,
        id: &BulletId,
        index: usize,
    ) -> Result<String, WizardError> {
        self.improvements.select_variation(id, index)
    }

    pub fn accept_improvement(&mut self, id: BulletId, text: &str) -> Result<(), WizardError> {
        self.context.accept_improvement(id, text)
    }

    pub fn revert_improvement(&mut self, id: &BulletId) -> Result<bool, WizardError> {
        self.context.revert_improvement(id)
    }

    pub fn improvement_view(&self) -> ImprovementView {
        self.improvements.view(&self.context)
    }

    // ── missing skills ──────────────────────────────────────────────────

    pub fn begin_analysis(&mut self) -> Result<ResumeData, WizardError> {
        if self.analyzing {
            return Err(WizardError::InFlight("gap analysis"));
        }
        if !self.context.has_resume() {
            return Err(WizardError::ResumeMissing);
        }
        self.analyzing = true;
        Ok(self.context.resume().clone())
    }

    pub fn finish_analysis(
        &mut self,
        concepts: Option<MissingConcepts>,
    ) -> Result<(), WizardError> {
        self.analyzing = false;
        match concepts {
            Some(concepts) => self.resolver.set_concepts(concepts),
            None => Ok(()),
        }
    }

    pub fn set_missing_concepts(&mut self, concepts: MissingConcepts) -> Result<(), WizardError> {
        self.resolver.set_concepts(concepts)
    }

    pub fn select_skill_category(&mut self, category: &str) -> Result<(), WizardError> {
        self.resolver.select_category(category)
    }

    pub fn select_skill(&mut self, skill: &str) -> Result<(), WizardError> {
        self.resolver.select_skill(skill)
    }

    pub fn select_skill_job(&mut self, job_index: usize) -> Result<(), WizardError> {
        self.resolver.select_job(&self.context, job_index)
    }

    pub fn proceed_skill(&mut self) -> Result<(), WizardError> {
        self.resolver.proceed(&self.context)
    }

    pub fn begin_skill_generation(&mut self) -> Result<GenerationRequest, WizardError> {
        self.resolver.begin_generation()
    }

    pub fn finish_skill_generation(
        &mut self,
        skill_id: &SkillId,
        outcome: Result<GeneratedBullets, String>,
    ) {
        self.resolver.finish_generation(skill_id, outcome);
    }

    pub fn select_skill_variation(&mut self, index: usize) -> Result<(), WizardError> {
        self.resolver.select_variation(&mut self.context, index)
    }

    pub fn edit_skill_draft(&mut self, text: String) -> Result<(), WizardError> {
        self.resolver.edit_draft(text)
    }

    pub fn commit_skill_bullet(&mut self) -> Result<SkillId, WizardError> {
        self.resolver.commit(&mut self.context)
    }

    pub fn cancel_skill(&mut self) -> Result<(), WizardError> {
        self.resolver.cancel()
    }

    pub fn resolver_view(&self) -> ResolverView {
        self.resolver.view(&self.context)
    }

    // ── final review ────────────────────────────────────────────────────

    pub fn preview(&self) -> ResumeData {
        self.context.merged_resume()
    }

    pub fn begin_export(&mut self) -> Result<ResumeData, WizardError> {
        if self.step != WizardStep::FinalReview {
            return Err(WizardError::NotOnStep(WizardStep::FinalReview.name()));
        }
        self.context.begin_export()
    }

    pub fn finish_export(&mut self, outcome: Result<ExportReceipt, String>) {
        self.context.finish_export(outcome);
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id,
            created_at: self.created_at,
            step: self.step,
            features: self.features.clone(),
            theme: self.theme,
            resume: self.context.resume().clone(),
            improvements: self.improvement_view(),
            skill_bullets: self.context.skill_bullets().clone(),
            export: self.context.export_status(),
            parsing: self.parsing,
            analyzing: self.analyzing,
            can_go_back: self.neighbour(false).is_some() && self.ensure_settled().is_ok(),
            can_go_next: self.neighbour(true).is_some() && self.can_advance().is_ok(),
        }
    }
}

impl Default for WizardSession {
    fn default() -> Self {
        Self::new()
    }
}
