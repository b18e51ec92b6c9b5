//! Resume Context: the single source of truth every wizard step reads.
//!
//! Holds the uploaded resume, accepted bullet improvements and committed
//! skill bullets, and owns the export in-flight guard.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::warn;

use crate::export::ExportReceipt;
use crate::models::resume::{BulletId, ResumeData};
use crate::models::skills::{SkillBulletRecord, SkillId};
use crate::wizard::WizardError;

#[derive(Debug, Default)]
pub struct ResumeContext {
    resume: ResumeData,
    improvements: BTreeMap<BulletId, String>,
    skill_bullets: BTreeMap<SkillId, SkillBulletRecord>,
    exporting: bool,
    last_export: Option<ExportReceipt>,
    export_error: Option<String>,
}

/// Serializable view of the export state.
#[derive(Debug, Clone, Serialize)]
pub struct ExportStatus {
    pub exporting: bool,
    pub last_export: Option<ExportReceipt>,
    pub error: Option<String>,
}

impl ResumeContext {
    pub fn resume(&self) -> &ResumeData {
        &self.resume
    }

    pub fn has_resume(&self) -> bool {
        !self.resume.is_empty()
    }

    /// Replaces the resume. Improvements and skill bullets are keyed by job
    /// and bullet positions, so they are dropped with the old resume.
    pub fn set_resume(&mut self, resume: ResumeData) {
        self.resume = resume;
        self.improvements.clear();
        self.skill_bullets.clear();
        self.last_export = None;
        self.export_error = None;
    }

    pub fn original_bullet(&self, id: &BulletId) -> Result<&str, WizardError> {
        self.resume
            .bullet(id)
            .ok_or_else(|| WizardError::UnknownBullet(id.to_string()))
    }

    pub fn improvements(&self) -> &BTreeMap<BulletId, String> {
        &self.improvements
    }

    pub fn accept_improvement(&mut self, id: BulletId, text: &str) -> Result<(), WizardError> {
        self.original_bullet(&id)?;
        let text = text.trim();
        if text.is_empty() {
            return Err(WizardError::EmptyBullet);
        }
        self.improvements.insert(id, text.to_string());
        Ok(())
    }

    /// Drops an accepted improvement. Returns whether one existed.
    pub fn revert_improvement(&mut self, id: &BulletId) -> Result<bool, WizardError> {
        self.original_bullet(id)?;
        Ok(self.improvements.remove(id).is_some())
    }

    pub fn skill_bullets(&self) -> &BTreeMap<SkillId, SkillBulletRecord> {
        &self.skill_bullets
    }

    pub fn skill_bullet(&self, id: &SkillId) -> Option<&SkillBulletRecord> {
        self.skill_bullets.get(id)
    }

    /// Commits a skill bullet. An existing record for the same id is
    /// overwritten, never duplicated.
    pub fn save_new_skill_bullet(
        &mut self,
        id: SkillId,
        record: SkillBulletRecord,
    ) -> Result<(), WizardError> {
        if record.bullet.trim().is_empty() {
            return Err(WizardError::EmptyBullet);
        }
        if self.resume.job(record.job_index).is_none() {
            return Err(WizardError::UnknownJob(record.job_index));
        }
        self.skill_bullets.insert(id, record);
        Ok(())
    }

    /// Records a variation choice on an already committed skill bullet.
    pub fn select_skill_variation(&mut self, id: &SkillId, index: usize, text: &str) {
        if let Some(record) = self.skill_bullets.get_mut(id) {
            record.selected_variation = Some(index);
            record.bullet = text.to_string();
        }
    }

    /// Original jobs with accepted improvements applied in place and
    /// committed skill bullets appended to their job, in skill id order.
    pub fn merged_resume(&self) -> ResumeData {
        let mut merged = self.resume.clone();

        for (id, text) in &self.improvements {
            if let Some(bullet) = merged
                .bullet_points
                .get_mut(id.job_index)
                .and_then(|job| job.achievements.get_mut(id.bullet_index))
            {
                *bullet = text.clone();
            }
        }

        for (id, record) in &self.skill_bullets {
            match merged.bullet_points.get_mut(record.job_index) {
                Some(job) => job.achievements.push(record.bullet.clone()),
                None => warn!(
                    "Skipping skill bullet {id}: job index {} no longer exists",
                    record.job_index
                ),
            }
        }

        merged
    }

    pub fn is_exporting(&self) -> bool {
        self.exporting
    }

    /// Raises the export in-flight flag and returns the document to export.
    pub fn begin_export(&mut self) -> Result<ResumeData, WizardError> {
        if self.exporting {
            return Err(WizardError::InFlight("export"));
        }
        if !self.has_resume() {
            return Err(WizardError::ResumeMissing);
        }
        self.exporting = true;
        self.export_error = None;
        Ok(self.merged_resume())
    }

    /// Clears the in-flight flag whatever the outcome.
    pub fn finish_export(&mut self, outcome: Result<ExportReceipt, String>) {
        self.exporting = false;
        match outcome {
            Ok(receipt) => self.last_export = Some(receipt),
            Err(message) => self.export_error = Some(message),
        }
    }

    pub fn export_status(&self) -> ExportStatus {
        ExportStatus {
            exporting: self.exporting,
            last_export: self.last_export.clone(),
            error: self.export_error.clone(),
        }
    }
}
