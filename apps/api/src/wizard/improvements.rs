//! Bullet-improvement review: AI rewrites of existing bullets, offered as
//! variations the user picks from before accepting into the context.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::warn;

use crate::models::resume::{BulletId, Job};
use crate::models::skills::GeneratedBullets;
use crate::wizard::context::ResumeContext;
use crate::wizard::WizardError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    pub variations: Vec<String>,
    pub selected_variation: usize,
}

impl Suggestion {
    pub fn selected_text(&self) -> Option<&str> {
        self.variations
            .get(self.selected_variation)
            .map(String::as_str)
    }
}

#[derive(Debug, Clone)]
pub struct ImprovementRequest {
    pub bullet_id: BulletId,
    pub original: String,
    pub job: Job,
}

#[derive(Debug, Default)]
pub struct ImprovementReview {
    suggestions: BTreeMap<BulletId, Suggestion>,
    errors: BTreeMap<BulletId, String>,
    generating: Option<BulletId>,
}

/// One row of the improvement screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulletRow {
    pub id: BulletId,
    pub original: String,
    pub suggested: Option<String>,
    pub accepted: Option<String>,
}

/// Serializable state of the improvement screen.
#[derive(Debug, Clone, Serialize)]
pub struct ImprovementView {
    pub bullets: Vec<BulletRow>,
    pub suggestions: BTreeMap<BulletId, Suggestion>,
    pub accepted: BTreeMap<BulletId, String>,
    pub errors: BTreeMap<BulletId, String>,
    pub generating: Option<BulletId>,
}

impl ImprovementReview {
    pub fn clear(&mut self) {
        self.suggestions.clear();
        self.errors.clear();
        self.generating = None;
    }

    pub fn is_generating(&self) -> bool {
        self.generating.is_some()
    }

    pub fn begin(
        &mut self,
        ctx: &ResumeContext,
        id: BulletId,
    ) -> Result<ImprovementRequest, WizardError> {
        if self.generating.is_some() {
            return Err(WizardError::InFlight("improvement generation"));
        }
        let original = ctx.original_bullet(&id)?.to_string();
        let job = ctx
            .resume()
            .job(id.job_index)
            .cloned()
            .ok_or_else(|| WizardError::UnknownBullet(id.to_string()))?;

        self.generating = Some(id);
        self.errors.remove(&id);
        Ok(ImprovementRequest {
            bullet_id: id,
            original,
            job,
        })
    }

    pub fn finish(&mut self, id: BulletId, outcome: Result<GeneratedBullets, String>) {
        if self.generating != Some(id) {
            warn!("Dropping stale improvement result for {id}");
            return;
        }
        self.generating = None;
        match outcome {
            Ok(generated) => {
                self.suggestions.insert(
                    id,
                    Suggestion {
                        variations: generated.variations(),
                        selected_variation: 0,
                    },
                );
            }
            Err(message) => {
                self.errors.insert(id, message);
            }
        }
    }

    /// Picks a variation and returns its text.
    pub fn select_variation(&mut self, id: &BulletId, index: usize) -> Result<String, WizardError> {
        let suggestion = self
            .suggestions
            .get_mut(id)
            .ok_or_else(|| WizardError::UnknownBullet(id.to_string()))?;
        let text = suggestion
            .variations
            .get(index)
            .cloned()
            .ok_or(WizardError::UnknownVariation(index))?;
        suggestion.selected_variation = index;
        Ok(text)
    }

    pub fn view(&self, ctx: &ResumeContext) -> ImprovementView {
        let bullets = ctx
            .resume()
            .bullets()
            .map(|(id, original)| BulletRow {
                id,
                original: original.to_string(),
                suggested: self
                    .suggestions
                    .get(&id)
                    .and_then(Suggestion::selected_text)
                    .map(str::to_string),
                accepted: ctx.improvements().get(&id).cloned(),
            })
            .collect();
        ImprovementView {
            bullets,
            suggestions: self.suggestions.clone(),
            accepted: ctx.improvements().clone(),
            errors: self.errors.clone(),
            generating: self.generating,
        }
    }
}
