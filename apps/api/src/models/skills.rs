use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::resume::{slugify, Job};

/// A missing skill flagged by the gap analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    pub name: String,
    #[serde(default)]
    pub recommendation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillCategory {
    pub category: String,
    #[serde(default)]
    pub skills: Vec<Skill>,
}

/// Output shape of the AI recommendation service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingConcepts {
    #[serde(default)]
    pub missing_concepts: Vec<SkillCategory>,
}

impl MissingConcepts {
    pub fn category(&self, name: &str) -> Option<&SkillCategory> {
        self.missing_concepts.iter().find(|c| c.category == name)
    }

    /// Sum of skill list lengths across all categories.
    pub fn total_skills(&self) -> usize {
        self.missing_concepts.iter().map(|c| c.skills.len()).sum()
    }
}

/// Key correlating an accepted bullet with its (skill, job) gap.
///
/// Built from the skill name, the job's company and the job's position, each
/// lowercased with whitespace runs turned into hyphens, joined by `-`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SkillId(String);

impl SkillId {
    pub fn derive(skill_name: &str, job: &Job) -> Self {
        Self(format!(
            "{}-{}-{}",
            slugify(skill_name),
            slugify(&job.company),
            slugify(&job.position)
        ))
    }
}

impl fmt::Display for SkillId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Committed bullet for one skill gap on one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillBulletRecord {
    pub bullet: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiple_bullets: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_variation: Option<usize>,
    pub job_index: usize,
    pub skill: String,
}

impl SkillBulletRecord {
    /// Text the edit buffer starts from when the record is re-opened:
    /// the selected variation (index 0 when unset) if variations exist,
    /// otherwise the committed bullet.
    pub fn seed_text(&self) -> &str {
        match &self.multiple_bullets {
            Some(variations) if !variations.is_empty() => {
                let index = self.selected_variation.unwrap_or(0);
                variations
                    .get(index)
                    .or_else(|| variations.first())
                    .map(String::as_str)
                    .unwrap_or(&self.bullet)
            }
            _ => &self.bullet,
        }
    }
}

/// Bullet text returned by a generation collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedBullets {
    pub bullet: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiple_bullets: Option<Vec<String>>,
}

impl GeneratedBullets {
    /// Variations to offer for selection. A single bullet yields one entry.
    pub fn variations(&self) -> Vec<String> {
        match &self.multiple_bullets {
            Some(v) if !v.is_empty() => v.clone(),
            _ => vec![self.bullet.clone()],
        }
    }
}
