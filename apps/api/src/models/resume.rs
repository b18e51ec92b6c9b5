use std::fmt;

use serde::{Deserialize, Serialize};

/// A single position on the uploaded resume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub company: String,
    pub position: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_period: Option<String>,
    #[serde(default)]
    pub achievements: Vec<String>,
}

impl Job {
    /// Display key for a job: `company-position`, lowercased and hyphenated.
    pub fn job_id(&self) -> String {
        format!("{}-{}", slugify(&self.company), slugify(&self.position))
    }
}

/// Structured resume as produced by the upload step.
///
/// The JSON field is `bullet_points` because that is the shape the resume
/// parser and the front end exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeData {
    #[serde(default)]
    pub bullet_points: Vec<Job>,
}

impl ResumeData {
    pub fn jobs(&self) -> &[Job] {
        &self.bullet_points
    }

    pub fn job(&self, index: usize) -> Option<&Job> {
        self.bullet_points.get(index)
    }

    pub fn is_empty(&self) -> bool {
        self.bullet_points.is_empty()
    }

    pub fn bullet_count(&self) -> usize {
        self.bullet_points.iter().map(|j| j.achievements.len()).sum()
    }

    /// Looks up the original text of a bullet by its position-derived id.
    pub fn bullet(&self, id: &BulletId) -> Option<&str> {
        self.bullet_points
            .get(id.job_index)
            .and_then(|job| job.achievements.get(id.bullet_index))
            .map(String::as_str)
    }

    /// Every bullet on the resume paired with its id, in document order.
    pub fn bullets(&self) -> impl Iterator<Item = (BulletId, &str)> {
        self.bullet_points
            .iter()
            .enumerate()
            .flat_map(|(job_index, job)| {
                job.achievements
                    .iter()
                    .enumerate()
                    .map(move |(bullet_index, text)| {
                        (BulletId::new(job_index, bullet_index), text.as_str())
                    })
            })
    }
}

/// Stable identifier of an original resume bullet: `job-{j}-bullet-{b}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BulletId {
    pub job_index: usize,
    pub bullet_index: usize,
}

impl BulletId {
    pub fn new(job_index: usize, bullet_index: usize) -> Self {
        Self {
            job_index,
            bullet_index,
        }
    }

    /// Parses the `job-{j}-bullet-{b}` form. Returns `None` for anything else.
    pub fn parse(raw: &str) -> Option<Self> {
        let rest = raw.strip_prefix("job-")?;
        let (job, bullet) = rest.split_once("-bullet-")?;
        Some(Self::new(job.parse().ok()?, bullet.parse().ok()?))
    }
}

impl fmt::Display for BulletId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}-bullet-{}", self.job_index, self.bullet_index)
    }
}

impl Serialize for BulletId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for BulletId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        BulletId::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid bullet id '{raw}'")))
    }
}

/// Lowercases and collapses every whitespace run into a single hyphen.
pub fn slugify(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}
