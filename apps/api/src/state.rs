use std::sync::Arc;

use crate::config::Config;
use crate::export::ResumeExporter;
use crate::generation::{BulletImprover, GapAnalyzer, ResumeParser, SkillBulletGenerator};
use crate::wizard::store::SessionStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Wizard sessions; the only mutable state in the service.
    pub sessions: SessionStore,
    pub skill_bullets: Arc<dyn SkillBulletGenerator>,
    pub improver: Arc<dyn BulletImprover>,
    pub parser: Arc<dyn ResumeParser>,
    pub gap_analyzer: Arc<dyn GapAnalyzer>,
    pub exporter: Arc<dyn ResumeExporter>,
}
