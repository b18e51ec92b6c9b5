pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};

use crate::state::AppState;
use crate::wizard::{handlers, skill_handlers};

/// Multipart framing on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;

    Router::new()
        .route("/api/health", get(health::health_handler))
        // Sessions and navigation
        .route("/api/v1/sessions", post(handlers::handle_create_session))
        .route(
            "/api/v1/sessions/:id",
            get(handlers::handle_get_session).delete(handlers::handle_end_session),
        )
        .route(
            "/api/v1/sessions/:id/features",
            put(handlers::handle_set_features),
        )
        .route(
            "/api/v1/sessions/:id/theme",
            put(handlers::handle_set_theme),
        )
        .route(
            "/api/v1/sessions/:id/step/next",
            post(handlers::handle_next_step),
        )
        .route(
            "/api/v1/sessions/:id/step/back",
            post(handlers::handle_previous_step),
        )
        // Upload
        .route(
            "/api/v1/sessions/:id/resume",
            put(handlers::handle_set_resume),
        )
        .route(
            "/api/v1/sessions/:id/resume/upload",
            post(handlers::handle_upload_resume),
        )
        // Bullet improvements
        .route(
            "/api/v1/sessions/:id/bullets/:bullet_id/original",
            get(handlers::handle_original_bullet),
        )
        .route(
            "/api/v1/sessions/:id/improvements",
            get(handlers::handle_get_improvements),
        )
        .route(
            "/api/v1/sessions/:id/improvements/:bullet_id",
            put(handlers::handle_accept_improvement).delete(handlers::handle_revert_improvement),
        )
        .route(
            "/api/v1/sessions/:id/improvements/:bullet_id/generate",
            post(handlers::handle_generate_improvement),
        )
        .route(
            "/api/v1/sessions/:id/improvements/:bullet_id/variation",
            post(handlers::handle_select_improvement_variation),
        )
        // Missing skills
        .route(
            "/api/v1/sessions/:id/recommendations",
            put(handlers::handle_set_recommendations),
        )
        .route(
            "/api/v1/sessions/:id/recommendations/generate",
            post(handlers::handle_generate_recommendations),
        )
        .route(
            "/api/v1/sessions/:id/skills",
            get(skill_handlers::handle_get_resolver),
        )
        .route(
            "/api/v1/sessions/:id/skills/category",
            post(skill_handlers::handle_select_category),
        )
        .route(
            "/api/v1/sessions/:id/skills/skill",
            post(skill_handlers::handle_select_skill),
        )
        .route(
            "/api/v1/sessions/:id/skills/job",
            post(skill_handlers::handle_select_job),
        )
        .route(
            "/api/v1/sessions/:id/skills/proceed",
            post(skill_handlers::handle_proceed),
        )
        .route(
            "/api/v1/sessions/:id/skills/generate",
            post(skill_handlers::handle_generate),
        )
        .route(
            "/api/v1/sessions/:id/skills/variation",
            post(skill_handlers::handle_select_variation),
        )
        .route(
            "/api/v1/sessions/:id/skills/draft",
            put(skill_handlers::handle_edit_draft),
        )
        .route(
            "/api/v1/sessions/:id/skills/commit",
            post(skill_handlers::handle_commit),
        )
        .route(
            "/api/v1/sessions/:id/skills/cancel",
            post(skill_handlers::handle_cancel),
        )
        // Final review
        .route(
            "/api/v1/sessions/:id/preview",
            get(handlers::handle_preview),
        )
        .route("/api/v1/sessions/:id/export", post(handlers::handle_export))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::Utc;
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::config::Config;
    use crate::errors::AppError;
    use crate::export::{ExportReceipt, ResumeExporter};
    use crate::generation::{BulletImprover, GapAnalyzer, ResumeParser, SkillBulletGenerator};
    use crate::models::resume::{Job, ResumeData};
    use crate::models::skills::{GeneratedBullets, MissingConcepts, Skill, SkillCategory};
    use crate::wizard::store::SessionStore;

    #[derive(Default)]
    struct StubAssistant {
        fail: AtomicBool,
        delay_ms: AtomicU64,
    }

    #[async_trait]
    impl SkillBulletGenerator for StubAssistant {
        async fn generate_skill_bullet(
            &self,
            skill_name: &str,
            _recommendation: &str,
            _job: &Job,
        ) -> Result<GeneratedBullets, AppError> {
            let delay = self.delay_ms.load(Ordering::SeqCst);
            if delay > 0 {
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(AppError::Llm("Skill bullet generation failed: timeout".to_string()));
            }
            Ok(GeneratedBullets {
                bullet: format!("Deployed {skill_name} Lambda functions..."),
                multiple_bullets: None,
            })
        }
    }

    #[async_trait]
    impl BulletImprover for StubAssistant {
        async fn improve_bullet(
            &self,
            bullet: &str,
            _job: &Job,
        ) -> Result<GeneratedBullets, AppError> {
            Ok(GeneratedBullets {
                bullet: format!("{bullet}, cutting costs 20%"),
                multiple_bullets: Some(vec![
                    format!("{bullet}, cutting costs 20%"),
                    format!("{bullet} for 3 teams"),
                ]),
            })
        }
    }

    #[async_trait]
    impl ResumeParser for StubAssistant {
        async fn parse_resume(&self, text: &str) -> Result<ResumeData, AppError> {
            let mut lines = text.lines();
            let header = lines.next().unwrap_or_default();
            let (company, position) = header.split_once(" - ").unwrap_or((header, ""));
            Ok(ResumeData {
                bullet_points: vec![Job {
                    company: company.to_string(),
                    position: position.to_string(),
                    time_period: None,
                    achievements: lines
                        .filter_map(|l| l.strip_prefix("- "))
                        .map(str::to_string)
                        .collect(),
                }],
            })
        }
    }

    #[async_trait]
    impl GapAnalyzer for StubAssistant {
        async fn analyze_gaps(
            &self,
            _resume: &ResumeData,
            target_role: Option<&str>,
        ) -> Result<MissingConcepts, AppError> {
            Ok(MissingConcepts {
                missing_concepts: vec![SkillCategory {
                    category: target_role.unwrap_or("General").to_string(),
                    skills: vec![Skill {
                        name: "Kubernetes".to_string(),
                        recommendation: "Mention container orchestration".to_string(),
                    }],
                }],
            })
        }
    }

    #[derive(Default)]
    struct RecordingExporter {
        fail: AtomicBool,
        exported: Mutex<Vec<ResumeData>>,
    }

    #[async_trait]
    impl ResumeExporter for RecordingExporter {
        async fn export(
            &self,
            session_id: Uuid,
            resume: &ResumeData,
        ) -> Result<ExportReceipt, AppError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(AppError::Export("S3 upload failed: bucket missing".to_string()));
            }
            self.exported.lock().unwrap().push(resume.clone());
            Ok(ExportReceipt {
                location: format!("memory://{session_id}"),
                bytes: 1,
                exported_at: Utc::now(),
            })
        }
    }

    struct Harness {
        app: Router,
        assistant: Arc<StubAssistant>,
        exporter: Arc<RecordingExporter>,
    }

    fn harness() -> Harness {
        let assistant = Arc::new(StubAssistant::default());
        let exporter = Arc::new(RecordingExporter::default());
        let state = AppState {
            config: Config::for_tests(),
            sessions: SessionStore::default(),
            skill_bullets: assistant.clone(),
            improver: assistant.clone(),
            parser: assistant.clone(),
            gap_analyzer: assistant.clone(),
            exporter: exporter.clone(),
        };
        Harness {
            app: build_router(state),
            assistant,
            exporter,
        }
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    /// Creates a session with two jobs and one missing-skill category.
    async fn seeded_session(app: &Router) -> String {
        let (status, body) = send(app, "POST", "/api/v1/sessions", None).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["id"].as_str().unwrap().to_string();

        let resume = json!({
            "bullet_points": [
                {"company": "Initech", "position": "Intern", "achievements": ["Filed reports"]},
                {"company": "Acme", "position": "Engineer", "achievements": ["Built APIs"]}
            ]
        });
        let (status, _) = send(
            app,
            "PUT",
            &format!("/api/v1/sessions/{id}/resume"),
            Some(resume),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let concepts = json!({
            "missingConcepts": [
                {"category": "Cloud", "skills": [{"name": "AWS", "recommendation": "..."}]}
            ]
        });
        let (status, _) = send(
            app,
            "PUT",
            &format!("/api/v1/sessions/{id}/recommendations"),
            Some(concepts),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        id
    }

    async fn choose_aws_at_acme(app: &Router, id: &str) {
        let base = format!("/api/v1/sessions/{id}/skills");
        let (s, _) = send(
            app,
            "POST",
            &format!("{base}/category"),
            Some(json!({"category": "Cloud"})),
        )
        .await;
        assert_eq!(s, StatusCode::OK);
        let (s, _) = send(
            app,
            "POST",
            &format!("{base}/skill"),
            Some(json!({"skill": "AWS"})),
        )
        .await;
        assert_eq!(s, StatusCode::OK);
        let (s, view) = send(
            app,
            "POST",
            &format!("{base}/job"),
            Some(json!({"job_index": 1})),
        )
        .await;
        assert_eq!(s, StatusCode::OK);
        assert_eq!(view["can_proceed"], true);
    }

    #[tokio::test]
    async fn test_health() {
        let h = harness();
        let (status, body) = send(&h.app, "GET", "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["active_sessions"], 0);
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let h = harness();
        let (status, body) = send(
            &h.app,
            "GET",
            &format!("/api/v1/sessions/{}", Uuid::new_v4()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_resolver_scenario_commits_aws_acme_engineer() {
        let h = harness();
        let id = seeded_session(&h.app).await;
        let base = format!("/api/v1/sessions/{id}/skills");
        choose_aws_at_acme(&h.app, &id).await;

        let (status, view) = send(&h.app, "POST", &format!("{base}/proceed"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["stage"], "generate");

        let (status, view) = send(&h.app, "POST", &format!("{base}/generate"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["stage"], "review");
        assert_eq!(view["draft"], "Deployed AWS Lambda functions...");
        assert_eq!(view["can_commit"], true);

        let (status, view) = send(&h.app, "POST", &format!("{base}/commit"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["stage"], "select");
        assert_eq!(view["selection"], Value::Null);
        assert_eq!(view["metrics"]["addressed"], 1);
        assert_eq!(view["metrics"]["progress_percent"], 100.0);

        let (_, session) = send(&h.app, "GET", &format!("/api/v1/sessions/{id}"), None).await;
        let records = session["skill_bullets"].as_object().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records["aws-acme-engineer"]["jobIndex"], 1);
        assert_eq!(records["aws-acme-engineer"]["skill"], "AWS");
    }

    #[tokio::test]
    async fn test_generation_failure_keeps_generate_stage() {
        let h = harness();
        let id = seeded_session(&h.app).await;
        let base = format!("/api/v1/sessions/{id}/skills");
        choose_aws_at_acme(&h.app, &id).await;
        send(&h.app, "POST", &format!("{base}/proceed"), None).await;

        h.assistant.fail.store(true, Ordering::SeqCst);
        let (status, body) = send(&h.app, "POST", &format!("{base}/generate"), None).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"]["code"], "LLM_ERROR");

        let (_, view) = send(&h.app, "GET", &base, None).await;
        assert_eq!(view["stage"], "generate");
        assert_eq!(view["generating"], false);
        assert!(view["error"].as_str().unwrap().contains("timeout"));
        assert_eq!(view["can_generate"], true);
        assert_eq!(view["metrics"]["addressed"], 0);

        h.assistant.fail.store(false, Ordering::SeqCst);
        let (status, view) = send(&h.app, "POST", &format!("{base}/generate"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["stage"], "review");
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_generate_request_still_settles_flag() {
        let h = harness();
        let id = seeded_session(&h.app).await;
        let base = format!("/api/v1/sessions/{id}/skills");
        choose_aws_at_acme(&h.app, &id).await;
        send(&h.app, "POST", &format!("{base}/proceed"), None).await;

        h.assistant.delay_ms.store(5_000, Ordering::SeqCst);
        let generate_uri = format!("{base}/generate");
        let request = send(&h.app, "POST", &generate_uri, None);
        let abandoned = tokio::time::timeout(Duration::from_millis(100), request).await;
        assert!(abandoned.is_err());

        let (status, _) = send(&h.app, "POST", &format!("{base}/cancel"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        tokio::time::sleep(Duration::from_secs(10)).await;
        let (_, view) = send(&h.app, "GET", &base, None).await;
        assert_eq!(view["stage"], "review");
        assert_eq!(view["draft"], "Deployed AWS Lambda functions...");

        let (status, view) = send(&h.app, "POST", &format!("{base}/cancel"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["stage"], "select");
    }

    #[tokio::test]
    async fn test_commit_with_empty_draft_is_rejected() {
        let h = harness();
        let id = seeded_session(&h.app).await;
        let base = format!("/api/v1/sessions/{id}/skills");
        choose_aws_at_acme(&h.app, &id).await;
        send(&h.app, "POST", &format!("{base}/proceed"), None).await;
        send(&h.app, "POST", &format!("{base}/generate"), None).await;

        let (_, view) = send(
            &h.app,
            "PUT",
            &format!("{base}/draft"),
            Some(json!({"text": ""})),
        )
        .await;
        assert_eq!(view["can_commit"], false);
        let (status, _) = send(&h.app, "POST", &format!("{base}/commit"), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_category_change_over_http_clears_selection() {
        let h = harness();
        let id = seeded_session(&h.app).await;
        let concepts = json!({
            "missingConcepts": [
                {"category": "Cloud", "skills": [{"name": "AWS", "recommendation": ""}]},
                {"category": "Data", "skills": [{"name": "Spark", "recommendation": ""}]}
            ]
        });
        send(
            &h.app,
            "PUT",
            &format!("/api/v1/sessions/{id}/recommendations"),
            Some(concepts),
        )
        .await;
        choose_aws_at_acme(&h.app, &id).await;

        let (_, view) = send(
            &h.app,
            "POST",
            &format!("/api/v1/sessions/{id}/skills/category"),
            Some(json!({"category": "Data"})),
        )
        .await;
        assert_eq!(view["selection"]["category"], "Data");
        assert_eq!(view["selection"]["skill"], Value::Null);
        assert_eq!(view["selection"]["job_index"], Value::Null);
        assert_eq!(view["can_proceed"], false);
    }

    #[tokio::test]
    async fn test_improvement_accept_and_export_merged_resume() {
        let h = harness();
        let id = seeded_session(&h.app).await;
        let session = format!("/api/v1/sessions/{id}");

        let (status, view) = send(
            &h.app,
            "POST",
            &format!("{session}/improvements/job-1-bullet-0/generate"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            view["suggestions"]["job-1-bullet-0"]["variations"][1],
            "Built APIs for 3 teams"
        );
        let (status, _) = send(
            &h.app,
            "PUT",
            &format!("{session}/improvements/job-1-bullet-0"),
            Some(json!({"text": "Built APIs for 3 teams"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, original) = send(
            &h.app,
            "GET",
            &format!("{session}/bullets/job-1-bullet-0/original"),
            None,
        )
        .await;
        assert_eq!(original["text"], "Built APIs");

        choose_aws_at_acme(&h.app, &id).await;
        send(&h.app, "POST", &format!("{session}/skills/proceed"), None).await;
        send(&h.app, "POST", &format!("{session}/skills/generate"), None).await;
        send(&h.app, "POST", &format!("{session}/skills/commit"), None).await;

        // export is only offered on the final review step
        let (status, _) = send(&h.app, "POST", &format!("{session}/export"), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        for _ in 0..4 {
            let (status, _) = send(&h.app, "POST", &format!("{session}/step/next"), None).await;
            assert_eq!(status, StatusCode::OK);
        }

        h.exporter.fail.store(true, Ordering::SeqCst);
        let (status, _) = send(&h.app, "POST", &format!("{session}/export"), None).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        let (_, snapshot) = send(&h.app, "GET", &session, None).await;
        assert_eq!(snapshot["step"], "final_review");
        assert_eq!(snapshot["export"]["exporting"], false);

        h.exporter.fail.store(false, Ordering::SeqCst);
        let (status, receipt) = send(&h.app, "POST", &format!("{session}/export"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(receipt["location"], format!("memory://{id}"));

        let exported = h.exporter.exported.lock().unwrap().clone();
        assert_eq!(exported.len(), 1);
        assert_eq!(
            exported[0].bullet_points[1].achievements,
            vec!["Built APIs for 3 teams", "Deployed AWS Lambda functions..."]
        );
        assert_eq!(exported[0].bullet_points[0].achievements, vec!["Filed reports"]);
    }

    #[tokio::test]
    async fn test_invalid_bullet_ids() {
        let h = harness();
        let id = seeded_session(&h.app).await;
        let (status, _) = send(
            &h.app,
            "GET",
            &format!("/api/v1/sessions/{id}/bullets/not-an-id/original"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = send(
            &h.app,
            "GET",
            &format!("/api/v1/sessions/{id}/bullets/job-7-bullet-0/original"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_generated_recommendations_reset_resolver() {
        let h = harness();
        let id = seeded_session(&h.app).await;
        let (status, view) = send(
            &h.app,
            "POST",
            &format!("/api/v1/sessions/{id}/recommendations/generate"),
            Some(json!({"target_role": "Platform"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["categories"][0]["category"], "Platform");
        assert_eq!(view["metrics"]["total"], 1);
        assert_eq!(view["stage"], "select");
    }

    #[tokio::test]
    async fn test_plain_text_upload_is_parsed() {
        let h = harness();
        let (_, body) = send(&h.app, "POST", "/api/v1/sessions", None).await;
        let id = body["id"].as_str().unwrap().to_string();

        let boundary = "wizardboundary";
        let multipart = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"resume.txt\"\r\n\
             Content-Type: text/plain\r\n\r\n\
             Acme - Engineer\n- Built APIs\n- Ran on-call\r\n\
             --{boundary}--\r\n"
        );
        let request = Request::builder()
            .method("POST")
            .uri(format!("/api/v1/sessions/{id}/resume/upload"))
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(multipart))
            .unwrap();
        let response = h.app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let (_, snapshot) = send(&h.app, "GET", &format!("/api/v1/sessions/{id}"), None).await;
        let job = &snapshot["resume"]["bullet_points"][0];
        assert_eq!(job["company"], "Acme");
        assert_eq!(job["position"], "Engineer");
        assert_eq!(job["achievements"].as_array().unwrap().len(), 2);
        assert_eq!(snapshot["parsing"], false);
    }

    #[tokio::test]
    async fn test_end_session() {
        let h = harness();
        let id = seeded_session(&h.app).await;
        let (status, _) = send(&h.app, "DELETE", &format!("/api/v1/sessions/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&h.app, "GET", &format!("/api/v1/sessions/{id}/skills"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
