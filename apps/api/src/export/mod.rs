//! Document export. The wizard hands the merged resume to a `ResumeExporter`;
//! the default backend renders Markdown and stores it in S3-compatible storage.

use std::fmt::Write;

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::resume::ResumeData;

/// Where an export landed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportReceipt {
    pub location: String,
    pub bytes: usize,
    pub exported_at: DateTime<Utc>,
}

#[async_trait]
pub trait ResumeExporter: Send + Sync {
    async fn export(
        &self,
        session_id: Uuid,
        resume: &ResumeData,
    ) -> Result<ExportReceipt, AppError>;
}

pub struct S3ResumeExporter {
    client: aws_sdk_s3::Client,
    bucket: String,
    prefix: String,
}

impl S3ResumeExporter {
    pub fn new(client: aws_sdk_s3::Client, bucket: String, prefix: String) -> Self {
        Self {
            client,
            bucket,
            prefix,
        }
    }
}

#[async_trait]
impl ResumeExporter for S3ResumeExporter {
    async fn export(
        &self,
        session_id: Uuid,
        resume: &ResumeData,
    ) -> Result<ExportReceipt, AppError> {
        let exported_at = Utc::now();
        let key = export_key(&self.prefix, session_id, exported_at);
        let body = render_markdown(resume);
        let bytes = body.len();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(body.into_bytes()))
            .content_type("text/markdown")
            .send()
            .await
            .map_err(|e| AppError::Export(format!("S3 upload failed: {e}")))?;

        let location = format!("s3://{}/{}", self.bucket, key);
        info!("Exported resume for session {session_id} to {location}");
        Ok(ExportReceipt {
            location,
            bytes,
            exported_at,
        })
    }
}

fn export_key(prefix: &str, session_id: Uuid, at: DateTime<Utc>) -> String {
    format!(
        "{}/{}/{}.md",
        prefix.trim_end_matches('/'),
        session_id,
        at.format("%Y%m%dT%H%M%SZ")
    )
}

/// Renders one `##` section per job with its bullets.
pub fn render_markdown(resume: &ResumeData) -> String {
    let mut out = String::from("# Experience\n");
    for job in resume.jobs() {
        let _ = write!(out, "\n## {} at {}", job.position, job.company);
        if let Some(period) = job.time_period.as_deref().filter(|p| !p.trim().is_empty()) {
            let _ = write!(out, " ({period})");
        }
        out.push('\n');
        if !job.achievements.is_empty() {
            out.push('\n');
        }
        for bullet in &job.achievements {
            let _ = writeln!(out, "- {}", bullet.trim());
        }
    }
    out
}
