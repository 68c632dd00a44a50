use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::workflows::feedback::domain::FeedbackRecord;
use crate::workflows::feedback::repository::{MirrorError, MirrorSink};

/// Appends feedback rows to the reporting spreadsheet through its webhook.
#[derive(Debug, Clone)]
pub struct SheetsWebhookSink {
    http: reqwest::Client,
    url: String,
}

impl SheetsWebhookSink {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, MirrorError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }
}

#[async_trait]
impl MirrorSink for SheetsWebhookSink {
    async fn append(&self, record: &FeedbackRecord) -> Result<(), MirrorError> {
        let resp = self
            .http
            .post(&self.url)
            .json(&record.mirror_row())
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(MirrorError::Rejected { status, body });
        }

        Ok(())
    }
}

/// Mirror used when no spreadsheet webhook is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMirror;

#[async_trait]
impl MirrorSink for NoopMirror {
    async fn append(&self, record: &FeedbackRecord) -> Result<(), MirrorError> {
        debug!(
            registration_id = %record.staff().registration_id.0,
            "mirror disabled; row not appended"
        );
        Ok(())
    }
}
