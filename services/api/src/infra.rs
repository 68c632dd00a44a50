use metrics_exporter_prometheus::PrometheusHandle;
use staff_feedback::config::AppConfig;
use staff_feedback::error::AppError;
use staff_feedback::integrations::{MemoryStore, NoopMirror, PostgrestStore, SheetsWebhookSink};
use staff_feedback::workflows::feedback::{
    AuthPolicy, FeedbackRepository, FeedbackServices, MirrorSink, StaffDirectory,
};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::warn;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Store and mirror adapters selected from configuration.
pub(crate) struct FeedbackAdapters {
    pub(crate) directory: Arc<dyn StaffDirectory>,
    pub(crate) feedback: Arc<dyn FeedbackRepository>,
    pub(crate) mirror: Arc<dyn MirrorSink>,
}

impl FeedbackAdapters {
    pub(crate) fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let timeout = config.http.timeout();

        let (directory, feedback): (Arc<dyn StaffDirectory>, Arc<dyn FeedbackRepository>) =
            match config.store.url.as_deref() {
                Some(url) => {
                    let store = Arc::new(PostgrestStore::new(url, &config.store, timeout)?);
                    let directory: Arc<dyn StaffDirectory> = store.clone();
                    let feedback: Arc<dyn FeedbackRepository> = store;
                    (directory, feedback)
                }
                None => {
                    warn!("STORE_URL not set; staff and feedback are kept in memory");
                    let store = Arc::new(MemoryStore::default());
                    let directory: Arc<dyn StaffDirectory> = store.clone();
                    let feedback: Arc<dyn FeedbackRepository> = store;
                    (directory, feedback)
                }
            };

        let mirror: Arc<dyn MirrorSink> = match config.mirror.webhook_url.as_deref() {
            Some(url) => Arc::new(SheetsWebhookSink::new(url, timeout)?),
            None => Arc::new(NoopMirror),
        };

        Ok(Self {
            directory,
            feedback,
            mirror,
        })
    }

    pub(crate) fn into_services(self, config: &AppConfig) -> FeedbackServices {
        FeedbackServices {
            directory: self.directory,
            feedback: self.feedback,
            mirror: self.mirror,
            auth: AuthPolicy::from_required(config.auth.required),
        }
    }
}
