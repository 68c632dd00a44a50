use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use super::domain::{FeedbackRecord, IdentityState, Submitter};
use super::form::{EvaluationForm, FormError, ValidationError};
use super::notify::{Notification, Notifier};
use super::repository::{FeedbackRepository, MirrorSink, StoreError};

/// Whether submitting requires an authenticated identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPolicy {
    Required,
    Optional,
}

impl AuthPolicy {
    pub const fn from_required(required: bool) -> Self {
        if required {
            Self::Required
        } else {
            Self::Optional
        }
    }
}

/// Ambient identity for one submission, passed in explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionContext {
    submitter: Submitter,
}

impl SubmissionContext {
    pub fn new(submitter: Submitter) -> Self {
        Self { submitter }
    }

    pub fn from_identity(
        identity: IdentityState,
        policy: AuthPolicy,
    ) -> Result<Self, SubmissionError> {
        match (identity, policy) {
            (IdentityState::Authenticated(submitter), _) => Ok(Self::new(submitter)),
            (IdentityState::Unauthenticated, AuthPolicy::Optional) => {
                Ok(Self::new(Submitter::anonymous()))
            }
            (IdentityState::Unauthenticated, AuthPolicy::Required) => {
                Err(SubmissionError::Unauthenticated)
            }
        }
    }

    pub fn submitter(&self) -> &Submitter {
        &self.submitter
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MirrorStatus {
    Mirrored,
    Skipped,
}

/// Result of a submission whose durable write succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionReceipt {
    pub submitter_id: String,
    pub mirror: MirrorStatus,
}

#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("a submission is already in progress")]
    InProgress,
    #[error("sign in before submitting feedback")]
    Unauthenticated,
    #[error("unable to save feedback: {0}")]
    Store(#[from] StoreError),
}

impl From<FormError> for SubmissionError {
    fn from(value: FormError) -> Self {
        match value {
            FormError::Invalid(err) => Self::Validation(err),
            FormError::SubmissionInProgress => Self::InProgress,
        }
    }
}

/// Durable write to the primary store, then a best-effort mirror append.
///
/// The stages are exposed separately so callers holding the form behind a lock
/// can release it while the network calls are outstanding.
#[derive(Clone)]
pub struct SubmissionPipeline {
    feedback: Arc<dyn FeedbackRepository>,
    mirror: Arc<dyn MirrorSink>,
    notifier: Arc<dyn Notifier>,
}

impl SubmissionPipeline {
    pub fn new(
        feedback: Arc<dyn FeedbackRepository>,
        mirror: Arc<dyn MirrorSink>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            feedback,
            mirror,
            notifier,
        }
    }

    /// Run every stage against a form owned by the caller.
    pub async fn submit(
        &self,
        form: &mut EvaluationForm,
        context: &SubmissionContext,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        let record = self.prepare(form, context)?;
        let persisted = self.persist(&record).await;
        self.conclude(form, persisted)?;
        Ok(self.mirror(&record).await)
    }

    /// Gate the form and build the record. Nothing touches the network here.
    pub fn prepare(
        &self,
        form: &mut EvaluationForm,
        context: &SubmissionContext,
    ) -> Result<FeedbackRecord, SubmissionError> {
        match form.begin_submission(context) {
            Ok(record) => Ok(record),
            Err(FormError::Invalid(err)) => {
                self.notifier.notify(err.notification());
                Err(SubmissionError::Validation(err))
            }
            Err(FormError::SubmissionInProgress) => Err(SubmissionError::InProgress),
        }
    }

    /// Authoritative write.
    pub async fn persist(&self, record: &FeedbackRecord) -> Result<(), StoreError> {
        self.feedback.insert(record).await.inspect_err(|err| {
            warn!(
                error = %err,
                registration_id = %record.staff().registration_id.0,
                "durable feedback write failed"
            );
        })
    }

    /// Apply the durable outcome to the form: notify, and reset only on success.
    pub fn conclude(
        &self,
        form: &mut EvaluationForm,
        persisted: Result<(), StoreError>,
    ) -> Result<(), SubmissionError> {
        match persisted {
            Ok(()) => {
                form.finish_submission(true);
                self.notifier.notify(Notification::info(
                    "Feedback recorded",
                    "The evaluation was saved.",
                ));
                Ok(())
            }
            Err(err) => {
                form.finish_submission(false);
                self.notifier.notify(Notification::error(
                    "Unable to submit feedback",
                    err.to_string(),
                ));
                Err(SubmissionError::Store(err))
            }
        }
    }

    /// Copy to the reporting mirror. Failures are logged and never surfaced.
    pub async fn mirror(&self, record: &FeedbackRecord) -> SubmissionReceipt {
        let mirror = match self.mirror.append(record).await {
            Ok(()) => MirrorStatus::Mirrored,
            Err(err) => {
                warn!(error = %err, "feedback mirror append failed; primary write kept");
                MirrorStatus::Skipped
            }
        };

        info!(
            submitter = %record.submitter().id,
            registration_id = %record.staff().registration_id.0,
            unit = %record.unit(),
            ?mirror,
            "feedback submitted"
        );

        SubmissionReceipt {
            submitter_id: record.submitter().id.clone(),
            mirror,
        }
    }
}
