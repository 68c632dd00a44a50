use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tracing::{debug, info, warn};

use super::catalog::UnitCatalog;
use super::domain::{Answer, Criterion, IdentityState, UnitName};
use super::form::{EvaluationForm, FormView};
use super::notify::{BufferedNotifier, Notification, Notifier};
use super::pipeline::{
    AuthPolicy, SubmissionContext, SubmissionError, SubmissionPipeline, SubmissionReceipt,
};
use super::repository::{FeedbackRepository, IdentityProvider, MirrorSink, StaffDirectory};
use super::resolver::StaffResolver;

/// Collaborators shared by every session.
#[derive(Clone)]
pub struct FeedbackServices {
    pub directory: Arc<dyn StaffDirectory>,
    pub feedback: Arc<dyn FeedbackRepository>,
    pub mirror: Arc<dyn MirrorSink>,
    pub auth: AuthPolicy,
}

/// Identifier wrapper for open sessions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("unit name must not be blank")]
    BlankUnit,
}

/// One supervisor's form. Network calls never run while the form lock is held,
/// so other actions stay responsive during a fetch or write.
pub struct FeedbackSession {
    id: SessionId,
    owner: Option<String>,
    catalog: UnitCatalog,
    resolver: StaffResolver,
    pipeline: SubmissionPipeline,
    notifications: Arc<BufferedNotifier>,
    auth: AuthPolicy,
    form: Mutex<EvaluationForm>,
}

impl FeedbackSession {
    /// Open a session and load the unit catalog. A session opened by an
    /// authenticated submitter only admits that submitter afterwards.
    pub async fn open(id: SessionId, opener: &IdentityState, services: &FeedbackServices) -> Self {
        let notifications = Arc::new(BufferedNotifier::default());
        let catalog = UnitCatalog::load(services.directory.as_ref(), notifications.as_ref()).await;
        let notifier: Arc<dyn Notifier> = notifications.clone();

        let owner = match opener {
            IdentityState::Authenticated(submitter) => Some(submitter.id.clone()),
            IdentityState::Unauthenticated => None,
        };

        info!(
            session = %id.0,
            owner = owner.as_deref().unwrap_or("anonymous"),
            units = catalog.len(),
            "feedback session opened"
        );

        Self {
            id,
            owner,
            catalog,
            resolver: StaffResolver::new(services.directory.clone()),
            pipeline: SubmissionPipeline::new(
                services.feedback.clone(),
                services.mirror.clone(),
                notifier,
            ),
            notifications,
            auth: services.auth,
            form: Mutex::new(EvaluationForm::new()),
        }
    }

    /// Whether `identity` may act on this session.
    pub fn admits(&self, identity: &IdentityState) -> bool {
        match (&self.owner, identity) {
            (None, _) => true,
            (Some(owner), IdentityState::Authenticated(submitter)) => *owner == submitter.id,
            (Some(_), IdentityState::Unauthenticated) => false,
        }
    }

    pub fn catalog(&self) -> &UnitCatalog {
        &self.catalog
    }

    /// Change unit and load its roster. A roster fetch overtaken by a newer
    /// selection is dropped when it arrives.
    pub async fn select_unit(&self, raw: &str) -> Result<FormView, SessionError> {
        let unit = UnitName::parse(raw).ok_or(SessionError::BlankUnit)?;
        let request = self.form().select_unit(unit);

        let fetched = self.resolver.resolve(request.unit()).await;

        let (roster, failure) = match fetched {
            Ok(roster) => (Some(roster), None),
            Err(err) => (None, Some(err)),
        };

        let mut form = self.form();
        let current = form.apply_roster(&request, roster);
        match failure {
            Some(err) if current => {
                warn!(unit = %request.unit(), error = %err, "roster lookup failed");
                self.notifications.notify(Notification::error(
                    "Unable to load staff",
                    format!("Could not load the staff for {}: {err}", request.unit()),
                ));
            }
            Some(err) => {
                debug!(unit = %request.unit(), error = %err, "superseded roster lookup failed");
            }
            None => {}
        }
        Ok(form.view())
    }

    pub fn select_staff(&self, registration_id: &str) -> FormView {
        let mut form = self.form();
        form.select_staff(registration_id);
        form.view()
    }

    pub fn set_answer(&self, criterion: Criterion, answer: Answer) -> FormView {
        let mut form = self.form();
        form.set_answer(criterion, answer);
        form.view()
    }

    pub fn set_remarks(&self, remarks: &str) -> FormView {
        let mut form = self.form();
        form.set_remarks(remarks);
        form.view()
    }

    /// Validate, write, mirror, reset.
    pub async fn submit(
        &self,
        identity: &dyn IdentityProvider,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        let context = match SubmissionContext::from_identity(identity.identity(), self.auth) {
            Ok(context) => context,
            Err(err) => {
                self.notifications
                    .notify(Notification::error("Sign in required", err.to_string()));
                return Err(err);
            }
        };

        let record = self.pipeline.prepare(&mut self.form(), &context)?;
        let persisted = self.pipeline.persist(&record).await;
        self.pipeline.conclude(&mut self.form(), persisted)?;
        Ok(self.pipeline.mirror(&record).await)
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            session_id: self.id.clone(),
            units: self.catalog.clone(),
            form: self.form().view(),
        }
    }

    pub fn drain_notifications(&self) -> Vec<Notification> {
        self.notifications.drain()
    }

    fn form(&self) -> MutexGuard<'_, EvaluationForm> {
        self.form.lock().expect("form mutex poisoned")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: SessionId,
    pub units: UnitCatalog,
    pub form: FormView,
}
