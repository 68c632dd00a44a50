//! Staff evaluation intake: unit catalog, roster resolution, form state, and
//! the submission pipeline that writes to the primary store before mirroring.

pub mod catalog;
pub mod domain;
pub mod form;
pub mod notify;
pub mod pipeline;
pub mod repository;
pub mod resolver;
pub mod router;
pub mod session;
pub mod text;

#[cfg(test)]
mod tests;

pub use catalog::UnitCatalog;
pub use domain::{
    Answer, AnswerSheet, CompleteRatings, Criterion, FeedbackRecord, IdentityState,
    RegistrationId, Rating, StaffRecord, StaffRow, Submitter, UnitName,
};
pub use form::{EvaluationForm, FormError, FormView, RosterRequest, ValidationError};
pub use notify::{BufferedNotifier, Notification, Notifier, Severity, TracingNotifier};
pub use pipeline::{
    AuthPolicy, MirrorStatus, SubmissionContext, SubmissionError, SubmissionPipeline,
    SubmissionReceipt,
};
pub use repository::{
    FeedbackRepository, IdentityProvider, MirrorError, MirrorSink, StaffDirectory, StaffFilter,
    StoreError,
};
pub use resolver::{ResolutionPath, Roster, StaffResolver};
pub use router::{feedback_router, FeedbackState};
pub use session::{FeedbackServices, FeedbackSession, SessionError, SessionId, SessionView};
