use std::sync::Arc;

use super::common::*;
use crate::integrations::MemoryStore;
use crate::workflows::feedback::domain::{Criterion, IdentityState, Submitter};
use crate::workflows::feedback::form::{EvaluationForm, ValidationError};
use crate::workflows::feedback::notify::Severity;
use crate::workflows::feedback::pipeline::{
    AuthPolicy, MirrorStatus, SubmissionContext, SubmissionError,
};

fn supervisor() -> SubmissionContext {
    SubmissionContext::new(Submitter {
        id: "sup-42".to_string(),
        display_name: "Supervisor 42".to_string(),
    })
}

fn complete_form() -> EvaluationForm {
    let mut form = form_with_selection();
    rate_all(&mut form, 3);
    form.set_remarks("Great rapport with students.");
    form
}

#[tokio::test]
async fn end_to_end_writes_then_mirrors_then_resets() {
    let store = MemoryStore::default();
    let mirror = RecordingMirror::default();
    let (pipeline, notifier) = pipeline(Arc::new(store.clone()), Arc::new(mirror.clone()));
    let mut form = complete_form();

    let receipt = pipeline
        .submit(&mut form, &supervisor())
        .await
        .expect("submission succeeds");

    assert_eq!(receipt.submitter_id, "sup-42");
    assert_eq!(receipt.mirror, MirrorStatus::Mirrored);

    let saved = store.feedback();
    assert_eq!(saved.len(), 1);
    let row = serde_json::to_value(saved[0].row()).expect("row serializes");
    assert_eq!(row["user_id"], "sup-42");
    assert_eq!(row["unidade"], "North Campus");
    assert_eq!(row["nome_professor"], "J. Doe");
    assert_eq!(row["cadastro"], "1234");
    assert_eq!(row["horas_mes"], "120");
    assert_eq!(row["consideracoes"], "Great rapport with students.");
    for criterion in Criterion::ordered() {
        assert_eq!(row[criterion.key()], 3, "{} stored", criterion.key());
    }

    let mirrored = mirror.rows();
    assert_eq!(mirrored.len(), 1);
    assert_eq!(mirrored[0]["user_name"], "Supervisor 42");
    assert_eq!(mirrored[0]["cadastro"], "1234");

    let notes = notifier.drain();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].severity, Severity::Info);
    assert!(form.is_pristine());
}

#[tokio::test]
async fn incomplete_form_never_reaches_the_store() {
    let feedback = FailingRepository::default();
    let mirror = FailingMirror::default();
    let (pipeline, notifier) = pipeline(Arc::new(feedback.clone()), Arc::new(mirror.clone()));
    let mut form = form_with_selection();
    form.set_answer(
        Criterion::ProfessionalConduct,
        crate::workflows::feedback::domain::Answer::Rated(rating(5)),
    );

    let err = pipeline
        .submit(&mut form, &supervisor())
        .await
        .expect_err("incomplete form rejected");

    assert!(matches!(
        err,
        SubmissionError::Validation(ValidationError::Unanswered(ref missing)) if missing.len() == 7
    ));
    assert_eq!(feedback.attempts(), 0);
    assert_eq!(mirror.attempts(), 0);

    let notes = notifier.drain();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].severity, Severity::Error);
    assert_eq!(notes[0].title, "Required ratings missing");
    assert!(form.selected_staff().is_some());
    assert!(!form.is_submitting());
}

#[tokio::test]
async fn missing_staff_is_reported_first() {
    let (pipeline, notifier) = pipeline(
        Arc::new(FailingRepository::default()),
        Arc::new(FailingMirror::default()),
    );
    let mut form = EvaluationForm::new();

    let err = pipeline
        .submit(&mut form, &supervisor())
        .await
        .expect_err("no staff selected");

    assert!(matches!(
        err,
        SubmissionError::Validation(ValidationError::MissingStaff)
    ));
    assert_eq!(notifier.drain()[0].title, "Select a staff member");
}

#[tokio::test]
async fn durable_failure_keeps_form_and_skips_mirror() {
    let feedback = FailingRepository::default();
    let mirror = RecordingMirror::default();
    let (pipeline, notifier) = pipeline(Arc::new(feedback.clone()), Arc::new(mirror.clone()));
    let mut form = complete_form();
    let before = form.view();

    let err = pipeline
        .submit(&mut form, &supervisor())
        .await
        .expect_err("store offline");

    assert!(matches!(err, SubmissionError::Store(_)));
    assert_eq!(feedback.attempts(), 1);
    assert!(mirror.rows().is_empty(), "mirror must not run");
    assert_eq!(form.view(), before, "inputs preserved for retry");

    let notes = notifier.drain();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].severity, Severity::Error);
    assert_eq!(notes[0].title, "Unable to submit feedback");
}

#[tokio::test]
async fn mirror_failure_is_invisible_to_the_user() {
    let store = MemoryStore::default();
    let mirror = FailingMirror::default();
    let (pipeline, notifier) = pipeline(Arc::new(store.clone()), Arc::new(mirror.clone()));
    let mut form = complete_form();

    let receipt = pipeline
        .submit(&mut form, &supervisor())
        .await
        .expect("durable write succeeded");

    assert_eq!(receipt.mirror, MirrorStatus::Skipped);
    assert_eq!(mirror.attempts(), 1);
    assert_eq!(store.feedback().len(), 1);
    assert!(form.is_pristine());

    let notes = notifier.drain();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].severity, Severity::Info);
}

#[tokio::test]
async fn success_is_notified_before_the_mirror_runs() {
    let store = MemoryStore::default();
    let (pipeline, notifier) = pipeline(Arc::new(store), Arc::new(FailingMirror::default()));
    let mut form = complete_form();

    let record = pipeline
        .prepare(&mut form, &supervisor())
        .expect("form complete");
    let persisted = pipeline.persist(&record).await;
    pipeline
        .conclude(&mut form, persisted)
        .expect("durable write succeeded");

    assert!(form.is_pristine());
    assert_eq!(notifier.drain()[0].severity, Severity::Info);

    pipeline.mirror(&record).await;
    assert!(notifier.drain().is_empty(), "mirror adds no notification");
}

#[tokio::test]
async fn second_submission_while_in_flight_is_rejected() {
    let (pipeline, _notifier) = pipeline(
        Arc::new(MemoryStore::default()),
        Arc::new(RecordingMirror::default()),
    );
    let mut form = complete_form();

    pipeline
        .prepare(&mut form, &supervisor())
        .expect("first attempt starts");
    let err = pipeline
        .prepare(&mut form, &supervisor())
        .expect_err("second attempt blocked");

    assert!(matches!(err, SubmissionError::InProgress));
}

#[test]
fn identity_policy_decides_anonymous_submission() {
    let anonymous =
        SubmissionContext::from_identity(IdentityState::Unauthenticated, AuthPolicy::Optional)
            .expect("anonymous allowed");
    assert_eq!(anonymous.submitter().id, Submitter::ANONYMOUS_ID);

    let rejected =
        SubmissionContext::from_identity(IdentityState::Unauthenticated, AuthPolicy::Required);
    assert!(matches!(rejected, Err(SubmissionError::Unauthenticated)));

    let signed_in = SubmissionContext::from_identity(
        IdentityState::Authenticated(Submitter {
            id: "sup-7".to_string(),
            display_name: "Supervisor 7".to_string(),
        }),
        AuthPolicy::Required,
    )
    .expect("authenticated");
    assert_eq!(signed_in.submitter().id, "sup-7");
}
