//! End-to-end evaluation flow through the public session facade, using the
//! in-memory store and a mirror that can be told to fail.

mod common {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::json;
    use staff_feedback::integrations::MemoryStore;
    use staff_feedback::workflows::feedback::{
        AuthPolicy, FeedbackRecord, FeedbackServices, MirrorError, MirrorSink, StaffRow,
    };

    pub(super) fn staff(registration_id: i64, name: &str, unit: &str) -> StaffRow {
        serde_json::from_value(json!({
            "Cadastro": registration_id,
            "Nome": name,
            "Cargo": "Teacher",
            "ESCOLA": unit,
            "Horas_Mes": 120,
            "horas_faltas_injustificadas": null
        }))
        .expect("staff row decodes")
    }

    #[derive(Default)]
    pub(super) struct SwitchableMirror {
        pub(super) failing: AtomicBool,
        pub(super) appended: AtomicUsize,
    }

    #[async_trait]
    impl MirrorSink for SwitchableMirror {
        async fn append(&self, _record: &FeedbackRecord) -> Result<(), MirrorError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(MirrorError::Unavailable("sheet locked".to_string()));
            }
            self.appended.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    pub(super) fn services(store: &MemoryStore, mirror: Arc<SwitchableMirror>) -> FeedbackServices {
        FeedbackServices {
            directory: Arc::new(store.clone()),
            feedback: Arc::new(store.clone()),
            mirror,
            auth: AuthPolicy::Optional,
        }
    }
}

use std::sync::atomic::Ordering;
use std::sync::Arc;

use common::*;
use staff_feedback::integrations::MemoryStore;
use staff_feedback::workflows::feedback::{
    Answer, Criterion, FeedbackSession, IdentityState, MirrorStatus, Rating, SessionId, Severity,
    Submitter,
};

fn rate_everything(session: &FeedbackSession, value: u8) {
    let rating = Rating::new(value).expect("valid rating");
    for criterion in Criterion::ordered() {
        session.set_answer(criterion, Answer::Rated(rating));
    }
}

#[tokio::test]
async fn supervisor_evaluates_two_teachers_in_a_row() {
    let store = MemoryStore::with_staff(vec![
        staff(1234, "J. Doe", "North Campus"),
        staff(1001, "A. Silva", "North Campus"),
        staff(2002, "M. Costa", "South  Campus"),
    ]);
    let mirror = Arc::new(SwitchableMirror::default());
    let identity = IdentityState::Authenticated(Submitter {
        id: "sup-42".to_string(),
        display_name: "Supervisor 42".to_string(),
    });
    let session = FeedbackSession::open(
        SessionId("session-e2e".to_string()),
        &identity,
        &services(&store, mirror.clone()),
    )
    .await;

    let units: Vec<&str> = session.catalog().units().iter().map(|u| u.as_str()).collect();
    assert_eq!(units, vec!["North Campus", "South Campus"]);

    let view = session.select_unit("North Campus").await.expect("unit");
    let names: Vec<&str> = view.roster.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["A. Silva", "J. Doe"]);

    session.select_staff("1234");
    rate_everything(&session, 3);
    session.set_remarks("Strong classroom presence.");
    let receipt = session.submit(&identity).await.expect("first submission");
    assert_eq!(receipt.mirror, MirrorStatus::Mirrored);

    mirror.failing.store(true, Ordering::SeqCst);
    let view = session.select_unit("South Campus").await.expect("unit");
    assert_eq!(view.roster.len(), 1, "whitespace drift resolved by fallback");
    session.select_staff("2002");
    rate_everything(&session, 5);
    let receipt = session.submit(&identity).await.expect("second submission");
    assert_eq!(receipt.mirror, MirrorStatus::Skipped);

    let saved = store.feedback();
    assert_eq!(saved.len(), 2);
    assert_eq!(saved[0].staff().name, "J. Doe");
    assert_eq!(saved[0].remarks(), "Strong classroom presence.");
    assert_eq!(saved[1].staff().name, "M. Costa");
    assert_eq!(saved[1].remarks(), "");
    assert_eq!(mirror.appended.load(Ordering::SeqCst), 1);

    let notes = session.drain_notifications();
    assert_eq!(notes.len(), 2);
    assert!(notes.iter().all(|note| note.severity == Severity::Info));
    assert!(session.view().form.unit.is_none());
}

#[tokio::test]
async fn anonymous_submission_is_attributed_to_placeholder() {
    let store = MemoryStore::with_staff(vec![staff(1234, "J. Doe", "North Campus")]);
    let session = FeedbackSession::open(
        SessionId("session-anon".to_string()),
        &IdentityState::Unauthenticated,
        &services(&store, Arc::new(SwitchableMirror::default())),
    )
    .await;

    session.select_unit("North Campus").await.expect("unit");
    session.select_staff("1234");
    rate_everything(&session, 2);

    let receipt = session
        .submit(&IdentityState::Unauthenticated)
        .await
        .expect("anonymous allowed");

    assert_eq!(receipt.submitter_id, Submitter::ANONYMOUS_ID);
    assert_eq!(store.feedback()[0].submitter().id, "anonymous");
}
