use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use serde_json::{json, Value};
use tokio::sync::Notify;

use crate::integrations::MemoryStore;
use crate::workflows::feedback::domain::{
    Answer, Criterion, FeedbackRecord, Rating, StaffRecord, StaffRow, UnitName,
};
use crate::workflows::feedback::form::EvaluationForm;
use crate::workflows::feedback::notify::BufferedNotifier;
use crate::workflows::feedback::pipeline::{AuthPolicy, SubmissionPipeline};
use crate::workflows::feedback::resolver::{ResolutionPath, Roster};
use crate::workflows::feedback::repository::{
    FeedbackRepository, MirrorError, MirrorSink, StaffDirectory, StaffFilter, StoreError,
};
use crate::workflows::feedback::session::FeedbackServices;

pub(super) fn staff_row(registration_id: i64, name: &str, unit: &str) -> StaffRow {
    serde_json::from_value(json!({
        "REGIONAL": "Regional Norte",
        "Cadastro": registration_id,
        "Nome": name,
        "Admissão": "2023-02-01",
        "CPF": "000.000.000-00",
        "Cargo": "Teacher",
        "Local": "Main Building",
        "ESCOLA": unit,
        "Horas_Mes": 120,
        "Horas_Semana": "30",
        "tempo_casa_mes": 20,
        "total_carga_horaria": 2400,
        "horas_faltas_injustificadas": null,
        "porcentagem_horas_faltas_injustificadas": null,
        "horas_faltas_justificadas": 4,
        "porcentagem_horas_faltas_justificadas": "0.17%"
    }))
    .expect("staff row decodes")
}

pub(super) fn campus_rows() -> Vec<StaffRow> {
    vec![
        staff_row(1234, "J. Doe", "North Campus"),
        staff_row(1001, "A. Silva", "North Campus"),
        staff_row(2002, "M. Costa", "South Campus"),
        staff_row(3003, "R. Lima", "  south   CAMPUS annex "),
        staff_row(4004, "P. Souza", "100% SCHOOL "),
        staff_row(5005, "T. Alves", "100 Main School"),
    ]
}

pub(super) fn unit(raw: &str) -> UnitName {
    UnitName::parse(raw).expect("non-blank unit")
}

pub(super) fn rating(value: u8) -> Rating {
    Rating::new(value).expect("rating in range")
}

pub(super) fn rate_all(form: &mut EvaluationForm, value: u8) {
    for criterion in Criterion::ordered() {
        form.set_answer(criterion, Answer::Rated(rating(value)));
    }
}

pub(super) fn staff_record(registration_id: i64, name: &str, unit: &str) -> StaffRecord {
    StaffRecord::from_row(&staff_row(registration_id, name, unit))
}

pub(super) fn exact_roster(unit_name: &str, staff: Vec<StaffRecord>) -> Roster {
    Roster {
        unit: unit(unit_name),
        path: ResolutionPath::Exact,
        staff,
    }
}

/// Form with a unit, a loaded roster, and J. Doe selected.
pub(super) fn form_with_selection() -> EvaluationForm {
    let mut form = EvaluationForm::new();
    let request = form.select_unit(unit("North Campus"));
    assert!(form.apply_roster(
        &request,
        Some(exact_roster(
            "North Campus",
            vec![
                staff_record(1001, "A. Silva", "North Campus"),
                staff_record(1234, "J. Doe", "North Campus"),
            ],
        )),
    ));
    form.select_staff("1234").expect("J. Doe on roster");
    form
}

/// Directory wrapper recording every filter it receives.
#[derive(Default, Clone)]
pub(super) struct RecordingDirectory {
    pub(super) store: MemoryStore,
    filters: Arc<Mutex<Vec<StaffFilter>>>,
}

impl RecordingDirectory {
    pub(super) fn new(rows: Vec<StaffRow>) -> Self {
        Self {
            store: MemoryStore::with_staff(rows),
            filters: Arc::default(),
        }
    }

    pub(super) fn filters(&self) -> Vec<StaffFilter> {
        self.filters.lock().expect("filter mutex poisoned").clone()
    }
}

#[async_trait]
impl StaffDirectory for RecordingDirectory {
    async fn unit_values(&self) -> Result<Vec<String>, StoreError> {
        self.store.unit_values().await
    }

    async fn find_staff(&self, filter: &StaffFilter) -> Result<Vec<StaffRow>, StoreError> {
        self.filters
            .lock()
            .expect("filter mutex poisoned")
            .push(filter.clone());
        self.store.find_staff(filter).await
    }
}

pub(super) struct UnavailableDirectory;

#[async_trait]
impl StaffDirectory for UnavailableDirectory {
    async fn unit_values(&self) -> Result<Vec<String>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    async fn find_staff(&self, _filter: &StaffFilter) -> Result<Vec<StaffRow>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }
}

/// Holds exact lookups for one unit until `release` is called, then answers
/// them from the store or with an error.
pub(super) struct GatedDirectory {
    store: MemoryStore,
    gated_unit: String,
    gate: Notify,
    fail_after_release: bool,
}

impl GatedDirectory {
    pub(super) fn new(rows: Vec<StaffRow>, gated_unit: &str) -> Self {
        Self {
            store: MemoryStore::with_staff(rows),
            gated_unit: gated_unit.to_string(),
            gate: Notify::new(),
            fail_after_release: false,
        }
    }

    pub(super) fn failing(rows: Vec<StaffRow>, gated_unit: &str) -> Self {
        Self {
            fail_after_release: true,
            ..Self::new(rows, gated_unit)
        }
    }

    pub(super) fn release(&self) {
        self.gate.notify_one();
    }
}

#[async_trait]
impl StaffDirectory for GatedDirectory {
    async fn unit_values(&self) -> Result<Vec<String>, StoreError> {
        self.store.unit_values().await
    }

    async fn find_staff(&self, filter: &StaffFilter) -> Result<Vec<StaffRow>, StoreError> {
        if *filter == StaffFilter::UnitEquals(self.gated_unit.clone()) {
            self.gate.notified().await;
            if self.fail_after_release {
                return Err(StoreError::Unavailable("connection reset".to_string()));
            }
        }
        self.store.find_staff(filter).await
    }
}

#[derive(Default, Clone)]
pub(super) struct FailingRepository {
    attempts: Arc<AtomicUsize>,
}

impl FailingRepository {
    pub(super) fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedbackRepository for FailingRepository {
    async fn insert(&self, _record: &FeedbackRecord) -> Result<(), StoreError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Unavailable("database offline".to_string()))
    }
}

#[derive(Default, Clone)]
pub(super) struct RecordingMirror {
    rows: Arc<Mutex<Vec<Value>>>,
}

impl RecordingMirror {
    pub(super) fn rows(&self) -> Vec<Value> {
        self.rows.lock().expect("mirror mutex poisoned").clone()
    }
}

#[async_trait]
impl MirrorSink for RecordingMirror {
    async fn append(&self, record: &FeedbackRecord) -> Result<(), MirrorError> {
        let row = serde_json::to_value(record.mirror_row()).expect("mirror row serializes");
        self.rows.lock().expect("mirror mutex poisoned").push(row);
        Ok(())
    }
}

#[derive(Default, Clone)]
pub(super) struct FailingMirror {
    attempts: Arc<AtomicUsize>,
}

impl FailingMirror {
    pub(super) fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MirrorSink for FailingMirror {
    async fn append(&self, _record: &FeedbackRecord) -> Result<(), MirrorError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(MirrorError::Unavailable("spreadsheet quota exceeded".to_string()))
    }
}

pub(super) fn pipeline(
    feedback: Arc<dyn FeedbackRepository>,
    mirror: Arc<dyn MirrorSink>,
) -> (SubmissionPipeline, Arc<BufferedNotifier>) {
    let notifier = Arc::new(BufferedNotifier::default());
    let pipeline = SubmissionPipeline::new(feedback, mirror, notifier.clone());
    (pipeline, notifier)
}

pub(super) fn services(
    directory: Arc<dyn StaffDirectory>,
    feedback: Arc<dyn FeedbackRepository>,
    mirror: Arc<dyn MirrorSink>,
    auth: AuthPolicy,
) -> FeedbackServices {
    FeedbackServices {
        directory,
        feedback,
        mirror,
        auth,
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
