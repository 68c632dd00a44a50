use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::workflows::feedback::domain::{display_value, FeedbackRecord, StaffRow};
use crate::workflows::feedback::repository::{
    FeedbackRepository, StaffDirectory, StaffFilter, StoreError,
};
use crate::workflows::feedback::text::ilike;

/// In-process primary store with the same filter semantics as the REST store.
#[derive(Default, Clone)]
pub struct MemoryStore {
    staff: Arc<Mutex<Vec<StaffRow>>>,
    feedback: Arc<Mutex<Vec<FeedbackRecord>>>,
}

impl MemoryStore {
    pub fn with_staff(rows: Vec<StaffRow>) -> Self {
        Self {
            staff: Arc::new(Mutex::new(rows)),
            feedback: Arc::default(),
        }
    }

    pub fn feedback(&self) -> Vec<FeedbackRecord> {
        self.feedback.lock().expect("feedback mutex poisoned").clone()
    }
}

fn unit_of(row: &StaffRow) -> String {
    display_value(row.school.as_ref())
}

fn name_of(row: &StaffRow) -> String {
    display_value(row.name.as_ref())
}

#[async_trait]
impl StaffDirectory for MemoryStore {
    async fn unit_values(&self) -> Result<Vec<String>, StoreError> {
        let guard = self.staff.lock().expect("staff mutex poisoned");
        let mut units: Vec<String> = guard
            .iter()
            .filter(|row| !matches!(row.school, None | Some(serde_json::Value::Null)))
            .map(unit_of)
            .collect();
        units.sort();
        Ok(units)
    }

    async fn find_staff(&self, filter: &StaffFilter) -> Result<Vec<StaffRow>, StoreError> {
        let guard = self.staff.lock().expect("staff mutex poisoned");
        let mut rows: Vec<StaffRow> = guard
            .iter()
            .filter(|row| {
                let unit = unit_of(row);
                match filter {
                    StaffFilter::UnitEquals(value) => unit == *value,
                    StaffFilter::UnitLike(pattern) => ilike(pattern, &unit),
                }
            })
            .cloned()
            .collect();
        rows.sort_by_key(name_of);
        Ok(rows)
    }
}

#[async_trait]
impl FeedbackRepository for MemoryStore {
    async fn insert(&self, record: &FeedbackRecord) -> Result<(), StoreError> {
        self.feedback
            .lock()
            .expect("feedback mutex poisoned")
            .push(record.clone());
        Ok(())
    }
}
