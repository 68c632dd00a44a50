use serde::Serialize;
use tracing::debug;

use super::domain::{
    Answer, AnswerSheet, CompleteRatings, Criterion, FeedbackRecord, StaffRecord, UnitName,
};
use super::notify::Notification;
use super::pipeline::SubmissionContext;
use super::resolver::{ResolutionPath, Roster};

/// Ticket for an outstanding roster fetch. A result is applied only while the
/// form is still on the generation the ticket was issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterRequest {
    generation: u64,
    unit: UnitName,
}

impl RosterRequest {
    pub fn unit(&self) -> &UnitName {
        &self.unit
    }
}

/// In-memory state of one evaluation form.
#[derive(Debug, Clone, Default)]
pub struct EvaluationForm {
    unit: Option<UnitName>,
    roster: Vec<StaffRecord>,
    roster_path: Option<ResolutionPath>,
    roster_loading: bool,
    selected: Option<StaffRecord>,
    answers: AnswerSheet,
    remarks: String,
    generation: u64,
    submitting: bool,
}

impl EvaluationForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch units: clears staff and roster and issues a fetch ticket.
    pub fn select_unit(&mut self, unit: UnitName) -> RosterRequest {
        self.generation += 1;
        self.unit = Some(unit.clone());
        self.roster.clear();
        self.roster_path = None;
        self.selected = None;
        self.roster_loading = true;

        RosterRequest {
            generation: self.generation,
            unit,
        }
    }

    /// Replace the roster wholesale; `None` records a failed lookup as an
    /// empty roster. Returns `false` when the ticket is stale and the result
    /// was dropped.
    pub fn apply_roster(&mut self, request: &RosterRequest, roster: Option<Roster>) -> bool {
        if request.generation != self.generation {
            debug!(
                unit = %request.unit,
                issued = request.generation,
                current = self.generation,
                "discarding stale roster"
            );
            return false;
        }

        match roster {
            Some(roster) => {
                self.roster = roster.staff;
                self.roster_path = Some(roster.path);
            }
            None => {
                self.roster.clear();
                self.roster_path = None;
            }
        }
        self.roster_loading = false;
        true
    }

    /// Select a staff member from the current roster. Unknown ids clear the
    /// selection. Ratings are left untouched either way.
    pub fn select_staff(&mut self, registration_id: &str) -> Option<&StaffRecord> {
        let wanted = registration_id.trim();
        self.selected = self
            .roster
            .iter()
            .find(|record| record.registration_id.0 == wanted)
            .cloned();
        self.selected.as_ref()
    }

    pub fn set_answer(&mut self, criterion: Criterion, answer: Answer) {
        self.answers.set(criterion, answer);
    }

    pub fn set_remarks(&mut self, remarks: impl Into<String>) {
        self.remarks = remarks.into();
    }

    pub fn unit(&self) -> Option<&UnitName> {
        self.unit.as_ref()
    }

    pub fn roster(&self) -> &[StaffRecord] {
        &self.roster
    }

    /// Lookup that produced the current roster, if one completed.
    pub fn roster_path(&self) -> Option<ResolutionPath> {
        self.roster_path
    }

    pub fn selected_staff(&self) -> Option<&StaffRecord> {
        self.selected.as_ref()
    }

    pub fn answers(&self) -> &AnswerSheet {
        &self.answers
    }

    pub fn remarks(&self) -> &str {
        &self.remarks
    }

    pub fn is_roster_loading(&self) -> bool {
        self.roster_loading
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// True when nothing has been entered.
    pub fn is_pristine(&self) -> bool {
        self.unit.is_none()
            && self.roster.is_empty()
            && self.selected.is_none()
            && self.answers.is_blank()
            && self.remarks.is_empty()
    }

    /// Submit-time completeness gate.
    pub fn validate(&self) -> Result<ValidatedForm<'_>, ValidationError> {
        let staff = self.selected.as_ref().ok_or(ValidationError::MissingStaff)?;
        let unit = self.unit.as_ref().ok_or(ValidationError::MissingUnit)?;
        let ratings = self
            .answers
            .complete()
            .map_err(ValidationError::Unanswered)?;

        Ok(ValidatedForm {
            unit,
            staff,
            ratings,
        })
    }

    /// Pass the gate and freeze a record. Marks the form as submitting.
    pub fn begin_submission(
        &mut self,
        context: &SubmissionContext,
    ) -> Result<FeedbackRecord, FormError> {
        if self.submitting {
            return Err(FormError::SubmissionInProgress);
        }

        let validated = self.validate()?;
        let record = FeedbackRecord::new(
            validated.unit.clone(),
            validated.staff.clone(),
            validated.ratings,
            self.remarks.clone(),
            context.submitter().clone(),
        );
        self.submitting = true;
        Ok(record)
    }

    /// Close a submission attempt; the form is cleared only after a durable write.
    pub fn finish_submission(&mut self, persisted: bool) {
        self.submitting = false;
        if persisted {
            self.reset();
        }
    }

    /// Clear every field. Outstanding roster fetches become stale.
    pub fn reset(&mut self) {
        let generation = self.generation + 1;
        *self = Self {
            generation,
            ..Self::default()
        };
    }

    pub fn view(&self) -> FormView {
        FormView {
            unit: self.unit.clone(),
            roster: self.roster.clone(),
            roster_path: self.roster_path,
            roster_loading: self.roster_loading,
            selected_staff: self.selected.clone(),
            answers: self.answers.clone(),
            remarks: self.remarks.clone(),
            submitting: self.submitting,
        }
    }
}

/// Borrowed view of a form that passed the gate.
#[derive(Debug)]
pub struct ValidatedForm<'a> {
    pub unit: &'a UnitName,
    pub staff: &'a StaffRecord,
    pub ratings: CompleteRatings,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("select a staff member before submitting")]
    MissingStaff,
    #[error("select a unit before submitting")]
    MissingUnit,
    #[error("rate every criterion before submitting (missing: {})", labels(.0))]
    Unanswered(Vec<Criterion>),
}

impl ValidationError {
    /// Field-level message shown to the user.
    pub fn notification(&self) -> Notification {
        match self {
            ValidationError::MissingStaff => Notification::error(
                "Select a staff member",
                "Choose the staff member being evaluated before submitting.",
            ),
            ValidationError::MissingUnit => Notification::error(
                "Select a unit",
                "Choose a unit before submitting.",
            ),
            ValidationError::Unanswered(missing) => Notification::error(
                "Required ratings missing",
                format!("Rate every criterion: {}.", labels(missing)),
            ),
        }
    }
}

fn labels(criteria: &[Criterion]) -> String {
    criteria
        .iter()
        .map(|criterion| criterion.label())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("a submission is already in progress")]
    SubmissionInProgress,
}

/// Serializable snapshot for the front end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormView {
    pub unit: Option<UnitName>,
    pub roster: Vec<StaffRecord>,
    pub roster_path: Option<ResolutionPath>,
    pub roster_loading: bool,
    pub selected_staff: Option<StaffRecord>,
    pub answers: AnswerSheet,
    pub remarks: String,
    pub submitting: bool,
}
