use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::text::collapse_whitespace;

/// Column holding the unit (school) name in the staff table.
pub const UNIT_COLUMN: &str = "ESCOLA";
/// Column the roster is ordered by.
pub const NAME_COLUMN: &str = "Nome";
/// Projection requested for roster lookups.
pub const STAFF_SELECT: &str = "REGIONAL, Cadastro, Nome, \"Admissão\", CPF, Cargo, Local, ESCOLA, \
\"Horas_Mes\", \"Horas_Semana\", tempo_casa_mes, total_carga_horaria, horas_faltas_injustificadas, \
porcentagem_horas_faltas_injustificadas, horas_faltas_justificadas, porcentagem_horas_faltas_justificadas";

/// Unit name with whitespace collapsed and trimmed; never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct UnitName(String);

impl UnitName {
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = collapse_whitespace(raw);
        if normalized.is_empty() {
            None
        } else {
            Some(Self(normalized))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnitName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Staff row exactly as the store returns it. Every column may be null and
/// numeric columns may arrive as numbers or strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StaffRow {
    #[serde(rename = "REGIONAL", default)]
    pub regional: Option<Value>,
    #[serde(rename = "Cadastro", default)]
    pub registration_id: Option<Value>,
    #[serde(rename = "Nome", default)]
    pub name: Option<Value>,
    #[serde(rename = "Admissão", default)]
    pub admission_date: Option<Value>,
    #[serde(rename = "CPF", default)]
    pub tax_id: Option<Value>,
    #[serde(rename = "Cargo", default)]
    pub role: Option<Value>,
    #[serde(rename = "Local", default)]
    pub location: Option<Value>,
    #[serde(rename = "ESCOLA", default)]
    pub school: Option<Value>,
    #[serde(rename = "Horas_Mes", default)]
    pub monthly_hours: Option<Value>,
    #[serde(rename = "Horas_Semana", default)]
    pub weekly_hours: Option<Value>,
    #[serde(rename = "tempo_casa_mes", default)]
    pub tenure_months: Option<Value>,
    #[serde(rename = "total_carga_horaria", default)]
    pub total_workload: Option<Value>,
    #[serde(rename = "horas_faltas_injustificadas", default)]
    pub unjustified_absence_hours: Option<Value>,
    #[serde(rename = "porcentagem_horas_faltas_injustificadas", default)]
    pub unjustified_absence_pct: Option<Value>,
    #[serde(rename = "horas_faltas_justificadas", default)]
    pub justified_absence_hours: Option<Value>,
    #[serde(rename = "porcentagem_horas_faltas_justificadas", default)]
    pub justified_absence_pct: Option<Value>,
}

/// Render a loosely typed store value for display. Null becomes empty.
pub fn display_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(Value::Number(number)) => number.to_string(),
        Some(Value::Bool(flag)) => flag.to_string(),
        Some(other) => other.to_string(),
    }
}

/// Registration number identifying a staff member within a roster.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegistrationId(pub String);

/// Staff member with every field coerced to its display string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaffRecord {
    pub registration_id: RegistrationId,
    pub name: String,
    pub regional: String,
    pub admission_date: String,
    pub tax_id: String,
    pub role: String,
    pub location: String,
    pub school: String,
    pub monthly_hours: String,
    pub weekly_hours: String,
    pub tenure_months: String,
    pub total_workload: String,
    pub unjustified_absence_hours: String,
    pub unjustified_absence_pct: String,
    pub justified_absence_hours: String,
    pub justified_absence_pct: String,
}

impl StaffRecord {
    pub fn from_row(row: &StaffRow) -> Self {
        Self {
            registration_id: RegistrationId(display_value(row.registration_id.as_ref())),
            name: display_value(row.name.as_ref()),
            regional: display_value(row.regional.as_ref()),
            admission_date: display_value(row.admission_date.as_ref()),
            tax_id: display_value(row.tax_id.as_ref()),
            role: display_value(row.role.as_ref()),
            location: display_value(row.location.as_ref()),
            school: display_value(row.school.as_ref()),
            monthly_hours: display_value(row.monthly_hours.as_ref()),
            weekly_hours: display_value(row.weekly_hours.as_ref()),
            tenure_months: display_value(row.tenure_months.as_ref()),
            total_workload: display_value(row.total_workload.as_ref()),
            unjustified_absence_hours: display_value(row.unjustified_absence_hours.as_ref()),
            unjustified_absence_pct: display_value(row.unjustified_absence_pct.as_ref()),
            justified_absence_hours: display_value(row.justified_absence_hours.as_ref()),
            justified_absence_pct: display_value(row.justified_absence_pct.as_ref()),
        }
    }

    /// Selector label, e.g. `J. Doe — Teacher (1234)`.
    pub fn label(&self) -> String {
        format!("{} — {} ({})", self.name, self.role, self.registration_id.0)
    }
}

/// Fixed evaluation criteria, in the order the form presents them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Criterion {
    #[serde(rename = "postura_prof")]
    ProfessionalConduct,
    #[serde(rename = "observacoes_sala_aula")]
    ClassroomObservation,
    #[serde(rename = "feedback")]
    FeedbackReception,
    #[serde(rename = "feedback_evolucao")]
    FeedbackProgress,
    #[serde(rename = "planejamento_org")]
    PlanningAndOrganization,
    #[serde(rename = "dominio_conteudo")]
    ContentMastery,
    #[serde(rename = "gestao_aprendizagem")]
    LearningManagement,
    #[serde(rename = "comunicacao_rel")]
    CommunicationAndRelationships,
}

impl Criterion {
    pub const fn ordered() -> [Self; 8] {
        [
            Self::ProfessionalConduct,
            Self::ClassroomObservation,
            Self::FeedbackReception,
            Self::FeedbackProgress,
            Self::PlanningAndOrganization,
            Self::ContentMastery,
            Self::LearningManagement,
            Self::CommunicationAndRelationships,
        ]
    }

    /// Column name in the feedback table.
    pub const fn key(self) -> &'static str {
        match self {
            Self::ProfessionalConduct => "postura_prof",
            Self::ClassroomObservation => "observacoes_sala_aula",
            Self::FeedbackReception => "feedback",
            Self::FeedbackProgress => "feedback_evolucao",
            Self::PlanningAndOrganization => "planejamento_org",
            Self::ContentMastery => "dominio_conteudo",
            Self::LearningManagement => "gestao_aprendizagem",
            Self::CommunicationAndRelationships => "comunicacao_rel",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::ProfessionalConduct => "Professional conduct",
            Self::ClassroomObservation => "Classroom observation",
            Self::FeedbackReception => "Receptiveness to feedback",
            Self::FeedbackProgress => "Progress after feedback",
            Self::PlanningAndOrganization => "Planning and organization",
            Self::ContentMastery => "Content mastery",
            Self::LearningManagement => "Learning management",
            Self::CommunicationAndRelationships => "Communication and relationships",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ordered()
            .into_iter()
            .find(|criterion| criterion.key() == key.trim())
    }
}

/// Ordinal rating bounded to `Rating::MIN..=Rating::MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&value).then_some(Self(value))
    }

    pub const fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Rating {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| {
            format!(
                "rating {value} is outside {}..={}",
                Self::MIN,
                Self::MAX
            )
        })
    }
}

impl From<Rating> for u8 {
    fn from(value: Rating) -> Self {
        value.0
    }
}

/// Answer for one criterion; `Unanswered` is distinct from every rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Answer {
    #[default]
    Unanswered,
    Rated(Rating),
}

impl Answer {
    pub const fn rating(self) -> Option<Rating> {
        match self {
            Self::Unanswered => None,
            Self::Rated(rating) => Some(rating),
        }
    }
}

impl From<Option<Rating>> for Answer {
    fn from(value: Option<Rating>) -> Self {
        value.map_or(Self::Unanswered, Self::Rated)
    }
}

impl Serialize for Answer {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.rating().serialize(serializer)
    }
}

/// One answer per criterion, starting all unanswered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AnswerSheet {
    answers: BTreeMap<Criterion, Answer>,
}

impl Default for AnswerSheet {
    fn default() -> Self {
        Self {
            answers: Criterion::ordered()
                .into_iter()
                .map(|criterion| (criterion, Answer::Unanswered))
                .collect(),
        }
    }
}

impl AnswerSheet {
    pub fn get(&self, criterion: Criterion) -> Answer {
        self.answers.get(&criterion).copied().unwrap_or_default()
    }

    pub fn set(&mut self, criterion: Criterion, answer: Answer) {
        self.answers.insert(criterion, answer);
    }

    pub fn unanswered(&self) -> Vec<Criterion> {
        Criterion::ordered()
            .into_iter()
            .filter(|criterion| self.get(*criterion) == Answer::Unanswered)
            .collect()
    }

    pub fn is_blank(&self) -> bool {
        self.unanswered().len() == Criterion::ordered().len()
    }

    /// Freeze the sheet once every criterion carries a rating.
    pub fn complete(&self) -> Result<CompleteRatings, Vec<Criterion>> {
        let missing = self.unanswered();
        if !missing.is_empty() {
            return Err(missing);
        }

        let ratings = Criterion::ordered()
            .into_iter()
            .filter_map(|criterion| self.get(criterion).rating().map(|r| (criterion, r)))
            .collect();
        Ok(CompleteRatings { ratings })
    }
}

/// Ratings for every criterion; only obtainable from a complete sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CompleteRatings {
    ratings: BTreeMap<Criterion, Rating>,
}

impl CompleteRatings {
    pub fn get(&self, criterion: Criterion) -> Option<Rating> {
        self.ratings.get(&criterion).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Criterion, Rating)> + '_ {
        self.ratings.iter().map(|(criterion, rating)| (*criterion, *rating))
    }
}

/// Person submitting the evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submitter {
    pub id: String,
    pub display_name: String,
}

impl Submitter {
    pub const ANONYMOUS_ID: &'static str = "anonymous";

    pub fn anonymous() -> Self {
        Self {
            id: Self::ANONYMOUS_ID.to_string(),
            display_name: "Anonymous".to_string(),
        }
    }
}

/// Session event reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityState {
    Authenticated(Submitter),
    Unauthenticated,
}

/// Immutable snapshot handed to the durable and mirror writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackRecord {
    unit: UnitName,
    staff: StaffRecord,
    ratings: CompleteRatings,
    remarks: String,
    submitter: Submitter,
}

impl FeedbackRecord {
    pub fn new(
        unit: UnitName,
        staff: StaffRecord,
        ratings: CompleteRatings,
        remarks: impl Into<String>,
        submitter: Submitter,
    ) -> Self {
        Self {
            unit,
            staff,
            ratings,
            remarks: remarks.into(),
            submitter,
        }
    }

    pub fn unit(&self) -> &UnitName {
        &self.unit
    }

    pub fn staff(&self) -> &StaffRecord {
        &self.staff
    }

    pub fn ratings(&self) -> &CompleteRatings {
        &self.ratings
    }

    pub fn remarks(&self) -> &str {
        &self.remarks
    }

    pub fn submitter(&self) -> &Submitter {
        &self.submitter
    }

    /// Row shape accepted by the feedback table.
    pub fn row(&self) -> FeedbackRow<'_> {
        let staff = &self.staff;
        FeedbackRow {
            user_id: &self.submitter.id,
            unidade: self.unit.as_str(),
            nome_professor: &staff.name,
            regional: &staff.regional,
            cadastro: &staff.registration_id.0,
            admissao: &staff.admission_date,
            cpf: &staff.tax_id,
            cargo: &staff.role,
            local: &staff.location,
            escola: &staff.school,
            horas_mes: &staff.monthly_hours,
            horas_semana: &staff.weekly_hours,
            tempo_casa_mes: &staff.tenure_months,
            total_carga_horaria: &staff.total_workload,
            horas_faltas_injustificadas: &staff.unjustified_absence_hours,
            porcentagem_horas_faltas_injustificadas: &staff.unjustified_absence_pct,
            horas_faltas_justificadas: &staff.justified_absence_hours,
            porcentagem_horas_faltas_justificadas: &staff.justified_absence_pct,
            ratings: &self.ratings,
            consideracoes: &self.remarks,
        }
    }

    /// Row shape appended to the reporting spreadsheet.
    pub fn mirror_row(&self) -> MirrorRow<'_> {
        MirrorRow {
            user_name: &self.submitter.display_name,
            row: self.row(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FeedbackRow<'a> {
    pub user_id: &'a str,
    pub unidade: &'a str,
    pub nome_professor: &'a str,
    pub regional: &'a str,
    pub cadastro: &'a str,
    pub admissao: &'a str,
    pub cpf: &'a str,
    pub cargo: &'a str,
    pub local: &'a str,
    pub escola: &'a str,
    pub horas_mes: &'a str,
    pub horas_semana: &'a str,
    pub tempo_casa_mes: &'a str,
    pub total_carga_horaria: &'a str,
    pub horas_faltas_injustificadas: &'a str,
    pub porcentagem_horas_faltas_injustificadas: &'a str,
    pub horas_faltas_justificadas: &'a str,
    pub porcentagem_horas_faltas_justificadas: &'a str,
    #[serde(flatten)]
    pub ratings: &'a CompleteRatings,
    pub consideracoes: &'a str,
}

#[derive(Debug, Serialize)]
pub struct MirrorRow<'a> {
    pub user_name: &'a str,
    #[serde(flatten)]
    pub row: FeedbackRow<'a>,
}
