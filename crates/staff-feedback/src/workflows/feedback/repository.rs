use async_trait::async_trait;

use super::domain::{FeedbackRecord, IdentityState, StaffRow};

/// Lookup strategies over the unit column of the staff table. Both are ordered
/// by staff name ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaffFilter {
    /// Unit column equals the value exactly.
    UnitEquals(String),
    /// Unit column matches an escaped `ILIKE` pattern.
    UnitLike(String),
}

/// Read side of the primary store.
#[async_trait]
pub trait StaffDirectory: Send + Sync {
    /// Non-null values of the unit column in ascending order, duplicates included.
    async fn unit_values(&self) -> Result<Vec<String>, StoreError>;

    async fn find_staff(&self, filter: &StaffFilter) -> Result<Vec<StaffRow>, StoreError>;
}

/// Write side of the primary store; the system of record for feedback.
#[async_trait]
pub trait FeedbackRepository: Send + Sync {
    async fn insert(&self, record: &FeedbackRecord) -> Result<(), StoreError>;
}

/// Append-only reporting mirror (the spreadsheet).
#[async_trait]
pub trait MirrorSink: Send + Sync {
    async fn append(&self, record: &FeedbackRecord) -> Result<(), MirrorError>;
}

/// Opaque authentication collaborator.
pub trait IdentityProvider: Send + Sync {
    fn identity(&self) -> IdentityState;
}

impl IdentityProvider for IdentityState {
    fn identity(&self) -> IdentityState {
        self.clone()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store request {endpoint} failed: {source}")]
    Http {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("store rejected {endpoint} with status {status}: {body}")]
    Api {
        endpoint: String,
        status: u16,
        body: String,
    },
    #[error("unable to decode {endpoint} response: {source}")]
    Deserialization {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, thiserror::Error)]
pub enum MirrorError {
    #[error("mirror request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("mirror rejected the row with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("mirror unavailable: {0}")]
    Unavailable(String),
}
