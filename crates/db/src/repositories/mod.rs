use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use thiserror::Error;

use manpower_core::audit::ApprovalHistoryEntry;
use manpower_core::config::WorkflowConfig;
use manpower_core::domain::actor::Actor;
use manpower_core::domain::request::{ManpowerRequest, NewManpowerRequest, RequestId};
use manpower_core::errors::{ApplicationError, DomainError};
use manpower_core::workflow::{
    DecisionAction, DecisionError, OrgDirectory, PendingFilter, TransitionOutcome, WorkflowEngine,
};

pub mod history;
pub mod lookup;
pub mod memory;
pub mod request;

pub use history::SqlHistoryRepository;
pub use lookup::{LookupKind, SqlLookupRepository};
pub use memory::InMemoryLedger;
pub use request::SqlRequestRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("request {} not found", .0 .0)]
    NotFound(RequestId),
    #[error("{kind} `{name}` does not exist")]
    MissingLookup { kind: LookupKind, name: String },
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl From<DecisionError> for RepositoryError {
    fn from(value: DecisionError) -> Self {
        Self::Domain(DomainError::Decision(value))
    }
}

impl From<RepositoryError> for ApplicationError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Database(error) => Self::Persistence(error.to_string()),
            RepositoryError::Decode(message) => Self::Persistence(message),
            RepositoryError::NotFound(id) => Self::NotFound(id),
            RepositoryError::MissingLookup { .. } => Self::Configuration(value.to_string()),
            RepositoryError::Domain(error) => Self::Domain(error),
        }
    }
}

/// How document numbers are issued on submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmitPolicy {
    pub doc_number_prefix: String,
    pub retry_limit: u32,
}

impl SubmitPolicy {
    pub fn from_config(config: &WorkflowConfig) -> Self {
        Self {
            doc_number_prefix: config.doc_number_prefix.clone(),
            retry_limit: config.submit_retry_limit.max(1),
        }
    }
}

impl Default for SubmitPolicy {
    fn default() -> Self {
        Self::from_config(&WorkflowConfig::default())
    }
}

/// A decision as committed: the post-transition request and its audit entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecisionRecord {
    pub request: ManpowerRequest,
    pub outcome: TransitionOutcome,
    pub history: ApprovalHistoryEntry,
}

#[async_trait]
pub trait RequestRepository: Send + Sync {
    /// Creates the request in its submitted state together with the step-0
    /// audit entry.
    async fn submit(&self, request: NewManpowerRequest)
        -> Result<ManpowerRequest, RepositoryError>;

    async fn find_by_id(&self, id: RequestId) -> Result<Option<ManpowerRequest>, RepositoryError>;

    /// Newest first. Rows that fail to decode are skipped.
    async fn list_all(&self) -> Result<Vec<ManpowerRequest>, RepositoryError>;

    async fn list_pending(
        &self,
        filter: &PendingFilter,
    ) -> Result<Vec<ManpowerRequest>, RepositoryError>;

    /// Resolves, validates and commits one decision while holding the
    /// request's row lock. Nothing is written unless every step succeeds.
    async fn apply_decision(
        &self,
        id: RequestId,
        engine: &WorkflowEngine,
        actor: &Actor,
        action: DecisionAction,
        notes: &str,
    ) -> Result<DecisionRecord, RepositoryError>;
}

#[async_trait]
pub trait HistoryRepository: Send + Sync {
    /// Audit entries in insertion order; `NotFound` for an unknown request.
    async fn list_for_request(
        &self,
        id: RequestId,
    ) -> Result<Vec<ApprovalHistoryEntry>, RepositoryError>;
}

#[async_trait]
pub trait LookupRepository: Send + Sync {
    async fn id_by_name(&self, kind: LookupKind, name: &str)
        -> Result<Option<i64>, RepositoryError>;

    async fn org_directory(&self, config: &WorkflowConfig)
        -> Result<OrgDirectory, RepositoryError>;
}

/// Current time at the precision the ledger stores.
pub(crate) fn now_micros() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

pub(crate) fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(column: &str, value: String) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(&value).map(|timestamp| timestamp.with_timezone(&Utc)).map_err(
        |error| {
            RepositoryError::Decode(format!("invalid timestamp in `{column}`: `{value}` ({error})"))
        },
    )
}

/// `updated_at` never moves backwards, even if the clock does.
pub(crate) fn advance_timestamp(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    previous.max(now)
}
