use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::actor::EmployeeId;
use crate::domain::request::RequestId;
use crate::workflow::engine::DecisionAction;

/// Step number recorded for the initial submission.
pub const SUBMISSION_STEP: u8 = 0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HistoryAction {
    Submit,
    Approve,
    Reject,
    Return,
}

impl HistoryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submit => "SUBMIT",
            Self::Approve => "APPROVE",
            Self::Reject => "REJECT",
            Self::Return => "RETURN",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "SUBMIT" => Some(Self::Submit),
            "APPROVE" => Some(Self::Approve),
            "REJECT" => Some(Self::Reject),
            "RETURN" => Some(Self::Return),
            _ => None,
        }
    }
}

impl From<DecisionAction> for HistoryAction {
    fn from(action: DecisionAction) -> Self {
        match action {
            DecisionAction::Approve => Self::Approve,
            DecisionAction::Reject => Self::Reject,
            DecisionAction::Return => Self::Return,
        }
    }
}

/// An audit record waiting to be appended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewHistoryEntry {
    pub request_id: RequestId,
    pub approver_id: EmployeeId,
    pub step: u8,
    pub action: HistoryAction,
    pub notes: String,
    pub recorded_at: DateTime<Utc>,
}

impl NewHistoryEntry {
    pub fn submission(
        request_id: RequestId,
        submitter: EmployeeId,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            request_id,
            approver_id: submitter,
            step: SUBMISSION_STEP,
            action: HistoryAction::Submit,
            notes: String::new(),
            recorded_at,
        }
    }
}

/// An appended audit record. Never updated or deleted once written.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalHistoryEntry {
    pub id: i64,
    pub request_id: RequestId,
    pub approver_id: EmployeeId,
    pub step: u8,
    pub action: HistoryAction,
    pub notes: String,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TrailViolation {
    Empty,
    MissingSubmission,
    ForeignEntry { entry_id: i64 },
    StepOutOfRange { entry_id: i64, step: u8 },
    RepeatedSubmission { entry_id: i64 },
    StepOutOfOrder { entry_id: i64 },
}

/// Checks the structural invariants of one request's trail: a single leading
/// step-0 submission followed only by decision steps 1..=6, each higher than
/// the one before.
pub fn verify_trail(
    request_id: RequestId,
    entries: &[ApprovalHistoryEntry],
) -> Result<(), TrailViolation> {
    let Some(first) = entries.first() else {
        return Err(TrailViolation::Empty);
    };
    if first.step != SUBMISSION_STEP || first.action != HistoryAction::Submit {
        return Err(TrailViolation::MissingSubmission);
    }

    for entry in entries {
        if entry.request_id != request_id {
            return Err(TrailViolation::ForeignEntry { entry_id: entry.id });
        }
        if entry.step > 6 {
            return Err(TrailViolation::StepOutOfRange { entry_id: entry.id, step: entry.step });
        }
    }

    if let Some(repeat) = entries[1..]
        .iter()
        .find(|entry| entry.action == HistoryAction::Submit || entry.step == SUBMISSION_STEP)
    {
        return Err(TrailViolation::RepeatedSubmission { entry_id: repeat.id });
    }

    if let Some(pair) = entries.windows(2).find(|pair| pair[1].step <= pair[0].step) {
        return Err(TrailViolation::StepOutOfOrder { entry_id: pair[1].id });
    }

    Ok(())
}
