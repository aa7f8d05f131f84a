use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::actor::EmployeeId;
use crate::domain::doc_number::DocNumber;
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(pub i64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DepartmentId(pub i64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SectionId(pub i64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PositionId(pub i64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OriginStatus {
    Draft,
    Submitted,
    MgrApproved,
    MgrRejected,
    DirApproved,
    DirRejected,
    Returned,
}

impl OriginStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Submitted => "SUBMITTED",
            Self::MgrApproved => "MGR_APPROVED",
            Self::MgrRejected => "MGR_REJECTED",
            Self::DirApproved => "DIR_APPROVED",
            Self::DirRejected => "DIR_REJECTED",
            Self::Returned => "RETURNED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "DRAFT" => Some(Self::Draft),
            "SUBMITTED" => Some(Self::Submitted),
            "MGR_APPROVED" => Some(Self::MgrApproved),
            "MGR_REJECTED" => Some(Self::MgrRejected),
            "DIR_APPROVED" => Some(Self::DirApproved),
            "DIR_REJECTED" => Some(Self::DirRejected),
            "RETURNED" => Some(Self::Returned),
            _ => None,
        }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::MgrRejected | Self::DirRejected)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HrStatus {
    None,
    HrIntake,
    InProgress,
    WaitingRecruiter,
    WaitingHrManager,
    WaitingHrDirector,
    HrDirectorApproved,
    RecruiterRejected,
    HrManagerRejected,
    HrDirectorRejected,
    Returned,
}

impl HrStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::HrIntake => "HR_INTAKE",
            Self::InProgress => "IN_PROGRESS",
            Self::WaitingRecruiter => "WAITING_RECRUITER",
            Self::WaitingHrManager => "WAITING_HR_MANAGER",
            Self::WaitingHrDirector => "WAITING_HR_DIRECTOR",
            Self::HrDirectorApproved => "HR_DIRECTOR_APPROVED",
            Self::RecruiterRejected => "RECRUITER_REJECTED",
            Self::HrManagerRejected => "HR_MANAGER_REJECTED",
            Self::HrDirectorRejected => "HR_DIRECTOR_REJECTED",
            Self::Returned => "RETURNED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "NONE" => Some(Self::None),
            "HR_INTAKE" => Some(Self::HrIntake),
            "IN_PROGRESS" => Some(Self::InProgress),
            "WAITING_RECRUITER" => Some(Self::WaitingRecruiter),
            "WAITING_HR_MANAGER" => Some(Self::WaitingHrManager),
            "WAITING_HR_DIRECTOR" => Some(Self::WaitingHrDirector),
            "HR_DIRECTOR_APPROVED" => Some(Self::HrDirectorApproved),
            "RECRUITER_REJECTED" => Some(Self::RecruiterRejected),
            "HR_MANAGER_REJECTED" => Some(Self::HrManagerRejected),
            "HR_DIRECTOR_REJECTED" => Some(Self::HrDirectorRejected),
            "RETURNED" => Some(Self::Returned),
            _ => None,
        }
    }

    /// States from which director approval opens the HR track.
    pub fn is_unstarted(&self) -> bool {
        matches!(self, Self::None | Self::HrIntake | Self::InProgress)
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::RecruiterRejected | Self::HrManagerRejected | Self::HrDirectorRejected)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ManagementStatus {
    None,
    WaitingManagement,
    MgmtApproved,
    MgmtRejected,
    Returned,
}

impl ManagementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::WaitingManagement => "WAITING_MANAGEMENT",
            Self::MgmtApproved => "MGMT_APPROVED",
            Self::MgmtRejected => "MGMT_REJECTED",
            Self::Returned => "RETURNED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "NONE" => Some(Self::None),
            "WAITING_MANAGEMENT" => Some(Self::WaitingManagement),
            "MGMT_APPROVED" => Some(Self::MgmtApproved),
            "MGMT_REJECTED" => Some(Self::MgmtRejected),
            "RETURNED" => Some(Self::Returned),
            _ => None,
        }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::MgmtRejected)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverallStatus {
    InProgress,
    WaitingManagement,
    Approved,
    Rejected,
}

impl OverallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => "IN_PROGRESS",
            Self::WaitingManagement => "WAITING_MANAGEMENT",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "IN_PROGRESS" => Some(Self::InProgress),
            "WAITING_MANAGEMENT" => Some(Self::WaitingManagement),
            "APPROVED" => Some(Self::Approved),
            "REJECTED" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// The three status tracks plus the overall status derived from them.
///
/// Only the state machine produces new values of this type; nothing else
/// recomputes `overall` from the tracks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestStatus {
    pub origin: OriginStatus,
    pub hr: HrStatus,
    pub management: ManagementStatus,
    pub overall: OverallStatus,
}

impl RequestStatus {
    pub fn submitted() -> Self {
        Self {
            origin: OriginStatus::Submitted,
            hr: HrStatus::None,
            management: ManagementStatus::None,
            overall: OverallStatus::InProgress,
        }
    }

    pub fn has_rejection(&self) -> bool {
        self.origin.is_rejected() || self.hr.is_rejected() || self.management.is_rejected()
    }
}

/// What the requester is asking to hire.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    pub required_position_name: String,
    pub headcount: u32,
    pub employment_type_id: i64,
    pub contract_type_id: i64,
    pub reason_id: i64,
    pub min_age: Option<u32>,
    pub max_age: Option<u32>,
    pub gender_id: Option<i64>,
    pub nationality_id: Option<i64>,
    pub experience_id: Option<i64>,
    pub education_level_id: Option<i64>,
    pub special_qualifications: String,
    pub target_hire_date: Option<NaiveDate>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewManpowerRequest {
    pub department_id: DepartmentId,
    pub section_id: Option<SectionId>,
    pub position_id: PositionId,
    pub employee_id: EmployeeId,
    pub requirement: Requirement,
}

impl NewManpowerRequest {
    /// Rejects payloads that must never reach the ledger.
    pub fn validate(&self) -> Result<(), DomainError> {
        let mut problems = Vec::new();

        if self.department_id.0 <= 0 {
            problems.push("department_id must be positive".to_string());
        }
        if matches!(self.section_id, Some(section) if section.0 <= 0) {
            problems.push("section_id must be positive when present".to_string());
        }
        if self.position_id.0 <= 0 {
            problems.push("position_id must be positive".to_string());
        }
        if self.employee_id.0.trim().is_empty() {
            problems.push("employee_id is required".to_string());
        }

        let requirement = &self.requirement;
        if requirement.required_position_name.trim().is_empty() {
            problems.push("required_position_name is required".to_string());
        }
        if requirement.headcount == 0 {
            problems.push("headcount must be greater than zero".to_string());
        }
        for (field, value) in [
            ("employment_type_id", requirement.employment_type_id),
            ("contract_type_id", requirement.contract_type_id),
            ("reason_id", requirement.reason_id),
        ] {
            if value <= 0 {
                problems.push(format!("{field} must be positive"));
            }
        }
        if let (Some(min_age), Some(max_age)) = (requirement.min_age, requirement.max_age) {
            if min_age > max_age {
                problems.push(format!("min_age {min_age} exceeds max_age {max_age}"));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(DomainError::Validation(problems.join("; ")))
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManpowerRequest {
    pub id: RequestId,
    pub doc_number: DocNumber,
    pub doc_date: NaiveDate,
    pub department_id: DepartmentId,
    pub section_id: Option<SectionId>,
    pub position_id: PositionId,
    pub employee_id: EmployeeId,
    pub requirement: Requirement,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
