pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod workflow;

pub use audit::{ApprovalHistoryEntry, HistoryAction, NewHistoryEntry, SUBMISSION_STEP};
pub use domain::actor::{Actor, EmployeeId};
pub use domain::doc_number::DocNumber;
pub use domain::request::{
    DepartmentId, HrStatus, ManagementStatus, ManpowerRequest, NewManpowerRequest, OriginStatus,
    OverallStatus, PositionId, RequestId, RequestStatus, Requirement, SectionId,
};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use workflow::{
    DecisionAction, DecisionError, Lane, OrgDirectory, PendingFilter, PositionRole,
    TransitionOutcome, WorkflowEngine,
};
