use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::audit::NewHistoryEntry;
use crate::domain::actor::{Actor, EmployeeId};
use crate::domain::request::{
    HrStatus, ManagementStatus, ManpowerRequest, OriginStatus, OverallStatus, RequestId,
    RequestStatus,
};
use crate::workflow::lanes::{Lane, OrgDirectory};
use crate::workflow::queue::PendingFilter;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DecisionAction {
    Approve,
    Reject,
    Return,
}

impl DecisionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "APPROVE",
            Self::Reject => "REJECT",
            Self::Return => "RETURN",
        }
    }

    pub fn parse(value: &str) -> Result<Self, DecisionError> {
        match value {
            "APPROVE" => Ok(Self::Approve),
            "REJECT" => Ok(Self::Reject),
            "RETURN" => Ok(Self::Return),
            _ => Err(DecisionError::InvalidAction(value.to_string())),
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DecisionError {
    #[error("invalid action `{0}`; expected APPROVE, REJECT or RETURN")]
    InvalidAction(String),
    #[error("actor has no approval lane for this request")]
    NoLane,
    #[error("request is not waiting on {lane}: expected {expected}, found {observed}")]
    WrongState { lane: Lane, expected: &'static str, observed: &'static str },
}

/// Result of one accepted decision: both status snapshots and the audit step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransitionOutcome {
    pub lane: Lane,
    pub action: DecisionAction,
    pub step: u8,
    pub from: RequestStatus,
    pub to: RequestStatus,
}

impl TransitionOutcome {
    pub fn history_entry(
        &self,
        request_id: RequestId,
        approver_id: EmployeeId,
        notes: impl Into<String>,
        recorded_at: DateTime<Utc>,
    ) -> NewHistoryEntry {
        NewHistoryEntry {
            request_id,
            approver_id,
            step: self.step,
            action: self.action.into(),
            notes: notes.into(),
            recorded_at,
        }
    }
}

/// Fails with `WrongState` unless `status` is the state `lane` acts on.
pub fn check_precondition(lane: Lane, status: &RequestStatus) -> Result<(), DecisionError> {
    let (holds, expected, observed) = match lane {
        Lane::Manager => (
            status.origin == OriginStatus::Submitted,
            OriginStatus::Submitted.as_str(),
            status.origin.as_str(),
        ),
        Lane::Director => (
            status.origin == OriginStatus::MgrApproved,
            OriginStatus::MgrApproved.as_str(),
            status.origin.as_str(),
        ),
        Lane::Recruiter => (
            status.hr == HrStatus::WaitingRecruiter,
            HrStatus::WaitingRecruiter.as_str(),
            status.hr.as_str(),
        ),
        Lane::HrManager => (
            status.hr == HrStatus::WaitingHrManager,
            HrStatus::WaitingHrManager.as_str(),
            status.hr.as_str(),
        ),
        Lane::HrDirector => (
            status.hr == HrStatus::WaitingHrDirector,
            HrStatus::WaitingHrDirector.as_str(),
            status.hr.as_str(),
        ),
        Lane::Management => (
            status.management == ManagementStatus::WaitingManagement,
            ManagementStatus::WaitingManagement.as_str(),
            status.management.as_str(),
        ),
    };

    if holds {
        Ok(())
    } else {
        Err(DecisionError::WrongState { lane, expected, observed })
    }
}

/// Computes the next status for `lane` taking `action` on `current`.
pub fn transition(
    current: &RequestStatus,
    lane: Lane,
    action: DecisionAction,
) -> Result<TransitionOutcome, DecisionError> {
    use DecisionAction::{Approve, Reject, Return};

    check_precondition(lane, current)?;

    let mut next = *current;
    match (lane, action) {
        (Lane::Manager, Approve) => next.origin = OriginStatus::MgrApproved,
        (Lane::Manager, Reject) => {
            next.origin = OriginStatus::MgrRejected;
            next.overall = OverallStatus::Rejected;
        }
        (Lane::Manager, Return) => next.origin = OriginStatus::Returned,

        (Lane::Director, Approve) => {
            next.origin = OriginStatus::DirApproved;
            if current.hr.is_unstarted() {
                next.hr = HrStatus::WaitingRecruiter;
            }
        }
        (Lane::Director, Reject) => {
            next.origin = OriginStatus::DirRejected;
            next.overall = OverallStatus::Rejected;
        }
        (Lane::Director, Return) => next.origin = OriginStatus::Returned,

        (Lane::Recruiter, Approve) => next.hr = HrStatus::WaitingHrManager,
        (Lane::Recruiter, Reject) => {
            next.hr = HrStatus::RecruiterRejected;
            next.overall = OverallStatus::Rejected;
        }
        (Lane::Recruiter, Return) => next.hr = HrStatus::Returned,

        (Lane::HrManager, Approve) => next.hr = HrStatus::WaitingHrDirector,
        (Lane::HrManager, Reject) => {
            next.hr = HrStatus::HrManagerRejected;
            next.overall = OverallStatus::Rejected;
        }
        (Lane::HrManager, Return) => next.hr = HrStatus::Returned,

        (Lane::HrDirector, Approve) => {
            next.hr = HrStatus::HrDirectorApproved;
            next.management = ManagementStatus::WaitingManagement;
            next.overall = OverallStatus::WaitingManagement;
        }
        (Lane::HrDirector, Reject) => {
            next.hr = HrStatus::HrDirectorRejected;
            next.overall = OverallStatus::Rejected;
        }
        (Lane::HrDirector, Return) => next.hr = HrStatus::Returned,

        (Lane::Management, Approve) => {
            next.management = ManagementStatus::MgmtApproved;
            next.overall = OverallStatus::Approved;
        }
        (Lane::Management, Reject) => {
            next.management = ManagementStatus::MgmtRejected;
            next.overall = OverallStatus::Rejected;
        }
        (Lane::Management, Return) => next.management = ManagementStatus::Returned,
    }

    Ok(TransitionOutcome { lane, action, step: lane.step(), from: *current, to: next })
}

/// Lane resolution and transitions bound to one organization directory.
#[derive(Clone, Debug)]
pub struct WorkflowEngine {
    directory: OrgDirectory,
}

impl WorkflowEngine {
    pub fn new(directory: OrgDirectory) -> Self {
        Self { directory }
    }

    pub fn directory(&self) -> &OrgDirectory {
        &self.directory
    }

    pub fn resolve_lane(&self, request: &ManpowerRequest, actor: &Actor) -> Option<Lane> {
        self.directory.resolve_lane(request, actor)
    }

    /// Resolves the actor's lane and applies `action` to the request's
    /// current status. Persisting the outcome is the caller's job.
    pub fn decide(
        &self,
        request: &ManpowerRequest,
        actor: &Actor,
        action: DecisionAction,
    ) -> Result<TransitionOutcome, DecisionError> {
        let lane = self.resolve_lane(request, actor).ok_or(DecisionError::NoLane)?;
        transition(&request.status, lane, action)
    }

    pub fn pending_filter(&self, actor: &Actor) -> Option<PendingFilter> {
        PendingFilter::for_actor(&self.directory, actor)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};

    use super::{transition, DecisionAction, DecisionError, WorkflowEngine};
    use crate::audit::HistoryAction;
    use crate::domain::actor::{Actor, EmployeeId};
    use crate::domain::doc_number::DocNumber;
    use crate::domain::request::{
        DepartmentId, HrStatus, ManagementStatus, ManpowerRequest, OriginStatus, OverallStatus,
        PositionId, RequestId, RequestStatus, Requirement, SectionId,
    };
    use crate::workflow::lanes::{Lane, OrgDirectory, PositionRole};

    const HR: DepartmentId = DepartmentId(1);
    const MGMT: DepartmentId = DepartmentId(2);
    const ENGINEERING: DepartmentId = DepartmentId(5);
    const FINANCE: DepartmentId = DepartmentId(7);

    const MANAGER: PositionId = PositionId(1);
    const DIRECTOR: PositionId = PositionId(2);
    const RECRUITER: PositionId = PositionId(3);
    const EXECUTIVE: PositionId = PositionId(4);

    fn engine() -> WorkflowEngine {
        WorkflowEngine::new(
            OrgDirectory::new(HR, MGMT)
                .with_position(MANAGER, PositionRole::Manager)
                .with_position(DIRECTOR, PositionRole::Director)
                .with_position(RECRUITER, PositionRole::Recruiter),
        )
    }

    fn actor(id: &str, department: DepartmentId, position: PositionId) -> Actor {
        Actor {
            employee_id: EmployeeId(id.to_string()),
            department_id: department,
            section_id: None,
            position_id: position,
            role_name: "Approve".to_string(),
        }
    }

    fn request() -> ManpowerRequest {
        let now = Utc::now();
        ManpowerRequest {
            id: RequestId(1),
            doc_number: DocNumber::compose("PQ", now, 1),
            doc_date: NaiveDate::from_ymd_opt(2024, 11, 3).expect("valid date"),
            department_id: ENGINEERING,
            section_id: None,
            position_id: PositionId(5),
            employee_id: EmployeeId("E003".to_string()),
            requirement: Requirement {
                required_position_name: "Backend Engineer".to_string(),
                headcount: 1,
                employment_type_id: 1,
                contract_type_id: 1,
                reason_id: 1,
                min_age: None,
                max_age: None,
                gender_id: None,
                nationality_id: None,
                experience_id: None,
                education_level_id: None,
                special_qualifications: String::new(),
                target_hire_date: None,
            },
            status: RequestStatus::submitted(),
            created_at: now,
            updated_at: now,
        }
    }

    fn apply(
        engine: &WorkflowEngine,
        request: &mut ManpowerRequest,
        actor: &Actor,
        action: DecisionAction,
    ) -> Result<u8, DecisionError> {
        let outcome = engine.decide(request, actor, action)?;
        request.status = outcome.to;
        Ok(outcome.step)
    }

    fn tracks_changed(from: &RequestStatus, to: &RequestStatus) -> usize {
        usize::from(from.origin != to.origin)
            + usize::from(from.hr != to.hr)
            + usize::from(from.management != to.management)
    }

    #[test]
    fn manager_approval_only_moves_origin_track() {
        let engine = engine();
        let mut request = request();

        let step = apply(
            &engine,
            &mut request,
            &actor("E001", ENGINEERING, MANAGER),
            DecisionAction::Approve,
        )
        .expect("manager approves");

        assert_eq!(step, 1);
        assert_eq!(request.status.origin, OriginStatus::MgrApproved);
        assert_eq!(request.status.hr, HrStatus::None);
        assert_eq!(request.status.overall, OverallStatus::InProgress);
    }

    #[test]
    fn director_approval_opens_hr_track() {
        let engine = engine();
        let mut request = request();
        apply(&engine, &mut request, &actor("E001", ENGINEERING, MANAGER), DecisionAction::Approve)
            .expect("manager approves");

        let step = apply(
            &engine,
            &mut request,
            &actor("E002", ENGINEERING, DIRECTOR),
            DecisionAction::Approve,
        )
        .expect("director approves");

        assert_eq!(step, 2);
        assert_eq!(request.status.origin, OriginStatus::DirApproved);
        assert_eq!(request.status.hr, HrStatus::WaitingRecruiter);
    }

    #[test]
    fn director_approval_leaves_started_hr_track_alone() {
        let mut status = RequestStatus::submitted();
        status.origin = OriginStatus::MgrApproved;
        status.hr = HrStatus::WaitingHrManager;

        let outcome = transition(&status, Lane::Director, DecisionAction::Approve)
            .expect("director approves");
        assert_eq!(outcome.to.hr, HrStatus::WaitingHrManager);

        status.hr = HrStatus::HrIntake;
        let outcome = transition(&status, Lane::Director, DecisionAction::Approve)
            .expect("director approves");
        assert_eq!(outcome.to.hr, HrStatus::WaitingRecruiter);
    }

    #[test]
    fn recruiter_rejection_freezes_hr_track() {
        let engine = engine();
        let mut request = request();
        apply(&engine, &mut request, &actor("E001", ENGINEERING, MANAGER), DecisionAction::Approve)
            .expect("manager approves");
        apply(&engine, &mut request, &actor("E002", ENGINEERING, DIRECTOR), DecisionAction::Approve)
            .expect("director approves");

        apply(&engine, &mut request, &actor("E010", HR, RECRUITER), DecisionAction::Reject)
            .expect("recruiter rejects");
        assert_eq!(request.status.hr, HrStatus::RecruiterRejected);
        assert_eq!(request.status.overall, OverallStatus::Rejected);

        let error = apply(&engine, &mut request, &actor("E011", HR, MANAGER), DecisionAction::Approve)
            .expect_err("hr manager is not up");
        assert_eq!(
            error,
            DecisionError::WrongState {
                lane: Lane::HrManager,
                expected: "WAITING_HR_MANAGER",
                observed: "RECRUITER_REJECTED",
            }
        );
    }

    #[test]
    fn foreign_department_manager_has_no_lane() {
        let engine = engine();
        let request = request();

        let error = engine
            .decide(&request, &actor("E070", FINANCE, MANAGER), DecisionAction::Approve)
            .expect_err("finance manager cannot act on engineering request");
        assert_eq!(error, DecisionError::NoLane);
    }

    #[test]
    fn full_chain_approval_reaches_approved_with_increasing_steps() {
        let engine = engine();
        let mut request = request();
        let chain = [
            actor("E001", ENGINEERING, MANAGER),
            actor("E002", ENGINEERING, DIRECTOR),
            actor("E010", HR, RECRUITER),
            actor("E011", HR, MANAGER),
            actor("E012", HR, DIRECTOR),
            actor("E020", MGMT, EXECUTIVE),
        ];

        let mut steps = vec![0];
        for approver in &chain {
            steps.push(
                apply(&engine, &mut request, approver, DecisionAction::Approve)
                    .expect("each lane approves in turn"),
            );
        }

        assert_eq!(steps, vec![0, 1, 2, 3, 4, 5, 6]);
        assert_eq!(request.status.hr, HrStatus::HrDirectorApproved);
        assert_eq!(request.status.management, ManagementStatus::MgmtApproved);
        assert_eq!(request.status.overall, OverallStatus::Approved);
    }

    #[test]
    fn hr_director_approval_opens_management_track() {
        let mut status = RequestStatus::submitted();
        status.origin = OriginStatus::DirApproved;
        status.hr = HrStatus::WaitingHrDirector;

        let outcome = transition(&status, Lane::HrDirector, DecisionAction::Approve)
            .expect("hr director approves");
        assert_eq!(outcome.to.management, ManagementStatus::WaitingManagement);
        assert_eq!(outcome.to.overall, OverallStatus::WaitingManagement);
        assert_eq!(tracks_changed(&outcome.from, &outcome.to), 2);
    }

    #[test]
    fn repeated_decision_fails_on_precondition() {
        let engine = engine();
        let mut request = request();
        let manager = actor("E001", ENGINEERING, MANAGER);

        apply(&engine, &mut request, &manager, DecisionAction::Approve).expect("first approval");
        let error = apply(&engine, &mut request, &manager, DecisionAction::Approve)
            .expect_err("second approval is stale");
        assert!(matches!(error, DecisionError::WrongState { lane: Lane::Manager, .. }));
    }

    #[test]
    fn return_parks_the_lane_track_without_rejecting() {
        let engine = engine();
        let mut request = request();
        let manager = actor("E001", ENGINEERING, MANAGER);

        apply(&engine, &mut request, &manager, DecisionAction::Return).expect("manager returns");
        assert_eq!(request.status.origin, OriginStatus::Returned);
        assert_eq!(request.status.overall, OverallStatus::InProgress);

        for approver in [manager, actor("E002", ENGINEERING, DIRECTOR)] {
            assert!(matches!(
                engine.decide(&request, &approver, DecisionAction::Approve),
                Err(DecisionError::WrongState { .. })
            ));
        }
    }

    #[test]
    fn section_scoped_manager_cannot_decide_other_section() {
        let engine = engine();
        let mut request = request();
        request.section_id = Some(SectionId(3));
        let mut manager = actor("E001", ENGINEERING, MANAGER);
        manager.section_id = Some(SectionId(4));

        assert_eq!(
            engine.decide(&request, &manager, DecisionAction::Approve),
            Err(DecisionError::NoLane)
        );
    }

    #[test]
    fn every_transition_keeps_overall_consistent_with_tracks() {
        let reachable = reachable_statuses();
        assert!(reachable.len() > 10);

        for status in &reachable {
            assert_eq!(
                status.overall == OverallStatus::Rejected,
                status.has_rejection(),
                "overall/rejection mismatch in {status:?}"
            );
            assert_eq!(
                status.overall == OverallStatus::Approved,
                status.management == ManagementStatus::MgmtApproved,
                "overall/approval mismatch in {status:?}"
            );
        }
    }

    #[test]
    fn only_hand_offs_touch_two_tracks() {
        for status in reachable_statuses() {
            for lane in Lane::ALL {
                for action in [DecisionAction::Approve, DecisionAction::Reject, DecisionAction::Return]
                {
                    let Ok(outcome) = transition(&status, lane, action) else {
                        continue;
                    };
                    let changed = tracks_changed(&outcome.from, &outcome.to);
                    let hand_off = action == DecisionAction::Approve
                        && matches!(lane, Lane::Director | Lane::HrDirector);
                    if hand_off {
                        assert!(changed <= 2, "{lane} {action:?} changed {changed} tracks");
                    } else {
                        assert_eq!(changed, 1, "{lane} {action:?} changed {changed} tracks");
                    }
                }
            }
        }
    }

    #[test]
    fn history_entry_carries_lane_step_and_action() {
        let outcome = transition(&RequestStatus::submitted(), Lane::Manager, DecisionAction::Reject)
            .expect("manager rejects");
        let entry = outcome.history_entry(
            RequestId(9),
            EmployeeId("E001".to_string()),
            "budget frozen",
            Utc::now(),
        );

        assert_eq!(entry.step, 1);
        assert_eq!(entry.action, HistoryAction::Reject);
        assert_eq!(entry.notes, "budget frozen");
    }

    #[test]
    fn unknown_action_is_invalid() {
        assert_eq!(DecisionAction::parse("APPROVE"), Ok(DecisionAction::Approve));
        for loose in ["approve", " Reject ", "Return", "APPROVE "] {
            assert_eq!(
                DecisionAction::parse(loose),
                Err(DecisionError::InvalidAction(loose.to_string())),
                "`{loose}` is outside the closed action set"
            );
        }
        assert_eq!(
            DecisionAction::parse("escalate"),
            Err(DecisionError::InvalidAction("escalate".to_string()))
        );
    }

    fn reachable_statuses() -> Vec<RequestStatus> {
        let mut seen = vec![RequestStatus::submitted()];
        let mut frontier = seen.clone();
        while let Some(status) = frontier.pop() {
            for lane in Lane::ALL {
                for action in [DecisionAction::Approve, DecisionAction::Reject, DecisionAction::Return]
                {
                    if let Ok(outcome) = transition(&status, lane, action) {
                        if !seen.contains(&outcome.to) {
                            seen.push(outcome.to);
                            frontier.push(outcome.to);
                        }
                    }
                }
            }
        }
        seen
    }
}
