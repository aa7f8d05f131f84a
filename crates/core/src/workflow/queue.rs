use crate::domain::actor::Actor;
use crate::domain::request::{
    DepartmentId, HrStatus, ManagementStatus, ManpowerRequest, OriginStatus, SectionId,
};
use crate::workflow::lanes::{Lane, OrgDirectory};

/// The single track value a lane waits on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AwaitedState {
    Origin(OriginStatus),
    Hr(HrStatus),
    Management(ManagementStatus),
}

impl AwaitedState {
    pub fn for_lane(lane: Lane) -> Self {
        match lane {
            Lane::Manager => Self::Origin(OriginStatus::Submitted),
            Lane::Director => Self::Origin(OriginStatus::MgrApproved),
            Lane::Recruiter => Self::Hr(HrStatus::WaitingRecruiter),
            Lane::HrManager => Self::Hr(HrStatus::WaitingHrManager),
            Lane::HrDirector => Self::Hr(HrStatus::WaitingHrDirector),
            Lane::Management => Self::Management(ManagementStatus::WaitingManagement),
        }
    }

    /// Ledger column holding the awaited track.
    pub fn column(&self) -> &'static str {
        match self {
            Self::Origin(_) => "origin_status",
            Self::Hr(_) => "hr_status",
            Self::Management(_) => "management_status",
        }
    }

    pub fn value(&self) -> &'static str {
        match self {
            Self::Origin(status) => status.as_str(),
            Self::Hr(status) => status.as_str(),
            Self::Management(status) => status.as_str(),
        }
    }

    pub fn matches(&self, request: &ManpowerRequest) -> bool {
        match self {
            Self::Origin(status) => request.status.origin == *status,
            Self::Hr(status) => request.status.hr == *status,
            Self::Management(status) => request.status.management == *status,
        }
    }
}

/// Read-side inverse of lane resolution: which requests wait on an actor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingFilter {
    pub lane: Lane,
    pub awaiting: AwaitedState,
    pub department: Option<DepartmentId>,
    /// Sectioned requests must carry this section; unsectioned ones always pass.
    pub section: Option<SectionId>,
    pub exclude_department: Option<DepartmentId>,
}

impl PendingFilter {
    /// `None` when the actor occupies no lane, so nothing is pending for them.
    pub fn for_actor(directory: &OrgDirectory, actor: &Actor) -> Option<Self> {
        let lane = directory.home_lane(actor)?;
        let mut filter = Self {
            lane,
            awaiting: AwaitedState::for_lane(lane),
            department: None,
            section: None,
            exclude_department: None,
        };

        match lane {
            Lane::Manager => {
                filter.department = Some(actor.department_id);
                filter.section = actor.section_id;
            }
            Lane::Director => filter.department = Some(actor.department_id),
            Lane::Recruiter | Lane::HrManager | Lane::HrDirector => {
                filter.exclude_department = Some(directory.hr_department);
            }
            Lane::Management => {}
        }

        Some(filter)
    }

    pub fn matches(&self, request: &ManpowerRequest) -> bool {
        if !self.awaiting.matches(request) {
            return false;
        }
        if self.department.is_some_and(|department| request.department_id != department) {
            return false;
        }
        if self.exclude_department.is_some_and(|department| request.department_id == department) {
            return false;
        }
        // Unsectioned requests stay visible to sectioned managers, as in `resolve_lane`;
        // a strict `section = ?` filter would hide them.
        match (self.section, request.section_id) {
            (Some(own), Some(requested)) => own == requested,
            _ => true,
        }
    }
}
