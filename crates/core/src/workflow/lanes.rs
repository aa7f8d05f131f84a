use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::actor::Actor;
use crate::domain::request::{DepartmentId, ManpowerRequest, PositionId, SectionId};

/// Approval lanes in workflow order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Lane {
    #[serde(rename = "MGR")]
    Manager,
    #[serde(rename = "DIR")]
    Director,
    Recruiter,
    #[serde(rename = "HRMGR")]
    HrManager,
    #[serde(rename = "HRDIR")]
    HrDirector,
    #[serde(rename = "MGMT")]
    Management,
}

impl Lane {
    pub const ALL: [Lane; 6] = [
        Lane::Manager,
        Lane::Director,
        Lane::Recruiter,
        Lane::HrManager,
        Lane::HrDirector,
        Lane::Management,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manager => "MGR",
            Self::Director => "DIR",
            Self::Recruiter => "RECRUITER",
            Self::HrManager => "HRMGR",
            Self::HrDirector => "HRDIR",
            Self::Management => "MGMT",
        }
    }

    /// Audit step number recorded for a decision taken in this lane.
    pub fn step(&self) -> u8 {
        match self {
            Self::Manager => 1,
            Self::Director => 2,
            Self::Recruiter => 3,
            Self::HrManager => 4,
            Self::HrDirector => 5,
            Self::Management => 6,
        }
    }

    pub fn is_department_scoped(&self) -> bool {
        matches!(self, Self::Manager | Self::Director)
    }

    pub fn is_hr(&self) -> bool {
        matches!(self, Self::Recruiter | Self::HrManager | Self::HrDirector)
    }
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Workflow meaning of a position, independent of department.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionRole {
    Manager,
    Director,
    Recruiter,
}

/// Organization facts the resolver needs, fixed at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrgDirectory {
    pub hr_department: DepartmentId,
    pub management_department: DepartmentId,
    position_roles: HashMap<PositionId, PositionRole>,
}

impl OrgDirectory {
    pub fn new(hr_department: DepartmentId, management_department: DepartmentId) -> Self {
        Self { hr_department, management_department, position_roles: HashMap::new() }
    }

    pub fn with_position(mut self, position: PositionId, role: PositionRole) -> Self {
        self.position_roles.insert(position, role);
        self
    }

    pub fn role_of(&self, position: PositionId) -> Option<PositionRole> {
        self.position_roles.get(&position).copied()
    }

    pub fn positions_with_role(&self, role: PositionRole) -> Vec<PositionId> {
        let mut positions: Vec<PositionId> = self
            .position_roles
            .iter()
            .filter(|(_, candidate)| **candidate == role)
            .map(|(position, _)| *position)
            .collect();
        positions.sort_by_key(|position| position.0);
        positions
    }

    /// Lane the actor occupies by organization alone, before any
    /// request-specific scoping.
    pub fn home_lane(&self, actor: &Actor) -> Option<Lane> {
        let role = self.role_of(actor.position_id);

        if actor.department_id == self.hr_department {
            return match role? {
                PositionRole::Recruiter => Some(Lane::Recruiter),
                PositionRole::Manager => Some(Lane::HrManager),
                PositionRole::Director => Some(Lane::HrDirector),
            };
        }

        if actor.department_id == self.management_department {
            return Some(Lane::Management);
        }

        match role? {
            PositionRole::Manager => Some(Lane::Manager),
            PositionRole::Director => Some(Lane::Director),
            PositionRole::Recruiter => None,
        }
    }

    /// Lane the actor occupies for this particular request, if any.
    pub fn resolve_lane(&self, request: &ManpowerRequest, actor: &Actor) -> Option<Lane> {
        resolve_lane(self, request.department_id, request.section_id, actor)
    }
}

pub fn resolve_lane(
    directory: &OrgDirectory,
    request_department: DepartmentId,
    request_section: Option<SectionId>,
    actor: &Actor,
) -> Option<Lane> {
    let lane = directory.home_lane(actor)?;
    if !lane.is_department_scoped() {
        return Some(lane);
    }

    if actor.department_id != request_department {
        return None;
    }

    // Managers are section-scoped; directors cover the whole department.
    if lane == Lane::Manager {
        if let (Some(requested), Some(own)) = (request_section, actor.section_id) {
            if requested != own {
                return None;
            }
        }
    }

    Some(lane)
}
