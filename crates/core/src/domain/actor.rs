use serde::{Deserialize, Serialize};

use crate::domain::request::{DepartmentId, PositionId, SectionId};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmployeeId(pub String);

/// The calling employee, as vouched for by the identity provider.
///
/// The workflow trusts this tuple as-is; credentials are checked before it is built.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub employee_id: EmployeeId,
    pub department_id: DepartmentId,
    pub section_id: Option<SectionId>,
    pub position_id: PositionId,
    pub role_name: String,
}
