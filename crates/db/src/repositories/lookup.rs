use std::fmt;

use async_trait::async_trait;
use tracing::warn;

use manpower_core::config::WorkflowConfig;
use manpower_core::domain::request::{DepartmentId, PositionId};
use manpower_core::workflow::{OrgDirectory, PositionRole};

use super::{LookupRepository, RepositoryError};
use crate::DbPool;

/// Master-data tables that can be resolved by display name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LookupKind {
    Department,
    Section,
    Position,
    EmploymentType,
    ContractType,
    RequestReason,
    Gender,
    Nationality,
    Experience,
    EducationLevel,
}

impl LookupKind {
    pub const ALL: [LookupKind; 10] = [
        LookupKind::Department,
        LookupKind::Section,
        LookupKind::Position,
        LookupKind::EmploymentType,
        LookupKind::ContractType,
        LookupKind::RequestReason,
        LookupKind::Gender,
        LookupKind::Nationality,
        LookupKind::Experience,
        LookupKind::EducationLevel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Department => "department",
            Self::Section => "section",
            Self::Position => "position",
            Self::EmploymentType => "employment_type",
            Self::ContractType => "contract_type",
            Self::RequestReason => "request_reason",
            Self::Gender => "gender",
            Self::Nationality => "nationality",
            Self::Experience => "experience",
            Self::EducationLevel => "education_level",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL.into_iter().find(|kind| kind.as_str() == normalized)
    }

    /// `(table, id column, name column)`.
    pub(crate) fn columns(&self) -> (&'static str, &'static str, &'static str) {
        match self {
            Self::Department => ("departments", "dept_id", "dept_name"),
            Self::Section => ("sections", "section_id", "section_name"),
            Self::Position => ("positions", "pos_id", "pos_name"),
            Self::EmploymentType => ("employment_types", "id", "name"),
            Self::ContractType => ("contract_types", "id", "name"),
            Self::RequestReason => ("request_reasons", "id", "name"),
            Self::Gender => ("genders", "id", "name"),
            Self::Nationality => ("nationalities", "id", "name"),
            Self::Experience => ("experiences", "id", "name"),
            Self::EducationLevel => ("education_levels", "id", "name"),
        }
    }
}

impl fmt::Display for LookupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct SqlLookupRepository {
    pool: DbPool,
}

impl SqlLookupRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn require(&self, kind: LookupKind, name: &str) -> Result<i64, RepositoryError> {
        self.id_by_name(kind, name)
            .await?
            .ok_or_else(|| RepositoryError::MissingLookup { kind, name: name.to_string() })
    }
}

#[async_trait]
impl LookupRepository for SqlLookupRepository {
    async fn id_by_name(
        &self,
        kind: LookupKind,
        name: &str,
    ) -> Result<Option<i64>, RepositoryError> {
        let (table, id_column, name_column) = kind.columns();
        let sql = format!("SELECT {id_column} FROM {table} WHERE {name_column} = ? LIMIT 1");

        let id: Option<i64> = sqlx::query_scalar(&sql)
            .bind(name.trim())
            .fetch_optional(&self.pool)
            .await?;
        Ok(id)
    }

    async fn org_directory(
        &self,
        config: &WorkflowConfig,
    ) -> Result<OrgDirectory, RepositoryError> {
        let hr_department = self.require(LookupKind::Department, &config.hr_department).await?;
        let management_department =
            self.require(LookupKind::Department, &config.management_department).await?;

        let mut directory =
            OrgDirectory::new(DepartmentId(hr_department), DepartmentId(management_department));

        for (role, name) in [
            (PositionRole::Manager, &config.manager_position),
            (PositionRole::Director, &config.director_position),
            (PositionRole::Recruiter, &config.recruiter_position),
        ] {
            match self.id_by_name(LookupKind::Position, name).await? {
                Some(id) => directory = directory.with_position(PositionId(id), role),
                None => warn!(
                    event_name = "org.directory.position_missing",
                    position = %name,
                    role = ?role,
                    "configured position does not exist; no actor can hold this role"
                ),
            }
        }

        Ok(directory)
    }
}
