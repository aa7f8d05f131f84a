use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite};
use tracing::{debug, warn};

use manpower_core::audit::NewHistoryEntry;
use manpower_core::domain::actor::{Actor, EmployeeId};
use manpower_core::domain::doc_number::DocNumber;
use manpower_core::domain::request::{
    DepartmentId, HrStatus, ManagementStatus, ManpowerRequest, NewManpowerRequest, OriginStatus,
    OverallStatus, PositionId, RequestId, RequestStatus, Requirement, SectionId,
};
use manpower_core::workflow::{DecisionAction, PendingFilter, WorkflowEngine};

use super::history::insert_history;
use super::{
    advance_timestamp, format_timestamp, now_micros, parse_timestamp, DecisionRecord,
    RepositoryError, RequestRepository, SubmitPolicy,
};
use crate::DbPool;

const REQUEST_COLUMNS: &str = "request_id, doc_number, doc_date, requesting_dept_id, \
     requesting_section_id, requesting_pos_id, employee_id, required_position_name, headcount, \
     employment_type_id, contract_type_id, reason_id, min_age, max_age, gender_id, \
     nationality_id, experience_id, education_level_id, special_qualifications, \
     target_hire_date, origin_status, hr_status, management_status, overall_status, \
     created_at, updated_at";

const DOC_DATE_FORMAT: &str = "%Y-%m-%d";

pub struct SqlRequestRepository {
    pool: DbPool,
    policy: SubmitPolicy,
}

impl SqlRequestRepository {
    pub fn new(pool: DbPool) -> Self {
        Self::with_policy(pool, SubmitPolicy::default())
    }

    pub fn with_policy(pool: DbPool, policy: SubmitPolicy) -> Self {
        Self { pool, policy }
    }

    /// One submission attempt. The INSERT computes the next sequence for the
    /// month itself, so the write lock is held from the first statement.
    async fn try_submit(
        &self,
        request: &NewManpowerRequest,
        now: DateTime<Utc>,
    ) -> Result<ManpowerRequest, RepositoryError> {
        let period = DocNumber::period_prefix(&self.policy.doc_number_prefix, now);
        let period_len = period.len() as i64;
        let requirement = &request.requirement;
        let status = RequestStatus::submitted();
        let timestamp = format_timestamp(now);

        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            "INSERT INTO manpower_requests (
                doc_number, doc_date, requesting_dept_id, requesting_section_id,
                requesting_pos_id, employee_id, required_position_name, headcount,
                employment_type_id, contract_type_id, reason_id, min_age, max_age,
                gender_id, nationality_id, experience_id, education_level_id,
                special_qualifications, target_hire_date, origin_status, hr_status,
                management_status, overall_status, created_at, updated_at
             ) VALUES (
                ?1 || printf('%04d', COALESCE((
                    SELECT MAX(CAST(substr(doc_number, ?2 + 1) AS INTEGER))
                    FROM manpower_requests
                    WHERE substr(doc_number, 1, ?2) = ?1
                ), 0) + 1),
                ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18,
                ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?25
             )
             RETURNING request_id, doc_number",
        )
        .bind(&period)
        .bind(period_len)
        .bind(now.date_naive().format(DOC_DATE_FORMAT).to_string())
        .bind(request.department_id.0)
        .bind(request.section_id.map(|section| section.0))
        .bind(request.position_id.0)
        .bind(&request.employee_id.0)
        .bind(requirement.required_position_name.trim())
        .bind(i64::from(requirement.headcount))
        .bind(requirement.employment_type_id)
        .bind(requirement.contract_type_id)
        .bind(requirement.reason_id)
        .bind(requirement.min_age.map(i64::from))
        .bind(requirement.max_age.map(i64::from))
        .bind(requirement.gender_id)
        .bind(requirement.nationality_id)
        .bind(requirement.experience_id)
        .bind(requirement.education_level_id)
        .bind(&requirement.special_qualifications)
        .bind(requirement.target_hire_date.map(|date| date.format(DOC_DATE_FORMAT).to_string()))
        .bind(status.origin.as_str())
        .bind(status.hr.as_str())
        .bind(status.management.as_str())
        .bind(status.overall.as_str())
        .bind(&timestamp)
        .fetch_one(&mut *tx)
        .await?;

        let id = RequestId(row.try_get("request_id")?);
        let doc_number = DocNumber(row.try_get("doc_number")?);

        insert_history(
            &mut *tx,
            &NewHistoryEntry::submission(id, request.employee_id.clone(), now),
        )
        .await?;

        tx.commit().await?;

        let mut requirement = requirement.clone();
        requirement.required_position_name = requirement.required_position_name.trim().to_string();

        Ok(ManpowerRequest {
            id,
            doc_number,
            doc_date: now.date_naive(),
            department_id: request.department_id,
            section_id: request.section_id,
            position_id: request.position_id,
            employee_id: request.employee_id.clone(),
            requirement,
            status,
            created_at: now,
            updated_at: now,
        })
    }
}

#[async_trait]
impl RequestRepository for SqlRequestRepository {
    async fn submit(
        &self,
        request: NewManpowerRequest,
    ) -> Result<ManpowerRequest, RepositoryError> {
        request.validate()?;

        let mut attempt = 1;
        loop {
            match self.try_submit(&request, now_micros()).await {
                Err(RepositoryError::Database(sqlx::Error::Database(error)))
                    if error.is_unique_violation() && attempt < self.policy.retry_limit =>
                {
                    debug!(
                        event_name = "ledger.submit.retry",
                        attempt,
                        error = %error,
                        "document number collided; retrying submission"
                    );
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    async fn find_by_id(&self, id: RequestId) -> Result<Option<ManpowerRequest>, RepositoryError> {
        let sql = format!("SELECT {REQUEST_COLUMNS} FROM manpower_requests WHERE request_id = ?");
        let row = sqlx::query(&sql).bind(id.0).fetch_optional(&self.pool).await?;

        row.as_ref().map(row_to_request).transpose()
    }

    async fn list_all(&self) -> Result<Vec<ManpowerRequest>, RepositoryError> {
        let sql = format!(
            "SELECT {REQUEST_COLUMNS} FROM manpower_requests
             ORDER BY created_at DESC, request_id DESC"
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        Ok(decode_rows(&rows))
    }

    async fn list_pending(
        &self,
        filter: &PendingFilter,
    ) -> Result<Vec<ManpowerRequest>, RepositoryError> {
        let mut builder: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new(format!("SELECT {REQUEST_COLUMNS} FROM manpower_requests WHERE "));
        builder.push(filter.awaiting.column()).push(" = ").push_bind(filter.awaiting.value());

        if let Some(department) = filter.department {
            builder.push(" AND requesting_dept_id = ").push_bind(department.0);
        }
        // NULL sections pass, matching `PendingFilter::matches`.
        if let Some(section) = filter.section {
            builder
                .push(" AND (requesting_section_id IS NULL OR requesting_section_id = ")
                .push_bind(section.0)
                .push(")");
        }
        if let Some(department) = filter.exclude_department {
            builder.push(" AND requesting_dept_id <> ").push_bind(department.0);
        }
        builder.push(" ORDER BY created_at DESC, request_id DESC");

        let rows = builder.build().fetch_all(&self.pool).await?;
        Ok(decode_rows(&rows))
    }

    async fn apply_decision(
        &self,
        id: RequestId,
        engine: &WorkflowEngine,
        actor: &Actor,
        action: DecisionAction,
        notes: &str,
    ) -> Result<DecisionRecord, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        // Taking the write lock first serializes concurrent decisions on this
        // row until commit or rollback.
        let locked = sqlx::query(
            "UPDATE manpower_requests SET lock_version = lock_version + 1 WHERE request_id = ?",
        )
        .bind(id.0)
        .execute(&mut *tx)
        .await?;
        if locked.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(id));
        }

        let sql = format!("SELECT {REQUEST_COLUMNS} FROM manpower_requests WHERE request_id = ?");
        let row = sqlx::query(&sql).bind(id.0).fetch_one(&mut *tx).await?;
        let current = row_to_request(&row)?;

        let outcome = engine.decide(&current, actor, action)?;
        let updated_at = advance_timestamp(current.updated_at, now_micros());

        sqlx::query(
            "UPDATE manpower_requests
             SET origin_status = ?, hr_status = ?, management_status = ?, overall_status = ?,
                 updated_at = ?
             WHERE request_id = ?",
        )
        .bind(outcome.to.origin.as_str())
        .bind(outcome.to.hr.as_str())
        .bind(outcome.to.management.as_str())
        .bind(outcome.to.overall.as_str())
        .bind(format_timestamp(updated_at))
        .bind(id.0)
        .execute(&mut *tx)
        .await?;

        let history = insert_history(
            &mut *tx,
            &outcome.history_entry(id, actor.employee_id.clone(), notes, updated_at),
        )
        .await?;

        tx.commit().await?;

        let request = ManpowerRequest { status: outcome.to, updated_at, ..current };
        Ok(DecisionRecord { request, outcome, history })
    }
}

fn decode_rows(rows: &[SqliteRow]) -> Vec<ManpowerRequest> {
    rows.iter()
        .filter_map(|row| match row_to_request(row) {
            Ok(request) => Some(request),
            Err(error) => {
                let request_id: Option<i64> = row.try_get("request_id").ok();
                warn!(
                    event_name = "ledger.row.decode_failed",
                    request_id = ?request_id,
                    error = %error,
                    "skipping request row that could not be decoded"
                );
                None
            }
        })
        .collect()
}

fn column<'r, T>(row: &'r SqliteRow, name: &str) -> Result<T, RepositoryError>
where
    T: sqlx::Decode<'r, Sqlite> + sqlx::Type<Sqlite>,
{
    row.try_get(name).map_err(|e| RepositoryError::Decode(format!("`{name}`: {e}")))
}

fn optional_u32(name: &str, value: Option<i64>) -> Result<Option<u32>, RepositoryError> {
    value
        .map(|raw| {
            u32::try_from(raw)
                .map_err(|_| RepositoryError::Decode(format!("`{name}` out of range: {raw}")))
        })
        .transpose()
}

fn parse_date(name: &str, value: &str) -> Result<NaiveDate, RepositoryError> {
    NaiveDate::parse_from_str(value, DOC_DATE_FORMAT)
        .map_err(|error| RepositoryError::Decode(format!("invalid date in `{name}`: `{value}` ({error})")))
}

fn parse_status<T>(name: &str, value: String, parse: fn(&str) -> Option<T>) -> Result<T, RepositoryError> {
    parse(&value).ok_or_else(|| RepositoryError::Decode(format!("unknown `{name}` value `{value}`")))
}

fn row_to_request(row: &SqliteRow) -> Result<ManpowerRequest, RepositoryError> {
    let headcount: i64 = column(row, "headcount")?;
    let headcount = u32::try_from(headcount)
        .map_err(|_| RepositoryError::Decode(format!("`headcount` out of range: {headcount}")))?;
    let doc_date: String = column(row, "doc_date")?;
    let target_hire_date: Option<String> = column(row, "target_hire_date")?;

    let requirement = Requirement {
        required_position_name: column(row, "required_position_name")?,
        headcount,
        employment_type_id: column(row, "employment_type_id")?,
        contract_type_id: column(row, "contract_type_id")?,
        reason_id: column(row, "reason_id")?,
        min_age: optional_u32("min_age", column(row, "min_age")?)?,
        max_age: optional_u32("max_age", column(row, "max_age")?)?,
        gender_id: column(row, "gender_id")?,
        nationality_id: column(row, "nationality_id")?,
        experience_id: column(row, "experience_id")?,
        education_level_id: column(row, "education_level_id")?,
        special_qualifications: column(row, "special_qualifications")?,
        target_hire_date: target_hire_date
            .map(|value| parse_date("target_hire_date", &value))
            .transpose()?,
    };

    let status = RequestStatus {
        origin: parse_status("origin_status", column(row, "origin_status")?, OriginStatus::parse)?,
        hr: parse_status("hr_status", column(row, "hr_status")?, HrStatus::parse)?,
        management: parse_status(
            "management_status",
            column(row, "management_status")?,
            ManagementStatus::parse,
        )?,
        overall: parse_status(
            "overall_status",
            column(row, "overall_status")?,
            OverallStatus::parse,
        )?,
    };

    Ok(ManpowerRequest {
        id: RequestId(column(row, "request_id")?),
        doc_number: DocNumber(column(row, "doc_number")?),
        doc_date: parse_date("doc_date", &doc_date)?,
        department_id: DepartmentId(column(row, "requesting_dept_id")?),
        section_id: column::<Option<i64>>(row, "requesting_section_id")?.map(SectionId),
        position_id: PositionId(column(row, "requesting_pos_id")?),
        employee_id: EmployeeId(column(row, "employee_id")?),
        requirement,
        status,
        created_at: parse_timestamp("created_at", column(row, "created_at")?)?,
        updated_at: parse_timestamp("updated_at", column(row, "updated_at")?)?,
    })
}
