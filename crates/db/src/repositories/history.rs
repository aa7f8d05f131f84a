use async_trait::async_trait;
use chrono::SubsecRound;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use manpower_core::audit::{ApprovalHistoryEntry, HistoryAction, NewHistoryEntry};
use manpower_core::domain::actor::EmployeeId;
use manpower_core::domain::request::RequestId;

use super::{format_timestamp, parse_timestamp, HistoryRepository, RepositoryError};
use crate::DbPool;

pub struct SqlHistoryRepository {
    pool: DbPool,
}

impl SqlHistoryRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HistoryRepository for SqlHistoryRepository {
    async fn list_for_request(
        &self,
        id: RequestId,
    ) -> Result<Vec<ApprovalHistoryEntry>, RepositoryError> {
        let exists: i64 =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM manpower_requests WHERE request_id = ?)")
                .bind(id.0)
                .fetch_one(&self.pool)
                .await?;
        if exists == 0 {
            return Err(RepositoryError::NotFound(id));
        }

        let rows = sqlx::query(
            "SELECT history_id, request_id, approver_id, step, action, notes, recorded_at
             FROM approval_history
             WHERE request_id = ?
             ORDER BY history_id ASC",
        )
        .bind(id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_history).collect()
    }
}

/// Appends one audit row on the caller's connection, normally inside the
/// transaction that changed the request.
pub(crate) async fn insert_history(
    conn: &mut SqliteConnection,
    entry: &NewHistoryEntry,
) -> Result<ApprovalHistoryEntry, RepositoryError> {
    let recorded_at = entry.recorded_at.trunc_subsecs(6);
    let history_id: i64 = sqlx::query_scalar(
        "INSERT INTO approval_history (request_id, approver_id, step, action, notes, recorded_at)
         VALUES (?, ?, ?, ?, ?, ?)
         RETURNING history_id",
    )
    .bind(entry.request_id.0)
    .bind(&entry.approver_id.0)
    .bind(i64::from(entry.step))
    .bind(entry.action.as_str())
    .bind(&entry.notes)
    .bind(format_timestamp(recorded_at))
    .fetch_one(&mut *conn)
    .await?;

    Ok(ApprovalHistoryEntry {
        id: history_id,
        request_id: entry.request_id,
        approver_id: entry.approver_id.clone(),
        step: entry.step,
        action: entry.action,
        notes: entry.notes.clone(),
        recorded_at,
    })
}

fn row_to_history(row: &SqliteRow) -> Result<ApprovalHistoryEntry, RepositoryError> {
    let step: i64 = row.try_get("step").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let step = u8::try_from(step)
        .map_err(|_| RepositoryError::Decode(format!("history step out of range: {step}")))?;
    let action: String =
        row.try_get("action").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let action = HistoryAction::parse(&action)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown history action `{action}`")))?;

    Ok(ApprovalHistoryEntry {
        id: row.try_get("history_id").map_err(|e| RepositoryError::Decode(e.to_string()))?,
        request_id: RequestId(
            row.try_get("request_id").map_err(|e| RepositoryError::Decode(e.to_string()))?,
        ),
        approver_id: EmployeeId(
            row.try_get("approver_id").map_err(|e| RepositoryError::Decode(e.to_string()))?,
        ),
        step,
        action,
        notes: row.try_get("notes").map_err(|e| RepositoryError::Decode(e.to_string()))?,
        recorded_at: parse_timestamp(
            "recorded_at",
            row.try_get("recorded_at").map_err(|e| RepositoryError::Decode(e.to_string()))?,
        )?,
    })
}
