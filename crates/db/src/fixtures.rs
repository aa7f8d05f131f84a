use sqlx::Executor;

use crate::connection::DbPool;
use crate::repositories::{LookupKind, RepositoryError};

/// Row counts the baseline organization seed guarantees per lookup table.
const SEED_TABLES: &[SeedTableContract] = &[
    SeedTableContract { kind: LookupKind::Department, expected_rows: 4 },
    SeedTableContract { kind: LookupKind::Section, expected_rows: 5 },
    SeedTableContract { kind: LookupKind::Position, expected_rows: 5 },
    SeedTableContract { kind: LookupKind::EmploymentType, expected_rows: 3 },
    SeedTableContract { kind: LookupKind::ContractType, expected_rows: 3 },
    SeedTableContract { kind: LookupKind::RequestReason, expected_rows: 3 },
    SeedTableContract { kind: LookupKind::Gender, expected_rows: 3 },
    SeedTableContract { kind: LookupKind::Nationality, expected_rows: 2 },
    SeedTableContract { kind: LookupKind::Experience, expected_rows: 4 },
    SeedTableContract { kind: LookupKind::EducationLevel, expected_rows: 4 },
];

/// Names the default workflow configuration resolves against.
const SEED_ANCHORS: &[(LookupKind, &str)] = &[
    (LookupKind::Department, "Human Resources"),
    (LookupKind::Department, "Management"),
    (LookupKind::Position, "Manager"),
    (LookupKind::Position, "Director"),
    (LookupKind::Position, "HR Recruiter"),
];

/// Baseline organization and master data for local runs and tests.
///
/// Loading is idempotent: every insert is `INSERT OR IGNORE` keyed on the
/// fixed ids, so re-running never duplicates or overwrites rows.
pub struct OrgSeedDataset;

impl OrgSeedDataset {
    pub const SQL: &str = include_str!("../../../config/fixtures/org_seed.sql");

    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;
        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        let mut tables_seeded = Vec::with_capacity(SEED_TABLES.len());
        for table in SEED_TABLES {
            tables_seeded.push(SeedTableInfo {
                kind: table.kind,
                rows: table.row_count(pool).await?,
            });
        }

        Ok(SeedResult { tables_seeded })
    }

    /// Checks that the seeded tables hold at least the contracted rows and
    /// that the names the default configuration needs are present.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        for table in SEED_TABLES {
            let rows = table.row_count(pool).await?;
            checks.push((table.kind.as_str(), rows >= table.expected_rows));
        }

        for (kind, name) in SEED_ANCHORS {
            let (table, _, name_column) = kind.columns();
            let present: i64 = sqlx::query_scalar(&format!(
                "SELECT EXISTS(SELECT 1 FROM {table} WHERE {name_column} = ?1)"
            ))
            .bind(*name)
            .fetch_one(pool)
            .await?;
            checks.push((*name, present == 1));
        }

        let all_present = checks.iter().all(|(_, present)| *present);
        Ok(VerificationResult { all_present, checks })
    }
}

#[derive(Debug, Clone, Copy)]
struct SeedTableContract {
    kind: LookupKind,
    expected_rows: i64,
}

impl SeedTableContract {
    async fn row_count(&self, pool: &DbPool) -> Result<i64, RepositoryError> {
        let (table, _, _) = self.kind.columns();
        let rows: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(1) FROM {table}")).fetch_one(pool).await?;
        Ok(rows)
    }
}

#[derive(Debug)]
pub struct SeedResult {
    pub tables_seeded: Vec<SeedTableInfo>,
}

#[derive(Debug)]
pub struct SeedTableInfo {
    pub kind: LookupKind,
    pub rows: i64,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{connect_with_settings, migrations};

    #[test]
    fn sql_fixture_is_valid() {
        assert!(!OrgSeedDataset::SQL.is_empty());
        assert!(OrgSeedDataset::SQL.contains("INSERT OR IGNORE"));
    }

    #[tokio::test]
    async fn verify_seed_contract_and_idempotency() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30)
            .await
            .expect("connect to test database");
        migrations::run_pending(&pool).await.expect("run migrations");

        let first = OrgSeedDataset::load(&pool).await.expect("load seed fixtures");
        let first_verification = OrgSeedDataset::verify(&pool).await.expect("verify seed fixtures");
        assert!(first_verification.all_present, "{:?}", first_verification.checks);
        assert_eq!(first.tables_seeded.len(), SEED_TABLES.len());

        let second = OrgSeedDataset::load(&pool).await.expect("reload seed fixtures");
        let second_verification =
            OrgSeedDataset::verify(&pool).await.expect("re-verify seed fixtures");
        assert!(second_verification.all_present);
        assert_eq!(first_verification.checks, second_verification.checks);

        let first_rows: Vec<i64> = first.tables_seeded.iter().map(|table| table.rows).collect();
        let second_rows: Vec<i64> = second.tables_seeded.iter().map(|table| table.rows).collect();
        assert_eq!(first_rows, second_rows);
    }

    #[tokio::test]
    async fn verify_reports_missing_anchor() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30)
            .await
            .expect("connect to test database");
        migrations::run_pending(&pool).await.expect("run migrations");
        OrgSeedDataset::load(&pool).await.expect("load seed fixtures");

        sqlx::query("UPDATE positions SET pos_name = 'Talent Partner' WHERE pos_name = 'HR Recruiter'")
            .execute(&pool)
            .await
            .expect("rename position");

        let verification = OrgSeedDataset::verify(&pool).await.expect("verify");
        assert!(!verification.all_present);
        assert!(verification.checks.contains(&("HR Recruiter", false)));
    }

    #[tokio::test]
    async fn sections_belong_to_seeded_departments() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30)
            .await
            .expect("connect to test database");
        migrations::run_pending(&pool).await.expect("run migrations");
        OrgSeedDataset::load(&pool).await.expect("load seed fixtures");

        let orphans: i64 = sqlx::query_scalar(
            "SELECT COUNT(1) FROM sections s LEFT JOIN departments d ON d.dept_id = s.dept_id
             WHERE d.dept_id IS NULL",
        )
        .fetch_one(&pool)
        .await
        .expect("count orphans");
        assert_eq!(orphans, 0);
    }
}
