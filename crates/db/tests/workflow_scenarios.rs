use std::collections::BTreeSet;
use std::sync::Arc;

use manpower_core::audit::{verify_trail, HistoryAction};
use manpower_core::config::WorkflowConfig;
use manpower_core::domain::actor::{Actor, EmployeeId};
use manpower_core::domain::request::{
    DepartmentId, HrStatus, ManagementStatus, ManpowerRequest, NewManpowerRequest, OriginStatus,
    OverallStatus, PositionId, Requirement, SectionId,
};
use manpower_core::errors::DomainError;
use manpower_core::workflow::{DecisionAction, DecisionError, Lane, WorkflowEngine};
use manpower_db::{
    connect_with_settings, migrations, DbPool, HistoryRepository, LookupRepository,
    OrgSeedDataset, RepositoryError, RequestRepository, SqlHistoryRepository,
    SqlLookupRepository, SqlRequestRepository,
};

const ENGINEERING: i64 = 5;
const FINANCE: i64 = 7;
const HR: i64 = 1;
const MANAGEMENT: i64 = 2;

const MANAGER: i64 = 1;
const DIRECTOR: i64 = 2;
const RECRUITER: i64 = 3;
const EXECUTIVE: i64 = 4;
const ENGINEER: i64 = 5;

struct Harness {
    pool: DbPool,
    requests: SqlRequestRepository,
    history: SqlHistoryRepository,
    engine: WorkflowEngine,
}

impl Harness {
    async fn on(pool: DbPool) -> Self {
        migrations::run_pending(&pool).await.expect("run migrations");
        OrgSeedDataset::load(&pool).await.expect("seed org data");

        let directory = SqlLookupRepository::new(pool.clone())
            .org_directory(&WorkflowConfig::default())
            .await
            .expect("resolve org directory");

        Self {
            requests: SqlRequestRepository::new(pool.clone()),
            history: SqlHistoryRepository::new(pool.clone()),
            engine: WorkflowEngine::new(directory),
            pool,
        }
    }

    async fn in_memory() -> Self {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        Self::on(pool).await
    }

    async fn decide(
        &self,
        request: &ManpowerRequest,
        actor: &Actor,
        action: DecisionAction,
    ) -> Result<ManpowerRequest, RepositoryError> {
        self.requests
            .apply_decision(request.id, &self.engine, actor, action, "")
            .await
            .map(|record| record.request)
    }
}

fn actor(employee: &str, department: i64, section: Option<i64>, position: i64) -> Actor {
    Actor {
        employee_id: EmployeeId(employee.to_string()),
        department_id: DepartmentId(department),
        section_id: section.map(SectionId),
        position_id: PositionId(position),
        role_name: "Approve".to_string(),
    }
}

fn engineering_request() -> NewManpowerRequest {
    NewManpowerRequest {
        department_id: DepartmentId(ENGINEERING),
        section_id: None,
        position_id: PositionId(ENGINEER),
        employee_id: EmployeeId("E100".to_string()),
        requirement: Requirement {
            required_position_name: "Site Reliability Engineer".to_string(),
            headcount: 1,
            employment_type_id: 1,
            contract_type_id: 1,
            reason_id: 1,
            min_age: Some(25),
            max_age: None,
            gender_id: Some(3),
            nationality_id: Some(2),
            experience_id: Some(3),
            education_level_id: Some(2),
            special_qualifications: "On-call experience".to_string(),
            target_hire_date: None,
        },
    }
}

#[tokio::test]
async fn manager_approval_moves_only_the_origin_track() {
    let harness = Harness::in_memory().await;
    let submitted = harness.requests.submit(engineering_request()).await.expect("submit");

    let approved = harness
        .decide(&submitted, &actor("M5", ENGINEERING, None, MANAGER), DecisionAction::Approve)
        .await
        .expect("manager approval");

    assert_eq!(approved.status.origin, OriginStatus::MgrApproved);
    assert_eq!(approved.status.hr, HrStatus::None);
    assert_eq!(approved.status.overall, OverallStatus::InProgress);
}

#[tokio::test]
async fn recruiter_rejection_halts_the_hr_track() {
    let harness = Harness::in_memory().await;
    let submitted = harness.requests.submit(engineering_request()).await.expect("submit");

    harness
        .decide(&submitted, &actor("M5", ENGINEERING, None, MANAGER), DecisionAction::Approve)
        .await
        .expect("manager approval");
    let director_approved = harness
        .decide(&submitted, &actor("D5", ENGINEERING, None, DIRECTOR), DecisionAction::Approve)
        .await
        .expect("director approval");
    assert_eq!(director_approved.status.origin, OriginStatus::DirApproved);
    assert_eq!(director_approved.status.hr, HrStatus::WaitingRecruiter);

    let rejected = harness
        .decide(&submitted, &actor("R1", HR, Some(1), RECRUITER), DecisionAction::Reject)
        .await
        .expect("recruiter rejection");
    assert_eq!(rejected.status.hr, HrStatus::RecruiterRejected);
    assert_eq!(rejected.status.overall, OverallStatus::Rejected);

    let error = harness
        .decide(&submitted, &actor("HM1", HR, None, MANAGER), DecisionAction::Approve)
        .await
        .expect_err("hr manager cannot act on a rejected request");
    assert!(matches!(
        error,
        RepositoryError::Domain(DomainError::Decision(DecisionError::WrongState {
            lane: Lane::HrManager,
            observed: "RECRUITER_REJECTED",
            ..
        }))
    ));
}

#[tokio::test]
async fn foreign_manager_is_refused_without_side_effects() {
    let harness = Harness::in_memory().await;
    let submitted = harness.requests.submit(engineering_request()).await.expect("submit");

    let error = harness
        .decide(&submitted, &actor("M7", FINANCE, None, MANAGER), DecisionAction::Approve)
        .await
        .expect_err("finance manager has no lane on engineering requests");
    assert!(matches!(error, RepositoryError::Domain(DomainError::Decision(DecisionError::NoLane))));

    let stored = harness.requests.find_by_id(submitted.id).await.expect("find").expect("present");
    assert_eq!(stored, submitted);
    let trail = harness.history.list_for_request(submitted.id).await.expect("history");
    assert_eq!(trail.len(), 1);
}

#[tokio::test]
async fn full_chain_approval_records_seven_steps() {
    let harness = Harness::in_memory().await;
    let submitted = harness.requests.submit(engineering_request()).await.expect("submit");

    let chain = [
        actor("M5", ENGINEERING, None, MANAGER),
        actor("D5", ENGINEERING, None, DIRECTOR),
        actor("R1", HR, Some(1), RECRUITER),
        actor("HM1", HR, None, MANAGER),
        actor("HD1", HR, None, DIRECTOR),
        actor("X2", MANAGEMENT, None, EXECUTIVE),
    ];

    let mut latest = submitted.clone();
    for approver in &chain {
        latest = harness.decide(&submitted, approver, DecisionAction::Approve).await.expect("approve");
    }

    assert_eq!(latest.status.origin, OriginStatus::DirApproved);
    assert_eq!(latest.status.hr, HrStatus::HrDirectorApproved);
    assert_eq!(latest.status.management, ManagementStatus::MgmtApproved);
    assert_eq!(latest.status.overall, OverallStatus::Approved);

    let trail = harness.history.list_for_request(submitted.id).await.expect("history");
    let steps: Vec<u8> = trail.iter().map(|entry| entry.step).collect();
    assert_eq!(steps, vec![0, 1, 2, 3, 4, 5, 6]);
    assert_eq!(trail[0].action, HistoryAction::Submit);
    assert!(trail[1..].iter().all(|entry| entry.action == HistoryAction::Approve));
    verify_trail(submitted.id, &trail).expect("well-formed trail");
}

#[tokio::test]
async fn pending_queues_follow_the_request_through_the_chain() {
    let harness = Harness::in_memory().await;
    let submitted = harness.requests.submit(engineering_request()).await.expect("submit");
    let manager = actor("M5", ENGINEERING, Some(3), MANAGER);
    let recruiter = actor("R1", HR, Some(1), RECRUITER);

    let manager_queue = harness.engine.pending_filter(&manager).expect("manager lane");
    let recruiter_queue = harness.engine.pending_filter(&recruiter).expect("recruiter lane");

    let pending = harness.requests.list_pending(&manager_queue).await.expect("pending");
    assert_eq!(pending.iter().map(|r| r.id).collect::<Vec<_>>(), vec![submitted.id]);
    assert!(harness.requests.list_pending(&recruiter_queue).await.expect("pending").is_empty());

    harness.decide(&submitted, &manager, DecisionAction::Approve).await.expect("manager approval");
    harness
        .decide(&submitted, &actor("D5", ENGINEERING, None, DIRECTOR), DecisionAction::Approve)
        .await
        .expect("director approval");

    assert!(harness.requests.list_pending(&manager_queue).await.expect("pending").is_empty());
    let pending = harness.requests.list_pending(&recruiter_queue).await.expect("pending");
    assert_eq!(pending.iter().map(|r| r.id).collect::<Vec<_>>(), vec![submitted.id]);
}

#[tokio::test]
async fn concurrent_decisions_on_one_request_serialize() {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("ledger.db").display());
    let pool = connect_with_settings(&url, 4, 30).await.expect("connect file database");
    let harness = Arc::new(Harness::on(pool).await);
    let submitted = harness.requests.submit(engineering_request()).await.expect("submit");

    let tasks: Vec<_> = ["M5-a", "M5-b"]
        .into_iter()
        .map(|employee| {
            let harness = Arc::clone(&harness);
            let request = submitted.clone();
            tokio::spawn(async move {
                harness
                    .decide(&request, &actor(employee, ENGINEERING, None, MANAGER), DecisionAction::Approve)
                    .await
            })
        })
        .collect();

    let mut committed = 0;
    for task in tasks {
        match task.await.expect("join decision task") {
            Ok(request) => {
                committed += 1;
                assert_eq!(request.status.origin, OriginStatus::MgrApproved);
            }
            Err(error) => assert!(
                matches!(
                    error,
                    RepositoryError::Domain(DomainError::Decision(DecisionError::WrongState { .. }))
                ),
                "unexpected error: {error}"
            ),
        }
    }
    assert_eq!(committed, 1);

    let trail = harness.history.list_for_request(submitted.id).await.expect("history");
    assert_eq!(trail.len(), 2);

    let lock_version: i64 =
        sqlx::query_scalar("SELECT lock_version FROM manpower_requests WHERE request_id = ?")
            .bind(submitted.id.0)
            .fetch_one(&harness.pool)
            .await
            .expect("lock version");
    assert_eq!(lock_version, 1, "the refused decision rolls back its lock bump");
}

#[tokio::test]
async fn concurrent_submissions_get_distinct_doc_numbers() {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("ledger.db").display());
    let pool = connect_with_settings(&url, 4, 30).await.expect("connect file database");
    let harness = Arc::new(Harness::on(pool).await);

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let harness = Arc::clone(&harness);
            tokio::spawn(async move { harness.requests.submit(engineering_request()).await })
        })
        .collect();

    let mut doc_numbers = BTreeSet::new();
    for task in tasks {
        let request = task.await.expect("join submit task").expect("submit");
        doc_numbers.insert(request.doc_number.as_str().to_string());
    }
    assert_eq!(doc_numbers.len(), 8);

    let stored: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM manpower_requests")
        .fetch_one(&harness.pool)
        .await
        .expect("count");
    assert_eq!(stored, 8);
}
