use std::collections::BTreeMap;

use tokio::sync::RwLock;

use manpower_core::audit::{ApprovalHistoryEntry, NewHistoryEntry};
use manpower_core::domain::actor::Actor;
use manpower_core::domain::doc_number::DocNumber;
use manpower_core::domain::request::{
    ManpowerRequest, NewManpowerRequest, RequestId, RequestStatus,
};
use manpower_core::workflow::{DecisionAction, PendingFilter, WorkflowEngine};

use super::{
    advance_timestamp, now_micros, DecisionRecord, HistoryRepository, RepositoryError,
    RequestRepository, SubmitPolicy,
};

#[derive(Default)]
struct LedgerState {
    requests: BTreeMap<RequestId, ManpowerRequest>,
    history: Vec<ApprovalHistoryEntry>,
    next_request_id: i64,
    next_history_id: i64,
}

impl LedgerState {
    fn append(&mut self, entry: NewHistoryEntry) -> ApprovalHistoryEntry {
        self.next_history_id += 1;
        let appended = ApprovalHistoryEntry {
            id: self.next_history_id,
            request_id: entry.request_id,
            approver_id: entry.approver_id,
            step: entry.step,
            action: entry.action,
            notes: entry.notes,
            recorded_at: entry.recorded_at,
        };
        self.history.push(appended.clone());
        appended
    }

    fn next_doc_number(&self, prefix: &str, now: chrono::DateTime<chrono::Utc>) -> DocNumber {
        let period = DocNumber::period_prefix(prefix, now);
        let last = self
            .requests
            .values()
            .filter_map(|request| request.doc_number.sequence(&period))
            .max()
            .unwrap_or(0);
        DocNumber::compose(prefix, now, last + 1)
    }

    fn newest_first<'a>(
        &self,
        requests: impl Iterator<Item = &'a ManpowerRequest>,
    ) -> Vec<ManpowerRequest> {
        let mut listed: Vec<ManpowerRequest> = requests.cloned().collect();
        listed.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        listed
    }
}

/// Process-local ledger with the same contract as the SQL repositories.
/// A single write lock stands in for the row lock.
#[derive(Default)]
pub struct InMemoryLedger {
    state: RwLock<LedgerState>,
    policy: SubmitPolicy,
}

impl InMemoryLedger {
    pub fn with_policy(policy: SubmitPolicy) -> Self {
        Self { state: RwLock::default(), policy }
    }
}

#[async_trait::async_trait]
impl RequestRepository for InMemoryLedger {
    async fn submit(
        &self,
        request: NewManpowerRequest,
    ) -> Result<ManpowerRequest, RepositoryError> {
        request.validate()?;

        let now = now_micros();
        let mut state = self.state.write().await;
        state.next_request_id += 1;
        let id = RequestId(state.next_request_id);

        let mut requirement = request.requirement;
        requirement.required_position_name = requirement.required_position_name.trim().to_string();

        let created = ManpowerRequest {
            id,
            doc_number: state.next_doc_number(&self.policy.doc_number_prefix, now),
            doc_date: now.date_naive(),
            department_id: request.department_id,
            section_id: request.section_id,
            position_id: request.position_id,
            employee_id: request.employee_id.clone(),
            requirement,
            status: RequestStatus::submitted(),
            created_at: now,
            updated_at: now,
        };

        state.requests.insert(id, created.clone());
        state.append(NewHistoryEntry::submission(id, request.employee_id, now));
        Ok(created)
    }

    async fn find_by_id(&self, id: RequestId) -> Result<Option<ManpowerRequest>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.requests.get(&id).cloned())
    }

    async fn list_all(&self) -> Result<Vec<ManpowerRequest>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.newest_first(state.requests.values()))
    }

    async fn list_pending(
        &self,
        filter: &PendingFilter,
    ) -> Result<Vec<ManpowerRequest>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.newest_first(state.requests.values().filter(|request| filter.matches(request))))
    }

    async fn apply_decision(
        &self,
        id: RequestId,
        engine: &WorkflowEngine,
        actor: &Actor,
        action: DecisionAction,
        notes: &str,
    ) -> Result<DecisionRecord, RepositoryError> {
        let mut state = self.state.write().await;
        let current = state.requests.get(&id).cloned().ok_or(RepositoryError::NotFound(id))?;

        let outcome = engine.decide(&current, actor, action)?;
        let updated_at = advance_timestamp(current.updated_at, now_micros());
        let request = ManpowerRequest { status: outcome.to, updated_at, ..current };

        state.requests.insert(id, request.clone());
        let history =
            state.append(outcome.history_entry(id, actor.employee_id.clone(), notes, updated_at));

        Ok(DecisionRecord { request, outcome, history })
    }
}

#[async_trait::async_trait]
impl HistoryRepository for InMemoryLedger {
    async fn list_for_request(
        &self,
        id: RequestId,
    ) -> Result<Vec<ApprovalHistoryEntry>, RepositoryError> {
        let state = self.state.read().await;
        if !state.requests.contains_key(&id) {
            return Err(RepositoryError::NotFound(id));
        }
        Ok(state.history.iter().filter(|entry| entry.request_id == id).cloned().collect())
    }
}
