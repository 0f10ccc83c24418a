//! Execution - turn planned steps into executor tasks and fold the results back into state

use anyhow::Result;
use declarative::{
    ChangeSet, ConfirmCallback, ExecuteOptions, ExecuteSummary, ExecutionPlan, Outcome,
    ProgressCallback, Reconciler, Record, Task,
};
use kestra::{Client, FlowRecord, RoleRecord};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use super::planner::{Action, Plan, Step};
use crate::state::KestraState;

/// A record being reconciled, and the outcome once it finished
#[derive(Debug)]
pub struct Slot<R> {
    record: Mutex<R>,
    outcome: Mutex<Option<Outcome>>,
}

impl<R: Clone> Slot<R> {
    fn new(record: R) -> Self {
        Self {
            record: Mutex::new(record),
            outcome: Mutex::new(None),
        }
    }

    /// The record and its outcome; `None` if the task failed or never ran
    pub fn finished(&self) -> Option<(R, Outcome)> {
        let outcome = (*self.outcome.lock().unwrap_or_else(PoisonError::into_inner))?;
        let record = self
            .record
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        Some((record, outcome))
    }
}

/// Executor task driving one record through a reconciler
pub struct ReconcileTask<R: Reconciler> {
    reconciler: Arc<R>,
    action: Action,
    address: String,
    slot: Arc<Slot<R::Record>>,
}

impl<R: Reconciler> fmt::Debug for ReconcileTask<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReconcileTask")
            .field("kind", &self.reconciler.kind())
            .field("action", &self.action)
            .field("address", &self.address)
            .finish()
    }
}

impl<R> Task for ReconcileTask<R>
where
    R: Reconciler + 'static,
{
    fn id(&self) -> String {
        self.address.clone()
    }

    fn description(&self) -> String {
        format!("{} {}", self.action.verb(), self.address)
    }

    fn run(&self) -> Result<Outcome> {
        let mut record = self
            .slot
            .record
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let reconciler = self.reconciler.as_ref();

        let outcome = match &self.action {
            Action::Create => reconciler.create(&mut record)?,
            Action::Update(changes) => match reconciler.update(&mut record, changes)? {
                Outcome::Drifted => recreate(reconciler, &mut record)?,
                outcome => outcome,
            },
            Action::Converge => match reconciler.update(&mut record, &ChangeSet::none())? {
                Outcome::Drifted => recreate(reconciler, &mut record)?,
                outcome => outcome,
            },
            Action::Delete => reconciler.delete(&mut record)?,
            Action::Read => {
                if reconciler.read(&mut record)?.is_present() {
                    Outcome::Refreshed
                } else {
                    Outcome::Drifted
                }
            }
        };

        *self.slot.outcome.lock().unwrap_or_else(PoisonError::into_inner) = Some(outcome);
        Ok(outcome)
    }
}

fn recreate<R: Reconciler>(reconciler: &R, record: &mut R::Record) -> Result<Outcome> {
    log::info!("{} is gone, creating it again", record.address());
    Ok(reconciler.create(record)?)
}

/// An execution plan plus handles to read each record back afterwards
pub struct Batch {
    plan: ExecutionPlan,
    flows: Vec<Arc<Slot<FlowRecord>>>,
    roles: Vec<Arc<Slot<RoleRecord>>>,
}

impl Batch {
    /// Build tasks for every step; flows first, then roles
    pub fn new(client: &Client, plan: Plan) -> Self {
        let mut batch = Self {
            plan: ExecutionPlan::new(),
            flows: Vec::new(),
            roles: Vec::new(),
        };

        let flows = Arc::new(client.flows());
        for step in plan.flows {
            let slot = batch.push(&flows, step);
            batch.flows.push(slot);
        }

        let roles = Arc::new(client.roles());
        for step in plan.roles {
            let slot = batch.push(&roles, step);
            batch.roles.push(slot);
        }

        batch
    }

    fn push<R>(&mut self, reconciler: &Arc<R>, step: Step<R::Record>) -> Arc<Slot<R::Record>>
    where
        R: Reconciler + 'static,
    {
        let slot = Arc::new(Slot::new(step.record));
        let address = slot
            .record
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .address();
        self.plan.add(Box::new(ReconcileTask {
            reconciler: Arc::clone(reconciler),
            action: step.action,
            address,
            slot: Arc::clone(&slot),
        }));
        slot
    }

    pub fn len(&self) -> usize {
        self.plan.len()
    }

    /// Run every task, then record finished ones in `state`
    ///
    /// Failed or skipped records keep their previous state.
    pub fn run<P, C>(
        self,
        opts: &ExecuteOptions,
        progress: &mut P,
        confirm: &mut C,
        state: &mut KestraState,
    ) -> Result<ExecuteSummary>
    where
        P: ProgressCallback,
        C: ConfirmCallback,
    {
        let summary = declarative::execute(&self.plan, opts, progress, confirm)?;
        self.commit(state);
        Ok(summary)
    }

    fn commit(&self, state: &mut KestraState) {
        for (record, outcome) in self.flows.iter().filter_map(|s| s.finished()) {
            log::debug!("{}: {outcome:?}", record.address());
            state.put_flow(record);
        }
        for (record, outcome) in self.roles.iter().filter_map(|s| s.finished()) {
            log::debug!("{}: {outcome:?}", record.address());
            state.put_role(record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Desired;
    use declarative::{AutoConfirm, AutoDecline, NoProgress};
    use kestra::{MockBackend, PermissionGrant};

    const CONTENT: &str = "id: hello\nnamespace: company.team\ntasks: []\n";

    fn flow() -> FlowRecord {
        FlowRecord::new("company.team", "hello", CONTENT)
    }

    fn role() -> RoleRecord {
        RoleRecord::new("operators").grant(PermissionGrant::new("FLOW", ["READ"]))
    }

    fn desired() -> Desired {
        Desired {
            flows: vec![flow()],
            roles: vec![role()],
        }
    }

    fn opts() -> ExecuteOptions {
        ExecuteOptions {
            dry_run: false,
            jobs: 1,
        }
    }

    fn apply(client: &Client, plan: Plan, state: &mut KestraState) -> ExecuteSummary {
        Batch::new(client, plan)
            .run(&opts(), &mut NoProgress, &mut AutoConfirm, state)
            .unwrap()
    }

    fn applied(mock: &MockBackend) -> (Client, KestraState) {
        let client = Client::with_backend(mock.clone());
        let mut state = KestraState::default();
        let plan = Plan::converge(&desired(), &state);
        apply(&client, plan, &mut state);
        mock.clear_calls();
        (client, state)
    }

    #[test]
    fn test_create_records_into_state() {
        let mock = MockBackend::with_tenant("main");
        let (_, state) = applied(&mock);

        let flow = &state.flows["flow.company.team/hello"];
        assert_eq!(flow.id.as_deref(), Some("company.team/hello"));
        assert_eq!(flow.revision, Some(1));
        let role = &state.roles["role.operators"];
        assert_eq!(role.id.as_deref(), Some("role-1"));
        assert_eq!(role.tenant_id.as_deref(), Some("main"));
    }

    #[test]
    fn test_second_apply_writes_nothing() {
        let mock = MockBackend::new();
        let (client, mut state) = applied(&mock);

        let summary = apply(&client, Plan::converge(&desired(), &state), &mut state);
        assert_eq!(summary.unchanged, 2);
        assert_eq!(mock.writes(), 0);
    }

    #[test]
    fn test_failed_task_keeps_previous_state() {
        let mock = MockBackend::new();
        let (client, mut state) = applied(&mock);
        let before = state.flows["flow.company.team/hello"].clone();

        let mut changed = flow();
        changed.content = "id: hello\nnamespace: company.team\ntasks: [{id: a}]\n".into();
        let desired = Desired {
            flows: vec![changed],
            roles: vec![role()],
        };
        let mut plan = Plan::converge(&desired, &state);
        plan.retain_target(Some("flow"));

        mock.fail_next(500);
        let summary = apply(&client, plan, &mut state);

        assert_eq!(summary.failed, 1);
        assert_eq!(state.flows["flow.company.team/hello"], before);
    }

    #[test]
    fn test_converge_recreates_drifted_flow() {
        let mock = MockBackend::new();
        let (client, mut state) = applied(&mock);
        assert!(mock.remove_flow("company.team", "hello"));

        let summary = apply(&client, Plan::converge(&desired(), &state), &mut state);

        assert_eq!(summary.created, 1);
        assert_eq!(summary.unchanged, 1);
        assert_eq!(mock.flow_revision("company.team", "hello"), Some(1));
        assert!(state.flows.contains_key("flow.company.team/hello"));
    }

    #[test]
    fn test_update_recreates_role_deleted_remotely() {
        let mock = MockBackend::new();
        let (client, mut state) = applied(&mock);
        assert!(mock.remove_role("role-1"));

        let mut changed = role();
        changed.description = Some("Runs flows".into());
        let desired = Desired {
            flows: vec![flow()],
            roles: vec![changed],
        };
        let summary = apply(&client, Plan::converge(&desired, &state), &mut state);

        assert_eq!(summary.created, 1);
        assert_eq!(summary.failed, 0);
        let role = &state.roles["role.operators"];
        assert_eq!(role.id.as_deref(), Some("role-2"));
        assert_eq!(mock.role("role-2").unwrap()["description"], "Runs flows");
    }

    #[test]
    fn test_renamed_role_keeps_server_id() {
        let mock = MockBackend::new();
        let client = Client::with_backend(mock.clone());
        let mut state = KestraState::default();
        let keyed = |name: &str| {
            let mut role = role().keyed("ops");
            role.name = name.to_string();
            Desired {
                flows: vec![],
                roles: vec![role],
            }
        };
        apply(&client, Plan::converge(&keyed("operators"), &state), &mut state);

        let plan = Plan::converge(&keyed("operators-team"), &state);
        let summary = apply(&client, plan, &mut state);

        assert_eq!(summary.updated, 1);
        assert_eq!(summary.created, 0);
        assert_eq!(state.roles["role.ops"].id.as_deref(), Some("role-1"));
        assert_eq!(mock.role("role-1").unwrap()["name"], "operators-team");
    }

    #[test]
    fn test_mismatched_source_is_rejected() {
        let mock = MockBackend::new();
        let client = Client::with_backend(mock.clone());
        let mut state = KestraState::default();
        let desired = Desired {
            flows: vec![FlowRecord::new(
                "company.team",
                "hello",
                CONTENT.replace("id: hello", "id: other"),
            )],
            roles: vec![],
        };

        let summary = apply(&client, Plan::converge(&desired, &state), &mut state);

        assert_eq!(summary.failed, 1);
        assert!(state.is_empty());
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn test_refresh_forgets_drifted_records() {
        let mock = MockBackend::new();
        let (client, mut state) = applied(&mock);
        assert!(mock.remove_role("role-1"));

        let summary = apply(&client, Plan::refresh(&state), &mut state);

        assert_eq!(summary.drifted, 1);
        assert_eq!(state.len(), 1);
        assert!(state.flows.contains_key("flow.company.team/hello"));
        assert_eq!(mock.writes(), 0);
    }

    #[test]
    fn test_destroy_empties_state() {
        let mock = MockBackend::new();
        let (client, mut state) = applied(&mock);

        let summary = apply(&client, Plan::destroy(&state), &mut state);

        assert_eq!(summary.removed, 2);
        assert!(state.is_empty());
        assert!(mock.role("role-1").is_none());
    }

    #[test]
    fn test_declined_batch_changes_nothing() {
        let mock = MockBackend::new();
        let (client, mut state) = applied(&mock);

        let batch = Batch::new(&client, Plan::destroy(&state));
        assert_eq!(batch.len(), 2);
        let summary = batch
            .run(&opts(), &mut NoProgress, &mut AutoDecline, &mut state)
            .unwrap();

        assert_eq!(summary.skipped, 2);
        assert_eq!(state.len(), 2);
        assert!(mock.calls().is_empty());
    }
}
