//! Planning - compare declared records with the last-applied state

use declarative::{ChangeSet, Record};
use kestra::{FlowRecord, RoleRecord};
use std::collections::BTreeMap;

use crate::config::Desired;
use crate::state::KestraState;

/// What to do with one address
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Declared but never applied
    Create,
    /// Declared and applied, with these fields changed
    Update(ChangeSet),
    /// Declared and applied, nothing changed; check it still exists
    Converge,
    /// Applied but no longer declared
    Delete,
    /// Re-read the stored record from the server
    Read,
}

impl Action {
    /// Plan symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Create => "+",
            Self::Update(_) => "~",
            Self::Delete => "-",
            Self::Converge | Self::Read => " ",
        }
    }

    /// Verb used in task descriptions
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update(_) => "update",
            Self::Converge => "check",
            Self::Delete => "delete",
            Self::Read => "refresh",
        }
    }

    /// Whether this action writes to the server
    pub fn is_change(&self) -> bool {
        matches!(self, Self::Create | Self::Update(_) | Self::Delete)
    }
}

/// A record kind the planner knows how to diff
pub trait Declared: Record + 'static {
    /// Fields that differ from the previously applied version
    fn diff(&self, previous: &Self) -> ChangeSet;

    /// Take over the computed fields of the previously applied version
    fn adopt(&mut self, previous: &Self);
}

impl Declared for FlowRecord {
    fn diff(&self, previous: &Self) -> ChangeSet {
        self.changes_from(previous)
    }

    fn adopt(&mut self, previous: &Self) {
        self.id.clone_from(&previous.id);
        self.revision = previous.revision;
    }
}

impl Declared for RoleRecord {
    fn diff(&self, previous: &Self) -> ChangeSet {
        self.changes_from(previous)
    }

    fn adopt(&mut self, previous: &Self) {
        self.id.clone_from(&previous.id);
        self.revision = previous.revision;
        self.tenant_id.clone_from(&previous.tenant_id);
    }
}

/// One planned step
#[derive(Debug, Clone)]
pub struct Step<R> {
    pub action: Action,
    /// Record to hand to the reconciler
    pub record: R,
    /// Last-applied version, if any
    pub previous: Option<R>,
}

impl<R: Record> Step<R> {
    pub fn address(&self) -> String {
        self.record.address()
    }
}

/// Steps for every address, flows first
#[derive(Debug, Clone, Default)]
pub struct Plan {
    pub flows: Vec<Step<FlowRecord>>,
    pub roles: Vec<Step<RoleRecord>>,
}

impl Plan {
    /// Plan converging the state towards the declared records
    pub fn converge(desired: &Desired, state: &KestraState) -> Self {
        Self {
            flows: plan_kind(&desired.flows, &state.flows),
            roles: plan_kind(&desired.roles, &state.roles),
        }
    }

    /// Plan re-reading every stored record
    pub fn refresh(state: &KestraState) -> Self {
        Self::for_stored(state, Action::Read)
    }

    /// Plan deleting every stored record
    pub fn destroy(state: &KestraState) -> Self {
        Self::for_stored(state, Action::Delete)
    }

    fn for_stored(state: &KestraState, action: Action) -> Self {
        fn steps<R: Clone>(stored: &BTreeMap<String, R>, action: &Action) -> Vec<Step<R>> {
            stored
                .values()
                .map(|r| Step {
                    action: action.clone(),
                    record: r.clone(),
                    previous: Some(r.clone()),
                })
                .collect()
        }
        Self {
            flows: steps(&state.flows, &action),
            roles: steps(&state.roles, &action),
        }
    }

    /// Keep only steps whose address starts with `target`
    ///
    /// `flow` selects every flow, `flow.company.team/hello` a single one.
    pub fn retain_target(&mut self, target: Option<&str>) {
        if let Some(target) = target {
            self.flows.retain(|s| matches_target(&s.address(), target));
            self.roles.retain(|s| matches_target(&s.address(), target));
        }
    }

    /// Number of steps that write to the server
    pub fn change_count(&self) -> usize {
        self.actions().filter(|a| a.is_change()).count()
    }

    /// Count steps with the given symbol
    pub fn count(&self, symbol: &str) -> usize {
        self.actions().filter(|a| a.symbol() == symbol).count()
    }

    pub fn len(&self) -> usize {
        self.flows.len() + self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty() && self.roles.is_empty()
    }

    fn actions(&self) -> impl Iterator<Item = &Action> {
        self.flows
            .iter()
            .map(|s| &s.action)
            .chain(self.roles.iter().map(|s| &s.action))
    }
}

fn matches_target(address: &str, target: &str) -> bool {
    let (kind, name) = declarative::planner::parse_target(target);
    match address.split_once('.') {
        Some((address_kind, address_name)) => {
            address_kind == kind && name.is_none_or(|n| address_name == n)
        }
        None => false,
    }
}

fn plan_kind<R: Declared>(desired: &[R], stored: &BTreeMap<String, R>) -> Vec<Step<R>> {
    let mut steps = Vec::new();

    for record in desired {
        let address = record.address();
        let step = match stored.get(&address) {
            None => Step {
                action: Action::Create,
                record: record.clone(),
                previous: None,
            },
            Some(previous) => {
                let mut next = record.clone();
                next.adopt(previous);
                let changes = record.diff(previous);
                let action = if changes.is_empty() {
                    Action::Converge
                } else {
                    Action::Update(changes)
                };
                Step {
                    action,
                    record: next,
                    previous: Some(previous.clone()),
                }
            }
        };
        log::debug!("{address}: {}", step.action.verb());
        steps.push(step);
    }

    for (address, previous) in stored {
        if !desired.iter().any(|r| &r.address() == address) {
            log::debug!("{address}: no longer declared");
            steps.push(Step {
                action: Action::Delete,
                record: previous.clone(),
                previous: Some(previous.clone()),
            });
        }
    }

    steps
}
