//! Execution planner - collects reconciliation tasks

use crate::executor::{BoxedTask, Task};

/// An execution plan: the tasks to run, in declaration order
pub struct ExecutionPlan {
    /// Tasks to run
    pub tasks: Vec<BoxedTask>,
}

impl ExecutionPlan {
    /// Create a new empty plan
    pub fn new() -> Self {
        Self { tasks: Vec::new() }
    }

    /// Add a task to the plan
    pub fn add(&mut self, task: BoxedTask) {
        self.tasks.push(task);
    }

    /// Filter plan to only include tasks matching a predicate
    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: Fn(&dyn Task) -> bool,
    {
        Self {
            tasks: self
                .tasks
                .into_iter()
                .filter(|t| predicate(t.as_ref()))
                .collect(),
        }
    }

    /// Filter plan to only include tasks matching a target pattern
    ///
    /// Target format: "kind" or "kind.name", matched against task ids
    /// such as "flow.company.team/hello".
    pub fn filter_by_target(self, target: Option<&str>) -> Self {
        match target {
            None => self,
            Some(t) => {
                let (kind, name) = parse_target(t);
                self.filter(|task| matches_filter(task, kind, name))
            }
        }
    }

    /// Total number of tasks in the plan
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Check if plan is empty
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl Default for ExecutionPlan {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a target string like "kind.name" into (kind, name)
///
/// Only the first dot separates the kind; names may contain dots.
pub fn parse_target(target: &str) -> (&str, Option<&str>) {
    match target.split_once('.') {
        Some((kind, name)) if !name.is_empty() => (kind, Some(name)),
        Some((kind, _)) => (kind, None),
        None => (target, None),
    }
}

/// Check if a task matches the filter criteria
fn matches_filter(task: &dyn Task, kind: &str, name: Option<&str>) -> bool {
    let id = task.id();
    let Some((task_kind, task_name)) = id.split_once('.') else {
        return false;
    };

    if task_kind != kind {
        return false;
    }

    match name {
        Some(n) => task_name.contains(n),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Outcome;

    #[derive(Debug)]
    struct Named(&'static str);

    impl Task for Named {
        fn id(&self) -> String {
            self.0.to_string()
        }

        fn description(&self) -> String {
            format!("Task {}", self.0)
        }

        fn run(&self) -> anyhow::Result<Outcome> {
            Ok(Outcome::Unchanged)
        }
    }

    fn plan() -> ExecutionPlan {
        let mut plan = ExecutionPlan::new();
        plan.add(Box::new(Named("flow.company.team/hello")));
        plan.add(Box::new(Named("flow.company.ops/cleanup")));
        plan.add(Box::new(Named("role.admins")));
        plan
    }

    #[test]
    fn test_parse_target() {
        assert_eq!(parse_target("flow"), ("flow", None));
        assert_eq!(
            parse_target("flow.company.team/hello"),
            ("flow", Some("company.team/hello"))
        );
        assert_eq!(parse_target("role."), ("role", None));
    }

    #[test]
    fn test_filter_by_kind() {
        let filtered = plan().filter_by_target(Some("flow"));
        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn test_filter_by_name() {
        let filtered = plan().filter_by_target(Some("flow.company.ops"));
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered.tasks[0].id(), "flow.company.ops/cleanup");
    }

    #[test]
    fn test_no_target_keeps_everything() {
        let filtered = plan().filter_by_target(None);
        assert_eq!(filtered.len(), 3);
        assert!(!filtered.is_empty());
    }
}
