//! Execution engine - runs reconciliation tasks with bounded parallelism

use crate::context::{ConfirmCallback, ProgressCallback};
use crate::planner::ExecutionPlan;
use crate::types::{ApplyResult, ExecuteOptions, ExecuteSummary, Outcome};
use anyhow::Result;
use rayon::prelude::*;
use std::fmt;

/// A unit of work: reconcile one record
///
/// Tasks carry their own record and reconciler. A task never shares a
/// record with another task, so tasks can run on any thread.
pub trait Task: Send + Sync + fmt::Debug {
    /// Address of the record this task reconciles
    fn id(&self) -> String;

    /// Human-readable description of what this task does
    fn description(&self) -> String;

    /// Run the reconciliation call
    fn run(&self) -> Result<Outcome>;
}

/// A boxed task for type-erased storage
pub type BoxedTask = Box<dyn Task>;

/// Execute a plan with the given options and callbacks
///
/// Each task runs to completion on its own; a failing task is recorded in
/// the summary and does not stop the others.
pub fn execute<P, C>(
    plan: &ExecutionPlan,
    opts: &ExecuteOptions,
    progress: &mut P,
    confirm: &mut C,
) -> Result<ExecuteSummary>
where
    P: ProgressCallback,
    C: ConfirmCallback,
{
    if plan.is_empty() {
        return Ok(ExecuteSummary::default());
    }

    if opts.dry_run {
        return Ok(ExecuteSummary {
            skipped: plan.len(),
            ..Default::default()
        });
    }

    if !confirm.confirm(&format!("Reconcile {} record(s)?", plan.len()))? {
        return Ok(ExecuteSummary {
            skipped: plan.len(),
            ..Default::default()
        });
    }

    let mut summary = ExecuteSummary::default();

    progress.on_batch_start(plan.len());
    let results = execute_batch(&plan.tasks, opts.jobs, progress)?;
    for result in &results {
        summary.add_result(result);
    }
    progress.on_batch_complete();

    log::info!(
        "Executed {} task(s): {} change(s), {} failure(s)",
        summary.total(),
        summary.total_changes(),
        summary.failed
    );

    Ok(summary)
}

/// Execute a batch of tasks
fn execute_batch<P: ProgressCallback>(
    tasks: &[BoxedTask],
    jobs: usize,
    progress: &mut P,
) -> Result<Vec<ApplyResult>> {
    if jobs <= 1 || tasks.len() == 1 {
        let mut results = Vec::with_capacity(tasks.len());
        for task in tasks {
            let id = task.id();
            progress.on_task_start(&id, &task.description());
            let result = run_task(task.as_ref());
            progress.on_task_complete(&id, &result);
            results.push(result);
        }
        Ok(results)
    } else {
        execute_parallel(tasks, jobs, progress)
    }
}

/// Execute tasks in parallel using rayon
fn execute_parallel<P: ProgressCallback>(
    tasks: &[BoxedTask],
    jobs: usize,
    progress: &mut P,
) -> Result<Vec<ApplyResult>> {
    // The progress callback is not thread-safe; results are reported after the pool drains.
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to create thread pool: {}", e))?;

    let results: Vec<(String, ApplyResult)> = pool.install(|| {
        tasks
            .par_iter()
            .map(|task| (task.id(), run_task(task.as_ref())))
            .collect()
    });

    for (id, result) in &results {
        progress.on_task_complete(id, result);
    }

    Ok(results.into_iter().map(|(_, r)| r).collect())
}

/// Run a single task, turning errors into a failed result
fn run_task(task: &dyn Task) -> ApplyResult {
    match task.run() {
        Ok(outcome) => {
            log::debug!("{}: {:?}", task.id(), outcome);
            ApplyResult::Done(outcome)
        }
        Err(e) => {
            log::debug!("{}: failed: {:#}", task.id(), e);
            ApplyResult::Failed {
                error: format!("{e:#}"),
            }
        }
    }
}
