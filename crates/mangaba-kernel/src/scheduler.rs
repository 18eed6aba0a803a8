//! Scheduler — dispatches ready tasks with bounded concurrency and deadlines.
//!
//! The scheduler is decoupled from agents: it receives a closure that runs a
//! single task and returns the agent's result. Dispatch order among Ready
//! tasks is priority-then-insertion; completion order is whatever finishes
//! first. Cancellation is cooperative: at a deadline the in-flight futures
//! are dropped, their results discarded, and the tasks marked `TimedOut`.

use crate::graph::TaskGraph;
use mangaba_types::error::MangabaResult;
use mangaba_types::task::{TaskId, TaskOutcome, TaskSpec};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Runs task sets to completion under concurrency and time bounds.
#[derive(Debug, Clone)]
pub struct Scheduler {
    concurrency: usize,
    task_timeout: Duration,
}

impl Scheduler {
    /// Create a scheduler dispatching at most `concurrency` tasks at once,
    /// each bounded by `task_timeout`.
    pub fn new(concurrency: usize, task_timeout: Duration) -> Self {
        Self {
            concurrency: concurrency.max(1),
            task_timeout,
        }
    }

    /// Execute a task set, returning one terminal outcome per submitted task.
    ///
    /// Graph validation failures (`CyclicDependency`, `UnknownTask`) abort
    /// the call before any task runs; individual task failures are captured
    /// in the mapping and never abort siblings that do not depend on them.
    pub async fn execute<F, Fut>(
        &self,
        tasks: Vec<TaskSpec>,
        timeout: Duration,
        run_task: F,
    ) -> MangabaResult<HashMap<TaskId, TaskOutcome>>
    where
        F: Fn(TaskSpec) -> Fut,
        Fut: Future<Output = MangabaResult<String>> + Send + 'static,
    {
        let total = tasks.len();
        let mut graph = TaskGraph::new(tasks)?;
        info!(tasks = total, timeout = ?timeout, "Scheduler started");

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut running: JoinSet<(TaskId, Result<MangabaResult<String>, tokio::time::error::Elapsed>)> =
            JoinSet::new();
        let deadline = tokio::time::Instant::now() + timeout;
        let task_timeout = self.task_timeout;

        loop {
            if tokio::time::Instant::now() >= deadline {
                warn!("Overall deadline reached, cancelling outstanding tasks");
                running.abort_all();
                graph.timeout_remaining();
                break;
            }

            let promoted = graph.promote();

            // Dispatch in priority order while concurrency permits remain.
            let mut dispatched = 0;
            for id in graph.ready() {
                let Ok(permit) = semaphore.clone().try_acquire_owned() else {
                    break;
                };
                let Some(spec) = graph.spec(id).cloned() else {
                    continue;
                };
                graph.mark_running(id);
                debug!(task_id = %id, priority = spec.priority, "Dispatching task");
                let fut = run_task(spec);
                running.spawn(async move {
                    let result = tokio::time::timeout(task_timeout, fut).await;
                    drop(permit);
                    (id, result)
                });
                dispatched += 1;
            }

            if graph.all_terminal() {
                break;
            }

            if running.is_empty() {
                if promoted || dispatched > 0 {
                    continue;
                }
                // Nothing in flight, nothing dispatchable, no state change:
                // unreachable for a validated DAG. Bail out instead of
                // spinning; leftover tasks surface as failures.
                warn!("Scheduler made no progress with no tasks in flight");
                break;
            }

            tokio::select! {
                joined = running.join_next() => {
                    match joined {
                        Some(Ok((id, Ok(Ok(output))))) => {
                            debug!(task_id = %id, "Task completed");
                            graph.record(id, TaskOutcome::Completed { output });
                        }
                        Some(Ok((id, Ok(Err(err))))) => {
                            debug!(task_id = %id, error = %err, "Task failed");
                            graph.record(id, TaskOutcome::Failed { error: err.to_string() });
                        }
                        Some(Ok((id, Err(_)))) => {
                            debug!(task_id = %id, "Task hit its per-task deadline");
                            graph.record(id, TaskOutcome::TimedOut);
                        }
                        Some(Err(join_err)) => {
                            // The task panicked; its id is lost with the
                            // payload. It surfaces in the aggregate mapping
                            // as a task that never reached a terminal state.
                            warn!(error = %join_err, "Task execution panicked");
                        }
                        None => {}
                    }
                }
                _ = tokio::time::sleep_until(deadline) => {
                    warn!("Overall deadline reached, cancelling outstanding tasks");
                    running.abort_all();
                    graph.timeout_remaining();
                    break;
                }
            }
        }

        let outcomes = graph.into_outcomes();
        info!(tasks = outcomes.len(), "Scheduler finished");
        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mangaba_types::error::MangabaError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn scheduler(concurrency: usize) -> Scheduler {
        Scheduler::new(concurrency, Duration::from_secs(60))
    }

    fn task(desc: &str) -> TaskSpec {
        TaskSpec::new(desc, "agent")
    }

    #[tokio::test]
    async fn every_task_gets_exactly_one_outcome() {
        let tasks: Vec<TaskSpec> = (0..6).map(|i| task(&format!("t{i}"))).collect();
        let ids: Vec<TaskId> = tasks.iter().map(|t| t.id).collect();

        let outcomes = scheduler(3)
            .execute(tasks, Duration::from_secs(10), |spec| async move {
                Ok(format!("done: {}", spec.description))
            })
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 6);
        for id in ids {
            assert!(matches!(&outcomes[&id], TaskOutcome::Completed { .. }));
        }
    }

    #[tokio::test]
    async fn cycle_aborts_before_any_dispatch() {
        let mut a = task("a");
        let mut b = task("b");
        a.dependencies = vec![b.id];
        b.dependencies = vec![a.id];

        let dispatches = Arc::new(AtomicUsize::new(0));
        let seen = dispatches.clone();
        let result = scheduler(2)
            .execute(vec![a, b], Duration::from_secs(10), move |_spec| {
                seen.fetch_add(1, Ordering::SeqCst);
                async { Ok(String::new()) }
            })
            .await;

        assert!(matches!(
            result,
            Err(MangabaError::CyclicDependency { .. })
        ));
        assert_eq!(dispatches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn dependency_failure_cascades_without_running_dependent() {
        let a = task("a");
        let b = task("b").with_dependencies(vec![a.id]);
        let c = task("independent");
        let (a_id, b_id, c_id) = (a.id, b.id, c.id);

        let ran: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let ran_in = ran.clone();
        let outcomes = scheduler(2)
            .execute(vec![a, b, c], Duration::from_secs(10), move |spec| {
                ran_in.lock().unwrap().push(spec.description.clone());
                async move {
                    if spec.description == "a" {
                        Err(MangabaError::Completion("backend down".into()))
                    } else {
                        Ok("ok".into())
                    }
                }
            })
            .await
            .unwrap();

        match &outcomes[&a_id] {
            TaskOutcome::Failed { error } => assert!(error.contains("backend down"), "{error}"),
            other => panic!("expected Failed, got {other:?}"),
        }
        match &outcomes[&b_id] {
            TaskOutcome::Failed { error } => {
                assert!(error.contains("Dependency failed"), "{error}")
            }
            other => panic!("expected Failed, got {other:?}"),
        }
        // Partial-failure semantics: the sibling still completed.
        assert!(matches!(&outcomes[&c_id], TaskOutcome::Completed { .. }));
        // The dependent never ran.
        assert!(!ran.lock().unwrap().contains(&"b".to_string()));
    }

    #[tokio::test]
    async fn dispatch_order_is_priority_then_insertion() {
        let first = task("p5-first").with_priority(5);
        let low = task("p1").with_priority(1);
        let second = task("p5-second").with_priority(5);

        let order: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let order_in = order.clone();
        scheduler(1)
            .execute(
                vec![first, low, second],
                Duration::from_secs(10),
                move |spec| {
                    order_in.lock().unwrap().push(spec.description.clone());
                    async { Ok(String::new()) }
                },
            )
            .await
            .unwrap();

        assert_eq!(
            *order.lock().unwrap(),
            vec!["p5-first", "p5-second", "p1"]
        );
    }

    #[tokio::test]
    async fn dependents_run_after_dependencies() {
        let a = task("produce");
        let b = task("consume").with_dependencies(vec![a.id]);

        let order: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let order_in = order.clone();
        scheduler(4)
            .execute(vec![b, a], Duration::from_secs(10), move |spec| {
                order_in.lock().unwrap().push(spec.description.clone());
                async { Ok(String::new()) }
            })
            .await
            .unwrap();

        assert_eq!(*order.lock().unwrap(), vec!["produce", "consume"]);
    }

    #[tokio::test(start_paused = true)]
    async fn overall_timeout_preserves_completed_results() {
        let quick = task("quick");
        let stuck = task("stuck");
        let (quick_id, stuck_id) = (quick.id, stuck.id);

        let outcomes = scheduler(2)
            .execute(vec![quick, stuck], Duration::from_secs(5), |spec| async move {
                if spec.description == "stuck" {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                }
                Ok("fast".into())
            })
            .await
            .unwrap();

        assert!(matches!(&outcomes[&quick_id], TaskOutcome::Completed { .. }));
        assert!(matches!(&outcomes[&stuck_id], TaskOutcome::TimedOut));
    }

    #[tokio::test(start_paused = true)]
    async fn per_task_deadline_times_out_one_task_only() {
        let slow = task("slow");
        let fast = task("fast");
        let (slow_id, fast_id) = (slow.id, fast.id);

        let outcomes = Scheduler::new(2, Duration::from_secs(2))
            .execute(
                vec![slow, fast],
                Duration::from_secs(3600),
                |spec| async move {
                    if spec.description == "slow" {
                        tokio::time::sleep(Duration::from_secs(30)).await;
                    }
                    Ok("ok".into())
                },
            )
            .await
            .unwrap();

        assert!(matches!(&outcomes[&slow_id], TaskOutcome::TimedOut));
        assert!(matches!(&outcomes[&fast_id], TaskOutcome::Completed { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn pending_tasks_time_out_at_the_overall_deadline() {
        let a = task("blocker");
        let b = task("waiter").with_dependencies(vec![a.id]);
        let b_id = b.id;

        let outcomes = scheduler(1)
            .execute(vec![a, b], Duration::from_secs(5), |_spec| async move {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(String::new())
            })
            .await
            .unwrap();

        // The waiter never became Ready; it still gets a TimedOut entry.
        assert!(matches!(&outcomes[&b_id], TaskOutcome::TimedOut));
    }

    #[tokio::test]
    async fn concurrency_limit_is_respected() {
        let tasks: Vec<TaskSpec> = (0..8).map(|i| task(&format!("t{i}"))).collect();

        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (in_flight_in, peak_in) = (in_flight.clone(), peak.clone());

        scheduler(2)
            .execute(tasks, Duration::from_secs(10), move |_spec| {
                let in_flight = in_flight_in.clone();
                let peak = peak_in.clone();
                async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok(String::new())
                }
            })
            .await
            .unwrap();

        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn empty_task_set_returns_empty_mapping() {
        let outcomes = scheduler(2)
            .execute(Vec::new(), Duration::from_secs(1), |_spec| async {
                Ok(String::new())
            })
            .await
            .unwrap();
        assert!(outcomes.is_empty());
    }
}
