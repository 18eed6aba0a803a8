//! Task graph — dependency validation and lifecycle bookkeeping.
//!
//! The graph owns the submitted tasks and their status transitions. The
//! scheduler asks it which tasks are dispatchable and reports outcomes back;
//! readiness propagation (including `DependencyFailed` cascades) lives here.

use mangaba_types::error::{MangabaError, MangabaResult};
use mangaba_types::task::{TaskId, TaskOutcome, TaskSpec, TaskStatus};
use std::collections::HashMap;
use tracing::debug;

/// A task with its current lifecycle state.
#[derive(Debug)]
struct TaskNode {
    spec: TaskSpec,
    status: TaskStatus,
    outcome: Option<TaskOutcome>,
    insertion: usize,
}

/// Dependency graph over a submitted task set.
#[derive(Debug)]
pub struct TaskGraph {
    nodes: HashMap<TaskId, TaskNode>,
    order: Vec<TaskId>,
}

impl TaskGraph {
    /// Build a graph from a task set, validating that every dependency
    /// reference resolves and that the graph is acyclic.
    ///
    /// Fails fast with `CyclicDependency` (naming the cycle) before any task
    /// is dispatched.
    pub fn new(tasks: Vec<TaskSpec>) -> MangabaResult<Self> {
        let mut nodes = HashMap::with_capacity(tasks.len());
        let mut order = Vec::with_capacity(tasks.len());

        for (insertion, spec) in tasks.into_iter().enumerate() {
            order.push(spec.id);
            nodes.insert(
                spec.id,
                TaskNode {
                    spec,
                    status: TaskStatus::Pending,
                    outcome: None,
                    insertion,
                },
            );
        }

        let graph = Self { nodes, order };

        for id in &graph.order {
            for dep in &graph.nodes[id].spec.dependencies {
                if !graph.nodes.contains_key(dep) {
                    return Err(MangabaError::UnknownTask(*dep));
                }
            }
        }

        if let Some(cycle) = graph.find_cycle() {
            let rendered = cycle
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(MangabaError::CyclicDependency { cycle: rendered });
        }

        Ok(graph)
    }

    /// Find a dependency cycle, if any, as the path of task ids that closes
    /// on itself (first id repeated at the end).
    fn find_cycle(&self) -> Option<Vec<TaskId>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Unvisited,
            InProgress,
            Done,
        }

        fn visit(
            id: TaskId,
            nodes: &HashMap<TaskId, TaskNode>,
            marks: &mut HashMap<TaskId, Mark>,
            path: &mut Vec<TaskId>,
        ) -> Option<Vec<TaskId>> {
            match marks[&id] {
                Mark::Done => return None,
                Mark::InProgress => {
                    // Close the cycle at the first occurrence of `id`.
                    let start = path.iter().position(|p| *p == id).unwrap_or(0);
                    let mut cycle = path[start..].to_vec();
                    cycle.push(id);
                    return Some(cycle);
                }
                Mark::Unvisited => {}
            }

            marks.insert(id, Mark::InProgress);
            path.push(id);
            for dep in &nodes[&id].spec.dependencies {
                if let Some(cycle) = visit(*dep, nodes, marks, path) {
                    return Some(cycle);
                }
            }
            path.pop();
            marks.insert(id, Mark::Done);
            None
        }

        let mut marks: HashMap<TaskId, Mark> =
            self.order.iter().map(|id| (*id, Mark::Unvisited)).collect();
        let mut path = Vec::new();
        for id in &self.order {
            if let Some(cycle) = visit(*id, &self.nodes, &mut marks, &mut path) {
                return Some(cycle);
            }
        }
        None
    }

    /// Propagate dependency state: Pending tasks whose dependencies all
    /// completed become Ready; Pending tasks with a failed or timed-out
    /// dependency fail with `DependencyFailed`. Cascades run to a fixpoint.
    ///
    /// Returns whether any task changed state.
    pub fn promote(&mut self) -> bool {
        let mut changed_any = false;
        loop {
            let mut transitions: Vec<(TaskId, Result<(), TaskId>)> = Vec::new();
            for id in &self.order {
                let node = &self.nodes[id];
                if node.status != TaskStatus::Pending {
                    continue;
                }
                let failed_dep = node.spec.dependencies.iter().find(|dep| {
                    matches!(
                        self.nodes[dep].status,
                        TaskStatus::Failed | TaskStatus::TimedOut
                    )
                });
                if let Some(dep) = failed_dep {
                    transitions.push((*id, Err(*dep)));
                } else if node
                    .spec
                    .dependencies
                    .iter()
                    .all(|dep| self.nodes[dep].status == TaskStatus::Completed)
                {
                    transitions.push((*id, Ok(())));
                }
            }

            if transitions.is_empty() {
                return changed_any;
            }
            changed_any = true;

            for (id, transition) in transitions {
                let Some(node) = self.nodes.get_mut(&id) else {
                    continue;
                };
                match transition {
                    Ok(()) => {
                        debug!(task_id = %id, "Task ready");
                        node.status = TaskStatus::Ready;
                    }
                    Err(dep) => {
                        debug!(task_id = %id, dependency = %dep, "Task failed via dependency");
                        node.status = TaskStatus::Failed;
                        node.outcome = Some(TaskOutcome::Failed {
                            error: MangabaError::DependencyFailed { dependency: dep }.to_string(),
                        });
                    }
                }
            }
        }
    }

    /// Dispatchable tasks ordered by descending priority, then insertion
    /// order for ties.
    pub fn ready(&self) -> Vec<TaskId> {
        let mut ready: Vec<&TaskNode> = self
            .nodes
            .values()
            .filter(|n| n.status == TaskStatus::Ready)
            .collect();
        ready.sort_by(|a, b| {
            b.spec
                .priority
                .cmp(&a.spec.priority)
                .then(a.insertion.cmp(&b.insertion))
        });
        ready.iter().map(|n| n.spec.id).collect()
    }

    /// Mark a task as dispatched.
    pub fn mark_running(&mut self, id: TaskId) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.status = TaskStatus::Running;
        }
    }

    /// Record a terminal outcome for a task.
    pub fn record(&mut self, id: TaskId, outcome: TaskOutcome) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.status = outcome.status();
            node.outcome = Some(outcome);
        }
    }

    /// Mark every non-terminal task `TimedOut`, preserving completed results.
    pub fn timeout_remaining(&mut self) {
        for node in self.nodes.values_mut() {
            if !node.status.is_terminal() {
                node.status = TaskStatus::TimedOut;
                node.outcome = Some(TaskOutcome::TimedOut);
            }
        }
    }

    /// Whether every task reached a terminal state.
    pub fn all_terminal(&self) -> bool {
        self.nodes.values().all(|n| n.status.is_terminal())
    }

    /// The spec for a task id.
    pub fn spec(&self, id: TaskId) -> Option<&TaskSpec> {
        self.nodes.get(&id).map(|n| &n.spec)
    }

    /// Number of tasks in the graph.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Consume the graph into the aggregate outcome mapping, one entry per
    /// submitted task. Tasks that somehow never reached a terminal state are
    /// reported as failed rather than dropped.
    pub fn into_outcomes(self) -> HashMap<TaskId, TaskOutcome> {
        self.nodes
            .into_iter()
            .map(|(id, node)| {
                let outcome = node.outcome.unwrap_or(TaskOutcome::Failed {
                    error: format!("task never reached a terminal state ({:?})", node.status),
                });
                (id, outcome)
            })
            .collect()
    }
}
