//! Task registry and dependency resolution.
//!
//! The registry maps task names to task definitions. Resolution walks the
//! dependency graph of a requested task, validates it (unknown names,
//! cycles), and produces a topologically ordered execution plan. Both
//! error classes are configuration errors: they abort before any action
//! runs.

use crate::core::task::Task;
use crate::error::{Error, Result};
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashMap, HashSet};

/// Topologically ordered plan for one invocation.
///
/// Contains exactly the tasks reachable from the requested target, each
/// listed after all of its dependencies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPlan {
    order: Vec<String>,
}

impl ExecutionPlan {
    /// Task names in execution order (dependencies first).
    pub fn order(&self) -> &[String] {
        &self.order
    }

    /// Number of tasks in the plan.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Check if the plan is empty.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Mapping from task name to task definition.
///
/// Built during a registration phase and immutable during a run. Owned by
/// the invoking process and passed by reference; there is no process-wide
/// singleton.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: HashMap<String, Task>,
}

impl TaskRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            tasks: HashMap::new(),
        }
    }

    /// Add a task. Re-registering a name replaces the prior definition
    /// (last write wins). Dependencies may reference names that are not
    /// registered yet; they are resolved at run time.
    ///
    /// # Errors
    /// Returns a validation error if the task name is empty.
    pub fn register(&mut self, task: Task) -> Result<()> {
        if task.name.is_empty() {
            return Err(Error::Validation(
                "task name must be non-empty".to_string(),
            ));
        }
        self.tasks.insert(task.name.clone(), task);
        Ok(())
    }

    /// Get a task by name.
    pub fn get(&self, name: &str) -> Option<&Task> {
        self.tasks.get(name)
    }

    /// Check if a task is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    /// Number of registered tasks.
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// All registered tasks, in no particular order.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    /// Resolve the named task into an execution plan.
    ///
    /// Walks the transitive dependency closure of `target`, then orders it
    /// with petgraph's toposort.
    ///
    /// # Errors
    /// - `UnknownTask` if the target or any transitive dependency is not
    ///   registered.
    /// - `CyclicDependency` if a cycle is reachable from the target,
    ///   reported with the offending cycle path.
    pub fn resolve(&self, target: &str) -> Result<ExecutionPlan> {
        if !self.tasks.contains_key(target) {
            return Err(Error::UnknownTask(target.to_string()));
        }

        // Collect the reachable closure, failing on unregistered names.
        let mut graph: DiGraph<String, ()> = DiGraph::new();
        let mut index: HashMap<String, NodeIndex> = HashMap::new();
        let mut pending = vec![target.to_string()];
        while let Some(name) = pending.pop() {
            if index.contains_key(&name) {
                continue;
            }
            let task = self
                .tasks
                .get(&name)
                .ok_or_else(|| Error::UnknownTask(name.clone()))?;
            let idx = graph.add_node(name.clone());
            index.insert(name, idx);
            for dep in &task.deps {
                pending.push(dep.clone());
            }
        }

        // Edges point dep -> dependent so toposort yields deps first.
        for (name, &idx) in &index {
            let task = self
                .tasks
                .get(name)
                .ok_or_else(|| Error::UnknownTask(name.clone()))?;
            for dep in &task.deps {
                let dep_idx = index
                    .get(dep)
                    .copied()
                    .ok_or_else(|| Error::UnknownTask(dep.clone()))?;
                graph.add_edge(dep_idx, idx, ());
            }
        }

        match toposort(&graph, None) {
            Ok(sorted) => Ok(ExecutionPlan {
                order: sorted.into_iter().map(|idx| graph[idx].clone()).collect(),
            }),
            Err(cycle) => Err(Error::CyclicDependency(cycle_path(
                &graph,
                cycle.node_id(),
            ))),
        }
    }
}

/// Reconstruct a cycle path through `start` for error reporting.
///
/// `start` is guaranteed by toposort to lie on a cycle, so a DFS along
/// outgoing edges returns to it. The path repeats the starting task at the
/// end, e.g. `["a", "b", "a"]`.
fn cycle_path(graph: &DiGraph<String, ()>, start: NodeIndex) -> Vec<String> {
    fn walk(
        graph: &DiGraph<String, ()>,
        node: NodeIndex,
        start: NodeIndex,
        path: &mut Vec<NodeIndex>,
        visited: &mut HashSet<NodeIndex>,
    ) -> bool {
        for succ in graph.neighbors(node) {
            if succ == start {
                return true;
            }
            if visited.insert(succ) {
                path.push(succ);
                if walk(graph, succ, start, path, visited) {
                    return true;
                }
                path.pop();
            }
        }
        false
    }

    let mut path = vec![start];
    let mut visited = HashSet::new();
    visited.insert(start);
    if walk(graph, start, start, &mut path, &mut visited) {
        let mut names: Vec<String> = path.iter().map(|&idx| graph[idx].clone()).collect();
        names.push(graph[start].clone());
        names
    } else {
        // Unreachable for a node toposort flagged, but degrade gracefully.
        vec![graph[start].clone(), graph[start].clone()]
    }
}
