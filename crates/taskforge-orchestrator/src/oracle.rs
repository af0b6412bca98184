use async_trait::async_trait;
use std::collections::HashSet;
use taskforge_core::{Plan, PlanStep, Task, TaskSpec, TaskforgeError, TaskforgeResult};

/// Turns a high-level goal into an ordered list of subtasks.
///
/// Implementations are external collaborators (typically LLM-backed); the
/// orchestrator only depends on this seam.
#[async_trait]
pub trait Decomposer: Send + Sync {
    /// Decomposes `goal` into subtasks.
    async fn decompose(
        &self,
        goal: &str,
        context: &serde_json::Value,
    ) -> TaskforgeResult<Vec<TaskSpec>>;
}

/// Sequences decomposed subtasks into an executable [`Plan`].
#[async_trait]
pub trait Planner: Send + Sync {
    /// Produces a plan over the given tasks.
    async fn plan(&self, tasks: &[Task], context: &serde_json::Value) -> TaskforgeResult<Plan>;
}

/// Deterministic planner that layers tasks by their dependency titles.
///
/// Each step holds every task whose dependencies are satisfied by earlier
/// steps, preserving decomposition order within a layer; a step with more
/// than one task is marked parallel. A dependency on an unknown title or a
/// dependency cycle is an oracle error.
pub struct DependencyPlanner;

impl DependencyPlanner {
    /// Creates the planner.
    pub fn new() -> Self {
        Self
    }
}

impl Default for DependencyPlanner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Planner for DependencyPlanner {
    async fn plan(&self, tasks: &[Task], _context: &serde_json::Value) -> TaskforgeResult<Plan> {
        let known_titles: HashSet<&str> = tasks.iter().map(|t| t.title.as_str()).collect();
        for task in tasks {
            for dep in &task.dependencies {
                if !known_titles.contains(dep.as_str()) {
                    return Err(TaskforgeError::Oracle(format!(
                        "task '{}' depends on unknown task '{}'",
                        task.title, dep
                    )));
                }
            }
        }

        let mut steps = Vec::new();
        let mut satisfied: HashSet<&str> = HashSet::new();
        let mut remaining: Vec<&Task> = tasks.iter().collect();

        while !remaining.is_empty() {
            let (layer, rest): (Vec<&Task>, Vec<&Task>) = remaining.into_iter().partition(|t| {
                t.dependencies.iter().all(|d| satisfied.contains(d.as_str()))
            });

            if layer.is_empty() {
                let stuck: Vec<&str> = rest.iter().map(|t| t.title.as_str()).collect();
                return Err(TaskforgeError::Oracle(format!(
                    "dependency cycle among tasks: {stuck:?}"
                )));
            }

            for task in &layer {
                satisfied.insert(task.title.as_str());
            }

            let parallel = layer.len() > 1;
            steps.push(
                PlanStep::new(
                    format!("step-{}", steps.len()),
                    layer.iter().map(|t| t.task_id.clone()).collect(),
                )
                .with_parallel(parallel),
            );
            remaining = rest;
        }

        Ok(Plan::new(steps))
    }
}
