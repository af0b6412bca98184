use serde::{Deserialize, Serialize};

/// One step of an execution plan: a group of task references executed
/// together, either in parallel or one at a time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanStep {
    /// Human-readable step name.
    pub name: String,
    /// Task references (ids or titles) executed in this step.
    pub tasks: Vec<String>,
    /// When true, the step's tasks are dispatched concurrently.
    #[serde(default)]
    pub parallel: bool,
    /// Free-text preconditions for this step.
    #[serde(default)]
    pub conditions: Vec<String>,
    /// Expected outcome or success criteria.
    pub expected_outcome: Option<String>,
}

impl PlanStep {
    /// Creates a sequential step over the given task references.
    pub fn new(name: impl Into<String>, tasks: Vec<String>) -> Self {
        Self {
            name: name.into(),
            tasks,
            parallel: false,
            conditions: Vec::new(),
            expected_outcome: None,
        }
    }

    /// Marks the step's tasks for concurrent dispatch.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Sets the expected outcome description.
    pub fn with_expected_outcome(mut self, outcome: impl Into<String>) -> Self {
        self.expected_outcome = Some(outcome.into());
        self
    }
}

/// An ordered execution schedule produced by the planning collaborator.
/// Created once per execution and immutable thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    /// Steps in execution order.
    pub steps: Vec<PlanStep>,
}

impl Plan {
    /// Creates a plan from ordered steps.
    pub fn new(steps: Vec<PlanStep>) -> Self {
        Self { steps }
    }

    /// Total number of task references across all steps.
    pub fn task_count(&self) -> usize {
        self.steps.iter().map(|s| s.tasks.len()).sum()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_step_defaults() {
        let step = PlanStep::new("step-0", vec!["a".into(), "b".into()]);
        assert!(!step.parallel);
        assert!(step.conditions.is_empty());
        assert!(step.expected_outcome.is_none());
    }

    #[test]
    fn test_plan_task_count() {
        let plan = Plan::new(vec![
            PlanStep::new("step-0", vec!["a".into()]),
            PlanStep::new("step-1", vec!["b".into(), "c".into()]).with_parallel(true),
        ]);
        assert_eq!(plan.task_count(), 3);
        assert!(plan.steps[1].parallel);
    }

    #[test]
    fn test_step_parallel_default_on_deserialize() {
        let step: PlanStep =
            serde_json::from_str(r#"{"name": "s", "tasks": ["t"], "expected_outcome": null}"#)
                .unwrap();
        assert!(!step.parallel);
    }
}
