//! End-to-end orchestration tests.
//!
//! Drives the full decompose → plan → allocate → execute pipeline with mock
//! decomposers and agents. Checks: non-blocking goal acceptance, capability
//! allocation, reply correlation, skipped tasks when no agent fits, pipeline
//! failure capture, and the per-task timeout.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use taskforge_core::{
    Agent, AgentDescriptor, ExecutionRecord, ExecutionStatus, Plan, Task, TaskSpec, TaskStatus,
    TaskforgeError, TaskforgeResult,
};
use taskforge_orchestrator::{Decomposer, DependencyPlanner, Orchestrator, Planner};

// ---------------------------------------------------------------------------
// Mock collaborators
// ---------------------------------------------------------------------------

/// Decomposer returning a fixed set of task specs regardless of the goal.
struct FixedDecomposer {
    specs: Vec<TaskSpec>,
}

#[async_trait]
impl Decomposer for FixedDecomposer {
    async fn decompose(&self, _goal: &str, _context: &Value) -> TaskforgeResult<Vec<TaskSpec>> {
        Ok(self.specs.clone())
    }
}

struct FailingPlanner;

#[async_trait]
impl Planner for FailingPlanner {
    async fn plan(&self, _tasks: &[Task], _context: &Value) -> TaskforgeResult<Plan> {
        Err(TaskforgeError::Oracle("planning backend unavailable".into()))
    }
}

/// Agent that answers every task with a deterministic payload.
struct EchoAgent {
    agent_id: String,
    capabilities: Vec<String>,
}

impl EchoAgent {
    fn new(agent_id: &str, capabilities: &[&str]) -> Self {
        Self {
            agent_id: agent_id.to_string(),
            capabilities: capabilities.iter().map(|c| (*c).to_string()).collect(),
        }
    }
}

#[async_trait]
impl Agent for EchoAgent {
    fn descriptor(&self) -> AgentDescriptor {
        AgentDescriptor::new(&self.agent_id, &self.agent_id)
            .with_capabilities(self.capabilities.clone())
    }

    async fn process(&self, input: Value, _context: Value) -> TaskforgeResult<Value> {
        let task_id = input["task_id"].as_str().unwrap_or("unknown").to_string();
        Ok(json!({"agent": self.agent_id, "task_id": task_id, "output": "done"}))
    }
}

/// Agent that never replies within any reasonable timeout.
struct SilentAgent;

#[async_trait]
impl Agent for SilentAgent {
    fn descriptor(&self) -> AgentDescriptor {
        AgentDescriptor::new("silent-agent", "Silent").with_capabilities(vec!["research".into()])
    }

    async fn process(&self, _input: Value, _context: Value) -> TaskforgeResult<Value> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(json!({}))
    }
}

/// Agent whose processing always fails.
struct BrokenAgent;

#[async_trait]
impl Agent for BrokenAgent {
    fn descriptor(&self) -> AgentDescriptor {
        AgentDescriptor::new("broken-agent", "Broken").with_capabilities(vec!["research".into()])
    }

    async fn process(&self, _input: Value, _context: Value) -> TaskforgeResult<Value> {
        Err(TaskforgeError::Agent("backend exploded".into()))
    }
}

async fn wait_for_terminal(orchestrator: &Orchestrator, execution_id: &str) -> ExecutionRecord {
    for _ in 0..200 {
        if let Some(record) = orchestrator.get_execution_status(execution_id).await {
            if record.status.is_terminal() {
                return record;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("execution {execution_id} did not reach a terminal state");
}

fn report_specs() -> Vec<TaskSpec> {
    vec![
        TaskSpec::new("research", "Gather market data")
            .with_capabilities(vec!["research".into()]),
        TaskSpec::new("write", "Write the report")
            .with_dependencies(vec!["research".into()])
            .with_capabilities(vec!["writing".into()]),
    ]
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_goal_completes_across_two_agents() {
    let orchestrator = Orchestrator::new()
        .with_decomposer(Arc::new(FixedDecomposer {
            specs: report_specs(),
        }))
        .with_planner(Arc::new(DependencyPlanner::new()));

    orchestrator
        .register_agent(Arc::new(EchoAgent::new("research-agent", &["research"])))
        .await;
    orchestrator
        .register_agent(Arc::new(EchoAgent::new("writer-agent", &["writing"])))
        .await;

    let id = orchestrator
        .process_goal("produce a market report", json!({"topic": "widgets"}))
        .await
        .unwrap();

    let record = wait_for_terminal(&orchestrator, &id).await;
    assert_eq!(record.status, ExecutionStatus::Completed);
    assert!(record.errors.is_empty());
    assert!(record.end_time.is_some());
    assert_eq!(record.subtasks.len(), 2);

    let result = record.result.unwrap();
    assert_eq!(result["execution_id"], id.as_str());
    assert_eq!(result["steps_completed"], 2);

    // Dependency-ordered plan: research first, then write.
    let research_id = format!("{id}-task-0");
    let write_id = format!("{id}-task-1");
    let step0 = &result["results"][format!("{id}-step-0")];
    let step1 = &result["results"][format!("{id}-step-1")];
    assert_eq!(step0[&research_id]["status"], "completed");
    assert_eq!(step0[&research_id]["result"]["agent"], "research-agent");
    assert_eq!(step1[&write_id]["status"], "completed");
    assert_eq!(step1[&write_id]["result"]["agent"], "writer-agent");

    let monitor = orchestrator.monitor();
    let research = monitor.task(&research_id).await.unwrap();
    assert_eq!(research.status, TaskStatus::Completed);
    assert_eq!(research.assigned_agent.as_deref(), Some("research-agent"));
    assert!(research.start_time.is_some() && research.end_time.is_some());
}

#[tokio::test]
async fn test_no_agents_skips_every_task() {
    let orchestrator = Orchestrator::new()
        .with_decomposer(Arc::new(FixedDecomposer {
            specs: report_specs(),
        }))
        .with_planner(Arc::new(DependencyPlanner::new()));

    let id = orchestrator
        .process_goal("produce a market report", json!({}))
        .await
        .unwrap();

    let record = wait_for_terminal(&orchestrator, &id).await;
    // Nothing to run is still a completed walk of the plan.
    assert_eq!(record.status, ExecutionStatus::Completed);

    for n in 0..2 {
        let task = orchestrator
            .monitor()
            .task(&format!("{id}-task-{n}"))
            .await
            .unwrap();
        assert_eq!(task.status, TaskStatus::Skipped);
        assert!(task.assigned_agent.is_none());
    }

    let result = record.result.unwrap();
    let step0 = &result["results"][format!("{id}-step-0")];
    assert_eq!(step0[format!("{id}-task-0")]["status"], "skipped");
}

#[tokio::test]
async fn test_planner_failure_fails_the_execution() {
    let orchestrator = Orchestrator::new()
        .with_decomposer(Arc::new(FixedDecomposer {
            specs: report_specs(),
        }))
        .with_planner(Arc::new(FailingPlanner));

    let id = orchestrator.process_goal("goal", json!({})).await.unwrap();

    let record = wait_for_terminal(&orchestrator, &id).await;
    assert_eq!(record.status, ExecutionStatus::Failed);
    assert!(record.errors[0].contains("planning backend unavailable"));
    assert!(record.end_time.is_some());
    assert!(record.result.is_none());
}

#[tokio::test]
async fn test_process_goal_is_non_blocking() {
    let orchestrator = Orchestrator::new()
        .with_decomposer(Arc::new(FixedDecomposer {
            specs: report_specs(),
        }))
        .with_planner(Arc::new(DependencyPlanner::new()));
    orchestrator
        .register_agent(Arc::new(EchoAgent::new("generalist", &["research", "writing"])))
        .await;

    let started = std::time::Instant::now();
    let id = orchestrator.process_goal("goal", json!({})).await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(1));

    // The record is observable immediately, in a pre-terminal state or later.
    assert!(orchestrator.get_execution_status(&id).await.is_some());
    let record = wait_for_terminal(&orchestrator, &id).await;
    assert_eq!(record.status, ExecutionStatus::Completed);
    assert_eq!(orchestrator.get_all_executions().await.len(), 1);
}

#[tokio::test]
async fn test_agent_error_fails_the_task_but_not_the_execution() {
    let orchestrator = Orchestrator::new()
        .with_decomposer(Arc::new(FixedDecomposer {
            specs: vec![
                TaskSpec::new("research", "Gather data").with_capabilities(vec!["research".into()])
            ],
        }))
        .with_planner(Arc::new(DependencyPlanner::new()));

    orchestrator.register_agent(Arc::new(BrokenAgent)).await;

    let id = orchestrator.process_goal("goal", json!({})).await.unwrap();
    let record = wait_for_terminal(&orchestrator, &id).await;

    assert_eq!(record.status, ExecutionStatus::Completed);
    let task = orchestrator
        .monitor()
        .task(&format!("{id}-task-0"))
        .await
        .unwrap();
    assert_eq!(task.status, TaskStatus::Failed);
    assert!(task.errors[0].contains("backend exploded"));
}

#[tokio::test]
async fn test_unresponsive_agent_times_out_the_task() {
    let orchestrator = Orchestrator::new()
        .with_decomposer(Arc::new(FixedDecomposer {
            specs: vec![
                TaskSpec::new("research", "Gather data").with_capabilities(vec!["research".into()])
            ],
        }))
        .with_planner(Arc::new(DependencyPlanner::new()))
        .with_task_timeout(Duration::from_millis(100));

    orchestrator.register_agent(Arc::new(SilentAgent)).await;

    let id = orchestrator.process_goal("goal", json!({})).await.unwrap();
    let record = wait_for_terminal(&orchestrator, &id).await;

    // A timed-out task fails; the execution itself still completes.
    assert_eq!(record.status, ExecutionStatus::Completed);
    let task = orchestrator
        .monitor()
        .task(&format!("{id}-task-0"))
        .await
        .unwrap();
    assert_eq!(task.status, TaskStatus::Failed);
    assert!(task.errors[0].contains("did not reply"));

    let result = record.result.unwrap();
    let outcome = &result["results"][format!("{id}-step-0")][format!("{id}-task-0")];
    assert_eq!(outcome["status"], "failed");
}
