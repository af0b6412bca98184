use crate::allocator::{CapabilityAllocator, TaskAllocator};
use crate::monitor::{AgentUpdate, ProgressMonitor, TaskUpdate};
use crate::oracle::{Decomposer, Planner};
use crate::registry::{AgentRegistry, InMemoryRegistry};
use chrono::Utc;
use futures_util::future::join_all;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use taskforge_comms::{InMemoryBroker, MessageBroker, MessageHandler, SharedContext};
use taskforge_core::{
    Agent, AgentStatus, ExecutionRecord, ExecutionStatus, Message, MessageType, Task, TaskStatus,
    TaskforgeError, TaskforgeResult,
};
use tokio::sync::{oneshot, Mutex, RwLock};
use tracing::{error, info, warn};
use uuid::Uuid;

const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(30);

/// Drives the full orchestration pipeline:
/// decompose → plan → allocate → execute.
///
/// Owns the shared services (agent registry, progress monitor, broker,
/// shared context) and the per-goal execution records. Cloning is cheap and
/// yields a handle to the same underlying state, which is how the pipeline
/// is spawned as an independent task.
#[derive(Clone)]
pub struct Orchestrator {
    orchestrator_id: String,
    decomposer: Option<Arc<dyn Decomposer>>,
    planner: Option<Arc<dyn Planner>>,
    allocator: Arc<dyn TaskAllocator>,
    agents: Arc<AgentRegistry>,
    tools: Arc<InMemoryRegistry>,
    monitor: Arc<ProgressMonitor>,
    broker: Arc<InMemoryBroker>,
    context: Arc<SharedContext>,
    executions: Arc<RwLock<HashMap<String, ExecutionRecord>>>,
    pending_replies: Arc<Mutex<HashMap<Uuid, oneshot::Sender<Message>>>>,
    reply_route_installed: Arc<AtomicBool>,
    task_timeout: Duration,
}

impl Orchestrator {
    /// Creates an orchestrator with fresh services, a capability-based
    /// allocator, and no reasoning collaborators configured.
    pub fn new() -> Self {
        Self {
            orchestrator_id: format!("orchestrator-{}", Uuid::new_v4()),
            decomposer: None,
            planner: None,
            allocator: Arc::new(CapabilityAllocator::new()),
            agents: Arc::new(AgentRegistry::new()),
            tools: Arc::new(InMemoryRegistry::new()),
            monitor: Arc::new(ProgressMonitor::new()),
            broker: Arc::new(InMemoryBroker::new()),
            context: Arc::new(SharedContext::new()),
            executions: Arc::new(RwLock::new(HashMap::new())),
            pending_replies: Arc::new(Mutex::new(HashMap::new())),
            reply_route_installed: Arc::new(AtomicBool::new(false)),
            task_timeout: DEFAULT_TASK_TIMEOUT,
        }
    }

    /// Sets the decomposition collaborator.
    pub fn with_decomposer(mut self, decomposer: Arc<dyn Decomposer>) -> Self {
        self.decomposer = Some(decomposer);
        self
    }

    /// Sets the planning collaborator.
    pub fn with_planner(mut self, planner: Arc<dyn Planner>) -> Self {
        self.planner = Some(planner);
        self
    }

    /// Replaces the default capability-based allocator.
    pub fn with_allocator(mut self, allocator: Arc<dyn TaskAllocator>) -> Self {
        self.allocator = allocator;
        self
    }

    /// Sets the per-task reply timeout (default 30s). A task whose agent
    /// does not reply within this window is marked failed.
    pub fn with_task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout = timeout;
        self
    }

    /// The progress monitor shared by all pipelines.
    pub fn monitor(&self) -> &Arc<ProgressMonitor> {
        &self.monitor
    }

    /// The message broker routing orchestrator↔agent traffic.
    pub fn broker(&self) -> &Arc<InMemoryBroker> {
        &self.broker
    }

    /// The registry of worker agent descriptors.
    pub fn agent_registry(&self) -> &Arc<AgentRegistry> {
        &self.agents
    }

    /// The generic registry for tools and other resources.
    pub fn tool_registry(&self) -> &Arc<InMemoryRegistry> {
        &self.tools
    }

    /// The cross-agent shared key/value context.
    pub fn shared_context(&self) -> &Arc<SharedContext> {
        &self.context
    }

    /// Registers an agent: stores its descriptor, starts monitoring it, and
    /// installs the RPC binding that routes broker messages into
    /// [`Agent::process`].
    ///
    /// On success for a message that expects a reply the binding publishes a
    /// correlated response back to the sender; on failure it publishes an
    /// error message instead.
    pub async fn register_agent(&self, agent: Arc<dyn Agent>) {
        let descriptor = agent.descriptor();
        self.agents.register(descriptor.clone());
        self.monitor.register_agent(descriptor.clone()).await;

        let agent_id = descriptor.agent_id.clone();
        let broker = self.broker.clone();
        let handler: MessageHandler = Arc::new(move |message: Message| {
            let agent = agent.clone();
            let broker = broker.clone();
            let agent_id = agent_id.clone();
            Box::pin(async move {
                let context = json!({
                    "message": serde_json::to_value(&message).unwrap_or_default(),
                });
                match agent.process(message.content.clone(), context).await {
                    Ok(result) => {
                        if message.message_type.expects_reply() {
                            broker
                                .publish(Message::response_to(&message, &agent_id, result))
                                .await;
                        }
                    }
                    Err(e) => {
                        error!(agent = %agent_id, error = %e, "agent failed to process message");
                        if message.message_type.expects_reply() {
                            broker
                                .publish(Message::error_to(
                                    &message,
                                    &agent_id,
                                    json!({"error": e.to_string()}),
                                ))
                                .await;
                        }
                    }
                }
                Ok(())
            })
        });
        self.broker.subscribe(&descriptor.agent_id, handler).await;
    }

    /// Accepts a goal for processing and returns its execution id.
    ///
    /// Fails fast with a configuration error when no decomposer or planner
    /// is set. The pipeline itself runs as a spawned task; the caller
    /// observes progress by polling [`Orchestrator::get_execution_status`].
    pub async fn process_goal(
        &self,
        goal: &str,
        context: serde_json::Value,
    ) -> TaskforgeResult<String> {
        if self.decomposer.is_none() {
            return Err(TaskforgeError::Config("no decomposer configured".into()));
        }
        if self.planner.is_none() {
            return Err(TaskforgeError::Config("no planner configured".into()));
        }
        self.ensure_reply_route().await;

        let execution_id = Uuid::new_v4().to_string();
        let record = ExecutionRecord::new(&execution_id, goal, context);
        self.executions
            .write()
            .await
            .insert(execution_id.clone(), record);

        info!(execution = %execution_id, goal = %goal, "accepted goal");

        let this = self.clone();
        let id = execution_id.clone();
        tokio::spawn(async move {
            if let Err(e) = this.run_pipeline(&id).await {
                error!(execution = %id, error = %e, "execution failed");
                let mut executions = this.executions.write().await;
                if let Some(record) = executions.get_mut(&id) {
                    record.fail(e.to_string());
                }
            }
        });

        Ok(execution_id)
    }

    /// Returns a snapshot of one execution record, if known.
    pub async fn get_execution_status(&self, execution_id: &str) -> Option<ExecutionRecord> {
        self.executions.read().await.get(execution_id).cloned()
    }

    /// Returns a snapshot of every execution record.
    pub async fn get_all_executions(&self) -> HashMap<String, ExecutionRecord> {
        self.executions.read().await.clone()
    }

    /// Subscribes the orchestrator's own id once, routing correlated
    /// response/error messages into the pending-reply channels.
    async fn ensure_reply_route(&self) {
        if self.reply_route_installed.swap(true, Ordering::SeqCst) {
            return;
        }
        let pending = self.pending_replies.clone();
        let handler: MessageHandler = Arc::new(move |message: Message| {
            let pending = pending.clone();
            Box::pin(async move {
                if matches!(
                    message.message_type,
                    MessageType::Response | MessageType::Error
                ) {
                    if let Some(tx) = pending.lock().await.remove(&message.conversation_id) {
                        let _ = tx.send(message);
                    }
                }
                Ok(())
            })
        });
        self.broker.subscribe(&self.orchestrator_id, handler).await;
    }

    async fn advance(&self, execution_id: &str, status: ExecutionStatus) {
        let mut executions = self.executions.write().await;
        if let Some(record) = executions.get_mut(execution_id) {
            record.advance(status);
        }
    }

    /// Runs the pipeline for one execution. Any error is turned into a
    /// failed record by the caller.
    async fn run_pipeline(&self, execution_id: &str) -> TaskforgeResult<()> {
        let (goal, context) = {
            let executions = self.executions.read().await;
            let record = executions.get(execution_id).ok_or_else(|| {
                TaskforgeError::Orchestrator(format!("unknown execution: {execution_id}"))
            })?;
            (record.goal.clone(), record.context.clone())
        };
        let decomposer = self
            .decomposer
            .clone()
            .ok_or_else(|| TaskforgeError::Config("no decomposer configured".into()))?;
        let planner = self
            .planner
            .clone()
            .ok_or_else(|| TaskforgeError::Config("no planner configured".into()))?;

        // Step 1: decompose the goal into subtasks with stable ids.
        self.advance(execution_id, ExecutionStatus::Decomposing).await;
        info!(execution = %execution_id, "decomposing goal");
        let specs = decomposer.decompose(&goal, &context).await?;
        let mut tasks = Vec::with_capacity(specs.len());
        for (n, spec) in specs.into_iter().enumerate() {
            let task = Task::from_spec(format!("{execution_id}-task-{n}"), spec);
            self.monitor.register_task(task.clone()).await;
            tasks.push(task);
        }
        {
            let mut executions = self.executions.write().await;
            if let Some(record) = executions.get_mut(execution_id) {
                record.subtasks = tasks.iter().map(|t| t.task_id.clone()).collect();
            }
        }

        // Step 2: sequence the subtasks into a plan.
        self.advance(execution_id, ExecutionStatus::Planning).await;
        info!(execution = %execution_id, subtasks = tasks.len(), "planning execution");
        let plan = planner.plan(&tasks, &context).await?;
        {
            let mut executions = self.executions.write().await;
            if let Some(record) = executions.get_mut(execution_id) {
                record.plan = Some(plan.clone());
            }
        }

        // Step 3: allocate tasks to the currently registered agents.
        self.advance(execution_id, ExecutionStatus::Allocating).await;
        let available = self.agents.snapshot();
        info!(execution = %execution_id, agents = available.len(), "allocating tasks");
        let allocations = self.allocator.allocate(&tasks, &available).await;
        for (agent_id, task_ids) in &allocations {
            for task_id in task_ids {
                self.monitor
                    .update_task(task_id, TaskUpdate::new().with_assigned_agent(agent_id))
                    .await;
            }
            self.monitor
                .update_agent(
                    agent_id,
                    AgentUpdate::new()
                        .with_status(AgentStatus::Assigned)
                        .with_current_tasks(task_ids.clone()),
                )
                .await;
        }

        // Step 4: walk the plan, dispatching each step's tasks.
        self.advance(execution_id, ExecutionStatus::Executing).await;
        let mut task_refs: HashMap<&str, &str> = HashMap::new();
        for task in &tasks {
            task_refs.insert(task.task_id.as_str(), task.task_id.as_str());
            task_refs.insert(task.title.as_str(), task.task_id.as_str());
        }

        let mut results = serde_json::Map::new();
        for (step_index, step) in plan.steps.iter().enumerate() {
            let step_id = format!("{execution_id}-step-{step_index}");
            info!(execution = %execution_id, step = %step.name, parallel = step.parallel, "executing step");

            let mut step_results = serde_json::Map::new();
            let mut resolved: Vec<String> = Vec::new();
            for reference in &step.tasks {
                match task_refs.get(reference.as_str()) {
                    Some(task_id) => resolved.push((*task_id).to_string()),
                    None => {
                        warn!(execution = %execution_id, reference = %reference, "unknown task reference in plan step");
                        step_results.insert(
                            reference.clone(),
                            json!({"status": "skipped", "error": "unknown task reference"}),
                        );
                    }
                }
            }

            if step.parallel {
                let dispatches = resolved
                    .iter()
                    .map(|task_id| self.dispatch_task(execution_id, task_id));
                for (task_id, outcome) in resolved.iter().zip(join_all(dispatches).await) {
                    step_results.insert(task_id.clone(), outcome);
                }
            } else {
                for task_id in &resolved {
                    let outcome = self.dispatch_task(execution_id, task_id).await;
                    step_results.insert(task_id.clone(), outcome);
                }
            }

            results.insert(step_id, serde_json::Value::Object(step_results));
        }

        // All steps walked: the execution is complete, individual task
        // failures are visible in the per-step results.
        let result = json!({
            "execution_id": execution_id,
            "steps_completed": plan.steps.len(),
            "results": results,
        });
        {
            let mut executions = self.executions.write().await;
            if let Some(record) = executions.get_mut(execution_id) {
                record.complete(result);
            }
        }
        info!(execution = %execution_id, "goal execution completed");
        Ok(())
    }

    /// Dispatches one task to its assigned agent and awaits the correlated
    /// reply up to the task timeout. Returns the per-task outcome recorded
    /// in the step results.
    async fn dispatch_task(&self, execution_id: &str, task_id: &str) -> serde_json::Value {
        let Some(task) = self.monitor.task(task_id).await else {
            warn!(task = %task_id, "task not registered, skipping");
            return json!({"status": "skipped", "error": "task not registered"});
        };
        let Some(agent_id) = task.assigned_agent.clone() else {
            warn!(task = %task_id, "no agent allocated, skipping task");
            self.monitor
                .update_task(
                    task_id,
                    TaskUpdate::new()
                        .with_status(TaskStatus::Skipped)
                        .with_end_time(Utc::now()),
                )
                .await;
            return json!({"status": "skipped", "error": "no suitable agent"});
        };

        self.monitor
            .update_task(
                task_id,
                TaskUpdate::new()
                    .with_status(TaskStatus::InProgress)
                    .with_start_time(Utc::now()),
            )
            .await;
        self.monitor
            .update_agent(&agent_id, AgentUpdate::new().with_status(AgentStatus::Busy))
            .await;

        let message = Message::task_execution(
            &self.orchestrator_id,
            &agent_id,
            json!({
                "task_id": task_id,
                "execution_id": execution_id,
                "task": task,
            }),
        );
        let conversation_id = message.conversation_id;
        let (tx, rx) = oneshot::channel();
        self.pending_replies.lock().await.insert(conversation_id, tx);

        // Delivery runs decoupled from this pipeline so an unresponsive
        // agent cannot block the dispatch beyond the timeout.
        let broker = self.broker.clone();
        tokio::spawn(async move {
            broker.publish(message).await;
        });

        let outcome = tokio::time::timeout(self.task_timeout, rx).await;
        self.pending_replies.lock().await.remove(&conversation_id);

        let result = match outcome {
            Ok(Ok(reply)) if reply.message_type == MessageType::Response => {
                self.monitor
                    .update_task(
                        task_id,
                        TaskUpdate::new()
                            .with_status(TaskStatus::Completed)
                            .with_result(reply.content.clone())
                            .with_end_time(Utc::now()),
                    )
                    .await;
                json!({"status": "completed", "result": reply.content})
            }
            Ok(Ok(reply)) => {
                let error = reply
                    .content
                    .get("error")
                    .and_then(|e| e.as_str())
                    .unwrap_or("agent reported an error")
                    .to_string();
                self.fail_task(task_id, &error).await;
                json!({"status": "failed", "error": error})
            }
            Ok(Err(_)) => {
                let error = "reply channel closed before a response arrived".to_string();
                self.fail_task(task_id, &error).await;
                json!({"status": "failed", "error": error})
            }
            Err(_) => {
                let error = format!(
                    "agent {agent_id} did not reply within {:?}",
                    self.task_timeout
                );
                self.fail_task(task_id, &error).await;
                json!({"status": "failed", "error": error})
            }
        };

        self.monitor
            .update_agent(&agent_id, AgentUpdate::new().with_completed_task(task_id))
            .await;
        if let Some(record) = self.monitor.agent(&agent_id).await {
            if record.current_tasks.is_empty() {
                self.monitor
                    .update_agent(&agent_id, AgentUpdate::new().with_status(AgentStatus::Idle))
                    .await;
            }
        }
        result
    }

    async fn fail_task(&self, task_id: &str, error: &str) {
        error!(task = %task_id, error = %error, "task failed");
        self.monitor
            .update_task(
                task_id,
                TaskUpdate::new()
                    .with_status(TaskStatus::Failed)
                    .with_error(error)
                    .with_end_time(Utc::now()),
            )
            .await;
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}
