//! Goal orchestration engine.
//!
//! The [`Orchestrator`] accepts high-level goals and drives each one through
//! a four-phase pipeline: a [`Decomposer`] splits the goal into subtasks, a
//! [`Planner`] sequences them into steps, a [`TaskAllocator`] matches them to
//! registered agents, and the engine executes the plan over the message
//! broker, correlating each dispatch with its reply.
//!
//! Progress is observable at two levels: per-execution records polled via
//! [`Orchestrator::get_execution_status`] and per-task/per-agent state held
//! by the [`ProgressMonitor`].

/// Capability-based task-to-agent allocation.
pub mod allocator;
/// The orchestration pipeline.
pub mod engine;
/// Task and agent progress tracking with update callbacks.
pub mod monitor;
/// Decomposition and planning seams.
pub mod oracle;
/// Agent and resource registries.
pub mod registry;

pub use allocator::{CapabilityAllocator, TaskAllocator};
pub use engine::Orchestrator;
pub use monitor::{AgentRecord, AgentUpdate, CallbackId, ProgressMonitor, TaskCallback, TaskUpdate};
pub use oracle::{Decomposer, DependencyPlanner, Planner};
pub use registry::{AgentRegistry, InMemoryRegistry};
