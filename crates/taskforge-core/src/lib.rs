//! Core types and error definitions for the Taskforge framework.
//!
//! This crate provides the foundational types shared across all Taskforge
//! crates: the task/plan/agent data model, the inter-agent message
//! representation, the execution state machine, and error handling.
//!
//! # Main types
//!
//! - [`TaskforgeError`] — Unified error enum for all Taskforge subsystems.
//! - [`TaskforgeResult`] — Convenience alias for `Result<T, TaskforgeError>`.
//! - [`Task`] / [`TaskSpec`] — A unit of decomposed work and its pre-id form.
//! - [`Plan`] / [`PlanStep`] — The ordered execution schedule.
//! - [`Agent`] / [`AgentDescriptor`] — The worker trait and its metadata.
//! - [`Message`] — The request/response envelope routed by the broker.
//! - [`ExecutionRecord`] — Root aggregate tracking one goal's pipeline.

/// Worker agent trait and registration metadata.
pub mod agent;
/// Error types.
pub mod error;
/// Execution state machine and record.
pub mod execution;
/// Inter-agent message envelope and types.
pub mod message;
/// Execution plans and steps.
pub mod plan;
/// Tasks and task specs.
pub mod task;

pub use agent::{Agent, AgentDescriptor, AgentStatus};
pub use error::{TaskforgeError, TaskforgeResult};
pub use execution::{ExecutionRecord, ExecutionStatus};
pub use message::{Message, MessageType, WILDCARD_RECEIVER};
pub use plan::{Plan, PlanStep};
pub use task::{Task, TaskSpec, TaskStatus};
