//! In-process communication primitives for the Taskforge framework.
//!
//! Provides the publish/subscribe transport used for orchestrator↔agent RPC
//! and the shared key/value context agents use to exchange state.
//!
//! # Main types
//!
//! - [`MessageBroker`] — Pub/sub transport trait.
//! - [`InMemoryBroker`] — At-most-once, in-process broker with a history log.
//! - [`SharedContext`] — Last-writer-wins concurrent key/value store.

/// Message broker trait and in-memory implementation.
pub mod broker;
/// Shared cross-agent key/value context.
pub mod context;

pub use broker::{InMemoryBroker, MessageBroker, MessageHandler};
pub use context::SharedContext;
