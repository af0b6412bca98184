use crate::error::TaskforgeResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Scheduling status of an agent as tracked by the progress monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    /// Registered but holding no tasks.
    Idle,
    /// Tasks allocated, none dispatched yet.
    Assigned,
    /// Currently processing at least one task.
    Busy,
}

/// Registration metadata describing a worker agent.
///
/// The capability set is fixed at registration; re-registering the same
/// `agent_id` replaces the descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDescriptor {
    /// Unique agent identifier.
    pub agent_id: String,
    /// Human-readable name.
    pub name: String,
    /// Description of the agent's purpose.
    pub description: String,
    /// Capability tags this agent carries.
    pub capabilities: Vec<String>,
}

impl AgentDescriptor {
    /// Creates a descriptor with no capabilities.
    pub fn new(agent_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            name: name.into(),
            description: String::new(),
            capabilities: Vec::new(),
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the capability tags.
    pub fn with_capabilities(mut self, capabilities: Vec<String>) -> Self {
        self.capabilities = capabilities;
        self
    }
}

/// A capability-bearing worker that processes task content and returns a
/// result.
///
/// Agents are invoked only through the message-broker RPC binding installed
/// by the orchestrator at registration time; they never see the broker
/// directly.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Registration metadata for this agent.
    fn descriptor(&self) -> AgentDescriptor;

    /// Process an input payload with contextual information and return a
    /// result payload.
    async fn process(
        &self,
        input: serde_json::Value,
        context: serde_json::Value,
    ) -> TaskforgeResult<serde_json::Value>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_builder() {
        let desc = AgentDescriptor::new("research-agent", "Research Specialist")
            .with_description("Gathers information")
            .with_capabilities(vec!["research".into(), "web_search".into()]);
        assert_eq!(desc.agent_id, "research-agent");
        assert_eq!(desc.capabilities.len(), 2);
    }

    #[test]
    fn test_agent_status_serialization() {
        assert_eq!(
            serde_json::to_string(&AgentStatus::Assigned).unwrap(),
            "\"assigned\""
        );
        let parsed: AgentStatus = serde_json::from_str("\"busy\"").unwrap();
        assert_eq!(parsed, AgentStatus::Busy);
    }
}
