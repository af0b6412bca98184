use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use taskforge_core::{AgentDescriptor, Task};
use tracing::warn;

/// Matches tasks to agents by required capability set.
#[async_trait]
pub trait TaskAllocator: Send + Sync {
    /// Allocates tasks to agents, returning a mapping from agent id to the
    /// ordered list of task ids assigned to it. Tasks no agent can satisfy
    /// are absent from the mapping.
    async fn allocate(
        &self,
        tasks: &[Task],
        available_agents: &[AgentDescriptor],
    ) -> HashMap<String, Vec<String>>;
}

/// Capability-based allocator with a deterministic tie-break.
///
/// For each task the candidate set is the intersection of the agents holding
/// every required capability (all agents when the task requires none). From a
/// non-empty candidate set the lexicographically smallest `agent_id` wins,
/// so repeated allocations over the same inputs are identical. A task with
/// an empty candidate set is reported as a warning and left unallocated; the
/// orchestrator later marks it skipped.
pub struct CapabilityAllocator;

impl CapabilityAllocator {
    /// Creates the allocator.
    pub fn new() -> Self {
        Self
    }
}

impl Default for CapabilityAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskAllocator for CapabilityAllocator {
    async fn allocate(
        &self,
        tasks: &[Task],
        available_agents: &[AgentDescriptor],
    ) -> HashMap<String, Vec<String>> {
        // Inverted index: capability -> ordered set of agent ids.
        let mut capability_index: HashMap<&str, BTreeSet<&str>> = HashMap::new();
        for agent in available_agents {
            for capability in &agent.capabilities {
                capability_index
                    .entry(capability.as_str())
                    .or_default()
                    .insert(agent.agent_id.as_str());
            }
        }

        let all_agents: BTreeSet<&str> = available_agents
            .iter()
            .map(|a| a.agent_id.as_str())
            .collect();

        let mut allocations: HashMap<String, Vec<String>> = HashMap::new();

        for task in tasks {
            let candidates: BTreeSet<&str> = if task.required_capabilities.is_empty() {
                all_agents.clone()
            } else {
                let mut sets = task
                    .required_capabilities
                    .iter()
                    .map(|cap| capability_index.get(cap.as_str()).cloned().unwrap_or_default());
                let first = sets.next().unwrap_or_default();
                sets.fold(first, |acc, set| &acc & &set)
            };

            match candidates.first() {
                Some(agent_id) => {
                    allocations
                        .entry((*agent_id).to_string())
                        .or_default()
                        .push(task.task_id.clone());
                }
                None => {
                    warn!(
                        task = %task.task_id,
                        capabilities = ?task.required_capabilities,
                        "no suitable agent for task"
                    );
                }
            }
        }

        allocations
    }
}
