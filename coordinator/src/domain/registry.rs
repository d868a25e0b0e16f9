// Copyright (c) 2026 Hivemind Systems
// SPDX-License-Identifier: AGPL-3.0
//! Authoritative in-memory table of agent identity -> lifecycle state.
//!
//! The registry is exclusively owned and serialized by the coordinator, so it
//! takes `&mut self` directly rather than hiding behind interior mutability.
//! Listings are stable in registration order.

use crate::domain::agent::{Agent, AgentId, AgentState};
use crate::domain::error::CoordinationError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentRegistry {
    agents: HashMap<AgentId, Agent>,
    /// Registration order; removal keeps relative order of survivors.
    order: Vec<AgentId>,
    next_sequence: u64,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new agent in state `Pending`, assigning its registration
    /// sequence number.
    pub fn register(&mut self, mut agent: Agent) -> Result<AgentId, CoordinationError> {
        if self.agents.contains_key(&agent.id) {
            return Err(CoordinationError::DuplicateIdentity(agent.id));
        }
        agent.state = AgentState::Pending;
        agent.sequence = self.next_sequence;
        self.next_sequence += 1;
        let id = agent.id;
        self.order.push(id);
        self.agents.insert(id, agent);
        Ok(id)
    }

    /// Move an agent to `next`, enforcing the state machine. Touches the
    /// agent's heartbeat on success; leaves the prior state unchanged on
    /// failure.
    pub fn transition(&mut self, id: AgentId, next: AgentState) -> Result<(), CoordinationError> {
        let agent = self
            .agents
            .get_mut(&id)
            .ok_or(CoordinationError::UnknownAgent(id))?;
        if !agent.state.can_transition_to(next) {
            return Err(CoordinationError::IllegalTransition {
                from: agent.state,
                to: next,
            });
        }
        agent.state = next;
        agent.touch_heartbeat();
        Ok(())
    }

    pub fn get(&self, id: AgentId) -> Result<&Agent, CoordinationError> {
        self.agents
            .get(&id)
            .ok_or_else(|| CoordinationError::NotFound(format!("agent {id}")))
    }

    pub(crate) fn get_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        self.agents.get_mut(&id)
    }

    pub fn contains(&self, id: AgentId) -> bool {
        self.agents.contains_key(&id)
    }

    /// All agents in `state`, in registration order.
    pub fn list_by_state(&self, state: AgentState) -> Vec<&Agent> {
        self.iter().filter(|a| a.state == state).collect()
    }

    /// All agents, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Agent> {
        self.order.iter().filter_map(|id| self.agents.get(id))
    }

    /// Remove an agent. Only permitted once it is `Terminated`.
    pub fn remove(&mut self, id: AgentId) -> Result<(), CoordinationError> {
        let agent = self
            .agents
            .get(&id)
            .ok_or(CoordinationError::UnknownAgent(id))?;
        if !agent.state.is_terminal() {
            return Err(CoordinationError::NotTerminated(id));
        }
        self.agents.remove(&id);
        self.order.retain(|&other| other != id);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Ids of topology members (pending/active/draining), registration order.
    pub fn topology_members(&self) -> Vec<AgentId> {
        self.iter()
            .filter(|a| a.state.in_topology())
            .map(|a| a.id)
            .collect()
    }

    /// Ids eligible for a new consensus participant set, registration order.
    pub fn consensus_participants(&self) -> Vec<AgentId> {
        self.iter()
            .filter(|a| a.state.consensus_eligible())
            .map(|a| a.id)
            .collect()
    }

    pub fn count_in_state(&self, state: AgentState) -> usize {
        self.agents.values().filter(|a| a.state == state).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_assigns_sequence_and_pending() {
        let mut registry = AgentRegistry::new();
        let a = registry.register(Agent::new("worker")).unwrap();
        let b = registry.register(Agent::new("worker")).unwrap();

        assert_eq!(registry.get(a).unwrap().sequence, 0);
        assert_eq!(registry.get(b).unwrap().sequence, 1);
        assert_eq!(registry.get(a).unwrap().state, AgentState::Pending);
    }

    #[test]
    fn test_register_rejects_duplicate_identity() {
        let mut registry = AgentRegistry::new();
        let agent = Agent::new("worker");
        let id = agent.id;
        registry.register(agent.clone()).unwrap();

        let err = registry.register(agent).unwrap_err();
        assert!(matches!(err, CoordinationError::DuplicateIdentity(dup) if dup == id));
    }

    #[test]
    fn test_transition_enforces_state_machine() {
        let mut registry = AgentRegistry::new();
        let id = registry.register(Agent::new("worker")).unwrap();

        registry.transition(id, AgentState::Active).unwrap();
        let err = registry.transition(id, AgentState::Terminated).unwrap_err();
        assert!(matches!(
            err,
            CoordinationError::IllegalTransition {
                from: AgentState::Active,
                to: AgentState::Terminated,
            }
        ));
        // Failed attempt leaves the prior state unchanged.
        assert_eq!(registry.get(id).unwrap().state, AgentState::Active);
    }

    #[test]
    fn test_transition_unknown_agent() {
        let mut registry = AgentRegistry::new();
        let err = registry
            .transition(AgentId::new(), AgentState::Active)
            .unwrap_err();
        assert!(matches!(err, CoordinationError::UnknownAgent(_)));
    }

    #[test]
    fn test_list_by_state_is_registration_ordered() {
        let mut registry = AgentRegistry::new();
        let a = registry.register(Agent::new("worker")).unwrap();
        let b = registry.register(Agent::new("worker")).unwrap();
        let c = registry.register(Agent::new("worker")).unwrap();
        registry.transition(a, AgentState::Active).unwrap();
        registry.transition(c, AgentState::Active).unwrap();

        let active: Vec<AgentId> = registry
            .list_by_state(AgentState::Active)
            .iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(active, vec![a, c]);
        assert_eq!(registry.list_by_state(AgentState::Pending)[0].id, b);
    }

    #[test]
    fn test_remove_requires_terminated() {
        let mut registry = AgentRegistry::new();
        let id = registry.register(Agent::new("worker")).unwrap();
        registry.transition(id, AgentState::Active).unwrap();

        let err = registry.remove(id).unwrap_err();
        assert!(matches!(err, CoordinationError::NotTerminated(_)));

        registry.transition(id, AgentState::Draining).unwrap();
        registry.transition(id, AgentState::Terminated).unwrap();
        registry.remove(id).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_sequence_not_reused_after_removal() {
        let mut registry = AgentRegistry::new();
        let a = registry.register(Agent::new("worker")).unwrap();
        registry.transition(a, AgentState::Active).unwrap();
        registry.transition(a, AgentState::Draining).unwrap();
        registry.transition(a, AgentState::Terminated).unwrap();
        registry.remove(a).unwrap();

        let b = registry.register(Agent::new("worker")).unwrap();
        assert_eq!(registry.get(b).unwrap().sequence, 1);
    }
}
