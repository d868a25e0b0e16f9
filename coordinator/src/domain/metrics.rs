// Copyright (c) 2026 Hivemind Systems
// SPDX-License-Identifier: AGPL-3.0
//! Point-in-time metrics derived from registry + consensus state.
//!
//! Snapshots are immutable, timestamped, recomputed on demand, and never
//! persisted. The aggregator reads, never writes.

use crate::domain::agent::{AgentId, AgentState};
use crate::domain::swarm::{Swarm, SwarmId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub swarm_id: SwarmId,
    pub captured_at: DateTime<Utc>,
    pub target_count: usize,
    pub active_count: usize,
    pub pending_count: usize,
    pub draining_count: usize,
    pub failed_count: usize,
    pub topology_edge_count: usize,
    pub consensus_round: u64,
    pub current_leader: Option<AgentId>,
    pub uptime_seconds: i64,
}

impl MetricsSnapshot {
    pub fn capture(swarm: &Swarm) -> Self {
        let now = Utc::now();
        Self {
            swarm_id: swarm.id,
            captured_at: now,
            target_count: swarm.target_count,
            active_count: swarm.registry.count_in_state(AgentState::Active),
            pending_count: swarm.registry.count_in_state(AgentState::Pending),
            draining_count: swarm.registry.count_in_state(AgentState::Draining),
            failed_count: swarm.registry.count_in_state(AgentState::Failed),
            topology_edge_count: swarm.topology.edge_count(),
            consensus_round: swarm.session.as_ref().map(|s| s.round()).unwrap_or(0),
            current_leader: swarm.session.as_ref().and_then(|s| s.leader()),
            uptime_seconds: (now - swarm.created_at).num_seconds(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::agent::Agent;
    use crate::domain::consensus::ConsensusKind;
    use crate::domain::topology::TopologyKind;

    #[test]
    fn test_snapshot_reflects_registry_and_topology() {
        let mut swarm = Swarm::new(TopologyKind::Mesh, ConsensusKind::Gossip, 3, 16);
        let a = swarm.registry.register(Agent::new("worker")).unwrap();
        let b = swarm.registry.register(Agent::new("worker")).unwrap();
        swarm.registry.transition(a, AgentState::Active).unwrap();
        swarm.registry.transition(b, AgentState::Active).unwrap();
        swarm.topology.rebuild(swarm.registry.topology_members());

        let snapshot = MetricsSnapshot::capture(&swarm);
        assert_eq!(snapshot.target_count, 3);
        assert_eq!(snapshot.active_count, 2);
        assert_eq!(snapshot.pending_count, 0);
        assert_eq!(snapshot.topology_edge_count, 1);
        assert_eq!(snapshot.consensus_round, 0);
        assert_eq!(snapshot.current_leader, None);
    }
}
