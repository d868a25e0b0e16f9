// Copyright (c) 2026 Hivemind Systems
// SPDX-License-Identifier: AGPL-3.0
//! The [`Swarm`] aggregate root.
//!
//! A swarm is created once at initialization and mutated throughout its
//! lifetime by spawn/terminate/scale operations and the reconcile loop. All
//! mutation is serialized by the coordinator: the aggregate itself has no
//! interior locking.
//!
//! # Invariants
//!
//! - Topology edges only reference non-terminated, non-failed agents; the
//!   coordinator rebuilds the graph synchronously on every membership change.
//! - The consensus session, when open, only names registry-known agents.

use crate::domain::agent::{AgentId, AgentState};
use crate::domain::consensus::{ConsensusKind, ConsensusSession};
use crate::domain::events::EventLog;
use crate::domain::registry::AgentRegistry;
use crate::domain::topology::{TopologyGraph, TopologyKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a [`Swarm`] (UUID newtype).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SwarmId(pub Uuid);

impl SwarmId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SwarmId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SwarmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Counts returned by a scale operation: partial success is reported, never
/// silently swallowed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaleReport {
    pub spawned: usize,
    pub terminated: usize,
    pub failed: usize,
}

#[derive(Debug)]
pub struct Swarm {
    pub id: SwarmId,
    pub topology_kind: TopologyKind,
    pub consensus_kind: ConsensusKind,
    pub target_count: usize,
    pub registry: AgentRegistry,
    pub topology: TopologyGraph,
    /// Open once the first agent becomes active; `None` again after shutdown.
    pub session: Option<ConsensusSession>,
    pub created_at: DateTime<Utc>,
    pub events: EventLog,
    /// Draining agents and the instant their grace window expires.
    pub drain_deadlines: HashMap<AgentId, DateTime<Utc>>,
    /// Agents whose launch confirmation is still outstanding.
    pub pending_launches: HashSet<AgentId>,
    /// Terminations queued behind an outstanding launch; applied as soon as
    /// the launch resolves so callers never observe a partial state.
    pub cancel_requested: HashSet<AgentId>,
    /// Consecutive reconcile-loop spawn failures, drives the backoff.
    pub spawn_failures: u32,
    /// Reconcile ticks left to skip before respawning is attempted again.
    pub backoff_ticks_remaining: u32,
}

impl Swarm {
    pub fn new(
        topology_kind: TopologyKind,
        consensus_kind: ConsensusKind,
        target_count: usize,
        event_capacity: usize,
    ) -> Self {
        Self {
            id: SwarmId::new(),
            topology_kind,
            consensus_kind,
            target_count,
            registry: AgentRegistry::new(),
            topology: TopologyGraph::new(topology_kind),
            session: None,
            created_at: Utc::now(),
            events: EventLog::new(event_capacity),
            drain_deadlines: HashMap::new(),
            pending_launches: HashSet::new(),
            cancel_requested: HashSet::new(),
            spawn_failures: 0,
            backoff_ticks_remaining: 0,
        }
    }

    pub fn active_count(&self) -> usize {
        self.registry.count_in_state(AgentState::Active)
    }

    /// Desired-minus-actual population difference.
    pub fn reconcile_delta(&self) -> i64 {
        self.target_count as i64 - self.active_count() as i64
    }
}
