// Copyright (c) 2026 Hivemind Systems
// SPDX-License-Identifier: AGPL-3.0
//! Agent identity and the lifecycle state machine.
//!
//! An [`Agent`] is owned exclusively by the
//! [`AgentRegistry`](crate::domain::registry::AgentRegistry); the topology
//! graph and consensus session refer to agents by [`AgentId`] only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for an [`Agent`] (UUID newtype).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(pub Uuid);

impl AgentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for AgentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Lifecycle state of an agent.
///
/// The legal transitions are:
///
/// ```text
/// Pending -> Active -> Draining -> Terminated
/// Pending | Active -> Failed -> Terminated
/// ```
///
/// Termination may also drain a still-pending agent directly
/// (`Pending -> Draining`), since it was never a consensus participant.
///
/// Anything else is rejected by the registry with `IllegalTransition`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentState {
    /// Registered, not yet confirmed reachable.
    Pending,
    /// Confirmed reachable; eligible for consensus and topology membership.
    Active,
    /// Marked for removal; kept in topology until in-flight rounds resolve,
    /// excluded from new round participant selection.
    Draining,
    /// Heartbeat missed or launch failed; excluded from topology immediately.
    Failed,
    /// Terminal; eligible for registry removal.
    Terminated,
}

impl AgentState {
    /// Whether the state machine permits moving from `self` to `next`.
    pub fn can_transition_to(self, next: AgentState) -> bool {
        use AgentState::*;
        matches!(
            (self, next),
            (Pending, Active)
                | (Pending, Failed)
                | (Pending, Draining)
                | (Active, Draining)
                | (Active, Failed)
                | (Draining, Terminated)
                | (Failed, Terminated)
        )
    }

    /// States counted as topology members (non-terminated, non-failed).
    pub fn in_topology(self) -> bool {
        matches!(self, AgentState::Pending | AgentState::Active | AgentState::Draining)
    }

    /// States eligible for selection into a new consensus participant set.
    pub fn consensus_eligible(self) -> bool {
        matches!(self, AgentState::Active)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, AgentState::Terminated)
    }
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AgentState::Pending => "pending",
            AgentState::Active => "active",
            AgentState::Draining => "draining",
            AgentState::Failed => "failed",
            AgentState::Terminated => "terminated",
        };
        f.write_str(s)
    }
}

/// A compute agent tracked by the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    /// Opaque role/type tag assigned at spawn time.
    pub role: String,
    pub state: AgentState,
    /// Registration sequence number, assigned by the registry. Drives the
    /// deterministic ordering used by topology rebuilds and leader election.
    pub sequence: u64,
    pub created_at: DateTime<Utc>,
    pub last_heartbeat: DateTime<Utc>,
    pub tasks_completed: u64,
    pub errors: u64,
}

impl Agent {
    pub fn new(role: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: AgentId::new(),
            role: role.into(),
            state: AgentState::Pending,
            sequence: 0,
            created_at: now,
            last_heartbeat: now,
            tasks_completed: 0,
            errors: 0,
        }
    }

    pub fn touch_heartbeat(&mut self) {
        self.last_heartbeat = Utc::now();
    }
}
