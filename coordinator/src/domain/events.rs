// Copyright (c) 2026 Hivemind Systems
// SPDX-License-Identifier: AGPL-3.0
//! Bounded in-memory log of swarm lifecycle and protocol events.
//!
//! Diagnostic only: never persisted, oldest entries are dropped once the
//! configured capacity is reached.

use crate::domain::agent::AgentId;
use crate::domain::consensus::RoundOutcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SwarmEvent {
    AgentSpawned { agent: AgentId, role: String },
    AgentFailed { agent: AgentId },
    AgentTerminated { agent: AgentId },
    LeaderElected { agent: AgentId, term: u64 },
    RoundCompleted { round: u64, outcome: RoundOutcome },
    /// The reconcile loop corrected drift between target and actual count.
    ReconcileCorrection { delta: i64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub at: DateTime<Utc>,
    pub event: SwarmEvent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLog {
    capacity: usize,
    entries: VecDeque<EventRecord>,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: VecDeque::new(),
        }
    }

    pub fn record(&mut self, event: SwarmEvent) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(EventRecord {
            at: Utc::now(),
            event,
        });
    }

    /// All retained entries, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &EventRecord> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
