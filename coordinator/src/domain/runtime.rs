// Copyright (c) 2026 Hivemind Systems
// SPDX-License-Identifier: AGPL-3.0
//! Ports onto the external collaborators: the agent runtime launcher and the
//! message transport.
//!
//! Both are injected into the coordinator at construction; there is no
//! ambient lookup and no fallback. Transport delivery is at-most-once,
//! unordered across participants, and may be lost; the consensus variants
//! tolerate loss by treating a missing reply as silence, never as a vote.

use crate::domain::agent::AgentId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("failed to launch agent runtime: {0}")]
    Failed(String),
    #[error("launch confirmation not received in time")]
    Timeout,
}

/// Result of a heartbeat probe against a running agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeResult {
    Alive,
    Unreachable,
}

/// Launches agent runtimes and probes their liveness. The spawning mechanics
/// (containers, processes, remote nodes) live entirely behind this trait.
#[async_trait]
pub trait AgentLauncher: Send + Sync {
    async fn launch(&self, role: &str) -> Result<(), LaunchError>;
    async fn probe_heartbeat(&self, id: AgentId) -> ProbeResult;
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

/// A participant's explicit answer to a round proposal. Participants that do
/// not answer within the round timeout simply have no [`RoundReply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vote {
    Accept,
    Reject,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundReply {
    pub from: AgentId,
    pub vote: Vote,
}

/// Message-passing substrate used by the consensus variants.
#[async_trait]
pub trait MessageTransport: Send + Sync {
    /// Broadcast a proposal payload and collect the replies that arrived.
    /// Lost deliveries and silent participants are simply absent from the
    /// returned set.
    async fn broadcast(
        &self,
        participants: &[AgentId],
        payload: serde_json::Value,
    ) -> Result<Vec<RoundReply>, TransportError>;

    async fn send_direct(
        &self,
        to: AgentId,
        payload: serde_json::Value,
    ) -> Result<(), TransportError>;
}
