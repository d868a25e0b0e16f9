// Copyright (c) 2026 Hivemind Systems
// SPDX-License-Identifier: AGPL-3.0
//! Application layer: the coordinator service and the host-facing use-case
//! trait it implements.

pub mod coordinator;

pub use coordinator::SwarmCoordinator;

use crate::domain::agent::AgentId;
use crate::domain::consensus::ConsensusKind;
use crate::domain::metrics::MetricsSnapshot;
use crate::domain::swarm::{ScaleReport, SwarmId};
use crate::domain::topology::TopologyKind;
use anyhow::Result;
use async_trait::async_trait;

/// The operation set exposed to whatever transport/API layer the host system
/// binds (reporting, CLI, RPC). Hosts depend on this trait, not on
/// [`SwarmCoordinator`] directly.
#[async_trait]
pub trait SwarmService: Send + Sync {
    async fn initialize_swarm(
        &self,
        topology: TopologyKind,
        consensus: ConsensusKind,
        target_count: i64,
    ) -> Result<SwarmId>;
    async fn spawn_agent(&self, swarm_id: SwarmId, role: &str) -> Result<AgentId>;
    async fn terminate_agent(&self, swarm_id: SwarmId, agent_id: AgentId) -> Result<()>;
    async fn scale_swarm(&self, swarm_id: SwarmId, new_target: i64) -> Result<ScaleReport>;
    async fn status(&self, swarm_id: SwarmId) -> Result<MetricsSnapshot>;
    async fn shutdown_swarm(&self, swarm_id: SwarmId) -> Result<()>;
}

#[async_trait]
impl SwarmService for SwarmCoordinator {
    async fn initialize_swarm(
        &self,
        topology: TopologyKind,
        consensus: ConsensusKind,
        target_count: i64,
    ) -> Result<SwarmId> {
        Ok(SwarmCoordinator::initialize_swarm(self, topology, consensus, target_count).await?)
    }

    async fn spawn_agent(&self, swarm_id: SwarmId, role: &str) -> Result<AgentId> {
        Ok(SwarmCoordinator::spawn_agent(self, swarm_id, role).await?)
    }

    async fn terminate_agent(&self, swarm_id: SwarmId, agent_id: AgentId) -> Result<()> {
        Ok(SwarmCoordinator::terminate_agent(self, swarm_id, agent_id).await?)
    }

    async fn scale_swarm(&self, swarm_id: SwarmId, new_target: i64) -> Result<ScaleReport> {
        Ok(SwarmCoordinator::scale_swarm(self, swarm_id, new_target).await?)
    }

    async fn status(&self, swarm_id: SwarmId) -> Result<MetricsSnapshot> {
        Ok(SwarmCoordinator::status(self, swarm_id).await?)
    }

    async fn shutdown_swarm(&self, swarm_id: SwarmId) -> Result<()> {
        Ok(SwarmCoordinator::shutdown_swarm(self, swarm_id).await?)
    }
}
