// Copyright (c) 2026 Hivemind Systems
// SPDX-License-Identifier: AGPL-3.0

//! End-to-end coordination scenarios: swarm initialization, spawning,
//! heartbeat-driven self-healing, scale up/down selection policy, raft
//! leader loss, and byzantine fault bounds. External collaborators (launcher,
//! transport) are mocked; the reconcile loop is driven tick by tick so each
//! scenario is deterministic.

use async_trait::async_trait;
use hivemind_coordinator::domain::agent::AgentId;
use hivemind_coordinator::domain::runtime::{
    AgentLauncher, LaunchError, MessageTransport, ProbeResult, RoundReply, TransportError, Vote,
};
use hivemind_coordinator::{
    ConsensusKind, CoordinationError, CoordinatorConfig, ProposalId, RoundOutcome,
    SwarmCoordinator, TopologyKind,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(Default)]
struct MockLauncher {
    /// Scripted launch results, consumed front to back; empty means success.
    scripted: Mutex<Vec<Result<(), LaunchError>>>,
    /// Agents whose heartbeat probes report unreachable.
    unreachable: Mutex<HashSet<AgentId>>,
    /// Artificial launch latency, for exercising in-flight cancellation.
    delay: Option<Duration>,
    launched_roles: Mutex<Vec<String>>,
}

impl MockLauncher {
    fn with_scripted(results: Vec<Result<(), LaunchError>>) -> Self {
        Self {
            scripted: Mutex::new(results),
            ..Self::default()
        }
    }

    fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    async fn mark_unreachable(&self, id: AgentId) {
        self.unreachable.lock().await.insert(id);
    }
}

#[async_trait]
impl AgentLauncher for MockLauncher {
    async fn launch(&self, role: &str) -> Result<(), LaunchError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.launched_roles.lock().await.push(role.to_string());
        let mut scripted = self.scripted.lock().await;
        if scripted.is_empty() {
            Ok(())
        } else {
            scripted.remove(0)
        }
    }

    async fn probe_heartbeat(&self, id: AgentId) -> ProbeResult {
        if self.unreachable.lock().await.contains(&id) {
            ProbeResult::Unreachable
        } else {
            ProbeResult::Alive
        }
    }
}

#[derive(Default)]
struct MockTransport {
    /// Participants that never reply (silence, not rejection).
    silent: Mutex<HashSet<AgentId>>,
    /// Participants that reply with an explicit reject.
    rejecting: Mutex<HashSet<AgentId>>,
    /// Artificial reply latency, for exercising mid-round membership changes.
    delay: Option<Duration>,
    broadcasts: Mutex<Vec<Vec<AgentId>>>,
}

impl MockTransport {
    fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    async fn silence(&self, ids: &[AgentId]) {
        let mut silent = self.silent.lock().await;
        silent.extend(ids.iter().copied());
    }

    async fn reject(&self, ids: &[AgentId]) {
        let mut rejecting = self.rejecting.lock().await;
        rejecting.extend(ids.iter().copied());
    }
}

#[async_trait]
impl MessageTransport for MockTransport {
    async fn broadcast(
        &self,
        participants: &[AgentId],
        _payload: serde_json::Value,
    ) -> Result<Vec<RoundReply>, TransportError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.broadcasts.lock().await.push(participants.to_vec());
        let silent = self.silent.lock().await;
        let rejecting = self.rejecting.lock().await;
        Ok(participants
            .iter()
            .filter(|id| !silent.contains(id))
            .map(|&from| RoundReply {
                from,
                vote: if rejecting.contains(&from) {
                    Vote::Reject
                } else {
                    Vote::Accept
                },
            })
            .collect())
    }

    async fn send_direct(
        &self,
        _to: AgentId,
        _payload: serde_json::Value,
    ) -> Result<(), TransportError> {
        Ok(())
    }
}

fn test_config() -> CoordinatorConfig {
    CoordinatorConfig {
        heartbeat_timeout: Duration::from_millis(50),
        reconcile_interval: Duration::from_millis(10),
        launch_timeout: Duration::from_millis(500),
        round_timeout: Duration::from_millis(100),
        drain_grace: Duration::from_millis(50),
        ..CoordinatorConfig::default()
    }
}

fn coordinator_with(
    launcher: MockLauncher,
    transport: MockTransport,
) -> (Arc<SwarmCoordinator>, Arc<MockLauncher>, Arc<MockTransport>) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    let launcher = Arc::new(launcher);
    let transport = Arc::new(transport);
    let coordinator = Arc::new(
        SwarmCoordinator::new(test_config(), launcher.clone(), transport.clone()).unwrap(),
    );
    (coordinator, launcher, transport)
}

fn default_coordinator() -> (Arc<SwarmCoordinator>, Arc<MockLauncher>, Arc<MockTransport>) {
    coordinator_with(MockLauncher::default(), MockTransport::default())
}

#[tokio::test]
async fn test_initialize_rejects_negative_target() {
    let (coordinator, _, _) = default_coordinator();
    let err = coordinator
        .initialize_swarm(TopologyKind::Mesh, ConsensusKind::Gossip, -1)
        .await
        .unwrap_err();
    assert!(matches!(err, CoordinationError::InvalidConfiguration(_)));
}

// Scenario A: mesh/gossip swarm of three has three edges and three actives.
#[tokio::test]
async fn test_mesh_gossip_swarm_of_three() {
    let (coordinator, _, _) = default_coordinator();
    let swarm_id = coordinator
        .initialize_swarm(TopologyKind::Mesh, ConsensusKind::Gossip, 3)
        .await
        .unwrap();

    for _ in 0..3 {
        coordinator.spawn_agent(swarm_id, "worker").await.unwrap();
    }

    let status = coordinator.status(swarm_id).await.unwrap();
    assert_eq!(status.active_count, 3);
    assert_eq!(status.topology_edge_count, 3);
    assert_eq!(status.target_count, 3);
    assert_eq!(status.failed_count, 0);
}

// Scenario B: an agent going unreachable past the heartbeat timeout is
// failed and replaced by the next tick, with no scale call.
#[tokio::test]
async fn test_heartbeat_failure_is_self_healing() {
    let (coordinator, launcher, _) = default_coordinator();
    let swarm_id = coordinator
        .initialize_swarm(TopologyKind::Mesh, ConsensusKind::Gossip, 5)
        .await
        .unwrap();

    let mut agents = Vec::new();
    for _ in 0..5 {
        agents.push(coordinator.spawn_agent(swarm_id, "worker").await.unwrap());
    }

    launcher.mark_unreachable(agents[2]).await;
    tokio::time::sleep(Duration::from_millis(60)).await;

    coordinator.tick_swarm(swarm_id).await.unwrap();

    let status = coordinator.status(swarm_id).await.unwrap();
    assert_eq!(status.active_count, 5, "replacement restored the target");
    assert_eq!(status.failed_count, 1, "the unreachable agent was failed");

    use hivemind_coordinator::domain::events::SwarmEvent;
    let events = coordinator.events(swarm_id).await.unwrap();
    assert!(events
        .iter()
        .any(|r| r.event == SwarmEvent::AgentFailed { agent: agents[2] }));
    assert!(events
        .iter()
        .any(|r| matches!(r.event, SwarmEvent::ReconcileCorrection { delta: 1 })));
}

// Scenario C: scaling 5 actives down to 2 terminates exactly 3.
#[tokio::test]
async fn test_scale_down_terminates_exactly_delta() {
    let (coordinator, _, _) = default_coordinator();
    let swarm_id = coordinator
        .initialize_swarm(TopologyKind::Star, ConsensusKind::Gossip, 5)
        .await
        .unwrap();
    for _ in 0..5 {
        coordinator.spawn_agent(swarm_id, "worker").await.unwrap();
    }

    let report = coordinator.scale_swarm(swarm_id, 2).await.unwrap();
    assert_eq!(report.terminated, 3);
    assert_eq!(report.spawned, 0);
    assert_eq!(report.failed, 0);

    let status = coordinator.status(swarm_id).await.unwrap();
    assert_eq!(status.active_count, 2);
}

#[tokio::test]
async fn test_scale_down_prefers_failed_agents() {
    let (coordinator, launcher, _) = default_coordinator();
    let swarm_id = coordinator
        .initialize_swarm(TopologyKind::Mesh, ConsensusKind::Gossip, 3)
        .await
        .unwrap();
    let mut agents = Vec::new();
    for _ in 0..3 {
        agents.push(coordinator.spawn_agent(swarm_id, "worker").await.unwrap());
    }

    // Fail the newest agent; a purely age-ordered policy would otherwise
    // pick the oldest active one.
    launcher.mark_unreachable(agents[2]).await;
    tokio::time::sleep(Duration::from_millis(60)).await;
    coordinator.tick_swarm(swarm_id).await.unwrap();

    let status = coordinator.status(swarm_id).await.unwrap();
    assert_eq!(status.active_count, 3, "tick respawned a replacement");
    assert_eq!(status.failed_count, 1);

    // delta = 2 - 3 = -1: the failed agent goes first, actives survive.
    let report = coordinator.scale_swarm(swarm_id, 2).await.unwrap();
    assert_eq!(report.terminated, 1);
    let status = coordinator.status(swarm_id).await.unwrap();
    assert_eq!(status.failed_count, 0);
    assert_eq!(status.active_count, 3);

    // The next tick finishes the downward correction among actives,
    // oldest first.
    coordinator.tick_swarm(swarm_id).await.unwrap();
    let status = coordinator.status(swarm_id).await.unwrap();
    assert_eq!(status.active_count, 2);
    let survivors: Vec<_> = coordinator
        .agents(swarm_id)
        .await
        .unwrap()
        .iter()
        .map(|a| a.id)
        .collect();
    assert!(!survivors.contains(&agents[0]), "oldest active terminated first");
    assert!(survivors.contains(&agents[1]));
}

#[tokio::test]
async fn test_scale_is_idempotent() {
    let (coordinator, _, _) = default_coordinator();
    let swarm_id = coordinator
        .initialize_swarm(TopologyKind::Ring, ConsensusKind::Gossip, 0)
        .await
        .unwrap();

    let first = coordinator.scale_swarm(swarm_id, 4).await.unwrap();
    assert_eq!(first.spawned, 4);

    let second = coordinator.scale_swarm(swarm_id, 4).await.unwrap();
    assert_eq!(second.spawned, 0);
    assert_eq!(second.terminated, 0);

    let status = coordinator.status(swarm_id).await.unwrap();
    assert_eq!(status.active_count, 4);
}

#[tokio::test]
async fn test_launch_failure_marks_agent_failed_and_loop_recovers() {
    let launcher =
        MockLauncher::with_scripted(vec![Err(LaunchError::Failed("no capacity".into()))]);
    let (coordinator, _, _) = coordinator_with(launcher, MockTransport::default());
    let swarm_id = coordinator
        .initialize_swarm(TopologyKind::Mesh, ConsensusKind::Gossip, 1)
        .await
        .unwrap();

    let err = coordinator.spawn_agent(swarm_id, "worker").await.unwrap_err();
    assert!(matches!(err, CoordinationError::Timeout(_)));

    let status = coordinator.status(swarm_id).await.unwrap();
    assert_eq!(status.active_count, 0);
    assert_eq!(status.failed_count, 1);

    // Next tick retries with the (now unscripted, succeeding) launcher.
    coordinator.tick_swarm(swarm_id).await.unwrap();
    let status = coordinator.status(swarm_id).await.unwrap();
    assert_eq!(status.active_count, 1);
}

#[tokio::test]
async fn test_raft_leader_loss_elects_before_committing() {
    let (coordinator, _, _) = default_coordinator();
    let swarm_id = coordinator
        .initialize_swarm(TopologyKind::Ring, ConsensusKind::Raft, 3)
        .await
        .unwrap();
    let mut agents = Vec::new();
    for _ in 0..3 {
        agents.push(coordinator.spawn_agent(swarm_id, "worker").await.unwrap());
    }

    let status = coordinator.status(swarm_id).await.unwrap();
    let first_leader = status.current_leader.expect("raft session has a leader");
    assert_eq!(first_leader, agents[0], "deterministic election picks the oldest");

    coordinator.terminate_agent(swarm_id, first_leader).await.unwrap();

    let status = coordinator.status(swarm_id).await.unwrap();
    let new_leader = status.current_leader.expect("re-election after leader loss");
    assert_ne!(new_leader, first_leader);
    assert_eq!(new_leader, agents[1]);

    // The next proposal commits under the new leader, never the old one.
    let outcome = coordinator
        .propose(swarm_id, ProposalId::new())
        .await
        .unwrap();
    assert_eq!(outcome, RoundOutcome::Committed);
}

#[tokio::test]
async fn test_byzantine_fault_bounds() {
    let (coordinator, _, transport) = default_coordinator();
    let swarm_id = coordinator
        .initialize_swarm(TopologyKind::Mesh, ConsensusKind::Byzantine, 4)
        .await
        .unwrap();
    let mut agents = Vec::new();
    for _ in 0..4 {
        agents.push(coordinator.spawn_agent(swarm_id, "worker").await.unwrap());
    }

    // n = 4 -> f = 1: one silent participant still commits.
    transport.silence(&agents[..1]).await;
    let outcome = coordinator
        .propose(swarm_id, ProposalId::new())
        .await
        .unwrap();
    assert_eq!(outcome, RoundOutcome::Committed);

    // f + 1 = 2 silent participants can no longer reach quorum.
    transport.silence(&agents[..2]).await;
    let outcome = coordinator
        .propose(swarm_id, ProposalId::new())
        .await
        .unwrap();
    assert_eq!(outcome, RoundOutcome::Timeout);
}

#[tokio::test]
async fn test_gossip_majority_reject_fails_the_proposal() {
    let (coordinator, _, transport) = default_coordinator();
    let swarm_id = coordinator
        .initialize_swarm(TopologyKind::Mesh, ConsensusKind::Gossip, 3)
        .await
        .unwrap();
    let mut agents = Vec::new();
    for _ in 0..3 {
        agents.push(coordinator.spawn_agent(swarm_id, "worker").await.unwrap());
    }

    // Two of three vote reject: an explicit conflicting answer, not silence.
    transport.reject(&agents[..2]).await;
    let outcome = coordinator
        .propose(swarm_id, ProposalId::new())
        .await
        .unwrap();
    assert_eq!(outcome, RoundOutcome::Rejected);
}

#[tokio::test]
async fn test_mid_round_quorum_loss_fails_the_proposal() {
    // A byzantine round over n = 4 needs 2f + 1 = 3 acks. Failing two
    // participants while replies are still in flight must abort that round,
    // not let it tally the stale plan.
    let transport = MockTransport::with_delay(Duration::from_millis(80));
    let (coordinator, launcher, _) = coordinator_with(MockLauncher::default(), transport);
    let swarm_id = coordinator
        .initialize_swarm(TopologyKind::Mesh, ConsensusKind::Byzantine, 4)
        .await
        .unwrap();
    let mut agents = Vec::new();
    for _ in 0..4 {
        agents.push(coordinator.spawn_agent(swarm_id, "worker").await.unwrap());
    }

    let proposer = coordinator.clone();
    let round = tokio::spawn(async move { proposer.propose(swarm_id, ProposalId::new()).await });
    tokio::time::sleep(Duration::from_millis(20)).await;

    launcher.mark_unreachable(agents[0]).await;
    launcher.mark_unreachable(agents[1]).await;
    tokio::time::sleep(Duration::from_millis(40)).await;
    coordinator.tick_swarm(swarm_id).await.unwrap();

    let err = round.await.unwrap().unwrap_err();
    assert!(matches!(
        err,
        CoordinationError::QuorumLost { live: 2, required: 3 }
    ));
}

#[tokio::test]
async fn test_new_round_excludes_draining_participant() {
    let transport = MockTransport::with_delay(Duration::from_millis(60));
    let (coordinator, _, transport) = coordinator_with(MockLauncher::default(), transport);
    let swarm_id = coordinator
        .initialize_swarm(TopologyKind::Mesh, ConsensusKind::Gossip, 3)
        .await
        .unwrap();
    let mut agents = Vec::new();
    for _ in 0..3 {
        agents.push(coordinator.spawn_agent(swarm_id, "worker").await.unwrap());
    }

    let proposer = coordinator.clone();
    let round = tokio::spawn(async move { proposer.propose(swarm_id, ProposalId::new()).await });
    tokio::time::sleep(Duration::from_millis(20)).await;

    // Terminated mid-round: the agent drains and leaves the participant set,
    // but the in-flight plan still counts its reply.
    coordinator
        .terminate_agent(swarm_id, agents[0])
        .await
        .unwrap();
    let status = coordinator.status(swarm_id).await.unwrap();
    assert_eq!(status.draining_count, 1);

    assert_eq!(round.await.unwrap().unwrap(), RoundOutcome::Committed);

    let outcome = coordinator
        .propose(swarm_id, ProposalId::new())
        .await
        .unwrap();
    assert_eq!(outcome, RoundOutcome::Committed);
    let broadcasts = transport.broadcasts.lock().await;
    let second = broadcasts.last().unwrap();
    assert_eq!(second.len(), 2, "draining agent not targeted again");
    assert!(!second.contains(&agents[0]));
}

#[tokio::test]
async fn test_terminate_during_pending_launch_is_queued() {
    let launcher = MockLauncher::with_delay(Duration::from_millis(100));
    let (coordinator, _, _) = coordinator_with(launcher, MockTransport::default());
    let swarm_id = coordinator
        .initialize_swarm(TopologyKind::Mesh, ConsensusKind::Gossip, 1)
        .await
        .unwrap();

    let spawner = coordinator.clone();
    let spawn_task = tokio::spawn(async move { spawner.spawn_agent(swarm_id, "worker").await });

    // Let the spawn register its pending agent, then terminate it mid-launch.
    tokio::time::sleep(Duration::from_millis(20)).await;
    let status = coordinator.status(swarm_id).await.unwrap();
    assert_eq!(status.pending_count, 1);
    let pending_id = coordinator.agents(swarm_id).await.unwrap()[0].id;

    // Queued, not applied: the launch is still outstanding.
    coordinator
        .terminate_agent(swarm_id, pending_id)
        .await
        .unwrap();
    let status = coordinator.status(swarm_id).await.unwrap();
    assert_eq!(status.pending_count, 1, "termination waits for the launch to resolve");

    // The spawn resolves, then the queued termination applies immediately.
    let agent_id = spawn_task.await.unwrap().unwrap();
    assert_eq!(agent_id, pending_id);
    assert!(coordinator.agents(swarm_id).await.unwrap().is_empty());
    let status = coordinator.status(swarm_id).await.unwrap();
    assert_eq!(status.active_count, 0);
    assert_eq!(status.pending_count, 0);
}

#[tokio::test]
async fn test_shutdown_swarm_removes_everything() {
    let (coordinator, _, _) = default_coordinator();
    let swarm_id = coordinator
        .initialize_swarm(TopologyKind::Hierarchical, ConsensusKind::Gossip, 2)
        .await
        .unwrap();
    for _ in 0..2 {
        coordinator.spawn_agent(swarm_id, "worker").await.unwrap();
    }

    coordinator.shutdown_swarm(swarm_id).await.unwrap();
    let err = coordinator.status(swarm_id).await.unwrap_err();
    assert!(matches!(err, CoordinationError::NotFound(_)));
}

#[tokio::test]
async fn test_reconcile_loop_grows_empty_swarm_to_target() {
    let (coordinator, _, _) = default_coordinator();
    let swarm_id = coordinator
        .initialize_swarm(TopologyKind::Mesh, ConsensusKind::Gossip, 3)
        .await
        .unwrap();

    let loop_handle = coordinator.clone().run();
    // A few intervals are plenty at a 10ms tick.
    tokio::time::sleep(Duration::from_millis(200)).await;
    let status = coordinator.status(swarm_id).await.unwrap();
    assert_eq!(status.active_count, 3);

    coordinator.shutdown().await;
    loop_handle.await.unwrap();
    assert!(coordinator.status(swarm_id).await.is_err());
}

#[tokio::test]
async fn test_tick_converges_to_target_without_scale_call() {
    let (coordinator, _, _) = default_coordinator();
    let swarm_id = coordinator
        .initialize_swarm(TopologyKind::Mesh, ConsensusKind::Gossip, 3)
        .await
        .unwrap();

    coordinator.tick_swarm(swarm_id).await.unwrap();
    let status = coordinator.status(swarm_id).await.unwrap();
    assert_eq!(status.active_count, 3);
    assert_eq!(status.topology_edge_count, 3);
}
