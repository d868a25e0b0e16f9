// Copyright (c) 2026 Hivemind Systems
// SPDX-License-Identifier: AGPL-3.0
//! The swarm coordinator: orchestrates registry, topology, and consensus
//! session, and owns the reconciliation control loop.
//!
//! # Serialization
//!
//! One coordination authority per swarm: every swarm lives behind its own
//! `tokio::sync::Mutex`, so registry + topology + session updates for a given
//! swarm never interleave. Independent swarms share no mutable state.
//! External waits (launch confirmation, round replies, heartbeat probes)
//! happen with the swarm lock released; only the bounded bookkeeping step on
//! either side of the wait holds it.
//!
//! # Reconciliation
//!
//! [`SwarmCoordinator::run`] drives [`tick_swarm`](SwarmCoordinator::tick_swarm)
//! on a fixed interval: detect heartbeat-expired agents, finish drains past
//! their grace window, and converge the live population toward the target.
//! `tick_swarm` is public so tests can drive the loop deterministically.

use crate::config::CoordinatorConfig;
use crate::domain::agent::{Agent, AgentId, AgentState};
use crate::domain::consensus::{collect_replies, ConsensusSession, ProposalId, RoundOutcome};
use crate::domain::consensus::ConsensusKind;
use crate::domain::error::CoordinationError;
use crate::domain::events::{EventRecord, SwarmEvent};
use crate::domain::metrics::MetricsSnapshot;
use crate::domain::runtime::{AgentLauncher, MessageTransport, ProbeResult};
use crate::domain::swarm::{ScaleReport, Swarm, SwarmId};
use crate::domain::topology::TopologyKind;
use chrono::Utc;
use metrics::{counter, gauge};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Role tag used for agents spawned by scale/reconcile corrections, where no
/// caller-provided tag exists.
const DEFAULT_ROLE: &str = "worker";

type SwarmHandle = Arc<Mutex<Swarm>>;

/// Result of one round attempt inside [`SwarmCoordinator::propose`].
enum RoundAttempt {
    Resolved(RoundOutcome),
    /// A raft re-election landed during the off-lock wait; the plan was
    /// issued against a term that no longer exists.
    TermChanged { observed: u64, current: u64 },
}

pub struct SwarmCoordinator {
    config: CoordinatorConfig,
    launcher: Arc<dyn AgentLauncher>,
    transport: Arc<dyn MessageTransport>,
    /// Swarms in creation order. Lookups are linear; coordinators manage a
    /// handful of swarms, not thousands.
    swarms: RwLock<Vec<(SwarmId, SwarmHandle)>>,
    shutdown_token: CancellationToken,
}

impl SwarmCoordinator {
    /// Collaborators are injected here; a missing collaborator is a
    /// construction-time configuration error, never a silent fallback.
    pub fn new(
        config: CoordinatorConfig,
        launcher: Arc<dyn AgentLauncher>,
        transport: Arc<dyn MessageTransport>,
    ) -> Result<Self, CoordinationError> {
        config.validate()?;
        Ok(Self {
            config,
            launcher,
            transport,
            swarms: RwLock::new(Vec::new()),
            shutdown_token: CancellationToken::new(),
        })
    }

    fn swarm_handle(&self, id: SwarmId) -> Result<SwarmHandle, CoordinationError> {
        self.swarms
            .read()
            .iter()
            .find(|(other, _)| *other == id)
            .map(|(_, handle)| handle.clone())
            .ok_or_else(|| CoordinationError::NotFound(format!("swarm {id}")))
    }

    /// Create an empty swarm with the given topology/consensus configuration
    /// and target population. The reconcile loop grows it toward the target.
    pub async fn initialize_swarm(
        &self,
        topology: TopologyKind,
        consensus: ConsensusKind,
        target_count: i64,
    ) -> Result<SwarmId, CoordinationError> {
        if target_count < 0 {
            return Err(CoordinationError::InvalidConfiguration(format!(
                "target agent count must be non-negative, got {target_count}"
            )));
        }
        let swarm = Swarm::new(
            topology,
            consensus,
            target_count as usize,
            self.config.event_log_capacity,
        );
        let id = swarm.id;
        self.swarms
            .write()
            .push((id, Arc::new(Mutex::new(swarm))));
        info!(swarm = %id, ?topology, ?consensus, target = target_count, "initialized swarm");
        counter!("hivemind_swarms_initialized_total").increment(1);
        Ok(id)
    }

    /// Register a new agent and wait (off-lock) for its launch confirmation.
    /// On success the agent becomes `Active` and topology + session are
    /// updated; on launch failure or timeout it becomes `Failed` and the
    /// error is surfaced as the transient `Timeout` class for the reconcile
    /// loop to retry.
    pub async fn spawn_agent(
        &self,
        swarm_id: SwarmId,
        role: &str,
    ) -> Result<AgentId, CoordinationError> {
        let handle = self.swarm_handle(swarm_id)?;

        let agent_id = {
            let mut swarm = handle.lock().await;
            let id = swarm.registry.register(Agent::new(role))?;
            swarm.pending_launches.insert(id);
            debug!(swarm = %swarm_id, agent = %id, role, "agent registered, awaiting launch");
            id
        };

        let launch =
            tokio::time::timeout(self.config.launch_timeout, self.launcher.launch(role)).await;

        let mut swarm = handle.lock().await;
        swarm.pending_launches.remove(&agent_id);
        let cancel_queued = swarm.cancel_requested.remove(&agent_id);

        let result = match launch {
            Ok(Ok(())) => {
                swarm.registry.transition(agent_id, AgentState::Active)?;
                Self::apply_membership_change(&mut swarm, &[agent_id], &[]);
                swarm.events.record(SwarmEvent::AgentSpawned {
                    agent: agent_id,
                    role: role.to_string(),
                });
                counter!("hivemind_agents_spawned_total").increment(1);
                info!(swarm = %swarm_id, agent = %agent_id, role, "agent active");
                Ok(agent_id)
            }
            Ok(Err(e)) => {
                Self::mark_launch_failed(&mut swarm, agent_id);
                warn!(swarm = %swarm_id, agent = %agent_id, error = %e, "agent launch failed");
                Err(CoordinationError::Timeout(format!(
                    "launch of agent {agent_id} did not complete: {e}"
                )))
            }
            Err(_) => {
                Self::mark_launch_failed(&mut swarm, agent_id);
                warn!(swarm = %swarm_id, agent = %agent_id, "agent launch confirmation timed out");
                Err(CoordinationError::Timeout(format!(
                    "launch confirmation for agent {agent_id} timed out"
                )))
            }
        };

        // A terminate issued while the launch was outstanding applies now,
        // before anyone observes the launched state.
        if cancel_queued && swarm.registry.contains(agent_id) {
            Self::drain_and_terminate(&mut swarm, agent_id)?;
            info!(swarm = %swarm_id, agent = %agent_id, "queued termination applied after launch");
        }

        Self::publish_gauges(&swarm);
        result
    }

    /// Drain an agent out of the swarm. If it is participating in an
    /// in-flight consensus round it stays `Draining` until the round
    /// resolves or the grace window expires (finished by the reconcile
    /// loop); otherwise the termination completes here. Either way the
    /// agent leaves the consensus participant set immediately, so rounds
    /// started after the drain never target it.
    pub async fn terminate_agent(
        &self,
        swarm_id: SwarmId,
        agent_id: AgentId,
    ) -> Result<(), CoordinationError> {
        let handle = self.swarm_handle(swarm_id)?;
        let mut swarm = handle.lock().await;

        if !swarm.registry.contains(agent_id) {
            return Err(CoordinationError::UnknownAgent(agent_id));
        }
        if swarm.pending_launches.contains(&agent_id) {
            swarm.cancel_requested.insert(agent_id);
            debug!(swarm = %swarm_id, agent = %agent_id, "termination queued behind outstanding launch");
            return Ok(());
        }

        let in_flight = swarm
            .session
            .as_ref()
            .map(|s| s.round_in_flight() && s.participants().contains(&agent_id))
            .unwrap_or(false);

        let state = swarm.registry.get(agent_id)?.state;
        match state {
            AgentState::Pending | AgentState::Active if in_flight => {
                swarm.registry.transition(agent_id, AgentState::Draining)?;
                let deadline = Utc::now()
                    + chrono::Duration::from_std(self.config.drain_grace)
                        .unwrap_or_else(|_| chrono::Duration::zero());
                swarm.drain_deadlines.insert(agent_id, deadline);
                // The in-flight round keeps its plan snapshot; new rounds
                // must not select the draining agent.
                Self::apply_membership_change(&mut swarm, &[], &[agent_id]);
                debug!(swarm = %swarm_id, agent = %agent_id, "agent draining until round resolves");
            }
            AgentState::Pending | AgentState::Active | AgentState::Draining
            | AgentState::Failed => {
                Self::drain_and_terminate(&mut swarm, agent_id)?;
            }
            AgentState::Terminated => {
                swarm.registry.remove(agent_id)?;
            }
        }
        Self::publish_gauges(&swarm);
        Ok(())
    }

    /// Set a new target and converge toward it immediately. Spawn failures
    /// are reported, not swallowed; the reconcile loop keeps retrying them.
    pub async fn scale_swarm(
        &self,
        swarm_id: SwarmId,
        new_target: i64,
    ) -> Result<ScaleReport, CoordinationError> {
        if new_target < 0 {
            return Err(CoordinationError::InvalidConfiguration(format!(
                "target agent count must be non-negative, got {new_target}"
            )));
        }
        let handle = self.swarm_handle(swarm_id)?;
        let (delta, victims) = {
            let mut swarm = handle.lock().await;
            swarm.target_count = new_target as usize;
            let delta = swarm.reconcile_delta();
            let victims = if delta < 0 {
                Self::select_for_termination(&swarm, delta.unsigned_abs() as usize)
            } else {
                Vec::new()
            };
            (delta, victims)
        };

        let mut report = ScaleReport::default();
        for _ in 0..delta.max(0) {
            match self.spawn_agent(swarm_id, DEFAULT_ROLE).await {
                Ok(_) => report.spawned += 1,
                Err(e) => {
                    warn!(swarm = %swarm_id, error = %e, "scale-up spawn failed");
                    report.failed += 1;
                }
            }
        }
        for victim in victims {
            match self.terminate_agent(swarm_id, victim).await {
                Ok(()) => report.terminated += 1,
                Err(e) => {
                    warn!(swarm = %swarm_id, agent = %victim, error = %e, "scale-down termination failed");
                    report.failed += 1;
                }
            }
        }
        info!(
            swarm = %swarm_id,
            target = new_target,
            spawned = report.spawned,
            terminated = report.terminated,
            failed = report.failed,
            "scale complete"
        );
        Ok(report)
    }

    pub async fn status(&self, swarm_id: SwarmId) -> Result<MetricsSnapshot, CoordinationError> {
        let handle = self.swarm_handle(swarm_id)?;
        let swarm = handle.lock().await;
        Self::publish_gauges(&swarm);
        Ok(MetricsSnapshot::capture(&swarm))
    }

    /// Current registry contents in registration order, for reporting.
    pub async fn agents(&self, swarm_id: SwarmId) -> Result<Vec<Agent>, CoordinationError> {
        let handle = self.swarm_handle(swarm_id)?;
        let swarm = handle.lock().await;
        Ok(swarm.registry.iter().cloned().collect())
    }

    /// Retained diagnostic events for a swarm, oldest first.
    pub async fn events(&self, swarm_id: SwarmId) -> Result<Vec<EventRecord>, CoordinationError> {
        let handle = self.swarm_handle(swarm_id)?;
        let swarm = handle.lock().await;
        Ok(swarm.events.entries().cloned().collect())
    }

    /// Submit a proposal to the swarm's consensus session. The round wait
    /// happens off-lock; if a raft re-election lands in between, the
    /// proposal is re-issued once against the new term before `StaleTerm`
    /// is surfaced. A byzantine round aborted by a mid-round quorum loss
    /// fails with `QuorumLost`, never a tally of the stale plan.
    pub async fn propose(
        &self,
        swarm_id: SwarmId,
        proposal: ProposalId,
    ) -> Result<RoundOutcome, CoordinationError> {
        let handle = self.swarm_handle(swarm_id)?;
        match self.drive_round(&handle, swarm_id, proposal).await? {
            RoundAttempt::Resolved(outcome) => Ok(outcome),
            RoundAttempt::TermChanged { observed, current } => {
                // Expected noise under leader churn; retry under the new
                // term rather than failing the caller.
                warn!(swarm = %swarm_id, proposed = observed, current, "stale term, re-issuing proposal");
                match self.drive_round(&handle, swarm_id, proposal).await? {
                    RoundAttempt::Resolved(outcome) => Ok(outcome),
                    RoundAttempt::TermChanged { observed, current } => {
                        Err(CoordinationError::StaleTerm {
                            proposed: observed,
                            current,
                        })
                    }
                }
            }
        }
    }

    /// One round attempt: open the round, wait off-lock, close it. Returns
    /// `TermChanged` instead of tallying when a raft re-election invalidated
    /// the plan during the wait.
    async fn drive_round(
        &self,
        handle: &SwarmHandle,
        swarm_id: SwarmId,
        proposal: ProposalId,
    ) -> Result<RoundAttempt, CoordinationError> {
        let (plan, term) = {
            let mut swarm = handle.lock().await;
            let session = swarm
                .session
                .as_mut()
                .ok_or(CoordinationError::EmptyParticipantSet)?;
            let term = session.term();
            (session.begin_round(proposal, term)?, term)
        };

        let replies =
            collect_replies(self.transport.as_ref(), &plan, self.config.round_timeout).await;

        let mut swarm = handle.lock().await;
        let session = swarm
            .session
            .as_mut()
            .ok_or(CoordinationError::EmptyParticipantSet)?;
        if session.kind() == ConsensusKind::Raft && session.term() != term {
            session.finish_round();
            return Ok(RoundAttempt::TermChanged {
                observed: term,
                current: session.term(),
            });
        }
        if let Some((live, required)) = session.take_quorum_loss(plan.round) {
            warn!(swarm = %swarm_id, live, required, "round aborted by mid-round quorum loss");
            return Err(CoordinationError::QuorumLost { live, required });
        }
        let outcome = session.tally(&plan, &replies);
        session.finish_round();
        swarm.events.record(SwarmEvent::RoundCompleted {
            round: plan.round,
            outcome,
        });
        counter!("hivemind_consensus_rounds_total", "outcome" => outcome_label(outcome))
            .increment(1);
        debug!(swarm = %swarm_id, round = plan.round, ?outcome, "round resolved");
        Ok(RoundAttempt::Resolved(outcome))
    }

    /// One reconciliation pass over a single swarm: heartbeat failure
    /// detection, drain-grace expiry, and population reconvergence.
    pub async fn tick_swarm(&self, swarm_id: SwarmId) -> Result<(), CoordinationError> {
        let handle = self.swarm_handle(swarm_id)?;

        // Probe heartbeats off-lock.
        let probe_targets: Vec<AgentId> = {
            let swarm = handle.lock().await;
            swarm
                .registry
                .list_by_state(AgentState::Active)
                .iter()
                .map(|a| a.id)
                .collect()
        };
        let launcher = self.launcher.clone();
        let probes = futures::future::join_all(probe_targets.into_iter().map(|id| {
            let launcher = launcher.clone();
            async move { (id, launcher.probe_heartbeat(id).await) }
        }))
        .await;

        let (delta, victims, spawn_allowed) = {
            let mut swarm = handle.lock().await;

            for (id, probe) in probes {
                if probe == ProbeResult::Alive {
                    if let Some(agent) = swarm.registry.get_mut(id) {
                        if agent.state == AgentState::Active {
                            agent.touch_heartbeat();
                        }
                    }
                }
            }

            // Heartbeat expiry: Active -> Failed.
            let timeout = chrono::Duration::from_std(self.config.heartbeat_timeout)
                .unwrap_or_else(|_| chrono::Duration::zero());
            let now = Utc::now();
            let expired: Vec<AgentId> = swarm
                .registry
                .list_by_state(AgentState::Active)
                .iter()
                .filter(|a| now - a.last_heartbeat > timeout)
                .map(|a| a.id)
                .collect();
            for id in expired {
                swarm.registry.transition(id, AgentState::Failed)?;
                if let Some(agent) = swarm.registry.get_mut(id) {
                    agent.errors += 1;
                }
                Self::apply_membership_change(&mut swarm, &[], &[id]);
                swarm.events.record(SwarmEvent::AgentFailed { agent: id });
                counter!("hivemind_agents_failed_total").increment(1);
                warn!(swarm = %swarm_id, agent = %id, "heartbeat expired, agent failed");
            }

            // Drains whose round resolved or whose grace window expired.
            let round_in_flight = swarm
                .session
                .as_ref()
                .map(|s| s.round_in_flight())
                .unwrap_or(false);
            let now = Utc::now();
            let finished: Vec<AgentId> = swarm
                .drain_deadlines
                .iter()
                .filter(|(_, deadline)| !round_in_flight || **deadline <= now)
                .map(|(id, _)| *id)
                .collect();
            for id in finished {
                Self::drain_and_terminate(&mut swarm, id)?;
            }

            let delta = swarm.reconcile_delta();
            let victims = if delta < 0 {
                Self::select_for_termination(&swarm, delta.unsigned_abs() as usize)
            } else {
                Vec::new()
            };
            let spawn_allowed = if swarm.backoff_ticks_remaining > 0 {
                swarm.backoff_ticks_remaining -= 1;
                false
            } else {
                true
            };
            (delta, victims, spawn_allowed)
        };

        if delta > 0 && spawn_allowed {
            let mut any_failed = false;
            for _ in 0..delta {
                if let Err(e) = self.spawn_agent(swarm_id, DEFAULT_ROLE).await {
                    warn!(swarm = %swarm_id, error = %e, "reconcile respawn failed");
                    any_failed = true;
                }
            }
            let mut swarm = handle.lock().await;
            if any_failed {
                swarm.spawn_failures += 1;
                let shift = swarm.spawn_failures.saturating_sub(1).min(16);
                swarm.backoff_ticks_remaining = self
                    .config
                    .spawn_backoff_base_ticks
                    .saturating_mul(1 << shift)
                    .min(self.config.spawn_backoff_max_ticks);
            } else {
                swarm.spawn_failures = 0;
                swarm.backoff_ticks_remaining = 0;
            }
            swarm
                .events
                .record(SwarmEvent::ReconcileCorrection { delta });
            info!(swarm = %swarm_id, delta, "reconcile loop corrected population upward");
        } else if delta < 0 {
            for victim in victims {
                if let Err(e) = self.terminate_agent(swarm_id, victim).await {
                    warn!(swarm = %swarm_id, agent = %victim, error = %e, "reconcile termination failed");
                }
            }
            let mut swarm = handle.lock().await;
            swarm
                .events
                .record(SwarmEvent::ReconcileCorrection { delta });
            info!(swarm = %swarm_id, delta, "reconcile loop corrected population downward");
        }

        let swarm = handle.lock().await;
        Self::publish_gauges(&swarm);
        Ok(())
    }

    /// Run the reconciliation loop until [`shutdown`](Self::shutdown).
    pub fn run(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        let coordinator = self;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(coordinator.config.reconcile_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = coordinator.shutdown_token.cancelled() => {
                        info!("reconcile loop stopped");
                        return;
                    }
                    _ = interval.tick() => {
                        let ids: Vec<SwarmId> = coordinator
                            .swarms
                            .read()
                            .iter()
                            .map(|(id, _)| *id)
                            .collect();
                        for id in ids {
                            if let Err(e) = coordinator.tick_swarm(id).await {
                                warn!(swarm = %id, error = %e, "reconcile tick failed");
                            }
                        }
                    }
                }
            }
        })
    }

    /// Drain every agent, close the consensus session, and drop the swarm.
    pub async fn shutdown_swarm(&self, swarm_id: SwarmId) -> Result<(), CoordinationError> {
        let handle = self.swarm_handle(swarm_id)?;
        {
            let mut swarm = handle.lock().await;
            let ids: Vec<(AgentId, AgentState)> =
                swarm.registry.iter().map(|a| (a.id, a.state)).collect();
            for (id, state) in ids {
                match state {
                    AgentState::Pending | AgentState::Active => {
                        swarm.registry.transition(id, AgentState::Draining)?;
                        swarm.registry.transition(id, AgentState::Terminated)?;
                    }
                    AgentState::Draining | AgentState::Failed => {
                        swarm.registry.transition(id, AgentState::Terminated)?;
                    }
                    AgentState::Terminated => {}
                }
                swarm.registry.remove(id)?;
                swarm.events.record(SwarmEvent::AgentTerminated { agent: id });
            }
            swarm.drain_deadlines.clear();
            swarm.pending_launches.clear();
            swarm.cancel_requested.clear();
            swarm.topology.rebuild(Vec::new());
            swarm.session = None;
            swarm.target_count = 0;
        }
        self.swarms.write().retain(|(id, _)| *id != swarm_id);
        info!(swarm = %swarm_id, "swarm shut down");
        Ok(())
    }

    /// Stop the reconcile loop and shut down every swarm, in creation order.
    pub async fn shutdown(&self) {
        self.shutdown_token.cancel();
        let ids: Vec<SwarmId> = self.swarms.read().iter().map(|(id, _)| *id).collect();
        for id in ids {
            if let Err(e) = self.shutdown_swarm(id).await {
                warn!(swarm = %id, error = %e, "swarm shutdown failed");
            }
        }
    }

    /// Rebuild topology from current membership and bring the consensus
    /// session in line, in the same order as the membership change that
    /// caused it. `added` are newly active agents; `removed` are newly
    /// failed or terminated ones.
    fn apply_membership_change(swarm: &mut Swarm, added: &[AgentId], removed: &[AgentId]) {
        swarm.topology.rebuild(swarm.registry.topology_members());

        let leader_before = swarm.session.as_ref().and_then(|s| s.leader());
        match swarm.session.as_mut() {
            None => {
                let eligible = swarm.registry.consensus_participants();
                if !eligible.is_empty() {
                    // First active membership opens the session.
                    match ConsensusSession::init(swarm.consensus_kind, eligible) {
                        Ok(session) => swarm.session = Some(session),
                        Err(e) => warn!(swarm = %swarm.id, error = %e, "failed to open consensus session"),
                    }
                }
            }
            Some(session) => {
                if let Err(e) = session.on_membership_change(added, removed) {
                    // QuorumLost fails the in-flight round; the reconcile
                    // loop restores capacity and the caller retries.
                    warn!(swarm = %swarm.id, error = %e, "membership change disrupted consensus round");
                }
            }
        }
        let leader_after = swarm.session.as_ref().and_then(|s| s.leader());
        if leader_after != leader_before {
            if let (Some(agent), Some(session)) = (leader_after, swarm.session.as_ref()) {
                swarm.events.record(SwarmEvent::LeaderElected {
                    agent,
                    term: session.term(),
                });
            }
        }
    }

    fn mark_launch_failed(swarm: &mut Swarm, agent_id: AgentId) {
        if swarm
            .registry
            .transition(agent_id, AgentState::Failed)
            .is_ok()
        {
            if let Some(agent) = swarm.registry.get_mut(agent_id) {
                agent.errors += 1;
            }
            Self::apply_membership_change(swarm, &[], &[agent_id]);
            swarm.events.record(SwarmEvent::AgentFailed { agent: agent_id });
            counter!("hivemind_agents_failed_total").increment(1);
        }
    }

    /// Complete a termination: move to `Terminated`, rebuild topology,
    /// notify the session, and remove from the registry.
    fn drain_and_terminate(
        swarm: &mut Swarm,
        agent_id: AgentId,
    ) -> Result<(), CoordinationError> {
        let state = swarm.registry.get(agent_id)?.state;
        match state {
            AgentState::Pending | AgentState::Active => {
                swarm.registry.transition(agent_id, AgentState::Draining)?;
                swarm.registry.transition(agent_id, AgentState::Terminated)?;
            }
            AgentState::Draining | AgentState::Failed => {
                swarm.registry.transition(agent_id, AgentState::Terminated)?;
            }
            AgentState::Terminated => {}
        }
        swarm.drain_deadlines.remove(&agent_id);
        Self::apply_membership_change(swarm, &[], &[agent_id]);
        swarm.registry.remove(agent_id)?;
        swarm
            .events
            .record(SwarmEvent::AgentTerminated { agent: agent_id });
        counter!("hivemind_agents_terminated_total").increment(1);
        Ok(())
    }

    /// Scale-down victim selection: unhealthy capacity first (`Failed`, then
    /// `Pending`), then `Active`; oldest (lowest registration sequence)
    /// first within a class. Draining agents are already on their way out.
    fn select_for_termination(swarm: &Swarm, count: usize) -> Vec<AgentId> {
        fn class(state: AgentState) -> u8 {
            match state {
                AgentState::Failed => 0,
                AgentState::Pending => 1,
                AgentState::Active => 2,
                AgentState::Draining | AgentState::Terminated => u8::MAX,
            }
        }
        let mut candidates: Vec<(u8, u64, AgentId)> = swarm
            .registry
            .iter()
            .filter(|a| class(a.state) != u8::MAX)
            .map(|a| (class(a.state), a.sequence, a.id))
            .collect();
        candidates.sort();
        candidates
            .into_iter()
            .take(count)
            .map(|(_, _, id)| id)
            .collect()
    }

    fn publish_gauges(swarm: &Swarm) {
        let swarm_label = swarm.id.to_string();
        gauge!("hivemind_agents_active", "swarm" => swarm_label.clone())
            .set(swarm.active_count() as f64);
        gauge!("hivemind_agents_target", "swarm" => swarm_label.clone())
            .set(swarm.target_count as f64);
        gauge!("hivemind_topology_edges", "swarm" => swarm_label)
            .set(swarm.topology.edge_count() as f64);
    }
}

fn outcome_label(outcome: RoundOutcome) -> &'static str {
    match outcome {
        RoundOutcome::Committed => "committed",
        RoundOutcome::Rejected => "rejected",
        RoundOutcome::Timeout => "timeout",
    }
}
