// Copyright (c) 2026 Hivemind Systems
// SPDX-License-Identifier: AGPL-3.0
//! Consensus protocol: one shared contract over a closed set of tagged
//! variants.
//!
//! Callers pick a trust/latency trade-off at swarm initialization and never
//! branch on the kind again:
//!
//! | Kind | Commit rule | Tolerates |
//! |------|-------------|-----------|
//! | [`ConsensusKind::Gossip`] | strict majority acks | arbitrary unreachable minority, no safety against conflicting proposals |
//! | [`ConsensusKind::Byzantine`] | `2f + 1` matching acks, `f = floor((n-1)/3)` | malicious/faulty minority |
//! | [`ConsensusKind::Raft`] | leader + strict majority of followers | leader loss via re-election |
//!
//! New variants are added by extending the tag set and its outcome rules,
//! never by branching on names at call sites.
//!
//! The round counter and the raft term are both monotonic. Rounds advance on
//! every proposal; the term advances only on (re-)election, and a proposal
//! issued against an older term is rejected with `StaleTerm`.

use crate::domain::agent::AgentId;
use crate::domain::error::CoordinationError;
use crate::domain::runtime::{MessageTransport, RoundReply, Vote};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsensusKind {
    Gossip,
    Byzantine,
    Raft,
}

/// Identifier for a single proposal submitted to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProposalId(pub Uuid);

impl ProposalId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ProposalId {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of one consensus round.
///
/// `Timeout` ("no answer") is distinct from `Rejected` ("explicit conflicting
/// answer"): only the former is worth retrying unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundOutcome {
    Committed,
    Rejected,
    Timeout,
}

/// Everything a caller needs to drive one round off-lock: the broadcast
/// targets and the numbers the tally is judged against.
#[derive(Debug, Clone)]
pub struct RoundPlan {
    pub proposal: ProposalId,
    pub round: u64,
    pub kind: ConsensusKind,
    /// Broadcast targets: all participants, except under raft where the
    /// leader proposes to its followers.
    pub targets: Vec<AgentId>,
    pub participant_count: usize,
    pub leader: Option<AgentId>,
}

impl RoundPlan {
    /// Wire payload for the proposal broadcast.
    pub fn payload(&self) -> serde_json::Value {
        json!({
            "proposal": self.proposal,
            "round": self.round,
            "kind": self.kind,
            "leader": self.leader,
        })
    }
}

/// The active protocol instance for one swarm.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusSession {
    kind: ConsensusKind,
    /// Participants in registration order. The head of the list is the
    /// deterministic raft election winner.
    participants: Vec<AgentId>,
    /// Proposal round counter; advances on every proposal, never decreases.
    round: u64,
    /// Raft election epoch; advances on every election, never decreases.
    /// Stays 0 for non-raft kinds.
    term: u64,
    leader: Option<AgentId>,
    /// Byzantine fault-tolerance threshold `f`, recomputed on membership
    /// change.
    fault_tolerance: usize,
    in_flight: bool,
    /// Byzantine quorum requirement snapshotted when the in-flight round
    /// began. A round is judged against the membership it started with, not
    /// against thresholds recomputed mid-round.
    round_required: Option<usize>,
    /// Round aborted by a mid-round quorum loss, with the live/required
    /// counts at the moment of loss. Consumed by the round's owner via
    /// [`take_quorum_loss`](Self::take_quorum_loss).
    quorum_loss: Option<(u64, usize, usize)>,
}

impl ConsensusSession {
    /// Start a session over a non-empty participant set.
    pub fn init(
        kind: ConsensusKind,
        participants: Vec<AgentId>,
    ) -> Result<Self, CoordinationError> {
        if participants.is_empty() {
            return Err(CoordinationError::EmptyParticipantSet);
        }
        let fault_tolerance = match kind {
            ConsensusKind::Byzantine => (participants.len() - 1) / 3,
            _ => 0,
        };
        let (term, leader) = match kind {
            ConsensusKind::Raft => (1, Some(participants[0])),
            _ => (0, None),
        };
        Ok(Self {
            kind,
            participants,
            round: 0,
            term,
            leader,
            fault_tolerance,
            in_flight: false,
            round_required: None,
            quorum_loss: None,
        })
    }

    pub fn kind(&self) -> ConsensusKind {
        self.kind
    }

    pub fn round(&self) -> u64 {
        self.round
    }

    pub fn term(&self) -> u64 {
        self.term
    }

    pub fn leader(&self) -> Option<AgentId> {
        self.leader
    }

    pub fn participants(&self) -> &[AgentId] {
        &self.participants
    }

    pub fn round_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Apply a membership change. `added` and `removed` are given in the
    /// order the registry recorded them, so the participant list keeps its
    /// registration ordering.
    ///
    /// Raft: losing the current leader triggers a deterministic re-election
    /// (lowest remaining registration sequence) under a new term. Byzantine:
    /// the threshold `f` is recomputed; if a round is in progress and the
    /// surviving participants fall below the `2f + 1` quorum that round
    /// began with, the round is aborted with `QuorumLost`.
    pub fn on_membership_change(
        &mut self,
        added: &[AgentId],
        removed: &[AgentId],
    ) -> Result<(), CoordinationError> {
        let removed_set: HashSet<AgentId> = removed.iter().copied().collect();
        self.participants.retain(|id| !removed_set.contains(id));
        for &id in added {
            if !self.participants.contains(&id) {
                self.participants.push(id);
            }
        }

        match self.kind {
            ConsensusKind::Raft => {
                let leader_lost = self
                    .leader
                    .map(|l| !self.participants.contains(&l))
                    .unwrap_or(true);
                if leader_lost {
                    self.leader = self.participants.first().copied();
                    if let Some(leader) = self.leader {
                        self.term += 1;
                        debug!(%leader, term = self.term, "elected new raft leader");
                    }
                }
            }
            ConsensusKind::Byzantine => {
                let live = self.participants.len();
                self.fault_tolerance = if live == 0 { 0 } else { (live - 1) / 3 };
                if self.in_flight {
                    if let Some(required) = self.round_required {
                        if live < required {
                            self.in_flight = false;
                            self.round_required = None;
                            self.quorum_loss = Some((self.round, live, required));
                            return Err(CoordinationError::QuorumLost { live, required });
                        }
                    }
                }
            }
            ConsensusKind::Gossip => {}
        }
        Ok(())
    }

    /// Open a new round: validates the observed term (raft), advances the
    /// round counter, and returns the broadcast plan. The caller performs the
    /// transport wait off-lock and closes the round with
    /// [`tally`](Self::tally) + [`finish_round`](Self::finish_round).
    pub fn begin_round(
        &mut self,
        proposal: ProposalId,
        observed_term: u64,
    ) -> Result<RoundPlan, CoordinationError> {
        if self.participants.is_empty() {
            return Err(CoordinationError::EmptyParticipantSet);
        }
        if self.kind == ConsensusKind::Raft && observed_term != self.term {
            return Err(CoordinationError::StaleTerm {
                proposed: observed_term,
                current: self.term,
            });
        }
        self.round += 1;
        self.in_flight = true;
        self.round_required = match self.kind {
            ConsensusKind::Byzantine => Some(2 * self.fault_tolerance + 1),
            _ => None,
        };

        let (targets, leader) = match self.kind {
            ConsensusKind::Raft => {
                let leader = self.leader;
                let followers = self
                    .participants
                    .iter()
                    .copied()
                    .filter(|id| Some(*id) != leader)
                    .collect();
                (followers, leader)
            }
            _ => (self.participants.clone(), None),
        };

        Ok(RoundPlan {
            proposal,
            round: self.round,
            kind: self.kind,
            targets,
            participant_count: self.participants.len(),
            leader,
        })
    }

    /// Judge the collected replies against the variant's quorum rule.
    /// Replies from non-targets and duplicate senders are ignored; a missing
    /// reply is silence, not a vote.
    pub fn tally(&self, plan: &RoundPlan, replies: &[RoundReply]) -> RoundOutcome {
        let targets: HashSet<AgentId> = plan.targets.iter().copied().collect();
        let mut seen = HashSet::new();
        let mut accepts = 0usize;
        let mut rejects = 0usize;
        for reply in replies {
            if !targets.contains(&reply.from) || !seen.insert(reply.from) {
                continue;
            }
            match reply.vote {
                Vote::Accept => accepts += 1,
                Vote::Reject => rejects += 1,
            }
        }

        let n = plan.participant_count;
        match plan.kind {
            ConsensusKind::Gossip => {
                if accepts > n / 2 {
                    RoundOutcome::Committed
                } else if rejects > n / 2 {
                    RoundOutcome::Rejected
                } else {
                    RoundOutcome::Timeout
                }
            }
            ConsensusKind::Byzantine => {
                let f = if n == 0 { 0 } else { (n - 1) / 3 };
                if accepts >= 2 * f + 1 {
                    RoundOutcome::Committed
                } else if rejects >= f + 1 {
                    RoundOutcome::Rejected
                } else {
                    RoundOutcome::Timeout
                }
            }
            ConsensusKind::Raft => {
                let followers = plan.targets.len();
                if followers == 0 {
                    // Single-node swarm: the leader's own vote is the majority.
                    RoundOutcome::Committed
                } else if accepts > followers / 2 {
                    RoundOutcome::Committed
                } else if rejects > followers / 2 {
                    RoundOutcome::Rejected
                } else {
                    RoundOutcome::Timeout
                }
            }
        }
    }

    pub fn finish_round(&mut self) {
        self.in_flight = false;
        self.round_required = None;
    }

    /// Consume the quorum-loss marker for `round`, if that round was aborted
    /// by a mid-round membership change. Lets the round's owner observe the
    /// abort after its off-lock wait instead of tallying the stale plan.
    pub fn take_quorum_loss(&mut self, round: u64) -> Option<(usize, usize)> {
        match self.quorum_loss {
            Some((aborted, live, required)) if aborted == round => {
                self.quorum_loss = None;
                Some((live, required))
            }
            _ => None,
        }
    }

    /// Drive one full round through the transport. Convenience wrapper over
    /// `begin_round` / `tally` / `finish_round` for callers that exclusively
    /// own the session; the coordinator uses the split form so the transport
    /// wait happens outside its serialization lock.
    pub async fn propose_round(
        &mut self,
        transport: &dyn MessageTransport,
        proposal: ProposalId,
        observed_term: u64,
        timeout: Duration,
    ) -> Result<RoundOutcome, CoordinationError> {
        let plan = self.begin_round(proposal, observed_term)?;
        let replies = collect_replies(transport, &plan, timeout).await;
        let outcome = self.tally(&plan, &replies);
        self.finish_round();
        Ok(outcome)
    }
}

/// Broadcast the proposal and gather whatever replies arrive before the
/// round timeout. Transport loss and timeout both degrade to silence.
pub async fn collect_replies(
    transport: &dyn MessageTransport,
    plan: &RoundPlan,
    timeout: Duration,
) -> Vec<RoundReply> {
    match tokio::time::timeout(timeout, transport.broadcast(&plan.targets, plan.payload())).await {
        Ok(Ok(replies)) => replies,
        Ok(Err(e)) => {
            warn!(round = plan.round, error = %e, "round broadcast failed");
            Vec::new()
        }
        Err(_) => {
            debug!(round = plan.round, "round timed out waiting for replies");
            Vec::new()
        }
    }
}
