// Copyright (c) 2026 Hivemind Systems
// SPDX-License-Identifier: AGPL-3.0
//! Error taxonomy for the coordination core.
//!
//! Structural/state errors (`DuplicateIdentity`, `UnknownAgent`,
//! `IllegalTransition`, `NotTerminated`, `InvalidConfiguration`) are caller
//! errors and are never retried automatically. Transient errors (`Timeout`,
//! `QuorumLost`) are retried by the reconciliation loop on its next tick.
//! `StaleTerm` is expected protocol noise under leader churn; the coordinator
//! logs it and re-issues the proposal once against the new term.

use crate::domain::agent::{AgentId, AgentState};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoordinationError {
    #[error("agent identity already registered: {0}")]
    DuplicateIdentity(AgentId),

    #[error("unknown agent: {0}")]
    UnknownAgent(AgentId),

    #[error("illegal lifecycle transition: {from} -> {to}")]
    IllegalTransition { from: AgentState, to: AgentState },

    #[error("agent {0} is not terminated")]
    NotTerminated(AgentId),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("consensus session requires a non-empty participant set")]
    EmptyParticipantSet,

    #[error("quorum lost: {live} live participants, {required} required")]
    QuorumLost { live: usize, required: usize },

    #[error("stale term: proposed at term {proposed}, current term is {current}")]
    StaleTerm { proposed: u64, current: u64 },

    #[error("operation timed out: {0}")]
    Timeout(String),

    #[error("not found: {0}")]
    NotFound(String),
}
