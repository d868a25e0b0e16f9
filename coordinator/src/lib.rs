// Copyright (c) 2026 Hivemind Systems
// SPDX-License-Identifier: AGPL-3.0
//! # `hivemind-coordinator` — Swarm Coordination Core
//!
//! Creates, tracks, and terminates groups of cooperating compute agents
//! (**swarms**), arranges them in a topology, drives a consensus protocol
//! among them, and continuously reconciles the live agent count toward an
//! operator-specified target.
//!
//! ## Crate Layout
//!
//! | Module | Layer | Contents |
//! |--------|-------|----------|
//! | [`domain`] | Domain | registry, lifecycle state machine, topology graph, consensus session, metrics snapshot |
//! | [`application`] | Application | [`SwarmCoordinator`] and the host-facing [`SwarmService`] trait |
//! | [`config`] | Configuration | [`CoordinatorConfig`] timeouts and intervals |
//!
//! ## Key Concepts
//!
//! - **Swarm**: a managed group of agents sharing one topology and one
//!   consensus session.
//! - **Reconciliation loop**: the periodic process that corrects drift
//!   between desired and actual agent population, making scaling
//!   self-healing rather than one-shot.
//! - **Consensus kinds**: gossip (fastest, best-effort majority), byzantine
//!   (tolerates a malicious minority), raft-style (strict leader-based
//!   agreement) behind one contract.
//!
//! Process spawning, network transport, and result rendering live behind the
//! [`domain::runtime`] ports; this crate contains no I/O of its own.

pub mod application;
pub mod config;
pub mod domain;

pub use application::{SwarmCoordinator, SwarmService};
pub use config::CoordinatorConfig;
pub use domain::agent::{Agent, AgentId, AgentState};
pub use domain::consensus::{ConsensusKind, ConsensusSession, ProposalId, RoundOutcome};
pub use domain::error::CoordinationError;
pub use domain::metrics::MetricsSnapshot;
pub use domain::swarm::{ScaleReport, Swarm, SwarmId};
pub use domain::topology::{TopologyGraph, TopologyKind};
