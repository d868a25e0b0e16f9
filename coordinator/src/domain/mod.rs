// Copyright (c) 2026 Hivemind Systems
// SPDX-License-Identifier: AGPL-3.0

pub mod agent;
pub mod consensus;
pub mod error;
pub mod events;
pub mod metrics;
pub mod registry;
pub mod runtime;
pub mod swarm;
pub mod topology;
