// Copyright (c) 2026 Hivemind Systems
// SPDX-License-Identifier: AGPL-3.0
//! Coordinator configuration.
//!
//! All durations deserialize in humantime form ("250ms", "30s").

use crate::domain::error::CoordinationError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// How long an active agent may go without a heartbeat before the
    /// reconcile loop marks it failed.
    #[serde(with = "humantime_serde", default = "default_heartbeat_timeout")]
    pub heartbeat_timeout: Duration,

    /// Fixed interval of the reconciliation control loop.
    #[serde(with = "humantime_serde", default = "default_reconcile_interval")]
    pub reconcile_interval: Duration,

    /// Upper bound on waiting for a launch confirmation.
    #[serde(with = "humantime_serde", default = "default_launch_timeout")]
    pub launch_timeout: Duration,

    /// Upper bound on waiting for round replies.
    #[serde(with = "humantime_serde", default = "default_round_timeout")]
    pub round_timeout: Duration,

    /// How long a draining agent may wait for in-flight rounds before being
    /// forced to terminated.
    #[serde(with = "humantime_serde", default = "default_drain_grace")]
    pub drain_grace: Duration,

    /// Reconcile ticks skipped after the first failed respawn; doubles per
    /// consecutive failure up to `spawn_backoff_max_ticks`.
    #[serde(default = "default_spawn_backoff_base_ticks")]
    pub spawn_backoff_base_ticks: u32,

    #[serde(default = "default_spawn_backoff_max_ticks")]
    pub spawn_backoff_max_ticks: u32,

    /// Retained entries in each swarm's diagnostic event log.
    #[serde(default = "default_event_log_capacity")]
    pub event_log_capacity: usize,
}

fn default_heartbeat_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_reconcile_interval() -> Duration {
    Duration::from_secs(5)
}

fn default_launch_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_round_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_drain_grace() -> Duration {
    Duration::from_secs(30)
}

fn default_spawn_backoff_base_ticks() -> u32 {
    1
}

fn default_spawn_backoff_max_ticks() -> u32 {
    32
}

fn default_event_log_capacity() -> usize {
    256
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            heartbeat_timeout: default_heartbeat_timeout(),
            reconcile_interval: default_reconcile_interval(),
            launch_timeout: default_launch_timeout(),
            round_timeout: default_round_timeout(),
            drain_grace: default_drain_grace(),
            spawn_backoff_base_ticks: default_spawn_backoff_base_ticks(),
            spawn_backoff_max_ticks: default_spawn_backoff_max_ticks(),
            event_log_capacity: default_event_log_capacity(),
        }
    }
}

impl CoordinatorConfig {
    pub fn validate(&self) -> Result<(), CoordinationError> {
        if self.reconcile_interval.is_zero() {
            return Err(CoordinationError::InvalidConfiguration(
                "reconcile_interval must be non-zero".into(),
            ));
        }
        if self.launch_timeout.is_zero() {
            return Err(CoordinationError::InvalidConfiguration(
                "launch_timeout must be non-zero".into(),
            ));
        }
        if self.round_timeout.is_zero() {
            return Err(CoordinationError::InvalidConfiguration(
                "round_timeout must be non-zero".into(),
            ));
        }
        if self.spawn_backoff_base_ticks == 0
            || self.spawn_backoff_max_ticks < self.spawn_backoff_base_ticks
        {
            return Err(CoordinationError::InvalidConfiguration(
                "spawn backoff ticks must be positive and max >= base".into(),
            ));
        }
        Ok(())
    }
}
