// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Jittered exponential backoff shared by dispatch retry scheduling and
//! transport reconnect loops.

use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub cap: Duration,
    pub factor: u32,
    pub jitter: f64,
    pub floor: Duration,
}

impl BackoffPolicy {
    /// The dispatcher's retry schedule: base=2s, cap=5min, factor=2,
    /// jitter=±20%, floor=250ms.
    pub const DISPATCH: Self = Self {
        base: Duration::from_secs(2),
        cap: Duration::from_secs(5 * 60),
        factor: 2,
        jitter: 0.2,
        floor: Duration::from_millis(250),
    };

    /// Delay before the `attempt`-th retry (0-indexed: `attempt=0` is the
    /// first retry after the initial failure). `unit_jitter` must be in
    /// `[-1.0, 1.0]`; callers source it from their own RNG so this function
    /// stays deterministic and testable.
    pub fn delay(&self, attempt: u32, unit_jitter: f64) -> Duration {
        let unit_jitter = unit_jitter.clamp(-1.0, 1.0);
        let exp = self.factor.saturating_pow(attempt);
        let raw = self.base.saturating_mul(exp).min(self.cap);
        let jittered_nanos = (raw.as_nanos() as f64) * (1.0 + unit_jitter * self.jitter);
        let jittered = Duration::from_nanos(jittered_nanos.max(0.0) as u64);
        jittered.max(self.floor).min(self.cap)
    }
}

#[cfg(test)]
#[path = "backoff_tests.rs"]
mod tests;
