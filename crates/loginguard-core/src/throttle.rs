//! The failed-login throttle.
//!
//! [`LoginThrottle`] owns the registry of [`IpRecord`]s keyed by client
//! identifier. Hosts call [`LoginThrottle::check`] before verifying
//! credentials, then exactly one of [`LoginThrottle::record_failure`] or
//! [`LoginThrottle::record_success`], and run [`LoginThrottle::sweep`] on a
//! timer of their choosing.
//!
//! The registry is a [`DashMap`]: each shard has its own lock, so a
//! read-modify-write on one identifier is a critical section while
//! unrelated identifiers proceed in parallel. Every operation is
//! synchronous and in-memory, so it is safe to call from async handlers.

use dashmap::DashMap;

use crate::clock::{Clock, SystemClock, Timestamp};
use crate::policy;
use crate::record::IpRecord;

/// Result of the pre-attempt gate check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Allowed,
    /// The identifier is inside a block window. Both values are rounded up.
    Blocked {
        retry_after_secs: u64,
        retry_after_minutes: u64,
    },
}

impl GateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GateDecision::Allowed)
    }
}

/// What a recorded failure did to the identifier's record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    /// The failure was counted without reaching the allowance.
    Counted { attempts: u32, max_attempts: u32 },
    /// The failure exhausted the allowance and a new block was applied.
    Blocked { strike: u32, expires_at: Timestamp },
}

pub struct LoginThrottle<C: Clock = SystemClock> {
    records: DashMap<String, IpRecord>,
    clock: C,
}

impl LoginThrottle<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for LoginThrottle<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> LoginThrottle<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            records: DashMap::new(),
            clock,
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Gate check at the clock's current time.
    pub fn check(&self, ip: &str) -> GateDecision {
        self.check_at(ip, self.clock.now())
    }

    /// Denies `ip` while its block is still in the future relative to `now`.
    ///
    /// Read-only: unknown identifiers get no record, and a lapsed block is
    /// left in place for the sweeper or the next failure/success to clear.
    pub fn check_at(&self, ip: &str, now: Timestamp) -> GateDecision {
        let Some(record) = self.records.get(ip) else {
            return GateDecision::Allowed;
        };

        match record.block_expires_at {
            Some(expires_at) if expires_at > now => {
                let remaining = now.saturating_millis_until(expires_at);
                GateDecision::Blocked {
                    retry_after_secs: policy::retry_after_secs(remaining),
                    retry_after_minutes: policy::retry_after_minutes(remaining),
                }
            }
            _ => GateDecision::Allowed,
        }
    }

    /// Records a failed login for `ip` at the clock's current time.
    pub fn record_failure(&self, ip: &str) -> FailureOutcome {
        self.record_failure_at(ip, self.clock.now())
    }

    /// Counts one failure and applies the next block once the allowance for
    /// the current strike is used up. Never denies by itself.
    pub fn record_failure_at(&self, ip: &str, now: Timestamp) -> FailureOutcome {
        let mut entry = self.records.entry(ip.to_string()).or_default();
        let record = entry.value_mut();

        let max_attempts = policy::max_attempts(record.strike);
        record.attempts = record.attempts.saturating_add(1);

        if record.attempts < max_attempts {
            tracing::debug!(
                "Failed login from {ip}: {}/{max_attempts} (strike {})",
                record.attempts,
                record.strike
            );
            return FailureOutcome::Counted {
                attempts: record.attempts,
                max_attempts,
            };
        }

        record.strike = record.strike.saturating_add(1);
        let duration = policy::block_duration(record.strike);
        let expires_at = now.saturating_add(duration);
        record.block_expires_at = Some(expires_at);
        record.attempts = 0;

        tracing::warn!(
            "Blocking {ip} for {}s after {max_attempts} failed logins (strike {})",
            duration.as_secs(),
            record.strike
        );

        FailureOutcome::Blocked {
            strike: record.strike,
            expires_at,
        }
    }

    /// Clears the failure count and any block for `ip`. The strike count is
    /// kept, so later blocks still use the escalated allowance and duration.
    pub fn record_success(&self, ip: &str) {
        if let Some(mut record) = self.records.get_mut(ip) {
            if record.block_expires_at.is_some() || record.attempts > 0 {
                tracing::debug!("Resetting failed logins for {ip} (strike {})", record.strike);
            }
            record.attempts = 0;
            record.block_expires_at = None;
        }
    }

    /// Sweeps at the clock's current time.
    pub fn sweep(&self) -> usize {
        self.sweep_at(self.clock.now())
    }

    /// Evicts records whose block lapsed before `now` and that have no
    /// accumulating failures. Returns how many were removed.
    pub fn sweep_at(&self, now: Timestamp) -> usize {
        let mut evicted = 0;
        self.records.retain(|ip, record| {
            if record.is_stale_at(now) {
                tracing::debug!("Evicting idle record for {ip} (strike {})", record.strike);
                evicted += 1;
                false
            } else {
                true
            }
        });
        evicted
    }

    /// Snapshot of the record for `ip`, if one exists.
    pub fn record(&self, ip: &str) -> Option<IpRecord> {
        self.records.get(ip).map(|r| *r)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
