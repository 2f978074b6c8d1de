use crate::clock::Timestamp;

/// Failure-tracking state for one client identifier.
///
/// `block_expires_at` is only ever derived from `strike` at the moment a
/// block is applied. `attempts` returns to 0 when a block is applied or a
/// success is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IpRecord {
    /// Consecutive failures in the current, not-yet-escalated window.
    pub attempts: u32,
    /// Times this identifier has been blocked. Never decreases.
    pub strike: u32,
    /// When the active block lifts, if any.
    pub block_expires_at: Option<Timestamp>,
}

impl IpRecord {
    /// `true` while a block is in force at `now`.
    pub fn is_blocked_at(&self, now: Timestamp) -> bool {
        self.block_expires_at.is_some_and(|expires| expires > now)
    }

    /// `true` when the sweeper may evict this record: the block has lapsed
    /// and no failures are accumulating.
    pub fn is_stale_at(&self, now: Timestamp) -> bool {
        self.attempts == 0 && self.block_expires_at.is_some_and(|expires| expires < now)
    }
}
