//! Escalation policy: how many failures are allowed and how long a block lasts.
//!
//! The policy only distinguishes "never blocked" from "blocked at least once"
//! for the allowance, while block durations step up per strike and cap at
//! the seven-day tier.

use std::time::Duration;

/// Failures allowed before the first block.
pub const FIRST_TIER_MAX_ATTEMPTS: u32 = 3;

/// Failures allowed once an identifier has been blocked at least once.
pub const ESCALATED_MAX_ATTEMPTS: u32 = 5;

pub const FIRST_BLOCK: Duration = Duration::from_secs(60 * 60);
pub const SECOND_BLOCK: Duration = Duration::from_secs(24 * 60 * 60);
pub const THIRD_BLOCK: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Consecutive failures that trigger the next block for an identifier with
/// `strike` prior blocks.
pub fn max_attempts(strike: u32) -> u32 {
    if strike == 0 {
        FIRST_TIER_MAX_ATTEMPTS
    } else {
        ESCALATED_MAX_ATTEMPTS
    }
}

/// Length of the block applied when an identifier reaches `strike`.
///
/// `strike` is the value *after* incrementing, so the first block uses 1.
pub fn block_duration(strike: u32) -> Duration {
    match strike {
        0 | 1 => FIRST_BLOCK,
        2 => SECOND_BLOCK,
        _ => THIRD_BLOCK,
    }
}

/// Whole minutes left in a block, rounded up: `ceil(ceil(ms / 1000) / 60)`.
pub fn retry_after_minutes(remaining_millis: u64) -> u64 {
    retry_after_secs(remaining_millis).div_ceil(60)
}

/// Whole seconds left in a block, rounded up.
pub fn retry_after_secs(remaining_millis: u64) -> u64 {
    remaining_millis.div_ceil(1000)
}
