//! LoginGuard core library — adaptive per-IP failed-login throttling.
//!
//! `loginguard-core` tracks authentication failures per client identifier,
//! blocks identifiers that exhaust their allowance, escalates the block
//! length on repeat offenses, and resets on a successful login. It knows
//! nothing about HTTP; the host extracts the identifier and decides how to
//! render a block.
//!
//! # Modules
//!
//! - [`throttle`] — [`LoginThrottle`]: gate check, failure recorder, success reset, sweeper.
//! - [`policy`] — Allowance and block-duration step functions.
//! - [`record`] — [`IpRecord`], the per-identifier state.
//! - [`clock`] — [`Timestamp`] and the [`Clock`] seam ([`SystemClock`], [`ManualClock`]).

pub mod clock;
pub mod policy;
pub mod record;
pub mod throttle;

pub use clock::{Clock, ManualClock, SystemClock, Timestamp};
pub use record::IpRecord;
pub use throttle::{FailureOutcome, GateDecision, LoginThrottle};
