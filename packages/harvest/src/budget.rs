//! Time budget of a single invocation.
//!
//! An invocation stops itself before the host environment kills it. Two
//! signals feed the decision: wall-clock time since the invocation began,
//! and, when the host exposes one, the time it says is left.

use std::time::{Duration, Instant};

use fred_metadata_harvest_models::RemainingTime;

/// A host capability reporting how long the invocation may keep running.
pub trait ExecutionBudget: Send + Sync {
    /// Time left before the host stops the invocation.
    fn remaining(&self) -> RemainingTime;
}

/// A host that gives no remaining-time signal. Only the elapsed-time
/// ceiling applies.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unbounded;

impl ExecutionBudget for Unbounded {
    fn remaining(&self) -> RemainingTime {
        RemainingTime::Unknown
    }
}

/// A host that stops the invocation at a fixed instant.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    /// A deadline `limit` from now.
    #[must_use]
    pub fn after(limit: Duration) -> Self {
        Self {
            at: Instant::now() + limit,
        }
    }
}

impl ExecutionBudget for Deadline {
    fn remaining(&self) -> RemainingTime {
        RemainingTime::Known(self.at.saturating_duration_since(Instant::now()))
    }
}

/// The rule that decides when an invocation must pause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBox {
    /// Pause once the host reports less than this much time left.
    pub safety_buffer: Duration,
    /// Pause once the invocation has run longer than this.
    pub max_runtime: Duration,
}

impl TimeBox {
    /// Whether an invocation that has run for `elapsed`, with `remaining`
    /// reported by the host, must checkpoint and stop.
    #[must_use]
    pub fn should_pause(&self, elapsed: Duration, remaining: RemainingTime) -> bool {
        let host_running_out = match remaining {
            RemainingTime::Known(left) => left < self.safety_buffer,
            RemainingTime::Unknown => false,
        };

        host_running_out || elapsed > self.max_runtime
    }
}
