//! Runtime tunables.
//!
//! These mirror the constants the distilled specification calls out by
//! example value. They are constructor-overridable per reactor/endpoint
//! rather than globally mutable statics.

use std::time::Duration;

/// Bounded timeout the polling loop blocks for on each iteration, purely so
/// the reactor can observe its own stop signal promptly.
pub const POLL_TIMEOUT: Duration = Duration::from_millis(100);

/// Size of the per-endpoint staging buffer used as the read-target for
/// stream and datagram receives.
pub const RECV_BUFFER_SIZE: usize = 4096;

/// Starting port probed by the idle-port discovery helpers.
pub const IDLE_PORT_BASE: u16 = 10_000;

/// Highest port probed before giving up.
pub const IDLE_PORT_MAX: u16 = 65_000;

/// Initial capacity of the `Events` buffer each reactor allocates.
pub const EVENTS_CAPACITY: usize = 1024;
