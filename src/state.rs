//! Endpoint and per-connection lifecycle state machines (§4.7).

use std::sync::atomic::{AtomicU8, Ordering};

/// `Created -> Init'd -> Running -> Stopped`. `Init` from `Stopped` is
/// legal (the "Init -> Stop -> Init -> Start succeeds" round-trip
/// property); every other backward transition is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointState {
    Created,
    Initialized,
    Running,
    Stopped,
}

impl EndpointState {
    fn to_u8(self) -> u8 {
        match self {
            EndpointState::Created => 0,
            EndpointState::Initialized => 1,
            EndpointState::Running => 2,
            EndpointState::Stopped => 3,
        }
    }

    fn from_u8(v: u8) -> EndpointState {
        match v {
            0 => EndpointState::Created,
            1 => EndpointState::Initialized,
            2 => EndpointState::Running,
            _ => EndpointState::Stopped,
        }
    }
}

/// An atomic cell holding an [`EndpointState`], with the legal-transition
/// checks baked in so every endpoint variant enforces them identically.
pub struct EndpointStateCell(AtomicU8);

impl EndpointStateCell {
    pub fn new() -> EndpointStateCell {
        EndpointStateCell(AtomicU8::new(EndpointState::Created.to_u8()))
    }

    pub fn get(&self) -> EndpointState {
        EndpointState::from_u8(self.0.load(Ordering::SeqCst))
    }

    /// Attempt `Init`: legal from `Created` or `Stopped`.
    pub fn try_init(&self) -> bool {
        self.try_transition(|s| matches!(s, EndpointState::Created | EndpointState::Stopped), EndpointState::Initialized)
    }

    /// Attempt `Start`/`Connect`: legal only from `Initialized`.
    pub fn try_start(&self) -> bool {
        self.try_transition(|s| s == EndpointState::Initialized, EndpointState::Running)
    }

    /// Attempt `Stop`/`Close`. Always succeeds (idempotent); returns
    /// whether this call actually performed the transition (i.e. the
    /// endpoint was running), so the caller knows whether to do the actual
    /// teardown work.
    pub fn try_stop(&self) -> bool {
        self.try_transition(|s| matches!(s, EndpointState::Running | EndpointState::Initialized), EndpointState::Stopped)
    }

    pub fn is_running(&self) -> bool {
        self.get() == EndpointState::Running
    }

    fn try_transition<F: Fn(EndpointState) -> bool>(&self, allowed: F, next: EndpointState) -> bool {
        let current = self.get();
        if allowed(current) {
            self.0.store(next.to_u8(), Ordering::SeqCst);
            true
        } else {
            false
        }
    }
}

impl Default for EndpointStateCell {
    fn default() -> EndpointStateCell {
        EndpointStateCell::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_start_stop_init_round_trip_succeeds() {
        let cell = EndpointStateCell::new();
        assert_eq!(cell.get(), EndpointState::Created);
        assert!(cell.try_init());
        assert!(cell.try_start());
        assert!(cell.is_running());
        assert!(cell.try_stop());
        assert_eq!(cell.get(), EndpointState::Stopped);

        assert!(cell.try_init());
        assert!(cell.try_start());
        assert!(cell.is_running());
    }

    #[test]
    fn repeated_stop_is_a_noop_success() {
        let cell = EndpointStateCell::new();
        assert!(cell.try_init());
        assert!(cell.try_start());
        assert!(cell.try_stop());
        // Second Stop finds nothing to transition out of; no panic, no
        // further state change.
        assert!(!cell.try_stop());
        assert_eq!(cell.get(), EndpointState::Stopped);
    }

    #[test]
    fn start_without_init_is_rejected() {
        let cell = EndpointStateCell::new();
        assert!(!cell.try_start());
        assert_eq!(cell.get(), EndpointState::Created);
    }

    #[test]
    fn double_init_without_stop_is_rejected() {
        let cell = EndpointStateCell::new();
        assert!(cell.try_init());
        assert!(cell.try_start());
        assert!(!cell.try_init());
    }
}
