//! Platform-specific backends.
//!
//! Each backend provides the same shape: a `Selector` (the OS readiness
//! polling primitive, e.g. `epoll` or `WSAPoll`), a `Waker` (the mechanism
//! used to interrupt a blocking wait), and a small `net` module of non-blocking
//! socket helpers used by the endpoint state machines.

#[cfg(unix)]
mod unix;
#[cfg(unix)]
pub use unix::{net, Selector, Waker};

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub use windows::{net, Selector, Waker};
