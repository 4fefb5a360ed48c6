//! Windows backend.
//!
//! Unlike the teacher's full IOCP implementation, this backend keeps the
//! `Selector` shape uniform with the Unix backend by polling with
//! `WSAPoll`, a level-triggered primitive analogous to POSIX `poll(2)`.
//! See `SPEC_FULL.md` §4.1/§9 for the rationale: a future IOCP backend can
//! slot in behind the same `register`/`reregister`/`deregister`/`select`
//! surface without touching the reactor or endpoint layers above it.

pub mod net;
mod selector;
mod waker;

pub use selector::Selector;
pub use waker::Waker;
