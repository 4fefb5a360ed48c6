//! The handler contract: the unit of registration with the [`Reactor`].
//!
//! [`Reactor`]: crate::reactor::Reactor

use crate::interest::Interest;
use crate::RawDescriptor;

/// Implemented by every entity registered with the reactor: the listen-fd
/// handler for a server, the per-connection handler for a stream data fd,
/// and the single handler each datagram endpoint registers for its bound
/// fd.
///
/// A handler is always held behind `Arc<dyn Handler>` by the reactor's
/// registry so that a callback in flight keeps the handler alive even if
/// `Reactor::remove` races it from another thread (see the data model's
/// "handler outlives every in-flight callback" invariant).
pub trait Handler: Send + Sync {
    /// The descriptor this handler is, or was last, registered for.
    fn descriptor(&self) -> RawDescriptor;

    /// The interest mask that should currently be installed for
    /// [`Self::descriptor`]. Read by the reactor only at `register`/
    /// `modify` time; mutating what this returns has no effect until the
    /// handler (or the reactor on its behalf) calls `Reactor::modify`.
    fn interest(&self) -> Interest;

    /// Read-readiness (or UDP/peer datagram arrival) callback.
    fn on_read(&self);

    /// Write-readiness callback; typically drains a send queue.
    fn on_write(&self);

    /// A fatal, non-transient error was observed on this descriptor.
    fn on_error(&self, reason: std::io::Error);

    /// The peer half-closed or the descriptor was otherwise marked closed.
    fn on_close(&self);
}
