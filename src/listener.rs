//! User-supplied listener contracts. The core holds only a [`Weak`]
//! reference to the user's listener to prevent lifecycle inversion.

use crate::buffer::DynBuffer;
use crate::session::Session;
use crate::RawDescriptor;

/// Events delivered to a server endpoint's listener.
pub trait ServerListener: Send + Sync {
    fn on_accept(&self, _session: Session) {}
    fn on_receive(&self, _session: Session, _buffer: DynBuffer) {}
    fn on_close(&self, _session: Session) {}
    fn on_error(&self, _session: Session, _reason: std::io::Error) {}
}

/// Events delivered to a client endpoint's listener.
pub trait ClientListener: Send + Sync {
    fn on_receive(&self, _fd: RawDescriptor, _buffer: DynBuffer) {}
    fn on_close(&self, _fd: RawDescriptor) {}
    fn on_error(&self, _fd: RawDescriptor, _reason: std::io::Error) {}
}
