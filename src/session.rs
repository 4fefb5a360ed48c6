//! Per-connection (stream) and per-peer (datagram) session objects handed
//! to server listeners, per §4.5/§4.6.

use std::sync::{Arc, Weak};

use bytes::Bytes;

use crate::address::Address;
use crate::RawDescriptor;

/// Back-reference a [`Session`] uses to delegate its `Send` to the owning
/// endpoint, breaking the server <-> session <-> handler reference cycle
/// with a weak pointer (per the "cyclic references" design note).
pub trait SessionSender: Send + Sync {
    /// `fd` is `Some` for a stream session (sent via that connection's
    /// send queue) and `None` for a transient datagram session (sent via
    /// `sendto` to `peer`).
    fn send_to_session(&self, fd: Option<RawDescriptor>, peer: &Address, payload: Bytes) -> bool;
}

/// Carries peer address, the fd (for stream sessions), and a weak handle
/// back to the owning endpoint so the listener can reply.
#[derive(Clone)]
pub struct Session {
    fd: Option<RawDescriptor>,
    peer: Address,
    owner: Weak<dyn SessionSender>,
}

impl Session {
    pub fn new_stream(fd: RawDescriptor, peer: Address, owner: &Arc<dyn SessionSender>) -> Session {
        Session {
            fd: Some(fd),
            peer,
            owner: Arc::downgrade(owner),
        }
    }

    pub fn new_datagram(peer: Address, owner: &Arc<dyn SessionSender>) -> Session {
        Session {
            fd: None,
            peer,
            owner: Arc::downgrade(owner),
        }
    }

    pub fn peer(&self) -> &Address {
        &self.peer
    }

    pub fn fd(&self) -> Option<RawDescriptor> {
        self.fd
    }

    /// Send a payload back to this session's peer. Returns `false` if the
    /// owning endpoint has since been torn down, or if the underlying
    /// send was rejected (e.g. the connection already closed).
    pub fn send(&self, payload: impl Into<Bytes>) -> bool {
        match self.owner.upgrade() {
            Some(owner) => owner.send_to_session(self.fd, &self.peer, payload.into()),
            None => false,
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").field("fd", &self.fd).field("peer", &self.peer).finish()
    }
}

impl PartialEq for Session {
    fn eq(&self, other: &Session) -> bool {
        self.fd == other.fd && self.peer == other.peer
    }
}
