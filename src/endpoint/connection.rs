//! The shared per-connection handler used by both TCP and Unix-domain
//! stream servers and clients (§4.5): one handler per accepted or
//! connected data fd, owning that connection's send queue.

use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, Weak};

use bytes::Bytes;
use log::trace;

use crate::config::RECV_BUFFER_SIZE;
use crate::handler::Handler;
use crate::interest::Interest;
use crate::reactor::SharedReactor;
use crate::sendqueue::{DrainOutcome, InterestTransition, SendQueue};
use crate::RawDescriptor;

/// Blanket capability for the concrete stream types this handler can wrap.
pub trait RawStream: Read + Write + Send {}
impl RawStream for std::net::TcpStream {}
#[cfg(unix)]
impl RawStream for std::os::unix::net::UnixStream {}

/// Callbacks the owning endpoint (server or client) supplies; held only as
/// a weak reference to avoid a server <-> handler reference cycle, per the
/// "cyclic references" design note.
pub trait ConnectionOwner: Send + Sync {
    fn on_readable_chunk(&self, fd: RawDescriptor, chunk: Bytes);
    fn on_connection_closed(&self, fd: RawDescriptor, is_error: bool, reason: Option<io::Error>);
}

pub struct ConnectionHandler<S: RawStream> {
    fd: RawDescriptor,
    stream: Mutex<S>,
    send_queue: SendQueue,
    reactor: SharedReactor,
    owner: Weak<dyn ConnectionOwner>,
    closed: AtomicBool,
}

impl<S: RawStream> ConnectionHandler<S> {
    pub fn new(fd: RawDescriptor, stream: S, reactor: SharedReactor, owner: Weak<dyn ConnectionOwner>) -> ConnectionHandler<S> {
        ConnectionHandler {
            fd,
            stream: Mutex::new(stream),
            send_queue: SendQueue::new(),
            reactor,
            owner,
            closed: AtomicBool::new(false),
        }
    }

    /// `QueueSend`: append bytes to the send queue, enabling WRITE
    /// interest if the queue transitioned from empty to non-empty. The
    /// transition is decided under the send queue's own lock, so this can
    /// never race `on_write`'s drain into leaving a queued chunk stuck
    /// behind a disabled WRITE interest.
    pub fn queue_send(&self, payload: Bytes) -> bool {
        if self.closed.load(Ordering::SeqCst) {
            return false;
        }
        if let InterestTransition::Enable = self.send_queue.enqueue(payload) {
            self.reactor.modify(self.fd, self.interest());
        }
        true
    }

    fn unified_close(&self, is_error: bool, reason: Option<io::Error>) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return; // idempotent per fd
        }
        self.reactor.remove(self.fd);
        if let Some(owner) = self.owner.upgrade() {
            owner.on_connection_closed(self.fd, is_error, reason);
        }
    }
}

impl<S: RawStream> Handler for ConnectionHandler<S> {
    fn descriptor(&self) -> RawDescriptor {
        self.fd
    }

    fn interest(&self) -> Interest {
        if self.send_queue.write_interest_enabled() {
            Interest::READABLE.add(Interest::WRITABLE)
        } else {
            Interest::READABLE
        }
    }

    fn on_read(&self) {
        let mut buf = vec![0u8; RECV_BUFFER_SIZE];
        loop {
            if self.closed.load(Ordering::SeqCst) {
                return;
            }
            let read_result = {
                let mut stream = self.stream.lock().unwrap();
                stream.read(&mut buf)
            };
            match read_result {
                Ok(0) => {
                    // Peer half-closed. Do not clean up synchronously; the
                    // reactor's own CLOSE dispatch (or a later read
                    // returning 0 again, which is harmless) drives the
                    // unified close path.
                    self.unified_close(false, None);
                    return;
                }
                Ok(n) => {
                    let chunk = Bytes::copy_from_slice(&buf[..n]);
                    if let Some(owner) = self.owner.upgrade() {
                        owner.on_readable_chunk(self.fd, chunk);
                    }
                    trace!("fd {:?} read {} bytes", self.fd, n);
                    continue;
                }
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => return,
                Err(err) => {
                    self.unified_close(true, Some(err));
                    return;
                }
            }
        }
    }

    fn on_write(&self) {
        let (outcome, transition) = {
            let mut stream = self.stream.lock().unwrap();
            self.send_queue.drain(&mut *stream)
        };
        if let InterestTransition::Disable = transition {
            self.reactor.modify(self.fd, self.interest());
        }
        match outcome {
            DrainOutcome::Drained | DrainOutcome::WouldBlock => {}
            DrainOutcome::Fatal(err) => self.unified_close(true, Some(err)),
        }
    }

    fn on_error(&self, reason: io::Error) {
        self.unified_close(true, Some(reason));
    }

    fn on_close(&self) {
        self.unified_close(false, None);
    }
}
