//! Shared test instrumentation: listener implementations that forward every
//! callback onto an `mpsc` channel so a test thread can assert on the order
//! and content of events delivered off the reactor/task-queue threads.

use std::io;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::time::Duration;

use reactix::{ClientListener, DynBuffer, RawDescriptor, ServerListener, Session};

pub enum ServerEvent {
    Accept(Session),
    Receive(Session, Vec<u8>),
    Close(Session),
    Error(Session, String),
}

struct ChannelServerListener {
    tx: Sender<ServerEvent>,
}

impl ServerListener for ChannelServerListener {
    fn on_accept(&self, session: Session) {
        let _ = self.tx.send(ServerEvent::Accept(session));
    }

    fn on_receive(&self, session: Session, buffer: DynBuffer) {
        let _ = self.tx.send(ServerEvent::Receive(session, buffer.data().to_vec()));
    }

    fn on_close(&self, session: Session) {
        let _ = self.tx.send(ServerEvent::Close(session));
    }

    fn on_error(&self, session: Session, reason: io::Error) {
        let _ = self.tx.send(ServerEvent::Error(session, reason.to_string()));
    }
}

pub fn server_listener() -> (Arc<dyn ServerListener>, Receiver<ServerEvent>) {
    let (tx, rx) = channel();
    (Arc::new(ChannelServerListener { tx }), rx)
}

pub enum ClientEvent {
    Receive(RawDescriptor, Vec<u8>),
    Close(RawDescriptor),
    Error(RawDescriptor, String),
}

struct ChannelClientListener {
    tx: Sender<ClientEvent>,
}

impl ClientListener for ChannelClientListener {
    fn on_receive(&self, fd: RawDescriptor, buffer: DynBuffer) {
        let _ = self.tx.send(ClientEvent::Receive(fd, buffer.data().to_vec()));
    }

    fn on_close(&self, fd: RawDescriptor) {
        let _ = self.tx.send(ClientEvent::Close(fd));
    }

    fn on_error(&self, fd: RawDescriptor, reason: io::Error) {
        let _ = self.tx.send(ClientEvent::Error(fd, reason.to_string()));
    }
}

pub fn client_listener() -> (Arc<dyn ClientListener>, Receiver<ClientEvent>) {
    let (tx, rx) = channel();
    (Arc::new(ChannelClientListener { tx }), rx)
}

/// Every channel wait in these tests goes through this helper so a stuck
/// reactor/task-queue fails the test instead of hanging the suite.
pub fn recv_timeout<T>(rx: &Receiver<T>) -> T {
    rx.recv_timeout(Duration::from_secs(5)).expect("timed out waiting for event")
}
