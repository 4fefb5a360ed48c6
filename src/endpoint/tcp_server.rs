//! TCP stream server endpoint.

use std::collections::HashMap;
use std::io;
use std::net::{SocketAddr, TcpStream};
use std::sync::{Arc, Mutex, Weak};

use bytes::Bytes;
use log::warn;

use crate::address::Address;
use crate::buffer::DynBuffer;
use crate::endpoint::connection::{ConnectionHandler, ConnectionOwner};
use crate::endpoint::raw_fd_of;
use crate::handler::Handler;
use crate::interest::Interest;
use crate::listener::ServerListener;
use crate::reactor::SharedReactor;
use crate::session::{Session, SessionSender};
use crate::state::EndpointStateCell;
use crate::sys;
use crate::taskqueue::TaskQueue;
use crate::RawDescriptor;

type Connection = ConnectionHandler<TcpStream>;

/// A TCP stream server: binds and listens on §6's network address family,
/// accepts connections, and fans read/close/error events for each out to
/// the application listener through the endpoint's task queue.
pub struct TcpServer {
    addr: Address,
    reactor: SharedReactor,
    state: EndpointStateCell,
    listen_fd: Mutex<Option<RawDescriptor>>,
    listener_socket: Mutex<Option<std::net::TcpListener>>,
    connections: Mutex<HashMap<RawDescriptor, Arc<Connection>>>,
    sessions: Mutex<HashMap<RawDescriptor, Session>>,
    tasks: TaskQueue,
    app_listener: Mutex<Weak<dyn ServerListener>>,
    self_weak: Mutex<Weak<TcpServer>>,
}

impl TcpServer {
    pub fn new(reactor: SharedReactor, addr: Address) -> Arc<TcpServer> {
        Arc::new_cyclic(|weak| TcpServer {
            addr,
            reactor,
            state: EndpointStateCell::new(),
            listen_fd: Mutex::new(None),
            listener_socket: Mutex::new(None),
            connections: Mutex::new(HashMap::new()),
            sessions: Mutex::new(HashMap::new()),
            tasks: TaskQueue::new(),
            app_listener: Mutex::new(Weak::new()),
            self_weak: Mutex::new(weak.clone()),
        })
    }

    pub fn set_listener(&self, listener: &Arc<dyn ServerListener>) {
        *self.app_listener.lock().unwrap() = Arc::downgrade(listener);
    }

    pub fn init(&self) -> bool {
        self.state.try_init()
    }

    pub fn start(&self) -> bool {
        if !self.state.try_start() {
            return false;
        }
        let Some(SocketAddr::V4(v4)) = self.addr.as_socket_addr() else {
            warn!("tcp server requires a network address");
            return false;
        };
        match sys::net::new_tcp_listener(v4) {
            Ok((listener, fd)) => {
                let owner: Weak<TcpServer> = self.self_weak.lock().unwrap().clone();
                let handler: Arc<dyn Handler> = Arc::new(TcpListenHandler { fd, owner });
                if !self.reactor.register(handler) {
                    return false;
                }
                *self.listen_fd.lock().unwrap() = Some(fd);
                *self.listener_socket.lock().unwrap() = Some(listener);
                self.tasks.start();
                true
            }
            Err(err) => {
                warn!("tcp server bind/listen failed on {:?}: {}", self.addr, err);
                false
            }
        }
    }

    pub fn stop(&self) -> bool {
        if !self.state.try_stop() {
            return true; // repeated Stop is a no-op success
        }
        let fds: Vec<RawDescriptor> = self.connections.lock().unwrap().keys().copied().collect();
        for fd in fds {
            self.reactor.remove(fd);
            self.connections.lock().unwrap().remove(&fd);
        }
        self.sessions.lock().unwrap().clear();
        if let Some(fd) = self.listen_fd.lock().unwrap().take() {
            self.reactor.remove(fd);
        }
        *self.listener_socket.lock().unwrap() = None;
        self.tasks.stop();
        true
    }

    pub fn socket_fd(&self) -> Option<RawDescriptor> {
        *self.listen_fd.lock().unwrap()
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener_socket.lock().unwrap().as_ref().and_then(|l| l.local_addr().ok())
    }

    /// `Send(fd, payload)`: deliver to a specific accepted connection by
    /// fd, the stream-server specialization of §6's generic
    /// `Send(fd, host, port, payload)` (host/port are redundant once a
    /// stream connection is addressed by fd; see DESIGN.md).
    pub fn send(&self, fd: RawDescriptor, payload: impl Into<Bytes>) -> bool {
        if !self.state.is_running() {
            return false;
        }
        self.send_to_session(Some(fd), &self.addr, payload.into())
    }

    fn accept_loop(&self) {
        loop {
            let accepted = {
                let guard = self.listener_socket.lock().unwrap();
                match guard.as_ref() {
                    Some(listener) => sys::net::accept_nonblocking(listener),
                    None => return,
                }
            };
            match accepted {
                Ok(Some((stream, peer_addr))) => self.handle_accepted(stream, peer_addr),
                Ok(None) => return,
                Err(err) => {
                    warn!("accept failed: {}", err);
                    return;
                }
            }
        }
    }

    fn handle_accepted(&self, stream: TcpStream, peer_addr: SocketAddr) {
        let Some(strong_self) = self.self_weak.lock().unwrap().upgrade() else {
            return;
        };
        let fd = raw_fd_of(&stream);
        let owner: Weak<dyn ConnectionOwner> = Arc::downgrade(&strong_self);
        let connection = Arc::new(ConnectionHandler::new(fd, stream, self.reactor.clone(), owner));
        let handler: Arc<dyn Handler> = connection.clone();
        if !self.reactor.register(handler) {
            return;
        }
        self.connections.lock().unwrap().insert(fd, connection);

        let sender: Arc<dyn SessionSender> = strong_self;
        let session = Session::new_stream(fd, Address::from(peer_addr), &sender);
        self.sessions.lock().unwrap().insert(fd, session.clone());

        let listener = self.app_listener.lock().unwrap().clone();
        self.tasks.enqueue(move || {
            if let Some(listener) = listener.upgrade() {
                listener.on_accept(session);
            }
        });
    }

    fn handle_listen_fatal(&self, reason: io::Error) {
        warn!("listen fd observed a fatal condition: {}", reason);
        if let Some(fd) = self.listen_fd.lock().unwrap().take() {
            self.reactor.remove(fd);
        }
    }
}

impl ConnectionOwner for TcpServer {
    fn on_readable_chunk(&self, fd: RawDescriptor, chunk: Bytes) {
        let Some(session) = self.sessions.lock().unwrap().get(&fd).cloned() else {
            return;
        };
        let listener = self.app_listener.lock().unwrap().clone();
        self.tasks.enqueue(move || {
            if let Some(listener) = listener.upgrade() {
                let mut buf = DynBuffer::new();
                buf.assign(&chunk);
                listener.on_receive(session, buf);
            }
        });
    }

    fn on_connection_closed(&self, fd: RawDescriptor, is_error: bool, reason: Option<io::Error>) {
        self.connections.lock().unwrap().remove(&fd);
        let Some(session) = self.sessions.lock().unwrap().remove(&fd) else {
            return;
        };
        let listener = self.app_listener.lock().unwrap().clone();
        self.tasks.enqueue(move || {
            let Some(listener) = listener.upgrade() else { return };
            if is_error {
                listener.on_error(session, reason.unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "connection error")));
            } else {
                listener.on_close(session);
            }
        });
    }
}

impl SessionSender for TcpServer {
    fn send_to_session(&self, fd: Option<RawDescriptor>, _peer: &Address, payload: Bytes) -> bool {
        match fd {
            Some(fd) => match self.connections.lock().unwrap().get(&fd) {
                Some(connection) => connection.queue_send(payload),
                None => false,
            },
            None => false,
        }
    }
}

struct TcpListenHandler {
    fd: RawDescriptor,
    owner: Weak<TcpServer>,
}

impl Handler for TcpListenHandler {
    fn descriptor(&self) -> RawDescriptor {
        self.fd
    }

    fn interest(&self) -> Interest {
        Interest::READABLE
    }

    fn on_read(&self) {
        if let Some(owner) = self.owner.upgrade() {
            owner.accept_loop();
        }
    }

    fn on_write(&self) {}

    fn on_error(&self, reason: io::Error) {
        if let Some(owner) = self.owner.upgrade() {
            owner.handle_listen_fatal(reason);
        }
    }

    fn on_close(&self) {
        if let Some(owner) = self.owner.upgrade() {
            owner.handle_listen_fatal(io::Error::new(io::ErrorKind::Other, "listen socket closed"));
        }
    }
}
