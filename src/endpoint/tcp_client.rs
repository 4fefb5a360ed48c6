//! TCP stream client endpoint.

use std::io;
use std::net::{SocketAddr, TcpStream};
use std::sync::{Arc, Mutex, Weak};

use bytes::Bytes;
use log::warn;

use crate::address::Address;
use crate::buffer::DynBuffer;
use crate::endpoint::connection::{ConnectionHandler, ConnectionOwner};
use crate::handler::Handler;
use crate::listener::ClientListener;
use crate::reactor::SharedReactor;
use crate::state::EndpointStateCell;
use crate::sys;
use crate::taskqueue::TaskQueue;
use crate::RawDescriptor;

type Connection = ConnectionHandler<TcpStream>;

/// A TCP stream client: connects to a peer and delivers read/close/error
/// events to the application listener.
pub struct TcpClient {
    peer: Address,
    reactor: SharedReactor,
    state: EndpointStateCell,
    fd: Mutex<Option<RawDescriptor>>,
    connection: Mutex<Option<Arc<Connection>>>,
    tasks: TaskQueue,
    app_listener: Mutex<Weak<dyn ClientListener>>,
    self_weak: Mutex<Weak<TcpClient>>,
}

impl TcpClient {
    pub fn new(reactor: SharedReactor, peer: Address) -> Arc<TcpClient> {
        Arc::new_cyclic(|weak| TcpClient {
            peer,
            reactor,
            state: EndpointStateCell::new(),
            fd: Mutex::new(None),
            connection: Mutex::new(None),
            tasks: TaskQueue::new(),
            app_listener: Mutex::new(Weak::new()),
            self_weak: Mutex::new(weak.clone()),
        })
    }

    pub fn set_listener(&self, listener: &Arc<dyn ClientListener>) {
        *self.app_listener.lock().unwrap() = Arc::downgrade(listener);
    }

    pub fn init(&self) -> bool {
        self.state.try_init()
    }

    pub fn connect(&self) -> bool {
        if !self.state.try_start() {
            return false;
        }
        let Some(SocketAddr::V4(v4)) = self.peer.as_socket_addr() else {
            warn!("tcp client requires a network peer address");
            return false;
        };
        match sys::net::new_tcp_connect(v4) {
            Ok((stream, fd)) => {
                let Some(strong_self) = self.self_weak.lock().unwrap().upgrade() else {
                    return false;
                };
                let owner: Weak<dyn ConnectionOwner> = Arc::downgrade(&strong_self);
                let connection = Arc::new(ConnectionHandler::new(fd, stream, self.reactor.clone(), owner));
                let handler: Arc<dyn Handler> = connection.clone();
                if !self.reactor.register(handler) {
                    return false;
                }
                *self.fd.lock().unwrap() = Some(fd);
                *self.connection.lock().unwrap() = Some(connection);
                self.tasks.start();
                true
            }
            Err(err) => {
                warn!("tcp client connect to {:?} failed: {}", self.peer, err);
                false
            }
        }
    }

    pub fn close(&self) -> bool {
        if !self.state.try_stop() {
            return true;
        }
        if let Some(fd) = self.fd.lock().unwrap().take() {
            self.reactor.remove(fd);
        }
        *self.connection.lock().unwrap() = None;
        self.tasks.stop();
        true
    }

    pub fn socket_fd(&self) -> Option<RawDescriptor> {
        *self.fd.lock().unwrap()
    }

    pub fn send(&self, payload: impl Into<Bytes>) -> bool {
        if !self.state.is_running() {
            return false;
        }
        match self.connection.lock().unwrap().as_ref() {
            Some(connection) => connection.queue_send(payload.into()),
            None => false,
        }
    }
}

impl ConnectionOwner for TcpClient {
    fn on_readable_chunk(&self, fd: RawDescriptor, chunk: Bytes) {
        let listener = self.app_listener.lock().unwrap().clone();
        self.tasks.enqueue(move || {
            if let Some(listener) = listener.upgrade() {
                let mut buf = DynBuffer::new();
                buf.assign(&chunk);
                listener.on_receive(fd, buf);
            }
        });
    }

    fn on_connection_closed(&self, fd: RawDescriptor, is_error: bool, reason: Option<io::Error>) {
        *self.fd.lock().unwrap() = None;
        *self.connection.lock().unwrap() = None;
        let listener = self.app_listener.lock().unwrap().clone();
        self.tasks.enqueue(move || {
            let Some(listener) = listener.upgrade() else { return };
            if is_error {
                listener.on_error(fd, reason.unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "connection error")));
            } else {
                listener.on_close(fd);
            }
        });
    }
}
