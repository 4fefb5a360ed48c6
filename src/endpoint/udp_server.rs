//! UDP datagram server endpoint (§4.6). No session map is kept across
//! datagrams; each receive constructs a transient [`Session`] keyed by the
//! peer address.

use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex, Weak};

use bytes::Bytes;
use log::warn;

use crate::address::Address;
use crate::buffer::DynBuffer;
use crate::config::RECV_BUFFER_SIZE;
use crate::handler::Handler;
use crate::interest::Interest;
use crate::listener::ServerListener;
use crate::reactor::SharedReactor;
use crate::session::{Session, SessionSender};
use crate::state::EndpointStateCell;
use crate::sys;
use crate::taskqueue::TaskQueue;
use crate::RawDescriptor;

pub struct UdpServer {
    addr: Address,
    reactor: SharedReactor,
    state: EndpointStateCell,
    fd: Mutex<Option<RawDescriptor>>,
    socket: Mutex<Option<std::net::UdpSocket>>,
    tasks: TaskQueue,
    app_listener: Mutex<Weak<dyn ServerListener>>,
    self_weak: Mutex<Weak<UdpServer>>,
}

impl UdpServer {
    pub fn new(reactor: SharedReactor, addr: Address) -> Arc<UdpServer> {
        Arc::new_cyclic(|weak| UdpServer {
            addr,
            reactor,
            state: EndpointStateCell::new(),
            fd: Mutex::new(None),
            socket: Mutex::new(None),
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
            warn!("udp server requires a network address");
            return false;
        };
        match sys::net::new_udp_bound(v4) {
            Ok((socket, fd)) => {
                let owner: Weak<UdpServer> = self.self_weak.lock().unwrap().clone();
                let handler: Arc<dyn Handler> = Arc::new(UdpServerHandler { fd, owner });
                if !self.reactor.register(handler) {
                    return false;
                }
                *self.fd.lock().unwrap() = Some(fd);
                *self.socket.lock().unwrap() = Some(socket);
                self.tasks.start();
                true
            }
            Err(err) => {
                warn!("udp server bind failed on {:?}: {}", self.addr, err);
                false
            }
        }
    }

    pub fn stop(&self) -> bool {
        if !self.state.try_stop() {
            return true;
        }
        if let Some(fd) = self.fd.lock().unwrap().take() {
            self.reactor.remove(fd);
        }
        *self.socket.lock().unwrap() = None;
        self.tasks.stop();
        true
    }

    pub fn socket_fd(&self) -> Option<RawDescriptor> {
        *self.fd.lock().unwrap()
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.lock().unwrap().as_ref().and_then(|s| s.local_addr().ok())
    }

    /// `Send(fd, host, port, payload)` specialized for datagrams: there is
    /// no per-peer fd, so addressing is by host/port alone.
    pub fn send(&self, host: std::net::Ipv4Addr, port: u16, payload: impl Into<Bytes>) -> bool {
        if !self.state.is_running() {
            return false;
        }
        self.send_to_session(None, &Address::network(host, port), payload.into())
    }

    fn recv_loop(&self) {
        let mut buf = vec![0u8; RECV_BUFFER_SIZE];
        loop {
            let result = {
                let guard = self.socket.lock().unwrap();
                match guard.as_ref() {
                    Some(socket) => socket.recv_from(&mut buf),
                    None => return,
                }
            };
            match result {
                Ok((n, peer)) => {
                    self.deliver_receive(peer, Bytes::copy_from_slice(&buf[..n]));
                    continue;
                }
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => return,
                Err(err) => {
                    warn!("udp recv error: {}", err);
                    return;
                }
            }
        }
    }

    fn deliver_receive(&self, peer: SocketAddr, chunk: Bytes) {
        let Some(strong_self) = self.self_weak.lock().unwrap().upgrade() else {
            return;
        };
        let sender: Arc<dyn SessionSender> = strong_self;
        let session = Session::new_datagram(Address::from(peer), &sender);
        let listener = self.app_listener.lock().unwrap().clone();
        self.tasks.enqueue(move || {
            if let Some(listener) = listener.upgrade() {
                let mut buf = DynBuffer::new();
                buf.assign(&chunk);
                listener.on_receive(session, buf);
            }
        });
    }

    fn handle_fatal(&self, reason: io::Error) {
        warn!("udp server socket observed a fatal condition: {}", reason);
        if let Some(fd) = self.fd.lock().unwrap().take() {
            self.reactor.remove(fd);
        }
    }
}

impl SessionSender for UdpServer {
    fn send_to_session(&self, _fd: Option<RawDescriptor>, peer: &Address, payload: Bytes) -> bool {
        let (Some(host), Some(port)) = (peer.host(), peer.port()) else {
            return false;
        };
        let guard = self.socket.lock().unwrap();
        match guard.as_ref() {
            Some(socket) => send_datagram(socket, SocketAddr::new(IpAddr::V4(host), port), &payload),
            None => false,
        }
    }
}

pub(crate) fn send_datagram(socket: &std::net::UdpSocket, addr: SocketAddr, payload: &[u8]) -> bool {
    match socket.send_to(payload, addr) {
        Ok(n) if n == payload.len() => true,
        Ok(n) => {
            warn!("partial udp send: {} of {} bytes", n, payload.len());
            false
        }
        Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
            warn!("udp send would block, dropping datagram");
            false
        }
        Err(err) => {
            warn!("udp send failed: {}", err);
            false
        }
    }
}

struct UdpServerHandler {
    fd: RawDescriptor,
    owner: Weak<UdpServer>,
}

impl Handler for UdpServerHandler {
    fn descriptor(&self) -> RawDescriptor {
        self.fd
    }

    fn interest(&self) -> Interest {
        Interest::READABLE
    }

    fn on_read(&self) {
        if let Some(owner) = self.owner.upgrade() {
            owner.recv_loop();
        }
    }

    fn on_write(&self) {}

    fn on_error(&self, reason: io::Error) {
        if let Some(owner) = self.owner.upgrade() {
            owner.handle_fatal(reason);
        }
    }

    fn on_close(&self) {
        if let Some(owner) = self.owner.upgrade() {
            owner.handle_fatal(io::Error::new(io::ErrorKind::Other, "udp socket closed"));
        }
    }
}
