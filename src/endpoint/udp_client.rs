//! UDP datagram client endpoint: a socket bound to an ephemeral local port,
//! sending to and receiving from a single configured peer.

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use bytes::Bytes;
use log::warn;

use crate::address::Address;
use crate::buffer::DynBuffer;
use crate::config::RECV_BUFFER_SIZE;
use crate::endpoint::udp_server::send_datagram;
use crate::handler::Handler;
use crate::interest::Interest;
use crate::listener::ClientListener;
use crate::reactor::SharedReactor;
use crate::state::EndpointStateCell;
use crate::sys;
use crate::taskqueue::TaskQueue;
use crate::RawDescriptor;

pub struct UdpClient {
    peer: Address,
    broadcast: AtomicBool,
    reactor: SharedReactor,
    state: EndpointStateCell,
    fd: Mutex<Option<RawDescriptor>>,
    socket: Mutex<Option<std::net::UdpSocket>>,
    tasks: TaskQueue,
    app_listener: Mutex<Weak<dyn ClientListener>>,
    self_weak: Mutex<Weak<UdpClient>>,
}

impl UdpClient {
    pub fn new(reactor: SharedReactor, peer: Address) -> Arc<UdpClient> {
        Arc::new_cyclic(|weak| UdpClient {
            peer,
            broadcast: AtomicBool::new(false),
            reactor,
            state: EndpointStateCell::new(),
            fd: Mutex::new(None),
            socket: Mutex::new(None),
            tasks: TaskQueue::new(),
            app_listener: Mutex::new(Weak::new()),
            self_weak: Mutex::new(weak.clone()),
        })
    }

    /// `EnableBroadcast()`: must be called before [`UdpClient::start`].
    pub fn enable_broadcast(&self) {
        self.broadcast.store(true, Ordering::SeqCst);
    }

    pub fn set_listener(&self, listener: &Arc<dyn ClientListener>) {
        *self.app_listener.lock().unwrap() = Arc::downgrade(listener);
    }

    pub fn init(&self) -> bool {
        self.state.try_init()
    }

    pub fn start(&self) -> bool {
        if !self.state.try_start() {
            return false;
        }
        let bind_addr = std::net::SocketAddrV4::new(std::net::Ipv4Addr::UNSPECIFIED, 0);
        match sys::net::new_udp_bound(bind_addr) {
            Ok((socket, fd)) => {
                if self.broadcast.load(Ordering::SeqCst) {
                    if let Err(err) = sys::net::set_broadcast(&socket, true) {
                        warn!("udp client failed to enable broadcast: {}", err);
                    }
                }
                let owner: Weak<UdpClient> = self.self_weak.lock().unwrap().clone();
                let handler: Arc<dyn Handler> = Arc::new(UdpClientHandler { fd, owner });
                if !self.reactor.register(handler) {
                    return false;
                }
                *self.fd.lock().unwrap() = Some(fd);
                *self.socket.lock().unwrap() = Some(socket);
                self.tasks.start();
                true
            }
            Err(err) => {
                warn!("udp client bind failed: {}", err);
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
        *self.socket.lock().unwrap() = None;
        self.tasks.stop();
        true
    }

    pub fn socket_fd(&self) -> Option<RawDescriptor> {
        *self.fd.lock().unwrap()
    }

    /// `Send(payload)` to the configured peer.
    pub fn send(&self, payload: impl Into<Bytes>) -> bool {
        if !self.state.is_running() {
            return false;
        }
        let Some(host) = self.peer.host() else {
            return false;
        };
        let Some(port) = self.peer.port() else {
            return false;
        };
        let payload = payload.into();
        let guard = self.socket.lock().unwrap();
        match guard.as_ref() {
            Some(socket) => send_datagram(socket, SocketAddr::new(std::net::IpAddr::V4(host), port), &payload),
            None => false,
        }
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
                Ok((n, _peer)) => {
                    let chunk = Bytes::copy_from_slice(&buf[..n]);
                    self.deliver_receive(chunk);
                    continue;
                }
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => return,
                Err(err) => {
                    warn!("udp client recv error: {}", err);
                    return;
                }
            }
        }
    }

    fn deliver_receive(&self, chunk: Bytes) {
        let Some(fd) = *self.fd.lock().unwrap() else {
            return;
        };
        let listener = self.app_listener.lock().unwrap().clone();
        self.tasks.enqueue(move || {
            if let Some(listener) = listener.upgrade() {
                let mut buf = DynBuffer::new();
                buf.assign(&chunk);
                listener.on_receive(fd, buf);
            }
        });
    }

    fn handle_fatal(&self, reason: io::Error) {
        let fd = self.fd.lock().unwrap().take();
        if let Some(fd) = fd {
            self.reactor.remove(fd);
            let listener = self.app_listener.lock().unwrap().clone();
            self.tasks.enqueue(move || {
                if let Some(listener) = listener.upgrade() {
                    listener.on_error(fd, reason);
                }
            });
        }
    }
}

struct UdpClientHandler {
    fd: RawDescriptor,
    owner: Weak<UdpClient>,
}

impl Handler for UdpClientHandler {
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
