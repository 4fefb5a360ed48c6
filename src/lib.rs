//! reactix: a cross-platform, reactor-based asynchronous socket library.
//!
//! A single process-wide [`reactor::Reactor`] polls every registered
//! descriptor (epoll on Unix, WSAPoll on Windows) from one background
//! thread and dispatches readiness in a fixed ERROR -> CLOSE -> READ ->
//! WRITE order to each descriptor's [`handler::Handler`]. The six endpoint
//! families under [`endpoint`] (TCP/UDP/Unix-domain, client and server) are
//! built on top of that primitive plus a per-connection send queue
//! ([`sendqueue`]) and a per-endpoint callback pipeline ([`taskqueue`]) that
//! decouples user listener callbacks from the polling thread.

mod address;
mod buffer;
mod config;
mod endpoint;
mod event;
mod handler;
mod idleport;
mod interest;
mod listener;
mod reactor;
mod sendqueue;
mod session;
mod state;
mod sys;
mod taskqueue;
mod token;

pub use address::{Address, LocalPathTooLong, LOCAL_PATH_MAX};
pub use buffer::DynBuffer;
pub use config::{EVENTS_CAPACITY, IDLE_PORT_BASE, IDLE_PORT_MAX, POLL_TIMEOUT, RECV_BUFFER_SIZE};
pub use endpoint::tcp_client::TcpClient;
pub use endpoint::tcp_server::TcpServer;
pub use endpoint::udp_client::UdpClient;
pub use endpoint::udp_server::UdpServer;
#[cfg(unix)]
pub use endpoint::unix_client::UnixClient;
#[cfg(unix)]
pub use endpoint::unix_server::UnixServer;
pub use handler::Handler;
pub use idleport::{find_idle_udp_port, find_idle_udp_port_pair};
pub use interest::Interest;
pub use listener::{ClientListener, ServerListener};
pub use reactor::{Reactor, SharedReactor};
pub use session::{Session, SessionSender};
pub use state::EndpointState;
pub use token::Token;

/// The OS's native socket descriptor type: a raw fd on Unix, a raw
/// `SOCKET` handle on Windows.
#[cfg(unix)]
pub type RawDescriptor = std::os::unix::io::RawFd;
#[cfg(windows)]
pub type RawDescriptor = std::os::windows::io::RawSocket;
