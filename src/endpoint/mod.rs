//! Endpoint state machines (§4.7): `Created -> Init'd -> Running -> Stopped`
//! for each of the six concrete families below.

pub mod connection;
pub mod tcp_client;
pub mod tcp_server;
pub mod udp_client;
pub mod udp_server;
#[cfg(unix)]
pub mod unix_client;
#[cfg(unix)]
pub mod unix_server;

#[cfg(unix)]
pub(crate) fn raw_fd_of<T: std::os::unix::io::AsRawFd>(t: &T) -> crate::RawDescriptor {
    t.as_raw_fd()
}

#[cfg(windows)]
pub(crate) fn raw_fd_of<T: std::os::windows::io::AsRawSocket>(t: &T) -> crate::RawDescriptor {
    t.as_raw_socket()
}
