//! Non-blocking socket construction helpers shared by the TCP, UDP and
//! Unix-domain endpoint state machines.

use std::io;
use std::net::{SocketAddr, SocketAddrV4};
use std::os::unix::io::{AsRawFd, FromRawFd, RawFd};
use std::os::unix::net::{UnixDatagram, UnixListener, UnixStream};
use std::path::Path;

use super::syscall;

/// Sentinel value for an invalid/closed descriptor.
pub const INVALID_FD: RawFd = -1;

fn set_nonblocking(fd: RawFd) -> io::Result<()> {
    let flags = syscall!(fcntl(fd, libc::F_GETFL))?;
    syscall!(fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK))?;
    Ok(())
}

fn set_cloexec(fd: RawFd) -> io::Result<()> {
    let flags = syscall!(fcntl(fd, libc::F_GETFD))?;
    syscall!(fcntl(fd, libc::F_SETFD, flags | libc::FD_CLOEXEC))?;
    Ok(())
}

pub fn new_tcp_listener(addr: SocketAddrV4) -> io::Result<(std::net::TcpListener, RawFd)> {
    let domain = libc::AF_INET;
    let fd = syscall!(socket(domain, libc::SOCK_STREAM, 0))?;
    set_cloexec(fd)?;
    let one: libc::c_int = 1;
    syscall!(setsockopt(
        fd,
        libc::SOL_SOCKET,
        libc::SO_REUSEADDR,
        &one as *const _ as *const libc::c_void,
        std::mem::size_of::<libc::c_int>() as libc::socklen_t
    ))?;
    let sockaddr = socket_addr_v4_to_raw(addr);
    syscall!(bind(
        fd,
        &sockaddr as *const _ as *const libc::sockaddr,
        std::mem::size_of::<libc::sockaddr_in>() as libc::socklen_t
    ))?;
    syscall!(listen(fd, 1024))?;
    set_nonblocking(fd)?;
    let listener = unsafe { std::net::TcpListener::from_raw_fd(fd) };
    Ok((listener, fd))
}

pub fn new_tcp_connect(addr: SocketAddrV4) -> io::Result<(std::net::TcpStream, RawFd)> {
    let fd = syscall!(socket(libc::AF_INET, libc::SOCK_STREAM, 0))?;
    set_cloexec(fd)?;
    set_nonblocking(fd)?;
    let sockaddr = socket_addr_v4_to_raw(addr);
    let res = unsafe {
        libc::connect(
            fd,
            &sockaddr as *const _ as *const libc::sockaddr,
            std::mem::size_of::<libc::sockaddr_in>() as libc::socklen_t,
        )
    };
    if res == -1 {
        let err = io::Error::last_os_error();
        // EINPROGRESS on a non-blocking connect is success for registration
        // purposes; the reactor resolves it via a later writable/error event.
        if err.raw_os_error() != Some(libc::EINPROGRESS) {
            unsafe { libc::close(fd) };
            return Err(err);
        }
    }
    let stream = unsafe { std::net::TcpStream::from_raw_fd(fd) };
    Ok((stream, fd))
}

pub fn accept_nonblocking(listener: &std::net::TcpListener) -> io::Result<Option<(std::net::TcpStream, SocketAddr)>> {
    let fd = listener.as_raw_fd();
    let mut storage: libc::sockaddr_storage = unsafe { std::mem::zeroed() };
    let mut len = std::mem::size_of::<libc::sockaddr_storage>() as libc::socklen_t;
    let res = unsafe { libc::accept(fd, &mut storage as *mut _ as *mut libc::sockaddr, &mut len) };
    if res == -1 {
        let err = io::Error::last_os_error();
        if err.kind() == io::ErrorKind::WouldBlock {
            return Ok(None);
        }
        return Err(err);
    }
    set_cloexec(res)?;
    set_nonblocking(res)?;
    let stream = unsafe { std::net::TcpStream::from_raw_fd(res) };
    let peer = stream.peer_addr()?;
    Ok(Some((stream, peer)))
}

pub fn new_udp_bound(addr: SocketAddrV4) -> io::Result<(std::net::UdpSocket, RawFd)> {
    let fd = syscall!(socket(libc::AF_INET, libc::SOCK_DGRAM, 0))?;
    set_cloexec(fd)?;
    let one: libc::c_int = 1;
    syscall!(setsockopt(
        fd,
        libc::SOL_SOCKET,
        libc::SO_REUSEADDR,
        &one as *const _ as *const libc::c_void,
        std::mem::size_of::<libc::c_int>() as libc::socklen_t
    ))?;
    let sockaddr = socket_addr_v4_to_raw(addr);
    syscall!(bind(
        fd,
        &sockaddr as *const _ as *const libc::sockaddr,
        std::mem::size_of::<libc::sockaddr_in>() as libc::socklen_t
    ))?;
    set_nonblocking(fd)?;
    let socket = unsafe { std::net::UdpSocket::from_raw_fd(fd) };
    Ok((socket, fd))
}

pub fn set_broadcast(socket: &std::net::UdpSocket, on: bool) -> io::Result<()> {
    socket.set_broadcast(on)
}

pub fn new_unix_listener(path: &Path) -> io::Result<(UnixListener, RawFd)> {
    // Deliberately does not unlink a pre-existing path: a second server
    // binding the same local path while the first is still listening must
    // fail with AddrInUse, not silently steal the socket.
    let listener = UnixListener::bind(path)?;
    listener.set_nonblocking(true)?;
    let fd = listener.as_raw_fd();
    set_cloexec(fd)?;
    Ok((listener, fd))
}

pub fn new_unix_connect(path: &Path) -> io::Result<(UnixStream, RawFd)> {
    let stream = UnixStream::connect(path)?;
    stream.set_nonblocking(true)?;
    let fd = stream.as_raw_fd();
    set_cloexec(fd)?;
    Ok((stream, fd))
}

pub fn accept_unix_nonblocking(listener: &UnixListener) -> io::Result<Option<UnixStream>> {
    match listener.accept() {
        Ok((stream, _)) => {
            stream.set_nonblocking(true)?;
            set_cloexec(stream.as_raw_fd())?;
            Ok(Some(stream))
        }
        Err(err) if err.kind() == io::ErrorKind::WouldBlock => Ok(None),
        Err(err) => Err(err),
    }
}

pub fn new_unix_datagram_bound(path: &Path) -> io::Result<(UnixDatagram, RawFd)> {
    let socket = UnixDatagram::bind(path)?;
    socket.set_nonblocking(true)?;
    let fd = socket.as_raw_fd();
    set_cloexec(fd)?;
    Ok((socket, fd))
}

fn socket_addr_v4_to_raw(addr: SocketAddrV4) -> libc::sockaddr_in {
    libc::sockaddr_in {
        sin_family: libc::AF_INET as libc::sa_family_t,
        sin_port: addr.port().to_be(),
        sin_addr: libc::in_addr {
            s_addr: u32::from_ne_bytes(addr.ip().octets()),
        },
        sin_zero: [0; 8],
        #[cfg(any(target_os = "macos", target_os = "ios", target_os = "freebsd", target_os = "netbsd", target_os = "openbsd"))]
        sin_len: 0,
    }
}

/// Try to determine whether a UDP port is free by binding it transiently.
pub fn probe_udp_port(port: u16) -> bool {
    std::net::UdpSocket::bind(("127.0.0.1", port)).is_ok()
}

/// Read and clear the pending error on a descriptor via
/// `getsockopt(SO_ERROR)`, for use after the reactor observes an
/// error-readiness event on it. Falls back to a generic error only if the
/// `getsockopt` call itself fails or reports no pending error, which
/// shouldn't happen for a genuinely errored fd.
pub fn take_socket_error(fd: RawFd) -> io::Error {
    let mut errno: libc::c_int = 0;
    let mut len = std::mem::size_of::<libc::c_int>() as libc::socklen_t;
    let res = unsafe {
        libc::getsockopt(
            fd,
            libc::SOL_SOCKET,
            libc::SO_ERROR,
            &mut errno as *mut libc::c_int as *mut libc::c_void,
            &mut len,
        )
    };
    if res == -1 {
        return io::Error::last_os_error();
    }
    if errno == 0 {
        io::Error::new(io::ErrorKind::Other, "socket reported an error readiness with no pending SO_ERROR")
    } else {
        io::Error::from_raw_os_error(errno)
    }
}
