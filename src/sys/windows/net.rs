use std::io;
use std::net::{SocketAddr, SocketAddrV4};

pub const INVALID_FD: i32 = -1;

pub fn new_tcp_listener(addr: SocketAddrV4) -> io::Result<(std::net::TcpListener, std::os::windows::io::RawSocket)> {
    use std::os::windows::io::AsRawSocket;
    let listener = std::net::TcpListener::bind(SocketAddr::V4(addr))?;
    listener.set_nonblocking(true)?;
    let raw = listener.as_raw_socket();
    Ok((listener, raw))
}

pub fn new_tcp_connect(addr: SocketAddrV4) -> io::Result<(std::net::TcpStream, std::os::windows::io::RawSocket)> {
    use std::os::windows::io::AsRawSocket;
    let stream = std::net::TcpStream::connect(SocketAddr::V4(addr))?;
    stream.set_nonblocking(true)?;
    let raw = stream.as_raw_socket();
    Ok((stream, raw))
}

pub fn accept_nonblocking(listener: &std::net::TcpListener) -> io::Result<Option<(std::net::TcpStream, SocketAddr)>> {
    match listener.accept() {
        Ok((stream, peer)) => {
            stream.set_nonblocking(true)?;
            Ok(Some((stream, peer)))
        }
        Err(err) if err.kind() == io::ErrorKind::WouldBlock => Ok(None),
        Err(err) => Err(err),
    }
}

pub fn new_udp_bound(addr: SocketAddrV4) -> io::Result<(std::net::UdpSocket, std::os::windows::io::RawSocket)> {
    use std::os::windows::io::AsRawSocket;
    let socket = std::net::UdpSocket::bind(SocketAddr::V4(addr))?;
    socket.set_nonblocking(true)?;
    let raw = socket.as_raw_socket();
    Ok((socket, raw))
}

pub fn set_broadcast(socket: &std::net::UdpSocket, on: bool) -> io::Result<()> {
    socket.set_broadcast(on)
}

pub fn probe_udp_port(port: u16) -> bool {
    std::net::UdpSocket::bind(("127.0.0.1", port)).is_ok()
}

/// Read and clear the pending error on a socket via
/// `getsockopt(SO_ERROR)`, for use after the reactor observes an
/// error-readiness event on it. Falls back to a generic error only if the
/// `getsockopt` call itself fails or reports no pending error, which
/// shouldn't happen for a genuinely errored socket.
pub fn take_socket_error(socket: std::os::windows::io::RawSocket) -> io::Error {
    use windows_sys::Win32::Networking::WinSock;

    let mut errno: i32 = 0;
    let mut len = std::mem::size_of::<i32>() as i32;
    let res = unsafe {
        WinSock::getsockopt(
            socket as usize,
            WinSock::SOL_SOCKET,
            WinSock::SO_ERROR,
            &mut errno as *mut i32 as *mut u8,
            &mut len,
        )
    };
    if res == WinSock::SOCKET_ERROR {
        return io::Error::last_os_error();
    }
    if errno == 0 {
        io::Error::new(io::ErrorKind::Other, "socket reported an error readiness with no pending SO_ERROR")
    } else {
        io::Error::from_raw_os_error(errno)
    }
}
