//! Peer/bound addressing shared across endpoint families.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

/// Platform-imposed cap on local (Unix-domain) socket path length. Linux's
/// `sockaddr_un` reserves 108 bytes for `sun_path`; we cap one byte short to
/// always leave room for the NUL terminator the OS appends.
pub const LOCAL_PATH_MAX: usize = 107;

/// A peer or bound address: either a network (host, port) pair or a
/// filesystem path for a local (Unix-domain) transport.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Address {
    Network { host: Ipv4Addr, port: u16 },
    Local { path: PathBuf },
}

impl Address {
    pub fn network(host: Ipv4Addr, port: u16) -> Address {
        Address::Network { host, port }
    }

    /// Parse a dotted-quad host string. An empty string or `"0.0.0.0"`
    /// means "all interfaces".
    pub fn from_host_port(host: &str, port: u16) -> Option<Address> {
        let host = if host.is_empty() { "0.0.0.0" } else { host };
        host.parse::<Ipv4Addr>().ok().map(|host| Address::Network { host, port })
    }

    pub fn local<P: AsRef<Path>>(path: P) -> Result<Address, LocalPathTooLong> {
        let path = path.as_ref().to_path_buf();
        if path.as_os_str().len() > LOCAL_PATH_MAX {
            return Err(LocalPathTooLong(path.as_os_str().len()));
        }
        Ok(Address::Local { path })
    }

    pub fn as_socket_addr(&self) -> Option<SocketAddr> {
        match self {
            Address::Network { host, port } => Some(SocketAddr::new(IpAddr::V4(*host), *port)),
            Address::Local { .. } => None,
        }
    }

    pub fn host(&self) -> Option<Ipv4Addr> {
        match self {
            Address::Network { host, .. } => Some(*host),
            Address::Local { .. } => None,
        }
    }

    pub fn port(&self) -> Option<u16> {
        match self {
            Address::Network { port, .. } => Some(*port),
            Address::Local { .. } => None,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            Address::Local { path } => Some(path),
            Address::Network { .. } => None,
        }
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Network { host, port } => write!(f, "{host}:{port}"),
            Address::Local { path } => write!(f, "{}", path.display()),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl From<SocketAddr> for Address {
    fn from(addr: SocketAddr) -> Address {
        match addr {
            SocketAddr::V4(v4) => Address::Network {
                host: *v4.ip(),
                port: v4.port(),
            },
            SocketAddr::V6(v6) => Address::Network {
                // This crate's network family is IPv4-only, per spec; map a
                // v6-mapped loopback down rather than panic.
                host: v6.ip().to_ipv4().unwrap_or(Ipv4Addr::UNSPECIFIED),
                port: v6.port(),
            },
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LocalPathTooLong(pub usize);

impl fmt::Display for LocalPathTooLong {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "local socket path of {} bytes exceeds the {} byte platform cap", self.0, LOCAL_PATH_MAX)
    }
}

impl std::error::Error for LocalPathTooLong {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_host_means_all_interfaces() {
        let addr = Address::from_host_port("", 8080).unwrap();
        assert_eq!(addr.host(), Some(Ipv4Addr::UNSPECIFIED));
    }

    #[test]
    fn zero_zero_zero_zero_means_all_interfaces() {
        let addr = Address::from_host_port("0.0.0.0", 8080).unwrap();
        assert_eq!(addr.host(), Some(Ipv4Addr::UNSPECIFIED));
    }

    #[test]
    fn parses_a_concrete_dotted_quad() {
        let addr = Address::from_host_port("127.0.0.1", 9000).unwrap();
        assert_eq!(addr.host(), Some(Ipv4Addr::LOCALHOST));
        assert_eq!(addr.port(), Some(9000));
        assert!(addr.path().is_none());
    }

    #[test]
    fn rejects_an_unparseable_host() {
        assert!(Address::from_host_port("not-an-ip", 1).is_none());
    }

    #[test]
    fn local_path_within_the_cap_is_accepted() {
        let path = "a".repeat(LOCAL_PATH_MAX);
        let addr = Address::local(&path).unwrap();
        assert_eq!(addr.path().unwrap(), Path::new(&path));
        assert!(addr.as_socket_addr().is_none());
    }

    #[test]
    fn local_path_over_the_cap_is_rejected() {
        let path = "a".repeat(LOCAL_PATH_MAX + 1);
        let err = Address::local(&path).unwrap_err();
        assert_eq!(err.0, LOCAL_PATH_MAX + 1);
    }
}
