//! Idle-port discovery helpers. Out-of-core per §1 ("platform idle-port
//! discovery utilities" are listed as external collaborators), but small
//! enough, and needed often enough by endpoint setup code and tests, that
//! the ambient expansion carries them as free functions here rather than
//! inventing a separate crate.

use crate::config::{IDLE_PORT_BASE, IDLE_PORT_MAX};
use crate::sys::net::probe_udp_port;

/// Find a single free UDP port starting from [`IDLE_PORT_BASE`], probing by
/// transient bind.
pub fn find_idle_udp_port() -> Option<u16> {
    (IDLE_PORT_BASE..=IDLE_PORT_MAX).find(|&port| probe_udp_port(port))
}

/// Find a pair of consecutive free UDP ports starting from
/// [`IDLE_PORT_BASE`].
pub fn find_idle_udp_port_pair() -> Option<(u16, u16)> {
    let mut port = IDLE_PORT_BASE;
    while port < IDLE_PORT_MAX {
        if probe_udp_port(port) && probe_udp_port(port + 1) {
            return Some((port, port + 1));
        }
        port += 1;
    }
    None
}
