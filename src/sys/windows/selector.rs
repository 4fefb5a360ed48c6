use std::io;
use std::os::windows::io::RawSocket;
use std::sync::Mutex;
use std::time::Duration;

use windows_sys::Win32::Networking::WinSock;

use crate::event::{Event, Events};
use crate::interest::Interest;
use crate::token::Token;

struct Registration {
    socket: RawSocket,
    token: Token,
    interests: Interest,
}

/// `WSAPoll`-backed readiness selector.
pub struct Selector {
    registrations: Mutex<Vec<Registration>>,
}

impl Selector {
    pub fn new() -> io::Result<Selector> {
        Ok(Selector {
            registrations: Mutex::new(Vec::new()),
        })
    }

    pub fn register(&self, socket: RawSocket, token: Token, interests: Interest) -> io::Result<()> {
        let mut regs = self.registrations.lock().unwrap();
        if regs.iter().any(|r| r.socket == socket) {
            return Err(io::Error::new(io::ErrorKind::AlreadyExists, "socket already registered"));
        }
        regs.push(Registration { socket, token, interests });
        Ok(())
    }

    pub fn reregister(&self, socket: RawSocket, token: Token, interests: Interest) -> io::Result<()> {
        let mut regs = self.registrations.lock().unwrap();
        match regs.iter_mut().find(|r| r.socket == socket) {
            Some(r) => {
                r.token = token;
                r.interests = interests;
                Ok(())
            }
            None => Err(io::Error::new(io::ErrorKind::NotFound, "socket not registered")),
        }
    }

    pub fn deregister(&self, socket: RawSocket) -> io::Result<()> {
        let mut regs = self.registrations.lock().unwrap();
        regs.retain(|r| r.socket != socket);
        Ok(())
    }

    pub fn select(&self, events: &mut Events, timeout: Option<Duration>) -> io::Result<()> {
        events.clear();
        let regs = self.registrations.lock().unwrap();
        if regs.is_empty() {
            std::thread::sleep(timeout.unwrap_or(Duration::from_millis(10)));
            return Ok(());
        }
        let mut fds: Vec<WinSock::WSAPOLLFD> = regs
            .iter()
            .map(|r| {
                let mut req_events = 0i16;
                if r.interests.is_readable() {
                    req_events |= WinSock::POLLRDNORM as i16;
                }
                if r.interests.is_writable() {
                    req_events |= WinSock::POLLWRNORM as i16;
                }
                WinSock::WSAPOLLFD {
                    fd: r.socket as usize,
                    events: req_events,
                    revents: 0,
                }
            })
            .collect();
        let timeout_ms = timeout.map(|d| d.as_millis().min(i32::MAX as u128) as i32).unwrap_or(-1);
        let ret = unsafe { WinSock::WSAPoll(fds.as_mut_ptr(), fds.len() as u32, timeout_ms) };
        if ret == WinSock::SOCKET_ERROR {
            return Err(io::Error::last_os_error());
        }
        for (reg, polled) in regs.iter().zip(fds.iter()) {
            if polled.revents == 0 {
                continue;
            }
            events.push(Event {
                token: reg.token,
                readable: polled.revents & WinSock::POLLRDNORM as i16 != 0,
                writable: polled.revents & WinSock::POLLWRNORM as i16 != 0,
                error: polled.revents & WinSock::POLLERR as i16 != 0,
                closed: polled.revents & (WinSock::POLLHUP as i16 | WinSock::POLLNVAL as i16) != 0,
            });
        }
        Ok(())
    }
}
