use std::io;
use std::os::unix::io::RawFd;
use std::time::Duration;

use crate::event::{Event, Events};
use crate::interest::Interest;
use crate::token::Token;

use super::syscall;

/// `epoll`-backed readiness selector.
///
/// This is the Linux-family half of the reactor's `sys::Selector`
/// abstraction, following the teacher's own `sys/unix/selector/epoll.rs`
/// split: a thin wrapper around the raw `epoll_create1`/`epoll_ctl`/
/// `epoll_wait` triad with no additional bookkeeping beyond the epoll fd
/// itself. Registry state (fd -> handler) lives one layer up, in
/// [`crate::reactor::Reactor`].
pub struct Selector {
    epoll_fd: RawFd,
}

impl Selector {
    pub fn new() -> io::Result<Selector> {
        let epoll_fd = syscall!(epoll_create1(libc::EPOLL_CLOEXEC))?;
        Ok(Selector { epoll_fd })
    }

    pub fn register(&self, fd: RawFd, token: Token, interests: Interest) -> io::Result<()> {
        let mut event = interests_to_epoll_event(token, interests);
        syscall!(epoll_ctl(self.epoll_fd, libc::EPOLL_CTL_ADD, fd, &mut event))?;
        Ok(())
    }

    pub fn reregister(&self, fd: RawFd, token: Token, interests: Interest) -> io::Result<()> {
        let mut event = interests_to_epoll_event(token, interests);
        syscall!(epoll_ctl(self.epoll_fd, libc::EPOLL_CTL_MOD, fd, &mut event))?;
        Ok(())
    }

    pub fn deregister(&self, fd: RawFd) -> io::Result<()> {
        // The `event` argument is ignored for `EPOLL_CTL_DEL` on Linux but
        // kernels before 2.6.9 required a non-null pointer; pass a zeroed
        // one for portability, matching the teacher's own defensive style.
        let mut event: libc::epoll_event = unsafe { std::mem::zeroed() };
        match syscall!(epoll_ctl(self.epoll_fd, libc::EPOLL_CTL_DEL, fd, &mut event)) {
            Ok(_) => Ok(()),
            // Removing an unknown fd is a no-op success per the reactor contract.
            Err(err) if err.raw_os_error() == Some(libc::ENOENT) => Ok(()),
            Err(err) => Err(err),
        }
    }

    pub fn select(&self, events: &mut Events, timeout: Option<Duration>) -> io::Result<()> {
        events.clear();
        let timeout_ms = match timeout {
            Some(d) => d.as_millis().min(i32::MAX as u128) as libc::c_int,
            None => -1,
        };
        let mut raw = [unsafe { std::mem::zeroed::<libc::epoll_event>() }; 1024];
        let n = syscall!(epoll_wait(self.epoll_fd, raw.as_mut_ptr(), raw.len() as libc::c_int, timeout_ms))?;
        for raw_event in &raw[..n as usize] {
            events.push(epoll_event_to_event(raw_event));
        }
        Ok(())
    }
}

impl Drop for Selector {
    fn drop(&mut self) {
        unsafe { libc::close(self.epoll_fd) };
    }
}

fn interests_to_epoll_event(token: Token, interests: Interest) -> libc::epoll_event {
    let mut bits = libc::EPOLLERR | libc::EPOLLHUP;
    if interests.is_readable() {
        bits |= libc::EPOLLIN;
    }
    if interests.is_writable() {
        bits |= libc::EPOLLOUT;
    }
    libc::epoll_event {
        events: bits as u32,
        u64: usize::from(token) as u64,
    }
}

fn epoll_event_to_event(raw: &libc::epoll_event) -> Event {
    let bits = raw.events as i32;
    Event {
        token: Token(raw.u64 as usize),
        readable: bits & libc::EPOLLIN != 0,
        writable: bits & libc::EPOLLOUT != 0,
        error: bits & libc::EPOLLERR != 0,
        closed: bits & (libc::EPOLLHUP | libc::EPOLLRDHUP) != 0,
    }
}
