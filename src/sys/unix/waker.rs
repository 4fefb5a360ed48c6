use std::io;
use std::os::unix::io::RawFd;

use crate::interest::Interest;
use crate::token::Token;

use super::selector::Selector;
use super::syscall;

/// Interrupts a blocking `epoll_wait` via an `eventfd`, exactly as the
/// teacher's `sys/unix/waker/eventfd.rs` backend does.
pub struct Waker {
    fd: RawFd,
}

impl Waker {
    pub fn new(selector: &Selector, token: Token) -> io::Result<Waker> {
        let fd = syscall!(eventfd(0, libc::EFD_NONBLOCK | libc::EFD_CLOEXEC))?;
        selector.register(fd, token, Interest::READABLE)?;
        Ok(Waker { fd })
    }

    /// Wake the thread blocked on the associated selector's `select`.
    pub fn wake(&self) -> io::Result<()> {
        let buf: u64 = 1;
        match syscall!(write(self.fd, &buf as *const u64 as *const libc::c_void, 8)) {
            Ok(_) => Ok(()),
            // The eventfd counter saturates; a pending wake is as good as a
            // fresh one, so EAGAIN here is not an error.
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => Ok(()),
            Err(err) => Err(err),
        }
    }

    /// Drain the eventfd counter after a wake has been observed.
    pub fn ack(&self) {
        let mut buf: u64 = 0;
        loop {
            let res = unsafe { libc::read(self.fd, &mut buf as *mut u64 as *mut libc::c_void, 8) };
            if res == -1 {
                break;
            }
        }
    }

    pub fn raw_fd(&self) -> RawFd {
        self.fd
    }
}

impl Drop for Waker {
    fn drop(&mut self) {
        unsafe { libc::close(self.fd) };
    }
}
