use std::io::{self, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::os::windows::io::AsRawSocket;

use crate::interest::Interest;
use crate::token::Token;

use super::selector::Selector;

/// Interrupts a blocking `WSAPoll` via a connected loopback TCP pair, the
/// same technique the teacher's own pre-IOCP Windows backend used before
/// gaining a dedicated AFD-based waker.
pub struct Waker {
    writer: TcpStream,
    _reader: TcpStream,
}

impl Waker {
    pub fn new(selector: &Selector, token: Token) -> io::Result<Waker> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let addr = listener.local_addr()?;
        let writer = TcpStream::connect(addr)?;
        let (reader, _) = listener.accept()?;
        reader.set_nonblocking(true)?;
        writer.set_nonblocking(true)?;
        selector.register(reader.as_raw_socket(), token, Interest::READABLE)?;
        Ok(Waker {
            writer,
            _reader: reader,
        })
    }

    pub fn wake(&self) -> io::Result<()> {
        (&self.writer).write_all(&[1]).or_else(|err| {
            if err.kind() == io::ErrorKind::WouldBlock {
                Ok(())
            } else {
                Err(err)
            }
        })
    }

    pub fn ack(&self) {
        let mut buf = [0u8; 64];
        loop {
            match (&self._reader).read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(_) => continue,
            }
        }
    }
}
