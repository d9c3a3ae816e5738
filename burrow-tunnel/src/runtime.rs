use std::io;

use tokio::io::Interest;
use tokio::net::TcpStream;

use crate::events::EventKind;
use crate::session::{ProxyState, Session};
use crate::transport::Transport;

/// Transport adapter over a tokio `TcpStream`.
///
/// tokio sockets have no non-blocking peek, so peeked bytes are pulled
/// into a stash and replayed by `read` before any further socket reads.
/// Bytes left in the stash after the handshake belong to the tunneled
/// stream; reclaim them with [`TokioTransport::into_parts`].
pub struct TokioTransport {
    stream: TcpStream,
    stash: Vec<u8>,
    eof: bool,
}

impl TokioTransport {
    pub fn new(stream: TcpStream) -> Self {
        Self {
            stream,
            stash: Vec::new(),
            eof: false,
        }
    }

    pub fn stream(&self) -> &TcpStream {
        &self.stream
    }

    pub fn into_parts(self) -> (TcpStream, Vec<u8>) {
        (self.stream, self.stash)
    }

    fn fill_stash(&mut self, want: usize) -> io::Result<()> {
        while !self.eof && self.stash.len() < want {
            let mut chunk = [0u8; 4096];
            match self.stream.try_read(&mut chunk) {
                Ok(0) => self.eof = true,
                Ok(count) => self.stash.extend_from_slice(&chunk[..count]),
                Err(error) if error.kind() == io::ErrorKind::WouldBlock => break,
                Err(error) => return Err(error),
            }
        }
        Ok(())
    }
}

impl Transport for TokioTransport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if !self.stash.is_empty() {
            let count = buf.len().min(self.stash.len());
            buf[..count].copy_from_slice(&self.stash[..count]);
            self.stash.drain(..count);
            return Ok(count);
        }
        if self.eof {
            return Ok(0);
        }
        self.stream.try_read(buf)
    }

    fn peek(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.fill_stash(buf.len())?;
        if self.stash.is_empty() {
            if self.eof {
                return Ok(0);
            }
            return Err(io::ErrorKind::WouldBlock.into());
        }
        let count = buf.len().min(self.stash.len());
        buf[..count].copy_from_slice(&self.stash[..count]);
        Ok(count)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.try_write(buf)
    }
}

/// Await socket readiness and feed it to the session until the handshake
/// reaches a terminal state. The outcome arrives on the session's event
/// channel.
pub async fn drive_handshake(session: &mut Session<TokioTransport>) -> io::Result<()> {
    while session.proxy_state() == ProxyState::Handshake {
        let mut interest = Interest::READABLE;
        if session.has_pending_output() {
            interest = interest | Interest::WRITABLE;
        }
        let ready = match session.transport() {
            Some(transport) => transport.stream().ready(interest).await?,
            None => break,
        };
        if ready.is_writable() {
            session.on_ready(EventKind::Write, None);
        }
        if ready.is_readable() || ready.is_read_closed() {
            session.on_ready(EventKind::Read, None);
        }
    }
    Ok(())
}
