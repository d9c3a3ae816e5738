use std::io;
use std::net::TcpStream;

/// Non-blocking byte stream already connected to the proxy server.
///
/// All three operations follow non-blocking socket semantics:
/// `ErrorKind::WouldBlock` means no progress is possible right now, and
/// `Ok(0)` from `read` means the peer closed the stream. `peek` must not
/// consume bytes.
pub trait Transport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    fn peek(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;
}

impl Transport for TcpStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        io::Read::read(self, buf)
    }

    fn peek(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        TcpStream::peek(self, buf)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::Write::write(self, buf)
    }
}
