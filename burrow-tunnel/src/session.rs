use std::fmt;
use std::io;
use std::net::{Ipv4Addr, SocketAddr, ToSocketAddrs};
use std::str::FromStr;

use log::debug;
use tokio::sync::mpsc;

use burrow_net::{
    build_connect_request, build_method_request, build_socks4_connect, build_socks5_connect,
    build_userpass_request, classify_host, connect_reply_tail_len, find_header_terminator,
    is_success_status, parse_connect_reply, parse_method_reply, parse_socks4_reply,
    parse_userpass_reply, status_line, SocksAddress, SocksAuth, SocksError, METHOD_NO_AUTH,
    METHOD_USER_PASS, REPLY_BUFFER_LEN,
};

use crate::buffer::ByteBuffer;
use crate::error::TunnelError;
use crate::events::{
    event_channel, log_channel, EventKind, LogLevel, LogRecord, SessionEvents, SessionLogs,
    SocketEvent,
};
use crate::transport::Transport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyType {
    Http,
    Socks4,
    Socks5,
}

impl ProxyType {
    pub fn name(&self) -> &'static str {
        match self {
            ProxyType::Http => "HTTP",
            ProxyType::Socks4 => "SOCKS4",
            ProxyType::Socks5 => "SOCKS5",
        }
    }
}

impl fmt::Display for ProxyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProxyType {
    type Err = TunnelError;

    fn from_str(value: &str) -> Result<Self, TunnelError> {
        match value.to_ascii_lowercase().as_str() {
            "http" => Ok(ProxyType::Http),
            "socks4" => Ok(ProxyType::Socks4),
            "socks5" => Ok(ProxyType::Socks5),
            _ => Err(TunnelError::ProtocolUnsupported),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyState {
    NoConn,
    Handshake,
    Connected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HandshakeState {
    HttpWait,
    Socks4Wait,
    Socks5Method,
    Socks5Auth,
    Socks5Request,
    Socks5RequestAddrType,
    Socks5RequestAddress,
}

/// Client-side proxy handshake driver.
///
/// Owns a non-blocking transport already connected to the proxy and runs
/// the CONNECT / SOCKS4 / SOCKS5 exchange over it. Readiness is fed in
/// through [`Session::on_ready`]; the outcome arrives on the event channel
/// as `Connection` (no error) or `Close` (with one), after which the
/// transport carries the tunneled stream and can be reclaimed with
/// [`Session::detach`].
pub struct Session<T> {
    transport: Option<T>,
    events: mpsc::UnboundedSender<SocketEvent>,
    logs: mpsc::UnboundedSender<LogRecord>,
    proxy_type: ProxyType,
    host: String,
    port: u16,
    user: String,
    pass: String,
    proxy_state: ProxyState,
    handshake_state: HandshakeState,
    send_buffer: ByteBuffer,
    recv_buffer: ByteBuffer,
    recv_need: usize,
    can_read: bool,
    can_write: bool,
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T) -> (Self, SessionEvents, SessionLogs) {
        let (events, event_stream) = event_channel();
        let (logs, log_stream) = log_channel();
        let session = Self {
            transport: Some(transport),
            events,
            logs,
            proxy_type: ProxyType::Http,
            host: String::new(),
            port: 0,
            user: String::new(),
            pass: String::new(),
            proxy_state: ProxyState::NoConn,
            handshake_state: HandshakeState::HttpWait,
            send_buffer: ByteBuffer::new(),
            recv_buffer: ByteBuffer::new(),
            recv_need: 0,
            can_read: false,
            can_write: false,
        };
        (session, event_stream, log_stream)
    }

    /// Validate the target and queue the opening frame of the selected
    /// protocol. `Ok(())` means the handshake is in progress; its outcome
    /// is delivered through the event channel.
    pub fn begin_handshake(
        &mut self,
        proxy_type: ProxyType,
        host: &str,
        port: u16,
        user: &str,
        pass: &str,
    ) -> Result<(), TunnelError> {
        if host.is_empty() || port == 0 {
            return Err(TunnelError::InvalidArgument(
                "target host and port are required",
            ));
        }
        if self.proxy_state != ProxyState::NoConn {
            return Err(TunnelError::AlreadyInProgress);
        }

        match proxy_type {
            ProxyType::Http => {
                let request = build_connect_request(host, port, user, pass);
                self.send_buffer.append(&request);
                self.handshake_state = HandshakeState::HttpWait;
                self.recv_need = 0;
            }
            ProxyType::Socks4 => {
                let ip = match classify_host(host) {
                    SocksAddress::IpV6(_) => {
                        self.log(
                            LogLevel::Error,
                            "IPv6 addresses are not supported with SOCKS4 proxy",
                        );
                        return Err(TunnelError::InvalidArgument(
                            "IPv6 target with SOCKS4 proxy",
                        ));
                    }
                    SocksAddress::IpV4(octets) => Ipv4Addr::from(octets),
                    SocksAddress::Domain(_) => match resolve_ipv4(host) {
                        Some(ip) => ip,
                        None => {
                            self.log(
                                LogLevel::Error,
                                "Cannot resolve hostname to IPv4 address for use with SOCKS4 proxy.",
                            );
                            return Err(TunnelError::InvalidArgument(
                                "target does not resolve to an IPv4 address",
                            ));
                        }
                    },
                };
                self.log(
                    LogLevel::Status,
                    format!("SOCKS4 proxy will connect to: {ip}"),
                );
                self.send_buffer
                    .append(&build_socks4_connect(ip.octets(), port));
                self.handshake_state = HandshakeState::Socks4Wait;
                self.recv_need = 8;
            }
            ProxyType::Socks5 => {
                if user.len() > 255 || pass.len() > 255 {
                    self.log(
                        LogLevel::Status,
                        "SOCKS5 does not support usernames or passwords longer than 255 characters.",
                    );
                    return Err(TunnelError::InvalidArgument(
                        "SOCKS5 credentials longer than 255 bytes",
                    ));
                }
                let auth = if user.is_empty() {
                    SocksAuth::NoAuth
                } else {
                    SocksAuth::UserPass {
                        username: user.to_string(),
                        password: pass.to_string(),
                    }
                };
                self.send_buffer.append(&build_method_request(&auth));
                self.handshake_state = HandshakeState::Socks5Method;
                self.recv_need = 2;
            }
        }

        self.proxy_type = proxy_type;
        self.host = host.to_string();
        self.port = port;
        self.user = user.to_string();
        self.pass = pass.to_string();
        self.recv_buffer.clear();
        self.proxy_state = ProxyState::Handshake;

        debug!(
            target: "burrow-tunnel",
            "started {proxy_type} handshake for {host}:{port}"
        );

        if self.can_write {
            self.drive_write();
        }

        Ok(())
    }

    /// Single entry point for transport readiness and connection events.
    pub fn on_ready(&mut self, kind: EventKind, error: Option<io::Error>) {
        match kind {
            EventKind::ConnectionNext => {
                if let Some(error) = error {
                    self.log(
                        LogLevel::Status,
                        format!("Connection attempt failed with \"{error}\", trying next address."),
                    );
                }
            }
            EventKind::Connection => match error {
                Some(error) => {
                    if self.proxy_state == ProxyState::Handshake {
                        self.proxy_state = ProxyState::NoConn;
                    }
                    self.emit(EventKind::Connection, Some(TunnelError::Io(error)));
                }
                None => self.log(
                    LogLevel::Status,
                    "Connection with proxy established, performing handshake...",
                ),
            },
            EventKind::Read => self.on_readable(),
            EventKind::Write => self.on_writable(),
            // peer shutdown surfaces as an EOF read
            EventKind::Close => self.on_readable(),
        }
    }

    pub fn on_readable(&mut self) {
        self.can_read = true;
        if self.proxy_state == ProxyState::Connected {
            self.emit(EventKind::Read, None);
            return;
        }
        if self.proxy_state != ProxyState::Handshake {
            return;
        }
        match self.handshake_state {
            HandshakeState::HttpWait => self.read_http_reply(),
            _ => self.read_socks_reply(),
        }
    }

    pub fn on_writable(&mut self) {
        self.can_write = true;
        if self.proxy_state == ProxyState::Connected {
            self.emit(EventKind::Write, None);
            return;
        }
        if self.proxy_state != ProxyState::Handshake || self.send_buffer.is_empty() {
            return;
        }
        self.drive_write();
    }

    /// Take back the transport; the driver never touches it again.
    pub fn detach(&mut self) -> Option<T> {
        self.transport.take()
    }

    pub fn proxy_state(&self) -> ProxyState {
        self.proxy_state
    }

    pub fn proxy_type(&self) -> ProxyType {
        self.proxy_type
    }

    pub fn target_host(&self) -> &str {
        &self.host
    }

    pub fn target_port(&self) -> u16 {
        self.port
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn pass(&self) -> &str {
        &self.pass
    }

    pub fn has_pending_output(&self) -> bool {
        !self.send_buffer.is_empty()
    }

    pub fn transport(&self) -> Option<&T> {
        self.transport.as_ref()
    }

    pub fn transport_mut(&mut self) -> Option<&mut T> {
        self.transport.as_mut()
    }

    fn in_socks5_sequence(&self) -> bool {
        matches!(
            self.handshake_state,
            HandshakeState::Socks5Method
                | HandshakeState::Socks5Auth
                | HandshakeState::Socks5Request
                | HandshakeState::Socks5RequestAddrType
                | HandshakeState::Socks5RequestAddress
        )
    }

    fn read_socks_reply(&mut self) {
        // SOCKS5 replies are never read while our own frame is in flight
        if self.in_socks5_sequence() && !self.send_buffer.is_empty() {
            return;
        }
        while self.recv_need > 0 && self.can_read && self.proxy_state == ProxyState::Handshake {
            let result = match self.read_frame() {
                Some(result) => result,
                None => return,
            };
            match result {
                Err(error) if error.kind() == io::ErrorKind::WouldBlock => {
                    self.can_read = false;
                    return;
                }
                Err(error) => {
                    self.fail(TunnelError::Io(error));
                    return;
                }
                Ok(0) => {
                    self.fail(TunnelError::ClosedByPeer);
                    return;
                }
                Ok(count) => {
                    self.recv_buffer.advance(count);
                    self.recv_need -= count;
                }
            }
            if self.recv_need > 0 {
                continue;
            }
            match self.handshake_state {
                HandshakeState::Socks4Wait => self.finish_socks4(),
                _ => self.advance_socks5(),
            }
        }
    }

    fn read_frame(&mut self) -> Option<io::Result<usize>> {
        let need = self.recv_need;
        let Session {
            transport,
            recv_buffer,
            ..
        } = self;
        let transport = transport.as_mut()?;
        Some(transport.read(recv_buffer.reserve(need)))
    }

    fn finish_socks4(&mut self) {
        let status = match parse_socks4_reply(self.recv_buffer.data()) {
            Ok(status) => status,
            Err(error) => {
                self.reject_socks(error);
                return;
            }
        };
        self.recv_buffer.clear();
        if !status.is_success() {
            self.log(LogLevel::Error, format!("Proxy request failed: {status}"));
            self.fail(TunnelError::Rejected(status.to_string()));
            return;
        }
        self.complete();
    }

    fn advance_socks5(&mut self) {
        let frame = self.recv_buffer.data().to_vec();
        self.recv_buffer.clear();
        match self.handshake_state {
            HandshakeState::Socks5Method => match parse_method_reply(&frame) {
                Ok(METHOD_NO_AUTH) => {
                    self.handshake_state = HandshakeState::Socks5Request;
                    self.queue_connect_request();
                }
                Ok(METHOD_USER_PASS) => {
                    self.handshake_state = HandshakeState::Socks5Auth;
                    self.queue_userpass_request();
                }
                Ok(_) => {
                    self.log(LogLevel::Error, "No supported SOCKS5 auth method");
                    self.fail(TunnelError::Rejected(
                        "no supported SOCKS5 auth method".to_string(),
                    ));
                    return;
                }
                Err(error) => {
                    self.reject_socks(error);
                    return;
                }
            },
            HandshakeState::Socks5Auth => match parse_userpass_reply(&frame) {
                Ok(()) => {
                    self.handshake_state = HandshakeState::Socks5Request;
                    self.queue_connect_request();
                }
                Err(error) => {
                    self.reject_socks(error);
                    return;
                }
            },
            HandshakeState::Socks5Request => match parse_connect_reply(&frame) {
                Ok(()) => {
                    self.handshake_state = HandshakeState::Socks5RequestAddrType;
                    self.recv_need = 2;
                }
                Err(error) => {
                    self.reject_socks(error);
                    return;
                }
            },
            HandshakeState::Socks5RequestAddrType => {
                match connect_reply_tail_len(frame[0], frame[1]) {
                    Ok(tail) => {
                        self.handshake_state = HandshakeState::Socks5RequestAddress;
                        self.recv_need = tail;
                    }
                    Err(error) => {
                        self.reject_socks(error);
                        return;
                    }
                }
            }
            HandshakeState::Socks5RequestAddress => {
                // the bound address many proxies report is bogus; it has
                // been drained and is not used
                self.complete();
                return;
            }
            HandshakeState::HttpWait | HandshakeState::Socks4Wait => {
                unreachable!("SOCKS5 codec invoked outside the SOCKS5 sequence")
            }
        }
        if !self.send_buffer.is_empty() && self.can_write {
            self.drive_write();
        }
    }

    fn queue_connect_request(&mut self) {
        let address = classify_host(&self.host);
        let frame = build_socks5_connect(&address, self.port);
        self.send_buffer.append(&frame);
        self.recv_need = 3;
        debug!(
            target: "burrow-tunnel",
            "sending SOCKS5 CONNECT for {}:{}", self.host, self.port
        );
    }

    fn queue_userpass_request(&mut self) {
        let frame = build_userpass_request(&self.user, &self.pass);
        self.send_buffer.append(&frame);
        self.recv_need = 2;
    }

    fn reject_socks(&mut self, error: SocksError) {
        let message = error.to_string();
        self.log(LogLevel::Error, message.clone());
        self.fail(TunnelError::Rejected(message));
    }

    fn read_http_reply(&mut self) {
        loop {
            let mut do_read = REPLY_BUFFER_LEN - self.recv_buffer.len() - 1;
            let mut headers_end = None;
            for peeking in [true, false] {
                let result = match self.http_io(peeking, do_read) {
                    Some(result) => result,
                    None => return,
                };
                let count = match result {
                    Err(error) if error.kind() == io::ErrorKind::WouldBlock => {
                        self.can_read = false;
                        return;
                    }
                    Err(error) => {
                        self.fail(TunnelError::Io(error));
                        return;
                    }
                    Ok(0) => {
                        self.fail(TunnelError::ClosedByPeer);
                        return;
                    }
                    Ok(count) => count,
                };
                if !self.send_buffer.is_empty() {
                    self.log(LogLevel::DebugWarning, "Incoming data before request fully sent");
                    self.fail(TunnelError::Rejected(
                        "incoming data before request fully sent".to_string(),
                    ));
                    return;
                }
                if peeking {
                    match find_header_terminator(self.recv_buffer.preview(count)) {
                        None => {
                            if self.recv_buffer.len() + count + 1 == REPLY_BUFFER_LEN {
                                self.log(LogLevel::DebugWarning, "Incoming header too large");
                                self.fail(TunnelError::HeaderTooLarge);
                                return;
                            }
                            do_read = count;
                        }
                        Some(end) => {
                            // consume through the terminator and not one
                            // byte further; the tunnel payload stays in
                            // the socket
                            headers_end = Some(end);
                            do_read = end + 4 - self.recv_buffer.len();
                        }
                    }
                } else {
                    if count != do_read {
                        self.log(LogLevel::DebugWarning, "Could not read what got peeked");
                        self.fail(TunnelError::Rejected(
                            "could not read what got peeked".to_string(),
                        ));
                        return;
                    }
                    self.recv_buffer.advance(count);
                }
            }

            if headers_end.is_none() {
                continue;
            }

            let reply =
                String::from_utf8_lossy(status_line(self.recv_buffer.data())).into_owned();
            self.log(LogLevel::Response, format!("Proxy reply: {reply}"));
            if !is_success_status(reply.as_bytes()) {
                self.fail(TunnelError::HttpStatus(reply));
                return;
            }
            self.complete();
            return;
        }
    }

    fn http_io(&mut self, peeking: bool, len: usize) -> Option<io::Result<usize>> {
        let Session {
            transport,
            recv_buffer,
            ..
        } = self;
        let transport = transport.as_mut()?;
        let buf = recv_buffer.reserve(len);
        Some(if peeking {
            transport.peek(buf)
        } else {
            transport.read(buf)
        })
    }

    fn drive_write(&mut self) {
        loop {
            let result = {
                let Session {
                    transport,
                    send_buffer,
                    ..
                } = self;
                let Some(transport) = transport.as_mut() else {
                    return;
                };
                transport.write(send_buffer.data())
            };
            match result {
                Err(error) if error.kind() == io::ErrorKind::WouldBlock => {
                    self.can_write = false;
                    return;
                }
                Err(error) => {
                    self.fail(TunnelError::Io(error));
                    return;
                }
                Ok(0) => {
                    self.fail(TunnelError::Io(io::ErrorKind::WriteZero.into()));
                    return;
                }
                Ok(count) => {
                    self.send_buffer.consume(count);
                    if self.send_buffer.is_empty() {
                        // protocol replies may already be buffered
                        if self.can_read {
                            self.on_readable();
                        }
                        return;
                    }
                }
            }
        }
    }

    fn complete(&mut self) {
        debug!(
            target: "burrow-tunnel",
            "{} handshake with {}:{} succeeded", self.proxy_type, self.host, self.port
        );
        self.proxy_state = ProxyState::Connected;
        self.recv_buffer.clear();
        self.recv_need = 0;
        self.emit(EventKind::Connection, None);
    }

    fn fail(&mut self, error: TunnelError) {
        debug!(target: "burrow-tunnel", "handshake failed: {error}");
        self.proxy_state = ProxyState::NoConn;
        self.send_buffer.clear();
        self.recv_buffer.clear();
        self.recv_need = 0;
        self.emit(EventKind::Close, Some(error));
    }

    fn emit(&self, kind: EventKind, error: Option<TunnelError>) {
        let _ = self.events.send(SocketEvent { kind, error });
    }

    fn log(&self, level: LogLevel, message: impl Into<String>) {
        let _ = self.logs.send(LogRecord {
            level,
            message: message.into(),
        });
    }
}

fn resolve_ipv4(host: &str) -> Option<Ipv4Addr> {
    let addrs = (host, 0).to_socket_addrs().ok()?;
    for addr in addrs {
        if let SocketAddr::V4(v4) = addr {
            return Some(*v4.ip());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::init;
    use assert_matches::assert_matches;

    struct NullTransport;

    impl Transport for NullTransport {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::ErrorKind::WouldBlock.into())
        }

        fn peek(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::ErrorKind::WouldBlock.into())
        }

        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::ErrorKind::WouldBlock.into())
        }
    }

    #[test]
    fn rejects_empty_host_and_zero_port() {
        init();

        let (mut session, _events, _logs) = Session::new(NullTransport);
        assert_matches!(
            session.begin_handshake(ProxyType::Http, "", 80, "", ""),
            Err(TunnelError::InvalidArgument(_))
        );
        assert_matches!(
            session.begin_handshake(ProxyType::Http, "example.com", 0, "", ""),
            Err(TunnelError::InvalidArgument(_))
        );
        assert_eq!(session.proxy_state(), ProxyState::NoConn);
        assert!(!session.has_pending_output());
    }

    #[test]
    fn rejects_second_handshake() {
        init();

        let (mut session, _events, _logs) = Session::new(NullTransport);
        session
            .begin_handshake(ProxyType::Http, "example.com", 80, "", "")
            .unwrap();
        assert_matches!(
            session.begin_handshake(ProxyType::Http, "example.com", 80, "", ""),
            Err(TunnelError::AlreadyInProgress)
        );
        assert_eq!(session.proxy_state(), ProxyState::Handshake);
    }

    #[test]
    fn rejects_ipv6_target_for_socks4() {
        init();

        let (mut session, _events, logs) = Session::new(NullTransport);
        assert_matches!(
            session.begin_handshake(ProxyType::Socks4, "::1", 80, "", ""),
            Err(TunnelError::InvalidArgument(_))
        );
        assert_eq!(session.proxy_state(), ProxyState::NoConn);
        assert!(!session.has_pending_output());

        let record = logs.into_inner().try_recv().unwrap();
        assert_eq!(record.level, LogLevel::Error);
        assert!(record.message.contains("IPv6"));
    }

    #[test]
    fn rejects_oversized_socks5_credentials() {
        init();

        let (mut session, _events, _logs) = Session::new(NullTransport);
        let long = "x".repeat(256);
        assert_matches!(
            session.begin_handshake(ProxyType::Socks5, "example.com", 80, &long, ""),
            Err(TunnelError::InvalidArgument(_))
        );
        assert_matches!(
            session.begin_handshake(ProxyType::Socks5, "example.com", 80, "u", &long),
            Err(TunnelError::InvalidArgument(_))
        );
        assert_eq!(session.proxy_state(), ProxyState::NoConn);
    }

    #[test]
    fn queues_initial_frame_per_protocol() {
        init();

        let (mut session, _events, _logs) = Session::new(NullTransport);
        session
            .begin_handshake(ProxyType::Http, "example.com", 443, "", "")
            .unwrap();
        assert_eq!(session.proxy_state(), ProxyState::Handshake);
        assert!(session.has_pending_output());

        let (mut session, _events, _logs) = Session::new(NullTransport);
        session
            .begin_handshake(ProxyType::Socks4, "1.2.3.4", 80, "", "")
            .unwrap();
        assert!(session.has_pending_output());

        let (mut session, _events, _logs) = Session::new(NullTransport);
        session
            .begin_handshake(ProxyType::Socks5, "example.com", 80, "u", "p")
            .unwrap();
        assert!(session.has_pending_output());
    }

    #[test]
    fn parses_proxy_type_names() {
        assert_eq!("http".parse::<ProxyType>().unwrap(), ProxyType::Http);
        assert_eq!("SOCKS4".parse::<ProxyType>().unwrap(), ProxyType::Socks4);
        assert_eq!("Socks5".parse::<ProxyType>().unwrap(), ProxyType::Socks5);
        assert_matches!(
            "socks6".parse::<ProxyType>(),
            Err(TunnelError::ProtocolUnsupported)
        );
        assert_eq!(ProxyType::Socks5.name(), "SOCKS5");
    }

    #[test]
    fn detach_returns_the_transport() {
        init();

        let (mut session, _events, _logs) = Session::new(NullTransport);
        assert!(session.detach().is_some());
        assert!(session.detach().is_none());
        assert!(session.transport().is_none());
    }
}
