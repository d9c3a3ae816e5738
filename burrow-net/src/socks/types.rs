use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocksAddress {
    IpV4([u8; 4]),
    IpV6([u8; 16]),
    Domain(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Socks4Status {
    Granted,
    Rejected,
    NoIdentd,
    IdentdMismatch,
    Other(u8),
}

impl Socks4Status {
    pub fn from_code(code: u8) -> Self {
        match code {
            0x5a => Socks4Status::Granted,
            0x5b => Socks4Status::Rejected,
            0x5c => Socks4Status::NoIdentd,
            0x5d => Socks4Status::IdentdMismatch,
            other => Socks4Status::Other(other),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Socks4Status::Granted)
    }
}

impl fmt::Display for Socks4Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Socks4Status::Granted => write!(f, "Request granted"),
            Socks4Status::Rejected => write!(f, "Request rejected or failed"),
            Socks4Status::NoIdentd => write!(
                f,
                "Request failed - client is not running identd (or not reachable from server)"
            ),
            Socks4Status::IdentdMismatch => write!(
                f,
                "Request failed - client's identd could not confirm the user ID string"
            ),
            Socks4Status::Other(code) => write!(f, "Unassigned error code {code}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Socks5Status {
    Succeeded,
    GeneralFailure,
    ConnectionNotAllowed,
    NetworkUnreachable,
    HostUnreachable,
    ConnectionRefused,
    TtlExpired,
    CommandNotSupported,
    AddressTypeNotSupported,
    Other(u8),
}

impl Socks5Status {
    pub fn from_code(code: u8) -> Self {
        match code {
            0x00 => Socks5Status::Succeeded,
            0x01 => Socks5Status::GeneralFailure,
            0x02 => Socks5Status::ConnectionNotAllowed,
            0x03 => Socks5Status::NetworkUnreachable,
            0x04 => Socks5Status::HostUnreachable,
            0x05 => Socks5Status::ConnectionRefused,
            0x06 => Socks5Status::TtlExpired,
            0x07 => Socks5Status::CommandNotSupported,
            0x08 => Socks5Status::AddressTypeNotSupported,
            other => Socks5Status::Other(other),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Socks5Status::Succeeded)
    }
}

impl fmt::Display for Socks5Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Socks5Status::Succeeded => write!(f, "Succeeded"),
            Socks5Status::GeneralFailure => write!(f, "General SOCKS server failure"),
            Socks5Status::ConnectionNotAllowed => write!(f, "Connection not allowed by ruleset"),
            Socks5Status::NetworkUnreachable => write!(f, "Network unreachable"),
            Socks5Status::HostUnreachable => write!(f, "Host unreachable"),
            Socks5Status::ConnectionRefused => write!(f, "Connection refused"),
            Socks5Status::TtlExpired => write!(f, "TTL expired"),
            Socks5Status::CommandNotSupported => write!(f, "Command not supported"),
            Socks5Status::AddressTypeNotSupported => write!(f, "Address type not supported"),
            Socks5Status::Other(code) => write!(f, "Unassigned error code {code}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocksError {
    pub kind: SocksErrorKind,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocksErrorKind {
    UnexpectedEof,
    InvalidVersion(u8),
    InvalidAuthVersion(u8),
    AuthenticationFailed,
    Rejected(Socks5Status),
    UnknownAddressType(u8),
}

impl fmt::Display for SocksError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            SocksErrorKind::UnexpectedEof => write!(f, "Truncated SOCKS reply"),
            SocksErrorKind::InvalidVersion(version) => {
                write!(f, "Unknown SOCKS protocol version: {version}")
            }
            SocksErrorKind::InvalidAuthVersion(version) => write!(
                f,
                "Unknown protocol version of SOCKS Username/Password Authentication subnegotiation: {version}"
            ),
            SocksErrorKind::AuthenticationFailed => write!(f, "Proxy authentication failed"),
            SocksErrorKind::Rejected(status) => {
                write!(f, "Proxy request failed. Reply from proxy: {status}")
            }
            SocksErrorKind::UnknownAddressType(_) => {
                write!(f, "Proxy request failed: Unknown address type in CONNECT reply")
            }
        }
    }
}

impl std::error::Error for SocksError {}
