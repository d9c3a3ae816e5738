use super::types::{Socks4Status, Socks5Status, SocksAddress, SocksError, SocksErrorKind};

pub const METHOD_NO_AUTH: u8 = 0x00;
pub const METHOD_USER_PASS: u8 = 0x02;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocksAuth {
    NoAuth,
    UserPass { username: String, password: String },
}

pub fn build_method_request(auth: &SocksAuth) -> Vec<u8> {
    let methods: &[u8] = match auth {
        SocksAuth::NoAuth => &[METHOD_NO_AUTH],
        SocksAuth::UserPass { .. } => &[METHOD_NO_AUTH, METHOD_USER_PASS],
    };
    let mut buf = Vec::with_capacity(2 + methods.len());
    buf.push(0x05);
    buf.push(methods.len() as u8);
    buf.extend_from_slice(methods);
    buf
}

pub fn parse_method_reply(bytes: &[u8]) -> Result<u8, SocksError> {
    if bytes.len() < 2 {
        return Err(SocksError {
            kind: SocksErrorKind::UnexpectedEof,
            offset: bytes.len(),
        });
    }
    if bytes[0] != 0x05 {
        return Err(SocksError {
            kind: SocksErrorKind::InvalidVersion(bytes[0]),
            offset: 0,
        });
    }
    Ok(bytes[1])
}

pub fn build_userpass_request(username: &str, password: &str) -> Vec<u8> {
    let user = &username.as_bytes()[..username.len().min(255)];
    let pass = &password.as_bytes()[..password.len().min(255)];
    let mut buf = Vec::with_capacity(3 + user.len() + pass.len());
    buf.push(0x01);
    buf.push(user.len() as u8);
    buf.extend_from_slice(user);
    buf.push(pass.len() as u8);
    buf.extend_from_slice(pass);
    buf
}

pub fn parse_userpass_reply(bytes: &[u8]) -> Result<(), SocksError> {
    if bytes.len() < 2 {
        return Err(SocksError {
            kind: SocksErrorKind::UnexpectedEof,
            offset: bytes.len(),
        });
    }
    if bytes[0] != 0x01 {
        return Err(SocksError {
            kind: SocksErrorKind::InvalidAuthVersion(bytes[0]),
            offset: 0,
        });
    }
    if bytes[1] != 0x00 {
        return Err(SocksError {
            kind: SocksErrorKind::AuthenticationFailed,
            offset: 1,
        });
    }
    Ok(())
}

pub fn build_socks4_connect(ip: [u8; 4], port: u16) -> Vec<u8> {
    let mut buf = Vec::with_capacity(9);
    buf.push(0x04);
    buf.push(0x01);
    buf.extend_from_slice(&port.to_be_bytes());
    buf.extend_from_slice(&ip);
    // empty USERID, NUL-terminated
    buf.push(0x00);
    buf
}

pub fn parse_socks4_reply(bytes: &[u8]) -> Result<Socks4Status, SocksError> {
    if bytes.len() < 8 {
        return Err(SocksError {
            kind: SocksErrorKind::UnexpectedEof,
            offset: bytes.len(),
        });
    }
    Ok(Socks4Status::from_code(bytes[1]))
}

pub fn build_socks5_connect(address: &SocksAddress, port: u16) -> Vec<u8> {
    let mut buf = Vec::with_capacity(262);
    buf.push(0x05);
    buf.push(0x01);
    buf.push(0x00);
    encode_address(&mut buf, address);
    buf.extend_from_slice(&port.to_be_bytes());
    buf
}

pub fn parse_connect_reply(bytes: &[u8]) -> Result<(), SocksError> {
    if bytes.len() < 3 {
        return Err(SocksError {
            kind: SocksErrorKind::UnexpectedEof,
            offset: bytes.len(),
        });
    }
    if bytes[0] != 0x05 {
        return Err(SocksError {
            kind: SocksErrorKind::InvalidVersion(bytes[0]),
            offset: 0,
        });
    }
    let status = Socks5Status::from_code(bytes[1]);
    if !status.is_success() {
        return Err(SocksError {
            kind: SocksErrorKind::Rejected(status),
            offset: 1,
        });
    }
    Ok(())
}

/// Bytes still to read once the address-type byte and the first payload
/// byte of a CONNECT reply are in hand. For a domain reply the first
/// payload byte is the length prefix.
pub fn connect_reply_tail_len(address_type: u8, first_payload: u8) -> Result<usize, SocksError> {
    match address_type {
        0x01 => Ok(5),
        0x03 => Ok(first_payload as usize + 2),
        0x04 => Ok(17),
        other => Err(SocksError {
            kind: SocksErrorKind::UnknownAddressType(other),
            offset: 0,
        }),
    }
}

fn encode_address(buf: &mut Vec<u8>, address: &SocksAddress) {
    match address {
        SocksAddress::IpV4(ip) => {
            buf.push(0x01);
            buf.extend_from_slice(ip);
        }
        SocksAddress::Domain(domain) => {
            let name = &domain.as_bytes()[..domain.len().min(255)];
            buf.push(0x03);
            buf.push(name.len() as u8);
            buf.extend_from_slice(name);
        }
        SocksAddress::IpV6(ip) => {
            buf.push(0x04);
            buf.extend_from_slice(ip);
        }
    }
}
