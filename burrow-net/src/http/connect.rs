use base64::Engine;

const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

const USER_AGENT: &str = concat!("burrow/", env!("CARGO_PKG_VERSION"));

/// Receive scratch size for a CONNECT reply; headers must terminate within
/// one byte less than this.
pub const REPLY_BUFFER_LEN: usize = 4096;

pub fn build_connect_request(host: &str, port: u16, user: &str, pass: &str) -> Vec<u8> {
    let mut request = format!("CONNECT {host}:{port} HTTP/1.1\r\nHost: {host}:{port}\r\n");
    if !user.is_empty() {
        let credentials =
            base64::engine::general_purpose::STANDARD.encode(format!("{user}:{pass}"));
        request.push_str("Proxy-Authorization: Basic ");
        request.push_str(&credentials);
        request.push_str("\r\n");
    }
    request.push_str("User-Agent: ");
    request.push_str(USER_AGENT);
    request.push_str("\r\n\r\n");
    request.into_bytes()
}

pub fn find_header_terminator(buffer: &[u8]) -> Option<usize> {
    twoway::find_bytes(buffer, HEADER_TERMINATOR)
}

/// Status line of a reply buffer: everything before the first CR, or the
/// whole buffer if no CR is present.
pub fn status_line(buffer: &[u8]) -> &[u8] {
    match buffer.iter().position(|byte| *byte == b'\r') {
        Some(end) => &buffer[..end],
        None => buffer,
    }
}

pub fn is_success_status(line: &[u8]) -> bool {
    line.starts_with(b"HTTP/1.1 2") || line.starts_with(b"HTTP/1.0 2")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_connect_request_without_auth() {
        let bytes = build_connect_request("example.com", 443, "", "");
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("CONNECT example.com:443 HTTP/1.1\r\n"));
        assert!(text.contains("Host: example.com:443\r\n"));
        assert!(!text.contains("Proxy-Authorization"));
        assert!(text.ends_with("\r\n\r\n"));
    }

    #[test]
    fn builds_connect_request_with_auth() {
        let bytes = build_connect_request("h", 80, "u", "p");
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("Proxy-Authorization: Basic dTpw\r\n"));
    }

    #[test]
    fn finds_header_terminator() {
        assert_eq!(find_header_terminator(b"HTTP/1.1 200 OK\r\n\r\nbody"), Some(15));
        assert_eq!(find_header_terminator(b"HTTP/1.1 200 OK\r\n"), None);
    }

    #[test]
    fn extracts_status_line() {
        let buffer = b"HTTP/1.1 200 Connection established\r\nX: y\r\n\r\n";
        assert_eq!(status_line(buffer), b"HTTP/1.1 200 Connection established");
        assert_eq!(status_line(b"no terminator"), b"no terminator");
    }

    #[test]
    fn accepts_only_2xx_status_lines() {
        assert!(is_success_status(b"HTTP/1.1 200 Connection established"));
        assert!(is_success_status(b"HTTP/1.0 204 No Content"));
        assert!(!is_success_status(b"HTTP/1.1 407 Proxy Authentication Required"));
        assert!(!is_success_status(b"HTTP/2 200"));
        assert!(!is_success_status(b"garbage"));
    }
}
