mod addr;
mod http;
mod socks;

pub use addr::classify_host;

pub use http::{
    build_connect_request, find_header_terminator, is_success_status, status_line,
    REPLY_BUFFER_LEN,
};

pub use socks::{
    build_method_request, build_socks4_connect, build_socks5_connect, build_userpass_request,
    connect_reply_tail_len, parse_connect_reply, parse_method_reply, parse_socks4_reply,
    parse_userpass_reply, Socks4Status, Socks5Status, SocksAddress, SocksAuth, SocksError,
    SocksErrorKind, METHOD_NO_AUTH, METHOD_USER_PASS,
};
