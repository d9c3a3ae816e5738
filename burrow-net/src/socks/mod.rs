mod client;
mod types;

pub use client::{
    build_method_request, build_socks4_connect, build_socks5_connect, build_userpass_request,
    connect_reply_tail_len, parse_connect_reply, parse_method_reply, parse_socks4_reply,
    parse_userpass_reply, SocksAuth, METHOD_NO_AUTH, METHOD_USER_PASS,
};
pub use types::{Socks4Status, Socks5Status, SocksAddress, SocksError, SocksErrorKind};
