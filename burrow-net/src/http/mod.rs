mod connect;

pub use connect::{
    build_connect_request, find_header_terminator, is_success_status, status_line,
    REPLY_BUFFER_LEN,
};
