mod buffer;
mod error;
mod events;
mod runtime;
mod session;
mod transport;

pub use buffer::ByteBuffer;
pub use error::TunnelError;
pub use events::{
    event_channel, log_channel, EventKind, LogLevel, LogRecord, SessionEvents, SessionLogs,
    SocketEvent,
};
pub use runtime::{drive_handshake, TokioTransport};
pub use session::{ProxyState, ProxyType, Session};
pub use transport::Transport;

#[cfg(test)]
use std::sync::Once;

#[cfg(test)]
use log::LevelFilter;

#[cfg(test)]
static INIT: Once = Once::new();

#[cfg(test)]
fn init() {
    INIT.call_once(|| {
        env_logger::builder()
            .is_test(true)
            .filter_level(LevelFilter::Trace)
            .init()
    })
}
