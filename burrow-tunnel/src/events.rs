use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::error::TunnelError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Connection,
    ConnectionNext,
    Read,
    Write,
    Close,
}

/// Socket-level event surfaced to the owner. Terminal handshake outcomes
/// arrive as `Connection` with no error or `Close` with one.
#[derive(Debug)]
pub struct SocketEvent {
    pub kind: EventKind,
    pub error: Option<TunnelError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Status,
    Response,
    Error,
    DebugWarning,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub level: LogLevel,
    pub message: String,
}

pub type SessionEvents = UnboundedReceiverStream<SocketEvent>;
pub type SessionLogs = UnboundedReceiverStream<LogRecord>;

pub fn event_channel() -> (mpsc::UnboundedSender<SocketEvent>, SessionEvents) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (sender, UnboundedReceiverStream::new(receiver))
}

pub fn log_channel() -> (mpsc::UnboundedSender<LogRecord>, SessionLogs) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (sender, UnboundedReceiverStream::new(receiver))
}
