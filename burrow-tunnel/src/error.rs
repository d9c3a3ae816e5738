use thiserror::Error;

/// Failure surface of the handshake driver.
///
/// `Rejected` and `ClosedByPeer` both correspond to an aborted
/// connection: the proxy either violated the protocol, refused the
/// request, or hung up mid-handshake.
#[derive(Debug, Error)]
pub enum TunnelError {
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    #[error("a handshake is already in progress")]
    AlreadyInProgress,
    #[error("proxy type is not supported")]
    ProtocolUnsupported,
    #[error("proxy rejected the request: {0}")]
    Rejected(String),
    #[error("proxy closed the connection during the handshake")]
    ClosedByPeer,
    #[error("proxy returned an error status: {0}")]
    HttpStatus(String),
    #[error("proxy response headers too large")]
    HeaderTooLarge,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
