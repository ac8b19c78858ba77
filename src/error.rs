use std::time::Duration;

/// Failures of a remote call. The chat service itself never fails; everything
/// here comes from the connection underneath it.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("connection error: {0}")]
    Io(#[from] std::io::Error),

    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("remote call timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection closed")]
    Disconnected,
}

/// Failures that end a client session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("error connecting to server: {0}")]
    Connect(#[source] std::io::Error),

    #[error("username cannot be empty")]
    EmptyUsername,

    #[error("error reading input: {0}")]
    Input(#[source] std::io::Error),
}
