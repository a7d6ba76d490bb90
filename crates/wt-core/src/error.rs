//! Shared error taxonomy: Spawn, PtyIo, Client, Codec, Logger, Registry.

use thiserror::Error;

/// Top-level error type shared by the PTY, session, and bridge layers.
#[derive(Debug, Error)]
pub enum WebttyError {
    /// Could not start a child process inside a PTY.
    #[error("failed to spawn pty process: {0}")]
    Spawn(String),

    /// Read/write/ioctl failure on a PTY master.
    #[error("pty i/o error: {0}")]
    PtyIo(#[from] std::io::Error),

    /// Send/recv failure on a client connection.
    #[error("client connection error: {0}")]
    Client(String),

    /// Malformed control message on a WebSocket frame.
    #[error("malformed control message: {0}")]
    Codec(String),

    /// Session log I/O failure (never propagated to the data path; logged once).
    #[error("session logger error: {0}")]
    Logger(String),

    /// An explicit registry lookup found no such session id.
    #[error("unknown session id: {0}")]
    Registry(String),
}

pub type Result<T> = std::result::Result<T, WebttyError>;
