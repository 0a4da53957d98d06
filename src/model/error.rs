//! Error types for the wstail application.
//!
//! Errors compose via `thiserror` and `From` conversions so they propagate
//! cleanly with `?`. Only *setup* failures are Rust errors: everything that
//! happens after a connection attempt has been dispatched (handshake failure,
//! mid-stream transport errors, abnormal closes) is surfaced as connection
//! state, never thrown past the streaming subsystem boundary — callers
//! observe state, they do not catch exceptions from streaming.

use thiserror::Error;

/// Top-level application error.
///
/// Returned from the outermost shells (CLI dispatch, TUI setup/teardown,
/// headless run). Domain errors convert into it via `From`.
#[derive(Debug, Error)]
pub enum AppError {
    /// A stream connection could not be set up at all.
    #[error("Stream setup failed: {0}")]
    Stream(#[from] StreamError),

    /// Configuration file could not be read or parsed.
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Terminal or output I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures establishing a stream connection.
///
/// These are fatal for the connection instance: the caller must create a new
/// instance to retry. Mid-stream failures are *not* represented here — they
/// arrive as [`StreamEvent::Failed`](crate::stream::StreamEvent::Failed) or an
/// abnormal [`StreamEvent::Closed`](crate::stream::StreamEvent::Closed) and
/// leave already-buffered lines valid and viewable.
#[derive(Debug, Error)]
pub enum StreamError {
    /// The endpoint URL could not be parsed, or its scheme has no streaming
    /// equivalent (only `http` and `https` bases are accepted).
    #[error("Invalid stream endpoint '{url}': {reason}")]
    InvalidEndpoint {
        /// The URL as given by the caller.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A connection attempt is already in flight for this consumer.
    ///
    /// One logical consumer holds at most one live socket; the in-flight
    /// guard rejects a second `open` until the first attempt has resolved.
    #[error("A connection attempt is already in flight")]
    AlreadyConnecting,
}
