//! Stream connection lifecycle.
//!
//! - `endpoint`: endpoint construction (HTTP scheme → streaming scheme
//!   rewrite, `tail`/`timestamps` query parameters) and auth context.
//! - `connection`: the connection state machine. One driver task owns the
//!   socket; consumers observe [`StreamEvent`]s and [`ConnectionState`],
//!   never exceptions.

pub mod connection;
pub mod endpoint;

pub use connection::{ConnectGate, ConnectionState, StreamConnection, StreamEvent};
pub use endpoint::{AuthContext, StreamEndpoint, TailDepth};
