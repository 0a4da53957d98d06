//! Core domain types: log lines, the line buffer, and the error taxonomy.

pub mod error;
pub mod line;

pub use error::{AppError, StreamError};
pub use line::{LineBuffer, LogLine};
