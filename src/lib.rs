//! wstail
//!
//! Client for live container log streams: a headless tailer that prints
//! decoded frames to stdout, and an interactive TUI viewer with windowed
//! rendering, live search, and pinned-to-bottom auto-scroll.
//!
//! Both consumers share the same connection state machine (`stream`),
//! frame decoding rules (`decoder`), and line buffer (`model`).

pub mod config;
pub mod decoder;
pub mod headless;
pub mod logging;
pub mod model;
pub mod state;
pub mod stream;
pub mod view;
pub mod view_state;
