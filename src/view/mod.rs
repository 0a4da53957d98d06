//! TUI rendering and terminal management (impure shell).
//!
//! The viewer runs a synchronous crossterm event loop; the stream driver
//! runs on a tokio runtime the caller keeps entered, and events are drained
//! non-blockingly between input events. All layout decisions live in
//! `state`/`view_state`; this layer adapts them to a terminal.

mod log_pane;
mod search_input;
mod status;

pub use log_pane::{wrap_line, LogPane};
pub use search_input::SearchInput;
pub use status::StatusBar;

use crate::state::{AppState, InputMode};
use crate::stream::{AuthContext, ConnectGate, StreamConnection, StreamEndpoint};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{backend::CrosstermBackend, layout::Rect, Terminal};
use std::io::{self, Stdout};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

/// Poll interval for the event loop: drains stream events between inputs.
const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// How long to wait for the close handshake during shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

/// Errors during TUI operations.
#[derive(Debug, Error)]
pub enum TuiError {
    /// Terminal I/O failure.
    #[error("Terminal IO error: {0}")]
    Io(#[from] io::Error),

    /// Stream setup failure while recreating a connection.
    #[error("Stream error: {0}")]
    Stream(#[from] crate::model::StreamError),
}

/// Main TUI application.
///
/// Generic over the backend so rendering is testable with `TestBackend`.
pub struct TuiApp<B>
where
    B: ratatui::backend::Backend,
{
    terminal: Terminal<B>,
    state: AppState,
    connection: StreamConnection,
    endpoint: StreamEndpoint,
    auth: AuthContext,
    gate: ConnectGate,
    overscan: usize,
}

impl TuiApp<CrosstermBackend<Stdout>> {
    /// Set up the terminal (raw mode, alternate screen) and open the viewer
    /// over an already-dispatched connection.
    pub fn new(
        connection: StreamConnection,
        endpoint: StreamEndpoint,
        auth: AuthContext,
        gate: ConnectGate,
        overscan: usize,
    ) -> Result<Self, TuiError> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        stdout.execute(EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        // Restore the terminal even on unwind.
        let default_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let _ = restore_terminal();
            default_hook(info);
        }));

        let size = terminal.size()?;
        let timestamps = endpoint.timestamps();
        let state = AppState::new(
            size.width as usize,
            size.height.saturating_sub(1) as usize,
            timestamps,
        );

        Ok(Self {
            terminal,
            state,
            connection,
            endpoint,
            auth,
            gate,
            overscan,
        })
    }

    /// Run the main event loop until the user quits.
    ///
    /// The caller must keep a tokio runtime entered for the lifetime of the
    /// loop; the stream driver and any reconnects run on it.
    pub fn run(&mut self) -> Result<(), TuiError> {
        self.draw()?;

        loop {
            if event::poll(TICK_INTERVAL)? {
                match event::read()? {
                    Event::Key(key) => {
                        if self.handle_key(key) {
                            self.shutdown();
                            return Ok(());
                        }
                        self.draw()?;
                        continue;
                    }
                    Event::Resize(_, _) => {
                        // The log pane re-layouts from its render area.
                        self.draw()?;
                        continue;
                    }
                    _ => {}
                }
            }

            // Timer tick: drain stream events, then render if anything moved.
            let mut dirty = false;
            while let Some(event) = self.connection.poll_event() {
                self.state.apply_stream_event(event);
                dirty = true;
            }
            if dirty || self.state.follow_pending() {
                self.draw()?;
            }
        }
    }

    /// Request a clean close and drain until the terminal event (or a grace
    /// timeout), so the close frame makes it onto the wire before exit.
    fn shutdown(&mut self) {
        self.connection.close("viewer closed");
        let deadline = Instant::now() + SHUTDOWN_GRACE;
        while Instant::now() < deadline && !self.connection.state().is_terminal() {
            while let Some(event) = self.connection.poll_event() {
                self.state.apply_stream_event(event);
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        let _ = restore_terminal();
    }
}

impl<B> TuiApp<B>
where
    B: ratatui::backend::Backend,
{
    /// Start with an active search term (the CLI `--search` flag).
    pub fn seed_search(&mut self, term: String) {
        self.state.search.set_term(term, &self.state.buffer);
    }

    /// Handle one key event. Returns true when the user quit.
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.kind != KeyEventKind::Press {
            return false;
        }

        // Ctrl+C quits from any mode.
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return true;
        }

        if let InputMode::TypingSearch { .. } = self.state.input_mode() {
            match key.code {
                KeyCode::Enter => self.state.commit_search(),
                KeyCode::Esc => self.state.cancel_search(),
                KeyCode::Backspace => self.state.pop_search_char(),
                KeyCode::Char(c) => self.state.push_search_char(c),
                _ => {}
            }
            return false;
        }

        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Char('/') => self.state.begin_search(),
            KeyCode::Char('n') => self.state.next_match(),
            KeyCode::Char('N') => self.state.prev_match(),
            KeyCode::Char('f') => self.state.toggle_follow(),
            KeyCode::Char('t') => self.toggle_timestamps(),
            KeyCode::Esc => self.state.cancel_search(),
            KeyCode::Up => self.state.scroll_up(1),
            KeyCode::Down => self.state.scroll_down(1),
            KeyCode::PageUp => self.state.page_up(),
            KeyCode::PageDown => self.state.page_down(),
            KeyCode::Home => self.state.scroll_to_top(),
            KeyCode::End => self.state.scroll_to_bottom(),
            _ => {}
        }
        false
    }

    /// Recreate the connection with `timestamps` flipped.
    ///
    /// The old connection is closed first and its channel discarded with it,
    /// so late frames from the old stream can never reach the new buffer.
    fn toggle_timestamps(&mut self) {
        if self.gate.is_in_flight() {
            debug!("ignoring timestamps toggle while a connect is in flight");
            return;
        }
        let timestamps = !self.state.timestamps();
        self.connection.close("stream parameters changed");

        let endpoint = self.endpoint.with_timestamps(timestamps);
        match StreamConnection::open(&endpoint, &self.auth, &self.gate) {
            Ok(connection) => {
                self.endpoint = endpoint;
                // Dropping the old connection here releases its channel.
                self.connection = connection;
                self.state.reset_stream(timestamps);
            }
            Err(e) => {
                warn!(error = %e, "failed to reopen stream with new parameters");
            }
        }
    }

    /// Render one frame.
    fn draw(&mut self) -> Result<(), TuiError> {
        let Self {
            terminal,
            state,
            overscan,
            ..
        } = self;
        terminal.draw(|frame| {
            let area = frame.area();
            if area.height == 0 {
                return;
            }
            let status_area = Rect::new(area.x, area.y, area.width, 1);
            let typing = matches!(state.input_mode(), InputMode::TypingSearch { .. });
            let search_height = if typing { 3.min(area.height - 1) } else { 0 };
            let log_area = Rect::new(
                area.x,
                area.y + 1,
                area.width,
                area.height - 1 - search_height,
            );

            frame.render_widget(StatusBar::new(state), status_area);
            frame.render_stateful_widget(LogPane::new(*overscan), log_area, &mut *state);
            if typing {
                let search_area = Rect::new(
                    area.x,
                    area.y + area.height - search_height,
                    area.width,
                    search_height,
                );
                frame.render_widget(SearchInput::new(state), search_area);
            }
        })?;
        Ok(())
    }

    /// Construct over an arbitrary backend, for render tests.
    #[cfg(test)]
    fn with_backend(
        terminal: Terminal<B>,
        state: AppState,
        connection: StreamConnection,
        endpoint: StreamEndpoint,
    ) -> Self {
        Self {
            terminal,
            state,
            connection,
            endpoint,
            auth: AuthContext::Ambient,
            gate: ConnectGate::new(),
            overscan: 4,
        }
    }
}

/// Best-effort terminal state restoration.
fn restore_terminal() -> Result<(), io::Error> {
    disable_raw_mode()?;
    io::stdout().execute(LeaveAlternateScreen)?;
    Ok(())
}
