//! The stream connection state machine.
//!
//! One [`StreamConnection`] owns one connection attempt. A tokio driver task
//! is the sole owner of the socket handle: it performs the handshake, routes
//! every inbound message through the frame decoder, and emits
//! [`StreamEvent`]s over an unbounded channel. The consumer side observes
//! events and derives [`ConnectionState`]; no failure after `open` returns
//! crosses this boundary as a Rust error.
//!
//! Event order per connection: at most one `Opened`, zero or more `Line`s,
//! then exactly one terminal `Failed` or `Closed`.

use crate::decoder::decode_frame;
use crate::model::StreamError;
use crate::stream::endpoint::{AuthContext, StreamEndpoint};
use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

/// Close reason used when the owning scope is dropped without an explicit
/// [`StreamConnection::close`] call.
const DEFAULT_CLOSE_REASON: &str = "client shutting down";

/// Close code reported when the stream ends without any close frame.
const ABNORMAL_NO_CLOSE_FRAME: u16 = 1006;

/// Close code reported for a close frame carrying no status.
const NO_STATUS_RECEIVED: u16 = 1005;

/// Connection lifecycle state, derived from the event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// Connect attempt dispatched, handshake not yet complete.
    Connecting,
    /// Handshake complete; frames may arrive.
    Connected,
    /// Setup or transport failure. Already-buffered lines remain valid.
    Errored {
        /// Human-readable reason.
        reason: String,
    },
    /// The connection is closed.
    Closed {
        /// True for a normal-code close (user-initiated shutdown or a
        /// server close with the normal code); false for every other code.
        clean: bool,
        /// The close code, preserved for display.
        code: u16,
        /// Optional close reason from whichever side initiated.
        reason: String,
    },
}

impl ConnectionState {
    /// True once the connection has reached `Errored` or `Closed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectionState::Errored { .. } | ConnectionState::Closed { .. })
    }

    /// True while frames may still arrive.
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    /// Short status label for banners and the status bar.
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Errored { .. } => "error",
            ConnectionState::Closed { .. } => "closed",
        }
    }
}

/// One lifecycle event from the driver task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Handshake completed; the connection is live.
    Opened,
    /// One decoded, renderable line.
    Line(String),
    /// Setup (handshake) or mid-stream transport failure.
    Failed {
        /// Human-readable reason.
        reason: String,
    },
    /// Terminal close, clean or abnormal.
    Closed {
        /// True only for normal-code termination.
        clean: bool,
        /// Close code.
        code: u16,
        /// Close reason, possibly empty.
        reason: String,
    },
}

/// Single in-flight connect guard.
///
/// One logical consumer holds one gate; `open` acquires it for the duration
/// of the handshake and releases it as soon as the attempt resolves (in
/// either direction). A second `open` against a busy gate is rejected with
/// [`StreamError::AlreadyConnecting`].
#[derive(Debug, Default, Clone)]
pub struct ConnectGate {
    in_flight: Arc<AtomicBool>,
}

impl ConnectGate {
    /// Create a gate with no attempt in flight.
    pub fn new() -> Self {
        Self::default()
    }

    fn try_acquire(&self) -> Option<GatePermit> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            Some(GatePermit {
                in_flight: Arc::clone(&self.in_flight),
            })
        } else {
            None
        }
    }

    /// True while a connect attempt is in flight.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

/// Releases the gate on drop, whichever way the attempt resolves.
#[derive(Debug)]
struct GatePermit {
    in_flight: Arc<AtomicBool>,
}

impl Drop for GatePermit {
    fn drop(&mut self) {
        self.in_flight.store(false, Ordering::Release);
    }
}

/// A live (or finished) stream connection.
///
/// Owns the consumer half of the event channel and the close-request sender.
/// Each instance has its own channel, so a prior instance's late-arriving
/// frames can never reach a new instance's buffer. Dropping the instance
/// requests the same clean close as [`close`](Self::close), with a default
/// reason; the driver closes the socket exactly once in every path.
#[derive(Debug)]
pub struct StreamConnection {
    events: mpsc::UnboundedReceiver<StreamEvent>,
    close_tx: Option<oneshot::Sender<String>>,
    state: ConnectionState,
}

impl StreamConnection {
    /// Open a connection to `endpoint`, authenticated per `auth`.
    ///
    /// Spawns the driver task on the current tokio runtime; must be called
    /// within one. Returns immediately in `Connecting` state — handshake
    /// failures arrive as a [`StreamEvent::Failed`], not as an error here.
    ///
    /// # Errors
    ///
    /// [`StreamError::InvalidEndpoint`] if the upgrade request cannot be
    /// built, [`StreamError::AlreadyConnecting`] if `gate` already has an
    /// attempt in flight.
    pub fn open(
        endpoint: &StreamEndpoint,
        auth: &AuthContext,
        gate: &ConnectGate,
    ) -> Result<Self, StreamError> {
        let mut request = endpoint.url().as_str().into_client_request().map_err(|e| {
            StreamError::InvalidEndpoint {
                url: endpoint.url().to_string(),
                reason: e.to_string(),
            }
        })?;

        if let AuthContext::Bearer(token) = auth {
            let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| {
                StreamError::InvalidEndpoint {
                    url: endpoint.url().to_string(),
                    reason: format!("invalid bearer token: {e}"),
                }
            })?;
            request.headers_mut().insert(AUTHORIZATION, value);
        }

        let permit = gate.try_acquire().ok_or(StreamError::AlreadyConnecting)?;

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (close_tx, close_rx) = oneshot::channel();

        debug!(url = %endpoint.url(), "opening stream connection");
        tokio::spawn(drive(request, permit, event_tx, close_rx));

        Ok(Self {
            events: event_rx,
            close_tx: Some(close_tx),
            state: ConnectionState::Connecting,
        })
    }

    /// Current state, as derived from the events drained so far.
    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    /// Drain one pending event without blocking.
    ///
    /// Returns `None` when no event is queued (or the driver is gone).
    /// Updates [`state`](Self::state) as a side effect.
    pub fn poll_event(&mut self) -> Option<StreamEvent> {
        match self.events.try_recv() {
            Ok(event) => {
                self.apply(&event);
                Some(event)
            }
            Err(_) => None,
        }
    }

    /// Await the next event. Returns `None` once the channel is exhausted
    /// after the terminal event.
    pub async fn next_event(&mut self) -> Option<StreamEvent> {
        let event = self.events.recv().await?;
        self.apply(&event);
        Some(event)
    }

    /// Request a clean close with a human-readable reason.
    ///
    /// The driver sends a normal-code close frame and drains until the peer
    /// acknowledges; the terminal [`StreamEvent::Closed`] still arrives
    /// through the event channel. Idempotent: after the first call (or once
    /// the connection is terminal) this is a no-op.
    pub fn close(&mut self, reason: &str) {
        if self.state.is_terminal() {
            return;
        }
        if let Some(tx) = self.close_tx.take() {
            // Send failure means the driver already finished; the terminal
            // event is (or was) in the channel.
            let _ = tx.send(reason.to_string());
        }
    }

    fn apply(&mut self, event: &StreamEvent) {
        match event {
            StreamEvent::Opened => self.state = ConnectionState::Connected,
            StreamEvent::Line(_) => {}
            StreamEvent::Failed { reason } => {
                self.state = ConnectionState::Errored {
                    reason: reason.clone(),
                }
            }
            StreamEvent::Closed {
                clean,
                code,
                reason,
            } => {
                self.state = ConnectionState::Closed {
                    clean: *clean,
                    code: *code,
                    reason: reason.clone(),
                }
            }
        }
    }

    /// Build a connection around an externally fed event channel.
    #[cfg(test)]
    pub(crate) fn from_channel(events: mpsc::UnboundedReceiver<StreamEvent>) -> Self {
        Self {
            events,
            close_tx: None,
            state: ConnectionState::Connecting,
        }
    }
}

/// Driver task: sole owner of the socket handle.
async fn drive(
    request: tokio_tungstenite::tungstenite::handshake::client::Request,
    permit: GatePermit,
    events: mpsc::UnboundedSender<StreamEvent>,
    mut close_rx: oneshot::Receiver<String>,
) {
    let socket = tokio::select! {
        result = connect_async(request) => {
            // The attempt has resolved either way: release the gate.
            drop(permit);
            match result {
                Ok((socket, _response)) => socket,
                Err(e) => {
                    let _ = events.send(StreamEvent::Failed {
                        reason: e.to_string(),
                    });
                    return;
                }
            }
        }
        reason = &mut close_rx => {
            // Closed (or dropped) before the handshake finished. The
            // connect future is dropped here, which aborts the attempt.
            drop(permit);
            let reason = reason.unwrap_or_else(|_| DEFAULT_CLOSE_REASON.to_string());
            let _ = events.send(StreamEvent::Closed {
                clean: true,
                code: CloseCode::Normal.into(),
                reason,
            });
            return;
        }
    };

    let _ = events.send(StreamEvent::Opened);
    let (mut sink, mut source) = socket.split();

    // Set once we have sent our close frame; from then on we only drain.
    let mut local_close: Option<String> = None;

    loop {
        tokio::select! {
            reason = &mut close_rx, if local_close.is_none() => {
                let reason = reason.unwrap_or_else(|_| DEFAULT_CLOSE_REASON.to_string());
                send_close(&mut sink, &reason).await;
                local_close = Some(reason);
            }
            message = source.next() => match message {
                // Once we have initiated a close we only drain for the peer
                // echo; no further lines are forwarded.
                Some(Ok(Message::Text(text))) if local_close.is_none() => {
                    forward_line(&events, text.as_str(), &mut sink, &mut local_close).await;
                }
                Some(Ok(Message::Binary(bytes))) if local_close.is_none() => {
                    let text = String::from_utf8_lossy(&bytes);
                    forward_line(&events, &text, &mut sink, &mut local_close).await;
                }
                Some(Ok(Message::Close(frame))) => {
                    let _ = events.send(close_event(local_close.take(), frame));
                    break;
                }
                Some(Ok(_)) => {} // ping/pong/raw frames: transport noise
                Some(Err(e)) => {
                    let event = match local_close.take() {
                        // Peer tore the stream down while we were draining
                        // our own close; still a user-initiated close.
                        Some(reason) => StreamEvent::Closed {
                            clean: true,
                            code: CloseCode::Normal.into(),
                            reason,
                        },
                        None => {
                            warn!(error = %e, "stream transport error");
                            StreamEvent::Failed {
                                reason: e.to_string(),
                            }
                        }
                    };
                    let _ = events.send(event);
                    break;
                }
                None => {
                    let event = match local_close.take() {
                        Some(reason) => StreamEvent::Closed {
                            clean: true,
                            code: CloseCode::Normal.into(),
                            reason,
                        },
                        None => StreamEvent::Closed {
                            clean: false,
                            code: ABNORMAL_NO_CLOSE_FRAME,
                            reason: "connection dropped without close frame".to_string(),
                        },
                    };
                    let _ = events.send(event);
                    break;
                }
            }
        }
    }

    debug!("stream driver finished");
}

type WsSink = futures_util::stream::SplitSink<
    tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >,
    Message,
>;

async fn send_close(sink: &mut WsSink, reason: &str) {
    let frame = CloseFrame {
        code: CloseCode::Normal,
        reason: reason.to_string().into(),
    };
    // Failure here means the transport is already gone; the read half
    // reports that terminally.
    let _ = sink.send(Message::Close(Some(frame))).await;
}

/// Decode and forward one frame. If the consumer has gone away, initiate the
/// clean close the owner's drop requested implicitly.
async fn forward_line(
    events: &mpsc::UnboundedSender<StreamEvent>,
    raw: &str,
    sink: &mut WsSink,
    local_close: &mut Option<String>,
) {
    let Some(line) = decode_frame(raw) else {
        return; // empty frame: dropped
    };
    if events.send(StreamEvent::Line(line)).is_err() && local_close.is_none() {
        send_close(sink, DEFAULT_CLOSE_REASON).await;
        *local_close = Some(DEFAULT_CLOSE_REASON.to_string());
    }
}

/// Terminal event for a received close frame.
fn close_event(local_close: Option<String>, frame: Option<CloseFrame>) -> StreamEvent {
    if let Some(reason) = local_close {
        // We initiated; the peer frame is the echo of our normal close.
        return StreamEvent::Closed {
            clean: true,
            code: CloseCode::Normal.into(),
            reason,
        };
    }
    match frame {
        Some(frame) => StreamEvent::Closed {
            clean: frame.code == CloseCode::Normal,
            code: frame.code.into(),
            reason: frame.reason.to_string(),
        },
        None => StreamEvent::Closed {
            clean: false,
            code: NO_STATUS_RECEIVED,
            reason: String::new(),
        },
    }
}
