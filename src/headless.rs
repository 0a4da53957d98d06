//! Headless consumer: decoded lines to an output sink.
//!
//! No virtualization, no search, no auto-scroll: one line per decoded frame,
//! bracketed by connection-status banners. An interrupt triggers a *clean*
//! close (normal code, explanatory reason) and the loop drains until the
//! terminal event arrives, so the socket is never dropped abruptly.

use crate::model::AppError;
use crate::stream::{StreamConnection, StreamEvent};
use std::future::Future;
use std::io::Write;
use std::pin::pin;
use tracing::info;

/// Close reason sent when the operator interrupts the tail.
const INTERRUPT_REASON: &str = "operator requested shutdown";

/// Consume the connection until its terminal event, writing to stdout and
/// closing cleanly on Ctrl-C.
pub async fn run(connection: StreamConnection) -> Result<(), AppError> {
    let mut stdout = std::io::stdout().lock();
    run_with_shutdown(connection, &mut stdout, async {
        // Signal registration failure leaves no shutdown path but does not
        // affect the stream itself.
        let _ = tokio::signal::ctrl_c().await;
    })
    .await
}

/// [`run`] with an explicit shutdown future, for callers (and tests) that
/// are not wired to process signals.
pub async fn run_with_shutdown<W, F>(
    mut connection: StreamConnection,
    out: &mut W,
    shutdown: F,
) -> Result<(), AppError>
where
    W: Write,
    F: Future<Output = ()>,
{
    let mut shutdown = pin!(shutdown);
    let mut interrupted = false;

    /// One turn of the consume loop.
    enum Step {
        Event(Option<StreamEvent>),
        Interrupt,
    }

    loop {
        // next_event is cancel-safe (a plain channel recv), so the select
        // can drop it whenever the shutdown future wins the race.
        let step = tokio::select! {
            event = connection.next_event() => Step::Event(event),
            () = &mut shutdown, if !interrupted => Step::Interrupt,
        };

        match step {
            Step::Event(Some(StreamEvent::Opened)) => {
                writeln!(out, "--- stream connected ---")?;
            }
            Step::Event(Some(StreamEvent::Line(line))) => {
                writeln!(out, "{line}")?;
            }
            Step::Event(Some(StreamEvent::Failed { reason })) => {
                writeln!(out, "--- stream error: {reason} ---")?;
                break;
            }
            Step::Event(Some(StreamEvent::Closed {
                clean,
                code,
                reason,
            })) => {
                if reason.is_empty() {
                    writeln!(out, "--- stream closed (code {code}) ---")?;
                } else {
                    writeln!(out, "--- stream closed (code {code}): {reason} ---")?;
                }
                info!(clean, code, "stream closed");
                break;
            }
            // Driver gone; the terminal event was already handled.
            Step::Event(None) => break,
            Step::Interrupt => {
                interrupted = true;
                info!("interrupt received, closing stream");
                connection.close(INTERRUPT_REASON);
                // Keep draining: the terminal Closed event ends the loop.
            }
        }
    }

    out.flush()?;
    Ok(())
}
