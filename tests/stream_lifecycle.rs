//! Full connection lifecycle against an in-process WebSocket server.

use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use wstail::model::{LineBuffer, StreamError};
use wstail::stream::{
    AuthContext, ConnectGate, ConnectionState, StreamConnection, StreamEndpoint, StreamEvent,
    TailDepth,
};

type ServerSocket = WebSocketStream<TcpStream>;

/// Bind a listener and return it with the HTTP base URL clients use.
async fn bind_server() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base = format!("http://{addr}/projects/1/environments/2/containers/c1/logs");
    (listener, base)
}

/// Accept one WebSocket connection.
async fn accept_one(listener: &TcpListener) -> ServerSocket {
    let (stream, _) = listener.accept().await.unwrap();
    accept_async(stream).await.unwrap()
}

fn endpoint(base: &str, timestamps: bool) -> StreamEndpoint {
    StreamEndpoint::from_http_base(base, TailDepth::Lines(100), timestamps).unwrap()
}

/// Drain events until the terminal one, with a watchdog timeout.
async fn collect_until_terminal(connection: &mut StreamConnection) -> Vec<StreamEvent> {
    tokio::time::timeout(Duration::from_secs(10), async {
        let mut events = Vec::new();
        while let Some(event) = connection.next_event().await {
            let terminal = matches!(
                event,
                StreamEvent::Failed { .. } | StreamEvent::Closed { .. }
            );
            events.push(event);
            if terminal {
                break;
            }
        }
        events
    })
    .await
    .expect("connection must reach a terminal event")
}

#[tokio::test]
async fn clean_lifecycle_buffers_three_lines_in_order() {
    let (listener, base) = bind_server().await;

    let server = tokio::spawn(async move {
        let mut socket = accept_one(&listener).await;
        for line in ["alpha", "beta", "gamma"] {
            socket.send(Message::Text(line.into())).await.unwrap();
        }
        socket
            .close(Some(CloseFrame {
                code: CloseCode::Normal,
                reason: "end of stream".into(),
            }))
            .await
            .unwrap();
        // Drain so the close handshake completes.
        while socket.next().await.is_some() {}
    });

    let gate = ConnectGate::new();
    let mut connection =
        StreamConnection::open(&endpoint(&base, false), &AuthContext::Ambient, &gate).unwrap();
    assert_eq!(*connection.state(), ConnectionState::Connecting);

    let events = collect_until_terminal(&mut connection).await;

    // State sequence: Connecting (checked above) -> Connected -> Closed.
    assert_eq!(events.first(), Some(&StreamEvent::Opened));
    assert_eq!(
        events.last(),
        Some(&StreamEvent::Closed {
            clean: true,
            code: 1000,
            reason: "end of stream".to_string(),
        })
    );

    let mut buffer = LineBuffer::new();
    for event in &events {
        if let StreamEvent::Line(text) = event {
            buffer.append(text.clone());
        }
    }
    let lines: Vec<&str> = buffer.iter().map(|l| l.text()).collect();
    assert_eq!(lines, vec!["alpha", "beta", "gamma"]);

    server.await.unwrap();
}

#[tokio::test]
async fn structured_error_frame_decodes_to_single_line() {
    let (listener, base) = bind_server().await;

    let server = tokio::spawn(async move {
        let mut socket = accept_one(&listener).await;
        socket
            .send(Message::Text(r#"{"error":"boom","stack":"at x"}"#.into()))
            .await
            .unwrap();
        socket
            .close(Some(CloseFrame {
                code: CloseCode::Normal,
                reason: "".into(),
            }))
            .await
            .unwrap();
        while socket.next().await.is_some() {}
    });

    let gate = ConnectGate::new();
    let mut connection =
        StreamConnection::open(&endpoint(&base, false), &AuthContext::Ambient, &gate).unwrap();
    let events = collect_until_terminal(&mut connection).await;

    let lines: Vec<&StreamEvent> = events
        .iter()
        .filter(|e| matches!(e, StreamEvent::Line(_)))
        .collect();
    assert_eq!(lines, vec![&StreamEvent::Line("ERROR: boom\nat x".to_string())]);

    server.await.unwrap();
}

#[tokio::test]
async fn empty_frames_are_dropped() {
    let (listener, base) = bind_server().await;

    let server = tokio::spawn(async move {
        let mut socket = accept_one(&listener).await;
        socket.send(Message::Text("   ".into())).await.unwrap();
        socket.send(Message::Text("real".into())).await.unwrap();
        socket
            .close(Some(CloseFrame {
                code: CloseCode::Normal,
                reason: "".into(),
            }))
            .await
            .unwrap();
        while socket.next().await.is_some() {}
    });

    let gate = ConnectGate::new();
    let mut connection =
        StreamConnection::open(&endpoint(&base, false), &AuthContext::Ambient, &gate).unwrap();
    let events = collect_until_terminal(&mut connection).await;

    let line_count = events
        .iter()
        .filter(|e| matches!(e, StreamEvent::Line(_)))
        .count();
    assert_eq!(line_count, 1, "whitespace-only frame yields no line");

    server.await.unwrap();
}

#[tokio::test]
async fn abnormal_close_code_is_preserved() {
    let (listener, base) = bind_server().await;

    let server = tokio::spawn(async move {
        let mut socket = accept_one(&listener).await;
        socket
            .close(Some(CloseFrame {
                code: CloseCode::from(1011),
                reason: "server error".into(),
            }))
            .await
            .unwrap();
        while socket.next().await.is_some() {}
    });

    let gate = ConnectGate::new();
    let mut connection =
        StreamConnection::open(&endpoint(&base, false), &AuthContext::Ambient, &gate).unwrap();
    let events = collect_until_terminal(&mut connection).await;

    assert_eq!(
        events.last(),
        Some(&StreamEvent::Closed {
            clean: false,
            code: 1011,
            reason: "server error".to_string(),
        })
    );
    assert_eq!(
        *connection.state(),
        ConnectionState::Closed {
            clean: false,
            code: 1011,
            reason: "server error".to_string(),
        }
    );

    server.await.unwrap();
}

#[tokio::test]
async fn transport_drop_surfaces_as_error_and_keeps_buffered_lines() {
    let (listener, base) = bind_server().await;

    let server = tokio::spawn(async move {
        let mut socket = accept_one(&listener).await;
        socket.send(Message::Text("buffered".into())).await.unwrap();
        // Drop the socket without a closing handshake.
    });

    let gate = ConnectGate::new();
    let mut connection =
        StreamConnection::open(&endpoint(&base, false), &AuthContext::Ambient, &gate).unwrap();
    let events = collect_until_terminal(&mut connection).await;

    assert!(
        events.contains(&StreamEvent::Line("buffered".to_string())),
        "lines received before the failure stay delivered"
    );
    match events.last() {
        Some(StreamEvent::Failed { .. }) => {
            assert!(matches!(
                connection.state(),
                ConnectionState::Errored { .. }
            ));
        }
        Some(StreamEvent::Closed { clean, .. }) => {
            // Some transports surface the dropped peer as an EOF instead of
            // a protocol error; either way it must not be clean.
            assert!(!clean);
        }
        other => panic!("expected terminal event, got {other:?}"),
    }

    server.await.unwrap();
}

#[tokio::test]
async fn client_close_sends_normal_code_with_reason() {
    let (listener, base) = bind_server().await;
    let (frame_tx, frame_rx) = oneshot::channel();

    let server = tokio::spawn(async move {
        let mut socket = accept_one(&listener).await;
        socket.send(Message::Text("line".into())).await.unwrap();
        while let Some(message) = socket.next().await {
            if let Ok(Message::Close(frame)) = message {
                let _ = frame_tx.send(frame);
                break;
            }
        }
        let _ = socket.close(None).await;
    });

    let gate = ConnectGate::new();
    let mut connection =
        StreamConnection::open(&endpoint(&base, false), &AuthContext::Ambient, &gate).unwrap();

    // Wait for the line so the close happens mid-stream.
    loop {
        match connection.next_event().await {
            Some(StreamEvent::Line(_)) => break,
            Some(_) => continue,
            None => panic!("stream ended early"),
        }
    }

    connection.close("operator requested shutdown");
    let events = collect_until_terminal(&mut connection).await;
    assert_eq!(
        events.last(),
        Some(&StreamEvent::Closed {
            clean: true,
            code: 1000,
            reason: "operator requested shutdown".to_string(),
        })
    );

    let frame = tokio::time::timeout(Duration::from_secs(5), frame_rx)
        .await
        .unwrap()
        .unwrap()
        .expect("close frame must carry a payload");
    assert_eq!(frame.code, CloseCode::Normal);
    assert_eq!(frame.reason.as_str(), "operator requested shutdown");

    server.await.unwrap();
}

#[tokio::test]
async fn bearer_token_is_sent_as_authorization_header() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base = format!("http://{addr}/logs");
    let (header_tx, header_rx) = oneshot::channel();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let callback = |request: &tokio_tungstenite::tungstenite::handshake::server::Request,
                        response: tokio_tungstenite::tungstenite::handshake::server::Response| {
            let auth = request
                .headers()
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let _ = header_tx.send(auth);
            Ok(response)
        };
        let mut socket = tokio_tungstenite::accept_hdr_async(stream, callback)
            .await
            .unwrap();
        let _ = socket
            .close(Some(CloseFrame {
                code: CloseCode::Normal,
                reason: "".into(),
            }))
            .await;
        while socket.next().await.is_some() {}
    });

    let gate = ConnectGate::new();
    let mut connection = StreamConnection::open(
        &endpoint(&base, false),
        &AuthContext::Bearer("secret-token".to_string()),
        &gate,
    )
    .unwrap();
    collect_until_terminal(&mut connection).await;

    let header = header_rx.await.unwrap();
    assert_eq!(header.as_deref(), Some("Bearer secret-token"));

    server.await.unwrap();
}

#[tokio::test]
async fn reconnect_with_new_parameters_never_leaks_old_frames() {
    let (listener, base) = bind_server().await;

    let server = tokio::spawn(async move {
        // First connection: one line, then a late frame after a delay.
        let mut first = accept_one(&listener).await;
        first.send(Message::Text("old line 1".into())).await.unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        let _ = first.send(Message::Text("old late frame".into())).await;

        // Second connection: the fresh stream.
        let mut second = accept_one(&listener).await;
        second.send(Message::Text("new line".into())).await.unwrap();
        second
            .close(Some(CloseFrame {
                code: CloseCode::Normal,
                reason: "done".into(),
            }))
            .await
            .unwrap();
        while second.next().await.is_some() {}
    });

    let gate = ConnectGate::new();

    // First instance, timestamps off.
    let mut old_connection =
        StreamConnection::open(&endpoint(&base, false), &AuthContext::Ambient, &gate).unwrap();
    loop {
        match old_connection.next_event().await {
            Some(StreamEvent::Line(line)) => {
                assert_eq!(line, "old line 1");
                break;
            }
            Some(_) => continue,
            None => panic!("first stream ended early"),
        }
    }

    // Toggle timestamps: close the old instance before opening the new one.
    old_connection.close("stream parameters changed");
    drop(old_connection);

    let mut new_connection =
        StreamConnection::open(&endpoint(&base, true), &AuthContext::Ambient, &gate).unwrap();
    let events = collect_until_terminal(&mut new_connection).await;

    let mut buffer = LineBuffer::new();
    for event in &events {
        if let StreamEvent::Line(text) = event {
            buffer.append(text.clone());
        }
    }
    let lines: Vec<&str> = buffer.iter().map(|l| l.text()).collect();
    assert_eq!(
        lines,
        vec!["new line"],
        "late frames from the old instance never reach the new buffer"
    );

    server.await.unwrap();
}

#[tokio::test]
async fn second_open_while_connecting_is_rejected() {
    // A listener that never accepts: the handshake hangs in Connecting.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base = format!("http://{addr}/logs");

    let gate = ConnectGate::new();
    let first =
        StreamConnection::open(&endpoint(&base, false), &AuthContext::Ambient, &gate).unwrap();

    // Give the driver a moment to start the handshake.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(gate.is_in_flight());

    let second = StreamConnection::open(&endpoint(&base, false), &AuthContext::Ambient, &gate);
    assert!(matches!(second, Err(StreamError::AlreadyConnecting)));

    // Dropping the stuck instance aborts the attempt and releases the gate.
    drop(first);
    tokio::time::timeout(Duration::from_secs(5), async {
        while gate.is_in_flight() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("gate must release after the owner is dropped");

    drop(listener);
}

#[tokio::test]
async fn invalid_endpoint_fails_synchronously() {
    let result = StreamEndpoint::from_http_base("gopher://nope", TailDepth::All, false);
    assert!(matches!(result, Err(StreamError::InvalidEndpoint { .. })));
}

#[tokio::test]
async fn headless_consumer_prints_banner_lines_and_close() {
    let (listener, base) = bind_server().await;

    let server = tokio::spawn(async move {
        let mut socket = accept_one(&listener).await;
        socket.send(Message::Text("one".into())).await.unwrap();
        socket
            .send(Message::Text(r#"{"message":"two"}"#.into()))
            .await
            .unwrap();
        socket
            .close(Some(CloseFrame {
                code: CloseCode::Normal,
                reason: "rotation".into(),
            }))
            .await
            .unwrap();
        while socket.next().await.is_some() {}
    });

    let gate = ConnectGate::new();
    let connection =
        StreamConnection::open(&endpoint(&base, false), &AuthContext::Ambient, &gate).unwrap();

    let mut out = Vec::new();
    wstail::headless::run_with_shutdown(connection, &mut out, std::future::pending())
        .await
        .unwrap();

    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines,
        vec![
            "--- stream connected ---",
            "one",
            "two",
            "--- stream closed (code 1000): rotation ---",
        ]
    );

    server.await.unwrap();
}
