//! Stream session against a local WebSocket server.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use sitepulse::frame::RawSample;
use sitepulse::ws::{SessionEvent, SessionStatus, TelemetrySession};
use tokio::net::TcpListener;
use tokio_tungstenite::{accept_async, tungstenite::Message};

fn frame(i: u64) -> Vec<u8> {
    RawSample {
        cpu_percent: i as f32 * 10.0,
        mem_total_bytes: 1_000,
        mem_free_bytes: i,
    }
    .to_bytes()
    .to_vec()
}

async fn drain(session: &mut TelemetrySession) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    while let Some(ev) = session.next_event().await {
        events.push(ev);
    }
    events
}

#[tokio::test]
async fn ingests_frames_skips_malformed_and_keeps_data_after_close() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(tcp).await.unwrap();
        let credentials = ws.next().await.unwrap().unwrap();
        for i in 0..3 {
            ws.send(Message::Binary(frame(i))).await.unwrap();
        }
        ws.send(Message::Binary(vec![1, 2, 3])).await.unwrap();
        ws.send(Message::Binary(frame(3))).await.unwrap();
        ws.close(None).await.unwrap();
        credentials
    });

    let mut session = TelemetrySession::new(60);
    session
        .open(&format!("ws://{addr}/ws/host-stats"), None, Some("k3y"))
        .await;
    assert!(session.is_open());

    let events = drain(&mut session).await;
    let samples = events
        .iter()
        .filter(|e| matches!(e, SessionEvent::Sample(_)))
        .count();
    let malformed = events
        .iter()
        .filter(|e| matches!(e, SessionEvent::Malformed(_)))
        .count();
    assert_eq!(samples, 4);
    assert_eq!(malformed, 1);
    assert!(matches!(events.last(), Some(SessionEvent::Closed(_))));

    assert!(matches!(
        session.status(),
        SessionStatus::Disconnected { .. }
    ));
    let kept: Vec<u64> = session
        .buffer()
        .snapshot()
        .map(|s| s.mem_free_bytes)
        .collect();
    assert_eq!(kept, vec![0, 1, 2, 3]);
    assert_eq!(session.buffer().latest().map(|s| s.cpu_percent), Some(30.0));

    let credentials = server.await.unwrap();
    assert_eq!(credentials, Message::Text(r#"{"apiKey":"k3y"}"#.into()));
}

#[tokio::test]
async fn evicts_oldest_when_full() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(tcp).await.unwrap();
        for i in 0..5 {
            ws.send(Message::Binary(frame(i))).await.unwrap();
        }
        ws.close(None).await.unwrap();
        // the client answers the close handshake before dropping the socket
        ws.next().await
    });

    let mut session = TelemetrySession::new(2);
    session.open(&format!("ws://{addr}/ws/host-stats"), None, None).await;
    drain(&mut session).await;
    let reply = server.await.unwrap();
    assert!(
        matches!(reply, Some(Ok(Message::Close(_)))),
        "expected close reply, got {reply:?}"
    );

    let kept: Vec<u64> = session
        .buffer()
        .snapshot()
        .map(|s| s.mem_free_bytes)
        .collect();
    assert_eq!(kept, vec![3, 4]);
}

#[tokio::test]
async fn connect_failure_is_terminal_not_fatal() {
    // grab a free port, then release it so nothing is listening
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut session = TelemetrySession::new(60);
    session.open(&format!("ws://{addr}/ws/host-stats"), None, None).await;
    assert!(matches!(
        session.status(),
        SessionStatus::Disconnected { .. }
    ));
    assert!(session.buffer().is_empty());
    assert!(session.next_event().await.is_none());
    session.close().await;
}

#[tokio::test]
async fn close_abandons_a_stalled_handshake() {
    // accepts TCP but never answers the upgrade request
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;
        drop(tcp);
    });

    let mut session = TelemetrySession::new(60);
    session.begin_connect(&format!("ws://{addr}/ws/host-stats"), None, Some("k3y"));
    assert_eq!(session.status(), &SessionStatus::Connecting);
    assert!(session.is_active());

    // the caller's loop keeps running while the handshake hangs
    let waited = tokio::time::timeout(Duration::from_millis(200), session.next_event()).await;
    assert!(waited.is_err(), "handshake should still be pending");
    assert_eq!(session.status(), &SessionStatus::Connecting);

    tokio::time::timeout(Duration::from_secs(1), session.close())
        .await
        .expect("close returns while connecting");
    assert!(matches!(
        session.status(),
        SessionStatus::Disconnected { .. }
    ));
    assert!(!session.is_active());
    assert!(session.next_event().await.is_none());
    server.abort();
}

#[tokio::test]
async fn begin_connect_reports_opened_then_streams() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(tcp).await.unwrap();
        ws.send(Message::Binary(frame(7))).await.unwrap();
        ws.close(None).await.unwrap();
    });

    let mut session = TelemetrySession::new(60);
    session.begin_connect(&format!("ws://{addr}/ws/host-stats"), None, None);
    assert_eq!(session.next_event().await, Some(SessionEvent::Opened));
    assert!(session.is_open());
    assert!(matches!(
        session.next_event().await,
        Some(SessionEvent::Sample(s)) if s.mem_free_bytes == 7
    ));
    server.await.unwrap();
}
