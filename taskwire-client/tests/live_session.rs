//! End-to-end tests over a real WebSocket server.
//!
//! A scripted in-process server accepts connections, pushes frames, drops the
//! connection to provoke a reconnect, and records what the client sends.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};

use taskwire_client::endpoint::CLIENT_CHANNEL;
use taskwire_client::{
    CONNECTION_LOST, ClientMessage, LiveConfig, LiveSession, MemoryTokenStore, ReconnectConfig,
    TaskEvent,
};

/// What the server observed, reported back to the test.
#[derive(Debug)]
enum ServerSeen {
    Frame(String),
    ClosedWith(Option<u16>),
}

async fn recv_with_timeout<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> T {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("channel closed")
}

#[tokio::test]
async fn full_lifecycle_over_a_real_socket() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    let request_uris: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel::<ServerSeen>();

    // Connection 1: push a task event, then drop abnormally.
    // Connection 2: push a chat message, echo what the client sends, report
    // the close code when the client tears down.
    let uris = Arc::clone(&request_uris);
    tokio::spawn(async move {
        for connection in 0..2 {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let uris = Arc::clone(&uris);
            let callback = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
                uris.lock().unwrap().push(req.uri().to_string());
                Ok(resp)
            };
            let Ok(mut ws) = accept_hdr_async(stream, callback).await else {
                return;
            };

            if connection == 0 {
                let _ = ws
                    .send(Message::Text(
                        r#"{"type":"task_created","task":{"id":101,"title":"Fix roof"}}"#.into(),
                    ))
                    .await;
                // Drop without a close handshake: abnormal closure.
                drop(ws);
                continue;
            }

            let _ = ws
                .send(Message::Text(
                    r#"{"type":"chat_message","message":{"body":"welcome back"}}"#.into(),
                ))
                .await;
            while let Some(Ok(msg)) = ws.next().await {
                match msg {
                    Message::Text(text) => {
                        let _ = seen_tx.send(ServerSeen::Frame(text.to_string()));
                    }
                    Message::Close(frame) => {
                        let code = frame.map(|f| u16::from(f.code));
                        let _ = seen_tx.send(ServerSeen::ClosedWith(code));
                        break;
                    }
                    _ => {}
                }
            }
        }
    });

    let config = LiveConfig {
        endpoint: Some(format!("ws://{addr}")),
        reconnect: ReconnectConfig {
            max_attempts: 5,
            base_delay: Duration::from_millis(50),
        },
        ..LiveConfig::default()
    };
    let tokens = Arc::new(MemoryTokenStore::with_token("secret-token"));
    let session = LiveSession::new(config, CLIENT_CHANNEL, tokens);

    let (task_tx, mut task_rx) = mpsc::unbounded_channel();
    session.subscribe_task(TaskEvent::Created, move |task| {
        let _ = task_tx.send(task.clone());
    });
    let (chat_tx, mut chat_rx) = mpsc::unbounded_channel();
    session.subscribe("chat_message", move |payload| {
        let _ = chat_tx.send(payload.clone());
    });

    session.connect()?;

    // First connection delivers the task push.
    let task = recv_with_timeout(&mut task_rx).await;
    assert_eq!(task.id, 101);
    assert_eq!(task.title.as_deref(), Some("Fix roof"));

    // The server dropped the first connection; the chat message proves the
    // session reconnected on its own.
    let chat = recv_with_timeout(&mut chat_rx).await;
    assert_eq!(chat["message"]["body"], "welcome back");

    session.send(&ClientMessage::ChatMessage {
        message: "hello from the client".to_string(),
        file: None,
    })?;
    match recv_with_timeout(&mut seen_rx).await {
        ServerSeen::Frame(text) => {
            assert!(text.contains(r#""type":"chat_message""#));
            assert!(text.contains("hello from the client"));
        }
        other => panic!("expected a frame, got {other:?}"),
    }

    // Deliberate teardown closes with the reserved code.
    session.close();
    match recv_with_timeout(&mut seen_rx).await {
        ServerSeen::ClosedWith(code) => assert_eq!(code, Some(1000)),
        other => panic!("expected a close, got {other:?}"),
    }

    // Both connections carried the bearer token on the resolved path.
    let uris = request_uris.lock().unwrap().clone();
    assert_eq!(uris.len(), 2);
    for uri in uris {
        assert!(uri.starts_with("/client/"));
        assert!(uri.contains("token=secret-token"));
    }

    Ok(())
}

#[tokio::test]
async fn exhausted_retries_dispatch_connection_lost() -> Result<()> {
    // Bind then drop the listener so every dial is refused.
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);

    let config = LiveConfig {
        endpoint: Some(format!("ws://{addr}")),
        reconnect: ReconnectConfig {
            max_attempts: 2,
            base_delay: Duration::from_millis(10),
        },
        ..LiveConfig::default()
    };
    let session = LiveSession::new(config, CLIENT_CHANNEL, Arc::new(MemoryTokenStore::new()));

    let (lost_tx, mut lost_rx) = mpsc::unbounded_channel();
    session.subscribe(CONNECTION_LOST, move |payload| {
        let _ = lost_tx.send(payload.clone());
    });

    session.connect()?;
    let lost = recv_with_timeout(&mut lost_rx).await;
    assert_eq!(lost["attempts"], 2);
    assert!(session.is_terminal());

    Ok(())
}
