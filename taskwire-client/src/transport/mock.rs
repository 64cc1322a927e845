//! Scripted transport for session tests.
//!
//! `MockConnector` lets tests script each dial in advance: accept with a
//! remote-controlled transport, refuse outright, or hang forever. Scripts
//! enable fast, deterministic testing of session logic without a network.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc;
use url::Url;

use super::{CLOSE_ABNORMAL, Connector, Transport, TransportEvent};
use crate::error::TransportError;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

enum Script {
    Accept(MockTransport),
    Refuse(String),
    Hang,
}

/// Scripted connector counting every dial it receives.
#[derive(Default)]
pub struct MockConnector {
    scripts: Mutex<VecDeque<Script>>,
    dials: AtomicUsize,
    dialed_urls: Mutex<Vec<Url>>,
    dial_times: Mutex<Vec<tokio::time::Instant>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script one successful dial; the returned remote drives the transport.
    pub fn expect_accept(&self) -> MockRemote {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let sent = Arc::new(Mutex::new(Vec::new()));
        let closed_with = Arc::new(Mutex::new(None));
        lock(&self.scripts).push_back(Script::Accept(MockTransport {
            events: events_rx,
            sent: Arc::clone(&sent),
            closed_with: Arc::clone(&closed_with),
            finished: false,
        }));
        MockRemote {
            events_tx,
            sent,
            closed_with,
        }
    }

    /// Script one dial that fails outright.
    pub fn expect_refuse(&self, message: &str) {
        lock(&self.scripts).push_back(Script::Refuse(message.to_string()));
    }

    /// Script one dial that never completes.
    pub fn expect_hang(&self) {
        lock(&self.scripts).push_back(Script::Hang);
    }

    /// How many dials this connector has received.
    pub fn dials(&self) -> usize {
        self.dials.load(Ordering::SeqCst)
    }

    /// The URLs dialed, in order.
    pub fn dialed_urls(&self) -> Vec<Url> {
        lock(&self.dialed_urls).clone()
    }

    /// The instants each dial arrived at, in order.
    pub fn dial_times(&self) -> Vec<tokio::time::Instant> {
        lock(&self.dial_times).clone()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, url: &Url) -> Result<Box<dyn Transport>, TransportError> {
        self.dials.fetch_add(1, Ordering::SeqCst);
        lock(&self.dialed_urls).push(url.clone());
        lock(&self.dial_times).push(tokio::time::Instant::now());

        let script = lock(&self.scripts).pop_front();
        match script {
            Some(Script::Accept(transport)) => Ok(Box::new(transport)),
            Some(Script::Refuse(message)) => Err(TransportError::Connect(message)),
            Some(Script::Hang) => {
                futures_util::future::pending::<()>().await;
                unreachable!("pending future never resolves")
            }
            None => Err(TransportError::Connect("no scripted transport".to_string())),
        }
    }
}

/// Test-side handle to one accepted mock transport.
pub struct MockRemote {
    events_tx: mpsc::UnboundedSender<TransportEvent>,
    sent: Arc<Mutex<Vec<String>>>,
    closed_with: Arc<Mutex<Option<(u16, String)>>>,
}

impl MockRemote {
    /// Push one inbound text frame.
    pub fn push_text(&self, text: &str) {
        let _ = self.events_tx.send(TransportEvent::Text(text.to_string()));
    }

    /// Push a transport-level error (a close always follows separately).
    pub fn push_error(&self, message: &str) {
        let _ = self
            .events_tx
            .send(TransportEvent::Error(message.to_string()));
    }

    /// Close the transport from the remote side with the given code.
    pub fn close(&self, code: u16, reason: &str) {
        let _ = self.events_tx.send(TransportEvent::Closed {
            code,
            reason: reason.to_string(),
        });
    }

    /// Frames the session has sent over this transport.
    pub fn sent(&self) -> Vec<String> {
        lock(&self.sent).clone()
    }

    /// The code and reason of a locally initiated close, if one happened.
    pub fn closed_with(&self) -> Option<(u16, String)> {
        lock(&self.closed_with).clone()
    }
}

struct MockTransport {
    events: mpsc::UnboundedReceiver<TransportEvent>,
    sent: Arc<Mutex<Vec<String>>>,
    closed_with: Arc<Mutex<Option<(u16, String)>>>,
    finished: bool,
}

#[async_trait]
impl Transport for MockTransport {
    async fn next_event(&mut self) -> Option<TransportEvent> {
        if self.finished {
            return None;
        }
        match self.events.recv().await {
            Some(event) => {
                if matches!(event, TransportEvent::Closed { .. }) {
                    self.finished = true;
                }
                Some(event)
            }
            // Remote dropped without a close frame: network drop.
            None => {
                self.finished = true;
                Some(TransportEvent::Closed {
                    code: CLOSE_ABNORMAL,
                    reason: String::new(),
                })
            }
        }
    }

    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        lock(&self.sent).push(text);
        Ok(())
    }

    async fn close(&mut self, code: u16, reason: &str) -> Result<(), TransportError> {
        *lock(&self.closed_with) = Some((code, reason.to_string()));
        self.finished = true;
        Ok(())
    }
}
