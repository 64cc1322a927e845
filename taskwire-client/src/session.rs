//! The live session: one logical connection spanning many physical sockets.
//!
//! A [`LiveSession`] owns a driver task that holds at most one transport at a
//! time. The driver resolves the connection URL freshly before every dial (so
//! a refreshed token is picked up), pumps inbound frames into the dispatcher,
//! and consults the reconnection policy after every abnormal close. Explicit
//! teardown cancels any pending reconnect timer; no callbacks fire from a
//! torn-down session.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::json;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use taskwire_proto::{CLOSE_NORMAL, ClientMessage, Envelope, Task, TaskEvent};

use crate::auth::TokenProvider;
use crate::config::LiveConfig;
use crate::dispatch::{Dispatcher, SubscriptionHandle};
use crate::endpoint;
use crate::error::{LiveError, SessionError, TransportError};
use crate::transport::{CLOSE_ABNORMAL, Connector, Transport, TransportEvent, TransportState, WsConnector};

/// Discriminant of the synthetic envelope dispatched on the generic namespace
/// when the reconnect budget is exhausted. Carries the attempt count under
/// `attempts`.
pub const CONNECTION_LOST: &str = "connection_lost";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// State shared between the session handle and its driver task.
struct Shared {
    dispatcher: Dispatcher,
    state: Mutex<TransportState>,
    started: AtomicBool,
    terminal: AtomicBool,
    attempts: AtomicU32,
    seq: AtomicU64,
}

/// The logical desire for one continuous live connection.
///
/// Created explicitly by whatever owns the application's connectivity
/// lifecycle and torn down with [`LiveSession::close`]; there is no implicit
/// module-level instance.
pub struct LiveSession {
    shared: Arc<Shared>,
    config: LiveConfig,
    suffix: String,
    tokens: Arc<dyn TokenProvider>,
    connector: Arc<dyn Connector>,
    outbound_tx: mpsc::UnboundedSender<String>,
    outbound_rx: Mutex<Option<mpsc::UnboundedReceiver<String>>>,
    shutdown: CancellationToken,
}

impl LiveSession {
    /// Session for the given channel suffix, dialing real sockets.
    pub fn new(
        config: LiveConfig,
        suffix: impl Into<String>,
        tokens: Arc<dyn TokenProvider>,
    ) -> Self {
        Self::with_connector(config, suffix, tokens, Arc::new(WsConnector))
    }

    /// Session with an injected connector (the seam the tests use).
    pub fn with_connector(
        config: LiveConfig,
        suffix: impl Into<String>,
        tokens: Arc<dyn TokenProvider>,
        connector: Arc<dyn Connector>,
    ) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        Self {
            shared: Arc::new(Shared {
                dispatcher: Dispatcher::new(),
                state: Mutex::new(TransportState::Closed),
                started: AtomicBool::new(false),
                terminal: AtomicBool::new(false),
                attempts: AtomicU32::new(0),
                seq: AtomicU64::new(0),
            }),
            config,
            suffix: suffix.into(),
            tokens,
            connector,
            outbound_tx,
            outbound_rx: Mutex::new(Some(outbound_rx)),
            shutdown: CancellationToken::new(),
        }
    }

    /// Start the connection driver.
    ///
    /// Idempotent: calling this while the driver is already running is a
    /// no-op and dials no second socket. Fails on a torn-down session and on
    /// an endpoint configuration that cannot produce a URL.
    pub fn connect(&self) -> Result<(), LiveError> {
        if self.shared.terminal.load(Ordering::SeqCst) {
            return Err(SessionError::TornDown.into());
        }
        // Surface a broken endpoint at session start, not mid-flight.
        endpoint::resolve(&self.config, &self.suffix, self.tokens.current_token().as_deref())?;

        let Some(outbound_rx) = lock(&self.outbound_rx).take() else {
            return Ok(());
        };
        self.shared.started.store(true, Ordering::SeqCst);

        let driver = Driver {
            shared: Arc::clone(&self.shared),
            config: self.config.clone(),
            suffix: self.suffix.clone(),
            tokens: Arc::clone(&self.tokens),
            connector: Arc::clone(&self.connector),
            shutdown: self.shutdown.clone(),
            outbound_rx,
        };
        tokio::spawn(driver.run());
        Ok(())
    }

    /// Send one typed message over the live channel.
    ///
    /// While the transport is not open the message is silently dropped (not
    /// queued): the caller must not assume delivery. Calling this on a
    /// session that was never opened, or after teardown, is a contract
    /// violation and fails.
    pub fn send(&self, message: &ClientMessage) -> Result<(), LiveError> {
        if self.shared.terminal.load(Ordering::SeqCst) {
            return Err(SessionError::TornDown.into());
        }
        if !self.shared.started.load(Ordering::SeqCst) {
            return Err(SessionError::NotConnected.into());
        }
        if self.state() != TransportState::Open {
            debug!("transport not open; dropping outbound message");
            return Ok(());
        }
        let text = serde_json::to_string(message).map_err(TransportError::Encode)?;
        let _ = self.outbound_tx.send(text);
        Ok(())
    }

    /// Subscribe to one of the reserved task events.
    pub fn subscribe_task(
        &self,
        event: TaskEvent,
        callback: impl Fn(&Task) + Send + Sync + 'static,
    ) -> SubscriptionHandle {
        self.shared.dispatcher.subscribe_task(event, callback)
    }

    /// Subscribe to a generic message discriminant.
    pub fn subscribe(
        &self,
        kind: impl Into<String>,
        callback: impl Fn(&serde_json::Value) + Send + Sync + 'static,
    ) -> SubscriptionHandle {
        self.shared.dispatcher.subscribe(kind, callback)
    }

    /// Remove one subscription.
    pub fn unsubscribe(&self, handle: SubscriptionHandle) {
        self.shared.dispatcher.unsubscribe(handle);
    }

    /// Deliberate teardown: closes the socket with code 1000, cancels any
    /// pending reconnect, and marks the session terminal. Idempotent.
    pub fn close(&self) {
        self.shared.terminal.store(true, Ordering::SeqCst);
        self.shutdown.cancel();
    }

    /// Current transport state.
    pub fn state(&self) -> TransportState {
        *lock(&self.shared.state)
    }

    /// Whether the session is permanently disconnected (torn down or out of
    /// reconnect budget).
    pub fn is_terminal(&self) -> bool {
        self.shared.terminal.load(Ordering::SeqCst)
    }

    /// Reconnect attempts made since the last successful open.
    pub fn reconnect_attempts(&self) -> u32 {
        self.shared.attempts.load(Ordering::SeqCst)
    }
}

impl Drop for LiveSession {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

enum PumpStep {
    Shutdown,
    Outbound(Option<String>),
    Inbound(Option<TransportEvent>),
}

/// Outcome of one transport's pump loop.
enum PumpEnd {
    /// Torn down locally; no reconnect.
    Shutdown,
    /// The transport closed with this code.
    Closed(u16),
}

struct Driver {
    shared: Arc<Shared>,
    config: LiveConfig,
    suffix: String,
    tokens: Arc<dyn TokenProvider>,
    connector: Arc<dyn Connector>,
    shutdown: CancellationToken,
    outbound_rx: mpsc::UnboundedReceiver<String>,
}

impl Driver {
    async fn run(mut self) {
        loop {
            // Resolve freshly for every dial so a refreshed token is used.
            let token = self.tokens.current_token();
            let url = match endpoint::resolve(&self.config, &self.suffix, token.as_deref()) {
                Ok(url) => url,
                Err(e) => {
                    warn!(error = %e, channel = %self.suffix, "cannot resolve endpoint; giving up");
                    break;
                }
            };

            let seq = self.shared.seq.fetch_add(1, Ordering::SeqCst) + 1;
            self.set_state(TransportState::Connecting);
            info!(seq, channel = %self.suffix, "connecting");

            let dialed = tokio::select! {
                _ = self.shutdown.cancelled() => None,
                result = self.connector.connect(&url) => Some(result),
            };
            let Some(result) = dialed else { break };

            match result {
                Ok(transport) => {
                    self.set_state(TransportState::Open);
                    self.shared.attempts.store(0, Ordering::SeqCst);
                    info!(seq, "connected");

                    match self.pump(transport, seq).await {
                        PumpEnd::Shutdown => {
                            self.set_state(TransportState::Closed);
                            break;
                        }
                        PumpEnd::Closed(CLOSE_NORMAL) => {
                            self.set_state(TransportState::Closed);
                            info!(seq, "closed normally");
                            break;
                        }
                        PumpEnd::Closed(code) => {
                            self.set_state(TransportState::Closed);
                            warn!(seq, code, "connection closed");
                        }
                    }
                }
                Err(e) => {
                    self.set_state(TransportState::Closed);
                    warn!(seq, error = %e, "connect failed");
                }
            }

            // Abnormal close or failed dial: consult the policy.
            let attempt = self.shared.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if !self.config.reconnect.allows(attempt) {
                let made = attempt - 1;
                warn!(attempts = made, "reconnect budget exhausted; session is terminal");
                self.shared.terminal.store(true, Ordering::SeqCst);
                self.shared.dispatcher.dispatch(&Envelope::from_value(json!({
                    "type": CONNECTION_LOST,
                    "attempts": made,
                })));
                break;
            }

            let delay = self.config.reconnect.delay_for_attempt(attempt);
            debug!(attempt, delay_ms = delay.as_millis() as u64, "reconnect scheduled");
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        self.set_state(TransportState::Closed);
        self.shared.terminal.store(true, Ordering::SeqCst);
    }

    /// Pump one open transport until it closes or the session is torn down.
    async fn pump(&mut self, mut transport: Box<dyn Transport>, seq: u64) -> PumpEnd {
        let end = loop {
            let step = tokio::select! {
                _ = self.shutdown.cancelled() => PumpStep::Shutdown,
                outbound = self.outbound_rx.recv() => PumpStep::Outbound(outbound),
                event = transport.next_event() => PumpStep::Inbound(event),
            };

            match step {
                PumpStep::Shutdown => {
                    self.set_state(TransportState::Closing);
                    if let Err(e) = transport.close(CLOSE_NORMAL, "client going away").await {
                        debug!(seq, error = %e, "close handshake failed");
                    }
                    break PumpEnd::Shutdown;
                }
                PumpStep::Outbound(Some(text)) => {
                    debug!(seq, "sending frame");
                    if let Err(e) = transport.send_text(text).await {
                        warn!(seq, error = %e, "failed to send frame");
                    }
                }
                // The handle never drops the sender while the driver runs;
                // treat it like a shutdown if it does.
                PumpStep::Outbound(None) => break PumpEnd::Shutdown,
                PumpStep::Inbound(Some(TransportEvent::Text(text))) => {
                    match Envelope::decode(&text) {
                        Ok(envelope) => {
                            debug!(seq, kind = envelope.dispatch_key(), "frame received");
                            self.shared.dispatcher.dispatch(&envelope);
                        }
                        Err(e) => warn!(seq, error = %e, "dropping undecodable frame"),
                    }
                }
                PumpStep::Inbound(Some(TransportEvent::Error(detail))) => {
                    // Non-fatal: the close that follows drives the policy.
                    warn!(seq, detail = %detail, "transport error");
                }
                PumpStep::Inbound(Some(TransportEvent::Closed { code, reason })) => {
                    if !reason.is_empty() {
                        debug!(seq, code, reason = %reason, "close frame");
                    }
                    break PumpEnd::Closed(code);
                }
                PumpStep::Inbound(None) => break PumpEnd::Closed(CLOSE_ABNORMAL),
            }
        };

        // Nothing queued while the socket was going down leaks into the next
        // transport: send is drop-not-queue.
        while self.outbound_rx.try_recv().is_ok() {}

        end
    }

    fn set_state(&self, state: TransportState) {
        *lock(&self.shared.state) = state;
    }
}
