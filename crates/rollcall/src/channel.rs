//! Live sync channel.
//!
//! The dashboard keeps a persistent push connection to the ledger owner.
//! Every check-in appended to the ledger is announced on it as a
//! `{"type": "new_checkin", "data": <record>}` envelope. The channel never
//! gives up: when the connection drops it waits a fixed delay and connects
//! again, for as long as it runs.
//!
//! ```text
//!   Connecting ──open──▶ Live
//!       │                 │
//!     fail              close
//!       ▼                 ▼
//!   Disconnected ◀────────┘
//!       │
//!   after delay
//!       ▼
//!   Connecting
//! ```

use std::time::Duration;

use futures_util::StreamExt;
use serde::Deserialize;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, trace, warn};

use crate::config::Config;
use crate::record::CheckInRecord;

/// Envelope type announcing a new ledger record.
pub const NEW_CHECKIN: &str = "new_checkin";

/// Errors that can occur on the push channel.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The connection could not be opened.
    #[error("failed to open push channel at {url}: {message}")]
    ConnectFailed {
        /// Channel URL.
        url: String,
        /// Description of what went wrong.
        message: String,
    },

    /// An open connection failed.
    #[error("push channel dropped: {0}")]
    Dropped(String),

    /// A frame could not be read as a message envelope.
    #[error("unreadable push frame: {0}")]
    BadFrame(String),

    /// The state machine was asked for a transition it doesn't have.
    #[error("invalid channel transition: {event} while {from}")]
    InvalidTransition {
        /// State the machine was in.
        from: ChannelState,
        /// The event that was applied.
        event: &'static str,
    },
}

/// Result type for channel operations.
pub type Result<T> = std::result::Result<T, ChannelError>;

/// Connection state of the push channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ChannelState {
    /// Opening a connection.
    #[default]
    Connecting,
    /// Connected and receiving pushes.
    Live,
    /// Connection lost; a reconnect is scheduled.
    Disconnected,
}

impl std::fmt::Display for ChannelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connecting => write!(f, "Connecting"),
            Self::Live => write!(f, "Live"),
            Self::Disconnected => write!(f, "Disconnected"),
        }
    }
}

/// Something the channel reports to its consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// The channel entered a new state.
    State(ChannelState),
    /// A new record was pushed.
    CheckIn(CheckInRecord),
    /// A reconnect was scheduled after a drop.
    RetryScheduled {
        /// Drop count so far, starting at 1.
        attempt: u64,
        /// How long until the reconnect.
        delay: Duration,
    },
}

/// Transition rules of the push channel.
#[derive(Debug, Default)]
pub struct ChannelMachine {
    state: ChannelState,
    drops: u64,
}

impl ChannelMachine {
    /// Create a machine in the `Connecting` state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ChannelState {
        self.state
    }

    /// Number of times the channel has gone to `Disconnected`.
    #[must_use]
    pub fn drops(&self) -> u64 {
        self.drops
    }

    /// The connection opened.
    ///
    /// # Errors
    ///
    /// Returns an error unless the machine is `Connecting`.
    pub fn opened(&mut self) -> Result<ChannelState> {
        self.apply("open", |state| match state {
            ChannelState::Connecting => Some(ChannelState::Live),
            _ => None,
        })
    }

    /// The connection closed or failed to open.
    ///
    /// # Errors
    ///
    /// Returns an error if the machine is already `Disconnected`.
    pub fn closed(&mut self) -> Result<ChannelState> {
        let next = self.apply("close", |state| match state {
            ChannelState::Connecting | ChannelState::Live => Some(ChannelState::Disconnected),
            ChannelState::Disconnected => None,
        })?;
        self.drops += 1;
        Ok(next)
    }

    /// The reconnect delay elapsed.
    ///
    /// # Errors
    ///
    /// Returns an error unless the machine is `Disconnected`.
    pub fn retry(&mut self) -> Result<ChannelState> {
        self.apply("retry", |state| match state {
            ChannelState::Disconnected => Some(ChannelState::Connecting),
            _ => None,
        })
    }

    fn apply(
        &mut self,
        event: &'static str,
        rule: impl FnOnce(ChannelState) -> Option<ChannelState>,
    ) -> Result<ChannelState> {
        let next = rule(self.state).ok_or(ChannelError::InvalidTransition {
            from: self.state,
            event,
        })?;
        trace!(from = %self.state, to = %next, event, "Channel transition");
        self.state = next;
        Ok(next)
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: serde_json::Value,
}

/// Read one pushed text frame.
///
/// Returns the record carried by a `new_checkin` envelope and `None` for
/// any other message type.
///
/// # Errors
///
/// Returns [`ChannelError::BadFrame`] if the frame isn't an envelope or a
/// `new_checkin` envelope doesn't carry a valid record.
pub fn parse_frame(text: &str) -> Result<Option<CheckInRecord>> {
    let envelope: Envelope =
        serde_json::from_str(text).map_err(|e| ChannelError::BadFrame(e.to_string()))?;

    if envelope.kind != NEW_CHECKIN {
        return Ok(None);
    }

    let record: CheckInRecord = serde_json::from_value(envelope.data)
        .map_err(|e| ChannelError::BadFrame(format!("{NEW_CHECKIN}: {e}")))?;
    if record.name.is_empty() {
        return Err(ChannelError::BadFrame(format!(
            "{NEW_CHECKIN}: record has an empty name"
        )));
    }
    Ok(Some(record))
}

/// Opens push connections.
#[async_trait::async_trait]
pub trait PushTransport: Send + Sync + 'static {
    /// Open a connection to `url`.
    async fn connect(&self, url: &str) -> Result<Box<dyn PushConnection>>;
}

/// An open push connection.
#[async_trait::async_trait]
pub trait PushConnection: Send {
    /// Wait for the next text frame. `None` once the connection has closed.
    async fn next_text(&mut self) -> Option<Result<String>>;

    /// Close the connection.
    async fn close(&mut self);
}

/// [`PushTransport`] over WebSocket.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsTransport;

struct WsConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait::async_trait]
impl PushTransport for WsTransport {
    async fn connect(&self, url: &str) -> Result<Box<dyn PushConnection>> {
        let (stream, _) = connect_async(url)
            .await
            .map_err(|e| ChannelError::ConnectFailed {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        Ok(Box::new(WsConnection { stream }))
    }
}

#[async_trait::async_trait]
impl PushConnection for WsConnection {
    async fn next_text(&mut self) -> Option<Result<String>> {
        // Pings are answered by tungstenite itself while reading.
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text.as_str().to_owned())),
                Ok(Message::Close(frame)) => {
                    debug!(?frame, "Push channel closed by server");
                    return None;
                }
                Ok(_) => {}
                Err(e) => return Some(Err(ChannelError::Dropped(e.to_string()))),
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            debug!(error = %e, "Error closing push channel");
        }
    }
}

/// Where and how the channel connects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSettings {
    /// Push channel URL.
    pub url: String,
    /// Fixed delay between a drop and the next connect.
    pub reconnect_delay: Duration,
}

impl ChannelSettings {
    /// Build settings from the application configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel URL can't be derived.
    pub fn from_config(config: &Config) -> crate::error::Result<Self> {
        Ok(Self {
            url: config.push_url()?,
            reconnect_delay: config.reconnect_delay(),
        })
    }
}

/// Persistent push connection with fixed-delay reconnect.
#[derive(Debug)]
pub struct LiveSyncChannel<T> {
    transport: T,
    settings: ChannelSettings,
    machine: ChannelMachine,
}

/// Why the pump stopped reading.
enum PumpExit {
    Closed,
    Stop,
}

impl<T: PushTransport> LiveSyncChannel<T> {
    /// Create a channel that connects through `transport`.
    #[must_use]
    pub fn new(transport: T, settings: ChannelSettings) -> Self {
        Self {
            transport,
            settings,
            machine: ChannelMachine::new(),
        }
    }

    /// Start the channel on a background task.
    ///
    /// Events are delivered in order on `events`. The channel runs until the
    /// returned handle is stopped or dropped, or `events` is closed.
    #[must_use]
    pub fn spawn(self, events: mpsc::Sender<ChannelEvent>) -> ChannelHandle {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let task = tokio::spawn(self.run(events, shutdown_rx));
        ChannelHandle {
            shutdown_tx: Some(shutdown_tx),
            task,
        }
    }

    async fn run(mut self, events: mpsc::Sender<ChannelEvent>, mut shutdown: mpsc::Receiver<()>) {
        info!(url = %self.settings.url, "Starting push channel");

        loop {
            if events
                .send(ChannelEvent::State(self.machine.state()))
                .await
                .is_err()
            {
                break;
            }

            let connected = tokio::select! {
                result = self.transport.connect(&self.settings.url) => result,
                _ = shutdown.recv() => break,
            };

            match connected {
                Ok(mut conn) => {
                    let Some(state) = self.transition(ChannelMachine::opened) else {
                        break;
                    };
                    info!(url = %self.settings.url, "Push channel live");
                    if events.send(ChannelEvent::State(state)).await.is_err() {
                        conn.close().await;
                        break;
                    }

                    if let PumpExit::Stop = pump(conn.as_mut(), &events, &mut shutdown).await {
                        conn.close().await;
                        break;
                    }
                }
                Err(e) => warn!(error = %e, "Push channel connect failed"),
            }

            let Some(state) = self.transition(ChannelMachine::closed) else {
                break;
            };
            let attempt = self.machine.drops();
            let delay = self.settings.reconnect_delay;
            warn!(attempt, delay_secs = delay.as_secs(), "Push channel disconnected, will retry");

            if events.send(ChannelEvent::State(state)).await.is_err()
                || events
                    .send(ChannelEvent::RetryScheduled { attempt, delay })
                    .await
                    .is_err()
            {
                break;
            }

            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                _ = shutdown.recv() => break,
            }

            if self.transition(ChannelMachine::retry).is_none() {
                break;
            }
        }

        debug!("Push channel stopped");
    }

    fn transition(
        &mut self,
        step: fn(&mut ChannelMachine) -> Result<ChannelState>,
    ) -> Option<ChannelState> {
        match step(&mut self.machine) {
            Ok(state) => Some(state),
            Err(e) => {
                error!(error = %e, "Push channel state machine rejected a transition");
                None
            }
        }
    }
}

/// Forward frames from `conn` until it closes or a stop is requested.
async fn pump(
    conn: &mut dyn PushConnection,
    events: &mpsc::Sender<ChannelEvent>,
    shutdown: &mut mpsc::Receiver<()>,
) -> PumpExit {
    loop {
        let frame = tokio::select! {
            frame = conn.next_text() => frame,
            _ = shutdown.recv() => return PumpExit::Stop,
        };

        match frame {
            None => return PumpExit::Closed,
            Some(Err(e)) => {
                warn!(error = %e, "Push channel read failed");
                return PumpExit::Closed;
            }
            Some(Ok(text)) => match parse_frame(&text) {
                Ok(Some(record)) => {
                    debug!(name = %record.name, category = %record.category, "New check-in pushed");
                    if events.send(ChannelEvent::CheckIn(record)).await.is_err() {
                        return PumpExit::Stop;
                    }
                }
                Ok(None) => trace!("Ignoring push message of another type"),
                Err(e) => warn!(error = %e, "Ignoring push frame"),
            },
        }
    }
}

/// Controls a running [`LiveSyncChannel`].
///
/// Dropping the handle also stops the channel, including a pending
/// reconnect timer.
#[derive(Debug)]
pub struct ChannelHandle {
    shutdown_tx: Option<mpsc::Sender<()>>,
    task: JoinHandle<()>,
}

impl ChannelHandle {
    /// Check if the channel task has ended.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the channel and wait for its task to end.
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(()).await;
        }
        if let Err(e) = self.task.await {
            warn!(error = %e, "Push channel task ended abnormally");
        }
    }
}
