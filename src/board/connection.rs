//! Per-board connection actor.
//!
//! One tokio task per board owns the socket, the heartbeat, the reconnect
//! policy and the translator. Socket events, timers and host commands are
//! serialized through a single `select!` loop, so a board never needs a
//! lock.
//!
//! ```text
//!            ┌──────────────── BoardHandle (cloneable) ───────────────┐
//!            │ submit / set_state / set_duty / close    status watch  │
//!            └───────────┬──────────────────────────────────▲─────────┘
//!                   mpsc │                                  │ watch
//!            ┌───────────▼──────────────────────────────────┴─────────┐
//!            │ BoardConnection::run                                   │
//!            │   connect ─► session ─► backoff ─► connect ─► ...      │
//!            └───────────┬────────────────────────────────────────────┘
//!                        │ BusSink
//!                        ▼
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::future::pending;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at, sleep};
use tracing::{Instrument, debug, info, info_span, trace, warn};
use url::Url;

use crate::bus::BusSink;
use crate::config::BoardConfig;
use crate::error::{Error, Result};
use crate::gateway::{self, CommandOutcome, ControlRequest};
use crate::identifiers::ChannelId;
use crate::protocol::{DeviceCommand, InboundMessage};
use crate::transport::reconnect::CONNECT_POLL_INTERVAL;
use crate::transport::{
    Beat, ConnectionState, Heartbeat, ReconnectPolicy, Transport, TransportEvent,
};
use crate::translate::Translator;

// ============================================================================
// Constants
// ============================================================================

/// Host commands buffered per board.
const COMMAND_CAPACITY: usize = 32;

// ============================================================================
// LinkStatus
// ============================================================================

/// Observable state of one board, published on every transition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkStatus {
    /// Lifecycle state.
    pub state: ConnectionState,
    /// Consecutive failed attempts.
    pub retries: u32,
    /// Board root path, once a config arrived.
    pub root_path: Option<String>,
}

// ============================================================================
// BoardCommand
// ============================================================================

/// Messages from handles to the actor.
enum BoardCommand {
    /// Validate and send a host command.
    Submit {
        request: ControlRequest,
        reply: oneshot::Sender<CommandOutcome>,
    },
    /// Stop for good; acknowledged once the socket is closed.
    Close { done: oneshot::Sender<()> },
}

/// Whether the actor keeps going after a command.
enum Flow {
    Continue,
    Stop,
}

/// How a connect attempt ended.
enum Connect {
    Open(Transport),
    Failed(Error),
    Stopped,
}

/// How an open session ended.
enum SessionEnd {
    Failed(Error),
    Stopped,
}

// ============================================================================
// BoardHandle
// ============================================================================

/// Cheap, cloneable handle to a running board.
#[derive(Clone)]
pub struct BoardHandle {
    host: Arc<str>,
    commands: mpsc::Sender<BoardCommand>,
    status: watch::Receiver<LinkStatus>,
}

impl BoardHandle {
    /// Configured host of the board.
    #[inline]
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Latest published status.
    #[must_use]
    pub fn status(&self) -> LinkStatus {
        self.status.borrow().clone()
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.status.borrow().state
    }

    /// Board root path, once a config arrived.
    #[must_use]
    pub fn root_path(&self) -> Option<String> {
        self.status.borrow().root_path.clone()
    }

    /// Receiver that sees every status change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<LinkStatus> {
        self.status.clone()
    }

    /// Submits a command addressed by a path relative to the board root.
    ///
    /// See [`gateway`](crate::gateway) for the accepted paths.
    pub async fn submit(&self, relative: &str, value: &Value) -> CommandOutcome {
        match ControlRequest::from_path(relative, value) {
            Ok(request) => self.request(request).await,
            Err(e) => CommandOutcome::from_error(&e),
        }
    }

    /// Switches a PWM channel.
    pub async fn set_state(&self, channel: ChannelId, value: bool) -> CommandOutcome {
        match ControlRequest::state(channel, &Value::Bool(value)) {
            Ok(request) => self.request(request).await,
            Err(e) => CommandOutcome::from_error(&e),
        }
    }

    /// Sets a PWM channel's duty cycle.
    pub async fn set_duty(&self, channel: ChannelId, value: f64) -> CommandOutcome {
        match ControlRequest::duty(channel, &Value::from(value)) {
            Ok(request) => self.request(request).await,
            Err(e) => CommandOutcome::from_error(&e),
        }
    }

    /// Stops the board and waits until its socket is closed.
    ///
    /// Returns immediately if the board already stopped.
    pub async fn close(&self) {
        if self.state().is_stopped() {
            return;
        }

        let (done, wait) = oneshot::channel();
        if self.commands.send(BoardCommand::Close { done }).await.is_ok() {
            let _ = wait.await;
        }
    }

    async fn request(&self, request: ControlRequest) -> CommandOutcome {
        let (reply, outcome) = oneshot::channel();
        let sent = self
            .commands
            .send(BoardCommand::Submit { request, reply })
            .await;

        match sent {
            Ok(()) => outcome
                .await
                .unwrap_or_else(|_| CommandOutcome::from_error(&Error::ConnectionClosed)),
            Err(_) => CommandOutcome::from_error(&Error::ConnectionClosed),
        }
    }
}

impl std::fmt::Debug for BoardHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoardHandle")
            .field("host", &self.host)
            .field("status", &*self.status.borrow())
            .finish()
    }
}

// ============================================================================
// BoardConnection
// ============================================================================

/// The actor behind a [`BoardHandle`].
pub struct BoardConnection {
    config: BoardConfig,
    url: Url,
    sink: Arc<dyn BusSink>,
    translator: Translator,
    policy: ReconnectPolicy,
    state: ConnectionState,
    status: watch::Sender<LinkStatus>,
    commands: mpsc::Receiver<BoardCommand>,
    closers: Vec<oneshot::Sender<()>>,
}

impl BoardConnection {
    /// Creates the actor and its handle without starting it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the board settings are invalid.
    pub fn new(
        config: BoardConfig,
        path_prefix: &str,
        sink: Arc<dyn BusSink>,
    ) -> Result<(Self, BoardHandle)> {
        config.validate()?;
        let url = config.ws_url()?;

        let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
        let (status_tx, status_rx) = watch::channel(LinkStatus::default());

        let handle = BoardHandle {
            host: Arc::from(config.host.as_str()),
            commands: command_tx,
            status: status_rx,
        };

        let connection = Self {
            translator: Translator::new(config.host.clone(), path_prefix),
            config,
            url,
            sink,
            policy: ReconnectPolicy::new(),
            state: ConnectionState::Disconnected,
            status: status_tx,
            commands: command_rx,
            closers: Vec::new(),
        };

        Ok((connection, handle))
    }

    /// Creates the actor and runs it on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the board settings are invalid.
    pub fn spawn(
        config: BoardConfig,
        path_prefix: &str,
        sink: Arc<dyn BusSink>,
    ) -> Result<BoardHandle> {
        let (connection, handle) = Self::new(config, path_prefix, sink)?;
        let span = info_span!("board", host = %handle.host());
        tokio::spawn(connection.run().instrument(span));
        Ok(handle)
    }

    /// Runs until the board is closed or every handle is dropped.
    pub async fn run(mut self) {
        info!(url = %self.url, "Board task started");

        loop {
            let reason = match self.connect().await {
                Connect::Open(transport) => match self.run_session(transport).await {
                    SessionEnd::Failed(reason) => reason,
                    SessionEnd::Stopped => break,
                },
                Connect::Failed(reason) => reason,
                Connect::Stopped => break,
            };

            let delay = self.fail(&reason);
            if !self.backoff(delay).await {
                break;
            }
        }

        self.set_state(ConnectionState::Stopped);
        for done in self.closers.drain(..) {
            let _ = done.send(());
        }
        info!("Board task stopped");
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// One connect attempt, polled until it resolves or times out.
    async fn connect(&mut self) -> Connect {
        self.set_state(ConnectionState::Connecting);
        debug!(retry = self.policy.retries(), "Connecting");

        let url = self.url.clone();
        let attempt = Transport::open(&url);
        tokio::pin!(attempt);

        let timeout = self.config.connect_timeout();
        let deadline = sleep(timeout);
        tokio::pin!(deadline);

        let mut poll = interval_at(Instant::now() + CONNECT_POLL_INTERVAL, CONNECT_POLL_INTERVAL);

        loop {
            tokio::select! {
                result = &mut attempt => {
                    return match result {
                        Ok(transport) => Connect::Open(transport),
                        Err(e) => Connect::Failed(e),
                    };
                }

                () = &mut deadline => {
                    let ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
                    return Connect::Failed(Error::connection_timeout(ms));
                }

                _ = poll.tick() => {
                    debug!("Connect still pending");
                }

                command = self.commands.recv() => {
                    if let Flow::Stop = self.handle_command(command, None).await {
                        return Connect::Stopped;
                    }
                }
            }
        }
    }

    /// Drives an open socket until it fails or the owner closes it.
    async fn run_session(&mut self, mut transport: Transport) -> SessionEnd {
        self.policy.reset();
        if !self.config.persist_metadata {
            self.translator.reset_metadata();
        }
        self.set_state(ConnectionState::Open);
        info!("Connected");
        self.sink.report_status(&self.config.host, "Connected");

        let now = Instant::now();
        let mut heartbeat = Heartbeat::new(self.config.ping_interval(), now);

        if self.config.require_login {
            let login = DeviceCommand::login(&self.config.username, &self.config.password);
            transport.send_command(&login).await;
        }

        let grace = sleep(self.config.config_grace());
        tokio::pin!(grace);
        let mut config_requested = false;

        let mut ping = ticker(now, heartbeat.interval());
        let mut poll = self.config.update_interval().map(|every| ticker(now, every));

        loop {
            tokio::select! {
                event = transport.next_event() => {
                    let reason = match event {
                        TransportEvent::Message(text) => {
                            self.dispatch(&text, &mut heartbeat);
                            continue;
                        }
                        TransportEvent::Error(reason) | TransportEvent::Closed(reason) => reason,
                    };
                    self.set_state(ConnectionState::Closing);
                    transport.close().await;
                    return SessionEnd::Failed(Error::connection(reason));
                }

                () = &mut grace, if !config_requested => {
                    config_requested = true;
                    transport.send_command(&DeviceCommand::GetConfig).await;
                }

                _ = ping.tick() => {
                    match heartbeat.check(Instant::now()) {
                        Beat::Ping => {
                            transport.send_command(&DeviceCommand::Ping).await;
                        }
                        Beat::Timeout { silent } => {
                            let silent_ms = u64::try_from(silent.as_millis()).unwrap_or(u64::MAX);
                            warn!(silent_ms, "Heartbeat timeout, closing");
                            self.set_state(ConnectionState::Closing);
                            transport.close().await;
                            return SessionEnd::Failed(Error::connection(format!(
                                "no pong for {silent_ms}ms"
                            )));
                        }
                    }
                }

                () = tick_optional(&mut poll) => {
                    transport.send_command(&DeviceCommand::GetUpdate).await;
                }

                command = self.commands.recv() => {
                    if let Flow::Stop = self.handle_command(command, Some(&mut transport)).await {
                        transport.close().await;
                        return SessionEnd::Stopped;
                    }
                }
            }
        }
    }

    /// Records a failure and returns the backoff delay.
    fn fail(&mut self, reason: &Error) -> Duration {
        let delay = self.policy.record_failure();
        self.set_state(ConnectionState::Closed);

        let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        warn!(retry = self.policy.retries(), delay_ms, error = %reason, "Connection lost");
        self.sink.report_error(
            &self.config.host,
            &format!("[{}] Disconnected: {reason}", self.config.host),
        );

        delay
    }

    /// Waits out the backoff. Returns `false` if stopped meanwhile.
    async fn backoff(&mut self, delay: Duration) -> bool {
        let wait = sleep(delay);
        tokio::pin!(wait);

        loop {
            tokio::select! {
                () = &mut wait => return true,

                command = self.commands.recv() => {
                    if let Flow::Stop = self.handle_command(command, None).await {
                        return false;
                    }
                }
            }
        }
    }

    fn set_state(&mut self, state: ConnectionState) {
        self.state = state;
        self.publish_status();
    }

    fn publish_status(&self) {
        self.status.send_replace(LinkStatus {
            state: self.state,
            retries: self.policy.retries(),
            root_path: self.translator.root_path().map(str::to_string),
        });
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    /// Routes one inbound frame. Malformed frames are dropped.
    fn dispatch(&mut self, text: &str, heartbeat: &mut Heartbeat) {
        let message = match InboundMessage::parse(text) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "Dropped malformed frame");
                return;
            }
        };
        trace!(kind = message.kind(), "Frame received");

        let host = self.config.host.as_str();

        match message {
            InboundMessage::Update(update) => {
                self.translator
                    .translate_update(&update)
                    .publish(self.sink.as_ref(), host);
            }
            InboundMessage::Config(config) => {
                let first = self.translator.config().is_none();
                let batch = self.translator.translate_config(*config);
                if first && let Some(config) = self.translator.config() {
                    info!(
                        root = self.translator.root_path(),
                        name = config.name(),
                        uuid = config.uuid(),
                        "Config received"
                    );
                }
                batch.publish(self.sink.as_ref(), host);
                self.publish_status();
            }
            InboundMessage::Pong => heartbeat.record_pong(Instant::now()),
            InboundMessage::Error(text) => {
                warn!(message = %text, "Board reported error");
                self.sink.report_error(host, &format!("[{host}] {text}"));
            }
            InboundMessage::Success(text) => {
                self.sink.report_status(host, &format!("[{host}] {text}"));
            }
            InboundMessage::Other(value) => {
                debug!(frame = %value, "Unhandled frame");
            }
        }
    }

    /// Handles one message from a handle.
    ///
    /// Valid commands are sent if `transport` is open and dropped otherwise;
    /// either way the outcome is `Completed`.
    async fn handle_command(
        &mut self,
        command: Option<BoardCommand>,
        transport: Option<&mut Transport>,
    ) -> Flow {
        match command {
            None => {
                debug!("Every handle dropped");
                Flow::Stop
            }
            Some(BoardCommand::Close { done }) => {
                info!("Close requested");
                self.closers.push(done);
                Flow::Stop
            }
            Some(BoardCommand::Submit { request, reply }) => {
                let outcome = match gateway::validate(self.translator.config(), &request) {
                    Ok(command) => {
                        match transport {
                            Some(transport) if transport.is_open() => {
                                transport.send_command(&command).await;
                            }
                            _ => debug!(cmd = command.name(), "Socket not open, command dropped"),
                        }
                        CommandOutcome::completed()
                    }
                    Err(e) => {
                        if e.is_rejection() {
                            debug!(error = %e, "Command rejected");
                        } else {
                            warn!(error = %e, "Command failed");
                        }
                        CommandOutcome::from_error(&e)
                    }
                };
                let _ = reply.send(outcome);
                Flow::Continue
            }
        }
    }
}

// ============================================================================
// Timers
// ============================================================================

/// Interval whose first tick is one period after `start`.
fn ticker(start: Instant, every: Duration) -> Interval {
    let mut interval = interval_at(start + every, every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

/// Ticks an optional interval; never resolves when absent.
async fn tick_optional(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => pending().await,
    }
}

// ============================================================================
// Tests
// ============================================================================
