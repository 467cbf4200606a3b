//! Client builder and connection controller.
//!
//! The [`ClientBuilder`] configures the instrument address and timeouts;
//! the [`Client`] drives the session lifecycle:
//! 1. Connect the transport
//! 2. Send LOGN and wait for ACPT
//! 3. Dispatch inbound ACK / NAK / RSP / STAT frames
//! 4. On unexpected disconnect, run the reconnect ladder
//!
//! # Example
//!
//! ```ignore
//! use cortex_client::{AccessLevel, ClientBuilder, Completion};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ClientBuilder::new("192.168.0.40")?.build();
//!     client.connect(AccessLevel::Master).await?;
//!
//!     let completion = Completion::new()
//!         .on_response(|rsp| println!("temperature: {:?}", rsp.data));
//!     client.send_get(0x0010, &[], completion).await?;
//!     Ok(())
//! }
//! ```

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicI32, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tokio::time::{sleep, timeout};

use crate::diag::{DiagnosticSink, NoopSink};
use crate::error::{CortexError, Result};
use crate::events::{AsyncErrorQueue, ClientEvent, EventHub, SubscriptionId};
use crate::handler::{Completion, Response, StatusRegistry};
use crate::inflight::{AckOutcome, InFlightTable};
use crate::protocol::{
    command_payload, login_payload, AcceptFrame, AccessLevel, AckFrame, LoginIdentity, NakFrame,
    RspFrame, StatFrame, Tag, RSP_HEADER_SIZE, STAT_HEADER_SIZE,
};
use crate::transport::{Connection, ReaderHooks, TransportConfig, DEFAULT_PORT};

/// Default deadline for the ACPT reply to a login.
pub const DEFAULT_LOGIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Default interval between reconnect attempts.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// Default reconnect warning threshold.
pub const DEFAULT_WARNING_DELAY: Duration = Duration::from_secs(5);

/// Default reconnect error threshold.
pub const DEFAULT_ERROR_DELAY: Duration = Duration::from_secs(30);

/// Session lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    /// No session and none being established.
    NotConnected = 0,
    /// Transport up, LOGN sent, waiting for ACPT.
    WaitingForLogin = 1,
    /// Login accepted; commands may be sent.
    Connected = 2,
    /// User-requested teardown in progress.
    DisconnectInProgress = 3,
}

impl ConnectionState {
    fn from_u8(value: u8) -> ConnectionState {
        match value {
            1 => ConnectionState::WaitingForLogin,
            2 => ConnectionState::Connected,
            3 => ConnectionState::DisconnectInProgress,
            _ => ConnectionState::NotConnected,
        }
    }
}

/// Connection parameters for one instrument.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Instrument IPv4 address.
    pub server: Ipv4Addr,
    /// Instrument TCP port.
    pub port: u16,
    /// Transport tunables.
    pub transport: TransportConfig,
    /// Deadline for the ACPT reply to a login.
    pub login_timeout: Duration,
    /// Interval between reconnect attempts.
    pub retry_interval: Duration,
    /// Identity announced in the login frame.
    pub identity: LoginIdentity,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server: Ipv4Addr::LOCALHOST,
            port: DEFAULT_PORT,
            transport: TransportConfig::default(),
            login_timeout: DEFAULT_LOGIN_TIMEOUT,
            retry_interval: DEFAULT_RETRY_INTERVAL,
            identity: LoginIdentity::default(),
        }
    }
}

/// Builder for configuring and creating a [`Client`].
pub struct ClientBuilder {
    config: ClientConfig,
    warning_delay: Duration,
    error_delay: Duration,
    sink: Arc<dyn DiagnosticSink>,
}

impl ClientBuilder {
    /// Create a builder for the given instrument address.
    ///
    /// The address must be an IPv4 literal; anything else is rejected
    /// here, before any connection attempt.
    pub fn new(server: &str) -> Result<Self> {
        let server: Ipv4Addr = server
            .parse()
            .map_err(|_| CortexError::InvalidAddress(server.to_string()))?;
        Ok(Self::from_config(ClientConfig {
            server,
            ..ClientConfig::default()
        }))
    }

    /// Create a builder from a full configuration.
    pub fn from_config(config: ClientConfig) -> Self {
        Self {
            config,
            warning_delay: DEFAULT_WARNING_DELAY,
            error_delay: DEFAULT_ERROR_DELAY,
            sink: Arc::new(NoopSink),
        }
    }

    /// Override the instrument TCP port (default 8080).
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Deadline for establishing the TCP connection.
    pub fn connect_timeout(mut self, deadline: Duration) -> Self {
        self.config.transport.connect_timeout = Some(deadline);
        self
    }

    /// Deadline applied to each outbound frame write.
    pub fn send_timeout(mut self, deadline: Duration) -> Self {
        self.config.transport.send_timeout = Some(deadline);
        self
    }

    /// Deadline applied to each socket read.
    pub fn receive_timeout(mut self, deadline: Duration) -> Self {
        self.config.transport.receive_timeout = Some(deadline);
        self
    }

    /// Maximum accepted payload size.
    pub fn max_frame_size(mut self, size: u32) -> Self {
        self.config.transport.max_frame_size = size;
        self
    }

    /// Deadline for the ACPT reply to a login (default 10 s).
    pub fn login_timeout(mut self, deadline: Duration) -> Self {
        self.config.login_timeout = deadline;
        self
    }

    /// Interval between reconnect attempts (default 1 s).
    pub fn retry_interval(mut self, interval: Duration) -> Self {
        self.config.retry_interval = interval;
        self
    }

    /// Reconnect warning / error thresholds (defaults 5 s / 30 s).
    ///
    /// Ignored unless `warning` is nonzero and `error` exceeds it.
    pub fn comm_failure_timeouts(mut self, warning: Duration, error: Duration) -> Self {
        if warning.is_zero() || error <= warning {
            tracing::warn!(?warning, ?error, "ignoring invalid comm failure timeouts");
            return self;
        }
        self.warning_delay = warning;
        self.error_delay = error;
        self
    }

    /// Identity announced in the login frame
    /// (defaults `"Display"` / `"Cortex"`).
    pub fn identity(mut self, username: &str, machine: &str) -> Self {
        self.config.identity = LoginIdentity {
            username: username.to_string(),
            machine: machine.to_string(),
        };
        self
    }

    /// Install a diagnostic sink for raw protocol traffic.
    pub fn diagnostic_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Build the client.
    ///
    /// Must be called within a Tokio runtime: the async error dispatcher
    /// task is started here.
    pub fn build(self) -> Client {
        let events = Arc::new(EventHub::new());
        let (errors, _dispatcher) = AsyncErrorQueue::start(events.clone());

        Client {
            inner: Arc::new(ClientInner {
                config: self.config,
                sink: self.sink,
                state: AtomicU8::new(ConnectionState::NotConnected as u8),
                granted_access: AtomicI32::new(AccessLevel::Invalid.as_raw()),
                warning_delay_ms: AtomicU64::new(self.warning_delay.as_millis() as u64),
                error_delay_ms: AtomicU64::new(self.error_delay.as_millis() as u64),
                inflight: InFlightTable::new(),
                status: StatusRegistry::new(),
                events,
                errors,
                connection: Mutex::new(None),
                login_waiter: Mutex::new(None),
            }),
        }
    }
}

/// A Cortex protocol client.
///
/// One client owns at most one connection to one instrument. All methods
/// may be called from any task; completion and status handlers run on the
/// connection's reader task.
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: ClientConfig,
    sink: Arc<dyn DiagnosticSink>,
    state: AtomicU8,
    granted_access: AtomicI32,
    warning_delay_ms: AtomicU64,
    error_delay_ms: AtomicU64,
    inflight: InFlightTable,
    status: StatusRegistry,
    events: Arc<EventHub>,
    errors: AsyncErrorQueue,
    connection: Mutex<Option<Arc<Connection>>>,
    login_waiter: Mutex<Option<oneshot::Sender<i32>>>,
}

impl Client {
    /// Create a builder for the given instrument address.
    pub fn builder(server: &str) -> Result<ClientBuilder> {
        ClientBuilder::new(server)
    }

    /// Establish a session at the requested access level.
    ///
    /// Connects the transport, sends LOGN and waits for ACPT. On success
    /// the session is `Connected` and a `Connect` event fires. On any
    /// failure the transport is torn down, the state returns to
    /// `NotConnected` and no event fires.
    ///
    /// # Errors
    ///
    /// [`CortexError::AlreadyConnected`] unless called from
    /// `NotConnected`; transport and [`CortexError::LoginTimeout`] errors
    /// otherwise.
    pub async fn connect(&self, access: AccessLevel) -> Result<()> {
        self.inner.connect(access).await
    }

    /// Tear down the session.
    ///
    /// No-op unless the session is `Connected`. Clears all in-flight
    /// commands, closes the transport and fires exactly one `Disconnect`
    /// event.
    pub async fn disconnect(&self) {
        self.inner.disconnect().await;
    }

    /// Whether a session is established.
    pub fn is_connected(&self) -> bool {
        self.inner.state() == ConnectionState::Connected
    }

    /// Current session state.
    pub fn state(&self) -> ConnectionState {
        self.inner.state()
    }

    /// Access level the instrument granted at login.
    pub fn granted_access(&self) -> AccessLevel {
        self.inner.granted_access_level()
    }

    /// Number of commands awaiting their terminal reply.
    pub fn pending_commands(&self) -> usize {
        self.inner.inflight.len()
    }

    /// Adjust the reconnect warning / error thresholds.
    ///
    /// Silently rejected unless `warning` is nonzero and `error` exceeds
    /// it.
    pub fn set_comm_failure_timeouts(&self, warning: Duration, error: Duration) {
        self.inner.set_comm_failure_timeouts(warning, error);
    }

    /// Current reconnect warning / error thresholds.
    pub fn comm_failure_timeouts(&self) -> (Duration, Duration) {
        (self.inner.warning_delay(), self.inner.error_delay())
    }

    /// Send a GET command.
    ///
    /// Returns the allocated sequence number. Requires an established
    /// session.
    pub async fn send_get(
        &self,
        subcommand: u32,
        data: &[u8],
        completion: Completion,
    ) -> Result<u32> {
        self.inner
            .send_command(Tag::Get, subcommand, data, completion)
            .await
    }

    /// Send an ACTN command.
    ///
    /// Returns the allocated sequence number. Requires an established
    /// session and Master, LocalUI or Engineering access; on a failed
    /// check nothing is written.
    pub async fn send_action(
        &self,
        subcommand: u32,
        data: &[u8],
        completion: Completion,
    ) -> Result<u32> {
        if !self.inner.granted_access_level().can_execute_actions() {
            return Err(CortexError::AccessDenied);
        }
        self.inner
            .send_command(Tag::Action, subcommand, data, completion)
            .await
    }

    /// Drop an in-flight command without waiting for its reply.
    ///
    /// A late ACK/NAK/RSP for the sequence will surface as an
    /// "Unexpected" async error; if the race is lost the completion may
    /// still fire first.
    pub fn cancel_command(&self, sequence: u32) {
        self.inner.inflight.remove(sequence);
    }

    /// Register a handler for one substatus value.
    ///
    /// Returns `false` if a handler is already registered for it.
    pub fn register_status_handler(
        &self,
        substatus: u32,
        handler: impl Fn(u32, &[u8]) + Send + Sync + 'static,
    ) -> bool {
        self.inner.status.register(substatus, handler)
    }

    /// Register the catch-all handler for unrecognized substatus values.
    ///
    /// Returns `false` if a catch-all is already registered.
    pub fn register_unhandled_status_handler(
        &self,
        handler: impl Fn(u32, &[u8]) + Send + Sync + 'static,
    ) -> bool {
        self.inner.status.register_unhandled(handler)
    }

    /// Subscribe to session-established notifications.
    pub fn on_connect(&self, f: impl Fn() + Send + Sync + 'static) -> SubscriptionId {
        self.inner.events.subscribe(ClientEvent::Connect, f)
    }

    /// Subscribe to session-ended notifications.
    pub fn on_disconnect(&self, f: impl Fn() + Send + Sync + 'static) -> SubscriptionId {
        self.inner.events.subscribe(ClientEvent::Disconnect, f)
    }

    /// Subscribe to reconnect warning notifications.
    pub fn on_disconnect_warning(&self, f: impl Fn() + Send + Sync + 'static) -> SubscriptionId {
        self.inner.events.subscribe(ClientEvent::DisconnectWarning, f)
    }

    /// Subscribe to reconnect abandoned notifications.
    pub fn on_disconnect_error(&self, f: impl Fn() + Send + Sync + 'static) -> SubscriptionId {
        self.inner.events.subscribe(ClientEvent::DisconnectError, f)
    }

    /// Subscribe to async error reports.
    pub fn on_async_error(&self, f: impl Fn(&str) + Send + Sync + 'static) -> SubscriptionId {
        self.inner.events.subscribe_async_error(f)
    }

    /// Remove a subscription made with any of the `on_*` methods.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.events.unsubscribe(id)
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        // Last-resort teardown when the owner never called disconnect.
        let connection = self
            .inner
            .connection
            .lock()
            .expect("connection slot poisoned")
            .take();
        if let Some(connection) = connection {
            connection.abort_reader();
        }
    }
}

impl ClientInner {
    fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.store(state as u8, Ordering::Release);
    }

    fn granted_access_level(&self) -> AccessLevel {
        AccessLevel::from_raw(self.granted_access.load(Ordering::Acquire))
    }

    fn warning_delay(&self) -> Duration {
        Duration::from_millis(self.warning_delay_ms.load(Ordering::Acquire))
    }

    fn error_delay(&self) -> Duration {
        Duration::from_millis(self.error_delay_ms.load(Ordering::Acquire))
    }

    fn set_comm_failure_timeouts(&self, warning: Duration, error: Duration) {
        if warning.is_zero() || error <= warning {
            tracing::warn!(?warning, ?error, "ignoring invalid comm failure timeouts");
            return;
        }
        self.warning_delay_ms
            .store(warning.as_millis() as u64, Ordering::Release);
        self.error_delay_ms
            .store(error.as_millis() as u64, Ordering::Release);
    }

    async fn connect(self: &Arc<Self>, access: AccessLevel) -> Result<()> {
        if self
            .state
            .compare_exchange(
                ConnectionState::NotConnected as u8,
                ConnectionState::WaitingForLogin as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return Err(CortexError::AlreadyConnected);
        }

        match self.establish(access).await {
            Ok(granted) => {
                self.granted_access.store(granted.as_raw(), Ordering::Release);
                self.set_state(ConnectionState::Connected);
                tracing::info!(?granted, "session established");
                self.events.emit(ClientEvent::Connect);
                Ok(())
            }
            Err(e) => {
                tracing::warn!("connect failed: {e}");
                self.login_waiter.lock().expect("login waiter poisoned").take();
                let connection = self
                    .connection
                    .lock()
                    .expect("connection slot poisoned")
                    .take();
                if let Some(connection) = connection {
                    connection.disconnect().await;
                }
                self.set_state(ConnectionState::NotConnected);
                Err(e)
            }
        }
    }

    /// Open the transport and run the login exchange.
    async fn establish(self: &Arc<Self>, access: AccessLevel) -> Result<AccessLevel> {
        let addr = SocketAddr::from((self.config.server, self.config.port));
        let connection =
            Connection::open(addr, &self.config.transport, self.reader_hooks()).await?;
        *self
            .connection
            .lock()
            .expect("connection slot poisoned") = Some(connection.clone());

        // Arm the waiter before sending LOGN so an immediate ACPT cannot
        // be missed.
        let (tx, rx) = oneshot::channel();
        *self.login_waiter.lock().expect("login waiter poisoned") = Some(tx);

        let payload = login_payload(
            access.as_raw() as u32,
            connection.local_addr(),
            &self.config.identity,
        );
        self.sink.log("SEND", &payload);
        connection.send_payload(&payload).await?;

        let granted = timeout(self.config.login_timeout, rx)
            .await
            .map_err(|_| CortexError::LoginTimeout)?
            .map_err(|_| CortexError::ConnectionClosed)?;
        Ok(AccessLevel::from_raw(granted))
    }

    async fn disconnect(&self) {
        if self
            .state
            .compare_exchange(
                ConnectionState::Connected as u8,
                ConnectionState::DisconnectInProgress as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            tracing::debug!(state = ?self.state(), "disconnect ignored");
            return;
        }

        self.inflight.clear();
        let connection = self
            .connection
            .lock()
            .expect("connection slot poisoned")
            .take();
        if let Some(connection) = connection {
            connection.disconnect().await;
        }
        self.set_state(ConnectionState::NotConnected);
        self.events.emit(ClientEvent::Disconnect);
    }

    async fn send_command(
        &self,
        tag: Tag,
        subcommand: u32,
        data: &[u8],
        completion: Completion,
    ) -> Result<u32> {
        if self.state() != ConnectionState::Connected {
            return Err(CortexError::NotConnected);
        }
        let connection = self
            .connection
            .lock()
            .expect("connection slot poisoned")
            .clone()
            .ok_or(CortexError::NotConnected)?;

        let sequence = self.inflight.allocate_sequence();
        self.inflight.insert(sequence, completion);

        let payload = command_payload(tag, sequence, subcommand, data);
        self.sink.log("SEND", &payload);
        if let Err(e) = connection.send_payload(&payload).await {
            self.inflight.remove(sequence);
            self.raise_async_error(format!("send failed: {e}"));
            return Err(e);
        }
        Ok(sequence)
    }

    fn reader_hooks(self: &Arc<Self>) -> ReaderHooks {
        let on_payload = Arc::downgrade(self);
        let on_error = Arc::downgrade(self);
        let on_disconnect = Arc::downgrade(self);
        ReaderHooks {
            on_payload: Box::new(move |payload| {
                if let Some(inner) = on_payload.upgrade() {
                    inner.handle_payload(payload);
                }
            }),
            on_error: Box::new(move |description| {
                if let Some(inner) = on_error.upgrade() {
                    inner.raise_async_error(description);
                }
            }),
            on_unexpected_disconnect: Box::new(move || {
                if let Some(inner) = on_disconnect.upgrade() {
                    inner.on_transport_down();
                }
            }),
        }
    }

    /// Inbound dispatch. Runs on the reader task.
    fn handle_payload(&self, payload: &[u8]) {
        self.sink.log("RECV", payload);
        match Tag::of_payload(payload) {
            Some(Tag::Accept) => self.handle_accept(payload),
            Some(Tag::Ack) => self.handle_ack(payload),
            Some(Tag::Nak) => self.handle_nak(payload),
            Some(Tag::Response) => self.handle_response(payload),
            Some(Tag::Status) => self.handle_status(payload),
            _ => self.raise_async_error("Protocol Failure - Unknown MessageType".to_string()),
        }
    }

    fn handle_accept(&self, payload: &[u8]) {
        let Some(accept) = AcceptFrame::parse(payload) else {
            self.raise_async_error("Protocol Failure - Truncated ACPT".to_string());
            return;
        };
        match self.login_waiter.lock().expect("login waiter poisoned").take() {
            Some(waiter) => {
                let _ = waiter.send(accept.granted);
            }
            None => tracing::warn!("ACPT with no login in progress"),
        }
    }

    fn handle_ack(&self, payload: &[u8]) {
        let Some(ack) = AckFrame::parse(payload) else {
            self.raise_async_error("Protocol Failure - Truncated ACK".to_string());
            return;
        };
        match self.inflight.mark_acked(ack.sequence) {
            AckOutcome::Unknown => self.raise_async_error(format!(
                "Protocol Failure - Unexpected ACK (sequence {:#010x})",
                ack.sequence
            )),
            AckOutcome::DoubleAck => self.raise_async_error(format!(
                "Protocol Failure - Double ACK (sequence {:#010x})",
                ack.sequence
            )),
            AckOutcome::Acked(completion) => completion.notify_ack(ack.sequence),
        }
    }

    fn handle_nak(&self, payload: &[u8]) {
        let Some(nak) = NakFrame::parse(payload) else {
            self.raise_async_error("Protocol Failure - Truncated NAK".to_string());
            return;
        };
        match self.inflight.remove(nak.sequence) {
            None => self.raise_async_error(format!(
                "Protocol Failure - Unexpected NAK (sequence {:#010x})",
                nak.sequence
            )),
            Some((_, true)) => self.raise_async_error(format!(
                "Protocol Failure - ACK - NAK (sequence {:#010x})",
                nak.sequence
            )),
            Some((completion, false)) => completion.notify_nak(nak.sequence, nak.status_code),
        }
    }

    fn handle_response(&self, payload: &[u8]) {
        let Some(rsp) = RspFrame::parse(payload) else {
            self.raise_async_error("Protocol Failure - Truncated RSP".to_string());
            return;
        };
        match self.inflight.remove(rsp.sequence) {
            None => self.raise_async_error(format!(
                "Protocol Failure - Unexpected RSP (sequence {:#010x})",
                rsp.sequence
            )),
            Some((_, false)) => self.raise_async_error(format!(
                "Protocol Failure - Missing ACK (sequence {:#010x})",
                rsp.sequence
            )),
            Some((completion, true)) => completion.notify_response(Response {
                sequence: rsp.sequence,
                subcommand: rsp.subcommand,
                status_code: rsp.status_code,
                data: &payload[RSP_HEADER_SIZE..],
            }),
        }
    }

    fn handle_status(&self, payload: &[u8]) {
        // Status before login completion is not an error; it is dropped.
        if self.state() != ConnectionState::Connected {
            return;
        }
        let Some(stat) = StatFrame::parse(payload) else {
            return;
        };
        if let Some(handler) = self.status.lookup(stat.substatus) {
            handler(stat.substatus, &payload[STAT_HEADER_SIZE..]);
        }
    }

    fn raise_async_error(&self, description: String) {
        tracing::warn!("async error: {description}");
        let state = self.state();
        if matches!(
            state,
            ConnectionState::Connected | ConnectionState::WaitingForLogin
        ) {
            self.errors.push(description);
        }
    }

    /// Unexpected transport teardown. Runs on the reader task.
    fn on_transport_down(self: Arc<Self>) {
        self.inflight.clear();
        self.login_waiter.lock().expect("login waiter poisoned").take();

        let state = self.state();
        if state != ConnectionState::Connected {
            // A session that never reached Connected is not recovered.
            tracing::debug!(?state, "transport down outside an established session");
            return;
        }

        self.events.emit(ClientEvent::Disconnect);
        self.set_state(ConnectionState::NotConnected);
        self.connection
            .lock()
            .expect("connection slot poisoned")
            .take();

        let inner = self.clone();
        tokio::spawn(async move {
            inner.run_reconnect().await;
        });
    }

    /// The reconnect ladder: retry at a fixed interval, warn once past
    /// the warning threshold, give up past the error threshold.
    async fn run_reconnect(self: Arc<Self>) {
        let started = Instant::now();
        let access = self.granted_access_level();
        let mut warned = false;
        tracing::info!(?access, "starting reconnect ladder");

        loop {
            sleep(self.config.retry_interval).await;

            match self.connect(access).await {
                Ok(()) => {
                    tracing::info!("reconnected after {:?}", started.elapsed());
                    return;
                }
                // The user reconnected by hand; the ladder is done.
                Err(CortexError::AlreadyConnected) => return,
                Err(e) => tracing::debug!("reconnect attempt failed: {e}"),
            }

            let elapsed = started.elapsed();
            if elapsed > self.error_delay() {
                tracing::error!("reconnect abandoned after {:?}", elapsed);
                self.events.emit(ClientEvent::DisconnectError);
                return;
            }
            if !warned && elapsed > self.warning_delay() {
                warned = true;
                self.events.emit(ClientEvent::DisconnectWarning);
            }
        }
    }
}
