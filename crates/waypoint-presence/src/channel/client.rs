//! Public handle for one presence channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use waypoint_common::{ceil_millis, BroadcastPayload, ClientId, PositionEvent, PositionSample};

use super::config::PresenceConfig;
use super::state::ConnectionState;
use crate::error::{ConnectionConfigError, ConnectionFailedError, PublishError};
use crate::realtime::{connection_loop, Command, ConnectionParams};

/// Outgoing publishes that may wait for the socket task.
const COMMAND_QUEUE: usize = 64;
/// Inbound events buffered between the socket task and the handler.
const INBOUND_QUEUE: usize = 256;
/// How long `dispose` waits for each background task.
const DISPOSE_TIMEOUT: Duration = Duration::from_secs(2);

type Handler = Box<dyn Fn(PositionEvent) + Send + Sync>;

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Handle for one real-time channel connection.
///
/// `publish` never blocks: it queues a command for the background socket
/// task. Inbound `location` events go to the handler registered with
/// `subscribe`. Call `dispose` (or drop the handle) to tear everything down.
pub struct PresenceChannel {
    client_id: ClientId,
    channel: String,
    reconnect_enabled: bool,
    max_payload_bytes: usize,
    ack_timeout: Duration,
    command_tx: mpsc::Sender<Command>,
    state_tx: Arc<watch::Sender<ConnectionState>>,
    handler: Arc<Mutex<Option<Handler>>>,
    last_stamp: Mutex<Option<DateTime<Utc>>>,
    cancel: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    disposed: AtomicBool,
}

impl PresenceChannel {
    /// Validate `config` and start connecting in the background.
    ///
    /// Returns as soon as the tasks are spawned; the state starts at
    /// `Initializing`. Must be called from within a tokio runtime.
    pub fn connect(config: PresenceConfig) -> Result<Self, ConnectionConfigError> {
        config.validate()?;
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| ConnectionConfigError::NoRuntime)?;

        let client_id = ClientId::new();
        let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE);
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_QUEUE);
        let (state_tx, _) = watch::channel(ConnectionState::Initializing);
        let state_tx = Arc::new(state_tx);
        let handler: Arc<Mutex<Option<Handler>>> = Arc::new(Mutex::new(None));
        let cancel = CancellationToken::new();

        let params = ConnectionParams {
            url: config.connect_url(),
            display_endpoint: config.endpoint.clone(),
            channel: config.channel.clone(),
            origin: client_id.clone(),
            echo_self: config.echo_self,
            heartbeat_interval: config.heartbeat_interval,
            connect_timeout: config.connect_timeout,
            reconnect: config.reconnect.clone(),
        };

        info!(
            channel = %config.channel,
            client_id = %client_id,
            echo_self = config.echo_self,
            "Starting presence channel"
        );

        let connection = runtime.spawn(connection_loop(
            params,
            Arc::clone(&state_tx),
            command_rx,
            inbound_tx,
            cancel.clone(),
        ));
        let dispatcher = runtime.spawn(dispatch_inbound(
            inbound_rx,
            Arc::clone(&handler),
            cancel.clone(),
        ));

        Ok(Self {
            client_id,
            channel: config.channel,
            reconnect_enabled: config.reconnect.is_some(),
            max_payload_bytes: config.max_payload_bytes,
            ack_timeout: config.ack_timeout,
            command_tx,
            state_tx,
            handler,
            last_stamp: Mutex::new(None),
            cancel,
            tasks: Mutex::new(vec![connection, dispatcher]),
            disposed: AtomicBool::new(false),
        })
    }

    /// Id sent as `origin` on every broadcast from this client.
    pub fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn state(&self) -> ConnectionState {
        self.state_tx.borrow().clone()
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Wait until the channel is joined.
    ///
    /// Returns the failure as soon as the connection fails and no reconnect
    /// policy is configured; with one, keeps waiting through retries until
    /// `limit` elapses.
    pub async fn wait_connected(&self, limit: Duration) -> Result<(), ConnectionFailedError> {
        let mut rx = self.state_tx.subscribe();
        let reconnect = self.reconnect_enabled;
        let wait = async move {
            loop {
                let current = rx.borrow_and_update().clone();
                match current {
                    ConnectionState::Connected => return Ok(()),
                    ConnectionState::Failed(e) if !reconnect => return Err(e),
                    ConnectionState::Closed => return Err(ConnectionFailedError::Disposed),
                    _ => {}
                }
                if rx.changed().await.is_err() {
                    return Err(ConnectionFailedError::Disposed);
                }
            }
        };
        tokio::time::timeout(limit, wait)
            .await
            .map_err(|_| ConnectionFailedError::Timeout(limit))?
    }

    /// Register the inbound handler, replacing any previous one.
    ///
    /// The handler runs on a runtime worker. It must not call `subscribe`
    /// or `dispose` on the same client.
    pub fn subscribe<F>(&self, handler: F)
    where
        F: Fn(PositionEvent) + Send + Sync + 'static,
    {
        if self.disposed.load(Ordering::SeqCst) {
            debug!("subscribe after dispose ignored");
            return;
        }
        let replaced = lock(&self.handler).replace(Box::new(handler)).is_some();
        debug!(channel = %self.channel, replaced, "Location handler registered");
    }

    /// Stamp `sample` and queue it as one `location` broadcast.
    ///
    /// Does not wait for the service. The returned event is exactly what
    /// was queued.
    pub fn publish(&self, sample: PositionSample) -> Result<PositionEvent, PublishError> {
        let event = self.prepare(sample)?;
        self.enqueue(Command::Publish {
            event: event.clone(),
            ack: None,
        })?;
        debug!(
            latitude = event.latitude,
            longitude = event.longitude,
            timestamp = %event.timestamp,
            "Location queued"
        );
        Ok(event)
    }

    /// Like `publish`, but resolves once the service acknowledged the
    /// broadcast or `ack_timeout` elapsed.
    pub async fn publish_acked(
        &self,
        sample: PositionSample,
    ) -> Result<PositionEvent, PublishError> {
        let event = self.prepare(sample)?;
        let (ack_tx, ack_rx) = oneshot::channel();
        self.enqueue(Command::Publish {
            event: event.clone(),
            ack: Some(ack_tx),
        })?;

        match tokio::time::timeout(self.ack_timeout, ack_rx).await {
            Ok(Ok(Ok(()))) => Ok(event),
            Ok(Ok(Err(e))) => Err(e),
            Ok(Err(_)) => Err(PublishError::Unavailable(
                "connection task dropped the publish".into(),
            )),
            Err(_) => Err(PublishError::Timeout(self.ack_timeout)),
        }
    }

    /// Leave the channel, close the socket and stop both background tasks.
    ///
    /// Once this returns the handler is never invoked again. Safe to call
    /// more than once.
    pub async fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        lock(&self.handler).take();
        self.cancel.cancel();

        let tasks = std::mem::take(&mut *lock(&self.tasks));
        for mut task in tasks {
            if tokio::time::timeout(DISPOSE_TIMEOUT, &mut task).await.is_err() {
                warn!(channel = %self.channel, "Background task did not stop in time, aborting");
                task.abort();
            }
        }

        self.state_tx.send_replace(ConnectionState::Closed);
        info!(channel = %self.channel, client_id = %self.client_id, "Presence channel disposed");
    }

    fn prepare(&self, sample: PositionSample) -> Result<PositionEvent, PublishError> {
        if self.disposed.load(Ordering::SeqCst) {
            return Err(PublishError::Disposed);
        }
        if !sample.is_valid() {
            return Err(PublishError::InvalidSample {
                latitude: sample.latitude,
                longitude: sample.longitude,
            });
        }
        let state = self.state();
        if !state.is_connected() {
            return Err(PublishError::NotConnected(state.name()));
        }

        let event = self.stamp(sample);
        let encoded = BroadcastPayload::location(&event, &self.client_id)
            .and_then(|payload| serde_json::to_vec(&payload))
            .map_err(|e| PublishError::Encode(e.to_string()))?;
        if encoded.len() > self.max_payload_bytes {
            return Err(PublishError::PayloadTooLarge {
                size: encoded.len(),
                limit: self.max_payload_bytes,
            });
        }
        Ok(event)
    }

    /// Stamp with the current time rounded up to the millisecond, never
    /// earlier than the previous stamp.
    fn stamp(&self, sample: PositionSample) -> PositionEvent {
        let mut last = lock(&self.last_stamp);
        let now = ceil_millis(Utc::now());
        let at = match *last {
            Some(prev) if prev > now => prev,
            _ => now,
        };
        *last = Some(at);
        PositionEvent::stamp(sample, at)
    }

    fn enqueue(&self, command: Command) -> Result<(), PublishError> {
        self.command_tx.try_send(command).map_err(|e| match e {
            TrySendError::Full(_) => PublishError::Unavailable("outgoing queue is full".into()),
            TrySendError::Closed(_) => {
                PublishError::Unavailable("connection task has stopped".into())
            }
        })
    }
}

impl Drop for PresenceChannel {
    fn drop(&mut self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        lock(&self.handler).take();
        self.cancel.cancel();
        self.state_tx.send_replace(ConnectionState::Closed);
        debug!(channel = %self.channel, "Presence channel dropped without dispose");
    }
}

// ---------------------------------------------------------------------------
// Inbound dispatch
// ---------------------------------------------------------------------------

/// Deliver inbound events to the registered handler, in arrival order.
async fn dispatch_inbound(
    mut inbound: mpsc::Receiver<PositionEvent>,
    handler: Arc<Mutex<Option<Handler>>>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            event = inbound.recv() => match event {
                Some(event) => {
                    // Held for the call so dispose waits out a running handler.
                    let guard = lock(&handler);
                    match guard.as_ref() {
                        Some(handler) => handler(event),
                        None => debug!("No location handler registered, event dropped"),
                    }
                }
                None => break,
            },
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
