//! Background WebSocket connection loop for one channel.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{Sink, SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot, watch};
use tokio_tungstenite::tungstenite::{self, Message as WsMessage};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use waypoint_common::protocol::{phx, topic_for};
use waypoint_common::{BroadcastPayload, ClientId, JoinConfig, PhoenixMessage, PositionEvent};

use super::handler::{classify, Inbound, InboundContext};
use crate::channel::{ConnectionState, ReconnectPolicy};
use crate::error::{ConnectionFailedError, PublishError};

// ---------------------------------------------------------------------------
// Ref Counter
// ---------------------------------------------------------------------------

/// Monotonically increasing ref counter for Phoenix messages.
static REF_COUNTER: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_ref() -> String {
    REF_COUNTER.fetch_add(1, Ordering::Relaxed).to_string()
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

pub(crate) type AckSender = oneshot::Sender<Result<(), PublishError>>;

/// Commands sent to the connection task by the client handle.
#[derive(Debug)]
pub(crate) enum Command {
    Publish {
        event: PositionEvent,
        ack: Option<AckSender>,
    },
}

/// Everything the connection task needs, fixed at construction.
pub(crate) struct ConnectionParams {
    pub url: String,
    /// Endpoint without the query string, safe to log.
    pub display_endpoint: String,
    pub channel: String,
    pub origin: ClientId,
    pub echo_self: bool,
    pub heartbeat_interval: Duration,
    pub connect_timeout: Duration,
    pub reconnect: Option<ReconnectPolicy>,
}

/// How one connection attempt ended.
enum SessionEnd {
    Cancelled,
    Failed {
        error: ConnectionFailedError,
        was_connected: bool,
    },
}

impl SessionEnd {
    fn failed(error: ConnectionFailedError) -> Self {
        SessionEnd::Failed {
            error,
            was_connected: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Connection Loop
// ---------------------------------------------------------------------------

/// Background task owning the socket. Publishes state changes, forwards
/// publish commands and hands inbound locations to `inbound`.
///
/// Never writes `Closed`; the client handle does that once this task has
/// finished.
pub(crate) async fn connection_loop(
    params: ConnectionParams,
    state: Arc<watch::Sender<ConnectionState>>,
    mut commands: mpsc::Receiver<Command>,
    inbound: mpsc::Sender<PositionEvent>,
    cancel: CancellationToken,
) {
    let mut attempt: u32 = 0;

    loop {
        match run_session(&params, &state, &mut commands, &inbound, &cancel).await {
            SessionEnd::Cancelled => {
                debug!(channel = %params.channel, "Connection task cancelled");
                return;
            }
            SessionEnd::Failed {
                error,
                was_connected,
            } => {
                warn!(channel = %params.channel, error = %error, "Presence connection failed");
                if cancel.is_cancelled() {
                    return;
                }
                set_state(&state, ConnectionState::Failed(error));
                drop_queued(&mut commands);

                let Some(policy) = &params.reconnect else {
                    info!(channel = %params.channel, "No reconnect policy, connection stays failed");
                    return;
                };
                if was_connected {
                    attempt = 0;
                }
                let delay = policy.delay_for(attempt);
                attempt = attempt.saturating_add(1);
                info!(delay_ms = delay.as_millis() as u64, attempt, "Reconnecting");

                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = tokio::time::sleep(delay) => {}
                }
                set_state(&state, ConnectionState::Initializing);
            }
        }
    }
}

/// Fail every publish that was queued while the connection died. Queued
/// samples are stale by the time a new connection exists.
fn drop_queued(commands: &mut mpsc::Receiver<Command>) {
    let mut dropped = 0usize;
    while let Ok(Command::Publish { ack, .. }) = commands.try_recv() {
        if let Some(ack) = ack {
            let _ = ack.send(Err(PublishError::Unavailable("connection lost".into())));
        }
        dropped += 1;
    }
    if dropped > 0 {
        debug!(dropped, "Dropped queued publishes");
    }
}

/// One connect → join → serve cycle.
async fn run_session(
    params: &ConnectionParams,
    state: &watch::Sender<ConnectionState>,
    commands: &mut mpsc::Receiver<Command>,
    inbound: &mpsc::Sender<PositionEvent>,
    cancel: &CancellationToken,
) -> SessionEnd {
    info!(endpoint = %params.display_endpoint, channel = %params.channel, "Connecting to realtime service");

    let connect = tokio::time::timeout(
        params.connect_timeout,
        tokio_tungstenite::connect_async(params.url.as_str()),
    );
    let ws_stream = tokio::select! {
        _ = cancel.cancelled() => return SessionEnd::Cancelled,
        result = connect => match result {
            Ok(Ok((ws_stream, _))) => ws_stream,
            Ok(Err(e)) => return SessionEnd::failed(classify_connect_error(e)),
            Err(_elapsed) => {
                return SessionEnd::failed(ConnectionFailedError::Timeout(params.connect_timeout))
            }
        },
    };

    let (mut sink, mut stream) = ws_stream.split();
    let topic = topic_for(&params.channel);

    // Join the channel.
    let join_ref = next_ref();
    let join = JoinConfig {
        self_send: params.echo_self,
        ack: true,
        presence_key: params.origin.as_str().to_string(),
    };
    let join_msg = PhoenixMessage::new(
        topic.as_str(),
        phx::JOIN,
        join.to_join_payload(),
        Some(join_ref.clone()),
    );
    if let Err(e) = send_message(&mut sink, &join_msg).await {
        return SessionEnd::failed(e);
    }

    let ctx = InboundContext {
        channel: &params.channel,
        join_ref: &join_ref,
        origin: &params.origin,
        echo_self: params.echo_self,
    };
    let mut joined = false;
    let mut pending: HashMap<String, AckSender> = HashMap::new();
    let mut heartbeat = tokio::time::interval_at(
        tokio::time::Instant::now() + params.heartbeat_interval,
        params.heartbeat_interval,
    );
    let join_deadline = tokio::time::sleep(params.connect_timeout);
    tokio::pin!(join_deadline);

    let end = loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                let leave = PhoenixMessage::new(topic.as_str(), phx::LEAVE, serde_json::json!({}), Some(next_ref()));
                let _ = send_message(&mut sink, &leave).await;
                let _ = sink.send(WsMessage::Close(None)).await;
                break SessionEnd::Cancelled;
            }

            _ = &mut join_deadline, if !joined => {
                break SessionEnd::failed(ConnectionFailedError::Timeout(params.connect_timeout));
            }

            frame = stream.next() => match frame {
                Some(Ok(WsMessage::Text(text))) => {
                    let msg = match serde_json::from_str::<PhoenixMessage>(text.as_str()) {
                        Ok(msg) => msg,
                        Err(_) => {
                            debug!(text = %text.as_str(), "Unrecognized message from realtime service");
                            continue;
                        }
                    };
                    match classify(&msg, &ctx) {
                        Inbound::JoinOk => {
                            joined = true;
                            info!(channel = %params.channel, "Joined presence channel");
                            set_state(state, ConnectionState::Connected);
                        }
                        Inbound::JoinRejected(reason) => {
                            break SessionEnd::failed(ConnectionFailedError::Rejected(reason));
                        }
                        Inbound::Ack { msg_ref, result } => match pending.remove(&msg_ref) {
                            Some(tx) => {
                                let _ = tx.send(result);
                            }
                            None => {
                                if let Err(e) = result {
                                    warn!(error = %e, "Publish rejected");
                                }
                            }
                        },
                        Inbound::Location(event) => {
                            if inbound.send(event).await.is_err() {
                                debug!("Inbound dispatcher gone, dropping location");
                            }
                        }
                        Inbound::ChannelClosed(reason) => {
                            break SessionEnd::Failed {
                                error: ConnectionFailedError::ChannelClosed(reason),
                                was_connected: joined,
                            };
                        }
                        Inbound::Ignored => {}
                    }
                }
                Some(Ok(WsMessage::Close(_))) => {
                    info!("Realtime service closed connection");
                    break SessionEnd::Failed {
                        error: ConnectionFailedError::Transport("closed by service".into()),
                        was_connected: joined,
                    };
                }
                Some(Err(e)) => {
                    break SessionEnd::Failed {
                        error: ConnectionFailedError::Transport(e.to_string()),
                        was_connected: joined,
                    };
                }
                None => {
                    break SessionEnd::Failed {
                        error: ConnectionFailedError::Transport("stream ended".into()),
                        was_connected: joined,
                    };
                }
                _ => {}
            },

            cmd = commands.recv(), if joined => match cmd {
                Some(Command::Publish { event, ack }) => {
                    let msg_ref = next_ref();
                    let msg = match BroadcastPayload::location(&event, &params.origin)
                        .and_then(serde_json::to_value)
                    {
                        Ok(payload) => PhoenixMessage::new(topic.as_str(), phx::BROADCAST, payload, Some(msg_ref.clone())),
                        Err(e) => {
                            if let Some(ack) = ack {
                                let _ = ack.send(Err(PublishError::Encode(e.to_string())));
                            }
                            continue;
                        }
                    };
                    if let Err(e) = send_message(&mut sink, &msg).await {
                        if let Some(ack) = ack {
                            let _ = ack.send(Err(PublishError::Unavailable(e.to_string())));
                        }
                        break SessionEnd::Failed { error: e, was_connected: true };
                    }
                    if let Some(ack) = ack {
                        pending.retain(|_, tx| !tx.is_closed());
                        pending.insert(msg_ref, ack);
                    }
                }
                None => {
                    // Every client handle is gone.
                    let _ = sink.send(WsMessage::Close(None)).await;
                    break SessionEnd::Cancelled;
                }
            },

            _ = heartbeat.tick() => {
                if let Err(e) = send_message(&mut sink, &PhoenixMessage::heartbeat(next_ref())).await {
                    break SessionEnd::Failed { error: e, was_connected: joined };
                }
            }
        }
    };

    for (_, tx) in pending.drain() {
        let _ = tx.send(Err(PublishError::Unavailable(
            "connection closed before acknowledgement".into(),
        )));
    }
    end
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Publish a state change unless the client handle already closed.
fn set_state(state: &watch::Sender<ConnectionState>, next: ConnectionState) {
    state.send_if_modified(|current| {
        if *current == ConnectionState::Closed || *current == next {
            return false;
        }
        *current = next;
        true
    });
}

async fn send_message<S>(sink: &mut S, msg: &PhoenixMessage) -> Result<(), ConnectionFailedError>
where
    S: Sink<WsMessage> + Unpin,
    S::Error: std::fmt::Display,
{
    let json = serde_json::to_string(msg)
        .map_err(|e| ConnectionFailedError::Transport(format!("encode failed: {e}")))?;
    sink.send(WsMessage::Text(json.into()))
        .await
        .map_err(|e| ConnectionFailedError::Transport(e.to_string()))
}

fn classify_connect_error(err: tungstenite::Error) -> ConnectionFailedError {
    match err {
        tungstenite::Error::Http(response)
            if matches!(response.status().as_u16(), 401 | 403) =>
        {
            ConnectionFailedError::Unauthorized(format!("HTTP {}", response.status()))
        }
        other => ConnectionFailedError::Transport(other.to_string()),
    }
}
