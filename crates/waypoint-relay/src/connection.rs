//! Per-connection handler: join/leave channels, fan out broadcasts, answer
//! heartbeats.

use std::collections::HashMap;
use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tokio_util::sync::CancellationToken;
use waypoint_common::protocol::{phx, strip_topic_prefix};
use waypoint_common::{channel_name_problem, JoinConfig, PhoenixMessage};

use crate::hub::{ConnId, Hub};
use crate::RelayOptions;

/// Frames queued for one client before fan-out starts dropping.
const OUTBOUND_QUEUE: usize = 256;

/// Channels one connection has joined, with the options it joined with.
type Joined = HashMap<String, JoinConfig>;

/// Handle a single WebSocket connection until it closes or `cancel` fires.
pub async fn handle_connection(
    ws: WebSocketStream<TcpStream>,
    addr: SocketAddr,
    conn: ConnId,
    hub: Hub,
    options: &RelayOptions,
    cancel: CancellationToken,
) {
    let (mut sink, mut stream) = ws.split();
    let (tx, mut rx) = mpsc::channel::<String>(OUTBOUND_QUEUE);
    let mut joined: Joined = HashMap::new();

    tracing::info!(peer = %addr, conn, "Client connected");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = sink.send(Message::Close(None)).await;
                break;
            }

            // Broadcasts from other members → this client's WebSocket.
            Some(frame) = rx.recv() => {
                if sink.send(Message::Text(frame.into())).await.is_err() {
                    break;
                }
            }

            frame = stream.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        let msg = match serde_json::from_str::<PhoenixMessage>(text.as_str()) {
                            Ok(msg) => msg,
                            Err(e) => {
                                tracing::debug!(peer = %addr, error = %e, "Invalid Phoenix frame");
                                continue;
                            }
                        };
                        let reply = handle_message(msg, conn, &tx, &hub, options, &mut joined).await;
                        if let Some(reply) = reply {
                            let Ok(json) = serde_json::to_string(&reply) else {
                                continue;
                            };
                            if sink.send(Message::Text(json.into())).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = sink.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(peer = %addr, error = %e, "WS error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    hub.leave_all(conn).await;
    tracing::info!(peer = %addr, conn, channels = joined.len(), "Client disconnected");
}

/// Apply one client message. Returns the reply to send back, if any.
async fn handle_message(
    msg: PhoenixMessage,
    conn: ConnId,
    tx: &mpsc::Sender<String>,
    hub: &Hub,
    options: &RelayOptions,
    joined: &mut Joined,
) -> Option<PhoenixMessage> {
    let topic = msg.topic.as_str();

    match msg.event.as_str() {
        phx::HEARTBEAT if topic == phx::PHOENIX_TOPIC => {
            Some(PhoenixMessage::reply_ok(topic, msg.msg_ref))
        }

        phx::JOIN => {
            let channel = strip_topic_prefix(topic);
            if channel == topic {
                return Some(PhoenixMessage::reply_error(topic, msg.msg_ref, "unknown topic"));
            }
            if let Some(problem) = channel_name_problem(channel) {
                return Some(PhoenixMessage::reply_error(topic, msg.msg_ref, &problem));
            }
            let config = JoinConfig::from_join_payload(&msg.payload);
            hub.join(topic, conn, tx.clone(), config.self_send).await;
            tracing::info!(
                conn,
                topic = %topic,
                self_send = config.self_send,
                ack = config.ack,
                "Joined channel"
            );
            joined.insert(topic.to_string(), config);
            Some(PhoenixMessage::reply_ok(topic, msg.msg_ref))
        }

        phx::LEAVE => {
            joined.remove(topic);
            hub.leave(topic, conn).await;
            tracing::debug!(conn, topic = %topic, "Left channel");
            Some(PhoenixMessage::reply_ok(topic, msg.msg_ref))
        }

        phx::BROADCAST => {
            let Some(config) = joined.get(topic) else {
                return Some(PhoenixMessage::reply_error(topic, msg.msg_ref, "not joined"));
            };
            let ack = config.ack;

            let size = serde_json::to_vec(&msg.payload).map_or(usize::MAX, |v| v.len());
            if size > options.max_payload_bytes {
                tracing::warn!(conn, topic = %topic, size, limit = options.max_payload_bytes, "Broadcast too large");
                return Some(PhoenixMessage::reply_error(topic, msg.msg_ref, "payload too large"));
            }

            let frame = PhoenixMessage::new(topic, phx::BROADCAST, msg.payload, None);
            let Ok(json) = serde_json::to_string(&frame) else {
                return Some(PhoenixMessage::reply_error(topic, msg.msg_ref, "encode failed"));
            };
            let delivered = hub.fan_out(topic, conn, &json).await;
            tracing::debug!(conn, topic = %topic, delivered, "Broadcast");

            ack.then(|| PhoenixMessage::reply_ok(topic, msg.msg_ref))
        }

        other => {
            tracing::debug!(conn, topic = %topic, event = %other, "Unsupported event");
            msg.msg_ref
                .map(|r| PhoenixMessage::reply_error(topic, Some(r), "unsupported event"))
        }
    }
}
