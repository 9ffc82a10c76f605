//! Phoenix Channels v1 wire types shared by the presence client and the relay.
//!
//! Every frame is a JSON envelope `{topic, event, payload, ref}`. Channel
//! topics are prefixed with `realtime:`; heartbeats go to the `phoenix` topic.

use serde::{Deserialize, Serialize};

use crate::id::ClientId;
use crate::types::PositionEvent;

/// Broadcast event names carried inside `broadcast` frames.
pub mod events {
    pub const LOCATION: &str = "location";
}

/// Phoenix control events.
pub mod phx {
    pub const JOIN: &str = "phx_join";
    pub const LEAVE: &str = "phx_leave";
    pub const REPLY: &str = "phx_reply";
    pub const ERROR: &str = "phx_error";
    pub const CLOSE: &str = "phx_close";
    pub const HEARTBEAT: &str = "heartbeat";
    pub const BROADCAST: &str = "broadcast";
    pub const PHOENIX_TOPIC: &str = "phoenix";
}

const TOPIC_PREFIX: &str = "realtime:";

/// Wire topic for a channel name.
pub fn topic_for(channel: &str) -> String {
    format!("{TOPIC_PREFIX}{channel}")
}

/// Extract the short channel name from a Phoenix topic (strip "realtime:" prefix).
pub fn strip_topic_prefix(topic: &str) -> &str {
    topic.strip_prefix(TOPIC_PREFIX).unwrap_or(topic)
}

/// A Phoenix protocol message envelope (v1 JSON format).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhoenixMessage {
    pub topic: String,
    pub event: String,
    pub payload: serde_json::Value,
    #[serde(rename = "ref", default)]
    pub msg_ref: Option<String>,
}

impl PhoenixMessage {
    pub fn new(
        topic: impl Into<String>,
        event: impl Into<String>,
        payload: serde_json::Value,
        msg_ref: Option<String>,
    ) -> Self {
        Self {
            topic: topic.into(),
            event: event.into(),
            payload,
            msg_ref,
        }
    }

    pub fn heartbeat(msg_ref: String) -> Self {
        Self::new(
            phx::PHOENIX_TOPIC,
            phx::HEARTBEAT,
            serde_json::json!({}),
            Some(msg_ref),
        )
    }

    /// A `phx_reply` with `status: "ok"`.
    pub fn reply_ok(topic: &str, msg_ref: Option<String>) -> Self {
        Self::new(
            topic,
            phx::REPLY,
            serde_json::json!({ "status": "ok", "response": {} }),
            msg_ref,
        )
    }

    /// A `phx_reply` with `status: "error"` and a reason.
    pub fn reply_error(topic: &str, msg_ref: Option<String>, reason: &str) -> Self {
        Self::new(
            topic,
            phx::REPLY,
            serde_json::json!({ "status": "error", "response": { "reason": reason } }),
            msg_ref,
        )
    }

    /// Interpret this message as a `phx_reply`.
    pub fn reply_status(&self) -> Option<ReplyStatus> {
        if self.event != phx::REPLY {
            return None;
        }
        let status = self.payload.get("status")?.as_str()?;
        if status == "ok" {
            return Some(ReplyStatus::Ok);
        }
        let reason = self
            .payload
            .get("response")
            .and_then(|r| r.get("reason"))
            .and_then(|r| r.as_str())
            .unwrap_or("unknown error")
            .to_string();
        Some(ReplyStatus::Error(reason))
    }
}

/// Outcome carried by a `phx_reply`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyStatus {
    Ok,
    Error(String),
}

/// Channel options sent with `phx_join`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinConfig {
    /// Whether to receive your own broadcasts (the service's "self" key).
    pub self_send: bool,
    /// Whether broadcasts are acknowledged by the service.
    pub ack: bool,
    /// The key identifying this client in presence state.
    pub presence_key: String,
}

impl JoinConfig {
    /// Serialize to the JSON payload expected by `phx_join`.
    pub fn to_join_payload(&self) -> serde_json::Value {
        serde_json::json!({
            "config": {
                "broadcast": {
                    "self": self.self_send,
                    "ack": self.ack
                },
                "presence": {
                    "key": self.presence_key
                }
            }
        })
    }

    /// Read the options back out of a `phx_join` payload. Missing keys
    /// fall back to no echo, no ack and an empty presence key.
    pub fn from_join_payload(payload: &serde_json::Value) -> Self {
        let config = payload.get("config");
        let broadcast = config.and_then(|c| c.get("broadcast"));
        let flag = |name: &str| {
            broadcast
                .and_then(|b| b.get(name))
                .and_then(|v| v.as_bool())
                .unwrap_or(false)
        };
        Self {
            self_send: flag("self"),
            ack: flag("ack"),
            presence_key: config
                .and_then(|c| c.get("presence"))
                .and_then(|p| p.get("key"))
                .and_then(|k| k.as_str())
                .unwrap_or_default()
                .to_string(),
        }
    }
}

/// Payload of a `broadcast` frame.
///
/// `origin` sits next to the application payload so the payload itself
/// keeps exactly the fields other clients expect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BroadcastPayload {
    #[serde(rename = "type")]
    pub kind: String,
    pub event: String,
    pub payload: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

impl BroadcastPayload {
    pub fn location(event: &PositionEvent, origin: &ClientId) -> Result<Self, serde_json::Error> {
        Ok(Self {
            kind: phx::BROADCAST.to_string(),
            event: events::LOCATION.to_string(),
            payload: serde_json::to_value(event)?,
            origin: Some(origin.as_str().to_string()),
        })
    }
}
