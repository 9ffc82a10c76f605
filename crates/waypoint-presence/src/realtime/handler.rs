//! Incoming Phoenix message classification.

use tracing::{debug, warn};
use waypoint_common::protocol::{events, phx, strip_topic_prefix};
use waypoint_common::{BroadcastPayload, ClientId, PhoenixMessage, PositionEvent, ReplyStatus};

use crate::error::PublishError;

/// What an incoming frame means for the connection loop.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Inbound {
    JoinOk,
    JoinRejected(String),
    Ack {
        msg_ref: String,
        result: Result<(), PublishError>,
    },
    Location(PositionEvent),
    ChannelClosed(String),
    Ignored,
}

/// Per-session facts the classifier needs.
pub(crate) struct InboundContext<'a> {
    pub channel: &'a str,
    pub join_ref: &'a str,
    pub origin: &'a ClientId,
    pub echo_self: bool,
}

/// Classify a single incoming Phoenix message.
pub(crate) fn classify(msg: &PhoenixMessage, ctx: &InboundContext<'_>) -> Inbound {
    if msg.topic == phx::PHOENIX_TOPIC {
        // Heartbeat replies.
        return Inbound::Ignored;
    }

    let topic = strip_topic_prefix(&msg.topic);
    if topic != ctx.channel {
        debug!(topic = %topic, event = %msg.event, "Message for foreign topic");
        return Inbound::Ignored;
    }

    match msg.event.as_str() {
        phx::REPLY => classify_reply(msg, ctx),
        phx::BROADCAST => classify_broadcast(msg, ctx),
        phx::ERROR => {
            warn!(topic = %topic, "Channel error");
            Inbound::ChannelClosed("channel error".into())
        }
        phx::CLOSE => {
            warn!(topic = %topic, "Channel closed");
            Inbound::ChannelClosed("channel closed".into())
        }
        _ => {
            debug!(topic = %topic, event = %msg.event, "Unhandled Phoenix event");
            Inbound::Ignored
        }
    }
}

fn classify_reply(msg: &PhoenixMessage, ctx: &InboundContext<'_>) -> Inbound {
    let (Some(msg_ref), Some(status)) = (msg.msg_ref.as_deref(), msg.reply_status()) else {
        return Inbound::Ignored;
    };

    if msg_ref == ctx.join_ref {
        return match status {
            ReplyStatus::Ok => Inbound::JoinOk,
            ReplyStatus::Error(reason) => Inbound::JoinRejected(reason),
        };
    }

    Inbound::Ack {
        msg_ref: msg_ref.to_string(),
        result: match status {
            ReplyStatus::Ok => Ok(()),
            ReplyStatus::Error(reason) => Err(PublishError::Rejected(reason)),
        },
    }
}

fn classify_broadcast(msg: &PhoenixMessage, ctx: &InboundContext<'_>) -> Inbound {
    let broadcast = match serde_json::from_value::<BroadcastPayload>(msg.payload.clone()) {
        Ok(b) => b,
        Err(e) => {
            warn!(error = %e, "Malformed broadcast payload");
            return Inbound::Ignored;
        }
    };

    if broadcast.event != events::LOCATION {
        debug!(event = %broadcast.event, "Unhandled broadcast event");
        return Inbound::Ignored;
    }

    if !ctx.echo_self && broadcast.origin.as_deref() == Some(ctx.origin.as_str()) {
        debug!("Dropping echo of own broadcast");
        return Inbound::Ignored;
    }

    match serde_json::from_value::<PositionEvent>(broadcast.payload) {
        Ok(event) => Inbound::Location(event),
        Err(e) => {
            warn!(error = %e, "Location broadcast with unexpected shape");
            Inbound::Ignored
        }
    }
}
