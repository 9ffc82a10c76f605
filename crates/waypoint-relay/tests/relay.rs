use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use waypoint_common::protocol::phx;
use waypoint_common::{JoinConfig, PhoenixMessage, ReplyStatus};
use waypoint_relay::{RelayHandle, RelayOptions, RelayServer};

type Client = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

async fn start(keys: &[&str]) -> RelayHandle {
    let options = RelayOptions {
        api_keys: keys.iter().map(|k| k.to_string()).collect(),
        max_payload_bytes: 512,
    };
    RelayServer::bind("127.0.0.1:0", options)
        .await
        .unwrap()
        .spawn()
        .unwrap()
}

async fn dial(relay: &RelayHandle, key: &str) -> Result<Client, WsError> {
    let url = format!("{}?apikey={key}&vsn=1.0.0", relay.endpoint());
    tokio_tungstenite::connect_async(url).await.map(|(ws, _)| ws)
}

async fn send(ws: &mut Client, msg: &PhoenixMessage) {
    let json = serde_json::to_string(msg).unwrap();
    ws.send(Message::Text(json.into())).await.unwrap();
}

async fn recv(ws: &mut Client) -> PhoenixMessage {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for frame")
            .expect("stream ended")
            .unwrap();
        if let Message::Text(text) = frame {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

async fn join(ws: &mut Client, self_send: bool) {
    let config = JoinConfig {
        self_send,
        ack: true,
        presence_key: "test".into(),
    };
    send(
        ws,
        &PhoenixMessage::new("realtime:ride_01", phx::JOIN, config.to_join_payload(), Some("1".into())),
    )
    .await;
    let reply = recv(ws).await;
    assert_eq!(reply.reply_status(), Some(ReplyStatus::Ok));
}

#[tokio::test]
async fn unknown_key_is_refused_at_upgrade() {
    let relay = start(&["good"]).await;
    match dial(&relay, "bad").await {
        Err(WsError::Http(response)) => assert_eq!(response.status().as_u16(), 401),
        Err(other) => panic!("expected HTTP 401, got {other}"),
        Ok(_) => panic!("expected HTTP 401, got a connection"),
    }
    assert!(dial(&relay, "good").await.is_ok());
    relay.shutdown().await;
}

#[tokio::test]
async fn heartbeat_gets_reply() {
    let relay = start(&[]).await;
    let mut ws = dial(&relay, "any").await.unwrap();
    send(&mut ws, &PhoenixMessage::heartbeat("9".into())).await;
    let reply = recv(&mut ws).await;
    assert_eq!(reply.topic, "phoenix");
    assert_eq!(reply.msg_ref.as_deref(), Some("9"));
    relay.shutdown().await;
}

#[tokio::test]
async fn broadcast_reaches_other_members() {
    let relay = start(&[]).await;
    let mut a = dial(&relay, "k").await.unwrap();
    let mut b = dial(&relay, "k").await.unwrap();
    join(&mut a, false).await;
    join(&mut b, false).await;

    let payload = serde_json::json!({
        "type": "broadcast",
        "event": "location",
        "payload": {"latitude": 1.0, "longitude": 2.0, "timestamp": "2024-01-01T00:00:00.000Z"}
    });
    send(
        &mut a,
        &PhoenixMessage::new("realtime:ride_01", phx::BROADCAST, payload.clone(), Some("2".into())),
    )
    .await;

    let ack = recv(&mut a).await;
    assert_eq!(ack.msg_ref.as_deref(), Some("2"));
    assert_eq!(ack.reply_status(), Some(ReplyStatus::Ok));

    let delivered = recv(&mut b).await;
    assert_eq!(delivered.event, phx::BROADCAST);
    assert_eq!(delivered.payload, payload);
    relay.shutdown().await;
}
