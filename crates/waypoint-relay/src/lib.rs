//! waypoint-relay: a Phoenix Channels v1 broadcast relay.
//!
//! Implements the subset of the realtime service the presence client uses:
//! API-key check at the WebSocket upgrade, channel join/leave, broadcast
//! fan-out honouring the `self` flag, acknowledgements, payload size limits
//! and heartbeats. Used for local development and integration tests.

mod connection;
mod hub;

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::net::{TcpListener, ToSocketAddrs};
use tokio::task::JoinHandle;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_util::sync::CancellationToken;

pub use hub::{ConnId, Hub};

use crate::connection::handle_connection;

/// Relay behaviour shared by every connection.
#[derive(Clone)]
pub struct RelayOptions {
    /// Accepted API keys. Empty accepts any key.
    pub api_keys: Vec<String>,
    /// Largest encoded broadcast payload that is fanned out.
    pub max_payload_bytes: usize,
}

impl std::fmt::Debug for RelayOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayOptions")
            .field("api_keys", &format!("[{} REDACTED]", self.api_keys.len()))
            .field("max_payload_bytes", &self.max_payload_bytes)
            .finish()
    }
}

impl Default for RelayOptions {
    fn default() -> Self {
        Self {
            api_keys: Vec::new(),
            max_payload_bytes: 4096,
        }
    }
}

impl RelayOptions {
    fn accepts(&self, request: &Request) -> bool {
        if self.api_keys.is_empty() {
            return true;
        }
        match api_key_from_query(request.uri().query()) {
            Some(key) => self.api_keys.iter().any(|k| *k == key),
            None => false,
        }
    }
}

/// Extract and decode the `apikey` query parameter.
fn api_key_from_query(query: Option<&str>) -> Option<String> {
    query?
        .split('&')
        .find_map(|pair| pair.strip_prefix("apikey="))
        .and_then(|raw| urlencoding::decode(raw).ok())
        .map(|key| key.into_owned())
}

/// A bound relay that has not started accepting yet.
pub struct RelayServer {
    listener: TcpListener,
    options: Arc<RelayOptions>,
    hub: Hub,
}

impl RelayServer {
    pub async fn bind(addr: impl ToSocketAddrs, options: RelayOptions) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        if options.api_keys.is_empty() {
            tracing::warn!("No API keys configured, relay accepts every client");
        }
        Ok(Self {
            listener,
            options: Arc::new(options),
            hub: Hub::new(),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn hub(&self) -> &Hub {
        &self.hub
    }

    /// Accept connections until `cancel` fires.
    pub async fn run(self, cancel: CancellationToken) {
        let next_conn = AtomicU64::new(1);

        loop {
            let accepted = tokio::select! {
                _ = cancel.cancelled() => break,
                accepted = self.listener.accept() => accepted,
            };

            let (stream, addr) = match accepted {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!(error = %e, "TCP accept error");
                    continue;
                }
            };

            let conn = next_conn.fetch_add(1, Ordering::Relaxed);
            let options = Arc::clone(&self.options);
            let hub = self.hub.clone();
            let cancel = cancel.child_token();

            tokio::spawn(async move {
                let check = |request: &Request, response: Response| {
                    if options.accepts(request) {
                        Ok(response)
                    } else {
                        let mut denied = ErrorResponse::new(Some("invalid api key".into()));
                        *denied.status_mut() = StatusCode::UNAUTHORIZED;
                        Err(denied)
                    }
                };
                match accept_hdr_async(stream, check).await {
                    Ok(ws) => handle_connection(ws, addr, conn, hub, &options, cancel).await,
                    Err(e) => {
                        tracing::warn!(peer = %addr, error = %e, "WS handshake failed");
                    }
                }
            });
        }

        tracing::info!("Relay stopped accepting connections");
    }

    /// Run on a background task.
    pub fn spawn(self) -> std::io::Result<RelayHandle> {
        let addr = self.local_addr()?;
        let cancel = CancellationToken::new();
        let task = tokio::spawn(self.run(cancel.clone()));
        Ok(RelayHandle { addr, cancel, task })
    }
}

/// A relay running on a background task.
pub struct RelayHandle {
    addr: SocketAddr,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl RelayHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// WebSocket endpoint clients connect to.
    pub fn endpoint(&self) -> String {
        format!("ws://{}/socket", self.addr)
    }

    /// Stop accepting, close every connection and wait for the accept loop.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        let _ = self.task.await;
    }
}
