//! Topic membership: maps channel topics to the connections joined to them.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};

/// Connection id assigned by the accept loop.
pub type ConnId = u64;

/// One connection joined to one topic.
#[derive(Clone)]
struct Member {
    tx: mpsc::Sender<String>,
    /// Receive this connection's own broadcasts.
    self_send: bool,
}

/// Thread-safe topic registry shared by all connections.
#[derive(Clone, Default)]
pub struct Hub {
    topics: Arc<RwLock<HashMap<String, HashMap<ConnId, Member>>>>,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or re-add) a connection to a topic.
    pub async fn join(&self, topic: &str, conn: ConnId, tx: mpsc::Sender<String>, self_send: bool) {
        let mut map = self.topics.write().await;
        map.entry(topic.to_string())
            .or_default()
            .insert(conn, Member { tx, self_send });
    }

    /// Remove a connection from a topic. Returns true if it was a member.
    pub async fn leave(&self, topic: &str, conn: ConnId) -> bool {
        let mut map = self.topics.write().await;
        let Some(members) = map.get_mut(topic) else {
            return false;
        };
        let removed = members.remove(&conn).is_some();
        if members.is_empty() {
            map.remove(topic);
        }
        removed
    }

    /// Remove a connection from every topic.
    pub async fn leave_all(&self, conn: ConnId) {
        let mut map = self.topics.write().await;
        map.retain(|_, members| {
            members.remove(&conn);
            !members.is_empty()
        });
    }

    /// Send `frame` to every member of `topic`. The sender only gets a copy
    /// when it joined with `self_send`. Returns the number of recipients.
    pub async fn fan_out(&self, topic: &str, from: ConnId, frame: &str) -> usize {
        let recipients: Vec<(ConnId, mpsc::Sender<String>)> = {
            let map = self.topics.read().await;
            let Some(members) = map.get(topic) else {
                return 0;
            };
            members
                .iter()
                .filter(|(id, member)| **id != from || member.self_send)
                .map(|(id, member)| (*id, member.tx.clone()))
                .collect()
        };

        let mut delivered = 0;
        for (id, tx) in recipients {
            match tx.try_send(frame.to_string()) {
                Ok(()) => delivered += 1,
                Err(e) => tracing::warn!(topic = %topic, conn = id, error = %e, "Dropping broadcast for slow member"),
            }
        }
        delivered
    }

    pub async fn member_count(&self, topic: &str) -> usize {
        self.topics
            .read()
            .await
            .get(topic)
            .map_or(0, HashMap::len)
    }

    /// Number of topics with at least one member.
    pub async fn topic_count(&self) -> usize {
        self.topics.read().await.len()
    }
}
