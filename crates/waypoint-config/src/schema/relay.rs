use serde::{Deserialize, Serialize};

/// Configuration for the local development relay.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Address to listen on.
    pub bind: String,
    /// Accepted API keys. Empty accepts any key.
    pub api_keys: Vec<String>,
    /// Broadcasts larger than this are rejected.
    pub max_payload_bytes: u32,
}

impl std::fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayConfig")
            .field("bind", &self.bind)
            .field("api_keys", &format!("[{} REDACTED]", self.api_keys.len()))
            .field("max_payload_bytes", &self.max_payload_bytes)
            .finish()
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:4000".into(),
            api_keys: Vec::new(),
            max_payload_bytes: 4096,
        }
    }
}
