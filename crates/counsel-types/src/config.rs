use serde::{Deserialize, Serialize};

/// Top-level client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientConfig {
    pub api_base_url: String,
    pub api_prefix: String,
    pub ai_prefix: String,
    pub timeout_ms: u64,
    /// Token lifetime used when the server omits `expiresIn`
    pub token_ttl_ms: u64,
    pub backend: BackendMode,
    pub mock: MockConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080".to_string(),
            api_prefix: "/api/v1".to_string(),
            ai_prefix: "/api/ai".to_string(),
            timeout_ms: 10_000,
            token_ttl_ms: 24 * 60 * 60 * 1000,
            backend: BackendMode::Remote,
            mock: MockConfig::default(),
        }
    }
}

impl ClientConfig {
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Absolute URL under the REST prefix (`/api/v1`).
    pub fn api_url(&self, path: &str) -> String {
        join_url(&self.api_base_url, &self.api_prefix, path)
    }

    /// Absolute URL under the AI prefix (`/api/ai`).
    pub fn ai_url(&self, path: &str) -> String {
        join_url(&self.api_base_url, &self.ai_prefix, path)
    }

    /// Resolve an avatar or file path against the API base.
    /// Absolute `http(s)://` URLs pass through; empty stays empty.
    pub fn asset_url(&self, path: &str) -> String {
        if path.is_empty() {
            return String::new();
        }
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        join_url(&self.api_base_url, "", path)
    }
}

fn join_url(base: &str, prefix: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let prefix = prefix.trim_matches('/');
    let path = path.trim_start_matches('/');
    match (prefix.is_empty(), path.is_empty()) {
        (true, true) => base.to_string(),
        (true, false) => format!("{}/{}", base, path),
        (false, true) => format!("{}/{}", base, prefix),
        (false, false) => format!("{}/{}/{}", base, prefix, path),
    }
}

/// Which implementation answers auth and chat calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendMode {
    /// Real REST backend
    Remote,
    /// In-browser stand-in for UI development
    Mock,
}

/// Latency knobs for the mock layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MockConfig {
    pub io_delay_ms: u64,
    pub auth_delay_ms: u64,
    pub min_reply_delay_ms: u64,
    pub max_reply_delay_ms: u64,
    pub typing_delay_ms: u64,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            io_delay_ms: 100,
            auth_delay_ms: 1000,
            min_reply_delay_ms: 1000,
            max_reply_delay_ms: 3000,
            typing_delay_ms: 50,
        }
    }
}

impl MockConfig {
    /// All delays zero, for tests.
    pub fn instant() -> Self {
        Self {
            io_delay_ms: 0,
            auth_delay_ms: 0,
            min_reply_delay_ms: 0,
            max_reply_delay_ms: 0,
            typing_delay_ms: 0,
        }
    }
}
