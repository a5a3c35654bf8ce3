//! Process-level configuration: the engine's own tunables (TOML) and the
//! `sraix` external-service descriptors (§4.5, §6). Bot properties and
//! set/map files are the knowledge base's own concern (`golem-kb`) — this
//! crate only owns configuration that sits *outside* the AIML content
//! itself.

mod sraix;

pub use sraix::{HttpMethod, ResponseFormat, SraixConfig, SraixServiceConfig};

use std::fs;
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Tunables for the matching/evaluation core (§3, §4.2, §5 recursion bounds).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Emitted when `MatchTree::find` returns no candidate (§7 user-visible
    /// behavior).
    pub default_no_match_message: String,
    /// Per-session request/response/that history bound (§3, §4.4).
    pub history_bound: usize,
    /// `srai`/`sr` recursion cap (§4.3, §5).
    pub srai_recursion_limit: u32,
    /// Match-tree traversal depth cap (§4.2, §5).
    pub match_depth_limit: u32,
    /// Path `<learnf>` appends canonical category XML to (§6).
    pub learnf_file: String,
    /// Default `<sraix>` HTTP timeout when a service doesn't override it.
    pub sraix_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_no_match_message: "I don't have any knowledge loaded yet.".to_string(),
            history_bound: 16,
            srai_recursion_limit: 50,
            match_depth_limit: 50,
            learnf_file: "learnf.aiml".to_string(),
            sraix_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self { log_level: "info".to_string() }
    }
}

/// Long-poll bridge configuration (`golem-telegram`): bot token, poll
/// timeout, and the backoff applied after a 409 conflict.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub poll_timeout_secs: u64,
    /// Backoff applied after an HTTP 409 (another poller holds the
    /// long-poll slot) before retrying `getUpdates`.
    pub conflict_backoff_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self { bot_token: String::new(), poll_timeout_secs: 30, conflict_backoff_secs: 5 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub engine: EngineConfig,
    pub telemetry: TelemetryConfig,
    pub telegram: TelegramConfig,
}

impl AppConfig {
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::default();
        if let Ok(raw) = fs::read_to_string(path) {
            config = toml::from_str(&raw)?;
        }
        Ok(config)
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        let rendered = toml::to_string_pretty(self)?;
        fs::write(path, rendered)?;
        Ok(())
    }
}
