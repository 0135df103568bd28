//! Session configuration.
//!
//! Figment-deserialized from defaults / chat.toml / env vars. Two equivalent
//! ways to configure:
//!
//!   chat.toml:   [connection]
//!                max_retries = 3
//!
//!   env var:     CHAT_CONNECTION__MAX_RETRIES=3   (double underscore = nesting)

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level tunable configuration, deserialized by figment.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub connection: ConnectionFileConfig,
    #[serde(default)]
    pub rest: RestFileConfig,
}

/// Realtime-connection tunables (lives under `[connection]` in chat.toml).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConnectionFileConfig {
    #[serde(default = "default_server_url")]
    pub server_url: String,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_typing_debounce_ms")]
    pub typing_debounce_ms: u64,
    /// Defensive client-side expiry for remote typing indicators. The server
    /// owns typing lifecycle; leave unset to trust it (observed behavior).
    #[serde(default)]
    pub remote_typing_ttl_secs: Option<u64>,
}

impl Default for ConnectionFileConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            max_retries: default_max_retries(),
            typing_debounce_ms: default_typing_debounce_ms(),
            remote_typing_ttl_secs: None,
        }
    }
}

/// REST collaborator tunables (lives under `[rest]` in chat.toml).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RestFileConfig {
    #[serde(default = "default_rest_base_url")]
    pub base_url: String,
}

impl Default for RestFileConfig {
    fn default() -> Self {
        Self {
            base_url: default_rest_base_url(),
        }
    }
}

fn default_server_url() -> String {
    "ws://127.0.0.1:8080/ws".to_string()
}

fn default_max_retries() -> u32 {
    5
}

fn default_typing_debounce_ms() -> u64 {
    3000
}

fn default_rest_base_url() -> String {
    "http://127.0.0.1:8080/api".to_string()
}

/// Layer: struct defaults → `chat.toml` in `config_dir` → `CHAT_*` env vars.
pub fn load_config(config_dir: &Path) -> figment::Figment {
    use figment::{
        Figment,
        providers::{Env, Format, Serialized, Toml},
    };

    Figment::from(Serialized::defaults(FileConfig::default()))
        .merge(Toml::file(config_dir.join("chat.toml")))
        .merge(Env::prefixed("CHAT_").split("__"))
}

/// Resolved runtime configuration for one session.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub server_url: String,
    pub rest_base_url: String,
    pub max_retries: u32,
    pub typing_debounce: Duration,
    pub remote_typing_ttl: Option<Duration>,
}

impl SessionConfig {
    pub fn from_file(fc: &FileConfig) -> Self {
        Self {
            server_url: fc.connection.server_url.clone(),
            rest_base_url: fc.rest.base_url.clone(),
            max_retries: fc.connection.max_retries,
            typing_debounce: Duration::from_millis(fc.connection.typing_debounce_ms),
            remote_typing_ttl: fc
                .connection
                .remote_typing_ttl_secs
                .map(Duration::from_secs),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from_file(&FileConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = SessionConfig::default();
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.typing_debounce, Duration::from_secs(3));
        assert!(config.remote_typing_ttl.is_none());
        assert!(config.server_url.starts_with("ws://"));
    }

    #[test]
    fn toml_overrides_defaults() {
        let dir = std::env::temp_dir().join(format!("chat-config-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("chat.toml"),
            "[connection]\nserver_url = \"wss://chat.example.com/ws\"\nmax_retries = 2\n",
        )
        .unwrap();

        let fc: FileConfig = load_config(&dir).extract().unwrap();
        let config = SessionConfig::from_file(&fc);
        assert_eq!(config.server_url, "wss://chat.example.com/ws");
        assert_eq!(config.max_retries, 2);
        // Untouched sections keep their defaults.
        assert_eq!(config.typing_debounce, Duration::from_secs(3));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn ttl_resolves_to_duration() {
        let fc = FileConfig {
            connection: ConnectionFileConfig {
                remote_typing_ttl_secs: Some(8),
                ..Default::default()
            },
            ..Default::default()
        };
        let config = SessionConfig::from_file(&fc);
        assert_eq!(config.remote_typing_ttl, Some(Duration::from_secs(8)));
    }
}
