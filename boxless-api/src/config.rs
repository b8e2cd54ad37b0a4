use config::{Config, ConfigError, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ApiConfig {
    pub server: Option<ServerConfig>,
    pub cors: Option<CorsConfig>,
    #[serde(default)]
    pub sync: SyncConfig,
    pub queue: Option<QueueConfig>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            server: Some(ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            }),
            cors: Some(CorsConfig {
                allowed_origins: vec!["http://localhost:3000".to_string()],
            }),
            sync: SyncConfig::default(),
            queue: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

/// Sync engine tuning. Every constant the orchestrator and dispatcher use
/// lives here rather than in the code.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SyncConfig {
    /// Messages fetched per provider page
    pub page_size: usize,
    /// Hard cap on messages fetched in a single run
    pub max_messages_per_run: usize,
    /// Only sync messages newer than this many days
    pub recency_days: u32,
    /// Pause between provider pages within one run
    pub page_delay_secs: u64,
    /// Delay stride between successive users in a sync-all dispatch
    pub stagger_secs: i64,
    /// Sync status rows older than this are purged by the daily sweep
    pub status_retention_days: i64,
    /// Interval of the periodic sync-all dispatcher
    pub periodic_interval_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            page_size: 100,
            max_messages_per_run: 1000,
            recency_days: 30,
            page_delay_secs: 1,
            stagger_secs: 30,
            status_retention_days: 7,
            periodic_interval_secs: 3600,
        }
    }
}

/// Durable task queue settings. When this section is absent the dispatcher
/// runs syncs inline in-process.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct QueueConfig {
    /// Endpoint that accepts task envelopes for deferred HTTP callbacks
    pub queue_url: String,
    /// Public base URL of this API, used to build the callback target
    pub callback_base_url: String,
}

impl ApiConfig {
    pub fn load() -> Result<(Self, PathBuf), ConfigError> {
        let config_path = get_config_path();

        // Create config directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ConfigError::Message(format!("Failed to create config directory: {e}"))
            })?;
        }

        // Create default config file if it doesn't exist
        if !config_path.exists() {
            let default_config = r#"
[server]
host = "127.0.0.1"
port = 8080

[cors]
allowed_origins = ["http://localhost:3000"]

[sync]
# page_size = 100
# max_messages_per_run = 1000
# recency_days = 30
# page_delay_secs = 1
# stagger_secs = 30
# status_retention_days = 7
# periodic_interval_secs = 3600

# Without a [queue] section, sync tasks run inline in this process.
# [queue]
# queue_url = "https://tasks.example.com/queues/email-sync"
# callback_base_url = "https://api.example.com"
"#;
            std::fs::write(&config_path, default_config).map_err(|e| {
                ConfigError::Message(format!("Failed to write default config: {e}"))
            })?;
        }

        let builder = Config::builder()
            .add_source(File::from(config_path.clone()))
            .build()?;

        let config: ApiConfig = builder.try_deserialize()?;

        Ok((config, config_path))
    }
}

pub fn get_config_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        config_dir.join("boxless").join("api.toml")
    } else {
        PathBuf::from("api.toml")
    }
}
