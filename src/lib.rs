//! User Stream
//!
//! A user CRUD service with:
//! - an HTTP/JSON API over a pluggable user store (in-memory or PostgreSQL)
//! - an in-process event hub broadcasting every created user
//! - a Server-Sent Events endpoint streaming those users to live clients

pub mod api;
pub mod events;
pub mod store;
pub mod users;

#[cfg(test)]
pub(crate) mod test_helpers;

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// YAML config structs (deserialization targets)
// ============================================================================

/// Top-level YAML configuration file structure
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: ServerYamlConfig,
    pub database: DatabaseYamlConfig,
    pub events: EventsYamlConfig,
}

/// Server configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerYamlConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerYamlConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
        }
    }
}

/// Database configuration section. Without a `url` users live in memory.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseYamlConfig {
    pub url: Option<String>,
    pub max_connections: u32,
}

impl Default for DatabaseYamlConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 5,
        }
    }
}

/// Event stream configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EventsYamlConfig {
    /// Items buffered per subscriber before it is detached
    pub buffer_capacity: usize,
    pub keep_alive_secs: u64,
}

impl Default for EventsYamlConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: events::DEFAULT_BUFFER_CAPACITY,
            keep_alive_secs: 15,
        }
    }
}

// ============================================================================
// Runtime config (what the application actually uses)
// ============================================================================

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    /// PostgreSQL URL: None selects the in-memory store
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub events_buffer_capacity: usize,
    pub events_keep_alive: Duration,
}

fn env_parse<T: std::str::FromStr>(var: &str) -> Option<T> {
    std::env::var(var).ok().and_then(|s| s.parse().ok())
}

impl Config {
    /// Load configuration from an optional YAML file, then override with env vars.
    ///
    /// Priority: env var > YAML > default
    ///
    /// If `yaml_path` is None, tries "config.yaml" in CWD. Fails if the
    /// resulting values are out of range (see [`Config::validate`]).
    pub fn from_yaml_and_env(yaml_path: Option<&Path>) -> Result<Self> {
        let yaml = Self::load_yaml(yaml_path);

        let config = Self {
            server_host: std::env::var("SERVER_HOST").unwrap_or(yaml.server.host),
            server_port: env_parse("SERVER_PORT").unwrap_or(yaml.server.port),
            database_url: std::env::var("DATABASE_URL")
                .ok()
                .filter(|s| !s.is_empty())
                .or(yaml.database.url),
            database_max_connections: env_parse("DATABASE_MAX_CONNECTIONS")
                .unwrap_or(yaml.database.max_connections),
            events_buffer_capacity: env_parse("EVENTS_BUFFER_CAPACITY")
                .unwrap_or(yaml.events.buffer_capacity),
            events_keep_alive: Duration::from_secs(
                env_parse("EVENTS_KEEP_ALIVE_SECS").unwrap_or(yaml.events.keep_alive_secs),
            ),
        };

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    /// Check the event stream settings.
    ///
    /// The buffer capacity must fit a tokio channel (1 to
    /// `Semaphore::MAX_PERMITS`) and keep-alive comments need at least a
    /// one second interval.
    pub fn validate(&self) -> Result<()> {
        let max = tokio::sync::Semaphore::MAX_PERMITS;
        anyhow::ensure!(
            (1..=max).contains(&self.events_buffer_capacity),
            "events.buffer_capacity must be between 1 and {}, got {}",
            max,
            self.events_buffer_capacity
        );
        anyhow::ensure!(
            self.events_keep_alive >= Duration::from_secs(1),
            "events.keep_alive_secs must be at least 1, got {}",
            self.events_keep_alive.as_secs()
        );
        Ok(())
    }

    /// Try to load and parse a YAML config file. Returns defaults on any failure.
    fn load_yaml(yaml_path: Option<&Path>) -> YamlConfig {
        let default_path = Path::new("config.yaml");
        let path = yaml_path.unwrap_or(default_path);

        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_yaml::from_str(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                    YamlConfig::default()
                }
            },
            Err(_) => {
                tracing::debug!(
                    "No config file at {}, using env vars / defaults",
                    path.display()
                );
                YamlConfig::default()
            }
        }
    }

    /// `host:port` the server binds to; the host may be a name or an IP
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub users: users::UserService,
    pub config: Arc<Config>,
}

impl AppState {
    /// Create application state with the configured store
    pub async fn new(config: Config) -> Result<Self> {
        let store: Arc<dyn store::UserStore> = match config.database_url.as_deref() {
            Some(url) => {
                let pg = store::PostgresUserStore::connect(url, config.database_max_connections)
                    .await?;
                pg.init_schema().await?;
                Arc::new(pg)
            }
            None => {
                tracing::info!("No database configured, keeping users in memory");
                Arc::new(store::MemoryUserStore::new())
            }
        };

        Ok(Self::with_store(store, config))
    }

    /// Create application state over an existing store
    pub fn with_store(store: Arc<dyn store::UserStore>, config: Config) -> Self {
        let hub = events::EventHub::new(config.events_buffer_capacity);
        Self {
            users: users::UserService::new(store, hub),
            config: Arc::new(config),
        }
    }

    /// Build the HTTP router for this state
    pub fn router(&self) -> axum::Router {
        api::create_router(Arc::new(api::handlers::ServerState {
            users: self.users.clone(),
            keep_alive: self.config.events_keep_alive,
        }))
    }
}

/// Start the HTTP server and run until Ctrl-C
pub async fn start_server(config: Config) -> Result<()> {
    let addr = config.listen_addr();
    let state = AppState::new(config).await?;
    let app = state.router();

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

// ============================================================================
// Tests
// ============================================================================
