use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{info, warn};

use crate::reputation::{Principal, DEFAULT_MAX_EVENTS};

/// Configuration for the trust ledger service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Security configuration
    pub security: SecurityConfig,
    /// Reputation ledger configuration
    pub ledger: LedgerSettings,
    /// Logging configuration
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host to bind to
    pub host: String,
    /// Server port to bind to
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Enable API key authentication
    pub enable_auth: bool,
    /// Accepted API keys, each bound to the principal it authenticates
    #[serde(skip)]
    pub api_keys: Vec<ApiCredential>,
    /// Rate limit per minute per IP
    pub rate_limit_per_minute: u32,
    /// Maximum request body size in bytes
    pub max_request_size: usize,
}

/// An API key and the principal it acts as, written `principal:key`
#[derive(Clone, PartialEq, Eq)]
pub struct ApiCredential {
    pub principal: Principal,
    pub key: String,
}

impl ApiCredential {
    pub fn new(principal: Principal, key: impl Into<String>) -> Self {
        Self {
            principal,
            key: key.into(),
        }
    }
}

impl FromStr for ApiCredential {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (principal, key) = s
            .trim()
            .split_once(':')
            .context("API key must be written as principal:key")?;

        if key.is_empty() {
            return Err(anyhow::anyhow!("API key for '{}' is empty", principal));
        }

        let principal = Principal::new(principal)
            .with_context(|| format!("Invalid principal '{}' in API key", principal))?;
        Ok(Self::new(principal, key))
    }
}

// Keys never reach logs
impl fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredential")
            .field("principal", &self.principal)
            .field("key", &sanitize_for_logging(&self.key))
            .finish()
    }
}

/// Parse a comma-separated list of `principal:key` entries
pub fn parse_api_credentials(list: &str) -> Result<Vec<ApiCredential>> {
    list.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| entry.parse::<ApiCredential>())
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSettings {
    /// Principal allowed to create categories (the deploying principal)
    pub administrator: String,
    /// Where to persist state; in-memory only when unset
    pub snapshot_path: Option<PathBuf>,
    /// Seconds between background snapshots
    pub snapshot_interval_secs: u64,
    /// Capacity of the in-memory event log
    pub max_events: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Mask client addresses in request logs
    pub sanitize_logs: bool,
    /// Enable request/response logging
    pub log_requests: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8780,
            },
            security: SecurityConfig {
                enable_auth: true,
                api_keys: Vec::new(),
                rate_limit_per_minute: 120,
                max_request_size: 64 * 1024,
            },
            ledger: LedgerSettings {
                administrator: String::new(), // Must be set via environment
                snapshot_path: None,
                snapshot_interval_secs: 60,
                max_events: DEFAULT_MAX_EVENTS,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                sanitize_logs: true,
                log_requests: false,
            },
        }
    }
}

impl LedgerConfig {
    /// Load configuration from environment variables and validate it
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        // Server configuration
        if let Ok(host) = env::var("TRUST_LEDGER_HOST") {
            config.server.host = host;
        }

        if let Ok(port) = env::var("TRUST_LEDGER_PORT") {
            config.server.port = port.parse().context("Invalid TRUST_LEDGER_PORT value")?;
        }

        // Security configuration
        if let Ok(enable_auth) = env::var("TRUST_LEDGER_ENABLE_AUTH") {
            config.security.enable_auth = enable_auth
                .parse()
                .context("Invalid TRUST_LEDGER_ENABLE_AUTH value")?;
        }

        if let Ok(rate_limit) = env::var("TRUST_LEDGER_RATE_LIMIT_PER_MINUTE") {
            config.security.rate_limit_per_minute = rate_limit
                .parse()
                .context("Invalid TRUST_LEDGER_RATE_LIMIT_PER_MINUTE value")?;
        }

        if let Ok(max_size) = env::var("TRUST_LEDGER_MAX_REQUEST_SIZE") {
            config.security.max_request_size = max_size
                .parse()
                .context("Invalid TRUST_LEDGER_MAX_REQUEST_SIZE value")?;
        }

        config.security.api_keys = Self::load_api_keys()?;

        // Ledger configuration
        config.ledger.administrator = env::var("TRUST_LEDGER_ADMINISTRATOR")
            .context("TRUST_LEDGER_ADMINISTRATOR environment variable is required")?;

        if let Ok(path) = env::var("TRUST_LEDGER_SNAPSHOT_PATH") {
            if !path.is_empty() {
                config.ledger.snapshot_path = Some(PathBuf::from(path));
            }
        }

        if let Ok(interval) = env::var("TRUST_LEDGER_SNAPSHOT_INTERVAL_SECS") {
            config.ledger.snapshot_interval_secs = interval
                .parse()
                .context("Invalid TRUST_LEDGER_SNAPSHOT_INTERVAL_SECS value")?;
        }

        if let Ok(max_events) = env::var("TRUST_LEDGER_MAX_EVENTS") {
            config.ledger.max_events = max_events
                .parse()
                .context("Invalid TRUST_LEDGER_MAX_EVENTS value")?;
        }

        // Logging configuration
        if let Ok(log_level) = env::var("TRUST_LEDGER_LOG_LEVEL") {
            config.logging.level = log_level;
        }

        if let Ok(log_requests) = env::var("TRUST_LEDGER_LOG_REQUESTS") {
            config.logging.log_requests = log_requests
                .parse()
                .context("Invalid TRUST_LEDGER_LOG_REQUESTS value")?;
        }

        if let Ok(sanitize_logs) = env::var("TRUST_LEDGER_SANITIZE_LOGS") {
            config.logging.sanitize_logs = sanitize_logs
                .parse()
                .context("Invalid TRUST_LEDGER_SANITIZE_LOGS value")?;
        }

        config.validate()?;

        Ok(config)
    }

    /// `principal:key` entries from TRUST_LEDGER_API_KEY and TRUST_LEDGER_API_KEYS
    fn load_api_keys() -> Result<Vec<ApiCredential>> {
        let mut keys = Vec::new();

        if let Ok(key) = env::var("TRUST_LEDGER_API_KEY") {
            keys.extend(parse_api_credentials(&key).context("Invalid TRUST_LEDGER_API_KEY")?);
        }

        if let Ok(extra_keys) = env::var("TRUST_LEDGER_API_KEYS") {
            keys.extend(
                parse_api_credentials(&extra_keys).context("Invalid TRUST_LEDGER_API_KEYS")?,
            );
        }

        if keys.is_empty() {
            warn!("No API keys configured");
        } else {
            info!("Loaded {} API key(s) for authentication", keys.len());
        }

        Ok(keys)
    }

    /// Validate configuration for security and consistency
    pub fn validate(&self) -> Result<()> {
        if self.server.host.is_empty() {
            return Err(anyhow::anyhow!("Server host cannot be empty"));
        }

        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port must be non-zero"));
        }

        self.administrator()?;

        if self.security.enable_auth && self.security.api_keys.is_empty() {
            return Err(anyhow::anyhow!(
                "Authentication is enabled but no API keys are configured \
                 (set TRUST_LEDGER_API_KEY or TRUST_LEDGER_API_KEYS)"
            ));
        }

        let mut seen = std::collections::HashSet::new();
        if !self.security.api_keys.iter().all(|c| seen.insert(c.key.as_str())) {
            return Err(anyhow::anyhow!("The same API key is bound to more than one entry"));
        }

        if !self.security.enable_auth {
            warn!("Authentication disabled: callers name themselves via x-principal");
        }

        if self.security.max_request_size == 0 {
            return Err(anyhow::anyhow!("Maximum request size must be non-zero"));
        }

        if self.ledger.max_events == 0 {
            return Err(anyhow::anyhow!("Event log capacity must be non-zero"));
        }

        if self.ledger.snapshot_path.is_some() && self.ledger.snapshot_interval_secs == 0 {
            return Err(anyhow::anyhow!("Snapshot interval must be non-zero"));
        }

        Ok(())
    }

    /// The administrator as a validated principal
    pub fn administrator(&self) -> Result<Principal> {
        Principal::new(self.ledger.administrator.clone())
            .with_context(|| format!("Invalid administrator principal '{}'", self.ledger.administrator))
    }
}

/// Mask a value for logging, keeping a short prefix and suffix
pub fn sanitize_for_logging(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}
