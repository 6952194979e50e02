//! Configuration types for gladns
//!
//! This module defines all configuration structures used throughout the workspace.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// DigitalOcean API v2 base URL
pub const DIGITALOCEAN_API_URL: &str = "https://api.digitalocean.com/v2";

/// Default PowerDNS API base URL
pub const POWERDNS_API_URL: &str = "http://localhost:8081";

/// Main gladns configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GladnsConfig {
    /// Network gateway to poll for node state
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// DNS backend configuration
    pub backend: BackendConfig,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl GladnsConfig {
    /// Create a new configuration with default gateway and engine settings
    pub fn new(backend: BackendConfig) -> Self {
        Self {
            gateway: GatewayConfig::default(),
            backend,
            engine: EngineConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.gateway.validate()?;
        self.backend.validate()?;
        self.engine.validate()?;

        Ok(())
    }
}

/// Network gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Base URL of the gateway (e.g., "http://127.0.0.1:3001")
    pub url: String,

    /// HTTP timeout for one state fetch (in seconds)
    #[serde(default = "default_gateway_timeout_secs")]
    pub timeout_secs: u64,
}

impl GatewayConfig {
    /// Validate the gateway configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        validate_url("Gateway", &self.url)?;
        if self.timeout_secs == 0 {
            return Err(crate::Error::config("Gateway timeout must be > 0"));
        }
        Ok(())
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: default_gateway_url(),
            timeout_secs: default_gateway_timeout_secs(),
        }
    }
}

/// DNS backend configuration
///
/// Each backend declares its own options; none are shared.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackendConfig {
    /// DigitalOcean DNS
    DigitalOcean {
        /// DigitalOcean API token
        api_key: String,
        /// Domain managed on DigitalOcean (e.g., "yourpool.com")
        domain: String,
        /// Sub-domain node records live under
        #[serde(default = "default_cdn_subdomain")]
        cdn_subdomain: String,
        /// API base URL
        #[serde(default = "default_digitalocean_url")]
        base_url: String,
        /// TTL for created records (in seconds)
        #[serde(default = "default_digitalocean_ttl")]
        ttl: u32,
    },

    /// PowerDNS authoritative server HTTP API
    PowerDns {
        /// PowerDNS API key
        api_key: String,
        /// Zone managed on PowerDNS (e.g., "yourpool.com")
        domain: String,
        /// PowerDNS server id
        #[serde(default = "default_powerdns_server")]
        server: String,
        /// API base URL
        #[serde(default = "default_powerdns_url")]
        base_url: String,
        /// Sub-domain node records live under
        #[serde(default = "default_cdn_subdomain")]
        cdn_subdomain: String,
        /// TTL for written rrsets (in seconds)
        #[serde(default = "default_powerdns_ttl")]
        ttl: u32,
    },

    /// Custom backend
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl BackendConfig {
    /// Validate the backend configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            BackendConfig::DigitalOcean {
                api_key,
                domain,
                base_url,
                ttl,
                ..
            } => {
                require("DigitalOcean API key", api_key)?;
                require("DigitalOcean domain", domain)?;
                validate_url("DigitalOcean API", base_url)?;
                validate_ttl(*ttl)
            }
            BackendConfig::PowerDns {
                api_key,
                domain,
                server,
                base_url,
                ttl,
                ..
            } => {
                require("PowerDNS API key", api_key)?;
                require("PowerDNS domain", domain)?;
                require("PowerDNS server", server)?;
                validate_url("PowerDNS API", base_url)?;
                validate_ttl(*ttl)
            }
            BackendConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config("Custom backend factory cannot be empty"));
                }
                if config.is_null() {
                    return Err(crate::Error::config("Custom backend config cannot be null"));
                }
                Ok(())
            }
        }
    }

    /// Get the backend type name
    pub fn type_name(&self) -> &str {
        match self {
            BackendConfig::DigitalOcean { .. } => "digitalocean",
            BackendConfig::PowerDns { .. } => "powerdns",
            BackendConfig::Custom { factory, .. } => factory,
        }
    }
}

// API keys must never reach logs, so Debug is written by hand.
impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendConfig::DigitalOcean {
                domain,
                cdn_subdomain,
                base_url,
                ttl,
                ..
            } => f
                .debug_struct("DigitalOcean")
                .field("api_key", &"<REDACTED>")
                .field("domain", domain)
                .field("cdn_subdomain", cdn_subdomain)
                .field("base_url", base_url)
                .field("ttl", ttl)
                .finish(),
            BackendConfig::PowerDns {
                domain,
                server,
                base_url,
                cdn_subdomain,
                ttl,
                ..
            } => f
                .debug_struct("PowerDns")
                .field("api_key", &"<REDACTED>")
                .field("domain", domain)
                .field("server", server)
                .field("base_url", base_url)
                .field("cdn_subdomain", cdn_subdomain)
                .field("ttl", ttl)
                .finish(),
            BackendConfig::Custom { factory, .. } => f
                .debug_struct("Custom")
                .field("factory", factory)
                .field("config", &"<REDACTED>")
                .finish(),
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Interval between two ticks (in milliseconds)
    ///
    /// A tick that runs longer than this delays the next one; ticks never
    /// overlap.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Capacity of the engine event channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl EngineConfig {
    /// Tick interval as a [`Duration`]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Validate the engine configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.tick_interval_ms == 0 {
            return Err(crate::Error::config("Tick interval must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn require(what: &str, value: &str) -> Result<(), crate::Error> {
    if value.trim().is_empty() {
        return Err(crate::Error::config(format!("{} cannot be empty", what)));
    }
    Ok(())
}

fn validate_url(what: &str, url: &str) -> Result<(), crate::Error> {
    if url.is_empty() {
        return Err(crate::Error::config(format!("{} URL cannot be empty", what)));
    }
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(crate::Error::config(format!(
            "{} URL must use HTTP or HTTPS scheme. Got: {}",
            what, url
        )));
    }
    Ok(())
}

fn validate_ttl(ttl: u32) -> Result<(), crate::Error> {
    if ttl == 0 {
        return Err(crate::Error::config("Record TTL must be > 0"));
    }
    Ok(())
}

fn default_gateway_url() -> String {
    "http://127.0.0.1:3001".to_string()
}

fn default_gateway_timeout_secs() -> u64 {
    10
}

fn default_cdn_subdomain() -> String {
    "cdn".to_string()
}

fn default_digitalocean_url() -> String {
    DIGITALOCEAN_API_URL.to_string()
}

fn default_digitalocean_ttl() -> u32 {
    1800
}

fn default_powerdns_server() -> String {
    "localhost".to_string()
}

fn default_powerdns_url() -> String {
    POWERDNS_API_URL.to_string()
}

fn default_powerdns_ttl() -> u32 {
    1000
}

fn default_tick_interval_ms() -> u64 {
    5000
}

fn default_event_channel_capacity() -> usize {
    1000
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digitalocean() -> BackendConfig {
        BackendConfig::DigitalOcean {
            api_key: "do-secret-token".to_string(),
            domain: "yourpool.com".to_string(),
            cdn_subdomain: default_cdn_subdomain(),
            base_url: default_digitalocean_url(),
            ttl: 1800,
        }
    }

    #[test]
    fn test_defaults_validate() {
        let config = GladnsConfig::new(digitalocean());
        assert!(config.validate().is_ok());
        assert_eq!(config.engine.tick_interval(), Duration::from_secs(5));
        assert_eq!(config.gateway.url, "http://127.0.0.1:3001");
    }

    #[test]
    fn test_missing_api_key_rejected() {
        let config = BackendConfig::PowerDns {
            api_key: String::new(),
            domain: "yourpool.com".to_string(),
            server: default_powerdns_server(),
            base_url: default_powerdns_url(),
            cdn_subdomain: default_cdn_subdomain(),
            ttl: 1000,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_tick_interval_rejected() {
        let mut config = GladnsConfig::new(digitalocean());
        config.engine.tick_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_gateway_url_scheme_checked() {
        let mut config = GladnsConfig::new(digitalocean());
        config.gateway.url = "127.0.0.1:3001".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_backend_deserializes_with_defaults() {
        let json = serde_json::json!({
            "type": "power_dns",
            "api_key": "secret",
            "domain": "yourpool.com"
        });

        let config: BackendConfig = serde_json::from_value(json).unwrap();
        assert_eq!(config.type_name(), "powerdns");
        match config {
            BackendConfig::PowerDns {
                server,
                base_url,
                cdn_subdomain,
                ttl,
                ..
            } => {
                assert_eq!(server, "localhost");
                assert_eq!(base_url, "http://localhost:8081");
                assert_eq!(cdn_subdomain, "cdn");
                assert_eq!(ttl, 1000);
            }
            other => panic!("unexpected config: {:?}", other),
        }
    }

    #[test]
    fn test_api_key_not_exposed_in_debug() {
        let debug_str = format!("{:?}", digitalocean());
        assert!(!debug_str.contains("do-secret-token"));
        assert!(debug_str.contains("yourpool.com"));
    }
}
