//! Command line interface
//!
//! Every flag can also be set through the environment variable named in its
//! help text. Backend subcommands select the connector; global flags apply
//! to all of them.

use clap::{Args, Parser, Subcommand};
use gladns_core::config::{
    BackendConfig, DIGITALOCEAN_API_URL, EngineConfig, GatewayConfig, GladnsConfig,
};
use tracing::Level;

#[derive(Parser)]
#[command(
    name = "gladnsd",
    version,
    about = "Keeps DNS A records in line with the nodes of a Gladius network",
    long_about = None
)]
pub struct Cli {
    /// Base URL of the network gateway
    #[arg(
        long = "gateway_url",
        env = "GLADNS_GATEWAY_URL",
        default_value = "http://127.0.0.1:3001",
        global = true
    )]
    pub gateway_url: String,

    /// Seconds between two gateway polls
    #[arg(
        long = "tick_rate",
        env = "GLADNS_TICK_RATE",
        value_name = "SECONDS",
        default_value_t = 5,
        global = true
    )]
    pub tick_rate: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(
        long = "log_level",
        env = "GLADNS_LOG_LEVEL",
        default_value = "info",
        global = true
    )]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// List the registered connectors
    List,

    /// Sync node records into DigitalOcean DNS
    #[command(name = "digitalocean")]
    DigitalOcean(DigitalOceanArgs),

    /// Sync node records into a PowerDNS authoritative server
    #[command(name = "powerdns")]
    PowerDns(PowerDnsArgs),
}

#[derive(Args)]
pub struct DigitalOceanArgs {
    /// The DigitalOcean API key
    #[arg(long = "api_key", env = "DO_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// The domain on DigitalOcean DNS
    #[arg(long = "domain", env = "DO_DOMAIN", value_name = "yourpool.com")]
    pub domain: String,

    /// The cdn subdomain for nodes
    #[arg(long = "cdn_subdomain", env = "DO_CDN_SUBDOMAIN", default_value = "cdn")]
    pub cdn_subdomain: String,

    /// TTL of written records in seconds
    #[arg(long = "ttl", env = "DO_TTL", default_value_t = 1800)]
    pub ttl: u32,

    #[command(flatten)]
    pub remove: RemoveArgs,
}

#[derive(Args)]
pub struct PowerDnsArgs {
    /// The PowerDNS API key
    #[arg(long = "api_key", env = "PDNS_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// The base domain (zone) on PowerDNS
    #[arg(long = "domain", env = "PDNS_DOMAIN", value_name = "yourpool.com")]
    pub domain: String,

    /// The PowerDNS server id
    #[arg(long = "server", env = "PDN_SERVER", default_value = "localhost")]
    pub server: String,

    /// The API URL for PowerDNS
    #[arg(long = "baseurl", env = "PDN_URL", default_value = gladns_core::config::POWERDNS_API_URL)]
    pub base_url: String,

    /// The cdn subdomain for nodes
    #[arg(long = "cdn_subdomain", env = "PDN_CDN_SUBDOMAIN", default_value = "cdn")]
    pub cdn_subdomain: String,

    /// TTL of written rrsets in seconds
    #[arg(long = "ttl", env = "PDN_TTL", default_value_t = 1000)]
    pub ttl: u32,

    #[command(flatten)]
    pub remove: RemoveArgs,
}

#[derive(Args)]
pub struct RemoveArgs {
    /// Delete the record of this node address and exit (repeatable)
    #[arg(long = "remove", value_name = "ADDRESS")]
    pub addresses: Vec<String>,
}

impl Cli {
    /// Max level for the tracing subscriber
    pub fn log_level(&self) -> anyhow::Result<Level> {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Ok(Level::TRACE),
            "debug" => Ok(Level::DEBUG),
            "info" => Ok(Level::INFO),
            "warn" => Ok(Level::WARN),
            "error" => Ok(Level::ERROR),
            _ => anyhow::bail!(
                "Log level '{}' is not valid. Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }
    }

    /// Full configuration for a backend subcommand (`None` for `list`)
    pub fn config(&self) -> Option<GladnsConfig> {
        let backend = match &self.command {
            Command::List => return None,
            Command::DigitalOcean(args) => BackendConfig::DigitalOcean {
                api_key: args.api_key.clone(),
                domain: args.domain.clone(),
                cdn_subdomain: args.cdn_subdomain.clone(),
                base_url: DIGITALOCEAN_API_URL.to_string(),
                ttl: args.ttl,
            },
            Command::PowerDns(args) => BackendConfig::PowerDns {
                api_key: args.api_key.clone(),
                domain: args.domain.clone(),
                server: args.server.clone(),
                base_url: args.base_url.clone(),
                cdn_subdomain: args.cdn_subdomain.clone(),
                ttl: args.ttl,
            },
        };

        Some(GladnsConfig {
            gateway: GatewayConfig {
                url: self.gateway_url.clone(),
                ..GatewayConfig::default()
            },
            backend,
            engine: EngineConfig {
                tick_interval_ms: self.tick_rate.saturating_mul(1000),
                ..EngineConfig::default()
            },
        })
    }

    /// Addresses passed with `--remove`
    pub fn removals(&self) -> &[String] {
        match &self.command {
            Command::List => &[],
            Command::DigitalOcean(args) => &args.remove.addresses,
            Command::PowerDns(args) => &args.remove.addresses,
        }
    }
}
