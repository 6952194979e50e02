// # PowerDNS Backend
//
// This crate provides the PowerDNS authoritative server backend for gladns.
//
// PowerDNS works on rrsets (all records sharing a name and type) rather than
// individual records, so:
//
// - Record identity is the fully qualified rrset name
//   (`<address>.<cdn_subdomain>.<zone>.`)
// - Create and update are both a `REPLACE` of the rrset
// - Delete is a `DELETE` of the rrset
//
// ## Security Requirements
//
// - API key NEVER appears in logs or `Debug` output
// - Backend construction fails if the key is empty
//
// ## API Reference
//
// - Zone with rrsets: GET `/api/v1/servers/:server/zones/:zone`
// - Change rrsets: PATCH `/api/v1/servers/:server/zones/:zone`

use async_trait::async_trait;
use gladns_core::config::BackendConfig;
use gladns_core::naming::NameScheme;
use gladns_core::registry::ConnectorRegistry;
use gladns_core::traits::{
    Connector, ConnectorFactory, DnsBackend, MANAGED_RECORD_TYPE, ProviderRecord,
};
use gladns_core::{Error, Reconciler, Result};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::time::Duration;

/// Name this backend registers under
pub const PROVIDER_NAME: &str = "powerdns";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// PowerDNS backend
///
/// # Security
///
/// The Debug implementation does NOT expose the API key.
pub struct PowerDnsBackend {
    /// PowerDNS API key
    /// ⚠️ NEVER log this value
    api_key: String,

    /// `{base_url}/api/v1/servers/{server}/zones/{zone}`
    zone_url: String,

    /// Canonical zone name (lower-case, trailing dot)
    zone: String,

    /// TTL for written rrsets
    ttl: u32,

    /// `<key>.<cdn_subdomain>.<zone>.` naming
    scheme: NameScheme,

    /// HTTP client for API requests
    client: reqwest::Client,
}

impl std::fmt::Debug for PowerDnsBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PowerDnsBackend")
            .field("api_key", &"<REDACTED>")
            .field("zone_url", &self.zone_url)
            .field("ttl", &self.ttl)
            .field("scheme", &self.scheme)
            .finish()
    }
}

/// `GET /zones/:zone` response (only the fields used here)
#[derive(Debug, Deserialize)]
struct Zone {
    #[serde(default)]
    rrsets: Vec<RrSet>,
}

#[derive(Debug, Deserialize)]
struct RrSet {
    name: String,
    #[serde(rename = "type")]
    record_type: String,
    #[serde(default)]
    ttl: Option<u32>,
    #[serde(default)]
    records: Vec<RrRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RrRecord {
    content: String,
    #[serde(default)]
    disabled: bool,
}

/// `PATCH /zones/:zone` body
#[derive(Debug, Serialize)]
struct ZonePatch<'a> {
    rrsets: Vec<RrSetChange<'a>>,
}

#[derive(Debug, Serialize)]
struct RrSetChange<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    record_type: &'a str,
    changetype: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    ttl: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    records: Vec<RrRecord>,
}

impl PowerDnsBackend {
    /// Create a new PowerDNS backend
    ///
    /// # Parameters
    ///
    /// - `api_key`: PowerDNS API key
    /// - `domain`: Zone managed on PowerDNS (e.g., "yourpool.com")
    /// - `server`: PowerDNS server id (usually "localhost")
    /// - `base_url`: API base URL (e.g., "http://localhost:8081")
    /// - `cdn_subdomain`: Sub-domain node records live under (e.g., "cdn")
    /// - `ttl`: TTL for written rrsets
    pub fn new(
        api_key: impl Into<String>,
        domain: &str,
        server: &str,
        base_url: &str,
        cdn_subdomain: &str,
        ttl: u32,
    ) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(Error::config("PowerDNS API key cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        let zone = canonical_zone(domain);
        let zone_url = format!(
            "{}/api/v1/servers/{}/zones/{}",
            base_url.trim_end_matches('/'),
            server,
            zone
        );

        Ok(Self {
            api_key,
            zone_url,
            scheme: NameScheme::fully_qualified(cdn_subdomain, &zone),
            zone,
            ttl,
            client,
        })
    }

    /// Create a backend from a `BackendConfig::PowerDns`
    pub fn from_config(config: &BackendConfig) -> Result<Self> {
        match config {
            BackendConfig::PowerDns {
                api_key,
                domain,
                server,
                base_url,
                cdn_subdomain,
                ttl,
            } => {
                config.validate()?;
                Self::new(api_key.clone(), domain, server, base_url, cdn_subdomain, *ttl)
            }
            _ => Err(Error::config("Invalid config for PowerDNS backend")),
        }
    }

    /// Canonical zone name
    pub fn zone(&self) -> &str {
        &self.zone
    }

    fn request(&self, method: Method) -> RequestBuilder {
        self.client
            .request(method, &self.zone_url)
            .header("X-API-Key", &self.api_key)
    }

    /// Send a request and return the response if it succeeded
    async fn send(&self, request: RequestBuilder, action: &str) -> Result<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| Error::http(format!("PowerDNS request failed: {}", e)))?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error response".to_string());

        Err(status_error(status, action, &self.zone, &error_text))
    }

    /// Apply one rrset change to the zone
    async fn patch(&self, change: RrSetChange<'_>, action: &str) -> Result<()> {
        let body = ZonePatch {
            rrsets: vec![change],
        };
        self.send(self.request(Method::PATCH).json(&body), action)
            .await?;
        Ok(())
    }

    /// REPLACE the A rrset `name` with a single record
    async fn replace(&self, name: &str, ip: IpAddr, action: &str) -> Result<ProviderRecord> {
        let change = RrSetChange {
            name,
            record_type: MANAGED_RECORD_TYPE,
            changetype: "REPLACE",
            ttl: Some(self.ttl),
            records: vec![RrRecord {
                content: ip.to_string(),
                disabled: false,
            }],
        };
        self.patch(change, action).await?;

        Ok(ProviderRecord {
            id: name.to_string(),
            name: name.to_string(),
            record_type: MANAGED_RECORD_TYPE.to_string(),
            data: ip.to_string(),
            ttl: Some(self.ttl),
            needs_rewrite: false,
        })
    }
}

/// `yourpool.com` → `yourpool.com.`
fn canonical_zone(domain: &str) -> String {
    format!("{}.", domain.trim().trim_end_matches('.').to_lowercase())
}

/// One `ProviderRecord` per rrset
///
/// An rrset with anything but exactly one enabled record is flagged for
/// rewrite, so the next `REPLACE` leaves a single value behind.
fn collapse_rrset(rrset: RrSet) -> Option<ProviderRecord> {
    let RrSet {
        name,
        record_type,
        ttl,
        records,
    } = rrset;

    let enabled: Vec<&RrRecord> = records.iter().filter(|record| !record.disabled).collect();
    let data = match enabled.first() {
        Some(record) => record.content.clone(),
        None => records.first()?.content.clone(),
    };

    Some(ProviderRecord {
        id: name.clone(),
        name,
        record_type,
        data,
        ttl,
        needs_rewrite: enabled.len() != 1,
    })
}

/// Map a non-success status to an error
fn status_error(status: StatusCode, action: &str, zone: &str, error_text: &str) -> Error {
    match status.as_u16() {
        401 | 403 => Error::auth(format!(
            "PowerDNS rejected the API key ({}). Status: {}",
            action, status
        )),
        404 => Error::not_found(format!("Zone {} ({}): {}", zone, action, error_text)),
        422 => Error::provider(
            PROVIDER_NAME,
            format!("PowerDNS rejected the {}: {}", action, error_text),
        ),
        500..=599 => Error::provider(
            PROVIDER_NAME,
            format!("PowerDNS server error (transient) during {}: {} - {}", action, status, error_text),
        ),
        _ => Error::provider(
            PROVIDER_NAME,
            format!("{} failed: {} - {}", action, status, error_text),
        ),
    }
}

#[async_trait]
impl DnsBackend for PowerDnsBackend {
    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn name_scheme(&self) -> &NameScheme {
        &self.scheme
    }

    async fn authenticate(&self) -> Result<()> {
        // Fails with 404 when the zone is missing as well
        self.send(self.request(Method::GET), "zone lookup").await?;
        tracing::debug!("PowerDNS API key accepted for zone {}", self.zone);
        Ok(())
    }

    async fn list_records(&self) -> Result<Vec<ProviderRecord>> {
        let zone: Zone = self
            .send(self.request(Method::GET), "zone listing")
            .await?
            .json()
            .await
            .map_err(|e| Error::provider(PROVIDER_NAME, format!("Failed to parse zone: {}", e)))?;

        let records = zone.rrsets.into_iter().filter_map(collapse_rrset).collect();

        Ok(records)
    }

    async fn create_record(&self, name: &str, ip: IpAddr) -> Result<ProviderRecord> {
        self.replace(name, ip, "rrset creation").await
    }

    async fn update_record(&self, id: &str, _name: &str, ip: IpAddr) -> Result<ProviderRecord> {
        self.replace(id, ip, "rrset update").await
    }

    async fn delete_record(&self, id: &str, _name: &str) -> Result<()> {
        let change = RrSetChange {
            name: id,
            record_type: MANAGED_RECORD_TYPE,
            changetype: "DELETE",
            ttl: None,
            records: Vec::new(),
        };
        self.patch(change, "rrset deletion").await
    }
}

/// Factory for creating PowerDNS connectors
pub struct PowerDnsFactory;

impl ConnectorFactory for PowerDnsFactory {
    fn create(&self, config: &BackendConfig) -> Result<Box<dyn Connector>> {
        let backend = PowerDnsBackend::from_config(config)?;
        Ok(Box::new(Reconciler::new(backend)))
    }
}

/// Register the PowerDNS connector with a registry
pub fn register(registry: &mut ConnectorRegistry) {
    registry.register(PROVIDER_NAME, Box::new(PowerDnsFactory));
}
