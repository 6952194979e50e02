// # DigitalOcean DNS Backend
//
// This crate provides the DigitalOcean DNS backend for gladns.
//
// The backend maps the `DnsBackend` calls onto DigitalOcean API v2 and
// nothing more. Record caching, create-vs-update decisions and failure
// isolation belong to the `Reconciler` that wraps it.
//
// ## Record Naming
//
// DigitalOcean addresses records relative to the domain, so node records are
// named `<address>.<cdn_subdomain>` (e.g. `0xabc.cdn` in `yourpool.com`).
//
// ## Security Requirements
//
// - API token NEVER appears in logs or `Debug` output
// - Backend construction fails if the token is empty
//
// ## API Reference
//
// - Verify token: GET `/account`
// - List records: GET `/domains/:domain/records?page=N&per_page=200`
// - Create record: POST `/domains/:domain/records`
// - Update record: PUT `/domains/:domain/records/:id`
// - Delete record: DELETE `/domains/:domain/records/:id`

use async_trait::async_trait;
use gladns_core::config::BackendConfig;
use gladns_core::naming::NameScheme;
use gladns_core::registry::ConnectorRegistry;
use gladns_core::traits::{
    Connector, ConnectorFactory, DnsBackend, MANAGED_RECORD_TYPE, ProviderRecord,
};
use gladns_core::{Error, Reconciler, Result};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::time::Duration;

/// Name this backend registers under
pub const PROVIDER_NAME: &str = "digitalocean";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Records requested per listing page (API maximum)
const PAGE_SIZE: u32 = 200;

/// DigitalOcean DNS backend
///
/// # Security
///
/// The Debug implementation does NOT expose the API token.
pub struct DigitalOceanBackend {
    /// DigitalOcean API token
    /// ⚠️ NEVER log this value
    api_token: String,

    /// Domain the records live in
    domain: String,

    /// API base URL without trailing slash
    base_url: String,

    /// TTL for written records
    ttl: u32,

    /// `<key>.<cdn_subdomain>` naming
    scheme: NameScheme,

    /// HTTP client for API requests
    client: reqwest::Client,
}

impl std::fmt::Debug for DigitalOceanBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DigitalOceanBackend")
            .field("api_token", &"<REDACTED>")
            .field("domain", &self.domain)
            .field("base_url", &self.base_url)
            .field("ttl", &self.ttl)
            .field("scheme", &self.scheme)
            .finish()
    }
}

/// One page of `GET /domains/:domain/records`
#[derive(Debug, Deserialize)]
struct RecordsPage {
    #[serde(default)]
    domain_records: Vec<DomainRecord>,
    #[serde(default)]
    links: Links,
}

#[derive(Debug, Default, Deserialize)]
struct Links {
    #[serde(default)]
    pages: Option<Pages>,
}

#[derive(Debug, Deserialize)]
struct Pages {
    #[serde(default)]
    next: Option<String>,
}

/// Single record response of create/update
#[derive(Debug, Deserialize)]
struct RecordEnvelope {
    domain_record: DomainRecord,
}

#[derive(Debug, Deserialize)]
struct DomainRecord {
    id: u64,
    #[serde(rename = "type")]
    record_type: String,
    name: String,
    #[serde(default)]
    data: String,
    #[serde(default)]
    ttl: Option<u32>,
}

impl From<DomainRecord> for ProviderRecord {
    fn from(record: DomainRecord) -> Self {
        ProviderRecord {
            id: record.id.to_string(),
            name: record.name,
            record_type: record.record_type,
            data: record.data,
            ttl: record.ttl,
            needs_rewrite: false,
        }
    }
}

/// Body of create/update requests
#[derive(Debug, Serialize)]
struct RecordRequest<'a> {
    #[serde(rename = "type")]
    record_type: &'a str,
    name: &'a str,
    data: String,
    ttl: u32,
}

impl DigitalOceanBackend {
    /// Create a new DigitalOcean backend
    ///
    /// # Parameters
    ///
    /// - `api_token`: DigitalOcean API token with write scope
    /// - `domain`: Domain managed on DigitalOcean (e.g., "yourpool.com")
    /// - `cdn_subdomain`: Sub-domain node records live under (e.g., "cdn")
    /// - `base_url`: API base URL (e.g., "https://api.digitalocean.com/v2")
    /// - `ttl`: TTL for created and updated records
    pub fn new(
        api_token: impl Into<String>,
        domain: impl Into<String>,
        cdn_subdomain: &str,
        base_url: &str,
        ttl: u32,
    ) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.is_empty() {
            return Err(Error::config("DigitalOcean API token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_token,
            domain: domain.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            ttl,
            scheme: NameScheme::relative(cdn_subdomain),
            client,
        })
    }

    /// Create a backend from a `BackendConfig::DigitalOcean`
    pub fn from_config(config: &BackendConfig) -> Result<Self> {
        match config {
            BackendConfig::DigitalOcean {
                api_key,
                domain,
                cdn_subdomain,
                base_url,
                ttl,
            } => {
                config.validate()?;
                Self::new(api_key.clone(), domain.clone(), cdn_subdomain, base_url, *ttl)
            }
            _ => Err(Error::config("Invalid config for DigitalOcean backend")),
        }
    }

    fn records_path(&self) -> String {
        format!("/domains/{}/records", self.domain)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(&self.api_token)
    }

    /// Send a request and return the response if it succeeded
    async fn send(&self, request: RequestBuilder, action: &str) -> Result<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| Error::http(format!("DigitalOcean request failed: {}", e)))?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error response".to_string());

        Err(status_error(status, action, &error_text))
    }

    /// Send a request and decode its JSON body
    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder, action: &str) -> Result<T> {
        self.send(request, action)
            .await?
            .json()
            .await
            .map_err(|e| Error::provider(PROVIDER_NAME, format!("Failed to parse {} response: {}", action, e)))
    }

    fn record_request<'a>(&self, name: &'a str, ip: IpAddr) -> RecordRequest<'a> {
        RecordRequest {
            record_type: MANAGED_RECORD_TYPE,
            name,
            data: ip.to_string(),
            ttl: self.ttl,
        }
    }
}

/// Map a non-success status to an error
fn status_error(status: StatusCode, action: &str, error_text: &str) -> Error {
    match status.as_u16() {
        401 | 403 => Error::auth(format!(
            "DigitalOcean rejected the API token or its scope ({}). Status: {}",
            action, status
        )),
        404 => Error::not_found(format!("{}: {}", action, error_text)),
        429 => Error::provider(
            PROVIDER_NAME,
            format!("Rate limit exceeded during {}. Status: {}", action, status),
        ),
        500..=599 => Error::provider(
            PROVIDER_NAME,
            format!("DigitalOcean server error (transient) during {}: {} - {}", action, status, error_text),
        ),
        _ => Error::provider(
            PROVIDER_NAME,
            format!("{} failed: {} - {}", action, status, error_text),
        ),
    }
}

#[async_trait]
impl DnsBackend for DigitalOceanBackend {
    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn name_scheme(&self) -> &NameScheme {
        &self.scheme
    }

    async fn authenticate(&self) -> Result<()> {
        self.send(self.request(Method::GET, "/account"), "account lookup")
            .await?;
        tracing::debug!("DigitalOcean API token accepted");
        Ok(())
    }

    async fn list_records(&self) -> Result<Vec<ProviderRecord>> {
        let path = self.records_path();
        let mut records = Vec::new();
        let mut page: u32 = 1;

        loop {
            let request = self
                .request(Method::GET, &path)
                .query(&[("page", page), ("per_page", PAGE_SIZE)]);
            let body: RecordsPage = self.send_json(request, "record listing").await?;

            let fetched = body.domain_records.len();
            records.extend(body.domain_records.into_iter().map(ProviderRecord::from));
            tracing::debug!("Fetched page {} of {} records ({} record(s))", page, self.domain, fetched);

            let has_next = body.links.pages.and_then(|pages| pages.next).is_some();
            if !has_next || fetched == 0 {
                break;
            }
            page += 1;
        }

        Ok(records)
    }

    async fn create_record(&self, name: &str, ip: IpAddr) -> Result<ProviderRecord> {
        let request = self
            .request(Method::POST, &self.records_path())
            .json(&self.record_request(name, ip));
        let body: RecordEnvelope = self.send_json(request, "record creation").await?;

        Ok(body.domain_record.into())
    }

    async fn update_record(&self, id: &str, name: &str, ip: IpAddr) -> Result<ProviderRecord> {
        let path = format!("{}/{}", self.records_path(), id);
        let request = self
            .request(Method::PUT, &path)
            .json(&self.record_request(name, ip));
        let body: RecordEnvelope = self.send_json(request, "record update").await?;

        Ok(body.domain_record.into())
    }

    async fn delete_record(&self, id: &str, _name: &str) -> Result<()> {
        let path = format!("{}/{}", self.records_path(), id);
        self.send(self.request(Method::DELETE, &path), "record deletion")
            .await?;
        Ok(())
    }
}

/// Factory for creating DigitalOcean connectors
pub struct DigitalOceanFactory;

impl ConnectorFactory for DigitalOceanFactory {
    fn create(&self, config: &BackendConfig) -> Result<Box<dyn Connector>> {
        let backend = DigitalOceanBackend::from_config(config)?;
        Ok(Box::new(Reconciler::new(backend)))
    }
}

/// Register the DigitalOcean connector with a registry
///
/// # Example
///
/// ```rust
/// use gladns_core::ConnectorRegistry;
///
/// let mut registry = ConnectorRegistry::new();
/// gladns_provider_digitalocean::register(&mut registry);
/// assert!(registry.has("digitalocean"));
/// ```
pub fn register(registry: &mut ConnectorRegistry) {
    registry.register(PROVIDER_NAME, Box::new(DigitalOceanFactory));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const DOMAIN: &str = "yourpool.com";

    fn backend(server: &MockServer) -> DigitalOceanBackend {
        DigitalOceanBackend::new("do-token", DOMAIN, "cdn", &server.uri(), 1800).unwrap()
    }

    fn record(id: u64, record_type: &str, name: &str, data: &str) -> serde_json::Value {
        json!({ "id": id, "type": record_type, "name": name, "data": data, "ttl": 1800 })
    }

    #[test]
    fn test_factory_creation() {
        let config = BackendConfig::DigitalOcean {
            api_key: "test_token".to_string(),
            domain: DOMAIN.to_string(),
            cdn_subdomain: "cdn".to_string(),
            base_url: "https://api.digitalocean.com/v2".to_string(),
            ttl: 1800,
        };

        let connector = DigitalOceanFactory.create(&config).unwrap();
        assert_eq!(connector.name(), "digitalocean");
        assert!(!connector.is_connected());
    }

    #[test]
    fn test_factory_missing_token() {
        let config = BackendConfig::DigitalOcean {
            api_key: "".to_string(),
            domain: DOMAIN.to_string(),
            cdn_subdomain: "cdn".to_string(),
            base_url: "https://api.digitalocean.com/v2".to_string(),
            ttl: 1800,
        };

        assert!(DigitalOceanFactory.create(&config).is_err());
    }

    #[test]
    fn test_factory_rejects_other_backend() {
        let config = BackendConfig::Custom {
            factory: "digitalocean".to_string(),
            config: json!({}),
        };

        assert!(matches!(DigitalOceanFactory.create(&config), Err(Error::Config(_))));
    }

    #[test]
    fn test_api_token_not_exposed_in_debug() {
        let backend =
            DigitalOceanBackend::new("secret_token_12345", DOMAIN, "cdn", "https://x", 1800).unwrap();

        let debug_str = format!("{:?}", backend);
        assert!(!debug_str.contains("secret_token_12345"));
        assert!(debug_str.contains("DigitalOceanBackend"));
    }

    #[test]
    fn test_register() {
        let mut registry = ConnectorRegistry::new();
        register(&mut registry);
        assert_eq!(registry.list(), vec!["digitalocean".to_string()]);
    }

    #[tokio::test]
    async fn test_authenticate_sends_bearer_token() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/account"))
            .and(header("Authorization", "Bearer do-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "account": {} })))
            .expect(1)
            .mount(&server)
            .await;

        assert!(backend(&server).authenticate().await.is_ok());
    }

    #[tokio::test]
    async fn test_authenticate_rejected_token() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/account"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
            .mount(&server)
            .await;

        let result = backend(&server).authenticate().await;
        assert!(matches!(result, Err(Error::Authentication(_))));
    }

    #[tokio::test]
    async fn test_list_records_follows_pagination() {
        let server = MockServer::start().await;
        let next = format!("{}/domains/{}/records?page=2&per_page=200", server.uri(), DOMAIN);

        Mock::given(method("GET"))
            .and(path("/domains/yourpool.com/records"))
            .and(query_param("page", "1"))
            .and(query_param("per_page", "200"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "domain_records": [
                    record(1, "A", "node1.cdn", "10.0.0.1"),
                    record(2, "NS", "@", "ns1.digitalocean.com"),
                ],
                "links": { "pages": { "next": next, "last": next } },
                "meta": { "total": 3 }
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/domains/yourpool.com/records"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "domain_records": [record(3, "A", "node2.cdn", "10.0.0.2")],
                "links": { "pages": { "prev": "ignored" } },
                "meta": { "total": 3 }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let records = backend(&server).list_records().await.unwrap();

        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        assert_eq!(records[2].name, "node2.cdn");
        assert_eq!(records[2].data, "10.0.0.2");
    }

    #[tokio::test]
    async fn test_list_records_single_page_without_links() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/domains/yourpool.com/records"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "domain_records": [record(1, "A", "node1.cdn", "10.0.0.1")],
                "links": {}
            })))
            .expect(1)
            .mount(&server)
            .await;

        assert_eq!(backend(&server).list_records().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_record() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/domains/yourpool.com/records"))
            .and(body_json(json!({
                "type": "A",
                "name": "node1.cdn",
                "data": "10.0.0.1",
                "ttl": 1800
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "domain_record": record(42, "A", "node1.cdn", "10.0.0.1")
            })))
            .expect(1)
            .mount(&server)
            .await;

        let created = backend(&server)
            .create_record("node1.cdn", "10.0.0.1".parse().unwrap())
            .await
            .unwrap();
        assert_eq!(created.id, "42");
    }

    #[tokio::test]
    async fn test_update_record_uses_id() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/domains/yourpool.com/records/42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "domain_record": record(42, "A", "node1.cdn", "10.0.0.9")
            })))
            .expect(1)
            .mount(&server)
            .await;

        let updated = backend(&server)
            .update_record("42", "node1.cdn", "10.0.0.9".parse().unwrap())
            .await
            .unwrap();
        assert_eq!(updated.id, "42");
        assert_eq!(updated.data, "10.0.0.9");
    }

    #[tokio::test]
    async fn test_delete_record() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/domains/yourpool.com/records/42"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        assert!(backend(&server).delete_record("42", "node1.cdn").await.is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_api_is_http_error() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let url = format!("http://127.0.0.1:{}", port);
        let backend = DigitalOceanBackend::new("do-token", DOMAIN, "cdn", &url, 1800).unwrap();
        assert!(matches!(backend.authenticate().await, Err(Error::Http(_))));
    }

    #[tokio::test]
    async fn test_rate_limit_is_provider_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/domains/yourpool.com/records"))
            .respond_with(ResponseTemplate::new(429).set_body_string("Too Many Requests"))
            .mount(&server)
            .await;

        let result = backend(&server)
            .create_record("node1.cdn", "10.0.0.1".parse().unwrap())
            .await;
        assert!(matches!(result, Err(Error::Provider { .. })));
    }

    #[tokio::test]
    async fn test_connector_round_trip() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/account"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "account": {} })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/domains/yourpool.com/records"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "domain_records": [
                    record(7, "A", "Node1.cdn", "10.0.0.1"),
                    record(8, "A", "www", "10.9.9.9"),
                ],
                "links": {}
            })))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/domains/yourpool.com/records"))
            .and(body_json(json!({
                "type": "A",
                "name": "node2.cdn",
                "data": "10.0.0.2",
                "ttl": 1800
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "domain_record": record(9, "A", "node2.cdn", "10.0.0.2")
            })))
            .expect(1)
            .mount(&server)
            .await;

        let connector = Reconciler::new(backend(&server));
        connector.connect().await.unwrap();
        assert_eq!(
            connector.snapshot().keys().await,
            vec!["node1".to_string()]
        );

        let mut desired = gladns_core::NodeState::new();
        desired.insert("NODE1".to_string(), "10.0.0.1".parse().unwrap());
        desired.insert("node2".to_string(), "10.0.0.2".parse().unwrap());

        let report = connector.update_state(&desired).await.unwrap();
        assert_eq!(report.created(), 1);
        assert_eq!(report.unchanged(), 1);
        assert_eq!(connector.snapshot().get("node2").await.unwrap().id, "9");
    }
}
