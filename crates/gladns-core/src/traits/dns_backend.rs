// # DNS Backend Trait
//
// Defines the provider API surface the reconciler is allowed to use.
//
// ## Implementations
//
// - DigitalOcean: `gladns-provider-digitalocean` crate
// - PowerDNS: `gladns-provider-powerdns` crate
//
// A backend is a thin mapping from these calls onto one provider's HTTP API.
// It owns authentication, pagination and record shape mapping. It does not
// cache anything and does not decide whether a call is needed: the
// reconciler wraps a backend into a `Connector` and owns both of those.

use async_trait::async_trait;
use std::net::IpAddr;

use crate::naming::NameScheme;

/// The only record type gladns manages
pub const MANAGED_RECORD_TYPE: &str = "A";

/// A DNS record as reported by a provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderRecord {
    /// The record ID (provider-specific; PowerDNS uses the rrset name)
    pub id: String,
    /// The record name, in the backend's naming convention
    pub name: String,
    /// The record type ("A", "AAAA", "CNAME", ...)
    pub record_type: String,
    /// The record content (an IP address for A records)
    pub data: String,
    /// Time-to-live, when the provider reports one
    pub ttl: Option<u32>,
    /// The provider holds more than `data` under this identity (or nothing
    /// enabled), so the record must be rewritten even when `data` matches
    pub needs_rewrite: bool,
}

impl ProviderRecord {
    /// Whether this record has the type gladns manages
    pub fn is_managed_type(&self) -> bool {
        self.record_type.eq_ignore_ascii_case(MANAGED_RECORD_TYPE)
    }
}

/// Trait for DNS backend implementations
///
/// Every method performs at most one logical provider operation and returns
/// its result; retry and caching belong to the caller.
#[async_trait]
pub trait DnsBackend: Send + Sync {
    /// Provider name (for logging and registry lookups)
    fn provider_name(&self) -> &'static str;

    /// Naming convention used for the records this backend manages
    fn name_scheme(&self) -> &NameScheme;

    /// Verify the configured credentials
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Credentials accepted
    /// - `Err(Error)`: Authentication failed or the provider was unreachable
    async fn authenticate(&self) -> Result<(), crate::Error>;

    /// List every record in the configured domain
    ///
    /// Implementations must follow pagination to completion; a partial
    /// listing is an error, never a short result.
    async fn list_records(&self) -> Result<Vec<ProviderRecord>, crate::Error>;

    /// Create an A record
    ///
    /// # Parameters
    ///
    /// - `name`: Record name built by [`NameScheme::record_name`]
    /// - `ip`: Address the record should point at
    ///
    /// # Returns
    ///
    /// The created record, including its provider-assigned identity
    async fn create_record(&self, name: &str, ip: IpAddr) -> Result<ProviderRecord, crate::Error>;

    /// Point an existing record at a new address
    ///
    /// # Parameters
    ///
    /// - `id`: Identity previously returned by `list_records` or `create_record`
    /// - `name`: Record name built by [`NameScheme::record_name`]
    /// - `ip`: New address
    ///
    /// # Returns
    ///
    /// The updated record. Its `id` may differ from the input when the
    /// provider re-keys records on update.
    async fn update_record(
        &self,
        id: &str,
        name: &str,
        ip: IpAddr,
    ) -> Result<ProviderRecord, crate::Error>;

    /// Delete a record
    async fn delete_record(&self, id: &str, name: &str) -> Result<(), crate::Error>;
}
