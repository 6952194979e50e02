//! Address → record name mapping
//!
//! Every name the reconciler hands to a backend, and every cache key it
//! stores, is derived here. Record names are case-insensitive at the
//! providers, so keys are always lower-cased; deriving both the key and the
//! provider-facing name from the same function keeps `Node1` and `node1` from
//! turning into two records.
//!
//! Two conventions are supported:
//!
//! - **Relative** names (`node1.cdn`) for APIs that address records inside a
//!   domain, such as DigitalOcean.
//! - **Fully qualified** names (`node1.cdn.example.com.`) for APIs that work
//!   on whole rrsets, such as PowerDNS.

use crate::error::{Error, Result};

/// Naming convention for the records managed by one backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameScheme {
    /// Lower-cased suffix appended to every key, including the leading dot
    suffix: String,
    /// Whether names carry the zone and a trailing dot
    fully_qualified: bool,
}

impl NameScheme {
    /// Names relative to the provider domain: `<key>.<subdomain>`
    pub fn relative(subdomain: &str) -> Self {
        let subdomain = trim_dots(subdomain);
        let suffix = if subdomain.is_empty() {
            String::new()
        } else {
            format!(".{}", subdomain)
        };

        Self {
            suffix,
            fully_qualified: false,
        }
    }

    /// Fully qualified names: `<key>.<subdomain>.<zone>.`
    pub fn fully_qualified(subdomain: &str, zone: &str) -> Self {
        let labels: Vec<String> = [trim_dots(subdomain), trim_dots(zone)]
            .into_iter()
            .filter(|label| !label.is_empty())
            .collect();

        Self {
            suffix: format!(".{}.", labels.join(".")),
            fully_qualified: true,
        }
    }

    /// Normalize a network address for use as a cache key
    ///
    /// Rejects addresses that cannot be a single DNS label under the managed
    /// sub-domain.
    pub fn key(&self, address: &str) -> Result<String> {
        let key = normalize(address);

        if key.is_empty() {
            return Err(Error::invalid_input("empty node address"));
        }
        if key.contains('.') || key.chars().any(char::is_whitespace) {
            return Err(Error::invalid_input(format!(
                "node address '{}' is not a single DNS label",
                address
            )));
        }

        Ok(key)
    }

    /// Build the provider-facing record name for an already normalized key
    pub fn record_name(&self, key: &str) -> String {
        format!("{}{}", key, self.suffix)
    }

    /// Map a provider record name back to its cache key
    ///
    /// Returns `None` for records outside the managed sub-domain.
    pub fn key_for_record_name(&self, name: &str) -> Option<String> {
        let mut name = normalize(name);
        if self.fully_qualified && !name.ends_with('.') {
            name.push('.');
        }

        let key = name.strip_suffix(self.suffix.as_str())?;
        if key.is_empty() || key.contains('.') || key == "@" {
            return None;
        }

        Some(key.to_string())
    }
}

/// Lower-case an address or record name
pub fn normalize(name: &str) -> String {
    name.to_lowercase()
}

fn trim_dots(label: &str) -> String {
    normalize(label.trim().trim_matches('.'))
}
