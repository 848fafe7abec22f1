// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Per-provider host allowlists.
pub mod allowlist;

use std::collections::BTreeSet;
use std::net::IpAddr;
use std::str::FromStr;

use keenbench_core::model::ProviderId;
use keenbench_error::{EngineError, ErrorCode};
use keenbench_glob::IncludeExcludeGlobs;

pub use allowlist::default_allowlist_for;

/// An HTTPS-only, allowlist-gated transport for a single provider.
///
/// Every outbound URL is validated against the provider's host allowlist
/// before the shared [`reqwest::Client`] is used to build the request;
/// non-conforming URLs never leave the process.
pub struct PolicyTransport {
    client: reqwest::Client,
    hosts: IncludeExcludeGlobs,
}

impl PolicyTransport {
    /// Build a transport for `provider`, restricted to its default
    /// allowlist.
    pub fn for_provider(provider: ProviderId) -> Result<Self, EngineError> {
        let hosts: Vec<String> = default_allowlist_for(provider)
            .iter()
            .map(|h| (*h).to_string())
            .collect();
        Self::with_allowlist(&hosts)
    }

    /// Build a transport restricted to an explicit set of hosts (exact
    /// matches or glob patterns, e.g. `*.googleapis.com`).
    pub fn with_allowlist(hosts: &[String]) -> Result<Self, EngineError> {
        let no_exclude: &[String] = &[];
        let hosts = IncludeExcludeGlobs::new(hosts, no_exclude).map_err(|e| {
            EngineError::new(
                ErrorCode::EgressBlockedByPolicy,
                format!("failed to compile host allowlist: {e}"),
            )
        })?;
        let client = reqwest::Client::builder().build().map_err(|e| {
            EngineError::new(
                ErrorCode::ProviderUnavailable,
                format!("failed to build HTTP client: {e}"),
            )
            .with_source(e)
        })?;
        Ok(Self { client, hosts })
    }

    /// Validate `url` against this transport's policy, returning the parsed
    /// URL on success.
    ///
    /// Checks, in order: scheme is `https`; host is not an IP literal; host
    /// matches the allowlist. `spec.md` §4.3: "Non-allowlisted attempts fail
    /// with `EGRESS_BLOCKED_BY_POLICY` before bytes leave the process."
    pub fn validate_url(&self, url: &str) -> Result<reqwest::Url, EngineError> {
        let parsed = reqwest::Url::parse(url).map_err(|e| {
            EngineError::new(
                ErrorCode::EgressBlockedByPolicy,
                format!("invalid URL '{url}': {e}"),
            )
        })?;

        if parsed.scheme() != "https" {
            return Err(EngineError::new(
                ErrorCode::EgressBlockedByPolicy,
                format!("scheme '{}' is not https", parsed.scheme()),
            ));
        }

        let host = parsed.host_str().ok_or_else(|| {
            EngineError::new(
                ErrorCode::EgressBlockedByPolicy,
                format!("URL '{url}' has no host"),
            )
        })?;

        if IpAddr::from_str(host).is_ok() {
            return Err(EngineError::new(
                ErrorCode::EgressBlockedByPolicy,
                format!("IP-literal host '{host}' is not permitted"),
            ));
        }

        if !self.hosts.decide_str(host).is_allowed() {
            return Err(EngineError::new(
                ErrorCode::EgressBlockedByPolicy,
                format!("host '{host}' is not on the allowlist"),
            ));
        }

        Ok(parsed)
    }

    /// Build a validated `GET` request builder for `url`.
    pub fn get(&self, url: &str) -> Result<reqwest::RequestBuilder, EngineError> {
        let parsed = self.validate_url(url)?;
        Ok(self.client.get(parsed))
    }

    /// Build a validated `POST` request builder for `url`.
    pub fn post(&self, url: &str) -> Result<reqwest::RequestBuilder, EngineError> {
        let parsed = self.validate_url(url)?;
        Ok(self.client.post(parsed))
    }

    /// The underlying client, for adapters that need lower-level access
    /// (e.g. streaming) after validating the URL themselves via
    /// [`PolicyTransport::validate_url`].
    #[must_use]
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }
}

/// The union of every provider's default allowlisted hosts, useful for
/// diagnostics and settings UIs.
#[must_use]
pub fn all_known_hosts() -> BTreeSet<&'static str> {
    [
        ProviderId::OpenAi,
        ProviderId::Anthropic,
        ProviderId::Google,
        ProviderId::Mistral,
    ]
    .into_iter()
    .flat_map(default_allowlist_for)
    .copied()
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_https_to_allowlisted_host() {
        let transport = PolicyTransport::for_provider(ProviderId::OpenAi).unwrap();
        assert!(transport.validate_url("https://api.openai.com/v1/chat/completions").is_ok());
    }

    #[test]
    fn rejects_non_https_scheme() {
        let transport = PolicyTransport::for_provider(ProviderId::OpenAi).unwrap();
        let err = transport.validate_url("http://api.openai.com/v1").unwrap_err();
        assert_eq!(err.code, ErrorCode::EgressBlockedByPolicy);
    }

    #[test]
    fn rejects_host_not_on_allowlist() {
        let transport = PolicyTransport::for_provider(ProviderId::OpenAi).unwrap();
        let err = transport.validate_url("https://evil.example.com/steal").unwrap_err();
        assert_eq!(err.code, ErrorCode::EgressBlockedByPolicy);
    }

    #[test]
    fn rejects_ip_literal_host() {
        let transport = PolicyTransport::with_allowlist(&["*".to_string()]).unwrap();
        let err = transport.validate_url("https://93.184.216.34/").unwrap_err();
        assert_eq!(err.code, ErrorCode::EgressBlockedByPolicy);
    }

    #[test]
    fn rejects_ipv6_literal_host() {
        let transport = PolicyTransport::with_allowlist(&["*".to_string()]).unwrap();
        let err = transport.validate_url("https://[::1]/").unwrap_err();
        assert_eq!(err.code, ErrorCode::EgressBlockedByPolicy);
    }

    #[test]
    fn each_provider_only_allows_its_own_hosts() {
        let transport = PolicyTransport::for_provider(ProviderId::Anthropic).unwrap();
        assert!(transport.validate_url("https://api.anthropic.com/v1/messages").is_ok());
        assert!(transport.validate_url("https://api.openai.com/v1/chat/completions").is_err());
    }

    #[test]
    fn all_known_hosts_covers_every_provider() {
        let hosts = all_known_hosts();
        assert!(hosts.contains("api.openai.com"));
        assert!(hosts.contains("api.anthropic.com"));
        assert!(hosts.contains("generativelanguage.googleapis.com"));
        assert!(hosts.contains("api.mistral.ai"));
    }
}
