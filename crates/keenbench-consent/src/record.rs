//! The consent record shape and its persisted form, `meta/egress_consent.json`
//! (`spec.md` §3 "Consent record").

use serde::{Deserialize, Serialize};

/// A grant of consent for a specific (provider, model, scope) triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentRecord {
    /// Provider the grant applies to.
    pub provider_id: String,
    /// Model the grant applies to.
    pub model_id: String,
    /// Scope hash (`spec.md` §3 "Scope hash") at the time of the grant.
    pub scope_hash: String,
}

impl ConsentRecord {
    /// True if this record still authorizes a call against the given
    /// (provider, model, scope hash) triple.
    #[must_use]
    pub fn matches(&self, provider_id: &str, model_id: &str, scope_hash: &str) -> bool {
        self.provider_id == provider_id && self.model_id == model_id && self.scope_hash == scope_hash
    }
}

/// On-disk shape of `meta/egress_consent.json`.
///
/// Absence of the file (or `consented: false`) means no persisted grant
/// exists; this is distinct from a session-only grant, which never
/// touches disk at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EgressConsentFile {
    /// Whether a persisted grant is recorded.
    pub consented: bool,
    /// The grant details, present iff `consented`.
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub record: Option<ConsentRecord>,
}

impl EgressConsentFile {
    /// An empty file: no persisted grant.
    #[must_use]
    pub fn none() -> Self {
        Self {
            consented: false,
            record: None,
        }
    }

    /// A file recording the given grant.
    #[must_use]
    pub fn granted(record: ConsentRecord) -> Self {
        Self {
            consented: true,
            record: Some(record),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_matches_exact_triple_only() {
        let record = ConsentRecord {
            provider_id: "openai".into(),
            model_id: "openai:gpt-5".into(),
            scope_hash: "abc123".into(),
        };
        assert!(record.matches("openai", "openai:gpt-5", "abc123"));
        assert!(!record.matches("openai", "openai:gpt-5", "different"));
        assert!(!record.matches("anthropic", "openai:gpt-5", "abc123"));
    }
}
