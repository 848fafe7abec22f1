//! The `secrets.enc` store: API keys and OAuth credentials per provider
//! (`spec.md` §3 "secrets.enc", §4.2).

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use keenbench_core::model::ProviderId;
use keenbench_error::{EngineError, ErrorCode};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::aead;
use crate::master_key::MasterKey;

/// OAuth credentials for a provider that authenticates via OAuth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct OAuthCredentials {
    /// Current access token.
    pub access_token: String,
    /// Refresh token, if the provider issues one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// OIDC identity token, if present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    /// Display label for the connected account (e.g. an email address).
    pub account_label: String,
    /// Access token expiry.
    pub expires_at: DateTime<Utc>,
}

impl OAuthCredentials {
    /// Whether the access token is within `margin` of expiring (or already
    /// expired), meaning it should be refreshed before use
    /// (`spec.md` §4.2 "refresh lazily on use when within a short expiry
    /// window").
    #[must_use]
    pub fn needs_refresh(&self, now: DateTime<Utc>, margin: chrono::Duration) -> bool {
        now + margin >= self.expires_at
    }
}

/// Credentials held for a single provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ProviderCredentials {
    /// Static API key, for providers that use one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// OAuth credentials, for providers that use OAuth.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth: Option<OAuthCredentials>,
}

impl ProviderCredentials {
    /// Whether any credential material is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.api_key.is_none() && self.oauth.is_none()
    }
}

/// The decrypted contents of `secrets.enc`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SecretsFile {
    /// Per-provider credentials, keyed by the provider's canonical id.
    #[serde(default)]
    pub providers: BTreeMap<String, ProviderCredentials>,
}

/// AEAD-encrypted at-rest store of provider credentials.
///
/// Reads and writes are serialized through an internal mutex and every save
/// is atomic (`spec.md` §5 "temp + rename").
pub struct SecretStore {
    path: PathBuf,
    master_key: MasterKey,
    state: Mutex<SecretsFile>,
}

impl SecretStore {
    /// Open the store at `path`, loading and decrypting existing contents
    /// if the file exists, or starting empty otherwise.
    pub fn open(path: impl Into<PathBuf>, master_key: MasterKey) -> Result<Self, EngineError> {
        let path = path.into();
        let state = match fs::read_to_string(&path) {
            Ok(encoded) => {
                let plaintext = aead::decrypt(&master_key, encoded.trim())?;
                serde_json::from_slice(&plaintext).map_err(|e| {
                    EngineError::new(
                        ErrorCode::InvariantViolation,
                        format!("secrets.enc has malformed contents: {e}"),
                    )
                })?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => SecretsFile::default(),
            Err(e) => {
                return Err(EngineError::new(
                    ErrorCode::FileReadFailed,
                    format!("failed to read {}: {e}", path.display()),
                )
                .with_source(e));
            }
        };

        Ok(Self {
            path,
            master_key,
            state: Mutex::new(state),
        })
    }

    /// Fetch a provider's credentials, if any are stored.
    #[must_use]
    pub fn get(&self, provider: ProviderId) -> Option<ProviderCredentials> {
        let state = self.state.lock().expect("secret store mutex poisoned");
        state.providers.get(provider.as_str()).cloned()
    }

    /// Set the static API key for a provider, persisting immediately.
    pub fn set_api_key(&self, provider: ProviderId, api_key: String) -> Result<(), EngineError> {
        self.with_locked_state(|state| {
            let entry = state.providers.entry(provider.as_str().to_string()).or_default();
            entry.api_key = Some(api_key);
        })
    }

    /// Clear a provider's API key, leaving any OAuth credentials intact.
    pub fn clear_api_key(&self, provider: ProviderId) -> Result<(), EngineError> {
        self.with_locked_state(|state| {
            if let Some(entry) = state.providers.get_mut(provider.as_str()) {
                entry.api_key = None;
            }
        })
    }

    /// Store OAuth credentials for a provider, persisting immediately.
    pub fn set_oauth(
        &self,
        provider: ProviderId,
        oauth: OAuthCredentials,
    ) -> Result<(), EngineError> {
        self.with_locked_state(|state| {
            let entry = state.providers.entry(provider.as_str().to_string()).or_default();
            entry.oauth = Some(oauth);
        })
    }

    /// Remove a provider's OAuth connection, leaving any API key intact.
    pub fn disconnect_oauth(&self, provider: ProviderId) -> Result<(), EngineError> {
        self.with_locked_state(|state| {
            if let Some(entry) = state.providers.get_mut(provider.as_str()) {
                entry.oauth = None;
            }
        })
    }

    fn with_locked_state(
        &self,
        mutate: impl FnOnce(&mut SecretsFile),
    ) -> Result<(), EngineError> {
        let mut state = self.state.lock().expect("secret store mutex poisoned");
        mutate(&mut state);
        self.persist(&state)
    }

    fn persist(&self, state: &SecretsFile) -> Result<(), EngineError> {
        let plaintext = serde_json::to_vec(state).map_err(|e| {
            EngineError::new(
                ErrorCode::InvariantViolation,
                format!("failed to serialize secrets: {e}"),
            )
        })?;
        let encoded = aead::encrypt(&self.master_key, &plaintext)?;

        let tmp_path = tmp_path_for(&self.path);
        fs::write(&tmp_path, &encoded).map_err(|e| {
            EngineError::new(
                ErrorCode::FileWriteFailed,
                format!("failed to write {}: {e}", tmp_path.display()),
            )
            .with_source(e)
        })?;
        fs::rename(&tmp_path, &self.path).map_err(|e| {
            EngineError::new(
                ErrorCode::FileWriteFailed,
                format!(
                    "failed to rename {} to {}: {e}",
                    tmp_path.display(),
                    self.path.display()
                ),
            )
            .with_source(e)
        })
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}
