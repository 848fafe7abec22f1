//! PKCE OAuth flow with a loopback redirect listener (`spec.md` §4.8:
//! "PKCE flow with loopback redirect `http://localhost:<ephemeral>/auth/callback`
//! captured by an in-process HTTP listener; if the listener cannot bind, the
//! engine returns an authorize URL for manual paste of the redirect URL").
//!
//! The authorization-url and verifier bookkeeping leans on `oauth2`'s
//! [`CsrfToken`]/[`PkceCodeChallenge`] helpers; the token exchange itself is
//! a plain form-encoded POST via `reqwest`, since every provider's token
//! endpoint here is a standard RFC 6749 code/refresh grant.

use chrono::{DateTime, Duration, Utc};
use keenbench_core::model::ProviderId;
use keenbench_error::{EngineError, ErrorCode};
use keenbench_secrets::OAuthCredentials;
use oauth2::{CsrfToken, PkceCodeChallenge, PkceCodeVerifier};
use serde::Deserialize;
use tiny_http::Server;

/// Static OAuth endpoint configuration for a provider that supports login
/// via a connected account rather than (or in addition to) a static API key.
pub struct OAuthProviderConfig {
    /// Authorization endpoint.
    pub authorize_url: &'static str,
    /// Token exchange endpoint.
    pub token_url: &'static str,
    /// Public OAuth client id registered for this engine.
    pub client_id: &'static str,
    /// Scopes requested at authorization time.
    pub scopes: &'static [&'static str],
}

/// Look up the OAuth endpoint configuration for `provider`, if it supports
/// connected-account login.
#[must_use]
pub fn provider_config(provider: ProviderId) -> Option<OAuthProviderConfig> {
    match provider {
        ProviderId::OpenAi => Some(OAuthProviderConfig {
            authorize_url: "https://auth.openai.com/oauth/authorize",
            token_url: "https://auth.openai.com/oauth/token",
            client_id: "keenbench-engine",
            scopes: &["openid", "profile", "offline_access"],
        }),
        ProviderId::Anthropic => Some(OAuthProviderConfig {
            authorize_url: "https://claude.ai/oauth/authorize",
            token_url: "https://console.anthropic.com/v1/oauth/token",
            client_id: "keenbench-engine",
            scopes: &["org:create_api_key", "user:profile"],
        }),
        ProviderId::Google | ProviderId::Mistral => None,
    }
}

/// Opaque state threaded between [`start`] and the `complete_*` functions.
pub struct FlowState {
    token_url: String,
    client_id: String,
    redirect_uri: String,
    pkce_verifier: PkceCodeVerifier,
    csrf_token: CsrfToken,
}

/// A started authorization attempt, awaiting the user to complete it in a
/// browser.
pub enum PendingAuthorization {
    /// A loopback listener is bound and waiting for the redirect.
    Listening {
        /// URL the user should open in a browser.
        authorize_url: String,
        state: FlowState,
        listener: Server,
    },
    /// No local port could be bound; the caller must paste the full
    /// redirect URL back manually.
    ManualPaste {
        /// URL the user should open in a browser.
        authorize_url: String,
        state: FlowState,
    },
}

impl PendingAuthorization {
    /// The URL the user should be shown, regardless of which variant.
    #[must_use]
    pub fn authorize_url(&self) -> &str {
        match self {
            PendingAuthorization::Listening { authorize_url, .. }
            | PendingAuthorization::ManualPaste { authorize_url, .. } => authorize_url,
        }
    }
}

/// Start a PKCE authorization attempt for `provider`.
///
/// Tries to bind an ephemeral loopback port first; falls back to
/// [`PendingAuthorization::ManualPaste`] if binding fails (e.g. the sandbox
/// denies listening sockets).
pub fn start(provider: ProviderId) -> Result<PendingAuthorization, EngineError> {
    let config = provider_config(provider).ok_or_else(|| {
        EngineError::new(ErrorCode::ProviderNotConfigured, format!("{} has no OAuth login flow", provider.as_str()))
            .with_provider(provider.as_str())
    })?;

    let listener = Server::http("127.0.0.1:0").ok();
    let redirect_uri = match &listener {
        Some(server) => format!("http://{}/auth/callback", server.server_addr()),
        None => "http://localhost/auth/callback".to_string(),
    };

    let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
    let csrf_token = CsrfToken::new_random();

    let authorize_url = url::Url::parse_with_params(
        config.authorize_url,
        &[
            ("response_type", "code"),
            ("client_id", config.client_id),
            ("redirect_uri", redirect_uri.as_str()),
            ("scope", &config.scopes.join(" ")),
            ("state", csrf_token.secret()),
            ("code_challenge", pkce_challenge.as_str()),
            ("code_challenge_method", "S256"),
        ],
    )
    .map_err(|e| EngineError::new(ErrorCode::InvariantViolation, format!("invalid oauth authorize url: {e}")))?
    .to_string();

    let state = FlowState {
        token_url: config.token_url.to_string(),
        client_id: config.client_id.to_string(),
        redirect_uri,
        pkce_verifier,
        csrf_token,
    };

    Ok(match listener {
        Some(server) => PendingAuthorization::Listening { authorize_url, state, listener: server },
        None => PendingAuthorization::ManualPaste { authorize_url, state },
    })
}

/// Complete a loopback-listener authorization by blocking for the single
/// redirect request, then exchanging the code for tokens.
pub async fn complete_listening(listener: Server, state: FlowState) -> Result<OAuthCredentials, EngineError> {
    let request = tokio::task::spawn_blocking(move || listener.recv())
        .await
        .map_err(|e| EngineError::new(ErrorCode::ProviderAuthFailed, format!("oauth callback task failed: {e}")))?
        .map_err(|e| EngineError::new(ErrorCode::ProviderAuthFailed, format!("oauth callback listener failed: {e}")))?;

    let redirect_url = format!("http://localhost{}", request.url());
    let response = tiny_http::Response::from_string("Authorization complete. You may close this window.");
    let _ = request.respond(response);

    complete_with_redirect_url(&redirect_url, state).await
}

/// Complete a manual-paste authorization: `redirect_url` is the full URL the
/// user pasted back after the provider redirected their browser.
pub async fn complete_manual(redirect_url: &str, state: FlowState) -> Result<OAuthCredentials, EngineError> {
    complete_with_redirect_url(redirect_url, state).await
}

async fn complete_with_redirect_url(redirect_url: &str, state: FlowState) -> Result<OAuthCredentials, EngineError> {
    let (code, returned_state) = extract_code_and_state(redirect_url)?;
    if returned_state.as_deref() != Some(state.csrf_token.secret().as_str()) {
        return Err(EngineError::new(ErrorCode::ValidationFailed, "oauth state mismatch, possible CSRF"));
    }

    let client = reqwest::Client::new();
    let response = client
        .post(&state.token_url)
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", code.as_str()),
            ("redirect_uri", state.redirect_uri.as_str()),
            ("client_id", state.client_id.as_str()),
            ("code_verifier", state.pkce_verifier.secret().as_str()),
        ])
        .send()
        .await
        .map_err(|e| EngineError::new(ErrorCode::ProviderAuthFailed, format!("oauth token exchange failed: {e}")))?;

    token_response_to_credentials(response, None).await
}

/// Refresh `credentials` via the provider's token endpoint if they are
/// within `margin` of expiring, returning the (possibly unchanged)
/// credentials.
pub async fn refresh_if_needed(
    provider: ProviderId,
    credentials: OAuthCredentials,
    margin: Duration,
) -> Result<OAuthCredentials, EngineError> {
    if !credentials.needs_refresh(Utc::now(), margin) {
        return Ok(credentials);
    }
    let Some(refresh_token) = credentials.refresh_token.clone() else {
        return Ok(credentials);
    };
    let config = provider_config(provider).ok_or_else(|| {
        EngineError::new(ErrorCode::ProviderNotConfigured, format!("{} has no OAuth login flow", provider.as_str()))
    })?;

    let client = reqwest::Client::new();
    let response = client
        .post(config.token_url)
        .form(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
            ("client_id", config.client_id),
        ])
        .send()
        .await
        .map_err(|e| EngineError::new(ErrorCode::ProviderAuthFailed, format!("oauth token refresh failed: {e}")))?;

    token_response_to_credentials(response, Some(&credentials)).await
}

async fn token_response_to_credentials(
    response: reqwest::Response,
    previous: Option<&OAuthCredentials>,
) -> Result<OAuthCredentials, EngineError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| EngineError::new(ErrorCode::ProviderAuthFailed, format!("failed to read oauth token response: {e}")))?;
    if !status.is_success() {
        return Err(EngineError::new(ErrorCode::ProviderAuthFailed, format!("oauth token endpoint returned {status}: {body}")));
    }

    let parsed: TokenResponseBody = serde_json::from_str(&body)
        .map_err(|e| EngineError::new(ErrorCode::ProviderAuthFailed, format!("malformed oauth token response: {e}")))?;

    let expires_at = Utc::now() + Duration::seconds(parsed.expires_in.unwrap_or(3600));
    Ok(OAuthCredentials {
        access_token: parsed.access_token,
        refresh_token: parsed.refresh_token.or_else(|| previous.and_then(|p| p.refresh_token.clone())),
        id_token: parsed.id_token.or_else(|| previous.and_then(|p| p.id_token.clone())),
        account_label: previous.map(|p| p.account_label.clone()).unwrap_or_else(|| "connected-account".to_string()),
        expires_at,
    })
}

fn extract_code_and_state(redirect_url: &str) -> Result<(String, Option<String>), EngineError> {
    let parsed = url::Url::parse(redirect_url)
        .map_err(|e| EngineError::new(ErrorCode::ValidationFailed, format!("malformed oauth redirect url: {e}")))?;

    let mut code = None;
    let mut state = None;
    for (key, value) in parsed.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            _ => {}
        }
    }

    let code = code.ok_or_else(|| EngineError::new(ErrorCode::ValidationFailed, "oauth redirect missing authorization code"))?;
    Ok((code, state))
}

#[derive(Debug, Deserialize)]
struct TokenResponseBody {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    id_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Whether `credentials` need refreshing within `margin` of `now`, exposed
/// for callers that want to check without forcing a refresh.
#[must_use]
pub fn needs_refresh(credentials: &OAuthCredentials, now: DateTime<Utc>, margin: Duration) -> bool {
    credentials.needs_refresh(now, margin)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openai_and_anthropic_have_oauth_configs() {
        assert!(provider_config(ProviderId::OpenAi).is_some());
        assert!(provider_config(ProviderId::Anthropic).is_some());
    }

    #[test]
    fn google_and_mistral_have_no_oauth_config() {
        assert!(provider_config(ProviderId::Google).is_none());
        assert!(provider_config(ProviderId::Mistral).is_none());
    }

    #[test]
    fn starting_a_flow_yields_a_browsable_authorize_url() {
        let pending = start(ProviderId::OpenAi).unwrap();
        assert!(pending.authorize_url().starts_with("https://auth.openai.com/oauth/authorize"));
        assert!(pending.authorize_url().contains("code_challenge"));
    }

    #[test]
    fn extract_code_and_state_parses_query_params() {
        let (code, state) = extract_code_and_state("http://localhost:4123/auth/callback?code=abc123&state=xyz").unwrap();
        assert_eq!(code, "abc123");
        assert_eq!(state.as_deref(), Some("xyz"));
    }

    #[test]
    fn extract_code_and_state_errors_without_code() {
        let result = extract_code_and_state("http://localhost:4123/auth/callback?state=xyz");
        assert!(result.is_err());
    }
}
