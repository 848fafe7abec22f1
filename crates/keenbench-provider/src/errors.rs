//! HTTP response to canonical [`ErrorCode`] mapping, shared by every
//! adapter (`spec.md` §4.8: "Errors are mapped to canonical kinds").

use keenbench_error::{EngineError, ErrorCode};
use reqwest::StatusCode;

/// Map an HTTP status code and response body to a canonical [`EngineError`]
/// for `provider_id`.
#[must_use]
pub fn map_status(provider_id: &str, status: StatusCode, body: &str) -> EngineError {
    let code = match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ErrorCode::ProviderAuthFailed,
        StatusCode::TOO_MANY_REQUESTS => ErrorCode::RateLimited,
        s if s.is_server_error() => ErrorCode::ProviderUnavailable,
        _ => ErrorCode::ProviderUnavailable,
    };
    EngineError::new(code, format!("{provider_id} request failed with {status}: {}", truncate(body)))
        .with_provider(provider_id)
}

/// Map a transport-level [`reqwest::Error`] (timeout, connection failure,
/// etc.) to a canonical [`EngineError`].
#[must_use]
pub fn map_transport_error(provider_id: &str, err: reqwest::Error) -> EngineError {
    let code = if err.is_timeout() {
        ErrorCode::ProviderUnavailable
    } else {
        ErrorCode::ProviderUnavailable
    };
    EngineError::new(code, format!("{provider_id} request failed: {err}"))
        .with_provider(provider_id)
        .with_source(err)
}

fn truncate(body: &str) -> String {
    const MAX: usize = 500;
    if body.len() > MAX {
        format!("{}...", &body[..MAX])
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_maps_to_auth_failed() {
        let err = map_status("openai", StatusCode::UNAUTHORIZED, "bad key");
        assert_eq!(err.code, ErrorCode::ProviderAuthFailed);
    }

    #[test]
    fn too_many_requests_maps_to_rate_limited() {
        let err = map_status("openai", StatusCode::TOO_MANY_REQUESTS, "slow down");
        assert_eq!(err.code, ErrorCode::RateLimited);
    }

    #[test]
    fn server_error_maps_to_unavailable() {
        let err = map_status("openai", StatusCode::BAD_GATEWAY, "down");
        assert_eq!(err.code, ErrorCode::ProviderUnavailable);
    }
}
