//! Caller token authentication.
//!
//! The key is read from `Authorization: Bearer <key>`, falling back to
//! `x-api-key`, and resolved through the [`TokenStore`](gateway_core::TokenStore).

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use gateway_core::{GatewayError, Token, X_API_KEY};
use tracing::debug;

use crate::{error::ApiError, state::AppState};

/// An active caller token
#[derive(Debug, Clone)]
pub struct AuthenticatedToken(pub Token);

/// Key presented by the caller, if any
pub fn presented_key(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| {
            v.strip_prefix("Bearer ")
                .or_else(|| v.strip_prefix("bearer "))
        })
        .map(str::trim)
        .filter(|k| !k.is_empty());

    bearer.or_else(|| {
        headers
            .get(X_API_KEY)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|k| !k.is_empty())
    })
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedToken {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let key = presented_key(&parts.headers)
            .ok_or_else(|| ApiError::unauthorized("missing api key"))?;

        let token = state
            .tokens
            .get_token(key)
            .await?
            .ok_or_else(|| ApiError::unauthorized("invalid api key"))?;

        if !token.is_active() {
            debug!(token_id = %token.id, "Rejected inactive token");
            return Err(GatewayError::TokenDisabled.into());
        }

        Ok(Self(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_bearer_preferred_over_api_key_header() {
        let map = headers(&[("authorization", "Bearer sk-a"), ("x-api-key", "sk-b")]);
        assert_eq!(presented_key(&map), Some("sk-a"));
    }

    #[test]
    fn test_api_key_header_fallback() {
        assert_eq!(presented_key(&headers(&[("x-api-key", "sk-b")])), Some("sk-b"));
        let map = headers(&[("authorization", "Basic abc"), ("x-api-key", "sk-b")]);
        assert_eq!(presented_key(&map), Some("sk-b"));
    }

    #[test]
    fn test_missing_or_empty_key() {
        assert_eq!(presented_key(&HeaderMap::new()), None);
        assert_eq!(presented_key(&headers(&[("authorization", "Bearer ")])), None);
    }
}
