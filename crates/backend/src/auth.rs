use axum::http::HeaderMap;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::ApiError;

/// JWT claims for API authentication
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

/// Session cookie payload mirrored from the web app. The cookie value is a
/// percent-encoded JSON document carrying the API token plus, for a short
/// window after Google sign-in, the provider tokens from that session.
#[derive(Debug, Deserialize)]
struct SessionPayload {
    access_token: String,
    #[serde(default)]
    provider_token: Option<String>,
    #[serde(default)]
    provider_refresh_token: Option<String>,
}

/// The authenticated caller, plus any provider tokens the session carried.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user_id: Uuid,
    pub email: String,
    pub provider_token: Option<String>,
    pub provider_refresh_token: Option<String>,
}

/// Authenticate a request from either the Authorization header or the
/// session cookie. Bearer tokens carry no provider tokens; the cookie may.
pub fn authenticate(headers: &HeaderMap, config: &AppConfig) -> Result<AuthSession, ApiError> {
    if let Some(token) = extract_bearer_token(headers) {
        let claims = validate_token(&config.jwt_secret, token)?;
        return session_from_claims(claims, None, None);
    }

    if let Some(payload) = extract_session_cookie(headers, &config.cookie_name) {
        let claims = validate_token(&config.jwt_secret, &payload.access_token)?;
        return session_from_claims(claims, payload.provider_token, payload.provider_refresh_token);
    }

    Err(ApiError::Unauthorized)
}

fn session_from_claims(
    claims: Claims,
    provider_token: Option<String>,
    provider_refresh_token: Option<String>,
) -> Result<AuthSession, ApiError> {
    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| {
        tracing::warn!("JWT subject is not a valid user id: {}", claims.sub);
        ApiError::Unauthorized
    })?;

    Ok(AuthSession {
        user_id,
        email: claims.email,
        provider_token,
        provider_refresh_token,
    })
}

fn validate_token(secret: &str, token: &str) -> Result<Claims, ApiError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        tracing::debug!("JWT validation failed: {}", e);
        ApiError::Unauthorized
    })?;

    Ok(token_data.claims)
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

fn extract_session_cookie(headers: &HeaderMap, cookie_name: &str) -> Option<SessionPayload> {
    let cookie_header = headers.get("cookie")?.to_str().ok()?;

    for part in cookie_header.split(';') {
        let Ok(cookie) = cookie::Cookie::parse(part.trim()) else {
            continue;
        };
        if cookie.name() != cookie_name {
            continue;
        }
        let decoded = urlencoding::decode(cookie.value()).ok()?;
        return serde_json::from_str::<SessionPayload>(&decoded).ok();
    }

    None
}
