// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bearer-token authentication for the gateway.
//!
//! When no token is configured, all requests are rejected (fail-closed).

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};

/// Authentication configuration for the gateway.
#[derive(Clone, Default)]
pub struct AuthConfig {
    /// Expected bearer token. `None` rejects everything.
    pub bearer_token: Option<String>,
}

impl AuthConfig {
    pub fn new(bearer_token: Option<String>) -> Self {
        Self { bearer_token }
    }

    /// Whether `presented` matches the configured token.
    pub fn accepts(&self, presented: Option<&str>) -> bool {
        match (&self.bearer_token, presented) {
            (Some(expected), Some(token)) => constant_time_eq(expected.as_bytes(), token.as_bytes()),
            _ => false,
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field(
                "bearer_token",
                &self.bearer_token.as_ref().map(|_| "[redacted]"),
            )
            .finish()
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Middleware that validates `Authorization: Bearer <token>`.
pub async fn auth_middleware(
    State(auth): State<AuthConfig>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if auth.bearer_token.is_none() {
        tracing::error!("gateway has no bearer token configured -- rejecting request");
        return Err(StatusCode::UNAUTHORIZED);
    }

    let presented = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    if auth.accepts(presented) {
        Ok(next.run(request).await)
    } else {
        Err(StatusCode::UNAUTHORIZED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_token_configured_accepts_nothing() {
        let config = AuthConfig::default();
        assert!(!config.accepts(Some("anything")));
        assert!(!config.accepts(None));
    }

    #[test]
    fn token_must_match_exactly() {
        let config = AuthConfig::new(Some("secret-token".to_string()));
        assert!(config.accepts(Some("secret-token")));
        assert!(!config.accepts(Some("secret-tokem")));
        assert!(!config.accepts(Some("secret")));
        assert!(!config.accepts(None));
    }

    #[test]
    fn debug_redacts_token() {
        let config = AuthConfig::new(Some("secret-token".to_string()));
        let debug_output = format!("{config:?}");
        assert!(!debug_output.contains("secret-token"));
        assert!(debug_output.contains("[redacted]"));
    }
}
