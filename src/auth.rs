//! Admin session checks
//!
//! TigerStyle: sessions are issued by an external auth service; this module
//! only asks that service who a bearer token belongs to and admits admins.
//! [`StaticSessionVerifier`] stands in for the service with a configured
//! token table.

use std::collections::HashMap;

use async_trait::async_trait;
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};

// =============================================================================
// TigerStyle Constants
// =============================================================================

/// Role allowed to use the admin routes
pub const ADMIN_ROLE: &str = "admin";

/// Maximum accepted bearer token length in bytes
pub const SESSION_TOKEN_BYTES_MAX: usize = 4096;

// =============================================================================
// Types
// =============================================================================

/// Who a session belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Subject identifier
    pub subject: String,
    /// Role from the profile record
    pub role: String,
}

impl Profile {
    /// Whether the profile may edit content.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == ADMIN_ROLE
    }
}

/// Authentication and authorization failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// No `Authorization: Bearer` header
    #[error("missing bearer token")]
    MissingToken,

    /// Token unknown to the auth service
    #[error("invalid session")]
    InvalidSession,

    /// Session is valid but not an admin
    #[error("role {role} may not edit content")]
    Forbidden {
        /// Role of the session
        role: String,
    },
}

/// The consumed auth service.
#[async_trait]
pub trait SessionVerifier: Send + Sync + std::fmt::Debug {
    /// Resolve a bearer token to a profile.
    ///
    /// # Errors
    /// Returns [`AuthError::InvalidSession`] for unknown tokens.
    async fn verify(&self, token: &str) -> Result<Profile, AuthError>;
}

/// Verifier over a fixed `token -> role` table.
#[derive(Debug, Clone, Default)]
pub struct StaticSessionVerifier {
    tokens: HashMap<String, String>,
}

impl StaticSessionVerifier {
    /// Create from a `token -> role` table.
    #[must_use]
    pub fn new(tokens: HashMap<String, String>) -> Self {
        Self { tokens }
    }
}

#[async_trait]
impl SessionVerifier for StaticSessionVerifier {
    async fn verify(&self, token: &str) -> Result<Profile, AuthError> {
        let role = self.tokens.get(token).ok_or(AuthError::InvalidSession)?;
        Ok(Profile {
            subject: format!("static:{}", token.chars().take(4).collect::<String>()),
            role: role.clone(),
        })
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Bearer token from request headers.
///
/// # Errors
/// Returns [`AuthError::MissingToken`] if there is no usable bearer header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty() && t.len() <= SESSION_TOKEN_BYTES_MAX)
        .ok_or(AuthError::MissingToken)?;
    Ok(token)
}

/// Admit only admin sessions.
///
/// # Errors
/// Returns the first failing check: header, session, role.
pub async fn require_admin(
    verifier: &dyn SessionVerifier,
    headers: &HeaderMap,
) -> Result<Profile, AuthError> {
    let token = bearer_token(headers)?;
    let profile = verifier.verify(token).await?;
    if !profile.is_admin() {
        tracing::warn!(subject = %profile.subject, role = %profile.role, "Non-admin session rejected");
        return Err(AuthError::Forbidden { role: profile.role });
    }
    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn verifier() -> StaticSessionVerifier {
        StaticSessionVerifier::new(HashMap::from([
            ("root-token".to_string(), "admin".to_string()),
            ("viewer-token".to_string(), "viewer".to_string()),
        ]))
    }

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[tokio::test]
    async fn test_admin_admitted() {
        let profile = require_admin(&verifier(), &headers("Bearer root-token")).await.unwrap();
        assert!(profile.is_admin());
    }

    #[tokio::test]
    async fn test_rejections() {
        let v = verifier();
        assert_eq!(
            require_admin(&v, &HeaderMap::new()).await,
            Err(AuthError::MissingToken)
        );
        assert_eq!(
            require_admin(&v, &headers("Basic abc")).await,
            Err(AuthError::MissingToken)
        );
        assert_eq!(
            require_admin(&v, &headers("Bearer nope")).await,
            Err(AuthError::InvalidSession)
        );
        assert_eq!(
            require_admin(&v, &headers("Bearer viewer-token")).await,
            Err(AuthError::Forbidden {
                role: "viewer".to_string()
            })
        );
    }
}
