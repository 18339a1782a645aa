// src/auth/mod.rs
//! Bearer-credential verification.
//!
//! The identity provider is external: it takes an opaque token and returns a
//! stable user id. Handlers receive the verified id through the
//! [`AuthenticatedUser`] extractor, which rejects the request with 401 before
//! any handler code runs.

pub mod extractor;
pub mod identity_toolkit;

pub use extractor::AuthenticatedUser;
pub use identity_toolkit::IdentityToolkitVerifier;

use crate::config::{ApiConfig, AuthProviderKind, ConfigError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("no bearer token provided")]
    Missing,

    #[error("invalid token")]
    Invalid,

    #[error("token expired")]
    Expired,

    #[error("token revoked")]
    Revoked,

    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Verify `token` and return the user id it belongs to.
    async fn verify(&self, token: &str) -> Result<String, AuthError>;
}

/// Fixed token -> uid table.
pub struct StaticTokenVerifier {
    tokens: HashMap<String, String>,
}

impl StaticTokenVerifier {
    pub fn new<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            tokens: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[async_trait]
impl IdentityProvider for StaticTokenVerifier {
    async fn verify(&self, token: &str) -> Result<String, AuthError> {
        self.tokens.get(token).cloned().ok_or(AuthError::Invalid)
    }
}

pub fn build_identity_provider(
    config: &ApiConfig,
) -> Result<Arc<dyn IdentityProvider>, ConfigError> {
    match config.auth_provider {
        AuthProviderKind::IdentityToolkit => {
            let key = config
                .firebase_api_key
                .clone()
                .ok_or_else(|| ConfigError::Missing("FIREBASE_API_KEY".into()))?;
            Ok(Arc::new(IdentityToolkitVerifier::new(key)))
        }
        AuthProviderKind::Static => {
            tracing::warn!(
                tokens = config.static_tokens.len(),
                "Using static bearer tokens; do not use in production"
            );
            Ok(Arc::new(StaticTokenVerifier::new(
                config.static_tokens.iter().cloned(),
            )))
        }
    }
}

/// Pull the token out of an `Authorization: Bearer <token>` header value.
pub fn parse_bearer(header: Option<&str>) -> Result<&str, AuthError> {
    let value = header.ok_or(AuthError::Missing)?;
    let token = value.strip_prefix("Bearer ").ok_or(AuthError::Missing)?.trim();
    if token.is_empty() {
        Err(AuthError::Missing)
    } else {
        Ok(token)
    }
}
