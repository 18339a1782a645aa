// src/auth/identity_toolkit.rs
// Verifies Firebase ID tokens with the Identity Toolkit accounts:lookup API.

use super::{AuthError, IdentityProvider};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://identitytoolkit.googleapis.com";

pub struct IdentityToolkitVerifier {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LookupRequest<'a> {
    id_token: &'a str,
}

#[derive(Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    #[serde(default)]
    disabled: bool,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

impl IdentityToolkitVerifier {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }
}

/// Map an Identity Toolkit error code to our taxonomy.
pub fn classify_error(message: &str) -> AuthError {
    // Messages look like "TOKEN_EXPIRED" or "INVALID_ID_TOKEN : details"
    let code = message.split(':').next().unwrap_or("").trim();
    match code {
        "TOKEN_EXPIRED" => AuthError::Expired,
        "USER_DISABLED" | "TOKEN_REVOKED" => AuthError::Revoked,
        _ => AuthError::Invalid,
    }
}

#[async_trait]
impl IdentityProvider for IdentityToolkitVerifier {
    async fn verify(&self, token: &str) -> Result<String, AuthError> {
        let url = format!("{}/v1/accounts:lookup?key={}", self.base_url, self.api_key);
        let response = self
            .client
            .post(&url)
            .json(&LookupRequest { id_token: token })
            .send()
            .await
            .map_err(|e| AuthError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(AuthError::Unavailable(format!("status {}", status)));
        }
        if !status.is_success() {
            let message = response
                .json::<ErrorEnvelope>()
                .await
                .map(|e| e.error.message)
                .unwrap_or_default();
            debug!(status = status.as_u16(), message = %message, "token rejected");
            return Err(classify_error(&message));
        }

        let body: LookupResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Unavailable(e.to_string()))?;
        match body.users.into_iter().next() {
            Some(user) if user.disabled => Err(AuthError::Revoked),
            Some(user) if !user.local_id.is_empty() => Ok(user.local_id),
            _ => {
                warn!("accounts:lookup returned no user for a valid token");
                Err(AuthError::Invalid)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_error() {
        assert_eq!(classify_error("TOKEN_EXPIRED"), AuthError::Expired);
        assert_eq!(classify_error("USER_DISABLED"), AuthError::Revoked);
        assert_eq!(classify_error("INVALID_ID_TOKEN : bad sig"), AuthError::Invalid);
        assert_eq!(classify_error(""), AuthError::Invalid);
    }
}
