// src/auth/extractor.rs
use super::{parse_bearer, AuthError, IdentityProvider};
use crate::error::ApiError;
use crate::middleware::RequestIdValue;
use actix_web::dev::Payload;
use actix_web::http::header::AUTHORIZATION;
use actix_web::{web, FromRequest, HttpMessage, HttpRequest};
use futures_util::future::LocalBoxFuture;
use tracing::{debug, error};

/// Verified caller. Requires `web::Data<dyn IdentityProvider>` in app data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub uid: String,
}

impl FromRequest for AuthenticatedUser {
    type Error = ApiError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let provider = req.app_data::<web::Data<dyn IdentityProvider>>().cloned();
        let token = parse_bearer(
            req.headers()
                .get(AUTHORIZATION)
                .and_then(|v| v.to_str().ok()),
        )
        .map(str::to_string);
        let request_id = req
            .extensions()
            .get::<RequestIdValue>()
            .map(|id| id.0.clone())
            .unwrap_or_default();

        Box::pin(async move {
            let token = token.map_err(|e| {
                debug!(request_id = %request_id, "request without bearer token");
                e
            })?;
            let Some(provider) = provider else {
                error!("identity provider missing from app data");
                return Err(ApiError::from(AuthError::Unavailable(
                    "not configured".into(),
                )));
            };
            match provider.verify(&token).await {
                Ok(uid) if !uid.is_empty() => Ok(AuthenticatedUser { uid }),
                Ok(_) => Err(AuthError::Invalid.into()),
                Err(e) => {
                    debug!(request_id = %request_id, reason = %e, "bearer token rejected");
                    Err(e.into())
                }
            }
        })
    }
}
