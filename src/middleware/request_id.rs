use crate::monitoring::metrics;
use actix_web::http::header::{HeaderName, HeaderValue};
use actix_web::{dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform}, Error, HttpMessage};
use futures_util::future::{ready, LocalBoxFuture, Ready};
use std::rc::Rc;
use std::time::Instant;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request id assigned by [`RequestId`], stored in request extensions.
#[derive(Debug, Clone)]
pub struct RequestIdValue(pub String);

/// Tags every request with a uuid, logs its outcome and echoes the id back
/// in `X-Request-Id`.
pub struct RequestId;

impl<S, B> Transform<S, ServiceRequest> for RequestId
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestIdMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestIdMiddleware {
            service: Rc::new(service),
        }))
    }
}

pub struct RequestIdMiddleware<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for RequestIdMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let request_id = Uuid::new_v4().to_string();
        req.extensions_mut().insert(RequestIdValue(request_id.clone()));
        let method = req.method().to_string();
        let uri = req.uri().path().to_string();
        let started = Instant::now();
        tracing::debug!(request_id = %request_id, method = %method, uri = %uri, "incoming request");

        let fut = self.service.call(req);
        Box::pin(async move {
            let result = fut.await;
            let duration_ms = started.elapsed().as_secs_f64() * 1000.0;
            let status = match &result {
                Ok(res) => res.status().as_u16(),
                Err(e) => e.as_response_error().status_code().as_u16(),
            };
            metrics::record_http_request(&method, status);
            tracing::info!(
                request_id = %request_id,
                method = %method,
                uri = %uri,
                status,
                duration_ms,
                "request completed"
            );

            let mut res = result?;
            if let Ok(value) = HeaderValue::from_str(&request_id) {
                res.headers_mut()
                    .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
            }
            Ok(res)
        })
    }
}
