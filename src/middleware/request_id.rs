use std::future::{ready, Ready};

use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderMap, HeaderName, HeaderValue},
    Error, FromRequest, HttpMessage, HttpRequest,
};
use futures_util::future::LocalBoxFuture;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

const MAX_REQUEST_ID_LEN: usize = 128;

/// Correlation id for one request, available to handlers as an extractor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestIdValue(pub String);

impl RequestIdValue {
    /// Use the caller's id when it is printable and short, otherwise mint one
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let supplied = headers
            .get(REQUEST_ID_HEADER)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|s| {
                !s.is_empty()
                    && s.len() <= MAX_REQUEST_ID_LEN
                    && s.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            });

        match supplied {
            Some(id) => Self(id.to_string()),
            None => Self(Uuid::new_v4().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RequestIdValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromRequest for RequestIdValue {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    // Without the middleware the id is derived from the headers on the spot
    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let id = req
            .extensions()
            .get::<RequestIdValue>()
            .cloned()
            .unwrap_or_else(|| RequestIdValue::from_headers(req.headers()));
        ready(Ok(id))
    }
}

/// Attaches a [`RequestIdValue`] to every request and echoes it as `X-Request-ID`
pub struct RequestId;

impl<S, B> Transform<S, ServiceRequest> for RequestId
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestIdMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestIdMiddleware { service }))
    }
}

pub struct RequestIdMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for RequestIdMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let request_id = RequestIdValue::from_headers(req.headers());
        req.extensions_mut().insert(request_id.clone());

        let fut = self.service.call(req);

        Box::pin(async move {
            let mut res = fut.await?;

            if let Ok(value) = HeaderValue::from_str(request_id.as_str()) {
                res.headers_mut()
                    .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
            }

            if res.status().is_server_error() {
                tracing::error!(request_id = %request_id, status = %res.status(), "Request failed");
            }

            Ok(res)
        })
    }
}
