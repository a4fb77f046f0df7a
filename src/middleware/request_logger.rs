use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::USER_AGENT,
    Error,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use std::time::Instant;

use super::RequestId;

/// One structured `request completed` record per request, tagged with the request id.
/// Must sit inside `RequestIdMiddleware`.
pub struct RequestLogger;

impl<S, B> Transform<S, ServiceRequest> for RequestLogger
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = RequestLoggerService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestLoggerService { service }))
    }
}

/// Socket peer address. Forwarding headers are client-controlled and ignored.
fn remote_ip(req: &ServiceRequest) -> String {
    req.peer_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub struct RequestLoggerService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for RequestLoggerService<S>
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
        let started = Instant::now();
        let request_id = RequestId::of(req.request());
        let method = req.method().to_string();
        let path = req.path().to_string();
        let remote_ip = remote_ip(&req);
        let user_agent = req
            .headers()
            .get(USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("")
            .to_string();

        log::debug!(request_id = request_id.as_str(); "request started: {} {}", method, path);

        let fut = self.service.call(req);

        Box::pin(async move {
            let result = fut.await;
            let status = match &result {
                Ok(res) => res.status().as_u16(),
                Err(e) => e.error_response().status().as_u16(),
            };
            log::info!(
                request_id = request_id.as_str(),
                method = method.as_str(),
                path = path.as_str(),
                status = status,
                duration_ms = started.elapsed().as_millis() as u64,
                remote_ip = remote_ip.as_str(),
                user_agent = user_agent.as_str();
                "request completed"
            );
            result
        })
    }
}
