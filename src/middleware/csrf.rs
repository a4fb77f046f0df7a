use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::Method,
    Error, ResponseError,
};
use futures::future::{ready, LocalBoxFuture, Ready};

use crate::{auth::CSRF_COOKIE, error::AppError, middleware::RequestId};

pub const CSRF_HEADER: &str = "X-CSRF-Token";

/// Double-submit CSRF check: for POST, PATCH and DELETE the `csrf_token`
/// cookie and the `X-CSRF-Token` header must both be present and equal.
/// Every other method passes through untouched.
pub struct CsrfMiddleware;

impl<S, B> Transform<S, ServiceRequest> for CsrfMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = CsrfMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(CsrfMiddlewareService { service }))
    }
}

pub struct CsrfMiddlewareService<S> {
    service: S,
}

pub fn is_state_changing(method: &Method) -> bool {
    method == Method::POST || method == Method::PATCH || method == Method::DELETE
}

/// Compares the cookie and header values of a state-changing request.
pub fn check_double_submit(cookie: Option<&str>, header: Option<&str>) -> Result<(), AppError> {
    let cookie = cookie.ok_or_else(|| AppError::Forbidden("CSRF token missing in cookies".into()))?;
    let header = header
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::Forbidden("X-CSRF-Token header missing".into()))?;
    if cookie != header {
        return Err(AppError::Forbidden("CSRF token mismatch".into()));
    }
    Ok(())
}

impl<S, B> Service<ServiceRequest> for CsrfMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if is_state_changing(req.method()) {
            let cookie = req.cookie(CSRF_COOKIE);
            let header = req
                .headers()
                .get(CSRF_HEADER)
                .and_then(|value| value.to_str().ok());

            if let Err(app_err) = check_double_submit(cookie.as_ref().map(|c| c.value()), header) {
                let request_id = RequestId::of(req.request());
                log::warn!(
                    request_id = request_id.as_str(),
                    method = req.method().as_str(),
                    path = req.path();
                    "csrf check failed: {}", app_err.public_message()
                );
                let response = app_err.error_response();
                return Box::pin(async move { Ok(req.into_response(response).map_into_right_body()) });
            }
        }

        let fut = self.service.call(req);
        Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) })
    }
}
