use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage, ResponseError,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use std::rc::Rc;

use super::extractors::authorize;

/// Resolves the session check before the route's extractors run, so a request
/// that fails authorization is answered with 401 whatever its body holds. The
/// result is stored in request extensions for `AuthorizedSession`.
pub struct SessionGate;

impl<S, B> Transform<S, ServiceRequest> for SessionGate
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = SessionGateService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SessionGateService {
            service: Rc::new(service),
        }))
    }
}

pub struct SessionGateService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for SessionGateService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let check = authorize(req.request());

        Box::pin(async move {
            match check.await {
                Ok(session) => {
                    req.extensions_mut().insert(session);
                    service.call(req).await.map(ServiceResponse::map_into_left_body)
                }
                Err(app_err) => {
                    let response = app_err.error_response();
                    Ok(req.into_response(response).map_into_right_body())
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthorizedSession, DemoCredentials, SessionAuthorizer, SESSION_COOKIE};
    use actix_web::{cookie::Cookie, http::StatusCode, test, web, App, HttpResponse};
    use std::sync::Arc;

    fn authorizer() -> web::Data<SessionAuthorizer> {
        web::Data::new(SessionAuthorizer::CookieSession(Arc::new(DemoCredentials)))
    }

    #[actix_rt::test]
    async fn test_rejects_before_body_is_decoded() {
        let app = test::init_service(
            App::new().app_data(authorizer()).service(
                web::scope("/gated").wrap(SessionGate).route(
                    "",
                    web::post().to(
                        |_s: AuthorizedSession, _b: web::Json<serde_json::Value>| async {
                            HttpResponse::Ok().finish()
                        },
                    ),
                ),
            ),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/gated")
            .insert_header(("content-type", "application/json"))
            .set_payload("{broken")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "unauthorized - session cookie missing");
    }

    #[actix_rt::test]
    async fn test_passes_session_to_extractor() {
        let app = test::init_service(
            App::new().app_data(authorizer()).service(
                web::scope("/gated").wrap(SessionGate).route(
                    "",
                    web::get().to(|s: AuthorizedSession| async move {
                        HttpResponse::Ok().json(s.subject.is_none())
                    }),
                ),
            ),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/gated")
            .cookie(Cookie::new(SESSION_COOKIE, "demo-session-123"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
