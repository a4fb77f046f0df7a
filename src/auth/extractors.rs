use actix_web::dev::Payload;
use actix_web::http::header::AUTHORIZATION;
use actix_web::{web, Error as ActixError, FromRequest, HttpMessage, HttpRequest};
use futures::future::{ready, LocalBoxFuture};
use std::sync::Arc;

use super::{CredentialStore, RemoteAuthClient, SESSION_COOKIE};
use crate::{error::AppError, middleware::RequestId};

/// How task routes authorize a caller.
///
/// `CookieSession` is the default; `RemoteToken` asks the auth service over gRPC.
#[derive(Clone)]
pub enum SessionAuthorizer {
    CookieSession(Arc<dyn CredentialStore>),
    RemoteToken(RemoteAuthClient),
}

/// Proof that the request passed the session gate.
///
/// Every task handler takes this as its first argument. Inside a scope wrapped
/// with `SessionGate` the check has already run before any body is read;
/// elsewhere the extractor runs it itself. Requires `web::Data<SessionAuthorizer>`
/// in app data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizedSession {
    /// `None` in cookie mode: the session cookie carries no identity.
    pub subject: Option<String>,
}

impl FromRequest for AuthorizedSession {
    type Error = ActixError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        // Already resolved by `SessionGate` on the task scope.
        if let Some(session) = req.extensions().get::<AuthorizedSession>().cloned() {
            return Box::pin(ready(Ok(session)));
        }
        let fut = authorize(req);
        Box::pin(async move { fut.await.map_err(ActixError::from) })
    }
}

/// Runs the configured session check against `req`. The returned future owns
/// everything it needs, so callers may consume the request afterwards.
pub fn authorize(req: &HttpRequest) -> LocalBoxFuture<'static, Result<AuthorizedSession, AppError>> {
    let request_id = RequestId::of(req);

    let authorizer = match req.app_data::<web::Data<SessionAuthorizer>>() {
        Some(authorizer) => authorizer.clone(),
        None => {
            let err = AppError::InternalServerError(
                "SessionAuthorizer missing from app data".to_string(),
            );
            return Box::pin(ready(Err(err)));
        }
    };

    match authorizer.get_ref() {
        SessionAuthorizer::CookieSession(credentials) => {
            let result = check_session_cookie(
                credentials.as_ref(),
                req.cookie(SESSION_COOKIE).as_ref().map(|c| c.value()),
                &request_id,
            );
            Box::pin(ready(result))
        }
        SessionAuthorizer::RemoteToken(client) => {
            let client = client.clone();
            let token = bearer_token(req).map(str::to_string);
            Box::pin(async move { check_remote_token(&client, token, &request_id).await })
        }
    }
}

fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

pub fn check_session_cookie(
    credentials: &dyn CredentialStore,
    session_id: Option<&str>,
    request_id: &RequestId,
) -> Result<AuthorizedSession, AppError> {
    let Some(session_id) = session_id else {
        log::warn!(component = "http_handler", request_id = request_id.as_str(); "session cookie missing");
        return Err(AppError::Unauthorized(
            "unauthorized - session cookie missing".into(),
        ));
    };

    if !credentials.is_valid_session(session_id) {
        log::warn!(component = "http_handler", request_id = request_id.as_str(); "invalid session");
        return Err(AppError::Unauthorized("unauthorized - invalid session".into()));
    }

    log::debug!(component = "http_handler", request_id = request_id.as_str(); "session verified successfully");
    Ok(AuthorizedSession { subject: None })
}

async fn check_remote_token(
    client: &RemoteAuthClient,
    token: Option<String>,
    request_id: &RequestId,
) -> Result<AuthorizedSession, AppError> {
    let token = token.ok_or_else(|| AppError::Unauthorized("unauthorized - bearer token missing".into()))?;

    let verification = client
        .verify_token(&token, request_id.as_str())
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    if !verification.valid {
        return Err(AppError::Unauthorized("unauthorized - invalid token".into()));
    }
    Ok(AuthorizedSession {
        subject: Some(verification.subject),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::DemoCredentials;
    use actix_web::cookie::Cookie;
    use actix_web::http::StatusCode;

    fn cookie_authorizer() -> web::Data<SessionAuthorizer> {
        web::Data::new(SessionAuthorizer::CookieSession(Arc::new(DemoCredentials)))
    }

    #[actix_rt::test]
    async fn test_valid_session_cookie() {
        let req = actix_web::test::TestRequest::default()
            .app_data(cookie_authorizer())
            .cookie(Cookie::new(SESSION_COOKIE, "demo-session-123"))
            .to_http_request();

        let session = AuthorizedSession::from_request(&req, &mut Payload::None).await;
        assert_eq!(session.unwrap(), AuthorizedSession { subject: None });
    }

    #[actix_rt::test]
    async fn test_missing_session_cookie() {
        let req = actix_web::test::TestRequest::default()
            .app_data(cookie_authorizer())
            .to_http_request();

        let err = AuthorizedSession::from_request(&req, &mut Payload::None)
            .await
            .unwrap_err();
        assert_eq!(err.error_response().status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_rt::test]
    async fn test_wrong_session_cookie() {
        let req = actix_web::test::TestRequest::default()
            .app_data(cookie_authorizer())
            .cookie(Cookie::new(SESSION_COOKIE, "guessed"))
            .to_http_request();

        let err = AuthorizedSession::from_request(&req, &mut Payload::None)
            .await
            .unwrap_err();
        assert_eq!(err.error_response().status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_rt::test]
    async fn test_missing_authorizer_is_internal_error() {
        let req = actix_web::test::TestRequest::default().to_http_request();
        let err = AuthorizedSession::from_request(&req, &mut Payload::None)
            .await
            .unwrap_err();
        assert_eq!(err.error_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_check_session_cookie_messages() {
        let id = RequestId::new("r");
        match check_session_cookie(&DemoCredentials, None, &id) {
            Err(AppError::Unauthorized(msg)) => assert_eq!(msg, "unauthorized - session cookie missing"),
            other => panic!("unexpected {:?}", other),
        }
        match check_session_cookie(&DemoCredentials, Some("x"), &id) {
            Err(AppError::Unauthorized(msg)) => assert_eq!(msg, "unauthorized - invalid session"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[actix_rt::test]
    async fn test_bearer_token_parsing() {
        let req = actix_web::test::TestRequest::default()
            .insert_header((AUTHORIZATION, "Bearer demo-token"))
            .to_http_request();
        assert_eq!(bearer_token(&req), Some("demo-token"));

        let req = actix_web::test::TestRequest::default()
            .insert_header((AUTHORIZATION, "Basic abc"))
            .to_http_request();
        assert_eq!(bearer_token(&req), None);
    }
}
