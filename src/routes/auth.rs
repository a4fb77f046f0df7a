use crate::{
    auth::{CredentialStore, LoginRequest, LoginResponse, COOKIE_MAX_AGE_SECS, CSRF_COOKIE, SESSION_COOKIE},
    error::AppError,
    middleware::RequestId,
};
use actix_web::{
    cookie::{time::Duration, Cookie, SameSite},
    post, web, HttpResponse, Responder,
};

/// Login
///
/// Checks the credentials and sets the `session_id` (HttpOnly) and `csrf_token`
/// cookies. The CSRF cookie stays readable so the client can echo it in the
/// `X-CSRF-Token` header.
#[post("/login")]
pub async fn login(
    request_id: RequestId,
    credentials: web::Data<dyn CredentialStore>,
    login_data: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    let issued = match credentials.authenticate(&login_data.username, &login_data.password) {
        Some(issued) => issued,
        None => {
            log::warn!(
                component = "http_handler",
                request_id = request_id.as_str(),
                username = login_data.username.as_str();
                "failed login attempt"
            );
            return Err(AppError::Unauthorized("invalid credentials".into()));
        }
    };

    log::info!(
        component = "http_handler",
        request_id = request_id.as_str(),
        username = login_data.username.as_str();
        "login successful"
    );

    Ok(HttpResponse::Ok()
        .cookie(session_cookie(SESSION_COOKIE, issued.session_id, true))
        .cookie(session_cookie(CSRF_COOKIE, issued.csrf_token, false))
        .json(LoginResponse {
            message: "login successful, cookies set".to_string(),
        }))
}

fn session_cookie(name: &'static str, value: String, http_only: bool) -> Cookie<'static> {
    Cookie::build(name, value)
        .path("/")
        .secure(true)
        .http_only(http_only)
        .same_site(SameSite::Lax)
        .max_age(Duration::seconds(COOKIE_MAX_AGE_SECS))
        .finish()
}
