pub mod client;
pub mod extractors;
pub mod grpc;
pub mod middleware;

use serde::{Deserialize, Serialize};

pub use client::{AuthClientError, RemoteAuthClient, TokenVerification};
pub use extractors::{AuthorizedSession, SessionAuthorizer};
pub use grpc::AuthGrpcService;
pub use middleware::SessionGate;

/// Name of the cookie carrying the session identifier.
pub const SESSION_COOKIE: &str = "session_id";
/// Name of the cookie carrying the CSRF token; mirrored by the `X-CSRF-Token` header.
pub const CSRF_COOKIE: &str = "csrf_token";
/// Lifetime of both cookies, in seconds.
pub const COOKIE_MAX_AGE_SECS: i64 = 3600;

const DEMO_USERNAME: &str = "student";
const DEMO_PASSWORD: &str = "student";
const DEMO_SESSION_ID: &str = "demo-session-123";
const DEMO_CSRF_TOKEN: &str = "demo-csrf-456";
const DEMO_BEARER_TOKEN: &str = "demo-token";
const DEMO_SUBJECT: &str = "student";

/// Session material handed out on a successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedSession {
    pub session_id: String,
    pub csrf_token: String,
}

/// Source of truth for credentials, sessions and bearer tokens.
///
/// Both services only talk to this trait, so real verification can replace
/// `DemoCredentials` without touching handlers.
pub trait CredentialStore: Send + Sync {
    /// `None` when the pair is not recognised.
    fn authenticate(&self, username: &str, password: &str) -> Option<IssuedSession>;

    fn is_valid_session(&self, session_id: &str) -> bool;

    /// Subject of a valid bearer token.
    fn verify_token(&self, token: &str) -> Option<String>;
}

/// The single hardcoded teaching account. Every login gets the same session.
#[derive(Debug, Default, Clone, Copy)]
pub struct DemoCredentials;

impl CredentialStore for DemoCredentials {
    fn authenticate(&self, username: &str, password: &str) -> Option<IssuedSession> {
        if username == DEMO_USERNAME && password == DEMO_PASSWORD {
            Some(IssuedSession {
                session_id: DEMO_SESSION_ID.to_string(),
                csrf_token: DEMO_CSRF_TOKEN.to_string(),
            })
        } else {
            None
        }
    }

    fn is_valid_session(&self, session_id: &str) -> bool {
        session_id == DEMO_SESSION_ID
    }

    fn verify_token(&self, token: &str) -> Option<String> {
        (token == DEMO_BEARER_TOKEN).then(|| DEMO_SUBJECT.to_string())
    }
}

/// Payload of `POST /v1/auth/login`.
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Body returned after a successful login; the session itself travels in cookies.
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub message: String,
}
