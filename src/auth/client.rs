use std::{fmt, time::Duration};
use tonic::{
    metadata::MetadataValue,
    transport::{Channel, Endpoint},
    Code, Request,
};

use crate::middleware::REQUEST_ID_HEADER;
use crate::proto::{auth_service_client::AuthServiceClient, VerifyRequest};

/// Outcome of a completed `Verify` call. A rejected token is not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenVerification {
    pub valid: bool,
    pub subject: String,
}

impl TokenVerification {
    fn rejected() -> Self {
        Self {
            valid: false,
            subject: String::new(),
        }
    }
}

#[derive(Debug)]
pub enum AuthClientError {
    /// The configured endpoint is not a valid URI.
    InvalidEndpoint(String),
    /// No answer within the configured timeout.
    Timeout,
    /// The auth service could not be reached.
    Unavailable(String),
    /// The auth service answered with an unexpected status.
    Rpc(String),
}

impl fmt::Display for AuthClientError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AuthClientError::InvalidEndpoint(msg) => write!(f, "invalid auth endpoint: {}", msg),
            AuthClientError::Timeout => write!(f, "auth service timeout"),
            AuthClientError::Unavailable(msg) => write!(f, "auth service unavailable: {}", msg),
            AuthClientError::Rpc(msg) => write!(f, "auth service error: {}", msg),
        }
    }
}

impl std::error::Error for AuthClientError {}

/// Caller of the auth service's `Verify` RPC with a fixed per-call timeout.
#[derive(Clone)]
pub struct RemoteAuthClient {
    client: AuthServiceClient<Channel>,
    timeout: Duration,
}

impl RemoteAuthClient {
    /// Connects lazily: nothing is dialed until the first call.
    pub fn connect_lazy(endpoint: &str, timeout: Duration) -> Result<Self, AuthClientError> {
        let channel = Endpoint::from_shared(endpoint.to_string())
            .map_err(|e| AuthClientError::InvalidEndpoint(e.to_string()))?
            .connect_lazy();
        Ok(Self::new(channel, timeout))
    }

    pub fn new(channel: Channel, timeout: Duration) -> Self {
        Self {
            client: AuthServiceClient::new(channel),
            timeout,
        }
    }

    pub async fn verify_token(
        &self,
        token: &str,
        request_id: &str,
    ) -> Result<TokenVerification, AuthClientError> {
        log::debug!(component = "auth_client", request_id = request_id; "calling auth service Verify");

        let mut request = Request::new(VerifyRequest {
            token: token.to_string(),
        });
        if !request_id.is_empty() {
            if let Ok(value) = MetadataValue::try_from(request_id) {
                request.metadata_mut().insert(REQUEST_ID_HEADER, value);
            }
        }

        let mut client = self.client.clone();
        let response = match tokio::time::timeout(self.timeout, client.verify(request)).await {
            Ok(response) => response,
            Err(_) => {
                log::warn!(component = "auth_client", request_id = request_id; "auth service timeout");
                return Err(AuthClientError::Timeout);
            }
        };

        match response {
            Ok(response) => {
                let response = response.into_inner();
                log::debug!(
                    component = "auth_client",
                    request_id = request_id,
                    valid = response.valid,
                    subject = response.subject.as_str();
                    "auth response received"
                );
                Ok(TokenVerification {
                    valid: response.valid,
                    subject: response.subject,
                })
            }
            Err(status) => match status.code() {
                Code::Unauthenticated => {
                    log::debug!(
                        component = "auth_client",
                        request_id = request_id,
                        token_present = !token.is_empty();
                        "token invalid"
                    );
                    Ok(TokenVerification::rejected())
                }
                Code::DeadlineExceeded => {
                    log::warn!(component = "auth_client", request_id = request_id; "auth service timeout");
                    Err(AuthClientError::Timeout)
                }
                Code::Unavailable => {
                    log::error!(
                        component = "auth_client",
                        request_id = request_id,
                        error = status.message();
                        "auth service unavailable"
                    );
                    Err(AuthClientError::Unavailable(status.message().to_string()))
                }
                code => {
                    log::error!(
                        component = "auth_client",
                        request_id = request_id,
                        code = code as i32,
                        error = status.message();
                        "auth service error"
                    );
                    Err(AuthClientError::Rpc(status.message().to_string()))
                }
            },
        }
    }
}
