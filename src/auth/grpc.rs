use std::sync::Arc;
use tonic::{Request, Response, Status};

use super::CredentialStore;
use crate::middleware::REQUEST_ID_HEADER;
use crate::proto::auth_service_server::AuthService;
use crate::proto::{VerifyRequest, VerifyResponse};

/// gRPC side of the auth service: checks bearer tokens for other services.
pub struct AuthGrpcService {
    credentials: Arc<dyn CredentialStore>,
}

impl AuthGrpcService {
    pub fn new(credentials: Arc<dyn CredentialStore>) -> Self {
        Self { credentials }
    }
}

/// Request id forwarded by the caller, or empty.
pub fn request_id_from_metadata<T>(request: &Request<T>) -> String {
    request
        .metadata()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

#[tonic::async_trait]
impl AuthService for AuthGrpcService {
    async fn verify(
        &self,
        request: Request<VerifyRequest>,
    ) -> Result<Response<VerifyResponse>, Status> {
        let request_id = request_id_from_metadata(&request);
        let token = request.into_inner().token;

        match self.credentials.verify_token(&token) {
            Some(subject) => {
                log::info!(
                    component = "grpc_server",
                    request_id = request_id.as_str(),
                    subject = subject.as_str();
                    "token verified successfully"
                );
                Ok(Response::new(VerifyResponse {
                    valid: true,
                    subject,
                }))
            }
            None => {
                log::warn!(
                    component = "grpc_server",
                    request_id = request_id.as_str(),
                    token_present = !token.is_empty();
                    "invalid token attempt"
                );
                Err(Status::unauthenticated("invalid token"))
            }
        }
    }
}
