//! Authentication endpoints.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{ApiClient, ClientError};
use crate::auth::Authenticator;

const LOGIN_PATH: &str = "/auth/login";
const VALIDATE_PATH: &str = "/auth/validate";

/// Login credentials.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"********")
            .finish()
    }
}

#[derive(Deserialize)]
struct LoginResponse {
    #[serde(default)]
    token: Option<String>,
}

#[derive(Deserialize)]
struct ValidateResponse {
    #[serde(default)]
    valid: bool,
}

/// Client for the login and token validation endpoints.
pub struct AuthApi {
    api: Arc<ApiClient>,
}

impl AuthApi {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Authenticator for AuthApi {
    async fn login(&self, credentials: &Credentials) -> Result<Option<String>, ClientError> {
        let response: LoginResponse = self.api.post_json(LOGIN_PATH, credentials, None).await?;
        Ok(response.token.filter(|t| !t.is_empty()))
    }

    async fn validate_token(&self, token: &str) -> Result<bool, ClientError> {
        if token.is_empty() {
            return Err(ClientError::InvalidArgument("No token provided".to_string()));
        }

        match self
            .api
            .get_json::<ValidateResponse>(VALIDATE_PATH, Some(token))
            .await
        {
            Ok(response) => Ok(response.valid),
            Err(e) => {
                warn!(error = %e, "Token validation failed");
                Ok(false)
            }
        }
    }
}
