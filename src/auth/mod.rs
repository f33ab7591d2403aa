//! Auth session: sign in, sign out, and bearer token supply.
//!
//! The session keeps the token in the typed storage facade as a raw secret
//! under [`AUTH_TOKEN_KEY`], so it is usable as a header value without
//! decoding. The tracking engine only sees it through [`TokenProvider`].

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::clients::{ClientError, Credentials};
use crate::interfaces::{AuthError, TokenProvider};
use crate::storage::{Storage, AUTH_TOKEN_KEY};

/// Remote authentication operations.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Exchange credentials for a bearer token. `None` when the server
    /// answered without one.
    async fn login(&self, credentials: &Credentials) -> Result<Option<String>, ClientError>;

    /// Ask the server whether `token` is still accepted.
    async fn validate_token(&self, token: &str) -> Result<bool, ClientError>;
}

/// Signed-in user session backed by local storage.
pub struct AuthSession {
    authenticator: Arc<dyn Authenticator>,
    storage: Storage,
}

impl AuthSession {
    pub fn new(authenticator: Arc<dyn Authenticator>, storage: Storage) -> Self {
        Self {
            authenticator,
            storage,
        }
    }

    /// Log in and persist the returned token.
    pub async fn sign_in(&self, credentials: &Credentials) -> Result<String, AuthError> {
        let token = self
            .authenticator
            .login(credentials)
            .await?
            .ok_or(AuthError::MissingToken)?;

        self.storage.set_secret(AUTH_TOKEN_KEY, &token).await?;
        info!(email = %credentials.email, "Signed in");
        Ok(token)
    }

    /// Forget the stored token.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        self.storage.remove(AUTH_TOKEN_KEY).await?;
        info!("Signed out");
        Ok(())
    }

    /// Whether a stored token exists and the server still accepts it.
    pub async fn is_token_valid(&self) -> bool {
        let token = match self.storage.get_secret(AUTH_TOKEN_KEY).await {
            Ok(Some(token)) => token,
            Ok(None) => return false,
            Err(e) => {
                warn!(error = %e, "Could not read stored token");
                return false;
            }
        };

        match self.authenticator.validate_token(&token).await {
            Ok(valid) => valid,
            Err(e) => {
                warn!(error = %e, "Token validation failed");
                false
            }
        }
    }
}

#[async_trait]
impl TokenProvider for AuthSession {
    async fn token(&self) -> Result<Option<String>, AuthError> {
        Ok(self.storage.get_secret(AUTH_TOKEN_KEY).await?)
    }
}
