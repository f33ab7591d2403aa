//! Bearer token supply interface.

use async_trait::async_trait;

use super::StorageError;
use crate::clients::ClientError;

/// Errors raised by authentication and token lookup.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Login response did not contain a token")]
    MissingToken,

    #[error("Authentication request failed: {0}")]
    Client(#[from] ClientError),

    #[error("Token storage failed: {0}")]
    Storage(#[from] StorageError),
}

/// Supplies the current bearer token on demand.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// The current token, or `None` when the user is signed out.
    async fn token(&self) -> Result<Option<String>, AuthError>;
}
