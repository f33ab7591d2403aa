//! User profile endpoint.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{ApiClient, ClientError};

/// Driver profile as returned by the backend.
///
/// Only the identifying fields are typed; everything else is kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

/// Client for user lookups.
pub struct UserApi {
    api: Arc<ApiClient>,
}

impl UserApi {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    /// Fetch a user profile by id.
    pub async fn get_user(&self, user_id: &str, token: Option<&str>) -> Result<UserProfile, ClientError> {
        if user_id.trim().is_empty() {
            return Err(ClientError::InvalidArgument("User Id is required".to_string()));
        }

        self.api.get_json(&format!("/user/{}", user_id), token).await
    }
}
