//! Remote error log endpoint.

use std::sync::Arc;

use async_trait::async_trait;

use super::{ApiClient, ClientError};
use crate::diagnostics::{ErrorReport, ErrorReporter};

const ERROR_LOG_PATH: &str = "/api/error/log";

/// Error reporter posting to the backend's error log.
pub struct RestErrorReporter {
    api: Arc<ApiClient>,
}

impl RestErrorReporter {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl ErrorReporter for RestErrorReporter {
    async fn log_error(&self, report: &ErrorReport) -> Result<(), ClientError> {
        self.api.post(ERROR_LOG_PATH, report, None).await
    }
}
