//! REST clients for the remote driver API.
//!
//! All clients share one [`ApiClient`], which owns the HTTP connection pool,
//! the base URL and the bearer-token header convention.

mod auth;
mod error_log;
mod http;
mod location;
mod user;

pub use auth::{AuthApi, Credentials};
pub use error_log::RestErrorReporter;
pub use http::{ApiClient, ClientError};
pub use location::{RestLocationSink, LOCATION_HISTORY_PATH, LOCATION_TRACK_PATH};
pub use user::{UserApi, UserProfile};
