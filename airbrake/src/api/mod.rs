//! Airbrake REST API client
//!
//! `client` owns the HTTP session and the generic verbs; `projects` maps the
//! project endpoints onto typed records.

pub mod client;
pub mod error;
pub mod projects;
#[cfg(test)]
pub(crate) mod test_helpers;

pub use client::{
    is_success, Client, ClientConfig, Credential, Credentials, RawResponse, Session, API_KEY_PARAM,
};
pub use error::{ApiError, ProjectKey};
pub use projects::{Project, ProjectsApi, SeverityThreshold, PROJECTS_PATH};
