//! Project records and the raw project endpoints

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::client::{is_success, Client, RawResponse};
use super::error::ApiError;

pub const PROJECTS_PATH: &str = "projects";

/// An Airbrake project.
///
/// `id` is absent until the project exists remotely. Only `name` and
/// `language` are ever written; everything else is reported by Airbrake and
/// passed through untouched.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Project {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub api_key: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub language: String,

    #[serde(default)]
    pub account_id: Option<u64>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub resolve_errors_on_deploy: Option<bool>,
    #[serde(default)]
    pub min_app_version: Option<String>,
    #[serde(default)]
    pub strict_error_types: Option<Value>,
    #[serde(default)]
    pub global_error_types: Option<Value>,
    #[serde(default)]
    pub exceptional_app_id: Option<Value>,
    #[serde(default)]
    pub severity_threshold: Option<SeverityThreshold>,
    #[serde(default)]
    pub retention_period_days: Option<u32>,
    #[serde(default)]
    pub enable_old_grouping: Option<bool>,
    #[serde(default)]
    pub first_notice_received_at: Option<String>,
    #[serde(default)]
    pub apdex_threshold: Option<Value>,
    #[serde(default)]
    pub notifier_name: Option<String>,
    #[serde(default)]
    pub notifier_version: Option<String>,
    #[serde(default, rename = "anomaly_notification_environments")]
    pub anomaly_notification_envs: Option<Vec<String>>,
    #[serde(default)]
    pub last_deploy_at: Option<String>,
    #[serde(default)]
    pub server_error_alert_threshold: Option<u32>,
    #[serde(default)]
    pub last_comment_at: Option<String>,
    #[serde(default)]
    pub last_user_group_resolved_at: Option<String>,
    #[serde(default)]
    pub is_first_project: Option<bool>,
    #[serde(default)]
    pub demo_mode_until_date: Option<String>,
}

impl Project {
    /// Desired state for a project that does not exist yet
    pub fn desired(name: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            language: language.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SeverityThreshold {
    #[serde(default)]
    pub level: Option<String>,
}

/// Response from GET projects
#[derive(Debug, Deserialize)]
struct ProjectsResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    projects: Vec<Project>,
}

/// Request body for PUT projects/{id}; language is the only writable field
#[derive(Debug, Serialize)]
pub struct UpdateProjectRequest<'a> {
    pub language: &'a str,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Client {
    /// Project API operations
    pub fn projects(&self) -> ProjectsApi<'_> {
        ProjectsApi::new(self)
    }
}

/// Projects API for the raw project endpoints
pub struct ProjectsApi<'a> {
    client: &'a Client,
}

impl<'a> ProjectsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET projects
    pub async fn list(&self) -> Result<Vec<Project>, ApiError> {
        let response = self.client.list(PROJECTS_PATH, &[]).await?;
        let response = expect_success("list projects", response)?;

        let decoded: ProjectsResponse = serde_json::from_slice(&response.body).map_err(|e| {
            tracing::error!("Failed to decode project listing: {}", e);
            ApiError::malformed("list projects", e)
        })?;
        Ok(decoded.projects)
    }

    /// POST projects?name=...; Airbrake ignores every other field here
    pub async fn create(&self, name: &str) -> Result<Project, ApiError> {
        let response = self.client.create(PROJECTS_PATH, &[("name", name)]).await?;
        let response = expect_success("create project", response)?;

        let project: Project = serde_json::from_slice(&response.body).map_err(|e| {
            tracing::error!("Failed to decode created project: {}", e);
            ApiError::malformed("create project", e)
        })?;
        if project.id.is_none() {
            return Err(ApiError::malformed(
                "create project",
                "created project has no id",
            ));
        }
        Ok(project)
    }

    /// PUT projects/{id} with the language
    pub async fn update_language(&self, id: u64, language: &str) -> Result<(), ApiError> {
        let status = self
            .client
            .update(
                PROJECTS_PATH,
                &id.to_string(),
                &UpdateProjectRequest { language },
            )
            .await?;
        check_status("update project", status)
    }

    /// DELETE projects/{id}
    pub async fn delete(&self, id: u64) -> Result<(), ApiError> {
        let status = self.client.remove(PROJECTS_PATH, &id.to_string()).await?;
        check_status("delete project", status)
    }
}

fn expect_success(operation: &str, response: RawResponse) -> Result<RawResponse, ApiError> {
    if response.is_success() {
        return Ok(response);
    }
    Err(ApiError::Api {
        operation: operation.to_string(),
        status: response.status,
        body: response.body_text(),
    })
}

fn check_status(operation: &str, status: u16) -> Result<(), ApiError> {
    if is_success(status) {
        return Ok(());
    }
    Err(ApiError::Api {
        operation: operation.to_string(),
        status,
        body: String::new(),
    })
}
