//! Project reconciliation against Airbrake
//!
//! Airbrake has no fetch-by-id or filter-by-name endpoint, so every lookup
//! lists all projects and scans them in listing order. Nothing is cached
//! between calls; the orchestrator owns durable state.

use crate::api::{ApiError, Client, Project, ProjectKey};

/// Outcome of the two-phase create.
///
/// Phase one (POST with the name) either fails the whole operation or leaves
/// a project in Airbrake. Phase two sets the language; when it fails the
/// project stays behind with Airbrake's default language and
/// `language_error` says why. Nothing here deletes or retries it.
#[derive(Debug)]
pub struct CreateResult {
    pub created: Project,
    pub language_set: bool,
    pub language_error: Option<ApiError>,
}

impl CreateResult {
    /// Collapse into the strict outcome: a project only when both phases
    /// succeeded, otherwise the phase-two error
    pub fn into_project(self) -> Result<Project, ApiError> {
        match self.language_error {
            None => Ok(self.created),
            Some(err) => Err(err),
        }
    }
}

/// Lifecycle operations for Airbrake projects on top of an authenticated client
#[derive(Clone)]
pub struct ProjectReconciler {
    client: Client,
}

impl ProjectReconciler {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub async fn list_projects(&self) -> Result<Vec<Project>, ApiError> {
        self.client.projects().list().await
    }

    /// First project in listing order whose name matches exactly
    pub async fn get_project_by_name(&self, name: &str) -> Result<Project, ApiError> {
        let projects = self.list_projects().await?;
        find_by_name(projects, name)
            .ok_or_else(|| ApiError::NotFound(ProjectKey::Name(name.to_string())))
    }

    pub async fn get_project_by_id(&self, id: u64) -> Result<Project, ApiError> {
        let projects = self.list_projects().await?;
        find_by_id(projects, id).ok_or(ApiError::NotFound(ProjectKey::Id(id)))
    }

    /// Create a project and set its language, failing if either phase fails.
    ///
    /// A phase-two failure leaves the created project in Airbrake; use
    /// [`ProjectReconciler::create_project_staged`] to get hold of it.
    pub async fn create_project(&self, desired: &Project) -> Result<Project, ApiError> {
        self.create_project_staged(desired).await?.into_project()
    }

    /// Create a project and report how far the two phases got.
    ///
    /// Only `name` and `language` of `desired` are used.
    pub async fn create_project_staged(&self, desired: &Project) -> Result<CreateResult, ApiError> {
        tracing::info!(name = %desired.name, "Creating Airbrake project");
        let mut created = self.client.projects().create(&desired.name).await?;
        tracing::debug!(
            id = ?created.id,
            name = %created.name,
            "Project created, setting language"
        );

        let remote_language = std::mem::replace(&mut created.language, desired.language.clone());
        match self.update_project(&created).await {
            Ok(()) => Ok(CreateResult {
                created,
                language_set: true,
                language_error: None,
            }),
            Err(err) => {
                tracing::warn!(
                    id = ?created.id,
                    name = %created.name,
                    error = %err,
                    "Project was created but its language could not be set; it remains in Airbrake"
                );
                created.language = remote_language;
                Ok(CreateResult {
                    created,
                    language_set: false,
                    language_error: Some(err),
                })
            }
        }
    }

    /// Write the project's language; no other attribute is ever sent
    pub async fn update_project(&self, project: &Project) -> Result<(), ApiError> {
        let id = project.id.ok_or_else(|| ApiError::MissingIdentifier {
            name: project.name.clone(),
        })?;

        tracing::info!(id, language = %project.language, "Updating Airbrake project");
        self.client
            .projects()
            .update_language(id, &project.language)
            .await
    }

    /// Single DELETE, no read-back
    pub async fn delete_project(&self, id: u64) -> Result<(), ApiError> {
        tracing::info!(id, "Deleting Airbrake project");
        self.client.projects().delete(id).await
    }
}

fn find_by_name(projects: Vec<Project>, name: &str) -> Option<Project> {
    projects.into_iter().find(|p| p.name == name)
}

fn find_by_id(projects: Vec<Project>, id: u64) -> Option<Project> {
    projects.into_iter().find(|p| p.id == Some(id))
}
