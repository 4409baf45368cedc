//! Project resource implementation

use async_trait::async_trait;
use std::collections::HashMap;
use tfplug::import::import_state_passthrough_id;
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ImportedResource,
    ReadResourceRequest, ReadResourceResponse, Resource, ResourceWithConfigure,
    UpdateResourceRequest, UpdateResourceResponse, ValidateResourceConfigRequest,
    ValidateResourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};

use crate::api::{ApiError, Project};
use crate::provider_data::{not_configured, AirbrakeProviderData};
use crate::reconciler::ProjectReconciler;

pub const PROJECT_RESOURCE_TYPE: &str = "airbrake_project";

#[derive(Default)]
pub struct ProjectResource {
    provider_data: Option<AirbrakeProviderData>,
}

impl ProjectResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema_static() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages an Airbrake project")
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Project name; changing it replaces the project")
                    .required()
                    .requires_replace()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Numeric project identifier assigned by Airbrake")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("api_key", AttributeType::String)
                    .description("Notifier API key of the project")
                    .computed()
                    .sensitive()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("language", AttributeType::String)
                    .description("Main language of the project")
                    .required()
                    .build(),
            )
            .build()
    }

    fn reconciler(&self) -> Result<ProjectReconciler, Diagnostic> {
        self.provider_data
            .as_ref()
            .map(AirbrakeProviderData::reconciler)
            .ok_or_else(not_configured)
    }
}

/// State document for a project as Airbrake reports it
pub(crate) fn project_state(project: &Project) -> DynamicValue {
    let id = project
        .id
        .map(|id| Dynamic::String(id.to_string()))
        .unwrap_or(Dynamic::Null);

    DynamicValue::new(Dynamic::Map(HashMap::from([
        ("id".to_string(), id),
        ("name".to_string(), Dynamic::String(project.name.clone())),
        ("api_key".to_string(), Dynamic::String(project.api_key.clone())),
        ("language".to_string(), Dynamic::String(project.language.clone())),
    ])))
}

fn project_id(state: &DynamicValue) -> Result<u64, Diagnostic> {
    let path = AttributePath::new("id");
    let raw = state.get_string(&path).map_err(|e| {
        Diagnostic::error("Missing project id", e.to_string()).with_attribute(path.clone())
    })?;
    raw.parse::<u64>().map_err(|_| {
        Diagnostic::error(
            "Invalid project id",
            format!("Expected a numeric Airbrake project id, got '{}'", raw),
        )
        .with_attribute(path)
    })
}

fn desired_project(value: &DynamicValue) -> Result<Project, Diagnostic> {
    let name = required_string(value, "name")?;
    let language = required_string(value, "language")?;
    Ok(Project::desired(name, language))
}

fn required_string(value: &DynamicValue, attribute: &str) -> Result<String, Diagnostic> {
    let path = AttributePath::new(attribute);
    value.get_string(&path).map_err(|e| {
        Diagnostic::error(format!("Invalid {}", attribute), e.to_string()).with_attribute(path)
    })
}

#[async_trait]
impl Resource for ProjectResource {
    fn type_name(&self) -> &str {
        PROJECT_RESOURCE_TYPE
    }

    fn schema(&self) -> Schema {
        Self::schema_static()
    }

    async fn validate(
        &self,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        let mut diagnostics = vec![];

        for attribute in ["name", "language"] {
            // Unknown values are settled at apply time
            if let Some(Dynamic::String(value)) =
                request.config.get(&AttributePath::new(attribute))
            {
                if value.trim().is_empty() {
                    diagnostics.push(
                        Diagnostic::error(
                            format!("Empty {}", attribute),
                            format!("{} must not be empty", attribute),
                        )
                        .with_attribute(AttributePath::new(attribute)),
                    );
                }
            }
        }

        ValidateResourceConfigResponse { diagnostics }
    }

    async fn create(&self, request: CreateResourceRequest) -> CreateResourceResponse {
        let mut diagnostics = vec![];

        let reconciler = match self.reconciler() {
            Ok(reconciler) => reconciler,
            Err(diag) => {
                diagnostics.push(diag);
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                };
            }
        };

        let desired = match desired_project(&request.planned_state) {
            Ok(project) => project,
            Err(diag) => {
                diagnostics.push(diag);
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                };
            }
        };

        match reconciler.create_project_staged(&desired).await {
            Ok(result) => {
                if let Some(err) = &result.language_error {
                    let id = result
                        .created
                        .id
                        .map(|id| id.to_string())
                        .unwrap_or_default();
                    diagnostics.push(Diagnostic::error(
                        "Project created without its language",
                        format!(
                            "Airbrake project {} ('{}') was created but setting its language to '{}' failed: {}. \
                             The project still exists in Airbrake.",
                            id, result.created.name, desired.language, err
                        ),
                    ));
                }
                CreateResourceResponse {
                    new_state: project_state(&result.created),
                    diagnostics,
                }
            }
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Error creating project",
                    format!("Could not create project, unexpected error: {}", e),
                ));
                CreateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                }
            }
        }
    }

    async fn read(&self, request: ReadResourceRequest) -> ReadResourceResponse {
        let mut diagnostics = vec![];

        let reconciler = match self.reconciler() {
            Ok(reconciler) => reconciler,
            Err(diag) => {
                diagnostics.push(diag);
                return ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics,
                };
            }
        };

        let id = match project_id(&request.current_state) {
            Ok(id) => id,
            Err(diag) => {
                diagnostics.push(diag);
                return ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics,
                };
            }
        };

        match reconciler.get_project_by_id(id).await {
            Ok(project) => ReadResourceResponse {
                new_state: Some(project_state(&project)),
                diagnostics,
            },
            Err(ApiError::NotFound(_)) => {
                tracing::info!(id, "Airbrake project no longer exists, removing from state");
                ReadResourceResponse {
                    new_state: None,
                    diagnostics,
                }
            }
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Error reading Airbrake project",
                    format!("Could not read Airbrake project {}: {}", id, e),
                ));
                ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics,
                }
            }
        }
    }

    async fn update(&self, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let mut diagnostics = vec![];

        let reconciler = match self.reconciler() {
            Ok(reconciler) => reconciler,
            Err(diag) => {
                diagnostics.push(diag);
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    diagnostics,
                };
            }
        };

        let (id, language) = match (
            project_id(&request.prior_state),
            required_string(&request.planned_state, "language"),
        ) {
            (Ok(id), Ok(language)) => (id, language),
            (Err(diag), _) | (_, Err(diag)) => {
                diagnostics.push(diag);
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    diagnostics,
                };
            }
        };

        let project = Project {
            id: Some(id),
            name: request
                .prior_state
                .get_string(&AttributePath::new("name"))
                .unwrap_or_default(),
            language: language.clone(),
            ..Default::default()
        };

        match reconciler.update_project(&project).await {
            Ok(()) => {
                let mut new_state = request.prior_state;
                if let Err(e) = new_state.set_string(&AttributePath::new("language"), language) {
                    diagnostics.push(Diagnostic::error(
                        "Error recording project language",
                        e.to_string(),
                    ));
                }
                UpdateResourceResponse {
                    new_state,
                    diagnostics,
                }
            }
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Error updating Airbrake project",
                    format!("Could not update project {}: {}", id, e),
                ));
                UpdateResourceResponse {
                    new_state: request.prior_state,
                    diagnostics,
                }
            }
        }
    }

    async fn delete(&self, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let mut diagnostics = vec![];

        let reconciler = match self.reconciler() {
            Ok(reconciler) => reconciler,
            Err(diag) => {
                diagnostics.push(diag);
                return DeleteResourceResponse { diagnostics };
            }
        };

        match project_id(&request.prior_state) {
            Ok(id) => {
                if let Err(e) = reconciler.delete_project(id).await {
                    diagnostics.push(Diagnostic::error(
                        "Error deleting Airbrake project",
                        format!("Could not delete project {}: {}", id, e),
                    ));
                }
            }
            Err(diag) => diagnostics.push(diag),
        }

        DeleteResourceResponse { diagnostics }
    }

    /// Numeric ids pass straight through; anything else is looked up by name
    async fn import_state(
        &self,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut response = ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
        };

        if request.id.parse::<u64>().is_ok() {
            import_state_passthrough_id(AttributePath::new("id"), &request, &mut response);
            return response;
        }

        let reconciler = match self.reconciler() {
            Ok(reconciler) => reconciler,
            Err(diag) => {
                response.diagnostics.push(diag);
                return response;
            }
        };

        match reconciler.get_project_by_name(&request.id).await {
            Ok(project) => response.imported_resources.push(ImportedResource {
                type_name: request.type_name,
                state: project_state(&project),
            }),
            Err(e) => response.diagnostics.push(Diagnostic::error(
                "Cannot import Airbrake project",
                e.to_string(),
            )),
        }

        response
    }
}

#[async_trait]
impl ResourceWithConfigure for ProjectResource {
    async fn configure(&mut self, request: ConfigureResourceRequest) -> ConfigureResourceResponse {
        let mut diagnostics = vec![];

        match AirbrakeProviderData::from_any(request.provider_data) {
            Ok(data) => self.provider_data = Some(data),
            Err(diag) => diagnostics.push(diag),
        }

        ConfigureResourceResponse { diagnostics }
    }
}
