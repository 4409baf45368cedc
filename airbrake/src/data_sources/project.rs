//! Project data source implementation

use async_trait::async_trait;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceWithConfigure,
    ReadDataSourceRequest, ReadDataSourceResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};

use crate::provider_data::{not_configured, AirbrakeProviderData};
use crate::resources::project::project_state;

pub const PROJECT_DATA_SOURCE_TYPE: &str = "airbrake_project";

/// Looks up an existing project by its exact name
#[derive(Default)]
pub struct ProjectDataSource {
    provider_data: Option<AirbrakeProviderData>,
}

impl ProjectDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema_static() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Reads an existing Airbrake project by name")
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Exact, case-sensitive project name")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Numeric project identifier")
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
                    .computed()
                    .build(),
            )
            .build()
    }
}

#[async_trait]
impl DataSource for ProjectDataSource {
    fn type_name(&self) -> &str {
        PROJECT_DATA_SOURCE_TYPE
    }

    fn schema(&self) -> Schema {
        Self::schema_static()
    }

    async fn read(&self, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let mut diagnostics = vec![];

        let Some(provider_data) = &self.provider_data else {
            diagnostics.push(not_configured());
            return ReadDataSourceResponse {
                state: DynamicValue::null(),
                diagnostics,
            };
        };

        let name_path = AttributePath::new("name");
        let name = match request.config.get_string(&name_path) {
            Ok(name) => name,
            Err(e) => {
                diagnostics.push(
                    Diagnostic::error("Invalid name", e.to_string()).with_attribute(name_path),
                );
                return ReadDataSourceResponse {
                    state: DynamicValue::null(),
                    diagnostics,
                };
            }
        };

        match provider_data.reconciler().get_project_by_name(&name).await {
            Ok(project) => ReadDataSourceResponse {
                state: project_state(&project),
                diagnostics,
            },
            Err(e) => {
                diagnostics.push(Diagnostic::error("Unable to fetch project", e.to_string()));
                ReadDataSourceResponse {
                    state: DynamicValue::null(),
                    diagnostics,
                }
            }
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for ProjectDataSource {
    async fn configure(
        &mut self,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        let mut diagnostics = vec![];

        match AirbrakeProviderData::from_any(request.provider_data) {
            Ok(data) => self.provider_data = Some(data),
            Err(diag) => diagnostics.push(diag),
        }

        ConfigureDataSourceResponse { diagnostics }
    }
}
