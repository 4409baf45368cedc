//! Terraform provider for Airbrake projects
//!
//! `api` talks to Airbrake, `reconciler` turns desired projects into API
//! calls, and the resource and data source adapt both to the tfplug traits.

pub mod api;
pub mod config;
pub mod data_sources;
pub mod provider_data;
pub mod reconciler;
pub mod resources;

pub use provider_data::AirbrakeProviderData;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tfplug::data_source::DataSourceWithConfigure;
use tfplug::provider::{
    ConfigureProviderRequest, ConfigureProviderResponse, DataSourceFactory, Provider,
    ResourceFactory,
};
use tfplug::resource::ResourceWithConfigure;
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::Diagnostic;

use crate::api::{Client, ClientConfig};
use crate::config::ProviderConfig;
use crate::data_sources::{ProjectDataSource, PROJECT_DATA_SOURCE_TYPE};
use crate::resources::{ProjectResource, PROJECT_RESOURCE_TYPE};

#[derive(Default)]
pub struct AirbrakeProvider {
    client_config: ClientConfig,
    provider_data: Option<AirbrakeProviderData>,
}

impl AirbrakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use custom HTTP timeouts and user agent for every request
    pub fn with_client_config(client_config: ClientConfig) -> Self {
        Self {
            client_config,
            provider_data: None,
        }
    }

    /// Data handed to resources after a successful configure
    pub fn provider_data(&self) -> Option<&AirbrakeProviderData> {
        self.provider_data.as_ref()
    }
}

#[async_trait]
impl Provider for AirbrakeProvider {
    fn type_name(&self) -> &str {
        "airbrake"
    }

    fn schema(&self) -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Interact with Airbrake")
            .attribute(
                AttributeBuilder::new("base_url", AttributeType::String)
                    .description("Airbrake API base URL. May also be set with AIRBRAKE_BASE_URL")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("email", AttributeType::String)
                    .description("Airbrake account email. May also be set with AIRBRAKE_EMAIL")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("password", AttributeType::String)
                    .description("Airbrake account password. May also be set with AIRBRAKE_PASSWORD")
                    .optional()
                    .sensitive()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("api_key", AttributeType::String)
                    .description("Airbrake user API key. May also be set with AIRBRAKE_API_KEY")
                    .optional()
                    .sensitive()
                    .build(),
            )
            .build()
    }

    async fn configure(&mut self, request: ConfigureProviderRequest) -> ConfigureProviderResponse {
        let mut diagnostics = vec![];

        let config = match ProviderConfig::resolve(&request.config) {
            Ok(config) => config,
            Err(diags) => {
                return ConfigureProviderResponse {
                    provider_data: None,
                    diagnostics: diags,
                };
            }
        };

        tracing::debug!(base_url = %config.base_url, "Configuring Airbrake provider");

        match Client::authenticate_with_config(
            &config.base_url,
            &config.credentials,
            &self.client_config,
        )
        .await
        {
            Ok(client) => {
                let data = AirbrakeProviderData::new(client);
                self.provider_data = Some(data.clone());
                ConfigureProviderResponse {
                    provider_data: Some(Arc::new(data)),
                    diagnostics,
                }
            }
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Unable to create Airbrake API client",
                    format!(
                        "An unexpected error occurred when creating the Airbrake API client.\n\nAirbrake client error: {}",
                        e
                    ),
                ));
                ConfigureProviderResponse {
                    provider_data: None,
                    diagnostics,
                }
            }
        }
    }

    fn resources(&self) -> HashMap<String, ResourceFactory> {
        let mut resources = HashMap::new();
        resources.insert(
            PROJECT_RESOURCE_TYPE.to_string(),
            (|| -> Box<dyn ResourceWithConfigure> { Box::new(ProjectResource::new()) })
                as ResourceFactory,
        );
        resources
    }

    fn data_sources(&self) -> HashMap<String, DataSourceFactory> {
        let mut data_sources = HashMap::new();
        data_sources.insert(
            PROJECT_DATA_SOURCE_TYPE.to_string(),
            (|| -> Box<dyn DataSourceWithConfigure> { Box::new(ProjectDataSource::new()) })
                as DataSourceFactory,
        );
        data_sources
    }
}
