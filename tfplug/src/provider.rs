//! Provider trait and related types
//!
//! The provider is configured once per Terraform run. Whatever it returns as
//! `provider_data` is handed to every resource and data source it creates.

use crate::data_source::DataSourceWithConfigure;
use crate::resource::ResourceWithConfigure;
use crate::schema::Schema;
use crate::types::{Diagnostic, DynamicValue};
use async_trait::async_trait;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// Factory producing an unconfigured resource instance
pub type ResourceFactory = fn() -> Box<dyn ResourceWithConfigure>;

/// Factory producing an unconfigured data source instance
pub type DataSourceFactory = fn() -> Box<dyn DataSourceWithConfigure>;

#[async_trait]
pub trait Provider: Send + Sync {
    /// Prefix shared by all resource and data source type names
    fn type_name(&self) -> &str;

    /// Schema of the provider configuration block
    fn schema(&self) -> Schema;

    async fn configure(&mut self, request: ConfigureProviderRequest) -> ConfigureProviderResponse;

    /// Keys MUST match each resource's `type_name()`
    fn resources(&self) -> HashMap<String, ResourceFactory>;

    fn data_sources(&self) -> HashMap<String, DataSourceFactory>;
}

pub struct ConfigureProviderRequest {
    pub terraform_version: String,
    pub config: DynamicValue,
}

pub struct ConfigureProviderResponse {
    pub provider_data: Option<Arc<dyn Any + Send + Sync>>,
    pub diagnostics: Vec<Diagnostic>,
}
