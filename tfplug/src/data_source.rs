//! DataSource trait and related types

use crate::schema::Schema;
use crate::types::{Diagnostic, DynamicValue};
use async_trait::async_trait;
use std::any::Any;
use std::sync::Arc;

/// Base trait for data sources - read is the only operation
#[async_trait]
pub trait DataSource: Send + Sync {
    /// MUST match the key used in Provider::data_sources()
    fn type_name(&self) -> &str;

    fn schema(&self) -> Schema;

    /// MUST populate all attributes in response.state
    async fn read(&self, request: ReadDataSourceRequest) -> ReadDataSourceResponse;
}

pub struct ReadDataSourceRequest {
    pub type_name: String,
    pub config: DynamicValue,
}

pub struct ReadDataSourceResponse {
    pub state: DynamicValue,
    pub diagnostics: Vec<Diagnostic>,
}

/// Called immediately after the factory creates the data source
#[async_trait]
pub trait DataSourceWithConfigure: DataSource {
    async fn configure(
        &mut self,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse;
}

pub struct ConfigureDataSourceRequest {
    pub provider_data: Option<Arc<dyn Any + Send + Sync>>,
}

pub struct ConfigureDataSourceResponse {
    pub diagnostics: Vec<Diagnostic>,
}
