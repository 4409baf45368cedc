//! tfplug - Terraform provider capability interface for Rust
//!
//! The orchestrator-facing half of a provider: attribute values, diagnostics,
//! schemas and the lifecycle traits a provider implements. The wire transport
//! between Terraform and the plugin process lives elsewhere; everything here is
//! plain data and async traits so providers can be driven and tested directly.

// Core modules
pub mod error;
pub mod schema;
pub mod types;

// Provider API modules
pub mod data_source;
pub mod provider;
pub mod resource;

// Helper modules
pub mod import;

// Re-exports for convenience
pub use data_source::{DataSource, DataSourceWithConfigure};
pub use error::{Result, TfplugError};
pub use import::import_state_passthrough_id;
pub use provider::{DataSourceFactory, Provider, ResourceFactory};
pub use resource::{Resource, ResourceWithConfigure};
pub use schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
pub use types::{has_errors, AttributePath, Diagnostic, DiagnosticSeverity, Dynamic, DynamicValue};
