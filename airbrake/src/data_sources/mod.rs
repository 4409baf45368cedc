//! Data source implementations

pub mod project;

pub use project::{ProjectDataSource, PROJECT_DATA_SOURCE_TYPE};
