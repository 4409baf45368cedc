//! Resource implementations

pub mod project;

pub use project::{ProjectResource, PROJECT_RESOURCE_TYPE};
