//! Provider data structure passed to resources and data sources

use std::any::Any;
use std::sync::Arc;

use tfplug::types::Diagnostic;

use crate::api::Client;
use crate::reconciler::ProjectReconciler;

/// Authenticated session shared by every resource and data source
#[derive(Clone)]
pub struct AirbrakeProviderData {
    pub client: Client,
}

impl AirbrakeProviderData {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn reconciler(&self) -> ProjectReconciler {
        ProjectReconciler::new(self.client.clone())
    }

    /// Downcast what the provider handed out during configure
    pub fn from_any(provider_data: Option<Arc<dyn Any + Send + Sync>>) -> Result<Self, Diagnostic> {
        let Some(data) = provider_data else {
            return Err(Diagnostic::error(
                "Unconfigured Airbrake client",
                "Expected a configured Airbrake client. The provider must be configured first.",
            ));
        };

        data.downcast_ref::<AirbrakeProviderData>()
            .cloned()
            .ok_or_else(|| {
                Diagnostic::error(
                    "Unexpected provider data type",
                    "Expected AirbrakeProviderData. Please report this issue to the provider developers.",
                )
            })
    }
}

pub(crate) fn not_configured() -> Diagnostic {
    Diagnostic::error(
        "Provider not configured",
        "Provider data was not properly configured",
    )
}
