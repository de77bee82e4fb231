//! Provider data structure passed to resources and data sources

use crate::api::Client;
use std::any::Any;
use std::sync::Arc;
use tfplug::types::Diagnostic;

#[derive(Clone, Debug)]
pub struct OctopusDeployProviderData {
    pub client: Arc<Client>,
}

impl OctopusDeployProviderData {
    pub fn new(client: Client) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    /// Recovers the provider data handed to a `configure` call.
    ///
    /// `None` is not an error: Terraform configures resources for validation
    /// before the provider itself has been configured.
    pub fn from_provider_data(
        data: Option<Arc<dyn Any + Send + Sync>>,
    ) -> Result<Option<Self>, Diagnostic> {
        let Some(data) = data else {
            return Ok(None);
        };

        data.downcast_ref::<OctopusDeployProviderData>()
            .cloned()
            .map(Some)
            .ok_or_else(|| {
                Diagnostic::error(
                    "Invalid provider data",
                    "Failed to extract OctopusDeployProviderData from provider data",
                )
            })
    }
}
