pub mod api;
pub mod config;
pub mod data_sources;
pub mod logging;
pub mod provider_data;
pub mod resources;

pub use provider_data::OctopusDeployProviderData;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tfplug::context::Context;
use tfplug::provider::{
    ConfigureProviderRequest, ConfigureProviderResponse, DataSourceFactory, Provider,
    ProviderMetadataRequest, ProviderMetadataResponse, ProviderSchemaRequest,
    ProviderSchemaResponse, ResourceFactory, ValidateProviderConfigRequest,
    ValidateProviderConfigResponse,
};
use tfplug::types::Diagnostic;

use api::RetryConfig;
use config::ProviderConfig;

pub const PROVIDER_NAME: &str = "octopusdeploy";

pub struct OctopusDeployProvider {
    provider_data: Option<OctopusDeployProviderData>,
    retry_config: RetryConfig,
}

impl Default for OctopusDeployProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl OctopusDeployProvider {
    pub fn new() -> Self {
        Self {
            provider_data: None,
            retry_config: RetryConfig::default(),
        }
    }

    /// Overrides the client's retry policy, mainly so tests fail fast
    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    pub fn provider_data(&self) -> Option<&OctopusDeployProviderData> {
        self.provider_data.as_ref()
    }
}

#[async_trait]
impl Provider for OctopusDeployProvider {
    fn type_name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ProviderMetadataRequest,
    ) -> ProviderMetadataResponse {
        ProviderMetadataResponse {
            type_name: PROVIDER_NAME.to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ProviderSchemaRequest,
    ) -> ProviderSchemaResponse {
        ProviderSchemaResponse {
            schema: ProviderConfig::schema().clone(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateProviderConfigRequest,
    ) -> ValidateProviderConfigResponse {
        ValidateProviderConfigResponse {
            diagnostics: ProviderConfig::schema().validate(&request.config),
        }
    }

    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        tracing::debug!(
            terraform_version = %request.terraform_version,
            "configuring provider"
        );

        let config = match ProviderConfig::from_config(&request.config) {
            Ok(config) => config,
            Err(diagnostics) => {
                return ConfigureProviderResponse {
                    diagnostics,
                    provider_data: None,
                }
            }
        };

        let client = match config.build_client_with(self.retry_config.clone()) {
            Ok(client) => client,
            Err(e) => {
                return ConfigureProviderResponse {
                    diagnostics: vec![Diagnostic::error(
                        "Failed to create API client",
                        e.to_string(),
                    )],
                    provider_data: None,
                }
            }
        };

        tracing::info!(
            address = %config.address,
            space_id = config.space_id.as_deref().unwrap_or("default"),
            "provider configured"
        );

        let provider_data = OctopusDeployProviderData::new(client);
        self.provider_data = Some(provider_data.clone());

        ConfigureProviderResponse {
            diagnostics: vec![],
            provider_data: Some(Arc::new(provider_data)),
        }
    }

    fn resources(&self) -> HashMap<String, ResourceFactory> {
        let mut factories = HashMap::new();

        factories.insert(
            resources::certificate::TYPE_NAME.to_string(),
            Box::new(|| {
                Box::new(resources::CertificateResource::new())
                    as Box<dyn tfplug::resource::ResourceWithConfigure>
            }) as ResourceFactory,
        );
        factories.insert(
            resources::library_variable_set::TYPE_NAME.to_string(),
            Box::new(|| {
                Box::new(resources::LibraryVariableSetResource::new())
                    as Box<dyn tfplug::resource::ResourceWithConfigure>
            }) as ResourceFactory,
        );

        factories
    }

    fn data_sources(&self) -> HashMap<String, DataSourceFactory> {
        let mut factories = HashMap::new();

        factories.insert(
            data_sources::polling_tentacle_deployment_targets::TYPE_NAME.to_string(),
            Box::new(|| {
                Box::new(data_sources::PollingTentacleDeploymentTargetsDataSource::new())
                    as Box<dyn tfplug::data_source::DataSourceWithConfigure>
            }) as DataSourceFactory,
        );

        factories
    }
}
