//! Testing utilities for provider implementations.
//!
//! [`ProviderTester`] drives a [`Provider`] the way Terraform would: it
//! configures the provider once, then builds a fresh resource or data source
//! per call through the registered factories and hands each one the
//! provider data. Values go in and come out as `serde_json::Value`.
//!
//! ```ignore
//! let mut tester = ProviderTester::new(MyProvider::new());
//! tester.configure(json!({"address": server.url(), "api_key": "key"})).await.unwrap();
//!
//! let state = tester.create("my_resource", json!({"name": "test"})).await.unwrap();
//! assert_eq!(state["name"], "test");
//! ```

use crate::context::Context;
use crate::data_source::{
    ConfigureDataSourceRequest, DataSourceWithConfigure, ReadDataSourceRequest,
    ValidateDataSourceConfigRequest,
};
use crate::error::TfplugError;
use crate::provider::{ConfigureProviderRequest, Provider};
use crate::resource::{
    ConfigureResourceRequest, CreateResourceRequest, DeleteResourceRequest,
    ImportResourceStateRequest, ReadResourceRequest, ResourceWithConfigure,
    UpdateResourceRequest, ValidateResourceConfigRequest,
};
use crate::types::{has_errors, Diagnostic, DynamicValue};
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Errors returned by [`ProviderTester`]
#[derive(Debug, thiserror::Error)]
pub enum TestError {
    #[error("unknown type: {0}")]
    UnknownType(String),

    #[error("operation returned errors: {}", format_diagnostics(.0))]
    Diagnostics(Vec<Diagnostic>),

    #[error(transparent)]
    Conversion(#[from] TfplugError),
}

impl TestError {
    /// The error diagnostics, when the failure came from the provider
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            TestError::Diagnostics(diags) => diags,
            _ => &[],
        }
    }
}

fn format_diagnostics(diags: &[Diagnostic]) -> String {
    diags
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn check_diagnostics(diagnostics: Vec<Diagnostic>) -> Result<(), TestError> {
    if has_errors(&diagnostics) {
        Err(TestError::Diagnostics(diagnostics))
    } else {
        Ok(())
    }
}

/// A test harness for provider implementations
pub struct ProviderTester<P: Provider> {
    provider: P,
    provider_data: Option<Arc<dyn Any + Send + Sync>>,
    ctx: Context,
}

impl<P: Provider> fmt::Debug for ProviderTester<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderTester")
            .field("provider", &self.provider.type_name())
            .field("configured", &self.provider_data.is_some())
            .finish()
    }
}

impl<P: Provider> ProviderTester<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            provider_data: None,
            ctx: Context::new(),
        }
    }

    /// Runs every subsequent operation under `ctx`
    pub fn with_context(mut self, ctx: Context) -> Self {
        self.ctx = ctx;
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn resource_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.provider.resources().into_keys().collect();
        types.sort();
        types
    }

    pub fn data_source_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.provider.data_sources().into_keys().collect();
        types.sort();
        types
    }

    pub async fn configure(&mut self, config: Value) -> Result<(), TestError> {
        let response = self
            .provider
            .configure(
                self.ctx.clone(),
                ConfigureProviderRequest {
                    terraform_version: "1.9.0".to_string(),
                    config: DynamicValue::from_json(config),
                },
            )
            .await;

        check_diagnostics(response.diagnostics)?;
        self.provider_data = response.provider_data;
        Ok(())
    }

    /// Builds a resource through its factory and configures it with the
    /// current provider data. Use this to inspect raw responses.
    pub async fn resource(
        &self,
        resource_type: &str,
    ) -> Result<Box<dyn ResourceWithConfigure>, TestError> {
        let factories = self.provider.resources();
        let factory = factories
            .get(resource_type)
            .ok_or_else(|| TestError::UnknownType(resource_type.to_string()))?;

        let mut resource = factory();
        let response = resource
            .configure(
                self.ctx.clone(),
                ConfigureResourceRequest {
                    provider_data: self.provider_data.clone(),
                },
            )
            .await;
        check_diagnostics(response.diagnostics)?;
        Ok(resource)
    }

    pub async fn data_source(
        &self,
        data_source_type: &str,
    ) -> Result<Box<dyn DataSourceWithConfigure>, TestError> {
        let factories = self.provider.data_sources();
        let factory = factories
            .get(data_source_type)
            .ok_or_else(|| TestError::UnknownType(data_source_type.to_string()))?;

        let mut data_source = factory();
        let response = data_source
            .configure(
                self.ctx.clone(),
                ConfigureDataSourceRequest {
                    provider_data: self.provider_data.clone(),
                },
            )
            .await;
        check_diagnostics(response.diagnostics)?;
        Ok(data_source)
    }

    pub async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        let resource = self.resource(resource_type).await?;
        let response = resource
            .validate(
                self.ctx.clone(),
                ValidateResourceConfigRequest {
                    type_name: resource_type.to_string(),
                    config: DynamicValue::from_json(config),
                },
            )
            .await;
        check_diagnostics(response.diagnostics)
    }

    /// Creates a resource, using `config` as both configuration and plan
    pub async fn create(&self, resource_type: &str, config: Value) -> Result<Value, TestError> {
        let resource = self.resource(resource_type).await?;
        let config = DynamicValue::from_json(config);
        let response = resource
            .create(
                self.ctx.clone(),
                CreateResourceRequest {
                    type_name: resource_type.to_string(),
                    planned_state: config.clone(),
                    config,
                },
            )
            .await;
        check_diagnostics(response.diagnostics)?;
        Ok(response.new_state.to_json())
    }

    /// Returns `None` when the resource no longer exists remotely
    pub async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Option<Value>, TestError> {
        let resource = self.resource(resource_type).await?;
        let response = resource
            .read(
                self.ctx.clone(),
                ReadResourceRequest {
                    type_name: resource_type.to_string(),
                    current_state: DynamicValue::from_json(current_state),
                },
            )
            .await;
        check_diagnostics(response.diagnostics)?;
        Ok(response.new_state.map(|state| state.to_json()))
    }

    pub async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        config: Value,
    ) -> Result<Value, TestError> {
        let resource = self.resource(resource_type).await?;
        let config = DynamicValue::from_json(config);
        let response = resource
            .update(
                self.ctx.clone(),
                UpdateResourceRequest {
                    type_name: resource_type.to_string(),
                    prior_state: DynamicValue::from_json(prior_state),
                    planned_state: config.clone(),
                    config,
                },
            )
            .await;
        check_diagnostics(response.diagnostics)?;
        Ok(response.new_state.to_json())
    }

    pub async fn delete(&self, resource_type: &str, prior_state: Value) -> Result<(), TestError> {
        let resource = self.resource(resource_type).await?;
        let response = resource
            .delete(
                self.ctx.clone(),
                DeleteResourceRequest {
                    type_name: resource_type.to_string(),
                    prior_state: DynamicValue::from_json(prior_state),
                },
            )
            .await;
        check_diagnostics(response.diagnostics)
    }

    /// Imports by ID and follows with a read, the way `terraform import` does
    pub async fn import(&self, resource_type: &str, id: &str) -> Result<Option<Value>, TestError> {
        let resource = self.resource(resource_type).await?;
        let response = resource
            .import_state(
                self.ctx.clone(),
                ImportResourceStateRequest {
                    type_name: resource_type.to_string(),
                    id: id.to_string(),
                },
            )
            .await;
        check_diagnostics(response.diagnostics)?;

        let Some(imported) = response.imported_resources.into_iter().next() else {
            return Ok(None);
        };
        self.read(resource_type, imported.state.to_json()).await
    }

    pub async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        let data_source = self.data_source(data_source_type).await?;
        let response = data_source
            .validate(
                self.ctx.clone(),
                ValidateDataSourceConfigRequest {
                    type_name: data_source_type.to_string(),
                    config: DynamicValue::from_json(config),
                },
            )
            .await;
        check_diagnostics(response.diagnostics)
    }

    pub async fn read_data_source(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Value, TestError> {
        let data_source = self.data_source(data_source_type).await?;
        let response = data_source
            .read(
                self.ctx.clone(),
                ReadDataSourceRequest {
                    type_name: data_source_type.to_string(),
                    config: DynamicValue::from_json(config),
                },
            )
            .await;
        check_diagnostics(response.diagnostics)?;
        Ok(response.state.to_json())
    }
}
