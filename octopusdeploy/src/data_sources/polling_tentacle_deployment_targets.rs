//! Polling tentacle deployment targets data source implementation

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceMetadataRequest,
    DataSourceMetadataResponse, DataSourceSchemaRequest, DataSourceSchemaResponse,
    DataSourceWithConfigure, ReadDataSourceRequest, ReadDataSourceResponse,
    ValidateDataSourceConfigRequest, ValidateDataSourceConfigResponse,
};
use tfplug::defaults::StaticDefault;
use tfplug::schema::{Attribute, AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{Diagnostic, DynamicValue};
use tfplug::validator::NumberRangeValidator;

use crate::api::machines::{DeploymentTarget, MachinesQuery};
use crate::resources::common::{
    non_empty, not_configured_diagnostic, run_api_call, string_list_attribute,
    tenant_tags_attribute, to_state,
};
use crate::OctopusDeployProviderData;

pub const TYPE_NAME: &str = "octopusdeploy_polling_tentacle_deployment_targets";

const POLLING_COMMUNICATION_STYLE: &str = "TentacleActive";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingTentacleDeploymentTargetsModel {
    pub id: Option<String>,
    pub deployment_id: Option<String>,
    pub environments: Vec<String>,
    pub health_statuses: Vec<String>,
    pub ids: Vec<String>,
    pub is_disabled: bool,
    pub name: Option<String>,
    pub partial_name: Option<String>,
    pub roles: Vec<String>,
    pub shell_names: Vec<String>,
    pub skip: u32,
    pub take: u32,
    pub tenants: Vec<String>,
    pub tenant_tags: Vec<String>,
    pub thumbprint: Option<String>,
    pub polling_tentacle_deployment_targets: Vec<PollingTentacleDeploymentTargetModel>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingTentacleDeploymentTargetModel {
    pub id: String,
    pub name: String,
    pub environments: Vec<String>,
    pub roles: Vec<String>,
    pub tenants: Vec<String>,
    pub tenant_tags: Vec<String>,
    pub tenanted_deployment_participation: String,
    pub is_disabled: bool,
    pub machine_policy_id: Option<String>,
    pub health_status: Option<String>,
    pub status_summary: Option<String>,
    pub space_id: Option<String>,
    pub thumbprint: Option<String>,
    pub tentacle_url: Option<String>,
    pub certificate_signature_algorithm: Option<String>,
    pub shell_name: Option<String>,
    pub shell_version: Option<String>,
    pub operating_system: Option<String>,
}

fn target_object_type() -> AttributeType {
    let strings = || AttributeType::list_of(AttributeType::String);
    let mut fields = HashMap::new();

    for name in [
        "id",
        "name",
        "tenanted_deployment_participation",
        "machine_policy_id",
        "health_status",
        "status_summary",
        "space_id",
        "thumbprint",
        "tentacle_url",
        "certificate_signature_algorithm",
        "shell_name",
        "shell_version",
        "operating_system",
    ] {
        fields.insert(name.to_string(), AttributeType::String);
    }
    for name in ["environments", "roles", "tenants", "tenant_tags"] {
        fields.insert(name.to_string(), strings());
    }
    fields.insert("is_disabled".to_string(), AttributeType::Bool);

    AttributeType::Object(fields)
}

fn optional_string(name: &str, description: &str) -> Attribute {
    AttributeBuilder::new(name, AttributeType::String)
        .description(description)
        .optional()
        .build()
}

fn paging_attribute(name: &str, description: &str, default: f64) -> Attribute {
    AttributeBuilder::new(name, AttributeType::Number)
        .description(description)
        .validator(Arc::new(NumberRangeValidator {
            min: Some(0.0),
            max: None,
        }))
        .default(StaticDefault::number(default))
        .build()
}

pub fn polling_tentacle_deployment_targets_schema() -> &'static Schema {
    static SCHEMA: OnceLock<Schema> = OnceLock::new();

    SCHEMA.get_or_init(|| {
        SchemaBuilder::new()
            .version(0)
            .description("Provides information about existing polling tentacle deployment targets")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("An identifier generated for each read")
                    .computed()
                    .build(),
            )
            .attribute(optional_string(
                "deployment_id",
                "A filter to search by deployment ID",
            ))
            .attribute(string_list_attribute(
                "environments",
                "A filter to search by a list of environment IDs",
            ))
            .attribute(string_list_attribute(
                "health_statuses",
                "A filter to search by a list of health statuses",
            ))
            .attribute(string_list_attribute(
                "ids",
                "A filter to search by a list of IDs",
            ))
            .attribute(
                AttributeBuilder::new("is_disabled", AttributeType::Bool)
                    .description("A filter to search by the disabled status of a target")
                    .optional()
                    .build(),
            )
            .attribute(optional_string("name", "A filter to search by name"))
            .attribute(optional_string(
                "partial_name",
                "A filter to search by the partial match of a name",
            ))
            .attribute(string_list_attribute(
                "roles",
                "A filter to search by a list of role IDs",
            ))
            .attribute(string_list_attribute(
                "shell_names",
                "A filter to search by a list of shell names",
            ))
            .attribute(paging_attribute(
                "skip",
                "A filter to specify the number of items to skip in the response",
                0.0,
            ))
            .attribute(paging_attribute(
                "take",
                "A filter to specify the number of items to take (or return) in the response",
                1.0,
            ))
            .attribute(string_list_attribute(
                "tenants",
                "A filter to search by a list of tenant IDs",
            ))
            .attribute(tenant_tags_attribute())
            .attribute(optional_string(
                "thumbprint",
                "A filter to search by thumbprint",
            ))
            .attribute(
                AttributeBuilder::new(
                    "polling_tentacle_deployment_targets",
                    AttributeType::list_of(target_object_type()),
                )
                .description("A list of polling tentacle deployment targets that match the filter(s)")
                .computed()
                .build(),
            )
            .build()
    })
}

pub fn expand_machines_query(model: &PollingTentacleDeploymentTargetsModel) -> MachinesQuery {
    MachinesQuery {
        communication_styles: vec![POLLING_COMMUNICATION_STYLE.to_string()],
        deployment_id: model.deployment_id.clone().unwrap_or_default(),
        environment_ids: model.environments.clone(),
        health_statuses: model.health_statuses.clone(),
        ids: model.ids.clone(),
        is_disabled: model.is_disabled,
        name: model.name.clone().unwrap_or_default(),
        partial_name: model.partial_name.clone().unwrap_or_default(),
        roles: model.roles.clone(),
        shell_names: model.shell_names.clone(),
        skip: model.skip,
        take: model.take,
        tenant_ids: model.tenants.clone(),
        tenant_tags: model.tenant_tags.clone(),
        thumbprint: model.thumbprint.clone().unwrap_or_default(),
    }
}

pub fn flatten_polling_tentacle_deployment_target(
    target: &DeploymentTarget,
) -> PollingTentacleDeploymentTargetModel {
    let endpoint = target.endpoint.as_ref();

    PollingTentacleDeploymentTargetModel {
        id: target.id.clone(),
        name: target.name.clone(),
        environments: target.environment_ids.clone(),
        roles: target.roles.clone(),
        tenants: target.tenant_ids.clone(),
        tenant_tags: target.tenant_tags.clone(),
        tenanted_deployment_participation: target.tenanted_deployment_participation.to_string(),
        is_disabled: target.is_disabled,
        machine_policy_id: non_empty(&target.machine_policy_id),
        health_status: non_empty(&target.health_status),
        status_summary: non_empty(&target.status_summary),
        space_id: non_empty(&target.space_id),
        thumbprint: non_empty(&target.thumbprint)
            .or_else(|| endpoint.and_then(|e| non_empty(&e.thumbprint))),
        tentacle_url: endpoint
            .and_then(|e| non_empty(&e.uri))
            .or_else(|| non_empty(&target.uri)),
        certificate_signature_algorithm: endpoint
            .and_then(|e| non_empty(&e.certificate_signature_algorithm)),
        shell_name: non_empty(&target.shell_name),
        shell_version: non_empty(&target.shell_version),
        operating_system: non_empty(&target.operating_system),
    }
}

/// Each read gets a fresh identifier; nothing ties two reads together
fn read_id() -> String {
    format!("PollingTentacleDeploymentTargets {}", chrono::Utc::now())
}

#[derive(Default)]
pub struct PollingTentacleDeploymentTargetsDataSource {
    provider_data: Option<OctopusDeployProviderData>,
}

impl PollingTentacleDeploymentTargetsDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn read_targets(
        &self,
        ctx: &Context,
        config: &DynamicValue,
    ) -> Result<DynamicValue, Vec<Diagnostic>> {
        let provider_data = self
            .provider_data
            .as_ref()
            .ok_or_else(|| vec![not_configured_diagnostic()])?;

        let mut model: PollingTentacleDeploymentTargetsModel =
            polling_tentacle_deployment_targets_schema().decode(config)?;
        let query = expand_machines_query(&model);

        tracing::info!("reading polling tentacle deployment targets: {:?}", query);

        let targets = run_api_call(ctx, provider_data.client.machines().get(&query))
            .await
            .map_err(|e| {
                vec![e.to_diagnostic("read", TYPE_NAME, "polling tentacle deployment targets")]
            })?;

        model.polling_tentacle_deployment_targets = targets
            .items
            .iter()
            .map(flatten_polling_tentacle_deployment_target)
            .collect();
        model.id = Some(read_id());

        tracing::info!(
            "polling tentacle deployment targets read ({} found)",
            model.polling_tentacle_deployment_targets.len()
        );
        to_state(&model)
    }
}

#[async_trait]
impl DataSource for PollingTentacleDeploymentTargetsDataSource {
    fn type_name(&self) -> &str {
        TYPE_NAME
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: DataSourceMetadataRequest,
    ) -> DataSourceMetadataResponse {
        DataSourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        DataSourceSchemaResponse {
            schema: polling_tentacle_deployment_targets_schema().clone(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateDataSourceConfigRequest,
    ) -> ValidateDataSourceConfigResponse {
        ValidateDataSourceConfigResponse {
            diagnostics: polling_tentacle_deployment_targets_schema().validate(&request.config),
        }
    }

    async fn read(&self, ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        match self.read_targets(&ctx, &request.config).await {
            Ok(state) => ReadDataSourceResponse {
                state,
                diagnostics: vec![],
            },
            Err(diagnostics) => ReadDataSourceResponse {
                state: DynamicValue::null(),
                diagnostics,
            },
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for PollingTentacleDeploymentTargetsDataSource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        let mut diagnostics = vec![];

        match OctopusDeployProviderData::from_provider_data(request.provider_data) {
            Ok(data) => self.provider_data = data,
            Err(diag) => diagnostics.push(diag),
        }

        ConfigureDataSourceResponse { diagnostics }
    }
}
