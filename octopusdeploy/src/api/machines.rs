//! Deployment targets ("machines") API

use serde::{Deserialize, Serialize};

use super::certificates::TenantedDeploymentMode;
use super::client::Client;
use super::common::{null_as_default, ApiQueryParams, ResourceCollection};
use super::error::ApiError;

/// Filters for listing deployment targets.
///
/// String filters left empty and empty lists are not sent. `skip` is always
/// sent; `take` is omitted when zero so the server applies its page size.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MachinesQuery {
    pub communication_styles: Vec<String>,
    pub deployment_id: String,
    pub environment_ids: Vec<String>,
    pub health_statuses: Vec<String>,
    pub ids: Vec<String>,
    pub is_disabled: bool,
    pub name: String,
    pub partial_name: String,
    pub roles: Vec<String>,
    pub shell_names: Vec<String>,
    pub skip: u32,
    pub take: u32,
    pub tenant_ids: Vec<String>,
    pub tenant_tags: Vec<String>,
    pub thumbprint: String,
}

impl MachinesQuery {
    pub fn to_query_params(&self) -> ApiQueryParams {
        let mut params = ApiQueryParams::new()
            .add_list("commStyles", &self.communication_styles)
            .add_non_empty("deploymentId", &self.deployment_id)
            .add_list("environmentIds", &self.environment_ids)
            .add_list("healthStatuses", &self.health_statuses)
            .add_list("ids", &self.ids);

        if self.is_disabled {
            params = params.add("isDisabled", true);
        }

        params = params
            .add_non_empty("name", &self.name)
            .add_non_empty("partialName", &self.partial_name)
            .add_list("roles", &self.roles)
            .add_list("shellNames", &self.shell_names)
            .add("skip", self.skip)
            .add_optional("take", (self.take > 0).then_some(self.take))
            .add_list("tenantIds", &self.tenant_ids)
            .add_list("tenantTags", &self.tenant_tags)
            .add_non_empty("thumbprint", &self.thumbprint);

        params
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeploymentTarget {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub environment_ids: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub roles: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tenant_ids: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tenant_tags: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tenanted_deployment_participation: TenantedDeploymentMode,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_disabled: bool,
    #[serde(default)]
    pub machine_policy_id: Option<String>,
    #[serde(default)]
    pub health_status: Option<String>,
    #[serde(default)]
    pub status_summary: Option<String>,
    #[serde(default)]
    pub space_id: Option<String>,
    #[serde(default)]
    pub thumbprint: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub shell_name: Option<String>,
    #[serde(default)]
    pub shell_version: Option<String>,
    #[serde(default)]
    pub operating_system: Option<String>,
    #[serde(default)]
    pub endpoint: Option<Endpoint>,
}

/// Connection details; only the fields tentacles report are modelled
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Endpoint {
    #[serde(default)]
    pub communication_style: Option<String>,
    #[serde(default)]
    pub thumbprint: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub certificate_signature_algorithm: Option<String>,
}

pub struct MachinesApi<'a> {
    client: &'a Client,
}

impl<'a> MachinesApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// One page of deployment targets matching `query`
    pub async fn get(
        &self,
        query: &MachinesQuery,
    ) -> Result<ResourceCollection<DeploymentTarget>, ApiError> {
        self.client
            .get_with_params(
                &self.client.collection_path("machines"),
                &query.to_query_params(),
            )
            .await
    }
}
