//! Certificate resource implementation

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tfplug::context::Context;
use tfplug::import::import_state_passthrough_id;
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceMetadataRequest, ResourceMetadataResponse,
    ResourceSchemaRequest, ResourceSchemaResponse, ResourceWithConfigure, UpdateResourceRequest,
    UpdateResourceResponse, ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{has_errors, AttributePath, Diagnostic, DynamicValue};
use tfplug::Sensitive;

use super::common::{
    id_attribute, non_empty, not_configured_diagnostic, process_api_error, run_api_call,
    space_id_attribute, state_decode_diagnostic, string_list_attribute, tenant_tags_attribute,
    tenanted_deployment_participation_attribute, to_state,
};
use crate::api::certificates::{Certificate, TenantedDeploymentMode};
use crate::api::{Client, SensitiveValue};
use crate::OctopusDeployProviderData;

pub const TYPE_NAME: &str = "octopusdeploy_certificate";

/// Terraform-side shape of a certificate
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CertificateModel {
    pub id: Option<String>,
    pub name: String,
    pub notes: Option<String>,
    pub certificate_data: Sensitive<String>,
    pub password: Option<Sensitive<String>>,
    pub environment_ids: Vec<String>,
    pub tenanted_deployment_participation: TenantedDeploymentMode,
    pub tenant_ids: Vec<String>,
    pub tenant_tags: Vec<String>,
    pub space_id: Option<String>,
    pub certificate_data_format: Option<String>,
    pub thumbprint: Option<String>,
    pub subject_distinguished_name: Option<String>,
    pub issuer_distinguished_name: Option<String>,
    pub serial_number: Option<String>,
    pub not_before: Option<String>,
    pub not_after: Option<String>,
    pub has_private_key: bool,
    pub is_expired: bool,
}

pub fn certificate_schema() -> &'static Schema {
    static SCHEMA: OnceLock<Schema> = OnceLock::new();

    SCHEMA.get_or_init(|| {
        SchemaBuilder::new()
            .version(0)
            .description("Manages certificates in Octopus Deploy")
            .attribute(id_attribute("The unique ID of the certificate"))
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("The name of the certificate")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("notes", AttributeType::String)
                    .description("Notes about the certificate")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("certificate_data", AttributeType::String)
                    .description("The base64-encoded certificate file (PFX, PEM or DER)")
                    .required()
                    .sensitive()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("password", AttributeType::String)
                    .description("The password protecting the certificate data")
                    .optional()
                    .sensitive()
                    .build(),
            )
            .attribute(string_list_attribute(
                "environment_ids",
                "The environments this certificate is scoped to",
            ))
            .attribute(tenanted_deployment_participation_attribute())
            .attribute(string_list_attribute(
                "tenant_ids",
                "The tenants this certificate is scoped to",
            ))
            .attribute(tenant_tags_attribute())
            .attribute(space_id_attribute("certificate"))
            .attribute(computed_string(
                "certificate_data_format",
                "The format of the uploaded certificate data",
            ))
            .attribute(computed_string("thumbprint", "The certificate thumbprint"))
            .attribute(computed_string(
                "subject_distinguished_name",
                "The subject distinguished name",
            ))
            .attribute(computed_string(
                "issuer_distinguished_name",
                "The issuer distinguished name",
            ))
            .attribute(computed_string("serial_number", "The certificate serial number"))
            .attribute(computed_string("not_before", "Start of the validity period"))
            .attribute(computed_string("not_after", "End of the validity period"))
            .attribute(
                AttributeBuilder::new("has_private_key", AttributeType::Bool)
                    .description("Whether the certificate data includes a private key")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("is_expired", AttributeType::Bool)
                    .description("Whether the certificate has expired")
                    .computed()
                    .build(),
            )
            .build()
    })
}

fn computed_string(name: &str, description: &str) -> tfplug::schema::Attribute {
    AttributeBuilder::new(name, AttributeType::String)
        .description(description)
        .computed()
        .build()
}

/// Builds the API object. `name` and `certificate_data` must be non-blank.
pub fn expand_certificate(model: &CertificateModel) -> Result<Certificate, Vec<Diagnostic>> {
    let mut diagnostics = Vec::new();

    if model.name.trim().is_empty() {
        diagnostics.push(
            Diagnostic::error("Invalid certificate name", "name must not be empty")
                .with_attribute(AttributePath::new("name")),
        );
    }
    if model.certificate_data.is_empty() {
        diagnostics.push(
            Diagnostic::error(
                "Invalid certificate data",
                "certificate_data must not be empty",
            )
            .with_attribute(AttributePath::new("certificate_data")),
        );
    }
    if !diagnostics.is_empty() {
        return Err(diagnostics);
    }

    let password = model
        .password
        .as_ref()
        .map(|p| p.expose().as_str());

    let mut certificate = Certificate::new(
        model.name.clone(),
        SensitiveValue::new(model.certificate_data.expose().clone()),
    );
    certificate.id = model.id.clone();
    certificate.notes = model.notes.clone();
    certificate.password = SensitiveValue::from_optional(password);
    certificate.environment_ids = model.environment_ids.clone();
    certificate.tenanted_deployment_participation = model.tenanted_deployment_participation;
    certificate.tenant_ids = model.tenant_ids.clone();
    certificate.tenant_tags = model.tenant_tags.clone();
    certificate.space_id = model.space_id.clone();

    Ok(certificate)
}

/// Maps the API object back to state. The server never returns the
/// certificate data or password, so those come from `configured`.
pub fn flatten_certificate(
    certificate: &Certificate,
    configured: &CertificateModel,
) -> CertificateModel {
    CertificateModel {
        id: certificate.id.clone(),
        name: certificate.name.clone(),
        notes: certificate.notes.clone(),
        certificate_data: configured.certificate_data.clone(),
        password: configured.password.clone(),
        environment_ids: certificate.environment_ids.clone(),
        tenanted_deployment_participation: certificate.tenanted_deployment_participation,
        tenant_ids: certificate.tenant_ids.clone(),
        tenant_tags: certificate.tenant_tags.clone(),
        space_id: non_empty(&certificate.space_id),
        certificate_data_format: non_empty(&certificate.certificate_data_format),
        thumbprint: non_empty(&certificate.thumbprint),
        subject_distinguished_name: non_empty(&certificate.subject_distinguished_name),
        issuer_distinguished_name: non_empty(&certificate.issuer_distinguished_name),
        serial_number: non_empty(&certificate.serial_number),
        not_before: non_empty(&certificate.not_before),
        not_after: non_empty(&certificate.not_after),
        has_private_key: certificate.has_private_key,
        is_expired: certificate.is_expired,
    }
}

#[derive(Default)]
pub struct CertificateResource {
    provider_data: Option<OctopusDeployProviderData>,
}

impl CertificateResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn client(&self) -> Result<&Client, Vec<Diagnostic>> {
        self.provider_data
            .as_ref()
            .map(|data| data.client.as_ref())
            .ok_or_else(|| vec![not_configured_diagnostic()])
    }

    async fn create_certificate(
        &self,
        ctx: &Context,
        config: &DynamicValue,
    ) -> Result<DynamicValue, Vec<Diagnostic>> {
        let client = self.client()?;
        let model: CertificateModel = certificate_schema().decode(config)?;
        let certificate = expand_certificate(&model)?;

        tracing::info!("creating certificate: {:?}", certificate);

        let created = run_api_call(ctx, client.certificates().add(&certificate))
            .await
            .map_err(|e| vec![e.to_diagnostic("create", TYPE_NAME, &model.name)])?;

        let state = flatten_certificate(&created, &model);
        tracing::info!(
            "certificate created ({})",
            state.id.as_deref().unwrap_or_default()
        );
        to_state(&state)
    }

    async fn read_certificate(
        &self,
        ctx: &Context,
        current_state: &DynamicValue,
    ) -> Result<Option<DynamicValue>, Vec<Diagnostic>> {
        let client = self.client()?;
        let current: CertificateModel = current_state
            .decode()
            .map_err(|e| vec![state_decode_diagnostic(e)])?;

        let Some(id) = current.id.clone().filter(|id| !id.is_empty()) else {
            return Ok(None);
        };

        tracing::info!("reading certificate ({})", id);

        let certificate = match run_api_call(ctx, client.certificates().get_by_id(&id)).await {
            Ok(certificate) => certificate,
            Err(e) => {
                return match process_api_error(&e, TYPE_NAME, &id) {
                    None => Ok(None),
                    Some(diag) => Err(vec![diag]),
                }
            }
        };

        let state = flatten_certificate(&certificate, &current);
        tracing::info!("certificate read ({})", id);
        to_state(&state).map(Some)
    }

    async fn update_certificate(
        &self,
        ctx: &Context,
        prior_state: &DynamicValue,
        config: &DynamicValue,
    ) -> Result<DynamicValue, Vec<Diagnostic>> {
        let client = self.client()?;
        let prior: CertificateModel = prior_state
            .decode()
            .map_err(|e| vec![state_decode_diagnostic(e)])?;
        let id = required_id(&prior)?;

        let mut model: CertificateModel = certificate_schema().decode(config)?;
        model.id = Some(id.clone());
        let certificate = expand_certificate(&model)?;

        tracing::info!("updating certificate ({})", id);

        let updated = run_api_call(ctx, client.certificates().update(&certificate))
            .await
            .map_err(|e| vec![e.to_diagnostic("update", TYPE_NAME, &id)])?;

        let state = flatten_certificate(&updated, &model);
        tracing::info!("certificate updated ({})", id);
        to_state(&state)
    }

    async fn delete_certificate(
        &self,
        ctx: &Context,
        prior_state: &DynamicValue,
    ) -> Result<(), Vec<Diagnostic>> {
        let client = self.client()?;
        let prior: CertificateModel = prior_state
            .decode()
            .map_err(|e| vec![state_decode_diagnostic(e)])?;
        let id = required_id(&prior)?;

        tracing::info!("deleting certificate ({})", id);

        match run_api_call(ctx, client.certificates().delete_by_id(&id)).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                tracing::warn!("certificate ({}) already deleted", id);
            }
            Err(e) => return Err(vec![e.to_diagnostic("delete", TYPE_NAME, &id)]),
        }

        tracing::info!("certificate deleted ({})", id);
        Ok(())
    }
}

fn required_id(model: &CertificateModel) -> Result<String, Vec<Diagnostic>> {
    model
        .id
        .clone()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| {
            vec![Diagnostic::error(
                "Missing certificate id",
                "The certificate has no id in state",
            )
            .with_attribute(AttributePath::new("id"))]
        })
}

#[async_trait]
impl Resource for CertificateResource {
    fn type_name(&self) -> &str {
        TYPE_NAME
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ResourceMetadataRequest,
    ) -> ResourceMetadataResponse {
        ResourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ResourceSchemaRequest,
    ) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: certificate_schema().clone(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        let mut diagnostics = certificate_schema().validate(&request.config);

        // Values still unknown at plan time fail to decode; they are checked on apply
        if !has_errors(&diagnostics) {
            if let Ok(model) = certificate_schema().decode::<CertificateModel>(&request.config) {
                if let Err(diags) = expand_certificate(&model) {
                    diagnostics.extend(diags);
                }
            }
        }

        ValidateResourceConfigResponse { diagnostics }
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        match self.create_certificate(&ctx, &request.config).await {
            Ok(new_state) => CreateResourceResponse {
                new_state,
                diagnostics: vec![],
            },
            Err(diagnostics) => CreateResourceResponse {
                new_state: DynamicValue::null(),
                diagnostics,
            },
        }
    }

    async fn read(&self, ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        match self.read_certificate(&ctx, &request.current_state).await {
            Ok(new_state) => ReadResourceResponse {
                new_state,
                diagnostics: vec![],
            },
            Err(diagnostics) => ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics,
            },
        }
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        match self
            .update_certificate(&ctx, &request.prior_state, &request.config)
            .await
        {
            Ok(new_state) => UpdateResourceResponse {
                new_state,
                diagnostics: vec![],
            },
            Err(diagnostics) => UpdateResourceResponse {
                new_state: request.prior_state,
                diagnostics,
            },
        }
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        DeleteResourceResponse {
            diagnostics: self
                .delete_certificate(&ctx, &request.prior_state)
                .await
                .err()
                .unwrap_or_default(),
        }
    }

    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        tracing::info!("importing certificate ({})", request.id);
        import_state_passthrough_id(&ctx, AttributePath::new("id"), &request)
    }
}

#[async_trait]
impl ResourceWithConfigure for CertificateResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        let mut diagnostics = vec![];

        match OctopusDeployProviderData::from_provider_data(request.provider_data) {
            Ok(data) => self.provider_data = data,
            Err(diag) => diagnostics.push(diag),
        }

        ConfigureResourceResponse { diagnostics }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn model() -> CertificateModel {
        CertificateModel {
            name: "cert-a".to_string(),
            notes: Some("team certificate".to_string()),
            certificate_data: Sensitive::from("MIIKcQIBAzCCCjcGCSqGSIb3DQEHAaCCCigEggokMIIKIDCCBN"),
            password: Some(Sensitive::from("pfx-password")),
            environment_ids: vec!["Environments-1".to_string(), "Environments-2".to_string()],
            tenanted_deployment_participation: TenantedDeploymentMode::TenantedOrUntenanted,
            tenant_ids: vec!["Tenants-1".to_string()],
            tenant_tags: vec!["Region/West".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn expand_then_flatten_preserves_configured_fields() {
        let model = model();
        let mut certificate = expand_certificate(&model).unwrap();
        certificate.id = Some("Certificates-1".to_string());

        let flattened = flatten_certificate(&certificate, &model);

        assert_eq!(
            flattened,
            CertificateModel {
                id: Some("Certificates-1".to_string()),
                ..model
            }
        );
    }

    #[test]
    fn expand_sends_secrets_as_sensitive_values() {
        let certificate = expand_certificate(&model()).unwrap();

        assert_eq!(
            certificate.certificate_data.new_value.as_deref(),
            Some("MIIKcQIBAzCCCjcGCSqGSIb3DQEHAaCCCigEggokMIIKIDCCBN")
        );
        assert_eq!(certificate.password.new_value.as_deref(), Some("pfx-password"));
        assert!(!format!("{:?}", certificate).contains("pfx-password"));
    }

    #[test]
    fn expand_without_password_sends_no_password() {
        let certificate = expand_certificate(&CertificateModel {
            password: None,
            ..model()
        })
        .unwrap();
        assert!(!certificate.password.has_value);
        assert!(certificate.password.new_value.is_none());
    }

    #[test]
    fn expand_rejects_blank_required_fields() {
        let diags = expand_certificate(&CertificateModel {
            name: " ".to_string(),
            certificate_data: Sensitive::from(""),
            ..Default::default()
        })
        .unwrap_err();

        assert_eq!(diags.len(), 2);
        assert_eq!(diags[0].attribute, Some(AttributePath::new("name")));
        assert_eq!(
            diags[1].attribute,
            Some(AttributePath::new("certificate_data"))
        );
    }

    #[test]
    fn flatten_maps_absent_server_fields_to_zero_values() {
        let certificate: Certificate = serde_json::from_value(json!({
            "Id": "Certificates-1",
            "Name": "cert-a",
            "Thumbprint": ""
        }))
        .unwrap();

        let flattened = flatten_certificate(&certificate, &CertificateModel::default());

        assert_eq!(flattened.thumbprint, None);
        assert!(flattened.environment_ids.is_empty());
        assert!(!flattened.has_private_key);
        assert_eq!(
            flattened.tenanted_deployment_participation,
            TenantedDeploymentMode::Untenanted
        );
    }

    #[test]
    fn flatten_maps_null_server_fields_to_zero_values() {
        let certificate: Certificate = serde_json::from_value(json!({
            "Id": "Certificates-1",
            "Name": "cert-a",
            "Notes": null,
            "CertificateData": null,
            "Password": {"HasValue": null, "NewValue": null},
            "EnvironmentIds": null,
            "TenantedDeploymentParticipation": null,
            "TenantIds": null,
            "TenantTags": null,
            "SpaceId": null,
            "Thumbprint": null,
            "HasPrivateKey": null,
            "IsExpired": null
        }))
        .unwrap();

        let flattened = flatten_certificate(&certificate, &CertificateModel::default());

        assert_eq!(flattened.id.as_deref(), Some("Certificates-1"));
        assert_eq!(flattened.notes, None);
        assert_eq!(flattened.thumbprint, None);
        assert!(flattened.environment_ids.is_empty());
        assert!(flattened.tenant_ids.is_empty());
        assert!(flattened.tenant_tags.is_empty());
        assert!(!flattened.has_private_key);
        assert!(!flattened.is_expired);
        assert_eq!(
            flattened.tenanted_deployment_participation,
            TenantedDeploymentMode::Untenanted
        );
    }

    #[test]
    fn state_contains_every_schema_attribute() {
        let state = to_state(&model()).unwrap();
        let json = state.to_json();
        let object = json.as_object().unwrap();

        for attribute in &certificate_schema().block.attributes {
            assert!(
                object.contains_key(&attribute.name),
                "missing {}",
                attribute.name
            );
        }
        assert_eq!(object.len(), certificate_schema().block.attributes.len());
    }

    #[test]
    fn schema_marks_secrets_sensitive() {
        let mut sensitive = certificate_schema().sensitive_attributes();
        sensitive.sort();
        assert_eq!(sensitive, vec!["certificate_data", "password"]);
    }

    #[tokio::test]
    async fn validate_reports_invalid_tenanted_mode() {
        let resource = CertificateResource::new();
        let response = resource
            .validate(
                Context::new(),
                ValidateResourceConfigRequest {
                    type_name: TYPE_NAME.to_string(),
                    config: DynamicValue::from_json(json!({
                        "name": "cert-a",
                        "certificate_data": "ZGF0YQ==",
                        "tenanted_deployment_participation": "Sometimes"
                    })),
                },
            )
            .await;

        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(
            response.diagnostics[0].attribute,
            Some(AttributePath::new("tenanted_deployment_participation"))
        );
    }

    #[tokio::test]
    async fn create_without_provider_data_fails_with_null_state() {
        let resource = CertificateResource::new();
        let config = DynamicValue::from_json(json!({
            "name": "cert-a",
            "certificate_data": "ZGF0YQ=="
        }));

        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: TYPE_NAME.to_string(),
                    planned_state: config.clone(),
                    config,
                },
            )
            .await;

        assert!(response.new_state.is_null());
        assert_eq!(response.diagnostics[0].summary, "Provider not configured");
    }
}
