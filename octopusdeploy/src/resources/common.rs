//! Helpers shared by every resource and data source: turning client and
//! context failures into diagnostics, and the attribute shapes several
//! schemas repeat.

use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tfplug::context::Context;
use tfplug::schema::{Attribute, AttributeBuilder, AttributeType, Validator};
use tfplug::types::{Diagnostic, DynamicValue};
use tfplug::validator::{ListElements, StringOneOf, StringPatternValidator};
use tfplug::TfplugError;

use crate::api::certificates::TenantedDeploymentMode;
use crate::api::ApiError;

/// Failure of a remote call made under a request context
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    #[error(transparent)]
    Context(#[from] TfplugError),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl CallError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, CallError::Api(e) if e.is_not_found())
    }

    /// Describes the failure with the resource type and identity it concerns
    pub fn to_diagnostic(&self, action: &str, resource_type: &str, identity: &str) -> Diagnostic {
        match self {
            CallError::Context(e) => Diagnostic::error(
                format!("Failed to {} {}", action, resource_type),
                format!("{} '{}' was interrupted: {}", resource_type, identity, e),
            ),
            CallError::Api(e) => api_error_diagnostic(action, resource_type, identity, e),
        }
    }
}

/// Runs one API call, stopping early if the context is cancelled or expires
pub async fn run_api_call<T, F>(ctx: &Context, call: F) -> Result<T, CallError>
where
    F: Future<Output = Result<T, ApiError>>,
{
    Ok(ctx.run(call).await??)
}

pub fn api_error_diagnostic(
    action: &str,
    resource_type: &str,
    identity: &str,
    err: &ApiError,
) -> Diagnostic {
    Diagnostic::error(
        format!("Failed to {} {}", action, resource_type),
        format!("error {} {} '{}': {}", gerund(action), resource_type, identity, err),
    )
}

fn gerund(action: &str) -> String {
    match action.strip_suffix('e') {
        Some(stem) => format!("{}ing", stem),
        None => format!("{}ing", action),
    }
}

/// Read-path handling: a missing remote object is not an error, it means the
/// resource must leave state. Returns `None` in that case.
pub fn process_api_error(
    err: &CallError,
    resource_type: &str,
    identity: &str,
) -> Option<Diagnostic> {
    if err.is_not_found() {
        tracing::warn!(
            "{} ({}) not found; removing from state",
            resource_type,
            identity
        );
        return None;
    }
    Some(err.to_diagnostic("read", resource_type, identity))
}

pub fn not_configured_diagnostic() -> Diagnostic {
    Diagnostic::error(
        "Provider not configured",
        "Provider data was not properly configured",
    )
}

pub fn state_decode_diagnostic(err: TfplugError) -> Diagnostic {
    Diagnostic::error("Invalid state", format!("stored state could not be decoded: {}", err))
}

/// Serializes a typed model into Terraform state
pub fn to_state<T: Serialize>(model: &T) -> Result<DynamicValue, Vec<Diagnostic>> {
    DynamicValue::from_serialize(model).map_err(|e| {
        vec![Diagnostic::error(
            "Failed to encode state",
            format!("state could not be written: {}", e),
        )]
    })
}

pub fn id_attribute(description: &str) -> Attribute {
    AttributeBuilder::new("id", AttributeType::String)
        .description(description)
        .computed()
        .build()
}

pub fn space_id_attribute(resource_name: &str) -> Attribute {
    AttributeBuilder::new("space_id", AttributeType::String)
        .description(&format!(
            "The space ID associated with this {}",
            resource_name
        ))
        .optional()
        .computed()
        .build()
}

pub fn string_list_attribute(name: &str, description: &str) -> Attribute {
    AttributeBuilder::new(name, AttributeType::list_of(AttributeType::String))
        .description(description)
        .optional()
        .build()
}

const TENANT_TAG_PATTERN: &str = r"^[^/]+/[^/]+$";

pub fn tenant_tag_validator() -> Arc<dyn Validator> {
    ListElements::create(Arc::new(StringPatternValidator {
        pattern: regex::Regex::new(TENANT_TAG_PATTERN).expect("tenant tag pattern is valid"),
        description: "the form TagSet/Tag".to_string(),
    }))
}

pub fn tenant_tags_attribute() -> Attribute {
    AttributeBuilder::new("tenant_tags", AttributeType::list_of(AttributeType::String))
        .description("A list of tenant tags, each in the form TagSet/Tag")
        .optional()
        .validator(tenant_tag_validator())
        .build()
}

pub fn tenanted_deployment_participation_attribute() -> Attribute {
    AttributeBuilder::new("tenanted_deployment_participation", AttributeType::String)
        .description(
            "The tenanted deployment mode. Valid values are Untenanted, TenantedOrUntenanted or Tenanted",
        )
        .validator(StringOneOf::create(&TenantedDeploymentMode::ALL))
        .default(tfplug::defaults::StaticDefault::string(
            TenantedDeploymentMode::Untenanted.as_str(),
        ))
        .build()
}

/// Empty strings from the server read back as absent
pub fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|s| !s.is_empty()).cloned()
}
