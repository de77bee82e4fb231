//! Library variable set resource implementation

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
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
use tfplug::schema::{list_block, AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{has_errors, AttributePath, Diagnostic, DynamicValue};

use super::common::{
    id_attribute, non_empty, not_configured_diagnostic, process_api_error, run_api_call,
    space_id_attribute, state_decode_diagnostic, to_state,
};
use crate::api::library_variable_sets::{
    ActionTemplateParameter, LibraryVariableSet, PropertyValue,
};
use crate::api::Client;
use crate::OctopusDeployProviderData;

pub const TYPE_NAME: &str = "octopusdeploy_library_variable_set";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryVariableSetModel {
    pub id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub space_id: Option<String>,
    pub variable_set_id: Option<String>,
    pub template: Vec<TemplateModel>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateModel {
    pub id: Option<String>,
    pub name: String,
    pub label: Option<String>,
    pub help_text: Option<String>,
    pub default_value: Option<String>,
    pub display_settings: Option<HashMap<String, String>>,
}

pub fn library_variable_set_schema() -> &'static Schema {
    static SCHEMA: OnceLock<Schema> = OnceLock::new();

    SCHEMA.get_or_init(|| {
        SchemaBuilder::new()
            .version(0)
            .description("Manages library variable sets in Octopus Deploy")
            .attribute(id_attribute("The unique ID of the library variable set"))
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("The name of the library variable set")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("description", AttributeType::String)
                    .description("The description of the library variable set")
                    .optional()
                    .build(),
            )
            .attribute(space_id_attribute("library variable set"))
            .attribute(
                AttributeBuilder::new("variable_set_id", AttributeType::String)
                    .description("The ID of the variable set holding this set's variables")
                    .computed()
                    .build(),
            )
            .block(list_block(
                "template",
                "Tenant variable templates declared by this set",
                vec![
                    AttributeBuilder::new("id", AttributeType::String)
                        .description("The ID of the template")
                        .computed()
                        .build(),
                    AttributeBuilder::new("name", AttributeType::String)
                        .description("The name of the variable set by the template")
                        .required()
                        .build(),
                    AttributeBuilder::new("label", AttributeType::String)
                        .description("The label shown beside the variable")
                        .optional()
                        .build(),
                    AttributeBuilder::new("help_text", AttributeType::String)
                        .description("The help shown beside the variable")
                        .optional()
                        .build(),
                    AttributeBuilder::new("default_value", AttributeType::String)
                        .description("A default value for the variable")
                        .optional()
                        .sensitive()
                        .build(),
                    AttributeBuilder::new(
                        "display_settings",
                        AttributeType::map_of(AttributeType::String),
                    )
                    .description("Control type settings, e.g. Octopus.ControlType")
                    .optional()
                    .build(),
                ],
            ))
            .build()
    })
}

pub fn expand_library_variable_set(
    model: &LibraryVariableSetModel,
) -> Result<LibraryVariableSet, Vec<Diagnostic>> {
    let mut diagnostics = Vec::new();

    if model.name.trim().is_empty() {
        diagnostics.push(
            Diagnostic::error("Invalid library variable set name", "name must not be empty")
                .with_attribute(AttributePath::new("name")),
        );
    }
    for (idx, template) in model.template.iter().enumerate() {
        if template.name.trim().is_empty() {
            diagnostics.push(
                Diagnostic::error("Invalid template name", "template name must not be empty")
                    .with_attribute(
                        AttributePath::new("template")
                            .index(idx as i64)
                            .attribute("name"),
                    ),
            );
        }
    }
    if !diagnostics.is_empty() {
        return Err(diagnostics);
    }

    let mut library_variable_set = LibraryVariableSet::new(model.name.clone());
    library_variable_set.id = model.id.clone();
    library_variable_set.description = model.description.clone();
    library_variable_set.space_id = model.space_id.clone();
    library_variable_set.variable_set_id = model.variable_set_id.clone();
    library_variable_set.templates = model.template.iter().map(expand_template).collect();

    Ok(library_variable_set)
}

fn expand_template(template: &TemplateModel) -> ActionTemplateParameter {
    ActionTemplateParameter {
        id: template.id.clone(),
        name: template.name.clone(),
        label: template.label.clone(),
        help_text: template.help_text.clone(),
        default_value: template.default_value.clone().map(PropertyValue::Text),
        display_settings: template.display_settings.clone().unwrap_or_default(),
    }
}

/// Maps the API object back to state. Sensitive template defaults are never
/// returned, so they are taken from the `configured` template of the same name.
pub fn flatten_library_variable_set(
    library_variable_set: &LibraryVariableSet,
    configured: &LibraryVariableSetModel,
) -> LibraryVariableSetModel {
    LibraryVariableSetModel {
        id: library_variable_set.id.clone(),
        name: library_variable_set.name.clone(),
        description: non_empty(&library_variable_set.description),
        space_id: non_empty(&library_variable_set.space_id),
        variable_set_id: non_empty(&library_variable_set.variable_set_id),
        template: library_variable_set
            .templates
            .iter()
            .map(|template| {
                let prior = configured.template.iter().find(|t| t.name == template.name);
                flatten_template(template, prior)
            })
            .collect(),
    }
}

fn flatten_template(
    template: &ActionTemplateParameter,
    prior: Option<&TemplateModel>,
) -> TemplateModel {
    let default_value = match &template.default_value {
        Some(PropertyValue::Text(text)) => Some(text.clone()),
        Some(PropertyValue::Sensitive(_)) => prior.and_then(|t| t.default_value.clone()),
        None => None,
    };

    TemplateModel {
        id: template.id.clone(),
        name: template.name.clone(),
        label: non_empty(&template.label),
        help_text: non_empty(&template.help_text),
        default_value,
        display_settings: Some(template.display_settings.clone()).filter(|s| !s.is_empty()),
    }
}

/// Carries template ids from state so the server updates templates in place
fn assign_template_ids(model: &mut LibraryVariableSetModel, prior: &LibraryVariableSetModel) {
    for template in &mut model.template {
        if template.id.is_none() {
            template.id = prior
                .template
                .iter()
                .find(|t| t.name == template.name)
                .and_then(|t| t.id.clone());
        }
    }
}

#[derive(Default)]
pub struct LibraryVariableSetResource {
    provider_data: Option<OctopusDeployProviderData>,
}

impl LibraryVariableSetResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn client(&self) -> Result<&Client, Vec<Diagnostic>> {
        self.provider_data
            .as_ref()
            .map(|data| data.client.as_ref())
            .ok_or_else(|| vec![not_configured_diagnostic()])
    }

    async fn create_library_variable_set(
        &self,
        ctx: &Context,
        config: &DynamicValue,
    ) -> Result<DynamicValue, Vec<Diagnostic>> {
        let client = self.client()?;
        let model: LibraryVariableSetModel = library_variable_set_schema().decode(config)?;
        let library_variable_set = expand_library_variable_set(&model)?;

        tracing::info!("creating library variable set: {}", library_variable_set.name);

        let created = run_api_call(
            ctx,
            client.library_variable_sets().add(&library_variable_set),
        )
        .await
        .map_err(|e| vec![e.to_diagnostic("create", TYPE_NAME, &model.name)])?;

        let state = flatten_library_variable_set(&created, &model);
        tracing::info!(
            "library variable set created ({})",
            state.id.as_deref().unwrap_or_default()
        );
        to_state(&state)
    }

    async fn read_library_variable_set(
        &self,
        ctx: &Context,
        current_state: &DynamicValue,
    ) -> Result<Option<DynamicValue>, Vec<Diagnostic>> {
        let client = self.client()?;
        let current: LibraryVariableSetModel = current_state
            .decode()
            .map_err(|e| vec![state_decode_diagnostic(e)])?;

        let Some(id) = current.id.clone().filter(|id| !id.is_empty()) else {
            return Ok(None);
        };

        tracing::info!("reading library variable set ({})", id);

        let library_variable_set =
            match run_api_call(ctx, client.library_variable_sets().get_by_id(&id)).await {
                Ok(library_variable_set) => library_variable_set,
                Err(e) => {
                    return match process_api_error(&e, TYPE_NAME, &id) {
                        None => Ok(None),
                        Some(diag) => Err(vec![diag]),
                    }
                }
            };

        let state = flatten_library_variable_set(&library_variable_set, &current);
        tracing::info!("library variable set read ({})", id);
        to_state(&state).map(Some)
    }

    async fn update_library_variable_set(
        &self,
        ctx: &Context,
        prior_state: &DynamicValue,
        config: &DynamicValue,
    ) -> Result<DynamicValue, Vec<Diagnostic>> {
        let client = self.client()?;
        let prior: LibraryVariableSetModel = prior_state
            .decode()
            .map_err(|e| vec![state_decode_diagnostic(e)])?;
        let id = prior.id.clone().filter(|id| !id.is_empty()).ok_or_else(|| {
            vec![Diagnostic::error(
                "Missing library variable set id",
                "The library variable set has no id in state",
            )
            .with_attribute(AttributePath::new("id"))]
        })?;

        let mut model: LibraryVariableSetModel = library_variable_set_schema().decode(config)?;
        model.id = Some(id.clone());
        if model.variable_set_id.is_none() {
            model.variable_set_id = prior.variable_set_id.clone();
        }
        assign_template_ids(&mut model, &prior);
        let library_variable_set = expand_library_variable_set(&model)?;

        tracing::info!("updating library variable set ({})", id);

        let updated = run_api_call(
            ctx,
            client.library_variable_sets().update(&library_variable_set),
        )
        .await
        .map_err(|e| vec![e.to_diagnostic("update", TYPE_NAME, &id)])?;

        let state = flatten_library_variable_set(&updated, &model);
        tracing::info!("library variable set updated ({})", id);
        to_state(&state)
    }

    async fn delete_library_variable_set(
        &self,
        ctx: &Context,
        prior_state: &DynamicValue,
    ) -> Result<(), Vec<Diagnostic>> {
        let client = self.client()?;
        let prior: LibraryVariableSetModel = prior_state
            .decode()
            .map_err(|e| vec![state_decode_diagnostic(e)])?;
        let Some(id) = prior.id.filter(|id| !id.is_empty()) else {
            return Err(vec![Diagnostic::error(
                "Missing library variable set id",
                "The library variable set has no id in state",
            )
            .with_attribute(AttributePath::new("id"))]);
        };

        tracing::info!("deleting library variable set ({})", id);

        match run_api_call(ctx, client.library_variable_sets().delete_by_id(&id)).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                tracing::warn!("library variable set ({}) already deleted", id);
            }
            Err(e) => return Err(vec![e.to_diagnostic("delete", TYPE_NAME, &id)]),
        }

        tracing::info!("library variable set deleted ({})", id);
        Ok(())
    }
}

#[async_trait]
impl Resource for LibraryVariableSetResource {
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
            schema: library_variable_set_schema().clone(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        let mut diagnostics = library_variable_set_schema().validate(&request.config);

        if !has_errors(&diagnostics) {
            if let Ok(model) =
                library_variable_set_schema().decode::<LibraryVariableSetModel>(&request.config)
            {
                if let Err(diags) = expand_library_variable_set(&model) {
                    diagnostics.extend(diags);
                }
            }
        }

        ValidateResourceConfigResponse { diagnostics }
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        match self
            .create_library_variable_set(&ctx, &request.config)
            .await
        {
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
        match self
            .read_library_variable_set(&ctx, &request.current_state)
            .await
        {
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
            .update_library_variable_set(&ctx, &request.prior_state, &request.config)
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
                .delete_library_variable_set(&ctx, &request.prior_state)
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
        tracing::info!("importing library variable set ({})", request.id);
        import_state_passthrough_id(&ctx, AttributePath::new("id"), &request)
    }
}

#[async_trait]
impl ResourceWithConfigure for LibraryVariableSetResource {
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
    use crate::api::SensitiveValue;
    use serde_json::json;

    fn model() -> LibraryVariableSetModel {
        LibraryVariableSetModel {
            name: "Shared settings".to_string(),
            description: Some("Values shared across projects".to_string()),
            template: vec![
                TemplateModel {
                    name: "DatabaseServer".to_string(),
                    label: Some("Database server".to_string()),
                    help_text: Some("Host name of the database".to_string()),
                    default_value: Some("db.internal".to_string()),
                    display_settings: Some(HashMap::from([(
                        "Octopus.ControlType".to_string(),
                        "SingleLineText".to_string(),
                    )])),
                    ..Default::default()
                },
                TemplateModel {
                    name: "DatabasePassword".to_string(),
                    default_value: Some("s3cret".to_string()),
                    display_settings: Some(HashMap::from([(
                        "Octopus.ControlType".to_string(),
                        "Sensitive".to_string(),
                    )])),
                    ..Default::default()
                },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn expand_always_uses_variables_content_type() {
        let set = expand_library_variable_set(&model()).unwrap();
        assert_eq!(set.content_type, "Variables");
        assert_eq!(set.templates.len(), 2);
        assert_eq!(set.templates[0].name, "DatabaseServer");
        assert_eq!(
            set.templates[0].default_value,
            Some(PropertyValue::Text("db.internal".to_string()))
        );
    }

    #[test]
    fn expand_then_flatten_preserves_configured_fields() {
        let model = model();
        let mut set = expand_library_variable_set(&model).unwrap();
        set.id = Some("LibraryVariableSets-1".to_string());

        let flattened = flatten_library_variable_set(&set, &model);
        assert_eq!(
            flattened,
            LibraryVariableSetModel {
                id: Some("LibraryVariableSets-1".to_string()),
                ..model
            }
        );
    }

    #[test]
    fn flatten_keeps_sensitive_defaults_from_configuration() {
        let mut set = expand_library_variable_set(&model()).unwrap();
        set.templates[1].default_value = Some(PropertyValue::Sensitive(SensitiveValue {
            has_value: true,
            new_value: None,
        }));
        set.templates[1].id = Some("template-2".to_string());

        let flattened = flatten_library_variable_set(&set, &model());
        assert_eq!(flattened.template[1].id.as_deref(), Some("template-2"));
        assert_eq!(flattened.template[1].default_value.as_deref(), Some("s3cret"));
    }

    #[test]
    fn flatten_reads_server_shape() {
        let set: LibraryVariableSet = serde_json::from_value(json!({
            "Id": "LibraryVariableSets-1",
            "Name": "Shared settings",
            "Description": "",
            "ContentType": "Variables",
            "SpaceId": "Spaces-1",
            "VariableSetId": "variableset-LibraryVariableSets-1",
            "Templates": [
                {
                    "Id": "5e1d",
                    "Name": "Region",
                    "Label": "Region",
                    "DefaultValue": "eu-west-1",
                    "DisplaySettings": {}
                }
            ]
        }))
        .unwrap();

        let flattened = flatten_library_variable_set(&set, &LibraryVariableSetModel::default());
        assert_eq!(flattened.description, None);
        assert_eq!(flattened.space_id.as_deref(), Some("Spaces-1"));
        assert_eq!(
            flattened.variable_set_id.as_deref(),
            Some("variableset-LibraryVariableSets-1")
        );
        assert_eq!(flattened.template[0].default_value.as_deref(), Some("eu-west-1"));
        assert_eq!(flattened.template[0].display_settings, None);
        assert_eq!(flattened.template[0].help_text, None);
    }

    #[test]
    fn flatten_maps_null_server_fields_to_zero_values() {
        let set: LibraryVariableSet = serde_json::from_value(json!({
            "Id": "LibraryVariableSets-1",
            "Name": "Shared settings",
            "Description": null,
            "ContentType": null,
            "SpaceId": null,
            "VariableSetId": null,
            "Templates": [
                {
                    "Id": null,
                    "Name": "Region",
                    "Label": null,
                    "HelpText": null,
                    "DefaultValue": null,
                    "DisplaySettings": null
                }
            ]
        }))
        .unwrap();
        assert_eq!(set.content_type, crate::api::library_variable_sets::CONTENT_TYPE_VARIABLES);

        let flattened = flatten_library_variable_set(&set, &LibraryVariableSetModel::default());
        assert_eq!(flattened.description, None);
        assert_eq!(flattened.variable_set_id, None);
        assert_eq!(flattened.template.len(), 1);
        assert_eq!(flattened.template[0].id, None);
        assert_eq!(flattened.template[0].default_value, None);
        assert_eq!(flattened.template[0].display_settings, None);

        let without_templates: LibraryVariableSet = serde_json::from_value(json!({
            "Id": "LibraryVariableSets-1",
            "Name": "Shared settings",
            "Templates": null
        }))
        .unwrap();
        let flattened =
            flatten_library_variable_set(&without_templates, &LibraryVariableSetModel::default());
        assert!(flattened.template.is_empty());
    }

    #[test]
    fn template_default_value_is_sensitive() {
        let template = library_variable_set_schema()
            .block
            .block_types
            .iter()
            .find(|b| b.type_name == "template")
            .unwrap();
        let sensitive: Vec<_> = template
            .block
            .attributes
            .iter()
            .filter(|a| a.sensitive)
            .map(|a| a.name.as_str())
            .collect();

        assert_eq!(sensitive, vec!["default_value"]);
    }

    #[test]
    fn template_ids_come_from_prior_state_by_name() {
        let mut prior = model();
        prior.template[0].id = Some("template-1".to_string());
        prior.template[1].id = Some("template-2".to_string());

        let mut planned = model();
        planned.template.reverse();
        planned.template.push(TemplateModel {
            name: "NewTemplate".to_string(),
            ..Default::default()
        });
        assign_template_ids(&mut planned, &prior);

        assert_eq!(planned.template[0].id.as_deref(), Some("template-2"));
        assert_eq!(planned.template[1].id.as_deref(), Some("template-1"));
        assert_eq!(planned.template[2].id, None);
    }

    #[test]
    fn expand_reports_blank_template_names_with_index() {
        let mut model = model();
        model.template[1].name = String::new();

        let diags = expand_library_variable_set(&model).unwrap_err();
        assert_eq!(diags.len(), 1);
        assert_eq!(
            diags[0].attribute.as_ref().map(ToString::to_string).as_deref(),
            Some("template[1].name")
        );
    }

    #[test]
    fn template_block_decodes_from_config() {
        let model: LibraryVariableSetModel = library_variable_set_schema()
            .decode(&DynamicValue::from_json(json!({
                "name": "Shared settings",
                "template": [
                    { "name": "Region", "display_settings": { "Octopus.ControlType": "Select" } }
                ]
            })))
            .unwrap();

        assert_eq!(model.template.len(), 1);
        assert_eq!(model.template[0].id, None);
        assert_eq!(
            model.template[0]
                .display_settings
                .as_ref()
                .and_then(|s| s.get("Octopus.ControlType"))
                .map(String::as_str),
            Some("Select")
        );
    }

    #[test]
    fn template_id_cannot_be_configured() {
        let diags = library_variable_set_schema().validate(&DynamicValue::from_json(json!({
            "name": "Shared settings",
            "template": [{ "id": "abc", "name": "Region" }]
        })));
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].summary, "Value for unconfigurable attribute");
    }
}
