//! Library variable sets API

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

use super::client::Client;
use super::common::null_as_default;
use super::error::ApiError;
use super::sensitive::SensitiveValue;

pub const CONTENT_TYPE_VARIABLES: &str = "Variables";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LibraryVariableSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(
        default = "default_content_type",
        deserialize_with = "content_type_or_variables"
    )]
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable_set_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub templates: Vec<ActionTemplateParameter>,
}

fn default_content_type() -> String {
    CONTENT_TYPE_VARIABLES.to_string()
}

fn content_type_or_variables<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(default_content_type))
}

impl LibraryVariableSet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: None,
            content_type: default_content_type(),
            space_id: None,
            variable_set_id: None,
            templates: Vec::new(),
        }
    }
}

/// A tenant variable template declared on the set
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ActionTemplateParameter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<PropertyValue>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub display_settings: HashMap<String, String>,
}

/// Template default: plain text, or a sensitive value for password controls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Text(String),
    Sensitive(SensitiveValue),
}

impl PropertyValue {
    /// The plain text, when the value is not sensitive
    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(s) => Some(s),
            PropertyValue::Sensitive(_) => None,
        }
    }
}

pub struct LibraryVariableSetsApi<'a> {
    client: &'a Client,
}

impl<'a> LibraryVariableSetsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    fn item_path(&self, id: &str) -> Result<String, ApiError> {
        if id.trim().is_empty() {
            return Err(ApiError::InvalidParameter(
                "library variable set id must not be empty".into(),
            ));
        }
        Ok(format!(
            "{}/{}",
            self.client.collection_path("libraryvariablesets"),
            urlencoding::encode(id)
        ))
    }

    pub async fn get_by_id(&self, id: &str) -> Result<LibraryVariableSet, ApiError> {
        self.client.get(&self.item_path(id)?).await
    }

    pub async fn add(
        &self,
        library_variable_set: &LibraryVariableSet,
    ) -> Result<LibraryVariableSet, ApiError> {
        self.client
            .post(
                &self.client.collection_path("libraryvariablesets"),
                library_variable_set,
            )
            .await
    }

    pub async fn update(
        &self,
        library_variable_set: &LibraryVariableSet,
    ) -> Result<LibraryVariableSet, ApiError> {
        let id = library_variable_set.id.as_deref().unwrap_or_default();
        self.client
            .put(&self.item_path(id)?, library_variable_set)
            .await
    }

    pub async fn delete_by_id(&self, id: &str) -> Result<(), ApiError> {
        self.client.delete(&self.item_path(id)?).await
    }
}
