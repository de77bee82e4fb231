//! Schema types and builders for tfplug
//!
//! A [`Schema`] declares every attribute of a provider, resource or data
//! source: its type, whether it is required, optional or computed, whether
//! it is sensitive, its default and its validators. The schema is also the
//! boundary where loosely typed configuration becomes a typed model, see
//! [`Schema::decode`].

use crate::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// AttributeType mirrors Terraform's type system
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeType {
    String,
    Number,
    Bool,
    List(Box<AttributeType>),
    Set(Box<AttributeType>),
    Map(Box<AttributeType>),
    Object(HashMap<String, AttributeType>),
}

impl AttributeType {
    pub fn list_of(element: AttributeType) -> Self {
        AttributeType::List(Box::new(element))
    }

    pub fn map_of(element: AttributeType) -> Self {
        AttributeType::Map(Box::new(element))
    }

    /// Whether `value` conforms to this type. Null and unknown conform to
    /// every type; missing object fields are treated as null.
    pub fn accepts(&self, value: &Dynamic) -> bool {
        match (self, value) {
            (_, Dynamic::Null) | (_, Dynamic::Unknown) => true,
            (AttributeType::String, Dynamic::String(_)) => true,
            (AttributeType::Number, Dynamic::Number(_)) => true,
            (AttributeType::Bool, Dynamic::Bool(_)) => true,
            (AttributeType::List(element), Dynamic::List(items))
            | (AttributeType::Set(element), Dynamic::List(items)) => {
                items.iter().all(|item| element.accepts(item))
            }
            (AttributeType::Map(element), Dynamic::Map(entries)) => {
                entries.values().all(|entry| element.accepts(entry))
            }
            (AttributeType::Object(fields), Dynamic::Map(entries)) => {
                entries.iter().all(|(name, entry)| {
                    fields
                        .get(name)
                        .is_some_and(|field_type| field_type.accepts(entry))
                })
            }
            _ => false,
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeType::String => write!(f, "string"),
            AttributeType::Number => write!(f, "number"),
            AttributeType::Bool => write!(f, "bool"),
            AttributeType::List(e) => write!(f, "list({})", e),
            AttributeType::Set(e) => write!(f, "set({})", e),
            AttributeType::Map(e) => write!(f, "map({})", e),
            AttributeType::Object(_) => write!(f, "object"),
        }
    }
}

/// Schema is returned by providers, resources and data sources.
/// Version is used for state migration.
#[derive(Debug, Clone)]
pub struct Schema {
    pub version: i64,
    pub block: Block,
}

#[derive(Debug, Clone, Default)]
pub struct Block {
    pub attributes: Vec<Attribute>,
    pub block_types: Vec<NestedBlock>,
    pub description: String,
    pub deprecated: bool,
}

/// A single configuration attribute
#[derive(Clone)]
pub struct Attribute {
    pub name: String,
    pub r#type: AttributeType,
    pub description: String,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub sensitive: bool,
    pub deprecated: bool,
    pub validators: Vec<Arc<dyn Validator>>,
    pub default: Option<Arc<dyn DefaultValue>>,
}

impl fmt::Debug for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attribute")
            .field("name", &self.name)
            .field("type", &self.r#type)
            .field("required", &self.required)
            .field("optional", &self.optional)
            .field("computed", &self.computed)
            .field("sensitive", &self.sensitive)
            .field(
                "validators",
                &self
                    .validators
                    .iter()
                    .map(|v| v.description())
                    .collect::<Vec<_>>(),
            )
            .field("default", &self.default.as_ref().map(|d| d.description()))
            .finish()
    }
}

/// NestedBlock represents a repeated configuration block such as `template { }`
#[derive(Debug, Clone)]
pub struct NestedBlock {
    pub type_name: String,
    pub block: Block,
    pub nesting: NestingMode,
    pub min_items: i64,
    pub max_items: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NestingMode {
    Single,
    List,
    Set,
}

/// Validator checks a configured, known, non-null attribute value
pub trait Validator: Send + Sync {
    fn description(&self) -> String;

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>);
}

/// DefaultValue supplies a value for an optional attribute left unset
pub trait DefaultValue: Send + Sync {
    fn description(&self) -> String;

    fn default_value(&self) -> Dynamic;
}

impl Block {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn block_type(&self, name: &str) -> Option<&NestedBlock> {
        self.block_types.iter().find(|b| b.type_name == name)
    }

    fn apply_defaults(&self, value: &mut Dynamic) {
        let Dynamic::Map(entries) = value else {
            return;
        };

        for attribute in &self.attributes {
            let Some(default) = &attribute.default else {
                continue;
            };
            let unset = !matches!(entries.get(&attribute.name), Some(v) if !v.is_null());
            if unset {
                entries.insert(attribute.name.clone(), default.default_value());
            }
        }

        for nested in &self.block_types {
            match entries.get_mut(&nested.type_name) {
                Some(Dynamic::List(items)) => {
                    for item in items.iter_mut() {
                        nested.block.apply_defaults(item);
                    }
                }
                Some(item @ Dynamic::Map(_)) => nested.block.apply_defaults(item),
                _ => {}
            }
        }
    }

    fn validate(&self, value: &Dynamic, base: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        let empty = HashMap::new();
        let entries = match value {
            Dynamic::Map(entries) => entries,
            Dynamic::Null => &empty,
            Dynamic::Unknown => return,
            other => {
                diagnostics.push(
                    Diagnostic::error(
                        "Incorrect value type",
                        format!("expected an object, got {}", other.type_name()),
                    )
                    .with_attribute(base.clone()),
                );
                return;
            }
        };

        for attribute in &self.attributes {
            let path = child_path(base, &attribute.name);
            let value = entries.get(&attribute.name).unwrap_or(&Dynamic::Null);
            attribute.validate(value, &path, diagnostics);
        }

        for nested in &self.block_types {
            let path = child_path(base, &nested.type_name);
            let value = entries.get(&nested.type_name).unwrap_or(&Dynamic::Null);
            nested.validate(value, &path, diagnostics);
        }

        for name in entries.keys() {
            if self.attribute(name).is_none() && self.block_type(name).is_none() {
                diagnostics.push(
                    Diagnostic::error(
                        "Unsupported argument",
                        format!("An argument named \"{}\" is not expected here", name),
                    )
                    .with_attribute(child_path(base, name)),
                );
            }
        }
    }
}

fn child_path(base: &AttributePath, name: &str) -> AttributePath {
    base.clone().attribute(name)
}

impl Attribute {
    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        if value.is_unknown() {
            return;
        }

        if value.is_null() {
            if self.required {
                diagnostics.push(
                    Diagnostic::error(
                        "Missing required argument",
                        format!("The argument \"{}\" is required", self.name),
                    )
                    .with_attribute(path.clone()),
                );
            }
            return;
        }

        if self.computed && !self.optional && !self.required {
            diagnostics.push(
                Diagnostic::error(
                    "Value for unconfigurable attribute",
                    format!("\"{}\" is computed and cannot be set", self.name),
                )
                .with_attribute(path.clone()),
            );
            return;
        }

        if !self.r#type.accepts(value) {
            diagnostics.push(
                Diagnostic::error(
                    "Incorrect attribute value type",
                    format!(
                        "\"{}\" must be {}, got {}",
                        self.name,
                        self.r#type,
                        value.type_name()
                    ),
                )
                .with_attribute(path.clone()),
            );
            return;
        }

        for validator in &self.validators {
            validator.validate(value, path, diagnostics);
        }
    }
}

impl NestedBlock {
    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        match (self.nesting, value) {
            (_, Dynamic::Unknown) => {}
            (NestingMode::Single, Dynamic::Null) if self.min_items > 0 => {
                diagnostics.push(
                    Diagnostic::error(
                        "Missing required block",
                        format!("A \"{}\" block is required", self.type_name),
                    )
                    .with_attribute(path.clone()),
                );
            }
            (NestingMode::Single, Dynamic::Null) => {}
            (NestingMode::Single, single) => self.block.validate(single, path, diagnostics),
            (_, Dynamic::Null) => self.check_count(0, path, diagnostics),
            (_, Dynamic::List(items)) => {
                self.check_count(items.len(), path, diagnostics);
                for (idx, item) in items.iter().enumerate() {
                    let item_path = path.clone().index(idx as i64);
                    self.block.validate(item, &item_path, diagnostics);
                }
            }
            (_, other) => diagnostics.push(
                Diagnostic::error(
                    "Incorrect block type",
                    format!(
                        "\"{}\" must be a list of blocks, got {}",
                        self.type_name,
                        other.type_name()
                    ),
                )
                .with_attribute(path.clone()),
            ),
        }
    }

    fn check_count(&self, count: usize, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        let count = count as i64;
        if count < self.min_items {
            diagnostics.push(
                Diagnostic::error(
                    "Insufficient blocks",
                    format!(
                        "At least {} \"{}\" blocks are required",
                        self.min_items, self.type_name
                    ),
                )
                .with_attribute(path.clone()),
            );
        }
        if self.max_items > 0 && count > self.max_items {
            diagnostics.push(
                Diagnostic::error(
                    "Too many blocks",
                    format!(
                        "No more than {} \"{}\" blocks are allowed",
                        self.max_items, self.type_name
                    ),
                )
                .with_attribute(path.clone()),
            );
        }
    }
}

impl Schema {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.block.attribute(name)
    }

    /// Names of every attribute marked sensitive, at the top level
    pub fn sensitive_attributes(&self) -> Vec<&str> {
        self.block
            .attributes
            .iter()
            .filter(|a| a.sensitive)
            .map(|a| a.name.as_str())
            .collect()
    }

    /// Fills unset optional attributes that declare a default
    pub fn apply_defaults(&self, config: &mut DynamicValue) {
        if config.is_null() {
            config.value = Dynamic::Map(HashMap::new());
        }
        self.block.apply_defaults(&mut config.value);
    }

    /// Checks required attributes, value types and validators
    pub fn validate(&self, config: &DynamicValue) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        self.block
            .validate(&config.value, &AttributePath::root(), &mut diagnostics);
        diagnostics
    }

    /// The validated decode step: applies defaults, validates, then
    /// deserializes into the typed model `T`.
    pub fn decode<T: DeserializeOwned>(
        &self,
        config: &DynamicValue,
    ) -> std::result::Result<T, Vec<Diagnostic>> {
        let mut config = config.clone();
        self.apply_defaults(&mut config);

        let diagnostics = self.validate(&config);
        if crate::types::has_errors(&diagnostics) {
            tracing::debug!(errors = diagnostics.len(), "configuration failed validation");
            return Err(diagnostics);
        }

        config.decode().map_err(|e| {
            vec![Diagnostic::error(
                "Invalid configuration",
                format!("configuration could not be decoded: {}", e),
            )]
        })
    }
}

/// AttributeBuilder provides fluent API for building attributes
pub struct AttributeBuilder {
    attribute: Attribute,
}

impl AttributeBuilder {
    pub fn new(name: &str, type_: AttributeType) -> Self {
        Self {
            attribute: Attribute {
                name: name.to_string(),
                r#type: type_,
                description: String::new(),
                required: false,
                optional: false,
                computed: false,
                sensitive: false,
                deprecated: false,
                validators: Vec::new(),
                default: None,
            },
        }
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.attribute.description = desc.to_string();
        self
    }

    pub fn required(mut self) -> Self {
        self.attribute.required = true;
        self.attribute.optional = false;
        self
    }

    pub fn optional(mut self) -> Self {
        self.attribute.optional = true;
        self.attribute.required = false;
        self
    }

    pub fn computed(mut self) -> Self {
        self.attribute.computed = true;
        self
    }

    /// Never shown in plan output or logs
    pub fn sensitive(mut self) -> Self {
        self.attribute.sensitive = true;
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.attribute.deprecated = true;
        self
    }

    pub fn validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.attribute.validators.push(validator);
        self
    }

    /// Defaults only make sense on optional attributes, so this also marks
    /// the attribute optional and computed.
    pub fn default(mut self, default: Arc<dyn DefaultValue>) -> Self {
        self.attribute.default = Some(default);
        self.attribute.optional = true;
        self.attribute.required = false;
        self.attribute.computed = true;
        self
    }

    pub fn build(self) -> Attribute {
        self.attribute
    }
}

/// SchemaBuilder provides fluent API for building schemas
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self {
            schema: Schema {
                version: 0,
                block: Block::default(),
            },
        }
    }

    pub fn version(mut self, version: i64) -> Self {
        self.schema.version = version;
        self
    }

    pub fn attribute(mut self, attr: Attribute) -> Self {
        self.schema.block.attributes.push(attr);
        self
    }

    pub fn block(mut self, block: NestedBlock) -> Self {
        self.schema.block.block_types.push(block);
        self
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.schema.block.description = desc.to_string();
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.schema.block.deprecated = true;
        self
    }

    pub fn build(self) -> Schema {
        self.schema
    }
}

impl std::default::Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds a list-nested block from attributes
pub fn list_block(type_name: &str, description: &str, attributes: Vec<Attribute>) -> NestedBlock {
    NestedBlock {
        type_name: type_name.to_string(),
        block: Block {
            attributes,
            block_types: Vec::new(),
            description: description.to_string(),
            deprecated: false,
        },
        nesting: NestingMode::List,
        min_items: 0,
        max_items: 0,
    }
}
