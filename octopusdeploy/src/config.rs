//! Provider configuration
//!
//! Every setting can come from the provider block or from the environment;
//! the provider block wins.

use serde::Deserialize;
use std::sync::OnceLock;
use tfplug::defaults::{EnvBoolDefault, EnvDefault};
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};
use tfplug::validator::StringLengthValidator;
use tfplug::Sensitive;
use url::Url;

use crate::api::{ApiError, Client, RetryConfig};

pub const ENV_ADDRESS: &str = "OCTOPUS_URL";
pub const ENV_API_KEY: &str = "OCTOPUS_APIKEY";
pub const ENV_SPACE_ID: &str = "OCTOPUS_SPACE_ID";
pub const ENV_INSECURE: &str = "OCTOPUS_INSECURE";

#[derive(Debug, Default, Deserialize)]
struct ProviderConfigModel {
    address: Option<String>,
    api_key: Option<Sensitive<String>>,
    space_id: Option<String>,
    #[serde(default)]
    insecure: bool,
}

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub address: Url,
    pub api_key: Sensitive<String>,
    pub space_id: Option<String>,
    pub insecure: bool,
}

impl ProviderConfig {
    pub fn schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();

        SCHEMA.get_or_init(|| {
            SchemaBuilder::new()
                .description("The Octopus Deploy provider manages resources in an Octopus Deploy server")
                .attribute(
                    AttributeBuilder::new("address", AttributeType::String)
                        .description(
                            "The endpoint of the Octopus REST API, e.g. https://octopus.example.com. \
                             Defaults to the OCTOPUS_URL environment variable",
                        )
                        .default(EnvDefault::create_required(ENV_ADDRESS))
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("api_key", AttributeType::String)
                        .description(
                            "The API key used to authenticate. Defaults to the OCTOPUS_APIKEY environment variable",
                        )
                        .sensitive()
                        .validator(StringLengthValidator::not_blank())
                        .default(EnvDefault::create_required(ENV_API_KEY))
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("space_id", AttributeType::String)
                        .description(
                            "The space to scope every request to. Defaults to the OCTOPUS_SPACE_ID \
                             environment variable, or the server's default space",
                        )
                        .default(EnvDefault::create_required(ENV_SPACE_ID))
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("insecure", AttributeType::Bool)
                        .description("Skip TLS certificate verification")
                        .default(EnvBoolDefault::create(ENV_INSECURE, false))
                        .build(),
                )
                .build()
        })
    }

    /// Decodes and checks the provider block, collecting every problem
    pub fn from_config(config: &DynamicValue) -> Result<Self, Vec<Diagnostic>> {
        let model: ProviderConfigModel = Self::schema().decode(config)?;
        let mut diagnostics = Vec::new();

        let address = match model.address.as_deref().map(str::trim) {
            Some(address) if !address.is_empty() => match Url::parse(address) {
                Ok(url) => Some(url),
                Err(e) => {
                    diagnostics.push(
                        Diagnostic::error("Invalid address", format!("'{}': {}", address, e))
                            .with_attribute(AttributePath::new("address")),
                    );
                    None
                }
            },
            _ => {
                diagnostics.push(
                    Diagnostic::error(
                        "Missing address",
                        format!(
                            "address is required (set in provider config or {} env var)",
                            ENV_ADDRESS
                        ),
                    )
                    .with_attribute(AttributePath::new("address")),
                );
                None
            }
        };

        let api_key = match model.api_key {
            Some(key) if !key.is_empty() => Some(key),
            _ => {
                diagnostics.push(
                    Diagnostic::error(
                        "Missing API key",
                        format!(
                            "api_key is required (set in provider config or {} env var)",
                            ENV_API_KEY
                        ),
                    )
                    .with_attribute(AttributePath::new("api_key")),
                );
                None
            }
        };

        match (address, api_key) {
            (Some(address), Some(api_key)) if diagnostics.is_empty() => Ok(Self {
                address,
                api_key,
                space_id: model.space_id.filter(|s| !s.trim().is_empty()),
                insecure: model.insecure,
            }),
            _ => Err(diagnostics),
        }
    }

    pub fn build_client(&self) -> Result<Client, ApiError> {
        self.build_client_with(RetryConfig::default())
    }

    pub fn build_client_with(&self, retry_config: RetryConfig) -> Result<Client, ApiError> {
        Client::with_config(
            self.address.as_str(),
            self.api_key.expose(),
            self.space_id.as_deref(),
            self.insecure,
            retry_config,
        )
    }
}
