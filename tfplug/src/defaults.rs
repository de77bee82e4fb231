//! Default value providers for attributes
//!
//! Defaults are applied by [`crate::schema::Schema::decode`] when an optional
//! attribute is absent or null in configuration.
//!
//! ```no_run
//! use tfplug::schema::{AttributeBuilder, AttributeType};
//! use tfplug::defaults::{StaticDefault, EnvDefault};
//!
//! let take = AttributeBuilder::new("take", AttributeType::Number)
//!     .default(StaticDefault::number(1.0))
//!     .build();
//!
//! let address = AttributeBuilder::new("address", AttributeType::String)
//!     .default(EnvDefault::create_required("OCTOPUS_URL"))
//!     .build();
//! ```

use crate::schema::DefaultValue;
use crate::types::Dynamic;
use std::env;
use std::sync::Arc;

/// StaticDefault provides a static default value
pub struct StaticDefault {
    value: Dynamic,
}

impl StaticDefault {
    pub fn create(value: Dynamic) -> Arc<dyn DefaultValue> {
        Arc::new(Self { value })
    }

    pub fn string(value: &str) -> Arc<dyn DefaultValue> {
        Self::create(Dynamic::String(value.to_string()))
    }

    pub fn number(value: f64) -> Arc<dyn DefaultValue> {
        Self::create(Dynamic::Number(value))
    }

    pub fn bool(value: bool) -> Arc<dyn DefaultValue> {
        Self::create(Dynamic::Bool(value))
    }

    pub fn list(values: Vec<Dynamic>) -> Arc<dyn DefaultValue> {
        Self::create(Dynamic::List(values))
    }
}

impl DefaultValue for StaticDefault {
    fn description(&self) -> String {
        format!("static default value: {:?}", self.value)
    }

    fn default_value(&self) -> Dynamic {
        self.value.clone()
    }
}

/// EnvDefault reads the default from an environment variable at decode time
pub struct EnvDefault {
    env_var: String,
    fallback: Option<String>,
}

impl EnvDefault {
    pub fn create(env_var: &str, fallback: &str) -> Arc<dyn DefaultValue> {
        Arc::new(Self {
            env_var: env_var.to_string(),
            fallback: Some(fallback.to_string()),
        })
    }

    /// Without a fallback, an unset variable leaves the attribute null
    pub fn create_required(env_var: &str) -> Arc<dyn DefaultValue> {
        Arc::new(Self {
            env_var: env_var.to_string(),
            fallback: None,
        })
    }
}

impl DefaultValue for EnvDefault {
    fn description(&self) -> String {
        match &self.fallback {
            Some(fallback) => format!(
                "default from environment variable {} (fallback: {})",
                self.env_var, fallback
            ),
            None => format!("default from environment variable {}", self.env_var),
        }
    }

    fn default_value(&self) -> Dynamic {
        match env::var(&self.env_var) {
            Ok(val) if !val.is_empty() => Dynamic::String(val),
            _ => match &self.fallback {
                Some(fallback) => Dynamic::String(fallback.clone()),
                None => Dynamic::Null,
            },
        }
    }
}

/// Parses the common truthy spellings of a boolean environment variable
pub struct EnvBoolDefault {
    env_var: String,
    fallback: bool,
}

impl EnvBoolDefault {
    pub fn create(env_var: &str, fallback: bool) -> Arc<dyn DefaultValue> {
        Arc::new(Self {
            env_var: env_var.to_string(),
            fallback,
        })
    }
}

impl DefaultValue for EnvBoolDefault {
    fn description(&self) -> String {
        format!(
            "boolean from environment variable {} (fallback: {})",
            self.env_var, self.fallback
        )
    }

    fn default_value(&self) -> Dynamic {
        let value = match env::var(&self.env_var) {
            Ok(val) => matches!(val.to_lowercase().as_str(), "1" | "true" | "yes"),
            Err(_) => self.fallback,
        };
        Dynamic::Bool(value)
    }
}
