use serde::{Deserialize, Serialize};
use std::fmt;

use super::common::null_as_default;

/// Write-only secret as the Octopus API models it.
///
/// The server never returns the plaintext: responses carry `HasValue` and a
/// null `NewValue`. Requests set `NewValue` to replace the secret.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SensitiveValue {
    #[serde(default, deserialize_with = "null_as_default")]
    pub has_value: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<String>,
}

impl SensitiveValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            has_value: true,
            new_value: Some(value.into()),
        }
    }

    /// No secret set; an empty string clears nothing and is treated the same
    pub fn from_optional(value: Option<&str>) -> Self {
        match value {
            Some(v) if !v.is_empty() => Self::new(v),
            _ => Self::default(),
        }
    }
}

impl fmt::Debug for SensitiveValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SensitiveValue")
            .field("has_value", &self.has_value)
            .field("new_value", &self.new_value.as_ref().map(|_| "(sensitive value)"))
            .finish()
    }
}
