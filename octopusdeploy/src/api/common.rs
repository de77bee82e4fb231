//! Common types and utilities for the Octopus Deploy API

use serde::{Deserialize, Deserializer, Serialize};

/// Reads an explicit JSON `null` the same as a missing key.
///
/// Pair with `#[serde(default)]` so both cases land on `T::default()`.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Paged list envelope returned by every collection endpoint
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResourceCollection<T> {
    #[serde(default)]
    pub items: Vec<T>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_results: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub items_per_page: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub number_of_pages: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub last_page_number: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApiErrorResponse {
    pub error_message: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub errors: Vec<String>,
}

impl ApiErrorResponse {
    /// The headline message followed by each detail error
    pub fn full_message(&self) -> String {
        let mut parts = Vec::new();
        if let Some(msg) = &self.error_message {
            parts.push(msg.clone());
        }
        parts.extend(self.errors.iter().cloned());
        parts.join(" - ")
    }
}

#[derive(Debug, thiserror::Error)]
#[error("API error details: {errors:?}")]
pub struct ApiErrorDetails {
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ApiQueryParams {
    params: Vec<(String, String)>,
}

impl ApiQueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<K: Into<String>, V: ToString>(mut self, key: K, value: V) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    pub fn add_optional<K: Into<String>, V: ToString>(mut self, key: K, value: Option<V>) -> Self {
        if let Some(v) = value {
            self.params.push((key.into(), v.to_string()));
        }
        self
    }

    /// Adds a non-empty string; empty strings are left out
    pub fn add_non_empty<K: Into<String>>(mut self, key: K, value: &str) -> Self {
        if !value.is_empty() {
            self.params.push((key.into(), value.to_string()));
        }
        self
    }

    /// Joins a list with commas; empty lists are left out
    pub fn add_list<K: Into<String>>(mut self, key: K, values: &[String]) -> Self {
        if !values.is_empty() {
            self.params.push((key.into(), values.join(",")));
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn to_query_string(&self) -> String {
        if self.params.is_empty() {
            String::new()
        } else {
            format!(
                "?{}",
                self.params
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
                    .collect::<Vec<_>>()
                    .join("&")
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_params_skip_empty_values_and_encode() {
        let params = ApiQueryParams::new()
            .add_non_empty("name", "")
            .add_non_empty("partialName", "web server")
            .add_list("roles", &["web".to_string(), "db".to_string()])
            .add_list("ids", &[])
            .add_optional("take", None::<u32>)
            .add("skip", 0);

        assert_eq!(
            params.to_query_string(),
            "?partialName=web%20server&roles=web%2Cdb&skip=0"
        );
        assert_eq!(params.get("roles"), Some("web,db"));
        assert_eq!(params.get("ids"), None);
    }

    #[test]
    fn empty_query_params_render_nothing() {
        assert_eq!(ApiQueryParams::new().to_query_string(), "");
    }

    #[test]
    fn error_response_joins_messages() {
        let body = r#"{"ErrorMessage":"There was a problem with your request.","Errors":["Name must be unique"]}"#;
        let parsed: ApiErrorResponse = serde_json::from_str(body).unwrap();
        assert_eq!(
            parsed.full_message(),
            "There was a problem with your request. - Name must be unique"
        );
    }

    #[test]
    fn null_fields_read_as_defaults() {
        let parsed: ResourceCollection<serde_json::Value> = serde_json::from_str(
            r#"{"Items":[],"TotalResults":null,"ItemsPerPage":null,"NumberOfPages":null,"LastPageNumber":null}"#,
        )
        .unwrap();
        assert!(parsed.items.is_empty());
        assert_eq!(parsed.total_results, 0);

        let error: ApiErrorResponse =
            serde_json::from_str(r#"{"ErrorMessage":"Bad request","Errors":null}"#).unwrap();
        assert_eq!(error.full_message(), "Bad request");
    }

    #[test]
    fn collection_tolerates_missing_paging_fields() {
        let parsed: ResourceCollection<serde_json::Value> =
            serde_json::from_str(r#"{"Items":[{"Id":"Machines-1"}]}"#).unwrap();
        assert_eq!(parsed.items.len(), 1);
        assert_eq!(parsed.total_results, 0);
    }
}
