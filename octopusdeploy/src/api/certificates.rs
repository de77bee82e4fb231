//! Certificates API
//!
//! Certificates are stored by Octopus and referenced from variables. The
//! certificate file and its password are write-only: the server derives the
//! thumbprint, subject and validity window on upload and never echoes the
//! data back.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::client::Client;
use super::common::null_as_default;
use super::error::ApiError;
use super::sensitive::SensitiveValue;

/// How a resource takes part in tenanted deployments
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TenantedDeploymentMode {
    #[default]
    Untenanted,
    TenantedOrUntenanted,
    Tenanted,
}

impl TenantedDeploymentMode {
    pub const ALL: [&'static str; 3] = ["Untenanted", "TenantedOrUntenanted", "Tenanted"];

    pub fn as_str(&self) -> &'static str {
        match self {
            TenantedDeploymentMode::Untenanted => "Untenanted",
            TenantedDeploymentMode::TenantedOrUntenanted => "TenantedOrUntenanted",
            TenantedDeploymentMode::Tenanted => "Tenanted",
        }
    }
}

impl fmt::Display for TenantedDeploymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TenantedDeploymentMode {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Untenanted" => Ok(TenantedDeploymentMode::Untenanted),
            "TenantedOrUntenanted" => Ok(TenantedDeploymentMode::TenantedOrUntenanted),
            "Tenanted" => Ok(TenantedDeploymentMode::Tenanted),
            other => Err(ApiError::InvalidParameter(format!(
                "unknown tenanted deployment mode '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Certificate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub certificate_data: SensitiveValue,
    #[serde(default, deserialize_with = "null_as_default")]
    pub password: SensitiveValue,
    #[serde(default, deserialize_with = "null_as_default")]
    pub environment_ids: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tenanted_deployment_participation: TenantedDeploymentMode,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tenant_ids: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tenant_tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space_id: Option<String>,

    // Derived by the server from the uploaded certificate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_data_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbprint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_distinguished_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer_distinguished_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_before: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_after: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub has_private_key: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_expired: bool,
}

impl Certificate {
    pub fn new(name: impl Into<String>, certificate_data: SensitiveValue) -> Self {
        Self {
            name: name.into(),
            certificate_data,
            ..Default::default()
        }
    }
}

pub struct CertificatesApi<'a> {
    client: &'a Client,
}

impl<'a> CertificatesApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    fn item_path(&self, id: &str) -> Result<String, ApiError> {
        if id.trim().is_empty() {
            return Err(ApiError::InvalidParameter(
                "certificate id must not be empty".into(),
            ));
        }
        Ok(format!(
            "{}/{}",
            self.client.collection_path("certificates"),
            urlencoding::encode(id)
        ))
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Certificate, ApiError> {
        self.client.get(&self.item_path(id)?).await
    }

    pub async fn add(&self, certificate: &Certificate) -> Result<Certificate, ApiError> {
        self.client
            .post(&self.client.collection_path("certificates"), certificate)
            .await
    }

    /// Replaces the certificate identified by `certificate.id`
    pub async fn update(&self, certificate: &Certificate) -> Result<Certificate, ApiError> {
        let id = certificate.id.as_deref().unwrap_or_default();
        self.client.put(&self.item_path(id)?, certificate).await
    }

    pub async fn delete_by_id(&self, id: &str) -> Result<(), ApiError> {
        self.client.delete(&self.item_path(id)?).await
    }
}
