use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::constants::UNKNOWN_RESOURCE_ID;

/// Cloud provider an artifact was extracted from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CloudProvider {
    Aws,
    Gcp,
    Azure,
    /// Unrecognized or unset provider; resolves straight to the default policy
    Other(String),
}

impl CloudProvider {
    /// Parse a provider name, case-insensitively.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "aws" => CloudProvider::Aws,
            "gcp" => CloudProvider::Gcp,
            "azure" => CloudProvider::Azure,
            other => CloudProvider::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            CloudProvider::Aws => "aws",
            CloudProvider::Gcp => "gcp",
            CloudProvider::Azure => "azure",
            CloudProvider::Other(name) => name,
        }
    }
}

impl fmt::Display for CloudProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Scope and naming fields an extractor places under `metadata`.
///
/// Anything the relay does not read is kept in `extra` and written back
/// unchanged.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ArtifactMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A single extracted cloud-resource configuration record.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Artifact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ArtifactMetadata>,
    /// Everything else the extractor produced, forwarded untouched
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

fn non_default(value: Option<&String>) -> Option<&str> {
    value
        .map(|s| s.as_str())
        .filter(|s| !s.is_empty() && *s != UNKNOWN_RESOURCE_ID)
}

impl Artifact {
    /// Build an artifact from an arbitrary JSON value.
    pub fn from_value(value: Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }

    /// Effective resource id: metadata first, then top level, else `"unknown"`.
    pub fn artifact_id(&self) -> String {
        let from_metadata = self
            .metadata
            .as_ref()
            .and_then(|m| non_default(m.resource_id.as_ref()));

        from_metadata
            .or_else(|| self.resource_id.as_deref().filter(|s| !s.is_empty()))
            .unwrap_or(UNKNOWN_RESOURCE_ID)
            .to_string()
    }

    pub fn provider(&self) -> CloudProvider {
        let name = self
            .cloud_provider
            .as_deref()
            .or_else(|| self.metadata.as_ref().and_then(|m| m.cloud_provider.as_deref()))
            .unwrap_or("");
        CloudProvider::parse(name)
    }

    /// Scope identifier for the artifact's provider (account, project or subscription).
    pub fn scope_id(&self) -> Option<&str> {
        let metadata = self.metadata.as_ref()?;
        let scope = match self.provider() {
            CloudProvider::Aws => metadata.account_id.as_deref(),
            CloudProvider::Gcp => metadata.project_id.as_deref(),
            CloudProvider::Azure => metadata.subscription_id.as_deref(),
            CloudProvider::Other(_) => None,
        };
        scope.filter(|s| !s.is_empty())
    }

    /// Region identifier: `location` for Azure, `region` otherwise.
    pub fn region_id(&self) -> Option<&str> {
        let metadata = self.metadata.as_ref()?;
        let region = match self.provider() {
            CloudProvider::Azure => metadata.location.as_deref(),
            CloudProvider::Aws | CloudProvider::Gcp => metadata.region.as_deref(),
            CloudProvider::Other(_) => None,
        };
        region.filter(|s| !s.is_empty())
    }

    pub fn service(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.service.as_deref())
            .or_else(|| self.payload.get("service").and_then(Value::as_str))
    }

    pub fn resource_type(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.resource_type.as_deref())
            .or_else(|| self.payload.get("resource_type").and_then(Value::as_str))
    }

    pub fn to_json(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}
