use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Declarative policy overrides for the scanner transport.
///
/// ```yaml
/// default_policy: baseline
/// labels:
///   team: platform
/// aws:
///   policy: aws-baseline
///   accounts:
///     - "111111111111"
///     - id: "123456789012"
///       policy: prod-accounts
///       regions:
///         - us-east-1
///         - id: us-west-2
///           policy: prod-us-west-2
/// azure:
///   subscriptions:
///     - id: 0000-aaaa
///       locations: [westeurope]
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct PolicyConfig {
    /// Policy used when nothing more specific matches
    #[serde(default)]
    pub default_policy: String,
    /// Labels attached to every request
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws: Option<ProviderPolicyConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gcp: Option<ProviderPolicyConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azure: Option<ProviderPolicyConfig>,
}

/// Overrides for one cloud provider.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ProviderPolicyConfig {
    /// Cloud-level policy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    /// Accounts (AWS), projects (GCP) or subscriptions (Azure)
    #[serde(
        default,
        alias = "accounts",
        alias = "projects",
        alias = "subscriptions"
    )]
    pub scopes: Vec<ScopeEntry>,
}

/// A scope given either as a bare id or with overrides.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum ScopeEntry {
    Id(#[serde(deserialize_with = "scalar_id")] String),
    Detailed(ScopeDetail),
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ScopeDetail {
    #[serde(deserialize_with = "scalar_id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    /// Regions (AWS, GCP) or locations (Azure)
    #[serde(default, alias = "locations")]
    pub regions: Vec<RegionEntry>,
}

/// A region given either as a bare id or with overrides.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum RegionEntry {
    Id(#[serde(deserialize_with = "scalar_id")] String),
    Detailed(RegionDetail),
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct RegionDetail {
    #[serde(deserialize_with = "scalar_id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

impl ScopeEntry {
    /// Normalize both forms into the detailed one.
    pub fn detail(&self) -> ScopeDetail {
        match self {
            ScopeEntry::Id(id) => ScopeDetail {
                id: id.clone(),
                ..Default::default()
            },
            ScopeEntry::Detailed(detail) => detail.clone(),
        }
    }
}

impl RegionEntry {
    pub fn detail(&self) -> RegionDetail {
        match self {
            RegionEntry::Id(id) => RegionDetail {
                id: id.clone(),
                ..Default::default()
            },
            RegionEntry::Detailed(detail) => detail.clone(),
        }
    }
}

/// Account ids are often written unquoted in YAML; accept numbers too.
fn scalar_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Text(String),
        Number(u64),
    }

    match Scalar::deserialize(deserializer)? {
        Scalar::Text(text) => Ok(text),
        Scalar::Number(number) => Ok(number.to_string()),
    }
}
