use std::fmt;

use log::debug;

use crate::models::{Artifact, CloudProvider};
use crate::policy::config::PolicyConfig;
use crate::policy::lookup::{build_lookups, LabelLookup, Labels, PolicyLookup};

/// Level of the hierarchy that produced a policy name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyLevel {
    Region,
    Scope,
    Cloud,
    Default,
}

impl fmt::Display for PolicyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PolicyLevel::Region => "region",
            PolicyLevel::Scope => "scope",
            PolicyLevel::Cloud => "cloud",
            PolicyLevel::Default => "default",
        };
        write!(f, "{}", name)
    }
}

/// Picks the remote policy that evaluates an artifact.
///
/// Most specific wins: region under the artifact's scope, then the scope
/// itself, then the provider's cloud-level policy, then the global default.
/// Lookups are exact; an unknown scope or region simply falls through.
#[derive(Debug, Clone)]
pub struct PolicyResolver {
    default_policy: String,
    policies: PolicyLookup,
    labels: LabelLookup,
}

/// Configured, non-empty policy names only.
fn usable(policy: Option<&String>) -> Option<&str> {
    policy.map(String::as_str).filter(|p| !p.is_empty())
}

impl PolicyResolver {
    pub fn new(config: &PolicyConfig) -> Self {
        let (policies, labels) = build_lookups(config);
        Self {
            default_policy: config.default_policy.clone(),
            policies,
            labels,
        }
    }

    pub fn default_policy(&self) -> &str {
        &self.default_policy
    }

    pub fn lookup(&self) -> &PolicyLookup {
        &self.policies
    }

    pub fn resolve(&self, artifact: &Artifact) -> &str {
        self.resolve_with_level(artifact).0
    }

    pub fn resolve_with_level(&self, artifact: &Artifact) -> (&str, PolicyLevel) {
        let provider = artifact.provider();
        let resolved = self.resolve_for(&provider, artifact.scope_id(), artifact.region_id());
        debug!(
            "Resolved policy '{}' ({} level) for {} artifact {}",
            resolved.0,
            resolved.1,
            provider,
            artifact.artifact_id()
        );
        resolved
    }

    /// Resolve from raw identifiers.
    pub fn resolve_for(
        &self,
        provider: &CloudProvider,
        scope_id: Option<&str>,
        region_id: Option<&str>,
    ) -> (&str, PolicyLevel) {
        let fallback = (self.default_policy.as_str(), PolicyLevel::Default);

        if matches!(provider, CloudProvider::Other(_)) {
            return fallback;
        }
        let Some(table) = self.policies.provider(provider) else {
            return fallback;
        };

        if let Some(scope) = scope_id.and_then(|id| table.scopes.get(id)) {
            if let Some(policy) = usable(region_id.and_then(|id| scope.regions.get(id))) {
                return (policy, PolicyLevel::Region);
            }
            if let Some(policy) = usable(scope.scope_level.as_ref()) {
                return (policy, PolicyLevel::Scope);
            }
        }

        match usable(table.cloud_level.as_ref()) {
            Some(policy) => (policy, PolicyLevel::Cloud),
            None => fallback,
        }
    }

    /// Request labels for an artifact, addressed like its policy.
    pub fn labels_for(&self, artifact: &Artifact) -> Labels {
        self.labels
            .labels_for(&artifact.provider(), artifact.scope_id(), artifact.region_id())
    }
}
