use std::collections::{BTreeMap, HashMap};

use log::debug;
use serde_json::{json, Map, Value};

use crate::models::CloudProvider;
use crate::policy::config::{PolicyConfig, ProviderPolicyConfig};

pub type Labels = BTreeMap<String, String>;

/// Policies for one account, project or subscription.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScopePolicies {
    pub scope_level: Option<String>,
    pub regions: HashMap<String, String>,
}

/// Policies for one cloud provider.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderPolicies {
    pub cloud_level: Option<String>,
    pub scopes: HashMap<String, ScopePolicies>,
}

/// Precomputed provider → scope → region policy table.
///
/// Built once from [`PolicyConfig`] and never mutated afterwards. A policy
/// that was not configured is absent, an explicit empty string is kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolicyLookup {
    providers: HashMap<CloudProvider, ProviderPolicies>,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct ScopeLabels {
    labels: Labels,
    regions: HashMap<String, Labels>,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct ProviderLabels {
    labels: Labels,
    scopes: HashMap<String, ScopeLabels>,
}

/// Descriptive request labels addressed the same way as policies.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelLookup {
    static_labels: Labels,
    providers: HashMap<CloudProvider, ProviderLabels>,
}

/// Names used when describing a provider's table.
fn scope_names(provider: &CloudProvider) -> (&'static str, &'static str) {
    match provider {
        CloudProvider::Aws => ("accounts", "account_level"),
        CloudProvider::Gcp => ("projects", "project_level"),
        CloudProvider::Azure => ("subscriptions", "subscription_level"),
        CloudProvider::Other(_) => ("scopes", "scope_level"),
    }
}

/// Walk the configuration tree once, producing both tables.
pub fn build_lookups(config: &PolicyConfig) -> (PolicyLookup, LabelLookup) {
    let mut policies = PolicyLookup::default();
    let mut labels = LabelLookup {
        static_labels: config.labels.clone(),
        providers: HashMap::new(),
    };

    let providers = [
        (CloudProvider::Aws, config.aws.as_ref()),
        (CloudProvider::Gcp, config.gcp.as_ref()),
        (CloudProvider::Azure, config.azure.as_ref()),
    ];

    // Every configured provider is processed, none short-circuits the others
    for (provider, provider_config) in providers {
        if let Some(provider_config) = provider_config {
            let (provider_policies, provider_labels) = build_provider(provider_config);
            debug!(
                "Policy lookup for {}: cloud_level={:?}, {} scopes",
                provider,
                provider_policies.cloud_level,
                provider_policies.scopes.len()
            );
            policies.providers.insert(provider.clone(), provider_policies);
            labels.providers.insert(provider, provider_labels);
        }
    }

    (policies, labels)
}

fn build_provider(config: &ProviderPolicyConfig) -> (ProviderPolicies, ProviderLabels) {
    let mut policies = ProviderPolicies {
        cloud_level: config.policy.clone(),
        scopes: HashMap::new(),
    };
    let mut labels = ProviderLabels {
        labels: config.labels.clone(),
        scopes: HashMap::new(),
    };

    for entry in &config.scopes {
        let scope = entry.detail();
        let mut scope_policies = ScopePolicies {
            scope_level: scope.policy.clone(),
            regions: HashMap::new(),
        };
        let mut scope_labels = ScopeLabels {
            labels: scope.labels.clone(),
            regions: HashMap::new(),
        };

        for region_entry in &scope.regions {
            let region = region_entry.detail();
            if let Some(policy) = region.policy {
                scope_policies.regions.insert(region.id.clone(), policy);
            }
            if !region.labels.is_empty() {
                scope_labels.regions.insert(region.id, region.labels);
            }
        }

        policies.scopes.insert(scope.id.clone(), scope_policies);
        labels.scopes.insert(scope.id, scope_labels);
    }

    (policies, labels)
}

impl PolicyLookup {
    pub fn provider(&self, provider: &CloudProvider) -> Option<&ProviderPolicies> {
        self.providers.get(provider)
    }

    /// JSON view of the table using provider-specific key names
    /// (`accounts`/`account_level` for AWS and so on).
    pub fn describe(&self) -> Value {
        let mut root = Map::new();
        let mut providers: Vec<_> = self.providers.iter().collect();
        providers.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()));

        for (provider, table) in providers {
            let (scopes_key, scope_level_key) = scope_names(provider);
            let mut provider_obj = Map::new();
            if let Some(policy) = &table.cloud_level {
                provider_obj.insert("cloud_level".to_string(), json!(policy));
            }

            let mut scopes = Map::new();
            for (scope_id, scope) in &table.scopes {
                let mut scope_obj = Map::new();
                if let Some(policy) = &scope.scope_level {
                    scope_obj.insert(scope_level_key.to_string(), json!(policy));
                }
                let regions: Map<String, Value> = scope
                    .regions
                    .iter()
                    .map(|(region, policy)| (region.clone(), json!(policy)))
                    .collect();
                scope_obj.insert("regions".to_string(), Value::Object(regions));
                scopes.insert(scope_id.clone(), Value::Object(scope_obj));
            }
            provider_obj.insert(scopes_key.to_string(), Value::Object(scopes));
            root.insert(provider.to_string(), Value::Object(provider_obj));
        }

        Value::Object(root)
    }
}

impl LabelLookup {
    /// Merge static, provider, scope and region labels; the more specific
    /// level wins on key clashes.
    pub fn labels_for(
        &self,
        provider: &CloudProvider,
        scope_id: Option<&str>,
        region_id: Option<&str>,
    ) -> Labels {
        let mut merged = self.static_labels.clone();

        let Some(provider_labels) = self.providers.get(provider) else {
            return merged;
        };
        merged.extend(provider_labels.labels.clone());

        let Some(scope) = scope_id.and_then(|id| provider_labels.scopes.get(id)) else {
            return merged;
        };
        merged.extend(scope.labels.clone());

        if let Some(region) = region_id.and_then(|id| scope.regions.get(id)) {
            merged.extend(region.clone());
        }
        merged
    }
}
