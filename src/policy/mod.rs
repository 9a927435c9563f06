//! Policy selection for the scanner transport.
//!
//! A [`PolicyResolver`] is built once from a [`PolicyConfig`] tree and then
//! answers two questions for any artifact: which remote policy evaluates it,
//! and which descriptive labels tag the outbound request. Both answers use
//! the same provider → scope → region addressing:
//!
//! | Provider | Scope field       | Region field |
//! |----------|-------------------|--------------|
//! | AWS      | `account_id`      | `region`     |
//! | GCP      | `project_id`      | `region`     |
//! | Azure    | `subscription_id` | `location`   |

pub mod config;
pub mod lookup;
pub mod resolver;

pub use config::{PolicyConfig, ProviderPolicyConfig, RegionEntry, ScopeEntry};
pub use lookup::{LabelLookup, Labels, PolicyLookup};
pub use resolver::{PolicyLevel, PolicyResolver};
