//! Name → identifier resolution within a cloud provider's type namespaces.
//!
//! The server registers each provider twice, as a cloud manager and a
//! network manager, and scopes concrete resource kinds by composed type
//! strings such as `{namespace}::Flavor`. Callers hand this module a
//! provider name and a human-readable resource name; it hands back the
//! identifier the server expects, or aborts — every caller here needs the
//! identifier to proceed, so "not found" is a hard error rather than an
//! empty result.

use tracing::warn;

use crate::error::{ClientError, Result};
use crate::query::{Condition, FilterExpr, FilterOp};
use crate::resource::Resource;
use crate::rest::RestClient;

const PROVIDERS_COLLECTION: &str = "providers";

/// What to do when a name lookup matches more than one resource.
///
/// The default takes the first match in server-returned order with a
/// warning. That is a deliberate tradeoff for noisy inventories, but it has
/// hidden misconfiguration before; `Abort` is available for callers that
/// would rather fail hard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AmbiguityPolicy {
    #[default]
    FirstMatch,
    Abort,
}

/// Resource kinds resolvable within a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Flavor,
    Template,
    SecurityGroup,
    KeyPair,
    Tenant,
    Network,
}

impl ResourceKind {
    /// Collection the kind lives in.
    pub fn collection(&self) -> &'static str {
        match self {
            ResourceKind::Flavor => "flavors",
            ResourceKind::Template => "templates",
            ResourceKind::SecurityGroup => "security_groups",
            ResourceKind::KeyPair => "authentications",
            ResourceKind::Tenant => "cloud_tenants",
            ResourceKind::Network => "cloud_networks",
        }
    }

    fn type_suffix(&self) -> &'static str {
        match self {
            ResourceKind::Flavor => "::Flavor",
            ResourceKind::Template => "::Template",
            ResourceKind::SecurityGroup => "::SecurityGroup",
            ResourceKind::KeyPair => "::AuthKeyPair",
            ResourceKind::Tenant => "::CloudTenant",
            ResourceKind::Network => "::CloudNetwork",
        }
    }

    /// Security groups and networks live under the provider's network
    /// manager; everything else under the cloud manager.
    fn uses_network_namespace(&self) -> bool {
        matches!(self, ResourceKind::SecurityGroup | ResourceKind::Network)
    }

    fn display(&self) -> &'static str {
        match self {
            ResourceKind::Flavor => "Flavor",
            ResourceKind::Template => "Template",
            ResourceKind::SecurityGroup => "SecurityGroup",
            ResourceKind::KeyPair => "KeyPair",
            ResourceKind::Tenant => "Tenant",
            ResourceKind::Network => "Network",
        }
    }
}

/// A provider with its discovered type namespaces.
#[derive(Debug, Clone)]
pub struct Provider {
    name: String,
    cloud_type: String,
    network_type: String,
    policy: AmbiguityPolicy,
}

impl Provider {
    /// Discover the provider's cloud and network type namespaces by
    /// scanning the registered providers collection once.
    pub async fn discover(
        client: &RestClient,
        name: &str,
        policy: AmbiguityPolicy,
    ) -> Result<Self> {
        let registered = client.filter_collection(PROVIDERS_COLLECTION, &[]).await?;

        let mut cloud_type = String::new();
        let mut network_type = String::new();
        let needle = name.to_lowercase();

        for resource in &registered {
            let Some(type_str) = resource.str_attr("type") else {
                continue;
            };
            let lowered = type_str.to_lowercase();
            if !lowered.contains(&needle) {
                continue;
            }
            if lowered.contains("cloud") {
                cloud_type = type_str.to_string();
            } else if lowered.contains("network") {
                network_type = type_str.to_string();
            }
        }

        if cloud_type.is_empty() {
            return Err(ClientError::NotFound(format!(
                "provider {name} is not registered with the server"
            )));
        }

        Ok(Self {
            name: name.to_string(),
            cloud_type,
            network_type,
            policy,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cloud_type(&self) -> &str {
        &self.cloud_type
    }

    pub fn network_type(&self) -> &str {
        &self.network_type
    }

    /// Full type string for a resource kind within this provider.
    pub fn resource_type(&self, kind: ResourceKind) -> String {
        let namespace = if kind.uses_network_namespace() {
            &self.network_type
        } else {
            &self.cloud_type
        };
        format!("{}{}", namespace, kind.type_suffix())
    }

    /// Type string for instances and VMs within this provider.
    pub fn vm_type(&self) -> String {
        format!("{}::Vm", self.cloud_type)
    }

    /// Resolve a resource name to the identifier the server expects.
    pub async fn resolve(
        &self,
        client: &RestClient,
        kind: ResourceKind,
        name: &str,
    ) -> Result<String> {
        self.resolve_typed(client, kind, name, self.resource_type(kind))
            .await
    }

    /// Resolve a cloud network, optionally narrowed to a qualified subtype
    /// (e.g. `private` or `public` pools).
    pub async fn resolve_network(
        &self,
        client: &RestClient,
        name: &str,
        qualifier: Option<&str>,
    ) -> Result<String> {
        let type_str = match qualifier {
            Some(qualifier) => format!(
                "{}::CloudNetwork::{}",
                self.network_type,
                title_case(qualifier)
            ),
            None => self.resource_type(ResourceKind::Network),
        };
        self.resolve_typed(client, ResourceKind::Network, name, type_str)
            .await
    }

    async fn resolve_typed(
        &self,
        client: &RestClient,
        kind: ResourceKind,
        name: &str,
        type_str: String,
    ) -> Result<String> {
        let expr = FilterExpr::new(Condition::new("name", FilterOp::Eq, name))
            .and(Condition::new("type", FilterOp::Eq, type_str));

        let matches = client
            .filter_collection(kind.collection(), &expr.to_params())
            .await?;

        let resource = match matches.as_slice() {
            [] => {
                return Err(ClientError::NotFound(format!(
                    "{} {} not found for provider {}",
                    kind.display(),
                    name,
                    self.name
                )))
            }
            [_only] => &matches[0],
            _many => match self.policy {
                AmbiguityPolicy::FirstMatch => {
                    warn!(
                        kind = kind.display(),
                        name,
                        provider = self.name,
                        matches = matches.len(),
                        "multiple resources match; taking the first in server order"
                    );
                    &matches[0]
                }
                AmbiguityPolicy::Abort => {
                    return Err(ClientError::Ambiguous(format!(
                        "{} {} matched {} resources for provider {}",
                        kind.display(),
                        name,
                        matches.len(),
                        self.name
                    )))
                }
            },
        };

        self.extract_identifier(kind, name, resource)
    }

    fn extract_identifier(
        &self,
        kind: ResourceKind,
        name: &str,
        resource: &Resource,
    ) -> Result<String> {
        // Templates are addressed by guid; every other kind by id.
        let identifier = match kind {
            ResourceKind::Template => resource.guid(),
            _ => resource.id(),
        };
        identifier.ok_or_else(|| {
            ClientError::NotFound(format!(
                "{} {} for provider {} has no usable identifier",
                kind.display(),
                name,
                self.name
            ))
        })
    }

    /// Resolve a subnet id by name from a network's expanded
    /// `cloud_subnets` attribute.
    pub async fn subnet_id(
        &self,
        client: &RestClient,
        network_id: &str,
        subnet_name: &str,
    ) -> Result<String> {
        let network = client
            .fetch(
                ResourceKind::Network.collection(),
                network_id,
                &["cloud_subnets"],
            )
            .await?;

        let subnets = match network.attr("cloud_subnets") {
            Some(serde_json::Value::Array(entries)) => entries.clone(),
            Some(entry @ serde_json::Value::Object(_)) => vec![entry.clone()],
            _ => Vec::new(),
        };

        for subnet in subnets {
            if subnet.get("name").and_then(|v| v.as_str()) == Some(subnet_name) {
                if let Some(id) = subnet.get("id").and_then(crate::resource::id_string) {
                    return Ok(id);
                }
            }
        }

        Err(ClientError::NotFound(format!(
            "Subnet {subnet_name} not found on network {network_id} for provider {}",
            self.name
        )))
    }
}

fn title_case(input: &str) -> String {
    let mut chars = input.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.as_str().to_lowercase().chars()).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> Provider {
        Provider {
            name: "OpenStack".to_string(),
            cloud_type: "Cirrus::Providers::Openstack::CloudManager".to_string(),
            network_type: "Cirrus::Providers::Openstack::NetworkManager".to_string(),
            policy: AmbiguityPolicy::FirstMatch,
        }
    }

    #[test]
    fn composes_type_strings_per_namespace() {
        let provider = provider();
        assert_eq!(
            provider.resource_type(ResourceKind::Flavor),
            "Cirrus::Providers::Openstack::CloudManager::Flavor"
        );
        assert_eq!(
            provider.resource_type(ResourceKind::SecurityGroup),
            "Cirrus::Providers::Openstack::NetworkManager::SecurityGroup"
        );
        assert_eq!(
            provider.resource_type(ResourceKind::KeyPair),
            "Cirrus::Providers::Openstack::CloudManager::AuthKeyPair"
        );
    }

    #[test]
    fn network_qualifier_is_title_cased() {
        assert_eq!(title_case("private"), "Private");
        assert_eq!(title_case("PUBLIC"), "Public");
    }
}
