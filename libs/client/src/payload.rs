//! Provision and automation payload builders per cloud provider.
//!
//! Payloads are nested structures with placeholder slots that must all be
//! populated before submission. Required keys are checked up front so a
//! half-filled payload never reaches the network; name → id lookups go
//! through the [`resolver`](crate::resolver).

use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{ClientError, Result};
use crate::resolver::{AmbiguityPolicy, Provider, ResourceKind};
use crate::rest::RestClient;

/// Cloud providers with a payload template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloudProvider {
    OpenStack,
    Amazon,
}

impl CloudProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloudProvider::OpenStack => "OpenStack",
            CloudProvider::Amazon => "Amazon",
        }
    }
}

impl std::str::FromStr for CloudProvider {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "openstack" => Ok(CloudProvider::OpenStack),
            "amazon" => Ok(CloudProvider::Amazon),
            other => Err(ClientError::Config(format!(
                "unsupported provider: {other}"
            ))),
        }
    }
}

/// User-supplied provisioning input, before any id lookup.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProvisionInput {
    pub email: Option<String>,
    pub vm_name: Option<String>,
    pub flavor: Option<String>,
    pub image: Option<String>,
    pub network: Option<String>,
    pub tenant: Option<String>,
    pub security_group: Option<String>,
    pub key_pair: Option<String>,
    pub floating_ip_id: Option<String>,
    pub subnet: Option<String>,
    pub fip_pool: Option<String>,
    #[serde(default)]
    pub auto_placement: bool,
}

impl ProvisionInput {
    fn slot(&self, key: &str) -> Option<&String> {
        match key {
            "email" => self.email.as_ref(),
            "vm_name" => self.vm_name.as_ref(),
            "flavor" => self.flavor.as_ref(),
            "image" => self.image.as_ref(),
            "network" => self.network.as_ref(),
            "tenant" => self.tenant.as_ref(),
            "security_group" => self.security_group.as_ref(),
            "key_pair" => self.key_pair.as_ref(),
            "subnet" => self.subnet.as_ref(),
            "fip_pool" => self.fip_pool.as_ref(),
            _ => None,
        }
    }
}

const REQUIRED_OPENSTACK_KEYS: &[&str] = &["email", "vm_name", "flavor", "image", "network", "tenant"];
const REQUIRED_AMAZON_KEYS: &[&str] = &["email", "vm_name", "flavor", "image", "key_pair"];
const REQUIRED_AMAZON_PLACEMENT_KEYS: &[&str] = &["network", "subnet"];
const REQUIRED_FLOATING_IP_KEYS: &[&str] = &["fip_pool", "tenant"];

/// Verify every required slot for the selected provider is populated.
///
/// Missing slots abort before any network call, naming all of them at once.
pub fn validate_required(provider: CloudProvider, input: &ProvisionInput) -> Result<()> {
    let mut required: Vec<&str> = match provider {
        CloudProvider::OpenStack => REQUIRED_OPENSTACK_KEYS.to_vec(),
        CloudProvider::Amazon => {
            let mut keys = REQUIRED_AMAZON_KEYS.to_vec();
            if !input.auto_placement {
                keys.extend_from_slice(REQUIRED_AMAZON_PLACEMENT_KEYS);
            }
            keys
        }
    };
    required.retain(|key| input.slot(key).map(|v| v.is_empty()).unwrap_or(true));

    if required.is_empty() {
        Ok(())
    } else {
        Err(ClientError::Config(format!(
            "required key(s) missing from payload: {}",
            required.join(", ")
        )))
    }
}

/// Build the full provision request payload for the selected provider,
/// resolving every resource name to its server identifier.
pub async fn build_provision_payload(
    client: &RestClient,
    provider: CloudProvider,
    input: &ProvisionInput,
    policy: AmbiguityPolicy,
) -> Result<Value> {
    validate_required(provider, input)?;
    let resolver = Provider::discover(client, provider.as_str(), policy).await?;

    match provider {
        CloudProvider::OpenStack => build_openstack(client, &resolver, input).await,
        CloudProvider::Amazon => build_amazon(client, &resolver, input).await,
    }
}

async fn build_openstack(
    client: &RestClient,
    resolver: &Provider,
    input: &ProvisionInput,
) -> Result<Value> {
    let flavor_id = resolver
        .resolve(client, ResourceKind::Flavor, required(&input.flavor))
        .await?;
    let image_guid = resolver
        .resolve(client, ResourceKind::Template, required(&input.image))
        .await?;
    let network_id = resolver
        .resolve_network(client, required(&input.network), Some("private"))
        .await?;
    let tenant_id = resolver
        .resolve(client, ResourceKind::Tenant, required(&input.tenant))
        .await?;

    let mut vm_fields = json!({
        "vm_name": input.vm_name,
        "instance_type": flavor_id,
        "cloud_network": network_id,
        "cloud_tenant": tenant_id,
    });

    if let Some(security_group) = non_empty(&input.security_group) {
        let id = resolver
            .resolve(client, ResourceKind::SecurityGroup, security_group)
            .await?;
        vm_fields["security_groups"] = Value::String(id);
    }
    if let Some(key_pair) = non_empty(&input.key_pair) {
        let id = resolver
            .resolve(client, ResourceKind::KeyPair, key_pair)
            .await?;
        vm_fields["guest_access_key_pair"] = Value::String(id);
    }
    if let Some(floating_ip) = non_empty(&input.floating_ip_id) {
        vm_fields["floating_ip_address"] = Value::String(floating_ip.clone());
    }

    Ok(json!({
        "version": "1.1",
        "template_fields": { "guid": image_guid },
        "vm_fields": vm_fields,
        "requester": { "owner_email": input.email },
    }))
}

async fn build_amazon(
    client: &RestClient,
    resolver: &Provider,
    input: &ProvisionInput,
) -> Result<Value> {
    let flavor_id = resolver
        .resolve(client, ResourceKind::Flavor, required(&input.flavor))
        .await?;
    let image_guid = resolver
        .resolve(client, ResourceKind::Template, required(&input.image))
        .await?;
    let key_pair_id = resolver
        .resolve(client, ResourceKind::KeyPair, required(&input.key_pair))
        .await?;

    let mut vm_fields = json!({
        "vm_name": input.vm_name,
        "instance_type": flavor_id,
        "guest_access_key_pair": key_pair_id,
    });

    if let Some(security_group) = non_empty(&input.security_group) {
        let id = resolver
            .resolve(client, ResourceKind::SecurityGroup, security_group)
            .await?;
        vm_fields["security_groups"] = Value::String(id);
    }
    if let Some(network) = non_empty(&input.network) {
        let network_id = resolver.resolve_network(client, network, None).await?;
        vm_fields["cloud_network"] = Value::String(network_id.clone());

        if let Some(subnet) = non_empty(&input.subnet) {
            let subnet_id = resolver.subnet_id(client, &network_id, subnet).await?;
            vm_fields["cloud_subnet"] = Value::String(subnet_id);
        }
    }

    Ok(json!({
        "version": "1.1",
        "template_fields": { "guid": image_guid },
        "vm_fields": vm_fields,
        "requester": { "owner_email": input.email },
    }))
}

/// Build the automation payload that allocates a floating ip from a public
/// pool. Resolves the pool's public cloud network and the owning tenant.
pub async fn build_floating_ip_payload(
    client: &RestClient,
    input: &ProvisionInput,
    policy: AmbiguityPolicy,
) -> Result<Value> {
    let mut missing: Vec<&str> = REQUIRED_FLOATING_IP_KEYS.to_vec();
    missing.retain(|key| input.slot(key).map(|v| v.is_empty()).unwrap_or(true));
    if !missing.is_empty() {
        return Err(ClientError::Config(format!(
            "required key(s) missing from payload: {}",
            missing.join(", ")
        )));
    }

    let resolver = Provider::discover(client, CloudProvider::OpenStack.as_str(), policy).await?;
    let network_id = resolver
        .resolve_network(client, required(&input.fip_pool), Some("public"))
        .await?;
    let tenant_id = resolver
        .resolve(client, ResourceKind::Tenant, required(&input.tenant))
        .await?;

    Ok(json!({
        "uri_parts": {
            "namespace": "Automation/General",
            "class": "Methods",
            "instance": "get_floating_ip",
        },
        "parameters": {
            "cloud_network_id": network_id,
            "cloud_tenant_id": tenant_id,
        },
        "requester": { "auto_approve": true },
    }))
}

fn required(slot: &Option<String>) -> &str {
    // Callers run validate_required first; an empty slot here is a bug.
    slot.as_deref().unwrap_or_default()
}

fn non_empty(slot: &Option<String>) -> Option<&String> {
    slot.as_ref().filter(|v| !v.is_empty())
}
