//! Wire-level requests and the descriptor they carry.

use serde::{Deserialize, Serialize};

/// Which descriptor shape the caller sent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DescriptorKind {
    DataproductDescriptor,
    ComponentDescriptor,
    DataproductDescriptorWithResults,
}

/// Provisioning or de-provisioning request as received from the transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisioningRequest {
    pub descriptor_kind: DescriptorKind,
    /// Component descriptor, YAML encoded
    pub descriptor: String,
    /// Delete underlying data on de-provisioning
    #[serde(default)]
    pub remove_data: bool,
}

impl ProvisioningRequest {
    pub fn component(descriptor: impl Into<String>) -> Self {
        Self {
            descriptor_kind: DescriptorKind::ComponentDescriptor,
            descriptor: descriptor.into(),
            remove_data: false,
        }
    }

    pub fn with_remove_data(mut self, remove_data: bool) -> Self {
        self.remove_data = remove_data;
        self
    }
}

/// Access-control update for an already provisioned output port
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAclRequest {
    /// Principal references (`user:...`, `group:...`) that must hold access
    pub refs: Vec<String>,
    /// Component descriptor of the output port, YAML encoded
    pub descriptor: String,
}

/// Read-back request for a live workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReverseProvisioningRequest {
    pub use_case_template_id: String,
    pub environment: String,
    pub params: ReverseProvisioningParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReverseProvisioningParams {
    pub workspace: String,
    pub workflow_name: String,
}

/// Descriptor of a data product with the id of the component to act on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDescriptor {
    pub data_product: DataProduct,
    pub component_id_to_provision: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataProduct {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub domain: String,
    pub environment: String,
    #[serde(default)]
    pub version: String,
    pub data_product_owner: String,
    pub dev_group: String,
    #[serde(default)]
    pub components: Vec<Component>,
}

/// A component as declared in the descriptor; `specific` is decoded later
/// according to the component type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub kind: String,
    #[serde(default)]
    pub use_case_template_id: Option<String>,
    #[serde(default)]
    pub infrastructure_template_id: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub specific: serde_json::Value,
}

impl ComponentDescriptor {
    pub fn component_to_provision(&self) -> Option<&Component> {
        self.data_product
            .components
            .iter()
            .find(|c| c.id == self.component_id_to_provision)
    }
}
