//! Remote resource model shared by the gateways and the pipelines.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kinds of remote objects the engine manages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Workspace,
    Job,
    Workflow,
    Pipeline,
    View,
    Repository,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Workspace => write!(f, "workspace"),
            Self::Job => write!(f, "job"),
            Self::Workflow => write!(f, "workflow"),
            Self::Pipeline => write!(f, "pipeline"),
            Self::View => write!(f, "view"),
            Self::Repository => write!(f, "repository"),
        }
    }
}

/// A live remote object, identified by the id the platform assigned to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    pub id: String,
    pub name: String,
}

impl ResourceRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A remote object read back together with its current definition.
///
/// `server_fields` holds attributes the platform assigns on its own
/// (creation time, creator, run-as identity, object id).
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteResource<D> {
    pub reference: ResourceRef,
    pub definition: D,
    pub server_fields: serde_json::Map<String, serde_json::Value>,
}

/// Outcome of a delete call; a missing object is not an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

/// Azure-style provisioning state of a workspace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProvisioningState {
    Succeeded,
    Accepted,
    Creating,
    Updating,
    Deleting,
    Failed,
    Other(String),
}

impl ProvisioningState {
    pub fn is_succeeded(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

impl fmt::Display for ProvisioningState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => write!(f, "Succeeded"),
            Self::Accepted => write!(f, "Accepted"),
            Self::Creating => write!(f, "Creating"),
            Self::Updating => write!(f, "Updating"),
            Self::Deleting => write!(f, "Deleting"),
            Self::Failed => write!(f, "Failed"),
            Self::Other(state) => write!(f, "{state}"),
        }
    }
}

/// Backing workspace as reported by the cloud control plane
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceInfo {
    pub id: String,
    pub name: String,
    /// Cloud resource id, used as scope for role assignments
    pub resource_id: String,
    /// Workspace host, without scheme
    pub host: String,
    pub region: String,
    pub provisioning_state: ProvisioningState,
}

impl WorkspaceInfo {
    pub fn url(&self) -> String {
        format!("https://{}", self.host)
    }
}

/// Parameters used when a workspace has to be created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceParams {
    pub sku: String,
    pub resource_group: Option<String>,
}

/// Job (or workflow) definition in the platform's Jobs API shape.
/// `settings` is the `settings` object of a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDefinition {
    pub name: String,
    pub settings: serde_json::Value,
}

/// Declarative data pipeline definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineDefinition {
    pub name: String,
    pub edition: String,
    pub channel: String,
    pub continuous: bool,
    pub photon: bool,
    pub catalog: Option<String>,
    pub target: Option<String>,
    pub notebooks: Vec<String>,
    pub files: Vec<String>,
    pub notifications: Vec<PipelineNotification>,
    pub cluster: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineNotification {
    pub email: String,
    pub alerts: Vec<String>,
}

/// Catalog view over a source table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewDefinition {
    pub catalog: String,
    pub schema: String,
    pub name: String,
    pub source_table: String,
    pub comment: Option<String>,
}

impl ViewDefinition {
    pub fn full_name(&self) -> String {
        format!("{}.{}.{}", self.catalog, self.schema, self.name)
    }
}

/// Source-control repository registered inside a workspace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoInfo {
    pub id: String,
    pub url: String,
    pub path: String,
    pub provider: String,
}

/// Outcome of registering a repository; an existing one is not an error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoCreation {
    Created(RepoInfo),
    AlreadyExists,
}

/// Workspace-object permission levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PermissionLevel {
    CanView,
    CanRun,
    CanEdit,
    CanManageRun,
    CanManage,
    IsOwner,
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CanView => write!(f, "CAN_VIEW"),
            Self::CanRun => write!(f, "CAN_RUN"),
            Self::CanEdit => write!(f, "CAN_EDIT"),
            Self::CanManageRun => write!(f, "CAN_MANAGE_RUN"),
            Self::CanManage => write!(f, "CAN_MANAGE"),
            Self::IsOwner => write!(f, "IS_OWNER"),
        }
    }
}

/// Catalog privileges granted on views
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CatalogPrivilege {
    Select,
    Modify,
    AllPrivileges,
}

impl fmt::Display for CatalogPrivilege {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Select => write!(f, "SELECT"),
            Self::Modify => write!(f, "MODIFY"),
            Self::AllPrivileges => write!(f, "ALL_PRIVILEGES"),
        }
    }
}

/// Workspace object that carries an access-control list
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SecuredObject {
    Job(String),
    Pipeline(String),
    Repository(String),
}

impl fmt::Display for SecuredObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Job(id) => write!(f, "job {id}"),
            Self::Pipeline(id) => write!(f, "pipeline {id}"),
            Self::Repository(id) => write!(f, "repository {id}"),
        }
    }
}

/// A principal resolved in the identity backend
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    /// Name as known by the platform (user e-mail or group display name)
    pub name: String,
    pub is_group: bool,
}

/// A privilege held by a principal on a catalog object
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Grant {
    pub principal: String,
    pub privilege: CatalogPrivilege,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_succeeded_is_ready() {
        assert!(ProvisioningState::Succeeded.is_succeeded());
        assert!(!ProvisioningState::Updating.is_succeeded());
        assert!(!ProvisioningState::Other("Migrating".to_string()).is_succeeded());
    }

    #[test]
    fn test_permission_level_wire_format() {
        let level: PermissionLevel = serde_json::from_str("\"CAN_MANAGE_RUN\"").unwrap();
        assert_eq!(level, PermissionLevel::CanManageRun);
        assert_eq!(level.to_string(), "CAN_MANAGE_RUN");
    }

    #[test]
    fn test_view_full_name() {
        let view = ViewDefinition {
            catalog: "sales".to_string(),
            schema: "gold".to_string(),
            name: "orders_v".to_string(),
            source_table: "sales.silver.orders".to_string(),
            comment: None,
        };
        assert_eq!(view.full_name(), "sales.gold.orders_v");
    }
}
