//! # Resource Gateways
//!
//! Capability contracts over the remote platform, one per managed resource
//! kind. Concrete vendor bindings live outside this crate; they translate
//! every vendor exception into an [`OpResult`] at the boundary, so the engine
//! never interprets raw errors.
//!
//! Cloud-level gateways ([`WorkspaceGateway`], [`PermissionGateway`]) are
//! shared. Everything that lives inside a workspace is reached through a
//! [`WorkspaceSession`] opened by a [`WorkspaceSessionFactory`].
//!
//! [`memory`] provides an in-memory platform implementing every contract,
//! used by the test suite and for local dry runs.

pub mod memory;

use crate::models::{
    CatalogPrivilege, DeleteOutcome, Grant, JobDefinition, PermissionLevel, PipelineDefinition,
    Principal, PrincipalRef, RemoteResource, RepoCreation, RepoInfo, ResourceRef, SecuredObject,
    ViewDefinition, WorkspaceInfo, WorkspaceParams,
};
use crate::problem::OpResult;
use async_trait::async_trait;
use std::sync::Arc;

/// Name-addressable remote objects, in the shape the upsert resolver expects.
///
/// `list_by_name` matches names exactly, with whatever case sensitivity the
/// platform's own filter has.
#[async_trait]
pub trait ResourceGateway<D>: Send + Sync
where
    D: Send + Sync,
{
    async fn list_by_name(&self, name: &str) -> OpResult<Vec<ResourceRef>>;

    async fn get(&self, id: &str) -> OpResult<Option<RemoteResource<D>>>;

    async fn create(&self, definition: &D) -> OpResult<ResourceRef>;

    async fn update(&self, id: &str, definition: &D) -> OpResult<ResourceRef>;

    async fn delete(&self, id: &str) -> OpResult<DeleteOutcome>;
}

/// Compute jobs and workflows
pub type JobGateway = dyn ResourceGateway<JobDefinition>;

/// Declarative data pipelines
pub type PipelineGateway = dyn ResourceGateway<PipelineDefinition>;

/// Catalog views, addressed by full name `catalog.schema.view`
pub type ViewGateway = dyn ResourceGateway<ViewDefinition>;

/// Workspaces on the cloud control plane
#[async_trait]
pub trait WorkspaceGateway: Send + Sync {
    /// Return the workspace named `name`, creating it when absent. The
    /// returned state may still be transitional.
    async fn create_if_absent(
        &self,
        name: &str,
        region: &str,
        params: &WorkspaceParams,
    ) -> OpResult<WorkspaceInfo>;

    async fn get_by_name(&self, name: &str) -> OpResult<Option<WorkspaceInfo>>;
}

/// Role bindings on cloud resources. Unknown principals are a failure.
#[async_trait]
pub trait PermissionGateway: Send + Sync {
    async fn assign_role(
        &self,
        scope_resource_id: &str,
        principal: &PrincipalRef,
        role: &str,
    ) -> OpResult<()>;
}

/// Source-control repositories registered in a workspace
#[async_trait]
pub trait RepositoryGateway: Send + Sync {
    async fn create(&self, url: &str, path: &str, provider: &str) -> OpResult<RepoCreation>;

    async fn list_by_path(&self, path: &str) -> OpResult<Vec<RepoInfo>>;

    async fn delete(&self, id: &str) -> OpResult<DeleteOutcome>;
}

/// Principals and workspace-object access control
#[async_trait]
pub trait IdentityGateway: Send + Sync {
    /// `Ok(None)` when the principal does not exist
    async fn resolve(&self, principal: &PrincipalRef) -> OpResult<Option<Principal>>;

    async fn assign_permission(
        &self,
        object: &SecuredObject,
        principal: &Principal,
        level: PermissionLevel,
    ) -> OpResult<()>;
}

/// Catalog structure and grants around views
#[async_trait]
pub trait CatalogGateway: Send + Sync {
    async fn ensure_catalog(&self, catalog: &str) -> OpResult<()>;

    async fn ensure_schema(&self, catalog: &str, schema: &str) -> OpResult<()>;

    async fn table_exists(&self, full_name: &str) -> OpResult<bool>;

    async fn list_grants(&self, full_name: &str) -> OpResult<Vec<Grant>>;

    async fn grant(
        &self,
        full_name: &str,
        principal: &Principal,
        privilege: CatalogPrivilege,
    ) -> OpResult<()>;

    async fn revoke(
        &self,
        full_name: &str,
        principal_name: &str,
        privilege: CatalogPrivilege,
    ) -> OpResult<()>;
}

/// Gateways bound to one workspace
pub trait WorkspaceSession: Send + Sync {
    fn workspace(&self) -> &WorkspaceInfo;
    fn jobs(&self) -> Arc<JobGateway>;
    fn pipelines(&self) -> Arc<PipelineGateway>;
    fn views(&self) -> Arc<ViewGateway>;
    fn catalog(&self) -> Arc<dyn CatalogGateway>;
    fn repositories(&self) -> Arc<dyn RepositoryGateway>;
    fn identity(&self) -> Arc<dyn IdentityGateway>;
}

#[async_trait]
pub trait WorkspaceSessionFactory: Send + Sync {
    async fn open(&self, workspace: &WorkspaceInfo) -> OpResult<Arc<dyn WorkspaceSession>>;
}

/// Every collaborator the engine needs, bundled for injection
#[derive(Clone)]
pub struct Gateways {
    pub workspaces: Arc<dyn WorkspaceGateway>,
    pub sessions: Arc<dyn WorkspaceSessionFactory>,
    pub permissions: Arc<dyn PermissionGateway>,
}

impl Gateways {
    /// All three contracts served by the same in-memory platform
    pub fn in_memory(platform: &memory::InMemoryPlatform) -> Self {
        Self {
            workspaces: Arc::new(platform.clone()),
            sessions: Arc::new(platform.clone()),
            permissions: Arc::new(platform.clone()),
        }
    }
}
