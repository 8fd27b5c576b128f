//! # Data Model
//!
//! - [`request`] - wire requests and the component descriptor they carry
//! - [`component`] - typed `specific` payloads per component type
//! - [`principal`] - `user:`/`group:` principal references
//! - [`job`] - provisioning job status records
//! - [`resource`] - remote resources handled by the gateways

pub mod component;
pub mod job;
pub mod principal;
pub mod request;
pub mod resource;

pub use component::{
    ClusterSpec, GitReferenceType, GitSpec, JobGitSpec, JobSpecific, NotificationSpec,
    OutputPortSpecific, PipelineClusterSpec, PipelineSpecific, SchedulingSpec, SourceTableSpec,
    WorkflowSpecific, WorkloadSpec,
};
pub use job::{
    InfoEntry, InfoEntryType, JobStatus, JobToken, ProvisioningInfo, ProvisioningJob,
};
pub use principal::PrincipalRef;
pub use request::{
    Component, ComponentDescriptor, DataProduct, DescriptorKind, ProvisioningRequest,
    ReverseProvisioningParams, ReverseProvisioningRequest, UpdateAclRequest,
};
pub use resource::{
    CatalogPrivilege, DeleteOutcome, Grant, JobDefinition, PermissionLevel, PipelineDefinition,
    PipelineNotification, Principal, ProvisioningState, RemoteResource, RepoCreation, RepoInfo,
    ResourceKind, ResourceRef, SecuredObject, ViewDefinition, WorkspaceInfo, WorkspaceParams,
};
