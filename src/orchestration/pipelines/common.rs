//! Steps shared by the composite pipelines: workspace readiness, workspace
//! sessions, repositories and object permissions.

use super::{ProvisionOutcome, ProvisioningContext};
use crate::config::ObjectPermissions;
use crate::gateways::{ResourceGateway, WorkspaceSession};
use crate::logging::log_resource_operation;
use crate::models::{
    DeleteOutcome, InfoEntry, Principal, PrincipalRef, RepoCreation, RepoInfo, ResourceKind,
    SecuredObject, WorkloadSpec, WorkspaceInfo, WorkspaceParams,
};
use crate::orchestration::upsert::UpsertResolver;
use crate::problem::{accumulate, FailedOperation, OpResult};
use crate::validation::ValidatedRequest;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Workspace state as seen by de-provisioning
#[derive(Debug, Clone, PartialEq)]
pub enum WorkspaceLookup {
    /// Nothing to clean up
    Missing,
    Ready(WorkspaceInfo),
}

/// Fail unless the workspace reached the `Succeeded` state
pub fn require_ready(workspace: &WorkspaceInfo) -> OpResult<()> {
    if workspace.provisioning_state.is_succeeded() {
        Ok(())
    } else {
        Err(FailedOperation::single(format!(
            "Workspace '{}' is in provisioning state '{}'; it must be Succeeded before it can be used",
            workspace.name, workspace.provisioning_state
        )))
    }
}

/// Return a ready workspace, creating it when workspaces are managed
#[instrument(skip(ctx))]
pub async fn ensure_workspace(ctx: &ProvisioningContext, name: &str) -> OpResult<WorkspaceInfo> {
    let settings = &ctx.config.workspace;

    let workspace = if settings.managed {
        let params = WorkspaceParams {
            sku: settings.sku.clone(),
            resource_group: settings.resource_group.clone(),
        };
        ctx.gateways
            .workspaces
            .create_if_absent(name, &settings.region, &params)
            .await?
    } else {
        ctx.gateways
            .workspaces
            .get_by_name(name)
            .await?
            .ok_or_else(|| {
                FailedOperation::single(format!(
                    "Workspace '{name}' does not exist and workspace management is disabled"
                ))
            })?
    };

    require_ready(&workspace)?;
    Ok(workspace)
}

/// Return a ready workspace that must already exist
pub async fn existing_workspace(ctx: &ProvisioningContext, name: &str) -> OpResult<WorkspaceInfo> {
    let workspace = ctx
        .gateways
        .workspaces
        .get_by_name(name)
        .await?
        .ok_or_else(|| FailedOperation::single(format!("Workspace '{name}' does not exist")))?;

    require_ready(&workspace)?;
    Ok(workspace)
}

/// Tri-state lookup for de-provisioning: missing is fine, not-ready fails
pub async fn lookup_workspace(ctx: &ProvisioningContext, name: &str) -> OpResult<WorkspaceLookup> {
    match ctx.gateways.workspaces.get_by_name(name).await? {
        None => Ok(WorkspaceLookup::Missing),
        Some(workspace) => {
            require_ready(&workspace)?;
            Ok(WorkspaceLookup::Ready(workspace))
        }
    }
}

/// Assign the configured workspace role to the owner and the developer group
pub async fn grant_workspace_access(
    ctx: &ProvisioningContext,
    workspace: &WorkspaceInfo,
    request: &ValidatedRequest,
) -> OpResult<()> {
    let role = &ctx.config.workspace.workspace_role;
    for principal in [&request.owner, &request.dev_group] {
        ctx.gateways
            .permissions
            .assign_role(&workspace.resource_id, principal, role)
            .await?;
    }
    Ok(())
}

pub async fn open_session(
    ctx: &ProvisioningContext,
    workspace: &WorkspaceInfo,
) -> OpResult<Arc<dyn WorkspaceSession>> {
    ctx.gateways.sessions.open(workspace).await
}

/// Register the repository; an existing one at the same path is reused
pub async fn ensure_repository(
    ctx: &ProvisioningContext,
    session: &dyn WorkspaceSession,
    url: &str,
    path: &str,
) -> OpResult<RepoInfo> {
    let repositories = session.repositories();
    let workspace = &session.workspace().name;

    match repositories.create(url, path, &ctx.config.git.provider).await? {
        RepoCreation::Created(repo) => {
            log_resource_operation(
                "create",
                "repository",
                &repo.path,
                Some(repo.id.as_str()),
                workspace,
                Some(url),
            );
            Ok(repo)
        }
        RepoCreation::AlreadyExists => {
            let existing = repositories.list_by_path(path).await?;
            let repo = existing.into_iter().next().ok_or_else(|| {
                FailedOperation::single(format!(
                    "Repository at '{path}' in workspace '{workspace}' was reported as existing but could not be found"
                ))
            })?;
            if repo.url != url {
                warn!(
                    path = %path,
                    existing_url = %repo.url,
                    requested_url = %url,
                    "Repository path already holds a different remote"
                );
            }
            info!(path = %path, workspace = %workspace, "Repository already registered");
            Ok(repo)
        }
    }
}

/// Delete the repositories at `path` when data removal was requested.
/// Returns whether a removal was attempted.
pub async fn remove_repository(
    session: &dyn WorkspaceSession,
    path: &str,
    remove_data: bool,
) -> OpResult<bool> {
    let workspace = &session.workspace().name;
    if !remove_data {
        info!(path = %path, workspace = %workspace, "Repository kept because removeData is false");
        return Ok(false);
    }

    let repositories = session.repositories();
    let mut results = Vec::new();
    for repo in repositories.list_by_path(path).await? {
        let result = match repositories.delete(&repo.id).await {
            Ok(DeleteOutcome::Deleted) => {
                log_resource_operation(
                    "delete",
                    "repository",
                    &repo.path,
                    Some(repo.id.as_str()),
                    workspace,
                    None,
                );
                Ok(())
            }
            Ok(DeleteOutcome::NotFound) => Ok(()),
            Err(failure) => Err(failure.with_context(&format!(
                "Failed to delete repository '{}' in workspace '{workspace}'",
                repo.path
            ))),
        };
        results.push(result);
    }

    accumulate(results)?;
    Ok(true)
}

/// Resolve a principal in the workspace identity backend; unknown is a failure
pub async fn resolve_principal(
    session: &dyn WorkspaceSession,
    principal: &PrincipalRef,
) -> OpResult<Principal> {
    session
        .identity()
        .resolve(principal)
        .await?
        .ok_or_else(|| {
            FailedOperation::single(format!(
                "Principal '{}' was not found in workspace '{}'",
                principal.external_id(),
                session.workspace().name
            ))
        })
}

/// Give the owner and the developer group their configured level on `object`
pub async fn assign_object_permissions(
    session: &dyn WorkspaceSession,
    object: &SecuredObject,
    request: &ValidatedRequest,
    levels: &ObjectPermissions,
) -> OpResult<()> {
    let identity = session.identity();
    for (principal, level) in [
        (&request.owner, levels.owner),
        (&request.dev_group, levels.developers),
    ] {
        let resolved = resolve_principal(session, principal).await?;
        identity.assign_permission(object, &resolved, level).await?;
    }
    Ok(())
}

pub fn workspace_link(workspace: &WorkspaceInfo) -> InfoEntry {
    let url = workspace.url();
    InfoEntry::link("Workspace URL", url.clone(), url)
}

/// Everything a workload needs before its main object can be upserted
pub struct WorkloadTarget {
    pub workspace: WorkspaceInfo,
    pub session: Arc<dyn WorkspaceSession>,
    pub repository: RepoInfo,
}

/// workspace → workspace access → session → repository
pub async fn prepare_workload(
    ctx: &ProvisioningContext,
    request: &ValidatedRequest,
    spec: &(dyn WorkloadSpec + Sync),
) -> OpResult<WorkloadTarget> {
    let workspace = ensure_workspace(ctx, spec.workspace()).await?;
    grant_workspace_access(ctx, &workspace, request).await?;
    let session = open_session(ctx, &workspace).await?;
    let repository =
        ensure_repository(ctx, session.as_ref(), spec.repo_url(), spec.repo_path()).await?;

    Ok(WorkloadTarget {
        workspace,
        session,
        repository,
    })
}

/// Shared de-provisioning chain of workloads: skip when the workspace is
/// gone, otherwise remove every object named `name` then, with `removeData`,
/// the repository
pub async fn unprovision_workload<D, F>(
    ctx: &ProvisioningContext,
    request: &ValidatedRequest,
    spec: &(dyn WorkloadSpec + Sync),
    kind: ResourceKind,
    name: &str,
    select: F,
) -> OpResult<ProvisionOutcome>
where
    D: Send + Sync + 'static,
    F: FnOnce(&dyn WorkspaceSession) -> Arc<dyn ResourceGateway<D>> + Send,
{
    let workspace = match lookup_workspace(ctx, spec.workspace()).await? {
        WorkspaceLookup::Missing => {
            warn!(workspace = %spec.workspace(), kind = %kind, name = %name, "Workspace not found, nothing to unprovision");
            return Ok(ProvisionOutcome::message_only(format!(
                "Unprovision skipped: workspace '{}' does not exist, so {kind} '{name}' is already gone",
                spec.workspace()
            )));
        }
        WorkspaceLookup::Ready(workspace) => workspace,
    };

    let session = open_session(ctx, &workspace).await?;
    let gateway = select(session.as_ref());
    let scope = format!("workspace '{}'", workspace.name);
    let removed = UpsertResolver::new(gateway.as_ref(), kind, &scope)
        .remove_all(name)
        .await?;
    let repository_removed =
        remove_repository(session.as_ref(), spec.repo_path(), request.remove_data).await?;

    let repository_note = if repository_removed {
        format!("repository '{}' removed", spec.repo_path())
    } else {
        format!("repository '{}' kept", spec.repo_path())
    };
    Ok(ProvisionOutcome::message_only(format!(
        "Unprovisioned {kind} '{name}' from workspace '{}' ({removed} removed, {repository_note})",
        workspace.name
    )))
}
