//! Output port pipeline: a catalog view over a source table.
//!
//! Output ports never create workspaces. Provision: workspace (must exist and
//! be ready) → session → catalog and schema → source table check → upsert
//! view → owner and developer grants.

use super::common::{existing_workspace, lookup_workspace, open_session, resolve_principal, WorkspaceLookup};
use super::{ProvisionOutcome, ProvisioningContext};
use crate::gateways::WorkspaceSession;
use crate::models::{
    CatalogPrivilege, InfoEntry, OutputPortSpecific, PrincipalRef, ProvisioningInfo, ResourceKind,
    ViewDefinition,
};
use crate::orchestration::upsert::UpsertResolver;
use crate::problem::{accumulate, FailedOperation, OpResult};
use crate::validation::ValidatedRequest;
use std::collections::HashSet;
use tracing::{info, instrument, warn};

#[instrument(skip_all, fields(component_id = %request.component.id, view = %spec.view_name))]
pub async fn provision(
    ctx: &ProvisioningContext,
    request: &ValidatedRequest,
    spec: &OutputPortSpecific,
) -> OpResult<ProvisionOutcome> {
    let workspace = existing_workspace(ctx, &spec.workspace).await?;
    let session = open_session(ctx, &workspace).await?;
    let catalog = session.catalog();

    catalog.ensure_catalog(&spec.catalog_name).await?;
    catalog
        .ensure_schema(&spec.catalog_name, &spec.schema_name)
        .await?;

    let source_table = spec.source_table.full_name();
    if !catalog.table_exists(&source_table).await? {
        return Err(FailedOperation::single(format!(
            "Source table '{source_table}' of output port '{}' does not exist in workspace '{}'",
            request.component.id, workspace.name
        )));
    }

    let definition = view_definition(spec, request.component.description.clone());
    let full_name = definition.full_name();
    let scope = format!("workspace '{}'", workspace.name);
    let views = session.views();
    let outcome = UpsertResolver::new(views.as_ref(), ResourceKind::View, &scope)
        .upsert(&full_name, &definition)
        .await?;

    let privileges = &ctx.config.permissions.output_port;
    for (principal, granted) in [
        (&request.owner, &privileges.owner),
        (&request.dev_group, &privileges.developers),
    ] {
        let resolved = resolve_principal(session.as_ref(), principal).await?;
        for privilege in granted {
            catalog.grant(&full_name, &resolved, *privilege).await?;
        }
    }

    let view_url = format!(
        "{}/explore/data/{}/{}/{}",
        workspace.url(),
        spec.catalog_name,
        spec.schema_name,
        spec.view_name
    );
    let mut info = ProvisioningInfo::new();
    info.insert(
        "viewFullName".to_string(),
        InfoEntry::text("View", full_name.clone()),
    );
    info.insert(
        "viewURL".to_string(),
        InfoEntry::link("View URL", full_name.clone(), view_url),
    );

    Ok(ProvisionOutcome::provisioned(
        outcome.reference.id,
        format!("View '{full_name}' provisioned in workspace '{}'", workspace.name),
        info,
    ))
}

#[instrument(skip_all, fields(component_id = %request.component.id, view = %spec.view_name))]
pub async fn unprovision(
    ctx: &ProvisioningContext,
    request: &ValidatedRequest,
    spec: &OutputPortSpecific,
) -> OpResult<ProvisionOutcome> {
    let full_name = view_full_name(spec);

    let workspace = match lookup_workspace(ctx, &spec.workspace).await? {
        WorkspaceLookup::Missing => {
            warn!(workspace = %spec.workspace, view = %full_name, "Workspace not found, nothing to unprovision");
            return Ok(ProvisionOutcome::message_only(format!(
                "Unprovision skipped: workspace '{}' does not exist, so view '{full_name}' is already gone",
                spec.workspace
            )));
        }
        WorkspaceLookup::Ready(workspace) => workspace,
    };

    let session = open_session(ctx, &workspace).await?;
    let views = session.views();
    let scope = format!("workspace '{}'", workspace.name);
    let removed = UpsertResolver::new(views.as_ref(), ResourceKind::View, &scope)
        .remove_all(&full_name)
        .await?;

    if request.remove_data {
        info!(view = %full_name, "Source table is left untouched; output ports only own their view");
    }

    Ok(ProvisionOutcome::message_only(format!(
        "Unprovisioned view '{full_name}' from workspace '{}' ({removed} removed)",
        workspace.name
    )))
}

/// Grant the consumer privilege to every listed principal and revoke it from
/// every other grantee, except the owner and the developer group.
///
/// Every principal is processed; problems are accumulated.
#[instrument(skip_all, fields(component_id = %request.component.id, view = %spec.view_name))]
pub async fn update_acl(
    ctx: &ProvisioningContext,
    request: &ValidatedRequest,
    spec: &OutputPortSpecific,
    refs: &[String],
) -> OpResult<ProvisionOutcome> {
    let (principals, invalid): (Vec<_>, Vec<_>) = refs
        .iter()
        .map(|r| {
            r.parse::<PrincipalRef>()
                .map_err(|e| FailedOperation::single(format!("Invalid principal reference: {e}")))
        })
        .partition(Result::is_ok);
    let principals: Vec<PrincipalRef> = principals.into_iter().flatten().collect();

    let workspace = existing_workspace(ctx, &spec.workspace).await?;
    let session = open_session(ctx, &workspace).await?;
    let full_name = view_full_name(spec);
    let privilege = ctx.config.permissions.output_port.consumers;

    let mut results: Vec<OpResult<()>> = invalid
        .into_iter()
        .map(|r| r.map(|_| ()))
        .collect();

    let current = session.catalog().list_grants(&full_name).await?;

    let mut keep: HashSet<String> = [request.owner.external_id(), request.dev_group.external_id()]
        .into_iter()
        .map(str::to_string)
        .collect();

    for principal in &principals {
        let result = grant_consumer(session.as_ref(), &full_name, principal, privilege).await;
        match result {
            Ok(name) => {
                keep.insert(name);
                results.push(Ok(()));
            }
            Err(failure) => {
                // An unresolvable principal keeps any grant it already holds
                keep.insert(principal.external_id().to_string());
                results.push(Err(failure));
            }
        }
    }

    let catalog = session.catalog();
    let mut revoked = 0usize;
    for grant in current
        .iter()
        .filter(|g| g.privilege == privilege && !keep.contains(&g.principal))
    {
        let result = catalog
            .revoke(&full_name, &grant.principal, privilege)
            .await
            .map_err(|failure| {
                failure.with_context(&format!(
                    "Failed to revoke {privilege} on '{full_name}' from '{}'",
                    grant.principal
                ))
            });
        if result.is_ok() {
            revoked += 1;
        }
        results.push(result);
    }

    accumulate(results)?;

    Ok(ProvisionOutcome::message_only(format!(
        "Access to '{full_name}' updated: {} principal(s) granted {privilege}, {revoked} revoked",
        principals.len()
    )))
}

async fn grant_consumer(
    session: &dyn WorkspaceSession,
    full_name: &str,
    principal: &PrincipalRef,
    privilege: CatalogPrivilege,
) -> OpResult<String> {
    let resolved = resolve_principal(session, principal).await?;
    session
        .catalog()
        .grant(full_name, &resolved, privilege)
        .await?;
    Ok(resolved.name)
}

pub fn view_full_name(spec: &OutputPortSpecific) -> String {
    format!("{}.{}.{}", spec.catalog_name, spec.schema_name, spec.view_name)
}

pub fn view_definition(spec: &OutputPortSpecific, comment: Option<String>) -> ViewDefinition {
    ViewDefinition {
        catalog: spec.catalog_name.clone(),
        schema: spec.schema_name.clone(),
        name: spec.view_name.clone(),
        source_table: spec.source_table.full_name(),
        comment,
    }
}
