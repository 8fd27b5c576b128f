//! # Workflow Pipeline
//!
//! Multi-task workflows are jobs whose full definition travels in the
//! descriptor. Before an existing workflow is replaced, the live definition
//! is compared with the requested one after dropping server-assigned fields.
//! When they differ and the request does not set `override`:
//!
//! - in the development environment the request fails; the caller must
//!   import the live definition through reverse provisioning first
//! - elsewhere the update proceeds, unless it would replace a workflow that
//!   has tasks with one that has none
//!
//! Reverse provisioning reads a live workflow back and proposes it as a
//! descriptor update.

use super::common::{
    assign_object_permissions, existing_workspace, open_session, prepare_workload,
    unprovision_workload, workspace_link,
};
use super::{ProvisionOutcome, ProvisioningContext};
use crate::models::{
    InfoEntry, JobDefinition, ProvisioningInfo, RemoteResource, ResourceKind,
    ReverseProvisioningRequest, SecuredObject, WorkflowSpecific,
};
use crate::orchestration::upsert::{UpsertPlan, UpsertResolver};
use crate::problem::{FailedOperation, OpResult};
use crate::validation::ValidatedRequest;
use serde_json::{json, Map, Value};
use tracing::{info, instrument, warn};

/// Server-assigned top-level fields ignored when comparing definitions
pub const VOLATILE_FIELDS: [&str; 4] = [
    "job_id",
    "created_time",
    "creator_user_name",
    "run_as_user_name",
];

/// Descriptor path updated by reverse provisioning
pub const WORKFLOW_UPDATE_PATH: &str = "spec.mesh.specific.workflow";

#[instrument(skip_all, fields(component_id = %request.component.id))]
pub async fn provision(
    ctx: &ProvisioningContext,
    request: &ValidatedRequest,
    spec: &WorkflowSpecific,
) -> OpResult<ProvisionOutcome> {
    let name = workflow_name(spec)?;
    let definition = JobDefinition {
        name: name.to_string(),
        settings: spec.settings().cloned().unwrap_or_else(|| json!({})),
    };

    let target = prepare_workload(ctx, request, spec).await?;
    let session = target.session.as_ref();
    let scope = format!("workspace '{}'", target.workspace.name);
    let jobs = session.jobs();
    let resolver = UpsertResolver::new(jobs.as_ref(), ResourceKind::Workflow, &scope);

    let plan = resolver.plan(name).await?;
    if let UpsertPlan::Update(existing) = &plan {
        if let Some(live) = jobs.get(&existing.id).await? {
            let in_development = ctx.config.environments.is_development(request.environment());
            check_override(spec, &live, in_development, &target.workspace.name)?;
        }
    }
    let outcome = resolver.apply(plan, &definition).await?;

    let permissions = &ctx.config.permissions;
    assign_object_permissions(
        session,
        &SecuredObject::Job(outcome.reference.id.clone()),
        request,
        &permissions.job,
    )
    .await?;
    assign_object_permissions(
        session,
        &SecuredObject::Repository(target.repository.id.clone()),
        request,
        &permissions.repository,
    )
    .await?;

    let workflow_url = format!("{}/#job/{}", target.workspace.url(), outcome.reference.id);
    let mut info = ProvisioningInfo::new();
    info.insert("workspaceURL".to_string(), workspace_link(&target.workspace));
    info.insert(
        "workflowURL".to_string(),
        InfoEntry::link("Workflow URL", name.to_string(), workflow_url),
    );

    Ok(ProvisionOutcome::provisioned(
        outcome.reference.id,
        format!(
            "Workflow '{name}' provisioned in workspace '{}'",
            target.workspace.name
        ),
        info,
    ))
}

#[instrument(skip_all, fields(component_id = %request.component.id))]
pub async fn unprovision(
    ctx: &ProvisioningContext,
    request: &ValidatedRequest,
    spec: &WorkflowSpecific,
) -> OpResult<ProvisionOutcome> {
    let name = workflow_name(spec)?;
    unprovision_workload(ctx, request, spec, ResourceKind::Workflow, name, |session| {
        session.jobs()
    })
    .await
}

/// Read a live workflow back and return the descriptor updates matching it
#[instrument(skip(ctx))]
pub async fn reverse_provision(
    ctx: &ProvisioningContext,
    request: &ReverseProvisioningRequest,
) -> OpResult<Value> {
    let workspace_name = &request.params.workspace;
    let name = &request.params.workflow_name;

    let workspace = existing_workspace(ctx, workspace_name).await?;
    let session = open_session(ctx, &workspace).await?;
    let jobs = session.jobs();

    let matches = jobs.list_by_name(name).await?;
    let reference = match matches.as_slice() {
        [] => {
            return Err(FailedOperation::single(format!(
                "Workflow '{name}' not found in workspace '{workspace_name}'"
            )))
        }
        [single] => single.clone(),
        several => {
            return Err(FailedOperation::single(format!(
                "Workflow name '{name}' is not unique in workspace '{workspace_name}' ({} matches); reverse provisioning needs exactly one",
                several.len()
            )))
        }
    };

    let live = jobs.get(&reference.id).await?.ok_or_else(|| {
        FailedOperation::single(format!(
            "Workflow '{name}' not found in workspace '{workspace_name}'"
        ))
    })?;

    info!(workflow = %name, workspace = %workspace_name, id = %reference.id, "Workflow read back");

    let mut updates = Map::new();
    updates.insert(
        WORKFLOW_UPDATE_PATH.to_string(),
        normalize(&live_object(&live)),
    );
    Ok(Value::Object(updates))
}

fn workflow_name(spec: &WorkflowSpecific) -> OpResult<&str> {
    spec.workflow_name()
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| FailedOperation::single("The workflow definition carries no settings.name"))
}

/// Full job object of a live workflow: server fields plus `settings`
pub fn live_object(live: &RemoteResource<JobDefinition>) -> Value {
    let mut object = live.server_fields.clone();
    object.insert("settings".to_string(), live.definition.settings.clone());
    Value::Object(object)
}

/// Drop volatile server-assigned fields
pub fn normalize(workflow: &Value) -> Value {
    match workflow {
        Value::Object(fields) => Value::Object(
            fields
                .iter()
                .filter(|(key, _)| !VOLATILE_FIELDS.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// A workflow without tasks
pub fn is_empty_workflow(workflow: &Value) -> bool {
    workflow
        .get("settings")
        .and_then(|settings| settings.get("tasks"))
        .and_then(Value::as_array)
        .map_or(true, |tasks| tasks.is_empty())
}

/// Decide whether the requested workflow may replace the live one
pub fn check_override(
    spec: &WorkflowSpecific,
    live: &RemoteResource<JobDefinition>,
    in_development: bool,
    workspace: &str,
) -> OpResult<()> {
    let existing = normalize(&live_object(live));
    let requested = normalize(&spec.workflow);
    if existing == requested {
        return Ok(());
    }

    let name = &live.reference.name;
    if spec.override_existing {
        warn!(workflow = %name, workspace = %workspace, "Overriding a workflow that differs from the requested definition");
        return Ok(());
    }

    if in_development {
        return Err(FailedOperation::single(format!(
            "Workflow '{name}' in workspace '{workspace}' differs from the requested definition. \
             Run reverse provisioning to import the current definition into the descriptor, \
             or set 'override' to replace it"
        )));
    }

    if is_empty_workflow(&requested) && !is_empty_workflow(&existing) {
        return Err(FailedOperation::single(format!(
            "Workflow '{name}' in workspace '{workspace}' has tasks and the requested definition has none; \
             set 'override' to replace it with an empty workflow"
        )));
    }

    Ok(())
}
