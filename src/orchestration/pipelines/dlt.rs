//! Declarative (DLT) pipeline provisioning.

use super::common::{
    assign_object_permissions, prepare_workload, unprovision_workload, workspace_link,
};
use super::{ProvisionOutcome, ProvisioningContext};
use crate::models::{
    InfoEntry, PipelineDefinition, PipelineNotification, PipelineSpecific, ProvisioningInfo,
    ResourceKind, SecuredObject,
};
use crate::orchestration::upsert::UpsertResolver;
use crate::problem::OpResult;
use crate::validation::ValidatedRequest;
use serde_json::json;
use tracing::instrument;

#[instrument(skip_all, fields(component_id = %request.component.id, pipeline = %spec.pipeline_name))]
pub async fn provision(
    ctx: &ProvisioningContext,
    request: &ValidatedRequest,
    spec: &PipelineSpecific,
) -> OpResult<ProvisionOutcome> {
    let target = prepare_workload(ctx, request, spec).await?;
    let session = target.session.as_ref();
    let scope = format!("workspace '{}'", target.workspace.name);

    let definition = pipeline_definition(spec);
    let pipelines = session.pipelines();
    let outcome = UpsertResolver::new(pipelines.as_ref(), ResourceKind::Pipeline, &scope)
        .upsert(&spec.pipeline_name, &definition)
        .await?;

    let permissions = &ctx.config.permissions;
    assign_object_permissions(
        session,
        &SecuredObject::Pipeline(outcome.reference.id.clone()),
        request,
        &permissions.pipeline,
    )
    .await?;
    assign_object_permissions(
        session,
        &SecuredObject::Repository(target.repository.id.clone()),
        request,
        &permissions.repository,
    )
    .await?;

    let pipeline_url = format!(
        "{}/#joblist/pipelines/{}",
        target.workspace.url(),
        outcome.reference.id
    );
    let mut info = ProvisioningInfo::new();
    info.insert("workspaceURL".to_string(), workspace_link(&target.workspace));
    info.insert(
        "pipelineURL".to_string(),
        InfoEntry::link("Pipeline URL", spec.pipeline_name.clone(), pipeline_url),
    );

    Ok(ProvisionOutcome::provisioned(
        outcome.reference.id,
        format!(
            "DLT pipeline '{}' provisioned in workspace '{}'",
            spec.pipeline_name, target.workspace.name
        ),
        info,
    ))
}

#[instrument(skip_all, fields(component_id = %request.component.id, pipeline = %spec.pipeline_name))]
pub async fn unprovision(
    ctx: &ProvisioningContext,
    request: &ValidatedRequest,
    spec: &PipelineSpecific,
) -> OpResult<ProvisionOutcome> {
    unprovision_workload(
        ctx,
        request,
        spec,
        ResourceKind::Pipeline,
        &spec.pipeline_name,
        |session| session.pipelines(),
    )
    .await
}

/// Library paths are relative to the repository
pub fn pipeline_definition(spec: &PipelineSpecific) -> PipelineDefinition {
    let in_repo = |path: &String| format!("{}/{}", spec.repo_path.trim_end_matches('/'), path.trim_start_matches('/'));
    let cluster = &spec.cluster;

    let mut cluster_value = json!({
        "label": "default",
        "autoscale": {
            "min_workers": cluster.min_workers,
            "max_workers": cluster.max_workers,
            "mode": "ENHANCED",
        },
        "node_type_id": cluster.worker_type,
        "driver_node_type_id": cluster.driver_type,
        "spark_conf": cluster.spark_conf,
        "custom_tags": cluster.tags,
    });
    if let Some(policy) = &cluster.policy_id {
        cluster_value["policy_id"] = json!(policy);
    }

    PipelineDefinition {
        name: spec.pipeline_name.clone(),
        edition: spec.product_edition.to_uppercase(),
        channel: spec.channel.to_uppercase(),
        continuous: spec.continuous,
        photon: spec.photon,
        catalog: spec.catalog.clone(),
        target: spec.target.clone(),
        notebooks: spec.notebooks.iter().map(in_repo).collect(),
        files: spec.files.iter().map(in_repo).collect(),
        notifications: spec
            .notifications
            .iter()
            .map(|n| PipelineNotification {
                email: n.mail.clone(),
                alerts: n.alert.clone(),
            })
            .collect(),
        cluster: cluster_value,
    }
}
