//! Notebook job pipeline.
//!
//! Provision: workspace → session → repository → upsert job → owner and
//! developer permissions on the job and the repository.

use super::common::{
    assign_object_permissions, prepare_workload, unprovision_workload, workspace_link,
};
use super::{ProvisionOutcome, ProvisioningContext};
use crate::models::{
    GitReferenceType, InfoEntry, JobDefinition, JobSpecific, ProvisioningInfo, ResourceKind,
    SecuredObject,
};
use crate::orchestration::upsert::UpsertResolver;
use crate::problem::OpResult;
use crate::validation::ValidatedRequest;
use serde_json::{json, Map, Value};
use tracing::instrument;

#[instrument(skip_all, fields(component_id = %request.component.id, job = %spec.job_name))]
pub async fn provision(
    ctx: &ProvisioningContext,
    request: &ValidatedRequest,
    spec: &JobSpecific,
) -> OpResult<ProvisionOutcome> {
    let target = prepare_workload(ctx, request, spec).await?;
    let session = target.session.as_ref();
    let scope = format!("workspace '{}'", target.workspace.name);

    let definition = job_definition(spec, &ctx.config.git.provider);
    let jobs = session.jobs();
    let outcome = UpsertResolver::new(jobs.as_ref(), ResourceKind::Job, &scope)
        .upsert(&spec.job_name, &definition)
        .await?;

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

    let workspace_url = target.workspace.url();
    let job_url = format!("{workspace_url}/#job/{}", outcome.reference.id);
    let mut info = ProvisioningInfo::new();
    info.insert("workspaceURL".to_string(), workspace_link(&target.workspace));
    info.insert(
        "jobURL".to_string(),
        InfoEntry::link("Job URL", spec.job_name.clone(), job_url),
    );
    info.insert(
        "repository".to_string(),
        InfoEntry::text("Repository", target.repository.path.clone()),
    );

    Ok(ProvisionOutcome::provisioned(
        outcome.reference.id,
        format!(
            "Job '{}' provisioned in workspace '{}'",
            spec.job_name, target.workspace.name
        ),
        info,
    ))
}

#[instrument(skip_all, fields(component_id = %request.component.id, job = %spec.job_name))]
pub async fn unprovision(
    ctx: &ProvisioningContext,
    request: &ValidatedRequest,
    spec: &JobSpecific,
) -> OpResult<ProvisionOutcome> {
    unprovision_workload(ctx, request, spec, ResourceKind::Job, &spec.job_name, |session| {
        session.jobs()
    })
    .await
}

/// Jobs API settings for a single-notebook job running from git
pub fn job_definition(spec: &JobSpecific, git_provider: &str) -> JobDefinition {
    let mut git_source = Map::new();
    git_source.insert("git_url".to_string(), json!(spec.git.git_repo_url));
    git_source.insert("git_provider".to_string(), json!(git_provider));
    let reference_key = match spec.git.git_reference_type {
        GitReferenceType::Branch => "git_branch",
        GitReferenceType::Tag => "git_tag",
    };
    git_source.insert(reference_key.to_string(), json!(spec.git.git_reference));

    let mut settings = json!({
        "name": spec.job_name,
        "git_source": Value::Object(git_source),
        "tasks": [{
            "task_key": format!("{}_task", spec.job_name),
            "notebook_task": {
                "notebook_path": spec.git.git_path,
                "source": "GIT",
            },
            "new_cluster": new_cluster(spec),
        }],
        "max_concurrent_runs": 1,
    });

    if let Some(description) = &spec.description {
        settings["description"] = json!(description);
    }
    if let Some(scheduling) = &spec.scheduling {
        settings["schedule"] = json!({
            "quartz_cron_expression": scheduling.cron_expression,
            "timezone_id": scheduling.java_timezone_id,
            "pause_status": "UNPAUSED",
        });
    }

    JobDefinition {
        name: spec.job_name.clone(),
        settings,
    }
}

fn new_cluster(spec: &JobSpecific) -> Value {
    let cluster = &spec.cluster;
    let mut value = json!({
        "spark_version": cluster.cluster_spark_version,
        "node_type_id": cluster.node_type_id,
        "num_workers": cluster.num_workers,
        "spark_conf": cluster.spark_conf,
        "spark_env_vars": cluster.spark_env_vars,
    });

    if let Some(driver) = &cluster.driver_node_type_id {
        value["driver_node_type_id"] = json!(driver);
    }
    if let Some(engine) = &cluster.runtime_engine {
        value["runtime_engine"] = json!(engine);
    }

    let mut azure = Map::new();
    if let Some(first) = cluster.first_on_demand {
        azure.insert("first_on_demand".to_string(), json!(first));
    }
    if let Some(availability) = &cluster.availability {
        azure.insert("availability".to_string(), json!(availability));
    } else if cluster.spot_instances {
        azure.insert("availability".to_string(), json!("SPOT_WITH_FALLBACK_AZURE"));
    }
    if let Some(price) = cluster.spot_bid_max_price {
        azure.insert("spot_bid_max_price".to_string(), json!(price));
    }
    if !azure.is_empty() {
        value["azure_attributes"] = Value::Object(azure);
    }

    value
}
