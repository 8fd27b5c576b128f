//! Request validation for the provisioner
//!
//! Structural checks (descriptor kind, YAML shape, referenced component)
//! followed by semantic checks on the typed component specification. All
//! problems found are reported together.

use crate::config::ProvisionerConfig;
use crate::error::ProvisionerError;
use crate::models::{
    Component, ComponentDescriptor, DataProduct, DescriptorKind, JobSpecific, OutputPortSpecific,
    PipelineSpecific, PrincipalRef, ProvisioningRequest, WorkflowSpecific,
};
use crate::orchestration::dispatch::ComponentDispatch;
use crate::problem::{FailedOperation, OpResult, Problem};
use serde::{Deserialize, Serialize};

const PIPELINE_EDITIONS: [&str; 3] = ["core", "pro", "advanced"];

/// A request that passed validation, ready for dispatch
#[derive(Debug, Clone)]
pub struct ValidatedRequest {
    pub data_product: DataProduct,
    pub component: Component,
    pub dispatch: ComponentDispatch,
    pub remove_data: bool,
    pub owner: PrincipalRef,
    pub dev_group: PrincipalRef,
}

impl ValidatedRequest {
    pub fn environment(&self) -> &str {
        &self.data_product.environment
    }
}

/// Outcome of the synchronous validation operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl ValidationResult {
    pub fn valid() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    pub fn invalid(failure: &FailedOperation) -> Self {
        Self {
            valid: false,
            errors: failure
                .problems()
                .iter()
                .map(|p| p.description().to_string())
                .collect(),
        }
    }
}

/// Decode a YAML component descriptor
pub fn parse_descriptor(descriptor: &str) -> OpResult<ComponentDescriptor> {
    serde_yaml::from_str(descriptor)
        .map_err(|e| FailedOperation::new(ProvisionerError::from(e).into()))
}

/// Validate a provisioning request. Unsupported components are not a
/// validation failure here; they come back as [`ComponentDispatch::Unsupported`].
pub fn validate_provisioning_request(
    request: &ProvisioningRequest,
    config: &ProvisionerConfig,
) -> OpResult<ValidatedRequest> {
    if request.descriptor_kind != DescriptorKind::ComponentDescriptor {
        return Err(FailedOperation::single(format!(
            "Descriptor kind {:?} is not accepted, expected COMPONENT_DESCRIPTOR",
            request.descriptor_kind
        )));
    }

    let descriptor = parse_descriptor(&request.descriptor)?;
    let component = descriptor.component_to_provision().cloned().ok_or_else(|| {
        FailedOperation::single(format!(
            "Component '{}' to provision is not declared in data product '{}'",
            descriptor.component_id_to_provision, descriptor.data_product.id
        ))
    })?;

    let mut problems = Vec::new();

    let owner = parse_principal(&descriptor.data_product.data_product_owner, "dataProductOwner")
        .map_err(|p| problems.push(p))
        .ok();
    let dev_group = parse_principal(&descriptor.data_product.dev_group, "devGroup")
        .map_err(|p| problems.push(p))
        .ok();

    if descriptor.data_product.environment.trim().is_empty() {
        problems.push(Problem::new("Data product environment must not be empty"));
    }

    let dispatch = match ComponentDispatch::classify(&component, &config.templates) {
        Ok(dispatch) => {
            problems.extend(check_dispatch(&dispatch));
            Some(dispatch)
        }
        Err(failure) => {
            problems.extend(failure.into_problems());
            None
        }
    };

    match (owner, dev_group, dispatch, FailedOperation::from_problems(problems)) {
        (Some(owner), Some(dev_group), Some(dispatch), None) => Ok(ValidatedRequest {
            data_product: descriptor.data_product,
            component,
            dispatch,
            remove_data: request.remove_data,
            owner,
            dev_group,
        }),
        (_, _, _, Some(failure)) => Err(failure),
        _ => Err(FailedOperation::single(
            "Data product owner and development group must be valid principal references",
        )),
    }
}

/// Public validation operation: the same checks, reported as a value.
/// Unsupported components are reported as invalid.
pub fn validate(request: &ProvisioningRequest, config: &ProvisionerConfig) -> ValidationResult {
    match validate_provisioning_request(request, config) {
        Ok(validated) => match validated.dispatch {
            ComponentDispatch::Unsupported { reason } => ValidationResult {
                valid: false,
                errors: vec![reason],
            },
            _ => ValidationResult::valid(),
        },
        Err(failure) => ValidationResult::invalid(&failure),
    }
}

fn parse_principal(value: &str, field: &str) -> Result<PrincipalRef, Problem> {
    value
        .parse::<PrincipalRef>()
        .map_err(|e| Problem::new(format!("Invalid {field}: {e}")))
}

fn check_dispatch(dispatch: &ComponentDispatch) -> Vec<Problem> {
    match dispatch {
        ComponentDispatch::Job(spec) => check_job(spec),
        ComponentDispatch::Pipeline(spec) => check_pipeline(spec),
        ComponentDispatch::Workflow(spec) => check_workflow(spec),
        ComponentDispatch::OutputPort(spec) => check_output_port(spec),
        ComponentDispatch::Unsupported { .. } => Vec::new(),
    }
}

fn require_non_blank(problems: &mut Vec<Problem>, field: &str, value: &str) {
    if value.trim().is_empty() {
        problems.push(Problem::new(format!("{field} must not be empty")));
    }
}

fn check_repository(problems: &mut Vec<Problem>, repo_url: &str, repo_path: &str) {
    if !repo_url.trim_end().ends_with(".git") {
        problems.push(Problem::new(format!(
            "Repository URL '{repo_url}' must point to a git repository ending in .git"
        )));
    }
    require_non_blank(problems, "repoPath", repo_path);
}

fn check_job(spec: &JobSpecific) -> Vec<Problem> {
    let mut problems = Vec::new();
    require_non_blank(&mut problems, "workspace", &spec.workspace);
    require_non_blank(&mut problems, "jobName", &spec.job_name);
    check_repository(&mut problems, &spec.git.git_repo_url, &spec.repo_path);
    require_non_blank(&mut problems, "git.gitReference", &spec.git.git_reference);
    require_non_blank(&mut problems, "git.gitPath", &spec.git.git_path);
    require_non_blank(
        &mut problems,
        "cluster.clusterSparkVersion",
        &spec.cluster.cluster_spark_version,
    );
    require_non_blank(&mut problems, "cluster.nodeTypeId", &spec.cluster.node_type_id);
    if let Some(scheduling) = &spec.scheduling {
        require_non_blank(&mut problems, "scheduling.cronExpression", &scheduling.cron_expression);
        require_non_blank(&mut problems, "scheduling.javaTimezoneId", &scheduling.java_timezone_id);
    }
    problems
}

fn check_pipeline(spec: &PipelineSpecific) -> Vec<Problem> {
    let mut problems = Vec::new();
    require_non_blank(&mut problems, "workspace", &spec.workspace);
    require_non_blank(&mut problems, "pipelineName", &spec.pipeline_name);
    check_repository(&mut problems, &spec.git.git_repo_url, &spec.repo_path);

    if !PIPELINE_EDITIONS
        .iter()
        .any(|e| e.eq_ignore_ascii_case(&spec.product_edition))
    {
        problems.push(Problem::new(format!(
            "productEdition '{}' is not one of {}",
            spec.product_edition,
            PIPELINE_EDITIONS.join(", ")
        )));
    }

    if spec.notebooks.is_empty() && spec.files.is_empty() {
        problems.push(Problem::new(
            "A DLT pipeline needs at least one notebook or file library",
        ));
    }

    if spec.cluster.min_workers > spec.cluster.max_workers {
        problems.push(Problem::new(format!(
            "cluster.minWorkers ({}) must not exceed cluster.maxWorkers ({})",
            spec.cluster.min_workers, spec.cluster.max_workers
        )));
    }
    problems
}

fn check_workflow(spec: &WorkflowSpecific) -> Vec<Problem> {
    let mut problems = Vec::new();
    require_non_blank(&mut problems, "workspace", &spec.workspace);
    check_repository(&mut problems, &spec.git.git_repo_url, &spec.repo_path);

    match spec.workflow_name() {
        Some(name) => require_non_blank(&mut problems, "workflow.settings.name", name),
        None => problems.push(Problem::new(
            "workflow.settings must be an object carrying the workflow name",
        )),
    }
    problems
}

fn check_output_port(spec: &OutputPortSpecific) -> Vec<Problem> {
    let mut problems = Vec::new();
    require_non_blank(&mut problems, "workspace", &spec.workspace);
    require_non_blank(&mut problems, "catalogName", &spec.catalog_name);
    require_non_blank(&mut problems, "schemaName", &spec.schema_name);
    require_non_blank(&mut problems, "viewName", &spec.view_name);
    require_non_blank(
        &mut problems,
        "sourceTable.catalogName",
        &spec.source_table.catalog_name,
    );
    require_non_blank(
        &mut problems,
        "sourceTable.schemaName",
        &spec.source_table.schema_name,
    );
    require_non_blank(
        &mut problems,
        "sourceTable.tableName",
        &spec.source_table.table_name,
    );
    problems
}
