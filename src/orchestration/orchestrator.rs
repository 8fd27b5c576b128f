//! # Orchestrator
//!
//! Entry point of the engine. `submit` records a RUNNING job, schedules the
//! work on the worker pool and returns the token at once; the background task
//! validates the request, dispatches it to its pipeline and writes exactly one
//! terminal state. Validation failures, unsupported components and panics all
//! end as FAILED jobs.

use super::dispatch::ComponentDispatch;
use super::job_store::{InMemoryJobStore, JobStore};
use super::pipelines::{dlt, job, output_port, workflow, ProvisionOutcome, ProvisioningContext};
use crate::config::{ConfigManager, ProvisionerConfig};
use crate::execution::{catch_panic, TaskPanic, WorkerPool};
use crate::gateways::Gateways;
use crate::logging::log_job_operation;
use crate::models::{
    JobToken, ProvisioningJob, ProvisioningRequest, ReverseProvisioningRequest, UpdateAclRequest,
};
use crate::problem::{FailedOperation, OpResult};
use crate::validation::{self, validate_provisioning_request, ValidationResult};
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisioningDirection {
    Provision,
    Unprovision,
}

impl fmt::Display for ProvisioningDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Provision => write!(f, "provision"),
            Self::Unprovision => write!(f, "unprovision"),
        }
    }
}

pub struct Orchestrator {
    context: Arc<ProvisioningContext>,
    store: Arc<dyn JobStore>,
    pool: WorkerPool,
}

impl Orchestrator {
    /// Orchestrator with an in-memory job store and a pool sized from
    /// `orchestrator.max_concurrent_jobs`
    pub fn new(config: Arc<ProvisionerConfig>, gateways: Gateways) -> Self {
        let pool = WorkerPool::new(config.orchestrator.max_concurrent_jobs);
        Self {
            context: Arc::new(ProvisioningContext::new(config, gateways)),
            store: Arc::new(InMemoryJobStore::new()),
            pool,
        }
    }

    pub fn from_config_manager(manager: &ConfigManager, gateways: Gateways) -> Self {
        Self::new(Arc::new(manager.config().clone()), gateways)
    }

    /// Replace the job store, e.g. with a durable one
    pub fn with_job_store(mut self, store: Arc<dyn JobStore>) -> Self {
        self.store = store;
        self
    }

    pub fn config(&self) -> &ProvisionerConfig {
        &self.context.config
    }

    pub fn worker_pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Check a request without scheduling anything
    pub fn validate(&self, request: &ProvisioningRequest) -> ValidationResult {
        validation::validate(request, &self.context.config)
    }

    /// Schedule a provisioning or de-provisioning run and return its token
    #[instrument(skip(self, request))]
    pub async fn submit(
        &self,
        request: ProvisioningRequest,
        direction: ProvisioningDirection,
    ) -> JobToken {
        let token = self.register().await;
        log_job_operation("submit", token.as_str(), None, "RUNNING", Some(&direction.to_string()));

        let context = self.context.clone();
        let store = self.store.clone();
        let job_token = token.clone();
        self.pool.spawn(format!("{direction}:{token}"), async move {
            let outcome = catch_panic(run_request(&context, &request, direction)).await;
            finish(store.as_ref(), &job_token, outcome).await;
        });

        token
    }

    /// Schedule a workflow read-back and return its token
    #[instrument(skip(self, request), fields(workflow = %request.params.workflow_name))]
    pub async fn submit_reverse_provisioning(&self, request: ReverseProvisioningRequest) -> JobToken {
        let token = self.register().await;
        log_job_operation("submit_reverse_provisioning", token.as_str(), None, "RUNNING", None);

        let context = self.context.clone();
        let store = self.store.clone();
        let job_token = token.clone();
        self.pool.spawn(format!("reverse:{token}"), async move {
            let outcome = catch_panic(run_reverse_provisioning(&context, &request)).await;
            finish(store.as_ref(), &job_token, outcome).await;
        });

        token
    }

    /// Update the consumers of an output port. Runs to completion before
    /// returning; the result is also recorded under a fresh token.
    #[instrument(skip(self, request))]
    pub async fn update_acl(&self, request: UpdateAclRequest) -> ProvisioningJob {
        let token = self.register().await;
        let outcome = catch_panic(run_update_acl(&self.context, &request)).await;
        finish(self.store.as_ref(), &token, outcome).await;
        self.store.get(&token).await
    }

    /// Current state of a job; unknown tokens come back FAILED
    pub async fn get_status(&self, token: &JobToken) -> ProvisioningJob {
        self.store.get(token).await
    }

    async fn register(&self) -> JobToken {
        let token = JobToken::generate();
        self.store.put(ProvisioningJob::running(token.clone())).await;
        token
    }
}

async fn run_request(
    context: &ProvisioningContext,
    request: &ProvisioningRequest,
    direction: ProvisioningDirection,
) -> OpResult<ProvisionOutcome> {
    use ComponentDispatch as D;
    use ProvisioningDirection::{Provision, Unprovision};

    let validated = validate_provisioning_request(request, &context.config)?;
    info!(
        component_id = %validated.component.id,
        component_type = validated.dispatch.label(),
        direction = %direction,
        "Request validated"
    );

    match (&validated.dispatch, direction) {
        (D::Job(spec), Provision) => job::provision(context, &validated, spec).await,
        (D::Job(spec), Unprovision) => job::unprovision(context, &validated, spec).await,
        (D::Pipeline(spec), Provision) => dlt::provision(context, &validated, spec).await,
        (D::Pipeline(spec), Unprovision) => dlt::unprovision(context, &validated, spec).await,
        (D::Workflow(spec), Provision) => workflow::provision(context, &validated, spec).await,
        (D::Workflow(spec), Unprovision) => workflow::unprovision(context, &validated, spec).await,
        (D::OutputPort(spec), Provision) => output_port::provision(context, &validated, spec).await,
        (D::OutputPort(spec), Unprovision) => {
            output_port::unprovision(context, &validated, spec).await
        }
        (D::Unsupported { reason }, _) => Err(FailedOperation::single(reason.clone())),
    }
}

async fn run_reverse_provisioning(
    context: &ProvisioningContext,
    request: &ReverseProvisioningRequest,
) -> OpResult<ProvisionOutcome> {
    if !context
        .config
        .templates
        .workflow
        .iter()
        .any(|id| id == &request.use_case_template_id)
    {
        return Err(FailedOperation::single(format!(
            "Reverse provisioning for use case template id '{}' is not supported by this provisioner",
            request.use_case_template_id
        )));
    }

    let updates = workflow::reverse_provision(context, request).await?;
    Ok(ProvisionOutcome::message_only(format!(
        "Workflow '{}' read back from workspace '{}'",
        request.params.workflow_name, request.params.workspace
    ))
    .with_updates(updates))
}

async fn run_update_acl(
    context: &ProvisioningContext,
    request: &UpdateAclRequest,
) -> OpResult<ProvisionOutcome> {
    let provisioning_request = ProvisioningRequest::component(request.descriptor.clone());
    let validated = validate_provisioning_request(&provisioning_request, &context.config)?;

    match &validated.dispatch {
        ComponentDispatch::OutputPort(spec) => {
            output_port::update_acl(context, &validated, spec, &request.refs).await
        }
        ComponentDispatch::Unsupported { reason } => Err(FailedOperation::single(reason.clone())),
        other => Err(FailedOperation::single(format!(
            "Access control updates are only supported for output ports; component '{}' is a {}",
            validated.component.id,
            other.label()
        ))),
    }
}

/// Write the single terminal state of a job
async fn finish(
    store: &dyn JobStore,
    token: &JobToken,
    outcome: Result<OpResult<ProvisionOutcome>, TaskPanic>,
) {
    let job = store.get(token).await;

    let terminal = match outcome {
        Ok(Ok(result)) => {
            let ProvisionOutcome {
                message,
                info,
                updates,
                ..
            } = result;
            let completed = job.completed(message, info);
            match updates {
                Some(updates) => completed.with_updates(updates),
                None => completed,
            }
        }
        Ok(Err(failure)) => job.failed(failure.render()),
        Err(panic) => {
            error!(token = %token, panic = %panic.message(), "Provisioning task panicked");
            job.failed(format!(
                "Provisioning aborted by an internal error: {}",
                panic.message()
            ))
        }
    };

    log_job_operation(
        "finish",
        token.as_str(),
        None,
        &terminal.status.to_string(),
        Some(&terminal.result_message),
    );
    store.put(terminal).await;
}
