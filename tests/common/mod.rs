//! Shared fixtures for the integration tests: descriptor builders, a seeded
//! in-memory platform and status polling.

#![allow(dead_code)]

use provisioner_core::config::ProvisionerConfig;
use provisioner_core::gateways::{memory::InMemoryPlatform, Gateways};
use provisioner_core::models::{JobToken, ProvisioningJob};
use provisioner_core::orchestration::Orchestrator;
use std::sync::Arc;
use std::time::Duration;

pub const OWNER_EMAIL: &str = "jane.doe@example.com";
pub const OWNER_REF: &str = "user:jane.doe_example.com";
pub const DEV_GROUP: &str = "sales-devs";
pub const WORKSPACE: &str = "sales-ws";
pub const COMPONENT_ID: &str = "urn:dmb:cmp:finance:sales:0:etl";

pub const JOB_TEMPLATE: &str = "urn:dmb:utm:databricks-workload-job-template:0.0.0";
pub const DLT_TEMPLATE: &str = "urn:dmb:utm:databricks-workload-dlt-template:0.0.0";
pub const WORKFLOW_TEMPLATE: &str = "urn:dmb:utm:databricks-workload-workflow-template:0.0.0";
pub const OUTPUT_PORT_TEMPLATE: &str = "urn:dmb:utm:databricks-outputport-template:0.0.0";

/// Platform that knows the data product owner and the developer group
pub fn platform() -> InMemoryPlatform {
    let platform = InMemoryPlatform::new();
    platform.add_user(OWNER_EMAIL);
    platform.add_group(DEV_GROUP);
    platform
}

pub fn orchestrator(platform: &InMemoryPlatform) -> Orchestrator {
    orchestrator_with(platform, ProvisionerConfig::default())
}

pub fn orchestrator_with(platform: &InMemoryPlatform, config: ProvisionerConfig) -> Orchestrator {
    Orchestrator::new(Arc::new(config), Gateways::in_memory(platform))
}

/// Poll until the job leaves RUNNING
pub async fn wait_for_terminal(orchestrator: &Orchestrator, token: &JobToken) -> ProvisioningJob {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let job = orchestrator.get_status(token).await;
        if job.status.is_terminal() {
            return job;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "job {token} did not reach a terminal state"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Component descriptor for a data product in `environment`
pub fn descriptor(
    environment: &str,
    kind: &str,
    template: &str,
    specific: &str,
) -> String {
    format!(
        r#"
dataProduct:
  id: urn:dmb:dp:finance:sales:0
  name: sales
  domain: finance
  environment: {environment}
  version: 0.1.0
  dataProductOwner: {OWNER_REF}
  devGroup: group:{DEV_GROUP}
  components:
    - id: {COMPONENT_ID}
      name: etl
      description: Sales ETL
      kind: {kind}
      useCaseTemplateId: {template}
      specific:
{specific}
componentIdToProvision: {COMPONENT_ID}
"#
    )
}

pub fn job_descriptor(job_name: &str) -> String {
    let specific = format!(
        r#"        workspace: {WORKSPACE}
        jobName: {job_name}
        repoPath: /Repos/sales/etl
        git:
          gitRepoUrl: https://gitlab.com/sales/etl.git
          gitReference: main
          gitReferenceType: BRANCH
          gitPath: notebooks/etl
        cluster:
          clusterSparkVersion: 14.3.x-scala2.12
          nodeTypeId: Standard_DS3_v2
          numWorkers: 2
        scheduling:
          cronExpression: "0 0 6 * * ?"
          javaTimezoneId: Europe/Rome"#
    );
    descriptor("development", "workload", JOB_TEMPLATE, &specific)
}

pub fn dlt_descriptor(pipeline_name: &str) -> String {
    let specific = format!(
        r#"        workspace: {WORKSPACE}
        pipelineName: {pipeline_name}
        productEdition: advanced
        continuous: false
        notebooks:
          - pipelines/orders
        photon: true
        channel: current
        cluster:
          minWorkers: 1
          maxWorkers: 3
          workerType: Standard_DS3_v2
          driverType: Standard_DS3_v2
        repoPath: /Repos/sales/dlt
        git:
          gitRepoUrl: https://gitlab.com/sales/dlt.git"#
    );
    descriptor("development", "workload", DLT_TEMPLATE, &specific)
}

/// Workflow descriptor; `tasks` are task keys of the requested definition
pub fn workflow_descriptor(
    environment: &str,
    workflow_name: &str,
    tasks: &[&str],
    override_existing: bool,
) -> String {
    let tasks = if tasks.is_empty() {
        "[]".to_string()
    } else {
        tasks
            .iter()
            .map(|key| format!("\n              - task_key: {key}"))
            .collect::<String>()
    };
    let specific = format!(
        r#"        workspace: {WORKSPACE}
        repoPath: /Repos/sales/wf
        override: {override_existing}
        git:
          gitRepoUrl: https://gitlab.com/sales/wf.git
        workflow:
          settings:
            name: {workflow_name}
            tasks: {tasks}"#
    );
    descriptor(environment, "workload", WORKFLOW_TEMPLATE, &specific)
}

pub fn output_port_descriptor() -> String {
    let specific = format!(
        r#"        workspace: {WORKSPACE}
        catalogName: sales
        schemaName: gold
        viewName: orders_v
        sourceTable:
          catalogName: sales
          schemaName: silver
          tableName: orders"#
    );
    descriptor("development", "outputport", OUTPUT_PORT_TEMPLATE, &specific)
}

pub const VIEW_FULL_NAME: &str = "sales.gold.orders_v";
pub const SOURCE_TABLE: &str = "sales.silver.orders";
