use crate::common::*;
use provisioner_core::models::{JobStatus, ProvisioningRequest, ProvisioningState};
use provisioner_core::orchestration::ProvisioningDirection;

async fn provision(
    orchestrator: &provisioner_core::Orchestrator,
    descriptor: String,
) -> provisioner_core::models::ProvisioningJob {
    let token = orchestrator
        .submit(
            ProvisioningRequest::component(descriptor),
            ProvisioningDirection::Provision,
        )
        .await;
    wait_for_terminal(orchestrator, &token).await
}

#[tokio::test]
async fn test_job_is_provisioned_into_a_new_workspace() {
    let platform = platform();
    let orchestrator = orchestrator(&platform);

    let job = provision(&orchestrator, job_descriptor("etl")).await;

    assert_eq!(job.status, JobStatus::Completed, "{}", job.result_message);
    let info = job.info.expect("provisioning info");
    assert!(info.contains_key("workspaceURL"));
    assert!(info["jobURL"].href.as_deref().unwrap().contains("/#job/"));

    assert!(platform.workspace(WORKSPACE).is_some());
    assert_eq!(platform.role_assignments().len(), 2);
    assert_eq!(platform.repositories(WORKSPACE).len(), 1);

    let jobs = platform.jobs(WORKSPACE);
    assert_eq!(jobs.len(), 1);
    let settings = &jobs[0].1.settings;
    assert_eq!(settings["git_source"]["git_branch"], "main");
    assert_eq!(settings["schedule"]["timezone_id"], "Europe/Rome");
}

#[tokio::test]
async fn test_provisioning_twice_updates_instead_of_duplicating() {
    let platform = platform();
    let orchestrator = orchestrator(&platform);

    let first = provision(&orchestrator, job_descriptor("etl")).await;
    let second = provision(&orchestrator, job_descriptor("etl")).await;

    assert_eq!(first.status, JobStatus::Completed, "{}", first.result_message);
    assert_eq!(second.status, JobStatus::Completed, "{}", second.result_message);
    assert_eq!(platform.jobs(WORKSPACE).len(), 1);
    assert_eq!(platform.repositories(WORKSPACE).len(), 1);
    assert_eq!(platform.call_count("job.create"), 1);
    assert_eq!(platform.call_count("job.update"), 1);
}

#[tokio::test]
async fn test_duplicate_names_fail_without_touching_either() {
    let platform = platform();
    platform.seed_workspace(WORKSPACE, ProvisioningState::Succeeded);
    for _ in 0..2 {
        platform.seed_job(
            WORKSPACE,
            provisioner_core::models::JobDefinition {
                name: "etl".to_string(),
                settings: serde_json::json!({ "name": "etl" }),
            },
        );
    }
    let orchestrator = orchestrator(&platform);

    let job = provision(&orchestrator, job_descriptor("etl")).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.result_message.contains("Found 2 jobs named 'etl'"), "{}", job.result_message);
    assert_eq!(platform.call_count("job.create"), 0);
    assert_eq!(platform.call_count("job.update"), 0);
}

#[tokio::test]
async fn test_failed_repository_step_stops_the_chain() {
    let platform = platform();
    platform.fail_on("repository.create");
    let orchestrator = orchestrator(&platform);

    let job = provision(&orchestrator, job_descriptor("etl")).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.result_message.contains("injected failure"), "{}", job.result_message);
    assert_eq!(platform.call_count("job.create"), 0);
    assert_eq!(platform.call_count("job.list_by_name"), 0);
}

#[tokio::test]
async fn test_workspace_that_is_not_ready_fails_the_job() {
    let platform = platform();
    platform.set_new_workspace_state(ProvisioningState::Creating);
    let orchestrator = orchestrator(&platform);

    let job = provision(&orchestrator, job_descriptor("etl")).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.result_message.contains("must be Succeeded"), "{}", job.result_message);
    assert_eq!(platform.call_count("session.open"), 0);
}

#[tokio::test]
async fn test_unmanaged_workspace_must_already_exist() {
    let platform = platform();
    let mut config = provisioner_core::ProvisionerConfig::default();
    config.workspace.managed = false;
    let orchestrator = orchestrator_with(&platform, config);

    let job = provision(&orchestrator, job_descriptor("etl")).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(platform.call_count("workspace.create_if_absent"), 0);
    assert!(platform.workspace(WORKSPACE).is_none());
}

#[tokio::test]
async fn test_dlt_pipeline_is_provisioned() {
    let platform = platform();
    let orchestrator = orchestrator(&platform);

    let job = provision(&orchestrator, dlt_descriptor("orders")).await;

    assert_eq!(job.status, JobStatus::Completed, "{}", job.result_message);
    assert!(job.info.expect("provisioning info").contains_key("pipelineURL"));

    let pipelines = platform.pipelines(WORKSPACE);
    assert_eq!(pipelines.len(), 1);
    assert_eq!(pipelines[0].1.name, "orders");
    assert_eq!(pipelines[0].1.edition, "ADVANCED");
}

#[tokio::test]
async fn test_unsupported_component_kind_fails() {
    let platform = platform();
    let orchestrator = orchestrator(&platform);
    let descriptor = descriptor(
        "development",
        "storage",
        "urn:dmb:utm:adls-storage-template:0.0.0",
        "        workspace: sales-ws",
    );

    let job = provision(&orchestrator, descriptor).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.result_message.contains("not supported by this"), "{}", job.result_message);
    assert!(platform.calls().is_empty());
}

#[tokio::test]
async fn test_unknown_owner_fails_at_workspace_access() {
    let platform = provisioner_core::gateways::memory::InMemoryPlatform::new();
    platform.add_group(DEV_GROUP);
    let orchestrator = orchestrator(&platform);

    let job = provision(&orchestrator, job_descriptor("etl")).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.result_message.contains(OWNER_EMAIL), "{}", job.result_message);
    assert_eq!(platform.call_count("repository.create"), 0);
}
