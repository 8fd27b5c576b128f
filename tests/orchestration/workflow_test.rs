use crate::common::*;
use provisioner_core::models::{
    JobDefinition, JobStatus, ProvisioningRequest, ProvisioningState, ReverseProvisioningParams,
    ReverseProvisioningRequest,
};
use provisioner_core::orchestration::ProvisioningDirection;
use provisioner_core::Orchestrator;
use serde_json::json;

fn seed_live_workflow(platform: &provisioner_core::gateways::memory::InMemoryPlatform, tasks: &[&str]) -> String {
    platform.seed_workspace(WORKSPACE, ProvisioningState::Succeeded);
    let tasks: Vec<_> = tasks.iter().map(|key| json!({ "task_key": key })).collect();
    platform.seed_job(
        WORKSPACE,
        JobDefinition {
            name: "wf".to_string(),
            settings: json!({ "name": "wf", "tasks": tasks }),
        },
    )
}

async fn provision(orchestrator: &Orchestrator, descriptor: String) -> provisioner_core::models::ProvisioningJob {
    let token = orchestrator
        .submit(
            ProvisioningRequest::component(descriptor),
            ProvisioningDirection::Provision,
        )
        .await;
    wait_for_terminal(orchestrator, &token).await
}

fn reverse_request(workflow_name: &str) -> ReverseProvisioningRequest {
    ReverseProvisioningRequest {
        use_case_template_id: WORKFLOW_TEMPLATE.to_string(),
        environment: "development".to_string(),
        params: ReverseProvisioningParams {
            workspace: WORKSPACE.to_string(),
            workflow_name: workflow_name.to_string(),
        },
    }
}

#[tokio::test]
async fn test_new_workflow_is_created() {
    let platform = platform();
    let orchestrator = orchestrator(&platform);

    let job = provision(&orchestrator, workflow_descriptor("development", "wf", &["a", "b"], false)).await;

    assert_eq!(job.status, JobStatus::Completed, "{}", job.result_message);
    assert!(job.info.expect("provisioning info").contains_key("workflowURL"));
    let jobs = platform.jobs(WORKSPACE);
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].1.settings["tasks"][1]["task_key"], "b");
}

#[tokio::test]
async fn test_identical_live_workflow_is_updated_in_development() {
    let platform = platform();
    let id = seed_live_workflow(&platform, &["a"]);
    let orchestrator = orchestrator(&platform);

    let job = provision(&orchestrator, workflow_descriptor("development", "wf", &["a"], false)).await;

    assert_eq!(job.status, JobStatus::Completed, "{}", job.result_message);
    assert_eq!(platform.call_count("job.update"), 1);
    assert!(platform.calls().contains(&format!("job.update:{id}")));
}

#[tokio::test]
async fn test_drift_in_development_requires_reverse_provisioning() {
    let platform = platform();
    seed_live_workflow(&platform, &["a"]);
    let orchestrator = orchestrator(&platform);

    let job = provision(&orchestrator, workflow_descriptor("development", "wf", &["b"], false)).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.result_message.contains("reverse provisioning"), "{}", job.result_message);
    assert_eq!(platform.call_count("job.update"), 0);
    assert_eq!(platform.jobs(WORKSPACE)[0].1.settings["tasks"][0]["task_key"], "a");
}

#[tokio::test]
async fn test_override_replaces_a_drifted_workflow() {
    let platform = platform();
    seed_live_workflow(&platform, &["a"]);
    let orchestrator = orchestrator(&platform);

    let job = provision(&orchestrator, workflow_descriptor("development", "wf", &["b"], true)).await;

    assert_eq!(job.status, JobStatus::Completed, "{}", job.result_message);
    assert_eq!(platform.jobs(WORKSPACE)[0].1.settings["tasks"][0]["task_key"], "b");
}

#[tokio::test]
async fn test_empty_workflow_cannot_replace_one_with_tasks_outside_development() {
    let platform = platform();
    seed_live_workflow(&platform, &["a"]);
    let orchestrator = orchestrator(&platform);

    let rejected = provision(&orchestrator, workflow_descriptor("production", "wf", &[], false)).await;
    assert_eq!(rejected.status, JobStatus::Failed);
    assert!(rejected.result_message.contains("has tasks"), "{}", rejected.result_message);

    let accepted = provision(&orchestrator, workflow_descriptor("production", "wf", &["b"], false)).await;
    assert_eq!(accepted.status, JobStatus::Completed, "{}", accepted.result_message);
}

#[tokio::test]
async fn test_reverse_provisioning_proposes_the_live_definition() {
    let platform = platform();
    seed_live_workflow(&platform, &["a", "c"]);
    let orchestrator = orchestrator(&platform);

    let token = orchestrator.submit_reverse_provisioning(reverse_request("wf")).await;
    let job = wait_for_terminal(&orchestrator, &token).await;

    assert_eq!(job.status, JobStatus::Completed, "{}", job.result_message);
    let updates = job.updates.expect("descriptor updates");
    let workflow = &updates["spec.mesh.specific.workflow"];
    assert_eq!(workflow["settings"]["tasks"][1]["task_key"], "c");
    assert!(workflow.get("job_id").is_none());
    assert!(workflow.get("created_time").is_none());
}

#[tokio::test]
async fn test_reverse_provisioning_of_a_missing_workflow_fails() {
    let platform = platform();
    platform.seed_workspace(WORKSPACE, ProvisioningState::Succeeded);
    let orchestrator = orchestrator(&platform);

    let token = orchestrator.submit_reverse_provisioning(reverse_request("wf")).await;
    let job = wait_for_terminal(&orchestrator, &token).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.result_message.contains("not found"), "{}", job.result_message);
}

#[tokio::test]
async fn test_reverse_provisioning_requires_a_workflow_template() {
    let platform = platform();
    seed_live_workflow(&platform, &["a"]);
    let orchestrator = orchestrator(&platform);

    let mut request = reverse_request("wf");
    request.use_case_template_id = JOB_TEMPLATE.to_string();
    let token = orchestrator.submit_reverse_provisioning(request).await;
    let job = wait_for_terminal(&orchestrator, &token).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.result_message.contains("not supported by this"));
    assert!(platform.calls().is_empty());
}

#[tokio::test]
async fn test_imported_definition_can_then_be_provisioned() {
    let platform = platform();
    seed_live_workflow(&platform, &["a"]);
    let orchestrator = orchestrator(&platform);

    let token = orchestrator.submit_reverse_provisioning(reverse_request("wf")).await;
    let reverse = wait_for_terminal(&orchestrator, &token).await;
    let imported = &reverse.updates.expect("descriptor updates")["spec.mesh.specific.workflow"];
    let tasks: Vec<String> = imported["settings"]["tasks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["task_key"].as_str().unwrap().to_string())
        .collect();
    let tasks: Vec<&str> = tasks.iter().map(String::as_str).collect();

    let job = provision(&orchestrator, workflow_descriptor("development", "wf", &tasks, false)).await;

    assert_eq!(job.status, JobStatus::Completed, "{}", job.result_message);
}
