use crate::common::*;
use provisioner_core::models::{JobDefinition, JobStatus, ProvisioningRequest, ProvisioningState};
use provisioner_core::orchestration::ProvisioningDirection;
use provisioner_core::Orchestrator;

async fn unprovision(
    orchestrator: &Orchestrator,
    request: ProvisioningRequest,
) -> provisioner_core::models::ProvisioningJob {
    let token = orchestrator
        .submit(request, ProvisioningDirection::Unprovision)
        .await;
    wait_for_terminal(orchestrator, &token).await
}

fn etl_job() -> JobDefinition {
    JobDefinition {
        name: "etl".to_string(),
        settings: serde_json::json!({ "name": "etl" }),
    }
}

#[tokio::test]
async fn test_missing_workspace_is_a_successful_no_op() {
    let platform = platform();
    let orchestrator = orchestrator(&platform);

    let job = unprovision(
        &orchestrator,
        ProvisioningRequest::component(job_descriptor("etl")),
    )
    .await;

    assert_eq!(job.status, JobStatus::Completed, "{}", job.result_message);
    assert!(job.result_message.contains("skipped"));
    assert_eq!(platform.call_count("session.open"), 0);
    assert!(platform.workspace(WORKSPACE).is_none());
}

#[tokio::test]
async fn test_workspace_that_is_not_ready_fails_unprovision() {
    let platform = platform();
    platform.seed_workspace(WORKSPACE, ProvisioningState::Updating);
    let orchestrator = orchestrator(&platform);

    let job = unprovision(
        &orchestrator,
        ProvisioningRequest::component(job_descriptor("etl")),
    )
    .await;

    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.result_message.contains("must be Succeeded"), "{}", job.result_message);
}

#[tokio::test]
async fn test_every_job_with_the_name_is_removed() {
    let platform = platform();
    platform.seed_workspace(WORKSPACE, ProvisioningState::Succeeded);
    for _ in 0..3 {
        platform.seed_job(WORKSPACE, etl_job());
    }
    let orchestrator = orchestrator(&platform);

    let job = unprovision(
        &orchestrator,
        ProvisioningRequest::component(job_descriptor("etl")),
    )
    .await;

    assert_eq!(job.status, JobStatus::Completed, "{}", job.result_message);
    assert!(platform.jobs(WORKSPACE).is_empty());
    assert!(job.result_message.contains("3 removed"), "{}", job.result_message);
}

#[tokio::test]
async fn test_one_failed_deletion_reports_exactly_one_problem() {
    let platform = platform();
    platform.seed_workspace(WORKSPACE, ProvisioningState::Succeeded);
    let ids: Vec<String> = (0..3).map(|_| platform.seed_job(WORKSPACE, etl_job())).collect();
    platform.fail_on(&format!("job.delete:{}", ids[1]));
    let orchestrator = orchestrator(&platform);

    let job = unprovision(
        &orchestrator,
        ProvisioningRequest::component(job_descriptor("etl")),
    )
    .await;

    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.result_message.lines().count(), 1, "{}", job.result_message);
    assert!(job.result_message.contains(&ids[1]));
    assert_eq!(platform.call_count("job.delete"), 3);

    let remaining: Vec<String> = platform.jobs(WORKSPACE).into_iter().map(|(id, _)| id).collect();
    assert_eq!(remaining, vec![ids[1].clone()]);
}

#[tokio::test]
async fn test_repository_is_removed_only_with_remove_data() {
    let platform = platform();
    let orchestrator = orchestrator(&platform);

    let token = orchestrator
        .submit(
            ProvisioningRequest::component(job_descriptor("etl")),
            ProvisioningDirection::Provision,
        )
        .await;
    let provisioned = wait_for_terminal(&orchestrator, &token).await;
    assert_eq!(provisioned.status, JobStatus::Completed, "{}", provisioned.result_message);

    let kept = unprovision(
        &orchestrator,
        ProvisioningRequest::component(job_descriptor("etl")),
    )
    .await;
    assert_eq!(kept.status, JobStatus::Completed, "{}", kept.result_message);
    assert_eq!(platform.repositories(WORKSPACE).len(), 1);
    assert!(platform.jobs(WORKSPACE).is_empty());

    let removed = unprovision(
        &orchestrator,
        ProvisioningRequest::component(job_descriptor("etl")).with_remove_data(true),
    )
    .await;
    assert_eq!(removed.status, JobStatus::Completed, "{}", removed.result_message);
    assert!(platform.repositories(WORKSPACE).is_empty());
}

#[tokio::test]
async fn test_dlt_pipeline_is_unprovisioned() {
    let platform = platform();
    let orchestrator = orchestrator(&platform);

    let token = orchestrator
        .submit(
            ProvisioningRequest::component(dlt_descriptor("orders")),
            ProvisioningDirection::Provision,
        )
        .await;
    wait_for_terminal(&orchestrator, &token).await;
    assert_eq!(platform.pipelines(WORKSPACE).len(), 1);

    let job = unprovision(
        &orchestrator,
        ProvisioningRequest::component(dlt_descriptor("orders")),
    )
    .await;

    assert_eq!(job.status, JobStatus::Completed, "{}", job.result_message);
    assert!(platform.pipelines(WORKSPACE).is_empty());
}
