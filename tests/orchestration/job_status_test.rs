use crate::common::*;
use provisioner_core::models::{JobStatus, JobToken, ProvisioningRequest};
use provisioner_core::orchestration::ProvisioningDirection;
use std::time::Duration;

#[tokio::test]
async fn test_token_is_known_right_after_submit() {
    let platform = platform().with_latency(Duration::from_millis(20));
    let orchestrator = orchestrator(&platform);

    let token = orchestrator
        .submit(
            ProvisioningRequest::component(job_descriptor("etl")),
            ProvisioningDirection::Provision,
        )
        .await;

    let job = orchestrator.get_status(&token).await;
    assert_ne!(job.status, JobStatus::Failed, "fresh token reported as {job:?}");
    assert!(!job.result_message.contains("No provisioning job found"));

    let job = wait_for_terminal(&orchestrator, &token).await;
    assert_eq!(job.status, JobStatus::Completed, "{}", job.result_message);
}

#[tokio::test]
async fn test_unknown_token_is_reported_failed() {
    let orchestrator = orchestrator(&platform());

    let job = orchestrator.get_status(&JobToken::from("no-such-token")).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.result_message.contains("no-such-token"));
}

#[tokio::test]
async fn test_invalid_descriptor_ends_as_failed_job() {
    let orchestrator = orchestrator(&platform());

    let token = orchestrator
        .submit(
            ProvisioningRequest::component("dataProduct: ["),
            ProvisioningDirection::Provision,
        )
        .await;
    let job = wait_for_terminal(&orchestrator, &token).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.completed_at.is_some());
}

#[tokio::test]
async fn test_concurrent_jobs_all_reach_a_terminal_state() {
    let platform = platform().with_latency(Duration::from_millis(5));
    let mut config = provisioner_core::ProvisionerConfig::default();
    config.orchestrator.max_concurrent_jobs = 2;
    let orchestrator = orchestrator_with(&platform, config);

    let mut tokens = Vec::new();
    for index in 0..6 {
        let token = orchestrator
            .submit(
                ProvisioningRequest::component(job_descriptor(&format!("etl-{index}"))),
                ProvisioningDirection::Provision,
            )
            .await;
        tokens.push(token);
    }

    for token in &tokens {
        let job = wait_for_terminal(&orchestrator, token).await;
        assert_eq!(job.status, JobStatus::Completed, "{}", job.result_message);
    }
    assert_eq!(platform.jobs(WORKSPACE).len(), 6);
    assert!(orchestrator.worker_pool().active_workers() <= 2);
}

#[tokio::test]
async fn test_validate_does_not_schedule_anything() {
    let platform = platform();
    let orchestrator = orchestrator(&platform);

    let result = orchestrator.validate(&ProvisioningRequest::component(job_descriptor("etl")));

    assert!(result.valid, "{:?}", result.errors);
    assert!(platform.calls().is_empty());
}
