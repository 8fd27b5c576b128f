use crate::common::*;
use provisioner_core::gateways::memory::InMemoryPlatform;
use provisioner_core::models::{
    CatalogPrivilege, Grant, JobStatus, ProvisioningRequest, ProvisioningState, UpdateAclRequest,
};
use provisioner_core::orchestration::ProvisioningDirection;
use provisioner_core::Orchestrator;

fn platform_with_source_table() -> InMemoryPlatform {
    let platform = platform();
    platform.seed_workspace(WORKSPACE, ProvisioningState::Succeeded);
    platform.seed_table(WORKSPACE, SOURCE_TABLE);
    platform
}

async fn run(
    orchestrator: &Orchestrator,
    direction: ProvisioningDirection,
) -> provisioner_core::models::ProvisioningJob {
    let token = orchestrator
        .submit(
            ProvisioningRequest::component(output_port_descriptor()),
            direction,
        )
        .await;
    wait_for_terminal(orchestrator, &token).await
}

fn holders(platform: &InMemoryPlatform, privilege: CatalogPrivilege) -> Vec<String> {
    let mut principals: Vec<String> = platform
        .grants(WORKSPACE, VIEW_FULL_NAME)
        .into_iter()
        .filter(|g| g.privilege == privilege)
        .map(|g| g.principal)
        .collect();
    principals.sort();
    principals
}

#[tokio::test]
async fn test_view_is_created_with_owner_and_developer_grants() {
    let platform = platform_with_source_table();
    let orchestrator = orchestrator(&platform);

    let job = run(&orchestrator, ProvisioningDirection::Provision).await;

    assert_eq!(job.status, JobStatus::Completed, "{}", job.result_message);
    let info = job.info.expect("provisioning info");
    assert_eq!(info["viewFullName"].value, VIEW_FULL_NAME);

    let views = platform.views(WORKSPACE);
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].source_table, SOURCE_TABLE);
    assert_eq!(holders(&platform, CatalogPrivilege::AllPrivileges), vec![OWNER_EMAIL]);
    assert_eq!(holders(&platform, CatalogPrivilege::Select), vec![DEV_GROUP]);
}

#[tokio::test]
async fn test_output_port_never_creates_the_workspace() {
    let platform = platform();
    let orchestrator = orchestrator(&platform);

    let job = run(&orchestrator, ProvisioningDirection::Provision).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.result_message.contains("does not exist"), "{}", job.result_message);
    assert_eq!(platform.call_count("workspace.create_if_absent"), 0);
}

#[tokio::test]
async fn test_missing_source_table_fails_before_the_view() {
    let platform = platform();
    platform.seed_workspace(WORKSPACE, ProvisioningState::Succeeded);
    let orchestrator = orchestrator(&platform);

    let job = run(&orchestrator, ProvisioningDirection::Provision).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.result_message.contains(SOURCE_TABLE), "{}", job.result_message);
    assert_eq!(platform.call_count("view.create"), 0);
}

#[tokio::test]
async fn test_view_is_unprovisioned() {
    let platform = platform_with_source_table();
    let orchestrator = orchestrator(&platform);

    let provisioned = run(&orchestrator, ProvisioningDirection::Provision).await;
    assert_eq!(provisioned.status, JobStatus::Completed, "{}", provisioned.result_message);

    let job = run(&orchestrator, ProvisioningDirection::Unprovision).await;

    assert_eq!(job.status, JobStatus::Completed, "{}", job.result_message);
    assert!(platform.views(WORKSPACE).is_empty());
}

#[tokio::test]
async fn test_update_acl_grants_listed_consumers_and_revokes_the_rest() {
    let platform = platform_with_source_table();
    platform.add_user("alice@example.com");
    platform.add_user("bob@example.com");
    platform.add_group("analysts");
    let orchestrator = orchestrator(&platform);

    let provisioned = run(&orchestrator, ProvisioningDirection::Provision).await;
    assert_eq!(provisioned.status, JobStatus::Completed, "{}", provisioned.result_message);
    platform.seed_grant(
        WORKSPACE,
        VIEW_FULL_NAME,
        Grant {
            principal: "bob@example.com".to_string(),
            privilege: CatalogPrivilege::Select,
        },
    );

    let job = orchestrator
        .update_acl(UpdateAclRequest {
            refs: vec![
                "user:alice_example.com".to_string(),
                "group:analysts".to_string(),
            ],
            descriptor: output_port_descriptor(),
        })
        .await;

    assert_eq!(job.status, JobStatus::Completed, "{}", job.result_message);
    assert_eq!(
        holders(&platform, CatalogPrivilege::Select),
        vec!["alice@example.com", "analysts", DEV_GROUP]
    );
    assert_eq!(orchestrator.get_status(&job.token).await.status, JobStatus::Completed);
}

#[tokio::test]
async fn test_update_acl_keeps_going_after_an_unknown_principal() {
    let platform = platform_with_source_table();
    platform.add_user("alice@example.com");
    let orchestrator = orchestrator(&platform);

    let provisioned = run(&orchestrator, ProvisioningDirection::Provision).await;
    assert_eq!(provisioned.status, JobStatus::Completed, "{}", provisioned.result_message);

    let job = orchestrator
        .update_acl(UpdateAclRequest {
            refs: vec![
                "user:ghost_example.com".to_string(),
                "user:alice_example.com".to_string(),
            ],
            descriptor: output_port_descriptor(),
        })
        .await;

    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.result_message.contains("ghost@example.com"), "{}", job.result_message);
    assert!(holders(&platform, CatalogPrivilege::Select).contains(&"alice@example.com".to_string()));
}

#[tokio::test]
async fn test_update_acl_is_rejected_for_workloads() {
    let platform = platform();
    let orchestrator = orchestrator(&platform);

    let job = orchestrator
        .update_acl(UpdateAclRequest {
            refs: vec!["group:analysts".to_string()],
            descriptor: job_descriptor("etl"),
        })
        .await;

    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.result_message.contains("only supported for output ports"));
    assert!(platform.calls().is_empty());
}

#[tokio::test]
async fn test_output_port_with_unknown_template_is_rejected() {
    let platform = platform_with_source_table();
    let orchestrator = orchestrator(&platform);
    let descriptor =
        output_port_descriptor().replace(OUTPUT_PORT_TEMPLATE, "urn:dmb:utm:unknown-outputport:9.9.9");

    let validation = orchestrator.validate(&ProvisioningRequest::component(descriptor.clone()));
    assert!(!validation.valid);
    assert!(validation.errors[0].contains("not supported by this provisioner"));

    let calls_before = platform.calls().len();
    let token = orchestrator
        .submit(
            ProvisioningRequest::component(descriptor),
            ProvisioningDirection::Provision,
        )
        .await;
    let job = wait_for_terminal(&orchestrator, &token).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert!(
        job.result_message.contains("urn:dmb:utm:unknown-outputport:9.9.9"),
        "{}",
        job.result_message
    );
    assert_eq!(platform.calls().len(), calls_before);
    assert!(platform.views(WORKSPACE).is_empty());
}
