//! Orchestration Integration Tests
//!
//! Submit requests through the orchestrator and poll their tokens, the way
//! callers do.

pub mod job_status_test;
pub mod output_port_test;
pub mod provisioning_test;
pub mod unprovisioning_test;
pub mod workflow_test;
