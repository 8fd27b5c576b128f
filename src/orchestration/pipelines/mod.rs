//! # Composite Provisioning Pipelines
//!
//! One ordered chain per component type. Steps run strictly in sequence and
//! the chain stops at the first failed step (`?`); only deletion loops
//! accumulate problems. Pipelines hold no state of their own.
//!
//! - [`job`] - notebook jobs
//! - [`dlt`] - declarative (DLT) pipelines
//! - [`workflow`] - multi-task workflows, with override validation and
//!   reverse provisioning
//! - [`output_port`] - catalog views and their grants

pub mod common;
pub mod dlt;
pub mod job;
pub mod output_port;
pub mod workflow;

use crate::config::ProvisionerConfig;
use crate::gateways::Gateways;
use crate::models::ProvisioningInfo;
use std::sync::Arc;

/// Collaborators shared by every pipeline run
#[derive(Clone)]
pub struct ProvisioningContext {
    pub config: Arc<ProvisionerConfig>,
    pub gateways: Gateways,
}

impl ProvisioningContext {
    pub fn new(config: Arc<ProvisionerConfig>, gateways: Gateways) -> Self {
        Self { config, gateways }
    }
}

/// Successful result of a pipeline run
#[derive(Debug, Clone, PartialEq)]
pub struct ProvisionOutcome {
    /// Id of the main remote object, when one was created or updated
    pub resource_id: Option<String>,
    pub message: String,
    pub info: Option<ProvisioningInfo>,
    /// Descriptor updates proposed to the caller
    pub updates: Option<serde_json::Value>,
}

impl ProvisionOutcome {
    pub fn provisioned(
        resource_id: impl Into<String>,
        message: impl Into<String>,
        info: ProvisioningInfo,
    ) -> Self {
        Self {
            resource_id: Some(resource_id.into()),
            message: message.into(),
            info: Some(info),
            updates: None,
        }
    }

    pub fn message_only(message: impl Into<String>) -> Self {
        Self {
            resource_id: None,
            message: message.into(),
            info: None,
            updates: None,
        }
    }

    pub fn with_updates(mut self, updates: serde_json::Value) -> Self {
        self.updates = Some(updates);
        self
    }
}
