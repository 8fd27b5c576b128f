//! # Provisioner Configuration
//!
//! Typed configuration for the provisioning engine, loaded from YAML files
//! with environment-specific overrides (see [`loader::ConfigManager`]).
//!
//! ## Usage
//!
//! ```rust,no_run
//! use provisioner_core::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let pool_size = manager.config().orchestrator.max_concurrent_jobs;
//! # Ok(())
//! # }
//! ```

pub mod loader;

use crate::error::{ProvisionerError, Result};
use crate::models::resource::{CatalogPrivilege, PermissionLevel};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub use loader::ConfigManager;

/// Root configuration structure mirroring `config/provisioner/*.yaml`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProvisionerConfig {
    /// Background execution settings
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    /// Environment naming
    #[serde(default)]
    pub environments: EnvironmentsConfig,

    /// Workspace creation and access settings
    #[serde(default)]
    pub workspace: WorkspaceConfig,

    /// Source control settings for registered repositories
    #[serde(default)]
    pub git: GitConfig,

    /// Permission levels applied to provisioned objects
    #[serde(default)]
    pub permissions: PermissionsConfig,

    /// Use-case template ids used to classify components
    #[serde(default)]
    pub templates: TemplatesConfig,
}

impl ProvisionerConfig {
    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.orchestrator.max_concurrent_jobs == 0 {
            return Err(ProvisionerError::ConfigurationError(
                "orchestrator.max_concurrent_jobs must be greater than zero".to_string(),
            ));
        }

        if self.workspace.region.trim().is_empty() {
            return Err(ProvisionerError::ConfigurationError(
                "workspace.region must not be empty".to_string(),
            ));
        }

        if self.environments.development.trim().is_empty() {
            return Err(ProvisionerError::ConfigurationError(
                "environments.development must not be empty".to_string(),
            ));
        }

        self.templates.validate()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OrchestratorConfig {
    /// Maximum number of provisioning jobs running at the same time
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: default_max_concurrent_jobs(),
        }
    }
}

fn default_max_concurrent_jobs() -> usize {
    8
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EnvironmentsConfig {
    /// Environment in which workflow drift must be reconciled through
    /// reverse provisioning before it can be overwritten
    #[serde(default = "default_development_environment")]
    pub development: String,
}

impl Default for EnvironmentsConfig {
    fn default() -> Self {
        Self {
            development: default_development_environment(),
        }
    }
}

impl EnvironmentsConfig {
    pub fn is_development(&self, environment: &str) -> bool {
        self.development.eq_ignore_ascii_case(environment)
    }
}

fn default_development_environment() -> String {
    "development".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkspaceConfig {
    /// Create missing workspaces instead of failing
    #[serde(default = "default_true")]
    pub managed: bool,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default = "default_sku")]
    pub sku: String,
    #[serde(default)]
    pub resource_group: Option<String>,
    /// Role granted on the workspace resource to owner and developers
    #[serde(default = "default_workspace_role")]
    pub workspace_role: String,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            managed: true,
            region: default_region(),
            sku: default_sku(),
            resource_group: None,
            workspace_role: default_workspace_role(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_region() -> String {
    "westeurope".to_string()
}

fn default_sku() -> String {
    "premium".to_string()
}

fn default_workspace_role() -> String {
    "Contributor".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GitConfig {
    #[serde(default = "default_git_provider")]
    pub provider: String,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            provider: default_git_provider(),
        }
    }
}

fn default_git_provider() -> String {
    "gitLab".to_string()
}

/// Permission level for the data product owner and the developer group
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObjectPermissions {
    pub owner: PermissionLevel,
    pub developers: PermissionLevel,
}

impl Default for ObjectPermissions {
    fn default() -> Self {
        Self {
            owner: PermissionLevel::CanManage,
            developers: PermissionLevel::CanManage,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputPortPermissions {
    #[serde(default = "default_owner_privileges")]
    pub owner: Vec<CatalogPrivilege>,
    #[serde(default = "default_developer_privileges")]
    pub developers: Vec<CatalogPrivilege>,
    /// Privilege managed through access-control updates
    #[serde(default = "default_consumer_privilege")]
    pub consumers: CatalogPrivilege,
}

impl Default for OutputPortPermissions {
    fn default() -> Self {
        Self {
            owner: default_owner_privileges(),
            developers: default_developer_privileges(),
            consumers: default_consumer_privilege(),
        }
    }
}

fn default_owner_privileges() -> Vec<CatalogPrivilege> {
    vec![CatalogPrivilege::AllPrivileges]
}

fn default_developer_privileges() -> Vec<CatalogPrivilege> {
    vec![CatalogPrivilege::Select]
}

fn default_consumer_privilege() -> CatalogPrivilege {
    CatalogPrivilege::Select
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PermissionsConfig {
    #[serde(default)]
    pub job: ObjectPermissions,
    #[serde(default)]
    pub pipeline: ObjectPermissions,
    #[serde(default)]
    pub repository: ObjectPermissions,
    #[serde(default)]
    pub output_port: OutputPortPermissions,
}

/// Use-case template ids per component type
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TemplatesConfig {
    #[serde(default = "default_job_templates")]
    pub job: Vec<String>,
    #[serde(default = "default_pipeline_templates")]
    pub pipeline: Vec<String>,
    #[serde(default = "default_workflow_templates")]
    pub workflow: Vec<String>,
    #[serde(default = "default_output_port_templates")]
    pub output_port: Vec<String>,
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            job: default_job_templates(),
            pipeline: default_pipeline_templates(),
            workflow: default_workflow_templates(),
            output_port: default_output_port_templates(),
        }
    }
}

impl TemplatesConfig {
    fn validate(&self) -> Result<()> {
        let lists = [
            ("job", &self.job),
            ("pipeline", &self.pipeline),
            ("workflow", &self.workflow),
            ("output_port", &self.output_port),
        ];

        let mut seen = HashSet::new();
        for (section, ids) in lists {
            if ids.is_empty() {
                return Err(ProvisionerError::ConfigurationError(format!(
                    "templates.{section} must list at least one use-case template id"
                )));
            }
            for id in ids {
                if !seen.insert(id.as_str()) {
                    return Err(ProvisionerError::ConfigurationError(format!(
                        "use-case template id '{id}' is configured for more than one component type"
                    )));
                }
            }
        }

        Ok(())
    }
}

fn default_job_templates() -> Vec<String> {
    vec!["urn:dmb:utm:databricks-workload-job-template:0.0.0".to_string()]
}

fn default_pipeline_templates() -> Vec<String> {
    vec!["urn:dmb:utm:databricks-workload-dlt-template:0.0.0".to_string()]
}

fn default_workflow_templates() -> Vec<String> {
    vec!["urn:dmb:utm:databricks-workload-workflow-template:0.0.0".to_string()]
}

fn default_output_port_templates() -> Vec<String> {
    vec!["urn:dmb:utm:databricks-outputport-template:0.0.0".to_string()]
}
