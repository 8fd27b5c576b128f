//! Typed `specific` payloads for every supported component type.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Git reference kind used by job sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GitReferenceType {
    Branch,
    Tag,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitSpec {
    pub git_repo_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobGitSpec {
    pub git_repo_url: String,
    pub git_reference: String,
    pub git_reference_type: GitReferenceType,
    /// Notebook path relative to the repository root
    pub git_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    pub cluster_spark_version: String,
    pub node_type_id: String,
    pub num_workers: u32,
    #[serde(default)]
    pub spot_bid_max_price: Option<f64>,
    #[serde(default)]
    pub first_on_demand: Option<u32>,
    #[serde(default)]
    pub spot_instances: bool,
    #[serde(default)]
    pub availability: Option<String>,
    #[serde(default)]
    pub driver_node_type_id: Option<String>,
    #[serde(default)]
    pub spark_conf: BTreeMap<String, String>,
    #[serde(default)]
    pub spark_env_vars: BTreeMap<String, String>,
    #[serde(default)]
    pub runtime_engine: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulingSpec {
    pub cron_expression: String,
    pub java_timezone_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSpecific {
    pub workspace: String,
    pub job_name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub repo_path: String,
    pub git: JobGitSpec,
    pub cluster: ClusterSpec,
    #[serde(default)]
    pub scheduling: Option<SchedulingSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineClusterSpec {
    pub min_workers: u32,
    pub max_workers: u32,
    pub worker_type: String,
    pub driver_type: String,
    #[serde(default)]
    pub policy_id: Option<String>,
    #[serde(default)]
    pub spark_conf: BTreeMap<String, String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSpec {
    pub mail: String,
    #[serde(default)]
    pub alert: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSpecific {
    pub workspace: String,
    pub pipeline_name: String,
    pub product_edition: String,
    #[serde(default)]
    pub continuous: bool,
    #[serde(default)]
    pub notebooks: Vec<String>,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub catalog: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub photon: bool,
    #[serde(default)]
    pub notifications: Vec<NotificationSpec>,
    #[serde(default = "default_channel")]
    pub channel: String,
    pub cluster: PipelineClusterSpec,
    pub repo_path: String,
    pub git: GitSpec,
}

fn default_channel() -> String {
    "CURRENT".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSpecific {
    pub workspace: String,
    pub repo_path: String,
    pub git: GitSpec,
    /// Job object in the Jobs API shape (`settings` plus server fields)
    pub workflow: serde_json::Value,
    /// Allow replacing a live workflow that differs from this definition
    #[serde(rename = "override", default)]
    pub override_existing: bool,
}

impl WorkflowSpecific {
    pub fn settings(&self) -> Option<&serde_json::Value> {
        self.workflow.get("settings").filter(|s| s.is_object())
    }

    pub fn workflow_name(&self) -> Option<&str> {
        self.settings()
            .and_then(|s| s.get("name"))
            .and_then(serde_json::Value::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceTableSpec {
    pub catalog_name: String,
    pub schema_name: String,
    pub table_name: String,
}

impl SourceTableSpec {
    pub fn full_name(&self) -> String {
        format!(
            "{}.{}.{}",
            self.catalog_name, self.schema_name, self.table_name
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputPortSpecific {
    pub workspace: String,
    pub catalog_name: String,
    pub schema_name: String,
    pub view_name: String,
    pub source_table: SourceTableSpec,
}

/// Shared accessors of workload components backed by a repository
pub trait WorkloadSpec {
    fn workspace(&self) -> &str;
    fn repo_path(&self) -> &str;
    fn repo_url(&self) -> &str;
}

impl WorkloadSpec for JobSpecific {
    fn workspace(&self) -> &str {
        &self.workspace
    }
    fn repo_path(&self) -> &str {
        &self.repo_path
    }
    fn repo_url(&self) -> &str {
        &self.git.git_repo_url
    }
}

impl WorkloadSpec for PipelineSpecific {
    fn workspace(&self) -> &str {
        &self.workspace
    }
    fn repo_path(&self) -> &str {
        &self.repo_path
    }
    fn repo_url(&self) -> &str {
        &self.git.git_repo_url
    }
}

impl WorkloadSpec for WorkflowSpecific {
    fn workspace(&self) -> &str {
        &self.workspace
    }
    fn repo_path(&self) -> &str {
        &self.repo_path
    }
    fn repo_url(&self) -> &str {
        &self.git.git_repo_url
    }
}
