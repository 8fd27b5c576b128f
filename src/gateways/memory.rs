//! In-memory platform implementing every gateway contract.
//!
//! Backs the test suite and local dry runs. Every call is recorded in an
//! ordered call log (`"<kind>.<operation>:<target>"`) and any call can be made
//! to fail by registering its key, or just `"<kind>.<operation>"` to fail
//! every call of that operation.

use super::{
    CatalogGateway, IdentityGateway, JobGateway, PermissionGateway, PipelineGateway,
    RepositoryGateway, ResourceGateway, ViewGateway, WorkspaceGateway, WorkspaceSession,
    WorkspaceSessionFactory,
};
use crate::models::{
    CatalogPrivilege, DeleteOutcome, Grant, JobDefinition, PermissionLevel, PipelineDefinition,
    Principal, PrincipalRef, ProvisioningState, RemoteResource, RepoCreation, RepoInfo,
    ResourceRef, SecuredObject, ViewDefinition, WorkspaceInfo, WorkspaceParams,
};
use crate::problem::{FailedOperation, OpResult, Problem};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
struct StoredJob {
    definition: JobDefinition,
    server_fields: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Default)]
struct WorkspaceData {
    jobs: BTreeMap<String, StoredJob>,
    pipelines: BTreeMap<String, PipelineDefinition>,
    views: BTreeMap<String, ViewDefinition>,
    catalogs: BTreeSet<String>,
    schemas: BTreeSet<String>,
    tables: BTreeSet<String>,
    grants: BTreeMap<String, Vec<Grant>>,
    repos: BTreeMap<String, RepoInfo>,
    permissions: Vec<(SecuredObject, String, PermissionLevel)>,
}

#[derive(Debug)]
struct PlatformState {
    workspaces: BTreeMap<String, WorkspaceInfo>,
    data: HashMap<String, WorkspaceData>,
    users: HashSet<String>,
    groups: HashSet<String>,
    role_assignments: Vec<(String, String, String)>,
    new_workspace_state: ProvisioningState,
    calls: Vec<String>,
    failures: HashSet<String>,
    next_id: u64,
}

impl PlatformState {
    fn next_id(&mut self) -> String {
        self.next_id += 1;
        self.next_id.to_string()
    }

    fn data(&mut self, workspace: &str) -> &mut WorkspaceData {
        self.data.entry(workspace.to_string()).or_default()
    }

    /// Record a call and fail it if injected
    fn call(&mut self, key: String) -> OpResult<()> {
        let operation = key.split(':').next().unwrap_or_default().to_string();
        let rejected = self.failures.contains(&key) || self.failures.contains(&operation);
        self.calls.push(key.clone());

        if rejected {
            return Err(FailedOperation::new(Problem::with_cause(
                format!("Remote call '{key}' failed"),
                anyhow::anyhow!("injected failure"),
            )));
        }
        Ok(())
    }
}

/// Shared in-memory platform; clones see the same state
#[derive(Debug, Clone)]
pub struct InMemoryPlatform {
    state: Arc<Mutex<PlatformState>>,
    latency: Option<Duration>,
}

impl Default for InMemoryPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryPlatform {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(PlatformState {
                workspaces: BTreeMap::new(),
                data: HashMap::new(),
                users: HashSet::new(),
                groups: HashSet::new(),
                role_assignments: Vec::new(),
                new_workspace_state: ProvisioningState::Succeeded,
                calls: Vec::new(),
                failures: HashSet::new(),
                next_id: 0,
            })),
            latency: None,
        }
    }

    /// Delay every remote call, to observe in-flight jobs
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    async fn delay(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    // ----- seeding -----

    pub fn add_user(&self, email: &str) {
        self.state.lock().users.insert(email.to_string());
    }

    pub fn add_group(&self, name: &str) {
        self.state.lock().groups.insert(name.to_string());
    }

    /// State newly created workspaces start in
    pub fn set_new_workspace_state(&self, state: ProvisioningState) {
        self.state.lock().new_workspace_state = state;
    }

    pub fn seed_workspace(&self, name: &str, state: ProvisioningState) -> WorkspaceInfo {
        let mut guard = self.state.lock();
        let info = build_workspace(&mut guard, name, "westeurope", state);
        guard.workspaces.insert(name.to_string(), info.clone());
        info
    }

    pub fn set_workspace_state(&self, name: &str, state: ProvisioningState) {
        if let Some(ws) = self.state.lock().workspaces.get_mut(name) {
            ws.provisioning_state = state;
        }
    }

    /// Insert a job directly, bypassing the call log
    pub fn seed_job(&self, workspace: &str, definition: JobDefinition) -> String {
        let mut guard = self.state.lock();
        let id = guard.next_id();
        let server_fields = job_server_fields(&id);
        guard.data(workspace).jobs.insert(
            id.clone(),
            StoredJob {
                definition,
                server_fields,
            },
        );
        id
    }

    pub fn seed_pipeline(&self, workspace: &str, definition: PipelineDefinition) -> String {
        let mut guard = self.state.lock();
        let id = guard.next_id();
        guard.data(workspace).pipelines.insert(id.clone(), definition);
        id
    }

    pub fn seed_table(&self, workspace: &str, full_name: &str) {
        self.state
            .lock()
            .data(workspace)
            .tables
            .insert(full_name.to_string());
    }

    pub fn seed_view(&self, workspace: &str, definition: ViewDefinition) {
        self.state
            .lock()
            .data(workspace)
            .views
            .insert(definition.full_name(), definition);
    }

    pub fn seed_grant(&self, workspace: &str, full_name: &str, grant: Grant) {
        self.state
            .lock()
            .data(workspace)
            .grants
            .entry(full_name.to_string())
            .or_default()
            .push(grant);
    }

    /// Make calls matching `key` fail, e.g. `"job.delete:2"` or `"repository.create"`
    pub fn fail_on(&self, key: &str) {
        self.state.lock().failures.insert(key.to_string());
    }

    // ----- inspection -----

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    /// Number of recorded calls of `"<kind>.<operation>"`
    pub fn call_count(&self, operation: &str) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.split(':').next() == Some(operation))
            .count()
    }

    pub fn workspace(&self, name: &str) -> Option<WorkspaceInfo> {
        self.state.lock().workspaces.get(name).cloned()
    }

    pub fn jobs(&self, workspace: &str) -> Vec<(String, JobDefinition)> {
        let mut guard = self.state.lock();
        guard
            .data(workspace)
            .jobs
            .iter()
            .map(|(id, job)| (id.clone(), job.definition.clone()))
            .collect()
    }

    pub fn pipelines(&self, workspace: &str) -> Vec<(String, PipelineDefinition)> {
        let mut guard = self.state.lock();
        guard
            .data(workspace)
            .pipelines
            .iter()
            .map(|(id, p)| (id.clone(), p.clone()))
            .collect()
    }

    pub fn views(&self, workspace: &str) -> Vec<ViewDefinition> {
        let mut guard = self.state.lock();
        guard.data(workspace).views.values().cloned().collect()
    }

    pub fn repositories(&self, workspace: &str) -> Vec<RepoInfo> {
        let mut guard = self.state.lock();
        guard.data(workspace).repos.values().cloned().collect()
    }

    pub fn grants(&self, workspace: &str, full_name: &str) -> Vec<Grant> {
        let mut guard = self.state.lock();
        guard
            .data(workspace)
            .grants
            .get(full_name)
            .cloned()
            .unwrap_or_default()
    }

    pub fn object_permissions(&self, workspace: &str) -> Vec<(SecuredObject, String, PermissionLevel)> {
        let mut guard = self.state.lock();
        guard.data(workspace).permissions.clone()
    }

    pub fn role_assignments(&self) -> Vec<(String, String, String)> {
        self.state.lock().role_assignments.clone()
    }

    fn session_for(&self, workspace: &WorkspaceInfo) -> InMemorySession {
        InMemorySession {
            workspace: workspace.clone(),
            jobs: Arc::new(InMemoryJobs {
                platform: self.clone(),
                workspace: workspace.name.clone(),
            }),
            pipelines: Arc::new(InMemoryPipelines {
                platform: self.clone(),
                workspace: workspace.name.clone(),
            }),
            views: Arc::new(InMemoryViews {
                platform: self.clone(),
                workspace: workspace.name.clone(),
            }),
            catalog: Arc::new(InMemoryCatalog {
                platform: self.clone(),
                workspace: workspace.name.clone(),
            }),
            repositories: Arc::new(InMemoryRepositories {
                platform: self.clone(),
                workspace: workspace.name.clone(),
            }),
            identity: Arc::new(InMemoryIdentity {
                platform: self.clone(),
                workspace: workspace.name.clone(),
            }),
        }
    }
}

fn build_workspace(
    state: &mut PlatformState,
    name: &str,
    region: &str,
    provisioning_state: ProvisioningState,
) -> WorkspaceInfo {
    let id = state.next_id();
    WorkspaceInfo {
        id: id.clone(),
        name: name.to_string(),
        resource_id: format!("/subscriptions/local/resourceGroups/local/providers/Microsoft.Databricks/workspaces/{name}"),
        host: format!("adb-{id}.azuredatabricks.net"),
        region: region.to_string(),
        provisioning_state,
    }
}

fn job_server_fields(id: &str) -> serde_json::Map<String, serde_json::Value> {
    let mut fields = serde_json::Map::new();
    fields.insert("job_id".to_string(), json!(id));
    fields.insert("created_time".to_string(), json!(Utc::now().timestamp_millis()));
    fields.insert("creator_user_name".to_string(), json!("provisioner@local"));
    fields.insert("run_as_user_name".to_string(), json!("provisioner@local"));
    fields
}

#[async_trait]
impl WorkspaceGateway for InMemoryPlatform {
    async fn create_if_absent(
        &self,
        name: &str,
        region: &str,
        _params: &WorkspaceParams,
    ) -> OpResult<WorkspaceInfo> {
        self.delay().await;
        let mut guard = self.state.lock();
        guard.call(format!("workspace.create_if_absent:{name}"))?;

        if let Some(existing) = guard.workspaces.get(name) {
            return Ok(existing.clone());
        }

        let initial_state = guard.new_workspace_state.clone();
        let info = build_workspace(&mut guard, name, region, initial_state);
        guard.workspaces.insert(name.to_string(), info.clone());
        Ok(info)
    }

    async fn get_by_name(&self, name: &str) -> OpResult<Option<WorkspaceInfo>> {
        self.delay().await;
        let mut guard = self.state.lock();
        guard.call(format!("workspace.get_by_name:{name}"))?;
        Ok(guard.workspaces.get(name).cloned())
    }
}

#[async_trait]
impl PermissionGateway for InMemoryPlatform {
    async fn assign_role(
        &self,
        scope_resource_id: &str,
        principal: &PrincipalRef,
        role: &str,
    ) -> OpResult<()> {
        self.delay().await;
        let mut guard = self.state.lock();
        guard.call(format!("permission.assign_role:{}", principal.external_id()))?;

        let known = if principal.is_group() {
            guard.groups.contains(principal.external_id())
        } else {
            guard.users.contains(principal.external_id())
        };
        if !known {
            return Err(FailedOperation::single(format!(
                "Principal '{}' not found in the directory while assigning role '{role}' on '{scope_resource_id}'",
                principal.external_id()
            )));
        }

        guard.role_assignments.push((
            scope_resource_id.to_string(),
            principal.external_id().to_string(),
            role.to_string(),
        ));
        Ok(())
    }
}

#[async_trait]
impl WorkspaceSessionFactory for InMemoryPlatform {
    async fn open(&self, workspace: &WorkspaceInfo) -> OpResult<Arc<dyn WorkspaceSession>> {
        self.state
            .lock()
            .call(format!("session.open:{}", workspace.name))?;
        Ok(Arc::new(self.session_for(workspace)))
    }
}

struct InMemorySession {
    workspace: WorkspaceInfo,
    jobs: Arc<JobGateway>,
    pipelines: Arc<PipelineGateway>,
    views: Arc<ViewGateway>,
    catalog: Arc<dyn CatalogGateway>,
    repositories: Arc<dyn RepositoryGateway>,
    identity: Arc<dyn IdentityGateway>,
}

impl WorkspaceSession for InMemorySession {
    fn workspace(&self) -> &WorkspaceInfo {
        &self.workspace
    }
    fn jobs(&self) -> Arc<JobGateway> {
        self.jobs.clone()
    }
    fn pipelines(&self) -> Arc<PipelineGateway> {
        self.pipelines.clone()
    }
    fn views(&self) -> Arc<ViewGateway> {
        self.views.clone()
    }
    fn catalog(&self) -> Arc<dyn CatalogGateway> {
        self.catalog.clone()
    }
    fn repositories(&self) -> Arc<dyn RepositoryGateway> {
        self.repositories.clone()
    }
    fn identity(&self) -> Arc<dyn IdentityGateway> {
        self.identity.clone()
    }
}

struct InMemoryJobs {
    platform: InMemoryPlatform,
    workspace: String,
}

#[async_trait]
impl ResourceGateway<JobDefinition> for InMemoryJobs {
    async fn list_by_name(&self, name: &str) -> OpResult<Vec<ResourceRef>> {
        self.platform.delay().await;
        let mut guard = self.platform.state.lock();
        guard.call(format!("job.list_by_name:{name}"))?;
        Ok(guard
            .data(&self.workspace)
            .jobs
            .iter()
            .filter(|(_, job)| job.definition.name == name)
            .map(|(id, job)| ResourceRef::new(id.clone(), job.definition.name.clone()))
            .collect())
    }

    async fn get(&self, id: &str) -> OpResult<Option<RemoteResource<JobDefinition>>> {
        self.platform.delay().await;
        let mut guard = self.platform.state.lock();
        guard.call(format!("job.get:{id}"))?;
        Ok(guard.data(&self.workspace).jobs.get(id).map(|job| RemoteResource {
            reference: ResourceRef::new(id, job.definition.name.clone()),
            definition: job.definition.clone(),
            server_fields: job.server_fields.clone(),
        }))
    }

    async fn create(&self, definition: &JobDefinition) -> OpResult<ResourceRef> {
        self.platform.delay().await;
        let mut guard = self.platform.state.lock();
        guard.call(format!("job.create:{}", definition.name))?;
        let id = guard.next_id();
        let server_fields = job_server_fields(&id);
        guard.data(&self.workspace).jobs.insert(
            id.clone(),
            StoredJob {
                definition: definition.clone(),
                server_fields,
            },
        );
        Ok(ResourceRef::new(id, definition.name.clone()))
    }

    async fn update(&self, id: &str, definition: &JobDefinition) -> OpResult<ResourceRef> {
        self.platform.delay().await;
        let mut guard = self.platform.state.lock();
        guard.call(format!("job.update:{id}"))?;
        match guard.data(&self.workspace).jobs.get_mut(id) {
            Some(job) => {
                job.definition = definition.clone();
                Ok(ResourceRef::new(id, definition.name.clone()))
            }
            None => Err(FailedOperation::single(format!(
                "Job {id} does not exist in workspace '{}'",
                self.workspace
            ))),
        }
    }

    async fn delete(&self, id: &str) -> OpResult<DeleteOutcome> {
        self.platform.delay().await;
        let mut guard = self.platform.state.lock();
        guard.call(format!("job.delete:{id}"))?;
        Ok(match guard.data(&self.workspace).jobs.remove(id) {
            Some(_) => DeleteOutcome::Deleted,
            None => DeleteOutcome::NotFound,
        })
    }
}

struct InMemoryPipelines {
    platform: InMemoryPlatform,
    workspace: String,
}

#[async_trait]
impl ResourceGateway<PipelineDefinition> for InMemoryPipelines {
    async fn list_by_name(&self, name: &str) -> OpResult<Vec<ResourceRef>> {
        self.platform.delay().await;
        let mut guard = self.platform.state.lock();
        guard.call(format!("pipeline.list_by_name:{name}"))?;
        Ok(guard
            .data(&self.workspace)
            .pipelines
            .iter()
            .filter(|(_, p)| p.name == name)
            .map(|(id, p)| ResourceRef::new(id.clone(), p.name.clone()))
            .collect())
    }

    async fn get(&self, id: &str) -> OpResult<Option<RemoteResource<PipelineDefinition>>> {
        self.platform.delay().await;
        let mut guard = self.platform.state.lock();
        guard.call(format!("pipeline.get:{id}"))?;
        Ok(guard.data(&self.workspace).pipelines.get(id).map(|p| RemoteResource {
            reference: ResourceRef::new(id, p.name.clone()),
            definition: p.clone(),
            server_fields: serde_json::Map::new(),
        }))
    }

    async fn create(&self, definition: &PipelineDefinition) -> OpResult<ResourceRef> {
        self.platform.delay().await;
        let mut guard = self.platform.state.lock();
        guard.call(format!("pipeline.create:{}", definition.name))?;
        let id = guard.next_id();
        guard
            .data(&self.workspace)
            .pipelines
            .insert(id.clone(), definition.clone());
        Ok(ResourceRef::new(id, definition.name.clone()))
    }

    async fn update(&self, id: &str, definition: &PipelineDefinition) -> OpResult<ResourceRef> {
        self.platform.delay().await;
        let mut guard = self.platform.state.lock();
        guard.call(format!("pipeline.update:{id}"))?;
        match guard.data(&self.workspace).pipelines.get_mut(id) {
            Some(existing) => {
                *existing = definition.clone();
                Ok(ResourceRef::new(id, definition.name.clone()))
            }
            None => Err(FailedOperation::single(format!(
                "Pipeline {id} does not exist in workspace '{}'",
                self.workspace
            ))),
        }
    }

    async fn delete(&self, id: &str) -> OpResult<DeleteOutcome> {
        self.platform.delay().await;
        let mut guard = self.platform.state.lock();
        guard.call(format!("pipeline.delete:{id}"))?;
        Ok(match guard.data(&self.workspace).pipelines.remove(id) {
            Some(_) => DeleteOutcome::Deleted,
            None => DeleteOutcome::NotFound,
        })
    }
}

struct InMemoryViews {
    platform: InMemoryPlatform,
    workspace: String,
}

#[async_trait]
impl ResourceGateway<ViewDefinition> for InMemoryViews {
    async fn list_by_name(&self, name: &str) -> OpResult<Vec<ResourceRef>> {
        self.platform.delay().await;
        let mut guard = self.platform.state.lock();
        guard.call(format!("view.list_by_name:{name}"))?;
        Ok(guard
            .data(&self.workspace)
            .views
            .keys()
            .filter(|full_name| full_name.as_str() == name)
            .map(|full_name| ResourceRef::new(full_name.clone(), full_name.clone()))
            .collect())
    }

    async fn get(&self, id: &str) -> OpResult<Option<RemoteResource<ViewDefinition>>> {
        self.platform.delay().await;
        let mut guard = self.platform.state.lock();
        guard.call(format!("view.get:{id}"))?;
        Ok(guard.data(&self.workspace).views.get(id).map(|v| RemoteResource {
            reference: ResourceRef::new(id, id),
            definition: v.clone(),
            server_fields: serde_json::Map::new(),
        }))
    }

    async fn create(&self, definition: &ViewDefinition) -> OpResult<ResourceRef> {
        self.platform.delay().await;
        let full_name = definition.full_name();
        let mut guard = self.platform.state.lock();
        guard.call(format!("view.create:{full_name}"))?;
        let data = guard.data(&self.workspace);
        if !data.tables.contains(&definition.source_table) {
            return Err(FailedOperation::single(format!(
                "Cannot create view '{full_name}': source table '{}' does not exist",
                definition.source_table
            )));
        }
        data.views.insert(full_name.clone(), definition.clone());
        Ok(ResourceRef::new(full_name.clone(), full_name))
    }

    async fn update(&self, id: &str, definition: &ViewDefinition) -> OpResult<ResourceRef> {
        self.platform.delay().await;
        let mut guard = self.platform.state.lock();
        guard.call(format!("view.update:{id}"))?;
        guard
            .data(&self.workspace)
            .views
            .insert(id.to_string(), definition.clone());
        Ok(ResourceRef::new(id, id))
    }

    async fn delete(&self, id: &str) -> OpResult<DeleteOutcome> {
        self.platform.delay().await;
        let mut guard = self.platform.state.lock();
        guard.call(format!("view.delete:{id}"))?;
        let data = guard.data(&self.workspace);
        data.grants.remove(id);
        Ok(match data.views.remove(id) {
            Some(_) => DeleteOutcome::Deleted,
            None => DeleteOutcome::NotFound,
        })
    }
}

struct InMemoryCatalog {
    platform: InMemoryPlatform,
    workspace: String,
}

#[async_trait]
impl CatalogGateway for InMemoryCatalog {
    async fn ensure_catalog(&self, catalog: &str) -> OpResult<()> {
        self.platform.delay().await;
        let mut guard = self.platform.state.lock();
        guard.call(format!("catalog.ensure_catalog:{catalog}"))?;
        guard
            .data(&self.workspace)
            .catalogs
            .insert(catalog.to_string());
        Ok(())
    }

    async fn ensure_schema(&self, catalog: &str, schema: &str) -> OpResult<()> {
        self.platform.delay().await;
        let mut guard = self.platform.state.lock();
        guard.call(format!("catalog.ensure_schema:{catalog}.{schema}"))?;
        let data = guard.data(&self.workspace);
        if !data.catalogs.contains(catalog) {
            return Err(FailedOperation::single(format!(
                "Catalog '{catalog}' does not exist in workspace '{}'",
                self.workspace
            )));
        }
        data.schemas.insert(format!("{catalog}.{schema}"));
        Ok(())
    }

    async fn table_exists(&self, full_name: &str) -> OpResult<bool> {
        self.platform.delay().await;
        let mut guard = self.platform.state.lock();
        guard.call(format!("catalog.table_exists:{full_name}"))?;
        Ok(guard.data(&self.workspace).tables.contains(full_name))
    }

    async fn list_grants(&self, full_name: &str) -> OpResult<Vec<Grant>> {
        self.platform.delay().await;
        let mut guard = self.platform.state.lock();
        guard.call(format!("catalog.list_grants:{full_name}"))?;
        Ok(guard
            .data(&self.workspace)
            .grants
            .get(full_name)
            .cloned()
            .unwrap_or_default())
    }

    async fn grant(
        &self,
        full_name: &str,
        principal: &Principal,
        privilege: CatalogPrivilege,
    ) -> OpResult<()> {
        self.platform.delay().await;
        let mut guard = self.platform.state.lock();
        guard.call(format!("catalog.grant:{}", principal.name))?;
        let grants = guard
            .data(&self.workspace)
            .grants
            .entry(full_name.to_string())
            .or_default();
        let grant = Grant {
            principal: principal.name.clone(),
            privilege,
        };
        if !grants.contains(&grant) {
            grants.push(grant);
        }
        Ok(())
    }

    async fn revoke(
        &self,
        full_name: &str,
        principal_name: &str,
        privilege: CatalogPrivilege,
    ) -> OpResult<()> {
        self.platform.delay().await;
        let mut guard = self.platform.state.lock();
        guard.call(format!("catalog.revoke:{principal_name}"))?;
        if let Some(grants) = guard.data(&self.workspace).grants.get_mut(full_name) {
            grants.retain(|g| !(g.principal == principal_name && g.privilege == privilege));
        }
        Ok(())
    }
}

struct InMemoryRepositories {
    platform: InMemoryPlatform,
    workspace: String,
}

#[async_trait]
impl RepositoryGateway for InMemoryRepositories {
    async fn create(&self, url: &str, path: &str, provider: &str) -> OpResult<RepoCreation> {
        self.platform.delay().await;
        let mut guard = self.platform.state.lock();
        guard.call(format!("repository.create:{path}"))?;
        if guard
            .data(&self.workspace)
            .repos
            .values()
            .any(|r| r.path == path)
        {
            return Ok(RepoCreation::AlreadyExists);
        }
        let id = guard.next_id();
        let repo = RepoInfo {
            id: id.clone(),
            url: url.to_string(),
            path: path.to_string(),
            provider: provider.to_string(),
        };
        guard.data(&self.workspace).repos.insert(id, repo.clone());
        Ok(RepoCreation::Created(repo))
    }

    async fn list_by_path(&self, path: &str) -> OpResult<Vec<RepoInfo>> {
        self.platform.delay().await;
        let mut guard = self.platform.state.lock();
        guard.call(format!("repository.list_by_path:{path}"))?;
        Ok(guard
            .data(&self.workspace)
            .repos
            .values()
            .filter(|r| r.path == path)
            .cloned()
            .collect())
    }

    async fn delete(&self, id: &str) -> OpResult<DeleteOutcome> {
        self.platform.delay().await;
        let mut guard = self.platform.state.lock();
        guard.call(format!("repository.delete:{id}"))?;
        Ok(match guard.data(&self.workspace).repos.remove(id) {
            Some(_) => DeleteOutcome::Deleted,
            None => DeleteOutcome::NotFound,
        })
    }
}

struct InMemoryIdentity {
    platform: InMemoryPlatform,
    workspace: String,
}

#[async_trait]
impl IdentityGateway for InMemoryIdentity {
    async fn resolve(&self, principal: &PrincipalRef) -> OpResult<Option<Principal>> {
        self.platform.delay().await;
        let mut guard = self.platform.state.lock();
        guard.call(format!("identity.resolve:{}", principal.external_id()))?;
        let external_id = principal.external_id();
        let known = if principal.is_group() {
            guard.groups.contains(external_id)
        } else {
            guard.users.contains(external_id)
        };
        Ok(known.then(|| Principal {
            id: format!("{}-{external_id}", if principal.is_group() { "g" } else { "u" }),
            name: external_id.to_string(),
            is_group: principal.is_group(),
        }))
    }

    async fn assign_permission(
        &self,
        object: &SecuredObject,
        principal: &Principal,
        level: PermissionLevel,
    ) -> OpResult<()> {
        self.platform.delay().await;
        let mut guard = self.platform.state.lock();
        guard.call(format!("identity.assign_permission:{object}"))?;
        guard
            .data(&self.workspace)
            .permissions
            .push((object.clone(), principal.name.clone(), level));
        Ok(())
    }
}
