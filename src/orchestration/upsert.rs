//! # Upsert Resolver
//!
//! Idempotent create-or-update by logical name, shared by every resource
//! kind. A name resolves to at most one live object per scope:
//!
//! - no match: create
//! - one match: update that object by id
//! - several matches: fail, never guessing and never deleting duplicates
//!
//! Resolution is split into [`UpsertResolver::plan`] and
//! [`UpsertResolver::apply`] so callers can inspect the existing object
//! between the two (the workflow pipeline does). The list-then-act sequence is
//! not atomic against concurrent writers in other processes.

use crate::gateways::ResourceGateway;
use crate::logging::log_resource_operation;
use crate::models::{DeleteOutcome, ResourceKind, ResourceRef};
use crate::problem::{accumulate, FailedOperation, OpResult, Problem};
use tracing::{debug, info};

/// What an upsert will do for a given name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertPlan {
    Create,
    Update(ResourceRef),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertAction {
    Created,
    Updated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub reference: ResourceRef,
    pub action: UpsertAction,
}

/// Upsert and removal by name over one gateway, within one scope
pub struct UpsertResolver<'a, D> {
    gateway: &'a dyn ResourceGateway<D>,
    kind: ResourceKind,
    scope: &'a str,
}

impl<'a, D> UpsertResolver<'a, D>
where
    D: Send + Sync,
{
    /// `scope` names where uniqueness holds (usually the workspace) and is
    /// only used in messages
    pub fn new(gateway: &'a dyn ResourceGateway<D>, kind: ResourceKind, scope: &'a str) -> Self {
        Self {
            gateway,
            kind,
            scope,
        }
    }

    pub async fn plan(&self, name: &str) -> OpResult<UpsertPlan> {
        let matches = self.gateway.list_by_name(name).await?;

        match matches.as_slice() {
            [] => Ok(UpsertPlan::Create),
            [existing] => Ok(UpsertPlan::Update(existing.clone())),
            duplicates => Err(FailedOperation::new(self.not_unique(name, duplicates))),
        }
    }

    pub async fn apply(&self, plan: UpsertPlan, definition: &D) -> OpResult<UpsertOutcome> {
        match plan {
            UpsertPlan::Create => {
                let reference = self.gateway.create(definition).await?;
                log_resource_operation(
                    "create",
                    &self.kind.to_string(),
                    &reference.name,
                    Some(reference.id.as_str()),
                    self.scope,
                    None,
                );
                Ok(UpsertOutcome {
                    reference,
                    action: UpsertAction::Created,
                })
            }
            UpsertPlan::Update(existing) => {
                let reference = self.gateway.update(&existing.id, definition).await?;
                log_resource_operation(
                    "update",
                    &self.kind.to_string(),
                    &reference.name,
                    Some(reference.id.as_str()),
                    self.scope,
                    None,
                );
                Ok(UpsertOutcome {
                    reference,
                    action: UpsertAction::Updated,
                })
            }
        }
    }

    pub async fn upsert(&self, name: &str, definition: &D) -> OpResult<UpsertOutcome> {
        let plan = self.plan(name).await?;
        self.apply(plan, definition).await
    }

    /// Delete every object named `name`.
    ///
    /// Every deletion is attempted; failures are accumulated, one problem per
    /// failed deletion. Objects already gone count as removed. Returns the
    /// number of objects actually deleted.
    pub async fn remove_all(&self, name: &str) -> OpResult<usize> {
        let matches = self.gateway.list_by_name(name).await?;
        if matches.is_empty() {
            info!(kind = %self.kind, name = %name, scope = %self.scope, "Nothing to delete");
            return Ok(0);
        }

        let mut results = Vec::with_capacity(matches.len());
        for reference in &matches {
            results.push(self.remove_one(reference).await);
        }

        let outcomes = accumulate(results)?;
        Ok(outcomes
            .into_iter()
            .filter(|outcome| *outcome == DeleteOutcome::Deleted)
            .count())
    }

    async fn remove_one(&self, reference: &ResourceRef) -> OpResult<DeleteOutcome> {
        match self.gateway.delete(&reference.id).await {
            Ok(DeleteOutcome::Deleted) => {
                log_resource_operation(
                    "delete",
                    &self.kind.to_string(),
                    &reference.name,
                    Some(reference.id.as_str()),
                    self.scope,
                    None,
                );
                Ok(DeleteOutcome::Deleted)
            }
            Ok(DeleteOutcome::NotFound) => {
                debug!(
                    kind = %self.kind,
                    id = %reference.id,
                    scope = %self.scope,
                    "Already deleted"
                );
                Ok(DeleteOutcome::NotFound)
            }
            Err(failure) => Err(failure.with_context(&format!(
                "Failed to delete {} '{}' ({}) in {}",
                self.kind, reference.name, reference.id, self.scope
            ))),
        }
    }

    fn not_unique(&self, name: &str, duplicates: &[ResourceRef]) -> Problem {
        let ids = duplicates
            .iter()
            .map(|r| r.id.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        Problem::new(format!(
            "Found {} {}s named '{name}' in {} (ids: {ids}), but the name must be unique. Remove the duplicates and retry",
            duplicates.len(),
            self.kind,
            self.scope
        ))
    }
}
