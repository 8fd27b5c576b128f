//! # Orchestration Engine
//!
//! Asynchronous provisioning of data-product components.
//!
//! ## Core Components
//!
//! - **Orchestrator**: accepts requests, hands out tokens and records the
//!   terminal state of every job
//! - **JobStore**: token → status mapping read by status polling
//! - **ComponentDispatch**: selects the pipeline for a component
//! - **Pipelines**: ordered, short-circuiting provisioning chains per
//!   component type
//! - **UpsertResolver**: idempotent create-or-update by name, shared by every
//!   resource kind

pub mod dispatch;
pub mod job_store;
pub mod orchestrator;
pub mod pipelines;
pub mod upsert;

pub use dispatch::ComponentDispatch;
pub use job_store::{InMemoryJobStore, JobStore};
pub use orchestrator::{Orchestrator, ProvisioningDirection};
pub use pipelines::{ProvisionOutcome, ProvisioningContext};
pub use upsert::{UpsertAction, UpsertOutcome, UpsertPlan, UpsertResolver};
