#![allow(clippy::doc_markdown)] // Allow technical terms like Databricks, DLT in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Provisioner Core
//!
//! Asynchronous provisioning engine for data-product components on a cloud
//! data platform: workspaces, notebook jobs, DLT pipelines, workflows and
//! catalog views, together with their access grants.
//!
//! ## Overview
//!
//! Callers submit a provisioning or de-provisioning request and get a token
//! back immediately. A background task validates the request, selects the
//! pipeline for the component and runs it against the platform gateways;
//! the token is then polled for the terminal state.
//!
//! ## Module Organization
//!
//! - [`problem`] - value-based failures (`Problem`, `FailedOperation`, `OpResult`)
//! - [`models`] - requests, descriptors, jobs and remote resources
//! - [`validation`] - structural and semantic request validation
//! - [`gateways`] - platform capability contracts and an in-memory platform
//! - [`orchestration`] - orchestrator, job store, dispatch, pipelines, upsert resolver
//! - [`execution`] - bounded worker pool
//! - [`config`] - configuration management
//! - [`logging`] - structured logging setup
//! - [`error`] - infrastructure errors
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use provisioner_core::config::ProvisionerConfig;
//! use provisioner_core::gateways::{memory::InMemoryPlatform, Gateways};
//! use provisioner_core::models::ProvisioningRequest;
//! use provisioner_core::orchestration::{Orchestrator, ProvisioningDirection};
//! use std::sync::Arc;
//!
//! # async fn example(descriptor: String) {
//! let platform = InMemoryPlatform::new();
//! let orchestrator = Orchestrator::new(
//!     Arc::new(ProvisionerConfig::default()),
//!     Gateways::in_memory(&platform),
//! );
//!
//! let token = orchestrator
//!     .submit(ProvisioningRequest::component(descriptor), ProvisioningDirection::Provision)
//!     .await;
//! let job = orchestrator.get_status(&token).await;
//! println!("{}: {}", job.status, job.result_message);
//! # }
//! ```

pub mod config;
pub mod error;
pub mod execution;
pub mod gateways;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod problem;
pub mod validation;

pub use config::{ConfigManager, ProvisionerConfig};
pub use error::{ProvisionerError, Result};
pub use orchestration::{Orchestrator, ProvisioningDirection};
pub use problem::{FailedOperation, OpResult, Problem};
pub use validation::ValidationResult;
