//! Background execution of provisioning jobs.

pub mod worker_pool;

pub use worker_pool::{catch_panic, TaskPanic, WorkerPool};
