//! Provisioning library for single-host multi-container deployments
//!
//! This crate provides the core functionality for:
//! - Measuring host memory (procfs, optional cgroup limits)
//! - Splitting memory between the database and the application
//! - Synthesizing database tuning parameters
//! - Rendering configuration artifacts without clobbering operator edits
//! - Collaborator interfaces for packages, checkout, containers, firewall and proxy

pub mod collaborators;
pub mod error;
pub mod generator;
pub mod guard;
pub mod health;
pub mod models;
pub mod observability;
pub mod planner;
pub mod probe;
pub mod render;
pub mod tuning;

pub use error::{ProvisionError, Result};
pub use generator::{ConfigGenerator, GeneratorInputs, TargetPaths};
pub use health::{OverallHealth, ServiceHealth, ServiceStatus};
pub use models::*;
pub use observability::ProvisionLogger;
