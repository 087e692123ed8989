//! Container resource-limit fragment
//!
//! A compose override document giving each logical service a memory ceiling.

use super::RenderSettings;
use crate::error::{ProvisionError, Result};
use crate::models::AllocationPlan;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ResourceOverride {
    pub services: BTreeMap<String, ServiceResources>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ServiceResources {
    pub deploy: Deploy,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct Deploy {
    pub resources: Resources,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct Resources {
    pub limits: Limits,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct Limits {
    /// Memory ceiling such as `640M`
    pub memory: String,
}

impl ServiceResources {
    fn with_memory_mb(mb: u64) -> Self {
        Self {
            deploy: Deploy {
                resources: Resources {
                    limits: Limits {
                        memory: format!("{}M", mb),
                    },
                },
            },
        }
    }
}

/// Build the override document for a plan
pub fn build(settings: &RenderSettings, plan: &AllocationPlan) -> ResourceOverride {
    let mut services = BTreeMap::new();
    services.insert(
        settings.database_service.clone(),
        ServiceResources::with_memory_mb(plan.db_mem_mb),
    );
    services.insert(
        settings.application_service.clone(),
        ServiceResources::with_memory_mb(plan.app_mem_mb),
    );
    ResourceOverride { services }
}

/// Render the override document as YAML
pub fn render(settings: &RenderSettings, plan: &AllocationPlan) -> Result<String> {
    let body = serde_yaml::to_string(&build(settings, plan)).map_err(|e| {
        ProvisionError::Render {
            artifact: "resource limits",
            reason: e.to_string(),
        }
    })?;

    Ok(format!(
        "# Memory ceilings ({} allocation), generated by provision. Regenerated on every run.\n{}",
        plan.source, body
    ))
}
