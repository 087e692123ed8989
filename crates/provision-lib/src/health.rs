//! Container health model
//!
//! Parses the container runtime's JSON status listing into per-service
//! health and folds it into one overall status for the wait loop.

use crate::error::{ProvisionError, Result};
use serde::{Deserialize, Serialize};

/// Health status of one service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Healthy,
    /// Still booting or waiting on its first health check
    Starting,
    Unhealthy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub name: String,
    pub status: ServiceStatus,
    /// Raw runtime state, kept for the summary
    pub state: String,
}

/// Overall health across all services
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverallHealth {
    pub status: ServiceStatus,
    pub services: Vec<ServiceHealth>,
}

impl OverallHealth {
    pub fn from_services(services: Vec<ServiceHealth>) -> Self {
        Self {
            status: Self::compute_status(&services),
            services,
        }
    }

    /// Any unhealthy service wins, then any starting one; nothing listed counts as starting
    pub fn compute_status(services: &[ServiceHealth]) -> ServiceStatus {
        if services.is_empty() {
            return ServiceStatus::Starting;
        }

        let mut has_starting = false;
        for service in services {
            match service.status {
                ServiceStatus::Unhealthy => return ServiceStatus::Unhealthy,
                ServiceStatus::Starting => has_starting = true,
                ServiceStatus::Healthy => {}
            }
        }

        if has_starting {
            ServiceStatus::Starting
        } else {
            ServiceStatus::Healthy
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == ServiceStatus::Healthy
    }
}

/// One entry of the runtime's `ps` JSON output
#[derive(Debug, Deserialize)]
struct PsEntry {
    #[serde(rename = "Service", default)]
    service: Option<String>,
    /// Container name, used when no service label is present
    #[serde(rename = "Name", default)]
    name: Option<String>,
    #[serde(rename = "State", default)]
    state: String,
    #[serde(rename = "Health", default)]
    health: String,
}

impl PsEntry {
    fn status(&self) -> ServiceStatus {
        match self.health.to_ascii_lowercase().as_str() {
            "healthy" => return ServiceStatus::Healthy,
            "unhealthy" => return ServiceStatus::Unhealthy,
            "starting" => return ServiceStatus::Starting,
            _ => {}
        }

        match self.state.to_ascii_lowercase().as_str() {
            "running" => ServiceStatus::Healthy,
            "created" | "restarting" | "paused" => ServiceStatus::Starting,
            _ => ServiceStatus::Unhealthy,
        }
    }
}

/// Parse `ps --format json` output, either a JSON array or one object per line
pub fn parse_ps_output(output: &str) -> Result<Vec<ServiceHealth>> {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let entries: Vec<PsEntry> = if trimmed.starts_with('[') {
        serde_json::from_str(trimmed).map_err(parse_error)?
    } else {
        trimmed
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| serde_json::from_str(l).map_err(parse_error))
            .collect::<Result<_>>()?
    };

    Ok(entries
        .into_iter()
        .map(|e| ServiceHealth {
            status: e.status(),
            name: e.service.or(e.name).unwrap_or_default(),
            state: e.state,
        })
        .collect())
}

fn parse_error(e: serde_json::Error) -> ProvisionError {
    ProvisionError::collaborator("container runtime", format!("unreadable status output: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(name: &str, status: ServiceStatus) -> ServiceHealth {
        ServiceHealth {
            name: name.to_string(),
            status,
            state: "running".to_string(),
        }
    }

    #[test]
    fn test_compute_status() {
        let all_healthy = vec![
            service("database", ServiceStatus::Healthy),
            service("application", ServiceStatus::Healthy),
        ];
        assert_eq!(OverallHealth::compute_status(&all_healthy), ServiceStatus::Healthy);

        let booting = vec![
            service("database", ServiceStatus::Healthy),
            service("application", ServiceStatus::Starting),
        ];
        assert_eq!(OverallHealth::compute_status(&booting), ServiceStatus::Starting);

        let broken = vec![
            service("database", ServiceStatus::Unhealthy),
            service("application", ServiceStatus::Starting),
        ];
        assert_eq!(OverallHealth::compute_status(&broken), ServiceStatus::Unhealthy);

        assert_eq!(OverallHealth::compute_status(&[]), ServiceStatus::Starting);
    }

    #[test]
    fn test_parse_ndjson() {
        let output = r#"{"Name":"app-database-1","Service":"database","State":"running","Health":"healthy"}
{"Name":"app-application-1","Service":"application","State":"running","Health":"starting"}
"#;
        let services = parse_ps_output(output).unwrap();
        assert_eq!(services.len(), 2);
        assert_eq!(services[0].name, "database");
        assert_eq!(services[0].status, ServiceStatus::Healthy);
        assert_eq!(services[1].status, ServiceStatus::Starting);
    }

    #[test]
    fn test_parse_array_without_healthcheck() {
        let output = r#"[{"Name":"proxy","State":"running","Health":""},{"Name":"worker","State":"exited"}]"#;
        let services = parse_ps_output(output).unwrap();
        assert_eq!(services[0].name, "proxy");
        assert_eq!(services[0].status, ServiceStatus::Healthy);
        assert_eq!(services[1].status, ServiceStatus::Unhealthy);
    }

    #[test]
    fn test_parse_empty_and_garbage() {
        assert!(parse_ps_output("  \n").unwrap().is_empty());
        assert!(parse_ps_output("not json").is_err());
    }
}
