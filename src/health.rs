//! Health reporting shared by the cache, query-cache, and warmup services

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Coarse health indicator for monitoring and alerting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Unhealthy => "unhealthy",
        }
    }

    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status plus free-form diagnostic details
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub details: Value,
}

impl HealthReport {
    pub fn new(status: HealthStatus, details: Value) -> Self {
        Self { status, details }
    }

    /// Unhealthy report carrying a single `error` detail
    pub fn unhealthy(error: impl fmt::Display) -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            details: serde_json::json!({ "error": error.to_string() }),
        }
    }
}
