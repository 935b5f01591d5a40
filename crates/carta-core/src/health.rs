//! Health value types.
//!
//! A [`HealthSnapshot`] is recomputed on every observation and never mutated
//! afterwards. The aggregate status is the worst status among the reported
//! dependencies.

use std::collections::BTreeMap;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

/// Three-level operational status.
///
/// Variants are ordered from best to worst so the aggregate of several
/// statuses is their maximum.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ServiceStatus {
    /// Operating normally.
    #[default]
    Healthy,
    /// Reachable but failing or slow more often than configured.
    Degraded,
    /// Not able to serve requests.
    Unhealthy,
}

impl ServiceStatus {
    /// Returns true unless the status is [`ServiceStatus::Unhealthy`].
    #[inline]
    pub const fn is_operational(self) -> bool {
        !matches!(self, Self::Unhealthy)
    }
}

/// Status of a single dependency with a short human-readable detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyHealth {
    /// Current status.
    pub status: ServiceStatus,
    /// Explanation of the status.
    pub detail: String,
}

impl DependencyHealth {
    /// Creates a healthy dependency report.
    pub fn healthy(detail: impl Into<String>) -> Self {
        Self::new(ServiceStatus::Healthy, detail)
    }

    /// Creates a degraded dependency report.
    pub fn degraded(detail: impl Into<String>) -> Self {
        Self::new(ServiceStatus::Degraded, detail)
    }

    /// Creates an unhealthy dependency report.
    pub fn unhealthy(detail: impl Into<String>) -> Self {
        Self::new(ServiceStatus::Unhealthy, detail)
    }

    fn new(status: ServiceStatus, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }
}

/// Point-in-time view of system health.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthSnapshot {
    /// Aggregate status.
    pub overall: ServiceStatus,
    /// Per-dependency status keyed by dependency name.
    pub dependencies: BTreeMap<String, DependencyHealth>,
    /// When the snapshot was computed.
    pub captured_at: Timestamp,
}

impl HealthSnapshot {
    /// Builds a snapshot whose overall status is the worst dependency status.
    ///
    /// An empty dependency map yields [`ServiceStatus::Healthy`].
    pub fn from_dependencies(
        dependencies: BTreeMap<String, DependencyHealth>,
        captured_at: Timestamp,
    ) -> Self {
        let overall = dependencies
            .values()
            .map(|dependency| dependency.status)
            .max()
            .unwrap_or_default();

        Self {
            overall,
            dependencies,
            captured_at,
        }
    }

    /// Returns true if the service can accept requests.
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.overall.is_operational()
    }

    /// Returns the report for a named dependency.
    pub fn dependency(&self, name: &str) -> Option<&DependencyHealth> {
        self.dependencies.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overall_is_worst_dependency() {
        let mut dependencies = BTreeMap::new();
        dependencies.insert("worker".to_owned(), DependencyHealth::healthy("ok"));
        dependencies.insert(
            "success_rate".to_owned(),
            DependencyHealth::degraded("70.0% over last 10"),
        );

        let snapshot = HealthSnapshot::from_dependencies(dependencies, Timestamp::now());
        assert_eq!(snapshot.overall, ServiceStatus::Degraded);
        assert!(snapshot.is_ready());
    }

    #[test]
    fn unhealthy_is_not_ready() {
        let mut dependencies = BTreeMap::new();
        dependencies.insert("worker".to_owned(), DependencyHealth::unhealthy("down"));
        dependencies.insert("queue".to_owned(), DependencyHealth::healthy("idle"));

        let snapshot = HealthSnapshot::from_dependencies(dependencies, Timestamp::now());
        assert_eq!(snapshot.overall, ServiceStatus::Unhealthy);
        assert!(!snapshot.is_ready());
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(ServiceStatus::Degraded.to_string(), "degraded");
        let json = serde_json::to_string(&ServiceStatus::Unhealthy).unwrap();
        assert_eq!(json, "\"unhealthy\"");
    }
}
