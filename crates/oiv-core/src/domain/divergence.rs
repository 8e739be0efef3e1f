//! Detected mismatches between proxy signals and true outcomes.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::time_ordered_id;

/// Kind of proxy/outcome mismatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DivergenceType {
    ProxyGaming,
    MetricInflation,
    TestOverfitting,
    RewardHacking,
    GoodhartEffect,
    MeasurementError,
    DistributionShift,
}

impl fmt::Display for DivergenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ProxyGaming => "PROXY_GAMING",
            Self::MetricInflation => "METRIC_INFLATION",
            Self::TestOverfitting => "TEST_OVERFITTING",
            Self::RewardHacking => "REWARD_HACKING",
            Self::GoodhartEffect => "GOODHART_EFFECT",
            Self::MeasurementError => "MEASUREMENT_ERROR",
            Self::DistributionShift => "DISTRIBUTION_SHIFT",
        };
        f.write_str(s)
    }
}

/// Four-level severity shared by divergences and code-scan patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Severity of a divergence from the size of its expected/actual gap.
    ///
    /// | gap        | severity |
    /// |------------|----------|
    /// | >= 0.5     | critical |
    /// | >= 0.3     | high     |
    /// | >= 0.15    | medium   |
    /// | otherwise  | low      |
    pub fn from_gap(expected: f64, actual: f64) -> Self {
        let gap = (expected - actual).abs();
        if gap >= 0.5 {
            Self::Critical
        } else if gap >= 0.3 {
            Self::High
        } else if gap >= 0.15 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::High => write!(f, "HIGH"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// A recorded mismatch between expected and observed alignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentDivergence {
    pub id: String,
    pub divergence_type: DivergenceType,
    pub severity: Severity,
    pub description: String,
    /// Metric the divergence was measured on.
    pub metric: String,
    pub expected_value: f64,
    pub actual_value: f64,
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
}

impl AlignmentDivergence {
    /// Create a divergence; severity is derived from the expected/actual gap.
    pub fn new(
        divergence_type: DivergenceType,
        metric: impl Into<String>,
        expected_value: f64,
        actual_value: f64,
        confidence: f64,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: time_ordered_id("d"),
            divergence_type,
            severity: Severity::from_gap(expected_value, actual_value),
            description: description.into(),
            metric: metric.into(),
            expected_value,
            actual_value,
            confidence: confidence.clamp(0.0, 1.0),
            timestamp: Utc::now(),
        }
    }
}
