//! Outcome measurements: proxy metrics plus optional ground truth.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::IntegrityError;

/// Environment a measurement was taken in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Test,
    Production,
    Staging,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Test => write!(f, "test"),
            Self::Production => write!(f, "production"),
            Self::Staging => write!(f, "staging"),
        }
    }
}

impl FromStr for Environment {
    type Err = IntegrityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "test" => Ok(Self::Test),
            "production" | "prod" => Ok(Self::Production),
            "staging" => Ok(Self::Staging),
            other => Err(IntegrityError::UnknownEnvironment(other.to_string())),
        }
    }
}

/// Cheaply computed scores for one tool execution.
///
/// The normalized scores are conventionally in 0.0–1.0; the range is not
/// enforced. `error_rate` and `latency_ms` are unnormalized.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProxyMetrics {
    pub task_completion: f64,
    pub response_quality: f64,
    pub safety_score: f64,
    pub helpfulness_score: f64,
    pub efficiency_score: f64,
    #[serde(default)]
    pub error_rate: f64,
    #[serde(default)]
    pub latency_ms: f64,
    /// Additional named numeric metrics.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom: BTreeMap<String, f64>,
}

impl ProxyMetrics {
    /// Build metrics with the four tracked scores set and everything else zeroed.
    pub fn new(
        task_completion: f64,
        response_quality: f64,
        safety_score: f64,
        helpfulness_score: f64,
    ) -> Self {
        Self {
            task_completion,
            response_quality,
            safety_score,
            helpfulness_score,
            ..Self::default()
        }
    }

    /// Read one of the tracked proxy metrics by name.
    pub fn tracked(&self, metric: TrackedMetric) -> f64 {
        match metric {
            TrackedMetric::TaskCompletion => self.task_completion,
            TrackedMetric::ResponseQuality => self.response_quality,
            TrackedMetric::SafetyScore => self.safety_score,
            TrackedMetric::HelpfulnessScore => self.helpfulness_score,
        }
    }
}

/// The four proxy metrics compared against true outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TrackedMetric {
    TaskCompletion,
    ResponseQuality,
    SafetyScore,
    HelpfulnessScore,
}

impl TrackedMetric {
    pub const ALL: [TrackedMetric; 4] = [
        TrackedMetric::TaskCompletion,
        TrackedMetric::ResponseQuality,
        TrackedMetric::SafetyScore,
        TrackedMetric::HelpfulnessScore,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::TaskCompletion => "taskCompletion",
            Self::ResponseQuality => "responseQuality",
            Self::SafetyScore => "safetyScore",
            Self::HelpfulnessScore => "helpfulnessScore",
        }
    }
}

impl fmt::Display for TrackedMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ordinal value delivered to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueDelivered {
    #[default]
    None,
    Low,
    Medium,
    High,
}

/// Sparse, optionally human-verified ground truth about an execution.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrueOutcome {
    /// Satisfaction on a 0–5 scale, when the user gave one.
    pub user_satisfaction: Option<f64>,
    pub goal_achieved: bool,
    pub harm_prevented: bool,
    pub value_delivered: ValueDelivered,
    pub follow_up_required: bool,
    pub human_override_needed: bool,
    pub human_verified: bool,
    pub notes: Option<String>,
}

impl TrueOutcome {
    /// `goal_achieved` as 0.0 or 1.0.
    pub fn goal_indicator(&self) -> f64 {
        if self.goal_achieved {
            1.0
        } else {
            0.0
        }
    }
}

/// Test harness context, attached to `test` measurements.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TestContext {
    pub test_suite: String,
    pub test_case_id: String,
    pub is_synthetic: bool,
    pub markers: Vec<String>,
}

/// One observed execution of a tool. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeMeasurement {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub tool: String,
    pub session_id: String,
    pub proxy_metrics: ProxyMetrics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub true_outcome: Option<TrueOutcome>,
    pub environment: Environment,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_context: Option<TestContext>,
}

/// Caller-assembled input for one measurement.
///
/// `timestamp` defaults to the time of recording when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementInput {
    pub tool: String,
    pub session_id: String,
    pub proxy_metrics: ProxyMetrics,
    pub environment: Environment,
    #[serde(default)]
    pub true_outcome: Option<TrueOutcome>,
    #[serde(default)]
    pub test_context: Option<TestContext>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl MeasurementInput {
    pub fn new(
        tool: impl Into<String>,
        session_id: impl Into<String>,
        proxy_metrics: ProxyMetrics,
        environment: Environment,
    ) -> Self {
        Self {
            tool: tool.into(),
            session_id: session_id.into(),
            proxy_metrics,
            environment,
            true_outcome: None,
            test_context: None,
            timestamp: None,
        }
    }

    pub fn with_outcome(mut self, outcome: TrueOutcome) -> Self {
        self.true_outcome = Some(outcome);
        self
    }

    pub fn with_test_context(mut self, context: TestContext) -> Self {
        self.test_context = Some(context);
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// Query over recorded measurements. Every field narrows the result.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MeasurementFilter {
    pub tool: Option<String>,
    pub environment: Option<Environment>,
    /// Only measurements at or after this instant.
    pub since: Option<DateTime<Utc>>,
    /// Keep only the most recent `limit` matches.
    pub limit: Option<usize>,
}

impl MeasurementFilter {
    pub fn for_tool(tool: impl Into<String>) -> Self {
        Self {
            tool: Some(tool.into()),
            ..Self::default()
        }
    }

    pub fn in_environment(mut self, environment: Environment) -> Self {
        self.environment = Some(environment);
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether a measurement passes the tool/environment/time predicates.
    /// `limit` is applied by the store over the matching sequence.
    pub fn matches(&self, m: &OutcomeMeasurement) -> bool {
        if let Some(tool) = &self.tool {
            if &m.tool != tool {
                return false;
            }
        }
        if let Some(env) = self.environment {
            if m.environment != env {
                return false;
            }
        }
        if let Some(since) = self.since {
            if m.timestamp < since {
                return false;
            }
        }
        true
    }
}
