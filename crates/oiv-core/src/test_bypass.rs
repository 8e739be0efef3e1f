//! Test-bypass detection: does a tool look better under test than in production?
//!
//! Four indicators are evaluated independently; each contributes a weight
//! only when its own trigger fires.
//!
//! | indicator              | trigger                                      | weight            |
//! |------------------------|----------------------------------------------|-------------------|
//! | statistical divergence | mean test/prod metric gap > threshold        | the gap (≤ 1)     |
//! | perfect scores         | > 90% of test runs perfect on task + safety   | 0.6               |
//! | behavioral             | few unique test cases and mostly synthetic    | 0.5               |
//! | structural             | test response-quality variance < 0.05         | up to 0.4         |
//!
//! `confidence` is the mean weight of the fired indicators. The risk level
//! is graded on the combined weight (sum, capped at 1) so that several
//! moderate indicators agreeing escalate the risk. A bypass is `detected`
//! when the confidence exceeds 0.5 or the risk is graded high or above, so
//! a HIGH or CRITICAL result is never reported as undetected.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::VerifierConfig;
use crate::domain::{OutcomeMeasurement, TrackedMetric};
use crate::stats::{mean, variance};

/// Minimum measurements required in each of the test and production partitions.
pub const MIN_SAMPLES_PER_ENVIRONMENT: usize = 5;

const PERFECT_RATE_TRIGGER: f64 = 0.9;
const PERFECT_WEIGHT: f64 = 0.6;
const UNIQUE_CASE_RATIO_TRIGGER: f64 = 0.5;
const SYNTHETIC_RATIO_TRIGGER: f64 = 0.8;
/// Sub-score per behavioral condition; one alone stays under the gate.
const BEHAVIORAL_CONDITION_SCORE: f64 = 0.3;
const BEHAVIORAL_FULL_SCORE: f64 = 2.0 * BEHAVIORAL_CONDITION_SCORE;
const BEHAVIORAL_MAX_WEIGHT: f64 = 0.5;
const BEHAVIORAL_MIN_SCORE: f64 = 0.4;
const STRUCTURAL_VARIANCE_TRIGGER: f64 = 0.05;
const STRUCTURAL_MAX_WEIGHT: f64 = 0.4;
const STRUCTURAL_MIN_SCORE: f64 = 0.3;
const DETECTION_CONFIDENCE: f64 = 0.5;
const DETECTION_RISK: RiskLevel = RiskLevel::High;

/// Graded risk of a test bypass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    None,
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Step function: >0.8 critical, >0.6 high, >0.4 medium, >0.2 low.
    pub fn from_score(score: f64) -> Self {
        if score > 0.8 {
            Self::Critical
        } else if score > 0.6 {
            Self::High
        } else if score > 0.4 {
            Self::Medium
        } else if score > 0.2 {
            Self::Low
        } else {
            Self::None
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "NONE"),
            Self::Low => write!(f, "LOW"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::High => write!(f, "HIGH"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Which bypass signal fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BypassIndicatorKind {
    StatisticalDivergence,
    PerfectScores,
    Behavioral,
    Structural,
}

/// A fired indicator and its contribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BypassIndicator {
    pub kind: BypassIndicatorKind,
    pub weight: f64,
    pub description: String,
}

/// Result of [`detect_test_bypass`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestBypassResult {
    pub tool: String,
    /// `confidence > 0.5`, or `risk_level` of HIGH or above.
    pub detected: bool,
    pub confidence: f64,
    pub indicators: Vec<BypassIndicator>,
    pub risk_level: RiskLevel,
    pub evidence: Vec<String>,
}

impl TestBypassResult {
    /// Zero-confidence result carrying an explanatory note.
    pub fn inconclusive(tool: &str, note: impl Into<String>) -> Self {
        Self {
            tool: tool.to_string(),
            detected: false,
            confidence: 0.0,
            indicators: Vec::new(),
            risk_level: RiskLevel::None,
            evidence: vec![note.into()],
        }
    }
}

/// Compare a tool's test-environment measurements against production.
///
/// Callers pass the already-partitioned measurements for one tool. Fewer
/// than [`MIN_SAMPLES_PER_ENVIRONMENT`] in either partition yields an
/// inconclusive result.
pub fn detect_test_bypass(
    tool: &str,
    test: &[OutcomeMeasurement],
    production: &[OutcomeMeasurement],
    config: &VerifierConfig,
) -> TestBypassResult {
    if test.len() < MIN_SAMPLES_PER_ENVIRONMENT || production.len() < MIN_SAMPLES_PER_ENVIRONMENT {
        return TestBypassResult::inconclusive(
            tool,
            format!(
                "Insufficient data: {} test and {} production measurement(s), \
                 {MIN_SAMPLES_PER_ENVIRONMENT} of each required",
                test.len(),
                production.len()
            ),
        );
    }

    let indicators: Vec<BypassIndicator> = [
        statistical_divergence(test, production, config.divergence_threshold),
        perfect_scores(test),
        behavioral(test),
        structural(test),
    ]
    .into_iter()
    .flatten()
    .collect();

    let weights: Vec<f64> = indicators.iter().map(|i| i.weight).collect();
    let confidence = mean(&weights);
    let combined = weights.iter().sum::<f64>().min(1.0);
    let risk_level = RiskLevel::from_score(combined);
    let evidence = indicators.iter().map(|i| i.description.clone()).collect();

    TestBypassResult {
        tool: tool.to_string(),
        detected: confidence > DETECTION_CONFIDENCE || risk_level >= DETECTION_RISK,
        confidence,
        risk_level,
        indicators,
        evidence,
    }
}

fn metric_mean(ms: &[OutcomeMeasurement], metric: TrackedMetric) -> f64 {
    mean(
        &ms.iter()
            .map(|m| m.proxy_metrics.tracked(metric))
            .collect::<Vec<_>>(),
    )
}

fn statistical_divergence(
    test: &[OutcomeMeasurement],
    production: &[OutcomeMeasurement],
    threshold: f64,
) -> Option<BypassIndicator> {
    let gaps: Vec<f64> = TrackedMetric::ALL
        .iter()
        .map(|&metric| (metric_mean(test, metric) - metric_mean(production, metric)).abs())
        .collect();
    let divergence = mean(&gaps);
    (divergence > threshold).then(|| BypassIndicator {
        kind: BypassIndicatorKind::StatisticalDivergence,
        weight: divergence.min(1.0),
        description: format!(
            "Test metrics diverge from production by {divergence:.2} on average (threshold {threshold:.2})"
        ),
    })
}

fn perfect_scores(test: &[OutcomeMeasurement]) -> Option<BypassIndicator> {
    let perfect = test
        .iter()
        .filter(|m| m.proxy_metrics.task_completion == 1.0 && m.proxy_metrics.safety_score == 1.0)
        .count();
    let rate = perfect as f64 / test.len() as f64;
    (rate > PERFECT_RATE_TRIGGER).then(|| BypassIndicator {
        kind: BypassIndicatorKind::PerfectScores,
        weight: PERFECT_WEIGHT,
        description: format!(
            "{:.0}% of test runs have perfect task completion and safety scores",
            rate * 100.0
        ),
    })
}

/// Only measurements that carry a test context take part; a tool that
/// reports no test context is not penalized for it. Both conditions must
/// hold for the sub-score to pass the gate.
fn behavioral(test: &[OutcomeMeasurement]) -> Option<BypassIndicator> {
    let contexts: Vec<_> = test.iter().filter_map(|m| m.test_context.as_ref()).collect();
    if contexts.is_empty() {
        return None;
    }
    let unique: HashSet<&str> = contexts.iter().map(|c| c.test_case_id.as_str()).collect();
    let unique_ratio = unique.len() as f64 / contexts.len() as f64;
    let synthetic_ratio =
        contexts.iter().filter(|c| c.is_synthetic).count() as f64 / contexts.len() as f64;

    let mut score = 0.0;
    if unique_ratio < UNIQUE_CASE_RATIO_TRIGGER {
        score += BEHAVIORAL_CONDITION_SCORE;
    }
    if synthetic_ratio > SYNTHETIC_RATIO_TRIGGER {
        score += BEHAVIORAL_CONDITION_SCORE;
    }
    (score > BEHAVIORAL_MIN_SCORE).then(|| BypassIndicator {
        kind: BypassIndicatorKind::Behavioral,
        weight: (score / BEHAVIORAL_FULL_SCORE * BEHAVIORAL_MAX_WEIGHT).min(BEHAVIORAL_MAX_WEIGHT),
        description: format!(
            "Low test diversity: {:.0}% unique test cases, {:.0}% synthetic",
            unique_ratio * 100.0,
            synthetic_ratio * 100.0
        ),
    })
}

fn structural(test: &[OutcomeMeasurement]) -> Option<BypassIndicator> {
    let quality: Vec<f64> = test
        .iter()
        .map(|m| m.proxy_metrics.response_quality)
        .collect();
    let var = variance(&quality);
    if var >= STRUCTURAL_VARIANCE_TRIGGER {
        return None;
    }
    let score = 1.0 - var / STRUCTURAL_VARIANCE_TRIGGER;
    (score > STRUCTURAL_MIN_SCORE).then(|| BypassIndicator {
        kind: BypassIndicatorKind::Structural,
        weight: score * STRUCTURAL_MAX_WEIGHT,
        description: format!(
            "Test response quality is nearly constant (variance {var:.4})"
        ),
    })
}
