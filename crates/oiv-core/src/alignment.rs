//! Proxy/outcome alignment analysis.
//!
//! Compares the tracked proxy metrics against a scalar reduction of each
//! measurement's true outcome and looks for three failure shapes:
//!
//! - **Weak correlation**: a proxy that does not move with outcomes
//!   (`MEASUREMENT_ERROR`).
//! - **Goodhart effect**: task completion improving over time while goal
//!   achievement stays flat (`GOODHART_EFFECT`).
//! - **Proxy gaming**: individual measurements with excellent proxies and
//!   poor outcomes (`PROXY_GAMING`).
//!
//! The analysis is pure: it returns new divergences and never records or
//! publishes them itself.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::{PolicyWeights, VerifierConfig};
use crate::domain::{
    AlignmentDivergence, DivergenceType, OutcomeMeasurement, TrackedMetric, TrueOutcome,
    ValueDelivered,
};
use crate::stats::{mean, pearson_correlation};

/// Task-completion improvement (early half → late half) that opens the Goodhart check.
const GOODHART_MIN_TASK_GAIN: f64 = 0.1;
/// Outcome improvement below which the task gain counts as hollow.
const GOODHART_MAX_OUTCOME_GAIN: f64 = 0.05;
const GOODHART_RISK_SCALE: f64 = 200.0;

const GAMING_MIN_PROXY: f64 = 0.8;
const GAMING_MAX_OUTCOME: f64 = 0.4;

/// Result of [`analyze_alignment`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentAnalysis {
    pub tool: Option<String>,
    /// Measurements carrying a true outcome that were analyzed.
    pub sample_size: usize,
    /// 0–100; higher is better aligned.
    pub alignment_score: f64,
    /// Mean correlation across the tracked metrics.
    pub correlation: f64,
    pub metric_correlations: BTreeMap<TrackedMetric, f64>,
    pub divergences: Vec<AlignmentDivergence>,
    /// 0–100.
    pub goodhart_risk: f64,
    pub recommendations: Vec<String>,
}

impl AlignmentAnalysis {
    /// Neutral result used when there is not enough ground truth to judge.
    fn insufficient(tool: Option<&str>, sample_size: usize, required: usize) -> Self {
        Self {
            tool: tool.map(str::to_string),
            sample_size,
            alignment_score: 100.0,
            correlation: 1.0,
            metric_correlations: BTreeMap::new(),
            divergences: Vec::new(),
            goodhart_risk: 0.0,
            recommendations: vec![format!(
                "Insufficient data: {sample_size} measurement(s) with true outcomes, \
                 {required} required for alignment analysis"
            )],
        }
    }
}

/// Reduce a true outcome to one scalar in 0–1 (with default weights).
pub fn outcome_scalar(outcome: &TrueOutcome, weights: &PolicyWeights) -> f64 {
    let mut score = 0.0;
    if outcome.goal_achieved {
        score += weights.outcome_goal_weight;
    }
    if let Some(satisfaction) = outcome.user_satisfaction {
        score += weights.outcome_satisfaction_weight * (satisfaction / 5.0);
    }
    score += match outcome.value_delivered {
        ValueDelivered::High => weights.outcome_value_high,
        ValueDelivered::Medium => weights.outcome_value_medium,
        ValueDelivered::Low | ValueDelivered::None => 0.0,
    };
    score
}

/// Outcome score used by the proxy-gaming check.
fn gaming_outcome_score(outcome: &TrueOutcome, weights: &PolicyWeights) -> f64 {
    let mut score = weights.gaming_goal_weight * outcome.goal_indicator();
    if let Some(satisfaction) = outcome.user_satisfaction {
        score += satisfaction / weights.gaming_satisfaction_divisor;
    }
    score += match outcome.value_delivered {
        ValueDelivered::High => weights.gaming_value_high,
        ValueDelivered::Medium => weights.gaming_value_medium,
        ValueDelivered::Low | ValueDelivered::None => 0.0,
    };
    score
}

/// Goodhart risk (0–100) with the task and outcome gains it was derived from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GoodhartEstimate {
    pub risk: f64,
    pub task_gain: f64,
    pub outcome_gain: f64,
}

/// Compare the chronologically early and late halves of the samples.
pub fn estimate_goodhart(samples: &[(&OutcomeMeasurement, &TrueOutcome)]) -> GoodhartEstimate {
    let mut ordered: Vec<&(&OutcomeMeasurement, &TrueOutcome)> = samples.iter().collect();
    ordered.sort_by_key(|(m, _)| m.timestamp);

    let half = ordered.len() / 2;
    if half == 0 {
        return GoodhartEstimate {
            risk: 0.0,
            task_gain: 0.0,
            outcome_gain: 0.0,
        };
    }
    let (early, late) = ordered.split_at(half);

    let (early_task, early_goal) = half_means(early);
    let (late_task, late_goal) = half_means(late);
    let task_gain = late_task - early_task;
    let outcome_gain = late_goal - early_goal;

    let risk = if task_gain > GOODHART_MIN_TASK_GAIN && outcome_gain < GOODHART_MAX_OUTCOME_GAIN {
        ((task_gain - outcome_gain) * GOODHART_RISK_SCALE).min(100.0)
    } else {
        0.0
    };

    GoodhartEstimate {
        risk,
        task_gain,
        outcome_gain,
    }
}

/// Mean task completion and mean goal achievement over one half.
fn half_means(part: &[&(&OutcomeMeasurement, &TrueOutcome)]) -> (f64, f64) {
    let tasks: Vec<f64> = part
        .iter()
        .map(|(m, _)| m.proxy_metrics.task_completion)
        .collect();
    let goals: Vec<f64> = part.iter().map(|(_, o)| o.goal_indicator()).collect();
    (mean(&tasks), mean(&goals))
}

/// Analyze alignment of proxy metrics with true outcomes.
///
/// Only measurements carrying a true outcome (and matching `tool`, when
/// given) take part. Never fails: too few samples yield the neutral result
/// (score 100, correlation 1, no divergences).
pub fn analyze_alignment<'a>(
    measurements: impl IntoIterator<Item = &'a OutcomeMeasurement>,
    tool: Option<&str>,
    config: &VerifierConfig,
) -> AlignmentAnalysis {
    let samples: Vec<(&OutcomeMeasurement, &TrueOutcome)> = measurements
        .into_iter()
        .filter(|m| tool.map_or(true, |t| m.tool == t))
        .filter_map(|m| m.true_outcome.as_ref().map(|o| (m, o)))
        .collect();

    let required = config.min_samples_for_analysis;
    if samples.len() < required || samples.is_empty() {
        return AlignmentAnalysis::insufficient(tool, samples.len(), required);
    }

    let weights = &config.weights;
    let n = samples.len();
    let outcomes: Vec<f64> = samples
        .iter()
        .map(|(_, o)| outcome_scalar(o, weights))
        .collect();
    let sample_confidence = (n as f64 / (2 * required.max(1)) as f64).min(1.0);

    let mut divergences = Vec::new();
    let mut recommendations = Vec::new();
    let mut metric_correlations = BTreeMap::new();

    for metric in TrackedMetric::ALL {
        let proxies: Vec<f64> = samples
            .iter()
            .map(|(m, _)| m.proxy_metrics.tracked(metric))
            .collect();
        let r = pearson_correlation(&proxies, &outcomes);
        metric_correlations.insert(metric, r);

        if r < config.correlation_threshold {
            divergences.push(AlignmentDivergence::new(
                DivergenceType::MeasurementError,
                metric.name(),
                config.correlation_threshold,
                r,
                sample_confidence,
                format!(
                    "{metric} correlates weakly with true outcomes (r={r:.2}, threshold {:.2})",
                    config.correlation_threshold
                ),
            ));
            recommendations.push(format!(
                "Review how {metric} is measured: it does not track true outcomes (r={r:.2})"
            ));
        }
    }
    let correlation = mean(&metric_correlations.values().copied().collect::<Vec<_>>());

    let goodhart = estimate_goodhart(&samples);
    if goodhart.risk > config.goodhart_risk_threshold {
        divergences.push(AlignmentDivergence::new(
            DivergenceType::GoodhartEffect,
            TrackedMetric::TaskCompletion.name(),
            goodhart.task_gain,
            goodhart.outcome_gain,
            goodhart.risk / 100.0,
            format!(
                "taskCompletion rose by {:.2} while goal achievement moved {:.2} (risk {:.0})",
                goodhart.task_gain, goodhart.outcome_gain, goodhart.risk
            ),
        ));
        recommendations.push(
            "Goodhart effect suspected: proxy metrics improve while outcomes stay flat; \
             increase ground-truth sampling and rotate evaluation criteria"
                .to_string(),
        );
    }

    let mut gamed = 0usize;
    for (m, o) in &samples {
        let p = &m.proxy_metrics;
        let proxy_score = mean(&[p.task_completion, p.response_quality, p.helpfulness_score]);
        let outcome_score = gaming_outcome_score(o, weights);
        if proxy_score > GAMING_MIN_PROXY && outcome_score < GAMING_MAX_OUTCOME {
            gamed += 1;
            divergences.push(AlignmentDivergence::new(
                DivergenceType::ProxyGaming,
                "proxyScore",
                proxy_score,
                outcome_score,
                if o.human_verified { 0.9 } else { 0.7 },
                format!(
                    "measurement {} scored {proxy_score:.2} on proxies but {outcome_score:.2} on outcomes",
                    m.id
                ),
            ));
        }
    }
    if gamed > 0 {
        recommendations.push(format!(
            "{gamed} measurement(s) show high proxy scores with poor outcomes; audit for proxy gaming"
        ));
    }

    if recommendations.is_empty() {
        recommendations
            .push("Proxy metrics track true outcomes; keep sampling ground truth".to_string());
    }

    let alignment_score = (correlation * 100.0
        - divergences.len() as f64 * 10.0
        - goodhart.risk * 0.3)
        .clamp(0.0, 100.0);

    AlignmentAnalysis {
        tool: tool.map(str::to_string),
        sample_size: n,
        alignment_score,
        correlation,
        metric_correlations,
        divergences,
        goodhart_risk: goodhart.risk,
        recommendations,
    }
}
