//! Verifier configuration and scoring policy constants.
//!
//! The numeric weights in [`PolicyWeights`] are product policy chosen
//! empirically. They are exposed so operators can override them; the
//! defaults are the reference values.

use serde::{Deserialize, Serialize};

use crate::domain::{IntegrityError, Result};

/// Runtime configuration for [`crate::OutcomeVerifier`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    /// Minimum true-outcome-bearing measurements before alignment analysis runs.
    pub min_samples_for_analysis: usize,
    /// Proxy/outcome correlations below this produce a measurement-error divergence.
    pub correlation_threshold: f64,
    /// Mean test/production metric gap that counts as statistical divergence.
    pub divergence_threshold: f64,
    /// Goodhart risk (0–100) above which a divergence is recorded.
    pub goodhart_risk_threshold: f64,
    pub enable_test_bypass_detection: bool,
    pub enable_slop_detection: bool,
    /// Measurement store capacity; oldest entries are evicted first.
    pub max_measurements: usize,
    /// Divergence log capacity; oldest entries are evicted first.
    pub max_divergences: usize,
    pub weights: PolicyWeights,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            min_samples_for_analysis: 10,
            correlation_threshold: 0.7,
            divergence_threshold: 0.3,
            goodhart_risk_threshold: 50.0,
            enable_test_bypass_detection: true,
            enable_slop_detection: true,
            max_measurements: 10_000,
            max_divergences: 1_000,
            weights: PolicyWeights::default(),
        }
    }
}

impl VerifierConfig {
    /// Reject settings that would make the analyses meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.max_measurements == 0 {
            return Err(IntegrityError::InvalidConfig(
                "max_measurements must be > 0".to_string(),
            ));
        }
        if self.max_divergences == 0 {
            return Err(IntegrityError::InvalidConfig(
                "max_divergences must be > 0".to_string(),
            ));
        }
        if !(-1.0..=1.0).contains(&self.correlation_threshold) {
            return Err(IntegrityError::InvalidConfig(format!(
                "correlation_threshold {} outside [-1, 1]",
                self.correlation_threshold
            )));
        }
        if !self.divergence_threshold.is_finite() || self.divergence_threshold < 0.0 {
            return Err(IntegrityError::InvalidConfig(format!(
                "divergence_threshold {} must be a non-negative number",
                self.divergence_threshold
            )));
        }
        if !(0.0..=100.0).contains(&self.goodhart_risk_threshold) {
            return Err(IntegrityError::InvalidConfig(format!(
                "goodhart_risk_threshold {} outside [0, 100]",
                self.goodhart_risk_threshold
            )));
        }
        self.weights.validate()
    }
}

/// Named scoring constants used across the detectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyWeights {
    // Outcome scalar used for correlation analysis.
    pub outcome_goal_weight: f64,
    pub outcome_satisfaction_weight: f64,
    pub outcome_value_high: f64,
    pub outcome_value_medium: f64,

    // Outcome score used by the proxy-gaming check.
    pub gaming_goal_weight: f64,
    pub gaming_satisfaction_divisor: f64,
    pub gaming_value_high: f64,
    pub gaming_value_medium: f64,

    // Trend-based hacking points.
    pub hacking_divergent_trend_points: f64,
    pub hacking_perfect_scores_points: f64,
    pub hacking_low_variance_points: f64,
    pub hacking_helpfulness_spike_points: f64,

    // Slop scoring.
    pub slop_high_weight: f64,
    pub slop_medium_weight: f64,
    pub slop_low_weight: f64,
    pub slop_pass_threshold: f64,
}

impl Default for PolicyWeights {
    fn default() -> Self {
        Self {
            outcome_goal_weight: 0.4,
            outcome_satisfaction_weight: 0.4,
            outcome_value_high: 0.2,
            outcome_value_medium: 0.1,
            gaming_goal_weight: 0.5,
            gaming_satisfaction_divisor: 10.0,
            gaming_value_high: 0.3,
            gaming_value_medium: 0.15,
            hacking_divergent_trend_points: 30.0,
            hacking_perfect_scores_points: 20.0,
            hacking_low_variance_points: 15.0,
            hacking_helpfulness_spike_points: 25.0,
            slop_high_weight: 3.0,
            slop_medium_weight: 2.0,
            slop_low_weight: 1.0,
            slop_pass_threshold: 30.0,
        }
    }
}

impl PolicyWeights {
    fn validate(&self) -> Result<()> {
        let named = [
            ("outcome_goal_weight", self.outcome_goal_weight),
            ("outcome_satisfaction_weight", self.outcome_satisfaction_weight),
            ("outcome_value_high", self.outcome_value_high),
            ("outcome_value_medium", self.outcome_value_medium),
            ("gaming_goal_weight", self.gaming_goal_weight),
            ("gaming_value_high", self.gaming_value_high),
            ("gaming_value_medium", self.gaming_value_medium),
            (
                "hacking_divergent_trend_points",
                self.hacking_divergent_trend_points,
            ),
            (
                "hacking_perfect_scores_points",
                self.hacking_perfect_scores_points,
            ),
            ("hacking_low_variance_points", self.hacking_low_variance_points),
            (
                "hacking_helpfulness_spike_points",
                self.hacking_helpfulness_spike_points,
            ),
            ("slop_high_weight", self.slop_high_weight),
            ("slop_medium_weight", self.slop_medium_weight),
            ("slop_low_weight", self.slop_low_weight),
            ("slop_pass_threshold", self.slop_pass_threshold),
        ];
        for (name, value) in named {
            if !value.is_finite() || value < 0.0 {
                return Err(IntegrityError::InvalidConfig(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        if self.gaming_satisfaction_divisor.is_nan() || self.gaming_satisfaction_divisor <= 0.0 {
            return Err(IntegrityError::InvalidConfig(
                "gaming_satisfaction_divisor must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}
