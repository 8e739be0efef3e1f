//! Structured observability hooks for verifier operations.
//!
//! This module provides:
//! - Analysis-scoped tracing spans via the `AnalysisSpan` RAII guard
//! - Emission functions for state changes and verdicts
//!
//! Verdict events are emitted at `info!`, divergences at `warn!`, store
//! bookkeeping at `debug!`. Filter with `RUST_LOG`; see
//! [`crate::telemetry::init_tracing`] for JSON output.

use tracing::{debug, info, warn};

use crate::domain::{AlignmentDivergence, Environment};
use crate::reward_integrity::RewardIntegrityResult;
use crate::test_bypass::TestBypassResult;
use crate::trend::RewardHackingResult;

/// RAII guard that enters an analysis-scoped span.
///
/// # Example
///
/// ```ignore
/// let _span = AnalysisSpan::enter("alignment", Some("search"));
/// // tracing calls below carry operation = "alignment", tool = "search"
/// ```
pub struct AnalysisSpan {
    _span: tracing::span::EnteredSpan,
}

impl AnalysisSpan {
    pub fn enter(operation: &str, tool: Option<&str>) -> Self {
        let span = tracing::info_span!(
            "oiv.analysis",
            operation = %operation,
            tool = tool.unwrap_or("*"),
        );
        Self {
            _span: span.entered(),
        }
    }
}

pub fn emit_measurement_recorded(id: &str, tool: &str, environment: Environment, has_outcome: bool) {
    debug!(
        event = "measurement.recorded",
        measurement_id = %id,
        tool = %tool,
        environment = %environment,
        has_outcome = has_outcome,
    );
}

pub fn emit_measurements_evicted(count: usize, retained: usize) {
    debug!(event = "measurement.evicted", count = count, retained = retained);
}

/// Emit event: a new divergence was recorded (warning level).
pub fn emit_divergence_detected(divergence: &AlignmentDivergence) {
    warn!(
        event = "divergence.detected",
        divergence_id = %divergence.id,
        divergence_type = %divergence.divergence_type,
        severity = %divergence.severity,
        metric = %divergence.metric,
        expected = divergence.expected_value,
        actual = divergence.actual_value,
    );
}

pub fn emit_alignment_analyzed(
    tool: Option<&str>,
    sample_size: usize,
    alignment_score: f64,
    goodhart_risk: f64,
    divergences: usize,
) {
    info!(
        event = "alignment.analyzed",
        tool = tool.unwrap_or("*"),
        sample_size = sample_size,
        alignment_score = alignment_score,
        goodhart_risk = goodhart_risk,
        divergences = divergences,
    );
}

pub fn emit_test_bypass_evaluated(result: &TestBypassResult) {
    info!(
        event = "test_bypass.evaluated",
        tool = %result.tool,
        detected = result.detected,
        confidence = result.confidence,
        risk_level = %result.risk_level,
        indicators = result.indicators.len(),
    );
}

pub fn emit_reward_hacking_evaluated(result: &RewardHackingResult) {
    info!(
        event = "reward_hacking.evaluated",
        tool = %result.tool,
        detected = result.detected,
        hacking_score = result.hacking_score,
    );
}

pub fn emit_reward_integrity_verified(files: usize, result: &RewardIntegrityResult) {
    info!(
        event = "reward_integrity.verified",
        files = files,
        passed = result.passed,
        patterns = result.patterns.len(),
        external_verification_required = result.external_verification_required,
        test_infrastructure_compromised = result.test_infrastructure_compromised,
    );
}

pub fn emit_slop_evaluated(words: usize, slop_score: f64, passed: bool) {
    info!(
        event = "slop.evaluated",
        words = words,
        slop_score = slop_score,
        passed = passed,
    );
}
