//! The verification engine: one explicit instance owning its history.
//!
//! [`OutcomeVerifier`] holds the measurement store, the divergence log,
//! the configuration and an optional alert sink. It is synchronous and
//! performs no I/O. It does no internal locking either: share it across
//! threads behind a `Mutex` or give it a single owner.

use std::fmt;

use chrono::Utc;

use crate::alignment::{self, AlignmentAnalysis};
use crate::config::VerifierConfig;
use crate::domain::{
    time_ordered_id, AlignmentDivergence, Environment, MeasurementFilter, MeasurementInput,
    OutcomeMeasurement, ProxyMetrics, Result, TestContext, TrueOutcome,
};
use crate::metrics::METRICS;
use crate::obs::{self, AnalysisSpan};
use crate::reward_integrity::{self, IntegrityContext, RewardIntegrityResult};
use crate::sink::DivergenceSink;
use crate::slop::{self, SlopTestResult};
use crate::store::{DivergenceLog, MeasurementStore};
use crate::test_bypass::{self, TestBypassResult};
use crate::trend::{self, RewardHackingResult};

/// Reward/outcome integrity verifier.
pub struct OutcomeVerifier {
    config: VerifierConfig,
    measurements: MeasurementStore,
    divergences: DivergenceLog,
    sink: Option<Box<dyn DivergenceSink + Send>>,
}

impl fmt::Debug for OutcomeVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutcomeVerifier")
            .field("config", &self.config)
            .field("measurements", &self.measurements.len())
            .field("divergences", &self.divergences.len())
            .field("has_sink", &self.sink.is_some())
            .finish()
    }
}

impl Default for OutcomeVerifier {
    fn default() -> Self {
        Self::new(VerifierConfig::default())
    }
}

impl OutcomeVerifier {
    /// Create a verifier. The configuration is used as given; see
    /// [`OutcomeVerifier::try_new`] for a validating constructor.
    pub fn new(config: VerifierConfig) -> Self {
        Self {
            measurements: MeasurementStore::new(config.max_measurements),
            divergences: DivergenceLog::new(config.max_divergences),
            config,
            sink: None,
        }
    }

    /// Validate `config` before constructing.
    pub fn try_new(config: VerifierConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config))
    }

    /// Register the divergence sink (replacing any previous one).
    pub fn with_sink(mut self, sink: impl DivergenceSink + Send + 'static) -> Self {
        self.set_sink(sink);
        self
    }

    pub fn set_sink(&mut self, sink: impl DivergenceSink + Send + 'static) {
        self.sink = Some(Box::new(sink));
    }

    pub fn clear_sink(&mut self) {
        self.sink = None;
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Measurement store
    // -----------------------------------------------------------------------

    /// Record one execution, stamped now. Evicts the oldest measurements
    /// once the store is over capacity.
    pub fn record_measurement(
        &mut self,
        tool: impl Into<String>,
        session_id: impl Into<String>,
        proxy_metrics: ProxyMetrics,
        environment: Environment,
        true_outcome: Option<TrueOutcome>,
        test_context: Option<TestContext>,
    ) -> OutcomeMeasurement {
        self.record_input(MeasurementInput {
            tool: tool.into(),
            session_id: session_id.into(),
            proxy_metrics,
            environment,
            true_outcome,
            test_context,
            timestamp: None,
        })
    }

    /// Record a caller-assembled measurement. A missing timestamp means now.
    pub fn record_input(&mut self, input: MeasurementInput) -> OutcomeMeasurement {
        let measurement = OutcomeMeasurement {
            id: time_ordered_id("m"),
            timestamp: input.timestamp.unwrap_or_else(Utc::now),
            tool: input.tool,
            session_id: input.session_id,
            proxy_metrics: input.proxy_metrics,
            true_outcome: input.true_outcome,
            environment: input.environment,
            test_context: input.test_context,
        };

        let evicted = self.measurements.append(measurement.clone());
        METRICS.inc_measurements_recorded();
        obs::emit_measurement_recorded(
            &measurement.id,
            &measurement.tool,
            measurement.environment,
            measurement.true_outcome.is_some(),
        );
        if evicted > 0 {
            METRICS.add_measurements_evicted(evicted as u64);
            obs::emit_measurements_evicted(evicted, self.measurements.len());
        }
        measurement
    }

    /// Copies of the recorded measurements matching `filter`, oldest first.
    pub fn get_measurements(&self, filter: &MeasurementFilter) -> Vec<OutcomeMeasurement> {
        self.measurements.query(filter)
    }

    /// The most recent `limit` divergences (all when `None`), oldest first.
    pub fn get_divergences(&self, limit: Option<usize>) -> Vec<AlignmentDivergence> {
        self.divergences.recent(limit)
    }

    pub fn measurement_count(&self) -> usize {
        self.measurements.len()
    }

    pub fn divergence_count(&self) -> usize {
        self.divergences.len()
    }

    /// Empty both the measurement store and the divergence log.
    pub fn clear(&mut self) {
        self.measurements.clear();
        self.divergences.clear();
        tracing::info!(event = "verifier.cleared");
    }

    // -----------------------------------------------------------------------
    // Analyses
    // -----------------------------------------------------------------------

    /// Analyze proxy/outcome alignment over the stored measurements.
    ///
    /// New divergences are appended to the divergence log and published to
    /// the sink, if any, before returning.
    pub fn analyze_alignment(&mut self, tool: Option<&str>) -> AlignmentAnalysis {
        let _span = AnalysisSpan::enter("alignment", tool);
        let analysis = alignment::analyze_alignment(self.measurements.iter(), tool, &self.config);
        for divergence in &analysis.divergences {
            self.record_divergence(divergence.clone());
        }
        obs::emit_alignment_analyzed(
            tool,
            analysis.sample_size,
            analysis.alignment_score,
            analysis.goodhart_risk,
            analysis.divergences.len(),
        );
        analysis
    }

    fn record_divergence(&mut self, divergence: AlignmentDivergence) {
        obs::emit_divergence_detected(&divergence);
        METRICS.inc_divergences_emitted();
        self.divergences.push(divergence.clone());
        if let Some(sink) = &self.sink {
            sink.publish(&divergence);
        }
    }

    /// Compare `tool`'s test-environment behavior against production.
    pub fn detect_test_bypass(&self, tool: &str) -> TestBypassResult {
        let _span = AnalysisSpan::enter("test_bypass", Some(tool));
        let result = if !self.config.enable_test_bypass_detection {
            TestBypassResult::inconclusive(tool, "test bypass detection disabled")
        } else {
            let test = self
                .measurements
                .query(&MeasurementFilter::for_tool(tool).in_environment(Environment::Test));
            let production = self
                .measurements
                .query(&MeasurementFilter::for_tool(tool).in_environment(Environment::Production));
            test_bypass::detect_test_bypass(tool, &test, &production, &self.config)
        };
        obs::emit_test_bypass_evaluated(&result);
        result
    }

    /// Score free text for filler language.
    pub fn run_slop_test(&self, text: &str) -> SlopTestResult {
        if !self.config.enable_slop_detection {
            return SlopTestResult::clean();
        }
        let result = slop::run_slop_test(text, &self.config.weights);
        METRICS.inc_slop_tests();
        obs::emit_slop_evaluated(
            text.split_whitespace().count(),
            result.slop_score,
            result.passed,
        );
        result
    }

    /// Trend analysis over caller-supplied recent metrics and outcomes.
    pub fn detect_reward_hacking(
        &self,
        tool: &str,
        recent_metrics: &[ProxyMetrics],
        recent_outcomes: &[TrueOutcome],
    ) -> RewardHackingResult {
        let _span = AnalysisSpan::enter("reward_hacking", Some(tool));
        let result = trend::detect_reward_hacking(
            tool,
            recent_metrics,
            recent_outcomes,
            &self.config.weights,
        );
        obs::emit_reward_hacking_evaluated(&result);
        result
    }

    /// Scan a change set for test-subversion patterns.
    pub fn verify_reward_integrity(&self, context: &IntegrityContext) -> RewardIntegrityResult {
        let _span = AnalysisSpan::enter("reward_integrity", None);
        let result = reward_integrity::verify_reward_integrity(context);
        METRICS.inc_code_scans();
        obs::emit_reward_integrity_verified(context.files_to_scan.len(), &result);
        result
    }
}
