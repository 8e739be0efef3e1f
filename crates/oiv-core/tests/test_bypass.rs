use oiv_core::{
    BypassIndicatorKind, Environment, OutcomeVerifier, ProxyMetrics, RiskLevel, TestContext,
};

fn record(
    verifier: &mut OutcomeVerifier,
    env: Environment,
    metrics: ProxyMetrics,
    context: Option<TestContext>,
) {
    verifier.record_measurement("X", "s", metrics, env, None, context);
}

fn kinds(verifier: &OutcomeVerifier) -> Vec<BypassIndicatorKind> {
    verifier
        .detect_test_bypass("X")
        .indicators
        .iter()
        .map(|i| i.kind)
        .collect()
}

#[test]
fn fewer_than_five_per_environment_is_inconclusive() {
    let mut verifier = OutcomeVerifier::default();
    for _ in 0..4 {
        record(&mut verifier, Environment::Test, ProxyMetrics::new(1.0, 1.0, 1.0, 1.0), None);
    }
    for _ in 0..10 {
        record(&mut verifier, Environment::Production, ProxyMetrics::new(0.2, 0.2, 0.2, 0.2), None);
    }

    let result = verifier.detect_test_bypass("X");
    assert!(!result.detected);
    assert_eq!(result.confidence, 0.0);
    assert_eq!(result.risk_level, RiskLevel::None);
    assert!(result.indicators.is_empty());
    assert!(result.evidence[0].starts_with("Insufficient data"));
}

#[test]
fn perfect_test_runs_against_mediocre_production_are_high_risk() {
    let mut verifier = OutcomeVerifier::default();
    for _ in 0..6 {
        record(&mut verifier, Environment::Test, ProxyMetrics::new(1.0, 0.9, 1.0, 0.9), None);
    }
    for i in 0..6 {
        let safety = if i % 2 == 0 { 0.4 } else { 0.8 };
        record(
            &mut verifier,
            Environment::Production,
            ProxyMetrics::new(0.5, 0.5, safety, 0.5),
            None,
        );
    }

    let result = verifier.detect_test_bypass("X");
    // weights 0.425, 0.6, 0.4: mean below 0.5 but graded critical
    assert!(result.confidence < 0.5);
    assert!(result.detected);
    assert!(
        matches!(result.risk_level, RiskLevel::High | RiskLevel::Critical),
        "risk {:?}",
        result.risk_level
    );
    let fired = kinds(&verifier);
    assert!(fired.contains(&BypassIndicatorKind::PerfectScores));
    assert!(fired.contains(&BypassIndicatorKind::StatisticalDivergence));
    assert_eq!(result.evidence.len(), result.indicators.len());
}

#[test]
fn repetitive_synthetic_suites_are_detected() {
    let mut verifier = OutcomeVerifier::default();
    let context = TestContext {
        test_suite: "smoke".to_string(),
        test_case_id: "case-1".to_string(),
        is_synthetic: true,
        markers: vec![],
    };
    for _ in 0..6 {
        record(
            &mut verifier,
            Environment::Test,
            ProxyMetrics::new(1.0, 1.0, 1.0, 1.0),
            Some(context.clone()),
        );
    }
    for _ in 0..6 {
        record(&mut verifier, Environment::Production, ProxyMetrics::new(0.1, 0.1, 0.1, 0.1), None);
    }

    let result = verifier.detect_test_bypass("X");
    // weights 0.9, 0.6, 0.5, 0.4
    assert_eq!(result.indicators.len(), 4);
    assert!((result.confidence - 0.6).abs() < 1e-9);
    assert!(result.detected);
    assert_eq!(result.risk_level, RiskLevel::Critical);
    assert!(kinds(&verifier).contains(&BypassIndicatorKind::Behavioral));
}

#[test]
fn consistent_behavior_raises_nothing() {
    let mut verifier = OutcomeVerifier::default();
    for i in 0..6 {
        let q = 0.3 + i as f64 * 0.12;
        record(&mut verifier, Environment::Test, ProxyMetrics::new(0.7, q, 0.9, 0.6), None);
        record(&mut verifier, Environment::Production, ProxyMetrics::new(0.7, q, 0.9, 0.6), None);
    }

    let result = verifier.detect_test_bypass("X");
    assert!(result.indicators.is_empty());
    assert!(!result.detected);
    assert_eq!(result.risk_level, RiskLevel::None);
}

#[test]
fn staging_measurements_are_ignored() {
    let mut verifier = OutcomeVerifier::default();
    for _ in 0..10 {
        record(&mut verifier, Environment::Staging, ProxyMetrics::new(1.0, 1.0, 1.0, 1.0), None);
        record(&mut verifier, Environment::Production, ProxyMetrics::new(0.5, 0.5, 0.5, 0.5), None);
    }
    let result = verifier.detect_test_bypass("X");
    assert_eq!(result.risk_level, RiskLevel::None);
    assert!(result.evidence[0].contains("0 test"));
}

#[test]
fn unique_synthetic_cases_alone_raise_nothing() {
    let mut verifier = OutcomeVerifier::default();
    for i in 0..6 {
        let q = 0.3 + i as f64 * 0.12;
        let context = TestContext {
            test_suite: "generated".to_string(),
            test_case_id: format!("case-{i}"),
            is_synthetic: true,
            markers: vec![],
        };
        record(&mut verifier, Environment::Test, ProxyMetrics::new(0.7, q, 0.9, 0.6), Some(context));
        record(&mut verifier, Environment::Production, ProxyMetrics::new(0.7, q, 0.9, 0.6), None);
    }

    let result = verifier.detect_test_bypass("X");
    assert!(result.indicators.is_empty(), "{:?}", result.indicators);
    assert!(!result.detected);
    assert_eq!(result.risk_level, RiskLevel::None);
}
