use chrono::{Duration, TimeZone, Utc};
use oiv_core::{
    Environment, MeasurementFilter, MeasurementInput, OutcomeVerifier, ProxyMetrics,
    VerifierConfig,
};

fn metrics() -> ProxyMetrics {
    ProxyMetrics::new(0.8, 0.7, 1.0, 0.6)
}

#[test]
fn measurements_come_back_in_insertion_order() {
    let mut verifier = OutcomeVerifier::default();
    let recorded: Vec<String> = (0..4)
        .map(|i| {
            verifier
                .record_measurement("search", format!("s{i}"), metrics(), Environment::Production, None, None)
                .id
        })
        .collect();

    let all = verifier.get_measurements(&MeasurementFilter::default());
    let ids: Vec<String> = all.iter().map(|m| m.id.clone()).collect();
    assert_eq!(ids, recorded);
    assert_eq!(all[2].session_id, "s2");
    assert_eq!(all[2].proxy_metrics, metrics());
}

#[test]
fn store_evicts_oldest_beyond_capacity() {
    let config = VerifierConfig {
        max_measurements: 3,
        ..VerifierConfig::default()
    };
    let mut verifier = OutcomeVerifier::new(config);
    for i in 0..5 {
        verifier.record_measurement("search", format!("s{i}"), metrics(), Environment::Production, None, None);
    }

    assert_eq!(verifier.measurement_count(), 3);
    let sessions: Vec<String> = verifier
        .get_measurements(&MeasurementFilter::default())
        .into_iter()
        .map(|m| m.session_id)
        .collect();
    assert_eq!(sessions, vec!["s2", "s3", "s4"]);
}

#[test]
fn filters_narrow_by_tool_environment_and_time() {
    let base = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
    let mut verifier = OutcomeVerifier::default();
    for i in 0..6 {
        let (tool, env) = match i % 3 {
            0 => ("search", Environment::Test),
            1 => ("search", Environment::Production),
            _ => ("summarize", Environment::Production),
        };
        verifier.record_input(
            MeasurementInput::new(tool, format!("s{i}"), metrics(), env).at(base + Duration::minutes(i)),
        );
    }

    let search = verifier.get_measurements(&MeasurementFilter::for_tool("search"));
    assert_eq!(search.len(), 4);

    let search_prod = verifier.get_measurements(
        &MeasurementFilter::for_tool("search").in_environment(Environment::Production),
    );
    let sessions: Vec<&str> = search_prod.iter().map(|m| m.session_id.as_str()).collect();
    assert_eq!(sessions, vec!["s1", "s4"]);

    // `since` is inclusive
    let late = verifier
        .get_measurements(&MeasurementFilter::default().since(base + Duration::minutes(4)));
    assert_eq!(late.len(), 2);
    assert_eq!(late[0].session_id, "s4");
}

#[test]
fn limit_keeps_most_recent_matches() {
    let mut verifier = OutcomeVerifier::default();
    for i in 0..5 {
        verifier.record_measurement("search", format!("s{i}"), metrics(), Environment::Staging, None, None);
    }

    let recent = verifier.get_measurements(&MeasurementFilter::for_tool("search").limit(2));
    let sessions: Vec<&str> = recent.iter().map(|m| m.session_id.as_str()).collect();
    assert_eq!(sessions, vec!["s3", "s4"]);
}

#[test]
fn missing_timestamp_defaults_to_now() {
    let before = Utc::now();
    let mut verifier = OutcomeVerifier::default();
    let m = verifier.record_input(MeasurementInput::new("search", "s", metrics(), Environment::Test));
    assert!(m.timestamp >= before);
    assert!(m.id.starts_with("m-"));
}
