use oiv_core::{
    read_report, report_block_reason, write_report, Environment, FileToScan, IntegrityContext,
    IntegrityError, IntegrityReport, OutcomeVerifier, ProxyMetrics, TrueOutcome,
};
use tempfile::tempdir;

fn clean_report(verifier: &mut OutcomeVerifier) -> IntegrityReport {
    let mut report = IntegrityReport::new("run-7", "agent");
    report.slop = Some(verifier.run_slop_test("Parsed 12 manifests in 40 ms."));
    report.reward_integrity = Some(verifier.verify_reward_integrity(&IntegrityContext::default()));
    report.test_bypass = Some(verifier.detect_test_bypass("agent"));
    report.alignment = Some(verifier.analyze_alignment(Some("agent")));
    report
}

#[test]
fn report_round_trips_with_digest() {
    let dir = tempdir().unwrap();
    let mut verifier = OutcomeVerifier::default();
    let report = clean_report(&mut verifier);

    let path = write_report(&report, dir.path()).unwrap();
    assert!(path.ends_with("run-7/integrity.json"));
    assert!(dir.path().join("run-7/integrity.digest").exists());

    let loaded = read_report("run-7", dir.path()).unwrap();
    assert_eq!(loaded.run_id, "run-7");
    assert_eq!(loaded.tool, "agent");
    assert_eq!(loaded.generated_at, report.generated_at);
    assert_eq!(loaded.slop, report.slop);
    assert_eq!(loaded.reward_integrity, report.reward_integrity);
    assert!(loaded.reward_hacking.is_none());
    assert_eq!(report_block_reason(&loaded), None);
}

#[test]
fn tampered_report_is_rejected() {
    let dir = tempdir().unwrap();
    let mut verifier = OutcomeVerifier::default();
    let report = clean_report(&mut verifier);
    let path = write_report(&report, dir.path()).unwrap();

    let tampered = std::fs::read_to_string(&path)
        .unwrap()
        .replace("run-7", "run-8");
    std::fs::write(&path, tampered).unwrap();

    let err = read_report("run-7", dir.path()).unwrap_err();
    assert!(matches!(err, IntegrityError::DigestMismatch { .. }));
}

#[test]
fn missing_report_is_an_io_error() {
    let dir = tempdir().unwrap();
    let err = read_report("nope", dir.path()).unwrap_err();
    assert!(matches!(err, IntegrityError::Io(_)));
}

#[test]
fn critical_patterns_block_first() {
    let verifier = OutcomeVerifier::default();
    let mut report = IntegrityReport::new("run-9", "agent");
    report.reward_integrity = Some(verifier.verify_reward_integrity(&IntegrityContext {
        files_to_scan: vec![FileToScan::new("run.py", "os._exit(0)\n")],
        ..IntegrityContext::default()
    }));
    report.slop = Some(verifier.run_slop_test("Great question! Delve."));

    let reason = report_block_reason(&report).expect("must block");
    assert!(reason.starts_with("external verification required"));
}

#[test]
fn poor_alignment_blocks() {
    let mut verifier = OutcomeVerifier::default();
    for i in 0..10 {
        verifier.record_measurement(
            "agent",
            format!("s{i}"),
            ProxyMetrics::new(0.95, 0.9, 1.0, 0.9),
            Environment::Production,
            Some(TrueOutcome::default()),
            None,
        );
    }
    let mut report = IntegrityReport::new("run-10", "agent");
    report.alignment = Some(verifier.analyze_alignment(Some("agent")));

    let reason = report_block_reason(&report).expect("must block");
    assert!(reason.starts_with("alignment score"));
}

#[test]
fn run_ids_cannot_escape_the_report_dir() {
    let root = tempdir().unwrap();
    let reports = root.path().join("reports");
    std::fs::create_dir_all(&reports).unwrap();

    let report = IntegrityReport::new("../escape", "agent");
    let err = write_report(&report, &reports).unwrap_err();
    assert!(matches!(err, IntegrityError::InvalidRunId(ref id) if id == "../escape"));
    assert!(!root.path().join("escape").exists());

    assert!(matches!(
        read_report("../escape", &reports),
        Err(IntegrityError::InvalidRunId(_))
    ));
    assert!(matches!(
        write_report(&IntegrityReport::new("nested/run", "agent"), &reports),
        Err(IntegrityError::InvalidRunId(_))
    ));
}
