//! OIV Core Library
//!
//! Outcome integrity verification for AI tools: checks that the proxy
//! metrics a tool is optimized against still track what actually happened,
//! and flags test-environment bypass, reward hacking, test-subverting code
//! changes and filler-heavy output.
//!
//! Start with [`OutcomeVerifier`]; the detectors are also exposed as pure
//! functions in their modules.

pub mod alignment;
pub mod config;
pub mod domain;
pub mod metrics;
pub mod obs;
pub mod report;
pub mod reward_integrity;
pub mod sink;
pub mod slop;
pub mod stats;
pub mod store;
pub mod telemetry;
pub mod test_bypass;
pub mod trend;
pub mod verifier;

pub use alignment::{AlignmentAnalysis, GoodhartEstimate};

pub use config::{PolicyWeights, VerifierConfig};

pub use domain::{
    AlignmentDivergence, DivergenceType, Environment, IntegrityError, MeasurementFilter,
    MeasurementInput, OutcomeMeasurement, ProxyMetrics, Result, Severity, TestContext,
    TrackedMetric, TrueOutcome, ValueDelivered,
};

pub use report::{read_report, report_block_reason, write_report, IntegrityReport};

pub use reward_integrity::{
    FileToScan, IntegrityContext, RewardIntegrityResult, RewardPattern,
};

pub use sink::DivergenceSink;

pub use slop::{SlopMatch, SlopSeverity, SlopTestResult};

pub use telemetry::{init_tracing, LogFormat};

pub use test_bypass::{BypassIndicator, BypassIndicatorKind, RiskLevel, TestBypassResult};

pub use trend::{HackingTier, RewardHackingResult};

pub use verifier::OutcomeVerifier;

/// Crate version, shared by every workspace member.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
