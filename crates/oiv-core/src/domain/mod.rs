//! Domain models for OIV.
//!
//! Canonical definitions for the core records:
//! - `OutcomeMeasurement`: one observed tool execution (proxy metrics plus
//!   optional ground truth)
//! - `AlignmentDivergence`: a detected proxy/outcome mismatch
//! - `IntegrityError`: the error taxonomy

pub mod divergence;
pub mod error;
pub mod measurement;

use chrono::Utc;

// Re-export main types and errors
pub use divergence::{AlignmentDivergence, DivergenceType, Severity};
pub use error::{IntegrityError, Result};
pub use measurement::{
    Environment, MeasurementFilter, MeasurementInput, OutcomeMeasurement, ProxyMetrics,
    TestContext, TrackedMetric, TrueOutcome, ValueDelivered,
};

/// `<prefix>-<unix millis>-<8 hex chars>`: sorts by creation time, unique
/// without coordination.
pub(crate) fn time_ordered_id(prefix: &str) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "{}-{}-{}",
        prefix,
        Utc::now().timestamp_millis(),
        &suffix[..8]
    )
}
