//! Alert sinks for newly detected divergences.
//!
//! The verifier publishes each divergence synchronously, right after it is
//! appended to the divergence log. A sink is any observer implementing
//! [`DivergenceSink`]: a closure, an `mpsc` channel, or a custom type.
//!
//! ```rust,ignore
//! let (tx, rx) = std::sync::mpsc::channel();
//! let mut verifier = OutcomeVerifier::new(VerifierConfig::default()).with_sink(tx);
//! verifier.analyze_alignment(None);
//! for divergence in rx.try_iter() { /* page someone */ }
//! ```

use std::sync::mpsc::Sender;

use tracing::warn;

use crate::domain::AlignmentDivergence;

/// Observer notified of every newly recorded divergence.
pub trait DivergenceSink {
    fn publish(&self, divergence: &AlignmentDivergence);
}

impl<F> DivergenceSink for F
where
    F: Fn(&AlignmentDivergence),
{
    fn publish(&self, divergence: &AlignmentDivergence) {
        self(divergence)
    }
}

impl DivergenceSink for Sender<AlignmentDivergence> {
    fn publish(&self, divergence: &AlignmentDivergence) {
        if self.send(divergence.clone()).is_err() {
            warn!(
                event = "divergence.sink_disconnected",
                divergence_id = %divergence.id,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DivergenceType;
    use std::cell::RefCell;
    use std::sync::mpsc;

    fn sample() -> AlignmentDivergence {
        AlignmentDivergence::new(
            DivergenceType::ProxyGaming,
            "proxyScore",
            0.9,
            0.2,
            0.7,
            "high proxy, poor outcome",
        )
    }

    #[test]
    fn closure_sink_receives_divergence() {
        let seen = RefCell::new(Vec::new());
        let sink = |d: &AlignmentDivergence| seen.borrow_mut().push(d.id.clone());
        let d = sample();
        sink.publish(&d);
        assert_eq!(seen.into_inner(), vec![d.id]);
    }

    #[test]
    fn channel_sink_forwards_and_tolerates_disconnect() {
        let (tx, rx) = mpsc::channel();
        let d = sample();
        tx.publish(&d);
        assert_eq!(rx.try_recv().unwrap().id, d.id);

        drop(rx);
        // Must not panic once the receiver is gone.
        tx.publish(&d);
    }
}
