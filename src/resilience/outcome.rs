//! Call outcome classification.

use serde::Serialize;
use std::time::Duration;

/// What happened to one protected call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutcomeKind {
    Success,
    Failure,
    SlowSuccess,
    SlowFailure,
}

impl OutcomeKind {
    /// Both failure variants count toward the failure rate.
    pub fn is_failure(self) -> bool {
        matches!(self, Self::Failure | Self::SlowFailure)
    }

    /// Both slow variants count toward the slow-call rate.
    pub fn is_slow(self) -> bool {
        matches!(self, Self::SlowSuccess | Self::SlowFailure)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::SlowSuccess => "slow_success",
            Self::SlowFailure => "slow_failure",
        }
    }
}

/// A classified outcome together with the measured wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub kind: OutcomeKind,
    pub elapsed: Duration,
}

impl Outcome {
    /// Classify a completed call. Calls at or above `slow_threshold` are slow.
    pub fn classify(failed: bool, elapsed: Duration, slow_threshold: Duration) -> Self {
        let slow = elapsed >= slow_threshold;
        let kind = match (failed, slow) {
            (false, false) => OutcomeKind::Success,
            (true, false) => OutcomeKind::Failure,
            (false, true) => OutcomeKind::SlowSuccess,
            (true, true) => OutcomeKind::SlowFailure,
        };
        Self { kind, elapsed }
    }

    pub fn success(elapsed: Duration) -> Self {
        Self {
            kind: OutcomeKind::Success,
            elapsed,
        }
    }

    pub fn failure(elapsed: Duration) -> Self {
        Self {
            kind: OutcomeKind::Failure,
            elapsed,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.kind.is_failure()
    }

    pub fn is_slow(&self) -> bool {
        self.kind.is_slow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slow_success_is_not_a_failure() {
        let outcome = Outcome::classify(
            false,
            Duration::from_millis(600),
            Duration::from_millis(500),
        );
        assert_eq!(outcome.kind, OutcomeKind::SlowSuccess);
        assert!(outcome.is_slow());
        assert!(!outcome.is_failure());
    }

    #[test]
    fn test_slow_failure_has_both_predicates() {
        let outcome = Outcome::classify(true, Duration::from_secs(1), Duration::from_millis(500));
        assert_eq!(outcome.kind, OutcomeKind::SlowFailure);
        assert!(outcome.is_slow());
        assert!(outcome.is_failure());
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let at = Outcome::classify(false, Duration::from_millis(500), Duration::from_millis(500));
        assert_eq!(at.kind, OutcomeKind::SlowSuccess);

        let below = Outcome::classify(true, Duration::from_millis(499), Duration::from_millis(500));
        assert_eq!(below.kind, OutcomeKind::Failure);
    }
}
