/// Per-run policy for handling a failed segment.
///
/// Best-effort continuation is the default: a single segment's failure is
/// recorded and the run moves on, maximizing recovered text. The strict
/// variant is an explicit opt-in (env `FAIL_FAST`), not a hardcoded mode.
///
/// `Copy` so the value can be handed to the orchestrator without cloning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContinuationPolicy {
    /// Record the failure and continue to the next segment.
    #[default]
    BestEffort,
    /// Abort the run on the first segment failure.
    FailFast,
}

/// Outcome of a continuation policy evaluation for a failed segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContinuationDecision {
    /// Keep the failure in the segment ledger and dispatch the next one.
    Continue,
    /// Stop dispatching; the failure becomes the run's result.
    Abort,
}

impl ContinuationPolicy {
    /// Decide what to do after a segment-level failure.
    ///
    /// Structural failures (invalid policy, invalid options) never reach
    /// this point — they abort before any segment is dispatched.
    pub fn on_segment_failure(&self) -> ContinuationDecision {
        match self {
            Self::BestEffort => ContinuationDecision::Continue,
            Self::FailFast => ContinuationDecision::Abort,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn best_effort_continues() {
        assert_eq!(
            ContinuationPolicy::BestEffort.on_segment_failure(),
            ContinuationDecision::Continue
        );
    }

    #[test]
    fn fail_fast_aborts() {
        assert_eq!(
            ContinuationPolicy::FailFast.on_segment_failure(),
            ContinuationDecision::Abort
        );
    }

    #[test]
    fn default_is_best_effort() {
        assert_eq!(ContinuationPolicy::default(), ContinuationPolicy::BestEffort);
    }
}
