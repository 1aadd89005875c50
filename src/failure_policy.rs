use std::fmt;

/// What a broadcast does when an action fails.
///
/// In both cases the failing consumer stays registered and keeps receiving
/// later calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FailurePolicy {
    /// Stop the broadcast and return the error to the caller of the
    /// instrumented function. Its body does not run.
    #[default]
    Propagate,
    /// Log the error, skip to the next consumer, then run the body as usual.
    LogAndContinue,
}

impl FailurePolicy {
    pub fn is_propagate(&self) -> bool {
        matches!(self, FailurePolicy::Propagate)
    }

    pub fn is_log_and_continue(&self) -> bool {
        matches!(self, FailurePolicy::LogAndContinue)
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::Propagate => write!(f, "Propagate"),
            FailurePolicy::LogAndContinue => write!(f, "LogAndContinue"),
        }
    }
}
