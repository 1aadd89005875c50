use std::sync::Arc;

use crate::{
    FailurePolicy, MatchPolicy,
    diagnostic::{DiagnosticSink, LogSink},
};

/// Registry configuration.
///
/// Controls how triggers are matched, what happens when an action fails and
/// where the debug actions send their inspections. Use the builder methods to
/// customize, or use [`Default`].
///
/// # Examples
///
/// ```rust
/// use tripwire::{Config, FailurePolicy, MatchPolicy, diagnostic::NoopSink};
///
/// let config = Config::default()
///     .with_failure_policy(FailurePolicy::LogAndContinue)
///     .with_match_policy(MatchPolicy::ByName)
///     .with_sink(NoopSink);
/// ```
#[derive(Clone)]
pub struct Config {
    /// How records are matched against consumer triggers.
    /// Default: [`MatchPolicy::ByToken`]
    pub match_policy: MatchPolicy,

    /// What a broadcast does when an action returns an error or panics.
    /// Default: [`FailurePolicy::Propagate`]
    pub failure_policy: FailurePolicy,

    /// Target of [`enter_debugger`](crate::enter_debugger) and
    /// [`enter_debugger_on_error`](crate::enter_debugger_on_error).
    /// Default: [`LogSink`]
    pub sink: Arc<dyn DiagnosticSink>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            match_policy: MatchPolicy::default(),
            failure_policy: FailurePolicy::default(),
            sink: Arc::new(LogSink),
        }
    }
}

impl Config {
    pub fn with_match_policy(mut self, policy: MatchPolicy) -> Self {
        self.match_policy = policy;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Set the diagnostic sink used by the debug actions.
    ///
    /// An interactive session is available with
    /// [`ConsoleBreakpoint::stdio`](crate::diagnostic::ConsoleBreakpoint::stdio).
    pub fn with_sink<S: DiagnosticSink + 'static>(mut self, sink: S) -> Self {
        self.sink = Arc::new(sink);
        self
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("match_policy", &self.match_policy)
            .field("failure_policy", &self.failure_policy)
            .finish_non_exhaustive()
    }
}
