//! Pluggable diagnostic sinks.
//!
//! The debug actions never talk to a debugger directly. They build an
//! [`Inspection`] and hand it to the [`DiagnosticSink`] configured on the
//! registry, which may log it, record it, ignore it, or stop and prompt.

mod console;
mod failure;
mod inspection;
mod log_sink;
#[cfg(feature = "recorder")]
mod recorder;

pub use console::ConsoleBreakpoint;
pub use failure::{Failure, FailureKind};
pub(crate) use failure::{catch_failure, panic_message};
pub use inspection::{Inspection, InspectionKind, InspectionReport};
pub use log_sink::{LogSink, NoopSink};
#[cfg(feature = "recorder")]
pub use recorder::Recorder;

use crate::Result;

/// Suspends and inspects an intercepted call.
///
/// Returning an error aborts the intercepted call: the error travels out of
/// the action, through the broadcast, to the caller of the instrumented
/// function (subject to the registry's [`FailurePolicy`](crate::FailurePolicy)).
pub trait DiagnosticSink: Send + Sync {
    fn inspect(&self, inspection: &Inspection<'_>) -> Result<()>;
}
