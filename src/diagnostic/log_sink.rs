use super::{DiagnosticSink, Inspection, InspectionKind};
use crate::Result;

/// Dumps inspections through `tracing` and lets the call proceed.
///
/// Breakpoints are logged at `WARN`, post-mortems at `ERROR`, so the sink is
/// useful in non-interactive processes where stopping is not an option.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn inspect(&self, inspection: &Inspection<'_>) -> Result<()> {
        let record = inspection.record();
        let trigger = record.trigger();
        match (inspection.kind(), inspection.failure()) {
            (InspectionKind::PostMortem, Some(failure)) => {
                tracing::error!(
                    trigger = %trigger,
                    token = %trigger.token(),
                    call = %record,
                    failure = %failure,
                    location = failure.location().unwrap_or("unknown"),
                    backtrace = %failure.backtrace(),
                    "Post-mortem"
                );
            }
            _ => {
                tracing::warn!(
                    trigger = %trigger,
                    token = %trigger.token(),
                    call = %record,
                    "Breakpoint"
                );
            }
        }
        Ok(())
    }
}

/// Ignores every inspection.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl DiagnosticSink for NoopSink {
    fn inspect(&self, _inspection: &Inspection<'_>) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CallArgs, TriggerId, call_record::test_record, diagnostic::Failure};

    #[test]
    fn test_log_sink_never_aborts() {
        let record = test_record(TriggerId::mint("f"), CallArgs::new().arg(1));
        let failure = Failure::error("nope");
        assert!(LogSink.inspect(&Inspection::breakpoint(&record)).is_ok());
        assert!(
            LogSink
                .inspect(&Inspection::post_mortem(&record, &failure))
                .is_ok()
        );
    }
}
