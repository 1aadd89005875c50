//! Built-in diagnostic actions.

use crate::{
    CallRecord, Result,
    diagnostic::{DiagnosticSink, Inspection},
};

/// Stop at every call: hand the record to the registry's diagnostic sink.
///
/// Runs during the broadcast, so whatever the sink inspects is the state
/// before the intercepted body executes. The call then proceeds normally,
/// unless the sink returns an error.
pub fn enter_debugger(record: &CallRecord) -> Result<()> {
    record.registry().sink().inspect(&Inspection::breakpoint(record))
}

/// Replay the call with the registry suppressed and, if the replay fails,
/// open a post-mortem inspection of the failure.
///
/// The intercepted body runs twice: once here and once for real after the
/// broadcast. Only use it on functions that are safe to call twice.
pub fn enter_debugger_on_error(record: &CallRecord) -> Result<()> {
    let registry = record.registry();
    let _guard = registry.suppress();
    match record.replay() {
        Ok(()) => Ok(()),
        Err(failure) => {
            tracing::debug!(trigger = %record.trigger(), %failure, "Replay failed");
            registry
                .sink()
                .inspect(&Inspection::post_mortem(record, &failure))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        Config, Error, FailurePolicy, Instrumented, Registry,
        diagnostic::{InspectionKind, InspectionReport},
        with_action,
    };
    use std::sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    #[derive(Default, Clone)]
    struct Capture(Arc<Mutex<Vec<(InspectionReport, bool)>>>);

    impl DiagnosticSink for Capture {
        fn inspect(&self, inspection: &Inspection<'_>) -> Result<()> {
            let suppressed = inspection.record().registry().is_suppressed();
            self.0.lock().unwrap().push((inspection.report(), suppressed));
            Ok(())
        }
    }

    struct Abort;

    impl DiagnosticSink for Abort {
        fn inspect(&self, inspection: &Inspection<'_>) -> Result<()> {
            Err(Error::SessionAborted(inspection.record().trigger().clone()))
        }
    }

    #[test]
    fn test_breakpoint_inspects_before_call() {
        let capture = Capture::default();
        let registry = Registry::new(Config::default().with_sink(capture.clone()));
        let ten = with_action(enter_debugger)
            .in_registry(registry.clone())
            .wrap("ten", |(): ()| Ok::<_, Error>(10));

        assert_eq!(ten.call(()).unwrap(), 10);
        let seen = capture.0.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0.kind, InspectionKind::Breakpoint);
        assert_eq!(seen[0].0.trigger, "ten");
        assert!(!seen[0].1);
    }

    #[test]
    fn test_aborting_sink_stops_the_call() {
        let registry = Registry::new(Config::default().with_sink(Abort));
        let runs = Arc::new(AtomicUsize::new(0));
        let r = runs.clone();
        let f = with_action(enter_debugger)
            .in_registry(registry.clone())
            .wrap("f", move |(): ()| {
                r.fetch_add(1, Ordering::SeqCst);
                Ok::<_, Error>(())
            });

        assert!(matches!(f.call(()), Err(Error::SessionAborted(_))));
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_aborting_sink_is_logged_under_log_and_continue() {
        let registry = Registry::new(
            Config::default()
                .with_sink(Abort)
                .with_failure_policy(FailurePolicy::LogAndContinue),
        );
        let f = with_action(enter_debugger)
            .in_registry(registry.clone())
            .wrap("f", |(): ()| Ok::<_, Error>(1));
        assert_eq!(f.call(()).unwrap(), 1);
    }

    #[test]
    fn test_successful_replay_is_silent_but_runs_twice() {
        let capture = Capture::default();
        let registry = Registry::new(Config::default().with_sink(capture.clone()));
        let runs = Arc::new(AtomicUsize::new(0));
        let r = runs.clone();
        let inc = with_action(enter_debugger_on_error)
            .in_registry(registry.clone())
            .wrap("inc", move |(x,): (u32,)| {
                r.fetch_add(1, Ordering::SeqCst);
                Ok::<_, Error>(x + 1)
            });

        assert_eq!(inc.call((1,)).unwrap(), 2);
        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert!(capture.0.lock().unwrap().is_empty());
        assert!(!registry.is_suppressed());
    }

    #[test]
    fn test_failed_replay_opens_post_mortem_while_suppressed() {
        let capture = Capture::default();
        let registry = Registry::new(Config::default().with_sink(capture.clone()));
        let checked_div = with_action(enter_debugger_on_error)
            .in_registry(registry.clone())
            .wrap("checked_div", |(a, b): (u32, u32)| {
                a.checked_div(b)
                    .ok_or_else(|| Error::external("division by zero"))
            });

        assert!(checked_div.call((1, 0)).is_err());

        let seen = capture.0.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let (report, suppressed) = &seen[0];
        assert_eq!(report.kind, InspectionKind::PostMortem);
        assert_eq!(report.args, vec!["1", "0"]);
        assert!(report.failure.as_deref().unwrap().contains("division by zero"));
        assert!(*suppressed);
    }

    #[test]
    fn test_replay_does_not_rebroadcast_nested_calls() {
        let capture = Capture::default();
        let registry = Registry::new(Config::default().with_sink(capture.clone()));
        let inner_calls = Arc::new(AtomicUsize::new(0));

        let inner = Instrumented::with_registry(registry.clone(), "inner", |(x,): (i32,)| {
            if x < 0 {
                panic!("negative input");
            }
            Ok::<_, Error>(x)
        });
        let ic = inner_calls.clone();
        registry.make_trigger(
            move |_: &CallRecord| -> Result<()> {
                ic.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
            &[inner.id().clone()],
        );

        let nested = inner.clone();
        let outer = with_action(enter_debugger_on_error)
            .in_registry(registry.clone())
            .wrap("outer", move |(x,): (i32,)| nested.call((x,)));

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| outer.call((-1,))));
        assert!(result.is_err());

        // one broadcast for the real nested call, none for the replayed one
        assert_eq!(inner_calls.load(Ordering::SeqCst), 1);
        let seen = capture.0.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0.failure.as_deref(), Some("negative input"));
        let location = seen[0].0.location.as_deref().unwrap();
        assert!(location.starts_with(file!()), "unexpected location {location}");
    }
}
