use std::{collections::BTreeMap, fmt};

use super::{Failure, FailureKind};
use crate::CallRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InspectionKind {
    /// Stop before the intercepted call runs.
    Breakpoint,
    /// Inspect a replay that failed.
    PostMortem,
}

impl fmt::Display for InspectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InspectionKind::Breakpoint => write!(f, "breakpoint"),
            InspectionKind::PostMortem => write!(f, "post-mortem"),
        }
    }
}

/// Context handed to a [`DiagnosticSink`](super::DiagnosticSink).
#[derive(Debug)]
pub struct Inspection<'a> {
    record: &'a CallRecord,
    failure: Option<&'a Failure>,
}

impl<'a> Inspection<'a> {
    pub fn breakpoint(record: &'a CallRecord) -> Self {
        Self {
            record,
            failure: None,
        }
    }

    pub fn post_mortem(record: &'a CallRecord, failure: &'a Failure) -> Self {
        Self {
            record,
            failure: Some(failure),
        }
    }

    pub fn kind(&self) -> InspectionKind {
        match self.failure {
            None => InspectionKind::Breakpoint,
            Some(_) => InspectionKind::PostMortem,
        }
    }

    pub fn record(&self) -> &'a CallRecord {
        self.record
    }

    pub fn failure(&self) -> Option<&'a Failure> {
        self.failure
    }

    /// Owned, printable summary of this inspection.
    pub fn report(&self) -> InspectionReport {
        let trigger = self.record.trigger();
        InspectionReport {
            kind: self.kind(),
            trigger: trigger.name().to_string(),
            token: trigger.token(),
            args: self.record.args().iter().map(|a| format!("{a:?}")).collect(),
            kwargs: self
                .record
                .kwargs()
                .iter()
                .map(|(k, v)| (k.to_string(), format!("{v:?}")))
                .collect(),
            failure_kind: self.failure.map(Failure::kind),
            failure: self.failure.map(|f| f.message().to_string()),
            location: self.failure.and_then(Failure::location).map(str::to_string),
        }
    }
}

/// Snapshot of an [`Inspection`] with every argument rendered via `Debug`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InspectionReport {
    pub kind: InspectionKind,
    pub trigger: String,
    pub token: u128,
    pub args: Vec<String>,
    pub kwargs: BTreeMap<String, String>,
    pub failure_kind: Option<FailureKind>,
    pub failure: Option<String>,
    /// Where a panicking replay panicked.
    #[cfg_attr(feature = "serde", serde(default))]
    pub location: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CallArgs, TriggerId, call_record::test_record};

    #[test]
    fn test_breakpoint_report() {
        let record = test_record(TriggerId::mint("div"), CallArgs::new().arg(1).arg(0));
        let report = Inspection::breakpoint(&record).report();
        assert_eq!(report.kind, InspectionKind::Breakpoint);
        assert_eq!(report.trigger, "div");
        assert_eq!(report.args, vec!["1", "0"]);
        assert!(report.failure.is_none());
    }

    #[test]
    fn test_post_mortem_report() {
        let record = test_record(TriggerId::mint("div"), CallArgs::new().kwarg("by", 0u8));
        let failure = Failure::error("division by zero");
        let inspection = Inspection::post_mortem(&record, &failure);
        let report = inspection.report();
        assert_eq!(inspection.kind(), InspectionKind::PostMortem);
        assert_eq!(report.kwargs.get("by").map(String::as_str), Some("0"));
        assert_eq!(report.failure_kind, Some(FailureKind::Error));
        assert_eq!(report.failure.as_deref(), Some("division by zero"));
    }
}
