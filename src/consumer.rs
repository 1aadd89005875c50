use std::{
    panic::{AssertUnwindSafe, catch_unwind},
    sync::Arc,
};

use crate::{
    CallRecord, Condition, Error, MatchPolicy, Result, SharedAction, TriggerId,
    diagnostic::panic_message,
};

/// A registered `(triggers, conditions, action)` triple.
///
/// The consumer fires its action for a record if and only if the record's
/// trigger matches one of `triggers` (under the registry's [`MatchPolicy`])
/// and every condition holds. No conditions means "always". No triggers means
/// the consumer never fires.
#[derive(Clone)]
pub struct Consumer {
    action: SharedAction,
    triggers: Vec<TriggerId>,
    conditions: Vec<Condition>,
}

impl Consumer {
    pub fn new(action: SharedAction, triggers: Vec<TriggerId>, conditions: Vec<Condition>) -> Self {
        if triggers.is_empty() {
            tracing::debug!(action = %action.label(), "Consumer has no triggers and will never fire");
        }
        Self {
            action,
            triggers,
            conditions,
        }
    }

    pub fn triggers(&self) -> &[TriggerId] {
        &self.triggers
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn label(&self) -> Arc<str> {
        Arc::from(self.action.label())
    }

    /// True if the record's function is one of this consumer's triggers.
    pub fn is_trigger(&self, trigger: &TriggerId, policy: MatchPolicy) -> bool {
        self.triggers.iter().any(|t| match policy {
            MatchPolicy::ByToken => t == trigger,
            MatchPolicy::ByName => t.same_name(trigger),
        })
    }

    /// True if the record comes from one of the triggers and every condition
    /// holds. Conditions run unguarded here; a panicking condition panics.
    pub fn matches(&self, record: &CallRecord, policy: MatchPolicy) -> bool {
        self.is_trigger(record.trigger(), policy) && self.conditions_hold(record)
    }

    fn conditions_hold(&self, record: &CallRecord) -> bool {
        self.conditions.iter().all(|c| c.holds(record))
    }

    /// Fire the action if the record matches. Returns whether it fired.
    ///
    /// A panic in a condition or in the action is caught and reported as
    /// [`Error::ConditionPanicked`] or [`Error::ActionPanicked`]. Either way the
    /// consumer stays usable for later records.
    pub fn dispatch(&self, record: &CallRecord, policy: MatchPolicy) -> Result<bool> {
        if !self.is_trigger(record.trigger(), policy) {
            return Ok(false);
        }

        match catch_unwind(AssertUnwindSafe(|| self.conditions_hold(record))) {
            Ok(true) => {}
            Ok(false) => return Ok(false),
            Err(payload) => {
                let reason = panic_message(payload.as_ref());
                tracing::error!(action = %self.action.label(), trigger = %record.trigger(), %reason, "Condition panicked");
                return Err(Error::ConditionPanicked {
                    action: self.label(),
                    trigger: record.trigger().clone(),
                    reason: reason.into(),
                });
            }
        }
        tracing::trace!(action = %self.action.label(), trigger = %record.trigger(), "Firing action");

        match catch_unwind(AssertUnwindSafe(|| self.action.call(record))) {
            Ok(result) => result.map(|_| true),
            Err(payload) => {
                let reason = panic_message(payload.as_ref());
                tracing::error!(action = %self.action.label(), trigger = %record.trigger(), %reason, "Action panicked");
                Err(Error::ActionPanicked {
                    action: self.label(),
                    trigger: record.trigger().clone(),
                    reason: reason.into(),
                })
            }
        }
    }
}

impl std::fmt::Debug for Consumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Consumer")
            .field("action", &self.action.label())
            .field("triggers", &self.triggers)
            .field("conditions", &self.conditions.len())
            .finish()
    }
}
