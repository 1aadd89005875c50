//! Registration API on the global registry, plus the decorator forms.
//!
//! Every function here has a [`Registry`] method counterpart for code that
//! passes its own registry around.

use std::{fmt, sync::Arc};

use crate::{
    Action, Condition, Consumer, Error, Instrumented, Recordable, Registry, SharedAction,
    TriggerId,
};

/// Append `consumer` to the global registry.
pub fn register_action(consumer: Consumer) {
    Registry::global().register_action(consumer);
}

/// Fire `action` on every call to any of `triggers`.
pub fn make_trigger<A: Action + 'static>(action: A, triggers: &[TriggerId]) {
    Registry::global().make_trigger(action, triggers);
}

/// Fire `action` on calls to any of `triggers` for which all `conditions` hold.
pub fn make_conditional_trigger<A: Action + 'static>(
    action: A,
    conditions: Vec<Condition>,
    triggers: &[TriggerId],
) {
    Registry::global().make_conditional_trigger(action, conditions, triggers);
}

/// Instrument `body` without registering anything.
pub fn instrument<A, T, E, F>(name: impl Into<Arc<str>>, body: F) -> Instrumented<A, T, E>
where
    A: Recordable + Clone + 'static,
    T: 'static,
    E: From<Error> + fmt::Display + 'static,
    F: Fn(A) -> Result<T, E> + Send + Sync + 'static,
{
    Instrumented::new(name, body)
}

/// Decorator: instrument a function and fire `action` on its calls.
pub fn with_action<A: Action + 'static>(action: A) -> Decorator {
    Decorator::new(Vec::new(), vec![Arc::new(action)])
}

/// Decorator: like [`with_action`], gated by `conditions`.
pub fn with_conditional_action<A: Action + 'static>(
    conditions: Vec<Condition>,
    action: A,
) -> Decorator {
    Decorator::new(conditions, vec![Arc::new(action)])
}

/// Decorator: registers the same `conditions` against each of `actions`, one
/// consumer per action, in list order.
pub fn with_conditional_actions(conditions: Vec<Condition>, actions: Vec<SharedAction>) -> Decorator {
    Decorator::new(conditions, actions)
}

/// Registrations to perform when a function gets instrumented.
///
/// Created by [`with_action`], [`with_conditional_action`] and
/// [`with_conditional_actions`]; applied with [`wrap`](Self::wrap), or by
/// `#[trigger]` through [`attach`](Self::attach).
#[must_use = "a decorator does nothing until it wraps a function"]
pub struct Decorator {
    registry: Option<Registry>,
    conditions: Vec<Condition>,
    actions: Vec<SharedAction>,
}

impl Decorator {
    pub fn new(conditions: Vec<Condition>, actions: Vec<SharedAction>) -> Self {
        Self {
            registry: None,
            conditions,
            actions,
        }
    }

    /// Register into `registry` instead of the global one.
    pub fn in_registry(mut self, registry: Registry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Register one consumer per action on `id`, at the registry's base.
    pub fn attach(self, registry: &Registry, id: &TriggerId) {
        for action in self.actions {
            registry.register_at_base(Consumer::new(
                action,
                vec![id.clone()],
                self.conditions.clone(),
            ));
        }
    }

    /// Instrument `body` as `name` and register the decorator's actions on it.
    pub fn wrap<A, T, E, F>(self, name: impl Into<Arc<str>>, body: F) -> Instrumented<A, T, E>
    where
        A: Recordable + Clone + 'static,
        T: 'static,
        E: From<Error> + fmt::Display + 'static,
        F: Fn(A) -> Result<T, E> + Send + Sync + 'static,
    {
        let registry = self.registry.clone().unwrap_or_else(Registry::global);
        let instrumented = Instrumented::with_registry(registry.clone(), name, body);
        self.attach(&registry, instrumented.id());
        instrumented
    }
}

impl fmt::Debug for Decorator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Decorator")
            .field("conditions", &self.conditions.len())
            .field("actions", &self.actions.iter().map(|a| a.label()).collect::<Vec<_>>())
            .finish()
    }
}
