use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError},
};

use crate::{
    Action, CallArgs, CallRecord, Condition, Config, Consumer, Error, Result, TriggerId,
    call_record::Replay,
    diagnostic::{DiagnosticSink, Failure, catch_failure},
};

static GLOBAL: OnceLock<Registry> = OnceLock::new();

// `saved[i]` is the list that was live when scope `i` began.
#[derive(Default)]
struct Consumers {
    live: Vec<Arc<Consumer>>,
    saved: Vec<SavedScope>,
    next_scope: u64,
}

struct SavedScope {
    scope: u64,
    consumers: Vec<Arc<Consumer>>,
}

struct Shared {
    config: Config,
    consumers: Mutex<Consumers>,
}

/// Ordered collection of consumers that intercepted calls are broadcast to.
///
/// - Register consumers with [`register_action`](Self::register_action),
///   [`make_trigger`](Self::make_trigger) or
///   [`make_conditional_trigger`](Self::make_conditional_trigger).
/// - Broadcast a record with [`broadcast`](Self::broadcast); instrumented
///   functions do this through [`intercept`](Self::intercept).
/// - Silence everything for a scope with [`suppress`](Self::suppress).
///
/// `Registry` is a cheap handle: clones share the same consumers. A
/// process-wide instance is available through [`Registry::global`], and it is
/// what `#[trigger]` and the free registration functions use.
#[derive(Clone)]
pub struct Registry {
    shared: Arc<Shared>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl Registry {
    pub fn new(config: Config) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                consumers: Mutex::new(Consumers::default()),
            }),
        }
    }

    /// The process-wide registry, created with the default [`Config`] unless
    /// [`init_global`](Self::init_global) ran first.
    pub fn global() -> Registry {
        GLOBAL.get_or_init(Registry::default).clone()
    }

    /// Configure the process-wide registry. Must run before anything touches
    /// it, otherwise [`Error::GlobalAlreadyInitialized`] is returned.
    pub fn init_global(config: Config) -> Result<Registry> {
        let mut created = false;
        let registry = GLOBAL.get_or_init(|| {
            created = true;
            Registry::new(config)
        });
        if !created {
            return Err(Error::GlobalAlreadyInitialized);
        }
        tracing::debug!(config = ?registry.config(), "Global registry initialized");
        Ok(registry.clone())
    }

    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    pub fn sink(&self) -> Arc<dyn DiagnosticSink> {
        self.shared.config.sink.clone()
    }

    /// True if both handles point at the same registry.
    pub fn ptr_eq(&self, other: &Registry) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    fn consumers(&self) -> MutexGuard<'_, Consumers> {
        self.shared
            .consumers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of live consumers.
    pub fn len(&self) -> usize {
        self.consumers().live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True while at least one suppression scope is active.
    pub fn is_suppressed(&self) -> bool {
        !self.consumers().saved.is_empty()
    }

    /// Append a consumer to the live list. Duplicates are allowed and all fire.
    pub fn register_action(&self, consumer: Consumer) {
        tracing::debug!(consumer = ?consumer, "Registering consumer");
        self.consumers().live.push(Arc::new(consumer));
    }

    /// Append a consumer to the outermost list, the one that becomes live
    /// once every suppression scope has ended.
    pub fn register_at_base(&self, consumer: Consumer) {
        tracing::debug!(consumer = ?consumer, "Registering consumer at base");
        let consumer = Arc::new(consumer);
        let mut consumers = self.consumers();
        match consumers.saved.first_mut() {
            Some(base) => base.consumers.push(consumer),
            None => consumers.live.push(consumer),
        }
    }

    /// Register `action` to fire on every call to any of `triggers`.
    pub fn make_trigger<A: Action + 'static>(&self, action: A, triggers: &[TriggerId]) {
        self.make_conditional_trigger(action, Vec::new(), triggers);
    }

    /// Register `action` to fire on calls to any of `triggers` for which every
    /// condition holds.
    pub fn make_conditional_trigger<A: Action + 'static>(
        &self,
        action: A,
        conditions: Vec<Condition>,
        triggers: &[TriggerId],
    ) {
        self.register_action(Consumer::new(Arc::new(action), triggers.to_vec(), conditions));
    }

    /// Deliver `record` to every live consumer, in registration order.
    /// Returns how many actions fired.
    ///
    /// The consumer list is snapshotted first, so actions may register
    /// consumers or call instrumented functions without deadlocking; newly
    /// registered consumers only see later records.
    pub fn broadcast(&self, record: &CallRecord) -> Result<usize> {
        let snapshot = self.consumers().live.clone();
        let policy = self.shared.config.match_policy;
        tracing::trace!(call = %record, consumers = snapshot.len(), "Broadcasting");

        let mut fired = 0;
        for consumer in &snapshot {
            match consumer.dispatch(record, policy) {
                Ok(true) => fired += 1,
                Ok(false) => {}
                Err(err) if self.shared.config.failure_policy.is_log_and_continue() => {
                    tracing::warn!(consumer = ?consumer, call = %record, error = %err, "Consumer failed, continuing");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(fired)
    }

    /// Swap the live consumers for an empty list until the returned guard is
    /// dropped. Dropping restores the previous list, also during unwinding.
    ///
    /// Consumers registered with [`register_action`](Self::register_action)
    /// inside the scope are discarded on restore. Scopes normally end in
    /// reverse order; when one ends early, for example on another thread, its
    /// saved list is handed to the scope that began after it, so the registry
    /// is back to its original state once every guard is gone.
    pub fn suppress(&self) -> Suppressed {
        let mut consumers = self.consumers();
        let scope = consumers.next_scope;
        consumers.next_scope += 1;
        let previous = std::mem::take(&mut consumers.live);
        consumers.saved.push(SavedScope {
            scope,
            consumers: previous,
        });
        tracing::debug!(depth = consumers.saved.len(), "Registry suppressed");
        Suppressed {
            registry: self.clone(),
            scope,
        }
    }

    /// Run `f` with the registry suppressed.
    pub fn suppressed<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = self.suppress();
        f()
    }

    /// The instrumentation wrapper.
    ///
    /// Records the call to `trigger`, broadcasts it, then runs `body(args)`.
    /// If the broadcast fails the error is converted into `E` and `body` is
    /// not run. The record keeps a copy of `args` and `body` so actions can
    /// [`replay`](CallRecord::replay) the call.
    pub fn intercept<A, T, E, B>(
        &self,
        trigger: &TriggerId,
        args: A,
        record_args: impl FnOnce(&A) -> CallArgs,
        body: B,
    ) -> std::result::Result<T, E>
    where
        A: Clone + 'static,
        B: Fn(A) -> std::result::Result<T, E> + Clone + 'static,
        E: From<Error> + fmt::Display,
    {
        let call_args = record_args(&args);
        let replay_args = args.clone();
        let replay_body = body.clone();
        let replay: Replay = Box::new(move || {
            let args = replay_args.clone();
            match catch_failure(|| replay_body(args)) {
                Ok(Ok(_)) => Ok(()),
                Ok(Err(e)) => Err(Failure::error(e.to_string())),
                Err(failure) => Err(failure),
            }
        });

        let record = CallRecord::new(trigger.clone(), call_args, self.clone(), replay);
        self.broadcast(&record)?;
        drop(record);

        body(args)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let consumers = self.consumers();
        f.debug_struct("Registry")
            .field("config", &self.shared.config)
            .field("consumers", &consumers.live.len())
            .field("depth", &consumers.saved.len())
            .finish()
    }
}

/// Guard returned by [`Registry::suppress`].
#[must_use = "the registry is restored as soon as the guard is dropped"]
pub struct Suppressed {
    registry: Registry,
    scope: u64,
}

impl Drop for Suppressed {
    fn drop(&mut self) {
        let mut consumers = self.registry.consumers();
        let Some(index) = consumers.saved.iter().position(|s| s.scope == self.scope) else {
            return;
        };
        let previous = consumers.saved.remove(index).consumers;
        match consumers.saved.get_mut(index) {
            Some(newer) => {
                tracing::debug!(scope = self.scope, "Suppression scope ended out of order");
                newer.consumers = previous;
            }
            None => consumers.live = previous,
        }
        tracing::debug!(depth = consumers.saved.len(), "Registry restored");
    }
}
