use std::sync::Once;

use crate::Registry;

/// Registration hook of a [`Binding`].
pub type BindingSetup = fn(&Registry);

/// An action declared as a `static`, bound to triggers defined elsewhere.
///
/// This is what `#[action(triggers = [..])]` generates next to the function:
/// `fn watch` gets `static WATCH: tripwire::Binding`. Nothing is registered
/// until [`bind`](Self::bind) is called. The registration goes to the base of
/// the global registry, so binding inside a suppression scope still takes
/// effect once the scope ends.
///
/// ```ignore
/// #[tripwire::action(triggers = [FIB])]
/// fn watch(record: &CallRecord) -> tripwire::Result<()> {
///     println!("{record}");
///     Ok(())
/// }
///
/// WATCH.bind();
/// ```
pub struct Binding {
    name: &'static str,
    setup: BindingSetup,
    done: Once,
}

impl Binding {
    pub const fn new(name: &'static str, setup: BindingSetup) -> Self {
        Self {
            name,
            setup,
            done: Once::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Register the action with the global registry. Only the first call
    /// registers; later calls do nothing.
    pub fn bind(&self) {
        self.done.call_once(|| {
            tracing::debug!(action = self.name, "Binding action");
            (self.setup)(&Registry::global());
        });
    }

    pub fn is_bound(&self) -> bool {
        self.done.is_completed()
    }
}

impl std::fmt::Debug for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binding")
            .field("name", &self.name)
            .field("bound", &self.is_bound())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CallRecord, Consumer, Error, Recordable, Result, Trigger, action};
    use std::sync::atomic::{AtomicUsize, Ordering};

    static HITS: AtomicUsize = AtomicUsize::new(0);
    static TARGET: Trigger = Trigger::new("target");

    fn count(_: &CallRecord) -> Result<()> {
        HITS.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn setup(registry: &Registry) {
        registry.register_at_base(Consumer::new(action(count), vec![TARGET.id().clone()], vec![]));
    }

    static COUNTER: Binding = Binding::new("count", setup);

    #[test]
    fn test_bind_registers_once() {
        let global = Registry::global();
        let call = || {
            global.intercept(TARGET.id(), (), Recordable::record, |()| Ok::<_, Error>(()))
        };

        call().unwrap();
        assert_eq!(HITS.load(Ordering::SeqCst), 0);
        assert!(!COUNTER.is_bound());

        COUNTER.bind();
        COUNTER.bind();
        assert!(COUNTER.is_bound());
        call().unwrap();
        assert_eq!(HITS.load(Ordering::SeqCst), 1);
        assert_eq!(COUNTER.name(), "count");
    }
}
