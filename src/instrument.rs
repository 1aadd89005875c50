use std::{fmt, sync::Arc};

use crate::{Error, Recordable, Registry, Trigger, TriggerId};

type Body<A, T, E> = Arc<dyn Fn(A) -> Result<T, E> + Send + Sync>;

/// A function whose every call is broadcast to a [`Registry`] before it runs.
///
/// Build one with [`instrument`](crate::instrument), or with a
/// [`Decorator`](crate::Decorator) to register actions at the same time.
/// Arguments are passed as a tuple and recorded positionally.
///
/// ```ignore
/// let add = tripwire::instrument("add", |(a, b): (i32, i32)| Ok::<_, tripwire::Error>(a + b));
/// assert_eq!(add.call((2, 3))?, 5);
/// ```
pub struct Instrumented<A, T, E> {
    id: TriggerId,
    registry: Registry,
    body: Body<A, T, E>,
}

impl<A, T, E> Instrumented<A, T, E>
where
    A: Recordable + Clone + 'static,
    T: 'static,
    E: From<Error> + fmt::Display + 'static,
{
    /// Instrument `body` against the global registry.
    pub fn new<F>(name: impl Into<Arc<str>>, body: F) -> Self
    where
        F: Fn(A) -> Result<T, E> + Send + Sync + 'static,
    {
        Self::with_registry(Registry::global(), name, body)
    }

    pub fn with_registry<F>(registry: Registry, name: impl Into<Arc<str>>, body: F) -> Self
    where
        F: Fn(A) -> Result<T, E> + Send + Sync + 'static,
    {
        Self {
            id: TriggerId::mint(name),
            registry,
            body: Arc::new(body),
        }
    }

    pub fn call(&self, args: A) -> Result<T, E> {
        let body = self.body.clone();
        self.registry
            .intercept(&self.id, args, Recordable::record, move |args| body(args))
    }
}

impl<A, T, E> Instrumented<A, T, E> {
    pub fn id(&self) -> &TriggerId {
        &self.id
    }

    pub fn name(&self) -> &str {
        self.id.name()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl<A, T, E> Clone for Instrumented<A, T, E> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            registry: self.registry.clone(),
            body: self.body.clone(),
        }
    }
}

impl<A, T, E> fmt::Debug for Instrumented<A, T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instrumented").field("id", &self.id).finish()
    }
}

/// Entry point used by `#[trigger]`: intercept a call to a `static` trigger
/// through the global registry.
#[doc(hidden)]
pub fn intercept_static<A, T, E>(
    trigger: &'static Trigger,
    args: A,
    record_args: fn(&A) -> crate::CallArgs,
    body: fn(A) -> Result<T, E>,
) -> Result<T, E>
where
    A: Clone + 'static,
    T: 'static,
    E: From<Error> + fmt::Display + 'static,
{
    let id = trigger.id();
    Registry::global().intercept(id, args, record_args, body)
}
