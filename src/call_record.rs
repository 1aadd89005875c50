use std::{any::Any, collections::BTreeMap, fmt, sync::Arc};

use crate::{Registry, TriggerId, diagnostic::Failure};

/// A value captured from an intercepted call.
///
/// Implemented for every `Any + Debug + Send + Sync` type, so plain arguments
/// can be recorded without any ceremony.
pub trait ArgValue: Any + fmt::Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any + fmt::Debug + Send + Sync> ArgValue for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub type Arg = Arc<dyn ArgValue>;

/// Arguments of an intercepted call: ordered positional values and keyword
/// values by parameter name.
#[derive(Debug, Clone, Default)]
pub struct CallArgs {
    args: Vec<Arg>,
    kwargs: BTreeMap<Arc<str>, Arg>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional argument.
    pub fn arg<V: ArgValue>(mut self, value: V) -> Self {
        self.args.push(Arc::new(value));
        self
    }

    /// Record a keyword argument. A repeated name replaces the earlier value.
    pub fn kwarg<V: ArgValue>(mut self, name: impl Into<Arc<str>>, value: V) -> Self {
        self.kwargs.insert(name.into(), Arc::new(value));
        self
    }
}

/// Maps an argument tuple onto recorded call arguments.
///
/// Tuples of up to eight elements are recorded positionally.
/// Implement it by hand to record some arguments as keywords.
pub trait Recordable {
    fn record(&self) -> CallArgs;
}

macro_rules! impl_recordable {
    ($($name:ident),*) => {
        impl<$($name: ArgValue + Clone),*> Recordable for ($($name,)*) {
            #[allow(non_snake_case)]
            fn record(&self) -> CallArgs {
                let ($($name,)*) = self;
                CallArgs::new()$(.arg($name.clone()))*
            }
        }
    };
}

impl_recordable!();
impl_recordable!(A);
impl_recordable!(A, B);
impl_recordable!(A, B, C);
impl_recordable!(A, B, C, D);
impl_recordable!(A, B, C, D, E);
impl_recordable!(A, B, C, D, E, F);
impl_recordable!(A, B, C, D, E, F, G);
impl_recordable!(A, B, C, D, E, F, G, H);

pub(crate) type Replay = Box<dyn Fn() -> std::result::Result<(), Failure>>;

/// Immutable record of one intercepted call.
///
/// Built fresh by the instrumentation wrapper for every call and handed by
/// reference to each consumer in the registry.
pub struct CallRecord {
    trigger: TriggerId,
    args: CallArgs,
    registry: Registry,
    replay: Replay,
}

impl CallRecord {
    pub(crate) fn new(trigger: TriggerId, args: CallArgs, registry: Registry, replay: Replay) -> Self {
        Self {
            trigger,
            args,
            registry,
            replay,
        }
    }

    /// Identity of the function that was called.
    pub fn trigger(&self) -> &TriggerId {
        &self.trigger
    }

    /// Positional arguments, in call order.
    pub fn args(&self) -> &[Arg] {
        &self.args.args
    }

    /// Keyword arguments, by parameter name.
    pub fn kwargs(&self) -> &BTreeMap<Arc<str>, Arg> {
        &self.args.kwargs
    }

    /// Positional argument `index`, if present and of type `T`.
    pub fn arg<T: Any>(&self, index: usize) -> Option<&T> {
        self.args
            .args
            .get(index)
            .and_then(|a| a.as_ref().as_any().downcast_ref())
    }

    /// Keyword argument `name`, if present and of type `T`.
    pub fn kwarg<T: Any>(&self, name: &str) -> Option<&T> {
        self.args
            .kwargs
            .get(name)
            .and_then(|a| a.as_ref().as_any().downcast_ref())
    }

    /// Registry the call was broadcast through.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Run the original, un-instrumented body again with a copy of the
    /// recorded arguments. Both an `Err` result and a panic count as failure.
    ///
    /// Nested calls to instrumented functions still broadcast; wrap the replay
    /// in [`Registry::suppress`] to keep them quiet.
    pub fn replay(&self) -> std::result::Result<(), Failure> {
        (self.replay)()
    }
}

impl fmt::Debug for CallRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallRecord")
            .field("trigger", &self.trigger)
            .field("args", &self.args.args)
            .field("kwargs", &self.args.kwargs)
            .finish()
    }
}

impl fmt::Display for CallRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.trigger.name())?;
        let mut first = true;
        for arg in &self.args.args {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{arg:?}")?;
            first = false;
        }
        for (name, value) in &self.args.kwargs {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{name}={value:?}")?;
            first = false;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
pub(crate) fn test_record(trigger: TriggerId, args: CallArgs) -> CallRecord {
    CallRecord::new(trigger, args, Registry::default(), Box::new(|| Ok(())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_access() {
        let record = test_record(
            TriggerId::mint("f"),
            CallArgs::new().arg(4u64).arg("x").kwarg("depth", 2i32),
        );
        assert_eq!(record.arg::<u64>(0), Some(&4));
        assert_eq!(record.arg::<&str>(1), Some(&"x"));
        assert_eq!(record.kwarg::<i32>("depth"), Some(&2));
    }

    #[test]
    fn test_typed_access_misses() {
        let record = test_record(TriggerId::mint("f"), CallArgs::new().arg(4u64));
        assert!(record.arg::<i64>(0).is_none());
        assert!(record.arg::<u64>(1).is_none());
        assert!(record.kwarg::<u64>("n").is_none());
    }

    #[test]
    fn test_tuple_is_recorded_positionally() {
        let args = (1u8, String::from("two"), 3.0f64).record();
        let record = test_record(TriggerId::mint("g"), args);
        assert_eq!(record.args().len(), 3);
        assert!(record.kwargs().is_empty());
        assert_eq!(record.arg::<String>(1).map(String::as_str), Some("two"));
    }

    #[test]
    fn test_display() {
        let record = test_record(
            TriggerId::mint("fib"),
            CallArgs::new().arg(5u64).kwarg("memo", false),
        );
        assert_eq!(record.to_string(), "fib(5, memo=false)");
    }
}
