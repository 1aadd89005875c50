use std::{borrow::Cow, fmt, sync::Arc};

use crate::{CallRecord, Result};

/// Something that runs when a consumer fires.
///
/// Any `Fn(&CallRecord) -> Result<()>` is an action, so most actions are plain
/// functions:
///
/// ```ignore
/// fn count(record: &CallRecord) -> tripwire::Result<()> {
///     CALLS.fetch_add(1, Ordering::Relaxed);
///     Ok(())
/// }
/// ```
///
/// Returning an error fails the broadcast it runs in.
pub trait Action: Send + Sync {
    fn call(&self, record: &CallRecord) -> Result<()>;

    /// Name used in logs and errors.
    /// The default is the implementing type's name.
    fn label(&self) -> Cow<'static, str> {
        Cow::Borrowed(std::any::type_name::<Self>())
    }
}

impl<F> Action for F
where
    F: Fn(&CallRecord) -> Result<()> + Send + Sync,
{
    fn call(&self, record: &CallRecord) -> Result<()> {
        self(record)
    }
}

pub type SharedAction = Arc<dyn Action>;

/// Wrap an action for the list-taking registration functions.
pub fn action<A: Action + 'static>(action: A) -> SharedAction {
    Arc::new(action)
}

/// Predicate over a [`CallRecord`] gating a consumer.
#[derive(Clone)]
pub struct Condition(Arc<dyn Fn(&CallRecord) -> bool + Send + Sync>);

impl Condition {
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&CallRecord) -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(predicate))
    }

    #[inline]
    pub fn holds(&self, record: &CallRecord) -> bool {
        (self.0)(record)
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Condition")
    }
}
