use std::{
    hash::Hash,
    sync::{Arc, Once, OnceLock},
};

use uuid::Uuid;

use crate::Registry;

/// Opaque identity of an instrumented function.
///
/// A fresh token is minted every time a function is instrumented, so two
/// functions that happen to share a name never match each other unless the
/// registry is configured with [`MatchPolicy::ByName`](crate::MatchPolicy::ByName).
/// The name is kept for logging and for that legacy policy only.
///
/// Ids are cheap to clone and are what consumers are registered against:
///
/// ```ignore
/// let square = tripwire::instrument("square", |(x,): (u32,)| Ok::<_, tripwire::Error>(x * x));
/// tripwire::make_trigger(count_calls, &[square.id().clone()]);
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TriggerId {
    token: u128,
    name: Arc<str>,
}

impl TriggerId {
    /// Mint a new, unique id for a function called `name`.
    pub fn mint(name: impl Into<Arc<str>>) -> Self {
        Self {
            token: Uuid::new_v4().as_u128(),
            name: name.into(),
        }
    }

    /// The unique token of this id.
    #[inline]
    pub fn token(&self) -> u128 {
        self.token
    }

    /// Display name of the instrumented function.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True if both ids carry the same display name, regardless of token.
    #[inline]
    pub fn same_name(&self, other: &TriggerId) -> bool {
        self.name == other.name
    }
}

impl PartialEq for TriggerId {
    fn eq(&self, other: &Self) -> bool {
        self.token == other.token
    }
}

impl Eq for TriggerId {}

impl Hash for TriggerId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.token.hash(state);
    }
}

impl std::fmt::Display for TriggerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Setup hook run once, the first time a [`Trigger`]'s id is requested.
pub type TriggerSetup = fn(&Registry, &TriggerId);

/// A trigger declared as a `static`.
///
/// This is what `#[trigger]` generates next to the instrumented function. The
/// [`TriggerId`] is minted lazily, and the optional setup hook (which performs
/// the registrations requested by the attribute) runs right after, against
/// the global registry.
pub struct Trigger {
    name: &'static str,
    id: OnceLock<TriggerId>,
    setup: Option<TriggerSetup>,
    setup_done: Once,
}

impl Trigger {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            id: OnceLock::new(),
            setup: None,
            setup_done: Once::new(),
        }
    }

    pub const fn with_setup(name: &'static str, setup: TriggerSetup) -> Self {
        Self {
            name,
            id: OnceLock::new(),
            setup: Some(setup),
            setup_done: Once::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The trigger's id. The first call also runs the setup hook.
    pub fn id(&self) -> &TriggerId {
        let id = self.id.get_or_init(|| TriggerId::mint(self.name));
        if let Some(setup) = self.setup {
            self.setup_done.call_once(|| {
                tracing::debug!(trigger = %id, "Running trigger setup");
                setup(&Registry::global(), id);
            });
        }
        id
    }
}

impl std::fmt::Debug for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Trigger")
            .field("name", &self.name)
            .field("id", &self.id.get())
            .finish()
    }
}
