use std::{
    any::Any,
    backtrace::Backtrace,
    cell::{Cell, RefCell},
    fmt,
    panic::{self, AssertUnwindSafe, PanicHookInfo},
    sync::Once,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FailureKind {
    /// The body returned `Err`.
    Error,
    /// The body panicked.
    Panic,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Error => write!(f, "error"),
            FailureKind::Panic => write!(f, "panic"),
        }
    }
}

/// Why a replayed call failed.
///
/// For panics caught by the replay, the backtrace and location are taken at
/// the panic site, before unwinding. Otherwise the backtrace is captured where
/// the failure was observed, and only when `RUST_BACKTRACE` (or
/// `RUST_LIB_BACKTRACE`) enables it.
#[derive(Debug)]
pub struct Failure {
    kind: FailureKind,
    message: String,
    location: Option<String>,
    backtrace: Backtrace,
}

impl Failure {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Error,
            message: message.into(),
            location: None,
            backtrace: Backtrace::capture(),
        }
    }

    pub fn panic(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Panic,
            message: message.into(),
            location: None,
            backtrace: Backtrace::capture(),
        }
    }

    /// Build a failure from a payload caught by `catch_unwind`.
    ///
    /// The stack has already unwound at this point; prefer [`catch_failure`]
    /// when the panic site matters.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        Self::panic(panic_message(payload.as_ref()))
    }

    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// `file:line:column` of the panic, when known.
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

struct PanicSite {
    location: Option<String>,
    backtrace: Backtrace,
}

thread_local! {
    static CAPTURING: Cell<usize> = const { Cell::new(0) };
    static PANIC_SITE: RefCell<Option<PanicSite>> = const { RefCell::new(None) };
}

static HOOK: Once = Once::new();

// Chains onto the hook in place at first use. Only records anything on
// threads that are inside `catch_failure`.
fn install_hook() {
    HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info: &PanicHookInfo<'_>| {
            if CAPTURING.try_with(Cell::get).unwrap_or(0) > 0 {
                let site = PanicSite {
                    location: info.location().map(|l| l.to_string()),
                    backtrace: Backtrace::force_capture(),
                };
                let _ = PANIC_SITE.try_with(|slot| *slot.borrow_mut() = Some(site));
            }
            previous(info);
        }));
    });
}

/// Run `f`, turning a panic into a [`Failure`] carrying the panic's location
/// and a backtrace taken where it was raised.
pub(crate) fn catch_failure<R>(f: impl FnOnce() -> R) -> Result<R, Failure> {
    install_hook();
    PANIC_SITE.with(|slot| slot.borrow_mut().take());
    CAPTURING.with(|c| c.set(c.get() + 1));
    let result = panic::catch_unwind(AssertUnwindSafe(f));
    CAPTURING.with(|c| c.set(c.get() - 1));

    result.map_err(|payload| {
        let message = panic_message(payload.as_ref());
        match PANIC_SITE.with(|slot| slot.borrow_mut().take()) {
            Some(site) => Failure {
                kind: FailureKind::Panic,
                message,
                location: site.location,
                backtrace: site.backtrace,
            },
            None => Failure::panic(message),
        }
    })
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
