//! Tripwire - call instrumentation with trigger functions and actions
//!
//! Mark a function as a trigger and every call to it is first broadcast to
//! the registered consumers. A consumer runs its action when the call comes
//! from one of its triggers and all of its conditions hold; then the function
//! runs as usual.
//!
//! ```ignore
//! use tripwire::{CallRecord, Result, trigger};
//!
//! fn announce(record: &CallRecord) -> Result<()> {
//!     println!("calling {record}");
//!     Ok(())
//! }
//!
//! #[trigger(action = announce)]
//! fn fib(n: u64) -> Result<u64> {
//!     Ok(if n == 0 { 1 } else { n * fib(n - 1)? })
//! }
//! ```
//!
//! Functions can also bind themselves to triggers declared elsewhere with
//! `#[action(triggers = [FIB])]`, then `WATCH.bind()` for `fn watch`.
//!
//! See `demos/fib.rs`.

mod action;
mod binding;
mod call_record;
mod config;
mod consumer;
mod debug;
mod error;
mod failure_policy;
mod instrument;
mod match_policy;
mod registration;
mod registry;
mod trigger;

pub mod diagnostic;

pub use action::{Action, Condition, SharedAction, action};
pub use binding::{Binding, BindingSetup};
pub use call_record::{Arg, ArgValue, CallArgs, CallRecord, Recordable};
pub use config::Config;
pub use consumer::Consumer;
pub use debug::{enter_debugger, enter_debugger_on_error};
pub use error::Error;
pub use failure_policy::FailurePolicy;
pub use instrument::Instrumented;
#[doc(hidden)]
pub use instrument::intercept_static;
pub use match_policy::MatchPolicy;
pub use registration::{
    Decorator, instrument, make_conditional_trigger, make_trigger, register_action,
    with_action, with_conditional_action, with_conditional_actions,
};
pub use registry::{Registry, Suppressed};
pub use trigger::{Trigger, TriggerId, TriggerSetup};

#[cfg(feature = "macros")]
pub use tripwire_macros::{action, trigger};

pub type Result<T = ()> = std::result::Result<T, Error>;

pub mod prelude {
    pub use crate::action::{Action, Condition, action};
    pub use crate::call_record::CallRecord;
    pub use crate::debug::{enter_debugger, enter_debugger_on_error};
    pub use crate::error::Error as TripwireError;
    pub use crate::registry::Registry;
    pub use crate::trigger::TriggerId;
    #[cfg(feature = "macros")]
    pub use tripwire_macros::{action, trigger};
}
