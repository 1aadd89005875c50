use std::sync::Arc;

use crate::TriggerId;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Action '{action}' panicked on call to '{trigger}': {reason}")]
    ActionPanicked {
        action: Arc<str>,
        trigger: TriggerId,
        reason: Arc<str>,
    },

    #[error("A condition of action '{action}' panicked on call to '{trigger}': {reason}")]
    ConditionPanicked {
        action: Arc<str>,
        trigger: TriggerId,
        reason: Arc<str>,
    },

    #[error("Diagnostic session at '{0}' was aborted")]
    SessionAborted(TriggerId),

    #[error("The global registry has already been initialized.")]
    GlobalAlreadyInitialized,

    #[error("Error external to Tripwire occured: {0}")]
    External(Arc<str>),

    #[error("IO Error: {0}")]
    IOError(#[from] std::io::Error),
}

impl Error {
    /// Wrap an arbitrary message, typically the reason an action refused a call.
    pub fn external(reason: impl Into<Arc<str>>) -> Self {
        Error::External(reason.into())
    }
}
