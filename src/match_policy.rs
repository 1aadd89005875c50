use std::fmt;

/// How a consumer decides that a record comes from one of its triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MatchPolicy {
    /// Compare the opaque token minted when the function was instrumented.
    #[default]
    ByToken,
    /// Compare display names only. Distinct functions sharing a name are
    /// indistinguishable under this policy.
    ByName,
}

impl MatchPolicy {
    pub fn is_by_token(&self) -> bool {
        matches!(self, MatchPolicy::ByToken)
    }

    pub fn is_by_name(&self) -> bool {
        matches!(self, MatchPolicy::ByName)
    }
}

impl fmt::Display for MatchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchPolicy::ByToken => write!(f, "ByToken"),
            MatchPolicy::ByName => write!(f, "ByName"),
        }
    }
}
