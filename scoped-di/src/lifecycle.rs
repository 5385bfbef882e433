//! Instantiation lifecycle of factory entries

use std::fmt;

/// Lifecycle determines whether a factory is re-invoked
///
/// Value entries behave like an already-initialized singleton.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "config",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum Lifecycle {
    /// The factory runs once; every caller observes the memoized result
    #[default]
    Singleton,
    /// The factory runs on every resolution
    Prototype,
}

impl Lifecycle {
    /// Whether results are memoized
    pub fn is_memoized(self) -> bool {
        matches!(self, Lifecycle::Singleton)
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lifecycle::Singleton => write!(f, "Singleton"),
            Lifecycle::Prototype => write!(f, "Prototype"),
        }
    }
}
