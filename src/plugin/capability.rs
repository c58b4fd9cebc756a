//! Plugin capability flags.

use std::fmt;
use std::sync::Arc;

/// A capability declared by a plugin: either fixed, or computed on demand.
///
/// Computed capabilities may depend on external state, so callers evaluate
/// them on every use instead of caching the answer.
#[derive(Clone)]
pub enum Capability {
    Fixed(bool),
    Computed(Arc<dyn Fn() -> bool + Send + Sync>),
}

impl Capability {
    /// Wrap a closure as a computed capability.
    pub fn computed(f: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        Self::Computed(Arc::new(f))
    }

    /// Resolve the capability now.
    pub fn evaluate(&self) -> bool {
        match self {
            Self::Fixed(value) => *value,
            Self::Computed(f) => f(),
        }
    }
}

impl Default for Capability {
    fn default() -> Self {
        Self::Fixed(false)
    }
}

impl From<bool> for Capability {
    fn from(value: bool) -> Self {
        Self::Fixed(value)
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(value) => f.debug_tuple("Fixed").field(value).finish(),
            Self::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}
