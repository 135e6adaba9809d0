use serde::{Deserialize, Serialize};
use std::fmt;

/// ULID-backed identifier for values that don't already have a natural database-assigned id —
/// log correlation ids and the per-run scratch database names `test_support` generates for
/// isolated test pools. Task, crawler, and history rows use their own `i64` primary keys and
/// never need one of these.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Id(ulid::Ulid);

impl Id {
    /// Generate a new id, sortable by creation time like all ULIDs.
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }
}

impl Default for Id {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Id {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}
